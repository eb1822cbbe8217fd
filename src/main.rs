//! Command line interface for propagating charged-particle tracks
//! through uniform magnetic fields.

use clap::{crate_version, Arg, Command};
use gyrotrace::{
    field::UniformField3,
    geometry::Vec3,
    propagation::{self, fpr, stepping::RK4StepperConfig, PropagatorConfig},
};
use std::{io, process};

fn main() {
    env_logger::init();

    let arguments = Command::new("gyrotrace")
        .version(crate_version!())
        .about("Propagates a charged-particle track through a uniform magnetic field")
        .arg(
            Arg::new("start-position")
                .long("start-position")
                .value_name("X,Y,Z")
                .help("Position where the propagation should start")
                .default_value("0,0,0"),
        )
        .arg(
            Arg::new("start-direction")
                .long("start-direction")
                .value_name("X,Y,Z")
                .help("Initial direction of travel")
                .default_value("1,0,0"),
        )
        .arg(
            Arg::new("momentum")
                .long("momentum")
                .value_name("VALUE")
                .help("Magnitude of the particle momentum")
                .required(true),
        )
        .arg(
            Arg::new("charge")
                .long("charge")
                .value_name("VALUE")
                .help("Particle charge in elementary charge units")
                .default_value("1"),
        )
        .arg(
            Arg::new("field")
                .long("field")
                .value_name("X,Y,Z")
                .help("Uniform magnetic field vector to propagate through")
                .default_value("0,0,2"),
        )
        .arg(
            Arg::new("max-step-size")
                .long("max-step-size")
                .value_name("VALUE")
                .help("Largest allowed step length [default: unrestricted]"),
        )
        .arg(
            Arg::new("path-length")
                .long("path-length")
                .value_name("VALUE")
                .help("Total path length after which propagation stops")
                .default_value("1000"),
        )
        .get_matches();

    let start_position =
        parse_components("start-position", argument(&arguments, "start-position")).to_point3();
    let start_direction =
        parse_components("start-direction", argument(&arguments, "start-direction"));
    let momentum = parse_number("momentum", argument(&arguments, "momentum"));
    let charge = parse_number("charge", argument(&arguments, "charge"));
    let field = UniformField3::new(parse_components("field", argument(&arguments, "field")));

    let config = PropagatorConfig {
        stepper: RK4StepperConfig {
            max_step_size: arguments
                .get_one::<String>("max-step-size")
                .map(|text| parse_number("max-step-size", text)),
            ..RK4StepperConfig::default()
        },
        target_path_length: parse_number("path-length", argument(&arguments, "path-length")),
    };

    let trajectory = propagation::propagate(
        &field,
        &start_position,
        &start_direction,
        momentum,
        charge,
        &config,
    )
    .unwrap_or_else(|err| abort(format!("Propagation failed: {}", err)));

    serde_json::to_writer_pretty(io::stdout().lock(), &trajectory)
        .unwrap_or_else(|err| abort(format!("Could not write trajectory: {}", err)));
    println!();
}

fn argument<'a>(arguments: &'a clap::ArgMatches, name: &str) -> &'a str {
    arguments
        .get_one::<String>(name)
        .expect("No value for required argument")
}

fn parse_components(name: &str, text: &str) -> Vec3<fpr> {
    let components: Vec<fpr> = text
        .split(',')
        .map(|component| parse_number(name, component.trim()))
        .collect();
    if components.len() != 3 {
        abort(format!(
            "Argument {} must have exactly three comma-separated components",
            name
        ));
    }
    Vec3::new(components[0], components[1], components[2])
}

fn parse_number(name: &str, text: &str) -> fpr {
    text.parse().unwrap_or_else(|_| {
        abort(format!(
            "Could not parse value of argument {}: {}",
            name, text
        ))
    })
}

fn abort(message: String) -> ! {
    eprintln!("{}", message);
    process::exit(1)
}
