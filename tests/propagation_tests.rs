use approx::assert_abs_diff_eq;
use gyrotrace::{
    field::UniformField3,
    geometry::{
        Dim3::{X, Y, Z},
        Point3, Vec3,
    },
    propagation::{propagate, stepping::RK4StepperConfig, PropagatorConfig, StoppingCause},
};

#[test]
fn unit_momentum_track_in_solenoidal_field_traces_known_helix() {
    let field = UniformField3::solenoidal(2.0);
    let config = PropagatorConfig::default();

    let trajectory = propagate(
        &field,
        &Point3::origin(),
        &Vec3::new(1.0, 0.0, 0.0),
        1.0,
        1.0,
        &config,
    )
    .unwrap();

    assert_eq!(trajectory.stopping_cause, StoppingCause::BudgetReached);
    assert!(trajectory.total_path_length >= config.target_path_length);
    assert_eq!(trajectory.samples.len(), 8192);

    let first = &trajectory.samples[0];
    assert_abs_diff_eq!(first.position[X], 0.12196117095296723, epsilon = 1e-9);
    assert_abs_diff_eq!(first.position[Y], -0.00446839460068735, epsilon = 1e-9);
    assert_eq!(first.position[Z], 0.0);
    assert_abs_diff_eq!(first.direction[X], 0.9973189374974512, epsilon = 1e-9);
    assert_abs_diff_eq!(first.direction[Y], -0.07317743442452403, epsilon = 1e-9);

    for sample in &trajectory.samples {
        assert_abs_diff_eq!(sample.direction.length(), 1.0, epsilon = 1e-9);
        assert_eq!(sample.position[Z], 0.0);
    }
}

#[test]
fn trajectories_serialize_as_plain_coordinate_arrays() {
    let field = UniformField3::<f64>::zero();
    let config = PropagatorConfig {
        stepper: RK4StepperConfig {
            max_step_size: Some(10.0),
            ..RK4StepperConfig::default()
        },
        target_path_length: 10.0,
    };

    let trajectory = propagate(
        &field,
        &Point3::origin(),
        &Vec3::new(0.0, 1.0, 0.0),
        5.0,
        -1.0,
        &config,
    )
    .unwrap();

    let serialized = serde_json::to_value(&trajectory).unwrap();
    let first_position = &serialized["samples"][0]["position"];
    assert!(first_position.is_array());
    assert_eq!(first_position[1].as_f64().unwrap(), 10.0);
}
