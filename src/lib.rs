//! The `gyrotrace` crate provides tools for propagating charged-particle
//! tracks through magnetic fields.
pub mod constants;
pub mod error;
pub mod field;
pub mod geometry;
pub mod num;
pub mod propagation;
