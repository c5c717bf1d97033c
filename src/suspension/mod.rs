//! suspension - engine-agnostic suspension statics (pure types + calculator)

pub mod calculator;
pub mod tire_curve;
pub mod types;

pub use calculator::{
    compute_axle_load, compute_damper_coefficient, compute_lever_arms, compute_spring_rate,
    compute_static_jounce, compute_wheelbase, derive_axle, derive_suspension,
};
pub use tire_curve::TireForceCurve;
pub use types::*;
