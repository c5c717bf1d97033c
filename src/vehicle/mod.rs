//! vehicle - runtime wheeled vehicle: wheels, physics model, builder

pub mod builder;
pub mod model;
pub mod wheel;

pub use builder::{Authority, BuildStage, FourWheelVehicleBuilder, WheelNodes};
pub use model::{ControlLimits, WheeledVehicle, MPS_TO_MPH};
pub use wheel::{VisualNode, Wheel, WheelFlags};
