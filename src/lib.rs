pub mod backend;
pub mod config;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod scene;
pub mod snapshot;
pub mod suspension;
pub mod vehicle;

pub use backend::rapier::RapierBackend;
pub use backend::PhysicsBackend;
pub use config::VehicleTuningConfig;
pub use error::{ConfigError, PhysicsError, VehicleError};
pub use vehicle::{Authority, FourWheelVehicleBuilder, WheelNodes};
