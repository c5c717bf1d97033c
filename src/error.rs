// ==============================================================================
// error.rs — ERROR TYPES
// ------------------------------------------------------------------------------
// - PhysicsError: returned by every fallible PhysicsBackend call
// - VehicleError: builder / vehicle-model failures (wraps PhysicsError)
// - ConfigError:  tuning file loading
//
// Nothing here escapes to the owning actor as a panic. The builder logs a
// VehicleError and reports a plain bool upward.
// ==============================================================================

use thiserror::Error;

use crate::backend::{BodyHandle, WheelHandle};

#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("unknown body handle {0:?}")]
    UnknownBody(BodyHandle),

    #[error("unknown wheel handle {0:?}")]
    UnknownWheel(WheelHandle),

    #[error("physics engine refused to create {0}")]
    CreationFailed(&'static str),

    #[error("vehicle on body {0:?} is already finalized")]
    AlreadyFinalized(BodyHandle),
}

#[derive(Debug, Error)]
pub enum VehicleError {
    #[error("chassis node '{0}' not found in scene")]
    MissingBodyNode(String),

    #[error("wheel node '{0}' not found in scene")]
    MissingNode(String),

    #[error("no wheel axles configured or discovered")]
    NoAxles,

    #[error("vehicle has not been created")]
    NotCreated,

    #[error("wheel index {0} out of range")]
    WheelIndex(usize),

    #[error(transparent)]
    Physics(#[from] PhysicsError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read tuning file: {0}")]
    Io(#[from] std::io::Error),

    #[error("unable to parse tuning file: {0}")]
    Parse(#[from] serde_json::Error),
}
