use thiserror::Error;

/// Setup-time failures. Per-tick steering math never returns an error:
/// degenerate cases fall back to a zero force or retained state so a
/// single bad tick can never halt the simulation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteeringError {
    #[error("path has no waypoints")]
    EmptyPath,

    #[error("path reached its waypoint capacity")]
    PathCapacity,

    #[error("no vehicle with id {0}")]
    UnknownVehicle(u32),
}
