// Fatal error taxonomy. Degraded sensor input is never an error here - every
// component has a defined degraded output instead. Only programmer errors
// (malformed configuration) and lifecycle misuse surface as Err.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("zone table is malformed: {0}")]
    InvalidZoneTable(String),

    #[error("engine configuration is invalid: {0}")]
    InvalidConfig(String),

    #[error("engine loop is already running")]
    AlreadyRunning,

    #[error("engine loop is not running")]
    NotRunning,
}
