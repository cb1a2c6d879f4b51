//! Error kinds for the controller, independent of where they're raised.
//!
//! Matches the propagation policy in spec §7: transport and decode errors
//! are local to the operation that hit them and collapse to "no result" one
//! layer up; this enum exists mainly so log lines and the rare `Result`
//! that does cross a module boundary carry a stable reason code.

use std::fmt;

#[derive(Debug)]
pub enum ControllerError {
    /// Compositor socket missing or connection refused.
    TransportUnavailable(String),
    /// Non-JSON or truncated response from a query.
    MalformedResponse(String),
    /// A control-socket strategy was invoked with too few arguments.
    MissingInput(String),
    /// The controller's tracked workspace differs from the compositor's.
    StateDesync { tracked: i64, active: i64 },
    /// Command name not present in the strategy table.
    UnknownCommand(String),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::TransportUnavailable(detail) => {
                write!(f, "compositor socket unavailable: {}", detail)
            }
            ControllerError::MalformedResponse(detail) => {
                write!(f, "malformed compositor response: {}", detail)
            }
            ControllerError::MissingInput(detail) => {
                write!(f, "missing input: {}", detail)
            }
            ControllerError::StateDesync { tracked, active } => {
                write!(
                    f,
                    "tracked workspace {} differs from active workspace {}",
                    tracked, active
                )
            }
            ControllerError::UnknownCommand(name) => {
                write!(f, "unknown command: {}", name)
            }
        }
    }
}

impl std::error::Error for ControllerError {}

pub type Result<T> = std::result::Result<T, ControllerError>;
