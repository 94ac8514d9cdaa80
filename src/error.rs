use crate::deferred::Status;
use thiserror::Error;

/// Returned when the value of a deferred is requested but it is not resolved.
#[derive(Error, Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[error("deferred is not resolved, status: {status:?}")]
pub struct NotResolved {
    pub status: Status,
}
