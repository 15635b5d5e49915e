use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("interview is already finished; no further mutation is permitted")]
    SessionFinished,
    #[error("unknown slot key `{0}`")]
    UnknownSlot(String),
    #[error("no slot is currently in focus")]
    NoFocusSlot,
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}
