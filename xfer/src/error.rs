use xfer_engine::{Opt, ValueKind};

pub type Result<T> = std::result::Result<T, Error>;

/// Session-level failure taxonomy. Every failure is surfaced directly to the
/// caller; nothing is swallowed or retried internally.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The engine could not allocate a transfer handle (construction-time,
    /// environment-level).
    #[error("engine could not allocate a transfer handle: {0}")]
    ResourceExhausted(String),

    /// The supplied value does not match the option's declared kind. Caught
    /// locally; the engine is never reached.
    #[error("option {opt} expects a {expected} value, got {got}")]
    TypeMismatch {
        opt: Opt,
        expected: ValueKind,
        got: ValueKind,
    },

    /// The engine reported a failure during the transfer; code and message
    /// pass through verbatim for diagnosability.
    #[error("transfer failed (engine code {code}): {message}")]
    Transfer { code: i64, message: String },

    /// An info query was made before any transfer completed.
    #[error("no transfer has completed yet")]
    NotAvailable,

    /// The session was closed, or the engine invalidated its handle.
    #[error("session is closed or its handle was invalidated")]
    InvalidSession,

    /// A dynamic property query used an unrecognized name.
    #[error("unknown property {0:?}")]
    UnknownProperty(String),
}

impl Error {
    /// The engine's native code for transfer failures, when applicable.
    #[must_use]
    pub fn engine_code(&self) -> Option<i64> {
        match self {
            Self::Transfer { code, .. } => Some(*code),
            _ => None,
        }
    }
}
