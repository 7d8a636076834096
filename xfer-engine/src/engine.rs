use bytes::Bytes;

use crate::info::{Info, InfoMap, InfoValue};
use crate::opt::Opt;
use crate::value::OptValue;

/// Native fault codes reported through [`TransferFault::code`], using the
/// engine's published numbering for diagnosability.
pub mod code {
    pub const UNSUPPORTED_PROTOCOL: i64 = 1;
    pub const URL_MALFORMAT: i64 = 3;
    pub const COULDNT_RESOLVE_PROXY: i64 = 5;
    pub const COULDNT_RESOLVE_HOST: i64 = 6;
    pub const COULDNT_CONNECT: i64 = 7;
    pub const HTTP_RETURNED_ERROR: i64 = 22;
    pub const WRITE_ERROR: i64 = 23;
    pub const READ_ERROR: i64 = 26;
    pub const OPERATION_TIMEDOUT: i64 = 28;
    pub const SSL_CONNECT_ERROR: i64 = 35;
    pub const ABORTED_BY_CALLBACK: i64 = 42;
    pub const BAD_FUNCTION_ARGUMENT: i64 = 43;
    pub const TOO_MANY_REDIRECTS: i64 = 47;
    pub const RECV_ERROR: i64 = 56;
}

/// A failure reported by the engine, passed through verbatim to callers.
///
/// `fatal` marks the handle as invalidated: the owning session must refuse
/// further use and surface `InvalidSession` instead.
#[derive(Debug, Clone, thiserror::Error)]
#[error("engine error {code}: {message}")]
pub struct TransferFault {
    pub code: i64,
    pub message: String,
    pub fatal: bool,
}

impl TransferFault {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            fatal: false,
        }
    }
}

/// Handle allocation failure (construction-time, environment-level).
#[derive(Debug, thiserror::Error)]
#[error("engine could not allocate a transfer handle: {0}")]
pub struct AllocError(pub String);

/// Result of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// The body went to the configured output target (default: stdout).
    Streamed,
    /// Return-as-value was set; the payload comes back directly.
    Captured(Bytes),
}

impl Payload {
    #[must_use]
    pub fn bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Captured(b) => Some(b),
            Self::Streamed => None,
        }
    }

    #[must_use]
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            Self::Captured(b) => Some(b),
            Self::Streamed => None,
        }
    }

    #[must_use]
    pub fn utf8(&self) -> Option<&str> {
        self.bytes().and_then(|b| std::str::from_utf8(b).ok())
    }
}

/// A transfer engine: allocates handles and answers static queries.
pub trait Engine {
    /// Acquire one transfer handle, optionally pre-targeted at `url`.
    fn open(&self, url: Option<&str>) -> Result<Box<dyn Handle>, AllocError>;

    /// Engine version string. Does not require a live handle.
    fn version(&self) -> String;
}

/// One exclusively-owned per-transfer state object.
///
/// Not safe for concurrent use; one logical owner at a time. Releasing the
/// underlying resource is dropping the box.
pub trait Handle {
    /// Record one configuration switch. The caller has already validated the
    /// value's kind against the option table.
    fn set_option(&mut self, opt: Opt, value: OptValue) -> Result<(), TransferFault>;

    /// Perform the configured transfer synchronously, blocking the calling
    /// thread for the full network operation. Callback hooks run on this
    /// same thread.
    fn perform(&mut self) -> Result<Payload, TransferFault>;

    /// One post-transfer field, or `None` while no transfer has completed.
    fn info(&self, field: Info) -> Option<InfoValue>;

    /// The full post-transfer field set, or `None` while no transfer has
    /// completed.
    fn info_all(&self) -> Option<InfoMap>;

    /// Independent clone of the current configuration as a new handle.
    fn duplicate(&self) -> Result<Box<dyn Handle>, AllocError>;
}
