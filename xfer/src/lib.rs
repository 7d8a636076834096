//! A thin session-oriented facade over an HTTP transfer engine.
//!
//! [`Session`] wraps one engine handle: configure it with
//! [`Session::set_option`] (or the typed `set_*` convenience setters), run
//! the transfer with [`Session::execute`], and read post-transfer facts with
//! [`Session::get_info`] (or the typed `get_*` getters). Options and info
//! fields are keyed by the [`Opt`] and [`Info`] enumerations, which carry
//! the engine's native numeric identifiers for interoperability.
//!
//! The bundled engine performs blocking HTTP/HTTPS transfers; the
//! [`Engine`] trait is the seam for substituting another one.

#![forbid(unsafe_code)]

mod error;
mod session;
mod setters;

pub use error::{Error, Result};
pub use session::{PropertyValue, Session};
pub use xfer_engine::{
    Engine, Handle, Info, InfoKind, InfoMap, InfoValue, Opt, OptValue, Payload, TransferFault,
    ValueKind, code, shared_reader, shared_writer,
};

/// Version string of the library and its bundled engine.
#[must_use]
pub fn version() -> String {
    xfer_engine::HyperEngine::version_str()
}
