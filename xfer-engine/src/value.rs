use std::fmt;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// Output target an engine writes into (body, header block, or diagnostics).
///
/// Shared and lockable so a duplicated handle keeps pointing at the same sink,
/// matching how the engine copies a callback pointer rather than the stream.
pub type SharedWriter = Arc<Mutex<dyn Write + Send>>;

/// Input source an engine reads an upload body from.
pub type SharedReader = Arc<Mutex<dyn Read + Send>>;

/// Body-data callback. Returns the number of bytes it consumed; consuming
/// less than offered aborts the transfer with a write error.
pub type WriteFn = Arc<Mutex<dyn FnMut(&[u8]) -> usize + Send>>;

/// Header callback, invoked once per received header line (status line and
/// terminating blank line included). Same consumption contract as [`WriteFn`].
pub type HeaderFn = Arc<Mutex<dyn FnMut(&[u8]) -> usize + Send>>;

/// Progress callback: `(dl_total, dl_now, ul_total, ul_now)`. Returning
/// `true` aborts the transfer.
pub type ProgressFn = Arc<Mutex<dyn FnMut(f64, f64, f64, f64) -> bool + Send>>;

/// Upload-data callback. Fills the buffer and returns the byte count;
/// returning 0 signals end of data.
pub type ReadFn = Arc<Mutex<dyn FnMut(&mut [u8]) -> usize + Send>>;

/// Password-prompt callback: given a prompt, returns the password or `None`
/// to decline.
pub type PasswdFn = Arc<Mutex<dyn FnMut(&str) -> Option<String> + Send>>;

pub fn shared_writer(w: impl Write + Send + 'static) -> SharedWriter {
    Arc::new(Mutex::new(w))
}

pub fn shared_reader(r: impl Read + Send + 'static) -> SharedReader {
    Arc::new(Mutex::new(r))
}

/// Lock a shared sink/source, recovering from poisoning (a panicked callback
/// must not wedge the session).
pub(crate) fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Declared value shape for an option, checked before anything reaches the
/// engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ValueKind {
    Bool,
    Long,
    Str,
    List,
    Writer,
    Reader,
    WriteFn,
    HeaderFn,
    ProgressFn,
    ReadFn,
    PasswdFn,
}

/// A configuration value, one variant per [`ValueKind`].
#[derive(Clone)]
pub enum OptValue {
    Bool(bool),
    Long(i64),
    Str(String),
    List(Vec<String>),
    Writer(SharedWriter),
    Reader(SharedReader),
    WriteFn(WriteFn),
    HeaderFn(HeaderFn),
    ProgressFn(ProgressFn),
    ReadFn(ReadFn),
    PasswdFn(PasswdFn),
}

impl OptValue {
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Long(_) => ValueKind::Long,
            Self::Str(_) => ValueKind::Str,
            Self::List(_) => ValueKind::List,
            Self::Writer(_) => ValueKind::Writer,
            Self::Reader(_) => ValueKind::Reader,
            Self::WriteFn(_) => ValueKind::WriteFn,
            Self::HeaderFn(_) => ValueKind::HeaderFn,
            Self::ProgressFn(_) => ValueKind::ProgressFn,
            Self::ReadFn(_) => ValueKind::ReadFn,
            Self::PasswdFn(_) => ValueKind::PasswdFn,
        }
    }

    #[must_use]
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(v) => Some(*v),
            Self::Bool(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn write_fn(f: impl FnMut(&[u8]) -> usize + Send + 'static) -> Self {
        Self::WriteFn(Arc::new(Mutex::new(f)))
    }

    pub fn header_fn(f: impl FnMut(&[u8]) -> usize + Send + 'static) -> Self {
        Self::HeaderFn(Arc::new(Mutex::new(f)))
    }

    pub fn progress_fn(f: impl FnMut(f64, f64, f64, f64) -> bool + Send + 'static) -> Self {
        Self::ProgressFn(Arc::new(Mutex::new(f)))
    }

    pub fn read_fn(f: impl FnMut(&mut [u8]) -> usize + Send + 'static) -> Self {
        Self::ReadFn(Arc::new(Mutex::new(f)))
    }

    pub fn passwd_fn(f: impl FnMut(&str) -> Option<String> + Send + 'static) -> Self {
        Self::PasswdFn(Arc::new(Mutex::new(f)))
    }
}

impl fmt::Debug for OptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Self::Long(v) => f.debug_tuple("Long").field(v).finish(),
            Self::Str(v) => f.debug_tuple("Str").field(v).finish(),
            Self::List(v) => f.debug_tuple("List").field(v).finish(),
            Self::Writer(_) => f.write_str("Writer(..)"),
            Self::Reader(_) => f.write_str("Reader(..)"),
            Self::WriteFn(_) => f.write_str("WriteFn(..)"),
            Self::HeaderFn(_) => f.write_str("HeaderFn(..)"),
            Self::ProgressFn(_) => f.write_str("ProgressFn(..)"),
            Self::ReadFn(_) => f.write_str("ReadFn(..)"),
            Self::PasswdFn(_) => f.write_str("PasswdFn(..)"),
        }
    }
}

impl From<bool> for OptValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for OptValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<&str> for OptValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for OptValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<String>> for OptValue {
    fn from(v: Vec<String>) -> Self {
        Self::List(v)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(OptValue::Bool(true).kind(), ValueKind::Bool);
        assert_eq!(OptValue::Long(5).kind(), ValueKind::Long);
        assert_eq!(OptValue::from("x").kind(), ValueKind::Str);
        assert_eq!(OptValue::from(vec!["a".to_string()]).kind(), ValueKind::List);
        assert_eq!(OptValue::write_fn(|b| b.len()).kind(), ValueKind::WriteFn);
    }

    #[test]
    fn as_long_coerces_bool() {
        assert_eq!(OptValue::Bool(true).as_long(), Some(1));
        assert_eq!(OptValue::Bool(false).as_long(), Some(0));
        assert_eq!(OptValue::from("x").as_long(), None);
    }

    #[test]
    fn debug_elides_opaque_variants() {
        let v = OptValue::progress_fn(|_, _, _, _| false);
        assert_eq!(format!("{v:?}"), "ProgressFn(..)");
    }
}
