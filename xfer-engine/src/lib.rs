#![forbid(unsafe_code)]

mod engine;
mod framing;
mod info;
mod native;
mod opt;
mod tls;
mod value;

pub use engine::{AllocError, Engine, Handle, Payload, TransferFault, code};
pub use info::{Info, InfoKind, InfoMap, InfoValue};
pub use native::HyperEngine;
pub use opt::Opt;
pub use value::{
    HeaderFn, OptValue, PasswdFn, ProgressFn, ReadFn, SharedReader, SharedWriter, ValueKind,
    WriteFn, shared_reader, shared_writer,
};
