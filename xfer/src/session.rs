use xfer_engine::{
    Engine, Handle, HyperEngine, Info, InfoMap, InfoValue, Opt, OptValue, Payload, TransferFault,
    ValueKind,
};

use crate::error::{Error, Result};

/// Value returned by the dynamic [`Session::property`] accessor.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Str(String),
    Long(i64),
}

/// One transfer session: exclusive owner of one engine handle for the
/// lifetime of the value.
///
/// The lifecycle is `open → configure* → (execute)* → close`, where
/// configuring and executing may interleave arbitrarily. Dropping the session
/// releases the handle on every exit path; [`Session::close`] is the explicit
/// early release.
///
/// A session is single-owner state: it is not meant to be shared between
/// threads. Independent sessions run concurrently without restriction.
///
/// ```no_run
/// use xfer::Session;
///
/// # fn main() -> xfer::Result<()> {
/// let mut session = Session::open(Some("http://example.test/feed.json"))?;
/// let payload = session.set_return_transfer(true)?.execute()?;
/// println!("{} -> {:?}", session.get_http_code()?, payload.utf8());
/// # Ok(())
/// # }
/// ```
pub struct Session {
    handle: Option<Box<dyn Handle>>,
    headers: Vec<String>,
    pre_cmds: Vec<String>,
    post_cmds: Vec<String>,
    aliases: Vec<String>,
    last_fault: Option<(i64, String)>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("open", &self.handle.is_some())
            .field("headers", &self.headers)
            .field("pre_cmds", &self.pre_cmds)
            .field("post_cmds", &self.post_cmds)
            .field("aliases", &self.aliases)
            .field("last_fault", &self.last_fault)
            .finish()
    }
}

impl Session {
    /// Open a session on the bundled engine, optionally pre-targeted at
    /// `url`.
    pub fn open(url: Option<&str>) -> Result<Self> {
        let engine = HyperEngine::new().map_err(|e| Error::ResourceExhausted(e.0))?;
        Self::with_engine(&engine, url)
    }

    /// Open a session on a caller-supplied engine.
    pub fn with_engine(engine: &dyn Engine, url: Option<&str>) -> Result<Self> {
        let handle = engine
            .open(url)
            .map_err(|e| Error::ResourceExhausted(e.0))?;
        Ok(Self {
            handle: Some(handle),
            headers: Vec::new(),
            pre_cmds: Vec::new(),
            post_cmds: Vec::new(),
            aliases: Vec::new(),
            last_fault: None,
        })
    }

    fn handle_mut(&mut self) -> Result<&mut (dyn Handle + 'static)> {
        self.handle.as_deref_mut().ok_or(Error::InvalidSession)
    }

    fn record_fault(&mut self, fault: TransferFault) -> Error {
        self.last_fault = Some((fault.code, fault.message.clone()));
        if fault.fatal {
            // The engine invalidated the handle; refuse further use.
            self.handle = None;
        }
        Error::Transfer {
            code: fault.code,
            message: fault.message,
        }
    }

    /// Record one configuration switch, validating the value kind against
    /// the option table before anything reaches the engine.
    pub fn set_option(&mut self, opt: Opt, value: OptValue) -> Result<&mut Self> {
        let value = coerce(opt, value)?;
        match self.handle_mut()?.set_option(opt, value) {
            Ok(()) => Ok(self),
            Err(fault) => Err(self.record_fault(fault)),
        }
    }

    /// Perform the configured transfer synchronously. Blocks the calling
    /// thread for the full network operation; callback hooks run on this
    /// thread.
    pub fn execute(&mut self) -> Result<Payload> {
        // Validate the handle before touching the fault cache: a closed or
        // invalidated session must keep reporting its last fault.
        if self.handle.is_none() {
            return Err(Error::InvalidSession);
        }
        self.last_fault = None;
        match self.handle_mut()?.perform() {
            Ok(payload) => Ok(payload),
            Err(fault) => Err(self.record_fault(fault)),
        }
    }

    /// One post-transfer field. `NotAvailable` until a transfer completed.
    pub fn get_info(&self, field: Info) -> Result<InfoValue> {
        let handle = self.handle.as_deref().ok_or(Error::InvalidSession)?;
        handle.info(field).ok_or(Error::NotAvailable)
    }

    /// The full post-transfer field set.
    pub fn get_info_all(&self) -> Result<InfoMap> {
        let handle = self.handle.as_deref().ok_or(Error::InvalidSession)?;
        handle.info_all().ok_or(Error::NotAvailable)
    }

    /// Independent clone of the current configuration as a new session;
    /// ownership of the clone transfers to the caller.
    pub fn copy_handle(&self) -> Result<Self> {
        let handle = self.handle.as_deref().ok_or(Error::InvalidSession)?;
        let duplicate = handle
            .duplicate()
            .map_err(|e| Error::ResourceExhausted(e.0))?;
        Ok(Self {
            handle: Some(duplicate),
            headers: self.headers.clone(),
            pre_cmds: self.pre_cmds.clone(),
            post_cmds: self.post_cmds.clone(),
            aliases: self.aliases.clone(),
            last_fault: None,
        })
    }

    /// Release the handle. Idempotent; never fails. After this call every
    /// other operation reports `InvalidSession`.
    pub fn close(&mut self) {
        self.handle = None;
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Native code of the last transfer failure, `0` when the last transfer
    /// succeeded (or none ran yet).
    #[must_use]
    pub fn error_no(&self) -> i64 {
        self.last_fault.as_ref().map_or(0, |(code, _)| *code)
    }

    /// Message of the last transfer failure, empty when none.
    #[must_use]
    pub fn error(&self) -> String {
        self.last_fault
            .as_ref()
            .map_or_else(String::new, |(_, message)| message.clone())
    }

    /// Dynamic property lookup, preserved from the original surface.
    /// Recognized names: `version`, `error_no`, `error`.
    pub fn property(&self, name: &str) -> Result<PropertyValue> {
        match name {
            "version" => Ok(PropertyValue::Str(crate::version())),
            "error_no" => Ok(PropertyValue::Long(self.error_no())),
            "error" => Ok(PropertyValue::Str(self.error())),
            other => Err(Error::UnknownProperty(other.to_string())),
        }
    }

    fn push_list(&mut self, opt: Opt, list: Vec<String>) -> Result<&mut Self> {
        self.set_option(opt, OptValue::List(list))
    }

    /// Append one custom header and re-push the full header list. Order is
    /// preserved; duplicates are kept.
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        self.headers.push(format!("{name}: {value}"));
        let list = self.headers.clone();
        self.push_list(Opt::HttpHeader, list)
    }

    /// Append one pre-request command and re-push the full list.
    pub fn add_pre_command(&mut self, command: &str) -> Result<&mut Self> {
        self.pre_cmds.push(command.to_string());
        let list = self.pre_cmds.clone();
        self.push_list(Opt::Quote, list)
    }

    /// Append one post-request command and re-push the full list.
    pub fn add_post_command(&mut self, command: &str) -> Result<&mut Self> {
        self.post_cmds.push(command.to_string());
        let list = self.post_cmds.clone();
        self.push_list(Opt::PostQuote, list)
    }

    /// Append one status code to treat as success and re-push the full list.
    pub fn add_status_alias(&mut self, status: u16) -> Result<&mut Self> {
        self.aliases.push(status.to_string());
        let list = self.aliases.clone();
        self.push_list(Opt::Http200Aliases, list)
    }

    /// Replace the custom header list wholesale.
    pub fn set_http_header(&mut self, headers: Vec<String>) -> Result<&mut Self> {
        self.headers = headers.clone();
        self.push_list(Opt::HttpHeader, headers)
    }

    /// Replace the pre-request command list wholesale.
    pub fn set_quote(&mut self, commands: Vec<String>) -> Result<&mut Self> {
        self.pre_cmds = commands.clone();
        self.push_list(Opt::Quote, commands)
    }

    /// Replace the post-request command list wholesale.
    pub fn set_post_quote(&mut self, commands: Vec<String>) -> Result<&mut Self> {
        self.post_cmds = commands.clone();
        self.push_list(Opt::PostQuote, commands)
    }

    /// Replace the success-alias list wholesale.
    pub fn set_http200_aliases(&mut self, aliases: Vec<String>) -> Result<&mut Self> {
        self.aliases = aliases.clone();
        self.push_list(Opt::Http200Aliases, aliases)
    }
}

/// Kind-check a value against the option table, canonicalizing flags to the
/// engine's long representation. Flag options also accept plain longs, and
/// long options accept flags, matching the engine's own treatment of both as
/// longs on the wire.
fn coerce(opt: Opt, value: OptValue) -> Result<OptValue> {
    let expected = opt.value_kind();
    let got = value.kind();
    let compatible = got == expected
        || matches!(
            (expected, got),
            (ValueKind::Bool, ValueKind::Long) | (ValueKind::Long, ValueKind::Bool)
        );
    if !compatible {
        return Err(Error::TypeMismatch {
            opt,
            expected,
            got,
        });
    }
    match value {
        OptValue::Bool(flag) => Ok(OptValue::Long(i64::from(flag))),
        other => Ok(other),
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! A scripted engine double: records every forwarded option and replays
    //! configured outcomes, so session behavior is testable without a
    //! network.

    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use xfer_engine::{
        AllocError, Engine, Handle, Info, InfoMap, InfoValue, Opt, OptValue, Payload,
        TransferFault,
    };

    #[derive(Debug, Clone)]
    pub enum Outcome {
        Success {
            status: u16,
            body: &'static str,
            header_block: &'static str,
        },
        Fault {
            code: i64,
            message: &'static str,
            fatal: bool,
        },
    }

    impl Default for Outcome {
        fn default() -> Self {
            Self::Success {
                status: 200,
                body: "ok",
                header_block: "HTTP/1.1 200 OK\r\n\r\n",
            }
        }
    }

    #[derive(Default)]
    pub struct State {
        pub options: Vec<(Opt, OptValue)>,
        pub outcomes: VecDeque<Outcome>,
        pub performs: usize,
    }

    #[derive(Default)]
    pub struct MockEngine {
        pub state: Arc<Mutex<State>>,
        pub fail_alloc: bool,
    }

    impl MockEngine {
        pub fn scripted(outcomes: Vec<Outcome>) -> Self {
            let engine = Self::default();
            lock(&engine.state).outcomes = outcomes.into();
            engine
        }

        pub fn recorded(&self) -> Vec<(Opt, OptValue)> {
            lock(&self.state).options.clone()
        }

        pub fn last_value(&self, opt: Opt) -> Option<OptValue> {
            lock(&self.state)
                .options
                .iter()
                .rev()
                .find(|(o, _)| *o == opt)
                .map(|(_, v)| v.clone())
        }
    }

    pub fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
        m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    impl Engine for MockEngine {
        fn open(&self, url: Option<&str>) -> Result<Box<dyn Handle>, AllocError> {
            if self.fail_alloc {
                return Err(AllocError("mock allocation failure".to_string()));
            }
            Ok(Box::new(MockHandle {
                state: Arc::clone(&self.state),
                url: url.map(str::to_string),
                outcome: None,
            }))
        }

        fn version(&self) -> String {
            "mock-engine/0".to_string()
        }
    }

    struct MockHandle {
        state: Arc<Mutex<State>>,
        url: Option<String>,
        outcome: Option<InfoMap>,
    }

    impl MockHandle {
        fn flag(&self, opt: Opt) -> bool {
            lock(&self.state)
                .options
                .iter()
                .rev()
                .find(|(o, _)| *o == opt)
                .and_then(|(_, v)| v.as_long())
                == Some(1)
        }

        fn effective_url(&self) -> String {
            lock(&self.state)
                .options
                .iter()
                .rev()
                .find(|(o, _)| *o == Opt::Url)
                .and_then(|(_, v)| v.as_str().map(str::to_string))
                .or_else(|| self.url.clone())
                .unwrap_or_default()
        }
    }

    impl Handle for MockHandle {
        fn set_option(&mut self, opt: Opt, value: OptValue) -> Result<(), TransferFault> {
            lock(&self.state).options.push((opt, value));
            Ok(())
        }

        fn perform(&mut self) -> Result<Payload, TransferFault> {
            let outcome = {
                let mut state = lock(&self.state);
                state.performs += 1;
                state.outcomes.pop_front().unwrap_or_default()
            };

            match outcome {
                Outcome::Fault {
                    code,
                    message,
                    fatal,
                } => Err(TransferFault {
                    code,
                    message: message.to_string(),
                    fatal,
                }),
                Outcome::Success {
                    status,
                    body,
                    header_block,
                } => {
                    let mut info = InfoMap::new();
                    info.insert(Info::HttpCode, InfoValue::Long(i64::from(status)));
                    info.insert(Info::EffectiveUrl, InfoValue::Str(self.effective_url()));
                    info.insert(Info::SizeDownload, InfoValue::Double(body.len() as f64));
                    self.outcome = Some(info);

                    // Header-only mode returns exactly the header block.
                    let text = if self.flag(Opt::Header) && self.flag(Opt::Nobody) {
                        header_block
                    } else {
                        body
                    };
                    if self.flag(Opt::ReturnTransfer) {
                        Ok(Payload::Captured(Bytes::from_static(text.as_bytes())))
                    } else {
                        Ok(Payload::Streamed)
                    }
                }
            }
        }

        fn info(&self, field: Info) -> Option<InfoValue> {
            self.outcome.as_ref().and_then(|m| m.get(&field).cloned())
        }

        fn info_all(&self) -> Option<InfoMap> {
            self.outcome.clone()
        }

        fn duplicate(&self) -> Result<Box<dyn Handle>, AllocError> {
            // The clone records into its own state, seeded with the current
            // configuration.
            let seeded = State {
                options: lock(&self.state).options.clone(),
                outcomes: VecDeque::new(),
                performs: 0,
            };
            Ok(Box::new(MockHandle {
                state: Arc::new(Mutex::new(seeded)),
                url: self.url.clone(),
                outcome: None,
            }))
        }
    }
}
