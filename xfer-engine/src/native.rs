//! The bundled blocking transfer engine, built on hyper.
//!
//! One engine owns one tokio runtime; every handle performs its transfer by
//! blocking on that runtime from the calling thread, so callback hooks run on
//! the thread that called `perform`. Options outside the engine's HTTP
//! feature set (FTP command lists, engine-global cache knobs) are accepted
//! and recorded but have no wire effect, the same way the native engine
//! accepts options irrelevant to the active protocol.

use std::io::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant, UNIX_EPOCH};

use base64::Engine as _;
use bytes::{Bytes, BytesMut};
use http_body_util::{BodyExt as _, Full};
use hyper::Request;
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tokio::runtime::Runtime;

use crate::engine::{AllocError, Engine, Handle, Payload, TransferFault, code};
use crate::framing;
use crate::info::{Info, InfoMap, InfoValue};
use crate::opt::Opt;
use crate::value::{
    HeaderFn, OptValue, PasswdFn, ProgressFn, ReadFn, SharedReader, SharedWriter, ValueKind,
    WriteFn, lock,
};

/// Blocking HTTP(S) engine backed by hyper.
pub struct HyperEngine {
    runtime: Arc<Runtime>,
}

impl HyperEngine {
    pub fn new() -> Result<Self, AllocError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AllocError(e.to_string()))?;
        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }

    /// Engine identification; available without allocating a runtime.
    #[must_use]
    pub fn version_str() -> String {
        format!("xfer-engine/{} hyper/1", env!("CARGO_PKG_VERSION"))
    }
}

impl Engine for HyperEngine {
    fn open(&self, url: Option<&str>) -> Result<Box<dyn Handle>, AllocError> {
        let mut opts = OptState::default();
        opts.url = url.map(str::to_string);
        Ok(Box::new(NativeHandle {
            runtime: Arc::clone(&self.runtime),
            opts,
            outcome: None,
        }))
    }

    fn version(&self) -> String {
        Self::version_str()
    }
}

/// Configuration accumulated on one handle. Callback and stream values are
/// shared references, so a duplicated handle keeps pointing at the same
/// hooks, as the native engine copies callback pointers on duplication.
#[derive(Clone)]
struct OptState {
    url: Option<String>,
    port: Option<i64>,
    custom_request: Option<String>,
    http_get: bool,
    post: bool,
    nobody: bool,
    upload: bool,
    post_fields: Option<String>,
    headers: Vec<String>,
    aliases: Vec<String>,
    pre_cmds: Vec<String>,
    post_cmds: Vec<String>,
    user_agent: Option<String>,
    referer: Option<String>,
    cookie: Option<String>,
    range: Option<String>,
    encoding: Option<String>,
    user_pwd: Option<String>,
    follow_location: bool,
    max_redirs: i64,
    unrestricted_auth: bool,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    return_transfer: bool,
    include_header: bool,
    fail_on_error: bool,
    verbose: bool,
    no_progress: bool,
    want_filetime: bool,
    ssl_verify_peer: bool,
    file: Option<SharedWriter>,
    write_header: Option<SharedWriter>,
    stderr: Option<SharedWriter>,
    infile: Option<SharedReader>,
    infile_size: Option<i64>,
    write_fn: Option<WriteFn>,
    header_fn: Option<HeaderFn>,
    progress_fn: Option<ProgressFn>,
    read_fn: Option<ReadFn>,
    passwd_fn: Option<PasswdFn>,
    /// Recorded switches with no wire effect in this engine.
    inert: Vec<(Opt, OptValue)>,
}

impl Default for OptState {
    fn default() -> Self {
        Self {
            url: None,
            port: None,
            custom_request: None,
            http_get: false,
            post: false,
            nobody: false,
            upload: false,
            post_fields: None,
            headers: Vec::new(),
            aliases: Vec::new(),
            pre_cmds: Vec::new(),
            post_cmds: Vec::new(),
            user_agent: None,
            referer: None,
            cookie: None,
            range: None,
            encoding: None,
            user_pwd: None,
            follow_location: false,
            // Native default: unlimited redirects once following is enabled.
            max_redirs: -1,
            unrestricted_auth: false,
            timeout: None,
            connect_timeout: None,
            return_transfer: false,
            include_header: false,
            fail_on_error: false,
            verbose: false,
            // Native default: progress reporting off until requested.
            no_progress: true,
            want_filetime: false,
            ssl_verify_peer: true,
            file: None,
            write_header: None,
            stderr: None,
            infile: None,
            infile_size: None,
            write_fn: None,
            header_fn: None,
            progress_fn: None,
            read_fn: None,
            passwd_fn: None,
            inert: Vec::new(),
        }
    }
}

struct NativeHandle {
    runtime: Arc<Runtime>,
    opts: OptState,
    outcome: Option<InfoMap>,
}

fn bad_argument(opt: Opt, expected: ValueKind) -> TransferFault {
    TransferFault::new(
        code::BAD_FUNCTION_ARGUMENT,
        format!("option {opt} expects a {expected} value"),
    )
}

fn want_bool(opt: Opt, value: &OptValue) -> Result<bool, TransferFault> {
    value
        .as_long()
        .map(|v| v != 0)
        .ok_or_else(|| bad_argument(opt, ValueKind::Bool))
}

fn want_long(opt: Opt, value: &OptValue) -> Result<i64, TransferFault> {
    value
        .as_long()
        .ok_or_else(|| bad_argument(opt, ValueKind::Long))
}

fn want_str(opt: Opt, value: OptValue) -> Result<String, TransferFault> {
    match value {
        OptValue::Str(s) => Ok(s),
        _ => Err(bad_argument(opt, ValueKind::Str)),
    }
}

fn want_list(opt: Opt, value: OptValue) -> Result<Vec<String>, TransferFault> {
    match value {
        OptValue::List(l) => Ok(l),
        _ => Err(bad_argument(opt, ValueKind::List)),
    }
}

fn want_writer(opt: Opt, value: OptValue) -> Result<SharedWriter, TransferFault> {
    match value {
        OptValue::Writer(w) => Ok(w),
        _ => Err(bad_argument(opt, ValueKind::Writer)),
    }
}

impl Handle for NativeHandle {
    fn set_option(&mut self, opt: Opt, value: OptValue) -> Result<(), TransferFault> {
        let opts = &mut self.opts;
        match opt {
            Opt::Url => opts.url = Some(want_str(opt, value)?),
            Opt::Port => opts.port = Some(want_long(opt, &value)?),
            Opt::CustomRequest => opts.custom_request = Some(want_str(opt, value)?),
            Opt::HttpGet => {
                opts.http_get = want_bool(opt, &value)?;
                if opts.http_get {
                    opts.post = false;
                    opts.upload = false;
                    opts.nobody = false;
                }
            }
            Opt::Post => opts.post = want_bool(opt, &value)?,
            Opt::Nobody => opts.nobody = want_bool(opt, &value)?,
            Opt::Upload | Opt::Put => opts.upload = want_bool(opt, &value)?,
            Opt::PostFields => {
                opts.post_fields = Some(want_str(opt, value)?);
                opts.post = true;
            }
            Opt::HttpHeader => opts.headers = want_list(opt, value)?,
            Opt::Http200Aliases => opts.aliases = want_list(opt, value)?,
            Opt::Quote => opts.pre_cmds = want_list(opt, value)?,
            Opt::PostQuote => opts.post_cmds = want_list(opt, value)?,
            Opt::UserAgent => opts.user_agent = Some(want_str(opt, value)?),
            Opt::Referer => opts.referer = Some(want_str(opt, value)?),
            Opt::Cookie => opts.cookie = Some(want_str(opt, value)?),
            Opt::Range => opts.range = Some(want_str(opt, value)?),
            Opt::Encoding => opts.encoding = Some(want_str(opt, value)?),
            Opt::UserPwd => opts.user_pwd = Some(want_str(opt, value)?),
            Opt::FollowLocation => opts.follow_location = want_bool(opt, &value)?,
            Opt::MaxRedirs => opts.max_redirs = want_long(opt, &value)?,
            Opt::UnrestrictedAuth => opts.unrestricted_auth = want_bool(opt, &value)?,
            Opt::Timeout => {
                opts.timeout = duration_opt(want_long(opt, &value)?, 1000);
            }
            Opt::TimeoutMs => {
                opts.timeout = duration_opt(want_long(opt, &value)?, 1);
            }
            Opt::ConnectTimeout => {
                opts.connect_timeout = duration_opt(want_long(opt, &value)?, 1000);
            }
            Opt::ConnectTimeoutMs => {
                opts.connect_timeout = duration_opt(want_long(opt, &value)?, 1);
            }
            Opt::ReturnTransfer => opts.return_transfer = want_bool(opt, &value)?,
            Opt::Header => opts.include_header = want_bool(opt, &value)?,
            Opt::FailOnError => opts.fail_on_error = want_bool(opt, &value)?,
            Opt::Verbose => opts.verbose = want_bool(opt, &value)?,
            Opt::NoProgress => opts.no_progress = want_bool(opt, &value)?,
            Opt::FileTime => opts.want_filetime = want_bool(opt, &value)?,
            Opt::SslVerifyPeer => opts.ssl_verify_peer = want_bool(opt, &value)?,
            Opt::File => opts.file = Some(want_writer(opt, value)?),
            Opt::WriteHeader => opts.write_header = Some(want_writer(opt, value)?),
            Opt::Stderr => opts.stderr = Some(want_writer(opt, value)?),
            Opt::Infile => match value {
                OptValue::Reader(r) => opts.infile = Some(r),
                _ => return Err(bad_argument(opt, ValueKind::Reader)),
            },
            Opt::InfileSize => opts.infile_size = Some(want_long(opt, &value)?),
            Opt::WriteFunction => match value {
                OptValue::WriteFn(f) => opts.write_fn = Some(f),
                _ => return Err(bad_argument(opt, ValueKind::WriteFn)),
            },
            Opt::HeaderFunction => match value {
                OptValue::HeaderFn(f) => opts.header_fn = Some(f),
                _ => return Err(bad_argument(opt, ValueKind::HeaderFn)),
            },
            Opt::ProgressFunction => match value {
                OptValue::ProgressFn(f) => opts.progress_fn = Some(f),
                _ => return Err(bad_argument(opt, ValueKind::ProgressFn)),
            },
            Opt::ReadFunction => match value {
                OptValue::ReadFn(f) => opts.read_fn = Some(f),
                _ => return Err(bad_argument(opt, ValueKind::ReadFn)),
            },
            Opt::PasswdFunction => match value {
                OptValue::PasswdFn(f) => opts.passwd_fn = Some(f),
                _ => return Err(bad_argument(opt, ValueKind::PasswdFn)),
            },
            // No wire effect on this engine; recorded so duplication and
            // re-pushing keep full fidelity.
            _ => opts.inert.push((opt, value)),
        }
        Ok(())
    }

    fn perform(&mut self) -> Result<Payload, TransferFault> {
        let started = Instant::now();
        let plan = RequestPlan::build(&self.opts)?;
        let runtime = Arc::clone(&self.runtime);

        let fut = run_transfer(&self.opts, plan, started);
        let (info, payload) = match self.opts.timeout {
            Some(limit) => runtime.block_on(async {
                match tokio::time::timeout(limit, fut).await {
                    Ok(out) => out,
                    Err(_) => Err(TransferFault::new(
                        code::OPERATION_TIMEDOUT,
                        format!("Operation timed out after {} milliseconds", limit.as_millis()),
                    )),
                }
            })?,
            None => runtime.block_on(fut)?,
        };

        self.outcome = Some(info);
        Ok(payload)
    }

    fn info(&self, field: Info) -> Option<InfoValue> {
        self.outcome.as_ref().and_then(|m| m.get(&field).cloned())
    }

    fn info_all(&self) -> Option<InfoMap> {
        self.outcome.clone()
    }

    fn duplicate(&self) -> Result<Box<dyn Handle>, AllocError> {
        Ok(Box::new(NativeHandle {
            runtime: Arc::clone(&self.runtime),
            opts: self.opts.clone(),
            outcome: None,
        }))
    }
}

fn duration_opt(amount: i64, millis_per_unit: u64) -> Option<Duration> {
    u64::try_from(amount)
        .ok()
        .filter(|v| *v > 0)
        .map(|v| Duration::from_millis(v.saturating_mul(millis_per_unit)))
}

/// Everything resolved before the first connection attempt.
#[derive(Debug)]
struct RequestPlan {
    url: url::Url,
    method: http::Method,
    body: Bytes,
    /// Value for the Authorization header, when credentials are configured.
    auth: Option<String>,
}

impl RequestPlan {
    fn build(opts: &OptState) -> Result<Self, TransferFault> {
        let raw = opts
            .url
            .as_deref()
            .ok_or_else(|| TransferFault::new(code::URL_MALFORMAT, "no URL set"))?;
        let mut url = url::Url::parse(raw)
            .map_err(|e| TransferFault::new(code::URL_MALFORMAT, format!("{raw}: {e}")))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(TransferFault::new(
                code::UNSUPPORTED_PROTOCOL,
                format!("protocol \"{}\" not supported by this engine", url.scheme()),
            ));
        }

        if let Some(port) = opts.port
            && let Ok(port) = u16::try_from(port)
        {
            let _ = url.set_port(Some(port));
        }

        let method = resolve_method(opts)?;
        let body = upload_body(opts)?;
        let auth = auth_header_value(opts);

        Ok(Self {
            url,
            method,
            body,
            auth,
        })
    }
}

fn resolve_method(opts: &OptState) -> Result<http::Method, TransferFault> {
    if let Some(custom) = &opts.custom_request {
        return http::Method::from_bytes(custom.as_bytes()).map_err(|_| {
            TransferFault::new(
                code::BAD_FUNCTION_ARGUMENT,
                format!("invalid request method {custom:?}"),
            )
        });
    }
    if opts.http_get {
        return Ok(http::Method::GET);
    }
    if opts.nobody {
        return Ok(http::Method::HEAD);
    }
    if opts.upload {
        return Ok(http::Method::PUT);
    }
    if opts.post {
        return Ok(http::Method::POST);
    }
    Ok(http::Method::GET)
}

fn upload_body(opts: &OptState) -> Result<Bytes, TransferFault> {
    if opts.upload {
        let limit = opts.infile_size.and_then(|v| usize::try_from(v).ok());
        if let Some(read_fn) = &opts.read_fn {
            let mut read_fn = lock(read_fn);
            let mut out = Vec::new();
            let mut buf = [0u8; 16 * 1024];
            loop {
                let n = (*read_fn)(&mut buf);
                if n == 0 {
                    break;
                }
                out.extend_from_slice(&buf[..n.min(buf.len())]);
                if limit.is_some_and(|l| out.len() >= l) {
                    out.truncate(limit.unwrap_or(out.len()));
                    break;
                }
            }
            return Ok(Bytes::from(out));
        }
        if let Some(infile) = &opts.infile {
            let mut reader = lock(infile);
            let mut out = Vec::new();
            match limit {
                Some(l) => {
                    let mut taken = std::io::Read::take(&mut *reader, l as u64);
                    std::io::Read::read_to_end(&mut taken, &mut out)
                }
                None => std::io::Read::read_to_end(&mut *reader, &mut out),
            }
            .map_err(|e| TransferFault::new(code::READ_ERROR, e.to_string()))?;
            return Ok(Bytes::from(out));
        }
        return Ok(Bytes::new());
    }

    if opts.post {
        return Ok(Bytes::from(
            opts.post_fields.clone().unwrap_or_default().into_bytes(),
        ));
    }

    Ok(Bytes::new())
}

fn auth_header_value(opts: &OptState) -> Option<String> {
    let user_pwd = opts.user_pwd.as_deref()?;
    let credentials = match user_pwd.split_once(':') {
        Some(_) => user_pwd.to_string(),
        None => {
            // No password in the option; consult the password-prompt hook.
            let password = opts.passwd_fn.as_ref().and_then(|f| {
                let mut prompt = lock(f);
                (*prompt)(&format!("password for user {user_pwd}:"))
            })?;
            format!("{user_pwd}:{password}")
        }
    };
    Some(format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(credentials)
    ))
}

fn diag(opts: &OptState, prefix: &str, text: &str) {
    if !opts.verbose {
        return;
    }
    let mut rendered = String::new();
    for line in text.lines() {
        rendered.push_str(prefix);
        rendered.push_str(line);
        rendered.push('\n');
    }
    match &opts.stderr {
        Some(w) => {
            let _ = lock(w).write_all(rendered.as_bytes());
        }
        None => eprint!("{rendered}"),
    }
}

fn has_header(headers: &[(String, String)], name: &str) -> bool {
    headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
}

fn host_header_value(url: &url::Url) -> Option<String> {
    let host = url.host_str()?;
    let default_port = if url.scheme() == "https" { 443 } else { 80 };
    match url.port() {
        Some(port) if port != default_port => Some(format!("{host}:{port}")),
        _ => Some(host.to_string()),
    }
}

/// Whether this response status fails the transfer under fail-on-error,
/// given the caller's accepted status-code aliases.
fn status_is_failure(status: u16, fail_on_error: bool, aliases: &[String]) -> bool {
    if !fail_on_error || status < 400 {
        return false;
    }
    !aliases
        .iter()
        .any(|a| a.trim().parse::<u16>() == Ok(status))
}

fn redirected_method(status: u16, method: &http::Method) -> (http::Method, bool) {
    match status {
        // 303 always rewrites to GET; 301/302 rewrite POST to GET, which is
        // the engine's long-standing default.
        303 => (http::Method::GET, true),
        301 | 302 if *method == http::Method::POST => (http::Method::GET, true),
        _ => (method.clone(), false),
    }
}

fn map_transport_error(e: &hyper_util::client::legacy::Error, url: &url::Url) -> TransferFault {
    let mut chain = Vec::new();
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(e);
    while let Some(err) = source {
        chain.push(err.to_string().to_ascii_lowercase());
        source = err.source();
    }
    let detail = chain.join(": ");

    if detail.contains("lookup") || detail.contains("dns") || detail.contains("resolve") {
        return TransferFault::new(
            code::COULDNT_RESOLVE_HOST,
            format!("Could not resolve host: {}", url.host_str().unwrap_or("?")),
        );
    }
    if detail.contains("certificate")
        || detail.contains("handshake")
        || detail.contains("tls")
        || detail.contains("ssl")
    {
        return TransferFault::new(code::SSL_CONNECT_ERROR, detail);
    }
    if e.is_connect() {
        return TransferFault::new(
            code::COULDNT_CONNECT,
            format!("Failed to connect to {}", url.host_str().unwrap_or("?")),
        );
    }
    TransferFault::new(code::RECV_ERROR, detail)
}

fn build_https_connector(
    opts: &OptState,
) -> Result<hyper_rustls::HttpsConnector<HttpConnector>, TransferFault> {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(opts.connect_timeout);

    let builder = HttpsConnectorBuilder::new();
    let connector = if opts.ssl_verify_peer {
        builder
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(http)
    } else {
        let config = crate::tls::insecure_client_config()
            .map_err(|e| TransferFault::new(code::SSL_CONNECT_ERROR, e.to_string()))?;
        builder
            .with_tls_config(config)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http)
    };
    Ok(connector)
}

fn attempt_headers(
    opts: &OptState,
    plan_auth: Option<&str>,
    url: &url::Url,
    body_len: usize,
    send_auth: bool,
) -> Vec<(String, String)> {
    let configured: Vec<(String, String)> = opts
        .headers
        .iter()
        .filter_map(|entry| framing::split_header_entry(entry))
        .collect();

    let mut headers: Vec<(String, String)> = Vec::new();
    if !has_header(&configured, "host")
        && let Some(host) = host_header_value(url)
    {
        headers.push(("host".to_string(), host));
    }
    if let Some(ua) = &opts.user_agent
        && !has_header(&configured, "user-agent")
    {
        headers.push(("user-agent".to_string(), ua.clone()));
    }
    if let Some(referer) = &opts.referer
        && !has_header(&configured, "referer")
    {
        headers.push(("referer".to_string(), referer.clone()));
    }
    if let Some(cookie) = &opts.cookie
        && !has_header(&configured, "cookie")
    {
        headers.push(("cookie".to_string(), cookie.clone()));
    }
    if let Some(range) = &opts.range
        && !has_header(&configured, "range")
    {
        headers.push(("range".to_string(), format!("bytes={range}")));
    }
    if let Some(encoding) = &opts.encoding
        && !encoding.is_empty()
        && !has_header(&configured, "accept-encoding")
    {
        headers.push(("accept-encoding".to_string(), encoding.clone()));
    }
    if send_auth
        && let Some(auth) = plan_auth
        && !has_header(&configured, "authorization")
    {
        headers.push(("authorization".to_string(), auth.to_string()));
    }
    if body_len > 0 && !has_header(&configured, "content-length") {
        headers.push(("content-length".to_string(), body_len.to_string()));
    }

    headers.extend(configured);
    headers
}

#[allow(clippy::too_many_lines)]
async fn run_transfer(
    opts: &OptState,
    plan: RequestPlan,
    started: Instant,
) -> Result<(InfoMap, Payload), TransferFault> {
    let connector = build_https_connector(opts)?;
    let client: Client<_, Full<Bytes>> = Client::builder(TokioExecutor::new()).build(connector);

    let origin_host = plan.url.host_str().map(str::to_string);
    let upload_len = plan.body.len() as u64;

    let mut current_url = plan.url;
    let mut current_method = plan.method;
    let mut current_body = plan.body;
    let mut redirect_count: i64 = 0;
    let mut redirect_time = Duration::ZERO;
    let mut request_size: i64 = 0;
    let mut header_out = String::new();

    let (response, final_url, start_transfer) = loop {
        let same_host = origin_host.as_deref() == current_url.host_str();
        let send_auth = opts.unrestricted_auth || same_host;
        let headers = attempt_headers(
            opts,
            plan.auth.as_deref(),
            &current_url,
            current_body.len(),
            send_auth,
        );

        let uri: hyper::Uri = current_url
            .as_str()
            .parse()
            .map_err(|_| TransferFault::new(code::URL_MALFORMAT, current_url.to_string()))?;

        let head = framing::request_head(&current_method, &uri, &headers);
        diag(opts, "> ", &head);
        request_size = request_size.saturating_add((head.len() + current_body.len()) as i64);
        header_out.push_str(&head);

        let mut builder = Request::builder().method(current_method.clone()).uri(uri);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let request = builder
            .body(Full::new(current_body.clone()))
            .map_err(|e| TransferFault::new(code::BAD_FUNCTION_ARGUMENT, e.to_string()))?;

        let response = client
            .request(request)
            .await
            .map_err(|e| map_transport_error(&e, &current_url))?;
        let arrived = started.elapsed();

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(http::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let is_redirect = matches!(status, 301 | 302 | 303 | 307 | 308);
        if !(is_redirect && opts.follow_location && location.is_some()) {
            break (response, current_url, arrived);
        }

        redirect_count += 1;
        if opts.max_redirs >= 0 && redirect_count > opts.max_redirs {
            return Err(TransferFault::new(
                code::TOO_MANY_REDIRECTS,
                format!("Maximum ({}) redirects followed", opts.max_redirs),
            ));
        }

        // Drain the redirect response so the connection can be reused.
        let _ = response.into_body().collect().await;

        let target = location.unwrap_or_default();
        let next_url = current_url
            .join(&target)
            .map_err(|e| TransferFault::new(code::URL_MALFORMAT, format!("{target}: {e}")))?;
        if next_url.scheme() != "http" && next_url.scheme() != "https" {
            return Err(TransferFault::new(
                code::UNSUPPORTED_PROTOCOL,
                format!("redirect to unsupported protocol \"{}\"", next_url.scheme()),
            ));
        }

        let (next_method, drop_body) = redirected_method(status, &current_method);
        current_method = next_method;
        if drop_body {
            current_body = Bytes::new();
        }
        current_url = next_url;
        redirect_time = started.elapsed();
    };

    let status = response.status().as_u16();
    let response_head =
        framing::response_head(response.version(), response.status(), response.headers());
    diag(opts, "< ", &response_head);

    let content_type = response
        .headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let content_length = response
        .headers()
        .get(http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(-1.0);
    let filetime = if opts.want_filetime {
        response
            .headers()
            .get(http::header::LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| httpdate::parse_http_date(v).ok())
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(-1, |d| d.as_secs() as i64)
    } else {
        -1
    };

    if status_is_failure(status, opts.fail_on_error, &opts.aliases) {
        return Err(TransferFault::new(
            code::HTTP_RETURNED_ERROR,
            format!("The requested URL returned error: {status}"),
        ));
    }

    // Header side channel: per-line hook first, then the block writer.
    if let Some(header_fn) = &opts.header_fn {
        let mut header_fn = lock(header_fn);
        let mut rest = response_head.as_str();
        while let Some(end) = rest.find("\r\n") {
            let line = &rest[..end + 2];
            if (*header_fn)(line.as_bytes()) != line.len() {
                return Err(TransferFault::new(
                    code::WRITE_ERROR,
                    "header callback refused data",
                ));
            }
            rest = &rest[end + 2..];
        }
    }
    if let Some(writer) = &opts.write_header {
        lock(writer)
            .write_all(response_head.as_bytes())
            .map_err(|e| TransferFault::new(code::WRITE_ERROR, e.to_string()))?;
    }

    let capture = opts.return_transfer;
    let mut captured = BytesMut::new();
    if opts.include_header {
        if capture {
            captured.extend_from_slice(response_head.as_bytes());
        } else {
            deliver_chunk(opts, response_head.as_bytes())?;
        }
    }

    let mut size_download: u64 = 0;
    let dl_total = if content_length >= 0.0 {
        content_length
    } else {
        0.0
    };

    let mut body = response.into_body();
    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| TransferFault::new(code::RECV_ERROR, e.to_string()))?;
        let Ok(data) = frame.into_data() else {
            continue;
        };
        if data.is_empty() {
            continue;
        }
        size_download += data.len() as u64;

        if capture {
            captured.extend_from_slice(&data);
        } else {
            deliver_chunk(opts, &data)?;
        }

        if !opts.no_progress
            && let Some(progress_fn) = &opts.progress_fn
        {
            let abort = (*lock(progress_fn))(
                dl_total,
                size_download as f64,
                upload_len as f64,
                upload_len as f64,
            );
            if abort {
                return Err(TransferFault::new(
                    code::ABORTED_BY_CALLBACK,
                    "Callback aborted",
                ));
            }
        }
    }

    let total = started.elapsed();
    let total_secs = total.as_secs_f64();
    let speed = |bytes: u64| {
        if total_secs > 0.0 {
            bytes as f64 / total_secs
        } else {
            0.0
        }
    };

    let mut info = InfoMap::new();
    info.insert(Info::EffectiveUrl, InfoValue::Str(final_url.to_string()));
    info.insert(Info::HttpCode, InfoValue::Long(i64::from(status)));
    info.insert(Info::FileTime, InfoValue::Long(filetime));
    info.insert(Info::TotalTime, InfoValue::Double(total_secs));
    // Phase timings inside connection setup are not observable through the
    // pooled client; reported as zero.
    info.insert(Info::NameLookupTime, InfoValue::Double(0.0));
    info.insert(Info::ConnectTime, InfoValue::Double(0.0));
    info.insert(Info::PreTransferTime, InfoValue::Double(0.0));
    info.insert(
        Info::StartTransferTime,
        InfoValue::Double(start_transfer.as_secs_f64()),
    );
    info.insert(
        Info::RedirectTime,
        InfoValue::Double(redirect_time.as_secs_f64()),
    );
    info.insert(Info::RedirectCount, InfoValue::Long(redirect_count));
    info.insert(Info::SizeUpload, InfoValue::Double(upload_len as f64));
    info.insert(Info::SizeDownload, InfoValue::Double(size_download as f64));
    info.insert(Info::SpeedDownload, InfoValue::Double(speed(size_download)));
    info.insert(Info::SpeedUpload, InfoValue::Double(speed(upload_len)));
    info.insert(
        Info::HeaderSize,
        InfoValue::Long(response_head.len() as i64),
    );
    info.insert(Info::HeaderOut, InfoValue::Str(header_out));
    info.insert(Info::RequestSize, InfoValue::Long(request_size));
    info.insert(Info::SslVerifyResult, InfoValue::Long(0));
    info.insert(
        Info::ContentLengthDownload,
        InfoValue::Double(content_length),
    );
    info.insert(
        Info::ContentLengthUpload,
        InfoValue::Double(upload_len as f64),
    );
    info.insert(
        Info::ContentType,
        InfoValue::Str(content_type.unwrap_or_default()),
    );
    info.insert(Info::HttpConnectCode, InfoValue::Long(0));
    // Socket endpoints are owned by the connection pool and not surfaced.
    info.insert(Info::PrimaryIp, InfoValue::Str(String::new()));
    info.insert(Info::PrimaryPort, InfoValue::Long(0));
    info.insert(Info::LocalIp, InfoValue::Str(String::new()));
    info.insert(Info::LocalPort, InfoValue::Long(0));

    let payload = if capture {
        Payload::Captured(captured.freeze())
    } else {
        Payload::Streamed
    };
    Ok((info, payload))
}

/// Route one chunk to the write callback, the configured writer, or stdout.
fn deliver_chunk(opts: &OptState, data: &[u8]) -> Result<(), TransferFault> {
    if let Some(write_fn) = &opts.write_fn {
        let consumed = (*lock(write_fn))(data);
        if consumed != data.len() {
            return Err(TransferFault::new(
                code::WRITE_ERROR,
                "Failed writing body: callback refused data",
            ));
        }
        return Ok(());
    }
    if let Some(writer) = &opts.file {
        return lock(writer)
            .write_all(data)
            .map_err(|e| TransferFault::new(code::WRITE_ERROR, e.to_string()));
    }
    std::io::stdout()
        .lock()
        .write_all(data)
        .map_err(|e| TransferFault::new(code::WRITE_ERROR, e.to_string()))
}
