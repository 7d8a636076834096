//! End-to-end transfers against a local fixture server, driving the bundled
//! blocking engine. Plain `#[test]` functions on purpose: the engine owns
//! its own runtime and must not run inside another one.

#![allow(clippy::unwrap_used)]

use std::io::{Read as _, Write};
use std::sync::{Arc, Mutex};

use xfer::{Error, Session, code};
use xfer_testserver::TestServer;

/// `Write` target whose contents stay inspectable after the session takes
/// ownership of the writer.
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn get_captures_body_and_info() -> anyhow::Result<()> {
    let server = TestServer::start()?;
    let mut session = Session::open(Some(&server.urls().hello))?;
    let payload = session.set_return_transfer(true)?.execute()?;

    assert_eq!(payload.utf8(), Some(xfer_testserver::HELLO_BODY));
    assert_eq!(session.get_http_code()?, 200);
    assert_eq!(session.get_effective_url()?, server.urls().hello);
    assert!(session.get_content_type()?.starts_with("text/plain"));
    assert!(session.get_size_download()? > 0.0);
    assert!(session.get_header_size()? > 0);
    assert_eq!(session.error_no(), 0);
    assert_eq!(server.stats().requests_total(), 1);
    Ok(())
}

#[test]
fn post_echoes_body_and_custom_header_reaches_the_server() -> anyhow::Result<()> {
    let server = TestServer::start()?;
    let mut session = Session::open(None)?;
    let payload = session
        .set_url(&server.urls().echo)?
        .set_post(true)?
        .set_post_fields("ping")?
        .add_header("X-Test", "1")?
        .set_return_transfer(true)?
        .execute()?;

    assert_eq!(payload.utf8(), Some("ping"));
    assert_eq!(server.stats().saw_post_header(), 1);
    assert_eq!(server.stats().saw_post_body(), 1);

    // The outgoing request head is reported after the fact.
    let head = session.get_header_out()?;
    assert!(head.starts_with("POST /echo HTTP/1.1\r\n"), "{head}");
    assert!(head.contains("x-test: 1") || head.contains("X-Test: 1"), "{head}");
    Ok(())
}

#[test]
fn redirects_are_followed_when_enabled() -> anyhow::Result<()> {
    let server = TestServer::start()?;
    let mut session = Session::open(Some(&server.urls().redir_a))?;
    let payload = session
        .set_follow_location(true)?
        .set_return_transfer(true)?
        .execute()?;

    assert_eq!(payload.utf8(), Some(xfer_testserver::HELLO_BODY));
    assert_eq!(session.get_http_code()?, 200);
    assert_eq!(session.get_redirect_count()?, 2);
    assert_eq!(session.get_effective_url()?, server.urls().hello);
    Ok(())
}

#[test]
fn redirect_limit_is_enforced() -> anyhow::Result<()> {
    let server = TestServer::start()?;
    let mut session = Session::open(Some(&server.urls().redir_a))?;
    session
        .set_follow_location(true)?
        .set_max_redirs(1)?
        .set_return_transfer(true)?;

    let err = session.execute().unwrap_err();
    assert!(matches!(
        err,
        Error::Transfer { code, .. } if code == code::TOO_MANY_REDIRECTS
    ));
    assert_eq!(session.error_no(), code::TOO_MANY_REDIRECTS);
    Ok(())
}

#[test]
fn timeout_faults_and_the_session_stays_usable() -> anyhow::Result<()> {
    let server = TestServer::start()?;
    let mut session = Session::open(Some(&server.urls().slow))?;
    session.set_timeout_ms(50)?.set_return_transfer(true)?;

    let err = session.execute().unwrap_err();
    assert!(matches!(
        err,
        Error::Transfer { code, .. } if code == code::OPERATION_TIMEDOUT
    ));
    assert_eq!(session.error_no(), code::OPERATION_TIMEDOUT);
    assert!(session.error().contains("milliseconds"));

    // Same session, faster target: the fault was not fatal.
    session.set_url(&server.urls().hello)?;
    let payload = session.execute()?;
    assert_eq!(payload.utf8(), Some(xfer_testserver::HELLO_BODY));
    assert_eq!(session.error_no(), 0);
    Ok(())
}

#[test]
fn connection_refused_maps_to_couldnt_connect() -> anyhow::Result<()> {
    // Bind then drop to learn a port nothing listens on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        listener.local_addr()?.port()
    };

    let mut session = Session::open(Some(&format!("http://127.0.0.1:{port}/")))?;
    session.set_return_transfer(true)?;

    let err = session.execute().unwrap_err();
    assert!(matches!(
        err,
        Error::Transfer { code, .. } if code == code::COULDNT_CONNECT
    ));
    Ok(())
}

#[test]
fn body_streams_into_the_configured_file() -> anyhow::Result<()> {
    let server = TestServer::start()?;
    let target = tempfile::NamedTempFile::new()?;
    let sink = target.reopen()?;

    let mut session = Session::open(Some(&server.urls().hello))?;
    session.set_file(sink)?.execute()?;

    let mut written = String::new();
    target.reopen()?.read_to_string(&mut written)?;
    assert_eq!(written, xfer_testserver::HELLO_BODY);
    Ok(())
}

#[test]
fn header_writer_receives_the_response_head() -> anyhow::Result<()> {
    let server = TestServer::start()?;
    let head = SharedBuf::default();

    let mut session = Session::open(Some(&server.urls().hello))?;
    session
        .set_write_header(head.clone())?
        .set_return_transfer(true)?
        .execute()?;

    let block = String::from_utf8(head.contents())?;
    assert!(block.starts_with("HTTP/1.1 200"), "{block}");
    assert!(block.ends_with("\r\n\r\n"), "{block}");
    Ok(())
}

#[test]
fn header_hook_sees_every_line() -> anyhow::Result<()> {
    let server = TestServer::start()?;
    let lines: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = Arc::clone(&lines);

    let mut session = Session::open(Some(&server.urls().hello))?;
    session
        .set_header_function(move |line| {
            sink.lock()
                .unwrap()
                .push(String::from_utf8_lossy(line).into_owned());
            line.len()
        })?
        .set_return_transfer(true)?
        .execute()?;

    let lines = lines.lock().unwrap().clone();
    assert!(lines.first().is_some_and(|l| l.starts_with("HTTP/1.1 200")));
    assert!(
        lines
            .iter()
            .any(|l| l.to_ascii_lowercase().starts_with("content-type:"))
    );
    Ok(())
}

#[test]
fn progress_hook_can_abort_the_transfer() -> anyhow::Result<()> {
    let server = TestServer::start()?;
    let mut session = Session::open(Some(&server.urls().hello))?;
    session
        .set_no_progress(false)?
        .set_progress_function(|_, _, _, _| true)?
        .set_return_transfer(true)?;

    let err = session.execute().unwrap_err();
    assert!(matches!(
        err,
        Error::Transfer { code, .. } if code == code::ABORTED_BY_CALLBACK
    ));
    Ok(())
}

#[test]
fn fail_on_error_rejects_unless_the_status_is_aliased() -> anyhow::Result<()> {
    let server = TestServer::start()?;
    let mut session = Session::open(Some(&server.urls().teapot))?;
    session.set_fail_on_error(true)?.set_return_transfer(true)?;

    let err = session.execute().unwrap_err();
    assert!(matches!(
        err,
        Error::Transfer { code, .. } if code == code::HTTP_RETURNED_ERROR
    ));

    // Aliasing 418 as a success code lets the same transfer through.
    session.add_status_alias(418)?;
    let payload = session.execute()?;
    assert_eq!(payload.utf8(), Some("short and stout"));
    assert_eq!(session.get_http_code()?, 418);
    Ok(())
}

#[test]
fn copy_handle_runs_independently() -> anyhow::Result<()> {
    let server = TestServer::start()?;
    let mut original = Session::open(Some(&server.urls().hello))?;
    original.set_return_transfer(true)?;

    let mut clone = original.copy_handle()?;
    clone.set_url(&server.urls().teapot)?;

    let from_clone = clone.execute()?;
    let from_original = original.execute()?;

    assert_eq!(from_clone.utf8(), Some("short and stout"));
    assert_eq!(from_original.utf8(), Some(xfer_testserver::HELLO_BODY));
    assert_eq!(original.get_http_code()?, 200);
    assert_eq!(clone.get_http_code()?, 418);
    Ok(())
}

#[test]
fn query_parameters_pass_through_untouched() -> anyhow::Result<()> {
    let server = TestServer::start()?;
    let mut session = Session::open(Some(&format!("{}?foo=bar", server.urls().qp)))?;
    session.set_return_transfer(true)?.execute()?;
    assert_eq!(session.get_http_code()?, 200);
    Ok(())
}

#[test]
fn verbose_diagnostics_go_to_the_configured_stderr() -> anyhow::Result<()> {
    let server = TestServer::start()?;
    let diag = SharedBuf::default();

    let mut session = Session::open(Some(&server.urls().hello))?;
    session
        .set_verbose(true)?
        .set_stderr(diag.clone())?
        .set_return_transfer(true)?
        .execute()?;

    let rendered = String::from_utf8(diag.contents())?;
    assert!(rendered.contains("> GET /hello HTTP/1.1"), "{rendered}");
    assert!(rendered.contains("< HTTP/1.1 200"), "{rendered}");
    Ok(())
}

#[test]
fn write_hook_refusing_data_fails_the_transfer() -> anyhow::Result<()> {
    let server = TestServer::start()?;
    let mut session = Session::open(Some(&server.urls().hello))?;
    session.set_write_function(|_| 0)?;

    let err = session.execute().unwrap_err();
    assert!(matches!(
        err,
        Error::Transfer { code, .. } if code == code::WRITE_ERROR
    ));
    Ok(())
}

#[test]
fn upload_body_comes_from_the_read_hook() -> anyhow::Result<()> {
    let server = TestServer::start()?;
    let mut remaining: &[u8] = b"ping";

    let mut session = Session::open(Some(&server.urls().echo))?;
    let payload = session
        .set_upload(true)?
        .set_custom_request("POST")?
        .set_infile_size(remaining.len() as i64)?
        .set_read_function(move |buf| {
            let n = remaining.len().min(buf.len());
            buf[..n].copy_from_slice(&remaining[..n]);
            remaining = &remaining[n..];
            n
        })?
        .set_return_transfer(true)?
        .execute()?;

    assert_eq!(payload.utf8(), Some("ping"));
    assert_eq!(server.stats().saw_post_body(), 1);
    Ok(())
}
