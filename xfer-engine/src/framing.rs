//! HTTP/1.1 framing text and size accounting.
//!
//! The request-size and header-size info fields report wire framing bytes.
//! The sent head is rendered exactly as handed to the transport, so its
//! rendered length is authoritative; the received head is rebuilt from the
//! parsed response, which matches the wire for HTTP/1.1 responses without
//! obsolete line folding.

use std::fmt::Write as _;

/// Render the request head: request line, headers, terminating CRLF.
pub(crate) fn request_head(
    method: &http::Method,
    uri: &hyper::Uri,
    headers: &[(String, String)],
) -> String {
    let path = uri.path_and_query().map_or("/", |p| p.as_str());
    let mut head = format!("{method} {path} HTTP/1.1\r\n");
    for (name, value) in headers {
        let _ = write!(head, "{name}: {value}\r\n");
    }
    head.push_str("\r\n");
    head
}

/// Render the response head: status line, headers, terminating CRLF.
pub(crate) fn response_head(
    version: http::Version,
    status: http::StatusCode,
    headers: &http::HeaderMap,
) -> String {
    let version = match version {
        http::Version::HTTP_10 => "HTTP/1.0",
        http::Version::HTTP_2 => "HTTP/2",
        http::Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/1.1",
    };
    let reason = status.canonical_reason().unwrap_or("");
    let mut head = format!("{version} {} {reason}\r\n", status.as_str());
    for (name, value) in headers {
        let _ = write!(
            head,
            "{name}: {}\r\n",
            String::from_utf8_lossy(value.as_bytes())
        );
    }
    head.push_str("\r\n");
    head
}

/// Split one `"Name: value"` configuration entry. Entries without a colon
/// are dropped, matching the engine's treatment of malformed list items.
pub(crate) fn split_header_entry(entry: &str) -> Option<(String, String)> {
    let (name, value) = entry.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn request_head_renders_http11_framing() {
        let uri: hyper::Uri = "http://example.test/x?a=1".parse().unwrap();
        let head = request_head(
            &http::Method::GET,
            &uri,
            &[("host".to_string(), "example.test".to_string())],
        );
        assert_eq!(head, "GET /x?a=1 HTTP/1.1\r\nhost: example.test\r\n\r\n");
    }

    #[test]
    fn request_head_defaults_empty_path_to_slash() {
        let uri: hyper::Uri = "http://example.test".parse().unwrap();
        let head = request_head(&http::Method::GET, &uri, &[]);
        assert!(head.starts_with("GET / HTTP/1.1\r\n"));
    }

    #[test]
    fn response_head_includes_reason_and_blank_line() {
        let mut headers = http::HeaderMap::new();
        headers.insert("content-type", "text/plain".parse().unwrap());
        let head = response_head(http::Version::HTTP_11, http::StatusCode::OK, &headers);
        assert_eq!(head, "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\n\r\n");
    }

    #[test]
    fn split_header_entry_trims_and_rejects_nameless() {
        assert_eq!(
            split_header_entry("X-Test: 1"),
            Some(("X-Test".to_string(), "1".to_string()))
        );
        assert_eq!(
            split_header_entry("Accept:"),
            Some(("Accept".to_string(), String::new()))
        );
        assert_eq!(split_header_entry("no colon here"), None);
        assert_eq!(split_header_entry(": nameless"), None);
    }
}
