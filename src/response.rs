//! Minimal static-file response generator.
//!
//! spec.md §1 places "the file-serving response generator (MIME detection,
//! sendfile, error pages)" out of scope, specified only by the interface it
//! expects: a completed `ParsedRequest` plus a write-ready socket. But
//! spec.md §5 and §7 also require that every connection's terminal state
//! (`DONE`, parser error) actually produces a response and closes
//! deterministically, and without *something* writing bytes back the crate
//! cannot be run or tested end-to-end (spec.md §8 scenarios 1, 2, 4 all
//! check observable parse results, which in a real server means a response
//! went out). This module is therefore intentionally small: it serves one
//! file relative to the document root for `GET`/`HEAD`, and otherwise
//! returns a minimal `3xx`-free error page, grounded on the original's
//! `do_request()` call site in `examples/original_source/src/mainloop.c`
//! (the original's actual MIME/sendfile logic lives in files the retrieved
//! pack does not include, so this implementation is original to this
//! crate, kept deliberately small per spec.md §1).

use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use crate::request::{Method, ParsedRequest};
use crate::ring_buffer::RingBuffer;

/// HTTP status codes this crate can emit. Only the handful the static-file
/// path needs; not a general status registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    InternalServerError,
}

impl Status {
    fn code_and_reason(self) -> (u16, &'static str) {
        match self {
            Status::Ok => (200, "OK"),
            Status::BadRequest => (400, "Bad Request"),
            Status::Forbidden => (403, "Forbidden"),
            Status::NotFound => (404, "Not Found"),
            Status::MethodNotAllowed => (405, "Method Not Allowed"),
            Status::InternalServerError => (500, "Internal Server Error"),
        }
    }
}

/// Decouples the reactor from the write mechanics of "send these bytes
/// back" the way spec.md's interface description asks for ("a write-ready
/// socket"). `connection::Connection` is the only real implementer; tests
/// use an in-memory `Vec<u8>` sink.
pub trait ResponseSink {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;
}

impl ResponseSink for Vec<u8> {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        Write::write_all(self, bytes)
    }
}

/// Resolve `uri` against `root`, rejecting any path that would escape it
/// via `..` components (the original's `http_request.c` is not in the
/// retrieved pack; `..`-rejection is the minimum any static file server in
/// the reference pack does, e.g. `pelikan-io-grow-a-cache`'s path handling
/// conventions).
fn resolve_path(root: &Path, uri: &[u8]) -> Option<PathBuf> {
    let uri = std::str::from_utf8(uri).ok()?;
    let uri = uri.split('?').next().unwrap_or(uri);
    let relative = uri.trim_start_matches('/');
    let relative = if relative.is_empty() { "index.html" } else { relative };

    let mut resolved = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}

/// Serve `request` by writing a complete HTTP/1.x response to `sink`.
/// Returns the status actually sent, for logging at the call site
/// (spec.md §A.2: logging happens at the connection/reactor layer, not
/// inside parsing — this mirrors that placement for the response path).
pub fn serve(
    request: &ParsedRequest,
    rb: &RingBuffer,
    document_root: &Path,
    sink: &mut dyn ResponseSink,
) -> io::Result<Status> {
    let uri = request.uri(rb);

    if !matches!(request.method, Method::Get | Method::Head) {
        return send_error(sink, Status::MethodNotAllowed);
    }

    let path = match resolve_path(document_root, &uri) {
        Some(p) => p,
        None => return send_error(sink, Status::Forbidden),
    };

    let body = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return send_error(sink, Status::NotFound),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            return send_error(sink, Status::Forbidden)
        }
        Err(_) => return send_error(sink, Status::InternalServerError),
    };

    let content_type = guess_content_type(&path);
    let header = format_header(Status::Ok, body.len(), Some(content_type));
    sink.write_all(header.as_bytes())?;
    if matches!(request.method, Method::Get) {
        sink.write_all(&body)?;
    }
    Ok(Status::Ok)
}

fn send_error(sink: &mut dyn ResponseSink, status: Status) -> io::Result<Status> {
    let (code, reason) = status.code_and_reason();
    let body = format!("<html><body><h1>{} {}</h1></body></html>", code, reason);
    let header = format_header(status, body.len(), Some("text/html"));
    sink.write_all(header.as_bytes())?;
    sink.write_all(body.as_bytes())?;
    Ok(status)
}

fn format_header(status: Status, content_length: usize, content_type: Option<&str>) -> String {
    let (code, reason) = status.code_and_reason();
    let mut header = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        code, reason, content_length
    );
    if let Some(ct) = content_type {
        header.push_str("Content-Type: ");
        header.push_str(ct);
        header.push_str("\r\n");
    }
    header.push_str("\r\n");
    header
}

/// MIME detection by extension, the one piece of "MIME detection" spec.md
/// names as out of scope for the (external) response generator but that
/// this crate's minimal in-tree one still needs to be useful at all.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}
