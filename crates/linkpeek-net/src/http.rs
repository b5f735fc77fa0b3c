//! Minimal HTTP/1.1 GET client.
//!
//! Supports plain HTTP over `std::net::TcpStream` and, when a
//! [`TlsProvider`] is supplied, HTTPS. Each call opens a fresh connection
//! with `Connection: close` and reads until EOF.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use linkpeek_types::error::{PeekError, Result};

use crate::tls::TlsProvider;
use crate::url::Url;

/// Maximum response body size (8 MB).
const MAX_BODY_SIZE: usize = 8 * 1024 * 1024;

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: u8 = 5;

/// Per-request knobs.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Used for both the connect and the read timeout.
    pub timeout: Duration,
    pub user_agent: String,
    pub accept: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: concat!("linkpeek/", env!("CARGO_PKG_VERSION")).to_string(),
            accept: "*/*".to_string(),
        }
    }
}

/// A parsed HTTP response.
#[derive(Debug)]
pub struct HttpResponse {
    /// URL the body was finally served from, after redirects.
    pub url: String,
    pub status_code: u16,
    /// Header (lowercased name, value) pairs.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Perform an HTTP(S) GET request for `url`.
///
/// HTTPS needs `tls`; without it the request fails. Follows redirects
/// (301/302/303/307/308) up to [`MAX_REDIRECTS`] hops. Non-2xx responses are
/// returned as-is; the caller decides what a failure status means.
pub fn http_get(
    url: &Url,
    tls: Option<&dyn TlsProvider>,
    options: &HttpOptions,
) -> Result<HttpResponse> {
    let mut current_url = url.clone();
    for _ in 0..=MAX_REDIRECTS {
        check_scheme(&current_url, tls)?;
        let mut resp = do_request(&current_url, tls, options)?;

        if is_redirect(resp.status_code)
            && let Some(location) = resp.header("location")
        {
            let location = location.to_string();
            current_url = current_url
                .resolve(&location)
                .ok_or_else(|| PeekError::Http(format!("bad redirect Location: {location}")))?;
            log::debug!("Following redirect to {current_url}");
            continue;
        }

        resp.url = current_url.to_string();
        return Ok(resp);
    }

    Err(PeekError::Http("too many redirects".to_string()))
}

fn check_scheme(url: &Url, tls: Option<&dyn TlsProvider>) -> Result<()> {
    match url.scheme.as_str() {
        "http" => Ok(()),
        "https" if tls.is_some() => Ok(()),
        "https" => Err(PeekError::Network(
            "HTTPS not supported: TLS not available".to_string(),
        )),
        other => Err(PeekError::Network(format!(
            "unsupported scheme for HTTP client: {other}",
        ))),
    }
}

// -------------------------------------------------------------------
// Internals
// -------------------------------------------------------------------

/// Connect, optionally upgrade to TLS, send GET, read and parse.
fn do_request(
    url: &Url,
    tls: Option<&dyn TlsProvider>,
    options: &HttpOptions,
) -> Result<HttpResponse> {
    let stream = tcp_connect(&url.host, url.port_or_default(), options.timeout)?;

    let raw = if url.scheme == "https" {
        let provider =
            tls.ok_or_else(|| PeekError::Network("TLS not available".to_string()))?;
        let mut tls_stream = provider.connect_tls(stream, &url.host)?;
        send_request(&mut tls_stream, url, options)?;
        read_response(&mut tls_stream)?
    } else {
        let mut stream = stream;
        send_request(&mut stream, url, options)?;
        read_response(&mut stream)?
    };
    parse_response(&raw)
}

/// Open a TCP connection with connect and read timeouts.
fn tcp_connect(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|e| PeekError::Network(format!("DNS resolution failed: {e}")))?
        .next()
        .ok_or_else(|| PeekError::Network(format!("no addresses for {host}:{port}")))?;

    let stream = TcpStream::connect_timeout(&addr, timeout)
        .map_err(|e| PeekError::Network(format!("TCP connect failed: {e}")))?;

    stream
        .set_read_timeout(Some(timeout))
        .map_err(|e| PeekError::Network(format!("set read timeout: {e}")))?;

    Ok(stream)
}

/// Send an HTTP/1.1 GET request.
fn send_request(stream: &mut impl Write, url: &Url, options: &HttpOptions) -> Result<()> {
    let host_header = match url.port {
        Some(p) => format!("{}:{}", url.host, p),
        None => url.host.clone(),
    };

    let request = format!(
        "GET {target} HTTP/1.1\r\n\
         Host: {host_header}\r\n\
         User-Agent: {agent}\r\n\
         Accept: {accept}\r\n\
         Connection: close\r\n\
         \r\n",
        target = url.request_target(),
        agent = options.user_agent,
        accept = options.accept,
    );

    stream
        .write_all(request.as_bytes())
        .and_then(|()| stream.flush())
        .map_err(|e| PeekError::Network(format!("send request: {e}")))
}

/// Read the entire response until EOF.
///
/// A read timeout ends the read with whatever arrived; a TLS peer that
/// closes without `close_notify` is treated as EOF.
fn read_response(stream: &mut impl Read) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(8192);
    let mut chunk = [0u8; 8192];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                if buf.len() + n > MAX_BODY_SIZE + 4096 {
                    return Err(PeekError::Http("response too large".to_string()));
                }
                buf.extend_from_slice(&chunk[..n]);
            },
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::TimedOut
                    || e.kind() == io::ErrorKind::UnexpectedEof =>
            {
                break;
            },
            Err(e) => {
                return Err(PeekError::Network(format!("read response: {e}")));
            },
        }
    }
    if buf.is_empty() {
        return Err(PeekError::Network("empty response".to_string()));
    }
    Ok(buf)
}

/// Parse raw bytes into status code, headers, and body.
pub fn parse_response(data: &[u8]) -> Result<HttpResponse> {
    let header_end = find_subsequence(data, b"\r\n\r\n").ok_or_else(|| {
        PeekError::Http("malformed HTTP response: no header terminator".to_string())
    })?;

    let header_str = std::str::from_utf8(&data[..header_end])
        .map_err(|_| PeekError::Http("non-UTF-8 headers".to_string()))?;

    let mut lines = header_str.split("\r\n");

    let status_line = lines
        .next()
        .ok_or_else(|| PeekError::Http("empty response".to_string()))?;
    let status_code = parse_status_line(status_line)?;

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_lowercase(), value.trim().to_string()));
        }
    }

    let raw_body = &data[header_end + 4..];
    let body = if find_header(&headers, "transfer-encoding").is_some_and(|v| v.contains("chunked"))
    {
        decode_chunked(raw_body)?
    } else if let Some(cl) = find_header(&headers, "content-length") {
        let len: usize = cl
            .parse()
            .map_err(|_| PeekError::Http("bad Content-Length".to_string()))?;
        if len > MAX_BODY_SIZE {
            return Err(PeekError::Http(
                "response body exceeds 8 MB limit".to_string(),
            ));
        }
        raw_body[..raw_body.len().min(len)].to_vec()
    } else {
        raw_body.to_vec()
    };

    if body.len() > MAX_BODY_SIZE {
        return Err(PeekError::Http(
            "response body exceeds 8 MB limit".to_string(),
        ));
    }

    Ok(HttpResponse {
        url: String::new(),
        status_code,
        headers,
        body,
    })
}

/// Parse the status code from `HTTP/1.x NNN reason`.
fn parse_status_line(line: &str) -> Result<u16> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or("");
    if !version.starts_with("HTTP/") {
        return Err(PeekError::Http(format!("bad status line: {line}")));
    }
    parts
        .next()
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| PeekError::Http(format!("bad status code in: {line}")))
}

/// Case-insensitive header lookup.
fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    let name_lower = name.to_lowercase();
    headers
        .iter()
        .find(|(k, _)| k == &name_lower)
        .map(|(_, v)| v.as_str())
}

/// Decode a chunked transfer-encoded body.
fn decode_chunked(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::new();
    let mut pos = 0;

    while let Some(i) = find_subsequence(&data[pos..], b"\r\n") {
        let line_end = pos + i;

        let size_str = std::str::from_utf8(&data[pos..line_end])
            .map_err(|_| PeekError::Http("bad chunk size".to_string()))?;

        // Strip optional chunk extensions (after `;`).
        let size_str = size_str.split(';').next().unwrap_or("").trim();

        let chunk_size = usize::from_str_radix(size_str, 16)
            .map_err(|_| PeekError::Http("bad chunk size".to_string()))?;

        if chunk_size == 0 {
            break;
        }

        if result.len() + chunk_size > MAX_BODY_SIZE {
            return Err(PeekError::Http(
                "chunked body exceeds 8 MB limit".to_string(),
            ));
        }

        let chunk_start = line_end + 2;
        let chunk_end = chunk_start + chunk_size;

        if chunk_end > data.len() {
            // Truncated: keep what arrived.
            result.extend_from_slice(&data[chunk_start..]);
            break;
        }

        result.extend_from_slice(&data[chunk_start..chunk_end]);
        pos = (chunk_end + 2).min(data.len());
    }

    Ok(result)
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
