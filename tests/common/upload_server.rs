// Minimal HTTP/1.1 server that accepts multipart POSTs for integration tests.
//
// Every request is recorded; the status and body of the reply are chosen by
// a caller-supplied closure looking at the recorded request.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    /// Header names are lowercased.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Lossy text view of the body, for asserting on part headers.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// `filename="..."` of the first multipart part.
    pub fn filename(&self) -> Option<String> {
        let text = self.body_text();
        let start = text.find("filename=\"")? + "filename=\"".len();
        let end = text[start..].find('"')? + start;
        Some(text[start..end].to_string())
    }
}

/// How the server drains a request body: at most `chunk` bytes per read,
/// sleeping `pause` after each.
#[derive(Debug, Clone, Copy)]
pub struct Pace {
    pub chunk: usize,
    pub pause: Duration,
}

impl Pace {
    const FULL_SPEED: Pace = Pace {
        chunk: 8192,
        pause: Duration::ZERO,
    };
}

pub struct UploadServer {
    pub url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl UploadServer {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

/// Starts a server in a background thread. `respond` maps each request to
/// `(status, body)`. The server runs until the process exits.
pub fn start<F>(respond: F) -> UploadServer
where
    F: Fn(&Recorded) -> (u16, String) + Send + Sync + 'static,
{
    start_paced(Pace::FULL_SPEED, respond)
}

/// Like [`start`], but every request body is read at `pace`.
pub fn start_paced<F>(pace: Pace, respond: F) -> UploadServer
where
    F: Fn(&Recorded) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);
    let log = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let respond = Arc::clone(&respond);
            let log = Arc::clone(&log);
            thread::spawn(move || handle(stream, pace, &*respond, &log));
        }
    });
    UploadServer {
        url: format!("http://127.0.0.1:{}/upload", port),
        requests,
    }
}

/// Accepts connections and reads the request but never answers.
pub fn start_silent(hold: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            thread::spawn(move || {
                let mut stream = stream;
                let _ = read_request(&mut stream, Pace::FULL_SPEED);
                thread::sleep(hold);
            });
        }
    });
    format!("http://127.0.0.1:{}/upload", port)
}

/// A URL on a port nobody is listening on.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/upload", port)
}

fn handle<F>(mut stream: TcpStream, pace: Pace, respond: &F, log: &Mutex<Vec<Recorded>>)
where
    F: Fn(&Recorded) -> (u16, String),
{
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(request) = read_request(&mut stream, pace) else {
        return;
    };
    let (status, body) = respond(&request);
    log.lock().unwrap().push(request);
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason(status),
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn read_more(stream: &mut TcpStream, buf: &mut Vec<u8>, pace: Pace) -> bool {
    let mut chunk = vec![0u8; pace.chunk];
    match stream.read(&mut chunk) {
        Ok(0) | Err(_) => false,
        Ok(n) => {
            buf.extend_from_slice(&chunk[..n]);
            if !pace.pause.is_zero() {
                thread::sleep(pace.pause);
            }
            true
        }
    }
}

fn read_request(stream: &mut TcpStream, pace: Pace) -> Option<Recorded> {
    let mut buf = Vec::new();
    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        if !read_more(stream, &mut buf, Pace::FULL_SPEED) {
            return None;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let method = lines.next()?.split_whitespace().next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let mut body = buf[header_end..].to_vec();
    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok());
    let chunked = headers
        .iter()
        .any(|(k, v)| k == "transfer-encoding" && v.eq_ignore_ascii_case("chunked"));

    if let Some(len) = content_length {
        while body.len() < len {
            if !read_more(stream, &mut body, pace) {
                break;
            }
        }
        body.truncate(len);
    } else if chunked {
        while find(&body, b"0\r\n\r\n").is_none() {
            if !read_more(stream, &mut body, pace) {
                break;
            }
        }
        body = dechunk(&body);
    }

    Some(Recorded {
        method,
        headers,
        body,
    })
}

fn dechunk(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut rest = raw;
    while let Some(line_end) = find(rest, b"\r\n") {
        let size_line = String::from_utf8_lossy(&rest[..line_end]);
        let size_hex = size_line.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_hex, 16).unwrap_or(0);
        rest = &rest[line_end + 2..];
        if size == 0 || rest.len() < size {
            break;
        }
        out.extend_from_slice(&rest[..size]);
        rest = rest.get(size + 2..).unwrap_or(&[]);
    }
    out
}
