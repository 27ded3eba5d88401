//! Minimal HTTP/1.1 repository server for integration tests.
//!
//! Serves an in-memory map of paths to replies. A path can be scripted to
//! return a sequence of replies (e.g. a 503 or corrupt body first) before
//! settling on its final reply. Every request is counted per path.

use std::collections::{HashMap, VecDeque};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

use jarfetch_core::checksum::sha1_hex;

#[derive(Debug, Clone)]
pub enum Reply {
    Body(Vec<u8>),
    Status(u16),
}

#[derive(Debug)]
struct Entry {
    script: VecDeque<Reply>,
    last: Reply,
}

#[derive(Debug, Default)]
struct State {
    files: Mutex<HashMap<String, Entry>>,
    hits: Mutex<HashMap<String, usize>>,
    /// Authorization header of each request, if any.
    auth: Mutex<Vec<Option<String>>>,
    user_agents: Mutex<Vec<String>>,
}

pub struct RepoServer {
    base: String,
    port: u16,
    state: Arc<State>,
}

impl RepoServer {
    /// Starts a server in a background thread. The server runs until the process exits.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(State::default());
        let shared = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let state = Arc::clone(&shared);
                thread::spawn(move || handle(stream, &state));
            }
        });
        Self {
            base: format!("http://127.0.0.1:{}/", port),
            port,
            state,
        }
    }

    pub fn url(&self) -> &str {
        &self.base
    }

    /// Base URL carrying basic-auth userinfo.
    pub fn url_with_credentials(&self, user: &str, password: &str) -> String {
        format!("http://{}:{}@127.0.0.1:{}/", user, password, self.port)
    }

    pub fn put(&self, path: &str, body: impl Into<Vec<u8>>) {
        self.script(path, Vec::new(), Reply::Body(body.into()));
    }

    /// Publish `body` together with a matching `.sha1` sidecar.
    pub fn put_with_sha1(&self, path: &str, body: impl Into<Vec<u8>>) {
        let body = body.into();
        self.put(&format!("{}.sha1", path), sha1_hex(&body));
        self.put(path, body);
    }

    /// Serve `replies` in order, then `last` forever.
    pub fn script(&self, path: &str, replies: Vec<Reply>, last: Reply) {
        self.state.files.lock().unwrap().insert(
            path.trim_start_matches('/').to_string(),
            Entry {
                script: replies.into(),
                last,
            },
        );
    }

    pub fn hits(&self, path: &str) -> usize {
        self.state
            .hits
            .lock()
            .unwrap()
            .get(path.trim_start_matches('/'))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.state.hits.lock().unwrap().values().sum()
    }

    pub fn authorizations(&self) -> Vec<Option<String>> {
        self.state.auth.lock().unwrap().clone()
    }

    pub fn user_agents(&self) -> Vec<String> {
        self.state.user_agents.lock().unwrap().clone()
    }
}

fn handle(mut stream: std::net::TcpStream, state: &State) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let request = parse_request(request);
    if !request.method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    }

    let path = request.path.trim_start_matches('/').to_string();
    *state.hits.lock().unwrap().entry(path.clone()).or_insert(0) += 1;
    state.auth.lock().unwrap().push(request.authorization);
    if let Some(ua) = request.user_agent {
        state.user_agents.lock().unwrap().push(ua);
    }

    let reply = {
        let mut files = state.files.lock().unwrap();
        match files.get_mut(&path) {
            Some(entry) => entry.script.pop_front().unwrap_or_else(|| entry.last.clone()),
            None => Reply::Status(404),
        }
    };
    let (status, body) = match reply {
        Reply::Body(body) => ("200 OK".to_string(), body),
        Reply::Status(code) => (format!("{} {}", code, reason(code)), Vec::new()),
    };
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&body);
}

fn reason(code: u16) -> &'static str {
    match code {
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

struct Request<'a> {
    method: &'a str,
    path: &'a str,
    authorization: Option<String>,
    user_agent: Option<String>,
}

fn parse_request(request: &str) -> Request<'_> {
    let mut lines = request.lines();
    let mut first = lines.next().unwrap_or("").split_whitespace();
    let method = first.next().unwrap_or("");
    let path = first.next().unwrap_or("/");
    let mut authorization = None;
    let mut user_agent = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("authorization") {
                authorization = Some(value.trim().to_string());
            } else if name.trim().eq_ignore_ascii_case("user-agent") {
                user_agent = Some(value.trim().to_string());
            }
        }
    }
    Request {
        method,
        path,
        authorization,
        user_agent,
    }
}
