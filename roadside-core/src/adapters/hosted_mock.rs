//! Mock hosted backend server for testing
//!
//! Simulates the auth and table endpoints the hosted adapter talks to:
//! - POST /auth/v1/signup, POST /auth/v1/token, GET /auth/v1/user,
//!   POST /auth/v1/logout
//! - GET /rest/v1/profiles, GET/POST /rest/v1/requests
//!
//! State lives in memory for the lifetime of the server.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use chrono::Utc;
use serde_json::{json, Value as JsonValue};

/// Mock hosted server for testing
pub struct MockHostedServer {
    port: u16,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<ServerState>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

/// Failure and latency knobs
#[derive(Debug, Clone, Default)]
pub struct MockHostedConfig {
    /// Delay in milliseconds before answering GET /auth/v1/user
    pub identity_delay_ms: u64,
    /// Delay in milliseconds before answering GET /rest/v1/profiles
    pub profiles_delay_ms: u64,
    /// Answer every profiles query with a server error
    pub fail_profiles: bool,
    /// Serve old-shaped rows from /rest/v1/requests
    pub legacy_rows: bool,
}

#[derive(Debug, Clone)]
struct MockUser {
    id: String,
    email: String,
    password: String,
}

#[derive(Default)]
struct ServerState {
    users: HashMap<String, MockUser>,
    access_tokens: HashMap<String, String>,
    refresh_tokens: HashMap<String, String>,
    requests: Vec<JsonValue>,
    next_request_id: i64,
}

impl ServerState {
    fn create_user(&mut self, email: &str, password: &str) -> MockUser {
        let user = MockUser {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        self.users.insert(email.to_string(), user.clone());
        user
    }

    fn issue_tokens(&mut self, user: &MockUser) -> JsonValue {
        let access = format!("at-{}", uuid::Uuid::new_v4());
        let refresh = format!("rt-{}", uuid::Uuid::new_v4());
        self.access_tokens.insert(access.clone(), user.email.clone());
        self.refresh_tokens.insert(refresh.clone(), user.email.clone());
        json!({
            "access_token": access,
            "refresh_token": refresh,
            "token_type": "bearer",
            "expires_in": 3600,
            "user": {"id": user.id, "email": user.email}
        })
    }

    fn user_for_token(&self, token: &str) -> Option<&MockUser> {
        self.access_tokens
            .get(token)
            .and_then(|email| self.users.get(email))
    }
}

impl MockHostedServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockHostedConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();
        let state = Arc::new(Mutex::new(ServerState::default()));
        let state_clone = state.clone();

        // Set listener to non-blocking for graceful shutdown
        listener.set_nonblocking(true)?;

        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        let state = state_clone.clone();
                        thread::spawn(move || {
                            handle_connection(stream, &cfg, &state);
                        });
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            state,
            thread_handle: Some(thread_handle),
        })
    }

    /// Get the base URL for this mock server
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Create (or reuse) an account and hand out an access token for it,
    /// as the provider would after a completed OAuth consent
    pub fn issue_token(&self, email: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let user = match state.users.get(email) {
            Some(user) => user.clone(),
            None => state.create_user(email, ""),
        };
        let tokens = state.issue_tokens(&user);
        tokens["access_token"].as_str().unwrap().to_string()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockHostedServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Read one HTTP request: head plus a Content-Length body
fn read_request(stream: &mut TcpStream) -> Option<(String, String)> {
    let mut data = Vec::new();
    let mut buffer = [0; 4096];
    let head_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..head_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while data.len() < head_end + content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
    }
    let body = String::from_utf8_lossy(&data[head_end..]).to_string();
    Some((head, body))
}

fn header<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
        .map(|(_, value)| value.trim())
}

fn bearer(head: &str) -> Option<&str> {
    header(head, "authorization").and_then(|value| {
        value
            .strip_prefix("Bearer ")
            .or_else(|| value.strip_prefix("bearer "))
    })
}

fn handle_connection(mut stream: TcpStream, config: &MockHostedConfig, state: &Mutex<ServerState>) {
    let _ = stream.set_nonblocking(false);
    let Some((head, body)) = read_request(&mut stream) else {
        return;
    };

    let first_line = head.lines().next().unwrap_or("");
    let parts: Vec<&str> = first_line.split_whitespace().collect();
    if parts.len() < 2 {
        send_response(&mut stream, 400, r#"{"error": "Invalid request"}"#);
        return;
    }
    let method = parts[0];
    let (path, query) = parts[1].split_once('?').unwrap_or((parts[1], ""));
    let params: HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();

    if header(&head, "apikey").is_none() {
        send_response(&mut stream, 401, r#"{"message": "No API key found in request"}"#);
        return;
    }

    let payload: JsonValue = serde_json::from_str(&body).unwrap_or(JsonValue::Null);

    match (method, path) {
        ("POST", "/auth/v1/signup") => {
            let email = payload["email"].as_str().unwrap_or_default();
            let password = payload["password"].as_str().unwrap_or_default();
            let mut state = state.lock().unwrap();
            if state.users.contains_key(email) {
                send_response(
                    &mut stream,
                    422,
                    r#"{"code": 422, "msg": "User already registered"}"#,
                );
                return;
            }
            let user = state.create_user(email, password);
            let tokens = state.issue_tokens(&user);
            send_response(&mut stream, 200, &tokens.to_string());
        }
        ("POST", "/auth/v1/token") => {
            let mut state = state.lock().unwrap();
            let user = match params.get("grant_type").map(String::as_str) {
                Some("password") => {
                    let email = payload["email"].as_str().unwrap_or_default();
                    let password = payload["password"].as_str().unwrap_or_default();
                    state
                        .users
                        .get(email)
                        .filter(|u| u.password == password)
                        .cloned()
                }
                Some("refresh_token") => {
                    let token = payload["refresh_token"].as_str().unwrap_or_default();
                    state
                        .refresh_tokens
                        .remove(token)
                        .and_then(|email| state.users.get(&email).cloned())
                }
                _ => None,
            };
            match user {
                Some(user) => {
                    let tokens = state.issue_tokens(&user);
                    send_response(&mut stream, 200, &tokens.to_string());
                }
                None => send_response(
                    &mut stream,
                    400,
                    r#"{"error": "invalid_grant", "error_description": "Invalid login credentials"}"#,
                ),
            }
        }
        ("GET", "/auth/v1/user") => {
            if config.identity_delay_ms > 0 {
                thread::sleep(std::time::Duration::from_millis(config.identity_delay_ms));
            }
            let state = state.lock().unwrap();
            match bearer(&head).and_then(|token| state.user_for_token(token)) {
                Some(user) => {
                    let body = json!({"id": user.id, "email": user.email, "aud": "authenticated"});
                    send_response(&mut stream, 200, &body.to_string());
                }
                None => send_response(&mut stream, 401, r#"{"msg": "Invalid token"}"#),
            }
        }
        ("POST", "/auth/v1/logout") => {
            let mut state = state.lock().unwrap();
            if let Some(token) = bearer(&head) {
                state.access_tokens.remove(token);
            }
            send_response(&mut stream, 204, "");
        }
        ("GET", "/rest/v1/profiles") => {
            if config.profiles_delay_ms > 0 {
                thread::sleep(std::time::Duration::from_millis(config.profiles_delay_ms));
            }
            if config.fail_profiles {
                send_response(
                    &mut stream,
                    500,
                    r#"{"message": "relation \"profiles\" is unavailable"}"#,
                );
                return;
            }
            let state = state.lock().unwrap();
            let wanted = params
                .get("id")
                .and_then(|v| v.strip_prefix("eq."))
                .unwrap_or_default();
            let rows: Vec<JsonValue> = state
                .users
                .values()
                .filter(|u| u.id == wanted)
                .map(|u| json!({"id": u.id, "email": u.email, "role": "user", "approved": true}))
                .collect();
            send_response(&mut stream, 200, &JsonValue::Array(rows).to_string());
        }
        ("GET", "/rest/v1/requests") => {
            if config.legacy_rows {
                send_response(&mut stream, 200, &legacy_rows().to_string());
                return;
            }
            let state = state.lock().unwrap();
            let owner = params.get("user_id").and_then(|v| v.strip_prefix("eq."));
            let mut rows: Vec<JsonValue> = state
                .requests
                .iter()
                .filter(|row| owner.map_or(true, |id| row["user_id"] == json!(id)))
                .cloned()
                .collect();
            rows.reverse();
            send_response(&mut stream, 200, &JsonValue::Array(rows).to_string());
        }
        ("POST", "/rest/v1/requests") => {
            let mut state = state.lock().unwrap();
            state.next_request_id += 1;
            let mut row = payload;
            if let Some(obj) = row.as_object_mut() {
                obj.insert("id".to_string(), json!(state.next_request_id));
                obj.insert(
                    "created_at".to_string(),
                    json!(Utc::now().format("%Y-%m-%d %H:%M:%S%.6f+00").to_string()),
                );
            }
            state.requests.push(row.clone());
            let body = if header(&head, "prefer") == Some("return=representation") {
                JsonValue::Array(vec![row]).to_string()
            } else {
                String::new()
            };
            send_response(&mut stream, 201, &body);
        }
        _ => send_response(&mut stream, 404, r#"{"message": "Endpoint not found"}"#),
    }
}

/// Rows written by older clients
fn legacy_rows() -> JsonValue {
    json!([
        {
            "id": 1,
            "created_at": "2024-04-01 09:00:00+00",
            "user_id": "u1",
            "user_email": "a@x.com",
            "vehicle": "{\"make\":\"Ford\",\"model\":\"Focus\"}",
            "issue_description": "Won't start",
            "contact": "{\"name\":\"Ann\",\"phone\":\"123\"}",
            "status": "pending"
        },
        {
            "id": 2,
            "created_at": "2024-05-01 09:00:00+00",
            "user_id": "u1",
            "user_email": "a@x.com",
            "vehicle_make": "Ford",
            "vehicle_model": "Focus",
            "issue": "Flat tire",
            "contact_name": "Ann",
            "contact_phone": "123",
            "status": "done"
        }
    ])
}

fn send_response(stream: &mut TcpStream, status: u16, body: &str) {
    let status_text = match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        422 => "Unprocessable Entity",
        _ => "Internal Server Error",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
