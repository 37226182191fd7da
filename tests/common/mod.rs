//! Shared test infrastructure for integration tests.
//!
//! `MockApi` is an in-process stub of the extintor API: token auth, CRUD on
//! `/extintor`, and the Portuguese error messages the template suite asserts.
#![allow(dead_code)]

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Response, Server};

pub const API_TOKEN: &str = "UNICORNIOcolorido123";

const REQUIRED_FIELDS: [&str; 3] = ["nome", "tipo", "validade"];

struct ApiState {
    next_id: u64,
    extintores: BTreeMap<u64, Value>,
}

/// In-process extintor API stub bound to an ephemeral localhost port.
pub struct MockApi {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    base_url: String,
}

impl MockApi {
    pub fn start() -> Self {
        let server = Server::http("127.0.0.1:0").expect("bind stub server");
        let addr = server.server_addr().to_ip().expect("stub socket addr");
        let base_url = format!("http://{addr}");
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let state = Mutex::new(ApiState {
                    next_id: 1,
                    extintores: BTreeMap::new(),
                });
                while !stop.load(Ordering::SeqCst) {
                    match server.recv_timeout(Duration::from_millis(25)) {
                        Ok(Some(request)) => handle_request(request, &state),
                        Ok(None) => {}
                        Err(_) => break,
                    }
                }
            })
        };
        MockApi {
            stop,
            handle: Some(handle),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn handle_request(mut request: tiny_http::Request, state: &Mutex<ApiState>) {
    let token_ok = request
        .headers()
        .iter()
        .any(|header| header.field.equiv("x-api-token") && header.value.as_str() == API_TOKEN);
    if !token_ok {
        respond(request, 401, &json!({"message": "Token de acesso inválido"}));
        return;
    }

    let method = request.method().as_str().to_string();
    let url = request.url().to_string();
    let path = url.split_once('?').map_or(url.as_str(), |(path, _)| path);
    let route = parse_route(path);

    let mut body = String::new();
    let _ = request.as_reader().read_to_string(&mut body);

    match (method.as_str(), route) {
        ("GET", Route::Collection) => {
            let list: Vec<Value> = {
                let state = state.lock().expect("stub state");
                state.extintores.values().cloned().collect()
            };
            respond(request, 200, &Value::Array(list));
        }
        ("POST", Route::Collection) => create_extintor(request, state, &body),
        ("GET", Route::Entity(id)) => read_extintor(request, state, id),
        ("PATCH", Route::Entity(id)) => update_extintor(request, state, id, &body),
        ("DELETE", Route::Entity(id)) => delete_extintor(request, state, id),
        (_, Route::Malformed) => {
            respond(request, 400, &json!({"message": "O id informado é inválido"}));
        }
        _ => respond(request, 404, &json!({"message": "Rota não encontrada"})),
    }
}

enum Route {
    Collection,
    Entity(u64),
    Malformed,
    Unknown,
}

fn parse_route(path: &str) -> Route {
    let trimmed = path.trim_end_matches('/');
    if trimmed == "/extintor" {
        return Route::Collection;
    }
    match trimmed.strip_prefix("/extintor/") {
        Some(raw) if !raw.is_empty() => match raw.parse::<u64>() {
            Ok(id) => Route::Entity(id),
            Err(_) => Route::Malformed,
        },
        _ => Route::Unknown,
    }
}

fn create_extintor(request: tiny_http::Request, state: &Mutex<ApiState>, body: &str) {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => {
            respond(request, 400, &json!({"message": "Corpo da requisição inválido"}));
            return;
        }
    };
    if let Some(message) = field_violation(&parsed, true) {
        respond(request, 400, &json!({"message": message}));
        return;
    }
    let entity = {
        let mut state = state.lock().expect("stub state");
        let id = state.next_id;
        state.next_id += 1;
        let entity = json!({
            "id": id,
            "nome": parsed["nome"],
            "tipo": parsed["tipo"],
            "validade": parsed["validade"],
        });
        state.extintores.insert(id, entity.clone());
        entity
    };
    respond(request, 201, &entity);
}

fn read_extintor(request: tiny_http::Request, state: &Mutex<ApiState>, id: u64) {
    let entity = state.lock().expect("stub state").extintores.get(&id).cloned();
    match entity {
        Some(entity) => respond(request, 200, &entity),
        None => respond_not_found(request),
    }
}

fn update_extintor(request: tiny_http::Request, state: &Mutex<ApiState>, id: u64, body: &str) {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => {
            respond(request, 400, &json!({"message": "Corpo da requisição inválido"}));
            return;
        }
    };
    if let Some(message) = field_violation(&parsed, false) {
        respond(request, 400, &json!({"message": message}));
        return;
    }
    let updated = {
        let mut state = state.lock().expect("stub state");
        match state.extintores.get_mut(&id) {
            Some(entity) => {
                for name in REQUIRED_FIELDS {
                    if let Some(value) = parsed.get(name) {
                        entity[name] = value.clone();
                    }
                }
                Some(entity.clone())
            }
            None => None,
        }
    };
    match updated {
        Some(entity) => respond(request, 200, &entity),
        None => respond_not_found(request),
    }
}

fn delete_extintor(request: tiny_http::Request, state: &Mutex<ApiState>, id: u64) {
    let removed = state.lock().expect("stub state").extintores.remove(&id);
    match removed {
        Some(_) => respond(
            request,
            200,
            &json!({"message": "Extintor removido com sucesso"}),
        ),
        None => respond_not_found(request),
    }
}

/// Field check mirroring the API contract: every field required on create,
/// provided fields must be strings on update.
fn field_violation(body: &Value, require_all: bool) -> Option<String> {
    let Some(fields) = body.as_object() else {
        return Some("Corpo da requisição inválido".to_string());
    };
    for name in REQUIRED_FIELDS {
        match fields.get(name) {
            None if require_all => return Some(format!("O campo {name} é obrigatório")),
            None => {}
            Some(Value::String(_)) => {}
            Some(_) => {
                return Some(format!(
                    "O campo {name} possui tipo inválido. Esperado: string"
                ))
            }
        }
    }
    None
}

fn respond_not_found(request: tiny_http::Request) {
    respond(request, 404, &json!({"message": "Extintor não encontrado"}));
}

fn respond(request: tiny_http::Request, status: u16, body: &Value) {
    let header = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("content-type header");
    let response = Response::from_data(body.to_string().into_bytes())
        .with_status_code(status)
        .with_header(header);
    let _ = request.respond(response);
}

/// Run the compiled apivet binary with the given arguments.
pub fn run_apivet(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_apivet"))
        .args(args)
        .output()
        .expect("run apivet")
}

pub fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Parse a JSON report artifact written by `apivet run --report`.
pub fn read_report(path: &Path) -> Value {
    let raw = std::fs::read_to_string(path).expect("read report");
    serde_json::from_str(&raw).expect("parse report")
}

/// Write a suite document into `dir` and return its path.
pub fn write_suite(dir: &Path, suite: &Value) -> PathBuf {
    let path = dir.join("suite.json");
    let pretty = serde_json::to_string_pretty(suite).expect("serialize suite");
    std::fs::write(&path, pretty).expect("write suite");
    path
}

/// Minimal suite document wrapping the given scenarios, aimed at the stub.
pub fn suite_doc(base_url: &str, failure_policy: &str, scenarios: Value) -> Value {
    json!({
        "schema_version": 1,
        "name": "stub contract",
        "base_url": base_url,
        "headers": {"x-api-token": API_TOKEN},
        "failure_policy": failure_policy,
        "timeout_seconds": 5.0,
        "scenarios": scenarios,
    })
}
