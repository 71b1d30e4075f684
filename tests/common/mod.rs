// tests/common/mod.rs

//! Shared test utilities: a scripted in-memory transport and fixtures.

#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ctflink::{Session, Transport, TransportError};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;

pub const SERVER: &str = "https://ctf.example.com";
pub const TOKEN: &str = "tok-1001";

type Handler = Box<dyn FnMut(&[Value]) -> Result<Value, TransportError> + Send>;

/// One recorded transport call
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Service name, the last segment of the endpoint path
    pub service: String,
    pub operation: String,
    /// Arguments as sent, session token first for authenticated calls
    pub args: Vec<Value>,
}

/// Transport that answers from per-operation handlers and records every call
///
/// Operations without a handler fail with an `UnscriptedOperation` fault.
#[derive(Default)]
pub struct MockTransport {
    handlers: Mutex<HashMap<String, Handler>>,
    calls: Mutex<Vec<Call>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer `operation` with a handler over the call arguments
    pub fn on<F>(&self, operation: &str, handler: F)
    where
        F: FnMut(&[Value]) -> Result<Value, TransportError> + Send + 'static,
    {
        self.handlers
            .lock()
            .unwrap()
            .insert(operation.to_string(), Box::new(handler));
    }

    /// Answer `operation` with the same value every time
    pub fn reply(&self, operation: &str, value: Value) {
        self.on(operation, move |_| Ok(value.clone()));
    }

    /// Fail `operation` with the same error every time
    pub fn fail(&self, operation: &str, err: TransportError) {
        self.on(operation, move |_| Err(err.clone()));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls of one operation, in order
    pub fn calls_to(&self, operation: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.operation == operation)
            .collect()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls_to(operation).len()
    }

    /// Forget recorded calls (handlers stay)
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl Transport for MockTransport {
    fn call(&self, endpoint: &Url, operation: &str, args: &[Value]) -> Result<Value, TransportError> {
        let service = endpoint
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string();
        self.calls.lock().unwrap().push(Call {
            service,
            operation: operation.to_string(),
            args: args.to_vec(),
        });

        let mut handlers = self.handlers.lock().unwrap();
        match handlers.get_mut(operation) {
            Some(handler) => handler(args),
            None => Err(TransportError::fault(
                "UnscriptedOperation",
                format!("no reply scripted for {}", operation),
            )),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Log in against the mock; recorded calls are cleared afterwards
pub fn login(mock: &Arc<MockTransport>) -> Session {
    mock.reply("login", json!(TOKEN));
    let session = Session::login(SERVER, "builder", "secret", mock.clone()).unwrap();
    mock.clear_calls();
    session
}

/// Listing reply of `{id, title}` rows
pub fn rows(entries: &[(&str, &str)]) -> Value {
    Value::Array(
        entries
            .iter()
            .map(|(id, title)| json!({"id": id, "title": title}))
            .collect(),
    )
}

/// Listing reply that reflects later creations, for idempotence checks
pub fn shared_rows(entries: &[(&str, &str)]) -> Arc<Mutex<Vec<Value>>> {
    match rows(entries) {
        Value::Array(items) => Arc::new(Mutex::new(items)),
        _ => unreachable!(),
    }
}

/// Bytes carried by a base64 chunk argument
pub fn decode_chunk(arg: &Value) -> Vec<u8> {
    STANDARD.decode(arg.as_str().unwrap()).unwrap()
}

pub fn timeout(endpoint: &str) -> TransportError {
    TransportError::Timeout {
        endpoint: format!("{}/ce-soap50/services/{}", SERVER, endpoint),
        message: "operation timed out".to_string(),
    }
}
