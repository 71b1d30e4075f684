// src/transport/http.rs

//! HTTP transport for the service gateway
//!
//! Posts a JSON envelope `{"operation": .., "args": [..]}` to the endpoint
//! and expects `{"result": ..}` or `{"fault": {"code": .., "message": ..}}`
//! back. Faults may arrive with any HTTP status.
//!
//! Describing an endpoint fetches its service description (`GET ?wsdl`). Any
//! answer other than 404 or a server error counts as a live service.

use super::{Transport, TransportError};
use crate::error::{Error, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default timeout for HTTP requests (30 seconds)
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct Envelope<'a> {
    operation: &'a str,
    args: &'a [Value],
}

#[derive(Deserialize)]
struct Reply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    fault: Option<FaultBody>,
}

#[derive(Deserialize)]
struct FaultBody {
    code: String,
    #[serde(default)]
    message: String,
}

/// Blocking HTTP transport backed by reqwest
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the default timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(HTTP_TIMEOUT)
    }

    /// Create a transport with a custom per-request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    fn classify(endpoint: &Url, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                endpoint: endpoint.to_string(),
                message: err.to_string(),
            }
        } else {
            TransportError::Connect {
                endpoint: endpoint.to_string(),
                message: err.to_string(),
            }
        }
    }
}

impl Transport for HttpTransport {
    fn call(&self, endpoint: &Url, operation: &str, args: &[Value]) -> std::result::Result<Value, TransportError> {
        debug!("POST {} operation={}", endpoint, operation);

        let response = self
            .client
            .post(endpoint.clone())
            .json(&Envelope { operation, args })
            .send()
            .map_err(|e| Self::classify(endpoint, e))?;

        let status = response.status();
        let body = response.text().map_err(|e| Self::classify(endpoint, e))?;

        let reply: Option<Reply> = serde_json::from_str(&body).ok();
        match reply {
            Some(Reply { fault: Some(fault), .. }) => Err(TransportError::Fault {
                code: fault.code,
                message: fault.message,
            }),
            Some(reply) if status.is_success() => Ok(reply.result.unwrap_or(Value::Null)),
            _ => Err(TransportError::Protocol {
                endpoint: endpoint.to_string(),
                message: format!("HTTP {status} for {operation}"),
            }),
        }
    }

    fn describe(&self, endpoint: &Url) -> std::result::Result<(), TransportError> {
        let mut descriptor = endpoint.clone();
        descriptor.set_query(Some("wsdl"));
        debug!("GET {}", descriptor);

        let response = self
            .client
            .get(descriptor)
            .send()
            .map_err(|e| Self::classify(endpoint, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status.is_server_error() {
            return Err(TransportError::Protocol {
                endpoint: endpoint.to_string(),
                message: format!("HTTP {status} for the service description"),
            });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use serde_json::json;

    fn can_bind_localhost() -> bool {
        std::net::TcpListener::bind("127.0.0.1:0").is_ok()
    }

    #[test]
    fn test_call_returns_result() {
        if !can_bind_localhost() {
            eprintln!("Skipping httpmock tests: cannot bind to localhost");
            return;
        }
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/ce-soap50/services/FrsApp")
                .json_body(json!({"operation": "getPackageList", "args": ["tok", "proj1001"]}));
            then.status(200)
                .json_body(json!({"result": [{"id": "pkg1001", "title": "nightly"}]}));
        });

        let transport = HttpTransport::new().unwrap();
        let endpoint = Url::parse(&server.url("/ce-soap50/services/FrsApp")).unwrap();
        let value = transport
            .call(&endpoint, "getPackageList", &[json!("tok"), json!("proj1001")])
            .unwrap();

        mock.assert();
        assert_eq!(value[0]["id"], "pkg1001");
    }

    #[test]
    fn test_call_maps_fault() {
        if !can_bind_localhost() {
            eprintln!("Skipping httpmock tests: cannot bind to localhost");
            return;
        }
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/ce-soap50/services/CollabNet");
            then.status(500).json_body(json!({
                "fault": {"code": "InvalidSessionFault", "message": "session expired"}
            }));
        });

        let transport = HttpTransport::new().unwrap();
        let endpoint = Url::parse(&server.url("/ce-soap50/services/CollabNet")).unwrap();
        let err = transport.call(&endpoint, "getVersion", &[json!("tok")]).unwrap_err();

        assert!(err.is_invalid_session());
    }

    #[test]
    fn test_call_rejects_non_envelope_body() {
        if !can_bind_localhost() {
            eprintln!("Skipping httpmock tests: cannot bind to localhost");
            return;
        }
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/ce-soap50/services/TrackerApp");
            then.status(502).body("<html>bad gateway</html>");
        });

        let transport = HttpTransport::new().unwrap();
        let endpoint = Url::parse(&server.url("/ce-soap50/services/TrackerApp")).unwrap();
        let err = transport.call(&endpoint, "getTrackerList", &[]).unwrap_err();

        assert!(matches!(err, TransportError::Protocol { .. }));
        assert!(!err.is_connectivity());
    }

    #[test]
    fn test_describe_checks_service_description() {
        if !can_bind_localhost() {
            eprintln!("Skipping httpmock tests: cannot bind to localhost");
            return;
        }
        let server = MockServer::start();
        let live = server.mock(|when, then| {
            when.method(GET).path("/ce-soap50/services/FrsApp");
            then.status(200).body("<definitions/>");
        });
        server.mock(|when, then| {
            when.method(GET).path("/ce-soap50/services/NoSuchApp");
            then.status(404);
        });

        let transport = HttpTransport::new().unwrap();
        let endpoint = Url::parse(&server.url("/ce-soap50/services/FrsApp")).unwrap();
        transport.describe(&endpoint).unwrap();
        live.assert();

        let missing = Url::parse(&server.url("/ce-soap50/services/NoSuchApp")).unwrap();
        let err = transport.describe(&missing).unwrap_err();
        assert!(matches!(err, TransportError::Protocol { .. }));
    }

    #[test]
    fn test_describe_unreachable_endpoint() {
        let transport = HttpTransport::with_timeout(Duration::from_secs(2)).unwrap();
        let endpoint = Url::parse("http://127.0.0.1:9/ce-soap50/services/FrsApp").unwrap();
        assert!(transport.describe(&endpoint).unwrap_err().is_connectivity());
    }

    #[test]
    fn test_unreachable_endpoint_is_connectivity() {
        // Port 9 (discard) on localhost is not expected to accept connections
        let transport = HttpTransport::with_timeout(Duration::from_secs(2)).unwrap();
        let endpoint = Url::parse("http://127.0.0.1:9/ce-soap50/services/FrsApp").unwrap();
        let err = transport.call(&endpoint, "getPackageList", &[]).unwrap_err();

        assert!(err.is_connectivity());
    }
}
