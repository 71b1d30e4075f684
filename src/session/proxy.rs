// src/session/proxy.rs
//! Per-session service proxies
//!
//! Each TeamForge subsystem lives behind its own endpoint under
//! `/ce-soap50/services/`. A [`ServiceProxy`] binds one endpoint to the
//! session's transport; the [`ProxyCache`] builds each proxy once and hands
//! out shared references afterwards.

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportError};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::debug;
use url::Url;

/// Path prefix of every service endpoint
pub const SERVICE_PATH: &str = "/ce-soap50/services/";

/// Remote subsystems reachable through a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    /// Login, projects, users and groups
    CollabNet,
    /// Single-shot file uploads
    FileStorage,
    /// Chunked file uploads
    SimpleFileStorage,
    /// File Release System: packages, releases, release files
    Frs,
    /// Role-based access control
    Rbac,
    /// Trackers and artifacts
    Tracker,
    /// Document folders and documents
    Document,
}

impl Subsystem {
    /// Service name used in the endpoint path
    pub fn service_name(&self) -> &'static str {
        match self {
            Subsystem::CollabNet => "CollabNet",
            Subsystem::FileStorage => "FileStorageApp",
            Subsystem::SimpleFileStorage => "SimpleFileStorageApp",
            Subsystem::Frs => "FrsApp",
            Subsystem::Rbac => "RbacApp",
            Subsystem::Tracker => "TrackerApp",
            Subsystem::Document => "DocumentApp",
        }
    }

    /// Build the endpoint URL of this subsystem on a server
    pub fn endpoint(&self, server_url: &str) -> Result<Url> {
        let raw = format!("{}{}{}", server_url, SERVICE_PATH, self.service_name());
        Url::parse(&raw).map_err(|e| Error::ServiceUnavailable {
            subsystem: self.service_name().to_string(),
            message: format!("Invalid endpoint '{}': {}", raw, e),
        })
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service_name())
    }
}

/// Client handle bound to one subsystem endpoint
pub struct ServiceProxy {
    subsystem: Subsystem,
    endpoint: Url,
    transport: Arc<dyn Transport>,
}

impl ServiceProxy {
    /// Bind a subsystem endpoint on `server_url` to a transport
    pub fn new(server_url: &str, subsystem: Subsystem, transport: Arc<dyn Transport>) -> Result<Self> {
        let endpoint = subsystem.endpoint(server_url)?;
        transport
            .describe(&endpoint)
            .map_err(|e| Error::ServiceUnavailable {
                subsystem: subsystem.service_name().to_string(),
                message: e.to_string(),
            })?;

        debug!("Bound {} proxy to {} via {}", subsystem, endpoint, transport.name());
        Ok(Self {
            subsystem,
            endpoint,
            transport,
        })
    }

    pub fn subsystem(&self) -> Subsystem {
        self.subsystem
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Invoke an operation on this endpoint
    pub fn call(&self, operation: &str, args: &[Value]) -> std::result::Result<Value, TransportError> {
        self.transport.call(&self.endpoint, operation, args)
    }
}

impl fmt::Debug for ServiceProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProxy")
            .field("subsystem", &self.subsystem)
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

/// Lazily populated proxies, one per subsystem
pub struct ProxyCache {
    server_url: String,
    transport: Arc<dyn Transport>,
    proxies: Mutex<HashMap<Subsystem, Arc<ServiceProxy>>>,
}

impl ProxyCache {
    pub fn new(server_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            server_url: server_url.into(),
            transport,
            proxies: Mutex::new(HashMap::new()),
        }
    }

    /// Get the proxy for a subsystem, constructing it on first use
    ///
    /// The endpoint is described without holding the cache lock. Two threads
    /// racing on the same subsystem may both build a proxy; the first one
    /// stored wins.
    pub fn get(&self, subsystem: Subsystem) -> Result<Arc<ServiceProxy>> {
        if let Some(proxy) = self.proxies.lock().unwrap_or_else(|e| e.into_inner()).get(&subsystem) {
            return Ok(Arc::clone(proxy));
        }

        let built = Arc::new(ServiceProxy::new(
            &self.server_url,
            subsystem,
            Arc::clone(&self.transport),
        )?);
        let mut proxies = self.proxies.lock().unwrap_or_else(|e| e.into_inner());
        Ok(Arc::clone(proxies.entry(subsystem).or_insert(built)))
    }

    /// Number of proxies constructed so far
    pub fn len(&self) -> usize {
        self.proxies.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
