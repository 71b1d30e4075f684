// src/session/mod.rs

//! Authenticated session handle
//!
//! A [`Session`] owns the server URL, the username, the session token and the
//! per-session [`ProxyCache`]. Facades borrow a session and go through
//! [`Session::lookup`] (listing/query calls) or [`Session::invoke`]
//! (mutating calls), which validate the token first, prepend it to the
//! arguments and translate transport failures into [`Error`] variants.
//!
//! Once a token is invalidated, either by [`Session::logoff`] or by the
//! server answering `InvalidSessionFault`, the session is revoked and every
//! further operation fails with [`Error::SessionInvalid`]. The caller has to
//! log in again.

pub mod proxy;

pub use proxy::{ProxyCache, ServiceProxy, Subsystem};

use crate::config::{ConnectionSettings, sanitize_server_url};
use crate::error::{Error, Result};
use crate::transport::{FAULT_LOGIN, Transport, TransportError};
use crate::version::ApiVersion;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Portable form of a live session
///
/// Lets another process (for example a build agent) reuse a session without
/// re-authenticating. The token is a credential; keep tickets out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTicket {
    pub server_url: String,
    pub username: String,
    pub token: String,
}

impl fmt::Debug for SessionTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTicket")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
enum TokenState {
    Active(String),
    Revoked(String),
}

/// Authenticated connection to a TeamForge server
pub struct Session {
    server_url: String,
    username: String,
    token: RwLock<TokenState>,
    created_at: DateTime<Utc>,
    proxies: ProxyCache,
}

impl Session {
    fn unauthenticated(server_url: &str, username: &str, transport: Arc<dyn Transport>) -> Self {
        let server_url = sanitize_server_url(server_url);
        Self {
            proxies: ProxyCache::new(server_url.clone(), transport),
            server_url,
            username: username.to_string(),
            token: RwLock::new(TokenState::Revoked("not logged in".to_string())),
            created_at: Utc::now(),
        }
    }

    /// Log in with a username and password
    pub fn login(
        server_url: &str,
        username: &str,
        password: &str,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let session = Self::unauthenticated(server_url, username, transport);
        let token = session.authenticate("login", vec![username.into(), password.into()])?;
        session.activate(token);
        info!("Logged in to {} as {}", session.server_url, session.username);
        Ok(session)
    }

    /// Log in with resolved connection settings
    pub fn login_with_settings(settings: &ConnectionSettings, transport: Arc<dyn Transport>) -> Result<Self> {
        Self::login(&settings.url, &settings.username, &settings.password, transport)
    }

    /// Log in with a one-time token issued by the server
    pub fn login_with_token(
        server_url: &str,
        username: &str,
        one_time_token: &str,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let session = Self::unauthenticated(server_url, username, transport);
        let token = session.authenticate("loginWithToken", vec![username.into(), one_time_token.into()])?;
        session.activate(token);
        info!("Logged in to {} as {} with a one-time token", session.server_url, session.username);
        Ok(session)
    }

    /// Rebuild a session from a ticket without contacting the server
    pub fn from_ticket(ticket: &SessionTicket, transport: Arc<dyn Transport>) -> Self {
        let session = Self::unauthenticated(&ticket.server_url, &ticket.username, transport);
        if !ticket.token.is_empty() {
            session.activate(ticket.token.clone());
        }
        debug!("Reusing session ticket for {} on {}", session.username, session.server_url);
        session
    }

    /// Export the session so another process can reuse it
    pub fn ticket(&self) -> Result<SessionTicket> {
        Ok(SessionTicket {
            server_url: self.server_url.clone(),
            username: self.username.clone(),
            token: self.token()?,
        })
    }

    fn authenticate(&self, operation: &str, args: Vec<Value>) -> Result<String> {
        let proxy = self.proxies.get(Subsystem::CollabNet)?;
        let reply = proxy.call(operation, &args).map_err(|e| Error::Authentication {
            username: self.username.clone(),
            message: match &e {
                TransportError::Fault { code, message } if code == FAULT_LOGIN => message.clone(),
                other => other.to_string(),
            },
        })?;

        match reply {
            Value::String(token) if !token.is_empty() => Ok(token),
            _ => Err(Error::Authentication {
                username: self.username.clone(),
                message: "server returned no session token".to_string(),
            }),
        }
    }

    fn activate(&self, token: String) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = TokenState::Active(token);
    }

    fn revoke(&self, reason: &str) {
        let mut state = self.token.write().unwrap_or_else(|e| e.into_inner());
        if matches!(*state, TokenState::Active(_)) {
            *state = TokenState::Revoked(reason.to_string());
        }
    }

    /// Fail unless the session holds a live token
    pub fn validate(&self) -> Result<()> {
        self.token().map(|_| ())
    }

    /// Current token, if the session is live
    pub fn token(&self) -> Result<String> {
        match &*self.token.read().unwrap_or_else(|e| e.into_inner()) {
            TokenState::Active(token) if !token.is_empty() => Ok(token.clone()),
            TokenState::Active(_) => Err(Error::SessionInvalid("empty session token".to_string())),
            TokenState::Revoked(reason) => Err(Error::SessionInvalid(reason.clone())),
        }
    }

    pub fn is_active(&self) -> bool {
        self.validate().is_ok()
    }

    /// End the session
    ///
    /// The token is dropped locally before the remote call, so it is never
    /// used again even when the server-side logoff fails. Calling this on a
    /// session that is already logged off does nothing.
    pub fn logoff(&self) -> Result<()> {
        let token = {
            let mut state = self.token.write().unwrap_or_else(|e| e.into_inner());
            match std::mem::replace(&mut *state, TokenState::Revoked("logged off".to_string())) {
                TokenState::Active(token) => token,
                previous @ TokenState::Revoked(_) => {
                    *state = previous;
                    return Ok(());
                }
            }
        };

        let proxy = self.proxies.get(Subsystem::CollabNet)?;
        match proxy.call("logoff", &[self.username.clone().into(), token.into()]) {
            Ok(_) => {
                info!("Logged off {} from {}", self.username, self.server_url);
                Ok(())
            }
            Err(e) => {
                warn!("Remote logoff for {} failed: {}", self.username, e);
                Err(Error::RemoteCall {
                    operation: "logoff".to_string(),
                    message: e.to_string(),
                })
            }
        }
    }

    /// API version the server speaks (does not need a token)
    pub fn api_version(&self) -> Result<ApiVersion> {
        let proxy = self.proxies.get(Subsystem::CollabNet)?;
        let reply = proxy.call("getApiVersion", &[]).map_err(|e| Error::RemoteLookup {
            operation: "getApiVersion".to_string(),
            message: e.to_string(),
        })?;
        let text: String = decode("getApiVersion", reply)?;
        text.parse()
    }

    /// Server product version string
    pub fn server_version(&self) -> Result<String> {
        let reply = self.lookup(Subsystem::CollabNet, "getVersion", Vec::new())?;
        decode("getVersion", reply)
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Proxy for a subsystem, from this session's cache
    pub fn proxy(&self, subsystem: Subsystem) -> Result<Arc<ServiceProxy>> {
        self.proxies.get(subsystem)
    }

    fn call(
        &self,
        subsystem: Subsystem,
        operation: &str,
        args: Vec<Value>,
    ) -> std::result::Result<Value, CallError> {
        let token = self.token()?;
        let proxy = self.proxies.get(subsystem)?;

        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(Value::String(token));
        full.extend(args);

        debug!("{}.{} ({} args)", subsystem, operation, full.len() - 1);
        proxy.call(operation, &full).map_err(|e| {
            if e.is_invalid_session() {
                warn!("Server invalidated the session of {}: {}", self.username, e);
                self.revoke("invalidated by server");
            }
            CallError::Transport(e)
        })
    }

    /// Issue a listing/query call with the session token prepended
    ///
    /// Transport failures become [`Error::RemoteLookup`], never an empty
    /// result.
    pub fn lookup(&self, subsystem: Subsystem, operation: &str, args: Vec<Value>) -> Result<Value> {
        self.call(subsystem, operation, args)
            .map_err(|e| e.into_error(operation, ErrorKind::Lookup))
    }

    /// Issue a listing call and decode its rows
    pub fn lookup_rows<T: DeserializeOwned>(
        &self,
        subsystem: Subsystem,
        operation: &str,
        args: Vec<Value>,
    ) -> Result<Vec<T>> {
        match self.lookup(subsystem, operation, args)? {
            Value::Null => Ok(Vec::new()),
            value => decode(operation, value),
        }
    }

    /// Issue a mutating call with the session token prepended
    ///
    /// Transport failures become [`Error::RemoteCall`]. Nothing is retried.
    pub fn invoke(&self, subsystem: Subsystem, operation: &str, args: Vec<Value>) -> Result<Value> {
        self.call(subsystem, operation, args)
            .map_err(|e| e.into_error(operation, ErrorKind::Call))
    }

    /// Issue a call whose `NoSuchObjectFault` means "absent"
    pub fn lookup_optional(&self, subsystem: Subsystem, operation: &str, args: Vec<Value>) -> Result<Option<Value>> {
        match self.call(subsystem, operation, args) {
            Ok(value) => Ok(Some(value)),
            Err(CallError::Transport(e)) if e.is_no_such_object() => Ok(None),
            Err(e) => Err(e.into_error(operation, ErrorKind::Lookup)),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .field("active", &self.is_active())
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Decode a reply into a typed value, reporting failures as lookup errors
pub(crate) fn decode<T: DeserializeOwned>(operation: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::RemoteLookup {
        operation: operation.to_string(),
        message: format!("unexpected reply: {e}"),
    })
}

enum ErrorKind {
    Lookup,
    Call,
}

enum CallError {
    Local(Error),
    Transport(TransportError),
}

impl From<Error> for CallError {
    fn from(err: Error) -> Self {
        CallError::Local(err)
    }
}

impl CallError {
    fn into_error(self, operation: &str, kind: ErrorKind) -> Error {
        match self {
            CallError::Local(err) => err,
            CallError::Transport(e) if e.is_invalid_session() => {
                Error::SessionInvalid(format!("{operation}: {e}"))
            }
            CallError::Transport(e) => match kind {
                ErrorKind::Lookup => Error::RemoteLookup {
                    operation: operation.to_string(),
                    message: e.to_string(),
                },
                ErrorKind::Call => Error::RemoteCall {
                    operation: operation.to_string(),
                    message: e.to_string(),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use url::Url;

    /// Replies to login/logoff and records every operation
    struct LoginTransport {
        calls: Mutex<Vec<String>>,
        fail_logoff: bool,
    }

    impl LoginTransport {
        fn new(fail_logoff: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail_logoff,
            })
        }

        fn count(&self, operation: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|op| *op == operation).count()
        }
    }

    impl Transport for LoginTransport {
        fn call(
            &self,
            _endpoint: &Url,
            operation: &str,
            args: &[Value],
        ) -> std::result::Result<Value, TransportError> {
            self.calls.lock().unwrap().push(operation.to_string());
            match operation {
                "login" if args[1] == "secret" => Ok(Value::String("tok-1".to_string())),
                "login" => Err(TransportError::fault(FAULT_LOGIN, "bad password")),
                "logoff" if self.fail_logoff => Err(TransportError::Timeout {
                    endpoint: "ctf".to_string(),
                    message: "timed out".to_string(),
                }),
                "getVersion" if args[0] == "tok-1" => Ok(Value::String("6.2.0".to_string())),
                "getVersion" => Err(TransportError::fault(
                    crate::transport::FAULT_INVALID_SESSION,
                    "unknown session",
                )),
                _ => Ok(Value::Null),
            }
        }

        fn name(&self) -> &str {
            "login"
        }
    }

    #[test]
    fn test_login_and_logoff() {
        let transport = LoginTransport::new(false);
        let session = Session::login("https://ctf.example.com/", "alice", "secret", transport.clone()).unwrap();

        assert_eq!(session.server_url(), "https://ctf.example.com");
        assert_eq!(session.token().unwrap(), "tok-1");
        assert_eq!(session.server_version().unwrap(), "6.2.0");

        session.logoff().unwrap();
        assert!(matches!(session.validate(), Err(Error::SessionInvalid(_))));

        // Second logoff is a no-op
        session.logoff().unwrap();
        assert_eq!(transport.count("logoff"), 1);
    }

    #[test]
    fn test_login_failure_keeps_diagnostic() {
        let transport = LoginTransport::new(false);
        let err = Session::login("https://ctf.example.com", "alice", "wrong", transport).unwrap_err();

        match err {
            Error::Authentication { username, message } => {
                assert_eq!(username, "alice");
                assert_eq!(message, "bad password");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_failed_remote_logoff_still_revokes() {
        let transport = LoginTransport::new(true);
        let session = Session::login("https://ctf.example.com", "alice", "secret", transport.clone()).unwrap();

        assert!(matches!(session.logoff(), Err(Error::RemoteCall { .. })));
        assert!(!session.is_active());
        session.logoff().unwrap();

        let before = transport.calls.lock().unwrap().len();
        assert!(matches!(session.server_version(), Err(Error::SessionInvalid(_))));
        assert_eq!(transport.calls.lock().unwrap().len(), before);
    }

    #[test]
    fn test_ticket_round_trip() {
        let transport = LoginTransport::new(false);
        let session = Session::login("https://ctf.example.com", "alice", "secret", transport.clone()).unwrap();

        let json = serde_json::to_string(&session.ticket().unwrap()).unwrap();
        let ticket: SessionTicket = serde_json::from_str(&json).unwrap();
        let logins = transport.count("login");

        let rebuilt = Session::from_ticket(&ticket, transport.clone());
        assert_eq!(rebuilt.token().unwrap(), "tok-1");
        assert_eq!(rebuilt.username(), "alice");
        assert_eq!(transport.count("login"), logins);
        assert!(!format!("{:?}", ticket).contains("tok-1"));
    }

    #[test]
    fn test_server_invalidation_revokes_session() {
        let transport = LoginTransport::new(false);
        let ticket = SessionTicket {
            server_url: "https://ctf.example.com".to_string(),
            username: "alice".to_string(),
            token: "stale".to_string(),
        };
        let session = Session::from_ticket(&ticket, transport.clone());

        assert!(matches!(session.server_version(), Err(Error::SessionInvalid(_))));
        assert!(!session.is_active());
        assert_eq!(transport.count("getVersion"), 1);
    }

    #[test]
    fn test_empty_ticket_is_not_active() {
        let ticket = SessionTicket {
            server_url: "https://ctf.example.com".to_string(),
            username: "alice".to_string(),
            token: String::new(),
        };
        let session = Session::from_ticket(&ticket, LoginTransport::new(false));
        assert!(matches!(session.validate(), Err(Error::SessionInvalid(_))));
    }
}
