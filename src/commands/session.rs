// src/commands/session.rs

//! Connecting, session tickets and server information

use crate::cli::ConnectionArgs;
use anyhow::{Context, Result, anyhow};
use ctflink::config::{Config, TeamforgeSection};
use ctflink::{HttpTransport, Session, SessionTicket};
use std::fs::OpenOptions;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A session plus the configuration it was opened with
pub struct Connection {
    pub session: Session,
    pub config: Config,
    /// Sessions restored from a ticket belong to whoever wrote the ticket
    owned: bool,
    pub progress_bar: bool,
}

impl Connection {
    fn logoff(&mut self) {
        if !self.owned {
            return;
        }
        self.owned = false;
        if let Err(e) = self.session.logoff() {
            warn!("Logoff failed: {}", e);
        }
    }

    /// Log off now if this command opened the session
    pub fn finish(mut self) {
        self.logoff();
    }

    /// Leave the session open after this command, for a ticket holder
    pub fn detach(&mut self) {
        self.owned = false;
    }
}

/// Commands that bail out early still end the session they opened
impl Drop for Connection {
    fn drop(&mut self) {
        self.logoff();
    }
}

fn load_config(args: &ConnectionArgs) -> Result<Config> {
    match &args.config {
        Some(path) => Ok(Config::load(path)?),
        None => Ok(Config::default()),
    }
}

fn read_ticket(path: &Path) -> Result<SessionTicket> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read ticket {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid ticket {}", path.display()))
}

/// Open a session from flags, environment and configuration
pub fn connect(args: &ConnectionArgs) -> Result<Connection> {
    let config = load_config(args)?;
    let transport = Arc::new(HttpTransport::with_timeout(config.http.timeout())?);

    if let Some(path) = &args.ticket {
        let ticket = read_ticket(path)?;
        debug!("Using session ticket {}", path.display());
        return Ok(Connection {
            session: Session::from_ticket(&ticket, transport),
            config,
            owned: false,
            progress_bar: args.progress,
        });
    }

    // Flags and environment override the file field by field
    let job = TeamforgeSection {
        url: args.url.clone().or_else(|| config.teamforge.url.clone()),
        username: args.username.clone().or_else(|| config.teamforge.username.clone()),
        password: args.password.clone().or_else(|| config.teamforge.password.clone()),
    };
    let settings = config
        .effective_connection(Some(&job))
        .ok_or_else(|| anyhow!("Server URL, username and password are required (flags, CTF_* variables or config file)"))?;

    let session = Session::login_with_settings(&settings, transport)?;
    Ok(Connection {
        session,
        config,
        owned: true,
        progress_bar: args.progress,
    })
}

/// Show the server's API and product versions
pub fn cmd_version(args: &ConnectionArgs) -> Result<()> {
    let conn = connect(args)?;
    let versions = conn
        .session
        .api_version()
        .and_then(|api| Ok((api, conn.session.server_version()?)));
    let server_url = conn.session.server_url().to_string();
    conn.finish();

    let (api, product) = versions?;
    println!("Server:      {}", server_url);
    println!("API version: {}", api);
    println!("Product:     {}", product);
    Ok(())
}

/// Write a file only the current user can read; the ticket holds a live token
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path)?;
    // An existing file keeps its old mode on open; tighten it too
    #[cfg(unix)]
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(content)
}

/// Log in and write a session ticket for later commands
pub fn cmd_login(args: &ConnectionArgs, ticket_file: &Path) -> Result<()> {
    let mut conn = connect(args)?;
    let ticket = conn.session.ticket()?;
    let json = serde_json::to_string_pretty(&ticket)?;
    write_private(ticket_file, json.as_bytes())
        .with_context(|| format!("Failed to write ticket {}", ticket_file.display()))?;
    conn.detach();

    info!("Session ticket written to {}", ticket_file.display());
    println!("Logged in as {} on {}", ticket.username, ticket.server_url);
    Ok(())
}

/// End the session held in a ticket file and remove the file
pub fn cmd_logoff(args: &ConnectionArgs, ticket_file: &Path) -> Result<()> {
    let config = load_config(args)?;
    let transport = Arc::new(HttpTransport::with_timeout(config.http.timeout())?);
    let ticket = read_ticket(ticket_file)?;

    let session = Session::from_ticket(&ticket, transport);
    let result = session.logoff();
    std::fs::remove_file(ticket_file).with_context(|| format!("Failed to remove ticket {}", ticket_file.display()))?;
    result?;

    println!("Logged off {}", ticket.username);
    Ok(())
}
