// src/cli/mod.rs
//! CLI definitions for ctflink
//!
//! This module contains the command-line interface definitions using clap.
//! The command implementations are in the `commands` module.
//!
//! Connection values come from flags, then `CTF_*` environment variables,
//! then the `[teamforge]` section of the configuration file.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ctflink")]
#[command(version)]
#[command(about = "Publish build results to a TeamForge server", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where and as whom to connect
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "CTF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Server URL, e.g. https://ctf.example.com
    #[arg(long, global = true, env = "CTF_URL")]
    pub url: Option<String>,

    #[arg(short, long, global = true, env = "CTF_USERNAME")]
    pub username: Option<String>,

    #[arg(long, global = true, env = "CTF_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Reuse the session stored in this ticket file instead of logging in
    #[arg(long, global = true, env = "CTF_TICKET")]
    pub ticket: Option<PathBuf>,

    /// Show a progress bar for uploads instead of log lines
    #[arg(long, global = true)]
    pub progress: bool,
}

/// Kinds of objects that can be looked up by title
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveKind {
    Project,
    Package,
    Release,
    Tracker,
    Role,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the server's API and product versions
    Version,

    /// Log in and store a reusable session ticket
    Login {
        /// File to write the ticket to
        #[arg(long)]
        ticket_file: PathBuf,
    },

    /// End the session stored in a ticket file
    Logoff {
        #[arg(long)]
        ticket_file: PathBuf,
    },

    /// Print the id of an object found by title
    Resolve {
        #[arg(value_enum)]
        kind: ResolveKind,

        /// Title to look up
        title: String,

        /// Project title (all kinds except project)
        #[arg(long)]
        project: Option<String>,

        /// Package title (releases; omit to search every package)
        #[arg(long)]
        package: Option<String>,
    },

    /// Upload files into a file release, creating the release if needed
    PublishRelease {
        #[arg(long)]
        project: String,

        #[arg(long)]
        package: String,

        #[arg(long)]
        release: String,

        /// Replace release files that already exist
        #[arg(long)]
        overwrite: bool,

        /// Files or glob patterns; ${VAR} is expanded from the environment
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// Upload files as documents below a folder path, creating folders
    PublishDocs {
        #[arg(long)]
        project: String,

        /// Folder path, e.g. "Root Folder/builds/${BUILD_NUMBER}"
        #[arg(long)]
        path: String,

        /// Description for new documents
        #[arg(long, default_value = "")]
        description: String,

        /// Files or glob patterns; ${VAR} is expanded from the environment
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// Create roles that do not exist yet
    AddRoles {
        #[arg(long)]
        project: String,

        /// Role title (repeatable)
        #[arg(long = "role", required_unless_present = "catalogue")]
        roles: Vec<String>,

        /// Role description, paired with --role by position
        #[arg(long = "description")]
        descriptions: Vec<String>,

        /// Create the build-server role catalogue instead
        #[arg(long, conflicts_with_all = ["roles", "descriptions"])]
        catalogue: bool,
    },

    /// Grant a role to a user
    GrantRole {
        #[arg(long)]
        project: String,

        #[arg(long)]
        role: String,

        #[arg(long)]
        user: String,
    },

    /// Show the build permissions a user holds through project roles
    Permissions {
        #[arg(long)]
        project: String,

        #[arg(long)]
        user: String,

        /// Fail unless the user holds this permission (e.g. "build")
        #[arg(long)]
        require: Option<String>,
    },

    /// Record a build outcome in a tracker artifact
    ReportBuild {
        #[arg(long)]
        project: String,

        #[arg(long)]
        tracker: String,

        /// Artifact title identifying the build problem
        #[arg(long)]
        title: String,

        /// The build failed (default: it passed)
        #[arg(long)]
        failed: bool,

        /// Description or comment text
        #[arg(long, default_value = "")]
        summary: String,

        /// Priority 1 (highest) to 5
        #[arg(long, default_value_t = 3)]
        priority: u8,

        #[arg(long)]
        assign_to: Option<String>,

        /// Release title to report the problem against
        #[arg(long)]
        release: Option<String>,

        /// File to attach, e.g. the build log
        #[arg(long)]
        attach: Option<PathBuf>,

        /// Record passing builds and reopen closed artifacts
        #[arg(long)]
        always_update: bool,

        /// Close the artifact when the build passes
        #[arg(long)]
        close_on_success: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_publish_release() {
        let cli = Cli::try_parse_from([
            "ctflink",
            "--url",
            "https://ctf.example.com",
            "publish-release",
            "--project",
            "Demo",
            "--package",
            "builds",
            "--release",
            "1.0",
            "--overwrite",
            "dist/*.tar.gz",
        ])
        .unwrap();

        assert_eq!(cli.connection.url.as_deref(), Some("https://ctf.example.com"));
        match cli.command {
            Commands::PublishRelease {
                release, overwrite, files, ..
            } => {
                assert_eq!(release, "1.0");
                assert!(overwrite);
                assert_eq!(files, vec!["dist/*.tar.gz"]);
            }
            _ => panic!("expected publish-release"),
        }
    }

    #[test]
    fn test_parse_add_roles() {
        let cli = Cli::try_parse_from([
            "ctflink",
            "add-roles",
            "--project",
            "Demo",
            "--role",
            "Builder",
            "--description",
            "Runs builds",
            "--role",
            "Tester",
            "--description",
            "Runs tests",
        ])
        .unwrap();

        match cli.command {
            Commands::AddRoles { roles, descriptions, .. } => {
                assert_eq!(roles, vec!["Builder", "Tester"]);
                assert_eq!(descriptions, vec!["Runs builds", "Runs tests"]);
            }
            _ => panic!("expected add-roles"),
        }
    }

    #[test]
    fn test_parse_add_catalogue_roles() {
        let cli = Cli::try_parse_from(["ctflink", "add-roles", "--project", "Demo", "--catalogue"]).unwrap();
        match cli.command {
            Commands::AddRoles { roles, catalogue, .. } => {
                assert!(roles.is_empty());
                assert!(catalogue);
            }
            _ => panic!("expected add-roles"),
        }

        assert!(Cli::try_parse_from(["ctflink", "add-roles", "--project", "Demo"]).is_err());
        assert!(
            Cli::try_parse_from(["ctflink", "add-roles", "--project", "Demo", "--catalogue", "--role", "Builder"])
                .is_err()
        );
    }

    #[test]
    fn test_parse_permissions() {
        let cli = Cli::try_parse_from([
            "ctflink",
            "permissions",
            "--project",
            "Demo",
            "--user",
            "alice",
            "--require",
            "build",
        ])
        .unwrap();
        match cli.command {
            Commands::Permissions { user, require, .. } => {
                assert_eq!(user, "alice");
                assert_eq!(require.as_deref(), Some("build"));
            }
            _ => panic!("expected permissions"),
        }
    }
}
