// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use ctflink::IssuePolicy;

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let conn = &cli.connection;

    match cli.command {
        Commands::Version => commands::cmd_version(conn),
        Commands::Login { ticket_file } => commands::cmd_login(conn, &ticket_file),
        Commands::Logoff { ticket_file } => commands::cmd_logoff(conn, &ticket_file),
        Commands::Resolve {
            kind,
            title,
            project,
            package,
        } => commands::cmd_resolve(conn, kind, &title, project.as_deref(), package.as_deref()),
        Commands::PublishRelease {
            project,
            package,
            release,
            overwrite,
            files,
        } => commands::cmd_publish_release(conn, &project, &package, &release, overwrite, &files),
        Commands::PublishDocs {
            project,
            path,
            description,
            files,
        } => commands::cmd_publish_docs(conn, &project, &path, &description, &files),
        Commands::AddRoles {
            project,
            roles,
            descriptions,
            catalogue,
        } => {
            if catalogue {
                commands::cmd_add_catalogue_roles(conn, &project)
            } else {
                commands::cmd_add_roles(conn, &project, &roles, &descriptions)
            }
        }
        Commands::GrantRole { project, role, user } => commands::cmd_grant_role(conn, &project, &role, &user),
        Commands::Permissions { project, user, require } => {
            commands::cmd_permissions(conn, &project, &user, require.as_deref())
        }
        Commands::ReportBuild {
            project,
            tracker,
            title,
            failed,
            summary,
            priority,
            assign_to,
            release,
            attach,
            always_update,
            close_on_success,
        } => commands::cmd_report_build(
            conn,
            &commands::ReportOptions {
                project: &project,
                tracker: &tracker,
                title: &title,
                failed,
                summary: &summary,
                priority,
                assign_to: assign_to.as_deref(),
                release: release.as_deref(),
                attach: attach.as_deref(),
                policy: IssuePolicy {
                    always_update,
                    close_on_success,
                },
            },
        ),
    }
}
