//! Small command-line front end over the client library.

use anyhow::Context;
use clap::{Parser, Subcommand};

use tenantdesk_auth::LoginCredentials;
use tenantdesk_client::endpoints::access_control;
use tenantdesk_client::{ClientConfig, RouteGuard, SessionController};

#[derive(Parser, Debug)]
#[command(name = "tenantdesk")]
#[command(about = "Session and access-control client for the tenant admin API")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the restored session and cached profile
    Status,
    /// Sign in and persist the session
    Login {
        email: String,
        #[arg(long, env = "TENANTDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out (confirmed by the server)
    Logout,
    /// List the permission catalog
    Permissions,
    /// List roles
    Roles,
    /// Show the gate decision for an application path
    Route { path: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tenantdesk_observability::init();

    let config = ClientConfig::from_env().context("invalid client configuration")?;
    let controller = tenantdesk_client::connect(&config)?;
    let state = controller.bootstrap_session().await?;
    tracing::info!(tenant = %config.tenant(), signed_in = state.is_authenticated(), "session loaded");

    match args.command.unwrap_or(Command::Status) {
        Command::Status => status(&controller).await,
        Command::Login { email, password } => {
            let profile = controller
                .sign_in(&LoginCredentials::new(email, password))
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!("signed in as {}", profile.display_name());
            Ok(())
        }
        Command::Logout => {
            controller
                .logout()
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!("signed out");
            Ok(())
        }
        Command::Permissions => {
            let catalog = access_control::fetch_permissions(controller.client()).await?;
            for permission in catalog {
                let actions: Vec<&str> = permission.actions.iter().map(|a| a.as_str()).collect();
                println!("{:>4}  {:<20} {}", permission.id, permission.resource, actions.join(","));
            }
            Ok(())
        }
        Command::Roles => {
            for role in access_control::fetch_roles(controller.client()).await? {
                println!("{:>6}  {:<24} {}", role.id, role.name, role.status);
            }
            Ok(())
        }
        Command::Route { path } => {
            let signed_in = controller.session().refresh_token().await?.is_some();
            println!("{:?}", RouteGuard::default().decide(&path, signed_in));
            Ok(())
        }
    }
}

async fn status(controller: &SessionController) -> anyhow::Result<()> {
    let state = controller.session().snapshot();
    println!("status: {:?}", state.status);
    if let Some(profile) = controller.profile().await? {
        println!("user: {} <{}> ({})", profile.display_name(), profile.email_id, profile.user_type);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_subcommands() {
        let args = Args::try_parse_from(["tenantdesk", "login", "ada@acme.io", "--password", "pw-123456"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Command::Login { ref email, ref password }) if email == "ada@acme.io" && password == "pw-123456"
        ));

        let args = Args::try_parse_from(["tenantdesk", "route", "/roles/edit/4"]).unwrap();
        assert!(matches!(args.command, Some(Command::Route { ref path }) if path == "/roles/edit/4"));

        assert!(Args::try_parse_from(["tenantdesk"]).unwrap().command.is_none());
        assert!(Args::try_parse_from(["tenantdesk", "frobnicate"]).is_err());
    }
}
