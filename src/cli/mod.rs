//! CLI module for the casework command-line interface.
//!
//! Without a subcommand the binary runs the server. Subcommands:
//! - `status` - Show server health and version
//! - `config check` - Validate configuration file
//! - `users create` - Register a user directly against the database

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::db::{CreateUserRequest, UserRole};
use crate::services::AuthService;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "casework")]
#[command(author, version, about = "Case management backend for employment services", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "casework.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// API URL to connect to
    #[arg(long, env = "CASEWORK_API_URL", default_value = "http://localhost:8000")]
    pub api_url: String,

    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show server status (health, version, database)
    Status,

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),

    /// User management commands
    #[command(subcommand)]
    Users(UsersCommands),
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

/// User subcommands
#[derive(Subcommand, Debug)]
pub enum UsersCommands {
    /// Register a user without going through the API
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        /// admin or case_worker
        #[arg(long, default_value = "case_worker")]
        role: UserRole,
        /// Password (can also be set via CASEWORK_USER_PASSWORD env var)
        #[arg(long, env = "CASEWORK_USER_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

/// Health payload from /health
#[derive(Debug, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub database: String,
}

fn create_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")
}

/// Run the selected subcommand
pub async fn run_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Some(Commands::Status) => cmd_status(cli).await,
        Some(Commands::Config(ConfigCommands::Check)) => cmd_config_check(cli).await,
        Some(Commands::Users(UsersCommands::Create {
            username,
            email,
            role,
            password,
        })) => {
            cmd_users_create(
                cli,
                CreateUserRequest {
                    username: username.clone(),
                    email: email.clone(),
                    password: password.clone(),
                    role: *role,
                },
            )
            .await
        }
        None => {
            // No subcommand means start the server - this is handled in main.rs
            Ok(())
        }
    }
}

async fn cmd_status(cli: &Cli) -> Result<()> {
    let client = create_client()?;
    let base_url = cli.api_url.trim_end_matches('/');

    println!("Connecting to {}...", base_url);

    let response = client
        .get(format!("{}/health", base_url))
        .send()
        .await
        .context("Failed to connect to server. Is casework running?")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Server returned error {}: {}", status, body);
    }

    let health: HealthStatus = response
        .json()
        .await
        .context("Failed to parse health response")?;

    let healthy = health.status == "ok";
    println!();
    println!("=== Casework Server Status ===");
    println!();
    println!("Version:    v{}", health.version);
    println!(
        "Status:     {} {}",
        if healthy { "[OK]" } else { "[!!]" },
        if healthy { "Healthy" } else { "Degraded" }
    );
    println!("Database:   {}", health.database);
    println!();
    Ok(())
}

async fn cmd_config_check(cli: &Cli) -> Result<()> {
    let config_path = &cli.config;

    println!("Checking configuration file: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!(
            "[!!] Configuration file not found: {}",
            config_path.display()
        );
        println!();
        println!("A default configuration will be used when starting the server.");
        println!("To create a custom configuration, copy casework.example.toml to casework.toml");
        return Ok(());
    }

    match Config::load(config_path) {
        Ok(config) => {
            println!("[OK] Configuration file is valid!");
            println!();
            println!("=== Configuration Summary ===");
            println!();
            println!("Server:");
            println!("  Address:      {}:{}", config.server.host, config.server.port);
            println!("  Data Dir:     {}", config.database.data_dir.display());
            println!("  Connections:  {}", config.database.max_connections);
            println!();
            println!("Auth:");
            println!("  Algorithm:    {:?}", config.auth.jwt_algorithm);
            println!("  Token TTL:    {} minutes", config.auth.token_ttl_minutes);
            println!("  Admin User:   {}", config.auth.admin_username);
            println!(
                "  Login Limit:  {}",
                if config.rate_limit.enabled {
                    format!(
                        "{} attempts per {}s",
                        config.rate_limit.login_attempts_per_window,
                        config.rate_limit.window_seconds
                    )
                } else {
                    "Disabled".to_string()
                }
            );
            println!();

            let mut warnings = Vec::new();
            if config.auth.jwt_secret.is_none() {
                warnings.push("No jwt_secret set - tokens will not survive a restart");
            }
            if config.auth.admin_password.is_none() {
                warnings.push(
                    "No admin_password set - a random one is generated for the first admin",
                );
            }
            if config.cors.allows_any_origin() {
                warnings.push("CORS allows any origin");
            }

            if !warnings.is_empty() {
                println!("Warnings:");
                for warning in warnings {
                    println!("  [!] {}", warning);
                }
                println!();
            }

            Ok(())
        }
        Err(e) => {
            println!("[!!] Configuration file is invalid!");
            println!();
            println!("Error: {:#}", e);
            println!();
            println!("Please check the configuration file syntax and try again.");
            anyhow::bail!("Invalid configuration file");
        }
    }
}

async fn cmd_users_create(cli: &Cli, req: CreateUserRequest) -> Result<()> {
    let config = Config::load(&cli.config)?;
    std::fs::create_dir_all(&config.database.data_dir).with_context(|| {
        format!(
            "Failed to create data directory: {}",
            config.database.data_dir.display()
        )
    })?;
    let db = crate::db::init(&config.database.data_dir, config.database.max_connections).await?;

    let auth = AuthService::new(db, config.auth);
    let user = auth
        .register_user(req)
        .await
        .context("Failed to create user")?;

    println!(
        "[OK] Created {} '{}' (id {}, {})",
        user.role, user.username, user.id, user.email
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_runs_server() {
        let cli = Cli::try_parse_from(["casework"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from("casework.toml"));
    }

    #[test]
    fn test_users_create_parses_role() {
        let cli = Cli::try_parse_from([
            "casework",
            "users",
            "create",
            "--username",
            "alice",
            "--email",
            "alice@example.org",
            "--role",
            "admin",
            "--password",
            "secret123!",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Users(UsersCommands::Create { role, username, .. })) => {
                assert_eq!(role, UserRole::Admin);
                assert_eq!(username, "alice");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let result = Cli::try_parse_from([
            "casework",
            "users",
            "create",
            "--username",
            "alice",
            "--email",
            "alice@example.org",
            "--role",
            "supervisor",
            "--password",
            "secret123!",
        ]);
        assert!(result.is_err());
    }
}
