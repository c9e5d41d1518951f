use std::fs;
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use clubhouse::auth::{TokenIssuer, generate_password, generate_secret, hash_password};
use clubhouse::config::ServerConfig;
use clubhouse::server::{AppState, create_router};
use clubhouse::store::{SqliteStore, Store};
use clubhouse::types::{Role, User};

/// Creates the secret file owner-only from the start; fails if it already exists.
fn write_secret_file(path: &Path, secret: &str) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(secret.as_bytes())?;
    file.sync_all()
}

#[derive(Parser)]
#[command(name = "clubhouse")]
#[command(about = "An athlete-management server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// TOML config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database, signing secret and uploads
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database, signing secret and admin user)
    Init {
        /// Data directory for the database, signing secret and uploads
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Email address of the first admin
        #[arg(long)]
        email: String,

        /// Display name of the first admin
        #[arg(long, default_value = "Administrator")]
        name: String,
    },

    /// Generate a new password for an existing user
    ResetPassword {
        /// Data directory for the database, signing secret and uploads
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Email address of the user
        #[arg(long)]
        email: String,
    },
}

fn print_password(heading: &str, password: &str) {
    println!();
    println!("========================================");
    println!("{heading} (save this, it won't be shown again):");
    println!();
    println!("  {password}");
    println!();
    println!("========================================");
    println!();
}

fn run_init(data_dir: PathBuf, email: String, name: String) -> anyhow::Result<()> {
    let config = ServerConfig {
        data_dir,
        ..ServerConfig::default()
    };
    fs::create_dir_all(&config.data_dir)?;

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    let secret_path = config.secret_path();
    if store.has_admin_user()? || secret_path.exists() {
        bail!(
            "Server already initialized. Signing secret exists at: {}",
            secret_path.display()
        );
    }

    let email = email.trim().to_string();
    if email.is_empty() || !email.contains('@') {
        bail!("'{email}' is not a valid email address");
    }

    let password = generate_password();
    let now = Utc::now();
    let admin = User {
        id: Uuid::new_v4().to_string(),
        email: email.clone(),
        name,
        password_hash: hash_password(&password)?,
        role: Role::Admin,
        created_at: now,
        updated_at: now,
    };
    store.create_user(&admin)?;

    write_secret_file(&secret_path, &generate_secret())
        .with_context(|| format!("failed to write {}", secret_path.display()))?;

    info!("Created admin user {}", email);
    print_password(&format!("Password for {email}"), &password);
    println!("Signing secret written to: {}", secret_path.display());

    Ok(())
}

fn run_reset_password(data_dir: PathBuf, email: String) -> anyhow::Result<()> {
    let config = ServerConfig {
        data_dir,
        ..ServerConfig::default()
    };
    let db_path = config.db_path();
    if !db_path.exists() {
        bail!("Server not initialized. Run 'clubhouse admin init' first.");
    }

    let store = SqliteStore::new(&db_path)?;
    let Some(mut user) = store.get_user_by_email(email.trim())? else {
        bail!("No user with email '{}'", email.trim());
    };

    let password = generate_password();
    user.password_hash = hash_password(&password)?;
    user.updated_at = Utc::now();
    store.update_user(&user)?;

    print_password(&format!("New password for {}", user.email), &password);

    Ok(())
}

async fn run_serve(
    config_file: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = match config_file {
        Some(path) => ServerConfig::load(&path)?,
        None => ServerConfig::default(),
    };
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }

    let secret_path = config.secret_path();
    if !secret_path.exists() {
        bail!("Server not initialized. Run 'clubhouse admin init' first.");
    }

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    if !store.has_admin_user()? {
        bail!("Server not initialized. Run 'clubhouse admin init' first.");
    }

    let tokens = TokenIssuer::from_secret_file(&secret_path)?;
    let addr = config
        .socket_addr()
        .with_context(|| format!("invalid bind address {}:{}", config.host, config.port))?;

    let state = Arc::new(AppState::new(Arc::new(store), config, tokens)?);
    let app = create_router(state);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("clubhouse=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                email,
                name,
            } => run_init(data_dir, email, name)?,
            AdminCommands::ResetPassword { data_dir, email } => {
                run_reset_password(data_dir, email)?;
            }
        },
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
        } => run_serve(config, host, port, data_dir).await?,
    }

    Ok(())
}
