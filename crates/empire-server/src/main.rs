//! Empire Tech storefront server
//!
//! JSON API for the storefront and its admin back office.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};

use empire_core::config::load_config;
use empire_core::tracing_init::{LogFormat, init_tracing};

use empire_server::auth::JwtManager;
use empire_server::server::{AppState, build_router, cors_layer};
use empire_server::storage::StoreDatabase;

const DEV_SECRET: &str = "dev-secret-change-me";

#[derive(Parser, Debug)]
#[command(name = "empire-server")]
#[command(version, about = "Empire Tech storefront server - JSON API and admin back office")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "EMPIRE_ADDR", default_value = "0.0.0.0:8080")]
    addr: SocketAddr,

    /// Path to SQLite database file.
    #[arg(long, env = "EMPIRE_DB_PATH")]
    db_path: Option<PathBuf>,

    /// JWT secret key.
    #[arg(long, env = "EMPIRE_JWT_SECRET", default_value = DEV_SECRET)]
    jwt_secret: String,

    /// Access token TTL in seconds.
    #[arg(long, default_value_t = 86400)]
    access_ttl: i64,

    /// Storefront settings file (JSON).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Browser origin allowed to call the API (CORS).
    #[arg(long, env = "EMPIRE_CORS_ORIGIN")]
    cors_origin: Option<String>,

    /// Email that gets the admin role, at registration or on startup.
    #[arg(long, env = "EMPIRE_ADMIN_EMAIL")]
    admin_email: Option<String>,

    /// Log output format: text, compact or json.
    #[arg(long, env = "EMPIRE_LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Shorthand for `--log-format json`.
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn log_format(&self) -> LogFormat {
        if self.log_json {
            LogFormat::Json
        } else {
            self.log_format
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing("empire_server=info,tower_http=info", args.log_format());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %args.addr,
        "Starting empire-server"
    );

    let config = load_config(args.config.as_deref())?;

    let db_path = match args.db_path {
        Some(path) => path,
        None => default_db_path()?,
    };
    info!(path = %db_path.display(), "Opening store database");
    let db = StoreDatabase::open(&db_path).await?;

    if args.jwt_secret == DEV_SECRET {
        warn!("Using the development JWT secret; set EMPIRE_JWT_SECRET in production");
    }
    let jwt = JwtManager::new(args.jwt_secret.as_bytes(), args.access_ttl);

    let state = AppState::new(db, jwt, config).with_admin_email(args.admin_email);
    if let Some(email) = &state.admin_email {
        if state.db.promote_to_admin(email).await? {
            info!(email = %email, "Granted admin role");
        } else {
            info!(email = %email, "Admin email not registered yet; will be admin on sign-up");
        }
    }

    let mut app = build_router(state);
    if let Some(origin) = &args.cors_origin {
        app = app.layer(cors_layer(origin)?);
        info!(origin = %origin, "CORS enabled");
    }

    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    info!(addr = %args.addr, "Storefront server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Received shutdown signal");
        })
        .await?;

    info!("Storefront server stopped");
    Ok(())
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".empire").join("store.db"))
}
