use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use axum::{
    Router,
    routing::{get, post},
};
use clap::Parser;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

mod auth;
mod cache;
mod config;
mod db;
mod middleware;
mod models;
pub mod observability;
mod routes;
pub mod services;

use auth::{IdpRegistry, SessionManager, SharedSessionStore};

/// Shared state handed to every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::ReadgateConfig>,
    pub db: Option<Arc<db::DbPool>>,
    pub services: Option<services::Services>,
    /// IdP code to SAML strategy. Built once at startup.
    pub registry: Arc<IdpRegistry>,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub async fn new(config: config::ReadgateConfig) -> Result<Self, Box<dyn std::error::Error>> {
        #[allow(unreachable_patterns)]
        let db = match &config.database {
            config::DatabaseConfig::None => None,
            _ => {
                let pool = db::DbPool::from_config(&config.database).await?;
                if config.database.run_migrations() {
                    pool.run_migrations().await?;
                }
                Some(Arc::new(pool))
            }
        };

        let cache: Option<Arc<dyn cache::Cache>> = match &config.cache {
            config::CacheConfig::None => None,
            config::CacheConfig::Memory(cfg) => Some(Arc::new(cache::MemoryCache::new(cfg))),
            config::CacheConfig::Redis(cfg) => {
                #[cfg(feature = "redis")]
                {
                    Some(Arc::new(cache::RedisCache::from_config(cfg).await?))
                }
                #[cfg(not(feature = "redis"))]
                {
                    let _ = cfg;
                    return Err("Redis cache configured but 'redis' feature not enabled. \
                        Rebuild with: cargo build --features redis"
                        .into());
                }
            }
        };

        let registry = match &db {
            Some(db) => IdpRegistry::load(db.idps().as_ref(), &config.server).await,
            None => IdpRegistry::empty(),
        };

        Ok(Self::from_parts(
            config,
            db,
            registry,
            auth::create_session_store(cache),
        ))
    }

    /// Assemble state from already-built parts.
    pub fn from_parts(
        config: config::ReadgateConfig,
        db: Option<Arc<db::DbPool>>,
        registry: IdpRegistry,
        store: SharedSessionStore,
    ) -> Self {
        let services = db
            .clone()
            .map(|db| services::Services::new(db, config.auth.clone()));
        let sessions = Arc::new(SessionManager::new(store, config.auth.session.clone()));

        Self {
            config: Arc::new(config),
            db,
            services,
            registry: Arc::new(registry),
            sessions,
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about = "SAML sign-on and access gate for the reading library", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file
    #[arg(short, long, global = true, default_value = "readgate.toml")]
    config: PathBuf,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start the server (default)
    Serve,
    /// Run database migrations and exit
    Migrate,
    /// Print the SP metadata registered with one identity provider
    SpMetadata {
        /// IdP code
        #[arg(long)]
        idp: String,
    },
}

/// Public routes, the SAML flow and the gated library.
pub fn build_app(config: &config::ReadgateConfig, state: AppState) -> Router {
    let gated = Router::new()
        .route("/usersetup.json", get(routes::library::usersetup))
        .fallback(routes::library::static_files)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::gate_middleware,
        ));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics_handler))
        .route("/login", get(routes::auth::login))
        .route("/login/{code}", get(routes::auth::saml_login))
        .route("/login/{code}/callback", post(routes::auth::saml_acs))
        .route("/login/{code}/metadata", get(routes::auth::saml_metadata))
        .route("/logout", get(routes::auth::logout))
        .route(
            "/logout/callback",
            get(routes::auth::logout_callback).post(routes::auth::logout_callback),
        )
        .merge(gated)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::https_redirect_middleware,
        ))
        .layer(tower_cookies::CookieManagerLayer::new())
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(config.server.body_limit_bytes))
        .with_state(state)
}

fn load_config(path: &Path) -> config::ReadgateConfig {
    match config::ReadgateConfig::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn init_observability(config: &config::ReadgateConfig) {
    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    if let Err(e) = observability::metrics::init_metrics(&config.observability.metrics) {
        tracing::error!(error = %e, "Failed to initialize metrics");
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command {
        Some(Command::Migrate) => run_migrate(&args.config).await,
        Some(Command::SpMetadata { idp }) => run_sp_metadata(&args.config, &idp).await,
        Some(Command::Serve) | None => run_server(&args.config).await,
    }
}

async fn run_server(config_path: &Path) {
    let config = load_config(config_path);
    init_observability(&config);

    tracing::info!(config_file = %config_path.display(), "Starting readgate");

    let state = match AppState::new(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize application state");
            std::process::exit(1);
        }
    };

    tracing::info!(idps = ?state.registry.codes(), "Identity providers registered");

    let app = build_app(&config, state);
    let addr = config.server.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!(%addr, base_url = %config.server.base_url, "Listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

async fn run_migrate(config_path: &Path) {
    let config = load_config(config_path);
    init_observability(&config);

    if config.database.is_none() {
        eprintln!("Error: Database is not configured. Nothing to migrate.");
        std::process::exit(1);
    }

    tracing::info!(config_file = %config_path.display(), "Running database migrations");

    let result = match db::DbPool::from_config(&config.database).await {
        Ok(pool) => pool.run_migrations().await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        eprintln!("Migration failed: {e}");
        std::process::exit(1);
    }
    tracing::info!("Database migrations completed");
}

async fn run_sp_metadata(config_path: &Path, code: &str) {
    let config = load_config(config_path);

    let pool = match db::DbPool::from_config(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let registry = match IdpRegistry::initialize_from_db(pool.idps().as_ref(), &config.server).await
    {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    match registry.get(code) {
        Some(strategy) => println!("{}", strategy.metadata()),
        None => {
            eprintln!("Error: no usable identity provider with code '{code}'");
            std::process::exit(1);
        }
    }
}
