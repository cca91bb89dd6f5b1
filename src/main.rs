//! Lectern - content-management REST backend

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lectern::{
    auth::TokenCodec,
    config::{Args, LogFormat},
    server::{self, AppState},
    store::{MemoryStore, MongoStore},
};

fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("lectern={},info", args.log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    match args.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing(&args);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Lectern {}", env!("CARGO_PKG_VERSION"));
    info!("  commit {} built {}", env!("GIT_COMMIT_SHORT"), env!("BUILD_TIMESTAMP"));
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Public URL: {}", args.base_url());
    info!("Token TTL: {}s", args.jwt_ttl_seconds);
    info!("======================================");

    // Fails without JWT_SECRET outside dev mode
    let codec = match TokenCodec::from_args(&args) {
        Ok(codec) => codec,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let state = if args.memory_store {
        warn!("Using in-memory store; all data is lost on exit");
        AppState::new(args, Arc::new(MemoryStore::new()), codec)
    } else {
        info!("MongoDB: {} (db '{}')", args.mongodb_uri, args.mongodb_db);
        let store = match MongoStore::connect(&args.mongodb_uri, &args.mongodb_db).await {
            Ok(store) => store,
            Err(e) => {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        };
        AppState::new(args, Arc::new(store), codec)
    };

    let state = Arc::new(state);

    tokio::select! {
        result = server::run(Arc::clone(&state)) => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    Ok(())
}
