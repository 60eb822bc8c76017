//! `ape_mock` launcher: serve a mock API from a schema file.
//!
//! `ape_mock schema.json [with seed.json] [on 3000]`, or the equivalent
//! `--seed` / `--port` flags. `RUST_LOG` controls log output.

use ape_mock::{api_router, load_schema_from_file, load_seed_from_file, validate_seed, AppState, InMemoryStore};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Parser)]
#[command(name = "ape_mock", version, about = "Serve a mock REST API from a JSON schema")]
struct Cli {
    /// Schema file declaring entities, routes and response options.
    schema: PathBuf,

    /// Optional `with <seed.json>` and `on <port>` clauses.
    #[arg(value_name = "with SEED | on PORT")]
    tail: Vec<String>,

    /// Seed data file.
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Listen port.
    #[arg(long, env = "APE_PORT", value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,

    /// Listen address.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
}

#[derive(Debug, PartialEq, Eq)]
struct Launch {
    schema: PathBuf,
    seed: Option<PathBuf>,
    host: String,
    port: u16,
}

impl Cli {
    fn into_launch(self) -> Result<Launch, String> {
        let mut seed = self.seed;
        let mut port = self.port;
        let mut tail = self.tail.into_iter();
        while let Some(keyword) = tail.next() {
            let value = tail
                .next()
                .ok_or_else(|| format!("'{}' needs a value", keyword))?;
            match keyword.as_str() {
                "with" => seed = Some(PathBuf::from(value)),
                "on" => {
                    let p = value
                        .parse::<u16>()
                        .ok()
                        .filter(|p| *p > 0)
                        .ok_or_else(|| format!("invalid port '{}'", value))?;
                    port = Some(p);
                }
                other => return Err(format!("unexpected argument '{}'", other)),
            }
        }
        Ok(Launch {
            schema: self.schema,
            seed,
            host: self.host,
            port: port.unwrap_or(DEFAULT_PORT),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ape_mock=info,ape_mock_cli=info")),
        )
        .init();

    let launch = Cli::parse().into_launch()?;

    let schema = load_schema_from_file(&launch.schema)?;
    let store = Arc::new(InMemoryStore::from_schema(&schema)?);

    if let Some(seed_path) = &launch.seed {
        let seed = load_seed_from_file(seed_path)?;
        validate_seed(&schema, &seed)?;
        for (entity, records) in seed {
            let count = store.seed(&entity, records)?;
            tracing::info!(entity = %entity, count, "seeded records");
        }
    }

    let state = AppState::new(schema, store)?;
    for route in state.routes.entity_routes() {
        tracing::info!("{:<20} {}", route.methods().join(","), route.path());
    }
    for route in state.routes.custom_routes() {
        tracing::info!("{:<20} {} -> {}", route.method.as_str(), route.pattern, route.entity);
    }

    let app = api_router(state);
    let listener = TcpListener::bind((launch.host.as_str(), launch.port)).await?;
    tracing::info!("ape_mock listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
