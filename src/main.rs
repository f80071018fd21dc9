use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use movies::MovieDb;
use movies::cors::CorsPolicy;
use movies::schema::{SchemaRules, DEFAULT_RATE};
use movies::seed;
use movies::server::MovieServer;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Clone, Debug)]
#[clap(author, version, about = "In-memory movies HTTP API", long_about = None)]
struct Args {
    #[clap(long, env = "PORT", default_value = "1234")]
    port: u16,

    #[clap(long, env = "HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// JSON array of seed movies. Defaults to the bundled data set.
    #[clap(long, env = "MOVIES_SEED")]
    seed: Option<PathBuf>,

    /// Origin allowed to read responses cross-site. Repeatable or comma separated.
    #[clap(long = "allowed-origin", env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    allowed_origins: Vec<String>,

    /// Rate given to movies created without one.
    #[clap(long, default_value_t = DEFAULT_RATE)]
    default_rate: f64,

    /// Tokio worker threads. Defaults to the number of logical cores.
    #[clap(long)]
    workers: Option<usize>,
}

fn main() {
    let args = Args::parse();
    init_tracing();

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if let Some(workers) = args.workers {
        builder.worker_threads(workers.max(1));
    }

    let runtime = match builder.enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(async_main(args)) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new("info,movies=info"));
    tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_level(true)
    .init();
}

async fn async_main(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let rules = SchemaRules::default().with_default_rate(args.default_rate);

    let movies = match &args.seed {
        Some(path) => {
            tracing::info!("Loading seed data from {}", path.display());
            seed::load_file(path, &rules)?
        }
        None => seed::bundled(&rules)?,
    };
    tracing::info!("Loaded {} movies", movies.len());

    let cors = if args.allowed_origins.is_empty() {
        CorsPolicy::default()
    } else {
        CorsPolicy::new(args.allowed_origins.clone())
    };
    tracing::debug!(origins = ?cors.allowed_origins(), "CORS allow-list");

    let db = Arc::new(MovieDb::new(movies, rules));
    let server = MovieServer::new(db, cors);

    let addr = SocketAddr::new(args.host, args.port);
    server
    .run(addr, async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutting down.");
    })
    .await?;

    Ok(())
}
