use clap::Parser;
use miette::{IntoDiagnostic, Result};
use orderflow::application::service::OrderService;
use orderflow::config::EngineConfig;
use orderflow::domain::ports::{AuthorizerRef, Ports};
use orderflow::infrastructure::auth::StaticAuthorizer;
use orderflow::infrastructure::in_memory::in_memory_ports_with;
use orderflow::interfaces::csv::command_reader::CommandReader;
use orderflow::interfaces::csv::order_writer::OrderWriter;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input order commands CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Actor id with admin rights. Repeat for several admins.
    #[arg(long = "admin", default_value = "admin")]
    admins: Vec<String>,

    /// Allow `override` commands to set any order status.
    #[arg(long)]
    allow_status_override: bool,

    /// Re-validations allowed after losing a concurrent write (at least 1).
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    max_stale_reloads: u32,

    /// Print the activity log as JSON lines on stderr.
    #[arg(long)]
    activity: bool,
}

impl Cli {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            allow_status_override: self.allow_status_override,
            max_stale_reloads: self.max_stale_reloads,
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
fn build_ports(db_path: Option<PathBuf>, authorizer: AuthorizerRef) -> Result<Ports> {
    use orderflow::infrastructure::rocksdb::RocksDBStore;

    match db_path {
        Some(path) => {
            let store = RocksDBStore::open(path).into_diagnostic()?;
            Ok(Ports {
                orders: Arc::new(store.clone()),
                payments: Arc::new(store.clone()),
                activity: Arc::new(store),
                authorizer,
            })
        }
        None => Ok(in_memory_ports_with(authorizer)),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn build_ports(db_path: Option<PathBuf>, authorizer: AuthorizerRef) -> Result<Ports> {
    if db_path.is_some() {
        warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(in_memory_ports_with(authorizer))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let config = cli.engine_config();
    let authorizer: AuthorizerRef = Arc::new(StaticAuthorizer::new(cli.admins.iter().cloned()));
    let ports = build_ports(cli.db_path.clone(), authorizer)?;
    let service = OrderService::new(ports, config);

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for command in reader.commands() {
        match command {
            Ok(command) => {
                let order = command.order();
                if let Err(e) = service.execute(command).await {
                    warn!(%order, code = e.status_code(), "Error processing command: {e}");
                }
            }
            Err(e) => {
                warn!("Error reading command: {e}");
            }
        }
    }

    if cli.activity {
        for entry in service.activity().await.into_diagnostic()? {
            eprintln!("{}", serde_json::to_string(&entry).into_diagnostic()?);
        }
    }

    let views = service.into_results().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = OrderWriter::new(stdout.lock());
    writer.write_orders(&views).into_diagnostic()?;

    Ok(())
}
