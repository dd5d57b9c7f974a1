use checkout_flow::config::CheckoutConfig;
use checkout_flow::domain::ports::{KeyValueStoreRef, NotificationSinkRef, OrderStoreRef};
use checkout_flow::infrastructure::in_memory::{InMemoryKeyValueStore, InMemoryOrderStore};
use checkout_flow::infrastructure::notification::LogNotificationSink;
use checkout_flow::interfaces::csv::script_reader::ScriptReader;
use checkout_flow::interfaces::report::ReportWriter;
use checkout_flow::interfaces::runner::ScriptRunner;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Checkout script CSV file
    script: PathBuf,

    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of the persistent cart/history store (needs the
    /// `storage-rocksdb` feature).
    #[arg(long)]
    store_path: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn open_store(path: Option<PathBuf>) -> Result<KeyValueStoreRef> {
    match path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = checkout_flow::infrastructure::rocksdb::RocksDbKeyValueStore::open(path)
                .into_diagnostic()?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(path) => {
            tracing::warn!(
                path = %path.display(),
                "built without storage-rocksdb, falling back to in-memory storage"
            );
            Ok(Arc::new(InMemoryKeyValueStore::new()))
        }
        None => Ok(Arc::new(InMemoryKeyValueStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    let config = match &cli.config {
        Some(path) => CheckoutConfig::from_file(path).into_diagnostic()?,
        None => CheckoutConfig::default(),
    };
    config.validate().into_diagnostic()?;
    info!(otp_required = config.otp_required(), "configuration loaded");

    let store = open_store(cli.store_path)?;
    let order_store: OrderStoreRef = Arc::new(InMemoryOrderStore::new());
    let sink: NotificationSinkRef = Arc::new(LogNotificationSink);
    let mut runner = ScriptRunner::new(Arc::new(config), store, order_store, sink);

    let file = File::open(&cli.script).into_diagnostic()?;
    let reader = ScriptReader::new(file);
    for event in reader.events() {
        match event {
            Ok(event) => {
                if let Err(e) = runner.apply(event).await {
                    eprintln!("Error processing event: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading event: {}", e);
            }
        }
    }

    let report = runner.finish().await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_report(&report).into_diagnostic()?;

    Ok(())
}
