pub mod pipeline;

mod error;

pub use error::{Error, Result};

use std::path::PathBuf;

use clap::Parser;

use ragbot_service::Providers;
use ragbot_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = ragbot_cli::VERSION,
	rename_all = "kebab",
	styles = ragbot_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Knowledge text file with one `key: value` entry per line. Without it the index is rebuilt
	/// from the rows already stored.
	#[arg(long, value_name = "FILE")]
	pub source: Option<PathBuf>,
	/// Where to write the index. Defaults to `storage.index.path`.
	#[arg(long, value_name = "FILE")]
	pub output: Option<PathBuf>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = ragbot_config::load(&args.config)?;
	ragbot_cli::init_tracing(&config.service.log_level);

	let db = Db::connect(&config.storage.postgres).await?;
	db.ensure_schema().await?;

	let output = args.output.unwrap_or_else(|| config.storage.index.path.clone());
	let providers = Providers::default();
	let report = pipeline::run_ingest(
		&config,
		&db,
		args.source.as_deref(),
		&output,
		providers.embedding.as_ref(),
	)
	.await?;

	tracing::info!(
		inserted = report.inserted,
		indexed = report.indexed,
		path = %report.path.display(),
		"Ingestion finished."
	);

	Ok(())
}
