use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = ragbot_ingest::Args::parse();
	ragbot_ingest::run(args).await
}
