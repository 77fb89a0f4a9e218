use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = ragbot_api::Args::parse();
	ragbot_api::run(args).await
}
