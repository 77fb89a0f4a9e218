use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = ragbot_chat::Args::parse();
	ragbot_chat::run(args).await
}
