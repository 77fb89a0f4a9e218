use std::{path::PathBuf, time::Duration};

use clap::Parser;
use tokio::{
	io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines},
	time,
};
use tracing::Instrument;
use uuid::Uuid;

use ragbot_service::{ChatReply, ChatService, ExitIntent, ExitIntentDetector, Providers};

pub const WELCOME_BANNER: &str = "欢迎使用大模型对话系统！输入 '退出' 或相关语义结束对话。";
pub const USER_PROMPT: &str = "你：";
pub const ASSISTANT_PREFIX: &str = "助手：";
pub const FAREWELL: &str = "感谢您的咨询，再见！";

#[derive(Debug, Parser)]
#[command(
	version = ragbot_cli::VERSION,
	rename_all = "kebab",
	styles = ragbot_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = ragbot_config::load(&args.config)?;
	ragbot_cli::init_tracing(&config.service.log_level);
	let providers = Providers::default();
	let detector = ExitIntentDetector::new(&config, providers.embedding.clone()).await?;
	let service = ragbot_service::open(config).await?;
	let session_id = Uuid::new_v4();
	let mut stdout = io::stdout();

	Repl::new(&service, &detector)
		.run(BufReader::new(io::stdin()), &mut stdout)
		.instrument(tracing::info_span!("session", %session_id))
		.await?;

	Ok(())
}

/// One interactive conversation over line-oriented input and output.
pub struct Repl<'a> {
	service: &'a ChatService,
	detector: &'a ExitIntentDetector,
	stream_delay: Duration,
}
impl<'a> Repl<'a> {
	pub fn new(service: &'a ChatService, detector: &'a ExitIntentDetector) -> Self {
		let stream_delay = Duration::from_millis(service.cfg.chat.stream_delay_ms);

		Self { service, detector, stream_delay }
	}

	/// Runs until an exit intent is confirmed or the input ends.
	pub async fn run<R, W>(&self, input: R, output: &mut W) -> color_eyre::Result<()>
	where
		R: AsyncBufRead + Unpin,
		W: AsyncWrite + Unpin,
	{
		let mut lines = input.lines();
		let mut conversation = self.service.new_conversation();

		write_line(output, WELCOME_BANNER).await?;

		loop {
			output.write_all(USER_PROMPT.as_bytes()).await?;
			output.flush().await?;

			let Some(line) = lines.next_line().await? else {
				tracing::info!("Input closed.");

				break;
			};
			let utterance = line.trim();

			if utterance.is_empty() {
				continue;
			}
			if self.handle_exit(utterance, &mut lines, output).await? {
				write_line(output, &format!("{ASSISTANT_PREFIX}{FAREWELL}")).await?;

				break;
			}

			match self.service.query(&mut conversation, utterance).await {
				ChatReply::Answer { text, sources } => {
					tracing::debug!(?sources, "Answered.");

					output.write_all(ASSISTANT_PREFIX.as_bytes()).await?;
					self.stream(&text, output).await?;
				},
				reply => write_line(output, &format!("{ASSISTANT_PREFIX}{}", reply.message())).await?,
			}
		}

		Ok(())
	}

	/// Returns `true` when the conversation should end. A semantically similar utterance
	/// ends it too, after offering to remember the phrase.
	async fn handle_exit<R, W>(
		&self,
		utterance: &str,
		lines: &mut Lines<R>,
		output: &mut W,
	) -> color_eyre::Result<bool>
	where
		R: AsyncBufRead + Unpin,
		W: AsyncWrite + Unpin,
	{
		match self.detector.classify(utterance).await {
			ExitIntent::None => Ok(false),
			ExitIntent::Exact => Ok(true),
			ExitIntent::Similar { keyword, score } => {
				tracing::info!(%keyword, score, "Detected exit intent.");

				output
					.write_all(
						format!("检测到退出命令意图，是否将 \"{utterance}\" 添加到退出关键词中？ (y/n): ")
							.as_bytes(),
					)
					.await?;
				output.flush().await?;

				let answer = lines.next_line().await?.unwrap_or_default();

				if answer.trim().eq_ignore_ascii_case("y") {
					match self.detector.learn(utterance).await {
						Ok(true) => write_line(output, &format!("新增退出关键词: {utterance}")).await?,
						Ok(false) => {},
						Err(err) => {
							tracing::warn!(error = %err, "Failed to save exit keyword.");

							write_line(output, &format!("退出关键词保存失败: {utterance}")).await?;
						},
					}
				}

				Ok(true)
			},
		}
	}

	async fn stream<W>(&self, text: &str, output: &mut W) -> io::Result<()>
	where
		W: AsyncWrite + Unpin,
	{
		let mut buf = [0_u8; 4];

		for ch in text.chars() {
			output.write_all(ch.encode_utf8(&mut buf).as_bytes()).await?;
			output.flush().await?;

			if !self.stream_delay.is_zero() {
				time::sleep(self.stream_delay).await;
			}
		}

		output.write_all(b"\n").await?;
		output.flush().await
	}
}

async fn write_line<W>(output: &mut W, line: &str) -> io::Result<()>
where
	W: AsyncWrite + Unpin,
{
	output.write_all(line.as_bytes()).await?;
	output.write_all(b"\n").await?;
	output.flush().await
}
