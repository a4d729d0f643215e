use clap::Parser;

use campus_eval::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	campus_eval::run(args).await
}
