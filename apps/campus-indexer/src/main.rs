use clap::Parser;

use campus_indexer::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	campus_indexer::run(args).await
}
