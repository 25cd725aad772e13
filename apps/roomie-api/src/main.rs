use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = roomie_api::Args::parse();

	roomie_api::run(args).await
}
