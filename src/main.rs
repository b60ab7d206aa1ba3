use clap::Parser;
use shamash_asm::cli::{self, Cli};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Err(err) = cli::dispatch(cli.command) {
        eprintln!("shamash: {err}");
        std::process::exit(1);
    }
    Ok(())
}
