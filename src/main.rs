use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod arena;

#[derive(Parser, Debug)]
#[command(name = "playmodular", about = "Play tic-tac-toe matches between two search strategies")]
struct Cli {
    /// Strategy config for the red side (defaults to alpha-beta)
    #[arg(long)]
    red: Option<PathBuf>,

    /// Strategy config for the black side (defaults to alpha-beta)
    #[arg(long)]
    black: Option<PathBuf>,

    /// Number of games to play
    #[arg(long, short = 'g', default_value_t = 10)]
    games: usize,

    /// Alternate which side moves first
    #[arg(long)]
    swap: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let red = arena::load_config(cli.red.as_deref())?;
    let black = arena::load_config(cli.black.as_deref())?;

    let summary = arena::run_match(&red, &black, cli.games, cli.swap)?;
    println!(
        "red ({}) {} - black ({}) {} - draws {}",
        red.name(),
        summary.red_wins,
        black.name(),
        summary.black_wins,
        summary.draws
    );
    Ok(())
}
