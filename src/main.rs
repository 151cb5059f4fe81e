mod audio;
mod chunker;
mod cli;
mod config;
mod domain;
mod error;
mod merger;
mod orchestrator;
mod transcriber;
mod vad;

use clap::Parser;

fn main() {
    let cli = cli::Cli::parse();

    let exit_code = match cli.command {
        Some(cli::Commands::Transcribe(args)) => cli::transcribe::run(args),
        Some(cli::Commands::Warmup(args)) => cli::warmup::run(args),
        None => {
            eprintln!("callscribe: no subcommand given; run with --help for usage");
            1
        }
    };

    std::process::exit(exit_code);
}
