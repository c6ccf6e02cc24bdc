use clap::Parser;
use trcat::{
    cli::{init_verbose, Cli, Command, FULL_VERSION},
    commands::{annotate, filter, intersect, repmask, stats, trf},
    utils::{handle_error_and_exit, Result},
};

fn runner() -> Result<()> {
    let cli = Cli::parse();
    init_verbose(&cli);
    let subcommand_name = match cli.command {
        Command::Filter(_) => "filter",
        Command::Trf(_) => "trf",
        Command::Annotate(_) => "annotate",
        Command::Intersect(_) => "intersect",
        Command::Stats(_) => "stats",
        Command::Repmask(_) => "repmask",
    };

    log::info!(
        "Running {}-{} [{}]",
        env!("CARGO_PKG_NAME"),
        *FULL_VERSION,
        subcommand_name
    );
    match cli.command {
        Command::Filter(args) => filter::filter(args)?,
        Command::Trf(args) => trf::trf(args)?,
        Command::Annotate(args) => annotate::annotate(args)?,
        Command::Intersect(args) => intersect::intersect(args)?,
        Command::Stats(args) => stats::stats(args)?,
        Command::Repmask(args) => repmask::repmask(args)?,
    }
    log::info!("{} end", env!("CARGO_PKG_NAME"));
    Ok(())
}

fn main() {
    if let Err(e) = runner() {
        handle_error_and_exit(e);
    }
}
