use crate::catalog::spans::summarize;
use crate::cli::StatsArgs;
use crate::utils::{input_name, open_input, LogDiagnostics, Result};
use std::io::{self, BufWriter};

pub fn stats(args: StatsArgs) -> Result<()> {
    let input = args.input_path.as_deref();
    let source = input_name(input);
    let reader = open_input(input)?;
    let mut diagnostics = LogDiagnostics::new();
    let stats = summarize(
        reader,
        BufWriter::new(io::stdout().lock()),
        &source,
        &mut diagnostics,
    )?;
    diagnostics.summarize(&source);
    log::info!("Summarized {} spans from {}", stats.count, source);
    Ok(())
}
