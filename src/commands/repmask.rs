use crate::catalog::repmask::RepeatMaskerLookup;
use crate::cli::RepmaskArgs;
use crate::utils::{dump_gz_json, open_bed_reader, LogDiagnostics, Result};
use std::path::Path;

pub fn repmask(args: RepmaskArgs) -> Result<()> {
    log::info!("Parsing {} RepeatMasker output file(s)", args.rm_paths.len());
    let mut lookup = RepeatMaskerLookup::new();
    let mut diagnostics = LogDiagnostics::new();
    for path in &args.rm_paths {
        let name = path.display().to_string();
        let reader = open_bed_reader(path)?;
        lookup.add_output(reader, &name, args.threshold, &mut diagnostics)?;
    }
    diagnostics.summarize("RepeatMasker");
    log::info!(
        "{} queries with hits scoring at least {}",
        lookup.len(),
        args.threshold
    );
    dump_gz_json(Path::new(&args.output), &lookup)?;
    Ok(())
}
