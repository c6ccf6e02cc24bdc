use crate::catalog::annotate::{AnnotationJoiner, TabixAnnotationSource};
use crate::cli::AnnotateArgs;
use crate::utils::{open_bed_reader, LogDiagnostics, Result};
use std::io::{self, BufWriter};

pub fn annotate(args: AnnotateArgs) -> Result<()> {
    let source = TabixAnnotationSource::from_path(&args.annotations_path)?;
    let mut joiner = AnnotationJoiner::new(source);

    let regions_name = args.regions_path.display().to_string();
    let reader = open_bed_reader(&args.regions_path)?;
    let writer = BufWriter::new(io::stdout().lock());
    let mut diagnostics = LogDiagnostics::new();
    let written = joiner.annotate_stream(reader, writer, &regions_name, &mut diagnostics)?;
    diagnostics.summarize(&regions_name);
    log::info!("Annotated {} regions from {}", written, regions_name);
    Ok(())
}
