use crate::catalog::{FilterParams, RegionFilter};
use crate::cli::FilterArgs;
use crate::utils::{input_name, open_input, write_pretty_json, LogDiagnostics, Result};
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub fn filter(args: FilterArgs) -> Result<()> {
    let params = FilterParams {
        min_span: args.min_span,
        max_span: args.max_span,
        extra_chroms: args.extra_contigs.into_iter().collect(),
    };
    let region_filter = RegionFilter::new(params);

    let input = args.input_path.as_deref();
    let source = input_name(input);
    log::info!("Filtering regions from {}", source);

    let reader = open_input(input)?;
    let writer = BufWriter::new(io::stdout().lock());
    let mut diagnostics = LogDiagnostics::new();
    let stats = region_filter.filter_stream(reader, writer, &source, &mut diagnostics)?;
    diagnostics.summarize(&source);

    // Both views fail the same way on empty input
    let summary = stats.summary()?;
    let report = stats.report()?;
    writeln!(io::stderr(), "\n{}", report)?;
    write_pretty_json(Path::new(&args.summary_path), &summary)?;
    log::info!(
        "Kept {} of {} regions, summary written to {}",
        stats.kept(),
        stats.total,
        args.summary_path
    );
    Ok(())
}
