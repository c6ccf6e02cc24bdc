use crate::catalog::overlap::{
    source_from_path, write_rows, BedtoolsIntersector, Intersector, NativeIntersector,
    OverlapCountRow, OverlapCounter, OverlapMode,
};
use crate::cli::IntersectArgs;
use crate::utils::{dump_gz_json, Error, Result};
use rayon::{
    iter::{IntoParallelRefIterator, ParallelIterator},
    ThreadPoolBuilder,
};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::time;

pub fn intersect(args: IntersectArgs) -> Result<()> {
    let start_timer = time::Instant::now();
    let modes = args.mode.modes(args.fraction);

    let intersector: Box<dyn Intersector> = if args.native {
        Box::new(NativeIntersector)
    } else {
        Box::new(BedtoolsIntersector::new(args.bedtools.clone()))
    };

    let rows = count_sources(
        intersector.as_ref(),
        &args.regions_paths,
        &args.catalog_path,
        &modes,
        args.source.as_deref(),
        args.num_threads,
    )?;

    dump_gz_json(Path::new(&args.output), &rows)?;
    if args.print {
        write_rows(&rows, BufWriter::new(io::stdout().lock()))?;
    }
    log::info!(
        "Wrote {} rows to {} in {:.2?}",
        rows.len(),
        args.output,
        start_timer.elapsed()
    );
    Ok(())
}

/// Counts every regions file against `catalog`, one task per file. Rows are
/// concatenated in the order of `regions`.
pub fn count_sources(
    intersector: &dyn Intersector,
    regions: &[PathBuf],
    catalog: &Path,
    modes: &[OverlapMode],
    source: Option<&str>,
    num_threads: usize,
) -> Result<Vec<OverlapCountRow>> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("trcat-{}", i))
        .build()
        .map_err(|e| Error::InvalidInput(format!("Failed to create thread pool: {}", e)))?;

    let counter = OverlapCounter::new(intersector);
    let per_source: Vec<Vec<OverlapCountRow>> = pool.install(|| {
        regions
            .par_iter()
            .map(|path| {
                let label = source
                    .map(str::to_string)
                    .or_else(|| source_from_path(path));
                counter.count_modes(path, catalog, modes, label.as_deref())
            })
            .collect::<Result<_>>()
    })?;

    Ok(per_source.into_iter().flatten().collect())
}
