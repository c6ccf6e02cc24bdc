use crate::catalog::trf::{write_projection, TrfReader};
use crate::cli::TrfArgs;
use crate::utils::{dump_gz_json, open_bed_reader, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub fn trf(args: TrfArgs) -> Result<()> {
    let source = args.trf_path.display().to_string();
    log::info!("Parsing TRF output {}", source);
    let reader = open_bed_reader(&args.trf_path)?;
    let records = TrfReader::new(reader, source.as_str()).collect::<Result<Vec<_>>>()?;
    log::info!("Translated {} TRF hits", records.len());

    let dump_path = format!("{}.json.gz", args.output);
    dump_gz_json(Path::new(&dump_path), &records)?;

    let writer = BufWriter::new(File::create(&args.output)?);
    write_projection(&records, writer)?;
    Ok(())
}
