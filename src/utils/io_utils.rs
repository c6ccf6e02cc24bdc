use crate::utils::Result;
use flate2::{write::GzEncoder, Compression};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Compression level of structured dumps.
const DUMP_COMPRESSION: u32 = 5;

/// Writes `value` as gzip-compressed JSON.
pub fn dump_gz_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    log::debug!("Writing structured dump to {}", path.display());
    let file = File::create(path)?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::new(DUMP_COMPRESSION));
    serde_json::to_writer(&mut encoder, value)?;
    encoder.finish()?.flush()?;
    Ok(())
}

/// Writes `value` as indented, uncompressed JSON.
pub fn write_pretty_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
