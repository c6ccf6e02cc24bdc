use super::{Error, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read as ioRead};
use std::path::Path;

fn is_gzipped(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".gzip")
}

/// Opens a plain or gzip/bgzip compressed text file.
pub fn open_bed_reader(path: &Path) -> Result<BufReader<Box<dyn ioRead>>> {
    let file = File::open(path)
        .map_err(|e| Error::InvalidInput(format!("{}: {}", path.display(), e)))?;
    if is_gzipped(path) {
        let gz_decoder = MultiGzDecoder::new(file);
        if gz_decoder.header().is_some() {
            Ok(BufReader::new(Box::new(gz_decoder)))
        } else {
            Err(Error::InvalidInput(format!(
                "Invalid gzip header: {}",
                path.to_string_lossy()
            )))
        }
    } else {
        Ok(BufReader::new(Box::new(file)))
    }
}

/// Reads from `path` when given, standard input otherwise.
pub fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    match path {
        Some(path) => Ok(Box::new(open_bed_reader(path)?)),
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

/// Line-numbered lines of a text stream, without their line terminators.
///
/// A line that is not valid UTF-8 is yielded as a `Malformed` error for that
/// line and reading continues with the next one. Only read failures end the
/// stream.
pub struct NumberedLines<R> {
    reader: R,
    buf: Vec<u8>,
    line_number: usize,
}

pub fn numbered_lines<R: BufRead>(reader: R) -> NumberedLines<R> {
    NumberedLines {
        reader,
        buf: Vec::new(),
        line_number: 0,
    }
}

impl<R: BufRead> Iterator for NumberedLines<R> {
    type Item = io::Result<(usize, Result<String>)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                self.line_number += 1;
                if self.buf.ends_with(b"\n") {
                    self.buf.pop();
                    if self.buf.ends_with(b"\r") {
                        self.buf.pop();
                    }
                }
                let line = String::from_utf8(std::mem::take(&mut self.buf)).map_err(|e| {
                    Error::Malformed(format!("Line is not valid UTF-8: {}", e.utf8_error()))
                });
                Some(Ok((self.line_number, line)))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Name used for an input in error messages.
pub fn input_name(path: Option<&Path>) -> String {
    path.map_or_else(|| "<stdin>".to_string(), |p| p.display().to_string())
}
