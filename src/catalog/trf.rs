//! Parsing of Tandem Repeat Finder `-ngs` output.
//!
//! TRF is run on sub-sequences fetched with `samtools faidx`, so every block
//! of hits is preceded by an `@chrom:start-end` header naming the fetched
//! region. Hit coordinates are local to that region and are translated back
//! to whole-genome coordinates here.
//!
//! In the tab-separated projection `copies` and `entropy` always carry a
//! fractional part (`3.0`), while `period` prints like an integer when it is
//! one (`2`).

use crate::utils::{numbered_lines, Error, Interval, NumberedLines, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

const HEADER_SENTINEL: char = '@';
const EXPECTED_FIELD_COUNT: usize = 17;

/// Subtracted from the 1-based header start to get the translation offset.
/// Two, not one: the fetch step adds a fence-post shift on top of the
/// 1-based to 0-based conversion.
pub const HEADER_OFFSET_ADJUST: i64 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatedRecord {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub period: f64,
    pub copies: f64,
    pub consize: u32,
    pub pctmat: u32,
    pub pctindel: u32,
    pub score: u32,
    #[serde(rename = "A")]
    pub a: u32,
    #[serde(rename = "C")]
    pub c: u32,
    #[serde(rename = "G")]
    pub g: u32,
    #[serde(rename = "T")]
    pub t: u32,
    pub entropy: f64,
    pub repeat: String,
    pub upflank: String,
    pub sequence: String,
    pub dnflank: String,
    pub in_region_start: u64,
    pub in_region_end: u64,
}

impl TranslatedRecord {
    pub fn interval(&self) -> Interval {
        Interval::new(self.chrom.clone(), self.start, self.end)
    }

    /// `chrom, start, end, period, copies, score, entropy, repeat`, tab separated.
    pub fn projection(&self) -> String {
        [
            self.chrom.clone(),
            self.start.to_string(),
            self.end.to_string(),
            self.period.to_string(),
            format!("{:?}", self.copies),
            self.score.to_string(),
            format!("{:?}", self.entropy),
            self.repeat.clone(),
        ]
        .iter()
        .join("\t")
    }
}

/// Header of the block currently being read.
#[derive(Debug, Clone, PartialEq)]
struct BlockHeader {
    region: Interval,
    offset: i64,
}

impl BlockHeader {
    fn parse(name: &str) -> Result<Self> {
        let region = Interval::from_region_string(name.trim())?;
        let offset = region.start as i64 - HEADER_OFFSET_ADJUST;
        Ok(Self { region, offset })
    }

    /// Whole-genome coordinate of `local`, `None` when it falls outside
    /// `0..=i64::MAX`.
    fn translate(&self, local: u64) -> Option<u64> {
        let global = i64::try_from(local).ok()?.checked_add(self.offset)?;
        u64::try_from(global).ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ParserState {
    AwaitingHeader,
    InBlock(BlockHeader),
}

fn parse_field<T: std::str::FromStr>(value: &str, name: &str) -> std::result::Result<T, String> {
    value
        .parse::<T>()
        .map_err(|_| format!("Invalid {} value '{}'", name, value))
}

fn parse_data_line(line: &str, header: &BlockHeader) -> std::result::Result<TranslatedRecord, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != EXPECTED_FIELD_COUNT {
        return Err(format!(
            "Expected {} fields in TRF data line, found {}",
            EXPECTED_FIELD_COUNT,
            fields.len()
        ));
    }
    let local_start: u64 = parse_field(fields[0], "start")?;
    let local_end: u64 = parse_field(fields[1], "end")?;
    let translate = |local: u64| {
        header.translate(local).ok_or_else(|| {
            format!(
                "Coordinate {} is out of range after translation for region {}:{}-{}",
                local, header.region.chrom, header.region.start, header.region.end
            )
        })
    };

    Ok(TranslatedRecord {
        chrom: header.region.chrom.clone(),
        start: translate(local_start)?,
        end: translate(local_end)?,
        period: parse_field(fields[2], "period")?,
        copies: parse_field(fields[3], "copies")?,
        consize: parse_field(fields[4], "consize")?,
        pctmat: parse_field(fields[5], "pctmat")?,
        pctindel: parse_field(fields[6], "pctindel")?,
        score: parse_field(fields[7], "score")?,
        a: parse_field(fields[8], "A")?,
        c: parse_field(fields[9], "C")?,
        g: parse_field(fields[10], "G")?,
        t: parse_field(fields[11], "T")?,
        entropy: parse_field(fields[12], "entropy")?,
        repeat: fields[13].to_string(),
        upflank: fields[14].to_string(),
        sequence: fields[15].to_string(),
        dnflank: fields[16].to_string(),
        in_region_start: header.region.start,
        in_region_end: header.region.end,
    })
}

/// Iterator over the translated records of a TRF output stream. Any error
/// is fatal for the stream: after yielding one the iterator is exhausted.
pub struct TrfReader<R: BufRead> {
    lines: NumberedLines<R>,
    source: String,
    line_number: usize,
    state: ParserState,
    failed: bool,
}

impl<R: BufRead> TrfReader<R> {
    pub fn new(reader: R, source: impl Into<String>) -> Self {
        Self {
            lines: numbered_lines(reader),
            source: source.into(),
            line_number: 0,
            state: ParserState::AwaitingHeader,
            failed: false,
        }
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::format(self.source.clone(), self.line_number, reason)
    }

    fn next_record(&mut self) -> Option<Result<TranslatedRecord>> {
        loop {
            let (line_number, line) = match self.lines.next()? {
                Ok(item) => item,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_number = line_number;
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(self.error(e.to_string()))),
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(name) = line.strip_prefix(HEADER_SENTINEL) {
                match BlockHeader::parse(name) {
                    Ok(header) => {
                        log::trace!("TRF block {} (offset {})", name, header.offset);
                        self.state = ParserState::InBlock(header);
                        continue;
                    }
                    Err(e) => return Some(Err(self.error(e.to_string()))),
                }
            }

            let record = match &self.state {
                ParserState::AwaitingHeader => {
                    Err(self.error("Data line encountered before any '@' header"))
                }
                ParserState::InBlock(header) => {
                    parse_data_line(line, header).map_err(|reason| self.error(reason))
                }
            };
            return Some(record);
        }
    }
}

impl<R: BufRead> Iterator for TrfReader<R> {
    type Item = Result<TranslatedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.next_record();
        if matches!(item, Some(Err(_))) {
            self.failed = true;
        }
        item
    }
}

/// Parses a whole TRF output stream, stopping at the first error.
pub fn parse_trf_output<R: BufRead>(reader: R, source: &str) -> Result<Vec<TranslatedRecord>> {
    TrfReader::new(reader, source).collect()
}

/// Writes the tab-separated projection of `records`, without a header line.
pub fn write_projection<W: Write>(records: &[TranslatedRecord], mut writer: W) -> Result<()> {
    for record in records {
        writeln!(writer, "{}", record.projection())?;
    }
    writer.flush()?;
    Ok(())
}
