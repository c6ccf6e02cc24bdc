use crate::utils::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest coordinate accepted when parsing.
pub const MAX_COORD: u64 = i64::MAX as u64;

fn parse_coord(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok().filter(|&coord| coord <= MAX_COORD)
}

/// Half-open, zero-based genomic interval as found in BED files.
///
/// `end < start` is representable on purpose: raw catalog records are
/// validated by the region filter rather than on construction. Parsed
/// coordinates never exceed [`MAX_COORD`], so spans fit in an `i64`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

impl Interval {
    pub fn new(chrom: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            end,
        }
    }

    /// Parses the first three tab-separated fields of a BED line.
    pub fn from_bed_line(line: &str) -> Result<Self> {
        let mut fields = line.trim_end_matches(['\r', '\n']).split('\t');
        let (chrom, start, end) = match (fields.next(), fields.next(), fields.next()) {
            (Some(chrom), Some(start), Some(end)) => (chrom, start, end),
            _ => {
                return Err(Error::Malformed(format!(
                    "Expected at least 3 tab-separated fields 'chrom start end': {}",
                    line.trim_end()
                )))
            }
        };
        let coord = |value: &str| {
            parse_coord(value).ok_or_else(|| {
                Error::Malformed(format!(
                    "Invalid coordinate '{}' in line: {}",
                    value,
                    line.trim_end()
                ))
            })
        };
        Ok(Self::new(chrom, coord(start)?, coord(end)?))
    }

    /// Parses a `chrom:start-end` region name. The chromosome is everything
    /// before the last colon.
    pub fn from_region_string(encoding: &str) -> Result<Self> {
        let error_msg = || Error::Malformed(format!("Invalid region encoding: {}", encoding));
        let (chrom, coords) = encoding.rsplit_once(':').ok_or_else(error_msg)?;
        let (start, end) = coords.split_once('-').ok_or_else(error_msg)?;
        if chrom.is_empty() {
            return Err(error_msg());
        }
        let start = parse_coord(start).ok_or_else(error_msg)?;
        let end = parse_coord(end).ok_or_else(error_msg)?;
        Ok(Self::new(chrom, start, end))
    }

    /// Signed `end - start`, saturating at the `i64` bounds.
    pub fn span(&self) -> i64 {
        let span = self.end as i128 - self.start as i128;
        span.clamp(i64::MIN.into(), i64::MAX.into()) as i64
    }

    pub fn abs_span(&self) -> u64 {
        self.end.abs_diff(self.start)
    }

    /// Length of the shared half-open range, zero when disjoint or on
    /// different chromosomes.
    pub fn overlap_len(&self, other: &Interval) -> u64 {
        if self.chrom != other.chrom {
            return 0;
        }
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        end.saturating_sub(start)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.chrom, self.start, self.end)
    }
}
