//! RepeatMasker `.out` parsing.
//!
//! Builds a lookup from query sequence name to the `(score, class)` of every
//! hit scoring at least the threshold, in file order.

use crate::utils::{numbered_lines, Diagnostics, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::BufRead;

pub const DEFAULT_MIN_SCORE: u32 = 225;

/// Column header lines at the top of every `.out` file.
const HEADER_LINES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatMaskerHit {
    pub score: u32,
    pub class: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OutRow {
    score: u32,
    query: String,
    class_family: String,
}

/// Columns: SW score, div, del, ins, query, begin, end, (left), strand,
/// repeat, class/family, ...
fn parse_row(line: &str) -> Result<OutRow> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 11 {
        return Err(Error::Malformed(format!(
            "Expected at least 11 RepeatMasker columns, found {}",
            fields.len()
        )));
    }
    let score = fields[0]
        .parse::<u32>()
        .map_err(|_| Error::Malformed(format!("Invalid SW score '{}'", fields[0])))?;
    Ok(OutRow {
        score,
        query: fields[4].to_string(),
        class_family: fields[10].to_string(),
    })
}

/// Hits grouped by query name. Keys are sorted so dumps are reproducible.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RepeatMaskerLookup {
    hits: BTreeMap<String, Vec<RepeatMaskerHit>>,
}

impl RepeatMaskerLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, query: &str) -> Option<&[RepeatMaskerHit]> {
        self.hits.get(query).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Adds the qualifying hits of one `.out` stream.
    pub fn add_output<R: BufRead>(
        &mut self,
        reader: R,
        source: &str,
        min_score: u32,
        diagnostics: &mut dyn Diagnostics,
    ) -> Result<()> {
        for item in numbered_lines(reader).skip(HEADER_LINES) {
            let (line_number, line) = item?;
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    diagnostics.malformed(source, line_number, &e.to_string());
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let row = match parse_row(&line) {
                Ok(row) => row,
                Err(e) => {
                    diagnostics.malformed(source, line_number, &e.to_string());
                    continue;
                }
            };
            if row.score < min_score {
                continue;
            }
            let class = row
                .class_family
                .split('/')
                .next()
                .unwrap_or_default()
                .to_string();
            self.hits.entry(row.query).or_default().push(RepeatMaskerHit {
                score: row.score,
                class,
            });
        }
        Ok(())
    }
}
