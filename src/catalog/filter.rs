//! Validation and filtering of raw catalog regions.
//!
//! Every well-formed record receives exactly one classification, checked in
//! a fixed priority order: unknown chromosome, inverted coordinates, span
//! too small, span too large, kept. A single [`FilterStats`] value backs both
//! the human-readable and the JSON summary.

use crate::utils::{numbered_lines, Diagnostics, Error, Interval, Result};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::io::{BufRead, Write};

/// Chromosomes 1-22, X and Y, with and without the `chr` prefix.
pub static KNOWN_CHROMS: Lazy<HashSet<String>> = Lazy::new(|| {
    (1..=22)
        .map(|n| n.to_string())
        .chain(["X".to_string(), "Y".to_string()])
        .flat_map(|name| [format!("chr{}", name), name])
        .collect()
});

pub const DEFAULT_MIN_SPAN: u64 = 10;
pub const DEFAULT_MAX_SPAN: u64 = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Kept,
    UnknownChrom,
    InvertedCoords,
    TooSmall,
    TooLarge,
}

#[derive(Debug, Clone)]
pub struct FilterParams {
    pub min_span: u64,
    pub max_span: u64,
    pub extra_chroms: HashSet<String>,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            min_span: DEFAULT_MIN_SPAN,
            max_span: DEFAULT_MAX_SPAN,
            extra_chroms: HashSet::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub total: u64,
    pub chrom_rm: u64,
    pub coord_rm: u64,
    pub small_rm: u64,
    pub big_rm: u64,
    pub span_kept: u64,
    pub span_rm: u64,
}

/// Serialized form of [`FilterStats`].
#[derive(Debug, Serialize)]
pub struct FilterSummary {
    pub total: u64,
    pub removed: u64,
    pub removed_pct: f64,
    pub chrom_rm: u64,
    pub small_rm: u64,
    pub big_rm: u64,
    pub coord_rm: u64,
    pub span_total: u64,
    pub span_rm: u64,
    pub span_kept: u64,
}

fn percent(part: u64, whole: u64, what: &str) -> Result<f64> {
    if whole == 0 {
        return Err(Error::NoData(format!(
            "no {} to compute the removed percentage from",
            what
        )));
    }
    Ok(part as f64 / whole as f64 * 100.0)
}

impl FilterStats {
    pub fn removed(&self) -> u64 {
        self.chrom_rm + self.coord_rm + self.small_rm + self.big_rm
    }

    pub fn kept(&self) -> u64 {
        self.total - self.removed()
    }

    pub fn span_total(&self) -> u64 {
        self.span_kept.saturating_add(self.span_rm)
    }

    pub fn removed_pct(&self) -> Result<f64> {
        percent(self.removed(), self.total, "records")
    }

    pub fn span_rm_pct(&self) -> Result<f64> {
        percent(self.span_rm, self.span_total(), "span")
    }

    fn record(&mut self, classification: Classification, abs_span: u64) {
        self.total += 1;
        match classification {
            Classification::Kept => {
                self.span_kept = self.span_kept.saturating_add(abs_span);
                return;
            }
            Classification::UnknownChrom => self.chrom_rm += 1,
            Classification::InvertedCoords => self.coord_rm += 1,
            Classification::TooSmall => self.small_rm += 1,
            Classification::TooLarge => self.big_rm += 1,
        }
        self.span_rm = self.span_rm.saturating_add(abs_span);
    }

    /// Merges stats computed independently for another input.
    pub fn merge(&mut self, other: &FilterStats) {
        self.total += other.total;
        self.chrom_rm += other.chrom_rm;
        self.coord_rm += other.coord_rm;
        self.small_rm += other.small_rm;
        self.big_rm += other.big_rm;
        self.span_kept = self.span_kept.saturating_add(other.span_kept);
        self.span_rm = self.span_rm.saturating_add(other.span_rm);
    }

    pub fn summary(&self) -> Result<FilterSummary> {
        Ok(FilterSummary {
            total: self.total,
            removed: self.removed(),
            removed_pct: self.removed_pct()?,
            chrom_rm: self.chrom_rm,
            small_rm: self.small_rm,
            big_rm: self.big_rm,
            coord_rm: self.coord_rm,
            span_total: self.span_total(),
            span_rm: self.span_rm,
            span_kept: self.span_kept,
        })
    }

    /// Human-readable report. Fails on empty input like [`FilterStats::summary`].
    pub fn report(&self) -> Result<String> {
        Ok(format!("{}", StatsReport::new(self)?))
    }
}

struct StatsReport<'a> {
    stats: &'a FilterStats,
    removed_pct: f64,
    span_rm_pct: f64,
}

impl<'a> StatsReport<'a> {
    fn new(stats: &'a FilterStats) -> Result<Self> {
        Ok(Self {
            stats,
            removed_pct: stats.removed_pct()?,
            span_rm_pct: stats.span_rm_pct()?,
        })
    }
}

impl fmt::Display for StatsReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.stats;
        writeln!(
            f,
            "Count removed {} of {} = {} ({:.2}%)",
            s.removed(),
            s.total,
            s.kept(),
            self.removed_pct
        )?;
        writeln!(
            f,
            "Span removed {} of {} = {} ({:.2}%)",
            s.span_rm,
            s.span_total(),
            s.span_kept,
            self.span_rm_pct
        )?;
        writeln!(f, "Chromosome removed: {}", s.chrom_rm)?;
        writeln!(f, "Small removed: {}", s.small_rm)?;
        writeln!(f, "Big removed: {}", s.big_rm)?;
        write!(f, "Coord removed: {}", s.coord_rm)
    }
}

pub struct RegionFilter {
    params: FilterParams,
}

impl RegionFilter {
    pub fn new(params: FilterParams) -> Self {
        Self { params }
    }

    fn is_known_chrom(&self, chrom: &str) -> bool {
        KNOWN_CHROMS.contains(chrom) || self.params.extra_chroms.contains(chrom)
    }

    pub fn classify(&self, interval: &Interval) -> Classification {
        if !self.is_known_chrom(&interval.chrom) {
            return Classification::UnknownChrom;
        }
        if interval.end <= interval.start {
            return Classification::InvertedCoords;
        }
        let span = interval.end - interval.start;
        if span < self.params.min_span {
            Classification::TooSmall
        } else if span > self.params.max_span {
            Classification::TooLarge
        } else {
            Classification::Kept
        }
    }

    /// Classifies `interval` and updates `stats`; returns true when kept.
    pub fn accept(&self, interval: &Interval, stats: &mut FilterStats) -> bool {
        let classification = self.classify(interval);
        stats.record(classification, interval.abs_span());
        classification == Classification::Kept
    }

    /// Streams BED lines from `reader`, writing kept intervals to `writer`.
    /// Lines that do not parse are reported to `diagnostics` and are not
    /// counted in the stats.
    pub fn filter_stream<R: BufRead, W: Write>(
        &self,
        reader: R,
        mut writer: W,
        source: &str,
        diagnostics: &mut dyn Diagnostics,
    ) -> Result<FilterStats> {
        let mut stats = FilterStats::default();
        for item in numbered_lines(reader) {
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
            let interval = match Interval::from_bed_line(&line) {
                Ok(interval) => interval,
                Err(e) => {
                    diagnostics.malformed(source, line_number, &e.to_string());
                    continue;
                }
            };
            if self.accept(&interval, &mut stats) {
                writeln!(writer, "{}", interval)?;
            }
        }
        writer.flush()?;
        Ok(stats)
    }

    pub fn filter<'a, I>(&self, intervals: I) -> (Vec<Interval>, FilterStats)
    where
        I: IntoIterator<Item = &'a Interval>,
    {
        let mut stats = FilterStats::default();
        let kept = intervals
            .into_iter()
            .filter(|interval| self.accept(interval, &mut stats))
            .cloned()
            .collect();
        (kept, stats)
    }
}

impl Default for RegionFilter {
    fn default() -> Self {
        Self::new(FilterParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::VecDiagnostics;
    use std::io::Cursor;

    fn iv(chrom: &str, start: u64, end: u64) -> Interval {
        Interval::new(chrom, start, end)
    }

    #[test]
    fn test_known_chroms() {
        assert_eq!(KNOWN_CHROMS.len(), 48);
        for name in ["chr1", "1", "chr22", "22", "chrX", "X", "chrY", "Y"] {
            assert!(KNOWN_CHROMS.contains(name), "{}", name);
        }
        for name in ["chrM", "MT", "chr23", "chr1_KI270706v1_random", "chrUn"] {
            assert!(!KNOWN_CHROMS.contains(name), "{}", name);
        }
    }

    #[test]
    fn test_classification_examples() {
        let filter = RegionFilter::default();
        assert_eq!(
            filter.classify(&iv("chrM", 100, 50)),
            Classification::UnknownChrom
        );
        assert_eq!(filter.classify(&iv("chr1", 100, 105)), Classification::TooSmall);
        assert_eq!(
            filter.classify(&iv("chr1", 100, 60100)),
            Classification::TooLarge
        );
        assert_eq!(filter.classify(&iv("chr1", 100, 200)), Classification::Kept);
        assert_eq!(
            filter.classify(&iv("chr1", 100, 100)),
            Classification::InvertedCoords
        );
    }

    #[test]
    fn test_span_bounds_are_inclusive() {
        let filter = RegionFilter::default();
        assert_eq!(filter.classify(&iv("1", 0, 10)), Classification::Kept);
        assert_eq!(filter.classify(&iv("1", 0, 9)), Classification::TooSmall);
        assert_eq!(filter.classify(&iv("1", 0, 50_000)), Classification::Kept);
        assert_eq!(filter.classify(&iv("1", 0, 50_001)), Classification::TooLarge);
    }

    #[test]
    fn test_unknown_chrom_takes_priority() {
        let filter = RegionFilter::default();
        let (kept, stats) = filter.filter(&[iv("chrUn", 100, 102)]);
        assert!(kept.is_empty());
        assert_eq!(stats.chrom_rm, 1);
        assert_eq!(stats.small_rm, 0);
    }

    #[test]
    fn test_stats_accounting() {
        let filter = RegionFilter::default();
        let input = vec![
            iv("chrM", 100, 50),
            iv("chr1", 100, 105),
            iv("chr1", 100, 60100),
            iv("chr1", 100, 200),
            iv("chr2", 300, 200),
            iv("X", 0, 1000),
        ];
        let (kept, stats) = filter.filter(&input);
        assert_eq!(kept, vec![iv("chr1", 100, 200), iv("X", 0, 1000)]);
        assert_eq!(stats.total, 6);
        assert_eq!(stats.chrom_rm, 1);
        assert_eq!(stats.small_rm, 1);
        assert_eq!(stats.big_rm, 1);
        assert_eq!(stats.coord_rm, 1);
        assert_eq!(
            stats.removed(),
            stats.chrom_rm + stats.small_rm + stats.big_rm + stats.coord_rm
        );
        assert_eq!(stats.span_kept, 1100);
        assert_eq!(stats.span_rm, 50 + 5 + 60000 + 100);
        assert_eq!(stats.span_total(), stats.span_kept + stats.span_rm);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let filter = RegionFilter::default();
        let input = vec![
            iv("chr1", 100, 200),
            iv("chr3", 10, 15),
            iv("Y", 1, 40000),
            iv("chr7", 5, 4),
        ];
        let (kept, _) = filter.filter(&input);
        let (kept_again, stats) = filter.filter(&kept);
        assert_eq!(kept, kept_again);
        assert_eq!(stats.removed(), 0);
    }

    #[test]
    fn test_filter_stream_skips_malformed() {
        let filter = RegionFilter::default();
        let input = "chr1\t100\t200\nchr1\tabc\t200\n\nchr2\t10\nchr3\t0\t50\n";
        let mut out = Vec::new();
        let mut sink = VecDiagnostics::default();
        let stats = filter
            .filter_stream(Cursor::new(input), &mut out, "in.bed", &mut sink)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "chr1\t100\t200\nchr3\t0\t50\n");
        assert_eq!(stats.total, 2);
        assert_eq!(sink.malformed_count(), 2);
        assert!(sink.messages[0].starts_with("in.bed line 2:"));
        assert!(sink.messages[1].starts_with("in.bed line 4:"));
    }

    #[test]
    fn test_filter_stream_skips_invalid_utf8() {
        let filter = RegionFilter::default();
        let mut input = b"chr1\t100\t200\n".to_vec();
        input.extend_from_slice(b"chr\xff\t1\t50\n");
        input.extend_from_slice(b"chr2\t100\t200\n");
        let mut out = Vec::new();
        let mut sink = VecDiagnostics::default();
        let stats = filter
            .filter_stream(Cursor::new(input), &mut out, "in.bed", &mut sink)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "chr1\t100\t200\nchr2\t100\t200\n"
        );
        assert_eq!(stats.total, 2);
        assert_eq!(sink.malformed_count(), 1);
        assert!(sink.messages[0].starts_with("in.bed line 2:"));
    }

    #[test]
    fn test_span_totals_saturate() {
        let filter = RegionFilter::default();
        let huge = i64::MAX as u64;
        let (_, stats) = filter.filter(&[
            iv("chr1", 0, huge),
            iv("chr1", 0, huge),
            iv("chr1", 0, huge),
        ]);
        assert_eq!(stats.big_rm, 3);
        assert_eq!(stats.span_rm, u64::MAX);
        assert_eq!(stats.span_total(), u64::MAX);
    }

    #[test]
    fn test_empty_input_is_no_data() {
        let stats = FilterStats::default();
        assert!(matches!(stats.summary(), Err(Error::NoData(_))));
        assert!(matches!(stats.report(), Err(Error::NoData(_))));
    }

    #[test]
    fn test_summary_and_report_share_stats() {
        let filter = RegionFilter::default();
        let (_, stats) = filter.filter(&[iv("chr1", 0, 100), iv("chrM", 0, 300)]);
        let summary = stats.summary().unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.removed, 1);
        assert_eq!(summary.removed_pct, 50.0);
        assert_eq!(summary.span_total, 400);

        let report = stats.report().unwrap();
        assert!(report.contains("Count removed 1 of 2 = 1 (50.00%)"));
        assert!(report.contains("Span removed 300 of 400 = 100 (75.00%)"));
        assert!(report.contains("Chromosome removed: 1"));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["chrom_rm"], 1);
        assert_eq!(json["span_kept"], 100);
    }

    #[test]
    fn test_extra_chroms() {
        let mut params = FilterParams::default();
        params.extra_chroms.insert("chrM".to_string());
        let filter = RegionFilter::new(params);
        assert_eq!(filter.classify(&iv("chrM", 0, 100)), Classification::Kept);
    }

    #[test]
    fn test_merge_stats() {
        let filter = RegionFilter::default();
        let (_, mut a) = filter.filter(&[iv("chr1", 0, 100)]);
        let (_, b) = filter.filter(&[iv("chr1", 0, 5)]);
        a.merge(&b);
        assert_eq!(a.total, 2);
        assert_eq!(a.small_rm, 1);
        assert_eq!(a.span_total(), 105);
    }
}
