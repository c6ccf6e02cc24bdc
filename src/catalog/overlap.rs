//! Distribution of overlap counts between two interval sets.
//!
//! For every interval of set A the number of overlapping intervals of set B
//! is computed by an [`Intersector`]; [`OverlapCounter`] groups A intervals by
//! that number. Grouping is independent of how the counts were obtained, so
//! `bedtools` and the in-process implementation are interchangeable. The
//! in-process one queries a `rust_lapper` tree per chromosome.

use crate::utils::{numbered_lines, open_bed_reader, Error, Interval, Result};
use rust_lapper::Lapper;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const DEFAULT_RECIPROCAL_FRACTION: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlapMode {
    /// Half-open ranges share at least one base.
    Any,
    /// Shared bases are at least `fraction` of both intervals.
    Reciprocal { fraction: f64 },
}

impl OverlapMode {
    pub fn reciprocal() -> Self {
        OverlapMode::Reciprocal {
            fraction: DEFAULT_RECIPROCAL_FRACTION,
        }
    }

    pub fn is_reciprocal(&self) -> bool {
        matches!(self, OverlapMode::Reciprocal { .. })
    }

    pub fn overlaps(&self, a: &Interval, b: &Interval) -> bool {
        let shared = a.overlap_len(b);
        if shared == 0 {
            return false;
        }
        match *self {
            OverlapMode::Any => true,
            OverlapMode::Reciprocal { fraction } => {
                let shared = shared as f64;
                shared >= fraction * a.abs_span() as f64 && shared >= fraction * b.abs_span() as f64
            }
        }
    }
}

impl fmt::Display for OverlapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlapMode::Any => write!(f, "any"),
            OverlapMode::Reciprocal { fraction } => write!(f, "reciprocal({})", fraction),
        }
    }
}

/// Per-interval overlap counting capability.
pub trait Intersector: Send + Sync {
    /// Number of intervals in `b` overlapping each interval in `a`.
    fn count_overlaps(&self, a: &Path, b: &Path, mode: OverlapMode) -> Result<Vec<u64>>;
}

/// Runs `bedtools intersect -c`.
#[derive(Debug, Clone)]
pub struct BedtoolsIntersector {
    program: PathBuf,
}

impl BedtoolsIntersector {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, a: &Path, b: &Path, mode: OverlapMode) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("intersect").arg("-a").arg(a).arg("-b").arg(b).arg("-c");
        if let OverlapMode::Reciprocal { fraction } = mode {
            cmd.arg("-r").arg("-f").arg(fraction.to_string());
        }
        cmd
    }
}

impl Default for BedtoolsIntersector {
    fn default() -> Self {
        Self::new("bedtools")
    }
}

/// Reads the count column that `-c` appends to every A record.
fn parse_count_column(stdout: &str) -> Result<Vec<u64>> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            line.rsplit('\t')
                .next()
                .and_then(|count| count.trim().parse::<u64>().ok())
                .ok_or_else(|| {
                    Error::Tool(format!("Unexpected bedtools intersect output: {}", line))
                })
        })
        .collect()
}

impl Intersector for BedtoolsIntersector {
    fn count_overlaps(&self, a: &Path, b: &Path, mode: OverlapMode) -> Result<Vec<u64>> {
        let mut cmd = self.command(a, b, mode);
        log::debug!("Running {:?}", cmd);
        let output = cmd.output().map_err(|e| {
            Error::Tool(format!("Failed to run {}: {}", self.program.display(), e))
        })?;
        if !output.status.success() {
            return Err(Error::Tool(format!(
                "{} intersect exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        parse_count_column(&String::from_utf8_lossy(&output.stdout))
    }
}

/// In-process overlap counting over one interval tree per chromosome.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeIntersector;

impl NativeIntersector {
    /// Trees over `b`, keyed by chromosome. Each node carries the index of
    /// its interval in `b`. Empty and inverted intervals overlap nothing and
    /// are left out.
    fn build_trees(b: &[Interval]) -> HashMap<&str, Lapper<u64, usize>> {
        let mut nodes: HashMap<&str, Vec<rust_lapper::Interval<u64, usize>>> = HashMap::new();
        for (index, interval) in b.iter().enumerate() {
            if interval.end <= interval.start {
                continue;
            }
            nodes
                .entry(interval.chrom.as_str())
                .or_default()
                .push(rust_lapper::Interval {
                    start: interval.start,
                    stop: interval.end,
                    val: index,
                });
        }
        nodes
            .into_iter()
            .map(|(chrom, chrom_nodes)| (chrom, Lapper::new(chrom_nodes)))
            .collect()
    }

    pub fn count(&self, a: &[Interval], b: &[Interval], mode: OverlapMode) -> Vec<u64> {
        let trees = Self::build_trees(b);
        a.iter()
            .map(|query| {
                let Some(tree) = trees.get(query.chrom.as_str()) else {
                    return 0;
                };
                if query.end <= query.start {
                    return 0;
                }
                tree.find(query.start, query.end)
                    .filter(|hit| mode.overlaps(query, &b[hit.val]))
                    .count() as u64
            })
            .collect()
    }
}

/// Loads every interval of a BED file; any malformed line is fatal.
pub fn load_intervals(path: &Path) -> Result<Vec<Interval>> {
    let reader = open_bed_reader(path)?;
    let mut intervals = Vec::new();
    for item in numbered_lines(reader) {
        let (line_number, line) = item?;
        let to_format_error =
            |e: Error| Error::format(path.display().to_string(), line_number, e.to_string());
        let line = line.map_err(to_format_error)?;
        if line.trim().is_empty() || line.starts_with('#') || line.starts_with("track") {
            continue;
        }
        intervals.push(Interval::from_bed_line(&line).map_err(to_format_error)?);
    }
    Ok(intervals)
}

impl Intersector for NativeIntersector {
    fn count_overlaps(&self, a: &Path, b: &Path, mode: OverlapMode) -> Result<Vec<u64>> {
        let a = load_intervals(a)?;
        let b = load_intervals(b)?;
        Ok(self.count(&a, &b, mode))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapCountRow {
    pub count: u64,
    pub num_with_that_count: u64,
    pub source: Option<String>,
    pub reciprocal: bool,
}

impl fmt::Display for OverlapCountRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.count,
            self.num_with_that_count,
            self.source.as_deref().unwrap_or("."),
            self.reciprocal
        )
    }
}

/// Groups per-interval counts into `(count, number of intervals)` pairs,
/// ascending by count.
pub fn group_counts(counts: &[u64]) -> Vec<(u64, u64)> {
    let mut grouped: BTreeMap<u64, u64> = BTreeMap::new();
    for &count in counts {
        *grouped.entry(count).or_insert(0) += 1;
    }
    grouped.into_iter().collect()
}

/// Default source label: the name of the directory holding `path`.
pub fn source_from_path(path: &Path) -> Option<String> {
    path.parent()
        .and_then(|dir| dir.file_name())
        .map(|name| name.to_string_lossy().into_owned())
}

pub struct OverlapCounter<'a> {
    intersector: &'a dyn Intersector,
}

impl<'a> OverlapCounter<'a> {
    pub fn new(intersector: &'a dyn Intersector) -> Self {
        Self { intersector }
    }

    pub fn count(
        &self,
        a: &Path,
        b: &Path,
        mode: OverlapMode,
        source: Option<&str>,
    ) -> Result<Vec<OverlapCountRow>> {
        log::info!("Intersecting {} with {} ({})", a.display(), b.display(), mode);
        let counts = self.intersector.count_overlaps(a, b, mode)?;
        Ok(group_counts(&counts)
            .into_iter()
            .map(|(count, num_with_that_count)| OverlapCountRow {
                count,
                num_with_that_count,
                source: source.map(str::to_string),
                reciprocal: mode.is_reciprocal(),
            })
            .collect())
    }

    /// Runs every mode in order and concatenates the tagged rows.
    pub fn count_modes(
        &self,
        a: &Path,
        b: &Path,
        modes: &[OverlapMode],
        source: Option<&str>,
    ) -> Result<Vec<OverlapCountRow>> {
        let mut rows = Vec::new();
        for &mode in modes {
            rows.extend(self.count(a, b, mode, source)?);
        }
        Ok(rows)
    }
}

pub fn write_rows<W: Write>(rows: &[OverlapCountRow], mut writer: W) -> Result<()> {
    writeln!(writer, "count\tnum_with_that_count\tsource\treciprocal")?;
    for row in rows {
        writeln!(writer, "{}", row)?;
    }
    writer.flush()?;
    Ok(())
}
