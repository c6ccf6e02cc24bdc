//! Joins catalog regions with the records of a range-indexed annotation file.

use crate::utils::{numbered_lines, Diagnostics, Error, Interval, Result};
use rust_htslib::tbx::{self, Read as TbxRead};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::path::Path;

/// One raw record returned by an annotation query, split into fields.
pub type RawAnnotation = Vec<String>;

const ANNOTATION_FIELD_COUNT: usize = 8;

/// Range-query capability over an annotation source.
///
/// The outer `Result` fails the whole query (e.g. unknown contig), the inner
/// ones fail single records.
pub trait AnnotationSource {
    fn query(&mut self, chrom: &str, start: u64, end: u64)
        -> Result<Vec<Result<RawAnnotation>>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub period: f64,
    pub copies: f64,
    pub score: i64,
    pub entropy: f64,
    pub repeat: String,
}

impl AnnotationRecord {
    /// Maps `chrom, start, end, period, copies, score, entropy, repeat`.
    /// Fields past the eighth are ignored.
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Result<Self> {
        if fields.len() < ANNOTATION_FIELD_COUNT {
            return Err(Error::Malformed(format!(
                "Expected {} annotation fields, found {}",
                ANNOTATION_FIELD_COUNT,
                fields.len()
            )));
        }
        let field = |i: usize| fields[i].as_ref();
        fn parse<T: std::str::FromStr>(value: &str, name: &str) -> Result<T> {
            value
                .trim()
                .parse::<T>()
                .map_err(|_| Error::Malformed(format!("Invalid {} value '{}'", name, value)))
        }

        Ok(Self {
            chrom: field(0).to_string(),
            start: parse(field(1), "start")?,
            end: parse(field(2), "end")?,
            period: parse(field(3), "period")?,
            copies: parse(field(4), "copies")?,
            score: parse(field(5), "score")?,
            entropy: parse(field(6), "entropy")?,
            repeat: field(7).to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedInterval {
    pub interval: Interval,
    pub annotations: Vec<AnnotationRecord>,
}

impl AnnotatedInterval {
    /// `chrom<TAB>start<TAB>end<TAB>[annotations as JSON]`
    pub fn to_line(&self) -> Result<String> {
        Ok(format!(
            "{}\t{}",
            self.interval,
            serde_json::to_string(&self.annotations)?
        ))
    }
}

/// Tabix-indexed, bgzipped annotation file.
pub struct TabixAnnotationSource {
    reader: tbx::Reader,
}

impl TabixAnnotationSource {
    pub fn from_path(path: &Path) -> Result<Self> {
        let reader = tbx::Reader::from_path(path).map_err(|e| {
            Error::InvalidInput(format!(
                "Failed to open tabix-indexed annotations {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self { reader })
    }
}

impl AnnotationSource for TabixAnnotationSource {
    fn query(
        &mut self,
        chrom: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<Result<RawAnnotation>>> {
        let tid = self.reader.tid(chrom)?;
        self.reader.fetch(tid, start, end)?;
        let records = self
            .reader
            .records()
            .map(|record| -> Result<RawAnnotation> {
                let bytes = record?;
                let text = String::from_utf8(bytes)
                    .map_err(|e| Error::Malformed(format!("Non UTF-8 record: {}", e)))?;
                Ok(text.split('\t').map(str::to_string).collect())
            })
            .collect();
        Ok(records)
    }
}

pub struct AnnotationJoiner<S: AnnotationSource> {
    source: S,
}

impl<S: AnnotationSource> AnnotationJoiner<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Attaches every overlapping annotation to `interval`, read from line
    /// `line_number` of `source`. Failures are reported to `diagnostics` and
    /// never abort the join.
    pub fn annotate(
        &mut self,
        interval: Interval,
        diagnostics: &mut dyn Diagnostics,
        source: &str,
        line_number: usize,
    ) -> AnnotatedInterval {
        let region = format!("{}:{}-{}", interval.chrom, interval.start, interval.end);
        let raw = match self
            .source
            .query(&interval.chrom, interval.start, interval.end)
        {
            Ok(raw) => raw,
            Err(e) => {
                diagnostics.malformed(
                    source,
                    line_number,
                    &format!("Annotation query for {} failed: {}", region, e),
                );
                Vec::new()
            }
        };

        let mut annotations = Vec::with_capacity(raw.len());
        for item in raw {
            match item.and_then(|fields| AnnotationRecord::from_fields(&fields)) {
                Ok(record) => annotations.push(record),
                Err(e) => diagnostics.malformed(
                    source,
                    line_number,
                    &format!("Skipped annotation of {}: {}", region, e),
                ),
            }
        }

        AnnotatedInterval {
            interval,
            annotations,
        }
    }

    /// Annotates every BED line of `reader` in order, writing one output line
    /// per well-formed input line.
    pub fn annotate_stream<R: BufRead, W: Write>(
        &mut self,
        reader: R,
        mut writer: W,
        source: &str,
        diagnostics: &mut dyn Diagnostics,
    ) -> Result<usize> {
        let mut written = 0;
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
            let annotated = self.annotate(interval, diagnostics, source, line_number);
            writeln!(writer, "{}", annotated.to_line()?)?;
            written += 1;
        }
        writer.flush()?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::VecDiagnostics;
    use rust_htslib::{bgzf, htslib};
    use std::collections::HashMap;
    use std::ffi::CString;
    use std::io::Cursor;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MemorySource {
        hits: HashMap<String, Vec<Result<RawAnnotation>>>,
    }

    impl MemorySource {
        fn add(&mut self, chrom: &str, line: &str) {
            self.hits
                .entry(chrom.to_string())
                .or_default()
                .push(Ok(line.split('\t').map(str::to_string).collect()));
        }
    }

    impl AnnotationSource for MemorySource {
        fn query(
            &mut self,
            chrom: &str,
            start: u64,
            end: u64,
        ) -> Result<Vec<Result<RawAnnotation>>> {
            let hits = self
                .hits
                .get(chrom)
                .ok_or_else(|| Error::InvalidInput(format!("unknown contig {}", chrom)))?;
            Ok(hits
                .iter()
                .filter_map(|hit| match hit {
                    Ok(fields) => {
                        let s: u64 = fields[1].parse().ok()?;
                        let e: u64 = fields[2].parse().ok()?;
                        (s < end && start < e).then(|| Ok(fields.clone()))
                    }
                    Err(_) => Some(Err(Error::Malformed("query layer error".to_string()))),
                })
                .collect())
        }
    }

    fn source() -> MemorySource {
        let mut src = MemorySource::default();
        src.add("chr1", "chr1\t100\t130\t2\t15.0\t60\t1.0\tAT");
        src.add("chr1", "chr1\t120\t160\t3.0\t13.3\t80\t1.58\tAAT\textra");
        src.add("chr1", "chr1\t500\t600\t1\t100\t200\t0\tA");
        src.add("chr2", "chr2\t10\t40\tx\t1\t1\t1\tA");
        src
    }

    #[test]
    fn test_from_fields() {
        let record =
            AnnotationRecord::from_fields(&["chr1", "1", "20", "2", "9.5", "30", "0.9", "AC"])
                .unwrap();
        assert_eq!(record.chrom, "chr1");
        assert_eq!(record.end, 20);
        assert_eq!(record.period, 2.0);
        assert_eq!(record.copies, 9.5);
        assert_eq!(record.score, 30);
        assert_eq!(record.repeat, "AC");
    }

    #[test]
    fn test_from_fields_short_err() {
        assert!(AnnotationRecord::from_fields(&["chr1", "1", "20"]).is_err());
    }

    #[test]
    fn test_annotations_in_query_order() {
        let mut joiner = AnnotationJoiner::new(source());
        let mut sink = VecDiagnostics::default();
        let annotated =
            joiner.annotate(Interval::new("chr1", 110, 150), &mut sink, "regions.bed", 1);
        assert_eq!(annotated.annotations.len(), 2);
        assert_eq!(annotated.annotations[0].repeat, "AT");
        assert_eq!(annotated.annotations[1].repeat, "AAT");
        assert_eq!(sink.malformed_count(), 0);
    }

    #[test]
    fn test_no_hits_yields_empty_list() {
        let mut joiner = AnnotationJoiner::new(source());
        let mut sink = VecDiagnostics::default();
        let annotated =
            joiner.annotate(Interval::new("chr1", 200, 300), &mut sink, "regions.bed", 1);
        assert!(annotated.annotations.is_empty());
        assert_eq!(annotated.to_line().unwrap(), "chr1\t200\t300\t[]");
    }

    #[test]
    fn test_malformed_tuple_is_skipped() {
        let mut src = source();
        src.hits
            .get_mut("chr2")
            .unwrap()
            .push(Err(Error::Malformed("broken".to_string())));
        src.add("chr2", "chr2\t20\t30\t2\t5\t20\t1\tGC");
        let mut joiner = AnnotationJoiner::new(src);
        let mut sink = VecDiagnostics::default();
        let annotated =
            joiner.annotate(Interval::new("chr2", 0, 100), &mut sink, "regions.bed", 7);
        assert_eq!(annotated.annotations.len(), 1);
        assert_eq!(annotated.annotations[0].repeat, "GC");
        assert_eq!(sink.malformed_count(), 2);
        assert!(sink.messages[0]
            .starts_with("regions.bed line 7: Skipped annotation of chr2:0-100:"));
    }

    #[test]
    fn test_failed_query_keeps_interval() {
        let mut joiner = AnnotationJoiner::new(source());
        let mut sink = VecDiagnostics::default();
        let mut out = Vec::new();
        let input = "chrUn\t0\t10\nchr1\t550\t560\nchr1\tfoo\n";
        let written = joiner
            .annotate_stream(Cursor::new(input), &mut out, "regions.bed", &mut sink)
            .unwrap();
        assert_eq!(written, 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "chrUn\t0\t10\t[]");
        assert_eq!(
            lines[1],
            format!(
                "chr1\t550\t560\t{}",
                r#"[{"chrom":"chr1","start":500,"end":600,"period":1.0,"copies":100.0,"score":200,"entropy":0.0,"repeat":"A"}]"#
            )
        );
        assert_eq!(sink.malformed_count(), 2);
        assert!(sink.messages[0]
            .starts_with("regions.bed line 1: Annotation query for chrUn:0-10 failed:"));
        assert!(sink.messages[1].starts_with("regions.bed line 3:"));
    }

    #[test]
    fn test_stream_skips_invalid_utf8() {
        let mut joiner = AnnotationJoiner::new(source());
        let mut sink = VecDiagnostics::default();
        let mut out = Vec::new();
        let mut input = b"chr1\t200\t300\n".to_vec();
        input.extend_from_slice(b"chr\xff\t1\t50\n");
        input.extend_from_slice(b"chr1\t110\t125\n");
        let written = joiner
            .annotate_stream(Cursor::new(input), &mut out, "regions.bed", &mut sink)
            .unwrap();
        assert_eq!(written, 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "chr1\t200\t300\t[]");
        assert!(lines[1].starts_with("chr1\t110\t125\t[{"));
        assert_eq!(sink.malformed_count(), 1);
        assert!(sink.messages[0].starts_with("regions.bed line 2:"));
    }

    /// Writes `lines` as a bgzipped BED file next to its tabix index.
    fn tabix_fixture(dir: &Path, lines: &[&str]) -> PathBuf {
        let path = dir.join("annotations.bed.gz");
        {
            let mut writer = bgzf::Writer::from_path(&path).unwrap();
            for line in lines {
                writeln!(writer, "{}", line).unwrap();
            }
        }
        let c_path = CString::new(path.to_str().unwrap()).unwrap();
        let ret = unsafe { htslib::tbx_index_build(c_path.as_ptr(), 0, &htslib::tbx_conf_bed) };
        assert_eq!(ret, 0, "failed to index {}", path.display());
        path
    }

    #[test]
    fn test_tabix_source_joins_in_file_order() {
        let dir = TempDir::new().unwrap();
        let path = tabix_fixture(
            dir.path(),
            &[
                "chr1\t100\t130\t2\t15.0\t60\t1.0\tAT",
                "chr1\t120\t160\t3\t13.3\t80\t1.58\tAAT",
                "chr1\t500\t600\t1\t100\t200\t0\tA",
                "chr2\t10\t40\t2\t5\t20\t1\tGC",
            ],
        );
        let mut joiner = AnnotationJoiner::new(TabixAnnotationSource::from_path(&path).unwrap());
        let mut sink = VecDiagnostics::default();
        let mut out = Vec::new();
        let input = "chr1\t110\t150\nchr1\t200\t300\nchr3\t0\t10\nchr2\t0\t15\n";
        let written = joiner
            .annotate_stream(Cursor::new(input), &mut out, "regions.bed", &mut sink)
            .unwrap();
        assert_eq!(written, 4);

        let text = String::from_utf8(out).unwrap();
        let rows: Vec<(String, Vec<AnnotationRecord>)> = text
            .lines()
            .map(|line| {
                let (region, json) = line.rsplit_once('\t').unwrap();
                (region.to_string(), serde_json::from_str(json).unwrap())
            })
            .collect();
        assert_eq!(rows[0].0, "chr1\t110\t150");
        let repeats: Vec<&str> = rows[0].1.iter().map(|r| r.repeat.as_str()).collect();
        assert_eq!(repeats, vec!["AT", "AAT"]);
        assert_eq!(rows[0].1[1].entropy, 1.58);
        assert!(rows[1].1.is_empty());
        assert!(rows[2].1.is_empty());
        assert_eq!(rows[3].1.len(), 1);
        assert_eq!(rows[3].1[0].repeat, "GC");

        assert_eq!(sink.malformed_count(), 1);
        assert!(sink.messages[0]
            .starts_with("regions.bed line 3: Annotation query for chr3:0-10"));
    }

    #[test]
    fn test_tabix_source_missing_index_err() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.bed.gz");
        std::fs::write(&path, "chr1\t1\t2\n").unwrap();
        assert!(matches!(
            TabixAnnotationSource::from_path(&path),
            Err(Error::InvalidInput(_))
        ));
    }
}
