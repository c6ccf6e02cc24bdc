use crate::utils::{math, numbered_lines, Diagnostics, Interval, Result};
use std::fmt;
use std::io::{BufRead, Write};

/// Descriptive statistics of interval spans. Values that are undefined for
/// the input (everything but `count` and `tot_len` on empty input, `std`
/// below two spans) are `None` and left out of the report.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanStats {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<i64>,
    pub q25: Option<f64>,
    pub q50: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<i64>,
    pub tot_len: i64,
}

fn saturating_total(spans: &[i64]) -> i64 {
    let total: i128 = spans.iter().map(|&span| i128::from(span)).sum();
    total.clamp(i64::MIN.into(), i64::MAX.into()) as i64
}

impl SpanStats {
    pub fn from_spans(mut spans: Vec<i64>) -> Self {
        spans.sort_unstable();
        Self {
            count: spans.len(),
            mean: math::mean(&spans),
            std: math::sample_std(&spans),
            min: spans.first().copied(),
            q25: math::quantile_sorted(&spans, 0.25),
            q50: math::quantile_sorted(&spans, 0.5),
            q75: math::quantile_sorted(&spans, 0.75),
            max: spans.last().copied(),
            tot_len: saturating_total(&spans),
        }
    }

    /// Report rows, each value truncated toward zero.
    pub fn rows(&self) -> Vec<(&'static str, i64)> {
        let rows = [
            ("count", Some(self.count as f64)),
            ("mean", self.mean),
            ("std", self.std),
            ("min", self.min.map(|v| v as f64)),
            ("25%", self.q25),
            ("50%", self.q50),
            ("75%", self.q75),
            ("max", self.max.map(|v| v as f64)),
            ("tot_len", Some(self.tot_len as f64)),
        ];
        rows.into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v.trunc() as i64)))
            .collect()
    }
}

impl fmt::Display for SpanStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.rows();
        let name_width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
        let value_width = rows
            .iter()
            .map(|(_, value)| value.to_string().len())
            .max()
            .unwrap_or(0);
        for (name, value) in rows {
            writeln!(
                f,
                "{:<name_width$}    {:>value_width$}",
                name,
                value,
                name_width = name_width,
                value_width = value_width
            )?;
        }
        Ok(())
    }
}

/// Collects spans from a BED stream. Malformed lines, and lines whose span
/// would overflow the total length, go to `diagnostics`.
pub fn read_spans<R: BufRead>(
    reader: R,
    source: &str,
    diagnostics: &mut dyn Diagnostics,
) -> Result<Vec<i64>> {
    let mut spans = Vec::new();
    let mut total: i64 = 0;
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
        let span = match Interval::from_bed_line(&line) {
            Ok(interval) => interval.span(),
            Err(e) => {
                diagnostics.malformed(source, line_number, &e.to_string());
                continue;
            }
        };
        match total.checked_add(span) {
            Some(sum) => {
                total = sum;
                spans.push(span);
            }
            None => diagnostics.malformed(
                source,
                line_number,
                &format!("Span {} overflows the total length", span),
            ),
        }
    }
    Ok(spans)
}

pub fn summarize<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
    source: &str,
    diagnostics: &mut dyn Diagnostics,
) -> Result<SpanStats> {
    let stats = SpanStats::from_spans(read_spans(reader, source, diagnostics)?);
    if stats.count == 0 {
        log::warn!("{}: no intervals to summarize", source);
    }
    write!(writer, "{}", stats)?;
    writer.flush()?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::VecDiagnostics;
    use std::io::Cursor;

    #[test]
    fn test_basic_stats() {
        let stats = SpanStats::from_spans(vec![30, 10, 20]);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, Some(10));
        assert_eq!(stats.max, Some(30));
        assert_eq!(stats.tot_len, 60);
        assert_eq!(stats.mean, Some(20.0));
        assert_eq!(stats.std, Some(10.0));
        assert_eq!(stats.q25, Some(15.0));
    }

    #[test]
    fn test_report_format() {
        let stats = SpanStats::from_spans(vec![10, 20, 30]);
        let expected = "\
count       3
mean       20
std        10
min        10
25%        15
50%        20
75%        25
max        30
tot_len    60
";
        assert_eq!(stats.to_string(), expected);
    }

    #[test]
    fn test_values_are_truncated() {
        let stats = SpanStats::from_spans(vec![1, 2]);
        let rows = stats.rows();
        assert!(rows.contains(&("mean", 1)));
        assert!(rows.contains(&("50%", 1)));
        assert!(rows.contains(&("25%", 1)));
    }

    #[test]
    fn test_empty_input() {
        let stats = SpanStats::from_spans(Vec::new());
        assert_eq!(stats.rows(), vec![("count", 0), ("tot_len", 0)]);
    }

    #[test]
    fn test_single_span_has_no_std() {
        let stats = SpanStats::from_spans(vec![7]);
        let names: Vec<&str> = stats.rows().iter().map(|(n, _)| *n).collect();
        assert!(!names.contains(&"std"));
        assert!(names.contains(&"max"));
    }

    #[test]
    fn test_summarize_skips_invalid_utf8() {
        let mut input = b"chr1\t0\t10\n".to_vec();
        input.extend_from_slice(b"chr\xff\t1\t50\n");
        input.extend_from_slice(b"chr2\t0\t20\n");
        let mut out = Vec::new();
        let mut sink = VecDiagnostics::default();
        let stats = summarize(Cursor::new(input), &mut out, "in.bed", &mut sink).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.tot_len, 30);
        assert_eq!(sink.malformed_count(), 1);
        assert!(sink.messages[0].starts_with("in.bed line 2:"));
    }

    #[test]
    fn test_total_overflow_is_reported() {
        let input = format!("chr1\t0\t{0}\nchr1\t0\t{0}\nchr1\t0\t10\n", i64::MAX);
        let mut out = Vec::new();
        let mut sink = VecDiagnostics::default();
        let stats = summarize(Cursor::new(input), &mut out, "in.bed", &mut sink).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.tot_len, i64::MAX);
        assert_eq!(sink.malformed_count(), 2);
        assert!(sink.messages[0].starts_with("in.bed line 2:"));
        assert!(sink.messages[0].contains("overflows"));
    }

    #[test]
    fn test_saturating_total() {
        let stats = SpanStats::from_spans(vec![i64::MAX, i64::MAX]);
        assert_eq!(stats.tot_len, i64::MAX);
    }

    #[test]
    fn test_summarize_skips_malformed() {
        let input = "chr1\t0\t10\nbad line\nchr1\t5\tx\nchr2\t100\t120\tfoo\nchr3\t0\t30\n";
        let mut out = Vec::new();
        let mut sink = VecDiagnostics::default();
        let stats = summarize(Cursor::new(input), &mut out, "<stdin>", &mut sink).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.tot_len, 60);
        assert_eq!(sink.malformed_count(), 2);
        assert!(String::from_utf8(out).unwrap().ends_with("tot_len    60\n"));
    }
}
