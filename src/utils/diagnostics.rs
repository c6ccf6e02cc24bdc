/// Receives reports about records that were skipped because they could not
/// be parsed. Components take a sink instead of logging directly so that the
/// reports are observable in tests.
pub trait Diagnostics {
    fn malformed(&mut self, source: &str, line_number: usize, reason: &str);

    fn malformed_count(&self) -> usize;
}

/// Forwards reports to the `log` facade as warnings.
#[derive(Debug, Default)]
pub struct LogDiagnostics {
    count: usize,
}

impl LogDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs a one-line tally if anything was reported.
    pub fn summarize(&self, what: &str) {
        if self.count > 0 {
            log::warn!("{}: skipped {} malformed record(s)", what, self.count);
        }
    }
}

impl Diagnostics for LogDiagnostics {
    fn malformed(&mut self, source: &str, line_number: usize, reason: &str) {
        self.count += 1;
        log::warn!("{} line {}: {}", source, line_number, reason);
    }

    fn malformed_count(&self) -> usize {
        self.count
    }
}

/// Keeps every report in memory.
#[derive(Debug, Default)]
pub struct VecDiagnostics {
    pub messages: Vec<String>,
}

impl Diagnostics for VecDiagnostics {
    fn malformed(&mut self, source: &str, line_number: usize, reason: &str) {
        self.messages
            .push(format!("{} line {}: {}", source, line_number, reason));
    }

    fn malformed_count(&self) -> usize {
        self.messages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_diagnostics_collects_messages() {
        let mut sink = VecDiagnostics::default();
        sink.malformed("in.bed", 3, "bad coordinate");
        assert_eq!(sink.malformed_count(), 1);
        assert_eq!(sink.messages[0], "in.bed line 3: bad coordinate");
    }

    #[test]
    fn log_diagnostics_counts() {
        let mut sink = LogDiagnostics::new();
        sink.malformed("in.bed", 1, "x");
        sink.malformed("in.bed", 2, "y");
        assert_eq!(sink.malformed_count(), 2);
    }
}
