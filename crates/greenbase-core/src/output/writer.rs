//! `key=value` output records for GitHub Actions step outputs

use crate::error::Result;
use std::io::Write;
use std::path::Path;

/// Heredoc delimiter for values spanning several lines
const MULTILINE_DELIMITER: &str = "GREENBASE_EOF";

/// Destination for resolved outputs
pub trait ResultSink {
    /// Append one `key=value` record. The value is written verbatim.
    fn emit(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Sink writing GitHub Actions output records to any writer
pub struct OutputWriter<W: Write> {
    inner: W,
}

impl<W: Write> OutputWriter<W> {
    /// Wrap a writer
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Unwrap the writer
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl OutputWriter<std::fs::File> {
    /// Open the `$GITHUB_OUTPUT` file in append mode, creating it if missing
    pub fn append_to(path: &Path) -> Result<Self> {
        let file = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write> ResultSink for OutputWriter<W> {
    fn emit(&mut self, key: &str, value: &str) -> Result<()> {
        if value.contains('\n') || value.contains('\r') {
            writeln!(self.inner, "{key}<<{MULTILINE_DELIMITER}")?;
            writeln!(self.inner, "{value}")?;
            writeln!(self.inner, "{MULTILINE_DELIMITER}")?;
        } else {
            writeln!(self.inner, "{key}={value}")?;
        }
        self.inner.flush()?;
        Ok(())
    }
}
