use std::fmt;

#[cfg(feature = "colorized_output")]
use console::style;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// The input cannot be used as is
    Fatal,
    /// The input is usable but suspicious
    Warning,
    /// Informational note
    Info,
}

impl Severity {
    fn label(&self) -> &'static str {
        match self {
            Severity::Fatal => "FATAL",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Severity::Fatal => "✗",
            Severity::Warning => "⚠",
            Severity::Info => "ℹ",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single finding of the validator
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// How serious the finding is
    pub severity: Severity,
    /// Four-digit rule code
    pub code: &'static str,
    /// Human-readable description
    pub message: String,
    /// File, and where useful the record, the finding is about
    pub location: String,
}

impl Diagnostic {
    pub(crate) fn fatal(
        code: &'static str,
        message: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Fatal, code, message, location)
    }

    pub(crate) fn warning(
        code: &'static str,
        message: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Warning, code, message, location)
    }

    pub(crate) fn info(
        code: &'static str,
        message: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Info, code, message, location)
    }

    fn new(
        severity: Severity,
        code: &'static str,
        message: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            location: location.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.severity, self.code, self.message)?;
        if !self.location.is_empty() {
            write!(f, " ({})", self.location)?;
        }
        Ok(())
    }
}

/// Diagnostics collected while validating one directory or document
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    /// Findings in the order they were made
    pub diagnostics: Vec<Diagnostic>,
    /// Path of the directory or document that was validated
    pub target: String,
}

impl ValidationReport {
    /// Create an empty report for the given target
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            diagnostics: Vec::new(),
            target: target.into(),
        }
    }

    /// Record a diagnostic
    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Diagnostics of the given severity
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.severity == severity)
    }

    /// Diagnostics carrying the given rule code
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.code == code)
    }

    /// True when some diagnostic carries the given rule code
    pub fn has_code(&self, code: &str) -> bool {
        self.with_code(code).next().is_some()
    }

    /// Check if any diagnostic is fatal
    pub fn has_fatal(&self) -> bool {
        self.fatal_count() > 0
    }

    /// Check if any diagnostic is a warning
    pub fn has_warnings(&self) -> bool {
        self.warning_count() > 0
    }

    /// Count the fatal diagnostics
    pub fn fatal_count(&self) -> usize {
        self.with_severity(Severity::Fatal).count()
    }

    /// Count the warnings
    pub fn warning_count(&self) -> usize {
        self.with_severity(Severity::Warning).count()
    }

    /// Count the informational notes
    pub fn info_count(&self) -> usize {
        self.with_severity(Severity::Info).count()
    }

    /// Format the report with colors (requires console feature)
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            use console::Emoji;

            static INFO: Emoji<'_, '_> = Emoji("ℹ", "[INFO]");
            static WARN: Emoji<'_, '_> = Emoji("⚠", "[WARN]");
            static FAIL: Emoji<'_, '_> = Emoji("✗", "[FAIL]");

            let mut output = String::new();

            output.push_str(&format!("{}\n", style("ISA Validation Report").bold().cyan()));
            output.push_str(&format!("{}\n", style("=====================").cyan()));
            output.push_str(&format!("{}: {}\n\n", style("Path").bold(), self.target));

            for diagnostic in &self.diagnostics {
                let (symbol, label) = match diagnostic.severity {
                    Severity::Fatal => (FAIL, style(diagnostic.severity.label()).red().bold()),
                    Severity::Warning => (WARN, style(diagnostic.severity.label()).yellow().bold()),
                    Severity::Info => (INFO, style(diagnostic.severity.label()).blue().bold()),
                };
                output.push_str(&format!(
                    "[{}] {} {} - {}: {}\n",
                    symbol,
                    style(diagnostic.code).bold(),
                    diagnostic.location,
                    label,
                    diagnostic.message
                ));
            }

            output.push('\n');
            output.push_str(&format!(
                "{}: {} fatal, {} warnings, {} info\n",
                style("Summary").bold(),
                style(self.fatal_count()).red(),
                style(self.warning_count()).yellow(),
                style(self.info_count()).blue()
            ));

            output.push('\n');
            if self.has_fatal() {
                output.push_str(&format!("{}\n", style("Validation FAILED").red().bold()));
            } else if self.has_warnings() {
                output.push_str(&format!(
                    "{}\n",
                    style("Validation PASSED with warnings").yellow().bold()
                ));
            } else {
                output.push_str(&format!("{}\n", style("Validation PASSED").green().bold()));
            }

            output
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            format!("{}", self)
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ISA Validation Report")?;
        writeln!(f, "=====================")?;
        writeln!(f, "Path: {}", self.target)?;
        writeln!(f)?;

        for diagnostic in &self.diagnostics {
            writeln!(
                f,
                "[{}] {} {} - {}: {}",
                diagnostic.severity.symbol(),
                diagnostic.code,
                diagnostic.location,
                diagnostic.severity.label(),
                diagnostic.message
            )?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "Summary: {} fatal, {} warnings, {} info",
            self.fatal_count(),
            self.warning_count(),
            self.info_count()
        )?;

        writeln!(f)?;
        if self.has_fatal() {
            writeln!(f, "Validation FAILED")?;
        } else if self.has_warnings() {
            writeln!(f, "Validation PASSED with warnings")?;
        } else {
            writeln!(f, "Validation PASSED")?;
        }

        Ok(())
    }
}
