use std::fmt;

// ---------------------------------------------------------------------------
// Diagnostic – a recoverable condition surfaced next to an artifact
// ---------------------------------------------------------------------------

/// Non-fatal conditions met while building or querying the dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Optional columns absent; processing continues without them.
    SchemaWarning { table: String, missing: Vec<String> },
    /// Rows dropped because their key had no partner in the other table.
    JoinMismatch { table: String, dropped: usize, keys: Vec<String> },
    /// Repeated (Driver, Race) keys; only the first occurrence is kept.
    DuplicateKey { table: String, dropped: usize },
    /// Rows dropped because a required value was missing or unparseable.
    InvalidRow { table: String, dropped: usize, reason: String },
    /// Telemetry could not be used; the telemetry table is empty.
    TelemetryUnavailable { reason: String },
    /// A filter selection matched no rows of the named table.
    EmptyFilterResult { table: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::SchemaWarning { table, missing } => write!(
                f,
                "Missing columns in {table}: {}. Continuing with available columns.",
                missing.join(", ")
            ),
            Diagnostic::JoinMismatch { table, dropped, keys } => {
                write!(f, "{dropped} row(s) in {table} had no match and were dropped")?;
                if !keys.is_empty() {
                    write!(f, " ({})", keys.join("; "))?;
                }
                Ok(())
            }
            Diagnostic::DuplicateKey { table, dropped } => write!(
                f,
                "{dropped} duplicate (Driver, Race) row(s) in {table} were ignored"
            ),
            Diagnostic::InvalidRow {
                table,
                dropped,
                reason,
            } => write!(f, "{dropped} row(s) in {table} were dropped: {reason}"),
            Diagnostic::TelemetryUnavailable { reason } => write!(
                f,
                "Telemetry unavailable ({reason}). Telemetry visualization is disabled."
            ),
            Diagnostic::EmptyFilterResult { table } => {
                write!(f, "No {table} rows match the selected filters")
            }
        }
    }
}

impl Diagnostic {
    /// Log the diagnostic through the `log` facade and hand it back.
    pub fn logged(self) -> Self {
        log::warn!("{self}");
        self
    }
}

// ---------------------------------------------------------------------------
// Checked<T> – value plus the diagnostics produced while computing it
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Checked<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Checked<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            diagnostics: Vec::new(),
        }
    }

    pub fn with(value: T, diagnostics: Vec<Diagnostic>) -> Self {
        Self { value, diagnostics }
    }

    /// Move the diagnostics into `sink` and return the bare value.
    pub fn drain_into(self, sink: &mut Vec<Diagnostic>) -> T {
        sink.extend(self.diagnostics);
        self.value
    }
}
