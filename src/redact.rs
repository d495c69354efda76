//! Redaction of personally identifiable information in log messages.
//!
//! Log lines of the form `name=Bob;email=bob@example.com;ssn=...;` are rewritten so that the
//! values of sensitive fields are replaced, e.g. `name=***;email=***;ssn=***;`.

use crate::{Error, Result};
use chrono::Utc;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use regex::{Captures, Regex};
use std::io::Write;

/// Fields that are considered personally identifiable information.
pub const PII_FIELDS: [&str; 5] = ["name", "email", "phone", "ssn", "password"];

/// The string replacing redacted values, unless configured otherwise.
pub const DEFAULT_REDACTION: &str = "***";

/// The separator between `field=value` pairs, unless configured otherwise.
pub const DEFAULT_SEPARATOR: char = ';';

/// Replaces the values of selected fields in `field=value<separator>` sequences.
#[derive(Debug, Clone)]
pub struct Redactor {
    pattern: Regex,
    redaction: String,
    separator: char,
}

impl Redactor {
    /// Create a redactor for the given `fields`.
    ///
    /// Only values terminated by `separator` are redacted. Field names match as whole words,
    /// so `name` does not match `username`: list `username` itself if it should be redacted.
    pub fn new<Field: AsRef<str>>(
        fields: impl IntoIterator<Item = Field>,
        redaction: impl Into<String>,
        separator: char,
    ) -> Result<Self> {
        let fields = fields
            .into_iter()
            .map(|field| regex::escape(field.as_ref()))
            .collect::<Vec<_>>()
            .join("|");
        let separator_class = regex::escape(&separator.to_string());
        let expression = format!(r"\b(?P<field>{fields})=[^{separator_class}]*{separator_class}");
        let pattern = Regex::new(&expression).map_err(|source| Error::InvalidPattern {
            pattern: expression.clone(),
            source,
        })?;
        Ok(Self {
            pattern,
            redaction: redaction.into(),
            separator,
        })
    }

    /// A redactor for [`PII_FIELDS`] with the default redaction and separator.
    pub fn pii() -> Result<Self> {
        Self::new(PII_FIELDS, DEFAULT_REDACTION, DEFAULT_SEPARATOR)
    }

    /// Returns `message` with the values of all configured fields redacted.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use typed_auth::Redactor;
    /// # fn main() -> typed_auth::Result {
    /// let redactor = Redactor::new(["email", "password"], "xxx", ';')?;
    /// assert_eq!(
    ///     redactor.redact("name=egg;email=eggmin@eggsample.com;password=eggcellent;date_of_birth=12/12/1986;"),
    ///     "name=egg;email=xxx;password=xxx;date_of_birth=12/12/1986;",
    /// );
    /// # Ok(()) }
    /// ```
    pub fn redact(&self, message: &str) -> String {
        self.pattern
            .replace_all(message, |captures: &Captures<'_>| {
                format!("{}={}{}", &captures["field"], self.redaction, self.separator)
            })
            .into_owned()
    }
}

/// A [`log`] backend that writes redacted records to stderr.
///
/// Records are formatted as `[TARGET] LEVEL TIMESTAMP: message`.
#[derive(Debug)]
pub struct RedactingLogger {
    redactor: Redactor,
    level: LevelFilter,
}

impl RedactingLogger {
    /// Create a logger emitting records up to `level`.
    pub fn new(redactor: Redactor, level: LevelFilter) -> Self {
        Self { redactor, level }
    }

    /// Format and redact `record`.
    pub fn format(&self, record: &Record<'_>) -> String {
        let message = format!(
            "[{}] {} {}: {}",
            record.target(),
            record.level(),
            Utc::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            record.args()
        );
        self.redactor.redact(&message)
    }

    /// Install this logger as the global logger.
    pub fn init(self) -> std::result::Result<(), SetLoggerError> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(level);
        Ok(())
    }
}

impl Log for RedactingLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            let line = self.format(record);
            let _ = writeln!(std::io::stderr().lock(), "{line}");
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().lock().flush();
    }
}
