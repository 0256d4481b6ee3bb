use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// How pawncc classifies a diagnostic, derived from its number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Error,
    Fatal,
    Warning,
}

impl Severity {
    /// 0 is informational, 1-99 errors, 100-199 fatal errors, 200+ warnings.
    pub fn from_number(number: i32) -> Self {
        match number {
            1..=99 => Severity::Error,
            100..=199 => Severity::Fatal,
            n if n >= 200 => Severity::Warning,
            _ => Severity::Info,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Error => "Error",
            Severity::Fatal => "Fatal Error",
            Severity::Warning => "Warning",
        }
    }
}

/// A structured error report delivered through the compiler's error callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub number: i32,
    pub file: String,
    /// -1 when the report covers a single line.
    pub first_line: i32,
    pub last_line: i32,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        number: i32,
        file: impl Into<String>,
        first_line: i32,
        last_line: i32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            number,
            file: file.into(),
            first_line,
            last_line,
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::from_number(self.number)
    }

    pub fn is_warning(&self) -> bool {
        self.severity() == Severity::Warning
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    pub fn line_info(&self) -> String {
        if self.first_line >= 0 {
            format!("({}-{})", self.first_line, self.last_line)
        } else if self.last_line >= 0 {
            format!("({})", self.last_line)
        } else {
            String::new()
        }
    }

    /// File name without its directories.
    pub fn file_name(&self) -> &str {
        Path::new(&self.file)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.file)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:03}: {}{}: {}",
            self.severity().label(),
            self.number,
            self.file_name(),
            self.line_info(),
            self.message.trim_end()
        )
    }
}

/// Outcome of one compiler run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileResult {
    /// Raw return code of `pc_compile`.
    pub status: i32,
    pub success: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileResult {
    pub fn new(status: i32, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            status,
            success: status == 0,
            diagnostics,
        }
    }

    /// Errors and fatal errors.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.is_error() || d.is_fatal())
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_warning()).count()
    }
}
