use serde::Serialize;

/// Which stage of the front end rejected the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Load,
    Grammar,
    Semantic,
}

/// A user-facing schema error with the position it was detected at.
///
/// Lines and columns are 1-based. Load errors carry line 0 because no
/// source text was available.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{file}:{line}:{column}: {message}")]
pub struct Diagnostic {
    pub phase: Phase,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        phase: Phase,
        file: &str,
        line: u32,
        column: u32,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            phase,
            file: file.to_owned(),
            line,
            column,
            message: message.into(),
        }
    }

    pub fn load(file: &str, message: impl Into<String>) -> Self {
        Diagnostic::new(Phase::Load, file, 0, 0, message)
    }

    pub fn grammar(file: &str, line: u32, column: u32, message: impl Into<String>) -> Self {
        Diagnostic::new(Phase::Grammar, file, line, column, message)
    }

    pub fn semantic(file: &str, line: u32, column: u32, message: impl Into<String>) -> Self {
        Diagnostic::new(Phase::Semantic, file, line, column, message)
    }

    /// JSON form used by `tablec --output json`. Every key is always present.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "column":  self.column,
            "file":    self.file,
            "line":    self.line,
            "message": self.message,
            "phase":   self.phase,
        })
    }
}
