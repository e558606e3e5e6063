use std::fmt;

use serde::Serialize;

use crate::ExitCode;

/// What happened to one node once a run is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "code", rename_all = "snake_case")]
pub enum Outcome {
    Ran(ExitCode),
    /// Its gate was closed.
    Skipped,
    /// The run stopped before reaching it.
    NotRun,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Ran(_) => "ran",
            Outcome::Skipped => "skipped",
            Outcome::NotRun => "not_run",
        }
    }

    pub fn code(self) -> Option<ExitCode> {
        match self {
            Outcome::Ran(code) => Some(code),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ran(code) => write!(f, "ran({code})"),
            other => f.write_str(other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        assert_eq!(Outcome::Ran(3).code(), Some(3));
        assert_eq!(Outcome::Skipped.code(), None);
    }

    #[test]
    fn display() {
        assert_eq!(Outcome::Ran(2).to_string(), "ran(2)");
        assert_eq!(Outcome::Skipped.to_string(), "skipped");
        assert_eq!(Outcome::NotRun.to_string(), "not_run");
    }

    #[test]
    fn serializes_tagged() {
        let json = serde_json::to_string(&Outcome::Ran(1)).unwrap();
        assert_eq!(json, r#"{"state":"ran","code":1}"#);
        let json = serde_json::to_string(&Outcome::Skipped).unwrap();
        assert_eq!(json, r#"{"state":"skipped"}"#);
    }
}
