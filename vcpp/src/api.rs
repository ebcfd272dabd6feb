use std::fmt::{self, Display};

use serde::Serialize;

/// Target platform of a configuration block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Win32,
    X64,
}

/// Build type of a configuration block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    Debug,
    Release,
}

impl Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Win32 => write!(f, "win32"),
            Platform::X64 => write!(f, "x64"),
        }
    }
}

impl Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildType::Debug => write!(f, "debug"),
            BuildType::Release => write!(f, "release"),
        }
    }
}

/// The `(platform, build type)` pair a configuration block belongs to.
/// Rule values may differ between contexts, so every block resolves the
/// rule table against its own context before any edit is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigContext {
    pub platform: Platform,
    pub build_type: BuildType,
}

/// Per-file result of a rewrite. Everything except a changed or unchanged
/// file is a recoverable condition: the file is reported and the directory
/// walk continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Content differed and the file was written (or would be, on a dry run)
    Changed,
    /// The rule table produced output identical to the input; nothing written
    Unchanged,
    /// The file matched the project extension but holds no recognizable
    /// configuration blocks
    NoConfiguration,
    /// A configuration opener has no matching closer or the markup breaks
    /// off mid-token; the file is left untouched
    Malformed { detail: String },
    /// The rule table could not be derived for this file, e.g. no sandbox
    /// marker above it
    RulesUnavailable { detail: String },
    /// The version control checkout before writing failed; changes discarded
    CheckoutFailed,
    /// Filesystem-level write error
    WriteFailed { detail: String },
}

impl Outcome {
    /// The file was left alone for a reason worth listing in the summary
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            Outcome::NoConfiguration | Outcome::Malformed { .. } | Outcome::RulesUnavailable { .. }
        )
    }

    /// A change was produced but could not be persisted
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::CheckoutFailed | Outcome::WriteFailed { .. })
    }

    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Outcome::Changed | Outcome::Unchanged => String::new(),
            Outcome::NoConfiguration => String::from("no recognizable configuration"),
            Outcome::Malformed { detail } => format!("malformed project file: {detail}"),
            Outcome::RulesUnavailable { detail } => detail.clone(),
            Outcome::CheckoutFailed => String::from("version control checkout failed"),
            Outcome::WriteFailed { detail } => format!("write failed: {detail}"),
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Changed => write!(f, "changed"),
            Outcome::Unchanged => write!(f, "unchanged"),
            Outcome::NoConfiguration => write!(f, "no configuration"),
            Outcome::Malformed { .. } => write!(f, "malformed"),
            Outcome::RulesUnavailable { .. } => write!(f, "rules unavailable"),
            Outcome::CheckoutFailed => write!(f, "checkout failed"),
            Outcome::WriteFailed { .. } => write!(f, "write failed"),
        }
    }
}
