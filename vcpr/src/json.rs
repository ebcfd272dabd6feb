use std::fmt::{self, Display};

use serde::Serialize;
use vcpp::api::Outcome;
use vcpp::Consume;

use crate::ConsumeDisplay;

#[derive(Serialize)]
struct FileRecord {
    path: String,
    #[serde(flatten)]
    outcome: Outcome,
}

#[derive(Serialize)]
struct Output<'a> {
    dry_run: bool,
    files: &'a [FileRecord],
    unreadable: &'a [String],
}

/// Machine-readable consumer: collects everything except unchanged files and
/// prints one JSON document after the scan
pub struct Json {
    dry_run: bool,
    files: Vec<FileRecord>,
    unreadable: Vec<String>,
}

impl Json {
    #[must_use]
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            files: vec![],
            unreadable: vec![],
        }
    }

    pub fn new_box(dry_run: bool) -> Box<dyn ConsumeDisplay> {
        Box::new(Self::new(dry_run))
    }
}

impl Consume for Json {
    fn ok(&mut self, path: &str, outcome: &Outcome) {
        if matches!(outcome, Outcome::Unchanged) {
            return;
        }
        self.files.push(FileRecord {
            path: path.to_owned(),
            outcome: outcome.clone(),
        });
    }

    fn err(&mut self, path: &str) {
        self.unreadable.push(path.to_owned());
    }
}

impl Display for Json {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let output = Output {
            dry_run: self.dry_run,
            files: &self.files,
            unreadable: &self.unreadable,
        };
        let s = serde_json::to_string_pretty(&output).map_err(|_| fmt::Error)?;
        writeln!(f, "{s}")
    }
}
