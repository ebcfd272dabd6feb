use std::fmt;
use std::fmt::Display;

use crossterm::style::Stylize;
use itertools::Itertools;
use num_format::{Locale, ToFormattedString};
use prettytable::Table;
use vcpp::api::Outcome;
use vcpp::Consume;

use crate::error::Collector;
use crate::ux;
use crate::ConsumeDisplay;

/// Console consumer: prints every changed path as it is found and a summary
/// of the whole scan at the end
pub struct Report {
    dry_run: bool,
    scanned: usize,
    changed: Vec<String>,
    skipped: Vec<(String, String)>,
    failed: Vec<(String, String)>,
    errors: Collector,
}

impl Report {
    #[must_use]
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            scanned: 0,
            changed: vec![],
            skipped: vec![],
            failed: vec![],
            errors: Collector::new(),
        }
    }

    pub fn new_box(dry_run: bool) -> Box<dyn ConsumeDisplay> {
        Box::new(Self::new(dry_run))
    }

    #[must_use]
    pub fn changed(&self) -> usize {
        self.changed.len()
    }
}

impl Consume for Report {
    fn ok(&mut self, path: &str, outcome: &Outcome) {
        self.scanned += 1;
        match outcome {
            Outcome::Changed => {
                ux::print_project_path(path);
                self.changed.push(path.to_owned());
            }
            Outcome::Unchanged => {}
            o if o.is_skip() => self.skipped.push((path.to_owned(), o.reason())),
            o => self.failed.push((path.to_owned(), o.reason())),
        }
    }

    fn err(&mut self, path: &str) {
        eprintln!("Error reading {} project", path.red());
        self.errors.add_path(path);
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", " Totals:".dark_red().bold())?;
        writeln!(f)?;

        let changed_head = if self.dry_run {
            "Files that would change"
        } else {
            "Files changed"
        };
        let unchanged =
            self.scanned - self.changed.len() - self.skipped.len() - self.failed.len();

        let mut table = Table::new();
        let fmt = ux::new_format();
        table.set_format(fmt);
        table.add_row(row![
            "Files scanned",
            i->self.scanned.to_formatted_string(&Locale::en),
        ]);
        table.add_row(row![
            changed_head,
            i->self.changed.len().to_formatted_string(&Locale::en),
        ]);
        table.add_row(row![
            "Files unchanged",
            i->unchanged.to_formatted_string(&Locale::en),
        ]);
        table.add_row(row![
            "Files skipped",
            i->self.skipped.len().to_formatted_string(&Locale::en),
        ]);
        table.add_row(row![
            "Files failed",
            i->self.failed.len().to_formatted_string(&Locale::en),
        ]);
        writeln!(f, "{table}")?;

        if !self.skipped.is_empty() {
            writeln!(f, "{}", " Skipped:".dark_yellow().bold())?;
            let rows = self
                .skipped
                .iter()
                .sorted()
                .map(|(p, r)| (p.as_str(), r.as_str()));
            let table = ux::two_column_table(("Path", "Reason"), rows);
            writeln!(f, "{table}")?;
        }

        if !self.failed.is_empty() {
            writeln!(f, "{}", " Failed:".dark_red().bold())?;
            let rows = self
                .failed
                .iter()
                .sorted()
                .map(|(p, r)| (p.as_str(), r.as_str()));
            let table = ux::two_column_table(("Path", "Reason"), rows);
            writeln!(f, "{table}")?;
        }

        write!(f, "{}", self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Outcome::Changed, 1, 0, 0; "changed is collected")]
    #[test_case(Outcome::Unchanged, 0, 0, 0; "unchanged is only counted")]
    #[test_case(Outcome::NoConfiguration, 0, 1, 0; "missing configuration is a skip")]
    #[test_case(Outcome::Malformed { detail: String::from("x") }, 0, 1, 0; "malformed is a skip")]
    #[test_case(Outcome::RulesUnavailable { detail: String::from("x") }, 0, 1, 0; "no rules is a skip")]
    #[test_case(Outcome::CheckoutFailed, 0, 0, 1; "checkout failure is a failure")]
    #[test_case(Outcome::WriteFailed { detail: String::from("x") }, 0, 0, 1; "write failure is a failure")]
    fn outcome_buckets(outcome: Outcome, changed: usize, skipped: usize, failed: usize) {
        // Arrange
        let mut report = Report::new(false);

        // Act
        report.ok("engine.vcproj", &outcome);

        // Assert
        assert_eq!(report.scanned, 1);
        assert_eq!(report.changed(), changed);
        assert_eq!(report.skipped.len(), skipped);
        assert_eq!(report.failed.len(), failed);
    }

    #[test_case(false, "Files changed"; "write mode")]
    #[test_case(true, "Files that would change"; "dry run mode")]
    fn summary_labels(dry_run: bool, expected: &str) {
        // Arrange
        let mut report = Report::new(dry_run);
        report.ok("engine.vcproj", &Outcome::Changed);

        // Act
        let output = format!("{report}");

        // Assert
        assert!(output.contains(expected));
    }

    #[test]
    fn skipped_files_are_listed_with_reasons() {
        // Arrange
        let mut report = Report::new(false);
        report.ok("b.vcproj", &Outcome::NoConfiguration);
        report.ok(
            "a.vcproj",
            &Outcome::Malformed {
                detail: String::from("unclosed block"),
            },
        );

        // Act
        let output = format!("{report}");

        // Assert
        assert!(output.contains("no recognizable configuration"));
        assert!(output.contains("unclosed block"));
        let a = output.find("a.vcproj").unwrap();
        let b = output.find("b.vcproj").unwrap();
        assert!(a < b);
    }

    #[test]
    fn unreadable_files_come_from_the_collector() {
        // Arrange
        let mut report = Report::new(false);
        report.err("broken.vcproj");

        // Act
        let output = format!("{report}");

        // Assert
        assert_eq!(report.errors.count(), 1);
        assert!(output.contains("broken.vcproj"));
    }
}
