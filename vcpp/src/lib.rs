/*!
A library for scanning and patching legacy Visual C++ project files (vcproj)

Project files are a tag-attribute text format that is not reliably well
formed XML, so the library scans them with a small hand-written lexer and
represents configuration blocks and tool sections as tagged spans over the
original text. Edits are pure `text -> text` functions and every edit is
idempotent; the driver re-derives all spans from the current text after each
splice instead of bookkeeping shifted offsets.

## Example: patching content in memory

```
use vcpp::rules;
use vcpp::rewrite_str;

const PROJECT: &str = r#"<?xml version="1.0" encoding="Windows-1252"?>
<VisualStudioProject
	Name="engine"
	>
	<Configurations>
		<Configuration
			Name="Debug|Win32"
			>
			<Tool
				Name="VCCLCompilerTool"
				AdditionalIncludeDirectories="..\VS.NET\Include"
			/>
		</Configuration>
	</Configurations>
</VisualStudioProject>
"#;

let table = rules::boost("../Boost");
let result = rewrite_str(PROJECT, &table);
assert!(result.is_ok());
let rewritten = result.unwrap();
assert_eq!(rewritten.blocks, 1);
assert!(rewritten.text.contains(r"..\VS.NET\Include;..\VS.NET\Boost"));
```
*/

#![warn(unused_extern_crates)]
#![allow(clippy::missing_errors_doc)]

use std::fs;
use std::path::Path;

use itertools::Itertools;
use jwalk::{Parallelism, WalkDir};
use miette::{IntoDiagnostic, Result, WrapErr};

use api::{ConfigContext, Outcome};
use rules::{RuleSource, RuleTable};
use vcs::Vcs;

pub mod api;
pub mod edit;
pub mod lex;
pub mod rules;
pub mod sandbox;
pub mod scan;
pub mod vcs;
pub mod vctool;

/// A sentinel subtree that must never be treated as source
const EXCLUSION_MARKER: &str = "wsfiles";

/// Consume provides the per-file rewrite result consumer
pub trait Consume {
    /// Called with the outcome of every processed project file
    fn ok(&mut self, path: &str, outcome: &Outcome);
    /// Called when a project file cannot be read at all
    fn err(&mut self, path: &str);
}

/// Result of rewriting project content in memory
#[derive(Debug, Clone)]
pub struct Rewritten {
    pub text: String,
    /// Number of recognized configuration blocks; zero means the content is
    /// not an applicable project file
    pub blocks: usize,
}

/// `rewrite_str` applies the rule table to project content and returns the
/// patched text together with the number of configuration blocks seen.
///
/// Blocks are processed in document order. Because every splice shifts the
/// offsets of everything after it, all views are re-derived from the current
/// text before each tool's edits rather than cached across them.
///
/// # Errors
///
/// This function will return an error if the content is malformed: a
/// configuration opener without a matching closer or markup breaking off
/// mid-token. No partial result is produced in that case.
pub fn rewrite_str(contents: &str, table: &RuleTable) -> Result<Rewritten> {
    let blocks = scan::find_configuration_blocks(contents)?.len();
    let mut text = contents.to_owned();
    for index in 0..blocks {
        for tool in table.tool_names().unique() {
            let current = scan::find_configuration_blocks(&text)?;
            let Some(block) = current.get(index) else {
                break;
            };
            let ctx = ConfigContext {
                platform: block.platform,
                build_type: block.build_type,
            };
            let edits = table.edits_for(tool, &ctx);
            if edits.is_empty() {
                continue;
            }
            let Some(section) = scan::find_tool_section(&text, block, tool) else {
                continue;
            };
            let mut patched = text[section.span.clone()].to_owned();
            for e in &edits {
                patched = edit::apply(&patched, e).into_owned();
            }
            if patched != text[section.span.clone()] {
                tracing::debug!(
                    "patched {} section of {} {}",
                    vctool::describe_tool(tool),
                    ctx.build_type,
                    ctx.platform
                );
                let mut next = String::with_capacity(text.len() + patched.len());
                next.push_str(&text[..section.span.start]);
                next.push_str(&patched);
                next.push_str(&text[section.span.end..]);
                text = next;
            }
        }
    }
    Ok(Rewritten { text, blocks })
}

/// `rewrite_file` runs the whole pipeline for a single project file: derive
/// the rule table, patch the content in memory and persist the result when
/// it differs from the input. Unmodified files are never touched. On a dry
/// run the checkout and write steps are skipped and a change is only
/// reported.
///
/// # Errors
///
/// This function will return an error if file content cannot be read into
/// memory. Every other condition is reported to the consumer as a per-file
/// [`Outcome`] and does not abort the caller's directory walk.
pub fn rewrite_file(
    path: &str,
    source: &dyn RuleSource,
    vcs: &dyn Vcs,
    dry_run: bool,
    consumer: &mut dyn Consume,
) -> Result<Outcome> {
    let contents = fs::read_to_string(path).into_diagnostic().wrap_err_with(|| {
        consumer.err(path);
        format!("Failed to read content from path: {path}")
    })?;

    let table = match source.rules_for(Path::new(path)) {
        Ok(table) => table,
        Err(e) => {
            tracing::warn!("no rules for {path}: {e}");
            let outcome = Outcome::RulesUnavailable {
                detail: e.to_string(),
            };
            consumer.ok(path, &outcome);
            return Ok(outcome);
        }
    };

    let outcome = match rewrite_str(&contents, &table) {
        Err(e) => {
            tracing::warn!("skipping malformed {path}: {e}");
            Outcome::Malformed {
                detail: e.to_string(),
            }
        }
        Ok(rewritten) if rewritten.blocks == 0 => {
            tracing::info!("no recognizable configuration in {path}");
            Outcome::NoConfiguration
        }
        Ok(rewritten) if rewritten.text == contents => Outcome::Unchanged,
        Ok(_) if dry_run => Outcome::Changed,
        Ok(rewritten) => {
            if vcs.open_for_edit(Path::new(path)) {
                match fs::write(path, &rewritten.text) {
                    Ok(()) => Outcome::Changed,
                    Err(e) => {
                        tracing::error!("failed to write {path}: {e}");
                        Outcome::WriteFailed {
                            detail: e.to_string(),
                        }
                    }
                }
            } else {
                tracing::error!("unable to open {path} for edit");
                Outcome::CheckoutFailed
            }
        }
    };
    consumer.ok(path, &outcome);
    Ok(outcome)
}

/// `rewrite_dir` processes only the directory specified by path.
/// It finds all files with the extension specified and rewrites them.
/// Returns the number of processed project files.
///
/// ## Remarks
/// Per-file conditions are reported through the [`Consume`] trait and never
/// stop the scan.
pub fn rewrite_dir(
    path: &str,
    extension: &str,
    source: &dyn RuleSource,
    vcs: &dyn Vcs,
    dry_run: bool,
    consumer: &mut dyn Consume,
) -> usize {
    let iter = create_dir_iterator(path).max_depth(1);
    rewrite_many(iter, extension, source, vcs, dry_run, consumer)
}

/// `rewrite_dir_tree` processes the directory specified by path recursively.
/// It finds all files with the extension specified and rewrites them.
/// Returns the number of processed project files.
///
/// ## Remarks
/// Per-file conditions are reported through the [`Consume`] trait and never
/// stop the scan.
pub fn rewrite_dir_tree(
    path: &str,
    extension: &str,
    source: &dyn RuleSource,
    vcs: &dyn Vcs,
    dry_run: bool,
    consumer: &mut dyn Consume,
) -> usize {
    let parallelism = Parallelism::RayonNewPool(num_cpus::get_physical());
    let iter = create_dir_iterator(path).parallelism(parallelism);
    rewrite_many(iter, extension, source, vcs, dry_run, consumer)
}

fn create_dir_iterator(path: &str) -> WalkDir {
    let root = decorate_path(path);
    WalkDir::new(root)
        .skip_hidden(false)
        .follow_links(false)
        .process_read_dir(|_, _, _, children| {
            // walking order is not contractual but must be deterministic
            children.sort_by(|a, b| match (a, b) {
                (Ok(a), Ok(b)) => a
                    .file_name
                    .to_ascii_lowercase()
                    .cmp(&b.file_name.to_ascii_lowercase()),
                (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                (Err(_), Err(_)) => std::cmp::Ordering::Equal,
            });
        })
}

fn rewrite_many(
    iter: WalkDir,
    extension: &str,
    source: &dyn RuleSource,
    vcs: &dyn Vcs,
    dry_run: bool,
    consumer: &mut dyn Consume,
) -> usize {
    let ext = extension.trim_start_matches('.');
    iter.into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|f| f.file_type().is_file())
        .map(|f| f.path())
        .filter(|p| is_project_file(p, ext))
        .filter_map(|p| p.to_str().map(std::string::ToString::to_string))
        .filter_map(|fp| rewrite_file(&fp, source, vcs, dry_run, consumer).ok())
        .count()
}

/// Shows whether the path names a project file: extension match is
/// case-insensitive and anything under a `wsfiles` subtree is excluded
#[must_use]
pub fn is_project_file(path: &Path, extension: &str) -> bool {
    let excluded = path
        .to_str()
        .is_some_and(|s| s.to_ascii_lowercase().contains(EXCLUSION_MARKER));
    !excluded
        && path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

/// On Windows trailing back slash (\) to be added if volume and colon passed (like c:).
/// It needed paths look to be more pleasant
#[cfg(target_os = "windows")]
fn decorate_path(path: &str) -> String {
    if path.len() == 2 && path.ends_with(':') {
        format!("{path}\\")
    } else {
        path.to_owned()
    }
}

/// On Unix just passthrough as is
#[cfg(not(target_os = "windows"))]
fn decorate_path(path: &str) -> String {
    path.to_owned()
}
