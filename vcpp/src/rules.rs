use std::path::Path;

use miette::Result;

use crate::api::{BuildType, ConfigContext};
use crate::edit::AttributeEdit;
use crate::sandbox;
use crate::vctool;

const INCLUDE_DIRECTORIES: &str = "AdditionalIncludeDirectories";
const LIBRARY_DIRECTORIES: &str = "AdditionalLibraryDirectories";
const EXCEPTION_HANDLING: &str = "ExceptionHandling";
const DISABLED_WARNINGS: &str = "DisableSpecificWarnings";

/// The set of warnings the codebase silences everywhere: constant
/// conditionals, unreachable code after asserts and switch fallthrough
const IGNORED_WARNINGS: &str = "4127;4702;4063";

/// Asynchronous structured exception handling (`/EHa`)
const SEH_EXCEPTIONS: &str = "2";

/// The anchor entry next to which sandbox include directories are added
const VSNET_MARKER: &str = "VS.NET";

/// A rule value, possibly differing between debug and release blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Literal(String),
    PerBuildType { debug: String, release: String },
}

impl Value {
    #[must_use]
    pub fn resolve(&self, build_type: BuildType) -> &str {
        match self {
            Value::Literal(v) => v,
            Value::PerBuildType { debug, release } => match build_type {
                BuildType::Debug => debug,
                BuildType::Release => release,
            },
        }
    }

    fn literal(v: impl Into<String>) -> Self {
        Value::Literal(v.into())
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    InsertIfMissing(Value),
    ReplaceValue(Value),
    RemoveIfPresent,
    AppendToList {
        token: Value,
        anchor: Option<String>,
        guard: Option<String>,
    },
}

/// One rule of the table: an attribute and what to do with it. Resolved
/// against a block's context into a concrete [`AttributeEdit`] before
/// application.
#[derive(Debug, Clone)]
pub struct EditRule {
    pub attribute: String,
    pub action: Action,
}

impl EditRule {
    #[must_use]
    pub fn resolve(&self, ctx: &ConfigContext) -> AttributeEdit {
        let name = self.attribute.clone();
        match &self.action {
            Action::InsertIfMissing(value) => AttributeEdit::InsertIfMissing {
                name,
                value: value.resolve(ctx.build_type).to_owned(),
            },
            Action::ReplaceValue(value) => AttributeEdit::ReplaceValue {
                name,
                value: value.resolve(ctx.build_type).to_owned(),
            },
            Action::RemoveIfPresent => AttributeEdit::RemoveIfPresent { name },
            Action::AppendToList {
                token,
                anchor,
                guard,
            } => AttributeEdit::AppendToList {
                name,
                token: token.resolve(ctx.build_type).to_owned(),
                anchor: anchor.clone(),
                guard: guard.clone(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolRules {
    pub tool: String,
    pub edits: Vec<EditRule>,
}

/// The ordered list of attribute edits per tool, defining the intended
/// end-state of that tool's attributes
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    pub tools: Vec<ToolRules>,
}

impl RuleTable {
    /// Tool names in table order; may repeat after a merge
    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.tool.as_str())
    }

    /// Edits for the named tool resolved against the block's context,
    /// in declaration order
    #[must_use]
    pub fn edits_for(&self, tool: &str, ctx: &ConfigContext) -> Vec<AttributeEdit> {
        self.tools
            .iter()
            .filter(|t| t.tool.eq_ignore_ascii_case(tool))
            .flat_map(|t| t.edits.iter().map(|e| e.resolve(ctx)))
            .collect()
    }

    #[must_use]
    pub fn merge(mut self, other: RuleTable) -> RuleTable {
        self.tools.extend(other.tools);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.iter().all(|t| t.edits.is_empty())
    }
}

/// Wires the sandbox Boost tree into the build: the compiler include list
/// gets a Boost sibling of its `VS.NET` entry, the linker library list gets
/// `<boost>/bin/<build type>`, created when absent.
#[must_use]
pub fn boost(boost_path: &str) -> RuleTable {
    let bin = Value::PerBuildType {
        debug: format!("{boost_path}/bin/debug"),
        release: format!("{boost_path}/bin/release"),
    };
    RuleTable {
        tools: vec![
            ToolRules {
                tool: vctool::COMPILER.to_owned(),
                edits: vec![EditRule {
                    attribute: INCLUDE_DIRECTORIES.to_owned(),
                    action: Action::AppendToList {
                        token: Value::literal("Boost"),
                        anchor: Some(VSNET_MARKER.to_owned()),
                        guard: None,
                    },
                }],
            },
            ToolRules {
                tool: vctool::LINKER.to_owned(),
                edits: vec![
                    EditRule {
                        attribute: LIBRARY_DIRECTORIES.to_owned(),
                        action: Action::InsertIfMissing(bin.clone()),
                    },
                    EditRule {
                        attribute: LIBRARY_DIRECTORIES.to_owned(),
                        action: Action::AppendToList {
                            token: bin,
                            anchor: None,
                            guard: Some(String::from("Boost")),
                        },
                    },
                ],
            },
        ],
    }
}

/// Adds the cache include directory next to the `VS.NET` entry
#[must_use]
pub fn cache() -> RuleTable {
    RuleTable {
        tools: vec![ToolRules {
            tool: vctool::COMPILER.to_owned(),
            edits: vec![EditRule {
                attribute: INCLUDE_DIRECTORIES.to_owned(),
                action: Action::AppendToList {
                    token: Value::literal("cache"),
                    anchor: Some(VSNET_MARKER.to_owned()),
                    guard: None,
                },
            }],
        }],
    }
}

/// Forces `ExceptionHandling="2"` in every compiler section. Replace runs
/// first and covers the present-with-wrong-value case; insert covers the
/// absent case and no-ops otherwise.
#[must_use]
pub fn exception_handling() -> RuleTable {
    ensure_compiler_attribute(EXCEPTION_HANDLING, SEH_EXCEPTIONS)
}

/// Forces the canonical `DisableSpecificWarnings` list in every compiler
/// section
#[must_use]
pub fn warnings() -> RuleTable {
    ensure_compiler_attribute(DISABLED_WARNINGS, IGNORED_WARNINGS)
}

fn ensure_compiler_attribute(attribute: &str, value: &str) -> RuleTable {
    RuleTable {
        tools: vec![ToolRules {
            tool: vctool::COMPILER.to_owned(),
            edits: vec![
                EditRule {
                    attribute: attribute.to_owned(),
                    action: Action::ReplaceValue(Value::literal(value)),
                },
                EditRule {
                    attribute: attribute.to_owned(),
                    action: Action::InsertIfMissing(Value::literal(value)),
                },
            ],
        }],
    }
}

/// Produces the rule table for one project file. Errors are per-file
/// conditions: the file is skipped and the walk continues.
pub trait RuleSource {
    /// # Errors
    ///
    /// Fails when the table cannot be derived for this particular file,
    /// e.g. no sandbox marker exists above it.
    fn rules_for(&self, project: &Path) -> Result<RuleTable>;
}

/// The same table for every file
pub struct Static(pub RuleTable);

impl RuleSource for Static {
    fn rules_for(&self, _: &Path) -> Result<RuleTable> {
        Ok(self.0.clone())
    }
}

/// Derives the Boost rule table from the sandbox the project lives in
pub struct BoostSource;

impl RuleSource for BoostSource {
    fn rules_for(&self, project: &Path) -> Result<RuleTable> {
        let path = sandbox::relative_subdir(project, "Boost")?;
        Ok(boost(&path))
    }
}

/// Concatenation of several sources. A member whose table cannot be derived
/// for a file is left out of that file's table with a diagnostic instead of
/// skipping the file entirely.
pub struct Composite(pub Vec<Box<dyn RuleSource>>);

impl RuleSource for Composite {
    fn rules_for(&self, project: &Path) -> Result<RuleTable> {
        let mut table = RuleTable::default();
        for source in &self.0 {
            match source.rules_for(project) {
                Ok(t) => table = table.merge(t),
                Err(e) => {
                    tracing::warn!("rule set not applicable to {}: {e}", project.display());
                }
            }
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Platform;
    use rstest::rstest;

    fn ctx(build_type: BuildType) -> ConfigContext {
        ConfigContext {
            platform: Platform::Win32,
            build_type,
        }
    }

    #[rstest]
    #[case(BuildType::Debug, "../Boost/bin/debug")]
    #[case(BuildType::Release, "../Boost/bin/release")]
    #[trace]
    fn boost_linker_value_follows_build_type(#[case] build_type: BuildType, #[case] expected: &str) {
        // Arrange
        let table = boost("../Boost");

        // Act
        let edits = table.edits_for(vctool::LINKER, &ctx(build_type));

        // Assert
        assert_eq!(edits.len(), 2);
        let AttributeEdit::InsertIfMissing { value, .. } = &edits[0] else {
            panic!("insert must come before append");
        };
        assert_eq!(value, expected);
    }

    #[test]
    fn exception_handling_replaces_then_inserts() {
        // Arrange
        let table = exception_handling();

        // Act
        let edits = table.edits_for(vctool::COMPILER, &ctx(BuildType::Debug));

        // Assert
        assert!(matches!(edits[0], AttributeEdit::ReplaceValue { .. }));
        assert!(matches!(edits[1], AttributeEdit::InsertIfMissing { .. }));
    }

    #[test]
    fn merge_keeps_declaration_order() {
        // Act
        let table = cache().merge(warnings());

        // Assert
        let names: Vec<&str> = table.tool_names().collect();
        assert_eq!(names, vec![vctool::COMPILER, vctool::COMPILER]);
        let edits = table.edits_for(vctool::COMPILER, &ctx(BuildType::Release));
        assert!(matches!(edits[0], AttributeEdit::AppendToList { .. }));
        assert_eq!(edits.len(), 3);
    }

    #[test]
    fn unrelated_tool_has_no_edits() {
        // Act
        let edits = boost("../Boost").edits_for(vctool::LIBRARIAN, &ctx(BuildType::Debug));

        // Assert
        assert!(edits.is_empty());
    }

    #[test]
    fn static_source_is_path_independent() {
        // Arrange
        let source = Static(warnings());

        // Act
        let table = source.rules_for(Path::new("any.vcproj")).unwrap();

        // Assert
        assert!(!table.is_empty());
    }
}
