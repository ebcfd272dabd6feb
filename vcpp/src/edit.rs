use std::borrow::Cow;
use std::ops::Range;

pub const LIST_SEPARATOR: char = ';';

/// One idempotent text edit against a tool section. Applying any edit twice
/// to its own output yields the same result as applying it once; the driver
/// relies on this because it always re-derives sections from the current,
/// possibly already-edited text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeEdit {
    /// Add `name="value"` directly before the section's closing marker
    /// unless the attribute already exists
    InsertIfMissing { name: String, value: String },
    /// Replace the attribute's value verbatim; no-op when absent
    ReplaceValue { name: String, value: String },
    /// Delete the whole assignment and its line terminator
    RemoveIfPresent { name: String },
    /// Append `token` to the `;`-separated value. Skipped when the attribute
    /// is absent, when the guard substring (the token itself by default) is
    /// already present, or when the anchor (if any) is not. With an anchor
    /// the appended element is a sibling of the anchor directory, derived
    /// from the anchor element's path prefix.
    AppendToList {
        name: String,
        token: String,
        anchor: Option<String>,
        guard: Option<String>,
    },
}

/// Applies one edit to the text of a tool section (`<Tool` through `/>`).
/// Pure text transform; the unchanged input is returned borrowed.
#[must_use]
pub fn apply<'a>(section: &'a str, edit: &AttributeEdit) -> Cow<'a, str> {
    match edit {
        AttributeEdit::InsertIfMissing { name, value } => insert_if_missing(section, name, value),
        AttributeEdit::ReplaceValue { name, value } => replace_value(section, name, value),
        AttributeEdit::RemoveIfPresent { name } => remove_if_present(section, name),
        AttributeEdit::AppendToList {
            name,
            token,
            anchor,
            guard,
        } => append_to_list(section, name, token, anchor.as_deref(), guard.as_deref()),
    }
}

struct AttrSpan {
    full: Range<usize>,
    value: Range<usize>,
}

/// Case-insensitive `name="value"` lookup. Values never contain an escaped
/// double quote, so the value runs to the next quote unconditionally.
fn attr_span(section: &str, name: &str) -> Option<AttrSpan> {
    let haystack = section.to_ascii_lowercase();
    let needle = format!("{}=\"", name.to_ascii_lowercase());
    let mut from = 0;
    while let Some(found) = haystack[from..].find(&needle) {
        let start = from + found;
        if start == 0 || !is_name_char(haystack.as_bytes()[start - 1]) {
            let value_start = start + needle.len();
            let value_end = value_start + section[value_start..].find('"')?;
            return Some(AttrSpan {
                full: start..value_end + 1,
                value: value_start..value_end,
            });
        }
        from = start + 1;
    }
    None
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}

fn insert_if_missing<'a>(section: &'a str, name: &str, value: &str) -> Cow<'a, str> {
    if attr_span(section, name).is_some() {
        return Cow::Borrowed(section);
    }
    let Some(close) = section.rfind("/>") else {
        return Cow::Borrowed(section);
    };
    let head = &section[..close];
    match head.rfind('\n') {
        Some(nl) if head[nl + 1..].trim().is_empty() => {
            // the marker sits on its own line; the attribute goes on the
            // line above it, indented like its neighbors
            let mut attr_end = nl;
            if section.as_bytes()[attr_end.saturating_sub(1)] == b'\r' {
                attr_end -= 1;
            }
            let eol = if attr_end < nl { "\r\n" } else { "\n" };
            let indent = neighbor_indent(&section[..attr_end])
                .unwrap_or_else(|| format!("{}\t", &head[nl + 1..]));
            Cow::Owned(format!(
                "{}{}{}{}=\"{}\"{}",
                &section[..attr_end],
                eol,
                indent,
                name,
                value,
                &section[attr_end..]
            ))
        }
        _ => Cow::Owned(format!(
            "{} {}=\"{}\" {}",
            head.trim_end(),
            name,
            value,
            &section[close..]
        )),
    }
}

/// Indentation of the last attribute line in `upto`, when there is one
fn neighbor_indent(upto: &str) -> Option<String> {
    let line_start = upto.rfind('\n').map_or(0, |i| i + 1);
    let line = &upto[line_start..];
    if line.contains('=') {
        Some(
            line.chars()
                .take_while(|c| *c == '\t' || *c == ' ')
                .collect(),
        )
    } else {
        None
    }
}

fn replace_value<'a>(section: &'a str, name: &str, value: &str) -> Cow<'a, str> {
    match attr_span(section, name) {
        Some(span) if &section[span.value.clone()] != value => Cow::Owned(format!(
            "{}{}{}",
            &section[..span.value.start],
            value,
            &section[span.value.end..]
        )),
        _ => Cow::Borrowed(section),
    }
}

fn remove_if_present<'a>(section: &'a str, name: &str) -> Cow<'a, str> {
    let Some(span) = attr_span(section, name) else {
        return Cow::Borrowed(section);
    };
    let bytes = section.as_bytes();
    let mut cut = span.full.start;
    while cut > 0 && (bytes[cut - 1] == b' ' || bytes[cut - 1] == b'\t') {
        cut -= 1;
    }
    if cut > 0 && bytes[cut - 1] == b'\n' {
        cut -= 1;
        if cut > 0 && bytes[cut - 1] == b'\r' {
            cut -= 1;
        }
    }
    Cow::Owned(format!("{}{}", &section[..cut], &section[span.full.end..]))
}

fn append_to_list<'a>(
    section: &'a str,
    name: &str,
    token: &str,
    anchor: Option<&str>,
    guard: Option<&str>,
) -> Cow<'a, str> {
    let Some(span) = attr_span(section, name) else {
        return Cow::Borrowed(section);
    };
    let value = &section[span.value.clone()];
    let guard = guard.unwrap_or(token);
    if !guard.is_empty()
        && value
            .to_ascii_lowercase()
            .contains(&guard.to_ascii_lowercase())
    {
        return Cow::Borrowed(section);
    }
    let element = match anchor {
        Some(anchor) => match anchor_element(value, anchor, token) {
            Some(derived) => derived,
            None => return Cow::Borrowed(section),
        },
        None => token.to_owned(),
    };
    let appended = if value.is_empty() {
        element
    } else if value.ends_with(LIST_SEPARATOR) {
        format!("{value}{element}")
    } else {
        format!("{value}{LIST_SEPARATOR}{element}")
    };
    Cow::Owned(format!(
        "{}{}{}",
        &section[..span.value.start],
        appended,
        &section[span.value.end..]
    ))
}

/// `..\VS.NET\Include` with anchor `VS.NET` and token `Boost` derives
/// `..\VS.NET\Boost`: the new element is a sibling of the anchor directory
/// inside the element that mentions it.
fn anchor_element(value: &str, anchor: &str, token: &str) -> Option<String> {
    let at = value
        .to_ascii_lowercase()
        .find(&anchor.to_ascii_lowercase())?;
    let element_start = value[..at].rfind(LIST_SEPARATOR).map_or(0, |i| i + 1);
    let after = at + anchor.len();
    let sep = match value[after..].chars().next() {
        Some(c @ ('/' | '\\')) => c,
        _ => '\\',
    };
    Some(format!("{}{}{}", &value[element_start..after], sep, token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const COMPILER_SECTION: &str = "<Tool\n\t\t\t\tName=\"VCCLCompilerTool\"\n\t\t\t\tOptimization=\"0\"\n\t\t\t\tAdditionalIncludeDirectories=\"..\\VS.NET\\Include\"\n\t\t\t/>";
    const LINKER_SECTION: &str = "<Tool\n\t\t\t\tName=\"VCLinkerTool\"\n\t\t\t\tOutputFile=\"$(OutDir)\\engine.dll\"\n\t\t\t/>";

    fn boost_include() -> AttributeEdit {
        AttributeEdit::AppendToList {
            name: String::from("AdditionalIncludeDirectories"),
            token: String::from("Boost"),
            anchor: Some(String::from("VS.NET")),
            guard: None,
        }
    }

    #[test]
    fn append_with_anchor_derives_sibling_entry() {
        // Act
        let actual = apply(COMPILER_SECTION, &boost_include());

        // Assert
        assert!(actual
            .contains("AdditionalIncludeDirectories=\"..\\VS.NET\\Include;..\\VS.NET\\Boost\""));
    }

    #[test]
    fn append_single_line_section() {
        // Arrange
        let section =
            "<Tool Name=\"VCCLCompilerTool\" AdditionalIncludeDirectories=\"..\\VS.NET\\Include\" />";

        // Act
        let actual = apply(section, &boost_include());

        // Assert
        assert!(actual
            .contains("AdditionalIncludeDirectories=\"..\\VS.NET\\Include;..\\VS.NET\\Boost\""));
    }

    #[test]
    fn append_skipped_when_guard_already_present() {
        // Arrange
        let section = "<Tool\n\t\t\t\tName=\"VCCLCompilerTool\"\n\t\t\t\tAdditionalIncludeDirectories=\"..\\VS.NET\\Include;..\\VS.NET\\Boost\"\n\t\t\t/>";

        // Act
        let actual = apply(section, &boost_include());

        // Assert
        assert_eq!(actual, section);
    }

    #[test]
    fn append_skipped_when_anchor_absent() {
        // Arrange
        let section =
            "<Tool\n\t\t\t\tName=\"VCCLCompilerTool\"\n\t\t\t\tAdditionalIncludeDirectories=\"..\\Include\"\n\t\t\t/>";

        // Act
        let actual = apply(section, &boost_include());

        // Assert
        assert_eq!(actual, section);
    }

    #[rstest]
    #[case("", "../Boost/bin/debug")]
    #[case("X", "X;../Boost/bin/debug")]
    #[case("X;", "X;../Boost/bin/debug")]
    #[trace]
    fn append_separator_tests(#[case] value: &str, #[case] expected: &str) {
        // Arrange
        let section = format!(
            "<Tool\n\t\t\t\tName=\"VCLinkerTool\"\n\t\t\t\tAdditionalLibraryDirectories=\"{value}\"\n\t\t\t/>"
        );
        let edit = AttributeEdit::AppendToList {
            name: String::from("AdditionalLibraryDirectories"),
            token: String::from("../Boost/bin/debug"),
            anchor: None,
            guard: Some(String::from("Boost")),
        };

        // Act
        let actual = apply(&section, &edit);

        // Assert
        assert!(actual.contains(&format!("AdditionalLibraryDirectories=\"{expected}\"")));
    }

    #[test]
    fn insert_before_closing_marker_with_inferred_indent() {
        // Arrange
        let edit = AttributeEdit::InsertIfMissing {
            name: String::from("AdditionalLibraryDirectories"),
            value: String::from("../Boost/bin/release"),
        };

        // Act
        let actual = apply(LINKER_SECTION, &edit);

        // Assert
        let expected = "<Tool\n\t\t\t\tName=\"VCLinkerTool\"\n\t\t\t\tOutputFile=\"$(OutDir)\\engine.dll\"\n\t\t\t\tAdditionalLibraryDirectories=\"../Boost/bin/release\"\n\t\t\t/>";
        assert_eq!(actual, expected);
    }

    #[test]
    fn insert_into_single_line_section() {
        // Arrange
        let section = "<Tool Name=\"VCLinkerTool\" />";
        let edit = AttributeEdit::InsertIfMissing {
            name: String::from("LinkIncremental"),
            value: String::from("1"),
        };

        // Act
        let actual = apply(section, &edit);

        // Assert
        assert_eq!(actual, "<Tool Name=\"VCLinkerTool\" LinkIncremental=\"1\" />");
    }

    #[test]
    fn insert_skipped_when_attribute_present() {
        // Arrange
        let section = "<Tool\n\t\t\t\tName=\"VCLinkerTool\"\n\t\t\t\tAdditionalLibraryDirectories=\"X;Boost/bin/release\"\n\t\t\t/>";
        let edit = AttributeEdit::InsertIfMissing {
            name: String::from("AdditionalLibraryDirectories"),
            value: String::from("../Boost/bin/release"),
        };

        // Act
        let actual = apply(section, &edit);

        // Assert
        assert_eq!(actual, section);
    }

    #[test]
    fn replace_rewrites_value_verbatim() {
        // Arrange
        let section = "<Tool\n\t\t\t\tName=\"VCCLCompilerTool\"\n\t\t\t\tExceptionHandling=\"1\"\n\t\t\t/>";
        let edit = AttributeEdit::ReplaceValue {
            name: String::from("ExceptionHandling"),
            value: String::from("2"),
        };

        // Act
        let actual = apply(section, &edit);

        // Assert
        assert!(actual.contains("ExceptionHandling=\"2\""));
        assert!(!actual.contains("ExceptionHandling=\"1\""));
    }

    #[rstest]
    #[case(AttributeEdit::ReplaceValue { name: String::from("ExceptionHandling"), value: String::from("2") })]
    #[case(AttributeEdit::RemoveIfPresent { name: String::from("ExceptionHandling") })]
    #[trace]
    fn noop_on_absent_target_tests(#[case] edit: AttributeEdit) {
        // Act
        let actual = apply(LINKER_SECTION, &edit);

        // Assert
        assert_eq!(actual, LINKER_SECTION);
    }

    #[test]
    fn remove_takes_the_whole_line() {
        // Arrange
        let edit = AttributeEdit::RemoveIfPresent {
            name: String::from("Optimization"),
        };

        // Act
        let actual = apply(COMPILER_SECTION, &edit);

        // Assert
        let expected = "<Tool\n\t\t\t\tName=\"VCCLCompilerTool\"\n\t\t\t\tAdditionalIncludeDirectories=\"..\\VS.NET\\Include\"\n\t\t\t/>";
        assert_eq!(actual, expected);
    }

    #[test]
    fn remove_from_single_line_section() {
        // Arrange
        let section = "<Tool Name=\"VCCLCompilerTool\" Optimization=\"0\" />";
        let edit = AttributeEdit::RemoveIfPresent {
            name: String::from("Optimization"),
        };

        // Act
        let actual = apply(section, &edit);

        // Assert
        assert_eq!(actual, "<Tool Name=\"VCCLCompilerTool\" />");
    }

    #[test]
    fn attribute_name_matching_respects_boundaries() {
        // Arrange
        let section =
            "<Tool\n\t\t\t\tName=\"X\"\n\t\t\t\tUseAdditionalOptions=\"a\"\n\t\t\t\tAdditionalOptions=\"b\"\n\t\t\t/>";
        let edit = AttributeEdit::ReplaceValue {
            name: String::from("AdditionalOptions"),
            value: String::from("c"),
        };

        // Act
        let actual = apply(section, &edit);

        // Assert
        assert!(actual.contains("UseAdditionalOptions=\"a\""));
        assert!(actual.contains("AdditionalOptions=\"c\""));
    }

    #[rstest]
    #[case(AttributeEdit::InsertIfMissing { name: String::from("WarningLevel"), value: String::from("4") })]
    #[case(AttributeEdit::ReplaceValue { name: String::from("Optimization"), value: String::from("2") })]
    #[case(AttributeEdit::RemoveIfPresent { name: String::from("Optimization") })]
    #[case(AttributeEdit::AppendToList { name: String::from("AdditionalIncludeDirectories"), token: String::from("Boost"), anchor: Some(String::from("VS.NET")), guard: None })]
    #[case(AttributeEdit::AppendToList { name: String::from("AdditionalIncludeDirectories"), token: String::from("extra"), anchor: None, guard: None })]
    #[trace]
    fn every_edit_is_idempotent(#[case] edit: AttributeEdit) {
        // Act
        let once = apply(COMPILER_SECTION, &edit).into_owned();
        let twice = apply(&once, &edit).into_owned();

        // Assert
        assert_eq!(once, twice);
    }

    #[test]
    fn append_twice_keeps_token_once() {
        // Act
        let once = apply(COMPILER_SECTION, &boost_include()).into_owned();
        let twice = apply(&once, &boost_include()).into_owned();

        // Assert
        assert_eq!(once.matches("Boost").count(), 1);
        assert_eq!(twice.matches("Boost").count(), 1);
    }
}
