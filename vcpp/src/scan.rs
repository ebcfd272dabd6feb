use std::ops::Range;

use miette::{miette, LabeledSpan};
use nom::branch::alt;
use nom::bytes::complete::tag_no_case;
use nom::character::complete::char;
use nom::combinator::{eof, value};
use nom::sequence::{separated_pair, terminated};
use nom::IResult;

use crate::api::{BuildType, Platform};
use crate::lex::{Lexer, LexicalError, Tok};

const CONFIGURATION: &str = "Configuration";
const FILE_CONFIGURATION: &str = "FileConfiguration";
const TOOL: &str = "Tool";
const NAME_ATTR: &str = "Name";

/// A `(platform, build type)` configuration region of the project text.
///
/// Blocks are views, not stored entities: any edit invalidates every offset
/// after it, so callers must rescan the current text instead of holding onto
/// blocks across an edit.
#[derive(Debug, Clone)]
pub struct ConfigBlock {
    /// Opening angle bracket through the end of the closing tag
    pub span: Range<usize>,
    /// Between the opener's `>` and the closing tag
    pub body: Range<usize>,
    pub platform: Platform,
    pub build_type: BuildType,
    /// `<FileConfiguration>` per-file override rather than a whole-project
    /// configuration
    pub per_file: bool,
}

/// A `<Tool ... />` region inside one configuration block
#[derive(Debug, Clone)]
pub struct ToolSection {
    /// Opening angle bracket through the end of the `/>` marker,
    /// relative to the whole project text
    pub span: Range<usize>,
}

enum Terminator {
    /// `>` — the element has a body; offset is past the bracket
    TagEnd(usize),
    /// `/>` — offset is past the bracket
    SelfClose(usize),
}

struct Head<'a> {
    name: Option<&'a str>,
    terminator: Terminator,
}

/// Finds every `(debug|release) × (win32|x64)` configuration block in
/// document order, covering both the whole-project `<Configuration>` and the
/// per-file `<FileConfiguration>` variants. Other configuration names, like
/// the legacy `Win64 Debug|Win32` ones, are not reported.
///
/// # Errors
///
/// Fails when a relevant opener has no matching closing tag or the markup
/// breaks off mid-token. The file as a whole is then considered malformed;
/// no partial result is produced.
pub fn find_configuration_blocks(text: &str) -> miette::Result<Vec<ConfigBlock>> {
    let mut tokens = Lexer::new(text);
    let mut blocks = vec![];
    while let Some(tok) = tokens.next() {
        let (start, tok, _) = tok.map_err(|e| lexical_report(&e))?;
        let Tok::OpenElement(tag) = tok else {
            continue;
        };
        let per_file = if tag.eq_ignore_ascii_case(CONFIGURATION) {
            false
        } else if tag.eq_ignore_ascii_case(FILE_CONFIGURATION) {
            true
        } else {
            continue;
        };
        let head = read_head(&mut tokens)?;
        let Terminator::TagEnd(body_start) = head.terminator else {
            // self-closing configuration holds no tool sections
            continue;
        };
        let Some((build_type, platform)) = head.name.and_then(parse_config_name) else {
            continue;
        };
        let (body_end, end) = seek_close(&mut tokens, tag, start)?;
        blocks.push(ConfigBlock {
            span: start..end,
            body: body_start..body_end,
            platform,
            build_type,
            per_file,
        });
    }
    Ok(blocks)
}

/// Locates the self-closing `<Tool>` section carrying the given `Name`
/// within one block. Absence is common and not an error: not every tool is
/// configured for every build configuration.
#[must_use]
pub fn find_tool_section(text: &str, block: &ConfigBlock, tool: &str) -> Option<ToolSection> {
    let body = &text[block.body.clone()];
    let mut tokens = Lexer::new(body);
    while let Some(tok) = tokens.next() {
        let (start, tok, _) = tok.ok()?;
        let Tok::OpenElement(tag) = tok else {
            continue;
        };
        if !tag.eq_ignore_ascii_case(TOOL) {
            continue;
        }
        let head = read_head(&mut tokens).ok()?;
        let Terminator::SelfClose(end) = head.terminator else {
            continue;
        };
        if head.name.is_some_and(|n| n.eq_ignore_ascii_case(tool)) {
            return Some(ToolSection {
                span: block.body.start + start..block.body.start + end,
            });
        }
    }
    None
}

/// Consumes attribute tokens up to the element terminator, capturing the
/// value of its `Name` attribute if present.
fn read_head<'a>(tokens: &mut Lexer<'a>) -> miette::Result<Head<'a>> {
    let mut key = None;
    let mut name = None;
    for tok in tokens.by_ref() {
        let (_, tok, end) = tok.map_err(|e| lexical_report(&e))?;
        match tok {
            Tok::AttrName(k) => key = Some(k),
            Tok::Str(v) => {
                if key.take().is_some_and(|k: &str| k.eq_ignore_ascii_case(NAME_ATTR)) {
                    name = Some(v);
                }
            }
            Tok::TagEnd => {
                return Ok(Head {
                    name,
                    terminator: Terminator::TagEnd(end),
                })
            }
            Tok::SelfClose => {
                return Ok(Head {
                    name,
                    terminator: Terminator::SelfClose(end),
                })
            }
            _ => {}
        }
    }
    Err(miette!("Tag is not terminated before end of stream"))
}

/// Scans forward to the closing tag matching the opener at `opened_at`,
/// tracking nested elements of the same name.
fn seek_close(tokens: &mut Lexer<'_>, tag: &str, opened_at: usize) -> miette::Result<(usize, usize)> {
    let mut depth = 0usize;
    while let Some(tok) = tokens.next() {
        let (start, tok, end) = tok.map_err(|e| lexical_report(&e))?;
        match tok {
            Tok::OpenElement(name) if name.eq_ignore_ascii_case(tag) => {
                let head = read_head(tokens)?;
                if matches!(head.terminator, Terminator::TagEnd(_)) {
                    depth += 1;
                }
            }
            Tok::CloseElement(name) if name.eq_ignore_ascii_case(tag) => {
                if depth == 0 {
                    return Ok((start, end));
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    Err(miette!(
        labels = vec![LabeledSpan::at(opened_at..opened_at + 1, "opened here")],
        "No matching </{tag}> found"
    ))
}

fn lexical_report(e: &LexicalError) -> miette::Report {
    let at = e.position();
    miette!(
        labels = vec![LabeledSpan::at(at..at + 1, "starts here")],
        "Premature end of stream while scanning markup"
    )
}

fn parse_config_name(name: &str) -> Option<(BuildType, Platform)> {
    let result: IResult<&str, (BuildType, Platform)> =
        terminated(separated_pair(build_type, char('|'), platform), eof)(name);
    result.ok().map(|(_, pair)| pair)
}

fn build_type(input: &str) -> IResult<&str, BuildType> {
    alt((
        value(BuildType::Debug, tag_no_case("debug")),
        value(BuildType::Release, tag_no_case("release")),
    ))(input)
}

fn platform(input: &str) -> IResult<&str, Platform> {
    alt((
        value(Platform::Win32, tag_no_case("win32")),
        value(Platform::X64, tag_no_case("x64")),
    ))(input)
}
