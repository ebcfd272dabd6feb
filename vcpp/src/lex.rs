use std::{fmt::Display, str::CharIndices};

pub type Spanned<Tok, Loc, Error> = Result<(Loc, Tok, Loc), Error>;

#[derive(Copy, Clone, Debug)]
pub enum LexicalError {
    /// Occurs when end of stream is reached while a token is still open
    /// (an unterminated tag or attribute value)
    PrematureEndOfStream(usize),
}

impl LexicalError {
    #[must_use]
    pub fn position(&self) -> usize {
        match self {
            LexicalError::PrematureEndOfStream(at) => *at,
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub enum Tok<'a> {
    /// `<Name` — span starts at the angle bracket
    OpenElement(&'a str),
    /// `</Name>` consumed through the closing angle bracket
    CloseElement(&'a str),
    /// attribute key inside an open tag
    AttrName(&'a str),
    /// quoted attribute value, quotes stripped
    Str(&'a str),
    Eq,
    /// `>` finishing an open tag
    TagEnd,
    /// `/>` finishing a self-closing tag
    SelfClose,
    /// markup that carries no settings, like `<?xml ... ?>` declarations
    Skip,
}

impl Display for Tok<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tok::OpenElement(elt) => write!(f, "OpenElement({elt})")?,
            Tok::CloseElement(elt) => write!(f, "CloseElement({elt})")?,
            Tok::AttrName(name) => write!(f, "AttrName({name})")?,
            Tok::Str(s) => write!(f, "String({s})")?,
            Tok::Eq => write!(f, "Eq")?,
            Tok::TagEnd => write!(f, "TagEnd")?,
            Tok::SelfClose => write!(f, "SelfClose")?,
            Tok::Skip => write!(f, "Skip")?,
        }
        Ok(())
    }
}

impl Display for LexicalError {
    fn fmt(&self, _f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Ok(())
    }
}

enum LexerContext {
    /// between tags, nothing to report until the next `<`
    Content,
    /// between a tag name and its `>` or `/>` terminator
    InsideTag,
}

/// A lexer for the tag-attribute markup of legacy `.vcproj` files.
///
/// The format looks like XML but is not guaranteed to be well formed in every
/// historical variant, so tokens are produced by a plain character scan
/// rather than an XML parser. The `scan` module assembles these tokens into
/// tagged spans over the original text.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<CharIndices<'a>>,
    input: &'a str,
    context: LexerContext,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer over the project file content given.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Lexer {
            chars: input.char_indices().peekable(),
            input,
            context: LexerContext::Content,
        }
    }

    fn element(&mut self, i: usize) -> Spanned<Tok<'a>, usize, LexicalError> {
        match self.chars.peek().copied() {
            Some((_, '/')) => {
                self.chars.next();
                self.close_element(i)
            }
            Some((_, '?' | '!')) => self.skip_to_gt(i),
            Some((start, c)) if c.is_ascii_alphabetic() || c == '_' => self.open_element(i, start),
            // stray angle bracket in content
            _ => Ok((i, Tok::Skip, i + 1)),
        }
    }

    fn open_element(&mut self, i: usize, start: usize) -> Spanned<Tok<'a>, usize, LexicalError> {
        while let Some((j, c)) = self.chars.peek().copied() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.chars.next();
            } else {
                self.context = LexerContext::InsideTag;
                return Ok((i, Tok::OpenElement(&self.input[start..j]), j));
            }
        }
        Err(LexicalError::PrematureEndOfStream(i))
    }

    fn close_element(&mut self, i: usize) -> Spanned<Tok<'a>, usize, LexicalError> {
        let mut name = None;
        while let Some((j, c)) = self.chars.peek().copied() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.chars.next();
            } else {
                name = Some(&self.input[i + 2..j]);
                break;
            }
        }
        for (j, c) in self.chars.by_ref() {
            if c == '>' {
                let name = name.unwrap_or(&self.input[i + 2..j]);
                return Ok((i, Tok::CloseElement(name), j + 1));
            }
        }
        Err(LexicalError::PrematureEndOfStream(i))
    }

    fn skip_to_gt(&mut self, i: usize) -> Spanned<Tok<'a>, usize, LexicalError> {
        for (j, c) in self.chars.by_ref() {
            if c == '>' {
                return Ok((i, Tok::Skip, j + 1));
            }
        }
        Err(LexicalError::PrematureEndOfStream(i))
    }

    /// Attribute values never contain escaped double quotes, so the value
    /// runs to the next `"` unconditionally.
    fn string(&mut self, i: usize) -> Spanned<Tok<'a>, usize, LexicalError> {
        while let Some((j, c)) = self.chars.peek().copied() {
            if c == '"' {
                let val = &self.input[i + 1..j];
                self.chars.next();
                return Ok((i + 1, Tok::Str(val), j));
            }
            self.chars.next();
        }
        Err(LexicalError::PrematureEndOfStream(i))
    }

    fn attr_name(&mut self, i: usize) -> (usize, Tok<'a>, usize) {
        while let Some((j, c)) = self.chars.peek().copied() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' {
                self.chars.next();
            } else {
                return (i, Tok::AttrName(&self.input[i..j]), j);
            }
        }
        (i, Tok::AttrName(&self.input[i..]), self.input.len())
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Spanned<Tok<'a>, usize, LexicalError>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((i, c)) = self.chars.next() {
            match self.context {
                LexerContext::Content => {
                    if c == '<' {
                        return Some(self.element(i));
                    }
                }
                LexerContext::InsideTag => match c {
                    '>' => {
                        self.context = LexerContext::Content;
                        return Some(Ok((i, Tok::TagEnd, i + 1)));
                    }
                    '/' => {
                        if let Some((j, '>')) = self.chars.peek().copied() {
                            self.chars.next();
                            self.context = LexerContext::Content;
                            return Some(Ok((i, Tok::SelfClose, j + 1)));
                        }
                    }
                    '=' => return Some(Ok((i, Tok::Eq, i + 1))),
                    '"' => return Some(self.string(i)),
                    c if c.is_ascii_alphabetic() || c == '_' => {
                        return Some(Ok(self.attr_name(i)))
                    }
                    _ => {}
                },
            }
        }
        None
    }
}
