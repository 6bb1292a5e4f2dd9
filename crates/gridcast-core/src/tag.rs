//! Inline color tags.
//!
//! ```text
//! tag      := "<c" selector hex6 ">"      e.g. <cfFF0000>
//! selector := "f" | "b"
//! close-f  := "</cf>"   (shorthand for the default foreground tag)
//! close-b  := "</cb>"   (shorthand for the default background tag)
//! ```
//!
//! [`TaggedText::tokens`] walks the text left to right, yielding plain text
//! runs (with their column offset from the draw origin) and color switches.
//! A malformed tag stops the walk with a [`FormatError`]; tokens already
//! yielded stay valid, text directly before the bad tag is not yielded.

use crate::color::Rgb;
use crate::palette::{DEFAULT_BG, DEFAULT_FG};
use thiserror::Error;

/// Length of a full tag, `<cfRRGGBB>`.
pub const TAG_LEN: usize = 10;
const TAG_OPEN: &str = "<c";
const CLOSE_FG: &str = "</cf>";
const CLOSE_BG: &str = "</cb>";

/// What was wrong with a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatErrorKind {
    /// Fewer than ten characters remain after `<c`.
    Truncated,
    /// The tenth character is not `>`.
    MissingTerminator,
    /// Selector is neither `f` nor `b`.
    InvalidSelector(char),
    /// Color digits are not hexadecimal.
    InvalidHex,
}

/// Malformed inline color tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("malformed color tag at byte {position}: {kind:?}")]
pub struct FormatError {
    /// Failure kind.
    pub kind: FormatErrorKind,
    /// Byte offset of the tag's `<` in the expanded text.
    pub position: usize,
}

/// A piece of tagged text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Plain text to draw `column` characters right of the origin.
    Text {
        /// The text, possibly containing line breaks.
        text: &'a str,
        /// Column offset from the draw origin.
        column: usize,
    },
    /// Switch the current foreground.
    Foreground(Rgb),
    /// Switch the current background.
    Background(Rgb),
}

/// Text with closing shorthands already expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedText {
    source: String,
}

impl TaggedText {
    /// Expand `</cf>` and `</cb>` into full default-color tags.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let source = text
            .replace(CLOSE_FG, &format!("<cf{DEFAULT_FG}>"))
            .replace(CLOSE_BG, &format!("<cb{DEFAULT_BG}>"));
        Self { source }
    }

    /// The expanded text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Walk the text.
    #[must_use]
    pub fn tokens(&self) -> Tokens<'_> {
        Tokens {
            source: &self.source,
            cursor: 0,
            column: 0,
            pending: None,
            done: false,
        }
    }
}

/// Iterator over the tokens of a [`TaggedText`].
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    source: &'a str,
    cursor: usize,
    column: usize,
    pending: Option<Token<'a>>,
    done: bool,
}

impl<'a> Tokens<'a> {
    fn parse_tag(&self, position: usize) -> Result<Token<'a>, FormatError> {
        let error = |kind| FormatError { kind, position };
        let tag = self
            .source
            .get(position..position + TAG_LEN)
            .ok_or_else(|| error(FormatErrorKind::Truncated))?;
        let bytes = tag.as_bytes();

        if bytes[TAG_LEN - 1] != b'>' {
            return Err(error(FormatErrorKind::MissingTerminator));
        }
        let color = |hex: &str| Rgb::from_hex(hex).map_err(|_| error(FormatErrorKind::InvalidHex));
        match bytes[2] {
            b'f' => Ok(Token::Foreground(color(&tag[3..9])?)),
            b'b' => Ok(Token::Background(color(&tag[3..9])?)),
            other => Err(error(FormatErrorKind::InvalidSelector(char::from(other)))),
        }
    }

    fn text(&mut self, end: usize) -> Option<Token<'a>> {
        if end <= self.cursor {
            return None;
        }
        let text = &self.source[self.cursor..end];
        let token = Token::Text {
            text,
            column: self.column,
        };
        self.column += text.chars().count();
        Some(token)
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Result<Token<'a>, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(token) = self.pending.take() {
            return Some(Ok(token));
        }
        if self.done {
            return None;
        }

        let Some(found) = self.source[self.cursor..].find(TAG_OPEN) else {
            self.done = true;
            return self.text(self.source.len()).map(Ok);
        };
        let position = self.cursor + found;

        let tag = match self.parse_tag(position) {
            Ok(tag) => tag,
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };

        let text = self.text(position);
        self.cursor = position + TAG_LEN;
        match text {
            Some(text) => {
                self.pending = Some(tag);
                Some(Ok(text))
            }
            None => Some(Ok(tag)),
        }
    }
}
