//! Inline markup for paragraph text.
//!
//! Paragraph text may carry a small set of ReportLab-style inline directives:
//!
//! - `<b>bold</b>` and `<i>italic</i>`, which may nest
//! - `<br/>` for a forced line break
//! - the entities `&amp;`, `&lt;`, `&gt;` and `&quot;`
//!
//! [`parse_markup`] turns such a string into [`Span`]s that the line breaker
//! consumes. Whitespace is kept verbatim; collapsing happens during wrapping.

use std::fmt;

/// A slice of text together with inline style attributes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Span {
    text: String,
    bold: bool,
    italic: bool,
    line_break: bool,
}

impl Span {
    /// Creates a new span with the provided text and no styles applied.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Creates a forced line break.
    pub fn line_break() -> Self {
        Self {
            line_break: true,
            ..Self::default()
        }
    }

    /// Returns the raw text contained in this span.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns whether the span should be rendered in bold.
    pub fn is_bold(&self) -> bool {
        self.bold
    }

    /// Returns whether the span should be rendered in italic.
    pub fn is_italic(&self) -> bool {
        self.italic
    }

    /// Returns whether the span is a forced line break.
    pub fn is_line_break(&self) -> bool {
        self.line_break
    }
}

/// Parse errors produced by [`parse_markup`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    index: usize,
    message: String,
}

impl ParseError {
    fn new(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            message: message.into(),
        }
    }

    /// Byte index in the original input string where the error was detected.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Human-readable description of the parsing error.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at byte {})", self.message, self.index)
    }
}

impl std::error::Error for ParseError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tag {
    Bold,
    Italic,
}

impl Tag {
    fn name(self) -> &'static str {
        match self {
            Tag::Bold => "b",
            Tag::Italic => "i",
        }
    }
}

const ENTITIES: &[(&str, char)] = &[
    ("&amp;", '&'),
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&quot;", '"'),
];

/// Accumulates spans while tracking the open tags and their byte offsets.
#[derive(Default)]
struct Scanner {
    spans: Vec<Span>,
    text: String,
    open: Vec<(Tag, usize)>,
}

impl Scanner {
    fn flush(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let mut span = Span::new(std::mem::take(&mut self.text));
        span.bold = self.open.iter().any(|(tag, _)| *tag == Tag::Bold);
        span.italic = self.open.iter().any(|(tag, _)| *tag == Tag::Italic);
        self.spans.push(span);
    }

    fn tag(&mut self, body: &str, at: usize) -> Result<(), ParseError> {
        let opening = match body.trim() {
            "b" => Some(Tag::Bold),
            "i" => Some(Tag::Italic),
            _ => None,
        };
        if let Some(tag) = opening {
            self.flush();
            self.open.push((tag, at));
            return Ok(());
        }

        match body.trim() {
            "br" | "br/" | "br /" => {
                self.flush();
                self.spans.push(Span::line_break());
                Ok(())
            }
            closing @ ("/b" | "/i") => match self.open.last() {
                Some((tag, _)) if &closing[1..] == tag.name() => {
                    self.flush();
                    self.open.pop();
                    Ok(())
                }
                _ => Err(ParseError::new(at, format!("unexpected closing tag `<{closing}>`"))),
            },
            other => Err(ParseError::new(
                at,
                format!("unsupported tag `<{other}>`; expected <b>, <i> or <br/>"),
            )),
        }
    }

    fn finish(mut self) -> Result<Vec<Span>, ParseError> {
        if let Some((tag, at)) = self.open.last() {
            return Err(ParseError::new(
                *at,
                format!("unterminated `<{}>` element", tag.name()),
            ));
        }
        self.flush();
        Ok(self.spans)
    }
}

/// Parses paragraph markup into a list of [`Span`]s.
pub fn parse_markup(input: &str) -> Result<Vec<Span>, ParseError> {
    let mut scanner = Scanner::default();
    let mut index = 0;

    while let Some(ch) = input[index..].chars().next() {
        let rest = &input[index..];
        if ch == '<' {
            let end = rest
                .find('>')
                .ok_or_else(|| ParseError::new(index, "`<` without a matching `>`"))?;
            scanner.tag(&rest[1..end], index)?;
            index += end + 1;
        } else if let Some((entity, decoded)) =
            ENTITIES.iter().find(|(entity, _)| rest.starts_with(*entity))
        {
            scanner.text.push(*decoded);
            index += entity.len();
        } else {
            scanner.text.push(ch);
            index += ch.len_utf8();
        }
    }

    scanner.finish()
}

/// Returns the text of `input` with markup removed and whitespace collapsed.
///
/// Line breaks count as spaces, so `<b>Ko</b>-fi` stays one word.
pub fn plain_text(input: &str) -> Result<String, ParseError> {
    let text: String = parse_markup(input)?
        .iter()
        .map(|span| if span.line_break { " " } else { span.text() })
        .collect();
    Ok(text.split_whitespace().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_text() {
        let spans = parse_markup("Hola mundo").expect("parse succeeds");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text(), "Hola mundo");
        assert!(!spans[0].is_bold());
    }

    #[test]
    fn parse_bold_prefix() {
        let spans = parse_markup("<b>Paso 1:</b> Ve a ko-fi.com").expect("parse succeeds");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text(), "Paso 1:");
        assert!(spans[0].is_bold());
        assert_eq!(spans[1].text(), " Ve a ko-fi.com");
        assert!(!spans[1].is_bold());
    }

    #[test]
    fn parse_nested_styles() {
        let spans = parse_markup("a <b>very <i>cool</i></b>!").expect("parse succeeds");
        assert_eq!(spans.len(), 4);
        assert_eq!(spans[1].text(), "very ");
        assert!(spans[1].is_bold() && !spans[1].is_italic());
        assert_eq!(spans[2].text(), "cool");
        assert!(spans[2].is_bold() && spans[2].is_italic());
        assert_eq!(spans[3].text(), "!");
    }

    #[test]
    fn parse_entities_and_breaks() {
        let spans = parse_markup("A &amp; B<br/>C &lt;3").expect("parse succeeds");
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].text(), "A & B");
        assert!(spans[1].is_line_break());
        assert_eq!(spans[2].text(), "C <3");
    }

    #[test]
    fn bare_ampersand_is_literal() {
        let spans = parse_markup("R&D").expect("parse succeeds");
        assert_eq!(spans[0].text(), "R&D");
    }

    #[test]
    fn plain_text_strips_markup() {
        assert_eq!(
            plain_text("<b>1.</b> Google AdSense").unwrap(),
            "1. Google AdSense"
        );
        assert_eq!(
            plain_text("  <b>Ko</b>-fi<br/>y \n  <i>más</i> ").unwrap(),
            "Ko-fi y más"
        );
    }

    #[test]
    fn error_on_unterminated_bold() {
        let err = parse_markup("x <b>oops").unwrap_err();
        assert!(err.message().contains("unterminated `<b>`"));
        assert_eq!(err.index(), 2);
    }

    #[test]
    fn error_on_mismatched_close() {
        let err = parse_markup("<b>oops</i>").unwrap_err();
        assert_eq!(err.index(), 7);
    }

    #[test]
    fn error_on_unclosed_angle_bracket() {
        let err = parse_markup("1 < 2").unwrap_err();
        assert_eq!(err.index(), 2);
    }

    #[test]
    fn error_on_unknown_tag() {
        let err = parse_markup("<font color=red>x</font>").unwrap_err();
        assert!(err.message().contains("unsupported tag"));
    }
}
