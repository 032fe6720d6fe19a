//! Greedy line breaking for styled spans.
//!
//! Whitespace collapses to single spaces, lines break between words, and a
//! word wider than the line is split between characters. Widths come from a
//! [`TextMeasure`] so the algorithm does not depend on the PDF backend.

use crate::richtext::Span;

const WIDTH_EPSILON: f64 = 1e-6;

/// Font selection for a run of text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunFont {
    /// Font family name; `None` selects the document default.
    pub family: Option<String>,
    /// Font size in points.
    pub size: u8,
    /// Bold variant.
    pub bold: bool,
    /// Italic variant.
    pub italic: bool,
}

impl RunFont {
    /// Regular variant of `family` at `size`.
    pub fn new(family: Option<String>, size: u8) -> Self {
        Self {
            family,
            size,
            bold: false,
            italic: false,
        }
    }

    fn variant(&self, bold: bool, italic: bool) -> Self {
        Self {
            family: self.family.clone(),
            size: self.size,
            bold,
            italic,
        }
    }
}

/// Source of text widths, in points.
pub trait TextMeasure {
    /// Advance width of `text` set in `font`.
    fn text_width(&self, text: &str, font: &RunFont) -> f64;
}

/// Consecutive text sharing one font.
#[derive(Clone, Debug, PartialEq)]
pub struct Run {
    /// Text, including inner spaces.
    pub text: String,
    /// Font of the run.
    pub font: RunFont,
}

/// One output line.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Line {
    /// Runs in reading order.
    pub runs: Vec<Run>,
    /// Total advance width in points.
    pub width: f64,
}

impl Line {
    /// Concatenated text of all runs.
    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    fn push(&mut self, text: &str, font: &RunFont, width: f64) {
        match self.runs.last_mut() {
            Some(last) if &last.font == font => last.text.push_str(text),
            _ => self.runs.push(Run {
                text: text.to_owned(),
                font: font.clone(),
            }),
        }
        self.width += width;
    }

    fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

#[derive(Debug)]
struct Fragment {
    text: String,
    font: RunFont,
}

#[derive(Debug)]
enum Token {
    Word(Vec<Fragment>),
    Space(RunFont),
    Break,
}

fn tokenize(spans: &[Span], base: &RunFont) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word: Vec<Fragment> = Vec::new();

    fn close_word(word: &mut Vec<Fragment>, tokens: &mut Vec<Token>) {
        if !word.is_empty() {
            tokens.push(Token::Word(std::mem::take(word)));
        }
    }

    for span in spans {
        if span.is_line_break() {
            close_word(&mut word, &mut tokens);
            tokens.push(Token::Break);
            continue;
        }

        let font = base.variant(span.is_bold(), span.is_italic());
        let mut current = String::new();
        for ch in span.text().chars() {
            if ch.is_whitespace() {
                if !current.is_empty() {
                    word.push(Fragment {
                        text: std::mem::take(&mut current),
                        font: font.clone(),
                    });
                }
                close_word(&mut word, &mut tokens);
                if !matches!(tokens.last(), Some(Token::Space(_)) | Some(Token::Break) | None) {
                    tokens.push(Token::Space(font.clone()));
                }
            } else {
                current.push(ch);
            }
        }
        if !current.is_empty() {
            word.push(Fragment {
                text: current,
                font,
            });
        }
    }
    close_word(&mut word, &mut tokens);
    tokens
}

/// Breaks `spans` into lines no wider than `max_width`.
///
/// `base` supplies the family and size; spans only toggle bold and italic.
pub fn wrap(spans: &[Span], base: &RunFont, max_width: f64, measure: &dyn TextMeasure) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut line = Line::default();
    let mut pending_space: Option<RunFont> = None;
    let mut saw_break = false;

    for token in tokenize(spans, base) {
        match token {
            Token::Break => {
                lines.push(std::mem::take(&mut line));
                pending_space = None;
                saw_break = true;
            }
            Token::Space(font) => pending_space = Some(font),
            Token::Word(fragments) => {
                let word_width: f64 = fragments
                    .iter()
                    .map(|fragment| measure.text_width(&fragment.text, &fragment.font))
                    .sum();
                let space_width = match (&pending_space, line.is_empty()) {
                    (Some(font), false) => measure.text_width(" ", font),
                    _ => 0.0,
                };

                if !line.is_empty() && line.width + space_width + word_width > max_width + WIDTH_EPSILON {
                    lines.push(std::mem::take(&mut line));
                } else if space_width > 0.0 {
                    if let Some(font) = &pending_space {
                        line.push(" ", font, space_width);
                    }
                }
                pending_space = None;

                if word_width <= max_width + WIDTH_EPSILON || !line.is_empty() {
                    for fragment in &fragments {
                        let width = measure.text_width(&fragment.text, &fragment.font);
                        line.push(&fragment.text, &fragment.font, width);
                    }
                } else {
                    split_word(&fragments, max_width, measure, &mut line, &mut lines);
                }
            }
        }
    }

    if !line.is_empty() || saw_break {
        lines.push(line);
    }
    lines
}

fn split_word(
    fragments: &[Fragment],
    max_width: f64,
    measure: &dyn TextMeasure,
    line: &mut Line,
    lines: &mut Vec<Line>,
) {
    let mut buf = [0u8; 4];
    for fragment in fragments {
        for ch in fragment.text.chars() {
            let glyph: &str = ch.encode_utf8(&mut buf);
            let width = measure.text_width(glyph, &fragment.font);
            if !line.is_empty() && line.width + width > max_width + WIDTH_EPSILON {
                lines.push(std::mem::take(line));
            }
            line.push(glyph, &fragment.font, width);
        }
    }
}
