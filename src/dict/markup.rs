/// Line-prefix markup carried inside provider definition text.
///
/// A definition line starting with `----` is a quoted/secondary line and a
/// line starting with `++++` is a highlighted heading. Anything else is
/// plain prose. There is no escaping: a content line that genuinely starts
/// with one of the prefixes is read as a directive.
use colored::Colorize;

use super::WordItem;

pub const QUOTE_PREFIX: &str = "----";
pub const HIGHLIGHT_PREFIX: &str = "++++";

/// Render style of one decoded definition line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Plain,
    Quote,
    Highlight,
}

/// One decoded line: style plus the text with its prefix stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupLine<'a> {
    pub style: Style,
    pub text: &'a str,
}

/// Classify a single line.
pub fn decode_line(line: &str) -> MarkupLine<'_> {
    if let Some(rest) = line.strip_prefix(QUOTE_PREFIX) {
        MarkupLine {
            style: Style::Quote,
            text: rest,
        }
    } else if let Some(rest) = line.strip_prefix(HIGHLIGHT_PREFIX) {
        MarkupLine {
            style: Style::Highlight,
            text: rest,
        }
    } else {
        MarkupLine {
            style: Style::Plain,
            text: line,
        }
    }
}

/// Split definition text on `\n` and classify every line.
pub fn decode(definition: &str) -> Vec<MarkupLine<'_>> {
    definition.split('\n').map(decode_line).collect()
}

/// Definition text with directive prefixes removed and styles discarded.
pub fn raw_text(definition: &str) -> String {
    decode(definition)
        .iter()
        .map(|line| line.text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prefix-encode a line. Used by providers when building definitions.
pub fn encode_line(style: Style, text: &str) -> String {
    match style {
        Style::Plain => text.to_string(),
        Style::Quote => format!("{QUOTE_PREFIX}{text}"),
        Style::Highlight => format!("{HIGHLIGHT_PREFIX}{text}"),
    }
}

// ── Rendering ────────────────────────────────────────────────────────

/// Which part of a [`WordItem`] a piece of text belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Headword,
    Phonetics,
    Line(Style),
}

/// Walk an item once, handing every output line to `paint`.
///
/// Both the terminal and the raw rendering go through here so the two
/// forms can never drift apart.
fn render_with(item: &WordItem, paint: impl Fn(Part, &str) -> String) -> String {
    let mut out = String::new();
    out.push_str(&paint(Part::Headword, &item.word));
    out.push('\n');

    for define in &item.defines {
        let phonetics = define
            .phonetics
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !phonetics.is_empty() {
            out.push_str(&paint(Part::Phonetics, &phonetics));
            out.push('\n');
        }
        for line in decode(&define.definition) {
            out.push_str(&paint(Part::Line(line.style), line.text));
            out.push('\n');
        }
    }
    out
}

/// Colorized rendering for terminal display.
pub fn render_colored(item: &WordItem) -> String {
    render_with(item, |part, text| match part {
        Part::Headword => text.red().bold().to_string(),
        Part::Phonetics => text.bright_green().to_string(),
        Part::Line(Style::Quote) => text.bright_black().to_string(),
        Part::Line(Style::Highlight) => text.cyan().to_string(),
        Part::Line(Style::Plain) => text.to_string(),
    })
}

/// Plain rendering for non-terminal consumers (no prefixes, no color codes).
pub fn render_raw(item: &WordItem) -> String {
    render_with(item, |_, text| text.to_string())
}
