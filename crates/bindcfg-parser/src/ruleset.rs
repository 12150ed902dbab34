//! # Ruleset — Parsed Sources With Verbatim Lines
//!
//! A [`Ruleset`] holds every line of every source in order. Blank lines,
//! remarks and lines that failed to parse are kept next to the parsed
//! directives so [`Ruleset::render`] can reproduce the input exactly.
//!
//! ## Invariant
//!
//! `source_order` of directives strictly increases across the whole
//! ruleset, following source order and then line order.

use bindcfg_core::{Directive, Location};

/// What a line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineContent {
    /// Whitespace only.
    Blank,
    /// A `#` line that is not a commented-out directive.
    Remark,
    /// A directive, active or commented out.
    Directive(Directive),
    /// A line rejected in permissive mode.
    Malformed(String),
}

/// Terminator that ended a source line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
    /// Last line of a source without a final newline.
    None,
}

impl LineEnding {
    /// Split a line with its terminator into text and ending.
    pub fn split(chunk: &str) -> (&str, Self) {
        if let Some(text) = chunk.strip_suffix("\r\n") {
            (text, Self::CrLf)
        } else if let Some(text) = chunk.strip_suffix('\n') {
            (text, Self::Lf)
        } else {
            (chunk, Self::None)
        }
    }

    /// The terminator as written.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::None => "",
        }
    }
}

/// One source line, verbatim, with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulesetLine {
    /// Exact text without the line terminator.
    pub raw: String,
    /// Terminator as it appeared in the source.
    pub ending: LineEnding,
    /// Where the line came from.
    pub location: Location,
    /// Classification.
    pub content: LineContent,
}

/// One rule block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSource {
    /// Source name, usually a file path.
    pub name: String,
    /// Lines in order.
    pub lines: Vec<RulesetLine>,
}

/// All parsed sources, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ruleset {
    sources: Vec<RuleSource>,
    next_order: usize,
}

impl Ruleset {
    /// Empty ruleset.
    pub fn new() -> Self {
        Self::default()
    }

    /// The parsed sources.
    pub fn sources(&self) -> &[RuleSource] {
        &self.sources
    }

    /// Every directive, active or not, in source order.
    pub fn directives(&self) -> impl Iterator<Item = &Directive> {
        self.sources
            .iter()
            .flat_map(|s| s.lines.iter())
            .filter_map(|l| match &l.content {
                LineContent::Directive(d) => Some(d),
                _ => None,
            })
    }

    /// Active directives only.
    pub fn active_directives(&self) -> impl Iterator<Item = &Directive> {
        self.directives().filter(|d| d.active)
    }

    /// Number of directives, active or not.
    pub fn directive_count(&self) -> usize {
        self.directives().count()
    }

    /// Remark lines, verbatim.
    pub fn remarks(&self) -> impl Iterator<Item = &RulesetLine> {
        self.sources
            .iter()
            .flat_map(|s| s.lines.iter())
            .filter(|l| matches!(l.content, LineContent::Remark))
    }

    /// Reproduce the sources byte for byte, line terminators included.
    /// Sources are concatenated in order.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for source in &self.sources {
            out.push_str(&render_lines(&source.lines));
        }
        out
    }

    /// Reproduce one source verbatim.
    pub fn render_source(&self, name: &str) -> Option<String> {
        self.sources
            .iter()
            .find(|s| s.name == name)
            .map(|s| render_lines(&s.lines))
    }

    /// Reserve the next source order.
    pub(crate) fn take_order(&mut self) -> usize {
        let order = self.next_order;
        self.next_order += 1;
        order
    }

    pub(crate) fn push_source(&mut self, source: RuleSource) {
        self.sources.push(source);
    }
}

fn render_lines(lines: &[RulesetLine]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(&line.raw);
        out.push_str(line.ending.as_str());
    }
    out
}
