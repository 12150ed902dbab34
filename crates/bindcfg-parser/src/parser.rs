//! # Ruleset Parser
//!
//! Classifies every line of one or more rule sources and produces a
//! [`Ruleset`]. In [`ParseMode::Strict`] the first malformed line aborts
//! parsing; in [`ParseMode::Permissive`] malformed lines are collected and
//! kept verbatim in the ruleset.

use std::path::Path;

use bindcfg_core::{Directive, Location};
use tracing::{debug, info};

use crate::error::{ParseError, ParseResult};
use crate::grammar::{looks_like_directive, parse_directive};
use crate::ruleset::{LineContent, LineEnding, RuleSource, Ruleset, RulesetLine};

/// How malformed lines are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Stop at the first malformed line.
    Strict,
    /// Record the error and keep going.
    #[default]
    Permissive,
}

/// A parsed ruleset and the errors collected on the way.
#[derive(Debug)]
pub struct ParseOutcome {
    pub ruleset: Ruleset,
    pub errors: Vec<ParseError>,
}

impl ParseOutcome {
    /// Whether every line parsed.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Incremental parser over several sources.
#[derive(Debug, Default)]
pub struct RulesetParser {
    mode: ParseMode,
    ruleset: Ruleset,
    errors: Vec<ParseError>,
}

impl RulesetParser {
    /// Create a parser.
    pub fn new(mode: ParseMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Parse one source and append it to the ruleset.
    ///
    /// # Errors
    ///
    /// In strict mode, returns the first [`ParseError::MalformedDirective`];
    /// the source is not added.
    pub fn add_source(&mut self, name: &str, text: &str) -> ParseResult<()> {
        let mut lines = Vec::new();
        let mut directives = 0usize;
        for (idx, chunk) in text.split_inclusive('\n').enumerate() {
            let (raw, ending) = LineEnding::split(chunk);
            let location = Location::new(name, idx + 1);
            let content = match self.classify(raw, &location) {
                Ok(content) => content,
                Err(err) if self.mode == ParseMode::Strict => return Err(err),
                Err(err) => {
                    debug!(%location, error = %err, "skipping malformed line");
                    let reason = match &err {
                        ParseError::MalformedDirective { reason, .. } => reason.clone(),
                        ParseError::Io { .. } => err.to_string(),
                    };
                    self.errors.push(err);
                    LineContent::Malformed(reason)
                }
            };
            if matches!(content, LineContent::Directive(_)) {
                directives += 1;
            }
            lines.push(RulesetLine {
                raw: raw.to_string(),
                ending,
                location,
                content,
            });
        }
        info!(source = name, lines = lines.len(), directives, "parsed rule source");
        self.ruleset.push_source(RuleSource {
            name: name.to_string(),
            lines,
        });
        Ok(())
    }

    /// Read a file and parse it as one source named by its path.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Io`] if the file cannot be read, and strict-mode
    /// parse errors as [`RulesetParser::add_source`].
    pub fn add_file(&mut self, path: &Path) -> ParseResult<()> {
        let text = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.add_source(&path.display().to_string(), &text)
    }

    /// Finish and return the ruleset with any collected errors.
    pub fn finish(self) -> ParseOutcome {
        ParseOutcome {
            ruleset: self.ruleset,
            errors: self.errors,
        }
    }

    fn classify(&mut self, raw: &str, location: &Location) -> ParseResult<LineContent> {
        let line = raw.trim();
        if line.is_empty() {
            return Ok(LineContent::Blank);
        }
        if let Some(commented) = line.strip_prefix('#') {
            let inner = commented.trim_start_matches('#').trim();
            if looks_like_directive(inner) {
                if let Ok(parts) = parse_directive(inner) {
                    return Ok(LineContent::Directive(
                        self.directive(parts, false, location),
                    ));
                }
            }
            return Ok(LineContent::Remark);
        }
        match parse_directive(line) {
            Ok(parts) => Ok(LineContent::Directive(self.directive(parts, true, location))),
            Err(reason) => Err(ParseError::MalformedDirective {
                location: location.clone(),
                raw: raw.to_string(),
                reason,
            }),
        }
    }

    fn directive(
        &mut self,
        parts: crate::grammar::DirectiveParts,
        active: bool,
        location: &Location,
    ) -> Directive {
        Directive {
            kind: parts.kind,
            target: parts.target,
            payload: parts.payload,
            source_order: self.ruleset.take_order(),
            active,
            platform: parts.platform,
            location: location.clone(),
        }
    }
}

/// Parse a single source.
///
/// # Errors
///
/// In strict mode, returns the first malformed line.
pub fn parse_str(name: &str, text: &str, mode: ParseMode) -> ParseResult<ParseOutcome> {
    let mut parser = RulesetParser::new(mode);
    parser.add_source(name, text)?;
    Ok(parser.finish())
}

/// Parse several files into one ruleset, in the given order.
///
/// # Errors
///
/// Returns [`ParseError::Io`] for unreadable files and, in strict mode, the
/// first malformed line.
pub fn parse_files<P: AsRef<Path>>(paths: &[P], mode: ParseMode) -> ParseResult<ParseOutcome> {
    let mut parser = RulesetParser::new(mode);
    for path in paths {
        parser.add_file(path.as_ref())?;
    }
    Ok(parser.finish())
}
