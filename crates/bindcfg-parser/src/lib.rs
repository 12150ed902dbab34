//! # bindcfg-parser — Directive Language Parser
//!
//! Turns rule text into a [`Ruleset`]: one typed [`bindcfg_core::Directive`]
//! per directive line, with blank lines, remarks and commented-out
//! directives kept verbatim for round-trip rendering.
//!
//! ```text
//! +comment Geom: curves and surfaces
//! -class@win32 OSD_Process
//! +cguard BRep_Tool::Curve-->Geom
//! # -class Standard_Mutex        (inactive directive)
//! # maintained by the geometry team (remark)
//! ```
//!
//! A line starting with `#` whose remainder parses as a directive becomes an
//! inactive directive; it never affects resolution but keeps its source
//! order slot.

pub mod error;
pub mod grammar;
pub mod parser;
pub mod ruleset;

pub use error::{ParseError, ParseResult};
pub use grammar::{parse_directive, DirectiveParts};
pub use parser::{parse_files, parse_str, ParseMode, ParseOutcome, RulesetParser};
pub use ruleset::{LineContent, LineEnding, RuleSource, Ruleset, RulesetLine};
