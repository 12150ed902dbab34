//! Round-trip and file-loading tests for the rule parser.

use std::io::Write;

use bindcfg_core::DirectiveKind;
use bindcfg_parser::{parse_files, parse_str, ParseMode};
use proptest::prelude::*;

const GEOMETRY_RULES: &str = "\
# ---------------------------------------------------------------------------
# Geometry
+comment Geom: curves and surfaces
+header Geom: Geom_Curve.hxx
   -class@win32   OSD_Process
+pname Geom_Curve::Value-->value_at

# -class Geom_Surface
+iguard Geom: GeomAdaptor
+cguard BRep_Tool::Curve-->Geom
+sort Geom: 4
\t
";

#[test]
fn render_reproduces_input_verbatim() {
    let out = parse_str("geom.rules", GEOMETRY_RULES, ParseMode::Strict).unwrap();
    assert_eq!(out.ruleset.render(), GEOMETRY_RULES);
}

#[test]
fn canonical_lines_normalize_spacing() {
    let out = parse_str("geom.rules", GEOMETRY_RULES, ParseMode::Strict).unwrap();
    let lines: Vec<String> = out.ruleset.directives().map(|d| d.to_line()).collect();
    assert!(lines.contains(&"-class@win32 OSD_Process".to_string()));
    assert!(lines.contains(&"# -class Geom_Surface".to_string()));
}

#[test]
fn files_parse_in_argument_order() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("TKernel.rules");
    let second = dir.path().join("TKMath.rules");
    std::fs::File::create(&first)
        .unwrap()
        .write_all(b"+sort Standard: 0\n-class Standard_Mutex\n")
        .unwrap();
    std::fs::File::create(&second)
        .unwrap()
        .write_all(b"+sort gp: 1\n")
        .unwrap();

    let out = parse_files(&[&first, &second], ParseMode::Strict).unwrap();
    let kinds: Vec<(DirectiveKind, usize)> = out
        .ruleset
        .directives()
        .map(|d| (d.kind, d.source_order))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (DirectiveKind::SortPriority, 0),
            (DirectiveKind::ClassExclude, 1),
            (DirectiveKind::SortPriority, 2),
        ]
    );
    assert_eq!(out.ruleset.sources().len(), 2);
    assert_eq!(
        out.ruleset.render(),
        "+sort Standard: 0\n-class Standard_Mutex\n+sort gp: 1\n"
    );
}

#[test]
fn crlf_source_without_final_newline_round_trips() {
    let text = "-class Foo\r\n# note\r\n\r\n+sort gp: 1";
    let out = parse_str("w", text, ParseMode::Strict).unwrap();
    assert_eq!(out.ruleset.directive_count(), 2);
    let classes: Vec<&str> = out.ruleset.directives().map(|d| d.target.as_str()).collect();
    assert_eq!(classes, vec!["Foo", "gp"]);
    assert_eq!(out.ruleset.render(), text);
}

fn rule_line() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Z][a-z]{1,6}_[A-Z][a-z]{1,6}".prop_map(|n| format!("-class {n}")),
        "[A-Z][a-z]{1,6}".prop_map(|m| format!("+sort {m}: 3")),
        "[A-Z][a-z]{1,6}".prop_map(|m| format!("# -module {m}")),
        "[a-z ]{0,20}".prop_map(|t| format!("# {t}")),
        Just(String::new()),
        "[a-z]{1,8}".prop_map(|junk| format!("+{junk}zz X")),
    ]
}

fn line_ending() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("\n"), Just("\r\n")]
}

proptest! {
    /// Rendering a permissively parsed ruleset reproduces every byte,
    /// whatever the line endings and whether the last line is terminated.
    #[test]
    fn permissive_render_round_trips(
        lines in prop::collection::vec((rule_line(), line_ending()), 0..30),
        final_newline in any::<bool>(),
    ) {
        let mut text = String::new();
        for (i, (line, ending)) in lines.iter().enumerate() {
            text.push_str(line);
            if final_newline || i + 1 < lines.len() {
                text.push_str(ending);
            }
        }
        let out = parse_str("p", &text, ParseMode::Permissive).unwrap();
        prop_assert_eq!(out.ruleset.render(), text);
    }

    /// Directive source orders strictly increase.
    #[test]
    fn source_order_strictly_increases(lines in prop::collection::vec(rule_line(), 0..30)) {
        let out = parse_str("p", &lines.join("\n"), ParseMode::Permissive).unwrap();
        let orders: Vec<usize> = out.ruleset.directives().map(|d| d.source_order).collect();
        prop_assert!(orders.windows(2).all(|w| w[0] < w[1]));
    }
}
