//! # Directive Grammar
//!
//! Splits one directive line into sign, verb, optional platform qualifier,
//! target and payload, and checks the payload against the verb's shape.
//! The verb table is [`DirectiveKind::ALL`]; nothing here lists verbs a
//! second time.

use bindcfg_core::{normalize, DirectiveKind, Payload, Shape};

/// The typed content of one directive line, before position is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveParts {
    pub kind: DirectiveKind,
    pub target: String,
    pub payload: Payload,
    pub platform: Option<String>,
}

/// Whether a trimmed line starts like a directive.
pub fn looks_like_directive(line: &str) -> bool {
    line.starts_with('+') || line.starts_with('-')
}

/// Parse a trimmed directive line. The error is a human-readable reason.
pub fn parse_directive(line: &str) -> Result<DirectiveParts, String> {
    let mut chars = line.chars();
    let sign = chars
        .next()
        .filter(|c| *c == '+' || *c == '-')
        .ok_or_else(|| "directive must start with `+` or `-`".to_string())?;
    let rest = chars.as_str();

    let (verb_token, body) = match rest.find(char::is_whitespace) {
        Some(i) => (&rest[..i], rest[i..].trim()),
        None => (rest, ""),
    };
    let (verb, platform) = match verb_token.split_once('@') {
        Some((verb, platform)) => {
            let platform = platform.trim();
            if platform.is_empty() {
                return Err(format!("empty platform qualifier on `{sign}{verb}`"));
            }
            (verb, Some(platform.to_string()))
        }
        None => (verb_token, None),
    };

    let candidates: Vec<DirectiveKind> = DirectiveKind::ALL
        .iter()
        .copied()
        .filter(|k| k.sign() == sign && k.verb() == verb)
        .collect();
    let Some(&first) = candidates.first() else {
        return Err(format!("unknown verb `{sign}{verb}`"));
    };
    if platform.is_some() && !first.supports_platform() {
        return Err(format!("`{sign}{verb}` does not accept a platform qualifier"));
    }
    if body.is_empty() {
        return Err(format!("`{sign}{verb}` requires a target"));
    }

    let (target, value) = split_body(first, body)?;
    let kind = if first == DirectiveKind::SortPriority && value.contains('=') {
        DirectiveKind::SymbolPriority
    } else {
        first
    };
    let payload = payload_for(kind, value)?;
    check_target(kind, target)?;

    Ok(DirectiveParts {
        kind,
        target: target.to_string(),
        payload,
        platform,
    })
}

/// Split `body` according to the kind's shape. Bare kinds return an empty
/// value.
fn split_body(kind: DirectiveKind, body: &str) -> Result<(&str, &str), String> {
    let split = match kind.shape() {
        Shape::Bare => return Ok((body, "")),
        // Import guards are written with `:` but `-->` is accepted as well.
        Shape::Colon if kind == DirectiveKind::ImportGuard && body.contains("-->") => {
            body.split_once("-->")
        }
        Shape::Colon => split_single_colon(body),
        Shape::Arrow => body.split_once("-->"),
    };
    let expected = match kind.shape() {
        Shape::Arrow => "<target>--><value>",
        _ => "<target>: <value>",
    };
    let (target, value) = split.ok_or_else(|| {
        format!(
            "`{}{}` expects `{expected}`",
            kind.sign(),
            kind.verb()
        )
    })?;
    let (target, value) = (target.trim(), value.trim());
    if target.is_empty() {
        return Err(format!("`{}{}` requires a target", kind.sign(), kind.verb()));
    }
    if value.is_empty() {
        return Err(format!("`{}{}` requires a value after the separator", kind.sign(), kind.verb()));
    }
    Ok((target, value))
}

/// Split at the first `:` that is not half of a `::` scope separator.
fn split_single_colon(body: &str) -> Option<(&str, &str)> {
    let bytes = body.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b':' {
            if bytes.get(i + 1) == Some(&b':') {
                i += 2;
                continue;
            }
            return Some((&body[..i], &body[i + 1..]));
        }
        i += 1;
    }
    None
}

fn payload_for(kind: DirectiveKind, value: &str) -> Result<Payload, String> {
    use DirectiveKind as K;
    Ok(match kind {
        K::HeaderAdd | K::HeaderRemove => Payload::Header(value.to_string()),
        K::PyNameOverride => Payload::PythonName(value.to_string()),
        K::SortPriority => Payload::Priority(parse_priority(value)?),
        K::SymbolPriority => {
            let (pattern, priority) = value
                .rsplit_once('=')
                .ok_or_else(|| "expected `<pattern>=<integer>`".to_string())?;
            let pattern = pattern.trim();
            if pattern.is_empty() {
                return Err("empty symbol pattern before `=`".to_string());
            }
            Payload::PatternPriority {
                pattern: pattern.to_string(),
                priority: parse_priority(priority)?,
            }
        }
        K::ImportGuard | K::CallGuard | K::ImportExclude => {
            if value.contains(char::is_whitespace) {
                return Err(format!("module name {value:?} contains whitespace"));
            }
            Payload::Module(value.to_string())
        }
        K::Patch => {
            let (find, replace) = value
                .split_once("-->")
                .ok_or_else(|| "expected `<find>--><replace>`".to_string())?;
            let find = find.trim();
            if find.is_empty() {
                return Err("empty search text before `-->`".to_string());
            }
            Payload::Replacement {
                find: find.to_string(),
                replace: replace.trim().to_string(),
            }
        }
        K::TopComment
        | K::ReturnPolicy
        | K::KeepAlive
        | K::BeforeModule
        | K::BeforeType
        | K::AfterType
        | K::BaseExclude
        | K::CompilerArg => Payload::Text(value.to_string()),
        _ => Payload::None,
    })
}

fn parse_priority(raw: &str) -> Result<i64, String> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| format!("expected integer priority, found {:?}", raw.trim()))
}

/// Name targets must normalize; paths, header files, platforms and return
/// type patterns are taken as written.
fn check_target(kind: DirectiveKind, target: &str) -> Result<(), String> {
    match kind {
        DirectiveKind::IncludeDir
        | DirectiveKind::HeaderBan
        | DirectiveKind::CompilerArg
        | DirectiveKind::ReturnTypeExclude => Ok(()),
        _ => normalize(target)
            .map(|_| ())
            .map_err(|e| format!("invalid target: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(line: &str) -> DirectiveParts {
        parse_directive(line).unwrap_or_else(|e| panic!("{line:?}: {e}"))
    }

    #[test]
    fn test_bare_exclusions() {
        let p = parts("-class Geom_Curve");
        assert_eq!(p.kind, DirectiveKind::ClassExclude);
        assert_eq!(p.target, "Geom_Curve");
        assert_eq!(p.payload, Payload::None);

        assert_eq!(parts("-module   TKQADraw ").target, "TKQADraw");
        assert_eq!(parts("-function* DumpJson").kind, DirectiveKind::FunctionNameExclude);
        assert_eq!(parts("-header* Standard_Mutex.hxx").kind, DirectiveKind::HeaderBan);
        assert_eq!(parts("+nodelete Standard_Transient").kind, DirectiveKind::NoDelete);
    }

    #[test]
    fn test_platform_qualifier() {
        let p = parts("-class@win32 OSD_Process");
        assert_eq!(p.kind, DirectiveKind::ClassExclude);
        assert_eq!(p.platform.as_deref(), Some("win32"));
        assert!(parse_directive("-module@win32 Foo").is_err());
        assert!(parse_directive("-class@ Foo").is_err());
    }

    #[test]
    fn test_colon_payloads() {
        let p = parts("+header BRepMesh: BRepMesh_Circle.hxx");
        assert_eq!(p.target, "BRepMesh");
        assert_eq!(p.payload, Payload::Header("BRepMesh_Circle.hxx".into()));

        let p = parts("-base BRepMesh_Delaun::Foo: Standard_Transient");
        assert_eq!(p.target, "BRepMesh_Delaun::Foo");
        assert_eq!(p.payload, Payload::Text("Standard_Transient".into()));

        let p = parts("+comment TKernel: note: keep this");
        assert_eq!(p.payload, Payload::Text("note: keep this".into()));
    }

    #[test]
    fn test_sort_forms() {
        let p = parts("+sort gp: 0");
        assert_eq!(p.kind, DirectiveKind::SortPriority);
        assert_eq!(p.payload, Payload::Priority(0));

        let p = parts("+sort TColgp: HArray1=5");
        assert_eq!(p.kind, DirectiveKind::SymbolPriority);
        assert_eq!(
            p.payload,
            Payload::PatternPriority {
                pattern: "HArray1".into(),
                priority: 5
            }
        );

        assert!(parse_directive("+sort gp: first").is_err());
        assert!(parse_directive("+sort gp 3").is_err());
        assert!(parse_directive("+sort gp: =3").is_err());
    }

    #[test]
    fn test_guards() {
        let p = parts("+iguard Geom: GeomAdaptor");
        assert_eq!(p.kind, DirectiveKind::ImportGuard);
        assert_eq!(p.payload, Payload::Module("GeomAdaptor".into()));

        let p = parts("+iguard Geom-->GeomAdaptor");
        assert_eq!(p.target, "Geom");
        assert_eq!(p.payload, Payload::Module("GeomAdaptor".into()));

        let p = parts("+cguard BRep_Tool::Curve(TopoDS_Edge)-->Geom");
        assert_eq!(p.kind, DirectiveKind::CallGuard);
        assert_eq!(p.target, "BRep_Tool::Curve(TopoDS_Edge)");

        assert!(parse_directive("+cguard BRep_Tool::Curve: Geom").is_err());
    }

    #[test]
    fn test_arrow_payloads() {
        let p = parts("+pname Geom_Curve::Value-->value_at");
        assert_eq!(p.payload, Payload::PythonName("value_at".into()));
        let p = parts("+keep_alive BRepBuilderAPI_Sewing::Add-->1, 2");
        assert_eq!(p.payload, Payload::Text("1, 2".into()));
        assert!(parse_directive("+pname Foo-->").is_err());
    }

    #[test]
    fn test_type_text_and_patch_payloads() {
        let p = parts("+before_type gp_Pnt-->// points");
        assert_eq!(p.kind, DirectiveKind::BeforeType);
        assert_eq!(p.payload, Payload::Text("// points".into()));
        assert_eq!(parts("+after_type gp_Pnt-->x").kind, DirectiveKind::AfterType);

        let p = parts("+patch BRepMesh: std::pair<int, int>--> std::tuple<int, int>");
        assert_eq!(p.kind, DirectiveKind::Patch);
        assert_eq!(p.target, "BRepMesh");
        assert_eq!(
            p.payload,
            Payload::Replacement {
                find: "std::pair<int, int>".into(),
                replace: "std::tuple<int, int>".into()
            }
        );
        let p = parts("+patch BRepMesh: obsolete-->");
        assert_eq!(
            p.payload,
            Payload::Replacement {
                find: "obsolete".into(),
                replace: String::new()
            }
        );
        assert!(parse_directive("+patch BRepMesh: no arrow").is_err());
        assert!(parse_directive("+patch BRepMesh: -->x").is_err());
    }

    #[test]
    fn test_return_type_pattern_taken_as_written() {
        let p = parts("-rtype const Handle(Standard_Transient)&");
        assert_eq!(p.kind, DirectiveKind::ReturnTypeExclude);
        assert_eq!(p.target, "const Handle(Standard_Transient)&");
        assert_eq!(p.payload, Payload::None);
    }

    #[test]
    fn test_scope_colons_are_not_separators() {
        assert!(split_single_colon("Foo::Bar").is_none());
        assert_eq!(split_single_colon("Foo::Bar: X"), Some(("Foo::Bar", " X")));
    }

    #[test]
    fn test_unknown_verb_and_missing_target() {
        let err = parse_directive("+frobnicate Foo").unwrap_err();
        assert!(err.contains("unknown verb"));
        assert!(parse_directive("-class").is_err());
        assert!(parse_directive("-class   ").is_err());
        assert!(parse_directive("class Foo").is_err());
    }

    #[test]
    fn test_invalid_target_rejected() {
        assert!(parse_directive("-class Foo<int").is_err());
        assert!(parse_directive("-class Foo::::Bar").is_err());
    }

    #[test]
    fn test_include_and_arg_take_text() {
        let p = parts("+include /opt/occt/include/opencascade");
        assert_eq!(p.kind, DirectiveKind::IncludeDir);
        let p = parts("+arg win32: -DWNT");
        assert_eq!(p.target, "win32");
        assert_eq!(p.payload, Payload::Text("-DWNT".into()));
    }

    #[test]
    fn test_every_kind_renders_back_to_itself() {
        let lines = [
            "-module TKQADraw",
            "-class@linux Foo",
            "-function Foo::Bar(int)",
            "-function* DumpJson",
            "-enum Foo_Kind",
            "-typedef Foo_Handle",
            "-field Foo::myX",
            "+header Foo: Foo_Bar.hxx",
            "-header Foo: Foo_Baz.hxx",
            "-header* Standard_Mutex.hxx",
            "+immutable gp_Pnt",
            "+nodelete Standard_Transient",
            "+pname Foo::Bar-->bar",
            "+sort Foo: 3",
            "+sort Foo: HArray=2",
            "+iguard Foo: Bar",
            "+cguard Foo::Bar-->Baz",
            "-import Foo: Bar",
            "-base Foo_A: Foo_B",
            "+comment Foo: hello",
            "+return_policy Foo::Bar-->reference_internal",
            "+keep_alive Foo::Bar-->1, 2",
            "+before_module Foo-->import Bar",
            "+before_type Foo_A-->py::class_<Foo_B>(mod, \"Foo_B\");",
            "+after_type Foo_A-->cls_Foo_A.def(\"Extra\", &Extra);",
            "+patch Foo: Standard_Real&-->double&",
            "-rtype Handle(Foo_*)&",
            "+split Foo",
            "+opaque Foo_List",
            "+nested Foo_Inner",
            "+downcast Foo_Base",
            "+skip Foo::Bar",
            "+include /usr/include",
            "+arg linux: -fPIC",
        ];
        for line in lines {
            let p = parts(line);
            let d = bindcfg_core::Directive {
                kind: p.kind,
                target: p.target,
                payload: p.payload,
                source_order: 0,
                active: true,
                platform: p.platform,
                location: bindcfg_core::Location::new("t", 1),
            };
            assert_eq!(d.to_line(), line);
        }
    }
}
