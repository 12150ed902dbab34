//! End-to-end resolution behavior of the policy pipeline.

use std::sync::Arc;

use bindcfg_core::{DiagnosticKind, IntrospectedSymbol, Severity, SymbolKind};
use bindcfg_graph::{GuardCoverage, Placement};
use bindcfg_policy::{Engine, EngineConfig, GenerationInputs, PolicyError, ResolvedPolicy};

fn triangle() -> GenerationInputs {
    GenerationInputs::from_modules(["A", "B", "C"])
        .with_dependency("A", "B")
        .with_dependency("B", "C")
        .with_dependency("C", "A")
}

fn resolve(config: EngineConfig, rules: &str, inputs: &GenerationInputs) -> Result<ResolvedPolicy, PolicyError> {
    Engine::new(config).resolve_str("rules", rules, inputs)
}

fn permissive(rules: &str) -> ResolvedPolicy {
    resolve(EngineConfig::default(), rules, &GenerationInputs::default()).unwrap()
}

// ---------------------------------------------------------------------------
// Precedence and inactive lines
// ---------------------------------------------------------------------------

#[test]
fn later_rename_wins() {
    let p = permissive("+pname Geom_Curve-->Curve\n+pname Geom_Curve-->GeomCurve\n");
    assert_eq!(p.python_name_override("Geom_Curve").as_deref(), Some("GeomCurve"));
}

#[test]
fn commented_directive_is_inert_but_rendered() {
    let rules = "-class Foo\n# -class Foo\n# -class Bar\n";
    let p = permissive(rules);
    assert!(p.is_class_excluded("Foo"));
    assert!(!p.is_class_excluded("Bar"));
    assert_eq!(p.ruleset().render(), rules);
}

#[test]
fn exclusions_are_monotonic() {
    // No directive re-includes a class once excluded.
    let p = permissive("-class Foo\n+immutable Foo\n");
    assert!(p.is_class_excluded("Foo"));
    assert!(p.is_immutable("Foo"));
}

#[test]
fn template_rule_matches_instantiation() {
    let p = permissive("-function NCollection_DataMap<TheKeyType, TheItemType, Hasher>::Seek\n");
    assert!(p.is_function_excluded("NCollection_DataMap<int,string,Hash>::Seek"));
    assert!(!p.is_function_excluded("NCollection_DataMap<int,string,Hash>::Find"));
}

#[test]
fn static_method_addressed_by_underscore() {
    let p = permissive("-function BRepMesh_GeomTool::IntLinLin_\n");
    let static_method = IntrospectedSymbol::new(SymbolKind::StaticMethod, "BRepMesh_GeomTool::IntLinLin")
        .with_signature("(gp_XY,gp_XY)");
    let instance_method = IntrospectedSymbol::new(SymbolKind::Method, "BRepMesh_GeomTool::IntLinLin")
        .with_signature("(gp_XY,gp_XY)");
    assert!(p.is_symbol_excluded(&static_method));
    assert!(!p.is_symbol_excluded(&instance_method));
}

#[test]
fn platform_qualified_exclusion() {
    let rules = "-class@win32 Foo\n";
    let linux = resolve(
        EngineConfig::default().with_platform("linux"),
        rules,
        &GenerationInputs::default(),
    )
    .unwrap();
    let windows = resolve(
        EngineConfig::default().with_platform("win32"),
        rules,
        &GenerationInputs::default(),
    )
    .unwrap();
    assert!(!linux.is_class_excluded("Foo"));
    assert!(windows.is_class_excluded("Foo"));
}

#[test]
fn type_text_patch_and_return_type_rules_resolve_strictly() {
    let rules = "\
-rtype Handle(Geom_*)&
+before_type Geom_Curve-->// curves
+after_type Geom_Curve-->// end of curves
+patch Geom: Standard_Real-->double
";
    let p = resolve(EngineConfig::release(), rules, &GenerationInputs::default()).unwrap();
    assert!(p.diagnostics().is_empty());
    assert!(p.is_return_type_excluded("Handle(Geom_Curve)&"));
    assert_eq!(p.before_type("Geom_Curve"), vec!["// curves"]);
    assert_eq!(p.after_type("Geom_Curve"), vec!["// end of curves"]);
    assert_eq!(p.patch_source("Geom", "Standard_Real u;"), "double u;");
    assert_eq!(p.ruleset().render(), rules);
}

// ---------------------------------------------------------------------------
// Guards and cycles
// ---------------------------------------------------------------------------

#[test]
fn fully_guarded_cycle_resolves_strictly() {
    let rules = "+iguard A: B\n+iguard B: C\n+cguard C_Tool::Make-->A\n";
    let p = resolve(EngineConfig::release(), rules, &triangle()).unwrap();
    assert_eq!(p.diagnostics().of_kind(DiagnosticKind::UnbrokenCycle).count(), 0);
    let placements: Vec<(&str, Placement)> = p
        .guard_placements()
        .iter()
        .map(|g| (g.from.as_str(), g.placement))
        .collect();
    assert_eq!(
        placements,
        vec![("A", Placement::Declaration), ("B", Placement::Declaration), ("C", Placement::CallSite)]
    );
    assert_eq!(p.guards_for("C").len(), 1);
    assert_eq!(p.generation_order().len(), 3);
}

#[test]
fn removing_one_guard_is_one_error_naming_the_edge() {
    let rules = "+iguard A: B\n+iguard B: C\n";
    let err = resolve(EngineConfig::release(), rules, &triangle()).unwrap_err();
    let diags = err.diagnostics().unwrap();
    let cycles: Vec<_> = diags.of_kind(DiagnosticKind::UnbrokenCycle).collect();
    assert_eq!(cycles.len(), 1);
    assert!(cycles[0].message.contains("edge C -> A"));
    assert_eq!(cycles[0].severity, Severity::Error);
}

#[test]
fn unbroken_cycle_is_a_warning_when_permissive() {
    let p = resolve(EngineConfig::default(), "+iguard A: B\n", &triangle()).unwrap();
    let cycles: Vec<_> = p.diagnostics().of_kind(DiagnosticKind::UnbrokenCycle).collect();
    assert_eq!(cycles.len(), 2);
    assert!(cycles.iter().all(|d| d.severity == Severity::Warning));
    // Still a total order over every module.
    assert_eq!(p.generation_order().len(), 3);
}

#[test]
fn any_edge_coverage_needs_one_guard() {
    let config = EngineConfig {
        guard_coverage: GuardCoverage::AnyEdge,
        ..EngineConfig::release()
    };
    assert!(resolve(config.clone(), "+iguard C: A\n", &triangle()).is_ok());
    assert!(resolve(config, "", &triangle()).is_err());
}

#[test]
fn redundant_guard_warns_and_prefers_declaration() {
    let inputs = GenerationInputs::default().with_dependency("A", "B").with_dependency("B", "A");
    let rules = "+iguard A: B\n+iguard B: A\n+cguard B_Tool::Get-->A\n";
    let p = resolve(EngineConfig::release(), rules, &inputs).unwrap();
    let redundant: Vec<_> = p.diagnostics().of_kind(DiagnosticKind::RedundantGuard).collect();
    assert_eq!(redundant.len(), 1);
    assert_eq!(redundant[0].location.as_ref().map(|l| l.line), Some(3));
    let ba = p.guard_placements().iter().find(|g| g.from == "B").unwrap();
    assert_eq!(ba.placement, Placement::Declaration);
    assert!(ba.redundant);
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[test]
fn explicit_priorities_then_alphabetical() {
    let inputs = GenerationInputs::from_modules(["zeta", "alpha", "Beta"]);
    let p = resolve(EngineConfig::release(), "+sort A: 0\n+sort B: 1\n", &inputs).unwrap();
    assert_eq!(p.generation_order(), ["A", "B", "alpha", "Beta", "zeta"]);
}

#[test]
fn order_is_topological_over_unguarded_edges() {
    let inputs = GenerationInputs::from_modules(["Standard", "gp", "Geom", "BRep"])
        .with_dependency("Geom", "gp")
        .with_dependency("gp", "Standard")
        .with_dependency("BRep", "Geom")
        .with_dependency("Geom", "BRep");
    // One guard breaks the Geom/BRep cycle; the unguarded edge still orders.
    let config = EngineConfig {
        guard_coverage: GuardCoverage::AnyEdge,
        ..EngineConfig::release()
    };
    let p = resolve(config, "+iguard Geom: BRep\n", &inputs).unwrap();
    let order = p.generation_order();
    let pos = |m: &str| order.iter().position(|o| o == m).unwrap();
    assert!(pos("Standard") < pos("gp"));
    assert!(pos("gp") < pos("Geom"));
    assert!(pos("Geom") < pos("BRep"));
}

#[test]
fn ordering_conflict_fatal_only_when_strict() {
    let inputs = GenerationInputs::default().with_dependency("A", "B");
    let rules = "+sort A: 0\n+sort B: 5\n";
    let err = resolve(EngineConfig::release(), rules, &inputs).unwrap_err();
    assert_eq!(
        err.diagnostics().unwrap().of_kind(DiagnosticKind::OrderingConflict).count(),
        1
    );

    let p = resolve(EngineConfig::default(), rules, &inputs).unwrap();
    assert_eq!(p.generation_order(), ["B", "A"]);
    assert!(!p.diagnostics().has_errors());
}

#[test]
fn excluded_modules_are_not_ordered() {
    let inputs = GenerationInputs::from_modules(["gp", "IVtk", "Geom"]);
    let p = resolve(EngineConfig::release(), "-module IVtk\n", &inputs).unwrap();
    assert_eq!(p.generation_order(), ["Geom", "gp"]);
    assert!(p.is_module_excluded("IVtk"));
}

// ---------------------------------------------------------------------------
// Validation, fingerprint, sharing
// ---------------------------------------------------------------------------

#[test]
fn unknown_symbols_warn_even_when_strict() {
    let inputs = GenerationInputs::from_modules(["Geom"])
        .with_symbol(IntrospectedSymbol::new(SymbolKind::Class, "Geom_Curve"));
    let p = resolve(EngineConfig::release(), "-class Geom_Curve\n-class Geom_Curvee\n", &inputs).unwrap();
    let unknown: Vec<_> = p.diagnostics().of_kind(DiagnosticKind::UnknownSymbol).collect();
    assert_eq!(unknown.len(), 1);
    assert_eq!(unknown[0].severity, Severity::Warning);

    let quiet = EngineConfig {
        validate_symbols: false,
        ..EngineConfig::release()
    };
    let p = resolve(quiet, "-class Geom_Curvee\n", &inputs).unwrap();
    assert!(p.diagnostics().is_empty());
}

#[test]
fn fingerprint_ignores_remarks_and_inactive_lines() {
    let inputs = triangle();
    let base = "+iguard A: B\n+iguard B: C\n+iguard C: A\n-class Foo\n";
    let decorated = "# geometry rules\n+iguard A: B\n\n+iguard B: C\n# -class Bar\n+iguard C: A\n-class Foo\n";
    let a = resolve(EngineConfig::release(), base, &inputs).unwrap();
    let b = resolve(EngineConfig::release(), decorated, &inputs).unwrap();
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert!(a.fingerprint().to_string().starts_with("sha256:"));

    let changed = resolve(EngineConfig::release(), &format!("{base}-class Bar\n"), &inputs).unwrap();
    assert_ne!(a.fingerprint(), changed.fingerprint());
}

#[test]
fn multiple_rule_files_continue_source_order() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("TKernel.rules");
    let second = dir.path().join("TKG3d.rules");
    std::fs::write(&first, "+pname Geom_Curve-->Early\n").unwrap();
    std::fs::write(&second, "+pname Geom_Curve-->Late\n").unwrap();
    let p = Engine::default()
        .resolve_files(&[&first, &second], &GenerationInputs::default())
        .unwrap();
    assert_eq!(p.python_name_override("Geom_Curve").as_deref(), Some("Late"));

    let e = p.explain("Geom_Curve");
    assert_eq!(e.directives.len(), 2);
    assert!(e.directives[1].location.source.ends_with("TKG3d.rules"));
}

#[test]
fn resolved_policy_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ResolvedPolicy>();

    let policy = Arc::new(permissive("-class Foo\n"));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let policy = Arc::clone(&policy);
            std::thread::spawn(move || policy.is_class_excluded("Foo"))
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
