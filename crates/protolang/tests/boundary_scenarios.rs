//! End-to-end tests over spec.md §8's boundary scenarios, exercising the
//! full `Compilation` pipeline (`parse` → `validate`, and `codegen` where a
//! scenario is about generated IR rather than a diagnosed error).

use pretty_assertions::assert_eq;
use protolang::error::CompileErrorKind;
use protolang::llvm_backend::LlvmBackend;
use protolang::Compilation;

fn compile(source: &str) -> Compilation {
    let mut c = Compilation::new().expect("fresh session");
    c.parse(source).expect("non-empty input");
    c
}

#[test]
fn scenario_1_top_level_int_literal_generates_alloca_and_store() {
    let mut c = compile("var a : int = 2;");
    assert!(c.validate());

    let context = inkwell::context::Context::create();
    let mut backend = LlvmBackend::new(&context, "scenario1");
    c.codegen(&mut backend).expect("codegen succeeds");

    let ir = backend.print_module();
    assert!(ir.contains("alloca i32"), "expected an i32 alloca in:\n{ir}");
    assert!(ir.contains("store i32 2"), "expected a store of the constant 2 in:\n{ir}");
}

#[test]
fn scenario_2_overload_resolves_by_strict_signature_match() {
    let mut c = compile(
        r"
        func add(x: int, y: int) -> int { return x + y; }
        func add(x: double, y: double) -> double { return x + y; }
        func use_int() -> int { return add(1, 2); }
        func use_double() -> double { return add(1.0, 2.0); }
        ",
    );
    assert!(c.validate(), "diagnostics: {:?}", c.logger.diagnostics());
}

#[test]
fn scenario_3_loose_widening_then_strict_preference() {
    // Only a `long` overload: the `int` argument widens via the loose rule.
    let mut c = compile(
        r"
        func f(x: long) -> int { return 0; }
        func g() -> int { return f(1); }
        ",
    );
    assert!(c.validate(), "diagnostics: {:?}", c.logger.diagnostics());

    // Both `int` and `long` overloads: the strict (`int`) match wins.
    let mut c2 = compile(
        r"
        func f(x: int) -> int { return 1; }
        func f(x: long) -> int { return 2; }
        func g() -> int { return f(1); }
        ",
    );
    assert!(c2.validate(), "diagnostics: {:?}", c2.logger.diagnostics());
}

#[test]
fn scenario_4_return_type_mismatch_is_diagnosed() {
    let mut c = compile("func g() -> int { return 1.0; }");
    assert!(!c.validate());
    assert!(c.logger.has_errors());
    let diagnostics = c.logger.diagnostics();
    assert_eq!(diagnostics.len(), 1, "diagnostics: {diagnostics:?}");
}

#[test]
fn scenario_5_forward_local_reference_rejected_forward_function_allowed() {
    let mut c = compile(
        r"
        func bad() -> int {
            var a : int = a;
            return a;
        }
        ",
    );
    assert!(!c.validate());
    assert!(c.logger.has_errors());

    let mut c2 = compile(
        r"
        func first() -> int { return second(); }
        func second() -> int { return 1; }
        ",
    );
    assert!(c2.validate(), "diagnostics: {:?}", c2.logger.diagnostics());
}

#[test]
fn scenario_6_redefinition_rules() {
    let mut dup_var = compile(
        r"
        func f() -> int {
            var a : int = 1;
            var a : int = 2;
            return a;
        }
        ",
    );
    assert!(!dup_var.validate());
    assert!(dup_var.logger.has_errors());

    let mut dup_func = compile(
        r"
        func h(x: int) -> int { return x; }
        func h(x: int) -> int { return x; }
        ",
    );
    assert!(!dup_func.validate());
    assert!(dup_func.logger.has_errors());

    let mut overload_func = compile(
        r"
        func h(x: int) -> int { return x; }
        func h(x: double) -> double { return x; }
        ",
    );
    assert!(overload_func.validate(), "diagnostics: {:?}", overload_func.logger.diagnostics());
}

#[test]
fn empty_input_is_reported() {
    let mut c = Compilation::new().expect("fresh session");
    let err = c.parse("   \n  ").expect_err("blank source is EMPTY_INPUT");
    assert_eq!(err.kind, CompileErrorKind::EmptyInput);
}
