// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end lowering tests (spec §8): parses a snippet with `oxc_parser`,
//! runs it through `lower_core`, and checks the resulting `Program` against
//! the universal properties and the concrete scenarios.

use lower_core::{Program, Stmt};
use oxc_allocator::Allocator;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use pretty_assertions::assert_eq;

fn lower(src: &str) -> Program {
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_typescript(false);
    let parsed = Parser::new(&allocator, src, source_type).parse();
    assert!(parsed.errors.is_empty(), "{src:?} failed to parse: {:?}", parsed.errors);

    let semantic = SemanticBuilder::new().with_check_syntax_error(true).build(&parsed.program);
    assert!(semantic.errors.is_empty(), "{src:?} has semantic errors: {:?}", semantic.errors);

    lower_core::lower_program(&parsed.program).unwrap_or_else(|err| panic!("{src:?} failed to lower: {err}"))
}

/// Block labels are a contiguous `B0..Bn-1` range, each appearing exactly
/// once, and every block's statements contain no leftover unresolved jump
/// (spec §8 "Label uniqueness", "No dangling jumps").
fn assert_well_formed(program: &Program) {
    for (i, block) in program.blocks.iter().enumerate() {
        assert_eq!(block.label, i as u32, "block {i} has a non-contiguous label");
        for stmt in &block.body {
            assert!(
                !matches!(stmt, Stmt::PendingGoto(_)),
                "block {i} still has an unresolved goto after lowering"
            );
        }
    }
}

/// Every identifier used in an assignment target or helper-call argument is
/// either a declared scope variable (which includes the synthetic
/// `__RESULT`/`__ERROR`, pre-declared by every `Context`), the `undefined`
/// sentinel, or one of the four helper names (spec §8 "Scope closure").
fn assert_scope_closed(program: &Program) {
    use lower_core::{Atom, Expr};

    fn is_closed(name: &str, declared: &[String]) -> bool {
        declared.iter().any(|d| d == name) || matches!(name, "undefined" | "GOTO" | "GET_PROPERTY" | "SET_PROPERTY" | "CALL")
    }

    fn check_atom(atom: &Atom, declared: &[String]) {
        if let Atom::Ident(name) = atom {
            assert!(is_closed(name, declared), "identifier {name:?} escapes scope closure");
        }
        if let Atom::Function(func) = atom {
            assert_scope_closed(&func.body);
        }
    }

    fn check_expr(expr: &Expr, declared: &[String]) {
        match expr {
            Expr::Atom(atom) => check_atom(atom, declared),
            Expr::Binary { lhs, rhs, .. } => {
                check_atom(lhs, declared);
                check_atom(rhs, declared);
            }
            Expr::Unary { operand, .. } => check_atom(operand, declared),
            Expr::Conditional { test, then, els } => {
                check_atom(test, declared);
                check_expr(then, declared);
                check_expr(els, declared);
            }
            Expr::Label(_) => {}
            Expr::Call { args, .. } => {
                for arg in args {
                    check_expr(arg, declared);
                }
            }
        }
    }

    for block in &program.blocks {
        for stmt in &block.body {
            match stmt {
                Stmt::Assign { target, value } => {
                    assert!(is_closed(target, &program.scope_vars), "assignment target {target:?} escapes scope closure");
                    check_expr(value, &program.scope_vars);
                }
                Stmt::Expr(expr) => check_expr(expr, &program.scope_vars),
                Stmt::Debugger | Stmt::PendingGoto(_) => {}
            }
        }
    }
}

#[test]
fn if_else_calls_both_branches_with_throw_checks() {
    let program = lower("if (a) { b(); } else { c(); }");
    assert_well_formed(&program);
    assert_scope_closed(&program);

    let rendered = program.to_string();
    assert!(rendered.contains("GET_PROPERTY(\"undefined\", \"b\")") || rendered.contains("CALL("), "expected a CALL/GET_PROPERTY helper invocation in:\n{rendered}");
    assert!(rendered.contains("__ERROR"), "expected an implicit throw-check in:\n{rendered}");
}

#[test]
fn while_with_break_jumps_past_the_loop() {
    let program = lower("while (a) { if (b) break; c(); }");
    assert_well_formed(&program);
    assert_scope_closed(&program);
    // loop-head, body-test, break target, back-edge, exit: several blocks
    assert!(program.blocks.len() >= 4, "expected at least 4 blocks, got {}", program.blocks.len());
}

#[test]
fn try_catch_shadows_error_and_clears_it() {
    let program = lower("try { f(); } catch (e) { g(e); }");
    assert_well_formed(&program);
    assert_scope_closed(&program);
    assert!(program.scope_vars.iter().any(|v| v == "e"), "catch binding `e` must be a declared scope var");

    let rendered = program.to_string();
    assert!(rendered.contains("e = __ERROR"), "catch binding must take on __ERROR's value:\n{rendered}");
    assert!(rendered.contains("__ERROR = undefined"), "handler must clear __ERROR:\n{rendered}");
}

#[test]
fn pending_throws_is_one_flat_queue_swept_by_the_next_catch() {
    // spec §3 models `pendingThrows` as one flat per-function list: a throw
    // still outstanding from code lowered *before* a `try` gets swept into
    // that `try`'s `catch` too, not just throws from inside the try body.
    use lower_core::{Atom, Expr};

    let program = lower("g(); try { h(); } catch (e) { recover(); }");
    assert_well_formed(&program);
    assert_scope_closed(&program);

    let catch_entry = program
        .blocks
        .iter()
        .find(|b| {
            b.body.iter().any(|stmt| {
                matches!(
                    stmt,
                    Stmt::Assign { target, value }
                        if target == "e" && matches!(value, Expr::Atom(Atom::Ident(n)) if n == "__ERROR")
                )
            })
        })
        .expect("no catch entry block found")
        .label;
    let catch_label = format!("B{catch_entry}");

    let jumps_to_catch = program
        .blocks
        .iter()
        .filter(|b| {
            b.body.iter().any(|stmt| {
                matches!(
                    stmt,
                    Stmt::Expr(Expr::Call { callee, args })
                        if *callee == "GOTO" && matches!(args.as_slice(), [Expr::Label(l)] if *l == catch_label)
                )
            })
        })
        .count();

    assert!(
        jumps_to_catch >= 2,
        "expected both `g()`'s and `h()`'s throw-checks to land on the catch handler, found {jumps_to_catch}"
    );
}

#[test]
fn uncaught_throw_in_try_without_handler_reaches_epilogue() {
    // No `catch`, so a throw from `f()` must escape straight to the
    // function epilogue rather than being swallowed silently.
    let program = lower("try { f(); } finally { cleanup(); }");
    assert_well_formed(&program);
    assert_scope_closed(&program);
}

#[test]
fn switch_chains_strict_equality_and_falls_through_to_default() {
    let program = lower("switch (x) { case 1: a(); break; case 2: b(); default: c(); }");
    assert_well_formed(&program);
    assert_scope_closed(&program);

    let rendered = program.to_string();
    assert!(rendered.contains("=== 1"), "expected a `=== 1` comparison in:\n{rendered}");
    assert!(rendered.contains("=== 2"), "expected a `=== 2` comparison in:\n{rendered}");
}

#[test]
fn switch_case_after_default_still_gets_its_comparison() {
    // `default` sitting between two real cases must not break the
    // reject-chain the later case's `=== 2` comparison needs to reach.
    let program = lower("switch (x) { case 1: a(); break; default: z(); case 2: b(); }");
    assert_well_formed(&program);
    assert_scope_closed(&program);

    let rendered = program.to_string();
    assert!(rendered.contains("=== 1"), "expected a `=== 1` comparison in:\n{rendered}");
    assert!(rendered.contains("=== 2"), "expected `case 2`'s `=== 2` comparison to survive in:\n{rendered}");
}

#[test]
fn for_loop_continue_targets_the_update_block() {
    let program = lower("for (var i = 0; i < 10; i++) { if (i === 5) continue; }");
    assert_well_formed(&program);
    assert_scope_closed(&program);
    assert!(program.scope_vars.iter().any(|v| v == "i"));
}

#[test]
fn nested_calls_thread_result_into_return() {
    let program = lower("function f() { return g(h()); }");
    assert_well_formed(&program);
    assert_scope_closed(&program);
    assert!(program.scope_vars.iter().any(|v| v == "__RESULT"), "__RESULT must be a declared scope var");
    assert!(program.scope_vars.iter().any(|v| v == "__ERROR"), "__ERROR must be a declared scope var");

    let rendered = program.to_string();
    assert!(rendered.contains("function f"), "expected the hoisted function value in:\n{rendered}");
    assert!(rendered.contains("__RESULT"), "expected the return path to assign __RESULT:\n{rendered}");
}

#[test]
fn method_call_reuses_receiver_temp_for_call_and_lookup() {
    // `obj.method()`: `obj` is read twice (once for GET_PROPERTY, once as
    // the CALL receiver) — exercises the refcounted temp reuse directly
    // (spec §4.3, §4.4 "thisExpr").
    let program = lower("obj.method();");
    assert_well_formed(&program);
    assert_scope_closed(&program);
}

#[test]
fn disallowed_expression_kinds_fail_lowering() {
    // Spec §6's "Supported as expressions" list is closed; `&&`/`||`, `?:`,
    // and comma-sequencing all fall outside it and must fail rather than
    // lower (spec §1, §7).
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_typescript(false);

    for (src, expected_kind) in [
        ("a && b();", "LogicalExpression"),
        ("a || b();", "LogicalExpression"),
        ("a ? b() : c();", "ConditionalExpression"),
        ("a(), b();", "SequenceExpression"),
    ] {
        let parsed = Parser::new(&allocator, src, source_type).parse();
        assert!(parsed.errors.is_empty(), "{src:?} failed to parse: {:?}", parsed.errors);

        let err = lower_core::lower_program(&parsed.program).expect_err(&format!("{src:?} should fail to lower"));
        match err {
            lower_core::LowerError::UnsupportedNode { kind } => {
                assert_eq!(kind, expected_kind, "{src:?} failed with the wrong node kind");
            }
            other => panic!("{src:?} should fail with UnsupportedNode, got {other}"),
        }
    }
}

#[test]
fn labeled_loop_break_and_continue_target_the_right_frame() {
    let program = lower("outer: for (var i = 0; i < 3; i++) { for (var j = 0; j < 3; j++) { if (j === 1) continue outer; if (i === 2) break outer; } }");
    assert_well_formed(&program);
    assert_scope_closed(&program);
}

#[test]
fn assignment_to_member_target_compiles_to_set_property() {
    let program = lower("obj.x = 1;");
    assert_well_formed(&program);
    assert_scope_closed(&program);
    assert!(program.to_string().contains("SET_PROPERTY"));
}

#[test]
fn every_statement_handler_leaves_temps_balanced() {
    // A broad sweep of constructs that each allocate and should each fully
    // release their own temporaries (spec §8 "Balanced temps") — if any
    // handler leaked a lock, `lower_program` itself would already have
    // returned an `InvariantViolated` error inside `lower()`'s non-empty
    // label-stack and locked-temps checks.
    let program = lower(
        r#"
        function f(a, b) {
            var x = a + b * 2;
            var y = a.y;
            if (x > 0) {
                x = obj.method(a, b);
            } else {
                x = y;
            }
            for (var i = 0; i < x; i++) {
                switch (i) {
                    case 0:
                        continue;
                    default:
                        x = x - 1;
                }
            }
            try {
                return f(x, x);
            } catch (e) {
                throw e;
            }
        }
        "#,
    );
    assert_well_formed(&program);
    assert_scope_closed(&program);
}
