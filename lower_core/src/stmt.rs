// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Statement lowering (spec §4.5). Each handler threads the current
//! `Context`, emitting into whatever block happens to be open and leaving
//! exactly one block open on return — the fall-through continuation.

use oxc_ast::ast as oxc;

use crate::ast::{Atom, Stmt as OutStmt, ERROR};
use crate::context::Context;
use crate::error::{LowerError, LowerResult};
use crate::expr::lower_expr;

pub fn lower_stmt(cx: &mut Context, stmt: &oxc::Statement) -> LowerResult<()> {
    let locked_before = cx.locked_temps();
    lower_stmt_inner(cx, stmt)?;
    if cx.locked_temps() != locked_before {
        return Err(LowerError::InvariantViolated(
            "statement handler leaked a locked temporary",
        ));
    }
    Ok(())
}

fn lower_stmt_inner(cx: &mut Context, stmt: &oxc::Statement) -> LowerResult<()> {
    match stmt {
        oxc::Statement::ExpressionStatement(expr_stmt) => {
            let value = lower_expr(cx, &expr_stmt.expression)?;
            cx.free_atom(&value);
            Ok(())
        }
        oxc::Statement::BlockStatement(block) => lower_statements(cx, &block.body),
        oxc::Statement::EmptyStatement(_) => Ok(()),
        oxc::Statement::DebuggerStatement(_) => {
            cx.emit(OutStmt::Debugger);
            Ok(())
        }
        oxc::Statement::VariableDeclaration(decl) => lower_var_decl(cx, decl),
        oxc::Statement::FunctionDeclaration(func) => lower_function_decl(cx, func),
        oxc::Statement::IfStatement(if_stmt) => lower_if(cx, if_stmt),
        oxc::Statement::WhileStatement(while_stmt) => lower_while(cx, while_stmt, None),
        oxc::Statement::DoWhileStatement(do_stmt) => lower_do_while(cx, do_stmt, None),
        oxc::Statement::ForStatement(for_stmt) => lower_for(cx, for_stmt, None),
        oxc::Statement::BreakStatement(brk) => {
            cx.insert_break(brk.label.as_ref().map(|l| l.name.as_str()));
            Ok(())
        }
        oxc::Statement::ContinueStatement(cont) => {
            cx.insert_continue(cont.label.as_ref().map(|l| l.name.as_str()))
        }
        oxc::Statement::ReturnStatement(ret) => {
            let value = match &ret.argument {
                Some(expr) => lower_expr(cx, expr)?,
                None => Atom::Undefined,
            };
            cx.free_atom(&value);
            cx.emit_assign(crate::ast::RESULT, value);
            cx.insert_pending_return();
            Ok(())
        }
        oxc::Statement::ThrowStatement(throw) => {
            let value = lower_expr(cx, &throw.argument)?;
            cx.free_atom(&value);
            cx.emit_assign(crate::ast::ERROR, value);
            cx.insert_pending_throw();
            Ok(())
        }
        oxc::Statement::LabeledStatement(labeled) => lower_labeled(cx, labeled),
        oxc::Statement::SwitchStatement(switch) => lower_switch(cx, switch),
        oxc::Statement::TryStatement(try_stmt) => lower_try(cx, try_stmt),
        oxc::Statement::WithStatement(_) => Err(LowerError::UnsupportedNode { kind: "WithStatement" }),
        _ => Err(LowerError::UnsupportedNode {
            kind: "Statement (unsupported variant)",
        }),
    }
}

fn lower_statements(cx: &mut Context, stmts: &[oxc::Statement]) -> LowerResult<()> {
    for stmt in stmts {
        lower_stmt(cx, stmt)?;
    }
    Ok(())
}

fn lower_var_decl(cx: &mut Context, decl: &oxc::VariableDeclaration) -> LowerResult<()> {
    for declarator in &decl.declarations {
        let oxc::BindingPatternKind::BindingIdentifier(ident) = &declarator.id.kind else {
            return Err(LowerError::UnsupportedNode {
                kind: "destructuring BindingPattern",
            });
        };
        cx.declare_var(ident.name.as_str());
        if let Some(init) = &declarator.init {
            let value = lower_expr(cx, init)?;
            cx.free_atom(&value);
            cx.emit_assign(ident.name.as_str(), value);
        }
    }
    Ok(())
}

fn lower_function_decl(cx: &mut Context, func: &oxc::Function) -> LowerResult<()> {
    let name = func
        .id
        .as_ref()
        .ok_or(LowerError::InvariantViolated(
            "function declaration missing a name",
        ))?
        .name
        .to_string();
    let lowered = crate::lower_function_body(func)?;
    cx.defer_function_init(name, lowered);
    Ok(())
}

/// `if (test) then [else alt]` (spec §4.5 `IfStatement`): a conditional
/// branch into the consequent, with a pending join back into the single
/// fall-through continuation.
fn lower_if(cx: &mut Context, if_stmt: &oxc::IfStatement) -> LowerResult<()> {
    let test = lower_expr(cx, &if_stmt.test)?;
    cx.free_atom(&test);
    let branch_id = cx.create_branch(test)?;

    lower_stmt(cx, &if_stmt.consequent)?;
    let join_id = cx.insert_pending_goto();

    let else_block = cx.current_block();
    cx.resolve_else(branch_id, else_block)?;
    if let Some(alternate) = &if_stmt.alternate {
        lower_stmt(cx, alternate)?;
    }
    let after = cx.open_block();
    cx.resolve_goto(join_id, after)?;
    Ok(())
}

/// `while (test) body`, optionally labeled (spec §4.5 `WhileStatement`).
/// Header block re-evaluates `test` on every iteration, doubling as the
/// `continue` target — known up front, unlike `do`/`for`.
fn lower_while(cx: &mut Context, while_stmt: &oxc::WhileStatement, label: Option<String>) -> LowerResult<()> {
    let header_id = cx.insert_pending_goto();
    let header = cx.current_block();
    cx.resolve_goto(header_id, header)?;

    cx.push_label_frame(label, true, Some(header));
    let test = lower_expr(cx, &while_stmt.test)?;
    cx.free_atom(&test);
    let branch_id = cx.create_branch(test)?;

    lower_stmt(cx, &while_stmt.body)?;
    let back_id = cx.insert_pending_goto();
    cx.resolve_goto(back_id, header)?;

    let exit = cx.current_block();
    cx.resolve_else(branch_id, exit)?;
    cx.pop_label_frame(exit)?;
    Ok(())
}

/// `do body while (test)`, optionally labeled (spec §4.5
/// `DoWhileStatement`). The body always runs once before the first test;
/// `continue` re-enters at the test, not the body, but the test's block
/// doesn't exist until after the body is lowered, so continues seen inside
/// the body queue and are patched once it opens.
fn lower_do_while(cx: &mut Context, do_stmt: &oxc::DoWhileStatement, label: Option<String>) -> LowerResult<()> {
    let body_id = cx.insert_pending_goto();
    let body_label = cx.current_block();
    cx.resolve_goto(body_id, body_label)?;

    cx.push_label_frame(label, true, None);
    lower_stmt(cx, &do_stmt.body)?;

    let test_goto = cx.insert_pending_goto();
    let test_label = cx.current_block();
    cx.resolve_goto(test_goto, test_label)?;
    cx.resolve_pending_continues(test_label)?;

    let test = lower_expr(cx, &do_stmt.test)?;
    cx.free_atom(&test);
    let branch_id = cx.create_branch(test)?;
    let back_id = cx.insert_pending_goto();
    cx.resolve_goto(back_id, body_label)?;

    let exit = cx.current_block();
    cx.resolve_else(branch_id, exit)?;
    cx.pop_label_frame(exit)?;
    Ok(())
}

/// `for (init; test; update) body`, optionally labeled (spec §4.5
/// `ForStatement`). `continue` targets the update block, matching
/// ECMAScript's per-iteration update semantics; like `do`, that block's
/// label isn't known until the body has been lowered.
fn lower_for(cx: &mut Context, for_stmt: &oxc::ForStatement, label: Option<String>) -> LowerResult<()> {
    if let Some(init) = &for_stmt.init {
        match init {
            oxc::ForStatementInit::VariableDeclaration(decl) => lower_var_decl(cx, decl)?,
            other => {
                let expr = other.as_expression().ok_or(LowerError::UnsupportedNode {
                    kind: "ForStatementInit",
                })?;
                let value = lower_expr(cx, expr)?;
                cx.free_atom(&value);
            }
        }
    }

    let header_id = cx.insert_pending_goto();
    let header = cx.current_block();
    cx.resolve_goto(header_id, header)?;

    let branch_id = match &for_stmt.test {
        Some(test) => {
            let test = lower_expr(cx, test)?;
            cx.free_atom(&test);
            Some(cx.create_branch(test)?)
        }
        None => None,
    };

    cx.push_label_frame(label, true, None);
    lower_stmt(cx, &for_stmt.body)?;

    let to_update_id = cx.insert_pending_goto();
    let update_label = cx.current_block();
    cx.resolve_goto(to_update_id, update_label)?;
    cx.resolve_pending_continues(update_label)?;

    if let Some(update) = &for_stmt.update {
        let value = lower_expr(cx, update)?;
        cx.free_atom(&value);
    }
    let back_id = cx.insert_pending_goto();
    cx.resolve_goto(back_id, header)?;

    let exit = cx.current_block();
    if let Some(branch_id) = branch_id {
        cx.resolve_else(branch_id, exit)?;
    }
    cx.pop_label_frame(exit)?;
    Ok(())
}

/// A `LabeledStatement` around a loop attaches the label to that loop's own
/// frame (so `continue label;` works); around anything else it introduces a
/// label usable only by `break` (spec §4.5 `LabeledStatement`).
fn lower_labeled(cx: &mut Context, labeled: &oxc::LabeledStatement) -> LowerResult<()> {
    let label = labeled.label.name.to_string();
    match &labeled.body {
        oxc::Statement::WhileStatement(while_stmt) => lower_while(cx, while_stmt, Some(label)),
        oxc::Statement::DoWhileStatement(do_stmt) => lower_do_while(cx, do_stmt, Some(label)),
        oxc::Statement::ForStatement(for_stmt) => lower_for(cx, for_stmt, Some(label)),
        other => {
            cx.push_label_frame(Some(label), false, None);
            lower_stmt(cx, other)?;
            let exit = cx.open_block();
            cx.pop_label_frame(exit)
        }
    }
}

/// `switch (disc) { case ...: ...; default: ...; }` (spec §4.5
/// `SwitchStatement`): each `case`'s test is a chained `===` comparison
/// against the discriminant, evaluated top to bottom; the first match jumps
/// into the corresponding body, and bodies fall through to the next case's
/// body exactly as ECMAScript's own fallthrough does. `default` sits in
/// source order among the comparisons (its test is simply skipped) but is
/// also the landing site once every comparison has missed.
fn lower_switch(cx: &mut Context, switch: &oxc::SwitchStatement) -> LowerResult<()> {
    let disc = lower_expr(cx, &switch.discriminant)?;
    cx.push_label_frame(None, false, None);

    // The discriminant is read once per `case` comparison (spec §4.3's
    // worked example of a multiply-reused temp); reserve one reference per
    // comparison up front and release one each time a comparison consumes
    // its clone below.
    let comparison_count = switch.cases.iter().filter(|c| c.test.is_some()).count();
    if comparison_count == 0 {
        cx.free_atom(&disc);
    } else {
        for _ in 1..comparison_count {
            cx.bump_atom(&disc);
        }
    }

    let has_default = switch.cases.iter().any(|case| case.test.is_none());
    let mut body_gotos = Vec::with_capacity(switch.cases.len());

    for case in &switch.cases {
        match &case.test {
            Some(test_expr) => {
                let test_value = lower_expr(cx, test_expr)?;
                cx.free_atom(&test_value);
                let matches = cx.use_temp_var();
                cx.emit_assign(
                    matches.to_string(),
                    crate::ast::Expr::Binary {
                        op: "===",
                        lhs: disc.clone(),
                        rhs: test_value,
                    },
                );
                cx.free_atom(&disc);
                let branch_id = cx.create_branch(Atom::ident(matches.to_string()))?;
                cx.free_temp_var(matches);
                body_gotos.push(Some(cx.insert_pending_goto()));
                let next_test = cx.current_block();
                cx.resolve_else(branch_id, next_test)?;
            }
            None => {
                // `default` has no comparison of its own, so it must not
                // consume or terminate the chain block a later `case` still
                // needs for its own test — its body has no dedicated
                // incoming jump here; it's wired up below, alongside the
                // no-match landing pad, once its body position is known.
                body_gotos.push(None);
            }
        }
    }

    // Every comparison missed: land on `default`'s body if there is one
    // (resolved below, once its position is known), else skip the switch
    // entirely.
    let no_match_goto = cx.insert_pending_goto();

    for (case, body_goto) in switch.cases.iter().zip(&body_gotos) {
        let body_label = cx.current_block();
        match body_goto {
            Some(goto) => cx.resolve_goto(*goto, body_label)?,
            None => cx.resolve_goto(no_match_goto, body_label)?,
        }
        lower_statements(cx, &case.consequent)?;
        let to_next = cx.insert_pending_goto();
        let next = cx.current_block();
        cx.resolve_goto(to_next, next)?;
    }
    let exit = cx.current_block();

    if !has_default {
        cx.resolve_goto(no_match_goto, exit)?;
    }

    cx.pop_label_frame(exit)
}

/// `try { ... } [catch (e) { ... }] [finally { ... }]` (spec §4.5
/// `TryStatement`). Every throw recorded on `pending_throws` so far — from
/// this try body, or from any unrelated code lowered earlier in this same
/// function that hasn't reached a `catch` yet — resolves to the handler's
/// entry block once it opens (see `Context::open_catch_handler`); it's one
/// flat per-function queue (spec §3), not one scoped to each `try`. The
/// normal (non-throwing) path reaches the same point by falling through and
/// jumping past the handler.
///
/// `finally` is only inlined on this normal/post-catch join, matching the
/// original tool's literal (if surprising) behavior rather than "fixing"
/// it: a thrown value that escapes the try body with no local `handler`, or
/// a `return`/`break`/`continue` that leaves the try or catch body early,
/// does not re-run the finalizer.
fn lower_try(cx: &mut Context, try_stmt: &oxc::TryStatement) -> LowerResult<()> {
    match &try_stmt.handler {
        Some(handler) => {
            lower_statements(cx, &try_stmt.block.body)?;
            let skip_handler = cx.insert_pending_goto();

            cx.open_catch_handler()?;
            let binding = match handler.param.as_ref().map(|p| &p.pattern.kind) {
                Some(oxc::BindingPatternKind::BindingIdentifier(ident)) => {
                    let name = ident.name.to_string();
                    cx.declare_var(name.as_str());
                    let saved = cx.shadow_var(name.as_str(), Atom::ident(ERROR));
                    Some((name, saved))
                }
                _ => None,
            };
            cx.emit_assign(ERROR, Atom::Undefined);
            lower_statements(cx, &handler.body.body)?;
            if let Some((name, saved)) = binding {
                cx.unshadow_var(&name, saved);
            }

            let after = cx.open_block();
            cx.resolve_goto(skip_handler, after)?;
        }
        None => lower_statements(cx, &try_stmt.block.body)?,
    }

    if let Some(finalizer) = &try_stmt.finalizer {
        lower_statements(cx, &finalizer.body)?;
    }

    Ok(())
}
