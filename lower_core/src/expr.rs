// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Expression lowering (spec §4.4). Every lowered expression bottoms out in
//! an `Atom` — a value a caller can freely copy into more than one place —
//! by stashing intermediate results in temporaries.

use oxc_ast::ast as oxc;

use crate::ast::{self, Atom, CALL, ERROR, GET_PROPERTY, SET_PROPERTY};
use crate::context::Context;
use crate::error::{LowerError, LowerResult};

/// Lowers `expr`, returning an atom that denotes its value. The atom is
/// either reused directly (an identifier or literal) or a fresh temp
/// holding a computed result.
pub fn lower_expr(cx: &mut Context, expr: &oxc::Expression) -> LowerResult<Atom> {
    match expr {
        oxc::Expression::Identifier(ident) => Ok(Atom::ident(ident.name.as_str())),
        oxc::Expression::NumericLiteral(lit) => Ok(Atom::Number(lit.value)),
        oxc::Expression::StringLiteral(lit) => Ok(Atom::String(lit.value.to_string())),
        oxc::Expression::BooleanLiteral(lit) => Ok(Atom::Bool(lit.value)),
        oxc::Expression::NullLiteral(_) => Ok(Atom::Null),

        oxc::Expression::ParenthesizedExpression(paren) => lower_expr(cx, &paren.expression),

        oxc::Expression::FunctionExpression(func) => lower_function_expr(func),

        oxc::Expression::BinaryExpression(bin) => {
            let lhs = lower_expr(cx, &bin.left)?;
            let rhs = lower_expr(cx, &bin.right)?;
            cx.free_atom(&lhs);
            cx.free_atom(&rhs);
            let temp = cx.use_temp_var();
            cx.emit_assign(
                temp.to_string(),
                ast::Expr::Binary {
                    op: binary_op_str(bin.operator),
                    lhs,
                    rhs,
                },
            );
            Ok(Atom::ident(temp.to_string()))
        }

        oxc::Expression::LogicalExpression(_) => Err(LowerError::UnsupportedNode {
            kind: "LogicalExpression",
        }),

        oxc::Expression::UnaryExpression(unary) => {
            let operand = lower_expr(cx, &unary.argument)?;
            cx.free_atom(&operand);
            let temp = cx.use_temp_var();
            cx.emit_assign(
                temp.to_string(),
                ast::Expr::Unary {
                    op: unary_op_str(unary.operator),
                    operand,
                },
            );
            Ok(Atom::ident(temp.to_string()))
        }

        oxc::Expression::ConditionalExpression(_) => Err(LowerError::UnsupportedNode {
            kind: "ConditionalExpression",
        }),

        oxc::Expression::AssignmentExpression(assign) => lower_assignment(cx, assign),

        oxc::Expression::UpdateExpression(update) => lower_update(cx, update),

        oxc::Expression::SequenceExpression(_) => Err(LowerError::UnsupportedNode {
            kind: "SequenceExpression",
        }),

        oxc::Expression::StaticMemberExpression(member) => {
            let object = lower_expr(cx, &member.object)?;
            let key = Atom::String(member.property.name.to_string());
            lower_get_property(cx, object, key)
        }

        oxc::Expression::ComputedMemberExpression(member) => {
            let object = lower_expr(cx, &member.object)?;
            let key = lower_expr(cx, &member.expression)?;
            lower_get_property(cx, object, key)
        }

        oxc::Expression::CallExpression(call) => lower_call(cx, call),

        _ => Err(LowerError::UnsupportedNode {
            kind: "Expression (unsupported variant)",
        }),
    }
}

/// Lowers `GET_PROPERTY(object, key)` plus its implicit throw-check (spec
/// §4.4 "helper call"): assign the call's result into `__RESULT`, copy that
/// into a fresh temp, then branch on whether `__ERROR` is set.
fn lower_get_property(cx: &mut Context, object: Atom, key: Atom) -> LowerResult<Atom> {
    cx.free_atom(&object);
    cx.free_atom(&key);
    emit_throwing_call(cx, GET_PROPERTY, vec![object.into(), key.into()])
}

fn lower_set_property(cx: &mut Context, object: Atom, key: Atom, value: Atom) -> LowerResult<Atom> {
    cx.free_atom(&object);
    cx.free_atom(&key);
    cx.free_atom(&value);
    emit_throwing_call(cx, SET_PROPERTY, vec![object.into(), key.into(), value.into()])
}

/// Emits a call to one of the three helpers that can throw
/// (`GET_PROPERTY`/`SET_PROPERTY`/`CALL`), then the implicit check required
/// after each one: if `__ERROR` is set, the current function unwinds toward
/// its epilogue; otherwise control falls through with the call's result in
/// a temp.
fn emit_throwing_call(cx: &mut Context, callee: &'static str, args: Vec<ast::Expr>) -> LowerResult<Atom> {
    let temp = cx.use_temp_var();
    cx.emit_assign(temp.to_string(), ast::Expr::Call { callee, args });

    // The "then" arm (error taken) is entered and immediately abandoned via
    // a pending-throw jump; block writer leaves us with a fresh empty block
    // open, which becomes the "no error" continuation.
    let branch_id = cx.create_branch(Atom::ident(ERROR))?;
    cx.insert_pending_throw();
    let after = cx.open_block();
    cx.resolve_else(branch_id, after)?;

    Ok(Atom::ident(temp.to_string()))
}

fn lower_call(cx: &mut Context, call: &oxc::CallExpression) -> LowerResult<Atom> {
    // `object` is read twice for a method call — once to look up the method
    // via `GET_PROPERTY`, once again as the receiver passed to `CALL` — so
    // it needs a second outstanding reference before the clone, matching
    // the two `free_atom`s that eventually consume it (one inside
    // `lower_get_property`, one below alongside `receiver`).
    let (receiver, callee) = match &call.callee {
        oxc::Expression::StaticMemberExpression(member) => {
            let object = lower_expr(cx, &member.object)?;
            let key = Atom::String(member.property.name.to_string());
            cx.bump_atom(&object);
            let method = lower_get_property(cx, object.clone(), key)?;
            (object, method)
        }
        oxc::Expression::ComputedMemberExpression(member) => {
            let object = lower_expr(cx, &member.object)?;
            let key = lower_expr(cx, &member.expression)?;
            cx.bump_atom(&object);
            let method = lower_get_property(cx, object.clone(), key)?;
            (object, method)
        }
        other => (Atom::Undefined, lower_expr(cx, other)?),
    };

    cx.free_atom(&receiver);
    cx.free_atom(&callee);
    let mut args = vec![callee.into(), receiver.into()];
    for arg in &call.arguments {
        match arg {
            oxc::Argument::SpreadElement(_) => {
                return Err(LowerError::UnsupportedNode {
                    kind: "SpreadElement",
                })
            }
            _ => {
                let expr = arg.as_expression().ok_or(LowerError::UnsupportedNode {
                    kind: "Argument (non-expression)",
                })?;
                let value = lower_expr(cx, expr)?;
                cx.free_atom(&value);
                args.push(value.into());
            }
        }
    }

    emit_throwing_call(cx, CALL, args)
}

/// `i++`/`++i`/`i--`/`--i` (spec §8 scenario 5) desugars to `i = i + 1` /
/// `i = i - 1`; this subset never reads the expression's own pre- vs.
/// post-increment value, so prefix and postfix forms lower identically.
fn lower_update(cx: &mut Context, update: &oxc::UpdateExpression) -> LowerResult<Atom> {
    let oxc::SimpleAssignmentTarget::AssignmentTargetIdentifier(ident) = &update.argument else {
        return Err(LowerError::UnsupportedNode {
            kind: "UpdateExpression (non-identifier target)",
        });
    };
    let name = ident.name.to_string();
    let op = match update.operator {
        oxc::UpdateOperator::Increment => "+",
        oxc::UpdateOperator::Decrement => "-",
    };
    let temp = cx.use_temp_var();
    cx.emit_assign(
        temp.to_string(),
        ast::Expr::Binary {
            op,
            lhs: Atom::ident(name.as_str()),
            rhs: Atom::Number(1.0),
        },
    );
    cx.emit_assign(name.as_str(), Atom::ident(temp.to_string()));
    cx.free_temp_var(temp);
    Ok(Atom::ident(name))
}

fn lower_assignment(cx: &mut Context, assign: &oxc::AssignmentExpression) -> LowerResult<Atom> {
    let value = lower_expr(cx, &assign.right)?;

    if !matches!(assign.operator, oxc::AssignmentOperator::Assign) {
        return Err(LowerError::UnsupportedNode {
            kind: "compound AssignmentExpression operator",
        });
    }

    let simple = assign.left.as_simple_assignment_target().ok_or(
        LowerError::UnsupportedNode {
            kind: "AssignmentTarget (destructuring pattern)",
        },
    )?;

    match simple {
        oxc::SimpleAssignmentTarget::AssignmentTargetIdentifier(ident) => {
            // `value` is read twice: once written into the target here,
            // once more as the assignment expression's own result, returned
            // below — so the clone below needs its own reference.
            cx.bump_atom(&value);
            cx.emit_assign(ident.name.as_str(), ast::Expr::from(value.clone()));
            cx.free_atom(&value);
            Ok(value)
        }
        _ => {
            let member = simple.as_member_expression().ok_or(LowerError::UnsupportedNode {
                kind: "SimpleAssignmentTarget (TS syntax)",
            })?;
            match member {
                oxc::MemberExpression::StaticMemberExpression(member) => {
                    let object = lower_expr(cx, &member.object)?;
                    let key = Atom::String(member.property.name.to_string());
                    lower_set_property(cx, object, key, value)
                }
                oxc::MemberExpression::ComputedMemberExpression(member) => {
                    let object = lower_expr(cx, &member.object)?;
                    let key = lower_expr(cx, &member.expression)?;
                    lower_set_property(cx, object, key, value)
                }
                oxc::MemberExpression::PrivateFieldExpression(_) => {
                    Err(LowerError::UnsupportedNode {
                        kind: "PrivateFieldExpression",
                    })
                }
            }
        }
    }
}

fn lower_function_expr(func: &oxc::Function) -> LowerResult<Atom> {
    let lowered = crate::lower_function_body(func)?;
    Ok(Atom::Function(Box::new(lowered)))
}

fn binary_op_str(op: oxc::BinaryOperator) -> &'static str {
    use oxc::BinaryOperator::*;
    match op {
        Equality => "==",
        Inequality => "!=",
        StrictEquality => "===",
        StrictInequality => "!==",
        LessThan => "<",
        LessEqualThan => "<=",
        GreaterThan => ">",
        GreaterEqualThan => ">=",
        Addition => "+",
        Subtraction => "-",
        Multiplication => "*",
        Division => "/",
        Remainder => "%",
        Exponential => "**",
        ShiftLeft => "<<",
        ShiftRight => ">>",
        ShiftRightZeroFill => ">>>",
        BitwiseAnd => "&",
        BitwiseOR => "|",
        BitwiseXOR => "^",
        In => "in",
        Instanceof => "instanceof",
    }
}

fn unary_op_str(op: oxc::UnaryOperator) -> &'static str {
    use oxc::UnaryOperator::*;
    match op {
        UnaryPlus => "+",
        UnaryNegation => "-",
        LogicalNot => "!",
        BitwiseNot => "~",
        Typeof => "typeof ",
        Void => "void ",
        Delete => "delete ",
    }
}
