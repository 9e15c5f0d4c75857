// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lowers a structured ECMAScript AST (as parsed by `oxc_parser`) into
//! labeled basic blocks joined by explicit `GOTO`s, reusable expressions,
//! and pooled temporaries.
//!
//! The entry point is [`lower_program`]. See [`ast::Program`] for the
//! shape of the result, and [`LowerError`] for everything that can make
//! lowering fail.

mod ast;
mod block;
mod context;
mod error;
mod expr;
mod jump;
mod printer;
mod stmt;
mod temp;

use oxc_ast::ast as oxc;

pub use ast::{Atom, Block, Expr, LoweredFunction, Program, Stmt};
pub use error::{LowerError, LowerResult};

use context::Context;

/// Lowers a whole parsed source file, treating the top level as a function
/// with no parameters and no name (spec §4.6, §4.7).
pub fn lower_program(program: &oxc::Program) -> LowerResult<Program> {
    let mut cx = Context::new();
    for stmt in &program.body {
        stmt::lower_stmt(&mut cx, stmt)?;
    }
    cx.leave()
}

/// Lowers one function's body into its own `Program` (spec §4.6): a fresh
/// `Context`, its parameters declared up front, then its statements lowered
/// in order.
pub(crate) fn lower_function_body(func: &oxc::Function) -> LowerResult<LoweredFunction> {
    let mut cx = Context::new();

    let mut params = Vec::with_capacity(func.params.items.len());
    for param in &func.params.items {
        match &param.pattern.kind {
            oxc::BindingPatternKind::BindingIdentifier(ident) => {
                let name = ident.name.to_string();
                cx.declare_var(name.clone());
                params.push(name);
            }
            _ => {
                return Err(LowerError::UnsupportedNode {
                    kind: "destructuring function parameter",
                })
            }
        }
    }

    if let Some(body) = &func.body {
        for stmt in &body.statements {
            stmt::lower_stmt(&mut cx, stmt)?;
        }
    }

    let name = func.id.as_ref().map(|id| id.name.to_string());
    let body = cx.leave()?;

    Ok(LoweredFunction { name, params, body })
}
