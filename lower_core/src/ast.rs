// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Constructors for the small set of output AST node shapes the emitter
//! produces (spec §4.1, §3 "Reusable expression", §6 "Output").
//!
//! This is deliberately not another copy of `oxc_ast`: the lowered language
//! only has sequencing, assignment to scalar locals, `GOTO`s, and calls to
//! `GET_PROPERTY`/`SET_PROPERTY`/`CALL`, so a small bespoke tree says
//! everything that needs saying.

use std::fmt;

/// The names the lowerer may call without having them resolve to a scope
/// variable (spec §8 "Scope closure").
pub const UNDEFINED: &str = "undefined";
pub const RESULT: &str = "__RESULT";
pub const ERROR: &str = "__ERROR";
pub const GOTO: &str = "GOTO";
pub const GET_PROPERTY: &str = "GET_PROPERTY";
pub const SET_PROPERTY: &str = "SET_PROPERTY";
pub const CALL: &str = "CALL";

/// A reusable expression (spec §3): an identifier, a simple literal, or the
/// `undefined` sentinel. Safe to substitute for its value more than once.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Ident(String),
    String(String),
    Number(f64),
    Bool(bool),
    Null,
    Undefined,
    /// A lowered function expression, embedded as a literal value. Its body
    /// is itself a sequence of labeled blocks (spec §4.6).
    Function(Box<LoweredFunction>),
}

impl Atom {
    pub fn ident(name: impl Into<String>) -> Self {
        Atom::Ident(name.into())
    }
}

#[derive(Debug, Clone)]
pub struct LoweredFunction {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Program,
}

/// A non-reusable composite built from reusable operands, or a `GOTO`
/// pseudo-call and its operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Atom(Atom),
    Binary {
        op: &'static str,
        lhs: Atom,
        rhs: Atom,
    },
    Unary {
        op: &'static str,
        operand: Atom,
    },
    /// `test ? then : els`, used only as the sole argument of `GOTO`.
    Conditional {
        test: Atom,
        then: Box<Expr>,
        els: Box<Expr>,
    },
    /// A string label literal, e.g. `"B7"`.
    Label(String),
    /// `callee(args...)` — either a helper (`GET_PROPERTY`/`SET_PROPERTY`/
    /// `CALL`) or the `GOTO` pseudo-call.
    Call {
        callee: &'static str,
        args: Vec<Expr>,
    },
}

impl From<Atom> for Expr {
    fn from(atom: Atom) -> Self {
        Expr::Atom(atom)
    }
}

/// A statement inside a basic block body (spec §3 "Basic block").
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign { target: String, value: Expr },
    Expr(Expr),
    Debugger,
    /// A jump whose target(s) are not yet known — an index into the owning
    /// `Context`'s jump table (spec §9 "Shared mutable jump nodes"). Never
    /// present in a `Program` returned from `lower_program`: finalization
    /// rewrites every one of these into `Expr(Call { callee: GOTO, .. })`.
    PendingGoto(u32),
}

/// A labeled basic block. `label` is dense and assigned in emission order
/// (spec §3: "Labels are dense integers assigned in emission order").
#[derive(Debug, Clone)]
pub struct Block {
    pub label: u32,
    pub body: Vec<Stmt>,
}

impl Block {
    pub fn name(&self) -> String {
        block_label(self.label)
    }
}

pub fn block_label(label: u32) -> String {
    format!("B{label}")
}

/// The final emitted unit for one function (or the top-level program):
/// one declaration block listing every scope variable, followed by the
/// ordered list of labeled basic blocks (spec §4.7, step 4).
#[derive(Debug, Clone)]
pub struct Program {
    pub scope_vars: Vec<String>,
    pub blocks: Vec<Block>,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::printer::write_program(f, self)
    }
}
