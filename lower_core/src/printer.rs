// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Renders the output AST back to JS-like source text (spec §6 "Output").
//! Not a pretty-printer in the general sense: the output language is so
//! small that every shape has exactly one rendering.

use crate::ast::{Atom, Block, Expr, LoweredFunction, Program, Stmt};
use std::fmt::{self, Write};

pub fn write_program(f: &mut fmt::Formatter<'_>, program: &Program) -> fmt::Result {
    write_program_indented(f, program, 0)
}

fn write_program_indented(f: &mut fmt::Formatter<'_>, program: &Program, indent: usize) -> fmt::Result {
    if !program.scope_vars.is_empty() {
        pad(f, indent)?;
        write!(f, "var {};\n", program.scope_vars.join(", "))?;
    }
    for block in &program.blocks {
        write_block(f, block, indent)?;
    }
    Ok(())
}

fn write_block(f: &mut fmt::Formatter<'_>, block: &Block, indent: usize) -> fmt::Result {
    pad(f, indent)?;
    writeln!(f, "{}: {{", block.name())?;
    for stmt in &block.body {
        write_stmt(f, stmt, indent + 1)?;
    }
    pad(f, indent)?;
    writeln!(f, "}}")
}

fn write_stmt(f: &mut fmt::Formatter<'_>, stmt: &Stmt, indent: usize) -> fmt::Result {
    pad(f, indent)?;
    match stmt {
        Stmt::Assign { target, value } => {
            write!(f, "{target} = ")?;
            write_expr(f, value)?;
            writeln!(f, ";")
        }
        Stmt::Expr(expr) => {
            write_expr(f, expr)?;
            writeln!(f, ";")
        }
        Stmt::Debugger => writeln!(f, "debugger;"),
        Stmt::PendingGoto(id) => writeln!(f, "/* unresolved goto#{id} */"),
    }
}

fn write_expr(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    match expr {
        Expr::Atom(atom) => write_atom(f, atom),
        Expr::Binary { op, lhs, rhs } => {
            write_atom(f, lhs)?;
            write!(f, " {op} ")?;
            write_atom(f, rhs)
        }
        Expr::Unary { op, operand } => {
            write!(f, "{op}")?;
            write_atom(f, operand)
        }
        Expr::Conditional { test, then, els } => {
            write_atom(f, test)?;
            write!(f, " ? ")?;
            write_expr(f, then)?;
            write!(f, " : ")?;
            write_expr(f, els)
        }
        Expr::Label(label) => write!(f, "{label:?}"),
        Expr::Call { callee, args } => {
            write!(f, "{callee}(")?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_expr(f, arg)?;
            }
            write!(f, ")")
        }
    }
}

fn write_atom(f: &mut fmt::Formatter<'_>, atom: &Atom) -> fmt::Result {
    match atom {
        Atom::Ident(name) => write!(f, "{name}"),
        Atom::String(s) => write!(f, "{s:?}"),
        Atom::Number(n) => write!(f, "{n}"),
        Atom::Bool(b) => write!(f, "{b}"),
        Atom::Null => write!(f, "null"),
        Atom::Undefined => write!(f, "undefined"),
        Atom::Function(func) => write_function(f, func),
    }
}

fn write_function(f: &mut fmt::Formatter<'_>, func: &LoweredFunction) -> fmt::Result {
    write!(f, "function ")?;
    if let Some(name) = &func.name {
        write!(f, "{name}")?;
    }
    write!(f, "({}) {{\n", func.params.join(", "))?;
    write_program_indented(f, &func.body, 1)?;
    write!(f, "}}")
}

fn pad(f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
    for _ in 0..indent {
        f.write_str("  ")?;
    }
    Ok(())
}
