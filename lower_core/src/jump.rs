// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The two-phase jump handle (spec §3 "Jump handle", §4.2, §9 "Shared
//! mutable jump nodes").
//!
//! Rather than one `Goto` AST node whose `target` field both the emitter
//! and the resolver mutate in place, a jump here is an index (`GotoId`)
//! into a table of target resolutions. The insertion site writes a
//! `Stmt::PendingGoto(id)` placeholder into a block; the resolution site
//! writes into `table[id]`, once. Finalization rewrites every placeholder
//! into the real `GOTO(...)` call. This keeps no two owners aliasing the
//! same mutable node.

use crate::ast::{self, Atom, Expr};
use crate::error::{LowerError, LowerResult};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GotoId(u32);

impl GotoId {
    /// The table slot this handle addresses. Exposed so `Context` can stash
    /// it inside a `Stmt::PendingGoto` placeholder, which only stores a raw
    /// index — `ast` doesn't depend on `jump`.
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for GotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "goto#{}", self.0)
    }
}

#[derive(Debug, Clone)]
enum Resolution {
    Unconditional(Option<u32>),
    Conditional {
        test: Atom,
        then: Option<u32>,
        els: Option<u32>,
    },
}

/// The jump table a `Context` owns for one function body. Every slot must
/// be fully resolved by the time the owning context finalizes (spec §4.7,
/// step 1 — an unresolved handle is an `InvariantViolated` defect).
#[derive(Debug, Default)]
pub struct GotoTable {
    slots: Vec<Resolution>,
}

impl GotoTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_unconditional(&mut self) -> GotoId {
        self.slots.push(Resolution::Unconditional(None));
        GotoId((self.slots.len() - 1) as u32)
    }

    pub fn new_unconditional_resolved(&mut self, target: u32) -> GotoId {
        self.slots.push(Resolution::Unconditional(Some(target)));
        GotoId((self.slots.len() - 1) as u32)
    }

    pub fn new_conditional(&mut self, test: Atom) -> GotoId {
        self.slots.push(Resolution::Conditional {
            test,
            then: None,
            els: None,
        });
        GotoId((self.slots.len() - 1) as u32)
    }

    pub fn resolve_unconditional(&mut self, id: GotoId, target: u32) -> LowerResult<()> {
        match &mut self.slots[id.0 as usize] {
            Resolution::Unconditional(slot @ None) => {
                *slot = Some(target);
                Ok(())
            }
            Resolution::Unconditional(Some(_)) => Err(LowerError::InvariantViolated(
                "unconditional jump handle resolved twice",
            )),
            Resolution::Conditional { .. } => Err(LowerError::InvariantViolated(
                "resolved a conditional jump handle as unconditional",
            )),
        }
    }

    pub fn resolve_then(&mut self, id: GotoId, target: u32) -> LowerResult<()> {
        match &mut self.slots[id.0 as usize] {
            Resolution::Conditional { then: slot @ None, .. } => {
                *slot = Some(target);
                Ok(())
            }
            Resolution::Conditional { then: Some(_), .. } => Err(LowerError::InvariantViolated(
                "conditional jump handle's consequent resolved twice",
            )),
            Resolution::Unconditional(_) => Err(LowerError::InvariantViolated(
                "resolved an unconditional jump handle as conditional",
            )),
        }
    }

    pub fn resolve_else(&mut self, id: GotoId, target: u32) -> LowerResult<()> {
        match &mut self.slots[id.0 as usize] {
            Resolution::Conditional { els: slot @ None, .. } => {
                *slot = Some(target);
                Ok(())
            }
            Resolution::Conditional { els: Some(_), .. } => Err(LowerError::InvariantViolated(
                "conditional jump handle's alternate resolved twice",
            )),
            Resolution::Unconditional(_) => Err(LowerError::InvariantViolated(
                "resolved an unconditional jump handle as conditional",
            )),
        }
    }

    /// Rewrites every `Stmt::PendingGoto` in `blocks` into its materialized
    /// `GOTO(...)` call. Fails if any slot is still unresolved.
    pub fn materialize(&self, blocks: &mut [ast::Block]) -> LowerResult<()> {
        for block in blocks {
            for stmt in &mut block.body {
                if let ast::Stmt::PendingGoto(raw_id) = stmt {
                    let expr = self.materialize_one(GotoId(*raw_id))?;
                    *stmt = ast::Stmt::Expr(Expr::Call {
                        callee: ast::GOTO,
                        args: vec![expr],
                    });
                }
            }
        }
        Ok(())
    }

    fn materialize_one(&self, id: GotoId) -> LowerResult<Expr> {
        match &self.slots[id.0 as usize] {
            Resolution::Unconditional(Some(target)) => {
                Ok(Expr::Label(ast::block_label(*target)))
            }
            Resolution::Unconditional(None) => Err(LowerError::InvariantViolated(
                "unconditional jump handle never resolved",
            )),
            Resolution::Conditional {
                test,
                then: Some(then),
                els: Some(els),
            } => Ok(Expr::Conditional {
                test: test.clone(),
                then: Box::new(Expr::Label(ast::block_label(*then))),
                els: Box::new(Expr::Label(ast::block_label(*els))),
            }),
            Resolution::Conditional { .. } => Err(LowerError::InvariantViolated(
                "conditional jump handle never fully resolved",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_resolution_is_an_error() {
        let mut table = GotoTable::new();
        let id = table.new_unconditional();
        table.resolve_unconditional(id, 3).unwrap();
        assert!(table.resolve_unconditional(id, 4).is_err());
    }

    #[test]
    fn unresolved_slot_fails_materialization() {
        let mut table = GotoTable::new();
        let _id = table.new_unconditional();
        let mut blocks = vec![ast::Block {
            label: 0,
            body: vec![ast::Stmt::PendingGoto(0)],
        }];
        assert!(table.materialize(&mut blocks).is_err());
    }

    #[test]
    fn conditional_materializes_to_ternary_labels() {
        let mut table = GotoTable::new();
        let id = table.new_conditional(Atom::ident("a"));
        table.resolve_then(id, 1).unwrap();
        table.resolve_else(id, 2).unwrap();
        let mut blocks = vec![ast::Block {
            label: 0,
            body: vec![ast::Stmt::PendingGoto(0)],
        }];
        table.materialize(&mut blocks).unwrap();
        assert_eq!(
            blocks[0].body[0],
            ast::Stmt::Expr(Expr::Call {
                callee: ast::GOTO,
                args: vec![Expr::Conditional {
                    test: Atom::ident("a"),
                    then: Box::new(Expr::Label("B1".into())),
                    els: Box::new(Expr::Label("B2".into())),
                }],
            })
        );
    }
}
