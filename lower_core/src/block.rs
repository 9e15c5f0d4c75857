// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Maintains the current, open basic block (spec §4.1 "Block writer").

use crate::ast::{self, Stmt};
use std::fmt;

/// The label of a basic block: its index in the function's block list
/// (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(u32);

impl Label {
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", ast::block_label(self.0))
    }
}

#[derive(Debug, Default)]
pub struct BlockWriter {
    blocks: Vec<Vec<Stmt>>,
}

impl BlockWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new block if the current one already has content; otherwise
    /// returns the existing (still-empty) block's label. Never leaves the
    /// function with zero blocks.
    pub fn open_block(&mut self) -> Label {
        if self.blocks.is_empty() || !self.blocks.last().unwrap().is_empty() {
            self.blocks.push(Vec::new());
        }
        self.current()
    }

    /// The label of the block currently being written to.
    pub fn current(&self) -> Label {
        debug_assert!(!self.blocks.is_empty(), "open_block must run before current");
        Label((self.blocks.len() - 1) as u32)
    }

    /// Appends a non-terminating entry to the current block.
    pub fn emit(&mut self, stmt: Stmt) {
        if self.blocks.is_empty() {
            self.open_block();
        }
        self.blocks.last_mut().unwrap().push(stmt);
    }

    /// Appends the terminating jump of the current block. The caller must
    /// immediately open a new block afterwards (spec §4.1 guarantee) —
    /// `Context`'s jump-handle helpers do this for every caller.
    pub fn emit_terminator(&mut self, stmt: Stmt) {
        self.emit(stmt);
    }

    pub fn into_blocks(self) -> Vec<ast::Block> {
        self.blocks
            .into_iter()
            .enumerate()
            .map(|(i, body)| ast::Block {
                label: i as u32,
                body,
            })
            .collect()
    }
}
