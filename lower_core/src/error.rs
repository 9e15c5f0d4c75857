// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error contracts for the lowering pass. All errors are terminal: the first
//! one aborts the whole lowering (see spec §7 — there is no recovery).

use thiserror::Error;

/// A lowering failure. There is no recoverable variant: every constructor
/// here ends the pass.
#[derive(Debug, Error)]
pub enum LowerError {
    /// The input AST contains a node kind this pass does not implement —
    /// either genuinely unsupported ECMAScript surface (`with`, classes,
    /// generators, ...) or a node kind explicitly excluded by the supported
    /// subset (spec §6).
    #[error("unsupported node kind: {kind}")]
    UnsupportedNode { kind: &'static str },

    /// A `continue` (optionally labeled) that matches no loop frame on the
    /// label stack.
    #[error("continue does not match any enclosing loop (label: {label:?})")]
    InvalidContinue { label: Option<String> },

    /// An internal defect: unbalanced temporaries at a statement-handler
    /// boundary, a non-empty label stack or unresolved `pendingBreaks` at
    /// `Context::leave`, or a jump handle resolved twice.
    #[error("lowering invariant violated: {0}")]
    InvariantViolated(&'static str),
}

pub type LowerResult<T> = Result<T, LowerError>;
