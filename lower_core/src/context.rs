// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `Context` is the per-function lowering state: the open block, the jump
//! table, the temp pool, the scope variable list, and the label/pending-jump
//! bookkeeping that statement lowering threads through (spec §4.2, §4.3,
//! §4.7).

use crate::ast::{self, Atom, LoweredFunction, Program, Stmt};
use crate::block::{BlockWriter, Label};
use crate::error::{LowerError, LowerResult};
use crate::jump::{GotoId, GotoTable};
use crate::temp::{self, Temp, TempPool};

/// An atom names a live temp only if it's an identifier shaped like `$N`
/// (spec §3 "Temporary"); user identifiers and literals never do.
fn atom_temp(atom: &Atom) -> Option<Temp> {
    match atom {
        Atom::Ident(name) => temp::parse_temp_name(name),
        _ => None,
    }
}

/// One entry on the label stack, pushed for every loop and every labeled
/// statement (spec §4.5 `LabeledStatement`/loop constructs).
pub struct LabelFrame {
    /// User-written label, if this frame was introduced by a
    /// `LabeledStatement`. `None` for the implicit frame a bare loop gets.
    pub label: Option<String>,
    /// Whether `continue` may target this frame at all — only loops, never
    /// a bare labeled block.
    pub is_loop: bool,
    /// The loop's continue target, once known. `while` knows it up front
    /// (the header re-tests immediately); `do`/`for` don't learn it until
    /// after the body lowers, so `continue`s seen before then queue into
    /// `pending_continues` instead.
    pub continue_target: Option<Label>,
    pub pending_continues: Vec<GotoId>,
}

/// Per-function lowering state (spec §4.2). One `Context` is created per
/// function body (including the top-level program, treated as a function
/// with no parameters).
pub struct Context {
    writer: BlockWriter,
    gotos: GotoTable,
    temps: TempPool,
    scope_vars: Vec<String>,
    label_stack: Vec<LabelFrame>,
    pending_returns: Vec<GotoId>,
    /// Thrown-value escapes awaiting the nearest enclosing `catch` handler
    /// or the function epilogue (spec §3 "Pending-jump queues") — one flat
    /// list, not scoped per `try`. Whichever `catch` is lowered next drains
    /// and resolves the *entire* list, including escapes from unrelated
    /// code that happened to run first (spec §4.5 `TryStatement` step 2:
    /// "resolve every currently-pending throw to here").
    pending_throws: Vec<GotoId>,
    /// `break`s awaiting their enclosing labeled block (spec §3
    /// "Pending-jump queues"), paired with the user label they named (`None`
    /// for unlabeled). Unlike `continue`, a `break` never fails to match at
    /// its own site — an unmatched label only surfaces as an
    /// `InvariantViolated` once `leave` finds it still here.
    pending_breaks: Vec<(Option<String>, GotoId)>,
    /// Function declarations hoisted to the top of scope (spec §4.5
    /// `FunctionDeclaration`): the binding is visible from block 0, but the
    /// closure value is only materialized once, right before the first
    /// user-written block.
    deferred_function_inits: Vec<(String, LoweredFunction)>,
}

impl Context {
    /// A fresh `Context` for one function body. `__RESULT` and `__ERROR` are
    /// pre-declared here (spec §4.6 "At function entry `__ERROR` is
    /// pre-declared and cleared") so they're members of `scope_vars` like
    /// any other scope variable, rather than magic names the output grammar
    /// never actually binds.
    pub fn new() -> Self {
        let mut cx = Self {
            writer: BlockWriter::new(),
            gotos: GotoTable::new(),
            temps: TempPool::new(),
            scope_vars: Vec::new(),
            label_stack: Vec::new(),
            pending_returns: Vec::new(),
            pending_throws: Vec::new(),
            pending_breaks: Vec::new(),
            deferred_function_inits: Vec::new(),
        };
        cx.declare_var(ast::RESULT);
        cx.declare_var(ast::ERROR);
        cx
    }

    // -- scope ------------------------------------------------------------

    /// Declares a user-level scope variable (`var` binding, function
    /// parameter, or catch binding). Idempotent for repeated `var`s of the
    /// same name, matching ECMAScript var-hoisting semantics.
    pub fn declare_var(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.scope_vars.contains(&name) {
            self.scope_vars.push(name);
        }
    }

    pub fn use_temp_var(&mut self) -> Temp {
        let temp = self.temps.alloc();
        self.declare_var(temp.to_string());
        temp
    }

    pub fn bump_temp_var(&mut self, temp: Temp) {
        self.temps.bump(temp);
    }

    pub fn free_temp_var(&mut self, temp: Temp) {
        self.temps.release(temp);
    }

    /// Releases `atom`'s reference if it names a temp; a no-op for a user
    /// identifier or literal. Call this once for every use of an atom that
    /// doesn't pass it further on to another caller (spec §5 "balanced
    /// temps") — typically right where the atom is embedded into emitted
    /// code, or discarded outright.
    pub fn free_atom(&mut self, atom: &Atom) {
        if let Some(temp) = atom_temp(atom) {
            self.temps.release(temp);
        }
    }

    /// Adds one more outstanding reference to `atom` if it names a temp; a
    /// no-op otherwise. Needed before cloning an atom for a second use (e.g.
    /// a method call's receiver, re-used after computing the callee), so
    /// the matching `free_atom` calls net back to zero instead of freeing
    /// the slot while a clone is still pending.
    pub fn bump_atom(&mut self, atom: &Atom) {
        if let Some(temp) = atom_temp(atom) {
            self.temps.bump(temp);
        }
    }

    /// Number of currently-live temporaries. Statement handlers assert this
    /// is unchanged across their own boundary (spec §5 "balanced temps").
    pub fn locked_temps(&self) -> usize {
        self.temps.locked()
    }

    /// Saves `name`'s current value into a fresh temp, then assigns `init`
    /// into `name` (spec §4.3 `shadowVar`) — used for `catch(param)`, whose
    /// binding shadows any outer variable of the same name only for the
    /// handler's duration. Returns the temp to pass to `unshadow_var`.
    pub fn shadow_var(&mut self, name: &str, init: impl Into<ast::Expr>) -> Temp {
        let saved = self.use_temp_var();
        self.emit_assign(saved.to_string(), Atom::ident(name));
        self.emit_assign(name, init);
        saved
    }

    /// Restores `name` to the value `shadow_var` saved, and releases the
    /// temp (spec §4.3 `shadowVar`'s "unshadow" operation).
    pub fn unshadow_var(&mut self, name: &str, saved: Temp) {
        self.emit_assign(name, Atom::ident(saved.to_string()));
        self.free_temp_var(saved);
    }

    pub fn defer_function_init(&mut self, name: String, func: LoweredFunction) {
        self.declare_var(name.clone());
        self.deferred_function_inits.push((name, func));
    }

    // -- blocks -------------------------------------------------------------

    pub fn current_block(&self) -> Label {
        self.writer.current()
    }

    pub fn open_block(&mut self) -> Label {
        self.writer.open_block()
    }

    pub fn emit(&mut self, stmt: Stmt) {
        self.writer.emit(stmt);
    }

    pub fn emit_assign(&mut self, target: impl Into<String>, value: impl Into<ast::Expr>) {
        self.writer.emit(Stmt::Assign {
            target: target.into(),
            value: value.into(),
        });
    }

    // -- jumps ---------------------------------------------------------------

    /// Inserts an unconditional jump whose target isn't known yet, and opens
    /// the next block (spec §4.1's fall-through guarantee). Returns the
    /// handle for a later `resolve_goto`.
    pub fn insert_pending_goto(&mut self) -> GotoId {
        let id = self.gotos.new_unconditional();
        self.writer.emit_terminator(Stmt::PendingGoto(id.raw()));
        self.writer.open_block();
        id
    }

    pub fn resolve_goto(&mut self, id: GotoId, target: Label) -> LowerResult<()> {
        self.gotos.resolve_unconditional(id, target.index())
    }

    /// Inserts a conditional branch (`test ? B_then : B_else`) and opens the
    /// consequent block. The consequent's label is already known (it's the
    /// block just opened), so it's resolved here; the caller resolves
    /// `resolve_else` once the alternate's label is known (spec §4.2
    /// `create_branch`).
    pub fn create_branch(&mut self, test: Atom) -> LowerResult<GotoId> {
        let id = self.gotos.new_conditional(test);
        self.writer.emit_terminator(Stmt::PendingGoto(id.raw()));
        let then_label = self.writer.open_block();
        self.gotos.resolve_then(id, then_label.index())?;
        Ok(id)
    }

    pub fn resolve_else(&mut self, id: GotoId, target: Label) -> LowerResult<()> {
        self.gotos.resolve_else(id, target.index())
    }

    // -- label stack / break / continue --------------------------------------

    pub fn push_label_frame(&mut self, label: Option<String>, is_loop: bool, continue_target: Option<Label>) {
        self.label_stack.push(LabelFrame {
            label,
            is_loop,
            continue_target,
            pending_continues: Vec::new(),
        });
    }

    /// Resolves every `continue` queued against the innermost (current)
    /// frame to `target`, now that it's known. Used by `do`/`for`, whose
    /// continue target — the test or update block — only exists once the
    /// body has already been lowered (spec §4.5 `DoWhileStatement`,
    /// `ForStatement`).
    pub fn resolve_pending_continues(&mut self, target: Label) -> LowerResult<()> {
        let frame = self
            .label_stack
            .last_mut()
            .ok_or(LowerError::InvariantViolated("no active loop frame"))?;
        frame.continue_target = Some(target);
        for id in frame.pending_continues.drain(..) {
            self.gotos.resolve_unconditional(id, target.index())?;
        }
        Ok(())
    }

    /// Pops the innermost label frame and resolves every pending `break`
    /// that names this frame's label (or, for an anonymous loop/`switch`
    /// frame, every unlabeled `break`) to `exit`. Called once the
    /// construct's exit block is known (spec §4.5, end of every
    /// loop/`switch`/labeled-block handler).
    pub fn pop_label_frame(&mut self, exit: Label) -> LowerResult<()> {
        let frame = self
            .label_stack
            .pop()
            .ok_or(LowerError::InvariantViolated("popped an empty label stack"))?;

        let mut i = 0;
        while i < self.pending_breaks.len() {
            let matches = match &self.pending_breaks[i].0 {
                None => frame.label.is_none(),
                Some(name) => frame.label.as_deref() == Some(name.as_str()),
            };
            if matches {
                let (_, id) = self.pending_breaks.remove(i);
                self.gotos.resolve_unconditional(id, exit.index())?;
            } else {
                i += 1;
            }
        }
        Ok(())
    }

    /// Records a `break` (optionally labeled) (spec §4.5 `BreakStatement`):
    /// unlike `continue`, this never fails at its own site — it always
    /// enqueues under the given label name (`None` for unlabeled), and
    /// `pop_label_frame` matches it against whichever frame closes first. A
    /// label matching no frame at all simply never resolves, which `leave`
    /// catches as an `InvariantViolated` defect.
    pub fn insert_break(&mut self, label: Option<&str>) {
        let id = self.gotos.new_unconditional();
        self.writer.emit_terminator(Stmt::PendingGoto(id.raw()));
        self.pending_breaks.push((label.map(str::to_owned), id));
        self.writer.open_block();
    }

    /// Records a `continue` (optionally labeled) (spec §4.5
    /// `ContinueStatement`). Only a loop frame ever matches — labeling a
    /// non-loop statement makes it a `break` target but never a `continue`
    /// target. If the frame's continue target is already known, the jump
    /// resolves immediately; otherwise it queues alongside the frame's other
    /// pending continues.
    pub fn insert_continue(&mut self, label: Option<&str>) -> LowerResult<()> {
        let idx = match label {
            None => self.label_stack.iter().rposition(|frame| frame.is_loop),
            Some(name) => self
                .label_stack
                .iter()
                .rposition(|frame| frame.is_loop && frame.label.as_deref() == Some(name)),
        }
        .ok_or(LowerError::InvalidContinue {
            label: label.map(str::to_owned),
        })?;

        match self.label_stack[idx].continue_target {
            Some(target) => {
                let id = self.gotos.new_unconditional_resolved(target.index());
                self.writer.emit_terminator(Stmt::PendingGoto(id.raw()));
            }
            None => {
                let id = self.gotos.new_unconditional();
                self.writer.emit_terminator(Stmt::PendingGoto(id.raw()));
                self.label_stack[idx].pending_continues.push(id);
            }
        }
        self.writer.open_block();
        Ok(())
    }

    // -- return / throw -------------------------------------------------------

    /// Records a `return` jump to the function epilogue, emitted once
    /// `leave` assembles it (spec §4.5 `ReturnStatement`, §4.7 step 2).
    pub fn insert_pending_return(&mut self) {
        let id = self.gotos.new_unconditional();
        self.writer.emit_terminator(Stmt::PendingGoto(id.raw()));
        self.pending_returns.push(id);
        self.writer.open_block();
    }

    /// Records a thrown-value escape (spec §4.5 `ThrowStatement`, and the
    /// implicit throw-check after every potentially-throwing helper call)
    /// onto the single flat `pending_throws` queue, awaiting whichever
    /// `catch` handler or function epilogue resolves it next.
    pub fn insert_pending_throw(&mut self) {
        let id = self.gotos.new_unconditional();
        self.writer.emit_terminator(Stmt::PendingGoto(id.raw()));
        self.pending_throws.push(id);
        self.writer.open_block();
    }

    /// Opens a `catch` handler's entry block and resolves every
    /// currently-pending thrown-value escape to it (spec §4.5 `TryStatement`
    /// step 2) — the *entire* `pending_throws` queue, including escapes left
    /// over from earlier, unrelated code, since spec §3 models it as one
    /// flat per-`Context` list rather than one scoped to each `try`.
    pub fn open_catch_handler(&mut self) -> LowerResult<Label> {
        let entry = self.writer.open_block();
        for id in self.pending_throws.drain(..) {
            self.gotos.resolve_unconditional(id, entry.index())?;
        }
        Ok(entry)
    }

    // -- finalization ---------------------------------------------------------

    /// Assembles the finished `Program` for this function (spec §4.7):
    /// checks the label stack and temp pool are balanced, resolves every
    /// pending return/throw to a shared epilogue block, splices in deferred
    /// function initializers, and materializes every jump handle.
    pub fn leave(mut self) -> LowerResult<Program> {
        if !self.label_stack.is_empty() {
            return Err(LowerError::InvariantViolated(
                "label stack non-empty at function exit",
            ));
        }
        if self.temps.locked() != 0 {
            return Err(LowerError::InvariantViolated(
                "temporaries still locked at function exit",
            ));
        }
        if !self.pending_breaks.is_empty() {
            return Err(LowerError::InvariantViolated(
                "break matches no enclosing labeled statement or loop",
            ));
        }

        if !self.pending_returns.is_empty() || !self.pending_throws.is_empty() {
            let epilogue = self.writer.open_block();
            for id in self.pending_returns.drain(..) {
                self.gotos.resolve_unconditional(id, epilogue.index())?;
            }
            for id in self.pending_throws.drain(..) {
                self.gotos.resolve_unconditional(id, epilogue.index())?;
            }
        }

        let mut blocks = self.writer.into_blocks();

        if !self.deferred_function_inits.is_empty() {
            let mut prelude = Vec::with_capacity(self.deferred_function_inits.len());
            for (name, func) in self.deferred_function_inits {
                prelude.push(Stmt::Assign {
                    target: name,
                    value: ast::Expr::Atom(Atom::Function(Box::new(func))),
                });
            }
            if let Some(first) = blocks.first_mut() {
                prelude.extend(std::mem::take(&mut first.body));
                first.body = prelude;
            } else {
                blocks.push(ast::Block { label: 0, body: prelude });
            }
        }

        self.gotos.materialize(&mut blocks)?;

        Ok(Program {
            scope_vars: self.scope_vars,
            blocks,
        })
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

