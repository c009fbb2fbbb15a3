//! Component F: `VcBranch`, the path-sensitive symbolic execution engine,
//! and the `transform` driver that walks a whole `Block` to completion.
//!
//! Branches live in an arena (`Engine`) indexed by integer id, per spec.md
//! §9's "cyclic object graphs in branches" note: a `parent` pointer is a
//! relation, not an owning reference, and children are discarded at join or
//! termination, so there is never an actual cycle to break.

use std::fmt;
use std::rc::Rc;

use log::trace;

use crate::ir::block::{Block, Scope, ScopeKind};
use crate::ir::code::{Code, Label, Register};
use crate::ir::ty::Type;
use crate::transformer::{Expr, VcTransformer};

/// Arena index of a [`VcBranch`]. `None` on `VcBranch::parent` means "this
/// is the master branch".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BranchId(usize);

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A programmer-error invariant violation (spec.md §7: "should crash with a
/// location pointing at the offending Entry's attributes"). Carried as a
/// `Result` variant rather than an immediate `panic!` so a caller can choose
/// how to surface the crash; the one public entry point (`transform`)
/// unwraps it into a panic, per spec.
#[derive(Debug, Clone, PartialEq)]
pub enum BranchError {
    /// The scope stack became empty while a pop was required.
    EmptyScopeStack { pc: usize },
    /// `pc` ran past the end of the block without hitting a terminal opcode.
    RanOffEnd { pc: usize },
    /// A branch target label is not defined anywhere in this block.
    UnknownLabel(Label),
}

impl fmt::Display for BranchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchError::EmptyScopeStack { pc } => write!(f, "scope stack exhausted at pc={pc}"),
            BranchError::RanOffEnd { pc } => write!(f, "control fell off the end of the block at pc={pc}"),
            BranchError::UnknownLabel(l) => write!(f, "branch target `{l}` is not defined in this block"),
        }
    }
}

impl std::error::Error for BranchError {}

/// A symbolic execution state along one path through a `Block` (spec.md
/// §3's `VcBranch` entity).
#[derive(Debug, Clone)]
pub struct VcBranch {
    id: BranchId,
    parent: Option<BranchId>,
    block: Rc<Block>,
    environment: Vec<Expr>,
    types: Vec<Type>,
    scopes: Vec<Scope>,
    origin: usize,
    pc: usize,
    terminated: bool,
}

impl VcBranch {
    #[must_use]
    pub fn id(&self) -> BranchId {
        self.id
    }

    #[must_use]
    pub fn parent(&self) -> Option<BranchId> {
        self.parent
    }

    #[must_use]
    pub fn pc(&self) -> usize {
        self.pc
    }

    #[must_use]
    pub fn origin(&self) -> usize {
        self.origin
    }

    #[must_use]
    pub fn environment(&self) -> &[Expr] {
        &self.environment
    }

    #[must_use]
    pub fn types(&self) -> &[Type] {
        &self.types
    }

    #[must_use]
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    #[must_use]
    pub fn read(&self, r: Register) -> Expr {
        self.environment[r as usize].clone()
    }

    #[must_use]
    pub fn type_of(&self, r: Register) -> Type {
        self.types[r as usize].clone()
    }

    /// Writes a new logical expression and (optionally) a narrowed type
    /// into `r`, without skolemizing. Used by a transformer building a
    /// precise expression for a straight-line opcode, e.g. `x := a + b`.
    pub fn write(&mut self, r: Register, expr: Expr, ty: Option<Type>) {
        self.environment[r as usize] = expr;
        if let Some(ty) = ty {
            self.types[r as usize] = ty;
        }
    }

    /// Resets `r` to a fresh skolem named after the current `pc` (spec.md
    /// glossary: "Invalidate"). Used at loop entry for the modified set and
    /// by `if-is` on the non-taken side.
    pub fn invalidate(&mut self, r: Register, ty: Option<Type>) {
        self.environment[r as usize] = Expr::Skolem(r, self.pc);
        if let Some(ty) = ty {
            self.types[r as usize] = ty;
        }
    }

    pub fn push_constraint(&mut self, expr: Expr) {
        if let Some(top) = self.scopes.last_mut() {
            top.constraints.push(expr);
        }
    }

    #[must_use]
    pub fn top_scope(&self) -> &Scope {
        self.scopes.last().expect("scope stack must always contain at least the Entry scope")
    }

    fn top_scope_mut(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("scope stack must always contain at least the Entry scope")
    }

    /// Installs `false` on the top scope and drops every other scope's
    /// accumulated constraints. Idempotent: calling `kill` again leaves the
    /// top scope containing exactly `[Expr::False]`.
    pub fn kill(&mut self) {
        trace!("kill {} at pc={}", self.id, self.pc);
        for scope in &mut self.scopes {
            scope.constraints.clear();
        }
        self.top_scope_mut().constraints.push(Expr::False);
        self.terminated = true;
    }

    /// Ends this branch (e.g. on `throw`) without installing `false` — the
    /// transformer is responsible for routing the effect elsewhere (into
    /// the enclosing `TryScope`).
    pub fn terminate(&mut self) {
        self.terminated = true;
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// `true` iff the bottom scope's constraint list does not contain the
    /// literal `false` (spec.md §3's liveness invariant).
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.scopes.first().is_some_and(|s| s.constraints.contains(&Expr::False))
    }

    /// The opcode at the current `pc`.
    #[must_use]
    pub fn current_code(&self) -> Code {
        self.block.get(self.pc).code.clone()
    }

    /// Invalidates every register named by `code.slots()` that this scope
    /// kind tracks as its modified set — the common case a `DefaultTransformer`
    /// reaches for when it has no opcode-specific model.
    pub fn invalidate_written_registers(&mut self) {
        let code = self.current_code();
        for r in code.slots() {
            self.invalidate(r, None);
        }
    }

    /// Invalidates every register in the innermost `Loop`/`ForAll` scope's
    /// modified set. Called by the transformer's `enter_scope` hook.
    pub fn invalidate_modified_set(&mut self, modified: &[Register]) {
        for &r in modified {
            self.invalidate(r, None);
        }
    }

    fn push_scope(&mut self, kind: ScopeKind, end: usize) {
        self.scopes.push(Scope::new(kind, end));
    }

    fn pop_scope(&mut self) -> Scope {
        self.scopes.pop().expect("scope stack must always contain at least the Entry scope")
    }
}

/// The branch arena plus the pending-children worklist that `transform`
/// drains in fork order (spec.md §5: "child branches are processed in the
/// order in which they were forked").
pub struct Engine {
    block: Rc<Block>,
    arena: Vec<VcBranch>,
    pending: Vec<BranchId>,
}

impl Engine {
    /// Master construction (spec.md §4.F): `pc=0`, `origin=0`, the given
    /// per-parameter registers seeded with fresh named variables, and an
    /// `Entry` scope spanning the whole block.
    #[must_use]
    pub fn new(block: Block, params: &[(Register, Type, String)]) -> Self {
        let block = Rc::new(block);
        let width = block.num_slots() as usize;
        let mut environment = vec![Expr::True; width];
        let mut types = vec![Type::Any; width];
        for (r, ty, name) in params {
            environment[*r as usize] = Expr::Var(name.clone());
            types[*r as usize] = ty.clone();
        }
        let end = block.size();
        let master = VcBranch {
            id: BranchId(0),
            parent: None,
            block: Rc::clone(&block),
            environment,
            types,
            scopes: vec![Scope::new(ScopeKind::Entry, end)],
            origin: 0,
            pc: 0,
            terminated: false,
        };
        Self { block, arena: vec![master], pending: Vec::new() }
    }

    #[must_use]
    pub fn block(&self) -> &Block {
        &self.block
    }

    #[must_use]
    pub fn branch(&self, id: BranchId) -> &VcBranch {
        &self.arena[id.0]
    }

    fn fork_from(&mut self, parent: BranchId, pc: usize) -> BranchId {
        let p = &self.arena[parent.0];
        let child_id = BranchId(self.arena.len());
        let child = VcBranch {
            id: child_id,
            parent: Some(parent),
            block: Rc::clone(&p.block),
            environment: p.environment.clone(),
            types: p.types.clone(),
            scopes: p.scopes.clone(),
            origin: p.pc,
            pc,
            terminated: false,
        };
        trace!("fork {} -> {} at pc={}", parent, child_id, pc);
        self.arena.push(child);
        self.pending.push(child_id);
        child_id
    }

    fn index_of(&self, label: Label) -> Result<usize, BranchError> {
        self.block.index_of(label).ok_or(BranchError::UnknownLabel(label))
    }

    /// Pops every scope whose `end < pc`, calling `transformer.exit_scope`
    /// for each, innermost (top of stack) first — spec.md §4.F: "first pop
    /// every scope whose end < pc ... in top-down order".
    fn pop_closed_scopes<T: VcTransformer>(branch: &mut VcBranch, transformer: &mut T) -> Result<(), BranchError> {
        loop {
            let should_pop = match branch.scopes.last() {
                Some(s) if s.end < branch.pc && !matches!(s.kind, ScopeKind::Entry) => true,
                None => return Err(BranchError::EmptyScopeStack { pc: branch.pc }),
                _ => false,
            };
            if !should_pop {
                return Ok(());
            }
            let scope = branch.pop_scope();
            transformer.exit_scope(branch, &scope);
        }
    }

    /// Single-step dispatch at the branch's current `pc` (spec.md §4.F).
    /// Returns `true` if the branch is done (killed, terminated, or ran past
    /// the block's end).
    fn step<T: VcTransformer>(&mut self, id: BranchId, transformer: &mut T) -> Result<bool, BranchError> {
        {
            let branch = &mut self.arena[id.0];
            if branch.pc >= self.block.size() {
                return Err(BranchError::RanOffEnd { pc: branch.pc });
            }
            Self::pop_closed_scopes(branch, transformer)?;
        }
        let code = self.arena[id.0].current_code();
        let attrs = self.block.get(self.arena[id.0].pc).attrs.clone();

        match code {
            Code::Goto(label) => {
                let target = self.index_of(label)?;
                self.arena[id.0].pc = target;
            }
            Code::BinaryCondition { op, target, .. } => {
                let target_pc = self.index_of(target)?;
                let (left, right) = {
                    let b = &self.arena[id.0];
                    (b.read(code_left(&code)), b.read(code_right(&code)))
                };
                let child_id = self.fork_from(id, target_pc);
                let (parent_slot, child_slot) = split_two(&mut self.arena, id.0, child_id.0);
                transformer.binary_condition(parent_slot, child_slot, op, left, right);
                self.arena[id.0].pc += 1;
            }
            Code::Switch { operand, ref cases, default } => {
                let operand_expr = self.arena[id.0].read(operand);
                let case_consts: Vec<_> = cases.iter().map(|(c, _)| c.clone()).collect();
                for (constant, label) in cases {
                    let target_pc = self.index_of(*label)?;
                    let child_id = self.fork_from(id, target_pc);
                    let (parent_slot, child_slot) = split_two(&mut self.arena, id.0, child_id.0);
                    transformer.switch_case(parent_slot, child_slot, &operand_expr, constant);
                }
                transformer.switch_default(&mut self.arena[id.0], &operand_expr, &case_consts);
                let default_pc = self.index_of(default)?;
                self.arena[id.0].pc = default_pc;
            }
            Code::IfType { operand, ref ty, target } => {
                let branch = &self.arena[id.0];
                let operand_ty = branch.type_of(operand);
                let true_ty = operand_ty.intersect(ty);
                let false_ty = operand_ty.intersect(&ty.negate());
                let target_pc = self.index_of(target)?;
                if true_ty == Type::Void {
                    self.arena[id.0].invalidate(operand, Some(false_ty));
                    self.arena[id.0].pc += 1;
                } else if false_ty == Type::Void {
                    self.arena[id.0].invalidate(operand, Some(true_ty));
                    self.arena[id.0].pc = target_pc;
                } else {
                    let child_id = self.fork_from(id, target_pc);
                    self.arena[child_id.0].invalidate(operand, Some(true_ty));
                    self.arena[id.0].invalidate(operand, Some(false_ty));
                    self.arena[id.0].pc += 1;
                }
            }
            Code::Loop { end, ref modified } => {
                let end_pc = self.index_of(end)?;
                let modified = modified.clone();
                let branch = &mut self.arena[id.0];
                branch.push_scope(ScopeKind::Loop, end_pc);
                transformer.enter_scope(branch);
                branch.invalidate_modified_set(&modified);
                branch.pc += 1;
            }
            Code::ForAll { end, ref modified, source, index } => {
                let end_pc = self.index_of(end)?;
                let modified = modified.clone();
                let branch = &mut self.arena[id.0];
                branch.push_scope(ScopeKind::ForAll { source, index }, end_pc);
                transformer.enter_scope(branch);
                branch.invalidate_modified_set(&modified);
                branch.invalidate(index, None);
                branch.pc += 1;
            }
            Code::TryCatch { end, ref modified, catch } => {
                let end_pc = self.index_of(end)?;
                let modified = modified.clone();
                let branch = &mut self.arena[id.0];
                branch.push_scope(ScopeKind::Try { catch }, end_pc);
                transformer.enter_scope(branch);
                branch.invalidate_modified_set(&modified);
                branch.pc += 1;
            }
            Code::Assert { end } => {
                let end_pc = self.index_of(end)?;
                let branch = &mut self.arena[id.0];
                branch.push_scope(ScopeKind::AssertOrAssume { is_assert: true }, end_pc);
                transformer.enter_scope(branch);
                branch.pc += 1;
            }
            Code::Assume { end } => {
                let end_pc = self.index_of(end)?;
                let branch = &mut self.arena[id.0];
                branch.push_scope(ScopeKind::AssertOrAssume { is_assert: false }, end_pc);
                transformer.enter_scope(branch);
                branch.pc += 1;
            }
            Code::Label(_) | Code::Nop => {
                self.arena[id.0].pc += 1;
            }
            Code::Return(value) => {
                transformer.on_return(&mut self.arena[id.0], value);
                return Ok(true);
            }
            Code::Fail(ref message) => {
                transformer.on_fail(&mut self.arena[id.0], message);
                return Ok(true);
            }
            Code::Throw(value) => {
                transformer.on_throw(&mut self.arena[id.0], value);
                return Ok(true);
            }
            _ => {
                transformer.straight_line(&mut self.arena[id.0], &attrs)?;
                self.arena[id.0].pc += 1;
            }
        }

        let branch = &self.arena[id.0];
        Ok(branch.is_terminated() || !branch.is_live())
    }

    /// Checks for the `loop-end` marker that pairs with a `Loop`/`ForAll`
    /// scope: a `Label` entry whose index equals the innermost such scope's
    /// `end`. Spec.md models `loop-end` as an implicit consequence of
    /// `pc` reaching that label rather than a distinct opcode tag, since
    /// `Loop`/`ForAll` already carry their own `end` field (§3).
    fn maybe_close_loop<T: VcTransformer>(&mut self, id: BranchId, transformer: &mut T) -> bool {
        loop {
            let branch = &self.arena[id.0];
            let at_loop_end = matches!(
                branch.scopes.last(),
                Some(s) if s.end == branch.pc && matches!(s.kind, ScopeKind::Loop | ScopeKind::ForAll { .. })
            );
            if !at_loop_end {
                return false;
            }
            let scope = self.arena[id.0].pop_scope();
            if scope.is_for() {
                transformer.end_for(&mut self.arena[id.0], &scope);
                self.arena[id.0].pc += 1;
            } else {
                transformer.end_loop(&mut self.arena[id.0], &scope);
                return true;
            }
        }
    }

    /// Splits two previously forked descendants back at their first common
    /// ancestor point, conjoining their post-fork constraints under an
    /// `Or` on the parent (spec.md's `join`). Called by `transform` once a
    /// child's walk is complete.
    fn join(&mut self, parent: BranchId, child: BranchId) {
        let child_top = self.arena[child.0].top_scope().constraints.clone();
        let parent_top = self.arena[parent.0].top_scope().constraints.clone();
        let common_len = parent_top.iter().zip(&child_top).take_while(|(a, b)| a == b).count();
        let common = parent_top[..common_len].to_vec();
        let left_remainder = parent_top[common_len..].to_vec();
        let right_remainder = child_top[common_len..].to_vec();
        trace!("join {} <- {}: common={} left={} right={}", parent, child, common_len, left_remainder.len(), right_remainder.len());
        let mut merged = common;
        if left_remainder == right_remainder {
            // Both sides ran the identical opcodes after the fork (spec.md
            // §8 property 5): no actual divergence, so the remainder is
            // appended as-is instead of wrapped in a spurious `Or(x, x)`.
            merged.extend(left_remainder);
        } else {
            merged.push(Expr::Or(vec![Expr::conjoin(left_remainder), Expr::conjoin(right_remainder)]));
        }
        self.arena[parent.0].top_scope_mut().constraints = merged;
    }

    /// Walks one branch to completion: steps until killed, terminated, or a
    /// `loop-end` closes its innermost loop scope.
    fn run_one<T: VcTransformer>(&mut self, id: BranchId, transformer: &mut T) -> Result<(), BranchError> {
        loop {
            if self.maybe_close_loop(id, transformer) {
                return Ok(());
            }
            if self.step(id, transformer)? {
                return Ok(());
            }
        }
    }

    /// Walks the master branch to completion, then — in fork order — walks
    /// each queued child the same way and joins it back into its parent
    /// (spec.md §4.F "Transform driver"). Returns the conjunction of every
    /// scope's constraint list on the master, outer-to-inner.
    pub fn transform<T: VcTransformer>(&mut self, transformer: &mut T) -> Result<Expr, BranchError> {
        let master = BranchId(0);
        self.run_one(master, transformer)?;
        let mut i = 0;
        while i < self.pending.len() {
            let child = self.pending[i];
            i += 1;
            self.run_one(child, transformer)?;
            if let Some(parent) = self.arena[child.0].parent {
                self.join(parent, child);
            }
        }
        let master_branch = &self.arena[master.0];
        Ok(Expr::conjoin(master_branch.scopes.iter().map(|s| Expr::conjoin(s.constraints.clone())).collect()))
    }
}

fn code_left(code: &Code) -> Register {
    match code {
        Code::BinaryCondition { left, .. } => *left,
        _ => unreachable!("code_left called on non-BinaryCondition"),
    }
}

fn code_right(code: &Code) -> Register {
    match code {
        Code::BinaryCondition { right, .. } => *right,
        _ => unreachable!("code_right called on non-BinaryCondition"),
    }
}

/// Borrows two distinct elements of `arena` mutably at once. `a` and `b` are
/// always distinct arena indices here: `b` is freshly pushed by `fork_from`
/// and is always the last element, `a` an earlier one.
fn split_two(arena: &mut [VcBranch], a: usize, b: usize) -> (&mut VcBranch, &mut VcBranch) {
    assert_ne!(a, b);
    if a < b {
        let (left, right) = arena.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = arena.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::block::Entry;
    use crate::ir::code::{BinaryOp, Comparator, LabelGen};
    use crate::transformer::DefaultTransformer;

    fn simple_return_block() -> Block {
        Block::new(vec![Entry::new(Code::Return(None))])
    }

    #[test]
    fn master_branch_starts_at_pc_zero() {
        let engine = Engine::new(simple_return_block(), &[]);
        assert_eq!(engine.branch(BranchId(0)).pc(), 0);
        assert_eq!(engine.branch(BranchId(0)).origin(), 0);
    }

    #[test]
    fn transform_on_return_yields_true() {
        let mut engine = Engine::new(simple_return_block(), &[]);
        let mut t = DefaultTransformer::new();
        let expr = engine.transform(&mut t).unwrap();
        assert_eq!(expr, Expr::True);
    }

    #[test]
    fn fork_and_join_recovers_common_prefix() {
        let mut gen = LabelGen::default();
        let l_then = gen.fresh();
        let block = Block::new(vec![
            Entry::new(Code::BinaryCondition { op: Comparator::Ge, left: 0, right: 0, target: l_then }),
            Entry::new(Code::Return(None)),
            Entry::new(Code::Label(l_then)),
            Entry::new(Code::Return(None)),
        ]);
        let mut engine = Engine::new(block, &[(0, Type::Int, "x".into())]);
        let mut t = DefaultTransformer::new();
        let expr = engine.transform(&mut t).unwrap();
        match expr {
            Expr::Or(_) => {}
            other => panic!("expected an Or at the fork point, got {other:?}"),
        }
    }

    #[test]
    fn kill_is_idempotent() {
        let mut engine = Engine::new(simple_return_block(), &[]);
        engine.arena[0].kill();
        engine.arena[0].kill();
        assert_eq!(engine.arena[0].top_scope().constraints, vec![Expr::False]);
    }

    /// Spec.md §8 scenario (c): an `int | null` register subjected to
    /// `if-is null` ends up retyped to `Null` on the taken side and
    /// narrowed to `Int` on the side that falls through.
    #[test]
    fn if_type_narrows_both_sides() {
        let mut gen = LabelGen::default();
        let l_null = gen.fresh();
        let block = Block::new(vec![
            Entry::new(Code::IfType { operand: 0, ty: Type::Null, target: l_null }),
            Entry::new(Code::Return(None)),
            Entry::new(Code::Label(l_null)),
            Entry::new(Code::Return(None)),
        ]);
        let union_ty = Type::union(vec![Type::Int, Type::Null]);
        let mut engine = Engine::new(block, &[(0, union_ty, "r0".into())]);
        let mut t = DefaultTransformer::new();
        engine.step(BranchId(0), &mut t).unwrap();
        assert_eq!(engine.arena[0].type_of(0), Type::Int);
        assert_eq!(engine.arena[1].type_of(0), Type::Null);
    }

    /// Spec.md §8 scenario (f), the fork/join cancellation example given
    /// literally: `[p, q]` forks, the child adds `r`, the parent adds
    /// `s`, and the join yields `[p, q, Or(s, r)]` with the shared prefix
    /// unchanged. `Expr` is a plain value (not `Rc`-shared) in this
    /// model, so "pointer-identical" is checked here as the weaker but
    /// externally-observable structural equality `join` actually
    /// provides.
    #[test]
    fn join_combines_common_prefix_and_disjoins_remainder() {
        let mut engine = Engine::new(simple_return_block(), &[]);
        let p = Expr::Var("p".into());
        let q = Expr::Var("q".into());
        engine.arena[0].scopes[0].constraints = vec![p.clone(), q.clone()];
        let child_id = engine.fork_from(BranchId(0), 0);
        let r = Expr::Var("r".into());
        engine.arena[child_id.0].scopes[0].constraints.push(r.clone());
        let s = Expr::Var("s".into());
        engine.arena[0].scopes[0].constraints.push(s.clone());
        engine.join(BranchId(0), child_id);
        let merged = &engine.arena[0].scopes[0].constraints;
        assert_eq!(&merged[..2], &[p, q][..]);
        assert_eq!(merged[2], Expr::Or(vec![s, r]));
    }

    /// Spec.md §8 property 5: a branch forks, both sides execute the
    /// identical opcodes, then join. The top-scope constraints after the
    /// join must be the pre-fork list verbatim, with no trailing `Or` —
    /// `join` must not materialize a disjunction between two sides that
    /// never actually diverged.
    #[test]
    fn join_collapses_to_common_prefix_when_remainders_agree() {
        let mut engine = Engine::new(simple_return_block(), &[]);
        let p = Expr::Var("p".into());
        let q = Expr::Var("q".into());
        engine.arena[0].scopes[0].constraints = vec![p.clone(), q.clone()];
        let pre_fork = engine.arena[0].scopes[0].constraints.clone();
        let child_id = engine.fork_from(BranchId(0), 0);
        let t = Expr::Var("t".into());
        engine.arena[child_id.0].scopes[0].constraints.push(t.clone());
        engine.arena[0].scopes[0].constraints.push(t.clone());
        engine.join(BranchId(0), child_id);
        let merged = &engine.arena[0].scopes[0].constraints;
        let mut expected = pre_fork;
        expected.push(t);
        assert_eq!(merged, &expected);
        assert!(!merged.iter().any(|c| matches!(c, Expr::Or(_))));
    }

    #[test]
    fn binary_assign_is_straight_line() {
        let block = Block::new(vec![
            Entry::new(Code::BinaryAssign { op: BinaryOp::Add, target: 1, left: 0, right: 0 }),
            Entry::new(Code::Return(None)),
        ]);
        let mut engine = Engine::new(block, &[(0, Type::Int, "x".into())]);
        let mut t = DefaultTransformer::new();
        engine.transform(&mut t).unwrap();
    }
}
