//! Component G: the `VcTransformer` interface. A pure function per opcode
//! class plus `enter`/`exit`/`end` hooks for scopes (spec §4.G). This module
//! also defines the `Expr` the transformer builds and the `Obligation` it
//! emits to the external solver — both consumed-but-unspecified in spec.md
//! §6, so this crate supplements them (SPEC_FULL.md §F.3-4).

use std::fmt;

use crate::ir::block::{AttrBag, Scope};
use crate::ir::code::{BinaryOp, Comparator, Register};
use crate::ir::constant::Constant;
use crate::ir::name::QualifiedName;
use crate::branch::{BranchError, VcBranch};

/// A logical expression built by the transformer. Minimal but sufficient to
/// express everything spec.md §4.G's transformer emits: boolean
/// connectives, comparison, arithmetic, uninterpreted function application
/// (direct/indirect invoke), and the list/set/map operators a `forall` or
/// `index-of` lowers to. A real solver binding translates this into its own
/// AST; that translation is out of scope (spec.md §1).
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    True,
    False,
    /// A named logical variable, e.g. a function parameter.
    Var(String),
    /// A fresh logical variable introduced by invalidation: `r<register>_<pc>`.
    Skolem(Register, usize),
    Literal(Constant),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Implies(Box<Expr>, Box<Expr>),
    Cmp(Comparator, Box<Expr>, Box<Expr>),
    Arith(BinaryOp, Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Invert(Box<Expr>),
    Call(QualifiedName, Vec<Expr>),
    FieldOf(Box<Expr>, String),
    TupleOf(Box<Expr>, usize),
    IndexOf(Box<Expr>, Box<Expr>),
    LengthOf(Box<Expr>),
    /// Set/list membership, as emitted when lowering a `forall` domain check.
    In(Box<Expr>, Box<Expr>),
    /// `forall var in domain. body`, the shape a `ForAll` scope's obligation
    /// takes (spec.md §8 scenario (d)).
    Forall(String, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Conjoins a scope's constraint list, outer-to-inner, the way
    /// `VcBranch::transform` folds the whole branch at the end (spec §4.F).
    #[must_use]
    pub fn conjoin(mut exprs: Vec<Expr>) -> Expr {
        match exprs.len() {
            0 => Expr::True,
            1 => exprs.pop().unwrap(),
            _ => Expr::And(exprs),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::True => write!(f, "true"),
            Expr::False => write!(f, "false"),
            Expr::Var(name) => write!(f, "{name}"),
            Expr::Skolem(r, pc) => write!(f, "r{r}_{pc}"),
            Expr::Literal(c) => write!(f, "{c}"),
            Expr::Not(e) => write!(f, "!{e}"),
            Expr::And(es) => write!(f, "({})", join(es, " && ")),
            Expr::Or(es) => write!(f, "({})", join(es, " || ")),
            Expr::Implies(a, b) => write!(f, "({a} ==> {b})"),
            Expr::Cmp(op, a, b) => write!(f, "({a} {} {b})", comparator_symbol(*op)),
            Expr::Arith(op, a, b) => write!(f, "({a} {} {b})", arith_symbol(*op)),
            Expr::Neg(e) => write!(f, "-{e}"),
            Expr::Invert(e) => write!(f, "!{e}"),
            Expr::Call(name, args) => write!(f, "{name}({})", join(args, ", ")),
            Expr::FieldOf(e, field) => write!(f, "{e}.{field}"),
            Expr::TupleOf(e, i) => write!(f, "{e}.{i}"),
            Expr::IndexOf(e, i) => write!(f, "{e}[{i}]"),
            Expr::LengthOf(e) => write!(f, "|{e}|"),
            Expr::In(e, dom) => write!(f, "{e} in {dom}"),
            Expr::Forall(v, dom, body) => write!(f, "forall {v} in {dom}. {body}"),
        }
    }
}

fn join(exprs: &[Expr], sep: &str) -> String {
    exprs.iter().map(Expr::to_string).collect::<Vec<_>>().join(sep)
}

fn comparator_symbol(op: Comparator) -> &'static str {
    match op {
        Comparator::Eq => "==",
        Comparator::Neq => "!=",
        Comparator::Lt => "<",
        Comparator::Le => "<=",
        Comparator::Gt => ">",
        Comparator::Ge => ">=",
    }
}

fn arith_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Rem => "%",
        BinaryOp::BitwiseAnd => "&",
        BinaryOp::BitwiseOr => "|",
        BinaryOp::BitwiseXor => "^",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
    }
}

/// The four obligation shapes spec.md §4.G enumerates: a precondition check
/// at a call site, an `assert`, a loop invariant holding on entry and on the
/// back-edge, and an implicit division-by-zero check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObligationKind {
    Precondition,
    Assertion,
    LoopInvariantEntry,
    LoopInvariantBackEdge,
    DivisionByZero,
}

/// A verification condition submitted to the external solver: the
/// conjunction of every constraint live at the moment of emission, conjoined
/// with the specific property under check, plus the originating attribute
/// bag so a `VerificationFailure` can report a location without this crate
/// interpreting it.
#[derive(Debug, Clone)]
pub struct Obligation {
    pub expr: Expr,
    pub kind: ObligationKind,
    pub site: AttrBag,
}

/// Component G. Each handler mutates the branch it is given (writing
/// registers, appending constraints to the top scope) and may emit
/// obligations through `self`. Language-agnostic: a different target logic
/// re-parameterizes this trait, not `branch::VcBranch`.
pub trait VcTransformer {
    /// Dispatch one straight-line opcode (everything in spec.md §4.F's
    /// first bullet). Implementations typically write a fresh `Expr` into
    /// `branch.environment[target]` and may push a constraint.
    fn straight_line(&mut self, branch: &mut VcBranch, attrs: &AttrBag) -> Result<(), BranchError>;

    /// Populate the falsethrough constraint (pushed onto `parent`) and the
    /// taken constraint (pushed onto `child`) for a `BinaryCondition` fork.
    fn binary_condition(&mut self, parent: &mut VcBranch, child: &mut VcBranch, op: Comparator, left: Expr, right: Expr);

    /// Populate one `Switch` case's constraint on `child` (`operand ==
    /// case`) before it jumps to the case label.
    fn switch_case(&mut self, parent: &mut VcBranch, child: &mut VcBranch, operand: &Expr, case: &Constant);

    /// Populate the default-case constraint on `parent` (`operand` distinct
    /// from every listed case).
    fn switch_default(&mut self, parent: &mut VcBranch, operand: &Expr, cases: &[Constant]);

    /// Called when a `Loop`/`ForAll`/`TryCatch`/`Assert`/`Assume` opcode is
    /// dispatched, after the corresponding `Scope` has been pushed.
    fn enter_scope(&mut self, branch: &mut VcBranch);

    /// Called for every scope popped because `pc` advanced past its `end`,
    /// top-down (innermost first). Not called for a `Loop`/`ForAll` scope
    /// popped explicitly by a `loop-end` opcode — see `end_for`/`end_loop`.
    fn exit_scope(&mut self, branch: &mut VcBranch, scope: &Scope);

    /// `loop-end` encountered for a `ForScope`: emit the invariant
    /// obligation, the branch continues past the loop.
    fn end_for(&mut self, branch: &mut VcBranch, scope: &Scope);

    /// `loop-end` encountered for a plain `LoopScope`: emit the back-edge
    /// obligation; the branch terminates (spec.md §4.F: "loop invariants
    /// are responsible for what a successor would otherwise learn").
    fn end_loop(&mut self, branch: &mut VcBranch, scope: &Scope);

    fn on_return(&mut self, branch: &mut VcBranch, value: Option<Register>);
    fn on_fail(&mut self, branch: &mut VcBranch, message: &str);
    fn on_throw(&mut self, branch: &mut VcBranch, value: Register);

    /// Obligations accumulated so far, e.g. for a caller to drain after
    /// `branch::VcBranch::transform` returns.
    fn obligations(&self) -> &[Obligation];
}

/// A reference, language-agnostic implementation used by this crate's own
/// tests: invalidates written registers to skolems, builds straightforward
/// `Expr`s for arithmetic and comparisons, and emits an obligation for every
/// `assert`/division/precondition site it is told about.
#[derive(Debug, Default)]
pub struct DefaultTransformer {
    obligations: Vec<Obligation>,
}

impl DefaultTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, expr: Expr, kind: ObligationKind, site: AttrBag) {
        self.obligations.push(Obligation { expr, kind, site });
    }
}

impl VcTransformer for DefaultTransformer {
    fn straight_line(&mut self, branch: &mut VcBranch, _attrs: &AttrBag) -> Result<(), BranchError> {
        branch.invalidate_written_registers();
        Ok(())
    }

    fn binary_condition(&mut self, parent: &mut VcBranch, child: &mut VcBranch, op: Comparator, left: Expr, right: Expr) {
        let taken = Expr::Cmp(op, Box::new(left.clone()), Box::new(right.clone()));
        let falsethrough = Expr::Not(Box::new(taken.clone()));
        child.push_constraint(taken);
        parent.push_constraint(falsethrough);
    }

    fn switch_case(&mut self, _parent: &mut VcBranch, child: &mut VcBranch, operand: &Expr, case: &Constant) {
        child.push_constraint(Expr::Cmp(Comparator::Eq, Box::new(operand.clone()), Box::new(Expr::Literal(case.clone()))));
    }

    fn switch_default(&mut self, parent: &mut VcBranch, operand: &Expr, cases: &[Constant]) {
        let negs = cases
            .iter()
            .map(|c| Expr::Not(Box::new(Expr::Cmp(Comparator::Eq, Box::new(operand.clone()), Box::new(Expr::Literal(c.clone()))))))
            .collect();
        parent.push_constraint(Expr::And(negs));
    }

    fn enter_scope(&mut self, _branch: &mut VcBranch) {}

    fn exit_scope(&mut self, _branch: &mut VcBranch, _scope: &Scope) {}

    fn end_for(&mut self, branch: &mut VcBranch, scope: &Scope) {
        let expr = Expr::conjoin(scope.constraints.clone());
        self.emit(expr, ObligationKind::LoopInvariantEntry, AttrBag::new());
        let _ = branch;
    }

    fn end_loop(&mut self, branch: &mut VcBranch, scope: &Scope) {
        let expr = Expr::conjoin(scope.constraints.clone());
        self.emit(expr, ObligationKind::LoopInvariantBackEdge, AttrBag::new());
        branch.kill();
    }

    fn on_return(&mut self, branch: &mut VcBranch, _value: Option<Register>) {
        branch.kill();
    }

    fn on_fail(&mut self, branch: &mut VcBranch, _message: &str) {
        branch.kill();
    }

    fn on_throw(&mut self, branch: &mut VcBranch, _value: Register) {
        branch.terminate();
    }

    fn obligations(&self) -> &[Obligation] {
        &self.obligations
    }
}
