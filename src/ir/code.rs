//! The `Code` bytecode sum type (component C) plus the small value types it
//! is built from: registers, labels, and the maps used to renumber/rename
//! them during `shift`/`relabel`.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::ir::constant::Constant;
use crate::ir::name::QualifiedName;
use crate::ir::ty::Type;

/// An operand slot. The on-disk grammar encodes a register as a single
/// byte (§4.D); in memory we keep the wider `u16` the spec's own
/// `RegisterMap` type uses, since nothing in this model depends on the
/// wire width.
pub type Register = u16;

/// A block-local branch target, freshened by [`crate::ir::block::Block::relabel`].
/// `Label`s compare by identity (their numeric id), never by the string
/// form a `Display` impl produces. Per §9 ("scope the counters per engine
/// instance and thread them explicitly"), freshness is only guaranteed
/// between labels drawn from the *same* threaded `LabelGen`; relabeling two
/// copies of a block from that one shared generator is what spec.md §8
/// property 3 ("relabel() applied to two independent copies of B produces
/// disjoint label sets") means by "independent copies" — two unrelated
/// `LabelGen`s are not required to avoid each other's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(u64);

impl Label {
    /// Only `LabelGen` should call this; exposed `pub(crate)` so the codec
    /// reader can materialize labels at deserialized branch targets (§9,
    /// open question 4) without going through a counter of its own.
    pub(crate) fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blklab{}", self.0)
    }
}

/// Per-engine-instance fresh label source (§9: "scope the counters per
/// engine instance and thread them explicitly" — replacing the source's
/// global counter, which the spec flags as a determinism hazard under
/// parallel compilation).
#[derive(Debug, Clone)]
pub struct LabelGen {
    next: u64,
    prefix: &'static str,
}

impl LabelGen {
    pub fn new(prefix: &'static str) -> Self {
        Self { next: 0, prefix }
    }

    pub fn fresh(&mut self) -> Label {
        let id = self.next;
        self.next += 1;
        Label::from_raw(id)
    }

    pub fn prefix(&self) -> &'static str {
        self.prefix
    }
}

impl Default for LabelGen {
    fn default() -> Self {
        Self::new("blklab")
    }
}

/// Renumbers registers, e.g. the "add k to every register" map `Block::shift`
/// builds, or an arbitrary renaming a transform needs.
#[derive(Debug, Clone, Default)]
pub struct RegisterMap(HashMap<Register, Register>);

impl RegisterMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: Register, to: Register) {
        self.0.insert(from, to);
    }

    /// A map that adds `k` to every register in `0..width`, except the
    /// registers listed in `preserve` (the input slots `Block::shift`'s
    /// contract carves out).
    pub fn shift(width: Register, k: Register, preserve: &[Register]) -> Self {
        let mut map = HashMap::new();
        for r in 0..width {
            if preserve.contains(&r) {
                map.insert(r, r);
            } else {
                map.insert(r, r + k);
            }
        }
        Self(map)
    }

    pub fn apply(&self, r: Register) -> Register {
        self.0.get(&r).copied().unwrap_or(r)
    }
}

/// Renames labels, built fresh by `Block::relabel` for every internally
/// defined label.
#[derive(Debug, Clone, Default)]
pub struct LabelMap(HashMap<Label, Label>);

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: Label, to: Label) {
        self.0.insert(from, to);
    }

    pub fn apply(&self, l: Label) -> Label {
        self.0.get(&l).copied().unwrap_or(l)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Move,
    Convert,
    Invert,
    Negate,
    Dereference,
    NewObject,
    LengthOf,
    Debug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

/// One opcode. Variants are grouped the way spec.md's Code entity groups
/// them: unary, binary-condition, binary-assign, n-ary-assign, control,
/// scoped.
#[derive(Debug, Clone, PartialEq)]
pub enum Code {
    // --- unary: target = op(source : ty) ---
    Unary { op: UnaryOp, target: Register, source: Register, ty: Type },

    // --- binary-condition: compare two sources, branch on the result ---
    BinaryCondition { op: Comparator, left: Register, right: Register, target: Label },

    // --- binary-assign: target = left op right ---
    BinaryAssign { op: BinaryOp, target: Register, left: Register, right: Register },

    // --- n-ary-assign ---
    Const { target: Register, value: Constant },
    ListConstruct { target: Register, elements: Vec<Register>, ty: Type },
    SetConstruct { target: Register, elements: Vec<Register>, ty: Type },
    MapConstruct { target: Register, entries: Vec<(Register, Register)>, ty: Type },
    TupleConstruct { target: Register, elements: Vec<Register> },
    RecordConstruct { target: Register, fields: Vec<(String, Register)>, ty: Type },
    FieldLoad { target: Register, source: Register, field: String },
    TupleLoad { target: Register, source: Register, index: usize },
    IndexOf { target: Register, source: Register, index: Register },
    Update { target: Register, source: Register, index: Register, value: Register },
    DirectInvoke { target: Option<Register>, name: QualifiedName, args: Vec<Register> },
    IndirectInvoke { target: Option<Register>, callee: Register, args: Vec<Register> },

    // --- control ---
    Goto(Label),
    IfType { operand: Register, ty: Type, target: Label },
    Switch { operand: Register, cases: Vec<(Constant, Label)>, default: Label },
    Return(Option<Register>),
    Throw(Register),
    Fail(String),
    Nop,
    Label(Label),

    // --- scoped: carry `end` and the modified-set the VC engine invalidates ---
    Loop { end: Label, modified: Vec<Register> },
    ForAll { end: Label, modified: Vec<Register>, source: Register, index: Register },
    TryCatch { end: Label, modified: Vec<Register>, catch: Label },
    Assert { end: Label },
    Assume { end: Label },
}

impl Code {
    /// The set of registers this opcode reads or writes.
    #[must_use]
    pub fn slots(&self) -> BTreeSet<Register> {
        let mut s = BTreeSet::new();
        match self {
            Code::Unary { target, source, .. } => {
                s.insert(*target);
                s.insert(*source);
            }
            Code::BinaryCondition { left, right, .. } => {
                s.insert(*left);
                s.insert(*right);
            }
            Code::BinaryAssign { target, left, right, .. } => {
                s.insert(*target);
                s.insert(*left);
                s.insert(*right);
            }
            Code::Const { target, .. } => {
                s.insert(*target);
            }
            Code::ListConstruct { target, elements, .. } | Code::SetConstruct { target, elements, .. } => {
                s.insert(*target);
                s.extend(elements);
            }
            Code::MapConstruct { target, entries, .. } => {
                s.insert(*target);
                for (k, v) in entries {
                    s.insert(*k);
                    s.insert(*v);
                }
            }
            Code::TupleConstruct { target, elements } => {
                s.insert(*target);
                s.extend(elements);
            }
            Code::RecordConstruct { target, fields, .. } => {
                s.insert(*target);
                s.extend(fields.iter().map(|(_, r)| *r));
            }
            Code::FieldLoad { target, source, .. } | Code::TupleLoad { target, source, .. } => {
                s.insert(*target);
                s.insert(*source);
            }
            Code::IndexOf { target, source, index } => {
                s.insert(*target);
                s.insert(*source);
                s.insert(*index);
            }
            Code::Update { target, source, index, value } => {
                s.insert(*target);
                s.insert(*source);
                s.insert(*index);
                s.insert(*value);
            }
            Code::DirectInvoke { target, args, .. } => {
                if let Some(t) = target {
                    s.insert(*t);
                }
                s.extend(args);
            }
            Code::IndirectInvoke { target, callee, args } => {
                if let Some(t) = target {
                    s.insert(*t);
                }
                s.insert(*callee);
                s.extend(args);
            }
            Code::Goto(_) | Code::Fail(_) | Code::Nop | Code::Label(_) => {}
            Code::IfType { operand, .. } => {
                s.insert(*operand);
            }
            Code::Switch { operand, .. } => {
                s.insert(*operand);
            }
            Code::Return(r) => {
                if let Some(r) = r {
                    s.insert(*r);
                }
            }
            Code::Throw(r) => {
                s.insert(*r);
            }
            Code::Loop { modified, .. } => s.extend(modified),
            Code::ForAll { modified, source, index, .. } => {
                s.extend(modified);
                s.insert(*source);
                s.insert(*index);
            }
            Code::TryCatch { modified, .. } => s.extend(modified),
            Code::Assert { .. } | Code::Assume { .. } => {}
        }
        s
    }

    /// Renumbers every register this opcode touches through `map`, leaving
    /// everything else (labels, types, constants) untouched.
    #[must_use]
    pub fn remap(&self, map: &RegisterMap) -> Code {
        let r = |x: Register| map.apply(x);
        let ro = |x: Option<Register>| x.map(r);
        let rs = |xs: &[Register]| xs.iter().map(|x| r(*x)).collect::<Vec<_>>();
        match self {
            Code::Unary { op, target, source, ty } => {
                Code::Unary { op: *op, target: r(*target), source: r(*source), ty: ty.clone() }
            }
            Code::BinaryCondition { op, left, right, target } => {
                Code::BinaryCondition { op: *op, left: r(*left), right: r(*right), target: *target }
            }
            Code::BinaryAssign { op, target, left, right } => {
                Code::BinaryAssign { op: *op, target: r(*target), left: r(*left), right: r(*right) }
            }
            Code::Const { target, value } => Code::Const { target: r(*target), value: value.clone() },
            Code::ListConstruct { target, elements, ty } => {
                Code::ListConstruct { target: r(*target), elements: rs(elements), ty: ty.clone() }
            }
            Code::SetConstruct { target, elements, ty } => {
                Code::SetConstruct { target: r(*target), elements: rs(elements), ty: ty.clone() }
            }
            Code::MapConstruct { target, entries, ty } => Code::MapConstruct {
                target: r(*target),
                entries: entries.iter().map(|(k, v)| (r(*k), r(*v))).collect(),
                ty: ty.clone(),
            },
            Code::TupleConstruct { target, elements } => {
                Code::TupleConstruct { target: r(*target), elements: rs(elements) }
            }
            Code::RecordConstruct { target, fields, ty } => Code::RecordConstruct {
                target: r(*target),
                fields: fields.iter().map(|(n, reg)| (n.clone(), r(*reg))).collect(),
                ty: ty.clone(),
            },
            Code::FieldLoad { target, source, field } => {
                Code::FieldLoad { target: r(*target), source: r(*source), field: field.clone() }
            }
            Code::TupleLoad { target, source, index } => {
                Code::TupleLoad { target: r(*target), source: r(*source), index: *index }
            }
            Code::IndexOf { target, source, index } => {
                Code::IndexOf { target: r(*target), source: r(*source), index: r(*index) }
            }
            Code::Update { target, source, index, value } => {
                Code::Update { target: r(*target), source: r(*source), index: r(*index), value: r(*value) }
            }
            Code::DirectInvoke { target, name, args } => {
                Code::DirectInvoke { target: ro(*target), name: name.clone(), args: rs(args) }
            }
            Code::IndirectInvoke { target, callee, args } => {
                Code::IndirectInvoke { target: ro(*target), callee: r(*callee), args: rs(args) }
            }
            Code::Goto(l) => Code::Goto(*l),
            Code::IfType { operand, ty, target } => {
                Code::IfType { operand: r(*operand), ty: ty.clone(), target: *target }
            }
            Code::Switch { operand, cases, default } => {
                Code::Switch { operand: r(*operand), cases: cases.clone(), default: *default }
            }
            Code::Return(reg) => Code::Return(ro(*reg)),
            Code::Throw(reg) => Code::Throw(r(*reg)),
            Code::Fail(msg) => Code::Fail(msg.clone()),
            Code::Nop => Code::Nop,
            Code::Label(l) => Code::Label(*l),
            Code::Loop { end, modified } => Code::Loop { end: *end, modified: rs(modified) },
            Code::ForAll { end, modified, source, index } => {
                Code::ForAll { end: *end, modified: rs(modified), source: r(*source), index: r(*index) }
            }
            Code::TryCatch { end, modified, catch } => {
                Code::TryCatch { end: *end, modified: rs(modified), catch: *catch }
            }
            Code::Assert { end } => Code::Assert { end: *end },
            Code::Assume { end } => Code::Assume { end: *end },
        }
    }

    /// Renames every label this opcode refers to (targets and `end`
    /// fields) through `map`, leaving registers, types, and constants
    /// untouched.
    #[must_use]
    pub fn relabel(&self, map: &LabelMap) -> Code {
        let l = |x: Label| map.apply(x);
        match self {
            Code::BinaryCondition { op, left, right, target } => {
                Code::BinaryCondition { op: *op, left: *left, right: *right, target: l(*target) }
            }
            Code::Goto(t) => Code::Goto(l(*t)),
            Code::IfType { operand, ty, target } => {
                Code::IfType { operand: *operand, ty: ty.clone(), target: l(*target) }
            }
            Code::Switch { operand, cases, default } => Code::Switch {
                operand: *operand,
                cases: cases.iter().map(|(c, t)| (c.clone(), l(*t))).collect(),
                default: l(*default),
            },
            Code::Label(t) => Code::Label(l(*t)),
            Code::Loop { end, modified } => Code::Loop { end: l(*end), modified: modified.clone() },
            Code::ForAll { end, modified, source, index } => {
                Code::ForAll { end: l(*end), modified: modified.clone(), source: *source, index: *index }
            }
            Code::TryCatch { end, modified, catch } => {
                Code::TryCatch { end: l(*end), modified: modified.clone(), catch: l(*catch) }
            }
            Code::Assert { end } => Code::Assert { end: l(*end) },
            Code::Assume { end } => Code::Assume { end: l(*end) },
            other => other.clone(),
        }
    }

    /// The label this opcode would pop a scope at, if any.
    #[must_use]
    pub fn scope_end(&self) -> Option<Label> {
        match self {
            Code::Loop { end, .. }
            | Code::ForAll { end, .. }
            | Code::TryCatch { end, .. }
            | Code::Assert { end }
            | Code::Assume { end } => Some(*end),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_map_preserves_listed_inputs() {
        let map = RegisterMap::shift(4, 3, &[0]);
        assert_eq!(map.apply(0), 0);
        assert_eq!(map.apply(1), 4);
        assert_eq!(map.apply(3), 6);
    }

    #[test]
    fn remap_touches_only_registers() {
        let mut map = RegisterMap::new();
        map.insert(0, 10);
        map.insert(1, 11);
        let code = Code::BinaryAssign { op: BinaryOp::Add, target: 0, left: 0, right: 1 };
        let shifted = code.remap(&map);
        assert_eq!(shifted, Code::BinaryAssign { op: BinaryOp::Add, target: 10, left: 10, right: 11 });
    }

    #[test]
    fn relabel_touches_only_labels() {
        let mut gen = LabelGen::default();
        let old = gen.fresh();
        let new = gen.fresh();
        let mut map = LabelMap::new();
        map.insert(old, new);
        let code = Code::Goto(old);
        assert_eq!(code.relabel(&map), Code::Goto(new));
    }

    #[test]
    fn slots_collects_reads_and_writes() {
        let code = Code::BinaryAssign { op: BinaryOp::Add, target: 2, left: 0, right: 1 };
        assert_eq!(code.slots(), BTreeSet::from([0, 1, 2]));
    }
}
