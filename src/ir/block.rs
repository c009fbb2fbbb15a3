//! `Block`, `Entry`, and `Scope` (component C): an ordered bytecode
//! sequence plus the scope-stack shapes the VC engine pushes while walking
//! one.

use crate::ir::code::{Code, Label, LabelGen, LabelMap, Register, RegisterMap};

/// An opaque, uninterpreted attribute payload (e.g. a source-location
/// record from the surface compiler). The core carries these through
/// unmodified; it never decodes `payload`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attr {
    pub tag: u8,
    pub payload: Vec<u8>,
}

/// An unordered bag of [`Attr`]s. Equality is order-independent: two bags
/// with the same multiset of attributes are equal regardless of the order
/// they were attached in.
#[derive(Debug, Clone, Default)]
pub struct AttrBag(Vec<Attr>);

impl AttrBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, attr: Attr) {
        self.0.push(attr);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attr> {
        self.0.iter()
    }

    fn sorted_keys(&self) -> Vec<(u8, &[u8])> {
        let mut keys: Vec<(u8, &[u8])> = self.0.iter().map(|a| (a.tag, a.payload.as_slice())).collect();
        keys.sort();
        keys
    }
}

impl PartialEq for AttrBag {
    fn eq(&self, other: &Self) -> bool {
        self.sorted_keys() == other.sorted_keys()
    }
}
impl Eq for AttrBag {}

impl FromIterator<Attr> for AttrBag {
    fn from_iter<T: IntoIterator<Item = Attr>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One bytecode plus its attribute bag.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub code: Code,
    pub attrs: AttrBag,
}

impl Entry {
    pub fn new(code: Code) -> Self {
        Self { code, attrs: AttrBag::new() }
    }

    pub fn with_attrs(code: Code, attrs: AttrBag) -> Self {
        Self { code, attrs }
    }
}

/// Which kind of scoped opcode pushed this [`Scope`].
#[derive(Debug, Clone, PartialEq)]
pub enum ScopeKind {
    /// The outermost scope of a branch, spanning the whole block.
    Entry,
    Loop,
    ForAll { source: Register, index: Register },
    Try { catch: Label },
    AssertOrAssume { is_assert: bool },
}

/// An activation of a scoped opcode on one [`crate::branch::VcBranch`].
/// Scopes are forked by shallow-copying the `constraints` vector; forks
/// never share a `Vec` allocation after the copy.
#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub end: usize,
    pub constraints: Vec<crate::transformer::Expr>,
}

impl Scope {
    pub fn new(kind: ScopeKind, end: usize) -> Self {
        Self { kind, end, constraints: Vec::new() }
    }

    pub fn is_for(&self) -> bool {
        matches!(self.kind, ScopeKind::ForAll { .. })
    }
}

/// An ordered bytecode sequence for one function body, type refinement, or
/// pre/postcondition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    entries: Vec<Entry>,
}

impl Block {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, i: usize) -> &Entry {
        &self.entries[i]
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// One past the largest register referenced by any entry; `0` for an
    /// empty block.
    pub fn num_slots(&self) -> Register {
        self.entries
            .iter()
            .flat_map(|e| e.code.slots())
            .max()
            .map(|r| r + 1)
            .unwrap_or(0)
    }

    /// Index of the block-local `Label(l)` entry, if present. Branch
    /// targets always resolve through this: forward-only control flow
    /// means the result, when present, is always `> ` the searching
    /// opcode's own index, but that ordering is enforced by the producer
    /// (the global generator, or the codec reader), not checked here.
    pub fn index_of(&self, label: Label) -> Option<usize> {
        self.entries.iter().position(|e| matches!(e.code, Code::Label(l) if l == label))
    }

    /// Renumbers every register in every entry by adding `k`, except the
    /// registers in `preserve` (the distinguished input slots). Per
    /// spec.md §4.C: the number of input slots is preserved, everything
    /// else shifts up.
    #[must_use]
    pub fn shift(&self, k: Register, preserve: &[Register]) -> Block {
        let width = self.num_slots();
        let map = RegisterMap::shift(width, k, preserve);
        Block {
            entries: self
                .entries
                .iter()
                .map(|e| Entry::with_attrs(e.code.remap(&map), e.attrs.clone()))
                .collect(),
        }
    }

    /// Replaces every label this block defines and references with a
    /// fresh one drawn from `gen`, so that two relabeled copies of the
    /// same block never collide.
    #[must_use]
    pub fn relabel(&self, gen: &mut LabelGen) -> Block {
        let mut map = LabelMap::new();
        for entry in &self.entries {
            if let Code::Label(l) = entry.code {
                map.insert(l, gen.fresh());
            }
            if let Some(end) = entry.code.scope_end() {
                if !has_mapping(&map, end) {
                    map.insert(end, gen.fresh());
                }
            }
        }
        Block {
            entries: self
                .entries
                .iter()
                .map(|e| Entry::with_attrs(e.code.relabel(&map), e.attrs.clone()))
                .collect(),
        }
    }
}

fn has_mapping(map: &LabelMap, l: Label) -> bool {
    map.apply(l) != l
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::code::BinaryOp;

    fn goto_block() -> Block {
        let mut gen = LabelGen::default();
        let l0 = gen.fresh();
        Block::new(vec![
            Entry::new(Code::BinaryAssign { op: BinaryOp::Add, target: 1, left: 0, right: 0 }),
            Entry::new(Code::Goto(l0)),
            Entry::new(Code::Label(l0)),
        ])
    }

    #[test]
    fn num_slots_is_max_register_plus_one() {
        let b = goto_block();
        assert_eq!(b.num_slots(), 2);
    }

    #[test]
    fn shift_preserves_named_inputs_and_bumps_others() {
        let b = goto_block();
        let shifted = b.shift(5, &[0]);
        assert_eq!(shifted.num_slots(), 7);
        match &shifted.get(0).code {
            Code::BinaryAssign { target, left, right, .. } => {
                assert_eq!(*target, 6);
                assert_eq!(*left, 0);
                assert_eq!(*right, 0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn relabel_produces_disjoint_labels_across_copies() {
        // Per §9, freshness is a property of one threaded `LabelGen` (the
        // replacement for the source's global counter), so both copies draw
        // from the same generator here rather than two unrelated ones.
        let b = goto_block();
        let mut gen = LabelGen::default();
        let a = b.relabel(&mut gen);
        let b2 = b.relabel(&mut gen);
        let label_of = |blk: &Block| match &blk.get(1).code {
            Code::Goto(l) => *l,
            other => panic!("unexpected {other:?}"),
        };
        assert_ne!(label_of(&a), label_of(&b2));
    }

    #[test]
    fn index_of_finds_defined_label() {
        let b = goto_block();
        match &b.get(1).code {
            Code::Goto(l) => assert_eq!(b.index_of(*l), Some(2)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn attr_bag_equality_ignores_order() {
        let a = AttrBag::from_iter([Attr { tag: 1, payload: vec![1] }, Attr { tag: 2, payload: vec![2] }]);
        let b = AttrBag::from_iter([Attr { tag: 2, payload: vec![2] }, Attr { tag: 1, payload: vec![1] }]);
        assert_eq!(a, b);
    }
}
