//! Component E: the global constraint generator. Compiles a nominal
//! type's refinement predicate into a `Block`, memoized by qualified name
//! (spec.md §4.E).
//!
//! A *leaf* nominal type (one whose declaration already carries an
//! explicit `constraint` block — compiled by the out-of-scope surface
//! expression compiler, spec.md §1) is returned as-is, whether that
//! declaration lives in the current compilation unit or was handed back
//! by the loader. A *compound* nominal type (one whose declared shape is
//! `list`/`set`/`tuple`/`record`/`union`/`nominal` and which carries no
//! constraint of its own) has its predicate elaborated structurally from
//! its constituents, recursing into `generate` for each one.

use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::config::EngineConfig;
use crate::ir::block::{Block, Entry};
use crate::ir::code::{Code, LabelGen, Register};
use crate::ir::name::QualifiedName;
use crate::ir::ty::Type;
use crate::module::WyilFile;

/// The loader interface this crate consumes (spec.md §6): supplies a
/// previously compiled unit's `WyilFile` for a name not defined in the
/// current source set. Implemented externally; this crate only calls it.
pub trait Loader {
    fn load_module(&self, name: &QualifiedName) -> Option<WyilFile>;
}

/// A `Loader` that never resolves anything, for callers (and this crate's
/// own tests) working with a single self-contained `WyilFile`.
#[derive(Debug, Default)]
pub struct NullLoader;

impl Loader for NullLoader {
    fn load_module(&self, _name: &QualifiedName) -> Option<WyilFile> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    /// `generate` was asked about a name neither the current unit nor the
    /// loader can resolve.
    UnresolvedName(QualifiedName),
    /// One of spec.md §9's open-question elaborations: a union type with
    /// refined summands, or a recursive refinement. Both are explicitly
    /// left unresolved by the source design; this crate reports them
    /// rather than silently dropping the refinement.
    UnsupportedFeature(String),
    /// The generator's recursive descent into nominal references exceeded
    /// `EngineConfig::max_recursion_depth` — a defense against a loader
    /// that hands back a cyclic declaration graph the memoization alone
    /// wouldn't catch (the memoization only catches a name recurring
    /// through itself, not a longer cycle A -> B -> A).
    RecursionLimitExceeded(QualifiedName),
}

impl fmt::Display for GeneratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedName(name) => write!(f, "unresolved name `{name}`"),
            Self::UnsupportedFeature(what) => write!(f, "unsupported refinement feature: {what}"),
            Self::RecursionLimitExceeded(name) => write!(f, "recursion limit exceeded resolving `{name}`"),
        }
    }
}

impl std::error::Error for GeneratorError {}

#[derive(Debug, Clone)]
enum CacheEntry {
    /// `generate` has started resolving this name but not finished; a
    /// nominal reference re-encountering it is a recursive refinement.
    InProgress,
    Done(Option<Block>),
}

/// The slots a predicate `Block` is built against before it's spliced
/// into a host block: slot 0 is always the refined value itself.
const INPUT_SLOT: Register = 0;

/// Component E. One instance per compilation unit (spec.md §5: "each with
/// its own engine instance"), memoizing by qualified name and owning the
/// `LabelGen` its splices draw fresh labels from.
pub struct Generator<'a> {
    file: &'a WyilFile,
    loader: &'a dyn Loader,
    config: &'a EngineConfig,
    cache: HashMap<QualifiedName, CacheEntry>,
    labels: LabelGen,
}

impl<'a> Generator<'a> {
    #[must_use]
    pub fn new(file: &'a WyilFile, loader: &'a dyn Loader, config: &'a EngineConfig) -> Self {
        Self { file, loader, config, cache: HashMap::new(), labels: LabelGen::new(config.label_prefix) }
    }

    /// `generate(qualifiedName) → Block?` (spec.md §4.E's public
    /// operation). Returns `Ok(None)` when `name` carries no refinement.
    pub fn generate(&mut self, name: &QualifiedName) -> Result<Option<Block>, GeneratorError> {
        self.generate_at_depth(name, 0)
    }

    fn generate_at_depth(&mut self, name: &QualifiedName, depth: usize) -> Result<Option<Block>, GeneratorError> {
        if depth > self.config.max_recursion_depth {
            return Err(GeneratorError::RecursionLimitExceeded(name.clone()));
        }
        match self.cache.get(name) {
            Some(CacheEntry::Done(block)) => {
                debug!("generator: cache hit for `{name}`");
                return Ok(block.clone());
            }
            Some(CacheEntry::InProgress) => {
                return Err(GeneratorError::UnsupportedFeature(format!("recursive refinement through `{name}`")));
            }
            None => {}
        }
        debug!("generator: cache miss for `{name}`, resolving");
        // Populated before the recursive descent below, per spec.md §4.E's
        // termination note: a nominal reference to `name` reached while
        // this call is still running hits the `InProgress` branch above.
        self.cache.insert(name.clone(), CacheEntry::InProgress);

        let result = self.resolve(name, depth)?;
        self.cache.insert(name.clone(), CacheEntry::Done(result.clone()));
        Ok(result)
    }

    fn resolve(&mut self, name: &QualifiedName, depth: usize) -> Result<Option<Block>, GeneratorError> {
        if let Some((ty, constraint)) = self.file.find_type(name) {
            if let Some(block) = constraint {
                return Ok(Some(block.clone()));
            }
            let ty = ty.clone();
            debug!("generator: elaborating `{name}` structurally from {ty:?}");
            return self.elaborate(&ty, depth + 1);
        }
        match self.loader.load_module(name) {
            Some(unit) => match unit.find_type(name) {
                // An already-compiled unit's constraint is returned as-is,
                // never re-elaborated (spec.md §4.E).
                Some((_, constraint)) => Ok(constraint.cloned()),
                None => Err(GeneratorError::UnresolvedName(name.clone())),
            },
            None => Err(GeneratorError::UnresolvedName(name.clone())),
        }
    }

    /// Predicate elaboration by type-constructor (spec.md §4.E).
    fn elaborate(&mut self, ty: &Type, depth: usize) -> Result<Option<Block>, GeneratorError> {
        match ty {
            Type::List(elem) | Type::Set(elem) => match self.elaborate(elem, depth + 1)? {
                Some(p) => Ok(Some(wrap_forall(p, &mut self.labels))),
                None => Ok(None),
            },
            Type::Tuple(elems) => {
                let mut fragments = Vec::new();
                for (i, elem) in elems.iter().enumerate() {
                    if let Some(p) = self.elaborate(elem, depth + 1)? {
                        fragments.push(tuple_load_fragment(i, p, &mut self.labels));
                    }
                }
                Ok(combine_fragments(fragments))
            }
            Type::Record(fields, _) => {
                let mut fragments = Vec::new();
                for (field, elem) in fields {
                    if let Some(p) = self.elaborate(elem, depth + 1)? {
                        fragments.push(field_load_fragment(field.clone(), p, &mut self.labels));
                    }
                }
                Ok(combine_fragments(fragments))
            }
            Type::Union(members) => {
                let mut any_refined = false;
                for m in members {
                    // A peek, not a memoized `generate`: whether a summand
                    // carries a refinement doesn't depend on recursion
                    // bookkeeping for nominal members, so route those
                    // through the public, memoized path.
                    let refined = match m {
                        Type::Nominal(q) => self.generate_at_depth(q, depth + 1)?.is_some(),
                        other => self.elaborate(other, depth + 1)?.is_some(),
                    };
                    any_refined |= refined;
                }
                if any_refined {
                    // Open question 1 (spec.md §9): elaborating a union
                    // with refined summands is unsound over recursive
                    // types in the source design and left unresolved.
                    Err(GeneratorError::UnsupportedFeature("union of refined summands".into()))
                } else {
                    Ok(None)
                }
            }
            Type::Nominal(q) => self.generate_at_depth(q, depth + 1),
            Type::Recursive(..) => Err(GeneratorError::UnsupportedFeature("recursive type refinement".into())),
            // Stubs per spec.md §9 open question 2: identity (no
            // refinement) for map, reference, intersection, negation.
            Type::Map(_, _) | Type::Reference(_) | Type::Intersection(_) | Type::Negation(_) => Ok(None),
            _ => Ok(None),
        }
    }
}

/// `list(E)`/`set(E)`: loads the collection in slot 0, iterates with
/// `forall` over slot 1, and splices `p.shift(1)` inside the loop body —
/// `p`'s own slot 0 (the refined element) becomes slot 1, which the
/// `ForAll` binds to a fresh per-iteration skolem (spec.md §4.E, §4.F).
fn wrap_forall(p: Block, labels: &mut LabelGen) -> Block {
    let end = labels.fresh();
    let shifted = p.shift(1, &[]).relabel(labels);
    let mut entries = vec![Entry::new(Code::ForAll { end, modified: Vec::new(), source: INPUT_SLOT, index: 1 })];
    entries.extend(shifted.entries().iter().cloned());
    entries.push(Entry::new(Code::Label(end)));
    Block::new(entries)
}

/// `tuple(E1..En)`: loads `$.i` into slot 1, splices `shift(1, Pi)`.
fn tuple_load_fragment(index: usize, p: Block, labels: &mut LabelGen) -> Vec<Entry> {
    let shifted = p.shift(1, &[]).relabel(labels);
    let mut entries = vec![Entry::new(Code::TupleLoad { target: 1, source: INPUT_SLOT, index })];
    entries.extend(shifted.entries().iter().cloned());
    entries
}

/// `record(field→E)`: same shape as the tuple case but using `fieldload`.
fn field_load_fragment(field: String, p: Block, labels: &mut LabelGen) -> Vec<Entry> {
    let shifted = p.shift(1, &[]).relabel(labels);
    let mut entries = vec![Entry::new(Code::FieldLoad { target: 1, source: INPUT_SLOT, field })];
    entries.extend(shifted.entries().iter().cloned());
    entries
}

fn combine_fragments(fragments: Vec<Vec<Entry>>) -> Option<Block> {
    if fragments.is_empty() {
        return None;
    }
    Some(Block::new(fragments.into_iter().flatten().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::code::Comparator;
    use crate::module::Declaration;

    fn qn(name: &str) -> QualifiedName {
        QualifiedName::new(vec![], name.to_string())
    }

    fn nat_constraint_block() -> Block {
        let mut gen = LabelGen::default();
        let ok = gen.fresh();
        Block::new(vec![
            Entry::new(Code::Const { target: 1, value: crate::ir::constant::Constant::Int(0.into()) }),
            Entry::new(Code::BinaryCondition { op: Comparator::Ge, left: 0, right: 1, target: ok }),
            Entry::new(Code::Fail("constraint not satisfied".into())),
            Entry::new(Code::Label(ok)),
        ])
    }

    fn file_with_nat_and_list() -> WyilFile {
        let nat = qn("nat");
        WyilFile::new(
            "unit",
            "unit.wyil",
            vec![
                Declaration::Type { name: nat.clone(), ty: Type::Int, constraint: Some(nat_constraint_block()) },
                Declaration::Type { name: qn("natlist"), ty: Type::List(Box::new(Type::Nominal(nat))), constraint: None },
                Declaration::Type { name: qn("plain_int"), ty: Type::Int, constraint: None },
            ],
        )
        .unwrap()
    }

    #[test]
    fn leaf_refinement_is_returned_verbatim() {
        let file = file_with_nat_and_list();
        let loader = NullLoader;
        let config = EngineConfig::default();
        let mut gen = Generator::new(&file, &loader, &config);
        let block = gen.generate(&qn("nat")).unwrap().expect("nat has a refinement");
        assert_eq!(block, nat_constraint_block());
    }

    #[test]
    fn unrefined_type_produces_no_block() {
        let file = file_with_nat_and_list();
        let loader = NullLoader;
        let config = EngineConfig::default();
        let mut gen = Generator::new(&file, &loader, &config);
        assert_eq!(gen.generate(&qn("plain_int")).unwrap(), None);
    }

    #[test]
    fn list_of_refined_nominal_elaborates_to_a_forall() {
        let file = file_with_nat_and_list();
        let loader = NullLoader;
        let config = EngineConfig::default();
        let mut gen = Generator::new(&file, &loader, &config);
        let block = gen.generate(&qn("natlist")).unwrap().expect("natlist elaborates a refinement");
        assert!(matches!(block.get(0).code, Code::ForAll { source: 0, index: 1, .. }));
    }

    #[test]
    fn generation_is_memoized() {
        let file = file_with_nat_and_list();
        let loader = NullLoader;
        let config = EngineConfig::default();
        let mut gen = Generator::new(&file, &loader, &config);
        let first = gen.generate(&qn("nat")).unwrap();
        let second = gen.generate(&qn("nat")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unresolved_name_is_an_error() {
        let file = file_with_nat_and_list();
        let loader = NullLoader;
        let config = EngineConfig::default();
        let mut gen = Generator::new(&file, &loader, &config);
        assert_eq!(gen.generate(&qn("nonexistent")).unwrap_err(), GeneratorError::UnresolvedName(qn("nonexistent")));
    }

    #[test]
    fn recursive_type_refinement_is_unsupported() {
        let label = qn("RecNat");
        let file = WyilFile::new(
            "unit",
            "unit.wyil",
            vec![Declaration::Type {
                name: label.clone(),
                ty: Type::Recursive(label, Box::new(Type::Int)),
                constraint: None,
            }],
        )
        .unwrap();
        let loader = NullLoader;
        let config = EngineConfig::default();
        let mut gen = Generator::new(&file, &loader, &config);
        assert!(matches!(gen.generate(&qn("RecNat")), Err(GeneratorError::UnsupportedFeature(_))));
    }
}
