//! The structural type model (component A of the spec): primitives, the
//! usual type constructors, and named recursive types with a subtype,
//! intersection and negation algebra.
//!
//! Types are immutable value objects; every operation here returns a new
//! `Type` rather than mutating one in place, matching the rest of the IR
//! model (`Block`, `Constant`).

use std::collections::HashMap;
use std::fmt;

use crate::ir::name::QualifiedName;

/// A structural type.
///
/// `Union`/`Intersection` are only ever constructed in canonical form (no
/// nested unions/intersections of the same kind, no duplicate summands,
/// deterministically ordered) by the smart constructors below; matching on
/// `Type::Union` directly elsewhere in the crate may assume that invariant
/// holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Any,
    Null,
    Bool,
    Byte,
    Char,
    Int,
    Rational,
    Str,
    List(Box<Type>),
    Set(Box<Type>),
    Map(Box<Type>, Box<Type>),
    Tuple(Vec<Type>),
    Record(Vec<(String, Type)>, bool),
    Reference(Box<Type>),
    Function(Vec<Type>, Box<Type>, Vec<Type>),
    Method(Option<Box<Type>>, Vec<Type>, Box<Type>, Vec<Type>),
    Union(Vec<Type>),
    Intersection(Vec<Type>),
    Negation(Box<Type>),
    Nominal(QualifiedName),
    /// `Recursive(label, body)`. `body` refers back to itself via
    /// `Type::Nominal` with a qualified name equal to `label`.
    Recursive(QualifiedName, Box<Type>),
}

/// A caller passed a structurally ill-formed type (e.g. a union of fewer
/// than two summands) to one of the type-algebra operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    EmptyUnion,
    EmptyIntersection,
    UnboundRecursiveLabel(QualifiedName),
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUnion => write!(f, "union type must have at least two summands"),
            Self::EmptyIntersection => write!(f, "intersection type must have at least one member"),
            Self::UnboundRecursiveLabel(name) => write!(f, "recursive label `{name}` has no binder in scope"),
        }
    }
}

impl std::error::Error for TypeError {}

/// Environment mapping recursive labels to their bodies, consulted while
/// traversing into a `Type::Recursive` binder. Scoped to one subtype/
/// intersection query (spec §5: "the type-subtype environment is local to
/// one subtype query").
#[derive(Debug, Default, Clone)]
struct RecEnv<'a> {
    bound: HashMap<&'a QualifiedName, &'a Type>,
}

impl<'a> RecEnv<'a> {
    fn bind(&self, label: &'a QualifiedName, body: &'a Type) -> Self {
        let mut bound = self.bound.clone();
        bound.insert(label, body);
        Self { bound }
    }

    fn lookup(&self, label: &QualifiedName) -> Option<&'a Type> {
        self.bound.get(label).copied()
    }
}

/// Coinductive assumption set: subtype judgements currently being
/// established, so that re-encountering the same judgement inside a
/// recursive type discharges it rather than looping forever.
#[derive(Debug, Default, Clone)]
struct Assumptions {
    pairs: Vec<(Type, Type)>,
}

impl Assumptions {
    fn contains(&self, a: &Type, b: &Type) -> bool {
        self.pairs.iter().any(|(x, y)| x == a && y == b)
    }

    fn extend(&self, a: Type, b: Type) -> Self {
        let mut pairs = self.pairs.clone();
        pairs.push((a, b));
        Self { pairs }
    }
}

impl Type {
    /// Unrolls the outermost recursive binder once: `Recursive(l, body)`
    /// becomes `body` with every `Nominal(l)` substituted by the original
    /// `Recursive(l, body)`. Non-recursive types are returned unchanged.
    #[must_use]
    pub fn flatten(&self) -> Type {
        match self {
            Type::Recursive(label, body) => body.substitute(label, self),
            other => other.clone(),
        }
    }

    /// Replaces every occurrence of `Nominal(label)` in `self` with
    /// `replacement`, not descending into a nested `Recursive` that rebinds
    /// the same label (shadowing).
    #[must_use]
    pub fn substitute(&self, label: &QualifiedName, replacement: &Type) -> Type {
        match self {
            Type::Nominal(name) if name == label => replacement.clone(),
            Type::Nominal(_) | Type::Void | Type::Any | Type::Null | Type::Bool | Type::Byte | Type::Char
            | Type::Int | Type::Rational | Type::Str => self.clone(),
            Type::List(e) => Type::List(Box::new(e.substitute(label, replacement))),
            Type::Set(e) => Type::Set(Box::new(e.substitute(label, replacement))),
            Type::Map(k, v) => Type::Map(
                Box::new(k.substitute(label, replacement)),
                Box::new(v.substitute(label, replacement)),
            ),
            Type::Tuple(ts) => Type::Tuple(ts.iter().map(|t| t.substitute(label, replacement)).collect()),
            Type::Record(fields, open) => Type::Record(
                fields.iter().map(|(n, t)| (n.clone(), t.substitute(label, replacement))).collect(),
                *open,
            ),
            Type::Reference(e) => Type::Reference(Box::new(e.substitute(label, replacement))),
            Type::Function(params, ret, throws) => Type::Function(
                params.iter().map(|t| t.substitute(label, replacement)).collect(),
                Box::new(ret.substitute(label, replacement)),
                throws.iter().map(|t| t.substitute(label, replacement)).collect(),
            ),
            Type::Method(recv, params, ret, throws) => Type::Method(
                recv.as_ref().map(|r| Box::new(r.substitute(label, replacement))),
                params.iter().map(|t| t.substitute(label, replacement)).collect(),
                Box::new(ret.substitute(label, replacement)),
                throws.iter().map(|t| t.substitute(label, replacement)).collect(),
            ),
            Type::Union(ts) => Type::Union(ts.iter().map(|t| t.substitute(label, replacement)).collect()),
            Type::Intersection(ts) => Type::Intersection(ts.iter().map(|t| t.substitute(label, replacement)).collect()),
            Type::Negation(t) => Type::Negation(Box::new(t.substitute(label, replacement))),
            Type::Recursive(inner_label, body) if inner_label == label => self.clone(),
            Type::Recursive(inner_label, body) => {
                Type::Recursive(inner_label.clone(), Box::new(body.substitute(label, replacement)))
            }
        }
    }

    /// Smart constructor: builds a canonical union out of possibly-nested,
    /// possibly-duplicate summands. Collapses a one-element result back to
    /// that element, per the invariant that `Type::Union` always has `n>=2`
    /// summands.
    #[must_use]
    pub fn union(members: Vec<Type>) -> Type {
        let mut flat = Vec::new();
        flatten_into(members, &mut flat, |t| matches!(t, Type::Union(_)), |t| match t {
            Type::Union(ts) => ts,
            other => vec![other],
        });
        dedup_ordered(&mut flat);
        match flat.len() {
            0 => Type::Void,
            1 => flat.into_iter().next().unwrap(),
            _ => Type::Union(flat),
        }
    }

    /// Smart constructor: builds a canonical intersection, flattening
    /// nested intersections and deduplicating members the same way
    /// [`Type::union`] does for unions.
    #[must_use]
    pub fn intersection(members: Vec<Type>) -> Type {
        let mut flat = Vec::new();
        flatten_into(members, &mut flat, |t| matches!(t, Type::Intersection(_)), |t| match t {
            Type::Intersection(ts) => ts,
            other => vec![other],
        });
        dedup_ordered(&mut flat);
        match flat.len() {
            0 => Type::Any,
            1 => flat.into_iter().next().unwrap(),
            _ => Type::Intersection(flat),
        }
    }

    /// `A <: B` under coinductive recursive-type reasoning.
    #[must_use]
    pub fn subtype(&self, other: &Type) -> bool {
        subtype_rec(self, other, &RecEnv::default(), &RecEnv::default(), &Assumptions::default())
    }

    /// Normalized intersection. Returns `Type::Void` when `self` and
    /// `other` are provably disjoint (e.g. `intersect(T, negate(T))`).
    #[must_use]
    pub fn intersect(&self, other: &Type) -> Type {
        intersect_rec(self, other, &RecEnv::default(), &RecEnv::default())
    }

    /// `¬T`, normalized via double-negation and De Morgan so that
    /// `negate(negate(T)) == T` and `negate(union(..)) == intersection(negate(..))`.
    #[must_use]
    pub fn negate(&self) -> Type {
        match self {
            Type::Negation(inner) => (**inner).clone(),
            Type::Union(ts) => Type::intersection(ts.iter().map(Type::negate).collect()),
            Type::Intersection(ts) => Type::union(ts.iter().map(Type::negate).collect()),
            Type::Void => Type::Any,
            Type::Any => Type::Void,
            other => Type::Negation(Box::new(other.clone())),
        }
    }

    /// True for the primitive, tuple, record and union/intersection shapes
    /// that a refinement predicate might narrow; used by the global
    /// generator to decide whether a surface type can carry a constraint.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Type::Void | Type::Any | Type::Null | Type::Bool | Type::Byte | Type::Char | Type::Int | Type::Rational | Type::Str
        )
    }
}

fn flatten_into<F, G>(members: Vec<Type>, out: &mut Vec<Type>, is_same: F, unwrap: G)
where
    F: Fn(&Type) -> bool + Copy,
    G: Fn(Type) -> Vec<Type> + Copy,
{
    for m in members {
        if is_same(&m) {
            flatten_into(unwrap(m), out, is_same, unwrap);
        } else {
            out.push(m);
        }
    }
}

fn dedup_ordered(items: &mut Vec<Type>) {
    let mut seen: Vec<Type> = Vec::with_capacity(items.len());
    items.retain(|t| {
        if seen.contains(t) {
            false
        } else {
            seen.push(t.clone());
            true
        }
    });
    items.sort_by(type_order_key);
}

/// Deterministic ordering key so two structurally-equivalent unions built
/// from differently-ordered inputs compare equal after canonicalization.
fn type_order_key(a: &Type, b: &Type) -> std::cmp::Ordering {
    format!("{a:?}").cmp(&format!("{b:?}"))
}

fn subtype_rec(a: &Type, b: &Type, ra: &RecEnv<'_>, rb: &RecEnv<'_>, assume: &Assumptions) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (_, Type::Any) => true,
        (Type::Void, _) => true,
        (Type::Union(xs), _) => xs.iter().all(|x| subtype_rec(x, b, ra, rb, assume)),
        (_, Type::Union(ys)) => ys.iter().any(|y| subtype_rec(a, y, ra, rb, assume)),
        (_, Type::Intersection(ys)) => ys.iter().all(|y| subtype_rec(a, y, ra, rb, assume)),
        (Type::Intersection(xs), _) => xs.iter().any(|x| subtype_rec(x, b, ra, rb, assume)),
        (Type::Negation(x), Type::Negation(y)) => subtype_rec(y, x, rb, ra, assume),
        (Type::Recursive(label, body), _) => {
            let ra2 = ra.bind(label, body);
            subtype_rec(body, b, &ra2, rb, assume)
        }
        (_, Type::Recursive(label, body)) => {
            let rb2 = rb.bind(label, body);
            subtype_rec(a, body, ra, &rb2, assume)
        }
        (Type::Nominal(la), Type::Nominal(lb)) if la == lb => true,
        (Type::Nominal(la), _) => {
            if assume.contains(a, b) {
                return true;
            }
            match ra.lookup(la) {
                Some(body) => subtype_rec(body, b, ra, rb, &assume.extend(a.clone(), b.clone())),
                None => false,
            }
        }
        (_, Type::Nominal(lb)) => {
            if assume.contains(a, b) {
                return true;
            }
            match rb.lookup(lb) {
                Some(body) => subtype_rec(a, body, ra, rb, &assume.extend(a.clone(), b.clone())),
                None => false,
            }
        }
        (Type::List(x), Type::List(y))
        | (Type::Set(x), Type::Set(y))
        | (Type::Reference(x), Type::Reference(y)) => subtype_rec(x, y, ra, rb, assume),
        (Type::Map(kx, vx), Type::Map(ky, vy)) => {
            subtype_rec(kx, ky, ra, rb, assume) && subtype_rec(vx, vy, ra, rb, assume)
        }
        (Type::Tuple(xs), Type::Tuple(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| subtype_rec(x, y, ra, rb, assume))
        }
        (Type::Record(xs, xo), Type::Record(ys, yo)) => {
            if *yo && !*xo {
                return false;
            }
            ys.iter().all(|(name, yt)| {
                xs.iter().find(|(n, _)| n == name).is_some_and(|(_, xt)| subtype_rec(xt, yt, ra, rb, assume))
            })
        }
        _ => false,
    }
}

fn intersect_rec(a: &Type, b: &Type, ra: &RecEnv<'_>, rb: &RecEnv<'_>) -> Type {
    if a == b {
        return a.clone();
    }
    if subtype_rec(a, b, ra, rb, &Assumptions::default()) {
        return a.clone();
    }
    if subtype_rec(b, a, rb, ra, &Assumptions::default()) {
        return b.clone();
    }
    if is_disjoint(a, b, ra, rb) {
        return Type::Void;
    }
    Type::intersection(vec![a.clone(), b.clone()])
}

fn is_disjoint(a: &Type, b: &Type, ra: &RecEnv<'_>, rb: &RecEnv<'_>) -> bool {
    match (a, b) {
        (Type::Negation(inner), other) | (other, Type::Negation(inner)) => {
            subtype_rec(other, inner, ra, rb, &Assumptions::default())
        }
        (Type::Nominal(l), _) => ra.lookup(l).is_some_and(|body| is_disjoint(body, b, ra, rb)),
        (_, Type::Nominal(l)) => rb.lookup(l).is_some_and(|body| is_disjoint(a, body, ra, rb)),
        _ => discriminant_tag(a) != discriminant_tag(b) && discriminant_tag(a).is_some() && discriminant_tag(b).is_some(),
    }
}

/// A coarse "shape tag" used only to detect obvious disjointness between
/// two concrete (non-union/intersection/negation) types; `None` means "not
/// a simple shape, don't claim disjointness".
fn discriminant_tag(t: &Type) -> Option<u8> {
    Some(match t {
        Type::Void => 0,
        Type::Any => return None,
        Type::Null => 1,
        Type::Bool => 2,
        Type::Byte => 3,
        Type::Char => 4,
        Type::Int => 5,
        Type::Rational => 6,
        Type::Str => 7,
        Type::List(_) => 8,
        Type::Set(_) => 9,
        Type::Map(_, _) => 10,
        Type::Tuple(_) => 11,
        Type::Record(_, _) => 12,
        Type::Reference(_) => 13,
        Type::Function(_, _, _) => 14,
        Type::Method(_, _, _, _) => 15,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nat() -> Type {
        Type::Int
    }

    #[test]
    fn subtype_is_reflexive_and_transitive() {
        let a = Type::union(vec![Type::Int, Type::Null]);
        assert!(a.subtype(&a));
        assert!(Type::Int.subtype(&Type::Any));
        assert!(Type::Void.subtype(&Type::Int));
        assert!(Type::Int.subtype(&a));
    }

    #[test]
    fn union_distributes_over_subtype() {
        let u = Type::union(vec![Type::Int, Type::Bool]);
        assert!(u.subtype(&Type::union(vec![Type::Int, Type::Bool, Type::Null])));
        assert!(!u.subtype(&Type::Int));
    }

    #[test]
    fn intersect_with_negation_is_void() {
        let t = nat();
        assert_eq!(t.intersect(&t.negate()), Type::Void);
    }

    #[test]
    fn intersect_with_any_is_identity() {
        let t = Type::union(vec![Type::Int, Type::Str]);
        assert_eq!(t.intersect(&Type::Any), t);
    }

    #[test]
    fn double_negation_cancels() {
        let t = Type::Int;
        assert_eq!(t.negate().negate(), t);
    }

    #[test]
    fn union_is_canonical_regardless_of_order() {
        let a = Type::union(vec![Type::Int, Type::Bool, Type::Int]);
        let b = Type::union(vec![Type::Bool, Type::Int]);
        assert_eq!(a, b);
    }

    #[test]
    fn recursive_types_are_bisimilar() {
        let label = QualifiedName::new(vec!["test".into()], "List".into());
        let body = Type::union(vec![
            Type::Null,
            Type::Tuple(vec![Type::Int, Type::Nominal(label.clone())]),
        ]);
        let rec_a = Type::Recursive(label.clone(), Box::new(body.clone()));
        let rec_b = Type::Recursive(label, Box::new(body));
        assert!(rec_a.subtype(&rec_b));
        assert!(rec_b.subtype(&rec_a));
    }

    #[test]
    fn record_width_subtyping_respects_openness() {
        let narrow = Type::Record(vec![("x".into(), Type::Int)], false);
        let wide = Type::Record(vec![("x".into(), Type::Int), ("y".into(), Type::Bool)], false);
        assert!(wide.subtype(&narrow));
        assert!(!narrow.subtype(&wide));
    }
}
