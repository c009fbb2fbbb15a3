//! The constant model (component B): literal values an IR operand can
//! denote directly, plus their types.

use std::cmp::Ordering;
use std::fmt;

use num_bigint::BigInt;
use num_integer::Integer;

use crate::ir::ty::Type;

/// An arbitrary-precision rational built from a `BigInt` numerator and
/// denominator, always kept in lowest terms with a positive denominator.
/// The source corpus has no rational type of its own; this follows the
/// workspace-level `num-bigint`/`num-integer` stack already pulled in for
/// `Constant::Int`, rather than adding a dedicated `num-rational` dependency
/// for one extra type.
#[derive(Debug, Clone)]
pub struct Rational {
    numer: BigInt,
    denom: BigInt,
}

impl Rational {
    /// Panics if `denom` is zero.
    pub fn new(numer: BigInt, denom: BigInt) -> Self {
        assert!(!denom.is_zero_value(), "rational constant with zero denominator");
        let mut r = Self { numer, denom };
        r.normalize();
        r
    }

    fn normalize(&mut self) {
        if self.denom.sign_negative() {
            self.numer = -self.numer.clone();
            self.denom = -self.denom.clone();
        }
        let g = self.numer.gcd(&self.denom);
        if !g.is_zero_value() && g != BigInt::from(1) {
            self.numer /= &g;
            self.denom /= &g;
        }
    }

    pub fn numer(&self) -> &BigInt {
        &self.numer
    }

    pub fn denom(&self) -> &BigInt {
        &self.denom
    }
}

/// Narrow extension trait so `Rational::normalize` can read sign/zero
/// without importing `num_traits::Signed`/`Zero` at every call site.
trait BigIntExt {
    fn is_zero_value(&self) -> bool;
    fn sign_negative(&self) -> bool;
}

impl BigIntExt for BigInt {
    fn is_zero_value(&self) -> bool {
        *self == BigInt::from(0)
    }

    fn sign_negative(&self) -> bool {
        *self < BigInt::from(0)
    }
}

impl PartialEq for Rational {
    fn eq(&self, other: &Self) -> bool {
        self.numer == other.numer && self.denom == other.denom
    }
}
impl Eq for Rational {}

impl std::hash::Hash for Rational {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.numer.hash(state);
        self.denom.hash(state);
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some((&self.numer * &other.denom).cmp(&(&other.numer * &self.denom)))
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numer, self.denom)
    }
}

/// A literal value. Mirrors [`Type`]'s constructor shape one-for-one where
/// applicable (`List`/`Set`/`Tuple`/`Record`), since every constant must
/// check against some type via [`Constant::type_of`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Null,
    Bool(bool),
    Byte(u8),
    Char(char),
    Int(BigInt),
    Real(Rational),
    Str(String),
    List(Vec<Constant>),
    Set(Vec<Constant>),
    Tuple(Vec<Constant>),
    Record(Vec<(String, Constant)>),
}

// `Rational` only derives PartialEq/Eq/Hash manually above; `Constant`
// needs them too since it's used as a pool key.
impl std::hash::Hash for Constant {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Constant::Null => {}
            Constant::Bool(b) => b.hash(state),
            Constant::Byte(b) => b.hash(state),
            Constant::Char(c) => c.hash(state),
            Constant::Int(i) => i.hash(state),
            Constant::Real(r) => r.hash(state),
            Constant::Str(s) => s.hash(state),
            Constant::List(xs) | Constant::Set(xs) | Constant::Tuple(xs) => xs.hash(state),
            Constant::Record(fs) => fs.hash(state),
        }
    }
}

impl Constant {
    /// The most specific type a literal denotes. Containers recurse, so
    /// `List([])` types as `List(Void)` and a non-empty list types as
    /// `List(union-of-element-types)`.
    #[must_use]
    pub fn type_of(&self) -> Type {
        match self {
            Constant::Null => Type::Null,
            Constant::Bool(_) => Type::Bool,
            Constant::Byte(_) => Type::Byte,
            Constant::Char(_) => Type::Char,
            Constant::Int(_) => Type::Int,
            Constant::Real(_) => Type::Rational,
            Constant::Str(_) => Type::Str,
            Constant::List(xs) => Type::List(Box::new(element_union(xs))),
            Constant::Set(xs) => Type::Set(Box::new(element_union(xs))),
            Constant::Tuple(xs) => Type::Tuple(xs.iter().map(Constant::type_of).collect()),
            Constant::Record(fs) => {
                Type::Record(fs.iter().map(|(n, c)| (n.clone(), c.type_of())).collect(), false)
            }
        }
    }
}

fn element_union(xs: &[Constant]) -> Type {
    if xs.is_empty() {
        return Type::Void;
    }
    Type::union(xs.iter().map(Constant::type_of).collect())
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Null => write!(f, "null"),
            Constant::Bool(b) => write!(f, "{b}"),
            Constant::Byte(b) => write!(f, "{b}b"),
            Constant::Char(c) => write!(f, "'{c}'"),
            Constant::Int(i) => write!(f, "{i}"),
            Constant::Real(r) => write!(f, "{r}"),
            Constant::Str(s) => write!(f, "{s:?}"),
            Constant::List(xs) => {
                write!(f, "[")?;
                write_list(f, xs)?;
                write!(f, "]")
            }
            Constant::Set(xs) => {
                write!(f, "{{")?;
                write_list(f, xs)?;
                write!(f, "}}")
            }
            Constant::Tuple(xs) => {
                write!(f, "(")?;
                write_list(f, xs)?;
                write!(f, ")")
            }
            Constant::Record(fs) => {
                write!(f, "{{")?;
                for (i, (n, c)) in fs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{n}: {c}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, xs: &[Constant]) -> fmt::Result {
    for (i, x) in xs.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{x}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rational_normalizes_to_lowest_terms() {
        let r = Rational::new(BigInt::from(4), BigInt::from(8));
        assert_eq!(*r.numer(), BigInt::from(1));
        assert_eq!(*r.denom(), BigInt::from(2));
    }

    #[test]
    fn rational_normalizes_negative_denominator() {
        let r = Rational::new(BigInt::from(3), BigInt::from(-6));
        assert_eq!(*r.numer(), BigInt::from(-1));
        assert_eq!(*r.denom(), BigInt::from(2));
    }

    #[test]
    fn empty_list_types_as_void_element() {
        let c = Constant::List(vec![]);
        assert_eq!(c.type_of(), Type::List(Box::new(Type::Void)));
    }

    #[test]
    fn mixed_list_types_as_union() {
        let c = Constant::List(vec![Constant::Int(BigInt::from(1)), Constant::Bool(true)]);
        assert_eq!(c.type_of(), Type::List(Box::new(Type::union(vec![Type::Int, Type::Bool]))));
    }

    #[test]
    fn record_type_preserves_field_order() {
        let c = Constant::Record(vec![("x".into(), Constant::Int(BigInt::from(1)))]);
        assert_eq!(c.type_of(), Type::Record(vec![("x".into(), Type::Int)], false));
    }
}
