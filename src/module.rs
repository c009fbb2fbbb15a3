//! The IR consumer interface (spec.md §6): `WyilFile`, the declarations it
//! holds, and the construction-time invariants a loader or writer must
//! uphold.

use std::fmt;

use crate::ir::block::Block;
use crate::ir::constant::Constant;
use crate::ir::name::QualifiedName;
use crate::ir::ty::Type;

/// One case of a function/method declaration: an optional precondition and
/// postcondition block plus the mandatory body.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub precondition: Option<Block>,
    pub postcondition: Option<Block>,
    pub body: Block,
}

/// A function or method signature: parameter types, a return type, and the
/// checked-exception types it may throw.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub receiver: Option<Type>,
    pub params: Vec<Type>,
    pub returns: Type,
    pub throws: Vec<Type>,
}

impl Signature {
    #[must_use]
    pub fn is_method(&self) -> bool {
        self.receiver.is_some()
    }
}

/// One top-level declaration in a `WyilFile`.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Constant { name: QualifiedName, value: Constant },
    Type { name: QualifiedName, ty: Type, constraint: Option<Block> },
    FunctionOrMethod { name: QualifiedName, signature: Signature, cases: Vec<Case> },
}

impl Declaration {
    #[must_use]
    pub fn name(&self) -> &QualifiedName {
        match self {
            Declaration::Constant { name, .. }
            | Declaration::Type { name, .. }
            | Declaration::FunctionOrMethod { name, .. } => name,
        }
    }

    fn identity_key(&self) -> (u8, &QualifiedName, Option<&Signature>) {
        match self {
            Declaration::Constant { name, .. } => (0, name, None),
            Declaration::Type { name, .. } => (1, name, None),
            Declaration::FunctionOrMethod { name, signature, .. } => (2, name, Some(signature)),
        }
    }
}

/// Construction-time invariant violated: two declarations share an identity
/// that must be unique within one `WyilFile`.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateDeclaration(pub QualifiedName);

#[derive(Debug, Clone, PartialEq)]
pub enum ModuleError {
    DuplicateDeclaration(DuplicateDeclaration),
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleError::DuplicateDeclaration(d) => write!(f, "duplicate declaration `{}`", d.0),
        }
    }
}

impl std::error::Error for ModuleError {}

/// The unit the surrounding compiler hands to and receives from this core:
/// an identified, named collection of declarations. Validated on
/// construction per spec.md §6: no two functions/methods share a
/// `(name, signature)`, no two type declarations share a name, no two
/// constant declarations share a name.
#[derive(Debug, Clone, PartialEq)]
pub struct WyilFile {
    pub id: String,
    pub filename: String,
    declarations: Vec<Declaration>,
}

impl WyilFile {
    pub fn new(id: impl Into<String>, filename: impl Into<String>, declarations: Vec<Declaration>) -> Result<Self, ModuleError> {
        check_uniqueness(&declarations)?;
        Ok(Self { id: id.into(), filename: filename.into(), declarations })
    }

    #[must_use]
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Looks up a `Type` declaration by qualified name, the lookup the
    /// global generator performs for names defined in this compilation
    /// unit (spec.md §4.E).
    #[must_use]
    pub fn find_type(&self, name: &QualifiedName) -> Option<(&Type, Option<&Block>)> {
        self.declarations.iter().find_map(|d| match d {
            Declaration::Type { name: n, ty, constraint } if n == name => Some((ty, constraint.as_ref())),
            _ => None,
        })
    }

    #[must_use]
    pub fn find_function_or_method(&self, name: &QualifiedName) -> Option<(&Signature, &[Case])> {
        self.declarations.iter().find_map(|d| match d {
            Declaration::FunctionOrMethod { name: n, signature, cases } if n == name => Some((signature, cases.as_slice())),
            _ => None,
        })
    }
}

fn check_uniqueness(declarations: &[Declaration]) -> Result<(), ModuleError> {
    for (i, a) in declarations.iter().enumerate() {
        for b in &declarations[..i] {
            if a.identity_key() == b.identity_key() {
                return Err(ModuleError::DuplicateDeclaration(DuplicateDeclaration(a.name().clone())));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn qn(name: &str) -> QualifiedName {
        QualifiedName::new(vec![], name.to_string())
    }

    #[test]
    fn duplicate_constant_names_rejected() {
        let decls = vec![
            Declaration::Constant { name: qn("PI"), value: Constant::Int(BigInt::from(3)) },
            Declaration::Constant { name: qn("PI"), value: Constant::Int(BigInt::from(4)) },
        ];
        assert!(WyilFile::new("f", "f.wyil", decls).is_err());
    }

    #[test]
    fn distinct_signatures_with_same_name_allowed() {
        let sig_a = Signature { receiver: None, params: vec![Type::Int], returns: Type::Int, throws: vec![] };
        let sig_b = Signature { receiver: None, params: vec![Type::Bool], returns: Type::Int, throws: vec![] };
        let decls = vec![
            Declaration::FunctionOrMethod { name: qn("f"), signature: sig_a, cases: vec![] },
            Declaration::FunctionOrMethod { name: qn("f"), signature: sig_b, cases: vec![] },
        ];
        assert!(WyilFile::new("f", "f.wyil", decls).is_ok());
    }
}
