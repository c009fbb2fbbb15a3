//! The IR data model: component A (types), component B (constants), and
//! component C (`Block`/`Entry`/`Code`/`Scope`), plus qualified names.

pub mod block;
pub mod code;
pub mod constant;
pub mod name;
pub mod ty;

pub use block::{Attr, AttrBag, Block, Entry, Scope, ScopeKind};
pub use code::{BinaryOp, Code, Comparator, Label, LabelGen, LabelMap, Register, RegisterMap, UnaryOp};
pub use constant::{Constant, Rational};
pub use name::QualifiedName;
pub use ty::{Type, TypeError};
