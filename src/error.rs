//! The aggregate `Error` enum (spec.md §7). Every fallible public operation
//! in this crate returns `Result<_, Error>`; component-local error enums
//! compose into it via `From`, the same shape the source's
//! `From<bits::Error> for read::Error` takes.

use std::fmt;

use crate::codec::error::CodecError;
use crate::generator::GeneratorError;
use crate::ir::ty::TypeError;
use crate::module::ModuleError;
use crate::transformer::Obligation;

#[derive(Debug, Clone)]
pub enum Error {
    Codec(CodecError),
    Type(TypeError),
    Generator(GeneratorError),
    Module(ModuleError),
    /// A property the transformer asserted was shown not valid by the
    /// solver; location attributes come from the originating `Entry`.
    VerificationFailure(Obligation),
    /// The solver returned `unknown` rather than `sat`/`unsat`.
    VerificationUnknown(Obligation),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Codec(e) => write!(f, "corrupt file: {e}"),
            Error::Type(e) => write!(f, "type inconsistency: {e}"),
            Error::Generator(e) => write!(f, "{e}"),
            Error::Module(e) => write!(f, "{e}"),
            Error::VerificationFailure(o) => write!(f, "verification failed: {:?} does not hold: {}", o.kind, o.expr),
            Error::VerificationUnknown(o) => write!(f, "verification unknown: {:?}: {}", o.kind, o.expr),
        }
    }
}

impl std::error::Error for Error {}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Error::Codec(e)
    }
}

impl From<TypeError> for Error {
    fn from(e: TypeError) -> Self {
        Error::Type(e)
    }
}

impl From<GeneratorError> for Error {
    fn from(e: GeneratorError) -> Self {
        Error::Generator(e)
    }
}

impl From<ModuleError> for Error {
    fn from(e: ModuleError) -> Self {
        Error::Module(e)
    }
}
