//! `CorruptFile` and its sub-cases (spec.md §7), plus the reserved-but-
//! unimplemented-opcode case the reader can hit on a forward-compatible
//! file.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The 8-byte magic at the start of the file didn't read `WYILFILE`.
    BadMagic([u8; 8]),
    /// A pool index read from the stream has no corresponding entry.
    PoolIndexOutOfRange { pool: &'static str, index: u64, len: usize },
    /// A `u1` opcode tag that no `Code` variant claims.
    UnknownOpcode(u8),
    /// A `u1` opcode tag reserved for a future opcode this reader doesn't
    /// yet implement. Distinct from `UnknownOpcode`: this is a toolchain
    /// gap, not a malformed file (spec.md §7).
    UnsupportedOpcode(u8),
    /// An opcode's operand type disagreed with what that opcode requires,
    /// e.g. `dereference` of a non-reference type.
    WrongOperandKind { opcode: &'static str, expected: &'static str },
    /// The byte stream ended before a value that was declared (by a
    /// preceding length or count) finished decoding.
    TruncatedInput,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMagic(got) => write!(f, "bad magic: {got:02x?}"),
            Self::PoolIndexOutOfRange { pool, index, len } => {
                write!(f, "{pool} pool index {index} out of range (len {len})")
            }
            Self::UnknownOpcode(tag) => write!(f, "unknown opcode tag {tag:#x}"),
            Self::UnsupportedOpcode(tag) => write!(f, "unsupported opcode tag {tag:#x} (reserved, not yet implemented)"),
            Self::WrongOperandKind { opcode, expected } => {
                write!(f, "`{opcode}` requires a {expected} operand")
            }
            Self::TruncatedInput => write!(f, "truncated input"),
        }
    }
}

impl std::error::Error for CodecError {}
