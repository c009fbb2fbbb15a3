//! The opcode tag byte (`op:u1`, spec.md §4.D). One tag per concrete
//! `Code` shape — including, for the arithmetic/comparison/unary families,
//! one tag per operator — rather than a shape tag plus a secondary
//! operator byte, matching the grammar's "`op:u1` followed by operand
//! fields whose shape is determined by op class".

use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum OpTag {
    // unary
    Move = 0,
    Convert = 1,
    Invert = 2,
    Negate = 3,
    Dereference = 4,
    NewObject = 5,
    LengthOf = 6,
    Debug = 7,
    // binary-assign arithmetic
    Add = 8,
    Sub = 9,
    Mul = 10,
    Div = 11,
    Rem = 12,
    BitwiseAnd = 13,
    BitwiseOr = 14,
    BitwiseXor = 15,
    Shl = 16,
    Shr = 17,
    // binary-condition comparators
    CmpEq = 18,
    CmpNeq = 19,
    CmpLt = 20,
    CmpLe = 21,
    CmpGt = 22,
    CmpGe = 23,
    // n-ary-assign
    Const = 24,
    ListConstruct = 25,
    SetConstruct = 26,
    MapConstruct = 27,
    TupleConstruct = 28,
    RecordConstruct = 29,
    FieldLoad = 30,
    TupleLoad = 31,
    IndexOf = 32,
    Update = 33,
    DirectInvoke = 34,
    IndirectInvoke = 35,
    // control
    Goto = 36,
    IfType = 37,
    Switch = 38,
    Return = 39,
    Throw = 40,
    Fail = 41,
    Nop = 42,
    Label = 43,
    // scoped
    Loop = 44,
    ForAll = 45,
    TryCatch = 46,
    Assert = 47,
    Assume = 48,
}

/// Tag bytes above the highest assigned [`OpTag`] and up to this value are
/// reserved for opcodes a future version of this format may add; a reader
/// that sees one should report `UnsupportedOpcode`, not `UnknownOpcode` —
/// the file isn't corrupt, this toolchain is just behind (spec.md §7).
pub const RESERVED_MAX: u8 = 63;
