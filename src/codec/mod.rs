//! Component D: the pool-indexed binary container format (spec.md §4.D).
//! [`read`] and [`write`] are a matched pair — every `WyilFile` this crate
//! can construct round-trips bit-exactly through them (spec.md §8.1).

mod cursor;
pub mod error;
mod opcode;
mod pool;
mod reader;
mod writer;

pub use error::CodecError;
pub use reader::read;
pub use writer::write;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::block::Entry;
    use crate::ir::code::{Code, LabelGen};
    use crate::ir::constant::Constant;
    use crate::ir::name::QualifiedName;
    use crate::ir::ty::Type;
    use crate::module::{Case, Declaration, Signature, WyilFile};
    use num_bigint::BigInt;

    fn qn(name: &str) -> QualifiedName {
        QualifiedName::new(vec![], name.to_string())
    }

    #[test]
    fn round_trips_a_constant_declaration() {
        let file = WyilFile::new(
            "unit-a",
            "a.wyil",
            vec![Declaration::Constant { name: qn("PI"), value: Constant::Real(crate::ir::constant::Rational::new(BigInt::from(22), BigInt::from(7))) }],
        )
        .unwrap();
        let bytes = write(&file);
        assert_eq!(read(&bytes).unwrap(), file);
    }

    #[test]
    fn round_trips_a_function_with_branching_body() {
        let mut gen = LabelGen::default();
        let l_then = gen.fresh();
        let body = crate::ir::block::Block::new(vec![
            Entry::new(Code::BinaryCondition { op: crate::ir::code::Comparator::Ge, left: 0, right: 0, target: l_then }),
            Entry::new(Code::Fail("constraint not satisfied".into())),
            Entry::new(Code::Label(l_then)),
            Entry::new(Code::Return(Some(0))),
        ]);
        let signature = Signature { receiver: None, params: vec![Type::Int], returns: Type::Int, throws: vec![] };
        let file = WyilFile::new(
            "unit-b",
            "b.wyil",
            vec![Declaration::FunctionOrMethod {
                name: qn("f"),
                signature,
                cases: vec![Case { precondition: None, postcondition: None, body }],
            }],
        )
        .unwrap();
        let bytes = write(&file);
        assert_eq!(read(&bytes).unwrap(), file);
    }

    #[test]
    fn round_trips_recursive_and_union_types() {
        let label = qn("List");
        let body = Type::union(vec![Type::Null, Type::Tuple(vec![Type::Int, Type::Nominal(label.clone())])]);
        let rec = Type::Recursive(label, Box::new(body));
        let file = WyilFile::new("unit-c", "c.wyil", vec![Declaration::Type { name: qn("IntList"), ty: rec, constraint: None }]).unwrap();
        let bytes = write(&file);
        assert_eq!(read(&bytes).unwrap(), file);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let bytes = vec![0u8; 16];
        assert!(matches!(read(&bytes), Err(CodecError::BadMagic(_))));
    }

    #[test]
    fn truncated_file_is_rejected() {
        let file = WyilFile::new("unit-d", "d.wyil", vec![Declaration::Constant { name: qn("X"), value: Constant::Bool(true) }]).unwrap();
        let bytes = write(&file);
        let truncated = &bytes[..bytes.len() - 1];
        assert!(read(truncated).is_err());
    }

    /// A one-entry body whose opcode tag byte is patched to something this
    /// reader doesn't recognize, to exercise the two distinct failure modes
    /// past the tag byte.
    fn file_with_patched_opcode(patched_tag: u8) -> Vec<u8> {
        let file = WyilFile::new("unit-e", "e.wyil", vec![Declaration::FunctionOrMethod {
            name: qn("f"),
            signature: Signature { receiver: None, params: vec![], returns: Type::Void, throws: vec![] },
            cases: vec![Case { precondition: None, postcondition: None, body: crate::ir::block::Block::new(vec![Entry::new(Code::Nop)]) }],
        }])
        .unwrap();
        let mut bytes = write(&file);
        let nop_tag = crate::codec::opcode::OpTag::Nop as u8;
        let pos = bytes.iter().rposition(|&b| b == nop_tag).expect("Nop tag byte present in the encoded body");
        bytes[pos] = patched_tag;
        bytes
    }

    #[test]
    fn reserved_opcode_tag_is_unsupported_not_unknown() {
        let bytes = file_with_patched_opcode(crate::codec::opcode::RESERVED_MAX);
        assert!(matches!(read(&bytes), Err(CodecError::UnsupportedOpcode(_))));
    }

    #[test]
    fn out_of_range_opcode_tag_is_unknown() {
        let bytes = file_with_patched_opcode(0xff);
        assert!(matches!(read(&bytes), Err(CodecError::UnknownOpcode(0xff))));
    }
}
