//! Deserializes the pooled binary format back into a `WyilFile` (spec.md
//! §4.D). The matched-pair counterpart of `codec::writer`.
//!
//! Branch targets are stored on the wire as small forward offsets; this
//! reader materializes each one into a fresh `Label` the first time any
//! operand refers to its bytecode index, and reuses that same `Label` when
//! decoding reaches the `Label` entry itself — spec.md §9's open question 4
//! ("a compliant reader must materialize labels at every branch target at
//! deserialization time").

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use log::warn;

use crate::codec::cursor::ByteReader;
use crate::codec::error::CodecError;
use crate::codec::opcode::{OpTag, RESERVED_MAX};
use crate::codec::pool::{ConstantPool, NamePool, PathPool, StringPool, TypePool};
use crate::ir::block::{Attr, AttrBag, Block, Entry};
use crate::ir::code::{BinaryOp, Code, Comparator, Label, LabelGen, Register, UnaryOp};
use crate::module::{Case, Declaration, Signature, WyilFile};

const MAGIC: &[u8; 8] = b"WYILFILE";

/// The five pools plus, for each index-addressable one, the set of indices
/// actually dereferenced while decoding. A malformed (or merely wasteful)
/// writer can emit a pool entry nothing downstream ever references; that's
/// not `CorruptFile` (the file still decodes), but it's worth a trace while
/// debugging a writer that produces such files.
struct Pools {
    strings: StringPool,
    #[allow(dead_code)]
    paths: PathPool,
    names: NamePool,
    constants: ConstantPool,
    types: TypePool,
    used_strings: RefCell<HashSet<u64>>,
    used_names: RefCell<HashSet<u64>>,
    used_constants: RefCell<HashSet<u64>>,
    used_types: RefCell<HashSet<u64>>,
}

impl Pools {
    fn get_string(&self, index: u64) -> Result<&str, CodecError> {
        self.used_strings.borrow_mut().insert(index);
        self.strings.get(index)
    }

    fn get_name(&self, index: u64) -> Result<&crate::ir::name::QualifiedName, CodecError> {
        self.used_names.borrow_mut().insert(index);
        self.names.get(index)
    }

    fn get_constant(&self, index: u64) -> Result<&crate::ir::constant::Constant, CodecError> {
        self.used_constants.borrow_mut().insert(index);
        self.constants.get(index)
    }

    fn get_type(&self, index: u64) -> Result<&crate::ir::ty::Type, CodecError> {
        self.used_types.borrow_mut().insert(index);
        self.types.get(index)
    }

    /// `log::warn!` for every pool entry read never consumed (spec.md §B:
    /// "a pool entry is referenced but never read").
    fn warn_dead_entries(&self) {
        warn_unused("string", self.strings.len(), &self.used_strings.borrow());
        warn_unused("name", self.names.len(), &self.used_names.borrow());
        warn_unused("constant", self.constants.len(), &self.used_constants.borrow());
        warn_unused("type", self.types.len(), &self.used_types.borrow());
    }
}

fn warn_unused(pool: &str, len: usize, used: &HashSet<u64>) {
    for i in 0..len as u64 {
        if !used.contains(&i) {
            warn!("codec::reader: {pool} pool entry {i} was never referenced by any declaration");
        }
    }
}

/// Lazily assigns a fresh `Label` to every distinct bytecode index a
/// branch operand targets within one block, and hands the same `Label`
/// back whenever that index is referenced again (including by the `Label`
/// entry that defines it).
struct LabelResolver {
    gen: LabelGen,
    by_index: HashMap<usize, Label>,
}

impl LabelResolver {
    fn new() -> Self {
        Self { gen: LabelGen::default(), by_index: HashMap::new() }
    }

    fn at(&mut self, index: usize) -> Label {
        *self.by_index.entry(index).or_insert_with(|| self.gen.fresh())
    }

    fn target(&mut self, current_index: usize, offset: u8) -> Label {
        self.at(current_index + offset as usize)
    }
}

/// Parses `bytes` into a `WyilFile`.
pub fn read(bytes: &[u8]) -> Result<WyilFile, CodecError> {
    let mut r = ByteReader::new(bytes);
    let magic = r.read_bytes(8)?;
    if magic != MAGIC {
        let mut got = [0u8; 8];
        got.copy_from_slice(magic);
        return Err(CodecError::BadMagic(got));
    }
    let _major = r.read_uv()?;
    let _minor = r.read_uv()?;

    let string_count = r.read_uv()? as usize;
    let path_count = r.read_uv()? as usize;
    let name_count = r.read_uv()? as usize;
    let constant_count = r.read_uv()? as usize;
    let type_count = r.read_uv()? as usize;
    let num_decls = r.read_uv()? as usize;
    let id_index = r.read_uv()?;
    let filename_index = r.read_uv()?;

    let strings = StringPool::read(&mut r, string_count)?;
    let paths = PathPool::read(&mut r, path_count, &strings)?;
    let names = NamePool::read(&mut r, name_count, &paths, &strings)?;
    let constants = ConstantPool::read(&mut r, constant_count)?;
    let types = TypePool::read(&mut r, type_count, &names)?;
    let pools = Pools {
        strings,
        paths,
        names,
        constants,
        types,
        used_strings: RefCell::new(HashSet::new()),
        used_names: RefCell::new(HashSet::new()),
        used_constants: RefCell::new(HashSet::new()),
        used_types: RefCell::new(HashSet::new()),
    };
    let id = pools.get_string(id_index)?.to_string();
    let filename = pools.get_string(filename_index)?.to_string();

    let mut declarations = Vec::with_capacity(num_decls);
    for _ in 0..num_decls {
        declarations.push(read_declaration(&mut r, &pools)?);
    }

    pools.warn_dead_entries();

    // A file this crate itself wrote never violates the uniqueness
    // invariant `WyilFile::new` checks; a third-party writer that does
    // produce a colliding pair is, per spec.md §4.D, still a corrupt file.
    WyilFile::new(id, filename, declarations).map_err(|_| CodecError::TruncatedInput)
}

fn read_declaration(r: &mut ByteReader<'_>, pools: &Pools) -> Result<Declaration, CodecError> {
    let kind = r.read_uv()?;
    match kind {
        0 => {
            let name = pools.get_name(r.read_uv()?)?.clone();
            let value = pools.get_constant(r.read_uv()?)?.clone();
            Ok(Declaration::Constant { name, value })
        }
        1 => {
            let name = pools.get_name(r.read_uv()?)?.clone();
            let ty = pools.get_type(r.read_uv()?)?.clone();
            let has_constraint = r.read_u1()? != 0;
            let constraint = if has_constraint { Some(read_block(r, pools)?) } else { None };
            Ok(Declaration::Type { name, ty, constraint })
        }
        2 | 3 => {
            let name = pools.get_name(r.read_uv()?)?.clone();
            let signature = read_signature(r, pools, kind == 3)?;
            let num_cases = r.read_uv()? as usize;
            let mut cases = Vec::with_capacity(num_cases);
            for _ in 0..num_cases {
                cases.push(read_case(r, pools)?);
            }
            Ok(Declaration::FunctionOrMethod { name, signature, cases })
        }
        other => Err(CodecError::UnknownOpcode(other as u8)),
    }
}

fn read_signature(r: &mut ByteReader<'_>, pools: &Pools, is_method: bool) -> Result<Signature, CodecError> {
    let has_receiver = r.read_u1()? != 0;
    let receiver = if has_receiver { Some(pools.get_type(r.read_uv()?)?.clone()) } else { None };
    if has_receiver && !is_method {
        return Err(CodecError::WrongOperandKind { opcode: "function-declaration", expected: "no receiver" });
    }
    let nparams = r.read_uv()? as usize;
    let mut params = Vec::with_capacity(nparams);
    for _ in 0..nparams {
        params.push(pools.get_type(r.read_uv()?)?.clone());
    }
    let returns = pools.get_type(r.read_uv()?)?.clone();
    let nthrows = r.read_uv()? as usize;
    let mut throws = Vec::with_capacity(nthrows);
    for _ in 0..nthrows {
        throws.push(pools.get_type(r.read_uv()?)?.clone());
    }
    Ok(Signature { receiver, params, returns, throws })
}

fn read_case(r: &mut ByteReader<'_>, pools: &Pools) -> Result<Case, CodecError> {
    let has_pre = r.read_u1()? != 0;
    let precondition = if has_pre { Some(read_block(r, pools)?) } else { None };
    let has_post = r.read_u1()? != 0;
    let postcondition = if has_post { Some(read_block(r, pools)?) } else { None };
    let body = read_block(r, pools)?;
    Ok(Case { precondition, postcondition, body })
}

fn read_block(r: &mut ByteReader<'_>, pools: &Pools) -> Result<Block, CodecError> {
    let num_codes = r.read_uv()? as usize;
    let mut resolver = LabelResolver::new();
    let mut entries = Vec::with_capacity(num_codes);
    for i in 0..num_codes {
        let code = read_code(r, i, pools, &mut resolver)?;
        let attrs = read_attrs(r)?;
        entries.push(Entry::with_attrs(code, attrs));
    }
    Ok(Block::new(entries))
}

fn read_attrs(r: &mut ByteReader<'_>) -> Result<AttrBag, CodecError> {
    let n = r.read_uv()? as usize;
    let mut bag = AttrBag::new();
    for _ in 0..n {
        let tag = r.read_u1()?;
        let len = r.read_uv()? as usize;
        let payload = r.read_bytes(len)?.to_vec();
        bag.push(Attr { tag, payload });
    }
    Ok(bag)
}

fn read_reg(r: &mut ByteReader<'_>) -> Result<Register, CodecError> {
    Ok(Register::from(r.read_u1()?))
}

fn read_optional_reg(r: &mut ByteReader<'_>) -> Result<Option<Register>, CodecError> {
    if r.read_u1()? != 0 { Ok(Some(read_reg(r)?)) } else { Ok(None) }
}

fn read_reg_list(r: &mut ByteReader<'_>) -> Result<Vec<Register>, CodecError> {
    let n = r.read_uv()? as usize;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(read_reg(r)?);
    }
    Ok(out)
}

fn read_code(r: &mut ByteReader<'_>, index: usize, pools: &Pools, resolver: &mut LabelResolver) -> Result<Code, CodecError> {
    let tag_byte = r.read_u1()?;
    let tag = OpTag::try_from(tag_byte).map_err(|_| {
        if tag_byte <= RESERVED_MAX {
            CodecError::UnsupportedOpcode(tag_byte)
        } else {
            CodecError::UnknownOpcode(tag_byte)
        }
    })?;
    Ok(match tag {
        OpTag::Move | OpTag::Convert | OpTag::Invert | OpTag::Negate | OpTag::Dereference | OpTag::NewObject | OpTag::LengthOf | OpTag::Debug => {
            let op = unary_op(tag);
            let target = read_reg(r)?;
            let source = read_reg(r)?;
            let ty = pools.get_type(r.read_uv()?)?.clone();
            if op == UnaryOp::Dereference && !matches!(ty, crate::ir::ty::Type::Reference(_)) {
                return Err(CodecError::WrongOperandKind { opcode: "dereference", expected: "reference" });
            }
            Code::Unary { op, target, source, ty }
        }
        OpTag::Add | OpTag::Sub | OpTag::Mul | OpTag::Div | OpTag::Rem | OpTag::BitwiseAnd | OpTag::BitwiseOr | OpTag::BitwiseXor | OpTag::Shl | OpTag::Shr => {
            let op = binary_op(tag);
            let target = read_reg(r)?;
            let left = read_reg(r)?;
            let right = read_reg(r)?;
            Code::BinaryAssign { op, target, left, right }
        }
        OpTag::CmpEq | OpTag::CmpNeq | OpTag::CmpLt | OpTag::CmpLe | OpTag::CmpGt | OpTag::CmpGe => {
            let op = comparator(tag);
            let left = read_reg(r)?;
            let right = read_reg(r)?;
            let offset = r.read_u1()?;
            let target = resolver.target(index, offset);
            Code::BinaryCondition { op, left, right, target }
        }
        OpTag::Const => {
            let target = read_reg(r)?;
            let value = pools.get_constant(r.read_uv()?)?.clone();
            Code::Const { target, value }
        }
        OpTag::ListConstruct => {
            let target = read_reg(r)?;
            let ty = pools.get_type(r.read_uv()?)?.clone();
            let elements = read_reg_list(r)?;
            Code::ListConstruct { target, elements, ty }
        }
        OpTag::SetConstruct => {
            let target = read_reg(r)?;
            let ty = pools.get_type(r.read_uv()?)?.clone();
            let elements = read_reg_list(r)?;
            Code::SetConstruct { target, elements, ty }
        }
        OpTag::MapConstruct => {
            let target = read_reg(r)?;
            let ty = pools.get_type(r.read_uv()?)?.clone();
            let n = r.read_uv()? as usize;
            let mut entries = Vec::with_capacity(n);
            for _ in 0..n {
                entries.push((read_reg(r)?, read_reg(r)?));
            }
            Code::MapConstruct { target, entries, ty }
        }
        OpTag::TupleConstruct => {
            let target = read_reg(r)?;
            let elements = read_reg_list(r)?;
            Code::TupleConstruct { target, elements }
        }
        OpTag::RecordConstruct => {
            let target = read_reg(r)?;
            let ty = pools.get_type(r.read_uv()?)?.clone();
            let n = r.read_uv()? as usize;
            let mut fields = Vec::with_capacity(n);
            for _ in 0..n {
                let name = pools.get_string(r.read_uv()?)?.to_string();
                fields.push((name, read_reg(r)?));
            }
            Code::RecordConstruct { target, fields, ty }
        }
        OpTag::FieldLoad => {
            let target = read_reg(r)?;
            let source = read_reg(r)?;
            let field = pools.get_string(r.read_uv()?)?.to_string();
            Code::FieldLoad { target, source, field }
        }
        OpTag::TupleLoad => {
            let target = read_reg(r)?;
            let source = read_reg(r)?;
            let index_field = r.read_uv()? as usize;
            Code::TupleLoad { target, source, index: index_field }
        }
        OpTag::IndexOf => {
            let target = read_reg(r)?;
            let source = read_reg(r)?;
            let idx = read_reg(r)?;
            Code::IndexOf { target, source, index: idx }
        }
        OpTag::Update => {
            let target = read_reg(r)?;
            let source = read_reg(r)?;
            let idx = read_reg(r)?;
            let value = read_reg(r)?;
            Code::Update { target, source, index: idx, value }
        }
        OpTag::DirectInvoke => {
            let target = read_optional_reg(r)?;
            let name = pools.get_name(r.read_uv()?)?.clone();
            let args = read_reg_list(r)?;
            Code::DirectInvoke { target, name, args }
        }
        OpTag::IndirectInvoke => {
            let target = read_optional_reg(r)?;
            let callee = read_reg(r)?;
            let args = read_reg_list(r)?;
            Code::IndirectInvoke { target, callee, args }
        }
        OpTag::Goto => {
            let offset = r.read_u1()?;
            Code::Goto(resolver.target(index, offset))
        }
        OpTag::IfType => {
            let operand = read_reg(r)?;
            let ty = pools.get_type(r.read_uv()?)?.clone();
            let offset = r.read_u1()?;
            let target = resolver.target(index, offset);
            Code::IfType { operand, ty, target }
        }
        OpTag::Switch => {
            let operand = read_reg(r)?;
            let n = r.read_uv()? as usize;
            let mut cases = Vec::with_capacity(n);
            for _ in 0..n {
                let constant = pools.get_constant(r.read_uv()?)?.clone();
                let offset = r.read_u1()?;
                cases.push((constant, resolver.target(index, offset)));
            }
            let default_offset = r.read_u1()?;
            let default = resolver.target(index, default_offset);
            Code::Switch { operand, cases, default }
        }
        OpTag::Return => Code::Return(read_optional_reg(r)?),
        OpTag::Throw => Code::Throw(read_reg(r)?),
        OpTag::Fail => {
            let message = pools.get_string(r.read_uv()?)?.to_string();
            Code::Fail(message)
        }
        OpTag::Nop => Code::Nop,
        OpTag::Label => Code::Label(resolver.at(index)),
        OpTag::Loop => {
            let offset = r.read_u1()?;
            let end = resolver.target(index, offset);
            let modified = read_reg_list(r)?;
            Code::Loop { end, modified }
        }
        OpTag::ForAll => {
            let offset = r.read_u1()?;
            let end = resolver.target(index, offset);
            let modified = read_reg_list(r)?;
            let source = read_reg(r)?;
            let idx = read_reg(r)?;
            Code::ForAll { end, modified, source, index: idx }
        }
        OpTag::TryCatch => {
            let offset = r.read_u1()?;
            let end = resolver.target(index, offset);
            let modified = read_reg_list(r)?;
            let catch_offset = r.read_u1()?;
            let catch = resolver.target(index, catch_offset);
            Code::TryCatch { end, modified, catch }
        }
        OpTag::Assert => {
            let offset = r.read_u1()?;
            Code::Assert { end: resolver.target(index, offset) }
        }
        OpTag::Assume => {
            let offset = r.read_u1()?;
            Code::Assume { end: resolver.target(index, offset) }
        }
    })
}

fn unary_op(tag: OpTag) -> UnaryOp {
    match tag {
        OpTag::Move => UnaryOp::Move,
        OpTag::Convert => UnaryOp::Convert,
        OpTag::Invert => UnaryOp::Invert,
        OpTag::Negate => UnaryOp::Negate,
        OpTag::Dereference => UnaryOp::Dereference,
        OpTag::NewObject => UnaryOp::NewObject,
        OpTag::LengthOf => UnaryOp::LengthOf,
        OpTag::Debug => UnaryOp::Debug,
        _ => unreachable!("unary_op called on a non-unary tag"),
    }
}

fn binary_op(tag: OpTag) -> BinaryOp {
    match tag {
        OpTag::Add => BinaryOp::Add,
        OpTag::Sub => BinaryOp::Sub,
        OpTag::Mul => BinaryOp::Mul,
        OpTag::Div => BinaryOp::Div,
        OpTag::Rem => BinaryOp::Rem,
        OpTag::BitwiseAnd => BinaryOp::BitwiseAnd,
        OpTag::BitwiseOr => BinaryOp::BitwiseOr,
        OpTag::BitwiseXor => BinaryOp::BitwiseXor,
        OpTag::Shl => BinaryOp::Shl,
        OpTag::Shr => BinaryOp::Shr,
        _ => unreachable!("binary_op called on a non-binary-assign tag"),
    }
}

fn comparator(tag: OpTag) -> Comparator {
    match tag {
        OpTag::CmpEq => Comparator::Eq,
        OpTag::CmpNeq => Comparator::Neq,
        OpTag::CmpLt => Comparator::Lt,
        OpTag::CmpLe => Comparator::Le,
        OpTag::CmpGt => Comparator::Gt,
        OpTag::CmpGe => Comparator::Ge,
        _ => unreachable!("comparator called on a non-comparator tag"),
    }
}
