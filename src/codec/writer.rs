//! Serializes a `WyilFile` to the pooled binary format (spec.md §4.D).
//!
//! Blocks are serialized into a scratch buffer first, interning every
//! string/path/name/constant/type they reference as they go; only once
//! that pass is done are pool sizes known, so the pools themselves are
//! written right after the header, ahead of the (already-encoded) block
//! bytes — exactly the file order the grammar specifies.

use crate::codec::cursor::ByteWriter;
use crate::codec::opcode::OpTag;
use crate::codec::pool::{pre_register_type, ConstantPoolBuilder, NamePoolBuilder, PathPoolBuilder, StringPoolBuilder, TypePoolBuilder};
use crate::ir::block::Block;
use crate::ir::code::{BinaryOp, Code, Comparator, Register, UnaryOp};
use crate::module::{Case, Declaration, Signature, WyilFile};

const MAGIC: &[u8; 8] = b"WYILFILE";
const MAJOR: u64 = 1;
const MINOR: u64 = 0;

#[derive(Default)]
struct Pools {
    strings: StringPoolBuilder,
    paths: PathPoolBuilder,
    names: NamePoolBuilder,
    constants: ConstantPoolBuilder,
    types: TypePoolBuilder,
}

impl Pools {
    fn intern_type(&mut self, ty: &crate::ir::ty::Type) -> u64 {
        // Register any nominal/recursive labels `ty` carries before the type
        // pool itself gets written — see `pool::pre_register_type`.
        pre_register_type(ty, &mut self.names, &mut self.paths, &mut self.strings);
        self.types.intern(ty)
    }

    fn intern_constant(&mut self, c: &crate::ir::constant::Constant) -> u64 {
        self.constants.intern(c)
    }

    fn intern_name(&mut self, name: &crate::ir::name::QualifiedName) -> u64 {
        self.names.intern(name, &mut self.paths, &mut self.strings)
    }

    fn intern_string(&mut self, s: &str) -> u64 {
        self.strings.intern(s)
    }
}

/// Serializes `file` to its binary representation.
#[must_use]
pub fn write(file: &WyilFile) -> Vec<u8> {
    let mut pools = Pools::default();
    let mut blocks_buf = ByteWriter::new();

    blocks_buf.write_uv(file.declarations().len() as u64);
    for decl in file.declarations() {
        write_declaration(&mut blocks_buf, decl, &mut pools);
    }
    let id_index = pools.intern_string(&file.id);
    let filename_index = pools.intern_string(&file.filename);

    let mut out = ByteWriter::new();
    out.write_bytes(MAGIC);
    out.write_uv(MAJOR);
    out.write_uv(MINOR);
    out.write_uv(pools.strings.len() as u64);
    out.write_uv(pools.paths.len() as u64);
    out.write_uv(pools.names.len() as u64);
    out.write_uv(pools.constants.len() as u64);
    out.write_uv(pools.types.len() as u64);
    out.write_uv(file.declarations().len() as u64);
    out.write_uv(id_index);
    out.write_uv(filename_index);

    pools.strings.write(&mut out);
    pools.paths.write(&mut out);
    pools.names.write(&mut out);
    pools.constants.write(&mut out);
    // Types are written last among the pools since they're the only shape
    // that references the name pool while being built.
    pools.types.write(&mut out, &mut pools.names, &mut pools.paths, &mut pools.strings);

    out.write_bytes(&blocks_buf.into_bytes());
    out.into_bytes()
}

fn write_declaration(w: &mut ByteWriter, decl: &Declaration, pools: &mut Pools) {
    match decl {
        Declaration::Constant { name, value } => {
            w.write_uv(0);
            w.write_uv(pools.intern_name(name));
            w.write_uv(pools.intern_constant(value));
        }
        Declaration::Type { name, ty, constraint } => {
            w.write_uv(1);
            w.write_uv(pools.intern_name(name));
            w.write_uv(pools.intern_type(ty));
            w.write_u1(u8::from(constraint.is_some()));
            if let Some(block) = constraint {
                write_block(w, block, pools);
            }
        }
        Declaration::FunctionOrMethod { name, signature, cases } => {
            w.write_uv(if signature.is_method() { 3 } else { 2 });
            w.write_uv(pools.intern_name(name));
            write_signature(w, signature, pools);
            w.write_uv(cases.len() as u64);
            for case in cases {
                write_case(w, case, pools);
            }
        }
    }
}

fn write_signature(w: &mut ByteWriter, sig: &Signature, pools: &mut Pools) {
    w.write_u1(u8::from(sig.receiver.is_some()));
    if let Some(r) = &sig.receiver {
        w.write_uv(pools.intern_type(r));
    }
    w.write_uv(sig.params.len() as u64);
    for p in &sig.params {
        w.write_uv(pools.intern_type(p));
    }
    w.write_uv(pools.intern_type(&sig.returns));
    w.write_uv(sig.throws.len() as u64);
    for t in &sig.throws {
        w.write_uv(pools.intern_type(t));
    }
}

fn write_case(w: &mut ByteWriter, case: &Case, pools: &mut Pools) {
    w.write_u1(u8::from(case.precondition.is_some()));
    if let Some(b) = &case.precondition {
        write_block(w, b, pools);
    }
    w.write_u1(u8::from(case.postcondition.is_some()));
    if let Some(b) = &case.postcondition {
        write_block(w, b, pools);
    }
    write_block(w, &case.body, pools);
}

fn write_block(w: &mut ByteWriter, block: &Block, pools: &mut Pools) {
    w.write_uv(block.size() as u64);
    for (i, entry) in block.entries().iter().enumerate() {
        write_code(w, &entry.code, i, block, pools);
        write_attrs(w, &entry.attrs);
    }
}

/// The opaque attribute bag attached to every entry (spec.md §1: "the core
/// must preserve opaque attribute payloads attached to every bytecode but
/// does not interpret them"). Wire shape not specified by spec.md §4.D's
/// grammar; this crate supplements it with a plain tag+length-prefixed
/// encoding so the codec round-trip property (spec.md §8.1) holds over
/// attributes too.
fn write_attrs(w: &mut ByteWriter, attrs: &crate::ir::block::AttrBag) {
    let items: Vec<_> = attrs.iter().collect();
    w.write_uv(items.len() as u64);
    for attr in items {
        w.write_u1(attr.tag);
        w.write_uv(attr.payload.len() as u64);
        w.write_bytes(&attr.payload);
    }
}

/// Forward-only branch offset: `target_index - current_index`, which the
/// `Block` invariant (spec.md §3) guarantees is positive and, for every
/// block this crate constructs, small enough to fit a `u1`.
fn offset_to(block: &Block, current_index: usize, target: crate::ir::code::Label) -> u8 {
    let target_index = block.index_of(target).expect("branch target must be defined in the same block");
    debug_assert!(target_index > current_index, "branch targets must be forward (spec.md §3)");
    u8::try_from(target_index - current_index).expect("branch offset must fit a u1")
}

fn write_reg(w: &mut ByteWriter, r: Register) {
    w.write_u1(u8::try_from(r).expect("register index must fit a u1 on the wire"));
}

fn write_code(w: &mut ByteWriter, code: &Code, index: usize, block: &Block, pools: &mut Pools) {
    match code {
        Code::Unary { op, target, source, ty } => {
            w.write_u1(unary_tag(*op).into());
            write_reg(w, *target);
            write_reg(w, *source);
            w.write_uv(pools.intern_type(ty));
        }
        Code::BinaryCondition { op, left, right, target } => {
            w.write_u1(comparator_tag(*op).into());
            write_reg(w, *left);
            write_reg(w, *right);
            w.write_u1(offset_to(block, index, *target));
        }
        Code::BinaryAssign { op, target, left, right } => {
            w.write_u1(binary_tag(*op).into());
            write_reg(w, *target);
            write_reg(w, *left);
            write_reg(w, *right);
        }
        Code::Const { target, value } => {
            w.write_u1(OpTag::Const.into());
            write_reg(w, *target);
            w.write_uv(pools.intern_constant(value));
        }
        Code::ListConstruct { target, elements, ty } => {
            w.write_u1(OpTag::ListConstruct.into());
            write_reg(w, *target);
            w.write_uv(pools.intern_type(ty));
            write_reg_list(w, elements);
        }
        Code::SetConstruct { target, elements, ty } => {
            w.write_u1(OpTag::SetConstruct.into());
            write_reg(w, *target);
            w.write_uv(pools.intern_type(ty));
            write_reg_list(w, elements);
        }
        Code::MapConstruct { target, entries, ty } => {
            w.write_u1(OpTag::MapConstruct.into());
            write_reg(w, *target);
            w.write_uv(pools.intern_type(ty));
            w.write_uv(entries.len() as u64);
            for (k, v) in entries {
                write_reg(w, *k);
                write_reg(w, *v);
            }
        }
        Code::TupleConstruct { target, elements } => {
            w.write_u1(OpTag::TupleConstruct.into());
            write_reg(w, *target);
            write_reg_list(w, elements);
        }
        Code::RecordConstruct { target, fields, ty } => {
            w.write_u1(OpTag::RecordConstruct.into());
            write_reg(w, *target);
            w.write_uv(pools.intern_type(ty));
            w.write_uv(fields.len() as u64);
            for (name, r) in fields {
                w.write_uv(pools.intern_string(name));
                write_reg(w, *r);
            }
        }
        Code::FieldLoad { target, source, field } => {
            w.write_u1(OpTag::FieldLoad.into());
            write_reg(w, *target);
            write_reg(w, *source);
            w.write_uv(pools.intern_string(field));
        }
        Code::TupleLoad { target, source, index: field_index } => {
            w.write_u1(OpTag::TupleLoad.into());
            write_reg(w, *target);
            write_reg(w, *source);
            w.write_uv(*field_index as u64);
        }
        Code::IndexOf { target, source, index: idx_reg } => {
            w.write_u1(OpTag::IndexOf.into());
            write_reg(w, *target);
            write_reg(w, *source);
            write_reg(w, *idx_reg);
        }
        Code::Update { target, source, index: idx_reg, value } => {
            w.write_u1(OpTag::Update.into());
            write_reg(w, *target);
            write_reg(w, *source);
            write_reg(w, *idx_reg);
            write_reg(w, *value);
        }
        Code::DirectInvoke { target, name, args } => {
            w.write_u1(OpTag::DirectInvoke.into());
            write_optional_reg(w, *target);
            w.write_uv(pools.intern_name(name));
            write_reg_list(w, args);
        }
        Code::IndirectInvoke { target, callee, args } => {
            w.write_u1(OpTag::IndirectInvoke.into());
            write_optional_reg(w, *target);
            write_reg(w, *callee);
            write_reg_list(w, args);
        }
        Code::Goto(target) => {
            w.write_u1(OpTag::Goto.into());
            w.write_u1(offset_to(block, index, *target));
        }
        Code::IfType { operand, ty, target } => {
            w.write_u1(OpTag::IfType.into());
            write_reg(w, *operand);
            w.write_uv(pools.intern_type(ty));
            w.write_u1(offset_to(block, index, *target));
        }
        Code::Switch { operand, cases, default } => {
            w.write_u1(OpTag::Switch.into());
            write_reg(w, *operand);
            w.write_uv(cases.len() as u64);
            for (c, label) in cases {
                w.write_uv(pools.intern_constant(c));
                w.write_u1(offset_to(block, index, *label));
            }
            w.write_u1(offset_to(block, index, *default));
        }
        Code::Return(value) => {
            w.write_u1(OpTag::Return.into());
            write_optional_reg(w, *value);
        }
        Code::Throw(value) => {
            w.write_u1(OpTag::Throw.into());
            write_reg(w, *value);
        }
        Code::Fail(message) => {
            w.write_u1(OpTag::Fail.into());
            w.write_uv(pools.intern_string(message));
        }
        Code::Nop => w.write_u1(OpTag::Nop.into()),
        Code::Label(_) => w.write_u1(OpTag::Label.into()),
        Code::Loop { end, modified } => {
            w.write_u1(OpTag::Loop.into());
            w.write_u1(offset_to(block, index, *end));
            write_reg_list(w, modified);
        }
        Code::ForAll { end, modified, source, index: idx_reg } => {
            w.write_u1(OpTag::ForAll.into());
            w.write_u1(offset_to(block, index, *end));
            write_reg_list(w, modified);
            write_reg(w, *source);
            write_reg(w, *idx_reg);
        }
        Code::TryCatch { end, modified, catch } => {
            w.write_u1(OpTag::TryCatch.into());
            w.write_u1(offset_to(block, index, *end));
            write_reg_list(w, modified);
            w.write_u1(offset_to(block, index, *catch));
        }
        Code::Assert { end } => {
            w.write_u1(OpTag::Assert.into());
            w.write_u1(offset_to(block, index, *end));
        }
        Code::Assume { end } => {
            w.write_u1(OpTag::Assume.into());
            w.write_u1(offset_to(block, index, *end));
        }
    }
}

fn write_reg_list(w: &mut ByteWriter, regs: &[Register]) {
    w.write_uv(regs.len() as u64);
    for r in regs {
        write_reg(w, *r);
    }
}

fn write_optional_reg(w: &mut ByteWriter, r: Option<Register>) {
    w.write_u1(u8::from(r.is_some()));
    if let Some(r) = r {
        write_reg(w, r);
    }
}

fn unary_tag(op: UnaryOp) -> OpTag {
    match op {
        UnaryOp::Move => OpTag::Move,
        UnaryOp::Convert => OpTag::Convert,
        UnaryOp::Invert => OpTag::Invert,
        UnaryOp::Negate => OpTag::Negate,
        UnaryOp::Dereference => OpTag::Dereference,
        UnaryOp::NewObject => OpTag::NewObject,
        UnaryOp::LengthOf => OpTag::LengthOf,
        UnaryOp::Debug => OpTag::Debug,
    }
}

fn binary_tag(op: BinaryOp) -> OpTag {
    match op {
        BinaryOp::Add => OpTag::Add,
        BinaryOp::Sub => OpTag::Sub,
        BinaryOp::Mul => OpTag::Mul,
        BinaryOp::Div => OpTag::Div,
        BinaryOp::Rem => OpTag::Rem,
        BinaryOp::BitwiseAnd => OpTag::BitwiseAnd,
        BinaryOp::BitwiseOr => OpTag::BitwiseOr,
        BinaryOp::BitwiseXor => OpTag::BitwiseXor,
        BinaryOp::Shl => OpTag::Shl,
        BinaryOp::Shr => OpTag::Shr,
    }
}

fn comparator_tag(op: Comparator) -> OpTag {
    match op {
        Comparator::Eq => OpTag::CmpEq,
        Comparator::Neq => OpTag::CmpNeq,
        Comparator::Lt => OpTag::CmpLt,
        Comparator::Le => OpTag::CmpLe,
        Comparator::Gt => OpTag::CmpGt,
        Comparator::Ge => OpTag::CmpGe,
    }
}
