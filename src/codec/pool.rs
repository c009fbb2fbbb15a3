//! The five pools the binary format interns through (spec.md §4.D): an
//! indexed string table, a path table built on top of it, a name table
//! built on top of that, and self-contained constant/type tables.
//!
//! Write side: a `Builder` per pool structurally dedups what it's handed
//! and hands back the index a later reference should use. Read side: a
//! plain indexed table, populated once in pool order, consulted
//! afterwards by block decoding.

use std::collections::HashMap;

use crate::codec::cursor::{ByteReader, ByteWriter};
use crate::codec::error::CodecError;
use crate::ir::constant::{Constant, Rational};
use crate::ir::name::QualifiedName;
use crate::ir::ty::Type;

// ---------------------------------------------------------------- strings

#[derive(Default)]
pub struct StringPoolBuilder {
    index_of: HashMap<String, u64>,
    entries: Vec<String>,
}

impl StringPoolBuilder {
    pub fn intern(&mut self, s: &str) -> u64 {
        if let Some(&i) = self.index_of.get(s) {
            return i;
        }
        let i = self.entries.len() as u64;
        self.entries.push(s.to_string());
        self.index_of.insert(s.to_string(), i);
        i
    }

    pub fn write(&self, w: &mut ByteWriter) {
        for s in &self.entries {
            w.write_utf8_string(s);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Default, Debug)]
pub struct StringPool(Vec<String>);

impl StringPool {
    pub fn read(r: &mut ByteReader<'_>, count: usize) -> Result<Self, CodecError> {
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(r.read_utf8_string()?);
        }
        Ok(Self(entries))
    }

    pub fn get(&self, index: u64) -> Result<&str, CodecError> {
        self.0
            .get(index as usize)
            .map(String::as_str)
            .ok_or(CodecError::PoolIndexOutOfRange { pool: "string", index, len: self.0.len() })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

// ------------------------------------------------------------------ paths

/// `(parent, stringIndex)`; `parent = 0` means root (this entry is just
/// `[stringPool[stringIndex]]`), else this entry extends
/// `pathPool[parent-1]`.
#[derive(Default)]
pub struct PathPoolBuilder {
    index_of: HashMap<Vec<String>, u64>,
    entries: Vec<(u64, u64)>,
}

impl PathPoolBuilder {
    /// Interns `path` (and every prefix of it, since each pool entry can
    /// only extend by one segment) and returns `0` for an empty path or
    /// `1 + index` of the full path's entry otherwise.
    pub fn intern(&mut self, path: &[String], strings: &mut StringPoolBuilder) -> u64 {
        if path.is_empty() {
            return 0;
        }
        if let Some(&i) = self.index_of.get(path) {
            return i + 1;
        }
        let parent = self.intern(&path[..path.len() - 1], strings);
        let string_index = strings.intern(&path[path.len() - 1]);
        let i = self.entries.len() as u64;
        self.entries.push((parent, string_index));
        self.index_of.insert(path.to_vec(), i);
        i + 1
    }

    pub fn write(&self, w: &mut ByteWriter) {
        for (parent, string_index) in &self.entries {
            w.write_uv(*parent);
            w.write_uv(*string_index);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Default, Debug)]
pub struct PathPool(Vec<Vec<String>>);

impl PathPool {
    pub fn read(r: &mut ByteReader<'_>, count: usize, strings: &StringPool) -> Result<Self, CodecError> {
        let mut raw = Vec::with_capacity(count);
        for _ in 0..count {
            let parent = r.read_uv()?;
            let string_index = r.read_uv()?;
            raw.push((parent, string_index));
        }
        let mut resolved: Vec<Vec<String>> = Vec::with_capacity(count);
        for (parent, string_index) in &raw {
            let mut path = if *parent == 0 {
                Vec::new()
            } else {
                resolved
                    .get((*parent - 1) as usize)
                    .cloned()
                    .ok_or(CodecError::PoolIndexOutOfRange { pool: "path", index: *parent, len: resolved.len() })?
            };
            path.push(strings.get(*string_index)?.to_string());
            resolved.push(path);
        }
        Ok(Self(resolved))
    }

    /// `index = 0` resolves to the empty path, matching the builder's
    /// `intern` return convention.
    pub fn get(&self, index: u64) -> Result<&[String], CodecError> {
        if index == 0 {
            return Ok(&[]);
        }
        self.0
            .get((index - 1) as usize)
            .map(Vec::as_slice)
            .ok_or(CodecError::PoolIndexOutOfRange { pool: "path", index, len: self.0.len() })
    }
}

// ------------------------------------------------------------------ names

#[derive(Default)]
pub struct NamePoolBuilder {
    index_of: HashMap<QualifiedName, u64>,
    entries: Vec<(u64, u64)>,
}

impl NamePoolBuilder {
    pub fn intern(&mut self, name: &QualifiedName, paths: &mut PathPoolBuilder, strings: &mut StringPoolBuilder) -> u64 {
        if let Some(&i) = self.index_of.get(name) {
            return i;
        }
        let path_index = paths.intern(name.path(), strings);
        let name_index = strings.intern(name.name());
        let i = self.entries.len() as u64;
        self.entries.push((path_index, name_index));
        self.index_of.insert(name.clone(), i);
        i
    }

    pub fn write(&self, w: &mut ByteWriter) {
        for (path_index, name_index) in &self.entries {
            w.write_uv(*path_index);
            w.write_uv(*name_index);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Default, Debug)]
pub struct NamePool(Vec<QualifiedName>);

impl NamePool {
    pub fn read(r: &mut ByteReader<'_>, count: usize, paths: &PathPool, strings: &StringPool) -> Result<Self, CodecError> {
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let path_index = r.read_uv()?;
            let name_index = r.read_uv()?;
            let path = paths.get(path_index)?.to_vec();
            let name = strings.get(name_index)?.to_string();
            entries.push(QualifiedName::new(path, name));
        }
        Ok(Self(entries))
    }

    pub fn get(&self, index: u64) -> Result<&QualifiedName, CodecError> {
        self.0.get(index as usize).ok_or(CodecError::PoolIndexOutOfRange { pool: "name", index, len: self.0.len() })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

// -------------------------------------------------------------- constants

#[derive(Clone, Copy, PartialEq, Eq, num_enum::TryFromPrimitive, num_enum::IntoPrimitive)]
#[repr(u8)]
enum ConstTag {
    Null = 0,
    False = 1,
    True = 2,
    Byte = 3,
    Char = 4,
    Int = 5,
    Real = 6,
    String = 7,
    List = 8,
    Set = 9,
    Tuple = 10,
    Record = 11,
}

/// Writes one `Constant`, recursing directly into nested constants rather
/// than through a further pool index (spec.md §4.D: "composite values
/// recurse on Constant").
pub fn write_constant(w: &mut ByteWriter, c: &Constant) {
    match c {
        Constant::Null => w.write_u1(ConstTag::Null.into()),
        Constant::Bool(false) => w.write_u1(ConstTag::False.into()),
        Constant::Bool(true) => w.write_u1(ConstTag::True.into()),
        Constant::Byte(b) => {
            w.write_u1(ConstTag::Byte.into());
            w.write_u1(*b);
        }
        Constant::Char(c) => {
            w.write_u1(ConstTag::Char.into());
            w.write_uv(u64::from(*c));
        }
        Constant::Int(i) => {
            w.write_u1(ConstTag::Int.into());
            w.write_signed_bigint(i);
        }
        Constant::Real(r) => {
            w.write_u1(ConstTag::Real.into());
            w.write_signed_bigint(r.numer());
            w.write_signed_bigint(r.denom());
        }
        Constant::Str(s) => {
            w.write_u1(ConstTag::String.into());
            w.write_utf16_string(s);
        }
        Constant::List(xs) => write_constant_seq(w, ConstTag::List, xs),
        Constant::Set(xs) => write_constant_seq(w, ConstTag::Set, xs),
        Constant::Tuple(xs) => write_constant_seq(w, ConstTag::Tuple, xs),
        Constant::Record(fields) => {
            w.write_u1(ConstTag::Record.into());
            w.write_u2(fields.len() as u16);
            for (name, value) in fields {
                w.write_utf8_string(name);
                write_constant(w, value);
            }
        }
    }
}

fn write_constant_seq(w: &mut ByteWriter, tag: ConstTag, xs: &[Constant]) {
    w.write_u1(tag.into());
    w.write_u2(xs.len() as u16);
    for x in xs {
        write_constant(w, x);
    }
}

pub fn read_constant(r: &mut ByteReader<'_>) -> Result<Constant, CodecError> {
    let tag_byte = r.read_u1()?;
    let tag = ConstTag::try_from(tag_byte).map_err(|_| CodecError::UnknownOpcode(tag_byte))?;
    Ok(match tag {
        ConstTag::Null => Constant::Null,
        ConstTag::False => Constant::Bool(false),
        ConstTag::True => Constant::Bool(true),
        ConstTag::Byte => Constant::Byte(r.read_u1()?),
        ConstTag::Char => {
            let code = r.read_uv()?;
            let c = u32::try_from(code).ok().and_then(char::from_u32).ok_or(CodecError::TruncatedInput)?;
            Constant::Char(c)
        }
        ConstTag::Int => Constant::Int(r.read_signed_bigint()?),
        ConstTag::Real => {
            let numer = r.read_signed_bigint()?;
            let denom = r.read_signed_bigint()?;
            Constant::Real(Rational::new(numer, denom))
        }
        ConstTag::String => Constant::Str(r.read_utf16_string()?),
        ConstTag::List => Constant::List(read_constant_seq(r)?),
        ConstTag::Set => Constant::Set(read_constant_seq(r)?),
        ConstTag::Tuple => Constant::Tuple(read_constant_seq(r)?),
        ConstTag::Record => {
            let len = r.read_u2()? as usize;
            let mut fields = Vec::with_capacity(len);
            for _ in 0..len {
                let name = r.read_utf8_string()?;
                fields.push((name, read_constant(r)?));
            }
            Constant::Record(fields)
        }
    })
}

fn read_constant_seq(r: &mut ByteReader<'_>) -> Result<Vec<Constant>, CodecError> {
    let len = r.read_u2()? as usize;
    let mut xs = Vec::with_capacity(len);
    for _ in 0..len {
        xs.push(read_constant(r)?);
    }
    Ok(xs)
}

#[derive(Default)]
pub struct ConstantPoolBuilder {
    index_of: HashMap<Constant, u64>,
    entries: Vec<Constant>,
}

impl ConstantPoolBuilder {
    pub fn intern(&mut self, c: &Constant) -> u64 {
        if let Some(&i) = self.index_of.get(c) {
            return i;
        }
        let i = self.entries.len() as u64;
        self.entries.push(c.clone());
        self.index_of.insert(c.clone(), i);
        i
    }

    pub fn write(&self, w: &mut ByteWriter) {
        for c in &self.entries {
            write_constant(w, c);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Default, Debug)]
pub struct ConstantPool(Vec<Constant>);

impl ConstantPool {
    pub fn read(r: &mut ByteReader<'_>, count: usize) -> Result<Self, CodecError> {
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(read_constant(r)?);
        }
        Ok(Self(entries))
    }

    pub fn get(&self, index: u64) -> Result<&Constant, CodecError> {
        self.0.get(index as usize).ok_or(CodecError::PoolIndexOutOfRange { pool: "constant", index, len: self.0.len() })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

// ------------------------------------------------------------------ types

#[derive(Clone, Copy, PartialEq, Eq, num_enum::TryFromPrimitive, num_enum::IntoPrimitive)]
#[repr(u8)]
enum TypeTag {
    Void = 0,
    Any = 1,
    Null = 2,
    Bool = 3,
    Byte = 4,
    Char = 5,
    Int = 6,
    Rational = 7,
    Str = 8,
    List = 9,
    Set = 10,
    Map = 11,
    Tuple = 12,
    Record = 13,
    Reference = 14,
    Function = 15,
    Method = 16,
    Union = 17,
    Intersection = 18,
    Negation = 19,
    Nominal = 20,
    Recursive = 21,
}

/// Writes one `Type`. Unlike `Constant`, a `Type` can name another
/// declaration (`Nominal`/`Recursive`'s label), so encoding needs write
/// access to the name pool being built.
pub fn write_type(w: &mut ByteWriter, ty: &Type, names: &mut NamePoolBuilder, paths: &mut PathPoolBuilder, strings: &mut StringPoolBuilder) {
    let mut rec = |w: &mut ByteWriter, t: &Type| write_type(w, t, names, paths, strings);
    match ty {
        Type::Void => w.write_u1(TypeTag::Void.into()),
        Type::Any => w.write_u1(TypeTag::Any.into()),
        Type::Null => w.write_u1(TypeTag::Null.into()),
        Type::Bool => w.write_u1(TypeTag::Bool.into()),
        Type::Byte => w.write_u1(TypeTag::Byte.into()),
        Type::Char => w.write_u1(TypeTag::Char.into()),
        Type::Int => w.write_u1(TypeTag::Int.into()),
        Type::Rational => w.write_u1(TypeTag::Rational.into()),
        Type::Str => w.write_u1(TypeTag::Str.into()),
        Type::List(e) => {
            w.write_u1(TypeTag::List.into());
            rec(w, e);
        }
        Type::Set(e) => {
            w.write_u1(TypeTag::Set.into());
            rec(w, e);
        }
        Type::Map(k, v) => {
            w.write_u1(TypeTag::Map.into());
            rec(w, k);
            rec(w, v);
        }
        Type::Tuple(ts) => {
            w.write_u1(TypeTag::Tuple.into());
            w.write_uv(ts.len() as u64);
            for t in ts {
                rec(w, t);
            }
        }
        Type::Record(fields, open) => {
            w.write_u1(TypeTag::Record.into());
            w.write_u1(u8::from(*open));
            w.write_uv(fields.len() as u64);
            for (name, t) in fields {
                w.write_utf8_string(name);
                rec(w, t);
            }
        }
        Type::Reference(e) => {
            w.write_u1(TypeTag::Reference.into());
            rec(w, e);
        }
        Type::Function(params, ret, throws) => {
            w.write_u1(TypeTag::Function.into());
            write_type_list(w, params, names, paths, strings);
            write_type(w, ret, names, paths, strings);
            write_type_list(w, throws, names, paths, strings);
        }
        Type::Method(receiver, params, ret, throws) => {
            w.write_u1(TypeTag::Method.into());
            w.write_u1(u8::from(receiver.is_some()));
            if let Some(r) = receiver {
                write_type(w, r, names, paths, strings);
            }
            write_type_list(w, params, names, paths, strings);
            write_type(w, ret, names, paths, strings);
            write_type_list(w, throws, names, paths, strings);
        }
        Type::Union(ts) => {
            w.write_u1(TypeTag::Union.into());
            write_type_list(w, ts, names, paths, strings);
        }
        Type::Intersection(ts) => {
            w.write_u1(TypeTag::Intersection.into());
            write_type_list(w, ts, names, paths, strings);
        }
        Type::Negation(e) => {
            w.write_u1(TypeTag::Negation.into());
            rec(w, e);
        }
        Type::Nominal(name) => {
            w.write_u1(TypeTag::Nominal.into());
            let idx = names.intern(name, paths, strings);
            w.write_uv(idx);
        }
        Type::Recursive(label, body) => {
            w.write_u1(TypeTag::Recursive.into());
            let idx = names.intern(label, paths, strings);
            w.write_uv(idx);
            rec(w, body);
        }
    }
}

/// Walks `ty` and interns every `Nominal`/`Recursive` label it contains,
/// without writing any bytes.
///
/// `write_type` interns those same labels lazily, as it encounters them —
/// fine on its own, but the type pool is written last among the five pools
/// (it's the only one that reaches back into the name pool while being
/// written), after the name/path/string pool sizes are already fixed in the
/// header and their bytes already flushed. A label first seen during that
/// final pass would get an index nothing upstream of it on the wire knows
/// about. Calling this at `intern` time, while the name pool is still open
/// for writing, keeps every label a type pool entry can reference already
/// resolvable by the time the name pool itself is sized and written.
fn register_type_names(ty: &Type, names: &mut NamePoolBuilder, paths: &mut PathPoolBuilder, strings: &mut StringPoolBuilder) {
    match ty {
        Type::Void
        | Type::Any
        | Type::Null
        | Type::Bool
        | Type::Byte
        | Type::Char
        | Type::Int
        | Type::Rational
        | Type::Str => {}
        Type::List(e) | Type::Set(e) | Type::Reference(e) | Type::Negation(e) => {
            register_type_names(e, names, paths, strings);
        }
        Type::Map(k, v) => {
            register_type_names(k, names, paths, strings);
            register_type_names(v, names, paths, strings);
        }
        Type::Tuple(ts) | Type::Union(ts) | Type::Intersection(ts) => {
            for t in ts {
                register_type_names(t, names, paths, strings);
            }
        }
        Type::Record(fields, _) => {
            for (_, t) in fields {
                register_type_names(t, names, paths, strings);
            }
        }
        Type::Function(params, ret, throws) => {
            for p in params {
                register_type_names(p, names, paths, strings);
            }
            register_type_names(ret, names, paths, strings);
            for t in throws {
                register_type_names(t, names, paths, strings);
            }
        }
        Type::Method(receiver, params, ret, throws) => {
            if let Some(r) = receiver {
                register_type_names(r, names, paths, strings);
            }
            for p in params {
                register_type_names(p, names, paths, strings);
            }
            register_type_names(ret, names, paths, strings);
            for t in throws {
                register_type_names(t, names, paths, strings);
            }
        }
        Type::Nominal(name) => {
            names.intern(name, paths, strings);
        }
        Type::Recursive(label, body) => {
            names.intern(label, paths, strings);
            register_type_names(body, names, paths, strings);
        }
    }
}

pub fn pre_register_type(ty: &Type, names: &mut NamePoolBuilder, paths: &mut PathPoolBuilder, strings: &mut StringPoolBuilder) {
    register_type_names(ty, names, paths, strings);
}

fn write_type_list(w: &mut ByteWriter, ts: &[Type], names: &mut NamePoolBuilder, paths: &mut PathPoolBuilder, strings: &mut StringPoolBuilder) {
    w.write_uv(ts.len() as u64);
    for t in ts {
        write_type(w, t, names, paths, strings);
    }
}

pub fn read_type(r: &mut ByteReader<'_>, names: &NamePool) -> Result<Type, CodecError> {
    let tag_byte = r.read_u1()?;
    let tag = TypeTag::try_from(tag_byte).map_err(|_| CodecError::UnknownOpcode(tag_byte))?;
    Ok(match tag {
        TypeTag::Void => Type::Void,
        TypeTag::Any => Type::Any,
        TypeTag::Null => Type::Null,
        TypeTag::Bool => Type::Bool,
        TypeTag::Byte => Type::Byte,
        TypeTag::Char => Type::Char,
        TypeTag::Int => Type::Int,
        TypeTag::Rational => Type::Rational,
        TypeTag::Str => Type::Str,
        TypeTag::List => Type::List(Box::new(read_type(r, names)?)),
        TypeTag::Set => Type::Set(Box::new(read_type(r, names)?)),
        TypeTag::Map => {
            let k = read_type(r, names)?;
            let v = read_type(r, names)?;
            Type::Map(Box::new(k), Box::new(v))
        }
        TypeTag::Tuple => {
            let n = r.read_uv()? as usize;
            let mut ts = Vec::with_capacity(n);
            for _ in 0..n {
                ts.push(read_type(r, names)?);
            }
            Type::Tuple(ts)
        }
        TypeTag::Record => {
            let open = r.read_u1()? != 0;
            let n = r.read_uv()? as usize;
            let mut fields = Vec::with_capacity(n);
            for _ in 0..n {
                let name = r.read_utf8_string()?;
                fields.push((name, read_type(r, names)?));
            }
            Type::Record(fields, open)
        }
        TypeTag::Reference => Type::Reference(Box::new(read_type(r, names)?)),
        TypeTag::Function => {
            let params = read_type_list(r, names)?;
            let ret = read_type(r, names)?;
            let throws = read_type_list(r, names)?;
            Type::Function(params, Box::new(ret), throws)
        }
        TypeTag::Method => {
            let has_receiver = r.read_u1()? != 0;
            let receiver = if has_receiver { Some(Box::new(read_type(r, names)?)) } else { None };
            let params = read_type_list(r, names)?;
            let ret = read_type(r, names)?;
            let throws = read_type_list(r, names)?;
            Type::Method(receiver, params, Box::new(ret), throws)
        }
        TypeTag::Union => Type::Union(read_type_list(r, names)?),
        TypeTag::Intersection => Type::Intersection(read_type_list(r, names)?),
        TypeTag::Negation => Type::Negation(Box::new(read_type(r, names)?)),
        TypeTag::Nominal => {
            let idx = r.read_uv()?;
            Type::Nominal(names.get(idx)?.clone())
        }
        TypeTag::Recursive => {
            let idx = r.read_uv()?;
            let label = names.get(idx)?.clone();
            let body = read_type(r, names)?;
            Type::Recursive(label, Box::new(body))
        }
    })
}

fn read_type_list(r: &mut ByteReader<'_>, names: &NamePool) -> Result<Vec<Type>, CodecError> {
    let n = r.read_uv()? as usize;
    let mut ts = Vec::with_capacity(n);
    for _ in 0..n {
        ts.push(read_type(r, names)?);
    }
    Ok(ts)
}

#[derive(Default)]
pub struct TypePoolBuilder {
    index_of: HashMap<Type, u64>,
    entries: Vec<Type>,
}

impl TypePoolBuilder {
    pub fn intern(&mut self, ty: &Type) -> u64 {
        if let Some(&i) = self.index_of.get(ty) {
            return i;
        }
        let i = self.entries.len() as u64;
        self.entries.push(ty.clone());
        self.index_of.insert(ty.clone(), i);
        i
    }

    pub fn write(&self, w: &mut ByteWriter, names: &mut NamePoolBuilder, paths: &mut PathPoolBuilder, strings: &mut StringPoolBuilder) {
        for t in &self.entries {
            write_type(w, t, names, paths, strings);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Default, Debug)]
pub struct TypePool(Vec<Type>);

impl TypePool {
    pub fn read(r: &mut ByteReader<'_>, count: usize, names: &NamePool) -> Result<Self, CodecError> {
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(read_type(r, names)?);
        }
        Ok(Self(entries))
    }

    pub fn get(&self, index: u64) -> Result<&Type, CodecError> {
        self.0.get(index as usize).ok_or(CodecError::PoolIndexOutOfRange { pool: "type", index, len: self.0.len() })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    #[test]
    fn string_pool_dedups_on_intern() {
        let mut b = StringPoolBuilder::default();
        let a = b.intern("hello");
        let c = b.intern("hello");
        assert_eq!(a, c);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn path_pool_round_trips_nested_path() {
        let mut strings = StringPoolBuilder::default();
        let mut paths = PathPoolBuilder::default();
        let idx = paths.intern(&["a".into(), "b".into(), "c".into()], &mut strings);

        let mut w = ByteWriter::new();
        strings.write(&mut w);
        let string_bytes = w.into_bytes();
        let mut w2 = ByteWriter::new();
        paths.write(&mut w2);
        let path_bytes = w2.into_bytes();

        let mut sr = ByteReader::new(&string_bytes);
        let string_pool = StringPool::read(&mut sr, strings.len()).unwrap();
        let mut pr = ByteReader::new(&path_bytes);
        let path_pool = PathPool::read(&mut pr, paths.len(), &string_pool).unwrap();
        assert_eq!(path_pool.get(idx).unwrap(), &["a".to_string(), "b".to_string(), "c".to_string()]);
    }

    #[test]
    fn constant_round_trips_nested_record() {
        let c = Constant::Record(vec![
            ("x".into(), Constant::Int(BigInt::from(-7))),
            ("y".into(), Constant::List(vec![Constant::Bool(true), Constant::Null])),
        ]);
        let mut w = ByteWriter::new();
        write_constant(&mut w, &c);
        let bytes = w.into_bytes();
        let mut r = ByteReader::new(&bytes);
        assert_eq!(read_constant(&mut r).unwrap(), c);
    }

    #[test]
    fn type_round_trips_nominal_reference() {
        let name = QualifiedName::new(vec!["a".into()], "Nat".into());
        let ty = Type::union(vec![Type::Nominal(name.clone()), Type::Null]);

        let mut strings = StringPoolBuilder::default();
        let mut paths = PathPoolBuilder::default();
        let mut names = NamePoolBuilder::default();
        let mut w = ByteWriter::new();
        write_type(&mut w, &ty, &mut names, &mut paths, &mut strings);
        let type_bytes = w.into_bytes();

        let mut sw = ByteWriter::new();
        strings.write(&mut sw);
        let mut pw = ByteWriter::new();
        paths.write(&mut pw);
        let mut nw = ByteWriter::new();
        names.write(&mut nw);

        let string_bytes = sw.into_bytes();
        let mut sr = ByteReader::new(&string_bytes);
        let string_pool = StringPool::read(&mut sr, strings.len()).unwrap();
        let path_bytes = pw.into_bytes();
        let mut pr = ByteReader::new(&path_bytes);
        let path_pool = PathPool::read(&mut pr, paths.len(), &string_pool).unwrap();
        let name_bytes = nw.into_bytes();
        let mut nr = ByteReader::new(&name_bytes);
        let name_pool = NamePool::read(&mut nr, names.len(), &path_pool, &string_pool).unwrap();

        let mut tr = ByteReader::new(&type_bytes);
        assert_eq!(read_type(&mut tr, &name_pool).unwrap(), ty);
    }
}
