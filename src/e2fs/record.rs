//! Declarative record layouts and lazy field decoding.
//!
//! Each on-disk structure declares a static [`Layout`]: an ordered field list
//! with formats and docs, plus symbol tables for enum-valued and bitflag
//! fields. A [`Rec`] is a thin `(image, offset)` view; fields decode on
//! first access (little-endian throughout) and are memoized per record
//! instance until [`Rec::invalidate`] drops the cache after an in-place edit.

use crate::image::Image;
use crate::Result;
use byteorder::{ByteOrder, LittleEndian};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

/// Wire format of a single field. Integers are little-endian.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    U8,
    U16,
    U32,
    U64,
    /// Fixed-size byte array (labels, UUIDs, padding).
    Bytes(usize),
    /// Fixed-length array of `u8` values.
    U8s(usize),
    /// Fixed-length array of little-endian `u32` values.
    U32s(usize),
}

impl Format {
    pub fn size(self) -> usize {
        match self {
            Format::U8 => 1,
            Format::U16 => 2,
            Format::U32 => 4,
            Format::U64 => 8,
            Format::Bytes(n) | Format::U8s(n) => n,
            Format::U32s(n) => 4 * n,
        }
    }
}

pub struct Field {
    pub name: &'static str,
    pub format: Format,
    pub doc: &'static str,
}

/// `(value, symbol)` pairs for an enum field, or `(bit, symbol)` pairs for a
/// flag field.
pub type Symbols = &'static [(u64, &'static str)];

/// Static schema of one record type.
pub struct Layout {
    pub name: &'static str,
    pub size: usize,
    pub fields: &'static [Field],
    pub enums: &'static [(&'static str, Symbols)],
    pub flags: &'static [(&'static str, Symbols)],
}

impl Layout {
    /// Field sizes must tile the declared record size exactly.
    pub fn size_consistent(&self) -> bool {
        self.fields.iter().map(|f| f.format.size()).sum::<usize>() == self.size
    }

    /// Looks a field up by name, returning its offset within the record.
    pub fn field(&self, name: &str) -> Option<(usize, &'static Field)> {
        let mut offset = 0;
        for f in self.fields {
            if f.name == name {
                return Some((offset, f));
            }
            offset += f.format.size();
        }
        None
    }

    fn enum_symbols(&self, name: &str) -> Option<Symbols> {
        self.enums.iter().find(|(n, _)| *n == name).map(|(_, s)| *s)
    }

    fn flag_symbols(&self, name: &str) -> Option<Symbols> {
        self.flags.iter().find(|(n, _)| *n == name).map(|(_, s)| *s)
    }
}

/// A decoded field value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Int(u64),
    List(Vec<u64>),
    Raw(Vec<u8>),
}

impl Value {
    /// The scalar value. Panics on non-scalar fields: call sites name fields
    /// statically, so a mismatch is a layout bug.
    pub fn int(&self) -> u64 {
        match self {
            Value::Int(v) => *v,
            other => panic!("not a scalar field: {other:?}"),
        }
    }

    fn ints(&self) -> &[u64] {
        match self {
            Value::Int(v) => std::slice::from_ref(v),
            Value::List(vs) => vs,
            Value::Raw(_) => &[],
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::List(vs) => {
                write!(f, "[")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Raw(data) => write!(f, "b\"{}\"", data.escape_ascii()),
        }
    }
}

fn decode(format: Format, data: &[u8]) -> Value {
    match format {
        Format::U8 => Value::Int(data[0] as u64),
        Format::U16 => Value::Int(LittleEndian::read_u16(data) as u64),
        Format::U32 => Value::Int(LittleEndian::read_u32(data) as u64),
        Format::U64 => Value::Int(LittleEndian::read_u64(data)),
        Format::Bytes(_) => Value::Raw(data.to_vec()),
        Format::U8s(_) => Value::List(data.iter().map(|b| *b as u64).collect()),
        Format::U32s(_) => Value::List(
            data.chunks_exact(4)
                .map(|c| LittleEndian::read_u32(c) as u64)
                .collect(),
        ),
    }
}

/// A record instance: `(image, absolute offset, layout)` plus the per-field
/// cache and the accumulated validation findings.
pub struct Rec<'fs> {
    img: &'fs Image,
    offset: u64,
    layout: &'static Layout,
    cache: RefCell<HashMap<&'static str, Value>>,
    errors: RefCell<Vec<String>>,
}

impl<'fs> Rec<'fs> {
    pub fn new(img: &'fs Image, offset: u64, layout: &'static Layout) -> Self {
        debug_assert!(layout.size_consistent(), "bad layout for {}", layout.name);
        Self {
            img,
            offset,
            layout,
            cache: RefCell::new(HashMap::new()),
            errors: RefCell::new(Vec::new()),
        }
    }

    pub fn img(&self) -> &'fs Image {
        self.img
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn layout(&self) -> &'static Layout {
        self.layout
    }

    fn field(&self, name: &str) -> (usize, &'static Field) {
        self.layout
            .field(name)
            .unwrap_or_else(|| panic!("{}: no field `{name}`", self.layout.name))
    }

    /// Absolute byte offset of `name` within the image.
    pub fn field_offset(&self, name: &str) -> u64 {
        self.offset + self.field(name).0 as u64
    }

    /// Decodes field `name`, reading it from the image on first access.
    pub fn get(&self, name: &str) -> Result<Value> {
        let (rel, fld) = self.field(name);
        if let Some(v) = self.cache.borrow().get(fld.name) {
            return Ok(v.clone());
        }
        let data = self
            .img
            .read_vec(self.offset + rel as u64, fld.format.size())?;
        let val = decode(fld.format, &data);
        self.cache.borrow_mut().insert(fld.name, val.clone());
        Ok(val)
    }

    pub fn u64f(&self, name: &str) -> Result<u64> {
        Ok(self.get(name)?.int())
    }

    pub fn u32f(&self, name: &str) -> Result<u32> {
        Ok(self.u64f(name)? as u32)
    }

    pub fn u16f(&self, name: &str) -> Result<u16> {
        Ok(self.u64f(name)? as u16)
    }

    pub fn u8f(&self, name: &str) -> Result<u8> {
        Ok(self.u64f(name)? as u8)
    }

    pub fn list(&self, name: &str) -> Result<Vec<u64>> {
        match self.get(name)? {
            Value::List(vs) => Ok(vs),
            other => panic!("not an array field: {other:?}"),
        }
    }

    pub fn bytes(&self, name: &str) -> Result<Vec<u8>> {
        match self.get(name)? {
            Value::Raw(data) => Ok(data),
            other => panic!("not a byte field: {other:?}"),
        }
    }

    /// The raw bytes of the whole record, read fresh from the image.
    pub fn raw(&self) -> Result<Vec<u8>> {
        self.img.read_vec(self.offset, self.layout.size)
    }

    /// Drops the field cache. Called after an in-place edit so that the next
    /// read is authoritative.
    pub fn invalidate(&self) {
        self.cache.borrow_mut().clear();
    }

    pub fn push_error(&self, msg: String) {
        self.errors.borrow_mut().push(msg);
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.borrow().clone()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.borrow().is_empty()
    }

    /// Checks every enum field against its symbol table and every flag field
    /// against its combined bitmask. Findings are recorded, not raised;
    /// `all = false` stops at the first finding.
    pub fn validate(&self, all: bool) -> Result<Vec<String>> {
        for (name, syms) in self.layout.enums {
            for v in self.get(name)?.ints() {
                if !syms.iter().any(|(val, _)| val == v) {
                    self.push_error(format!("Invalid value {v} for '{name}'"));
                    if !all {
                        return Ok(self.errors());
                    }
                }
            }
        }
        for (name, syms) in self.layout.flags {
            let mask = syms.iter().fold(0u64, |a, (bit, _)| a | bit);
            for v in self.get(name)?.ints() {
                if v & !mask != 0 {
                    self.push_error(format!("Invalid value {v:#x} for '{name}'"));
                    if !all {
                        return Ok(self.errors());
                    }
                }
            }
        }
        Ok(self.errors())
    }

    /// Human form of a field: the enum symbol (or `?`), the space-joined
    /// symbols of all set flag bits, or the raw value. Record wrappers
    /// override this for timestamps, sizes and the mode string.
    pub fn pretty_val(&self, name: &str) -> String {
        let val = match self.get(name) {
            Ok(v) => v,
            Err(e) => return format!("<{e}>"),
        };
        if let Some(syms) = self.layout.enum_symbols(name) {
            let sym = |v: u64| {
                syms.iter()
                    .find(|(val, _)| *val == v)
                    .map(|(_, s)| *s)
                    .unwrap_or("?")
            };
            return match &val {
                Value::Int(v) => sym(*v).to_string(),
                Value::List(vs) => vs.iter().map(|v| sym(*v)).collect::<Vec<_>>().join(" "),
                Value::Raw(_) => val.to_string(),
            };
        }
        if let Some(syms) = self.layout.flag_symbols(name) {
            let v = match &val {
                Value::Int(v) => *v,
                _ => return val.to_string(),
            };
            return syms
                .iter()
                .filter(|(bit, _)| bit & v != 0)
                .map(|(_, s)| *s)
                .collect::<Vec<_>>()
                .join(" ");
        }
        val.to_string()
    }

    /// Fields whose raw values differ from `other`'s, with both pretty forms.
    /// Used to compare superblock backups against the primary.
    pub fn diff(&self, other: &Rec<'_>) -> Result<Vec<(&'static str, String, String)>> {
        let mut out = Vec::new();
        for f in self.layout.fields {
            if self.get(f.name)? != other.get(f.name)? {
                out.push((f.name, self.pretty_val(f.name), other.pretty_val(f.name)));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    static TOY: Layout = Layout {
        name: "toy",
        size: 12,
        fields: &[
            Field {
                name: "a",
                format: Format::U16,
                doc: "",
            },
            Field {
                name: "kind",
                format: Format::U8,
                doc: "",
            },
            Field {
                name: "bits",
                format: Format::U8,
                doc: "",
            },
            Field {
                name: "b",
                format: Format::U32s(2),
                doc: "",
            },
        ],
        enums: &[("kind", &[(1, "ONE"), (2, "TWO")])],
        flags: &[("bits", &[(0x1, "X"), (0x2, "Y")])],
    };

    #[test]
    fn layout_offsets() {
        assert!(TOY.size_consistent());
        assert_eq!(TOY.field("a").unwrap().0, 0);
        assert_eq!(TOY.field("kind").unwrap().0, 2);
        assert_eq!(TOY.field("b").unwrap().0, 4);
        assert!(TOY.field("nope").is_none());
    }

    #[test]
    fn decode_formats() {
        assert_eq!(decode(Format::U16, &[0x34, 0x12]), Value::Int(0x1234));
        assert_eq!(
            decode(Format::U32s(2), &[1, 0, 0, 0, 2, 0, 0, 0]),
            Value::List(vec![1, 2])
        );
        assert_eq!(decode(Format::Bytes(2), &[0, 65]), Value::Raw(vec![0, 65]));
    }

    fn toy_rec(img: &Image) -> Rec<'_> {
        Rec::new(img, 0, &TOY)
    }

    #[test]
    fn lazy_decode_and_validate() {
        use std::io::Write;
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&[0x34, 0x12, 3, 0x5, 7, 0, 0, 0, 8, 0, 0, 0])
            .unwrap();
        let img = Image::open(tmp.path(), false).unwrap();
        let rec = toy_rec(&img);
        assert_eq!(rec.u16f("a").unwrap(), 0x1234);
        assert_eq!(rec.list("b").unwrap(), vec![7, 8]);
        // kind = 3 is not a symbol, bits = 0x5 has a stray bit
        let errs = rec.validate(true).unwrap();
        assert_eq!(errs.len(), 2);
        assert!(errs[0].contains("'kind'"));
        assert_eq!(rec.pretty_val("kind"), "?");
        assert_eq!(rec.pretty_val("bits"), "X");
    }
}
