// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! The recursive tagged-value union and its wire encoding.

use std::io::{BufRead, Write};

use strum::FromRepr;

use crate::error::TextdumpError;
use crate::reader::TextdumpReader;
use crate::writer::TextdumpWriter;

/// An index into `Database::waifs`. Every occurrence of a waif in the
/// value stream carries one of these; only the first occurrence of a
/// given index also carries the waif's body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WaifRef(pub i64);

/// Tag byte preceding every encoded value. 11 ("label") is a mooR-only
/// extension and has no entry here — this codec's tag table stops at the
/// set `spec.md` §4.3 names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(i64)]
pub enum ValueTag {
    Int = 0,
    Obj = 1,
    Str = 2,
    Err = 3,
    List = 4,
    Clear = 5,
    None = 6,
    Catch = 7,
    Finally = 8,
    Float = 9,
    Map = 10,
    Anon = 12,
    Waif = 13,
    Bool = 14,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    ObjNum(i64),
    Err(i32),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Bool(bool),
    None,
    Clear,
    Catch(i32),
    Finally(i32),
    Anon(i64),
    Waif(WaifRef),
}

impl<R: BufRead> TextdumpReader<R> {
    /// Read a tag line followed by its value body.
    pub fn read_value(&mut self) -> Result<Value, TextdumpError> {
        let tag = self.read_int()?;
        self.read_value_tagged(tag)
    }

    /// Read a value whose tag has already been consumed (e.g. it was
    /// embedded in a header line, as with a suspended task's optional
    /// delivered value).
    pub fn read_value_tagged(&mut self, tag: i64) -> Result<Value, TextdumpError> {
        let Some(vtype) = ValueTag::from_repr(tag) else {
            return Err(self.err_unknown_tag(tag));
        };
        let value = match vtype {
            ValueTag::Int => Value::Int(self.read_int()?),
            ValueTag::Obj => Value::ObjNum(self.read_int()?),
            ValueTag::Str => Value::Str(self.read_string()?),
            ValueTag::Err => Value::Err(self.read_int()? as i32),
            ValueTag::List => {
                let count = self.read_int()?;
                let mut items = Vec::with_capacity(count.max(0) as usize);
                for _ in 0..count {
                    items.push(self.read_value()?);
                }
                Value::List(items)
            }
            ValueTag::Clear => Value::Clear,
            ValueTag::None => Value::None,
            ValueTag::Catch => Value::Catch(self.read_int()? as i32),
            ValueTag::Finally => Value::Finally(self.read_int()? as i32),
            ValueTag::Float => Value::Float(self.read_float()?),
            ValueTag::Map => {
                let count = self.read_int()?;
                let mut pairs = Vec::with_capacity(count.max(0) as usize);
                for _ in 0..count {
                    let key = self.read_value()?;
                    let val = self.read_value()?;
                    pairs.push((key, val));
                }
                Value::Map(pairs)
            }
            ValueTag::Anon => {
                let oid = self.read_int()?;
                if oid == -1 {
                    return Err(self.err_unsupported("anonymous oid -1 (destroyed anon)"));
                }
                Value::Anon(oid)
            }
            ValueTag::Waif => Value::Waif(self.read_waif()?),
            ValueTag::Bool => Value::Bool(self.read_int()? != 0),
        };
        Ok(value)
    }
}

/// The tag that `write_value` would emit for this value. Exposed so
/// callers that embed a tag in a header line (a suspended task's optional
/// delivered value) can write it themselves, then write only the body via
/// [`TextdumpWriter::write_value_body`].
pub fn value_tag(value: &Value) -> ValueTag {
    match value {
        Value::Int(_) => ValueTag::Int,
        Value::ObjNum(_) => ValueTag::Obj,
        Value::Str(_) => ValueTag::Str,
        Value::Err(_) => ValueTag::Err,
        Value::List(_) => ValueTag::List,
        Value::Clear => ValueTag::Clear,
        Value::None => ValueTag::None,
        Value::Catch(_) => ValueTag::Catch,
        Value::Finally(_) => ValueTag::Finally,
        Value::Float(_) => ValueTag::Float,
        Value::Map(_) => ValueTag::Map,
        Value::Bool(_) => ValueTag::Bool,
        Value::Anon(_) => ValueTag::Anon,
        Value::Waif(_) => ValueTag::Waif,
    }
}

impl<W: Write> TextdumpWriter<'_, W> {
    pub fn write_value(&mut self, value: &Value) -> Result<(), TextdumpError> {
        self.write_int(value_tag(value) as i64)?;
        self.write_value_body(value)
    }

    /// Write a value's body only, assuming its tag has already been
    /// written (or embedded in a header line) by the caller.
    pub fn write_value_body(&mut self, value: &Value) -> Result<(), TextdumpError> {
        match value {
            Value::Int(i) => self.write_int(*i)?,
            Value::ObjNum(o) => self.write_int(*o)?,
            Value::Str(s) => self.write_string(s)?,
            Value::Err(e) => self.write_int(*e as i64)?,
            Value::List(items) => {
                self.write_int(items.len() as i64)?;
                for item in items {
                    self.write_value(item)?;
                }
            }
            Value::Clear => {}
            Value::None => {}
            Value::Catch(i) => self.write_int(*i as i64)?,
            Value::Finally(i) => self.write_int(*i as i64)?,
            Value::Float(f) => self.write_float(*f)?,
            Value::Map(pairs) => {
                self.write_int(pairs.len() as i64)?;
                for (k, v) in pairs {
                    self.write_value(k)?;
                    self.write_value(v)?;
                }
            }
            Value::Bool(b) => self.write_int(if *b { 1 } else { 0 })?,
            Value::Anon(oid) => self.write_int(*oid)?,
            Value::Waif(r) => self.write_waif(*r)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::Cursor;

    fn round_trip(v: &Value) -> Value {
        let waifs = BTreeMap::new();
        let mut buf = Vec::new();
        {
            let mut w = TextdumpWriter::new(&mut buf, &waifs);
            w.write_value(v).unwrap();
        }
        let mut r = TextdumpReader::from_line_reader(
            crate::lineio::LineReader::new(Cursor::new(buf), "test"),
            crate::model::TextdumpVersion::ToastStunt(
                crate::model::ToastStuntDbVersion::ToastDbvBool,
            ),
            String::new(),
        );
        r.read_value().unwrap()
    }

    #[test]
    fn scalar_values_round_trip() {
        assert_eq!(round_trip(&Value::Int(42)), Value::Int(42));
        assert_eq!(round_trip(&Value::Int(-7)), Value::Int(-7));
        assert_eq!(round_trip(&Value::Bool(true)), Value::Bool(true));
        assert_eq!(round_trip(&Value::None), Value::None);
        assert_eq!(round_trip(&Value::Clear), Value::Clear);
        assert_eq!(round_trip(&Value::ObjNum(-1)), Value::ObjNum(-1));
    }

    #[test]
    fn float_round_trips_losslessly() {
        let v = Value::Float(std::f64::consts::PI);
        assert_eq!(round_trip(&v), v);
    }

    #[test]
    fn nested_list_and_map_round_trip() {
        let v = Value::List(vec![
            Value::Int(1),
            Value::Str("héllo".to_string()),
            Value::Map(vec![(Value::Str("k".to_string()), Value::Bool(true))]),
            Value::Clear,
            Value::None,
        ]);
        assert_eq!(round_trip(&v), v);
    }

    #[test]
    fn empty_map_encodes_as_tag_then_zero() {
        let waifs = BTreeMap::new();
        let mut buf = Vec::new();
        let mut w = TextdumpWriter::new(&mut buf, &waifs);
        w.write_value(&Value::Map(vec![])).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "10\n0\n");
    }

    #[test]
    fn clear_compares_unequal_to_none_and_int() {
        assert_ne!(Value::Clear, Value::None);
        assert_ne!(Value::Clear, Value::Int(0));
    }

    #[test]
    fn negative_one_anon_oid_is_rejected() {
        let mut r = TextdumpReader::from_line_reader(
            crate::lineio::LineReader::new(Cursor::new(b"12\n-1\n".to_vec()), "test"),
            crate::model::TextdumpVersion::ToastStunt(
                crate::model::ToastStuntDbVersion::ToastDbvBool,
            ),
            String::new(),
        );
        let err = r.read_value().unwrap_err();
        assert!(matches!(err, TextdumpError::UnsupportedFeature { .. }));
    }
}
