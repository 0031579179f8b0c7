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

//! Waif decode/encode state machine (§4.9): first occurrence of an index
//! carries the body (`c`), later occurrences are bare references (`r`).

use std::io::{BufRead, Write};

use crate::error::TextdumpError;
use crate::reader::TextdumpReader;
use crate::value::{Value, WaifRef};
use crate::writer::TextdumpWriter;

/// `3 * 32`: the historical MOO waif property-index ceiling
/// (`original_source`'s reader loops `while cur < 3 * 32`).
pub const WAIF_MAX_PROPS: i64 = 96;

#[derive(Clone, Debug, PartialEq)]
pub struct Waif {
    pub class: i64,
    pub owner: i64,
    pub prop_values: Vec<Value>,
}

impl<R: BufRead> TextdumpReader<R> {
    pub fn read_waif(&mut self) -> Result<WaifRef, TextdumpError> {
        let header_line = self.read_raw_line()?;
        let (flag_str, index_str) = header_line
            .split_once(' ')
            .ok_or_else(|| self.err_header("waif_header", format!("{header_line:?}")))?;
        let flag = flag_str
            .chars()
            .next()
            .ok_or_else(|| self.err_header("waif_header", "empty flag"))?;
        let index = index_str
            .trim()
            .parse::<i64>()
            .map_err(|e| self.err_header("waif_header", e))?;

        match flag {
            'c' => {
                let class = self.read_int()?;
                let owner = self.read_int()?;
                let _propdefs_length = self.read_int()?;
                self.waifs.insert(
                    index,
                    Waif {
                        class,
                        owner,
                        prop_values: Vec::new(),
                    },
                );
                loop {
                    let prop_index = self.read_int()?;
                    if !(0..WAIF_MAX_PROPS).contains(&prop_index) {
                        break;
                    }
                    let value = self.read_value()?;
                    self.waifs.get_mut(&index).expect("just inserted").prop_values.push(value);
                }
                let _terminator = self.read_raw_line()?;
            }
            'r' => {
                let _terminator = self.read_raw_line()?;
                if !self.waifs.contains_key(&index) {
                    return Err(self.err_structural(format!("waif {index} referenced before defined")));
                }
            }
            other => {
                return Err(self.err_header("waif_header", format!("unknown flag {other:?}")));
            }
        }
        Ok(WaifRef(index))
    }
}

impl<W: Write> TextdumpWriter<'_, W> {
    pub fn write_waif(&mut self, r: WaifRef) -> Result<(), TextdumpError> {
        let first_occurrence = self.mark_waif_written(r.0);
        let flag = if first_occurrence { 'c' } else { 'r' };
        self.write_line(&format!("{flag} {}", r.0))?;
        if !first_occurrence {
            self.write_line("")?;
            return Ok(());
        }
        let waif = self
            .waifs
            .get(&r.0)
            .ok_or_else(|| self.err_unsupported(format!("waif {} has no body to write", r.0)))?
            .clone();
        self.write_int(waif.class)?;
        self.write_int(waif.owner)?;
        self.write_int(waif.prop_values.len() as i64)?;
        for (i, value) in waif.prop_values.iter().enumerate() {
            self.write_int(i as i64)?;
            self.write_value(value)?;
        }
        self.write_int(-1)?;
        self.write_line("")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TextdumpVersion, ToastStuntDbVersion};
    use std::collections::BTreeMap;
    use std::io::Cursor;

    #[test]
    fn first_occurrence_carries_body_and_indexes_it() {
        let fixture = "c 0\n1\n2\n3\n0\n10\n0\n1\n-1\nterm\n";
        let mut r = TextdumpReader::from_line_reader(
            crate::lineio::LineReader::new(Cursor::new(fixture.as_bytes().to_vec()), "t"),
            TextdumpVersion::ToastStunt(ToastStuntDbVersion::ToastDbvBool),
            String::new(),
        );
        let wref = r.read_waif().unwrap();
        assert_eq!(wref, WaifRef(0));
        let waif = r.waifs.get(&0).unwrap();
        assert_eq!(waif.class, 1);
        assert_eq!(waif.owner, 2);
        assert_eq!(waif.prop_values, vec![Value::Int(0)]);
    }

    #[test]
    fn self_referencing_waif_body_resolves_against_itself() {
        let fixture = "c 7\n1\n2\n5\n0\n13\nr 7\n\n-1\nterm\n";
        let mut r = TextdumpReader::from_line_reader(
            crate::lineio::LineReader::new(Cursor::new(fixture.as_bytes().to_vec()), "t"),
            TextdumpVersion::ToastStunt(ToastStuntDbVersion::ToastDbvBool),
            String::new(),
        );
        let wref = r.read_waif().unwrap();
        assert_eq!(wref, WaifRef(7));
        let waif = r.waifs.get(&7).unwrap();
        assert_eq!(waif.prop_values, vec![Value::Waif(WaifRef(7))]);
    }

    #[test]
    fn reference_without_prior_definition_is_structural_error() {
        let fixture = "r 5\nterm\n";
        let mut r = TextdumpReader::from_line_reader(
            crate::lineio::LineReader::new(Cursor::new(fixture.as_bytes().to_vec()), "t"),
            TextdumpVersion::ToastStunt(ToastStuntDbVersion::ToastDbvBool),
            String::new(),
        );
        let err = r.read_waif().unwrap_err();
        assert!(matches!(err, TextdumpError::StructuralMismatch { .. }));
    }

    #[test]
    fn write_then_read_round_trips_body_once() {
        let mut waifs = BTreeMap::new();
        waifs.insert(
            3,
            Waif {
                class: 7,
                owner: 2,
                prop_values: vec![Value::Int(1), Value::Str("x".into())],
            },
        );
        let mut buf = Vec::new();
        {
            let mut w = TextdumpWriter::new(&mut buf, &waifs);
            w.write_waif(WaifRef(3)).unwrap();
            w.write_waif(WaifRef(3)).unwrap();
        }
        let mut r = TextdumpReader::from_line_reader(
            crate::lineio::LineReader::new(Cursor::new(buf), "t"),
            TextdumpVersion::ToastStunt(ToastStuntDbVersion::ToastDbvBool),
            String::new(),
        );
        assert_eq!(r.read_waif().unwrap(), WaifRef(3));
        assert_eq!(r.read_waif().unwrap(), WaifRef(3));
        assert_eq!(r.waifs.get(&3).unwrap().prop_values.len(), 2);
    }
}
