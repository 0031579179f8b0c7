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

//! Object block codec (§4.4), verb metadata (§4.7), and property slots
//! (§4.5, steps 1-4; name resolution itself lives in
//! [`crate::propresolve`]).

use std::io::{BufRead, Write};

use crate::error::TextdumpError;
use crate::model::{Object, Propdef, TextdumpVersion, Verb, DBV_LAST_MOVE};
use crate::reader::TextdumpReader;
use crate::value::{Value, ValueTag};
use crate::writer::TextdumpWriter;

impl<R: BufRead> TextdumpReader<R> {
    fn value_to_objnum_list(&self, value: Value) -> Result<Vec<i64>, TextdumpError> {
        match value {
            Value::List(items) => items
                .into_iter()
                .map(|v| match v {
                    Value::ObjNum(o) => Ok(o),
                    other => Err(self.err_structural(format!("expected ObjNum in list, got {other:?}"))),
                })
                .collect(),
            other => Err(self.err_structural(format!("expected a list of ObjNum, got {other:?}"))),
        }
    }

    fn read_parents(&mut self) -> Result<Vec<i64>, TextdumpError> {
        match self.read_value()? {
            Value::ObjNum(o) => Ok(vec![o]),
            Value::List(items) => items
                .into_iter()
                .map(|v| match v {
                    Value::ObjNum(o) => Ok(o),
                    other => Err(self.err_structural(format!("expected ObjNum in parents list, got {other:?}"))),
                })
                .collect(),
            other => Err(self.err_structural(format!("expected ObjNum or list for parents, got {other:?}"))),
        }
    }

    fn read_verbdef(&mut self, owning_object: i64) -> Result<Verb, TextdumpError> {
        let name = self.read_string()?;
        let owner = self.read_int()?;
        let perms = self.read_int()? as i32;
        let preps = self.read_int()? as i32;
        Ok(Verb {
            name,
            owner,
            perms,
            preps,
            owning_object,
            code: None,
        })
    }

    fn read_propdef(&mut self) -> Result<Propdef, TextdumpError> {
        let tag = self.read_int()?;
        let (value, is_clear) = if tag == ValueTag::Clear as i64 {
            (Value::None, true)
        } else {
            (self.read_value_tagged(tag)?, false)
        };
        let owner = self.read_int()?;
        let perms = self.read_int()? as i32;
        Ok(Propdef {
            value,
            is_clear,
            owner,
            perms,
        })
    }

    /// Read one object block, or `None` if the header line marks it
    /// recycled (in which case nothing else for this object is present).
    pub(crate) fn read_object(&mut self) -> Result<Option<Object>, TextdumpError> {
        let header = self.read_raw_line()?;
        let header_body = header
            .strip_prefix('#')
            .ok_or_else(|| self.err_structural(format!("object spec missing '#': {header:?}")))?;
        let (id_str, recycled) = match header_body.split_once(' ') {
            Some((id_str, rest)) if rest.trim() == "recycled" => (id_str, true),
            _ => (header_body, false),
        };
        let id = id_str
            .trim()
            .parse::<i64>()
            .map_err(|e| self.err_structural(format!("invalid object id {id_str:?}: {e}")))?;
        if recycled {
            return Ok(None);
        }

        let name = self.read_string()?;
        let version = self.version;
        if !version.is_toaststunt() {
            // Legacy "object handles" string: present in the file, never
            // meaningful to this codec.
            let _blank = self.read_raw_line()?;
        }

        let flags = self.read_int()?;
        let owner = self.read_int()?;

        let (location, last_move, contents, parents, children) = if version.is_toaststunt() {
            let location = self.read_value()?;
            let last_move = if version.at_least(DBV_LAST_MOVE) {
                Some(self.read_value()?)
            } else {
                None
            };
            let contents_value = self.read_value()?;
            let contents = self.value_to_objnum_list(contents_value)?;
            let parents = self.read_parents()?;
            let children_value = self.read_value()?;
            let children = self.value_to_objnum_list(children_value)?;
            (location, last_move, contents, parents, children)
        } else {
            let location = Value::ObjNum(self.read_int()?);
            let _first_content = self.read_int()?;
            let _neighbor = self.read_int()?;
            let parent = self.read_int()?;
            let _first_child = self.read_int()?;
            let _sibling = self.read_int()?;
            (location, None, Vec::new(), vec![parent], Vec::new())
        };

        let verb_count = self.read_int()?;
        let mut verbs = Vec::with_capacity(verb_count.max(0) as usize);
        for _ in 0..verb_count {
            verbs.push(self.read_verbdef(id)?);
        }

        let num_propnames = self.read_int()?;
        let mut propnames = Vec::with_capacity(num_propnames.max(0) as usize);
        for _ in 0..num_propnames {
            propnames.push(self.read_string()?);
        }

        let num_propdefs = self.read_int()?;
        let mut propdefs = Vec::with_capacity(num_propdefs.max(0) as usize);
        for _ in 0..num_propdefs {
            propdefs.push(self.read_propdef()?);
        }

        Ok(Some(Object {
            id,
            name,
            flags,
            owner,
            location,
            last_move,
            parents,
            children,
            contents,
            propnames,
            propdefs,
            verbs,
            anon: false,
            recycled: false,
        }))
    }
}

impl<W: Write> TextdumpWriter<'_, W> {
    fn write_verbdef(&mut self, verb: &Verb) -> Result<(), TextdumpError> {
        self.write_string(&verb.name)?;
        self.write_int(verb.owner)?;
        self.write_int(verb.perms as i64)?;
        self.write_int(verb.preps as i64)
    }

    fn write_propdef(&mut self, propdef: &Propdef) -> Result<(), TextdumpError> {
        if propdef.is_clear {
            self.write_int(ValueTag::Clear as i64)?;
        } else {
            self.write_value(&propdef.value)?;
        }
        self.write_int(propdef.owner)?;
        self.write_int(propdef.perms as i64)
    }

    fn write_objnum_list(&mut self, ids: &[i64]) -> Result<(), TextdumpError> {
        self.write_value(&Value::List(ids.iter().map(|o| Value::ObjNum(*o)).collect()))
    }

    fn write_parents(&mut self, parents: &[i64]) -> Result<(), TextdumpError> {
        match parents {
            [single] => self.write_value(&Value::ObjNum(*single)),
            many => self.write_objnum_list(many),
        }
    }

    pub(crate) fn write_object(&mut self, obj: &Object, version: TextdumpVersion) -> Result<(), TextdumpError> {
        self.write_line(&format!("#{}", obj.id))?;
        self.write_string(&obj.name)?;
        if !version.is_toaststunt() {
            self.write_line("")?;
        }
        self.write_int(obj.flags)?;
        self.write_int(obj.owner)?;

        if version.is_toaststunt() {
            self.write_value(&obj.location)?;
            if version.at_least(DBV_LAST_MOVE) {
                let last_move = obj
                    .last_move
                    .as_ref()
                    .ok_or_else(|| self.err_unsupported("object missing last_move at a version requiring it"))?;
                self.write_value(last_move)?;
            }
            self.write_objnum_list(&obj.contents)?;
            self.write_parents(&obj.parents)?;
            self.write_objnum_list(&obj.children)?;
        } else {
            let location = match obj.location {
                Value::ObjNum(o) => o,
                _ => return Err(self.err_unsupported("v4 object location must be an ObjNum")),
            };
            self.write_int(location)?;
            self.write_int(-1)?; // first-content, not reconstructed
            self.write_int(-1)?; // neighbor, not reconstructed
            let parent = obj.parents.first().copied().unwrap_or(-1);
            self.write_int(parent)?;
            self.write_int(-1)?; // first-child, not reconstructed
            self.write_int(-1)?; // sibling, not reconstructed
        }

        self.write_int(obj.verbs.len() as i64)?;
        for verb in &obj.verbs {
            self.write_verbdef(verb)?;
        }

        self.write_int(obj.propnames.len() as i64)?;
        for name in &obj.propnames {
            self.write_string(name)?;
        }

        self.write_int(obj.propdefs.len() as i64)?;
        for propdef in &obj.propdefs {
            self.write_propdef(propdef)?;
        }
        Ok(())
    }
}
