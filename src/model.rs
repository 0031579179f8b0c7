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

//! Top-level data model: the `Database` aggregate, the object graph, and
//! the version/feature-gate enums that condition the rest of the codec.

use std::collections::BTreeMap;

use strum::{Display, FromRepr};

use crate::task::{InterruptedTask, QueuedTask, SuspendedTask};
use crate::value::Value;
use crate::waif::Waif;

/// Versions corresponding to the classic LambdaMOO `Format Version` line,
/// before ToastStunt's extensions begin at 5.
#[repr(u16)]
#[derive(Debug, Eq, PartialEq, Display, Ord, PartialOrd, Copy, Clone, FromRepr)]
pub enum LambdaMooDbVersion {
    DbvPrehistory = 0,
    DbvExceptions = 1,
    DbvBreakCont = 2,
    DbvFloat = 3,
    DbvBfbugFixed = 4,
}

/// Versions corresponding to ToastStunt's `version.h`. Only 17 is a legal
/// top-level version line, but the intermediate values still name the
/// feature gates checked while decoding a v17 file.
#[repr(u16)]
#[derive(Debug, Eq, PartialEq, Display, Ord, PartialOrd, Copy, Clone, FromRepr)]
pub enum ToastStuntDbVersion {
    ToastDbvNextGen = 5,
    ToastDbvTaskLocal = 6,
    ToastDbvMap = 7,
    ToastDbvFileIo = 8,
    ToastDbvExec = 9,
    ToastDbvInterrupt = 10,
    ToastDbvThis = 11,
    ToastDbvIter = 12,
    ToastDbvAnon = 13,
    ToastDbvWaif = 14,
    ToastDbvLastMove = 15,
    ToastDbvThreaded = 16,
    ToastDbvBool = 17,
}

pub const DBV_THIS: u16 = ToastStuntDbVersion::ToastDbvThis as u16;
pub const DBV_ITER: u16 = ToastStuntDbVersion::ToastDbvIter as u16;
pub const DBV_ANON: u16 = ToastStuntDbVersion::ToastDbvAnon as u16;
pub const DBV_WAIF: u16 = ToastStuntDbVersion::ToastDbvWaif as u16;
pub const DBV_LAST_MOVE: u16 = ToastStuntDbVersion::ToastDbvLastMove as u16;
pub const DBV_THREADED: u16 = ToastStuntDbVersion::ToastDbvThreaded as u16;
pub const DBV_BOOL: u16 = ToastStuntDbVersion::ToastDbvBool as u16;
pub const DBV_TASK_LOCAL: u16 = ToastStuntDbVersion::ToastDbvTaskLocal as u16;
pub const DBV_INTERRUPT: u16 = ToastStuntDbVersion::ToastDbvInterrupt as u16;
pub const DBV_NEXT_GEN: u16 = ToastStuntDbVersion::ToastDbvNextGen as u16;

/// A parsed `Format Version` line, distinguishing the legacy LambdaMOO
/// scale from ToastStunt's. Only `LambdaMoo(DbvBfbugFixed)` (version 4)
/// and `ToastStunt(ToastDbvBool)` (version 17) are ever produced by
/// [`crate::reader::TextdumpReader`]; the intermediate discriminants exist
/// purely so feature checks read as named comparisons.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum TextdumpVersion {
    LambdaMoo(LambdaMooDbVersion),
    ToastStunt(ToastStuntDbVersion),
}

impl TextdumpVersion {
    /// `true` when this version carries at least the named ToastStunt
    /// feature gate (e.g. [`DBV_WAIF`]). Always `false` for a legacy
    /// LambdaMOO version, since those predate every ToastStunt gate.
    pub fn at_least(&self, feature: u16) -> bool {
        match self {
            TextdumpVersion::ToastStunt(v) => (*v as u16) >= feature,
            TextdumpVersion::LambdaMoo(_) => false,
        }
    }

    pub fn is_toaststunt(&self) -> bool {
        matches!(self, TextdumpVersion::ToastStunt(_))
    }

    pub fn to_version_string(&self) -> String {
        match self {
            TextdumpVersion::LambdaMoo(v) => {
                format!("** LambdaMOO Database, Format Version {} **", *v as u16)
            }
            TextdumpVersion::ToastStunt(v) => {
                format!("** LambdaMOO Database, Format Version {} **", *v as u16)
            }
        }
    }
}

/// A verb's defining metadata, read once during the object block. Source
/// code (if any) is filled in later from the top-level verbs section.
#[derive(Clone, Debug, PartialEq)]
pub struct Verb {
    pub name: String,
    pub owner: i64,
    pub perms: i32,
    pub preps: i32,
    pub owning_object: i64,
    pub code: Option<Vec<String>>,
}

/// One property value slot on an object: a value (or the `Clear`
/// sentinel, tracked out-of-band via `is_clear` rather than by storing
/// `Value::Clear` in `value`), its owner, and its permission bits.
#[derive(Clone, Debug, PartialEq)]
pub struct Propdef {
    pub value: Value,
    pub is_clear: bool,
    pub owner: i64,
    pub perms: i32,
}

impl Propdef {
    pub fn clear(owner: i64, perms: i32) -> Self {
        Propdef {
            value: Value::None,
            is_clear: true,
            owner,
            perms,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Object {
    pub id: i64,
    pub name: String,
    pub flags: i64,
    pub owner: i64,
    pub location: Value,
    pub last_move: Option<Value>,
    pub parents: Vec<i64>,
    pub children: Vec<i64>,
    pub contents: Vec<i64>,
    pub propnames: Vec<String>,
    pub propdefs: Vec<Propdef>,
    pub verbs: Vec<Verb>,
    pub anon: bool,
    pub recycled: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Connection {
    pub who: i64,
    pub listener: i64,
}

/// The full in-memory representation of a textdump. Produced by
/// [`crate::load`], consumed read-only by [`crate::dump`].
#[derive(Debug, PartialEq)]
pub struct Database {
    pub version_string: String,
    pub version: TextdumpVersion,
    pub total_objects: i64,
    pub total_verbs: i64,
    pub total_players: i64,
    pub players: Vec<i64>,
    pub clocks: Vec<String>,
    pub finalizations: Vec<Value>,
    pub objects: BTreeMap<i64, Object>,
    pub anon_objects: Vec<i64>,
    pub queued_tasks: Vec<QueuedTask>,
    pub suspended_tasks: Vec<SuspendedTask>,
    pub interrupted_tasks: Vec<InterruptedTask>,
    pub connections: Vec<Connection>,
    pub waifs: BTreeMap<i64, Waif>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_gates_compare_by_version() {
        let v17 = TextdumpVersion::ToastStunt(ToastStuntDbVersion::ToastDbvBool);
        assert!(v17.at_least(DBV_WAIF));
        assert!(v17.at_least(DBV_ANON));

        let v4 = TextdumpVersion::LambdaMoo(LambdaMooDbVersion::DbvBfbugFixed);
        assert!(!v4.at_least(DBV_WAIF));
    }

    #[test]
    fn version_string_round_trips_through_repr() {
        let v = TextdumpVersion::ToastStunt(ToastStuntDbVersion::ToastDbvBool);
        assert_eq!(
            v.to_version_string(),
            "** LambdaMOO Database, Format Version 17 **"
        );
    }
}
