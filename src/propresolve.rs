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

//! Property-name resolution (§4.5): pairs an object's positionally-stored
//! `propdefs` with the symbolic names carried separately in `propnames`,
//! by walking the primary parent chain root-first. Also implements the
//! `Clear`-aware post-load mutators.

use std::collections::BTreeMap;

use crate::error::TextdumpError;
use crate::model::{Database, Object};
use crate::value::Value;

/// Names for every slot in `objects[obj_id].propdefs`, in the same order.
///
/// Walks from `obj_id` up through primary parents (`parents[0]`) to the
/// root, concatenating each ancestor's own `propnames` in root-first
/// order, then appending `obj_id`'s own. If an ancestor along that walk
/// itself has more than one parent, its own further ancestry is
/// indeterminate in this format (multi-inheritance ordering is a known
/// gap — see `DESIGN.md`); the walk stops there and the unresolved
/// leading slots are given synthetic ordinal names (`"#<n>"`) rather than
/// guessed at.
pub fn resolve_names(objects: &BTreeMap<i64, Object>, obj_id: i64) -> Vec<String> {
    let Some(leaf) = objects.get(&obj_id) else {
        return Vec::new();
    };
    let propdef_count = leaf.propdefs.len();

    let mut chain_leaf_to_root = vec![obj_id];
    let mut visited = std::collections::HashSet::new();
    visited.insert(obj_id);
    let mut current = obj_id;
    loop {
        let Some(obj) = objects.get(&current) else {
            break;
        };
        if obj.parents.len() > 1 {
            break;
        }
        let Some(&parent) = obj.parents.first() else {
            break;
        };
        if parent < 0 || !visited.insert(parent) {
            break;
        }
        chain_leaf_to_root.push(parent);
        current = parent;
    }

    let mut names = Vec::new();
    for id in chain_leaf_to_root.iter().rev() {
        if let Some(obj) = objects.get(id) {
            names.extend(obj.propnames.iter().cloned());
        }
    }

    if names.len() < propdef_count {
        let missing = propdef_count - names.len();
        let mut synthetic: Vec<String> = (0..missing).map(|i| format!("#{i}")).collect();
        synthetic.extend(names);
        names = synthetic;
    }
    names.truncate(propdef_count);
    names
}

fn property_error(message: impl std::fmt::Display) -> TextdumpError {
    TextdumpError::structural("<property>".to_string(), 0, message)
}

/// Look up `name` on `obj_id`, walking up through `Clear` slots to the
/// nearest ancestor with a concrete value. Returns `Value::Clear` if the
/// chain is exhausted without finding one, matching the "Clear if none
/// exists" case in the testable property for this operation.
pub fn get_property(db: &Database, obj_id: i64, name: &str) -> Option<Value> {
    let mut current = obj_id;
    loop {
        let obj = db.objects.get(&current)?;
        let names = resolve_names(&db.objects, current);
        let idx = names.iter().position(|n| n == name)?;
        let propdef = &obj.propdefs[idx];
        if !propdef.is_clear {
            return Some(propdef.value.clone());
        }
        match obj.parents.first() {
            Some(&parent) if parent >= 0 => current = parent,
            _ => return Some(Value::Clear),
        }
    }
}

/// Set `name` on `obj_id`. A `Clear` value restores inheritance on that
/// slot; any other value is stored and also eagerly pushed into every
/// descendant whose same-named slot currently holds `Clear` (those slots
/// stay marked `Clear` — only their cached value changes — so the lazy
/// walk in `get_property` and this eager push agree).
pub fn set_property(db: &mut Database, obj_id: i64, name: &str, value: Value) -> Result<(), TextdumpError> {
    let names = resolve_names(&db.objects, obj_id);
    let idx = names
        .iter()
        .position(|n| n == name)
        .ok_or_else(|| property_error(format!("object #{obj_id} has no property named {name:?}")))?;

    let is_clear = matches!(value, Value::Clear);
    {
        let obj = db
            .objects
            .get_mut(&obj_id)
            .ok_or_else(|| property_error(format!("object #{obj_id} does not exist")))?;
        let propdef = obj
            .propdefs
            .get_mut(idx)
            .ok_or_else(|| property_error(format!("object #{obj_id} has no propdef at index {idx}")))?;
        if is_clear {
            propdef.is_clear = true;
            propdef.value = Value::None;
        } else {
            propdef.is_clear = false;
            propdef.value = value.clone();
        }
    }

    if !is_clear {
        cascade_value(db, obj_id, idx, &value);
    }
    Ok(())
}

fn cascade_value(db: &mut Database, parent_id: i64, idx: usize, value: &Value) {
    let children: Vec<i64> = db
        .objects
        .values()
        .filter(|o| o.parents.contains(&parent_id))
        .map(|o| o.id)
        .collect();
    for child_id in children {
        let still_clear = {
            let Some(child) = db.objects.get_mut(&child_id) else {
                continue;
            };
            let Some(propdef) = child.propdefs.get_mut(idx) else {
                continue;
            };
            if !propdef.is_clear {
                false
            } else {
                propdef.value = value.clone();
                true
            }
        };
        if still_clear {
            cascade_value(db, child_id, idx, value);
        }
    }
}

/// Rename `old_name` to `new_name` on the object that owns it. Since
/// every descendant's names are resolved live from its ancestors'
/// `propnames` (never cached per-descendant), renaming the defining
/// object's own entry is the entire cascade — no descendant needs to be
/// touched, and propdef positions are untouched.
pub fn rename_property(db: &mut Database, obj_id: i64, old_name: &str, new_name: &str) -> Result<(), TextdumpError> {
    let obj = db
        .objects
        .get_mut(&obj_id)
        .ok_or_else(|| property_error(format!("object #{obj_id} does not exist")))?;
    let local_idx = obj
        .propnames
        .iter()
        .position(|n| n == old_name)
        .ok_or_else(|| property_error(format!("object #{obj_id} does not itself define {old_name:?}")))?;
    obj.propnames[local_idx] = new_name.to_string();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LambdaMooDbVersion, Propdef, TextdumpVersion};

    fn make_db() -> Database {
        let a = Object {
            id: 1,
            name: "A".to_string(),
            flags: 0,
            owner: 0,
            location: Value::ObjNum(-1),
            last_move: None,
            parents: vec![-1],
            children: vec![2],
            contents: vec![],
            propnames: vec!["x".to_string()],
            propdefs: vec![Propdef {
                value: Value::Int(1),
                is_clear: false,
                owner: 0,
                perms: 0,
            }],
            verbs: vec![],
            anon: false,
            recycled: false,
        };
        let b = Object {
            id: 2,
            name: "B".to_string(),
            flags: 0,
            owner: 0,
            location: Value::ObjNum(-1),
            last_move: None,
            parents: vec![1],
            children: vec![],
            contents: vec![],
            propnames: vec![],
            propdefs: vec![Propdef::clear(0, 0)],
            verbs: vec![],
            anon: false,
            recycled: false,
        };
        let mut objects = BTreeMap::new();
        objects.insert(1, a);
        objects.insert(2, b);
        Database {
            version_string: String::new(),
            version: TextdumpVersion::LambdaMoo(LambdaMooDbVersion::DbvBfbugFixed),
            total_objects: 2,
            total_verbs: 0,
            total_players: 0,
            players: vec![],
            clocks: vec![],
            finalizations: vec![],
            objects,
            anon_objects: vec![],
            queued_tasks: vec![],
            suspended_tasks: vec![],
            interrupted_tasks: vec![],
            connections: vec![],
            waifs: BTreeMap::new(),
        }
    }

    #[test]
    fn resolve_names_concatenates_root_first() {
        let db = make_db();
        assert_eq!(resolve_names(&db.objects, 1), vec!["x".to_string()]);
        assert_eq!(resolve_names(&db.objects, 2), vec!["x".to_string()]);
    }

    #[test]
    fn clear_inherits_from_nearest_concrete_ancestor() {
        let db = make_db();
        assert_eq!(get_property(&db, 2, "x"), Some(Value::Int(1)));
    }

    #[test]
    fn set_property_cascades_into_clear_descendants() {
        let mut db = make_db();
        set_property(&mut db, 1, "x", Value::Int(2)).unwrap();
        assert_eq!(get_property(&db, 2, "x"), Some(Value::Int(2)));
    }

    #[test]
    fn clear_with_no_ancestor_value_returns_clear() {
        let mut db = make_db();
        set_property(&mut db, 1, "x", Value::Clear).unwrap();
        assert_eq!(get_property(&db, 1, "x"), Some(Value::Clear));
        assert_eq!(get_property(&db, 2, "x"), Some(Value::Clear));
    }

    #[test]
    fn rename_cascades_to_descendants_automatically() {
        let mut db = make_db();
        rename_property(&mut db, 1, "x", "y").unwrap();
        assert_eq!(resolve_names(&db.objects, 2), vec!["y".to_string()]);
    }

    #[test]
    fn multi_parent_boundary_falls_back_to_ordinal_names() {
        let mut db = make_db();
        db.objects.get_mut(&2).unwrap().parents = vec![1, 99];
        db.objects.get_mut(&2).unwrap().propdefs.push(Propdef::clear(0, 0));
        let names = resolve_names(&db.objects, 2);
        assert_eq!(names, vec!["#0".to_string(), "#1".to_string()]);
    }
}
