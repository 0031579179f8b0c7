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

//! End-to-end load/dump tests against hand-built `Database` values and
//! hand-written fixture text, covering both format versions, property
//! inheritance, and the documented boundary behaviors.

use std::collections::BTreeMap;
use std::io::Cursor;

use moo_textdump::{
    dump, get_property, load, load_reader, rename_property, set_property, Activation,
    ActivationHeader, Connection, Database, InterruptedTask, LambdaMooDbVersion, Object,
    ParseInfo, Propdef, QueuedTask, SuspendedTask, TextdumpVersion, ToastStuntDbVersion, Value,
    Verb, Vm, Waif, WaifRef,
};

fn object(id: i64, name: &str, owner: i64, parents: Vec<i64>, location: Value) -> Object {
    Object {
        id,
        name: name.to_string(),
        flags: 0,
        owner,
        location,
        last_move: None,
        parents,
        children: vec![],
        contents: vec![],
        propnames: vec![],
        propdefs: vec![],
        verbs: vec![],
        anon: false,
        recycled: false,
    }
}

fn minimal_v4_db() -> Database {
    let mut root = object(0, "root", 3, vec![-1], Value::ObjNum(-1));
    root.propnames = vec!["x".to_string()];
    root.propdefs = vec![Propdef {
        value: Value::Int(1),
        is_clear: false,
        owner: 3,
        perms: 0,
    }];

    let mut child = object(1, "child", 3, vec![0], Value::ObjNum(0));
    child.propdefs = vec![Propdef::clear(3, 0)];
    child.verbs.push(Verb {
        name: "look".to_string(),
        owner: 3,
        perms: 0,
        preps: -1,
        owning_object: 1,
        code: Some(vec!["return 1;".to_string()]),
    });

    let mut objects = BTreeMap::new();
    objects.insert(root.id, root);
    objects.insert(child.id, child);

    Database {
        version_string: "** LambdaMOO Database, Format Version 4 **".to_string(),
        version: TextdumpVersion::LambdaMoo(LambdaMooDbVersion::DbvBfbugFixed),
        total_objects: 2,
        total_verbs: 1,
        total_players: 1,
        players: vec![3],
        clocks: vec![],
        finalizations: vec![],
        objects,
        anon_objects: vec![],
        queued_tasks: vec![],
        suspended_tasks: vec![],
        interrupted_tasks: vec![],
        connections: vec![Connection { who: 3, listener: 0 }],
        waifs: BTreeMap::new(),
    }
}

#[test]
fn v4_database_round_trips_through_dump_and_load() {
    let db = minimal_v4_db();
    let mut buf = Vec::new();
    dump(&db, &mut buf).unwrap();
    let reloaded = load_reader(Cursor::new(buf), "fixture").unwrap();

    assert_eq!(reloaded.version, db.version);
    assert_eq!(reloaded.players, db.players);
    assert_eq!(reloaded.connections, db.connections);
    similar_asserts::assert_eq!(
        reloaded.objects.get(&0).unwrap(),
        db.objects.get(&0).unwrap()
    );
    similar_asserts::assert_eq!(
        reloaded.objects.get(&1).unwrap(),
        db.objects.get(&1).unwrap()
    );
}

#[test]
fn load_from_path_round_trips_via_tempfile() {
    let db = minimal_v4_db();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fixture.db");
    {
        let file = std::fs::File::create(&path).unwrap();
        dump(&db, file).unwrap();
    }
    let reloaded = load(&path).unwrap();
    assert_eq!(reloaded.objects.len(), db.objects.len());
    assert_eq!(reloaded.objects.get(&1).unwrap().verbs[0].code, db.objects.get(&1).unwrap().verbs[0].code);
}

#[test]
fn clear_inheritance_end_to_end() {
    let mut db = minimal_v4_db();
    assert_eq!(get_property(&db, 1, "x"), Some(Value::Int(1)));

    set_property(&mut db, 0, "x", Value::Int(2)).unwrap();
    assert_eq!(get_property(&db, 1, "x"), Some(Value::Int(2)));

    rename_property(&mut db, 0, "x", "y").unwrap();
    assert_eq!(get_property(&db, 1, "y"), Some(Value::Int(2)));

    set_property(&mut db, 0, "y", Value::Clear).unwrap();
    assert_eq!(get_property(&db, 0, "y"), Some(Value::Clear));
}

/// A v17 database with a suspended task and a waif, where the waif
/// referenced from a property is defined, and every VM satisfies
/// `len(stack) == top + 1`.
#[test]
fn v17_database_with_waif_and_suspended_task_round_trips() {
    let mut root = object(0, "root", 3, vec![-1], Value::ObjNum(-1));
    root.last_move = Some(Value::None);

    let mut holder = object(1, "holder", 3, vec![0], Value::ObjNum(-1));
    holder.last_move = Some(Value::None);
    holder.propnames = vec!["w".to_string()];
    holder.propdefs = vec![Propdef {
        value: Value::Waif(WaifRef(0)),
        is_clear: false,
        owner: 3,
        perms: 0,
    }];

    let mut objects = BTreeMap::new();
    objects.insert(root.id, root);
    objects.insert(holder.id, holder);

    let mut waifs = BTreeMap::new();
    waifs.insert(
        0,
        Waif {
            class: 1,
            owner: 3,
            prop_values: vec![Value::Int(42)],
        },
    );

    let activation = Activation {
        lang_version: 0,
        code: vec!["return 1;".to_string()],
        rt_env: vec![("x".to_string(), Value::Int(5))],
        stack: vec![Value::Int(1)],
        parse_info: ParseInfo {
            this: Some(Value::ObjNum(1)),
            vloc: Some(Value::ObjNum(1)),
            threaded: Some(0),
            header: ActivationHeader {
                this: 1,
                unused1: 0,
                unused2: 0,
                player: 3,
                unused3: 0,
                programmer: 3,
                vloc: 1,
                unused4: 0,
                debug: 1,
            },
            verb: "look".to_string(),
            verb_name: "look".to_string(),
        },
        temp: Value::None,
        pc: 0,
        bi_func: 0,
        error: 0,
        func_name: None,
    };
    let suspended = SuspendedTask {
        id: 1,
        start_time: 1000,
        value: None,
        vm: Vm {
            locals: Some(Value::Map(vec![])),
            top: 0,
            vector: 0,
            func_id: 0,
            max_stack_frames: 50,
            stack: vec![activation],
        },
    };
    let interrupted = InterruptedTask {
        id: 2,
        status: "killed by user".to_string(),
        vm: Vm {
            locals: Some(Value::Map(vec![])),
            top: -1,
            vector: 0,
            func_id: 0,
            max_stack_frames: 50,
            stack: vec![],
        },
    };

    let db = Database {
        version_string: "** LambdaMOO Database, Format Version 17 **".to_string(),
        version: TextdumpVersion::ToastStunt(ToastStuntDbVersion::ToastDbvBool),
        total_objects: 2,
        total_verbs: 0,
        total_players: 1,
        players: vec![3],
        clocks: vec!["some opaque clock string".to_string()],
        finalizations: vec![],
        objects,
        anon_objects: vec![],
        queued_tasks: vec![],
        suspended_tasks: vec![suspended],
        interrupted_tasks: vec![interrupted],
        connections: vec![Connection { who: 3, listener: 5 }],
        waifs,
    };

    let mut buf = Vec::new();
    dump(&db, &mut buf).unwrap();
    let reloaded = load_reader(Cursor::new(buf), "fixture").unwrap();

    assert_eq!(reloaded.suspended_tasks.len(), 1);
    assert_eq!(reloaded.interrupted_tasks.len(), 1);
    assert_eq!(reloaded.clocks, db.clocks);
    assert_eq!(reloaded.connections, vec![Connection { who: 3, listener: 5 }]);

    for vm in reloaded
        .suspended_tasks
        .iter()
        .map(|t| &t.vm)
        .chain(reloaded.interrupted_tasks.iter().map(|t| &t.vm))
    {
        assert_eq!(vm.stack.len() as i64, vm.top + 1);
    }

    let holder = reloaded.objects.get(&1).unwrap();
    let Value::Waif(wref) = &holder.propdefs[0].value else {
        panic!("expected a waif reference");
    };
    let waif = reloaded
        .waifs
        .get(&wref.0)
        .expect("every referenced waif must be defined");
    assert_eq!(waif.class, 1);
    assert_eq!(waif.prop_values, vec![Value::Int(42)]);
}

/// Before the fix this test guards, the writer emitted a `locals` value
/// unconditionally even for format versions (v4) that never read one,
/// corrupting any v4 database containing a suspended task.
#[test]
fn v4_suspended_task_vm_omits_locals_field() {
    let mut db = minimal_v4_db();
    db.suspended_tasks.push(SuspendedTask {
        id: 9,
        start_time: 500,
        value: None,
        vm: Vm {
            locals: None,
            top: 0,
            vector: 0,
            func_id: 0,
            max_stack_frames: 50,
            stack: vec![Activation {
                lang_version: 0,
                code: vec![],
                rt_env: vec![],
                stack: vec![],
                parse_info: ParseInfo {
                    this: None,
                    vloc: None,
                    threaded: None,
                    header: ActivationHeader {
                        this: 1,
                        unused1: 0,
                        unused2: 0,
                        player: 3,
                        unused3: 0,
                        programmer: 3,
                        vloc: 0,
                        unused4: 0,
                        debug: 1,
                    },
                    verb: "look".to_string(),
                    verb_name: "look".to_string(),
                },
                temp: Value::None,
                pc: 0,
                bi_func: 0,
                error: 0,
                func_name: None,
            }],
        },
    });

    let mut buf = Vec::new();
    dump(&db, &mut buf).unwrap();
    let reloaded = load_reader(Cursor::new(buf), "fixture").unwrap();
    assert_eq!(reloaded.suspended_tasks.len(), 1);
    assert_eq!(reloaded.suspended_tasks[0].vm.locals, None);
    assert_eq!(reloaded.suspended_tasks[0].vm.stack.len(), 1);
}

#[test]
fn recycled_object_consumes_only_its_header_line() {
    let fixture = "** LambdaMOO Database, Format Version 4 **\n\
2\n0\n0\n0\n\
#0 recycled\n\
#1\nalive\n\n0\n-1\n-1\n-1\n-1\n-1\n-1\n-1\n0\n0\n0\n\
0 clocks\n0 queued tasks\n0 suspended tasks\n0 active connections\n";
    let db = load_reader(fixture.as_bytes(), "fixture").unwrap();
    assert_eq!(db.objects.len(), 1);
    assert!(db.objects.get(&0).is_none());
    assert_eq!(db.objects.get(&1).unwrap().name, "alive");
}

/// A v17 file with empty queued/suspended/connections sections parses to
/// empty lists without consuming extra lines beyond their count headers.
#[test]
fn empty_v17_sections_parse_to_empty_lists() {
    let fixture = "** LambdaMOO Database, Format Version 17 **\n\
0\n\
0 values pending finalization\n\
0 clocks\n\
0 queued tasks\n\
0 suspended tasks\n\
0 interrupted tasks\n\
0 active connections\n\
0\n\
0\n\
0\n";
    let db = load_reader(fixture.as_bytes(), "fixture").unwrap();
    assert_eq!(db.version, TextdumpVersion::ToastStunt(ToastStuntDbVersion::ToastDbvBool));
    assert_eq!(db.queued_tasks, Vec::<QueuedTask>::new());
    assert_eq!(db.suspended_tasks, Vec::<SuspendedTask>::new());
    assert_eq!(db.connections, Vec::<Connection>::new());
    assert_eq!(db.objects.len(), 0);
}

#[test]
fn connections_with_listeners_round_trip() {
    let mut db = minimal_v4_db();
    db.connections = vec![
        Connection { who: 3, listener: 7 },
        Connection { who: 4, listener: 0 },
    ];
    let mut buf = Vec::new();
    dump(&db, &mut buf).unwrap();
    let text = String::from_utf8(buf.clone()).unwrap();
    assert!(text.contains("active connections with listeners"));

    let reloaded = load_reader(Cursor::new(buf), "fixture").unwrap();
    assert_eq!(reloaded.connections, db.connections);
}
