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

//! Top-level write driver, symmetric to [`crate::reader::TextdumpReader`].

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use tracing::info;

use crate::error::TextdumpError;
use crate::header;
use crate::lineio::LineWriter;
use crate::model::{Database, TextdumpVersion, DBV_ANON, DBV_INTERRUPT};
use crate::waif::Waif;

pub struct TextdumpWriter<'a, W: Write> {
    lines: LineWriter<W>,
    pub(crate) waifs: &'a BTreeMap<i64, Waif>,
    waif_written: BTreeSet<i64>,
}

impl<'a, W: Write> TextdumpWriter<'a, W> {
    pub fn new(writer: W, waifs: &'a BTreeMap<i64, Waif>) -> Self {
        TextdumpWriter {
            lines: LineWriter::new(writer),
            waifs,
            waif_written: BTreeSet::new(),
        }
    }

    /// Returns `true` the first time a given waif index is marked.
    pub(crate) fn mark_waif_written(&mut self, index: i64) -> bool {
        self.waif_written.insert(index)
    }

    pub(crate) fn err_unsupported(&self, message: impl std::fmt::Display) -> TextdumpError {
        TextdumpError::unsupported("<output>".to_string(), 0, message)
    }

    pub fn write_line(&mut self, s: &str) -> Result<(), TextdumpError> {
        self.lines.write_line(s)
    }

    pub fn write_int(&mut self, i: i64) -> Result<(), TextdumpError> {
        self.write_line(&i.to_string())
    }

    pub fn write_float(&mut self, f: f64) -> Result<(), TextdumpError> {
        // 19 significant digits (1 before the point + 18 after) is lossless
        // for an IEEE-754 double.
        self.write_line(&format!("{f:.18e}"))
    }

    pub fn write_string(&mut self, s: &str) -> Result<(), TextdumpError> {
        if s.contains('\n') {
            return Err(self.err_unsupported("string value contains an embedded line feed"));
        }
        self.write_line(s)
    }

    fn write_counted(&mut self, count: i64, suffix: &str) -> Result<(), TextdumpError> {
        self.write_line(&header::format_counted(count, suffix))
    }

    fn write_clocks(&mut self, clocks: &[String]) -> Result<(), TextdumpError> {
        self.write_counted(clocks.len() as i64, " clocks")?;
        for clock in clocks {
            self.write_line(clock)?;
        }
        Ok(())
    }

    fn write_queued_tasks(&mut self, tasks: &[crate::task::QueuedTask]) -> Result<(), TextdumpError> {
        self.write_counted(tasks.len() as i64, " queued tasks")?;
        for task in tasks {
            self.write_queued_task(task)?;
        }
        Ok(())
    }

    fn write_suspended_tasks(
        &mut self,
        tasks: &[crate::task::SuspendedTask],
    ) -> Result<(), TextdumpError> {
        self.write_counted(tasks.len() as i64, " suspended tasks")?;
        for task in tasks {
            self.write_suspended_task(task)?;
        }
        Ok(())
    }

    fn write_interrupted_tasks(
        &mut self,
        version: TextdumpVersion,
        tasks: &[crate::task::InterruptedTask],
    ) -> Result<(), TextdumpError> {
        if !version.at_least(DBV_INTERRUPT) {
            return Ok(());
        }
        self.write_counted(tasks.len() as i64, " interrupted tasks")?;
        for task in tasks {
            self.write_interrupted_task(task)?;
        }
        Ok(())
    }

    fn write_connections(&mut self, conns: &[crate::model::Connection]) -> Result<(), TextdumpError> {
        let has_listeners = conns.iter().any(|c| c.listener != 0);
        let suffix = if has_listeners {
            " active connections with listeners"
        } else {
            " active connections"
        };
        self.write_counted(conns.len() as i64, suffix)?;
        for conn in conns {
            if has_listeners {
                self.write_line(&header::format_int_fields(&[conn.who, conn.listener]))?;
            } else {
                self.write_int(conn.who)?;
            }
        }
        Ok(())
    }

    fn write_objects_section(
        &mut self,
        objects: &BTreeMap<i64, crate::model::Object>,
        version: TextdumpVersion,
        anon: bool,
    ) -> Result<(), TextdumpError> {
        for obj in objects.values().filter(|o| o.anon == anon) {
            self.write_object(obj, version)?;
        }
        Ok(())
    }

    fn write_verbs_section(&mut self, objects: &BTreeMap<i64, crate::model::Object>) -> Result<(), TextdumpError> {
        let with_code: Vec<(i64, usize, &Vec<String>)> = objects
            .values()
            .flat_map(|obj| {
                obj.verbs
                    .iter()
                    .enumerate()
                    .filter_map(move |(i, v)| v.code.as_ref().map(|c| (obj.id, i, c)))
            })
            .collect();
        for (oid, index, code) in &with_code {
            self.write_line(&format!("#{oid}:{index}"))?;
            self.write_code_block(code)?;
        }
        Ok(())
    }

    pub(crate) fn write_code_block(&mut self, lines: &[String]) -> Result<(), TextdumpError> {
        for line in lines {
            self.write_line(line)?;
        }
        self.write_line(".")
    }

    pub fn write(&mut self, db: &Database) -> Result<(), TextdumpError> {
        self.write_line(&db.version.to_version_string())?;
        match db.version {
            TextdumpVersion::LambdaMoo(_) => self.write_v4(db),
            TextdumpVersion::ToastStunt(_) => self.write_v17(db),
        }
    }

    fn write_v4(&mut self, db: &Database) -> Result<(), TextdumpError> {
        info!(
            "writing v4 database: {} objects, {} verbs",
            db.objects.len(),
            db.total_verbs
        );
        self.write_int(db.objects.len() as i64)?;
        self.write_int(db.total_verbs)?;
        self.write_line("0")?;
        self.write_int(db.players.len() as i64)?;
        for p in &db.players {
            self.write_int(*p)?;
        }

        self.write_objects_section(&db.objects, db.version, false)?;
        self.write_verbs_section(&db.objects)?;

        self.write_clocks(&db.clocks)?;
        self.write_queued_tasks(&db.queued_tasks)?;
        self.write_suspended_tasks(&db.suspended_tasks)?;
        self.write_connections(&db.connections)?;
        Ok(())
    }

    fn write_v17(&mut self, db: &Database) -> Result<(), TextdumpError> {
        info!(
            "writing v17 database: {} objects, {} verbs",
            db.objects.len(),
            db.total_verbs
        );
        self.write_int(db.players.len() as i64)?;
        for p in &db.players {
            self.write_int(*p)?;
        }

        self.write_counted(db.finalizations.len() as i64, " values pending finalization")?;
        for value in &db.finalizations {
            self.write_value(value)?;
        }

        self.write_clocks(&db.clocks)?;
        self.write_queued_tasks(&db.queued_tasks)?;
        self.write_suspended_tasks(&db.suspended_tasks)?;
        self.write_interrupted_tasks(db.version, &db.interrupted_tasks)?;
        self.write_connections(&db.connections)?;

        let non_anon = db.objects.values().filter(|o| !o.anon).count() as i64;
        self.write_int(non_anon)?;
        self.write_objects_section(&db.objects, db.version, false)?;

        if db.version.at_least(DBV_ANON) {
            let anon_objs: Vec<_> = db.objects.values().filter(|o| o.anon).collect();
            if !anon_objs.is_empty() {
                self.write_int(anon_objs.len() as i64)?;
                for obj in &anon_objs {
                    self.write_object(obj, db.version)?;
                }
            }
            self.write_int(0)?;
        }

        self.write_int(db.total_verbs)?;
        self.write_verbs_section(&db.objects)?;
        Ok(())
    }
}
