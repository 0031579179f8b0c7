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

//! Top-level read driver: version detection and the v4/v17 section
//! orderings of §4.8.

use std::collections::BTreeMap;
use std::io::BufRead;

use tracing::info;

use crate::error::TextdumpError;
use crate::header;
use crate::lineio::LineReader;
use crate::model::{
    Connection, Database, LambdaMooDbVersion, TextdumpVersion, ToastStuntDbVersion, DBV_ANON,
};
use crate::task::{InterruptedTask, QueuedTask, SuspendedTask};
use crate::waif::Waif;

pub struct TextdumpReader<R: BufRead> {
    lines: LineReader<R>,
    pub version: TextdumpVersion,
    pub version_string: String,
    pub(crate) waifs: BTreeMap<i64, Waif>,
}

impl<R: BufRead> TextdumpReader<R> {
    /// Read the version line from `reader` and construct a reader
    /// positioned just after it.
    pub fn new(reader: R, filename: impl Into<String>) -> Result<Self, TextdumpError> {
        let mut lines = LineReader::new(reader, filename);
        let version_string = lines.read_line()?;
        let raw_version = header::parse_version_line(&version_string, &lines.filename, 1)?;
        let version = if raw_version > 4 {
            let v = ToastStuntDbVersion::from_repr(raw_version).ok_or_else(|| {
                TextdumpError::unknown_version(
                    lines.filename.clone(),
                    1,
                    format!("unsupported db version {raw_version}"),
                )
            })?;
            if v as u16 != 17 {
                return Err(TextdumpError::unknown_version(
                    lines.filename.clone(),
                    1,
                    format!("unsupported db version {raw_version} (only 4 and 17 are supported)"),
                ));
            }
            TextdumpVersion::ToastStunt(v)
        } else {
            let v = LambdaMooDbVersion::from_repr(raw_version).ok_or_else(|| {
                TextdumpError::unknown_version(
                    lines.filename.clone(),
                    1,
                    format!("unsupported db version {raw_version}"),
                )
            })?;
            if v as u16 != 4 {
                return Err(TextdumpError::unknown_version(
                    lines.filename.clone(),
                    1,
                    format!("unsupported db version {raw_version} (only 4 and 17 are supported)"),
                ));
            }
            TextdumpVersion::LambdaMoo(v)
        };
        info!("version {raw_version} ({version_string})");
        Ok(TextdumpReader {
            lines,
            version,
            version_string,
            waifs: BTreeMap::new(),
        })
    }

    /// Construct a reader directly from a pre-built `LineReader`, skipping
    /// version-line parsing. Used by unit tests that exercise a single
    /// sub-grammar against a hand-built fixture string.
    #[cfg(test)]
    pub(crate) fn from_line_reader(
        lines: LineReader<R>,
        version: TextdumpVersion,
        version_string: String,
    ) -> Self {
        TextdumpReader {
            lines,
            version,
            version_string,
            waifs: BTreeMap::new(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.lines.filename
    }

    pub fn line_num(&self) -> usize {
        self.lines.line_num
    }

    pub(crate) fn err_unknown_tag(&self, tag: i64) -> TextdumpError {
        TextdumpError::unknown_value_tag(self.filename().to_string(), self.line_num(), tag)
    }

    pub(crate) fn err_unsupported(&self, message: impl std::fmt::Display) -> TextdumpError {
        TextdumpError::unsupported(self.filename().to_string(), self.line_num(), message)
    }

    pub(crate) fn err_structural(&self, message: impl std::fmt::Display) -> TextdumpError {
        TextdumpError::structural(self.filename().to_string(), self.line_num(), message)
    }

    pub(crate) fn err_header(
        &self,
        template: &'static str,
        message: impl std::fmt::Display,
    ) -> TextdumpError {
        TextdumpError::invalid_header(self.filename().to_string(), self.line_num(), template, message)
    }

    pub(crate) fn read_raw_line(&mut self) -> Result<String, TextdumpError> {
        self.lines.read_line()
    }

    pub fn read_string(&mut self) -> Result<String, TextdumpError> {
        self.lines.read_line()
    }

    pub fn read_int(&mut self) -> Result<i64, TextdumpError> {
        let line = self.lines.read_line()?;
        line.trim()
            .parse::<i64>()
            .map_err(|e| self.err_header("integer", e))
    }

    pub fn read_float(&mut self) -> Result<f64, TextdumpError> {
        let line = self.lines.read_line()?;
        line.trim()
            .parse::<f64>()
            .map_err(|e| self.err_header("float", e))
    }

    fn parse_counted(&mut self, suffix: &str, template: &'static str) -> Result<i64, TextdumpError> {
        let line = self.read_raw_line()?;
        header::parse_counted(&line, suffix, template, self.filename(), self.line_num())
    }

    fn read_clocks(&mut self) -> Result<Vec<String>, TextdumpError> {
        let count = self.parse_counted(" clocks", "clock_count")?;
        let mut clocks = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            clocks.push(self.read_raw_line()?);
        }
        Ok(clocks)
    }

    fn read_queued_tasks(&mut self) -> Result<Vec<QueuedTask>, TextdumpError> {
        let count = self.parse_counted(" queued tasks", "task_count")?;
        let mut tasks = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            tasks.push(self.read_queued_task()?);
        }
        Ok(tasks)
    }

    fn read_suspended_tasks(&mut self) -> Result<Vec<SuspendedTask>, TextdumpError> {
        let count = self.parse_counted(" suspended tasks", "suspended_task_count")?;
        let mut tasks = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            tasks.push(self.read_suspended_task()?);
        }
        Ok(tasks)
    }

    fn read_interrupted_tasks(&mut self) -> Result<Vec<InterruptedTask>, TextdumpError> {
        if !self.version.at_least(crate::model::DBV_INTERRUPT) {
            return Ok(Vec::new());
        }
        let count = self.parse_counted(" interrupted tasks", "interrupted_task_count")?;
        let mut tasks = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            tasks.push(self.read_interrupted_task()?);
        }
        Ok(tasks)
    }

    fn read_connections(&mut self) -> Result<Vec<Connection>, TextdumpError> {
        let line = self.read_raw_line()?;
        let has_listeners = line.ends_with(" with listeners");
        let suffix = if has_listeners {
            " active connections with listeners"
        } else {
            " active connections"
        };
        let count = header::parse_counted(
            &line,
            suffix,
            "connection_count",
            self.filename(),
            self.line_num(),
        )?;
        let mut conns = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            if has_listeners {
                let fields = header::parse_int_fields(
                    &self.read_raw_line()?,
                    2,
                    "connection",
                    self.filename(),
                    self.line_num(),
                )?;
                conns.push(Connection {
                    who: fields[0],
                    listener: fields[1],
                });
            } else {
                conns.push(Connection {
                    who: self.read_int()?,
                    listener: 0,
                });
            }
        }
        Ok(conns)
    }

    fn read_players(&mut self, count: i64) -> Result<Vec<i64>, TextdumpError> {
        let mut players = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            players.push(self.read_int()?);
        }
        Ok(players)
    }

    fn read_objects_section(&mut self, nobjs: i64) -> Result<BTreeMap<i64, crate::model::Object>, TextdumpError> {
        let mut objects = BTreeMap::new();
        for _ in 0..nobjs {
            if let Some(obj) = self.read_object()? {
                objects.insert(obj.id, obj);
            }
        }
        Ok(objects)
    }

    fn read_anon_objects(&mut self) -> Result<(BTreeMap<i64, crate::model::Object>, Vec<i64>), TextdumpError> {
        let mut objects = BTreeMap::new();
        let mut anon_ids = Vec::new();
        if !self.version.at_least(DBV_ANON) {
            return Ok((objects, anon_ids));
        }
        loop {
            let nobjs = self.read_int()?;
            if nobjs == 0 {
                break;
            }
            for _ in 0..nobjs {
                if let Some(mut obj) = self.read_object()? {
                    obj.anon = true;
                    anon_ids.push(obj.id);
                    objects.insert(obj.id, obj);
                }
            }
        }
        Ok((objects, anon_ids))
    }

    fn read_verbs_section(
        &mut self,
        objects: &mut BTreeMap<i64, crate::model::Object>,
        nprogs: i64,
    ) -> Result<(), TextdumpError> {
        for _ in 0..nprogs {
            let header_line = self.read_raw_line()?;
            let (oid, index) = header_line
                .strip_prefix('#')
                .and_then(|s| s.split_once(':'))
                .ok_or_else(|| self.err_structural(format!("invalid verb key {header_line:?}")))
                .and_then(|(o, i)| {
                    let oid = o
                        .parse::<i64>()
                        .map_err(|e| self.err_structural(format!("invalid object id: {e}")))?;
                    let idx = i
                        .parse::<usize>()
                        .map_err(|e| self.err_structural(format!("invalid verb index: {e}")))?;
                    Ok((oid, idx))
                })?;
            let code = self.read_code_block()?;
            let obj = objects
                .get_mut(&oid)
                .ok_or_else(|| self.err_structural(format!("verb code for unknown object #{oid}")))?;
            let verb = obj.verbs.get_mut(index).ok_or_else(|| {
                self.err_structural(format!("verb code for unknown index #{oid}:{index}"))
            })?;
            verb.code = Some(code);
        }
        Ok(())
    }

    pub(crate) fn read_code_block(&mut self) -> Result<Vec<String>, TextdumpError> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_raw_line()?;
            if line == "." {
                break;
            }
            lines.push(line);
        }
        Ok(lines)
    }

    /// Parse the full textdump following the version line already
    /// consumed by `new`.
    pub fn read(mut self) -> Result<Database, TextdumpError> {
        match self.version {
            TextdumpVersion::LambdaMoo(_) => self.read_v4(),
            TextdumpVersion::ToastStunt(_) => self.read_v17(),
        }
    }

    fn read_v4(&mut self) -> Result<Database, TextdumpError> {
        let total_objects = self.read_int()?;
        let total_verbs = self.read_int()?;
        let _dummy = self.read_raw_line()?;
        let total_players = self.read_int()?;
        info!("v4 database: {total_objects} objects, {total_verbs} verbs, {total_players} players");
        let players = self.read_players(total_players)?;

        let mut objects = self.read_objects_section(total_objects)?;
        self.read_verbs_section(&mut objects, total_verbs)?;

        let clocks = self.read_clocks()?;
        let queued_tasks = self.read_queued_tasks()?;
        let suspended_tasks = self.read_suspended_tasks()?;
        let connections = self.read_connections()?;

        Ok(Database {
            version_string: self.version_string.clone(),
            version: self.version,
            total_objects,
            total_verbs,
            total_players,
            players,
            clocks,
            finalizations: Vec::new(),
            objects,
            anon_objects: Vec::new(),
            queued_tasks,
            suspended_tasks,
            interrupted_tasks: Vec::new(),
            connections,
            waifs: std::mem::take(&mut self.waifs),
        })
    }

    fn read_v17(&mut self) -> Result<Database, TextdumpError> {
        let total_players = self.read_int()?;
        let players = self.read_players(total_players)?;

        let pending_line = self.read_raw_line()?;
        let num_pending = header::parse_counted(
            &pending_line,
            " values pending finalization",
            "pending_values_count",
            self.filename(),
            self.line_num(),
        )?;
        let mut finalizations = Vec::with_capacity(num_pending.max(0) as usize);
        for _ in 0..num_pending {
            finalizations.push(self.read_value()?);
        }

        let clocks = self.read_clocks()?;
        let queued_tasks = self.read_queued_tasks()?;
        let suspended_tasks = self.read_suspended_tasks()?;
        let interrupted_tasks = self.read_interrupted_tasks()?;
        let connections = self.read_connections()?;

        let total_objects = self.read_int()?;
        info!("v17 database: {total_objects} objects, {total_players} players");
        let mut objects = self.read_objects_section(total_objects)?;
        let (anon_objects_map, anon_objects) = self.read_anon_objects()?;
        objects.extend(anon_objects_map);

        let total_verbs = self.read_int()?;
        self.read_verbs_section(&mut objects, total_verbs)?;

        Ok(Database {
            version_string: self.version_string.clone(),
            version: self.version,
            total_objects,
            total_verbs,
            total_players,
            players,
            clocks,
            finalizations,
            objects,
            anon_objects,
            queued_tasks,
            suspended_tasks,
            interrupted_tasks,
            connections,
            waifs: std::mem::take(&mut self.waifs),
        })
    }
}
