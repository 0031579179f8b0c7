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

//! Task/VM codec (§4.6): queued, suspended, and interrupted tasks, their
//! activation frames and rt-envs. Unlike a running server, this codec has
//! no interpreter behind it — every field here is retained verbatim so a
//! loaded database can be dumped back out without losing a suspended
//! player's call stack.

use std::io::{BufRead, Write};

use crate::error::TextdumpError;
use crate::header;
use crate::model::DBV_TASK_LOCAL;
use crate::reader::TextdumpReader;
use crate::value::Value;
use crate::writer::TextdumpWriter;

/// The fixed 9-integer `activation_header` line. Four of its columns are
/// historical and carried through unexamined; breaking their byte-for-byte
/// order would stop a real server from re-ingesting the dump.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivationHeader {
    pub this: i64,
    pub unused1: i64,
    pub unused2: i64,
    pub player: i64,
    pub unused3: i64,
    pub programmer: i64,
    pub vloc: i64,
    pub unused4: i64,
    pub debug: i64,
}

/// The "parse info" form of an activation, used inside a queued task and
/// as the tail of a full-form activation.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseInfo {
    pub this: Option<Value>,
    pub vloc: Option<Value>,
    pub threaded: Option<i64>,
    pub header: ActivationHeader,
    pub verb: String,
    pub verb_name: String,
}

/// A full activation frame, as found on a suspended or interrupted VM's
/// call stack.
#[derive(Clone, Debug, PartialEq)]
pub struct Activation {
    pub lang_version: i64,
    pub code: Vec<String>,
    pub rt_env: Vec<(String, Value)>,
    pub stack: Vec<Value>,
    pub parse_info: ParseInfo,
    pub temp: Value,
    pub pc: i64,
    pub bi_func: i64,
    pub error: i64,
    pub func_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Vm {
    pub locals: Option<Value>,
    pub top: i64,
    pub vector: i64,
    pub func_id: i64,
    pub max_stack_frames: i64,
    pub stack: Vec<Activation>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct QueuedTask {
    pub unused: i64,
    pub first_lineno: i64,
    pub st: i64,
    pub id: i64,
    pub parse_info: ParseInfo,
    pub rt_env: Vec<(String, Value)>,
    pub code: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SuspendedTask {
    pub id: i64,
    pub start_time: i64,
    pub value: Option<Value>,
    pub vm: Vm,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InterruptedTask {
    pub id: i64,
    pub status: String,
    pub vm: Vm,
}

impl<R: BufRead> TextdumpReader<R> {
    fn read_activation_header(&mut self) -> Result<ActivationHeader, TextdumpError> {
        let line = self.read_raw_line()?;
        let f = header::parse_int_fields(&line, 9, "activation_header", self.filename(), self.line_num())?;
        Ok(ActivationHeader {
            this: f[0],
            unused1: f[1],
            unused2: f[2],
            player: f[3],
            unused3: f[4],
            programmer: f[5],
            vloc: f[6],
            unused4: f[7],
            debug: f[8],
        })
    }

    /// Read an activation in its "parse info" form: a sentinel value, a
    /// handful of version-gated fields, the fixed header, four discarded
    /// historical strings, then the verb name pair.
    fn read_parse_info(&mut self) -> Result<ParseInfo, TextdumpError> {
        let _sentinel = self.read_value()?;
        let this = if self.version.at_least(crate::model::DBV_THIS) {
            Some(self.read_value()?)
        } else {
            None
        };
        let vloc = if self.version.at_least(crate::model::DBV_ANON) {
            Some(self.read_value()?)
        } else {
            None
        };
        let threaded = if self.version.at_least(crate::model::DBV_THREADED) {
            Some(self.read_int()?)
        } else {
            None
        };
        let header = self.read_activation_header()?;
        let _argstr = self.read_raw_line()?;
        let _dobjstr = self.read_raw_line()?;
        let _prepstr = self.read_raw_line()?;
        let _iobjstr = self.read_raw_line()?;
        let verb = self.read_string()?;
        let verb_name = self.read_string()?;
        Ok(ParseInfo {
            this,
            vloc,
            threaded,
            header,
            verb,
            verb_name,
        })
    }

    fn read_rt_env(&mut self) -> Result<Vec<(String, Value)>, TextdumpError> {
        let line = self.read_raw_line()?;
        let count = header::parse_counted(&line, " variables", "var_count", self.filename(), self.line_num())?;
        let mut vars = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            let name = self.read_string()?;
            let value = self.read_value()?;
            vars.push((name, value));
        }
        Ok(vars)
    }

    /// Every version this crate loads (4 and 17) postdates floating-point
    /// support, so the `langver` line is always present.
    fn read_activation(&mut self) -> Result<Activation, TextdumpError> {
        let lang_line = self.read_raw_line()?;
        let lang_version = header::parse_langver(&lang_line, self.filename(), self.line_num())?;
        let code = self.read_code_block()?;
        let rt_env = self.read_rt_env()?;
        let stack_line = self.read_raw_line()?;
        let slots = header::parse_stack_header(&stack_line, self.filename(), self.line_num())?;
        let mut stack = Vec::with_capacity(slots.max(0) as usize);
        for _ in 0..slots {
            stack.push(self.read_value()?);
        }
        let parse_info = self.read_parse_info()?;
        let temp = self.read_value()?;
        let pc_line = self.read_raw_line()?;
        let pc_fields = header::parse_int_fields(&pc_line, 3, "pc", self.filename(), self.line_num())?;
        let (pc, bi_func, error) = (pc_fields[0], pc_fields[1], pc_fields[2]);
        let func_name = if bi_func != 0 {
            Some(self.read_string()?)
        } else {
            None
        };
        Ok(Activation {
            lang_version,
            code,
            rt_env,
            stack,
            parse_info,
            temp,
            pc,
            bi_func,
            error,
            func_name,
        })
    }

    pub(crate) fn read_vm(&mut self) -> Result<Vm, TextdumpError> {
        let locals = if self.version.at_least(DBV_TASK_LOCAL) {
            Some(self.read_value()?)
        } else {
            None
        };
        let header_line = self.read_raw_line()?;
        let fields = header::parse_int_fields(&header_line, 4, "vm_header", self.filename(), self.line_num())?;
        let (top, vector, func_id, max_stack_frames) = (fields[0], fields[1], fields[2], fields[3]);
        let mut stack = Vec::with_capacity((top + 1).max(0) as usize);
        for _ in 0..=top {
            stack.push(self.read_activation()?);
        }
        Ok(Vm {
            locals,
            top,
            vector,
            func_id,
            max_stack_frames,
            stack,
        })
    }

    pub(crate) fn read_queued_task(&mut self) -> Result<QueuedTask, TextdumpError> {
        let line = self.read_raw_line()?;
        let fields = header::parse_int_fields(&line, 4, "task_header", self.filename(), self.line_num())?;
        let (unused, first_lineno, st, id) = (fields[0], fields[1], fields[2], fields[3]);
        let parse_info = self.read_parse_info()?;
        let rt_env = self.read_rt_env()?;
        let code = self.read_code_block()?;
        Ok(QueuedTask {
            unused,
            first_lineno,
            st,
            id,
            parse_info,
            rt_env,
            code,
        })
    }

    pub(crate) fn read_suspended_task(&mut self) -> Result<SuspendedTask, TextdumpError> {
        let line = self.read_raw_line()?;
        let mut parts = line.split_whitespace();
        let start_time = parts
            .next()
            .ok_or_else(|| self.err_header("suspended_task_header", "missing start_time"))?
            .parse::<i64>()
            .map_err(|e| self.err_header("suspended_task_header", e))?;
        let id = parts
            .next()
            .ok_or_else(|| self.err_header("suspended_task_header", "missing id"))?
            .parse::<i64>()
            .map_err(|e| self.err_header("suspended_task_header", e))?;
        let value = match parts.next() {
            Some(tag_str) => {
                let tag = tag_str
                    .parse::<i64>()
                    .map_err(|e| self.err_header("suspended_task_header", e))?;
                Some(self.read_value_tagged(tag)?)
            }
            None => None,
        };
        let vm = self.read_vm()?;
        Ok(SuspendedTask {
            id,
            start_time,
            value,
            vm,
        })
    }

    pub(crate) fn read_interrupted_task(&mut self) -> Result<InterruptedTask, TextdumpError> {
        let line = self.read_raw_line()?;
        let (id, status) =
            header::parse_id_and_rest(&line, "interrupted_task_header", self.filename(), self.line_num())?;
        let vm = self.read_vm()?;
        Ok(InterruptedTask { id, status, vm })
    }
}

impl<W: Write> TextdumpWriter<'_, W> {
    fn write_activation_header(&mut self, h: &ActivationHeader) -> Result<(), TextdumpError> {
        self.write_line(&header::format_int_fields(&[
            h.this, h.unused1, h.unused2, h.player, h.unused3, h.programmer, h.vloc, h.unused4, h.debug,
        ]))
    }

    fn write_parse_info(&mut self, pi: &ParseInfo) -> Result<(), TextdumpError> {
        self.write_value(&Value::Int(-111))?;
        if let Some(this) = &pi.this {
            self.write_value(this)?;
        }
        if let Some(vloc) = &pi.vloc {
            self.write_value(vloc)?;
        }
        if let Some(threaded) = pi.threaded {
            self.write_int(threaded)?;
        }
        self.write_activation_header(&pi.header)?;
        self.write_line("No")?;
        self.write_line("More")?;
        self.write_line("Parse")?;
        self.write_line("Infos")?;
        self.write_string(&pi.verb)?;
        self.write_string(&pi.verb_name)
    }

    fn write_rt_env(&mut self, vars: &[(String, Value)]) -> Result<(), TextdumpError> {
        self.write_line(&header::format_counted(vars.len() as i64, " variables"))?;
        for (name, value) in vars {
            self.write_string(name)?;
            self.write_value(value)?;
        }
        Ok(())
    }

    fn write_activation(&mut self, a: &Activation) -> Result<(), TextdumpError> {
        self.write_line(&header::format_langver(a.lang_version))?;
        self.write_code_block(&a.code)?;
        self.write_rt_env(&a.rt_env)?;
        self.write_line(&header::format_stack_header(a.stack.len() as i64))?;
        for v in &a.stack {
            self.write_value(v)?;
        }
        self.write_parse_info(&a.parse_info)?;
        self.write_value(&a.temp)?;
        self.write_line(&header::format_int_fields(&[a.pc, a.bi_func, a.error]))?;
        if a.bi_func != 0 {
            let func_name = a
                .func_name
                .as_ref()
                .ok_or_else(|| self.err_unsupported("activation has bi_func set but no func_name"))?;
            self.write_string(func_name)?;
        }
        Ok(())
    }

    pub(crate) fn write_vm(&mut self, vm: &Vm) -> Result<(), TextdumpError> {
        if let Some(locals) = &vm.locals {
            self.write_value(locals)?;
        }
        self.write_line(&header::format_int_fields(&[
            vm.top,
            vm.vector,
            vm.func_id,
            vm.max_stack_frames,
        ]))?;
        for a in &vm.stack {
            self.write_activation(a)?;
        }
        Ok(())
    }

    pub(crate) fn write_queued_task(&mut self, task: &QueuedTask) -> Result<(), TextdumpError> {
        self.write_line(&header::format_int_fields(&[
            task.unused,
            task.first_lineno,
            task.st,
            task.id,
        ]))?;
        self.write_parse_info(&task.parse_info)?;
        self.write_rt_env(&task.rt_env)?;
        self.write_code_block(&task.code)
    }

    pub(crate) fn write_suspended_task(&mut self, task: &SuspendedTask) -> Result<(), TextdumpError> {
        match &task.value {
            Some(value) => {
                let tag = crate::value::value_tag(value) as i64;
                self.write_line(&format!("{} {} {tag}", task.start_time, task.id))?;
                self.write_value_body(value)?;
            }
            None => {
                self.write_line(&format!("{} {}", task.start_time, task.id))?;
            }
        }
        self.write_vm(&task.vm)
    }

    pub(crate) fn write_interrupted_task(&mut self, task: &InterruptedTask) -> Result<(), TextdumpError> {
        self.write_line(&format!("{} {}", task.id, task.status))?;
        self.write_vm(&task.vm)
    }
}
