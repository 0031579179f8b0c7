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

//! Fixed line templates (§4.2): plain `split_whitespace`/`trim_end_matches`
//! parsing and `format!` writing, no regex — this crate never needs one.

use crate::error::TextdumpError;

pub const VERSION_PREFIX: &str = "** LambdaMOO Database, Format Version ";
pub const VERSION_SUFFIX: &str = " **";

pub fn format_version_line(version: u16) -> String {
    format!("{VERSION_PREFIX}{version}{VERSION_SUFFIX}")
}

pub fn parse_version_line(line: &str, file: &str, lineno: usize) -> Result<u16, TextdumpError> {
    let inner = line
        .strip_prefix(VERSION_PREFIX)
        .and_then(|s| s.strip_suffix(VERSION_SUFFIX))
        .ok_or_else(|| {
            TextdumpError::invalid_header(file, lineno, "version", format!("{line:?}"))
        })?;
    inner
        .parse::<u16>()
        .map_err(|e| TextdumpError::invalid_header(file, lineno, "version", e))
}

/// Parse a line of the shape `{count} {suffix}`, returning `count`.
pub fn parse_counted(
    line: &str,
    suffix: &str,
    template: &'static str,
    file: &str,
    lineno: usize,
) -> Result<i64, TextdumpError> {
    let Some(count_str) = line.strip_suffix(suffix) else {
        return Err(TextdumpError::invalid_header(
            file,
            lineno,
            template,
            format!("expected suffix {suffix:?} in {line:?}"),
        ));
    };
    count_str
        .trim()
        .parse::<i64>()
        .map_err(|e| TextdumpError::invalid_header(file, lineno, template, e))
}

pub fn format_counted(count: i64, suffix: &str) -> String {
    format!("{count}{suffix}")
}

/// Parse a line of whitespace-separated decimal integers into a fixed
/// number of fields.
pub fn parse_int_fields(
    line: &str,
    expected: usize,
    template: &'static str,
    file: &str,
    lineno: usize,
) -> Result<Vec<i64>, TextdumpError> {
    let fields: Result<Vec<i64>, _> = line.split_whitespace().map(|s| s.parse::<i64>()).collect();
    let fields = fields.map_err(|e| TextdumpError::invalid_header(file, lineno, template, e))?;
    if fields.len() != expected {
        return Err(TextdumpError::invalid_header(
            file,
            lineno,
            template,
            format!("expected {expected} integers, got {}", fields.len()),
        ));
    }
    Ok(fields)
}

pub fn format_int_fields(fields: &[i64]) -> String {
    fields
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `interrupted_task_header`: `{id} {status-to-EOL}` — the status half
/// may itself contain spaces, so only the first token is split off.
pub fn parse_id_and_rest(
    line: &str,
    template: &'static str,
    file: &str,
    lineno: usize,
) -> Result<(i64, String), TextdumpError> {
    let mut parts = line.splitn(2, ' ');
    let id_str = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("").to_string();
    let id = id_str
        .parse::<i64>()
        .map_err(|e| TextdumpError::invalid_header(file, lineno, template, e))?;
    Ok((id, rest))
}

pub const LANGVER_PREFIX: &str = "language version ";

pub fn format_langver(version: i64) -> String {
    format!("{LANGVER_PREFIX}{version}")
}

pub fn parse_langver(line: &str, file: &str, lineno: usize) -> Result<i64, TextdumpError> {
    line.strip_prefix(LANGVER_PREFIX)
        .ok_or_else(|| TextdumpError::invalid_header(file, lineno, "langver", format!("{line:?}")))?
        .parse::<i64>()
        .map_err(|e| TextdumpError::invalid_header(file, lineno, "langver", e))
}

pub const STACK_HEADER_SUFFIX: &str = " rt_stack slots in use";

pub fn format_stack_header(slots: i64) -> String {
    format!("{slots}{STACK_HEADER_SUFFIX}")
}

pub fn parse_stack_header(line: &str, file: &str, lineno: usize) -> Result<i64, TextdumpError> {
    parse_counted(line, STACK_HEADER_SUFFIX, "stack_header", file, lineno)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_line_round_trips() {
        let line = format_version_line(17);
        assert_eq!(line, "** LambdaMOO Database, Format Version 17 **");
        assert_eq!(parse_version_line(&line, "t", 1).unwrap(), 17);
    }

    #[test]
    fn counted_line_round_trips() {
        let line = format_counted(3, " clocks");
        assert_eq!(parse_counted(&line, " clocks", "clock_count", "t", 1).unwrap(), 3);
    }

    #[test]
    fn int_fields_round_trip() {
        let fields = [1, 2, 3, 4, 5, 6, 7, 8, 9];
        let line = format_int_fields(&fields);
        let parsed = parse_int_fields(&line, 9, "activation_header", "t", 1).unwrap();
        assert_eq!(parsed, fields);
    }

    #[test]
    fn id_and_rest_splits_on_first_space_only() {
        let (id, rest) = parse_id_and_rest("3 still running nicely", "interrupted_task_header", "t", 1).unwrap();
        assert_eq!(id, 3);
        assert_eq!(rest, "still running nicely");
    }

    #[test]
    fn langver_round_trips() {
        let line = format_langver(3);
        assert_eq!(line, "language version 3");
        assert_eq!(parse_langver(&line, "t", 1).unwrap(), 3);
    }

    #[test]
    fn stack_header_round_trips() {
        let line = format_stack_header(5);
        assert_eq!(line, "5 rt_stack slots in use");
        assert_eq!(parse_stack_header(&line, "t", 1).unwrap(), 5);
    }
}
