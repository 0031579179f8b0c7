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

//! Diagnostics for textdump parsing and writing.
//!
//! Every parse failure is fatal at the point of detection (no
//! resynchronization) and carries the originating filename, line number,
//! and a message naming the expectation that failed.

use std::fmt;

/// A single parse or write failure, always attributable to a line in a
/// specific file.
#[derive(Debug, thiserror::Error)]
pub enum TextdumpError {
    /// A templated header line (§4.2) did not match its expected shape.
    #[error("{file}:{line}: invalid {template} line: {message}")]
    InvalidHeader {
        file: String,
        line: usize,
        template: &'static str,
        message: String,
    },

    /// The version line named a version other than 4 or 17.
    #[error("{file}:{line}: unknown db version: {message}")]
    UnknownVersion {
        file: String,
        line: usize,
        message: String,
    },

    /// A value tag byte was not in the known tag table.
    #[error("{file}:{line}: unknown value type tag {tag}")]
    UnknownValueTag { file: String, line: usize, tag: i64 },

    /// Two counts disagreed, or a fixed-shape token (e.g. `#<oid>`, a
    /// verb separator `:`) was missing.
    #[error("{file}:{line}: {message}")]
    StructuralMismatch {
        file: String,
        line: usize,
        message: String,
    },

    /// A feature this codec declines to round-trip (a `-1` anonymous
    /// oid, property ordering beyond a multi-parent boundary when
    /// writing).
    #[error("{file}:{line}: unsupported feature: {message}")]
    UnsupportedFeature {
        file: String,
        line: usize,
        message: String,
    },

    /// The underlying byte stream failed.
    #[error("{file}:{line}: io error: {source}")]
    Io {
        file: String,
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

impl TextdumpError {
    pub fn invalid_header(
        file: impl Into<String>,
        line: usize,
        template: &'static str,
        message: impl fmt::Display,
    ) -> Self {
        TextdumpError::InvalidHeader {
            file: file.into(),
            line,
            template,
            message: message.to_string(),
        }
    }

    pub fn unknown_version(file: impl Into<String>, line: usize, message: impl fmt::Display) -> Self {
        TextdumpError::UnknownVersion {
            file: file.into(),
            line,
            message: message.to_string(),
        }
    }

    pub fn unknown_value_tag(file: impl Into<String>, line: usize, tag: i64) -> Self {
        TextdumpError::UnknownValueTag {
            file: file.into(),
            line,
            tag,
        }
    }

    pub fn structural(file: impl Into<String>, line: usize, message: impl fmt::Display) -> Self {
        TextdumpError::StructuralMismatch {
            file: file.into(),
            line,
            message: message.to_string(),
        }
    }

    pub fn unsupported(file: impl Into<String>, line: usize, message: impl fmt::Display) -> Self {
        TextdumpError::UnsupportedFeature {
            file: file.into(),
            line,
            message: message.to_string(),
        }
    }

    pub fn io(file: impl Into<String>, line: usize, source: std::io::Error) -> Self {
        TextdumpError::Io {
            file: file.into(),
            line,
            source,
        }
    }
}
