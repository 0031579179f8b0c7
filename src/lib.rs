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

//! Representation of the structure of objects, verbs, tasks, and
//! property slots as read from (and written to) a LambdaMOO/ToastStunt
//! textdump file.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

pub use error::TextdumpError;
pub use model::{
    Connection, Database, LambdaMooDbVersion, Object, Propdef, TextdumpVersion, ToastStuntDbVersion, Verb,
};
pub use propresolve::{get_property, rename_property, resolve_names, set_property};
pub use reader::TextdumpReader;
pub use task::{Activation, ActivationHeader, InterruptedTask, ParseInfo, QueuedTask, SuspendedTask, Vm};
pub use value::{Value, ValueTag, WaifRef};
pub use waif::{Waif, WAIF_MAX_PROPS};
pub use writer::TextdumpWriter;

mod error;
mod header;
mod lineio;
mod model;
mod object;
mod propresolve;
mod reader;
mod task;
mod value;
mod waif;
mod writer;

/// Load a full textdump from `path` into an in-memory [`Database`].
pub fn load(path: impl AsRef<Path>) -> Result<Database, TextdumpError> {
    let path = path.as_ref();
    let filename = path.display().to_string();
    let file = File::open(path).map_err(|e| TextdumpError::io(filename.clone(), 0, e))?;
    load_reader(BufReader::new(file), filename)
}

/// Load a full textdump from an arbitrary buffered reader, for callers
/// that already have bytes in hand (a socket, an embedded fixture, a
/// decompression stream).
pub fn load_reader(reader: impl BufRead, filename: impl Into<String>) -> Result<Database, TextdumpError> {
    TextdumpReader::new(reader, filename)?.read()
}

/// Serialize `db` to `sink` in its own format version.
pub fn dump(db: &Database, mut sink: impl Write) -> Result<(), TextdumpError> {
    let waifs: BTreeMap<i64, Waif> = db.waifs.clone();
    let mut writer = TextdumpWriter::new(&mut sink, &waifs);
    writer.write(db)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAMBDACORE_MINIMAL: &str = "** LambdaMOO Database, Format Version 4 **\n1\n0\n0\n1\n1\n#0\nroot\n\n0\n-1\n-1\n-1\n-1\n-1\n-1\n-1\n0\n0\n0\n0 clocks\n0 queued tasks\n0 suspended tasks\n0 active connections\n";

    #[test]
    fn loads_and_dumps_a_minimal_v4_database() {
        let db = load_reader(LAMBDACORE_MINIMAL.as_bytes(), "fixture").unwrap();
        assert_eq!(db.version, TextdumpVersion::LambdaMoo(LambdaMooDbVersion::DbvBfbugFixed));
        assert_eq!(db.objects.len(), 1);
        assert_eq!(db.players, vec![1]);

        let mut buf = Vec::new();
        dump(&db, &mut buf).unwrap();
        let reloaded = load_reader(buf.as_slice(), "fixture2").unwrap();
        assert_eq!(reloaded.objects.len(), db.objects.len());
        assert_eq!(reloaded.players, db.players);
    }
}
