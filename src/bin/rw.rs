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

//! `rw` - round-trip a LambdaMOO/ToastStunt textdump.
//!
//! # Usage
//!
//! ```bash
//! rw rw --load Minimal.db --dump Minimal.db.out
//! rw moodb2flat Minimal.db ./flattened
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use eyre::Result;

#[derive(Parser, Debug)]
#[command(name = "rw")]
#[command(about = "Load and dump LambdaMOO/ToastStunt textdumps")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a textdump and immediately dump it back out.
    Rw {
        #[arg(long)]
        load: PathBuf,
        #[arg(long)]
        dump: PathBuf,
    },
    /// Flatten a textdump into a per-object directory tree.
    Moodb2Flat { dbfile: PathBuf, dir: PathBuf },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    setup_logging(args.debug)?;

    match args.command {
        Command::Rw { load, dump } => {
            let db = moo_textdump::load(&load)?;
            tracing::info!(
                "loaded {}: {} objects, {} players",
                load.display(),
                db.objects.len(),
                db.players.len()
            );
            let file = File::create(&dump)?;
            moo_textdump::dump(&db, BufWriter::new(file))?;
            tracing::info!("wrote {}", dump.display());
            Ok(())
        }
        Command::Moodb2Flat { dbfile, dir } => {
            let _ = (dbfile, dir);
            eyre::bail!("moodb2flat is not implemented by this codec")
        }
    }
}

fn setup_logging(debug: bool) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}
