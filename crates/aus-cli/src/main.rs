// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

//! `aus <input> <output>` — assembles `input` into a flat byte stream
//! at `output`, exiting non-zero on any usage, I/O, or assembly error.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;

/// A 16/32-bit x86 legacy-encoding assembler.
#[derive(Parser, Debug)]
#[command(name = "aus", version, about)]
struct Cli {
    /// Path to the assembly source file.
    input: PathBuf,

    /// Path to write the encoded byte stream to.
    output: PathBuf,

    /// Increase log verbosity; repeatable (-v, -vv, -vvv).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(true)` on a clean assembly, `Ok(false)` if assembly
/// completed but one or more lines failed (the partial output is left
/// on disk, per SPEC_FULL.md §7 — the caller decides whether to keep
/// or discard it).
fn run(cli: Cli) -> anyhow::Result<bool> {
    let input = File::open(&cli.input)
        .with_context(|| format!("failed to open input file `{}`", cli.input.display()))?;
    let output = File::create(&cli.output)
        .with_context(|| format!("failed to create output file `{}`", cli.output.display()))?;

    let ctx = asm_core::assemble_source(BufReader::new(input), BufWriter::new(output))
        .context("I/O error while assembling")?;

    for diagnostic in ctx.diagnostics() {
        log::log!(
            if diagnostic.severity.is_error() {
                log::Level::Error
            } else {
                log::Level::Warn
            },
            "{diagnostic}"
        );
    }

    let failed = ctx.has_failed();
    let mut output = ctx.into_inner();
    output.flush().context("failed to flush output file")?;

    if failed {
        log::error!("assembly failed; partial output left at `{}`", cli.output.display());
        Ok(false)
    } else {
        Ok(true)
    }
}
