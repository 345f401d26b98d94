// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

//! Per-line dispatch: comment/blank skip, the `BITS` directive, and
//! routing everything else to the ZO or ALU family. Grounded on the
//! line-driving loop in `src/main.cpp` of the original implementation,
//! generalised to also dispatch the ALU family (that older `main.cpp`
//! only wired up ZO).

use std::io::{self, BufRead, Write};

use crate::context::Context;
use crate::error::AssembleErrorKind;
use crate::numeric::trim_string;
use crate::{alu, zo};

fn try_bits_directive<W: Write>(ctx: &mut Context<W>, upper: &str) -> bool {
    let body = upper
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(upper);

    match body.strip_prefix("BITS") {
        Some(rest) if rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\t') => {
            ctx.change_bits_mode(rest.trim());
            true
        }
        _ => false,
    }
}

/// Assembles a single source line, advancing no state besides `ctx`.
/// Callers are responsible for incrementing `ctx.line` between calls.
pub fn assemble_line<W: Write>(ctx: &mut Context<W>, raw_line: &str) -> io::Result<()> {
    let trimmed = trim_string(raw_line);
    if trimmed.is_empty() || trimmed.starts_with("//") || trimmed.starts_with(';') || trimmed.starts_with('#') {
        return Ok(());
    }

    let upper = trimmed.to_ascii_uppercase();

    if try_bits_directive(ctx, &upper) {
        return Ok(());
    }

    let (mnemonic, args) = match upper.split_once(' ') {
        Some((m, a)) => (m, a),
        None => (upper.as_str(), ""),
    };

    if let Some(instruction) = zo::lookup(mnemonic) {
        return zo::assemble_zo(ctx, mnemonic, instruction, args);
    }
    if let Some(instruction) = alu::lookup(mnemonic) {
        return alu::assemble_alu(ctx, mnemonic, instruction, args);
    }

    ctx.raise(AssembleErrorKind::UnknownMnemonic(mnemonic.to_string()));
    Ok(())
}

/// Drives an entire source over `input`, writing encoded bytes to
/// `output` as each line succeeds. Returns the terminal `Context` so
/// the caller can inspect [`Context::has_failed`] and
/// [`Context::diagnostics`] and recover the output sink via
/// [`Context::into_inner`].
pub fn assemble_source<R: BufRead, W: Write>(input: R, output: W) -> io::Result<Context<W>> {
    let mut ctx = Context::new(output);
    for line in input.lines() {
        let line = line?;
        assemble_line(&mut ctx, &line)?;
        ctx.line += 1;
    }
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble(src: &str) -> (Vec<u8>, bool) {
        let ctx = assemble_source(src.as_bytes(), Vec::new()).unwrap();
        let failed = ctx.has_failed();
        (ctx.into_inner(), failed)
    }

    #[test]
    fn clc() {
        let (bytes, failed) = assemble("CLC");
        assert!(!failed);
        assert_eq!(bytes, vec![0xF8]);
    }

    #[test]
    fn add_al_immediate() {
        let (bytes, failed) = assemble("ADD AL, 5");
        assert!(!failed);
        assert_eq!(bytes, vec![0x04, 0x05]);
    }

    #[test]
    fn add_bx_immediate_short_form() {
        let (bytes, failed) = assemble("ADD BX, 1");
        assert!(!failed);
        assert_eq!(bytes, vec![0x83, 0xC3, 0x01]);
    }

    #[test]
    fn bits_directive_switches_mode() {
        let (bytes, failed) = assemble("BITS 32\nADD EAX, 0x11223344");
        assert!(!failed);
        assert_eq!(bytes, vec![0x05, 0x44, 0x33, 0x22, 0x11]);
    }

    #[test]
    fn invalid_bits_mode_does_not_change_mode() {
        let (_, failed) = assemble("BITS 17");
        assert!(failed);
    }

    #[test]
    fn unknown_mnemonic_fails() {
        let (_, failed) = assemble("FROB AX");
        assert!(failed);
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        let (bytes, failed) = assemble("; a comment\n\n// also a comment\n# and this\nCLC");
        assert!(!failed);
        assert_eq!(bytes, vec![0xF8]);
    }
}
