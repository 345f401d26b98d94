// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

//! Per-argument classification into {immediate, register, memory}. There
//! is no `argument.cpp` in the original sources to port from — this is
//! built fresh from the operand-parser contract (SPEC_FULL.md §4.1),
//! using the same `AsmArg` shape as `include/argument.hpp`.

use std::io::Write;

use crate::context::Context;
use crate::error::AssembleErrorKind;
use crate::memory::{self, MemoryOperandDescriptor};
use crate::numeric::{parse_number, trim_string};
use crate::registers::Register;

/// A single parsed operand. Maps directly onto the original's
/// union-in-struct `AsmArg`; unlike that union, the tag and payload
/// cannot disagree by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsmArg {
    Immediate(u64),
    Register(Register, Option<u8>),
    Memory(MemoryOperandDescriptor, Option<u8>),
}

impl AsmArg {
    pub fn type_name(&self) -> &'static str {
        match self {
            AsmArg::Immediate(_) => "immediate",
            AsmArg::Register(..) => "register",
            AsmArg::Memory(..) => "memory",
        }
    }
}

fn strip_comment(s: &str) -> &str {
    match s.find(';') {
        Some(idx) => &s[..idx],
        None => s,
    }
}

fn consume_size_keyword(token: &str) -> (Option<u8>, &str) {
    const KEYWORDS: [(&str, u8); 4] = [("%BYTE", 8), ("%WORD", 16), ("%DWORD", 32), ("%QWORD", 64)];
    for (kw, size) in KEYWORDS {
        if let Some(rest) = token.strip_prefix(kw) {
            return (Some(size), trim_string(rest));
        }
    }
    (None, token)
}

fn parse_one<W: Write>(ctx: &mut Context<W>, raw_token: &str) -> Option<AsmArg> {
    let token = trim_string(raw_token);
    let (size_override, rest) = consume_size_keyword(token);

    if let Some(interior) = rest.strip_prefix('[') {
        let Some(interior) = interior.strip_suffix(']') else {
            ctx.raise(AssembleErrorKind::UnterminatedBracket(rest.to_string()));
            return None;
        };
        let desc = memory::parse_memory(ctx, interior)?;
        return Some(AsmArg::Memory(desc, size_override));
    }

    if let Some((reg, width)) = Register::by_name(rest) {
        if size_override.is_some() {
            ctx.raise(AssembleErrorKind::MisplacedSizePrefix(token.to_string()));
            return None;
        }
        return Some(AsmArg::Register(reg, width));
    }

    match parse_number(rest) {
        Ok(n) => {
            if size_override.is_some() {
                ctx.raise(AssembleErrorKind::MisplacedSizePrefix(token.to_string()));
                return None;
            }
            Some(AsmArg::Immediate(n))
        }
        Err(kind) => {
            ctx.raise(kind);
            None
        }
    }
}

/// Splits `raw` on commas, strips a trailing `;` comment first, and
/// parses exactly `arity` operands. Any arity mismatch or inner parse
/// failure raises and returns `None` — callers never get a partial
/// argument list.
pub(crate) fn parse_arguments<W: Write>(
    ctx: &mut Context<W>,
    instruction: &str,
    raw: &str,
    arity: usize,
) -> Option<Vec<AsmArg>> {
    let without_comment = strip_comment(raw);
    let trimmed = trim_string(without_comment);

    if arity == 0 {
        return if trimmed.is_empty() {
            Some(Vec::new())
        } else {
            ctx.raise(AssembleErrorKind::UnexpectedArguments {
                instruction: instruction.to_string(),
                args: trimmed.to_string(),
            });
            None
        };
    }

    if trimmed.is_empty() {
        ctx.raise(AssembleErrorKind::ArityMismatch {
            instruction: instruction.to_string(),
            args: trimmed.to_string(),
        });
        return None;
    }

    let tokens: Vec<&str> = trimmed.split(',').collect();
    if tokens.len() != arity {
        ctx.raise(AssembleErrorKind::ArityMismatch {
            instruction: instruction.to_string(),
            args: trimmed.to_string(),
        });
        return None;
    }

    let mut args = Vec::with_capacity(arity);
    for token in tokens {
        args.push(parse_one(ctx, token)?);
    }
    Some(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str, arity: usize) -> Option<Vec<AsmArg>> {
        let mut ctx = Context::new(Vec::new());
        parse_arguments(&mut ctx, "TEST", raw, arity)
    }

    #[test]
    fn parses_register_and_immediate() {
        let args = parse("AL, 5", 2).unwrap();
        assert_eq!(args[0], AsmArg::Register(Register::Al, Some(8)));
        assert_eq!(args[1], AsmArg::Immediate(5));
    }

    #[test]
    fn parses_memory_operand() {
        let args = parse("[BX+SI+4]", 1).unwrap();
        match &args[0] {
            AsmArg::Memory(desc, size) => {
                assert_eq!(desc.disp, 4);
                assert_eq!(*size, None);
            }
            other => panic!("expected memory operand, got {other:?}"),
        }
    }

    #[test]
    fn size_prefix_only_valid_on_memory() {
        let mut ctx = Context::new(Vec::new());
        assert!(parse_arguments(&mut ctx, "TEST", "%BYTE AL", 1).is_none());
        assert!(ctx.has_failed());
    }

    #[test]
    fn size_prefix_applies_to_memory_operand() {
        let args = parse("%DWORD [EAX]", 1).unwrap();
        match &args[0] {
            AsmArg::Memory(_, size) => assert_eq!(*size, Some(32)),
            other => panic!("expected memory operand, got {other:?}"),
        }
    }

    #[test]
    fn strips_trailing_comment() {
        let args = parse("AL, 5 ; load accumulator", 2).unwrap();
        assert_eq!(args[1], AsmArg::Immediate(5));
    }

    #[test]
    fn arity_mismatch_fails() {
        let mut ctx = Context::new(Vec::new());
        assert!(parse_arguments(&mut ctx, "TEST", "AL", 2).is_none());
        assert!(ctx.has_failed());
    }

    #[test]
    fn zero_arity_rejects_trailing_tokens() {
        let mut ctx = Context::new(Vec::new());
        assert!(parse_arguments(&mut ctx, "CLC", "AL", 0).is_none());
        assert!(ctx.has_failed());
    }
}
