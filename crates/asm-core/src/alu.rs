// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

//! The eight two-operand arithmetic/logical mnemonics, parameterised by
//! a 3-bit `reg_field`. Grounded on `src/formats/alu.cpp` of the
//! original implementation.

use std::io;
use std::io::Write;

use crate::context::Context;
use crate::error::AssembleErrorKind;
use crate::format;
use crate::operand::{self, AsmArg};

#[derive(Debug, Clone, Copy)]
pub(crate) struct AluInstruction {
    pub reg_field: u8,
}

pub(crate) fn lookup(mnemonic: &str) -> Option<AluInstruction> {
    let reg_field = match mnemonic {
        "ADD" => 0,
        "OR" => 1,
        "ADC" => 2,
        "SBB" => 3,
        "AND" => 4,
        "SUB" => 5,
        "XOR" => 6,
        "CMP" => 7,
        _ => return None,
    };
    Some(AluInstruction { reg_field })
}

/// Derives the nine opcodes from `reg_field` and dispatches on the
/// `(dst, src)` operand-type pair to the appropriate format engine.
pub(crate) fn assemble_alu<W: Write>(
    ctx: &mut Context<W>,
    mnemonic: &str,
    instruction: AluInstruction,
    args: &str,
) -> io::Result<()> {
    let f = instruction.reg_field;
    let op_imm_8 = 0x04 + 8 * f;
    let op_imm_def = 0x05 + 8 * f;
    let op_rm8_imm8 = 0x80;
    let op_rm_imm = 0x81;
    let op_rm_imm8 = 0x83;
    let op_rm8_r8 = 0x00 + 8 * f;
    let op_rm_r = 0x01 + 8 * f;
    let op_r8_rm8 = 0x02 + 8 * f;
    let op_r_rm = 0x03 + 8 * f;

    let Some(args) = operand::parse_arguments(ctx, mnemonic, args, 2) else {
        return Ok(());
    };
    let [dst, src] = <[AsmArg; 2]>::try_from(args).unwrap();

    match (&dst, &src) {
        (AsmArg::Register(..), AsmArg::Immediate(imm)) => {
            let AsmArg::Register(reg, width) = &dst else {
                unreachable!()
            };
            if format::format_i(ctx, &dst, &src, op_imm_8, op_imm_def)? {
                return Ok(());
            }
            format::format_ri(
                ctx,
                mnemonic,
                f,
                reg,
                *width,
                *imm,
                op_rm8_imm8,
                op_rm_imm,
                op_rm_imm8,
            )
        }
        (AsmArg::Memory(desc, size_override), AsmArg::Immediate(imm)) => format::format_mi(
            ctx,
            mnemonic,
            f,
            *desc,
            *size_override,
            *imm,
            op_rm8_imm8,
            op_rm_imm,
            op_rm_imm8,
        ),
        (AsmArg::Register(dst_reg, dst_width), AsmArg::Register(src_reg, src_width)) => {
            format::format_rr(ctx, mnemonic, dst_reg, *dst_width, src_reg, *src_width, op_rm8_r8, op_rm_r)
        }
        (AsmArg::Memory(desc, size_override), AsmArg::Register(reg, width)) => {
            let Some(width) = width else {
                ctx.raise(AssembleErrorKind::InvalidRegisterArgument(mnemonic.to_string()));
                return Ok(());
            };
            format::format_mr(
                ctx,
                mnemonic,
                reg.encoding(),
                *width,
                *desc,
                *size_override,
                op_rm8_r8,
                op_rm_r,
                &[],
                &[],
            )
        }
        (AsmArg::Register(reg, width), AsmArg::Memory(desc, size_override)) => {
            let Some(width) = width else {
                ctx.raise(AssembleErrorKind::InvalidRegisterArgument(mnemonic.to_string()));
                return Ok(());
            };
            format::format_mr(
                ctx,
                mnemonic,
                reg.encoding(),
                *width,
                *desc,
                *size_override,
                op_r8_rm8,
                op_r_rm,
                &[],
                &[],
            )
        }
        _ => {
            ctx.raise(AssembleErrorKind::WrongOperandType(mnemonic.to_string()));
            Ok(())
        }
    }
}
