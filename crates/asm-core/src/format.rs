// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

//! The five operand-shape encoding templates (I/RI/MI/RR/MR). Grounded
//! on `src/genformats.cpp` of the original implementation; the matrices
//! in each function's doc comment mirror SPEC_FULL.md §4.4 verbatim.

use std::io;
use std::io::Write;

use crate::context::{BitsMode, Context};
use crate::error::{AssembleErrorKind, AssembleWarningKind};
use crate::memory::{self, MemoryOperandDescriptor};
use crate::numeric::{fits_i8, fits_i16, fits_i32};
use crate::operand::AsmArg;
use crate::registers::Register;

/// Accumulator-immediate short form. `dst` must be AL/AX/EAX and `src`
/// an immediate that fits the accumulator's width; anything else
/// declines (`Ok(false)`) so the ALU family can fall through to Format
/// RI.
pub(crate) fn format_i<W: Write>(
    ctx: &mut Context<W>,
    dst: &AsmArg,
    src: &AsmArg,
    op_imm_8: u8,
    op_imm_def: u8,
) -> io::Result<bool> {
    let (AsmArg::Register(reg, _), AsmArg::Immediate(imm)) = (dst, src) else {
        return Ok(false);
    };
    let imm = *imm as i64;

    match reg {
        Register::Al => {
            ctx.flush_contextual_prefixes()?;
            ctx.emit_byte(op_imm_8)?;
            ctx.emit_byte(imm as u8)?;
            Ok(true)
        }
        Register::Ax => {
            if !fits_i16(imm) {
                return Ok(false);
            }
            ctx.flush_contextual_prefixes()?;
            if matches!(ctx.mode(), BitsMode::M32 | BitsMode::M64) {
                ctx.emit_byte(0x66)?;
            }
            ctx.emit_byte(op_imm_def)?;
            ctx.emit(&(imm as u16).to_le_bytes())?;
            Ok(true)
        }
        Register::Eax => {
            if !fits_i32(imm) {
                return Ok(false);
            }
            ctx.flush_contextual_prefixes()?;
            if matches!(ctx.mode(), BitsMode::M16) {
                ctx.emit_byte(0x66)?;
            }
            ctx.emit_byte(op_imm_def)?;
            ctx.emit(&(imm as u32).to_le_bytes())?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Register-immediate, general form: `modrm = (11, reg_field, reg)`.
pub(crate) fn format_ri<W: Write>(
    ctx: &mut Context<W>,
    instruction: &str,
    reg_field: u8,
    dst: &Register,
    width: Option<u8>,
    imm: u64,
    op_rm8_imm8: u8,
    op_rm_imm: u8,
    op_rm_imm8: u8,
) -> io::Result<()> {
    let imm = imm as i64;
    let modrm = memory::build_modrm_core(dst.encoding(), reg_field, 0b11);

    match width {
        Some(8) => {
            if !fits_i8(imm) {
                ctx.warn(AssembleWarningKind::ImmediateTruncated {
                    value: imm as u64,
                    bits: 8,
                });
            }
            ctx.flush_contextual_prefixes()?;
            ctx.emit_byte(op_rm8_imm8)?;
            ctx.emit_byte(modrm)?;
            ctx.emit_byte(imm as u8)?;
        }
        Some(16) => {
            ctx.flush_contextual_prefixes()?;
            if matches!(ctx.mode(), BitsMode::M32 | BitsMode::M64) {
                ctx.emit_byte(0x66)?;
            }
            if fits_i8(imm) {
                ctx.emit_byte(op_rm_imm8)?;
                ctx.emit_byte(modrm)?;
                ctx.emit_byte(imm as u8)?;
            } else {
                if !fits_i16(imm) {
                    ctx.warn(AssembleWarningKind::ImmediateTruncated {
                        value: imm as u64,
                        bits: 16,
                    });
                }
                ctx.emit_byte(op_rm_imm)?;
                ctx.emit_byte(modrm)?;
                ctx.emit(&(imm as u16).to_le_bytes())?;
            }
        }
        Some(32) => {
            ctx.flush_contextual_prefixes()?;
            if matches!(ctx.mode(), BitsMode::M16) {
                ctx.emit_byte(0x66)?;
            }
            if fits_i8(imm) {
                ctx.emit_byte(op_rm_imm8)?;
                ctx.emit_byte(modrm)?;
                ctx.emit_byte(imm as u8)?;
            } else {
                if !fits_i32(imm) {
                    ctx.warn(AssembleWarningKind::ImmediateTruncated {
                        value: imm as u64,
                        bits: 32,
                    });
                }
                ctx.emit_byte(op_rm_imm)?;
                ctx.emit_byte(modrm)?;
                ctx.emit(&(imm as u32).to_le_bytes())?;
            }
        }
        _ => {
            ctx.raise(AssembleErrorKind::InvalidRegisterArgument(instruction.to_string()));
        }
    }
    Ok(())
}

enum AddrPrefix {
    None,
    Addr67,
    Addr67Op66,
}

enum MiOpcode {
    Rm8Imm8,
    ImmShortOrDef16,
    ImmShortOrDef32,
}

fn mi_plan(addr_size: u8, mode: BitsMode, size_override: u8) -> Option<(AddrPrefix, MiOpcode)> {
    use AddrPrefix::*;
    use MiOpcode::*;
    Some(match (addr_size, mode, size_override) {
        (16, BitsMode::M16, 8) => (None, Rm8Imm8),
        (16, BitsMode::M16, 0 | 16) => (AddrPrefix::None, ImmShortOrDef16),
        (16, BitsMode::M16, 32) => (AddrPrefix::None, ImmShortOrDef32),
        (16, BitsMode::M32, 8) => (Addr67, Rm8Imm8),
        (16, BitsMode::M32, 16) => (Addr67Op66, ImmShortOrDef16),
        (16, BitsMode::M32, 0 | 32) => (Addr67, ImmShortOrDef32),
        (32, BitsMode::M16, 8) => (Addr67, Rm8Imm8),
        (32, BitsMode::M16, 0 | 16) => (Addr67, ImmShortOrDef16),
        (32, BitsMode::M16, 32) => (Addr67Op66, ImmShortOrDef32),
        (32, BitsMode::M32, 8) => (AddrPrefix::None, Rm8Imm8),
        (32, BitsMode::M32, 16) => (AddrPrefix::None, ImmShortOrDef16),
        (32, BitsMode::M32, 0 | 32) => (AddrPrefix::None, ImmShortOrDef32),
        _ => return None,
    })
}

/// Memory-immediate form. Synthesises the `MemoryOperand` with
/// `reg_v = reg_field` and selects prefixes/opcode width from the
/// (addressing-width, bits-mode, size_override) matrix in
/// SPEC_FULL.md §4.4.
#[allow(clippy::too_many_arguments)]
pub(crate) fn format_mi<W: Write>(
    ctx: &mut Context<W>,
    instruction: &str,
    reg_field: u8,
    desc: MemoryOperandDescriptor,
    size_override: Option<u8>,
    imm: u64,
    op_rm8_imm8: u8,
    op_rm_imm: u8,
    op_rm_imm8: u8,
) -> io::Result<()> {
    if matches!(ctx.mode(), BitsMode::M64) {
        ctx.raise(AssembleErrorKind::Unsupported64);
        return Ok(());
    }

    let size_override = size_override.unwrap_or(0);
    if size_override == 64 {
        ctx.raise(AssembleErrorKind::Unsupported64);
        return Ok(());
    }

    let addr_size = memory::resolve_addr_size(desc.size, ctx.mode());
    let Some((addr_prefix, opcode_kind)) = mi_plan(addr_size, ctx.mode(), size_override) else {
        ctx.raise(AssembleErrorKind::UnsupportedFormat(instruction.to_string()));
        return Ok(());
    };

    let Some(mop) = memory::make_modrm_sib(ctx, desc, reg_field) else {
        return Ok(());
    };

    ctx.flush_contextual_prefixes()?;
    match addr_prefix {
        AddrPrefix::None => {}
        AddrPrefix::Addr67 => ctx.emit_byte(0x67)?,
        AddrPrefix::Addr67Op66 => {
            ctx.emit_byte(0x67)?;
            ctx.emit_byte(0x66)?;
        }
    }

    let imm = imm as i64;
    match opcode_kind {
        MiOpcode::Rm8Imm8 => {
            if !fits_i8(imm) {
                ctx.warn(AssembleWarningKind::ImmediateTruncated {
                    value: imm as u64,
                    bits: 8,
                });
            }
            ctx.emit_byte(op_rm8_imm8)?;
            emit_modrm_sib_disp(ctx, &mop)?;
            ctx.emit_byte(imm as u8)?;
        }
        MiOpcode::ImmShortOrDef16 => {
            if fits_i8(imm) {
                ctx.emit_byte(op_rm_imm8)?;
                emit_modrm_sib_disp(ctx, &mop)?;
                ctx.emit_byte(imm as u8)?;
            } else {
                if !fits_i16(imm) {
                    ctx.warn(AssembleWarningKind::ImmediateTruncated {
                        value: imm as u64,
                        bits: 16,
                    });
                }
                ctx.emit_byte(op_rm_imm)?;
                emit_modrm_sib_disp(ctx, &mop)?;
                ctx.emit(&(imm as u16).to_le_bytes())?;
            }
        }
        MiOpcode::ImmShortOrDef32 => {
            if fits_i8(imm) {
                ctx.emit_byte(op_rm_imm8)?;
                emit_modrm_sib_disp(ctx, &mop)?;
                ctx.emit_byte(imm as u8)?;
            } else {
                if !fits_i32(imm) {
                    ctx.warn(AssembleWarningKind::ImmediateTruncated {
                        value: imm as u64,
                        bits: 32,
                    });
                }
                ctx.emit_byte(op_rm_imm)?;
                emit_modrm_sib_disp(ctx, &mop)?;
                ctx.emit(&(imm as u32).to_le_bytes())?;
            }
        }
    }
    Ok(())
}

fn emit_modrm_sib_disp<W: Write>(ctx: &mut Context<W>, mop: &crate::memory::MemoryOperand) -> io::Result<()> {
    ctx.emit_byte(mop.modrm)?;
    if mop.has_sib {
        ctx.emit_byte(mop.sib)?;
    }
    if mop.size == 16 {
        memory::output_disp_16(ctx, mop.disp_size, mop.disp)
    } else {
        memory::output_disp_32(ctx, mop.disp_size, mop.disp)
    }
}

/// Register-register form: `modrm = (11, src, dst)` — the destination
/// sits in `rm`.
pub(crate) fn format_rr<W: Write>(
    ctx: &mut Context<W>,
    instruction: &str,
    dst: &Register,
    dst_width: Option<u8>,
    src: &Register,
    src_width: Option<u8>,
    op_r8: u8,
    op_r_def: u8,
) -> io::Result<()> {
    if dst_width != src_width {
        ctx.raise(AssembleErrorKind::MismatchedOperandSizes(instruction.to_string()));
        return Ok(());
    }

    let modrm = memory::build_modrm_core(dst.encoding(), src.encoding(), 0b11);

    match dst_width {
        Some(8) => {
            ctx.flush_contextual_prefixes()?;
            ctx.emit_byte(op_r8)?;
            ctx.emit_byte(modrm)?;
        }
        Some(width @ (16 | 32)) => {
            ctx.flush_contextual_prefixes()?;
            let mismatch = matches!((width, ctx.mode()), (16, BitsMode::M32 | BitsMode::M64) | (32, BitsMode::M16));
            if mismatch {
                ctx.emit_byte(0x66)?;
            }
            ctx.emit_byte(op_r_def)?;
            ctx.emit_byte(modrm)?;
        }
        _ => {
            ctx.raise(AssembleErrorKind::UnsupportedFormat(instruction.to_string()));
        }
    }
    Ok(())
}

/// Memory/register form, both directions. `reg_v` is the encoding of
/// the non-memory register; `prefixes` are mandatory bytes, `ex_prefixes`
/// are bytes to suppress from the computed (0x66/0x67) set.
#[allow(clippy::too_many_arguments)]
pub(crate) fn format_mr<W: Write>(
    ctx: &mut Context<W>,
    instruction: &str,
    reg_v: u8,
    reg_width: u8,
    desc: MemoryOperandDescriptor,
    size_override: Option<u8>,
    op_rm8_r8: u8,
    op_rm_r: u8,
    prefixes: &[u8],
    ex_prefixes: &[u8],
) -> io::Result<()> {
    if matches!(ctx.mode(), BitsMode::M64) {
        ctx.raise(AssembleErrorKind::Unsupported64);
        return Ok(());
    }

    if let Some(ov) = size_override {
        if ov != 0 && ov != reg_width {
            ctx.raise(AssembleErrorKind::MismatchedOperandSizes(instruction.to_string()));
            return Ok(());
        }
    }

    let addr_prefix_67 = desc.size != 0 && ((desc.size == 16) == matches!(ctx.mode(), BitsMode::M32));
    let op_prefix_66 = (reg_width == 16 && matches!(ctx.mode(), BitsMode::M32 | BitsMode::M64))
        || (reg_width == 32 && matches!(ctx.mode(), BitsMode::M16));

    let mut computed = Vec::new();
    if addr_prefix_67 && !ex_prefixes.contains(&0x67) {
        computed.push(0x67);
    }
    if op_prefix_66 && !ex_prefixes.contains(&0x66) {
        computed.push(0x66);
    }

    let Some(mop) = memory::make_modrm_sib(ctx, desc, reg_v) else {
        return Ok(());
    };

    ctx.flush_contextual_prefixes()?;
    ctx.emit(&computed)?;
    if prefixes.is_empty() {
        let opcode = if reg_width == 8 { op_rm8_r8 } else { op_rm_r };
        ctx.emit_byte(opcode)?;
    } else {
        ctx.emit(prefixes)?;
    }
    emit_modrm_sib_disp(ctx, &mop)
}
