// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

//! Memory-operand parsing and ModR/M+SIB synthesis. Grounded on
//! `src/memory.cpp` / `include/memory.hpp` of the original
//! implementation. The sentinel `0xFF` the original uses for "absent"
//! base/index is replaced throughout by `Option<u8>` (SPEC_FULL.md §9).

use std::io::Write;

use crate::context::{BitsMode, Context};
use crate::error::{AssembleErrorKind, AssembleWarningKind};
use crate::numeric::{fits_i8, fits_i16, parse_number, split_string};
use crate::registers::{Register, EBP_ENCODING, ESP_ENCODING};

/// A normal form capturing both 16-bit and 32-bit addressing, built up
/// atom-by-atom from the interior of a `[ … ]` expression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryOperandDescriptor {
    pub size: u8, // 0, 16, or 32
    pub bx: bool,
    pub bp: bool,
    pub si: bool,
    pub di: bool,
    pub disp: i64,
    pub index: Option<u8>,
    pub scale: i32,
    pub base: Option<u8>,
}

/// The concrete encoding output of the ModR/M+SIB synthesiser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryOperand {
    pub size: u8,
    pub modrm: u8,
    pub has_sib: bool,
    pub sib: u8,
    pub disp_size: u8, // 0, 8, 16, or 32
    pub disp: u64,
}

fn process_register_atom<W: Write>(
    ctx: &mut Context<W>,
    desc: &mut MemoryOperandDescriptor,
    atom: &str,
    reg: Register,
    width: Option<u8>,
    is_adding: bool,
) -> Result<(), ()> {
    match width {
        Some(8) => {
            ctx.raise(AssembleErrorKind::EightBitRegisterInMemory(atom.to_string()));
            Err(())
        }
        Some(32) => {
            if desc.size == 0 {
                desc.size = 32;
            } else if desc.size != 32 {
                ctx.raise(AssembleErrorKind::MixedAddressingWidth {
                    register: atom.to_string(),
                    new_width: 32,
                    existing_width: desc.size,
                });
                return Err(());
            }

            let encoding = reg.encoding();

            match (desc.base, desc.index) {
                (None, _) => {
                    desc.base = Some(encoding);
                }
                (Some(base), None) => {
                    // Repeating the current base promotes it to index
                    // with scale 2; a fresh second register becomes
                    // index with scale 1 (SPEC_FULL.md §4.2).
                    desc.scale = if encoding == base { 2 } else { 1 };
                    desc.index = Some(encoding);
                }
                (Some(base), Some(index)) => {
                    if encoding == index {
                        desc.scale += if is_adding { 1 } else { -1 };
                    } else if encoding == base {
                        ctx.raise(AssembleErrorKind::Repeated32BitRegister(atom.to_string()));
                        return Err(());
                    } else {
                        ctx.raise(AssembleErrorKind::ThirdRegister(atom.to_string()));
                        return Err(());
                    }
                }
            }
            Ok(())
        }
        _ => {
            ctx.raise(AssembleErrorKind::RegisterNotAllowedInMemory(atom.to_string()));
            Err(())
        }
    }
}

/// Sets the 16-bit register-pair flags (`bx`/`bp`/`si`/`di`), rejecting
/// repetition of the same register and illegal combinations
/// ({bx,bp} or {si,di} together).
fn process_16bit_register<W: Write>(
    ctx: &mut Context<W>,
    desc: &mut MemoryOperandDescriptor,
    atom: &str,
    reg: Register,
) -> Result<(), ()> {
    if desc.size == 0 {
        desc.size = 16;
    } else if desc.size != 16 {
        ctx.raise(AssembleErrorKind::MixedAddressingWidth {
            register: atom.to_string(),
            new_width: 16,
            existing_width: desc.size,
        });
        return Err(());
    }

    let (already_set, other) = match reg {
        Register::Bx => (desc.bx, desc.bp),
        Register::Bp => (desc.bp, desc.bx),
        Register::Si => (desc.si, desc.di),
        Register::Di => (desc.di, desc.si),
        _ => {
            ctx.raise(AssembleErrorKind::Invalid16BitRegister(atom.to_string()));
            return Err(());
        }
    };

    if already_set {
        ctx.raise(AssembleErrorKind::Repeated16BitRegister(atom.to_string()));
        return Err(());
    }
    if other {
        ctx.raise(AssembleErrorKind::Illegal16BitCombination);
        return Err(());
    }

    match reg {
        Register::Bx => desc.bx = true,
        Register::Bp => desc.bp = true,
        Register::Si => desc.si = true,
        Register::Di => desc.di = true,
        _ => unreachable!(),
    }
    Ok(())
}

fn parse_scaled_quark<W: Write>(
    ctx: &mut Context<W>,
    atom: &str,
    reg_token: &str,
    scale_token: &str,
) -> Result<(u8, i32), ()> {
    let Some((reg, width)) = Register::by_name(reg_token) else {
        ctx.raise(AssembleErrorKind::InvalidScaledIndex(atom.to_string()));
        return Err(());
    };
    if width != Some(32) {
        ctx.raise(AssembleErrorKind::InvalidScaledIndex(atom.to_string()));
        return Err(());
    }

    let n = parse_number(scale_token).map_err(|_| ()).and_then(|n| {
        if matches!(n, 1 | 2 | 4 | 8) {
            Ok(n)
        } else {
            Err(())
        }
    });

    match n {
        Ok(n) => Ok((reg.encoding(), n as i32)),
        Err(()) => {
            ctx.raise(AssembleErrorKind::InvalidScaleLiteral {
                scale: scale_token.to_string(),
            });
            Err(())
        }
    }
}

fn process_scaled_index_atom<W: Write>(
    ctx: &mut Context<W>,
    desc: &mut MemoryOperandDescriptor,
    atom: &str,
    is_adding: bool,
) -> Result<(), ()> {
    let quarks = split_string(atom, '*');
    if quarks.len() != 2 {
        ctx.raise(AssembleErrorKind::InvalidScaledIndex(atom.to_string()));
        return Err(());
    }

    let (register_encoding, mut scale) = if Register::by_name(quarks[0]).is_some() {
        parse_scaled_quark(ctx, atom, quarks[0], quarks[1])?
    } else if Register::by_name(quarks[1]).is_some() {
        parse_scaled_quark(ctx, atom, quarks[1], quarks[0])?
    } else {
        ctx.raise(AssembleErrorKind::InvalidScaledIndex(atom.to_string()));
        return Err(());
    };

    if !is_adding {
        scale = -scale;
    }

    if desc.size == 0 {
        desc.size = 32;
    } else if desc.size != 32 {
        ctx.raise(AssembleErrorKind::MixedAddressingWidth {
            register: atom.to_string(),
            new_width: 32,
            existing_width: desc.size,
        });
        return Err(());
    }

    match desc.index {
        None => {
            desc.index = Some(register_encoding);
            desc.scale = scale;
        }
        Some(index) if index == register_encoding => {
            desc.scale += scale;
        }
        _ if desc.base == Some(register_encoding) => {
            desc.base = None;
            desc.scale = scale;
            desc.index = Some(register_encoding);
        }
        _ if desc.base.is_none() && desc.scale == 1 => {
            desc.base = desc.index;
            desc.scale = scale;
            desc.index = Some(register_encoding);
        }
        _ => {
            ctx.raise(AssembleErrorKind::CannotHaveTwoScaledIndexes);
            return Err(());
        }
    }

    Ok(())
}

fn process_numeric_atom<W: Write>(
    ctx: &mut Context<W>,
    desc: &mut MemoryOperandDescriptor,
    atom: &str,
    is_adding: bool,
) -> Result<(), ()> {
    let n = parse_number(atom).map_err(|_| {
        ctx.raise(AssembleErrorKind::InvalidMemoryExpression(atom.to_string()));
    })?;

    let mut signed = n as i64;
    if !fits_i32_as_disp(signed) {
        ctx.warn(AssembleWarningKind::DisplacementTruncated(signed));
        signed = (signed as i32) as i64;
    }

    desc.disp += if is_adding { signed } else { -signed };
    Ok(())
}

fn fits_i32_as_disp(n: i64) -> bool {
    n == (n as i32) as i64
}

fn process_atom<W: Write>(
    ctx: &mut Context<W>,
    desc: &mut MemoryOperandDescriptor,
    atom: &str,
    is_adding: bool,
) -> Result<(), ()> {
    if atom.is_empty() {
        return Ok(());
    }

    if let Some((reg, width)) = Register::by_name(atom) {
        if width == Some(16) {
            process_16bit_register(ctx, desc, atom, reg)
        } else {
            process_register_atom(ctx, desc, atom, reg, width, is_adding)
        }
    } else if atom.contains('*') {
        process_scaled_index_atom(ctx, desc, atom, is_adding)
    } else {
        process_numeric_atom(ctx, desc, atom, is_adding)
    }
}

/// Parses the (whitespace-stripped) interior of a `[ … ]` expression.
/// Walks the string atom-by-atom on `+`/`-` boundaries; unlike the
/// original, the trailing atom (after the last separator, or the sole
/// atom when there is no separator at all) is processed too — the
/// worked examples in SPEC_FULL.md §8 require it and nothing in the
/// grammar depends on leaving it unprocessed.
pub(crate) fn parse_memory<W: Write>(
    ctx: &mut Context<W>,
    interior: &str,
) -> Option<MemoryOperandDescriptor> {
    let stripped: String = interior.chars().filter(|c| !c.is_whitespace()).collect();

    let mut desc = MemoryOperandDescriptor::default();
    let mut atom = String::new();
    let mut is_adding = true;

    for c in stripped.chars() {
        if c != '+' && c != '-' {
            atom.push(c);
            continue;
        }
        if process_atom(ctx, &mut desc, &atom, is_adding).is_err() {
            return None;
        }
        is_adding = c == '+';
        atom.clear();
    }
    if process_atom(ctx, &mut desc, &atom, is_adding).is_err() {
        return None;
    }

    match desc.scale {
        0 | 1 | 2 | 4 | 8 => Some(desc),
        other => {
            ctx.raise(AssembleErrorKind::InvalidFinalScale(other as u8));
            None
        }
    }
}

pub(crate) fn build_modrm_core(rm: u8, reg: u8, mod_: u8) -> u8 {
    ((mod_ & 0x3) << 6) | ((reg & 0x7) << 3) | (rm & 0x7)
}

fn build_sib_core(base: u8, index: u8, scale: u8) -> u8 {
    let scl = match scale {
        2 => 0b01,
        4 => 0b10,
        8 => 0b11,
        _ => 0b00,
    };
    (scl << 6) | ((index & 0x7) << 3) | (base & 0x7)
}

fn build_16bit_modrm<W: Write>(
    ctx: &mut Context<W>,
    desc: &MemoryOperandDescriptor,
    rm: u8,
    reg: u8,
) -> Option<MemoryOperand> {
    if desc.disp == 0 {
        Some(MemoryOperand {
            size: 16,
            modrm: build_modrm_core(rm, reg, 0b00),
            has_sib: false,
            sib: 0,
            disp_size: 0,
            disp: 0,
        })
    } else if fits_i8(desc.disp) {
        Some(MemoryOperand {
            size: 16,
            modrm: build_modrm_core(rm, reg, 0b01),
            has_sib: false,
            sib: 0,
            disp_size: 8,
            disp: desc.disp as u64,
        })
    } else if fits_i16(desc.disp) {
        Some(MemoryOperand {
            size: 16,
            modrm: build_modrm_core(rm, reg, 0b10),
            has_sib: false,
            sib: 0,
            disp_size: 16,
            disp: desc.disp as u64,
        })
    } else {
        ctx.raise(AssembleErrorKind::DisplacementTooLarge16(desc.disp));
        None
    }
}

/// A registerless operand (a bare `[disp]`) leaves `desc.size` at 0;
/// its addressing width is then whatever the current bits-mode implies
/// natively, since no register or override narrowed it.
pub(crate) fn resolve_addr_size(size: u8, mode: BitsMode) -> u8 {
    if size != 0 {
        return size;
    }
    match mode {
        BitsMode::M16 => 16,
        _ => 32,
    }
}

/// Turns a descriptor plus the 3-bit `reg_v` field into a concrete
/// `MemoryOperand`. `reg_v` carries either an opcode extension (MI/RI
/// forms) or the "other" register (RR/MR forms).
pub(crate) fn make_modrm_sib<W: Write>(
    ctx: &mut Context<W>,
    mut desc: MemoryOperandDescriptor,
    reg_v: u8,
) -> Option<MemoryOperand> {
    desc.size = resolve_addr_size(desc.size, ctx.mode());
    match desc.size {
        16 => {
            if desc.bx {
                if desc.si {
                    build_16bit_modrm(ctx, &desc, 0b000, reg_v)
                } else if desc.di {
                    build_16bit_modrm(ctx, &desc, 0b001, reg_v)
                } else {
                    build_16bit_modrm(ctx, &desc, 0b111, reg_v)
                }
            } else if desc.bp {
                if desc.si {
                    build_16bit_modrm(ctx, &desc, 0b010, reg_v)
                } else if desc.di {
                    build_16bit_modrm(ctx, &desc, 0b011, reg_v)
                } else if fits_i8(desc.disp) {
                    Some(MemoryOperand {
                        size: 16,
                        modrm: build_modrm_core(0b110, reg_v, 0b01),
                        has_sib: false,
                        sib: 0,
                        disp_size: 8,
                        disp: desc.disp as u64,
                    })
                } else {
                    Some(MemoryOperand {
                        size: 16,
                        modrm: build_modrm_core(0b110, reg_v, 0b10),
                        has_sib: false,
                        sib: 0,
                        disp_size: 16,
                        disp: desc.disp as u64,
                    })
                }
            } else if desc.si {
                build_16bit_modrm(ctx, &desc, 0b100, reg_v)
            } else if desc.di {
                build_16bit_modrm(ctx, &desc, 0b101, reg_v)
            } else {
                Some(MemoryOperand {
                    size: 16,
                    modrm: build_modrm_core(0b110, reg_v, 0b00),
                    has_sib: false,
                    sib: 0,
                    disp_size: 16,
                    disp: desc.disp as u64,
                })
            }
        }
        32 => make_modrm_sib_32(ctx, desc, reg_v),
        _ => None,
    }
}

fn make_modrm_sib_32<W: Write>(
    ctx: &mut Context<W>,
    mut desc: MemoryOperandDescriptor,
    reg_v: u8,
) -> Option<MemoryOperand> {
    if desc.index == Some(ESP_ENCODING) {
        if desc.scale != 1 {
            ctx.raise(AssembleErrorKind::EspAsScaledIndex);
            return None;
        }
        std::mem::swap(&mut desc.base, &mut desc.index);
    }

    if let Some(base) = desc.base {
        if desc.index.is_none() && base != ESP_ENCODING {
            // EBP can never use mod=00 (that encoding means "disp32,
            // no base"), so a zero displacement on EBP still costs a
            // disp8 byte; every other base takes mod=00 with no
            // displacement bytes at all when disp is zero.
            let (disp_size, mod_, disp) = if base == EBP_ENCODING {
                if fits_i8(desc.disp) {
                    (8u8, 0b01u8, desc.disp as u64)
                } else {
                    (32, 0b10, desc.disp as u64)
                }
            } else if desc.disp == 0 {
                (0, 0b00, 0)
            } else if fits_i8(desc.disp) {
                (8, 0b01, desc.disp as u64)
            } else {
                (32, 0b10, desc.disp as u64)
            };
            return Some(MemoryOperand {
                size: 32,
                modrm: build_modrm_core(base, reg_v, mod_),
                has_sib: false,
                sib: 0,
                disp_size,
                disp,
            });
        }
    }

    let sib_rm = ESP_ENCODING;
    let disp_size = if fits_i8(desc.disp) { 8 } else { 32 };
    let mmod = if disp_size == 8 { 0b01 } else { 0b10 };

    if desc.base.is_none() && desc.index.is_none() {
        return Some(MemoryOperand {
            size: 32,
            modrm: build_modrm_core(sib_rm, reg_v, 0b00),
            has_sib: true,
            sib: build_sib_core(EBP_ENCODING, ESP_ENCODING, 0b00),
            disp_size: 32,
            disp: desc.disp as u64,
        });
    }

    if desc.base == Some(EBP_ENCODING) {
        return if let Some(index) = desc.index {
            Some(MemoryOperand {
                size: 32,
                modrm: build_modrm_core(sib_rm, reg_v, mmod),
                has_sib: true,
                sib: build_sib_core(EBP_ENCODING, index, desc.scale as u8),
                disp_size,
                disp: desc.disp as u64,
            })
        } else {
            Some(MemoryOperand {
                size: 32,
                modrm: build_modrm_core(sib_rm, reg_v, mmod),
                has_sib: true,
                sib: build_sib_core(EBP_ENCODING, ESP_ENCODING, 0b00),
                disp_size,
                disp: desc.disp as u64,
            })
        };
    }

    match (desc.base, desc.index) {
        (Some(base), None) => {
            if desc.disp == 0 {
                Some(MemoryOperand {
                    size: 32,
                    modrm: build_modrm_core(sib_rm, reg_v, 0b00),
                    has_sib: true,
                    sib: build_sib_core(base, ESP_ENCODING, 0b00),
                    disp_size: 0,
                    disp: 0,
                })
            } else {
                Some(MemoryOperand {
                    size: 32,
                    modrm: build_modrm_core(sib_rm, reg_v, mmod),
                    has_sib: true,
                    sib: build_sib_core(base, ESP_ENCODING, 0b00),
                    disp_size,
                    disp: desc.disp as u64,
                })
            }
        }
        (None, Some(index)) => Some(MemoryOperand {
            size: 32,
            modrm: build_modrm_core(sib_rm, reg_v, 0b00),
            has_sib: true,
            sib: build_sib_core(EBP_ENCODING, index, desc.scale as u8),
            disp_size: 32,
            disp: desc.disp as u64,
        }),
        (Some(base), Some(index)) => {
            if desc.disp == 0 {
                Some(MemoryOperand {
                    size: 32,
                    modrm: build_modrm_core(sib_rm, reg_v, 0b00),
                    has_sib: true,
                    sib: build_sib_core(base, index, desc.scale as u8),
                    disp_size: 0,
                    disp: 0,
                })
            } else {
                Some(MemoryOperand {
                    size: 32,
                    modrm: build_modrm_core(sib_rm, reg_v, mmod),
                    has_sib: true,
                    sib: build_sib_core(base, index, desc.scale as u8),
                    disp_size,
                    disp: desc.disp as u64,
                })
            }
        }
        (None, None) => unreachable!("handled by the no-base/no-index branch above"),
    }
}

/// Writes the displacement bytes for a 16-bit-addressed operand.
pub(crate) fn output_disp_16<W: Write>(ctx: &mut Context<W>, disp_size: u8, disp: u64) -> std::io::Result<()> {
    match disp_size {
        8 => ctx.emit_byte(disp as u8),
        16 => ctx.emit(&(disp as u16).to_le_bytes()),
        _ => Ok(()),
    }
}

/// Writes the displacement bytes for a 32-bit-addressed operand.
pub(crate) fn output_disp_32<W: Write>(ctx: &mut Context<W>, disp_size: u8, disp: u64) -> std::io::Result<()> {
    match disp_size {
        8 => ctx.emit_byte(disp as u8),
        32 => ctx.emit(&(disp as u32).to_le_bytes()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Option<MemoryOperandDescriptor> {
        let mut ctx = Context::new(Vec::new());
        parse_memory(&mut ctx, s)
    }

    #[test]
    fn bx_si_pair() {
        let desc = parse("BX+SI").unwrap();
        assert_eq!(desc.size, 16);
        assert!(desc.bx && desc.si);
    }

    #[test]
    fn rejects_bx_bp_combination() {
        let mut ctx = Context::new(Vec::new());
        assert!(parse_memory(&mut ctx, "BX+BP").is_none());
        assert!(ctx.has_failed());
    }

    #[test]
    fn trailing_atom_is_processed() {
        let desc = parse("BX+SI+4").unwrap();
        assert_eq!(desc.disp, 4);
    }

    #[test]
    fn scaled_index_32bit() {
        let desc = parse("2*EAX+EBX+0x10").unwrap();
        assert_eq!(desc.size, 32);
        assert_eq!(desc.scale, 2);
        assert_eq!(desc.index, Some(Register::Eax.encoding()));
        assert_eq!(desc.base, Some(Register::Ebx.encoding()));
        assert_eq!(desc.disp, 0x10);
    }

    #[test]
    fn synthesizes_ebp_zero_disp_as_disp8() {
        let desc = parse("EBP").unwrap();
        let mop = {
            let mut ctx = Context::new(Vec::new());
            make_modrm_sib(&mut ctx, desc, 0b000).unwrap()
        };
        assert!(!mop.has_sib);
        assert_eq!(mop.modrm, 0x45);
        assert_eq!(mop.disp_size, 8);
        assert_eq!(mop.disp, 0);
    }

    #[test]
    fn synthesizes_esp_as_base_with_sib() {
        let desc = parse("ESP").unwrap();
        let mop = {
            let mut ctx = Context::new(Vec::new());
            make_modrm_sib(&mut ctx, desc, 0b000).unwrap()
        };
        assert!(mop.has_sib);
        assert_eq!(mop.modrm, 0x04);
        assert_eq!(mop.sib, 0x24);
    }

    #[test]
    fn synthesizes_scaled_index_with_sib_disp8() {
        let desc = parse("2*EAX+EBX+0x10").unwrap();
        let mop = {
            let mut ctx = Context::new(Vec::new());
            make_modrm_sib(&mut ctx, desc, 0b001).unwrap()
        };
        assert!(mop.has_sib);
        assert_eq!(mop.modrm, 0x4C);
        assert_eq!(mop.sib, 0x43);
        assert_eq!(mop.disp_size, 8);
        assert_eq!(mop.disp, 0x10);
    }

    #[test]
    fn synthesizes_pure_displacement_as_disp32_sib() {
        // `[0x1000]` under BITS 32 — no base, no index. Must not panic
        // and must take the disp32/no-base SIB escape, not a bogus
        // EBP-as-base encoding.
        let desc = parse("0x1000").unwrap();
        assert!(desc.base.is_none() && desc.index.is_none());
        let mut ctx = Context::new(Vec::new());
        ctx.change_bits_mode("32");
        let mop = make_modrm_sib(&mut ctx, desc, 0b000).unwrap();
        assert!(mop.has_sib);
        assert_eq!(mop.modrm & 0b11_000_111, 0b00_000_100);
        assert_eq!(mop.sib, 0x25);
        assert_eq!(mop.disp_size, 32);
        assert_eq!(mop.disp, 0x1000);
    }

    #[test]
    fn synthesizes_pure_zero_displacement_without_panicking() {
        // `[0]` — base=None, index=None, disp=0. Previously routed
        // through the EBP zero-disp branch via `base.unwrap()`, which
        // panics when base is actually absent.
        let desc = parse("0").unwrap();
        let mut ctx = Context::new(Vec::new());
        ctx.change_bits_mode("32");
        let mop = make_modrm_sib(&mut ctx, desc, 0b000).unwrap();
        assert!(mop.has_sib);
        assert_eq!(mop.disp_size, 32);
        assert_eq!(mop.disp, 0);
    }

    #[test]
    fn synthesizes_ebp_plus_disp_without_forcing_sib() {
        // `[EBP+0x10]` must encode as a plain disp8 ModR/M (mod=01,
        // rm=EBP), matching every other base register's treatment —
        // not an extra SIB byte.
        let desc = parse("EBP+0x10").unwrap();
        let mut ctx = Context::new(Vec::new());
        let mop = make_modrm_sib(&mut ctx, desc, 0b000).unwrap();
        assert!(!mop.has_sib);
        assert_eq!(mop.modrm, 0x45);
        assert_eq!(mop.disp_size, 8);
        assert_eq!(mop.disp, 0x10);
    }

    #[test]
    fn esp_as_index_errors_unless_scale_one() {
        let mut ctx = Context::new(Vec::new());
        // EBX+2*ESP: ESP enters as index with scale 2, which is illegal.
        let desc = parse_memory(&mut ctx, "EBX+2*ESP").unwrap();
        assert!(make_modrm_sib(&mut ctx, desc, 0).is_none());
        assert!(ctx.has_failed());
    }
}
