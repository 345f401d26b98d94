// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

//! The zero-operand instruction family: a static mnemonic -> encoding
//! table and its one dispatcher. Grounded on `src/formats/zo.cpp` of
//! the original implementation; table entries are transcribed
//! verbatim, entry by entry, from `ZOTable`.

use std::io;
use std::io::Write;

use crate::context::{BitsMode, Context};
use crate::error::AssembleErrorKind;
use crate::operand;

/// One static zero-operand encoding. `mode_prefix` fires `prefix` only
/// when the active bits-mode equals `mode`; `None` means "never fires".
#[derive(Debug, Clone, Copy)]
pub(crate) struct ZoInstruction {
    pub opcode: &'static [u8],
    pub forbidden_prefixes: &'static [u8],
    pub mode_prefix: Option<(BitsMode, u8)>,
    pub other_prefixes: &'static [u8],
}

const fn zo(opcode: &'static [u8]) -> ZoInstruction {
    ZoInstruction {
        opcode,
        forbidden_prefixes: &[],
        mode_prefix: None,
        other_prefixes: &[],
    }
}

const fn zo_forbidden(opcode: &'static [u8], forbidden_prefixes: &'static [u8]) -> ZoInstruction {
    ZoInstruction {
        opcode,
        forbidden_prefixes,
        mode_prefix: None,
        other_prefixes: &[],
    }
}

/// `AAA` … `XTEST`, transcribed from `ZOTable` in the original.
pub(crate) fn lookup(mnemonic: &str) -> Option<ZoInstruction> {
    Some(match mnemonic {
        "AAA" => zo(&[0x37]),
        "AAD" => zo(&[0xD5, 0x0A]),
        "AAM" => zo(&[0xD4, 0x0A]),
        "AAS" => zo(&[0x3F]),
        "CBW" => ZoInstruction {
            opcode: &[0x98],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M32, 0x66)),
            other_prefixes: &[],
        },
        "CWDE" => ZoInstruction {
            opcode: &[0x98],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M16, 0x66)),
            other_prefixes: &[],
        },
        "CWD" => ZoInstruction {
            opcode: &[0x99],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M32, 0x66)),
            other_prefixes: &[],
        },
        "CDQ" => ZoInstruction {
            opcode: &[0x99],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M16, 0x66)),
            other_prefixes: &[],
        },
        "CLAC" => zo_forbidden(&[0x0F, 0x01, 0xCA], &[0x66, 0xF2, 0xF3]),
        "CLC" => zo(&[0xF8]),
        "CLD" => zo(&[0xFC]),
        "CLI" => zo(&[0xFA]),
        "CLTS" => zo(&[0x0F, 0x06]),
        "CMC" => zo(&[0xF5]),
        "CMPSB" => zo(&[0xA6]),
        "CMPSW" => ZoInstruction {
            opcode: &[0xA7],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M32, 0x66)),
            other_prefixes: &[],
        },
        "CMPSD" => ZoInstruction {
            opcode: &[0xA7],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M16, 0x66)),
            other_prefixes: &[],
        },
        "CPUID" => zo(&[0x0F, 0xA2]),
        "DAA" => zo(&[0x27]),
        "DAS" => zo(&[0x2F]),
        "ENDBR32" => zo(&[0xF3, 0x0F, 0x1E, 0xFB]),
        "ENDBR64" => zo(&[0xF3, 0x0F, 0x1E, 0xFA]),
        "HLT" => zo(&[0xF4]),
        "INSB" => zo(&[0x6C]),
        "INSW" => ZoInstruction {
            opcode: &[0x6D],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M32, 0x66)),
            other_prefixes: &[],
        },
        "INSD" => ZoInstruction {
            opcode: &[0x6D],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M16, 0x66)),
            other_prefixes: &[],
        },
        "INT1" => zo(&[0xF1]),
        "INT3" => zo(&[0xCC]),
        "INTO" => zo(&[0xCE]),
        "INVD" => zo(&[0x0F, 0x08]),
        "IRET" => ZoInstruction {
            opcode: &[0xCF],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M32, 0x66)),
            other_prefixes: &[],
        },
        "IRETD" => ZoInstruction {
            opcode: &[0xCF],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M16, 0x66)),
            other_prefixes: &[],
        },
        "LAHF" => zo(&[0x9F]),
        "LEAVE" => zo(&[0xC9]),
        "LFENCE" => zo_forbidden(&[0x0F, 0xAE, 0xE8], &[0x66, 0xF2, 0xF3]),
        "LODSB" => zo(&[0xAC]),
        "LODSW" => ZoInstruction {
            opcode: &[0xAD],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M32, 0x66)),
            other_prefixes: &[],
        },
        "LODSD" => ZoInstruction {
            opcode: &[0xAD],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M16, 0x66)),
            other_prefixes: &[],
        },
        "MFENCE" => zo_forbidden(&[0x0F, 0xAE, 0xF0], &[0x66, 0xF2, 0xF3]),
        "MOVSB" => zo(&[0xA4]),
        "MOVSW" => ZoInstruction {
            opcode: &[0xA5],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M32, 0x66)),
            other_prefixes: &[],
        },
        "MOVSD" => ZoInstruction {
            opcode: &[0xA5],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M16, 0x66)),
            other_prefixes: &[],
        },
        "OUTSB" => zo(&[0x6E]),
        "OUTSW" => ZoInstruction {
            opcode: &[0x6F],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M32, 0x66)),
            other_prefixes: &[],
        },
        "OUTSD" => ZoInstruction {
            opcode: &[0x6F],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M16, 0x66)),
            other_prefixes: &[],
        },
        "PAUSE" => zo(&[0xF3, 0x90]),
        "PCONFIG" => zo_forbidden(&[0x0F, 0x01, 0xC5], &[0x66, 0xF2, 0xF3]),
        "POPA" => ZoInstruction {
            opcode: &[0x61],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M32, 0x66)),
            other_prefixes: &[],
        },
        "POPAD" => ZoInstruction {
            opcode: &[0x61],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M16, 0x66)),
            other_prefixes: &[],
        },
        "POPF" => ZoInstruction {
            opcode: &[0x9D],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M32, 0x66)),
            other_prefixes: &[],
        },
        "POPFD" => ZoInstruction {
            opcode: &[0x9D],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M16, 0x66)),
            other_prefixes: &[],
        },
        "PUSHA" => ZoInstruction {
            opcode: &[0x60],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M32, 0x66)),
            other_prefixes: &[],
        },
        "PUSHAD" => ZoInstruction {
            opcode: &[0x60],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M16, 0x66)),
            other_prefixes: &[],
        },
        "PUSHF" => ZoInstruction {
            opcode: &[0x9C],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M32, 0x66)),
            other_prefixes: &[],
        },
        "PUSHFD" => ZoInstruction {
            opcode: &[0x9C],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M16, 0x66)),
            other_prefixes: &[],
        },
        "RDMSR" => zo(&[0x0F, 0x32]),
        "RDPKRU" => zo_forbidden(&[0x0F, 0x01, 0xEE], &[0x66, 0xF2, 0xF3]),
        "RDPMC" => zo(&[0x0F, 0x33]),
        "RDTSC" => zo(&[0x0F, 0x31]),
        "RDTSCP" => zo(&[0x0F, 0x01, 0xF9]),
        "RSM" => zo(&[0x0F, 0xAA]),
        "SAHF" => zo(&[0x9E]),
        "SAVEPREVSSP" => zo(&[0xF3, 0x0F, 0x01, 0xEA]),
        "SCASB" => zo(&[0xAE]),
        "SCASW" => ZoInstruction {
            opcode: &[0xAF],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M32, 0x66)),
            other_prefixes: &[],
        },
        "SCASD" => ZoInstruction {
            opcode: &[0xAF],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M16, 0x66)),
            other_prefixes: &[],
        },
        "SERIALIZE" => zo_forbidden(&[0x0F, 0x01, 0xE8], &[0x66, 0xF2, 0xF3]),
        "SETSSBSY" => zo(&[0xF3, 0x0F, 0x01, 0xE8]),
        "SFENCE" => zo_forbidden(&[0x0F, 0xAE, 0xF8], &[0x66, 0xF2, 0xF3]),
        "STAC" => zo_forbidden(&[0x0F, 0x01, 0xCB], &[0x66, 0xF2, 0xF3]),
        "STC" => zo(&[0xF9]),
        "STD" => zo(&[0xFD]),
        "STI" => zo(&[0xFB]),
        "STOSB" => zo(&[0xAA]),
        "STOSW" => ZoInstruction {
            opcode: &[0xAB],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M32, 0x66)),
            other_prefixes: &[],
        },
        "STOSD" => ZoInstruction {
            opcode: &[0xAB],
            forbidden_prefixes: &[],
            mode_prefix: Some((BitsMode::M16, 0x66)),
            other_prefixes: &[],
        },
        "UD2" => zo(&[0x0F, 0x0B]),
        "WBINVD" => zo(&[0x0F, 0x09]),
        "WBNOINVD" => zo(&[0xF3, 0x0F, 0x09]),
        "WRMSR" => zo(&[0x0F, 0x30]),
        "WRPKRU" => zo_forbidden(&[0x0F, 0x01, 0xEF], &[0x66, 0xF2, 0xF3]),
        "XGETBV" => zo_forbidden(&[0x0F, 0x01, 0xD0], &[0x66, 0xF2, 0xF3]),
        "XLATB" => zo(&[0xD7]),
        "XRESLDTRK" => zo(&[0xF2, 0x0F, 0x01, 0xE9]),
        "XSETBV" => zo_forbidden(&[0x0F, 0x01, 0xD1], &[0x66, 0xF2, 0xF3]),
        "XSUSLDTRK" => zo(&[0xF2, 0x0F, 0x01, 0xE8]),
        "MONITOR" => zo(&[0x0F, 0x01, 0xC8]),
        "MWAIT" => zo(&[0x0F, 0x01, 0xC9]),
        "SYSENTER" => zo(&[0x0F, 0x34]),
        "SYSEXIT" => zo(&[0x0F, 0x35]),
        "XTEST" => zo_forbidden(&[0x0F, 0x01, 0xD6], &[0x66, 0xF2, 0xF3]),
        _ => return None,
    })
}

/// Rejects a non-empty trailing argument tail, checks forbidden
/// prefixes against the queue, then flushes the contextual prefixes
/// and emits mode-prefix / other-prefixes / opcode in that order.
pub(crate) fn assemble_zo<W: Write>(
    ctx: &mut Context<W>,
    mnemonic: &str,
    instruction: ZoInstruction,
    args: &str,
) -> io::Result<()> {
    if operand::parse_arguments(ctx, mnemonic, args, 0).is_none() {
        return Ok(());
    }

    for &prefix in instruction.forbidden_prefixes {
        if ctx.contextual_prefixes.contains(&prefix) {
            ctx.raise(AssembleErrorKind::ForbiddenPrefix {
                prefix,
                instruction: mnemonic.to_string(),
            });
            return Ok(());
        }
    }

    ctx.flush_contextual_prefixes()?;

    if let Some((mode, prefix)) = instruction.mode_prefix {
        if ctx.mode() == mode {
            ctx.emit_byte(prefix)?;
        }
    }
    ctx.emit(instruction.other_prefixes)?;
    ctx.emit(instruction.opcode)
}
