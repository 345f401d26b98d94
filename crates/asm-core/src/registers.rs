// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

//! The fixed register catalog: textual name -> `(Register, width)`, and
//! `Register -> 3-bit ModR/M encoding`. Grounded on `src/registers.cpp`
//! / `include/registers.hpp` of the original implementation — the name
//! table and the encoding table below are transcribed verbatim from
//! there, including the fact that AL/AX/EAX alias encoding 0 through
//! BH/DI/EDI aliasing encoding 7, and the segment encodings ES=0
//! through GS=5.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    Al,
    Ah,
    Ax,
    Eax,
    Bl,
    Bh,
    Bx,
    Ebx,
    Cl,
    Ch,
    Cx,
    Ecx,
    Dl,
    Dh,
    Dx,
    Edx,
    Si,
    Esi,
    Di,
    Edi,
    Sp,
    Esp,
    Bp,
    Ebp,
    Cs,
    Ds,
    Es,
    Fs,
    Gs,
    Ss,
}

impl Register {
    /// Looks up a register by its (already-uppercased) textual name,
    /// returning the register identity and its width in bits, or
    /// `None` for the segment registers — the original's "−1" width is
    /// modeled as `Option::None` here rather than a sentinel.
    pub fn by_name(name: &str) -> Option<(Register, Option<u8>)> {
        use Register::*;
        Some(match name {
            "AL" => (Al, Some(8)),
            "AH" => (Ah, Some(8)),
            "AX" => (Ax, Some(16)),
            "EAX" => (Eax, Some(32)),
            "BL" => (Bl, Some(8)),
            "BH" => (Bh, Some(8)),
            "BX" => (Bx, Some(16)),
            "EBX" => (Ebx, Some(32)),
            "CL" => (Cl, Some(8)),
            "CH" => (Ch, Some(8)),
            "CX" => (Cx, Some(16)),
            "ECX" => (Ecx, Some(32)),
            "DL" => (Dl, Some(8)),
            "DH" => (Dh, Some(8)),
            "DX" => (Dx, Some(16)),
            "EDX" => (Edx, Some(32)),
            "SI" => (Si, Some(16)),
            "ESI" => (Esi, Some(32)),
            "DI" => (Di, Some(16)),
            "EDI" => (Edi, Some(32)),
            "SP" => (Sp, Some(16)),
            "ESP" => (Esp, Some(32)),
            "BP" => (Bp, Some(16)),
            "EBP" => (Ebp, Some(32)),
            "CS" => (Cs, None),
            "DS" => (Ds, None),
            "ES" => (Es, None),
            "FS" => (Fs, None),
            "GS" => (Gs, None),
            "SS" => (Ss, None),
            _ => return None,
        })
    }

    /// The 3-bit ModR/M/SIB encoding. 8/16/32-bit registers sharing a
    /// positional index share an encoding.
    pub fn encoding(self) -> u8 {
        use Register::*;
        match self {
            Al | Ax | Eax | Es => 0b000,
            Cl | Cx | Ecx | Cs => 0b001,
            Dl | Dx | Edx | Ss => 0b010,
            Bl | Bx | Ebx | Ds => 0b011,
            Ah | Sp | Esp | Fs => 0b100,
            Ch | Bp | Ebp | Gs => 0b101,
            Dh | Si | Esi => 0b110,
            Bh | Di | Edi => 0b111,
        }
    }

    pub fn is_segment(self) -> bool {
        use Register::*;
        matches!(self, Cs | Ds | Es | Fs | Gs | Ss)
    }

    pub fn is_8bit(self) -> bool {
        use Register::*;
        matches!(self, Al | Ah | Bl | Bh | Cl | Ch | Dl | Dh)
    }

    pub fn is_16bit(self) -> bool {
        use Register::*;
        matches!(self, Ax | Bx | Cx | Dx | Si | Di | Sp | Bp)
    }

    pub fn is_32bit(self) -> bool {
        use Register::*;
        matches!(self, Eax | Ebx | Ecx | Edx | Esi | Edi | Esp | Ebp)
    }
}

pub(crate) const ESP_ENCODING: u8 = 0b100;
pub(crate) const EBP_ENCODING: u8 = 0b101;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_purpose_aliases_share_encodings() {
        assert_eq!(Register::Al.encoding(), 0);
        assert_eq!(Register::Ax.encoding(), 0);
        assert_eq!(Register::Eax.encoding(), 0);
        assert_eq!(Register::Bh.encoding(), 7);
        assert_eq!(Register::Di.encoding(), 7);
        assert_eq!(Register::Edi.encoding(), 7);
    }

    #[test]
    fn segment_encodings_match_original() {
        assert_eq!(Register::Es.encoding(), 0);
        assert_eq!(Register::Cs.encoding(), 1);
        assert_eq!(Register::Ss.encoding(), 2);
        assert_eq!(Register::Ds.encoding(), 3);
        assert_eq!(Register::Fs.encoding(), 4);
        assert_eq!(Register::Gs.encoding(), 5);
    }

    #[test]
    fn by_name_is_case_sensitive_on_uppercase_input() {
        let (reg, width) = Register::by_name("ESP").unwrap();
        assert_eq!(reg, Register::Esp);
        assert_eq!(width, Some(32));
        assert!(Register::by_name("esp").is_none());
    }
}
