// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

/* *
 * A single-pass, line-oriented 16/32-bit x86 assembler core.
 *
 * The limitations of this encoder:
 * - Legacy (non-REX) encodings only, 16-bit and 32-bit modes.
 * - 64-bit mode is recognised by the `BITS` directive but every
 *   emission path rejects it.
 * - Only the zero-operand instruction family and the eight two-operand
 *   ALU mnemonics (ADC, ADD, AND, CMP, OR, SBB, SUB, XOR) are wired up.
 * - No labels, symbols, macros, or linker output; a source line either
 *   emits a contiguous run of bytes or emits nothing.
 */

mod alu;
mod context;
mod error;
mod format;
mod memory;
mod numeric;
mod operand;
mod registers;
mod zo;

pub mod driver;

pub use context::{BitsMode, Context};
pub use error::{AssembleErrorKind, Diagnostic, Severity};
pub use memory::{MemoryOperand, MemoryOperandDescriptor};
pub use operand::AsmArg;
pub use registers::Register;

pub use driver::assemble_source;
