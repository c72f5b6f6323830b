//! The decoded-instruction model the external decoder targets.
//!
//! The decoder pulls raw bytes through [`InsnStream`] (which the CPU
//! implements on top of its fetch cache), resolves prefixes and operands
//! into an [`Insn`], and hands it to `SoftCpu::exec`. The interpreter never
//! sees instruction bytes.

use crate::op::Op;
use crate::regs::{Reg32, SegReg};
use crate::trap::Trap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AddressSize {
    A16,
    #[default]
    A32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OperandSize {
    O16,
    #[default]
    O32,
}

/// Repeat prefix as decoded: `F3` is REP/REPZ, `F2` is REPNZ; which ZF test
/// applies (if any) depends on the string opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RepPrefix {
    #[default]
    None,
    Repz,
    Repnz,
}

/// A memory operand before effective-address computation: base, scaled
/// index and displacement. 16-bit forms (`[bx+si+disp]`) are expressed with
/// the same fields and masked during resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct MemRef {
    pub base: Option<Reg32>,
    pub index: Option<Reg32>,
    pub scale: u8,
    pub disp: i32,
}

impl MemRef {
    pub fn absolute(disp: i32) -> Self {
        MemRef {
            disp,
            ..Default::default()
        }
    }

    pub fn base(reg: Reg32) -> Self {
        MemRef {
            base: Some(reg),
            ..Default::default()
        }
    }

    pub fn base_disp(reg: Reg32, disp: i32) -> Self {
        MemRef {
            base: Some(reg),
            disp,
            ..Default::default()
        }
    }

    /// Stack-relative bases default to the SS segment.
    pub fn default_segment(&self) -> SegReg {
        match self.base {
            Some(Reg32::Esp) | Some(Reg32::Ebp) => SegReg::Ss,
            _ => SegReg::Ds,
        }
    }
}

/// The ModRM r/m operand: either a register or a memory reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModRm {
    Reg(u8),
    Mem(MemRef),
}

impl ModRm {
    pub fn is_register(&self) -> bool {
        matches!(self, ModRm::Reg(_))
    }
}

/// One decoded instruction.
///
/// `reg` holds the ModRM reg field, a `+r` register index, or a group
/// opcode's slot, whichever the encoding uses. Far-pointer immediates put
/// the offset in `imm1` and the selector in `imm2`; ENTER puts the frame
/// size in `imm1` and the nesting level in `imm2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Insn {
    pub op: Op,
    pub modrm: Option<ModRm>,
    pub reg: u8,
    pub seg_override: Option<SegReg>,
    pub rep: RepPrefix,
    pub address_size: AddressSize,
    pub operand_size: OperandSize,
    pub imm1: u32,
    pub imm2: u32,
    /// Condition-code nibble for Jcc/SETcc/CMOVcc.
    pub cc: u8,
}

impl Insn {
    pub fn new(op: Op) -> Self {
        Insn {
            op,
            modrm: None,
            reg: 0,
            seg_override: None,
            rep: RepPrefix::None,
            address_size: AddressSize::A32,
            operand_size: OperandSize::O32,
            imm1: 0,
            imm2: 0,
            cc: 0,
        }
    }

    pub fn with_modrm(mut self, modrm: ModRm) -> Self {
        self.modrm = Some(modrm);
        self
    }

    pub fn with_reg(mut self, reg: u8) -> Self {
        self.reg = reg;
        self
    }

    pub fn with_imm1(mut self, imm: u32) -> Self {
        self.imm1 = imm;
        self
    }

    pub fn with_imm2(mut self, imm: u32) -> Self {
        self.imm2 = imm;
        self
    }

    pub fn with_cc(mut self, cc: u8) -> Self {
        self.cc = cc;
        self
    }

    pub fn with_rep(mut self, rep: RepPrefix) -> Self {
        self.rep = rep;
        self
    }

    pub fn with_seg_override(mut self, seg: SegReg) -> Self {
        self.seg_override = Some(seg);
        self
    }

    pub fn with_address_size(mut self, size: AddressSize) -> Self {
        self.address_size = size;
        self
    }

    pub fn rm(&self) -> ModRm {
        self.modrm
            .unwrap_or_else(|| panic!("decoder contract violation: {:?} without ModRM", self.op))
    }

    pub fn imm8(&self) -> u8 {
        self.imm1 as u8
    }

    pub fn imm16(&self) -> u16 {
        self.imm1 as u16
    }

    pub fn imm32(&self) -> u32 {
        self.imm1
    }

    /// imm8 sign-extended to 16 bits (the `83 /r ib` class).
    pub fn imm8_sx16(&self) -> u16 {
        self.imm1 as u8 as i8 as i16 as u16
    }

    /// imm8 sign-extended to 32 bits.
    pub fn imm8_sx32(&self) -> u32 {
        self.imm1 as u8 as i8 as i32 as u32
    }

    /// imm8 as a signed branch displacement.
    pub fn rel8(&self) -> i32 {
        self.imm1 as u8 as i8 as i32
    }

    /// imm16/imm32 as a signed branch displacement.
    pub fn rel(&self) -> i32 {
        match self.operand_size {
            OperandSize::O16 => self.imm1 as u16 as i16 as i32,
            OperandSize::O32 => self.imm1 as i32,
        }
    }
}

/// The byte-stream interface the decoder consumes. Fetches advance EIP;
/// they either succeed or fault, so `can_read` always answers `false` (the
/// stream is unbounded from the decoder's perspective).
pub trait InsnStream {
    fn can_read(&self) -> bool;
    fn read_u8(&mut self) -> Result<u8, Trap>;
    fn read_u16(&mut self) -> Result<u16, Trap>;
    fn read_u32(&mut self) -> Result<u32, Trap>;
    fn read_u64(&mut self) -> Result<u64, Trap>;
}
