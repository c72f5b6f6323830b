//! The instruction interpreter: one handler per decoded opcode.
//!
//! [`SoftCpu::exec`] is the single entry point the decoder dispatches
//! into. The match routes each catalog entry to its handler; the ALU,
//! shift and bit families go through the width-generic templates in the
//! submodules.

pub(crate) mod bcd;
pub(crate) mod bits;
pub(crate) mod control;
pub(crate) mod mov;
pub(crate) mod muldiv;
pub(crate) mod ops;
pub(crate) mod shift;
pub(crate) mod stack;
pub(crate) mod string;
pub(crate) mod system;

use umbra_shadow::{Shadowed, Word};

use crate::cpu::SoftCpu;
use crate::insn::{Insn, OperandSize};
use crate::mem::Mmu;
use crate::op::{Op, X87Op};
use crate::regs::SegReg;
use crate::trap::Trap;

use bits::BitOp;
use ops::{op_adc, op_add, op_and, op_or, op_sbb, op_sub, op_xor};
use shift::{op_rcl, op_rcr, op_rol, op_ror, op_sar, op_shl, op_shr, ShiftOp};

impl<M: Mmu> SoftCpu<M> {
    /// Execute one decoded instruction. EIP already points past it; a
    /// trap hands control to the emulator with architectural state
    /// unmodified by the faulting handler.
    pub fn exec(&mut self, insn: &Insn) -> Result<(), Trap> {
        self.tsc = self.tsc.wrapping_add(1);
        match insn.op {
            // --- BCD adjusts -------------------------------------------
            Op::Aaa => {
                self.aaa();
                Ok(())
            }
            Op::Aad => {
                self.aad(insn);
                Ok(())
            }
            Op::Aam => self.aam(insn),
            Op::Aas => {
                self.aas();
                Ok(())
            }
            Op::Daa => {
                self.daa();
                Ok(())
            }
            Op::Das => {
                self.das();
                Ok(())
            }

            // --- ADC ---------------------------------------------------
            Op::AdcAlImm8 => self.generic_acc_imm::<u8>(insn.imm8(), op_adc, true),
            Op::AdcAxImm16 => self.generic_acc_imm::<u16>(insn.imm16(), op_adc, true),
            Op::AdcEaxImm32 => self.generic_acc_imm::<u32>(insn.imm32(), op_adc, true),
            Op::AdcRm8Imm8 => self.generic_rm_imm::<u8>(insn, insn.imm8(), op_adc, true),
            Op::AdcRm16Imm16 => self.generic_rm_imm::<u16>(insn, insn.imm16(), op_adc, true),
            Op::AdcRm16Imm8 => self.generic_rm_imm::<u16>(insn, insn.imm8_sx16(), op_adc, true),
            Op::AdcRm32Imm32 => self.generic_rm_imm::<u32>(insn, insn.imm32(), op_adc, true),
            Op::AdcRm32Imm8 => self.generic_rm_imm::<u32>(insn, insn.imm8_sx32(), op_adc, true),
            Op::AdcRm8Reg8 => self.generic_rm_reg::<u8>(insn, op_adc, true, false),
            Op::AdcRm16Reg16 => self.generic_rm_reg::<u16>(insn, op_adc, true, false),
            Op::AdcRm32Reg32 => self.generic_rm_reg::<u32>(insn, op_adc, true, false),
            Op::AdcReg8Rm8 => self.generic_reg_rm::<u8>(insn, op_adc, true, false),
            Op::AdcReg16Rm16 => self.generic_reg_rm::<u16>(insn, op_adc, true, false),
            Op::AdcReg32Rm32 => self.generic_reg_rm::<u32>(insn, op_adc, true, false),

            // --- ADD ---------------------------------------------------
            Op::AddAlImm8 => self.generic_acc_imm::<u8>(insn.imm8(), op_add, true),
            Op::AddAxImm16 => self.generic_acc_imm::<u16>(insn.imm16(), op_add, true),
            Op::AddEaxImm32 => self.generic_acc_imm::<u32>(insn.imm32(), op_add, true),
            Op::AddRm8Imm8 => self.generic_rm_imm::<u8>(insn, insn.imm8(), op_add, true),
            Op::AddRm16Imm16 => self.generic_rm_imm::<u16>(insn, insn.imm16(), op_add, true),
            Op::AddRm16Imm8 => self.generic_rm_imm::<u16>(insn, insn.imm8_sx16(), op_add, true),
            Op::AddRm32Imm32 => self.generic_rm_imm::<u32>(insn, insn.imm32(), op_add, true),
            Op::AddRm32Imm8 => self.generic_rm_imm::<u32>(insn, insn.imm8_sx32(), op_add, true),
            Op::AddRm8Reg8 => self.generic_rm_reg::<u8>(insn, op_add, true, false),
            Op::AddRm16Reg16 => self.generic_rm_reg::<u16>(insn, op_add, true, false),
            Op::AddRm32Reg32 => self.generic_rm_reg::<u32>(insn, op_add, true, false),
            Op::AddReg8Rm8 => self.generic_reg_rm::<u8>(insn, op_add, true, false),
            Op::AddReg16Rm16 => self.generic_reg_rm::<u16>(insn, op_add, true, false),
            Op::AddReg32Rm32 => self.generic_reg_rm::<u32>(insn, op_add, true, false),

            // --- AND ---------------------------------------------------
            Op::AndAlImm8 => self.generic_acc_imm::<u8>(insn.imm8(), op_and, true),
            Op::AndAxImm16 => self.generic_acc_imm::<u16>(insn.imm16(), op_and, true),
            Op::AndEaxImm32 => self.generic_acc_imm::<u32>(insn.imm32(), op_and, true),
            Op::AndRm8Imm8 => self.generic_rm_imm::<u8>(insn, insn.imm8(), op_and, true),
            Op::AndRm16Imm16 => self.generic_rm_imm::<u16>(insn, insn.imm16(), op_and, true),
            Op::AndRm16Imm8 => self.generic_rm_imm::<u16>(insn, insn.imm8_sx16(), op_and, true),
            Op::AndRm32Imm32 => self.generic_rm_imm::<u32>(insn, insn.imm32(), op_and, true),
            Op::AndRm32Imm8 => self.generic_rm_imm::<u32>(insn, insn.imm8_sx32(), op_and, true),
            Op::AndRm8Reg8 => self.generic_rm_reg::<u8>(insn, op_and, true, false),
            Op::AndRm16Reg16 => self.generic_rm_reg::<u16>(insn, op_and, true, false),
            Op::AndRm32Reg32 => self.generic_rm_reg::<u32>(insn, op_and, true, false),
            Op::AndReg8Rm8 => self.generic_reg_rm::<u8>(insn, op_and, true, false),
            Op::AndReg16Rm16 => self.generic_reg_rm::<u16>(insn, op_and, true, false),
            Op::AndReg32Rm32 => self.generic_reg_rm::<u32>(insn, op_and, true, false),

            // --- OR ----------------------------------------------------
            Op::OrAlImm8 => self.generic_acc_imm::<u8>(insn.imm8(), op_or, true),
            Op::OrAxImm16 => self.generic_acc_imm::<u16>(insn.imm16(), op_or, true),
            Op::OrEaxImm32 => self.generic_acc_imm::<u32>(insn.imm32(), op_or, true),
            Op::OrRm8Imm8 => self.generic_rm_imm::<u8>(insn, insn.imm8(), op_or, true),
            Op::OrRm16Imm16 => self.generic_rm_imm::<u16>(insn, insn.imm16(), op_or, true),
            Op::OrRm16Imm8 => self.generic_rm_imm::<u16>(insn, insn.imm8_sx16(), op_or, true),
            Op::OrRm32Imm32 => self.generic_rm_imm::<u32>(insn, insn.imm32(), op_or, true),
            Op::OrRm32Imm8 => self.generic_rm_imm::<u32>(insn, insn.imm8_sx32(), op_or, true),
            Op::OrRm8Reg8 => self.generic_rm_reg::<u8>(insn, op_or, true, false),
            Op::OrRm16Reg16 => self.generic_rm_reg::<u16>(insn, op_or, true, false),
            Op::OrRm32Reg32 => self.generic_rm_reg::<u32>(insn, op_or, true, false),
            Op::OrReg8Rm8 => self.generic_reg_rm::<u8>(insn, op_or, true, false),
            Op::OrReg16Rm16 => self.generic_reg_rm::<u16>(insn, op_or, true, false),
            Op::OrReg32Rm32 => self.generic_reg_rm::<u32>(insn, op_or, true, false),

            // --- XOR (self-xor is a defined zero idiom) ---------------
            Op::XorAlImm8 => self.generic_acc_imm::<u8>(insn.imm8(), op_xor, true),
            Op::XorAxImm16 => self.generic_acc_imm::<u16>(insn.imm16(), op_xor, true),
            Op::XorEaxImm32 => self.generic_acc_imm::<u32>(insn.imm32(), op_xor, true),
            Op::XorRm8Imm8 => self.generic_rm_imm::<u8>(insn, insn.imm8(), op_xor, true),
            Op::XorRm16Imm16 => self.generic_rm_imm::<u16>(insn, insn.imm16(), op_xor, true),
            Op::XorRm16Imm8 => self.generic_rm_imm::<u16>(insn, insn.imm8_sx16(), op_xor, true),
            Op::XorRm32Imm32 => self.generic_rm_imm::<u32>(insn, insn.imm32(), op_xor, true),
            Op::XorRm32Imm8 => self.generic_rm_imm::<u32>(insn, insn.imm8_sx32(), op_xor, true),
            Op::XorRm8Reg8 => self.generic_rm_reg::<u8>(insn, op_xor, true, true),
            Op::XorRm16Reg16 => self.generic_rm_reg::<u16>(insn, op_xor, true, true),
            Op::XorRm32Reg32 => self.generic_rm_reg::<u32>(insn, op_xor, true, true),
            Op::XorReg8Rm8 => self.generic_reg_rm::<u8>(insn, op_xor, true, true),
            Op::XorReg16Rm16 => self.generic_reg_rm::<u16>(insn, op_xor, true, true),
            Op::XorReg32Rm32 => self.generic_reg_rm::<u32>(insn, op_xor, true, true),

            // --- SUB (self-sub is a defined zero idiom) ---------------
            Op::SubAlImm8 => self.generic_acc_imm::<u8>(insn.imm8(), op_sub, true),
            Op::SubAxImm16 => self.generic_acc_imm::<u16>(insn.imm16(), op_sub, true),
            Op::SubEaxImm32 => self.generic_acc_imm::<u32>(insn.imm32(), op_sub, true),
            Op::SubRm8Imm8 => self.generic_rm_imm::<u8>(insn, insn.imm8(), op_sub, true),
            Op::SubRm16Imm16 => self.generic_rm_imm::<u16>(insn, insn.imm16(), op_sub, true),
            Op::SubRm16Imm8 => self.generic_rm_imm::<u16>(insn, insn.imm8_sx16(), op_sub, true),
            Op::SubRm32Imm32 => self.generic_rm_imm::<u32>(insn, insn.imm32(), op_sub, true),
            Op::SubRm32Imm8 => self.generic_rm_imm::<u32>(insn, insn.imm8_sx32(), op_sub, true),
            Op::SubRm8Reg8 => self.generic_rm_reg::<u8>(insn, op_sub, true, true),
            Op::SubRm16Reg16 => self.generic_rm_reg::<u16>(insn, op_sub, true, true),
            Op::SubRm32Reg32 => self.generic_rm_reg::<u32>(insn, op_sub, true, true),
            Op::SubReg8Rm8 => self.generic_reg_rm::<u8>(insn, op_sub, true, true),
            Op::SubReg16Rm16 => self.generic_reg_rm::<u16>(insn, op_sub, true, true),
            Op::SubReg32Rm32 => self.generic_reg_rm::<u32>(insn, op_sub, true, true),

            // --- SBB ---------------------------------------------------
            Op::SbbAlImm8 => self.generic_acc_imm::<u8>(insn.imm8(), op_sbb, true),
            Op::SbbAxImm16 => self.generic_acc_imm::<u16>(insn.imm16(), op_sbb, true),
            Op::SbbEaxImm32 => self.generic_acc_imm::<u32>(insn.imm32(), op_sbb, true),
            Op::SbbRm8Imm8 => self.generic_rm_imm::<u8>(insn, insn.imm8(), op_sbb, true),
            Op::SbbRm16Imm16 => self.generic_rm_imm::<u16>(insn, insn.imm16(), op_sbb, true),
            Op::SbbRm16Imm8 => self.generic_rm_imm::<u16>(insn, insn.imm8_sx16(), op_sbb, true),
            Op::SbbRm32Imm32 => self.generic_rm_imm::<u32>(insn, insn.imm32(), op_sbb, true),
            Op::SbbRm32Imm8 => self.generic_rm_imm::<u32>(insn, insn.imm8_sx32(), op_sbb, true),
            Op::SbbRm8Reg8 => self.generic_rm_reg::<u8>(insn, op_sbb, true, false),
            Op::SbbRm16Reg16 => self.generic_rm_reg::<u16>(insn, op_sbb, true, false),
            Op::SbbRm32Reg32 => self.generic_rm_reg::<u32>(insn, op_sbb, true, false),
            Op::SbbReg8Rm8 => self.generic_reg_rm::<u8>(insn, op_sbb, true, false),
            Op::SbbReg16Rm16 => self.generic_reg_rm::<u16>(insn, op_sbb, true, false),
            Op::SbbReg32Rm32 => self.generic_reg_rm::<u32>(insn, op_sbb, true, false),

            // --- CMP (SUB without write-back) -------------------------
            Op::CmpAlImm8 => self.generic_acc_imm::<u8>(insn.imm8(), op_sub, false),
            Op::CmpAxImm16 => self.generic_acc_imm::<u16>(insn.imm16(), op_sub, false),
            Op::CmpEaxImm32 => self.generic_acc_imm::<u32>(insn.imm32(), op_sub, false),
            Op::CmpRm8Imm8 => self.generic_rm_imm::<u8>(insn, insn.imm8(), op_sub, false),
            Op::CmpRm16Imm16 => self.generic_rm_imm::<u16>(insn, insn.imm16(), op_sub, false),
            Op::CmpRm16Imm8 => self.generic_rm_imm::<u16>(insn, insn.imm8_sx16(), op_sub, false),
            Op::CmpRm32Imm32 => self.generic_rm_imm::<u32>(insn, insn.imm32(), op_sub, false),
            Op::CmpRm32Imm8 => self.generic_rm_imm::<u32>(insn, insn.imm8_sx32(), op_sub, false),
            Op::CmpRm8Reg8 => self.generic_rm_reg::<u8>(insn, op_sub, false, false),
            Op::CmpRm16Reg16 => self.generic_rm_reg::<u16>(insn, op_sub, false, false),
            Op::CmpRm32Reg32 => self.generic_rm_reg::<u32>(insn, op_sub, false, false),
            Op::CmpReg8Rm8 => self.generic_reg_rm::<u8>(insn, op_sub, false, false),
            Op::CmpReg16Rm16 => self.generic_reg_rm::<u16>(insn, op_sub, false, false),
            Op::CmpReg32Rm32 => self.generic_reg_rm::<u32>(insn, op_sub, false, false),

            // --- TEST (AND without write-back) ------------------------
            Op::TestAlImm8 => self.generic_acc_imm::<u8>(insn.imm8(), op_and, false),
            Op::TestAxImm16 => self.generic_acc_imm::<u16>(insn.imm16(), op_and, false),
            Op::TestEaxImm32 => self.generic_acc_imm::<u32>(insn.imm32(), op_and, false),
            Op::TestRm8Imm8 => self.generic_rm_imm::<u8>(insn, insn.imm8(), op_and, false),
            Op::TestRm16Imm16 => self.generic_rm_imm::<u16>(insn, insn.imm16(), op_and, false),
            Op::TestRm32Imm32 => self.generic_rm_imm::<u32>(insn, insn.imm32(), op_and, false),
            Op::TestRm8Reg8 => self.generic_rm_reg::<u8>(insn, op_and, false, false),
            Op::TestRm16Reg16 => self.generic_rm_reg::<u16>(insn, op_and, false, false),
            Op::TestRm32Reg32 => self.generic_rm_reg::<u32>(insn, op_and, false, false),

            // --- INC/DEC/NEG/NOT --------------------------------------
            Op::IncRm8 => self.generic_inc_dec::<u8>(insn, true),
            Op::IncRm16 => self.generic_inc_dec::<u16>(insn, true),
            Op::IncRm32 => self.generic_inc_dec::<u32>(insn, true),
            Op::IncReg16 => {
                self.generic_inc_dec_reg::<u16>(insn.reg, true);
                Ok(())
            }
            Op::IncReg32 => {
                self.generic_inc_dec_reg::<u32>(insn.reg, true);
                Ok(())
            }
            Op::DecRm8 => self.generic_inc_dec::<u8>(insn, false),
            Op::DecRm16 => self.generic_inc_dec::<u16>(insn, false),
            Op::DecRm32 => self.generic_inc_dec::<u32>(insn, false),
            Op::DecReg16 => {
                self.generic_inc_dec_reg::<u16>(insn.reg, false);
                Ok(())
            }
            Op::DecReg32 => {
                self.generic_inc_dec_reg::<u32>(insn.reg, false);
                Ok(())
            }
            Op::NegRm8 => self.generic_neg::<u8>(insn),
            Op::NegRm16 => self.generic_neg::<u16>(insn),
            Op::NegRm32 => self.generic_neg::<u32>(insn),
            Op::NotRm8 => self.generic_not::<u8>(insn),
            Op::NotRm16 => self.generic_not::<u16>(insn),
            Op::NotRm32 => self.generic_not::<u32>(insn),

            // --- shifts and rotates -----------------------------------
            Op::ShlRm8One => self.shift_one::<u8>(insn, op_shl),
            Op::ShlRm8Cl => self.shift_cl::<u8>(insn, op_shl),
            Op::ShlRm8Imm8 => self.shift_imm::<u8>(insn, op_shl),
            Op::ShlRm16One => self.shift_one::<u16>(insn, op_shl),
            Op::ShlRm16Cl => self.shift_cl::<u16>(insn, op_shl),
            Op::ShlRm16Imm8 => self.shift_imm::<u16>(insn, op_shl),
            Op::ShlRm32One => self.shift_one::<u32>(insn, op_shl),
            Op::ShlRm32Cl => self.shift_cl::<u32>(insn, op_shl),
            Op::ShlRm32Imm8 => self.shift_imm::<u32>(insn, op_shl),
            Op::ShrRm8One => self.shift_one::<u8>(insn, op_shr),
            Op::ShrRm8Cl => self.shift_cl::<u8>(insn, op_shr),
            Op::ShrRm8Imm8 => self.shift_imm::<u8>(insn, op_shr),
            Op::ShrRm16One => self.shift_one::<u16>(insn, op_shr),
            Op::ShrRm16Cl => self.shift_cl::<u16>(insn, op_shr),
            Op::ShrRm16Imm8 => self.shift_imm::<u16>(insn, op_shr),
            Op::ShrRm32One => self.shift_one::<u32>(insn, op_shr),
            Op::ShrRm32Cl => self.shift_cl::<u32>(insn, op_shr),
            Op::ShrRm32Imm8 => self.shift_imm::<u32>(insn, op_shr),
            Op::SarRm8One => self.shift_one::<u8>(insn, op_sar),
            Op::SarRm8Cl => self.shift_cl::<u8>(insn, op_sar),
            Op::SarRm8Imm8 => self.shift_imm::<u8>(insn, op_sar),
            Op::SarRm16One => self.shift_one::<u16>(insn, op_sar),
            Op::SarRm16Cl => self.shift_cl::<u16>(insn, op_sar),
            Op::SarRm16Imm8 => self.shift_imm::<u16>(insn, op_sar),
            Op::SarRm32One => self.shift_one::<u32>(insn, op_sar),
            Op::SarRm32Cl => self.shift_cl::<u32>(insn, op_sar),
            Op::SarRm32Imm8 => self.shift_imm::<u32>(insn, op_sar),
            Op::RolRm8One => self.shift_one::<u8>(insn, op_rol),
            Op::RolRm8Cl => self.shift_cl::<u8>(insn, op_rol),
            Op::RolRm8Imm8 => self.shift_imm::<u8>(insn, op_rol),
            Op::RolRm16One => self.shift_one::<u16>(insn, op_rol),
            Op::RolRm16Cl => self.shift_cl::<u16>(insn, op_rol),
            Op::RolRm16Imm8 => self.shift_imm::<u16>(insn, op_rol),
            Op::RolRm32One => self.shift_one::<u32>(insn, op_rol),
            Op::RolRm32Cl => self.shift_cl::<u32>(insn, op_rol),
            Op::RolRm32Imm8 => self.shift_imm::<u32>(insn, op_rol),
            Op::RorRm8One => self.shift_one::<u8>(insn, op_ror),
            Op::RorRm8Cl => self.shift_cl::<u8>(insn, op_ror),
            Op::RorRm8Imm8 => self.shift_imm::<u8>(insn, op_ror),
            Op::RorRm16One => self.shift_one::<u16>(insn, op_ror),
            Op::RorRm16Cl => self.shift_cl::<u16>(insn, op_ror),
            Op::RorRm16Imm8 => self.shift_imm::<u16>(insn, op_ror),
            Op::RorRm32One => self.shift_one::<u32>(insn, op_ror),
            Op::RorRm32Cl => self.shift_cl::<u32>(insn, op_ror),
            Op::RorRm32Imm8 => self.shift_imm::<u32>(insn, op_ror),
            Op::RclRm8One => self.shift_one::<u8>(insn, op_rcl),
            Op::RclRm8Cl => self.shift_cl::<u8>(insn, op_rcl),
            Op::RclRm8Imm8 => self.shift_imm::<u8>(insn, op_rcl),
            Op::RclRm16One => self.shift_one::<u16>(insn, op_rcl),
            Op::RclRm16Cl => self.shift_cl::<u16>(insn, op_rcl),
            Op::RclRm16Imm8 => self.shift_imm::<u16>(insn, op_rcl),
            Op::RclRm32One => self.shift_one::<u32>(insn, op_rcl),
            Op::RclRm32Cl => self.shift_cl::<u32>(insn, op_rcl),
            Op::RclRm32Imm8 => self.shift_imm::<u32>(insn, op_rcl),
            Op::RcrRm8One => self.shift_one::<u8>(insn, op_rcr),
            Op::RcrRm8Cl => self.shift_cl::<u8>(insn, op_rcr),
            Op::RcrRm8Imm8 => self.shift_imm::<u8>(insn, op_rcr),
            Op::RcrRm16One => self.shift_one::<u16>(insn, op_rcr),
            Op::RcrRm16Cl => self.shift_cl::<u16>(insn, op_rcr),
            Op::RcrRm16Imm8 => self.shift_imm::<u16>(insn, op_rcr),
            Op::RcrRm32One => self.shift_one::<u32>(insn, op_rcr),
            Op::RcrRm32Cl => self.shift_cl::<u32>(insn, op_rcr),
            Op::RcrRm32Imm8 => self.shift_imm::<u32>(insn, op_rcr),
            Op::ShiftGrpRm8One => self.shift_group::<u8>(insn, Shadowed::initialized(1)),
            Op::ShiftGrpRm8Cl => {
                let cl = self.regs.cl();
                self.shift_group::<u8>(insn, cl)
            }
            Op::ShiftGrpRm8Imm8 => {
                self.shift_group::<u8>(insn, Shadowed::initialized(insn.imm8()))
            }
            Op::ShiftGrpRm16One => self.shift_group::<u16>(insn, Shadowed::initialized(1)),
            Op::ShiftGrpRm16Cl => {
                let cl = self.regs.cl();
                self.shift_group::<u16>(insn, cl)
            }
            Op::ShiftGrpRm16Imm8 => {
                self.shift_group::<u16>(insn, Shadowed::initialized(insn.imm8()))
            }
            Op::ShiftGrpRm32One => self.shift_group::<u32>(insn, Shadowed::initialized(1)),
            Op::ShiftGrpRm32Cl => {
                let cl = self.regs.cl();
                self.shift_group::<u32>(insn, cl)
            }
            Op::ShiftGrpRm32Imm8 => {
                self.shift_group::<u32>(insn, Shadowed::initialized(insn.imm8()))
            }
            Op::ShldRm16Reg16Cl => {
                let cl = self.regs.cl();
                self.generic_double_shift::<u16>(insn, cl, true)
            }
            Op::ShldRm16Reg16Imm8 => {
                self.generic_double_shift::<u16>(insn, Shadowed::initialized(insn.imm8()), true)
            }
            Op::ShldRm32Reg32Cl => {
                let cl = self.regs.cl();
                self.generic_double_shift::<u32>(insn, cl, true)
            }
            Op::ShldRm32Reg32Imm8 => {
                self.generic_double_shift::<u32>(insn, Shadowed::initialized(insn.imm8()), true)
            }
            Op::ShrdRm16Reg16Cl => {
                let cl = self.regs.cl();
                self.generic_double_shift::<u16>(insn, cl, false)
            }
            Op::ShrdRm16Reg16Imm8 => {
                self.generic_double_shift::<u16>(insn, Shadowed::initialized(insn.imm8()), false)
            }
            Op::ShrdRm32Reg32Cl => {
                let cl = self.regs.cl();
                self.generic_double_shift::<u32>(insn, cl, false)
            }
            Op::ShrdRm32Reg32Imm8 => {
                self.generic_double_shift::<u32>(insn, Shadowed::initialized(insn.imm8()), false)
            }

            // --- multiply/divide --------------------------------------
            Op::MulRm8 => self.mul_rm8(insn),
            Op::MulRm16 => self.mul_rm16(insn),
            Op::MulRm32 => self.mul_rm32(insn),
            Op::ImulRm8 => self.imul_rm8(insn),
            Op::ImulRm16 => self.imul_rm16(insn),
            Op::ImulRm32 => self.imul_rm32(insn),
            Op::ImulReg16Rm16 => self.imul_reg16(insn, None),
            Op::ImulReg16Rm16Imm16 => self.imul_reg16(insn, Some(insn.imm16() as i16)),
            Op::ImulReg16Rm16Imm8 => self.imul_reg16(insn, Some(i16::from(insn.imm8() as i8))),
            Op::ImulReg32Rm32 => self.imul_reg32(insn, None),
            Op::ImulReg32Rm32Imm32 => self.imul_reg32(insn, Some(insn.imm32() as i32)),
            Op::ImulReg32Rm32Imm8 => self.imul_reg32(insn, Some(i32::from(insn.imm8() as i8))),
            Op::DivRm8 => self.div_rm8(insn),
            Op::DivRm16 => self.div_rm16(insn),
            Op::DivRm32 => self.div_rm32(insn),
            Op::IdivRm8 => self.idiv_rm8(insn),
            Op::IdivRm16 => self.idiv_rm16(insn),
            Op::IdivRm32 => self.idiv_rm32(insn),

            // --- bit tests and scans ----------------------------------
            Op::BtRm16Reg16 => self.generic_bt_reg_index::<u16>(insn, BitOp::Test),
            Op::BtRm32Reg32 => self.generic_bt_reg_index::<u32>(insn, BitOp::Test),
            Op::BtRm16Imm8 => self.generic_bt_imm::<u16>(insn, BitOp::Test),
            Op::BtRm32Imm8 => self.generic_bt_imm::<u32>(insn, BitOp::Test),
            Op::BtsRm16Reg16 => self.generic_bt_reg_index::<u16>(insn, BitOp::Set),
            Op::BtsRm32Reg32 => self.generic_bt_reg_index::<u32>(insn, BitOp::Set),
            Op::BtsRm16Imm8 => self.generic_bt_imm::<u16>(insn, BitOp::Set),
            Op::BtsRm32Imm8 => self.generic_bt_imm::<u32>(insn, BitOp::Set),
            Op::BtrRm16Reg16 => self.generic_bt_reg_index::<u16>(insn, BitOp::Reset),
            Op::BtrRm32Reg32 => self.generic_bt_reg_index::<u32>(insn, BitOp::Reset),
            Op::BtrRm16Imm8 => self.generic_bt_imm::<u16>(insn, BitOp::Reset),
            Op::BtrRm32Imm8 => self.generic_bt_imm::<u32>(insn, BitOp::Reset),
            Op::BtcRm16Reg16 => self.generic_bt_reg_index::<u16>(insn, BitOp::Complement),
            Op::BtcRm32Reg32 => self.generic_bt_reg_index::<u32>(insn, BitOp::Complement),
            Op::BtcRm16Imm8 => self.generic_bt_imm::<u16>(insn, BitOp::Complement),
            Op::BtcRm32Imm8 => self.generic_bt_imm::<u32>(insn, BitOp::Complement),
            Op::BsfReg16Rm16 => self.generic_bit_scan::<u16>(insn, true),
            Op::BsfReg32Rm32 => self.generic_bit_scan::<u32>(insn, true),
            Op::BsrReg16Rm16 => self.generic_bit_scan::<u16>(insn, false),
            Op::BsrReg32Rm32 => self.generic_bit_scan::<u32>(insn, false),
            Op::BswapReg32 => {
                self.bswap(insn);
                Ok(())
            }

            // --- exchange / compare-exchange --------------------------
            Op::XchgAxReg16 => {
                self.xchg_gpr::<u16>(0, insn.reg);
                Ok(())
            }
            Op::XchgEaxReg32 => {
                self.xchg_gpr::<u32>(0, insn.reg);
                Ok(())
            }
            Op::XchgReg8Rm8 => self.generic_xchg_rm::<u8>(insn),
            Op::XchgReg16Rm16 => self.generic_xchg_rm::<u16>(insn),
            Op::XchgReg32Rm32 => self.generic_xchg_rm::<u32>(insn),
            Op::XaddRm8Reg8 => self.generic_xadd::<u8>(insn),
            Op::XaddRm16Reg16 => self.generic_xadd::<u16>(insn),
            Op::XaddRm32Reg32 => self.generic_xadd::<u32>(insn),
            Op::CmpxchgRm8Reg8 => self.generic_cmpxchg::<u8>(insn),
            Op::CmpxchgRm16Reg16 => self.generic_cmpxchg::<u16>(insn),
            Op::CmpxchgRm32Reg32 => self.generic_cmpxchg::<u32>(insn),
            Op::Cmpxchg8bM64 => self.cmpxchg8b(insn),

            // --- moves -------------------------------------------------
            Op::MovRm8Reg8 => self.mov_rm_reg::<u8>(insn),
            Op::MovRm16Reg16 => self.mov_rm_reg::<u16>(insn),
            Op::MovRm32Reg32 => self.mov_rm_reg::<u32>(insn),
            Op::MovReg8Rm8 => self.mov_reg_rm::<u8>(insn),
            Op::MovReg16Rm16 => self.mov_reg_rm::<u16>(insn),
            Op::MovReg32Rm32 => self.mov_reg_rm::<u32>(insn),
            Op::MovRm8Imm8 => self.mov_rm_imm::<u8>(insn, insn.imm8()),
            Op::MovRm16Imm16 => self.mov_rm_imm::<u16>(insn, insn.imm16()),
            Op::MovRm32Imm32 => self.mov_rm_imm::<u32>(insn, insn.imm32()),
            Op::MovReg8Imm8 => {
                self.mov_reg_imm::<u8>(insn, insn.imm8());
                Ok(())
            }
            Op::MovReg16Imm16 => {
                self.mov_reg_imm::<u16>(insn, insn.imm16());
                Ok(())
            }
            Op::MovReg32Imm32 => {
                self.mov_reg_imm::<u32>(insn, insn.imm32());
                Ok(())
            }
            Op::MovAlMoff8 => self.mov_acc_moff::<u8>(insn),
            Op::MovAxMoff16 => self.mov_acc_moff::<u16>(insn),
            Op::MovEaxMoff32 => self.mov_acc_moff::<u32>(insn),
            Op::MovMoff8Al => self.mov_moff_acc::<u8>(insn),
            Op::MovMoff16Ax => self.mov_moff_acc::<u16>(insn),
            Op::MovMoff32Eax => self.mov_moff_acc::<u32>(insn),
            Op::MovRm16Seg => self.mov_rm16_seg(insn),
            Op::MovSegRm16 => self.mov_seg_rm::<u16>(insn),
            Op::MovSegRm32 => self.mov_seg_rm::<u32>(insn),
            Op::MovsxReg16Rm8 => self.generic_extend::<u8, u16>(insn, true),
            Op::MovsxReg32Rm8 => self.generic_extend::<u8, u32>(insn, true),
            Op::MovsxReg32Rm16 => self.generic_extend::<u16, u32>(insn, true),
            Op::MovzxReg16Rm8 => self.generic_extend::<u8, u16>(insn, false),
            Op::MovzxReg32Rm8 => self.generic_extend::<u8, u32>(insn, false),
            Op::MovzxReg32Rm16 => self.generic_extend::<u16, u32>(insn, false),
            Op::Cbw => {
                self.cbw();
                Ok(())
            }
            Op::Cwde => {
                self.cwde();
                Ok(())
            }
            Op::Cwd => {
                self.cwd();
                Ok(())
            }
            Op::Cdq => {
                self.cdq();
                Ok(())
            }
            Op::LeaReg16Mem16 => self.lea::<u16>(insn),
            Op::LeaReg32Mem32 => self.lea::<u32>(insn),
            Op::LdsReg16Mem16 => self.load_far_pointer::<u16>(insn, SegReg::Ds),
            Op::LdsReg32Mem32 => self.load_far_pointer::<u32>(insn, SegReg::Ds),
            Op::LesReg16Mem16 => self.load_far_pointer::<u16>(insn, SegReg::Es),
            Op::LesReg32Mem32 => self.load_far_pointer::<u32>(insn, SegReg::Es),
            Op::LfsReg16Mem16 => self.load_far_pointer::<u16>(insn, SegReg::Fs),
            Op::LfsReg32Mem32 => self.load_far_pointer::<u32>(insn, SegReg::Fs),
            Op::LgsReg16Mem16 => self.load_far_pointer::<u16>(insn, SegReg::Gs),
            Op::LgsReg32Mem32 => self.load_far_pointer::<u32>(insn, SegReg::Gs),
            Op::LssReg16Mem16 => self.load_far_pointer::<u16>(insn, SegReg::Ss),
            Op::LssReg32Mem32 => self.load_far_pointer::<u32>(insn, SegReg::Ss),
            Op::Xlat => self.xlat(insn),
            Op::Lahf => {
                self.lahf();
                Ok(())
            }
            Op::Sahf => {
                self.sahf();
                Ok(())
            }
            Op::Salc => {
                self.salc();
                Ok(())
            }

            // --- string operations ------------------------------------
            Op::Movsb => self.do_movs::<u8>(insn),
            Op::Movsw => self.do_movs::<u16>(insn),
            Op::Movsd => self.do_movs::<u32>(insn),
            Op::Stosb => self.do_stos::<u8>(insn),
            Op::Stosw => self.do_stos::<u16>(insn),
            Op::Stosd => self.do_stos::<u32>(insn),
            Op::Lodsb => self.do_lods::<u8>(insn),
            Op::Lodsw => self.do_lods::<u16>(insn),
            Op::Lodsd => self.do_lods::<u32>(insn),
            Op::Cmpsb => self.do_cmps::<u8>(insn),
            Op::Cmpsw => self.do_cmps::<u16>(insn),
            Op::Cmpsd => self.do_cmps::<u32>(insn),
            Op::Scasb => self.do_scas::<u8>(insn),
            Op::Scasw => self.do_scas::<u16>(insn),
            Op::Scasd => self.do_scas::<u32>(insn),

            // --- stack ------------------------------------------------
            Op::PushReg16 => {
                let v = self.gpr::<u16>(insn.reg);
                self.push16(v)
            }
            Op::PushReg32 => {
                let v = self.gpr::<u32>(insn.reg);
                self.push32(v)
            }
            Op::PushRm16 => {
                let v = self.read_rm::<u16>(insn)?;
                self.push16(v)
            }
            Op::PushRm32 => {
                let v = self.read_rm::<u32>(insn)?;
                self.push32(v)
            }
            Op::PushImm8 => match insn.operand_size {
                OperandSize::O16 => self.push16(Shadowed::initialized(insn.imm8_sx16())),
                OperandSize::O32 => self.push32(Shadowed::initialized(insn.imm8_sx32())),
            },
            Op::PushImm16 => self.push16(Shadowed::initialized(insn.imm16())),
            Op::PushImm32 => self.push32(Shadowed::initialized(insn.imm32())),
            Op::PushSp8086 => {
                // 286+ semantics: the value pushed is SP before the push.
                let sp = self.regs.gpr16(crate::regs::Reg16::Sp);
                self.push16(sp)
            }
            Op::PopReg16 => {
                let v = self.pop16()?;
                self.set_gpr::<u16>(insn.reg, v);
                Ok(())
            }
            Op::PopReg32 => {
                let v = self.pop32()?;
                self.set_gpr::<u32>(insn.reg, v);
                Ok(())
            }
            Op::PopRm16 => {
                let v = self.pop16()?;
                self.write_rm::<u16>(insn, v)
            }
            Op::PopRm32 => {
                let v = self.pop32()?;
                self.write_rm::<u32>(insn, v)
            }
            Op::PushCs => self.push_segment(insn, SegReg::Cs),
            Op::PushDs => self.push_segment(insn, SegReg::Ds),
            Op::PushEs => self.push_segment(insn, SegReg::Es),
            Op::PushFs => self.push_segment(insn, SegReg::Fs),
            Op::PushGs => self.push_segment(insn, SegReg::Gs),
            Op::PushSs => self.push_segment(insn, SegReg::Ss),
            Op::PopDs => self.pop_segment(insn, SegReg::Ds),
            Op::PopEs => self.pop_segment(insn, SegReg::Es),
            Op::PopFs => self.pop_segment(insn, SegReg::Fs),
            Op::PopGs => self.pop_segment(insn, SegReg::Gs),
            Op::PopSs => self.pop_segment(insn, SegReg::Ss),
            Op::Pusha => self.pusha(),
            Op::Pushad => self.pushad(),
            Op::Popa => self.popa(),
            Op::Popad => self.popad(),
            Op::Pushf => self.pushf(),
            Op::Pushfd => self.pushfd(),
            Op::Popf => self.popf(),
            Op::Popfd => self.popfd(),
            Op::Enter16 => self.enter16(insn),
            Op::Enter32 => self.enter32(insn),
            Op::Leave16 => self.leave16(),
            Op::Leave32 => self.leave32(),

            // --- control transfer -------------------------------------
            Op::JmpShortImm8 => {
                self.jmp_rel(insn.rel8());
                Ok(())
            }
            Op::JmpImm16 => {
                self.jmp_rel16(insn.rel());
                Ok(())
            }
            Op::JmpImm32 => {
                self.jmp_rel(insn.rel());
                Ok(())
            }
            Op::JmpImm16Imm16 => {
                self.jmp_far_absolute(insn.imm2 as u16, insn.imm1 & 0xFFFF);
                Ok(())
            }
            Op::JmpImm16Imm32 => {
                self.jmp_far_absolute(insn.imm2 as u16, insn.imm1);
                Ok(())
            }
            Op::JmpRm16 => self.jmp_rm::<u16>(insn),
            Op::JmpRm32 => self.jmp_rm::<u32>(insn),
            Op::JmpFarMem16 => {
                let (selector, offset) = self.read_far_pointer::<u16>(insn)?;
                self.jmp_far_absolute(selector, offset);
                Ok(())
            }
            Op::JmpFarMem32 => {
                let (selector, offset) = self.read_far_pointer::<u32>(insn)?;
                self.jmp_far_absolute(selector, offset);
                Ok(())
            }
            Op::JccImm8 => {
                self.jcc(insn, insn.rel8());
                Ok(())
            }
            Op::JccNearImm => {
                self.jcc(insn, insn.rel());
                Ok(())
            }
            Op::JcxzImm8 => {
                self.jcxz(insn);
                Ok(())
            }
            Op::LoopImm8 => {
                self.loop_insn(insn, None);
                Ok(())
            }
            Op::LoopzImm8 => {
                self.loop_insn(insn, Some(true));
                Ok(())
            }
            Op::LoopnzImm8 => {
                self.loop_insn(insn, Some(false));
                Ok(())
            }
            Op::CallImm16 => self.call_near16(insn.rel()),
            Op::CallImm32 => self.call_near(insn.rel()),
            Op::CallImm16Imm16 => self.call_far(insn.imm2 as u16, insn.imm1 & 0xFFFF, false),
            Op::CallImm16Imm32 => self.call_far(insn.imm2 as u16, insn.imm1, true),
            Op::CallRm16 => self.call_rm::<u16>(insn),
            Op::CallRm32 => self.call_rm::<u32>(insn),
            Op::CallFarMem16 => {
                let (selector, offset) = self.read_far_pointer::<u16>(insn)?;
                self.call_far(selector, offset, false)
            }
            Op::CallFarMem32 => {
                let (selector, offset) = self.read_far_pointer::<u32>(insn)?;
                self.call_far(selector, offset, true)
            }
            Op::Ret => self.ret_near(insn, 0),
            Op::RetImm16 => self.ret_near(insn, insn.imm16()),
            Op::Retf => self.ret_far(insn, 0),
            Op::RetfImm16 => self.ret_far(insn, insn.imm16()),
            Op::Iret => self.iret(),
            Op::SetccRm8 => self.setcc(insn),
            Op::CmovccReg16Rm16 => self.cmovcc::<u16>(insn),
            Op::CmovccReg32Rm32 => self.cmovcc::<u32>(insn),
            Op::Bound => self.bound(insn),

            // --- flag manipulation ------------------------------------
            Op::Clc => {
                self.flags.set_cf(false);
                Ok(())
            }
            Op::Stc => {
                self.flags.set_cf(true);
                Ok(())
            }
            Op::Cmc => {
                let cf = self.flags.cf();
                self.flags.set_cf(!cf);
                Ok(())
            }
            Op::Cld => {
                self.flags.set_df(false);
                Ok(())
            }
            Op::Std => {
                self.flags.set_df(true);
                Ok(())
            }
            Op::Cli => {
                self.flags.set_if(false);
                Ok(())
            }
            Op::Sti => {
                self.flags.set_if(true);
                Ok(())
            }

            // --- system and identification ----------------------------
            Op::Nop | Op::Wait => Ok(()),
            Op::Prefetchnta | Op::Prefetcht0 | Op::Prefetcht1 | Op::Prefetcht2 => Ok(()),
            Op::Hlt => Err(Trap::Halted),
            Op::IntImm8 => self.int_imm8(insn),
            Op::Int1 => Err(Trap::Interrupt { vector: 1 }),
            Op::Int3 => Err(Trap::Interrupt { vector: 3 }),
            Op::Into => self.into_insn(),
            Op::Cpuid => {
                self.cpuid();
                Ok(())
            }
            Op::Rdtsc => {
                self.rdtsc();
                Ok(())
            }
            Op::RdrandReg | Op::RdseedReg => {
                self.rdrand(insn);
                Ok(())
            }
            Op::InAlImm8 | Op::InAxImm8 | Op::InEaxImm8 => {
                let port = u16::from(insn.imm8());
                self.in_insn(port)
            }
            Op::InAlDx | Op::InAxDx | Op::InEaxDx => {
                let port = self.io_port_from_dx();
                self.in_insn(port)
            }
            Op::OutImm8Al | Op::OutImm8Ax | Op::OutImm8Eax => {
                let port = u16::from(insn.imm8());
                self.out_insn(port)
            }
            Op::OutDxAl | Op::OutDxAx | Op::OutDxEax => {
                let port = self.io_port_from_dx();
                self.out_insn(port)
            }
            Op::Insb | Op::Insw | Op::Insd | Op::Outsb | Op::Outsw | Op::Outsd => {
                let port = self.io_port_from_dx();
                Err(Trap::PrivilegedIo { port })
            }
            Op::LarReg16Rm16 | Op::LarReg32Rm32 | Op::LslReg16Rm16 | Op::LslReg32Rm32 => {
                self.descriptor_query(insn)
            }
            Op::VerrRm16 | Op::VerwRm16 => self.descriptor_query(insn),
            Op::Ldmxcsr => self.ldmxcsr(insn),
            Op::Stmxcsr => self.stmxcsr(insn),

            // Descriptor-table state and ring-0 machinery do not exist in
            // this user-mode core.
            Op::Arpl
            | Op::Clts
            | Op::Invlpg
            | Op::Lgdt
            | Op::Lidt
            | Op::LldtRm16
            | Op::LmswRm16
            | Op::LtrRm16
            | Op::MovCrReg32
            | Op::MovDrReg32
            | Op::MovReg32Cr
            | Op::MovReg32Dr
            | Op::Sgdt
            | Op::Sidt
            | Op::SldtRm16
            | Op::SmswRm16
            | Op::StrRm16
            | Op::Wbinvd => Err(Trap::Privileged),

            Op::Ud0 | Op::Ud1 | Op::Ud2 | Op::Escape => Err(Trap::InvalidOpcode),

            // --- coprocessor escapes ----------------------------------
            Op::X87(x87) => match x87 {
                X87Op::FnstswAx => {
                    self.fnstsw_ax();
                    Ok(())
                }
                X87Op::Fnstsw => self.fnstsw_rm(insn),
                X87Op::Fnstcw => self.fnstcw(insn),
                X87Op::Fldcw => self.fldcw(insn),
                other => self.fpu.exec_x87(other),
            },
            Op::Mmx(mmx) => self.fpu.exec_mmx(mmx),
            Op::Sse(sse) => self.vpu.exec_sse(sse),
        }
    }

    fn shift_one<T: Word>(&mut self, insn: &Insn, op: ShiftOp<T>) -> Result<(), Trap> {
        self.generic_shift_rm::<T>(insn, Shadowed::initialized(1), op)
    }

    fn shift_cl<T: Word>(&mut self, insn: &Insn, op: ShiftOp<T>) -> Result<(), Trap> {
        let cl = self.regs.cl();
        self.generic_shift_rm::<T>(insn, cl, op)
    }

    fn shift_imm<T: Word>(&mut self, insn: &Insn, op: ShiftOp<T>) -> Result<(), Trap> {
        self.generic_shift_rm::<T>(insn, Shadowed::initialized(insn.imm8()), op)
    }

    /// The `C0`/`C1`/`D0`–`D3` group: the reg field picks the operation
    /// (slot 6 is the undocumented SAL alias).
    fn shift_group<T: Word>(&mut self, insn: &Insn, count: Shadowed<u8>) -> Result<(), Trap> {
        match insn.reg & 7 {
            0 => self.generic_shift_rm::<T>(insn, count, op_rol),
            1 => self.generic_shift_rm::<T>(insn, count, op_ror),
            2 => self.generic_shift_rm::<T>(insn, count, op_rcl),
            3 => self.generic_shift_rm::<T>(insn, count, op_rcr),
            4 | 6 => self.generic_shift_rm::<T>(insn, count, op_shl),
            5 => self.generic_shift_rm::<T>(insn, count, op_shr),
            7 => self.generic_shift_rm::<T>(insn, count, op_sar),
            _ => unreachable!(),
        }
    }

    /// PUSH Sreg stores a defined, zero-extended selector at the current
    /// operand size.
    fn push_segment(&mut self, insn: &Insn, seg: SegReg) -> Result<(), Trap> {
        let selector = self.segment(seg);
        match insn.operand_size {
            OperandSize::O16 => self.push16(Shadowed::initialized(selector)),
            OperandSize::O32 => self.push32(Shadowed::initialized(u32::from(selector))),
        }
    }

    fn pop_segment(&mut self, insn: &Insn, seg: SegReg) -> Result<(), Trap> {
        let selector = match insn.operand_size {
            OperandSize::O16 => self.pop16()?.value(),
            OperandSize::O32 => self.pop32()?.value() as u16,
        };
        self.set_segment(seg, selector);
        Ok(())
    }
}
