//! MUL/IMUL/DIV/IDIV.
//!
//! Wide results land in the AH:AL / DX:AX / EDX:EAX pairs. Divides check
//! for zero divisors and quotient overflow before any write-back, so a
//! faulting handler leaves the register file untouched.

use umbra_shadow::{Shadowed, Word};

use crate::cpu::SoftCpu;
use crate::insn::Insn;
use crate::mem::Mmu;
use crate::trap::Trap;

impl<M: Mmu> SoftCpu<M> {
    pub(crate) fn mul_rm8(&mut self, insn: &Insn) -> Result<(), Trap> {
        let src = self.read_rm::<u8>(insn)?;
        let al = self.regs.al();
        let result = u16::from(al.value()) * u16::from(src.value());
        let taints = [al.is_uninitialized(), src.is_uninitialized()];
        let carry = result >> 8 != 0;
        self.flags.update_oc(carry, carry);
        self.flags.taint_from(taints);
        self.regs.set_ax(Shadowed::with_taint_from(result, taints));
        Ok(())
    }

    pub(crate) fn mul_rm16(&mut self, insn: &Insn) -> Result<(), Trap> {
        let src = self.read_rm::<u16>(insn)?;
        let ax = self.regs.ax();
        let result = u32::from(ax.value()) * u32::from(src.value());
        let taints = [ax.is_uninitialized(), src.is_uninitialized()];
        let carry = result >> 16 != 0;
        self.flags.update_oc(carry, carry);
        self.flags.taint_from(taints);
        self.regs
            .set_ax(Shadowed::with_taint_from(result as u16, taints));
        self.regs
            .set_dx(Shadowed::with_taint_from((result >> 16) as u16, taints));
        Ok(())
    }

    pub(crate) fn mul_rm32(&mut self, insn: &Insn) -> Result<(), Trap> {
        let src = self.read_rm::<u32>(insn)?;
        let eax = self.regs.eax();
        let result = u64::from(eax.value()) * u64::from(src.value());
        let taints = [eax.is_uninitialized(), src.is_uninitialized()];
        let carry = result >> 32 != 0;
        self.flags.update_oc(carry, carry);
        self.flags.taint_from(taints);
        self.regs
            .set_eax(Shadowed::with_taint_from(result as u32, taints));
        self.regs
            .set_edx(Shadowed::with_taint_from((result >> 32) as u32, taints));
        Ok(())
    }

    pub(crate) fn imul_rm8(&mut self, insn: &Insn) -> Result<(), Trap> {
        let src = self.read_rm::<u8>(insn)?;
        let al = self.regs.al();
        let result = (i16::from(al.value() as i8) * i16::from(src.value() as i8)) as u16;
        let taints = [al.is_uninitialized(), src.is_uninitialized()];
        let overflow = result != (result as u8 as i8 as i16 as u16);
        self.flags.update_oc(overflow, overflow);
        self.flags.taint_from(taints);
        self.regs.set_ax(Shadowed::with_taint_from(result, taints));
        Ok(())
    }

    pub(crate) fn imul_rm16(&mut self, insn: &Insn) -> Result<(), Trap> {
        let src = self.read_rm::<u16>(insn)?;
        let ax = self.regs.ax();
        let result = (i32::from(ax.value() as i16) * i32::from(src.value() as i16)) as u32;
        let taints = [ax.is_uninitialized(), src.is_uninitialized()];
        let overflow = result != (result as u16 as i16 as i32 as u32);
        self.flags.update_oc(overflow, overflow);
        self.flags.taint_from(taints);
        self.regs
            .set_ax(Shadowed::with_taint_from(result as u16, taints));
        self.regs
            .set_dx(Shadowed::with_taint_from((result >> 16) as u16, taints));
        Ok(())
    }

    pub(crate) fn imul_rm32(&mut self, insn: &Insn) -> Result<(), Trap> {
        let src = self.read_rm::<u32>(insn)?;
        let eax = self.regs.eax();
        let result = (i64::from(eax.value() as i32) * i64::from(src.value() as i32)) as u64;
        let taints = [eax.is_uninitialized(), src.is_uninitialized()];
        let overflow = result != (result as u32 as i32 as i64 as u64);
        self.flags.update_oc(overflow, overflow);
        self.flags.taint_from(taints);
        self.regs
            .set_eax(Shadowed::with_taint_from(result as u32, taints));
        self.regs
            .set_edx(Shadowed::with_taint_from((result >> 32) as u32, taints));
        Ok(())
    }

    /// Two-operand (`reg *= r/m`) and three-operand (`reg = r/m * imm`)
    /// IMUL at width 16.
    pub(crate) fn imul_reg16(&mut self, insn: &Insn, src2: Option<i16>) -> Result<(), Trap> {
        let rm = self.read_rm::<u16>(insn)?;
        let (full, taints) = match src2 {
            Some(imm) => (
                i32::from(rm.value() as i16) * i32::from(imm),
                [rm.is_uninitialized(), false],
            ),
            None => {
                let reg = self.gpr::<u16>(insn.reg);
                (
                    i32::from(reg.value() as i16) * i32::from(rm.value() as i16),
                    [reg.is_uninitialized(), rm.is_uninitialized()],
                )
            }
        };
        let result = full as u16;
        let overflow = full != i32::from(full as i16);
        self.flags.update_oc(overflow, overflow);
        self.flags.taint_from(taints);
        self.set_gpr::<u16>(insn.reg, Shadowed::with_taint_from(result, taints));
        Ok(())
    }

    /// Two- and three-operand IMUL at width 32.
    pub(crate) fn imul_reg32(&mut self, insn: &Insn, src2: Option<i32>) -> Result<(), Trap> {
        let rm = self.read_rm::<u32>(insn)?;
        let (full, taints) = match src2 {
            Some(imm) => (
                i64::from(rm.value() as i32) * i64::from(imm),
                [rm.is_uninitialized(), false],
            ),
            None => {
                let reg = self.gpr::<u32>(insn.reg);
                (
                    i64::from(reg.value() as i32) * i64::from(rm.value() as i32),
                    [reg.is_uninitialized(), rm.is_uninitialized()],
                )
            }
        };
        let result = full as u32;
        let overflow = full != i64::from(full as i32);
        self.flags.update_oc(overflow, overflow);
        self.flags.taint_from(taints);
        self.set_gpr::<u32>(insn.reg, Shadowed::with_taint_from(result, taints));
        Ok(())
    }

    pub(crate) fn div_rm8(&mut self, insn: &Insn) -> Result<(), Trap> {
        let divisor = self.read_rm::<u8>(insn)?;
        if divisor.value() == 0 {
            return Err(Trap::DivideError);
        }
        let ax = self.regs.ax();
        let quotient = ax.value() / u16::from(divisor.value());
        if quotient > 0xFF {
            return Err(Trap::DivideError);
        }
        let remainder = ax.value() % u16::from(divisor.value());
        let taints = [ax.is_uninitialized(), divisor.is_uninitialized()];
        self.regs
            .set_al(Shadowed::with_taint_from(quotient as u8, taints));
        self.regs
            .set_ah(Shadowed::with_taint_from(remainder as u8, taints));
        Ok(())
    }

    pub(crate) fn div_rm16(&mut self, insn: &Insn) -> Result<(), Trap> {
        let divisor = self.read_rm::<u16>(insn)?;
        if divisor.value() == 0 {
            return Err(Trap::DivideError);
        }
        let ax = self.regs.ax();
        let dx = self.regs.dx();
        let dividend = (u32::from(dx.value()) << 16) | u32::from(ax.value());
        let quotient = dividend / u32::from(divisor.value());
        if quotient > 0xFFFF {
            return Err(Trap::DivideError);
        }
        let remainder = dividend % u32::from(divisor.value());
        let taints = [
            ax.is_uninitialized() || dx.is_uninitialized(),
            divisor.is_uninitialized(),
        ];
        self.regs
            .set_ax(Shadowed::with_taint_from(quotient as u16, taints));
        self.regs
            .set_dx(Shadowed::with_taint_from(remainder as u16, taints));
        Ok(())
    }

    pub(crate) fn div_rm32(&mut self, insn: &Insn) -> Result<(), Trap> {
        let divisor = self.read_rm::<u32>(insn)?;
        if divisor.value() == 0 {
            return Err(Trap::DivideError);
        }
        let eax = self.regs.eax();
        let edx = self.regs.edx();
        let dividend = (u64::from(edx.value()) << 32) | u64::from(eax.value());
        let quotient = dividend / u64::from(divisor.value());
        if quotient > u64::from(u32::MAX) {
            return Err(Trap::DivideError);
        }
        let remainder = dividend % u64::from(divisor.value());
        let taints = [
            eax.is_uninitialized() || edx.is_uninitialized(),
            divisor.is_uninitialized(),
        ];
        self.regs
            .set_eax(Shadowed::with_taint_from(quotient as u32, taints));
        self.regs
            .set_edx(Shadowed::with_taint_from(remainder as u32, taints));
        Ok(())
    }

    pub(crate) fn idiv_rm8(&mut self, insn: &Insn) -> Result<(), Trap> {
        let divisor = self.read_rm::<u8>(insn)?;
        let d = divisor.value() as i8;
        if d == 0 {
            return Err(Trap::DivideError);
        }
        let ax = self.regs.ax();
        let dividend = i32::from(ax.value() as i16);
        let quotient = dividend / i32::from(d);
        if quotient > i32::from(i8::MAX) || quotient < i32::from(i8::MIN) {
            return Err(Trap::DivideError);
        }
        let remainder = dividend % i32::from(d);
        let taints = [ax.is_uninitialized(), divisor.is_uninitialized()];
        self.regs
            .set_al(Shadowed::with_taint_from(quotient as u8, taints));
        self.regs
            .set_ah(Shadowed::with_taint_from(remainder as u8, taints));
        Ok(())
    }

    pub(crate) fn idiv_rm16(&mut self, insn: &Insn) -> Result<(), Trap> {
        let divisor = self.read_rm::<u16>(insn)?;
        let d = divisor.value() as i16;
        if d == 0 {
            return Err(Trap::DivideError);
        }
        let ax = self.regs.ax();
        let dx = self.regs.dx();
        let dividend = (((u32::from(dx.value()) << 16) | u32::from(ax.value())) as i32) as i64;
        let quotient = dividend / i64::from(d);
        if quotient > i64::from(i16::MAX) || quotient < i64::from(i16::MIN) {
            return Err(Trap::DivideError);
        }
        let remainder = dividend % i64::from(d);
        let taints = [
            ax.is_uninitialized() || dx.is_uninitialized(),
            divisor.is_uninitialized(),
        ];
        self.regs
            .set_ax(Shadowed::with_taint_from(quotient as u16, taints));
        self.regs
            .set_dx(Shadowed::with_taint_from(remainder as u16, taints));
        Ok(())
    }

    pub(crate) fn idiv_rm32(&mut self, insn: &Insn) -> Result<(), Trap> {
        let divisor = self.read_rm::<u32>(insn)?;
        let d = divisor.value() as i32;
        if d == 0 {
            return Err(Trap::DivideError);
        }
        let eax = self.regs.eax();
        let edx = self.regs.edx();
        let dividend = (((u64::from(edx.value()) << 32) | u64::from(eax.value())) as i64) as i128;
        let quotient = dividend / i128::from(d);
        if quotient > i128::from(i32::MAX) || quotient < i128::from(i32::MIN) {
            return Err(Trap::DivideError);
        }
        let remainder = dividend % i128::from(d);
        let taints = [
            eax.is_uninitialized() || edx.is_uninitialized(),
            divisor.is_uninitialized(),
        ];
        self.regs
            .set_eax(Shadowed::with_taint_from(quotient as u32, taints));
        self.regs
            .set_edx(Shadowed::with_taint_from(remainder as u32, taints));
        Ok(())
    }

    pub(crate) fn xchg_gpr<T: Word>(&mut self, a: u8, b: u8) {
        let va = self.gpr::<T>(a);
        let vb = self.gpr::<T>(b);
        self.set_gpr(a, vb);
        self.set_gpr(b, va);
    }
}
