//! PUSH/POP and the composite stack protocols (PUSHA/POPA, PUSHF/POPF,
//! ENTER/LEAVE).

use umbra_shadow::Shadowed;

use crate::cpu::SoftCpu;
use crate::insn::Insn;
use crate::mem::Mmu;
use crate::regs::{Reg16, Reg32, SegReg};
use crate::trap::Trap;

impl<M: Mmu> SoftCpu<M> {
    pub(crate) fn pusha(&mut self) -> Result<(), Trap> {
        let sp = self.regs.gpr16(Reg16::Sp);
        self.push16(self.regs.ax())?;
        self.push16(self.regs.cx())?;
        self.push16(self.regs.dx())?;
        self.push16(self.regs.gpr16(Reg16::Bx))?;
        self.push16(sp)?;
        self.push16(self.regs.gpr16(Reg16::Bp))?;
        self.push16(self.regs.gpr16(Reg16::Si))?;
        self.push16(self.regs.gpr16(Reg16::Di))?;
        Ok(())
    }

    pub(crate) fn pushad(&mut self) -> Result<(), Trap> {
        let esp = self.regs.esp();
        self.push32(self.regs.eax())?;
        self.push32(self.regs.ecx())?;
        self.push32(self.regs.edx())?;
        self.push32(self.regs.ebx())?;
        self.push32(esp)?;
        self.push32(self.regs.ebp())?;
        self.push32(self.regs.esi())?;
        self.push32(self.regs.edi())?;
        Ok(())
    }

    pub(crate) fn popa(&mut self) -> Result<(), Trap> {
        let di = self.pop16()?;
        let si = self.pop16()?;
        let bp = self.pop16()?;
        // The SP slot is popped and discarded.
        let _ = self.pop16()?;
        let bx = self.pop16()?;
        let dx = self.pop16()?;
        let cx = self.pop16()?;
        let ax = self.pop16()?;
        self.regs.set_gpr16(Reg16::Di, di);
        self.regs.set_gpr16(Reg16::Si, si);
        self.regs.set_gpr16(Reg16::Bp, bp);
        self.regs.set_gpr16(Reg16::Bx, bx);
        self.regs.set_dx(dx);
        self.regs.set_gpr16(Reg16::Cx, cx);
        self.regs.set_ax(ax);
        Ok(())
    }

    pub(crate) fn popad(&mut self) -> Result<(), Trap> {
        let edi = self.pop32()?;
        let esi = self.pop32()?;
        let ebp = self.pop32()?;
        // The ESP slot is popped and discarded.
        let _ = self.pop32()?;
        let ebx = self.pop32()?;
        let edx = self.pop32()?;
        let ecx = self.pop32()?;
        let eax = self.pop32()?;
        self.regs.set_gpr32(Reg32::Edi, edi);
        self.regs.set_gpr32(Reg32::Esi, esi);
        self.regs.set_gpr32(Reg32::Ebp, ebp);
        self.regs.set_gpr32(Reg32::Ebx, ebx);
        self.regs.set_edx(edx);
        self.regs.set_ecx(ecx);
        self.regs.set_eax(eax);
        Ok(())
    }

    /// PUSHF/PUSHFD: the stored image carries the flag-taint summary.
    pub(crate) fn pushf(&mut self) -> Result<(), Trap> {
        let bits = self.flags.bits() as u16;
        let shadow = if self.flags.tainted() { u16::MAX } else { 0 };
        self.push16(Shadowed::new(bits, shadow))
    }

    pub(crate) fn pushfd(&mut self) -> Result<(), Trap> {
        let bits = self.flags.pushed_bits();
        let shadow = if self.flags.tainted() { u32::MAX } else { 0 };
        self.push32(Shadowed::new(bits, shadow))
    }

    /// POPF/POPFD: only the user-visible bits take effect; popping a
    /// tainted image taints the flags.
    pub(crate) fn popf(&mut self) -> Result<(), Trap> {
        let v = self.pop16()?;
        self.flags.pop_bits(u32::from(v.value()));
        self.flags.set_tainted(v.is_uninitialized());
        Ok(())
    }

    pub(crate) fn popfd(&mut self) -> Result<(), Trap> {
        let v = self.pop32()?;
        self.flags.pop_bits(v.value());
        self.flags.set_tainted(v.is_uninitialized());
        Ok(())
    }

    /// ENTER: imm1 is the frame size, imm2 the nesting level.
    pub(crate) fn enter16(&mut self, insn: &Insn) -> Result<(), Trap> {
        let size = insn.imm16();
        let level = (insn.imm2 as u8) & 0x1F;

        self.push16(self.regs.gpr16(Reg16::Bp))?;
        let frame = self.regs.gpr16(Reg16::Sp);
        if level > 0 {
            let bp = self.regs.gpr16(Reg16::Bp);
            for i in 1..level {
                let display = bp.value().wrapping_sub(2 * u16::from(i));
                let addr = self.logical(SegReg::Ss, u32::from(display));
                let slot = self.read_mem::<u16>(addr)?;
                self.push16(slot)?;
            }
            self.push16(frame)?;
        }
        self.regs.set_gpr16(Reg16::Bp, frame);
        let sp = self.regs.gpr16(Reg16::Sp);
        self.regs.set_gpr16(
            Reg16::Sp,
            Shadowed::new(sp.value().wrapping_sub(size), sp.shadow()),
        );
        Ok(())
    }

    pub(crate) fn enter32(&mut self, insn: &Insn) -> Result<(), Trap> {
        let size = insn.imm16();
        let level = (insn.imm2 as u8) & 0x1F;

        self.push32(self.regs.ebp())?;
        let frame = self.regs.esp();
        if level > 0 {
            let ebp = self.regs.ebp();
            for i in 1..level {
                let display = ebp.value().wrapping_sub(4 * u32::from(i));
                let addr = self.logical(SegReg::Ss, display);
                let slot = self.read_mem::<u32>(addr)?;
                self.push32(slot)?;
            }
            self.push32(frame)?;
        }
        self.regs.set_gpr32(Reg32::Ebp, frame);
        let esp = self.regs.esp();
        self.regs.set_esp(Shadowed::new(
            esp.value().wrapping_sub(u32::from(size)),
            esp.shadow(),
        ));
        Ok(())
    }

    /// LEAVE: SP = BP, then pop BP. The frame slot is read before any
    /// register is committed so a stack fault leaves state intact.
    pub(crate) fn leave16(&mut self) -> Result<(), Trap> {
        let bp = self.regs.gpr16(Reg16::Bp);
        let addr = self.logical(SegReg::Ss, u32::from(bp.value()));
        let old_bp = self.read_mem::<u16>(addr)?;
        self.regs.set_gpr16(
            Reg16::Sp,
            Shadowed::new(bp.value().wrapping_add(2), bp.shadow()),
        );
        self.regs.set_gpr16(Reg16::Bp, old_bp);
        Ok(())
    }

    pub(crate) fn leave32(&mut self) -> Result<(), Trap> {
        let ebp = self.regs.ebp();
        let addr = self.logical(SegReg::Ss, ebp.value());
        let old_ebp = self.read_mem::<u32>(addr)?;
        self.regs.set_esp(Shadowed::new(
            ebp.value().wrapping_add(4),
            ebp.shadow(),
        ));
        self.regs.set_gpr32(Reg32::Ebp, old_ebp);
        Ok(())
    }
}
