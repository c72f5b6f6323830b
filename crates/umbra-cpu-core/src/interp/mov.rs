//! Plain data movement: MOV in all encodings, LEA, and the far-pointer
//! loads.

use umbra_shadow::{Shadowed, Word};

use crate::cpu::SoftCpu;
use crate::insn::Insn;
use crate::mem::{LogicalAddress, Mmu};
use crate::regs::SegReg;
use crate::trap::Trap;

impl<M: Mmu> SoftCpu<M> {
    pub(crate) fn mov_rm_reg<T: Word>(&mut self, insn: &Insn) -> Result<(), Trap> {
        let src = self.gpr::<T>(insn.reg);
        self.write_rm(insn, src)
    }

    pub(crate) fn mov_reg_rm<T: Word>(&mut self, insn: &Insn) -> Result<(), Trap> {
        let src = self.read_rm::<T>(insn)?;
        self.set_gpr(insn.reg, src);
        Ok(())
    }

    pub(crate) fn mov_rm_imm<T: Word>(&mut self, insn: &Insn, imm: T) -> Result<(), Trap> {
        self.write_rm(insn, Shadowed::initialized(imm))
    }

    pub(crate) fn mov_reg_imm<T: Word>(&mut self, insn: &Insn, imm: T) {
        self.set_gpr(insn.reg, Shadowed::initialized(imm));
    }

    pub(crate) fn mov_acc_moff<T: Word>(&mut self, insn: &Insn) -> Result<(), Trap> {
        let addr = self.moff_address(insn);
        let value = self.read_mem::<T>(addr)?;
        self.set_acc(value);
        Ok(())
    }

    pub(crate) fn mov_moff_acc<T: Word>(&mut self, insn: &Insn) -> Result<(), Trap> {
        let addr = self.moff_address(insn);
        let value = self.acc::<T>();
        self.write_mem(addr, value)
    }

    /// MOV r/m16, Sreg stores a defined selector; the 32-bit register
    /// destination zero-extends it.
    pub(crate) fn mov_rm16_seg(&mut self, insn: &Insn) -> Result<(), Trap> {
        let Some(seg) = crate::regs::SegReg::from_index(insn.reg) else {
            return Err(Trap::InvalidOpcode);
        };
        let selector = self.segment(seg);
        self.write_rm::<u16>(insn, Shadowed::initialized(selector))
    }

    pub(crate) fn mov_seg_rm<T: Word>(&mut self, insn: &Insn) -> Result<(), Trap> {
        let Some(seg) = crate::regs::SegReg::from_index(insn.reg) else {
            return Err(Trap::InvalidOpcode);
        };
        // Loading CS this way is not a thing.
        if seg == SegReg::Cs {
            return Err(Trap::InvalidOpcode);
        }
        let value = self.read_rm::<T>(insn)?;
        self.set_segment(seg, value.value().to_u64() as u16);
        Ok(())
    }

    /// LEA: the effective address itself, no memory access. The result is
    /// defined even when the address registers are not (the *bits* of the
    /// address are what they are), but computing one from tainted inputs
    /// is still worth the diagnostic resolve_mem emits.
    pub(crate) fn lea<T: Word>(&mut self, insn: &Insn) -> Result<(), Trap> {
        let crate::insn::ModRm::Mem(mem) = insn.rm() else {
            // LEA with a register operand does not decode.
            return Err(Trap::InvalidOpcode);
        };
        let addr = self.resolve_mem(insn, &mem);
        self.set_gpr::<T>(
            insn.reg,
            Shadowed::initialized(T::from_u64(u64::from(addr.offset))),
        );
        Ok(())
    }

    /// LDS/LES/LFS/LGS/LSS: load a far pointer from memory into
    /// segment:register.
    pub(crate) fn load_far_pointer<T: Word>(
        &mut self,
        insn: &Insn,
        seg: SegReg,
    ) -> Result<(), Trap> {
        let addr = self.resolve_ea(insn);
        let offset = self.read_mem::<T>(addr)?;
        let selector = self.read_mem::<u16>(LogicalAddress::new(
            addr.selector,
            addr.offset.wrapping_add(T::BYTES as u32),
        ))?;
        self.set_gpr(insn.reg, offset);
        self.set_segment(seg, selector.value());
        Ok(())
    }
}
