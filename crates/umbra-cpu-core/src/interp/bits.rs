//! Bit tests and scans, byte-order and exchange instructions, and the
//! widening moves.

use umbra_shadow::{Shadowed, Word};

use crate::cpu::SoftCpu;
use crate::insn::{Insn, ModRm};
use crate::mem::Mmu;
use crate::regs::Reg32;
use crate::trap::Trap;

use super::ops::op_add;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BitOp {
    Test,
    Set,
    Reset,
    Complement,
}

impl BitOp {
    fn apply(self, value: u64, bit: u32) -> u64 {
        match self {
            BitOp::Test => value,
            BitOp::Set => value | (1 << bit),
            BitOp::Reset => value & !(1 << bit),
            BitOp::Complement => value ^ (1 << bit),
        }
    }
}

impl<M: Mmu> SoftCpu<M> {
    /// BT/BTS/BTR/BTC with a register bit index. For memory operands the
    /// index is signed and byte-addresses past the operand, so the access
    /// is done byte-granular.
    pub(crate) fn generic_bt_reg_index<T: Word>(
        &mut self,
        insn: &Insn,
        op: BitOp,
    ) -> Result<(), Trap> {
        let index = self.gpr::<T>(insn.reg);
        match insn.rm() {
            ModRm::Reg(r) => {
                let dest = self.gpr::<T>(r);
                let bit = (index.value().to_u64() as u32) & (T::BITS - 1);
                self.bt_finish::<T>(insn, op, dest, bit, |cpu, result| {
                    cpu.set_gpr(r, result);
                    Ok(())
                })
            }
            ModRm::Mem(_) => {
                let base = self.resolve_ea(insn);
                // Sign-extend the index: negative bit offsets address
                // backwards from the operand.
                let signed = match T::BITS {
                    16 => i64::from(index.value().to_u64() as u16 as i16),
                    _ => i64::from(index.value().to_u64() as u32 as i32),
                };
                let byte_offset = signed >> 3;
                let bit = (signed & 7) as u32;
                let addr = crate::mem::LogicalAddress::new(
                    base.selector,
                    base.offset.wrapping_add(byte_offset as u32),
                );
                let dest = self.read_mem::<u8>(addr)?;
                let result_value = op.apply(u64::from(dest.value()), bit);
                let cf = (dest.value() >> bit) & 1 != 0;
                self.flags.set_cf(cf);
                self.flags
                    .taint_from([dest.is_uninitialized(), index.is_uninitialized()]);
                if op != BitOp::Test {
                    let result = Shadowed::with_taint_from(
                        result_value as u8,
                        [dest.is_uninitialized(), index.is_uninitialized()],
                    );
                    self.write_mem(addr, result)?;
                }
                Ok(())
            }
        }
    }

    /// BT/BTS/BTR/BTC with an immediate bit index (masked to the operand
    /// width).
    pub(crate) fn generic_bt_imm<T: Word>(&mut self, insn: &Insn, op: BitOp) -> Result<(), Trap> {
        let bit = u32::from(insn.imm8()) & (T::BITS - 1);
        match insn.rm() {
            ModRm::Reg(r) => {
                let dest = self.gpr::<T>(r);
                self.bt_finish::<T>(insn, op, dest, bit, |cpu, result| {
                    cpu.set_gpr(r, result);
                    Ok(())
                })
            }
            ModRm::Mem(_) => {
                let addr = self.resolve_ea(insn);
                let dest = self.read_mem::<T>(addr)?;
                self.bt_finish::<T>(insn, op, dest, bit, |cpu, result| {
                    cpu.write_mem(addr, result)
                })
            }
        }
    }

    fn bt_finish<T: Word>(
        &mut self,
        _insn: &Insn,
        op: BitOp,
        dest: Shadowed<T>,
        bit: u32,
        commit: impl FnOnce(&mut Self, Shadowed<T>) -> Result<(), Trap>,
    ) -> Result<(), Trap> {
        let cf = (dest.value().to_u64() >> bit) & 1 != 0;
        self.flags.set_cf(cf);
        self.flags.taint_from([dest.is_uninitialized()]);
        if op != BitOp::Test {
            let result = Shadowed::with_taint_from(
                T::from_u64(op.apply(dest.value().to_u64(), bit)),
                [dest.is_uninitialized()],
            );
            commit(self, result)?;
        }
        Ok(())
    }

    /// BSF/BSR. A zero source sets ZF and leaves the destination alone;
    /// taint of the source taints ZF (and the destination when written).
    pub(crate) fn generic_bit_scan<T: Word>(
        &mut self,
        insn: &Insn,
        forward: bool,
    ) -> Result<(), Trap> {
        let src = self.read_rm::<T>(insn)?;
        self.flags.taint_from([src.is_uninitialized()]);
        let v = src.value().to_u64();
        if v == 0 {
            self.flags.set_zf(true);
            return Ok(());
        }
        self.flags.set_zf(false);
        let bit = if forward {
            v.trailing_zeros()
        } else {
            63 - v.leading_zeros()
        };
        self.set_gpr::<T>(
            insn.reg,
            Shadowed::with_taint_from(T::from_u64(u64::from(bit)), [src.is_uninitialized()]),
        );
        Ok(())
    }

    pub(crate) fn bswap(&mut self, insn: &Insn) {
        let reg = self.gpr::<u32>(insn.reg);
        self.set_gpr::<u32>(
            insn.reg,
            Shadowed::new(reg.value().swap_bytes(), reg.shadow().swap_bytes()),
        );
    }

    pub(crate) fn generic_xadd<T: Word>(&mut self, insn: &Insn) -> Result<(), Trap> {
        let src = self.gpr::<T>(insn.reg);
        match insn.rm() {
            ModRm::Reg(r) => {
                let dest = self.gpr::<T>(r);
                let sum = op_add(&mut self.flags, dest, src);
                self.set_gpr(r, sum);
                self.set_gpr(insn.reg, dest);
            }
            ModRm::Mem(_) => {
                let addr = self.resolve_ea(insn);
                let dest = self.read_mem::<T>(addr)?;
                let sum = op_add(&mut self.flags, dest, src);
                self.write_mem(addr, sum)?;
                self.set_gpr(insn.reg, dest);
            }
        }
        Ok(())
    }

    /// CMPXCHG: compare the accumulator with r/m; on match store the reg
    /// operand, otherwise load the accumulator.
    pub(crate) fn generic_cmpxchg<T: Word>(&mut self, insn: &Insn) -> Result<(), Trap> {
        let acc = self.acc::<T>();
        let src = self.gpr::<T>(insn.reg);
        match insn.rm() {
            ModRm::Reg(r) => {
                let dest = self.gpr::<T>(r);
                let _ = super::ops::op_sub(&mut self.flags, acc, dest);
                if acc.value() == dest.value() {
                    self.set_gpr(r, src);
                } else {
                    self.set_acc(dest);
                }
            }
            ModRm::Mem(_) => {
                let addr = self.resolve_ea(insn);
                let dest = self.read_mem::<T>(addr)?;
                let _ = super::ops::op_sub(&mut self.flags, acc, dest);
                if acc.value() == dest.value() {
                    self.write_mem(addr, src)?;
                } else {
                    self.set_acc(dest);
                }
            }
        }
        Ok(())
    }

    /// CMPXCHG8B: compare EDX:EAX with m64; on match store ECX:EBX,
    /// otherwise load EDX:EAX. Only ZF is defined.
    pub(crate) fn cmpxchg8b(&mut self, insn: &Insn) -> Result<(), Trap> {
        let addr = self.resolve_ea(insn);
        let mem = self.read_mem::<u64>(addr)?;
        let eax = self.regs.eax();
        let edx = self.regs.edx();
        let expected = (u64::from(edx.value()) << 32) | u64::from(eax.value());
        let tainted = mem.is_uninitialized() || eax.is_uninitialized() || edx.is_uninitialized();
        self.flags.set_zf(expected == mem.value());
        self.flags.taint_from([tainted]);
        if expected == mem.value() {
            let ecx = self.regs.ecx();
            let ebx = self.regs.ebx();
            let replacement = (u64::from(ecx.value()) << 32) | u64::from(ebx.value());
            let taints = [ecx.is_uninitialized() || ebx.is_uninitialized()];
            self.write_mem(addr, Shadowed::with_taint_from(replacement, taints))?;
        } else {
            let taints = [mem.is_uninitialized()];
            self.regs
                .set_eax(Shadowed::with_taint_from(mem.value() as u32, taints));
            self.regs
                .set_edx(Shadowed::with_taint_from((mem.value() >> 32) as u32, taints));
        }
        Ok(())
    }

    pub(crate) fn generic_xchg_rm<T: Word>(&mut self, insn: &Insn) -> Result<(), Trap> {
        let reg = self.gpr::<T>(insn.reg);
        match insn.rm() {
            ModRm::Reg(r) => {
                let rm = self.gpr::<T>(r);
                self.set_gpr(r, reg);
                self.set_gpr(insn.reg, rm);
            }
            ModRm::Mem(_) => {
                let addr = self.resolve_ea(insn);
                let rm = self.read_mem::<T>(addr)?;
                self.write_mem(addr, reg)?;
                self.set_gpr(insn.reg, rm);
            }
        }
        Ok(())
    }

    /// MOVZX/MOVSX from source width `S` into destination width `D`. The
    /// shadow extends by the same rule as the value, so a tainted source
    /// always yields a tainted destination.
    pub(crate) fn generic_extend<S: Word, D: Word>(
        &mut self,
        insn: &Insn,
        sign: bool,
    ) -> Result<(), Trap> {
        let src = self.read_rm::<S>(insn)?;
        let (value, shadow) = if sign {
            (
                sign_extend(src.value().to_u64(), S::BITS),
                sign_extend(src.shadow().to_u64(), S::BITS),
            )
        } else {
            (src.value().to_u64(), src.shadow().to_u64())
        };
        self.set_gpr::<D>(
            insn.reg,
            Shadowed::new(D::from_u64(value), D::from_u64(shadow)),
        );
        Ok(())
    }

    pub(crate) fn cbw(&mut self) {
        let al = self.regs.al();
        self.regs.set_ax(Shadowed::new(
            al.value() as i8 as i16 as u16,
            sign_extend(u64::from(al.shadow()), 8) as u16,
        ));
    }

    pub(crate) fn cwde(&mut self) {
        let ax = self.regs.ax();
        self.regs.set_eax(Shadowed::new(
            ax.value() as i16 as i32 as u32,
            sign_extend(u64::from(ax.shadow()), 16) as u32,
        ));
    }

    /// CWD: DX is every bit the sign of AX, tainted iff AX's sign bit is.
    pub(crate) fn cwd(&mut self) {
        let ax = self.regs.ax();
        let dx = if ax.value() & 0x8000 != 0 { 0xFFFF } else { 0 };
        let shadow = if ax.shadow() & 0x8000 != 0 { 0xFFFF } else { 0 };
        self.regs.set_dx(Shadowed::new(dx, shadow));
    }

    pub(crate) fn cdq(&mut self) {
        let eax = self.regs.eax();
        let edx = if eax.value() & 0x8000_0000 != 0 {
            0xFFFF_FFFF
        } else {
            0
        };
        let shadow = if eax.shadow() & 0x8000_0000 != 0 {
            0xFFFF_FFFF
        } else {
            0
        };
        self.regs.set_edx(Shadowed::new(edx, shadow));
    }

    /// XLAT: AL = [seg:EBX + zero-extended AL].
    pub(crate) fn xlat(&mut self, insn: &Insn) -> Result<(), Trap> {
        let ebx = self.regs.gpr32(Reg32::Ebx);
        let al = self.regs.al();
        if ebx.is_uninitialized() || al.is_uninitialized() {
            self.report_taint("xlat table address");
        }
        let offset = match insn.address_size {
            crate::insn::AddressSize::A32 => ebx.value().wrapping_add(u32::from(al.value())),
            crate::insn::AddressSize::A16 => {
                (ebx.value() & 0xFFFF).wrapping_add(u32::from(al.value())) & 0xFFFF
            }
        };
        let seg = insn.seg_override.unwrap_or(crate::regs::SegReg::Ds);
        let addr = self.logical(seg, offset);
        let value = self.read_mem::<u8>(addr)?;
        self.regs.set_al(value);
        Ok(())
    }

    /// LAHF: AH mirrors the low flag byte; its taint mirrors the flag
    /// taint summary.
    pub(crate) fn lahf(&mut self) {
        let value = (self.flags.bits() & 0xFF) as u8 | 0x02;
        let shadow = if self.flags.tainted() { 0xFF } else { 0 };
        self.regs.set_ah(Shadowed::new(value, shadow));
    }

    /// SAHF: the SF/ZF/AF/PF/CF bits come from AH; taint follows AH.
    pub(crate) fn sahf(&mut self) {
        let ah = self.regs.ah();
        const SAHF_MASK: u32 = 0xD5;
        let bits = (self.flags.bits() & !SAHF_MASK) | (u32::from(ah.value()) & SAHF_MASK);
        self.flags.set_bits(bits);
        self.flags.set_tainted(ah.is_uninitialized());
    }

    /// SALC: AL = CF ? 0xFF : 0x00.
    pub(crate) fn salc(&mut self) {
        self.warn_if_flags_tainted("salc");
        let value = if self.flags.cf() { 0xFF } else { 0x00 };
        let shadow = if self.flags.tainted() { 0xFF } else { 0 };
        self.regs.set_al(Shadowed::new(value, shadow));
    }
}

fn sign_extend(v: u64, bits: u32) -> u64 {
    let shift = 64 - bits;
    ((v << shift) as i64 >> shift) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_extension_helper() {
        assert_eq!(sign_extend(0x80, 8) as u32, 0xFFFF_FF80);
        assert_eq!(sign_extend(0x7F, 8), 0x7F);
        assert_eq!(sign_extend(0xFFFF, 16) as u32, 0xFFFF_FFFF);
    }
}
