//! Width-generic ALU primitives and the operand-form templates that route
//! the ADD/ADC/SUB/SBB/AND/OR/XOR/CMP/TEST families through them.
//!
//! Arithmetic is carried out in `u64` with the operand width masked in,
//! so every width shares one bit-exact implementation.

use umbra_shadow::{Shadowed, Word};

use crate::cpu::SoftCpu;
use crate::flags::{parity, Flags};
use crate::insn::{Insn, ModRm};
use crate::mem::Mmu;
use crate::trap::Trap;

pub(crate) type AluOp<T> = fn(&mut Flags, Shadowed<T>, Shadowed<T>) -> Shadowed<T>;

pub(crate) fn mask_for_bits(bits: u32) -> u64 {
    if bits == 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

fn sign_bit(bits: u32) -> u64 {
    1u64 << (bits - 1)
}

fn add_impl<T: Word>(
    flags: &mut Flags,
    dest: Shadowed<T>,
    src: Shadowed<T>,
    carry_in: bool,
) -> Shadowed<T> {
    let mask = mask_for_bits(T::BITS);
    let d = dest.value().to_u64() & mask;
    let s = src.value().to_u64() & mask;
    let full = u128::from(d) + u128::from(s) + u128::from(carry_in as u64);
    let result = full as u64 & mask;

    let sb = sign_bit(T::BITS);
    flags.update_oszapc(
        ((d ^ result) & (s ^ result) & sb) != 0,
        (result & sb) != 0,
        result == 0,
        ((d ^ s ^ result) & 0x10) != 0,
        parity(result as u8),
        full > u128::from(mask),
    );
    flags.taint_from([dest.is_uninitialized(), src.is_uninitialized()]);
    Shadowed::with_taint_from(
        T::from_u64(result),
        [dest.is_uninitialized(), src.is_uninitialized()],
    )
}

fn sub_impl<T: Word>(
    flags: &mut Flags,
    dest: Shadowed<T>,
    src: Shadowed<T>,
    borrow_in: bool,
) -> Shadowed<T> {
    let mask = mask_for_bits(T::BITS);
    let d = dest.value().to_u64() & mask;
    let s = src.value().to_u64() & mask;
    let subtrahend = u128::from(s) + u128::from(borrow_in as u64);
    let result = (u128::from(d).wrapping_sub(subtrahend)) as u64 & mask;
    let s2 = (s.wrapping_add(borrow_in as u64)) & mask;

    let sb = sign_bit(T::BITS);
    flags.update_oszapc(
        ((d ^ s2) & (d ^ result) & sb) != 0,
        (result & sb) != 0,
        result == 0,
        ((d ^ s2 ^ result) & 0x10) != 0,
        parity(result as u8),
        u128::from(d) < subtrahend,
    );
    flags.taint_from([dest.is_uninitialized(), src.is_uninitialized()]);
    Shadowed::with_taint_from(
        T::from_u64(result),
        [dest.is_uninitialized(), src.is_uninitialized()],
    )
}

fn logic_impl<T: Word>(flags: &mut Flags, result: u64, taints: [bool; 2]) -> Shadowed<T> {
    let mask = mask_for_bits(T::BITS);
    let result = result & mask;
    let sb = sign_bit(T::BITS);
    flags.update_oszpc(
        false,
        (result & sb) != 0,
        result == 0,
        parity(result as u8),
        false,
    );
    flags.taint_from(taints);
    Shadowed::with_taint_from(T::from_u64(result), taints)
}

pub(crate) fn op_add<T: Word>(flags: &mut Flags, dest: Shadowed<T>, src: Shadowed<T>) -> Shadowed<T> {
    add_impl(flags, dest, src, false)
}

pub(crate) fn op_adc<T: Word>(flags: &mut Flags, dest: Shadowed<T>, src: Shadowed<T>) -> Shadowed<T> {
    let carry = flags.cf();
    add_impl(flags, dest, src, carry)
}

pub(crate) fn op_sub<T: Word>(flags: &mut Flags, dest: Shadowed<T>, src: Shadowed<T>) -> Shadowed<T> {
    sub_impl(flags, dest, src, false)
}

pub(crate) fn op_sbb<T: Word>(flags: &mut Flags, dest: Shadowed<T>, src: Shadowed<T>) -> Shadowed<T> {
    let borrow = flags.cf();
    sub_impl(flags, dest, src, borrow)
}

pub(crate) fn op_and<T: Word>(flags: &mut Flags, dest: Shadowed<T>, src: Shadowed<T>) -> Shadowed<T> {
    logic_impl(
        flags,
        dest.value().to_u64() & src.value().to_u64(),
        [dest.is_uninitialized(), src.is_uninitialized()],
    )
}

pub(crate) fn op_or<T: Word>(flags: &mut Flags, dest: Shadowed<T>, src: Shadowed<T>) -> Shadowed<T> {
    logic_impl(
        flags,
        dest.value().to_u64() | src.value().to_u64(),
        [dest.is_uninitialized(), src.is_uninitialized()],
    )
}

pub(crate) fn op_xor<T: Word>(flags: &mut Flags, dest: Shadowed<T>, src: Shadowed<T>) -> Shadowed<T> {
    logic_impl(
        flags,
        dest.value().to_u64() ^ src.value().to_u64(),
        [dest.is_uninitialized(), src.is_uninitialized()],
    )
}

/// INC/DEC: the six-flag computation of ADD/SUB with CF preserved.
pub(crate) fn op_inc_dec<T: Word>(flags: &mut Flags, dest: Shadowed<T>, increment: bool) -> Shadowed<T> {
    let saved_cf = flags.cf();
    let one = Shadowed::initialized(T::from_u64(1));
    let result = if increment {
        add_impl(flags, dest, one, false)
    } else {
        sub_impl(flags, dest, one, false)
    };
    flags.set_cf(saved_cf);
    result
}

pub(crate) fn op_neg<T: Word>(flags: &mut Flags, src: Shadowed<T>) -> Shadowed<T> {
    let zero = Shadowed::initialized(T::ZERO);
    let result = sub_impl(flags, zero, src, false);
    // NEG's taint has a single source.
    flags.taint_from([src.is_uninitialized()]);
    result
}

pub(crate) fn op_not<T: Word>(src: Shadowed<T>) -> Shadowed<T> {
    // NOT affects no flags; per-bit complement keeps the per-bit shadow.
    Shadowed::new(T::from_u64(!src.value().to_u64()), src.shadow())
}

impl<M: Mmu> SoftCpu<M> {
    /// Accumulator-immediate forms (`ADD AL, imm8` …). Immediates are
    /// always defined.
    pub(crate) fn generic_acc_imm<T: Word>(
        &mut self,
        imm: T,
        op: AluOp<T>,
        update_dest: bool,
    ) -> Result<(), Trap> {
        let dest = self.acc::<T>();
        let result = op(&mut self.flags, dest, Shadowed::initialized(imm));
        if update_dest {
            self.set_acc(result);
        }
        Ok(())
    }

    /// `op r/m, imm` forms, read-modify-write on a register or one memory
    /// cell.
    pub(crate) fn generic_rm_imm<T: Word>(
        &mut self,
        insn: &Insn,
        imm: T,
        op: AluOp<T>,
        update_dest: bool,
    ) -> Result<(), Trap> {
        let src = Shadowed::initialized(imm);
        match insn.rm() {
            ModRm::Reg(r) => {
                let dest = self.gpr::<T>(r);
                let result = op(&mut self.flags, dest, src);
                if update_dest {
                    self.set_gpr(r, result);
                }
            }
            ModRm::Mem(_) => {
                let addr = self.resolve_ea(insn);
                let dest = self.read_mem::<T>(addr)?;
                let result = op(&mut self.flags, dest, src);
                if update_dest {
                    self.write_mem(addr, result)?;
                }
            }
        }
        Ok(())
    }

    /// `op r/m, reg` forms. `zero_idiom` strips taint when both operands
    /// are the same register (XOR/SUB self-zeroing is how compilers write
    /// "mov reg, 0", and the result genuinely does not depend on the old
    /// bits).
    pub(crate) fn generic_rm_reg<T: Word>(
        &mut self,
        insn: &Insn,
        op: AluOp<T>,
        update_dest: bool,
        zero_idiom: bool,
    ) -> Result<(), Trap> {
        let src = self.gpr::<T>(insn.reg);
        match insn.rm() {
            ModRm::Reg(r) => {
                let same = r == insn.reg;
                let (dest, src) = if zero_idiom && same {
                    (
                        Shadowed::initialized(src.value()),
                        Shadowed::initialized(src.value()),
                    )
                } else {
                    (self.gpr::<T>(r), src)
                };
                let result = op(&mut self.flags, dest, src);
                if update_dest {
                    self.set_gpr(r, result);
                }
            }
            ModRm::Mem(_) => {
                let addr = self.resolve_ea(insn);
                let dest = self.read_mem::<T>(addr)?;
                let result = op(&mut self.flags, dest, src);
                if update_dest {
                    self.write_mem(addr, result)?;
                }
            }
        }
        Ok(())
    }

    /// `op reg, r/m` forms.
    pub(crate) fn generic_reg_rm<T: Word>(
        &mut self,
        insn: &Insn,
        op: AluOp<T>,
        update_dest: bool,
        zero_idiom: bool,
    ) -> Result<(), Trap> {
        let dest = self.gpr::<T>(insn.reg);
        let result = match insn.rm() {
            ModRm::Reg(r) if zero_idiom && r == insn.reg => {
                let clean = Shadowed::initialized(dest.value());
                op(&mut self.flags, clean, clean)
            }
            _ => {
                let src = self.read_rm::<T>(insn)?;
                op(&mut self.flags, dest, src)
            }
        };
        if update_dest {
            self.set_gpr(insn.reg, result);
        }
        Ok(())
    }

    /// INC/DEC over r/m at width `T`.
    pub(crate) fn generic_inc_dec<T: Word>(
        &mut self,
        insn: &Insn,
        increment: bool,
    ) -> Result<(), Trap> {
        match insn.rm() {
            ModRm::Reg(r) => {
                let dest = self.gpr::<T>(r);
                let result = op_inc_dec(&mut self.flags, dest, increment);
                self.set_gpr(r, result);
            }
            ModRm::Mem(_) => {
                let addr = self.resolve_ea(insn);
                let dest = self.read_mem::<T>(addr)?;
                let result = op_inc_dec(&mut self.flags, dest, increment);
                self.write_mem(addr, result)?;
            }
        }
        Ok(())
    }

    /// INC/DEC short register forms (`40+r`/`48+r`).
    pub(crate) fn generic_inc_dec_reg<T: Word>(&mut self, reg: u8, increment: bool) {
        let dest = self.gpr::<T>(reg);
        let result = op_inc_dec(&mut self.flags, dest, increment);
        self.set_gpr(reg, result);
    }

    pub(crate) fn generic_neg<T: Word>(&mut self, insn: &Insn) -> Result<(), Trap> {
        match insn.rm() {
            ModRm::Reg(r) => {
                let src = self.gpr::<T>(r);
                let result = op_neg(&mut self.flags, src);
                self.set_gpr(r, result);
            }
            ModRm::Mem(_) => {
                let addr = self.resolve_ea(insn);
                let src = self.read_mem::<T>(addr)?;
                let result = op_neg(&mut self.flags, src);
                self.write_mem(addr, result)?;
            }
        }
        Ok(())
    }

    pub(crate) fn generic_not<T: Word>(&mut self, insn: &Insn) -> Result<(), Trap> {
        match insn.rm() {
            ModRm::Reg(r) => {
                let src = self.gpr::<T>(r);
                self.set_gpr(r, op_not(src));
            }
            ModRm::Mem(_) => {
                let addr = self.resolve_ea(insn);
                let src = self.read_mem::<T>(addr)?;
                self.write_mem(addr, op_not(src))?;
            }
        }
        Ok(())
    }
}
