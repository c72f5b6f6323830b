//! Shift, rotate and double-shift handlers.
//!
//! Counts mask with `& 0x1F`; RCL/RCR additionally reduce modulo width+1.
//! Where the architecture leaves OF undefined for multi-bit counts, this
//! core keeps computing the count-1 formula so results are deterministic.

use umbra_shadow::{Shadowed, Word};

use crate::cpu::SoftCpu;
use crate::flags::{parity, Flags};
use crate::insn::{Insn, ModRm};
use crate::mem::Mmu;
use crate::trap::Trap;

use super::ops::mask_for_bits;

pub(crate) type ShiftOp<T> = fn(&mut Flags, Shadowed<T>, Shadowed<u8>) -> Shadowed<T>;

const COUNT_MASK: u8 = 0x1F;

fn msb(bits: u32, v: u64) -> bool {
    (v >> (bits - 1)) & 1 != 0
}

fn result_flags<T: Word>(flags: &mut Flags, result: u64, of: bool, cf: bool) {
    let sb = 1u64 << (T::BITS - 1);
    flags.update_oszpc(
        of,
        (result & sb) != 0,
        result == 0,
        parity(result as u8),
        cf,
    );
}

pub(crate) fn op_shl<T: Word>(flags: &mut Flags, data: Shadowed<T>, steps: Shadowed<u8>) -> Shadowed<T> {
    let count = u32::from(steps.value() & COUNT_MASK);
    if count == 0 {
        return data;
    }
    let mask = mask_for_bits(T::BITS);
    let v = data.value().to_u64() & mask;
    let (result, cf) = if count < T::BITS {
        ((v << count) & mask, (v >> (T::BITS - count)) & 1 != 0)
    } else if count == T::BITS {
        (0, v & 1 != 0)
    } else {
        (0, false)
    };
    // OF: MSB change, exact for count 1.
    let of = msb(T::BITS, result) != cf;
    result_flags::<T>(flags, result, of, cf);
    taint(flags, data, steps);
    Shadowed::with_taint_from(
        T::from_u64(result),
        [data.is_uninitialized(), steps.is_uninitialized()],
    )
}

pub(crate) fn op_shr<T: Word>(flags: &mut Flags, data: Shadowed<T>, steps: Shadowed<u8>) -> Shadowed<T> {
    let count = u32::from(steps.value() & COUNT_MASK);
    if count == 0 {
        return data;
    }
    let mask = mask_for_bits(T::BITS);
    let v = data.value().to_u64() & mask;
    let (result, cf) = if count <= T::BITS {
        (
            v.checked_shr(count).unwrap_or(0),
            (v >> (count - 1)) & 1 != 0,
        )
    } else {
        (0, false)
    };
    // OF: the original MSB, exact for count 1.
    let of = msb(T::BITS, v);
    result_flags::<T>(flags, result, of, cf);
    taint(flags, data, steps);
    Shadowed::with_taint_from(
        T::from_u64(result),
        [data.is_uninitialized(), steps.is_uninitialized()],
    )
}

pub(crate) fn op_sar<T: Word>(flags: &mut Flags, data: Shadowed<T>, steps: Shadowed<u8>) -> Shadowed<T> {
    let count = u32::from(steps.value() & COUNT_MASK);
    if count == 0 {
        return data;
    }
    let mask = mask_for_bits(T::BITS);
    let v = data.value().to_u64() & mask;
    let negative = msb(T::BITS, v);
    // Sign-extend into the full u64 so the arithmetic shift falls out.
    let wide = if negative { v | !mask } else { v };
    let shifted = (wide as i64) >> count.min(63);
    let result = (shifted as u64) & mask;
    let cf = if count <= 63 {
        (wide >> (count - 1)) & 1 != 0
    } else {
        negative
    };
    result_flags::<T>(flags, result, false, cf);
    taint(flags, data, steps);
    Shadowed::with_taint_from(
        T::from_u64(result),
        [data.is_uninitialized(), steps.is_uninitialized()],
    )
}

pub(crate) fn op_rol<T: Word>(flags: &mut Flags, data: Shadowed<T>, steps: Shadowed<u8>) -> Shadowed<T> {
    let count = u32::from(steps.value() & COUNT_MASK) % T::BITS;
    if steps.value() & COUNT_MASK == 0 {
        return data;
    }
    let mask = mask_for_bits(T::BITS);
    let v = data.value().to_u64() & mask;
    let result = if count == 0 {
        v
    } else {
        ((v << count) | (v >> (T::BITS - count))) & mask
    };
    let cf = result & 1 != 0;
    let of = msb(T::BITS, result) != cf;
    flags.update_oc(of, cf);
    taint(flags, data, steps);
    Shadowed::with_taint_from(
        T::from_u64(result),
        [data.is_uninitialized(), steps.is_uninitialized()],
    )
}

pub(crate) fn op_ror<T: Word>(flags: &mut Flags, data: Shadowed<T>, steps: Shadowed<u8>) -> Shadowed<T> {
    let count = u32::from(steps.value() & COUNT_MASK) % T::BITS;
    if steps.value() & COUNT_MASK == 0 {
        return data;
    }
    let mask = mask_for_bits(T::BITS);
    let v = data.value().to_u64() & mask;
    let result = if count == 0 {
        v
    } else {
        ((v >> count) | (v << (T::BITS - count))) & mask
    };
    let cf = msb(T::BITS, result);
    let of = msb(T::BITS, result) != ((result >> (T::BITS - 2)) & 1 != 0);
    flags.update_oc(of, cf);
    taint(flags, data, steps);
    Shadowed::with_taint_from(
        T::from_u64(result),
        [data.is_uninitialized(), steps.is_uninitialized()],
    )
}

pub(crate) fn op_rcl<T: Word>(flags: &mut Flags, data: Shadowed<T>, steps: Shadowed<u8>) -> Shadowed<T> {
    // Rotate through carry works on width+1 bits.
    let count = u32::from(steps.value() & COUNT_MASK) % (T::BITS + 1);
    if count == 0 {
        return data;
    }
    let mask = mask_for_bits(T::BITS);
    let v = data.value().to_u64() & mask;
    let wide = (u128::from(flags.cf() as u64) << T::BITS) | u128::from(v);
    let width = T::BITS + 1;
    let rotated = ((wide << count) | (wide >> (width - count))) & ((1u128 << width) - 1);
    let result = (rotated as u64) & mask;
    let cf = (rotated >> T::BITS) & 1 != 0;
    let of = msb(T::BITS, result) != cf;
    flags.update_oc(of, cf);
    taint(flags, data, steps);
    Shadowed::with_taint_from(
        T::from_u64(result),
        [data.is_uninitialized(), steps.is_uninitialized()],
    )
}

pub(crate) fn op_rcr<T: Word>(flags: &mut Flags, data: Shadowed<T>, steps: Shadowed<u8>) -> Shadowed<T> {
    let count = u32::from(steps.value() & COUNT_MASK) % (T::BITS + 1);
    if count == 0 {
        return data;
    }
    let mask = mask_for_bits(T::BITS);
    let v = data.value().to_u64() & mask;
    let wide = (u128::from(flags.cf() as u64) << T::BITS) | u128::from(v);
    let width = T::BITS + 1;
    let rotated = ((wide >> count) | (wide << (width - count))) & ((1u128 << width) - 1);
    let result = (rotated as u64) & mask;
    let cf = (rotated >> T::BITS) & 1 != 0;
    let of = msb(T::BITS, result) != ((result >> (T::BITS - 2)) & 1 != 0);
    flags.update_oc(of, cf);
    taint(flags, data, steps);
    Shadowed::with_taint_from(
        T::from_u64(result),
        [data.is_uninitialized(), steps.is_uninitialized()],
    )
}

fn taint<T: Word>(flags: &mut Flags, data: Shadowed<T>, steps: Shadowed<u8>) {
    flags.taint_from([data.is_uninitialized(), steps.is_uninitialized()]);
}

impl<M: Mmu> SoftCpu<M> {
    /// One shift/rotate at width `T`, count from the `1`, `CL` or `imm8`
    /// encoding.
    pub(crate) fn generic_shift_rm<T: Word>(
        &mut self,
        insn: &Insn,
        count: Shadowed<u8>,
        op: ShiftOp<T>,
    ) -> Result<(), Trap> {
        match insn.rm() {
            ModRm::Reg(r) => {
                let data = self.gpr::<T>(r);
                let result = op(&mut self.flags, data, count);
                self.set_gpr(r, result);
            }
            ModRm::Mem(_) => {
                let addr = self.resolve_ea(insn);
                let data = self.read_mem::<T>(addr)?;
                let result = op(&mut self.flags, data, count);
                self.write_mem(addr, result)?;
            }
        }
        Ok(())
    }

    /// SHLD/SHRD: shift `r/m` pulling bits from `reg`.
    pub(crate) fn generic_double_shift<T: Word>(
        &mut self,
        insn: &Insn,
        count: Shadowed<u8>,
        left: bool,
    ) -> Result<(), Trap> {
        let filler = self.gpr::<T>(insn.reg);
        let steps = u32::from(count.value() & COUNT_MASK);
        if steps == 0 {
            return Ok(());
        }

        let apply = |flags: &mut Flags, data: Shadowed<T>| -> Shadowed<T> {
            let mask = mask_for_bits(T::BITS);
            let v = data.value().to_u64() & mask;
            let f = filler.value().to_u64() & mask;
            // Concatenate destination and filler so out-of-range counts
            // stay deterministic.
            let (result, cf) = if left {
                let wide = (u128::from(v) << T::BITS) | u128::from(f);
                let shifted = wide << steps.min(63);
                let result = ((shifted >> T::BITS) as u64) & mask;
                let cf = (shifted >> (2 * T::BITS)) & 1 != 0;
                (result, cf)
            } else {
                let wide = (u128::from(f) << T::BITS) | u128::from(v);
                let cf = if steps <= T::BITS {
                    (wide >> (steps - 1)) & 1 != 0
                } else {
                    false
                };
                let result = ((wide >> steps.min(127)) as u64) & mask;
                (result, cf)
            };
            let of = msb(T::BITS, v) != msb(T::BITS, result);
            result_flags::<T>(flags, result, of, cf);
            flags.taint_from([
                data.is_uninitialized(),
                filler.is_uninitialized(),
                count.is_uninitialized(),
            ]);
            Shadowed::with_taint_from(
                T::from_u64(result),
                [
                    data.is_uninitialized(),
                    filler.is_uninitialized(),
                    count.is_uninitialized(),
                ],
            )
        };

        match insn.rm() {
            ModRm::Reg(r) => {
                let data = self.gpr::<T>(r);
                let result = apply(&mut self.flags, data);
                self.set_gpr(r, result);
            }
            ModRm::Mem(_) => {
                let addr = self.resolve_ea(insn);
                let data = self.read_mem::<T>(addr)?;
                let result = apply(&mut self.flags, data);
                self.write_mem(addr, result)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defined<T: Word>(v: T) -> Shadowed<T> {
        Shadowed::initialized(v)
    }

    #[test]
    fn shl_by_one_sets_carry_and_overflow() {
        let mut flags = Flags::new();
        let r = op_shl(&mut flags, defined(0x80u8), defined(1u8));
        assert_eq!(r.value(), 0);
        assert!(flags.cf());
        assert!(flags.of(), "sign bit changed");
        assert!(flags.zf());
    }

    #[test]
    fn shr_by_one_overflow_is_old_msb() {
        let mut flags = Flags::new();
        let r = op_shr(&mut flags, defined(0x80u8), defined(1u8));
        assert_eq!(r.value(), 0x40);
        assert!(!flags.cf());
        assert!(flags.of());
    }

    #[test]
    fn sar_keeps_the_sign() {
        let mut flags = Flags::new();
        let r = op_sar(&mut flags, defined(0xF0u8), defined(2u8));
        assert_eq!(r.value(), 0xFC);
        assert!(!flags.of());
        assert!(!flags.cf());

        let r = op_sar(&mut flags, defined(0x05u8), defined(1u8));
        assert_eq!(r.value(), 0x02);
        assert!(flags.cf());
    }

    #[test]
    fn zero_count_leaves_flags_alone() {
        let mut flags = Flags::new();
        flags.set_cf(true);
        flags.set_zf(true);
        let r = op_shl(&mut flags, defined(0xFFu8), defined(0u8));
        assert_eq!(r.value(), 0xFF);
        assert!(flags.cf());
        assert!(flags.zf());
        assert!(!flags.tainted());
    }

    #[test]
    fn rol_wraps_the_top_bit_into_carry() {
        let mut flags = Flags::new();
        let r = op_rol(&mut flags, defined(0x80u8), defined(1u8));
        assert_eq!(r.value(), 0x01);
        assert!(flags.cf());
    }

    #[test]
    fn rcl_rotates_through_the_carry() {
        let mut flags = Flags::new();
        flags.set_cf(true);
        let r = op_rcl(&mut flags, defined(0x00u8), defined(1u8));
        assert_eq!(r.value(), 0x01, "old CF lands in bit 0");
        assert!(!flags.cf());

        // A 9-bit rotate of an 8-bit value is the identity.
        let mut flags = Flags::new();
        flags.set_cf(true);
        let r = op_rcl(&mut flags, defined(0xA5u8), defined(9u8));
        assert_eq!(r.value(), 0xA5);
        assert!(flags.cf());
    }

    #[test]
    fn rcr_pulls_carry_into_the_msb() {
        let mut flags = Flags::new();
        flags.set_cf(true);
        let r = op_rcr(&mut flags, defined(0x00u8), defined(1u8));
        assert_eq!(r.value(), 0x80);
        assert!(!flags.cf());
    }

    #[test]
    fn shift_count_taints_result_and_flags() {
        let mut flags = Flags::new();
        let r = op_shl(&mut flags, defined(1u8), Shadowed::uninitialized(3u8));
        assert_eq!(r.value(), 8);
        assert!(r.is_uninitialized());
        assert!(flags.tainted());
    }
}
