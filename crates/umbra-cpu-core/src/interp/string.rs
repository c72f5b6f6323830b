//! MOVS/STOS/LODS/CMPS/SCAS and the REP/REPZ/REPNZ driver.
//!
//! ESI/EDI step by the element size, backwards under DF. The repeat driver
//! owns the ECX/CX predecrement and the REPZ/REPNZ termination test; a
//! tainted repeat counter is reported once and its defined value drives
//! the loop.

use umbra_shadow::{Shadowed, Word};

use crate::cpu::SoftCpu;
use crate::insn::{Insn, RepPrefix};
use crate::mem::Mmu;
use crate::regs::SegReg;
use crate::trap::Trap;

use super::ops::op_sub;

impl<M: Mmu> SoftCpu<M> {
    /// Execute `body` once, or under ECX/CX control with an optional ZF
    /// termination test after each iteration.
    pub(crate) fn do_once_or_repeat<F>(
        &mut self,
        insn: &Insn,
        check_zf: bool,
        mut body: F,
    ) -> Result<(), Trap>
    where
        F: FnMut(&mut Self) -> Result<(), Trap>,
    {
        if insn.rep == RepPrefix::None {
            return body(self);
        }

        if self.loop_index(insn.address_size).is_uninitialized() {
            self.report_taint("repeat count");
        }
        let expect_zf = insn.rep == RepPrefix::Repz;

        while self.loop_index(insn.address_size).value() != 0 {
            body(self)?;
            self.decrement_loop_index(insn.address_size);
            if check_zf {
                self.warn_if_flags_tainted("repz/repnz");
                if self.flags.zf() != expect_zf {
                    break;
                }
            }
        }
        Ok(())
    }

    fn string_source_segment(insn: &Insn) -> SegReg {
        // Only the source side honors a segment override; the destination
        // is always ES:EDI.
        insn.seg_override.unwrap_or(SegReg::Ds)
    }

    fn warn_if_index_tainted(&mut self, index: Shadowed<u32>, what: &str) {
        if index.is_uninitialized() {
            self.report_taint(what);
        }
    }

    pub(crate) fn do_movs<T: Word>(&mut self, insn: &Insn) -> Result<(), Trap> {
        let src_seg = Self::string_source_segment(insn);
        self.do_once_or_repeat(insn, false, |cpu| {
            let si = cpu.source_index(insn.address_size);
            let di = cpu.destination_index(insn.address_size);
            cpu.warn_if_index_tainted(si, "movs source index");
            cpu.warn_if_index_tainted(di, "movs destination index");

            let src = cpu.logical(src_seg, si.value());
            let value = cpu.read_mem::<T>(src)?;
            let dst = cpu.logical(SegReg::Es, di.value());
            cpu.write_mem(dst, value)?;

            cpu.step_source_index(insn.address_size, T::BYTES as u32);
            cpu.step_destination_index(insn.address_size, T::BYTES as u32);
            Ok(())
        })
    }

    pub(crate) fn do_stos<T: Word>(&mut self, insn: &Insn) -> Result<(), Trap> {
        self.do_once_or_repeat(insn, false, |cpu| {
            let di = cpu.destination_index(insn.address_size);
            cpu.warn_if_index_tainted(di, "stos destination index");

            let value = cpu.acc::<T>();
            let dst = cpu.logical(SegReg::Es, di.value());
            cpu.write_mem(dst, value)?;

            cpu.step_destination_index(insn.address_size, T::BYTES as u32);
            Ok(())
        })
    }

    pub(crate) fn do_lods<T: Word>(&mut self, insn: &Insn) -> Result<(), Trap> {
        let src_seg = Self::string_source_segment(insn);
        self.do_once_or_repeat(insn, false, |cpu| {
            let si = cpu.source_index(insn.address_size);
            cpu.warn_if_index_tainted(si, "lods source index");

            let src = cpu.logical(src_seg, si.value());
            let value = cpu.read_mem::<T>(src)?;
            cpu.set_acc::<T>(value);

            cpu.step_source_index(insn.address_size, T::BYTES as u32);
            Ok(())
        })
    }

    pub(crate) fn do_cmps<T: Word>(&mut self, insn: &Insn) -> Result<(), Trap> {
        let src_seg = Self::string_source_segment(insn);
        self.do_once_or_repeat(insn, true, |cpu| {
            let si = cpu.source_index(insn.address_size);
            let di = cpu.destination_index(insn.address_size);
            cpu.warn_if_index_tainted(si, "cmps source index");
            cpu.warn_if_index_tainted(di, "cmps destination index");

            let lhs = cpu.read_mem::<T>(cpu.logical(src_seg, si.value()))?;
            let rhs = cpu.read_mem::<T>(cpu.logical(SegReg::Es, di.value()))?;
            let _ = op_sub(&mut cpu.flags, lhs, rhs);

            cpu.step_source_index(insn.address_size, T::BYTES as u32);
            cpu.step_destination_index(insn.address_size, T::BYTES as u32);
            Ok(())
        })
    }

    pub(crate) fn do_scas<T: Word>(&mut self, insn: &Insn) -> Result<(), Trap> {
        self.do_once_or_repeat(insn, true, |cpu| {
            let di = cpu.destination_index(insn.address_size);
            cpu.warn_if_index_tainted(di, "scas destination index");

            let acc = cpu.acc::<T>();
            let mem = cpu.read_mem::<T>(cpu.logical(SegReg::Es, di.value()))?;
            let _ = op_sub(&mut cpu.flags, acc, mem);

            cpu.step_destination_index(insn.address_size, T::BYTES as u32);
            Ok(())
        })
    }
}
