//! Control transfer: jumps, calls, returns, conditional branches and the
//! conditional data moves that read flags.
//!
//! Every flag consumer checks the taint summary first; branching on flags
//! computed from uninitialized inputs is the diagnostic this emulator
//! exists for.

use umbra_shadow::{Shadowed, Word};

use crate::cpu::SoftCpu;
use crate::insn::Insn;
use crate::mem::{LogicalAddress, Mmu};
use crate::regs::SegReg;
use crate::trap::Trap;

impl<M: Mmu> SoftCpu<M> {
    pub(crate) fn jmp_rel(&mut self, rel: i32) {
        self.set_eip(self.eip().wrapping_add(rel as u32));
    }

    /// Indirect jump through a register or memory operand.
    pub(crate) fn jmp_rm<T: Word>(&mut self, insn: &Insn) -> Result<(), Trap> {
        let target = self.read_rm::<T>(insn)?;
        if target.is_uninitialized() {
            self.report_taint("jmp target");
        }
        self.set_eip(target.value().to_u64() as u32);
        Ok(())
    }

    pub(crate) fn jmp_far_absolute(&mut self, selector: u16, offset: u32) {
        self.set_segment(SegReg::Cs, selector);
        self.set_eip(offset);
    }

    /// JMP/CALL FAR through an m16:16 or m16:32 pointer.
    pub(crate) fn read_far_pointer<T: Word>(
        &mut self,
        insn: &Insn,
    ) -> Result<(u16, u32), Trap> {
        let addr = self.resolve_ea(insn);
        let offset = self.read_mem::<T>(addr)?;
        let sel_addr = LogicalAddress::new(
            addr.selector,
            addr.offset.wrapping_add(T::BYTES as u32),
        );
        let selector = self.read_mem::<u16>(sel_addr)?;
        if offset.is_uninitialized() || selector.is_uninitialized() {
            self.report_taint("far pointer");
        }
        Ok((selector.value(), offset.value().to_u64() as u32))
    }

    pub(crate) fn call_near(&mut self, rel: i32) -> Result<(), Trap> {
        self.push32(Shadowed::initialized(self.eip()))?;
        self.jmp_rel(rel);
        Ok(())
    }

    pub(crate) fn call_near16(&mut self, rel: i32) -> Result<(), Trap> {
        self.push16(Shadowed::initialized(self.eip() as u16))?;
        self.jmp_rel16(rel);
        Ok(())
    }

    pub(crate) fn call_rm<T: Word>(&mut self, insn: &Insn) -> Result<(), Trap> {
        let target = self.read_rm::<T>(insn)?;
        if target.is_uninitialized() {
            self.report_taint("call target");
        }
        if T::BITS == 16 {
            self.push16(Shadowed::initialized(self.eip() as u16))?;
        } else {
            self.push32(Shadowed::initialized(self.eip()))?;
        }
        self.set_eip(target.value().to_u64() as u32);
        Ok(())
    }

    pub(crate) fn call_far(&mut self, selector: u16, offset: u32, wide: bool) -> Result<(), Trap> {
        if wide {
            self.push32(Shadowed::initialized(u32::from(self.segment(SegReg::Cs))))?;
            self.push32(Shadowed::initialized(self.eip()))?;
        } else {
            self.push16(Shadowed::initialized(self.segment(SegReg::Cs)))?;
            self.push16(Shadowed::initialized(self.eip() as u16))?;
        }
        self.jmp_far_absolute(selector, offset);
        Ok(())
    }

    pub(crate) fn ret_near(&mut self, insn: &Insn, stack_adjust: u16) -> Result<(), Trap> {
        let (target, tainted) = match insn.operand_size {
            crate::insn::OperandSize::O16 => {
                let v = self.pop16()?;
                (u32::from(v.value()), v.is_uninitialized())
            }
            crate::insn::OperandSize::O32 => {
                let v = self.pop32()?;
                (v.value(), v.is_uninitialized())
            }
        };
        if tainted {
            self.report_taint("ret address");
        }
        self.set_eip(target);
        self.adjust_sp(u32::from(stack_adjust));
        Ok(())
    }

    pub(crate) fn ret_far(&mut self, insn: &Insn, stack_adjust: u16) -> Result<(), Trap> {
        let (target, cs, tainted) = match insn.operand_size {
            crate::insn::OperandSize::O16 => {
                let eip = self.pop16()?;
                let cs = self.pop16()?;
                (
                    u32::from(eip.value()),
                    cs.value(),
                    eip.is_uninitialized() || cs.is_uninitialized(),
                )
            }
            crate::insn::OperandSize::O32 => {
                let eip = self.pop32()?;
                let cs = self.pop32()?;
                (
                    eip.value(),
                    cs.value() as u16,
                    eip.is_uninitialized() || cs.is_uninitialized(),
                )
            }
        };
        if tainted {
            self.report_taint("retf address");
        }
        self.set_eip(target);
        self.set_segment(SegReg::Cs, cs);
        self.adjust_sp(u32::from(stack_adjust));
        Ok(())
    }

    /// IRET's mechanical effect: pop EIP, CS and the user-visible flags.
    pub(crate) fn iret(&mut self) -> Result<(), Trap> {
        let eip = self.pop32()?;
        let cs = self.pop32()?;
        let eflags = self.pop32()?;
        if eip.is_uninitialized() || cs.is_uninitialized() {
            self.report_taint("iret frame");
        }
        self.set_eip(eip.value());
        self.set_segment(SegReg::Cs, cs.value() as u16);
        self.flags.pop_bits(eflags.value());
        self.flags.set_tainted(eflags.is_uninitialized());
        Ok(())
    }

    fn adjust_sp(&mut self, by: u32) {
        let esp = self.regs.esp();
        self.regs
            .set_esp(Shadowed::new(esp.value().wrapping_add(by), esp.shadow()));
    }

    pub(crate) fn jcc(&mut self, insn: &Insn, rel: i32) {
        self.warn_if_flags_tainted(jcc_context(insn.cc));
        if self.flags.evaluate_condition(insn.cc) {
            self.jmp_rel(rel);
        }
    }

    /// JCXZ tests the counter register, not the flags.
    pub(crate) fn jcxz(&mut self, insn: &Insn) {
        let counter = self.loop_index(insn.address_size);
        if counter.is_uninitialized() {
            self.report_taint("jcxz counter");
        }
        if counter.value() == 0 {
            self.jmp_rel(insn.rel8());
        }
    }

    /// LOOP/LOOPZ/LOOPNZ: predecrement, then branch while nonzero (and,
    /// for the Z forms, while ZF matches).
    pub(crate) fn loop_insn(&mut self, insn: &Insn, zf_expect: Option<bool>) {
        let counter = self.loop_index(insn.address_size);
        if counter.is_uninitialized() {
            self.report_taint("loop counter");
        }
        let reached_zero = self.decrement_loop_index(insn.address_size);
        let mut take = !reached_zero;
        if let Some(expect) = zf_expect {
            self.warn_if_flags_tainted(if expect { "loopz" } else { "loopnz" });
            take = take && self.flags.zf() == expect;
        }
        if take {
            self.jmp_rel(insn.rel8());
        }
    }

    pub(crate) fn setcc(&mut self, insn: &Insn) -> Result<(), Trap> {
        self.warn_if_flags_tainted(setcc_context(insn.cc));
        let value = self.flags.evaluate_condition(insn.cc) as u8;
        let shadow = if self.flags.tainted() { 0xFF } else { 0 };
        self.write_rm::<u8>(insn, Shadowed::new(value, shadow))
    }

    pub(crate) fn cmovcc<T: Word>(&mut self, insn: &Insn) -> Result<(), Trap> {
        self.warn_if_flags_tainted(cmov_context(insn.cc));
        // The source is read unconditionally; a faulting operand faults
        // even when the move is not taken.
        let src = self.read_rm::<T>(insn)?;
        if self.flags.evaluate_condition(insn.cc) {
            self.set_gpr(insn.reg, src);
        }
        Ok(())
    }

    /// BOUND: #BR (vector 5) when the index is outside the signed bounds
    /// pair.
    pub(crate) fn bound(&mut self, insn: &Insn) -> Result<(), Trap> {
        let addr = self.resolve_ea(insn);
        match insn.operand_size {
            crate::insn::OperandSize::O16 => {
                let index = self.gpr::<u16>(insn.reg);
                let lower = self.read_mem::<u16>(addr)?;
                let upper =
                    self.read_mem::<u16>(LogicalAddress::new(addr.selector, addr.offset.wrapping_add(2)))?;
                if index.is_uninitialized() {
                    self.report_taint("bound index");
                }
                let idx = index.value() as i16;
                if idx < lower.value() as i16 || idx > upper.value() as i16 {
                    return Err(Trap::Interrupt { vector: 5 });
                }
            }
            crate::insn::OperandSize::O32 => {
                let index = self.gpr::<u32>(insn.reg);
                let lower = self.read_mem::<u32>(addr)?;
                let upper =
                    self.read_mem::<u32>(LogicalAddress::new(addr.selector, addr.offset.wrapping_add(4)))?;
                if index.is_uninitialized() {
                    self.report_taint("bound index");
                }
                let idx = index.value() as i32;
                if idx < lower.value() as i32 || idx > upper.value() as i32 {
                    return Err(Trap::Interrupt { vector: 5 });
                }
            }
        }
        Ok(())
    }

    /// 16-bit operand-size near jumps truncate EIP.
    pub(crate) fn jmp_rel16(&mut self, rel: i32) {
        let target = self.eip().wrapping_add(rel as u32) & 0xFFFF;
        self.set_eip(target);
    }
}

fn jcc_context(cc: u8) -> &'static str {
    const NAMES: [&str; 16] = [
        "jo", "jno", "jb", "jnb", "jz", "jnz", "jbe", "jnbe", "js", "jns", "jp", "jnp", "jl",
        "jnl", "jle", "jnle",
    ];
    NAMES[(cc & 0xF) as usize]
}

fn setcc_context(cc: u8) -> &'static str {
    const NAMES: [&str; 16] = [
        "seto", "setno", "setb", "setnb", "setz", "setnz", "setbe", "setnbe", "sets", "setns",
        "setp", "setnp", "setl", "setnl", "setle", "setnle",
    ];
    NAMES[(cc & 0xF) as usize]
}

fn cmov_context(cc: u8) -> &'static str {
    const NAMES: [&str; 16] = [
        "cmovo", "cmovno", "cmovb", "cmovnb", "cmovz", "cmovnz", "cmovbe", "cmovnbe", "cmovs",
        "cmovns", "cmovp", "cmovnp", "cmovl", "cmovnl", "cmovle", "cmovnle",
    ];
    NAMES[(cc & 0xF) as usize]
}
