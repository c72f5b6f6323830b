//! Taint propagation and diagnostics: uninitialized data flowing into
//! flags, branches, addresses and extensions.

mod common;

use common::{cpu, cpu_defined, MEM_BASE};
use pretty_assertions::assert_eq;
use umbra_cpu_core::{Insn, MemRef, ModRm, Op, RepPrefix, SegReg};
use umbra_shadow::Shadowed;

#[test]
fn registers_are_born_uninitialized() {
    let cpu = cpu();
    assert!(cpu.regs.eax().is_uninitialized());
    assert!(cpu.regs.ebp().is_uninitialized());
    assert!(!cpu.regs.esp().is_uninitialized(), "the loader set ESP up");
}

#[test]
fn branching_on_tainted_flags_is_reported() {
    // add eax, 1 with a fully undefined EAX, then jz: the jz must warn at
    // its own base EIP.
    let mut cpu = cpu();
    cpu.exec(&Insn::new(Op::AddEaxImm32).with_imm1(1)).unwrap();
    assert!(cpu.flags.tainted());
    assert!(cpu.taint_reports().is_empty(), "arithmetic alone is silent");

    cpu.set_eip(0x2040);
    cpu.save_base_eip();
    cpu.set_eip(0x2042); // decoded past the jz
    cpu.exec(&Insn::new(Op::JccImm8).with_cc(4).with_imm1(0x10))
        .unwrap();

    let reports = cpu.drain_taint_reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].eip, 0x2040);
    assert_eq!(reports[0].context, "jz");
}

#[test]
fn defined_flags_branch_silently() {
    let mut cpu = cpu_defined();
    cpu.regs.set_eax(Shadowed::initialized(1));
    cpu.exec(&Insn::new(Op::AddEaxImm32).with_imm1(1)).unwrap();
    cpu.exec(&Insn::new(Op::JccImm8).with_cc(5).with_imm1(4))
        .unwrap();
    assert!(cpu.taint_reports().is_empty());
}

#[test]
fn flags_taint_is_the_disjunction_of_operands() {
    let mut cpu = cpu_defined();
    cpu.regs.set_eax(Shadowed::initialized(1));
    cpu.set_gpr::<u32>(3, Shadowed::uninitialized(2));

    // add eax, ebx: one tainted operand taints the flags.
    let insn = Insn::new(Op::AddRm32Reg32)
        .with_modrm(ModRm::Reg(0))
        .with_reg(3);
    cpu.exec(&insn).unwrap();
    assert!(cpu.flags.tainted());
    assert!(cpu.regs.eax().is_uninitialized());

    // A following all-defined computation clears the summary.
    cpu.regs.set_eax(Shadowed::initialized(1));
    cpu.exec(&Insn::new(Op::AddEaxImm32).with_imm1(1)).unwrap();
    assert!(!cpu.flags.tainted());
}

#[test]
fn xor_self_is_a_defined_zero() {
    let mut cpu = cpu();
    assert!(cpu.regs.eax().is_uninitialized());
    let insn = Insn::new(Op::XorRm32Reg32)
        .with_modrm(ModRm::Reg(0))
        .with_reg(0);
    cpu.exec(&insn).unwrap();
    assert_eq!(cpu.regs.eax().value(), 0);
    assert!(!cpu.regs.eax().is_uninitialized());
    assert!(!cpu.flags.tainted());
    assert!(cpu.flags.zf());
}

#[test]
fn sub_self_is_a_defined_zero() {
    let mut cpu = cpu();
    let insn = Insn::new(Op::SubRm32Reg32)
        .with_modrm(ModRm::Reg(2))
        .with_reg(2);
    cpu.exec(&insn).unwrap();
    assert!(!cpu.regs.edx().is_uninitialized());
    assert_eq!(cpu.regs.edx().value(), 0);
}

#[test]
fn extension_preserves_shadow_polarity() {
    let mut cpu = cpu_defined();

    // Fully tainted source: movsx must produce a fully tainted result.
    cpu.set_gpr::<u8>(1, Shadowed::uninitialized(0x80));
    let insn = Insn::new(Op::MovsxReg32Rm8)
        .with_reg(0)
        .with_modrm(ModRm::Reg(1));
    cpu.exec(&insn).unwrap();
    assert_eq!(cpu.regs.eax().shadow(), 0xFFFF_FFFF);

    // Fully defined source: fully defined result.
    cpu.set_gpr::<u8>(1, Shadowed::initialized(0x80));
    cpu.exec(&insn).unwrap();
    assert_eq!(cpu.regs.eax().shadow(), 0);
    assert_eq!(cpu.regs.eax().value(), 0xFFFF_FF80);

    // movzx of a tainted byte taints (at least) the written byte.
    cpu.set_gpr::<u8>(1, Shadowed::uninitialized(0xAB));
    let insn = Insn::new(Op::MovzxReg32Rm8)
        .with_reg(0)
        .with_modrm(ModRm::Reg(1));
    cpu.exec(&insn).unwrap();
    assert!(cpu.regs.eax().is_uninitialized());
}

#[test]
fn cbw_of_tainted_al_taints_ax() {
    let mut cpu = cpu_defined();
    cpu.regs.set_al(Shadowed::uninitialized(0x80));
    cpu.exec(&Insn::new(Op::Cbw)).unwrap();
    assert!(cpu.regs.ax().is_uninitialized());

    cpu.regs.set_ax(Shadowed::initialized(0x0080));
    cpu.exec(&Insn::new(Op::Cbw)).unwrap();
    assert_eq!(cpu.regs.ax().value(), 0xFF80);
    assert!(!cpu.regs.ax().is_uninitialized());
}

#[test]
fn memory_round_trips_shadow_bytes() {
    let mut cpu = cpu();
    let addr = MEM_BASE + 0x80;

    // A half-tainted register stored to memory keeps exactly those
    // shadow bytes, and a load brings them back.
    cpu.regs.set_eax(Shadowed::new(0x1122_3344, 0xFF00_FF00));
    let insn = Insn::new(Op::MovRm32Reg32)
        .with_modrm(ModRm::Mem(MemRef::absolute(addr as i32)))
        .with_reg(0);
    cpu.exec(&insn).unwrap();
    assert_eq!(cpu.mmu.shadow_at(addr), 0x00);
    assert_eq!(cpu.mmu.shadow_at(addr + 1), 0xFF);

    let insn = Insn::new(Op::MovReg32Rm32)
        .with_reg(3)
        .with_modrm(ModRm::Mem(MemRef::absolute(addr as i32)));
    cpu.exec(&insn).unwrap();
    assert_eq!(cpu.gpr::<u32>(3).shadow(), 0xFF00_FF00);
    assert_eq!(cpu.gpr::<u32>(3).value(), 0x1122_3344);
}

#[test]
fn addressing_with_a_tainted_base_is_reported() {
    let mut cpu = cpu();
    // EBX was never initialized; use it as a load base.
    let mem = MemRef::base_disp(umbra_cpu_core::Reg32::Ebx, 0);
    let insn = Insn::new(Op::MovReg32Rm32)
        .with_reg(0)
        .with_modrm(ModRm::Mem(mem));
    // The access itself may fault (the tainted value is 0), the warning
    // must still have been recorded first.
    let _ = cpu.exec(&insn);
    let reports = cpu.drain_taint_reports();
    assert!(reports.iter().any(|r| r.context == "memory address"));
}

#[test]
fn setcc_and_cmov_warn_and_mark_results() {
    let mut cpu = cpu();
    cpu.exec(&Insn::new(Op::AddEaxImm32).with_imm1(1)).unwrap();
    assert!(cpu.flags.tainted());

    let insn = Insn::new(Op::SetccRm8)
        .with_cc(5)
        .with_modrm(ModRm::Reg(3)); // setnz bl
    cpu.exec(&insn).unwrap();
    assert!(cpu.gpr::<u8>(3).is_uninitialized());
    let reports = cpu.drain_taint_reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].context, "setnz");

    let insn = Insn::new(Op::CmovccReg32Rm32)
        .with_cc(4)
        .with_reg(1)
        .with_modrm(ModRm::Reg(2));
    cpu.exec(&insn).unwrap();
    assert_eq!(cpu.drain_taint_reports().len(), 1);
}

#[test]
fn lahf_sahf_carry_taint_through_ah() {
    let mut cpu = cpu_defined();
    cpu.exec(&Insn::new(Op::AddEaxImm32).with_imm1(1)).unwrap();
    assert!(!cpu.flags.tainted());

    // Taint the flags, LAHF must taint AH.
    cpu.set_gpr::<u32>(3, Shadowed::uninitialized(0));
    let insn = Insn::new(Op::AddRm32Reg32)
        .with_modrm(ModRm::Reg(0))
        .with_reg(3);
    cpu.exec(&insn).unwrap();
    cpu.exec(&Insn::new(Op::Lahf)).unwrap();
    assert!(cpu.regs.ah().is_uninitialized());

    // And a defined AH through SAHF untaints them.
    cpu.regs.set_ah(Shadowed::initialized(0x40));
    cpu.exec(&Insn::new(Op::Sahf)).unwrap();
    assert!(!cpu.flags.tainted());
    assert!(cpu.flags.zf());
}

#[test]
fn pushf_popf_round_trip_carries_taint() {
    let mut cpu = cpu_defined();
    cpu.set_gpr::<u32>(3, Shadowed::uninitialized(0));
    let insn = Insn::new(Op::AddRm32Reg32)
        .with_modrm(ModRm::Reg(0))
        .with_reg(3);
    cpu.exec(&insn).unwrap();
    assert!(cpu.flags.tainted());

    cpu.exec(&Insn::new(Op::Pushfd)).unwrap();
    // Clear the summary with a defined computation...
    cpu.regs.set_eax(Shadowed::initialized(1));
    cpu.exec(&Insn::new(Op::AddEaxImm32).with_imm1(1)).unwrap();
    assert!(!cpu.flags.tainted());
    // ...and popping the saved image restores it.
    cpu.exec(&Insn::new(Op::Popfd)).unwrap();
    assert!(cpu.flags.tainted());
}

#[test]
fn rep_with_tainted_counter_warns_once() {
    let mut cpu = cpu_defined();
    let src = MEM_BASE + 0x100;
    let dst = MEM_BASE + 0x200;
    cpu.mmu.load(src, b"xy");
    cpu.set_gpr::<u32>(umbra_cpu_core::Reg32::Esi as u8, Shadowed::initialized(src));
    cpu.set_gpr::<u32>(umbra_cpu_core::Reg32::Edi as u8, Shadowed::initialized(dst));
    cpu.set_gpr::<u32>(umbra_cpu_core::Reg32::Ecx as u8, Shadowed::uninitialized(2));
    cpu.set_segment(SegReg::Ds, 0);
    cpu.set_segment(SegReg::Es, 0);

    cpu.exec(&Insn::new(Op::Movsb).with_rep(RepPrefix::Repz))
        .unwrap();
    let reports = cpu.drain_taint_reports();
    assert_eq!(
        reports
            .iter()
            .filter(|r| r.context == "repeat count")
            .count(),
        1
    );
    // The defined value still drove the copy.
    assert_eq!(cpu.mmu.value_at(dst), b'x');
    assert_eq!(cpu.mmu.value_at(dst + 1), b'y');
}

#[test]
fn into_consults_tainted_overflow() {
    let mut cpu = cpu();
    cpu.exec(&Insn::new(Op::AddEaxImm32).with_imm1(1)).unwrap();
    let _ = cpu.exec(&Insn::new(Op::Into));
    assert!(cpu
        .drain_taint_reports()
        .iter()
        .any(|r| r.context == "into"));
}
