//! Flag-exact integer semantics, checked opcode-by-opcode against the
//! architectural definitions.

mod common;

use common::{cpu_defined, MEM_BASE};
use pretty_assertions::assert_eq;
use umbra_cpu_core::{Insn, MemRef, ModRm, Op, Reg32, Trap};
use umbra_shadow::Shadowed;

#[test]
fn add_eax_overflow_boundary() {
    // add eax, 1 with eax = 0x7FFFFFFF
    let mut cpu = cpu_defined();
    cpu.regs.set_eax(Shadowed::initialized(0x7FFF_FFFF));
    cpu.exec(&Insn::new(Op::AddEaxImm32).with_imm1(1)).unwrap();

    assert_eq!(cpu.regs.eax().value(), 0x8000_0000);
    assert!(cpu.flags.of());
    assert!(cpu.flags.sf());
    assert!(!cpu.flags.zf());
    assert!(!cpu.flags.cf());
    assert!(cpu.flags.af());
    assert!(cpu.flags.pf(), "low byte 0x00 has even parity");
    assert!(!cpu.flags.tainted());
}

#[test]
fn inc_al_half_carry() {
    // inc al with al = 0x0F: AF set, CF untouched, upper bytes untouched.
    let mut cpu = cpu_defined();
    cpu.regs.set_eax(Shadowed::new(0xDEAD_BE0F, 0xFFFF_0000));
    cpu.flags.set_cf(true);

    cpu.exec(&Insn::new(Op::IncRm8).with_modrm(ModRm::Reg(0)))
        .unwrap();

    assert_eq!(cpu.regs.al().value(), 0x10);
    assert!(cpu.flags.af());
    assert!(!cpu.flags.zf());
    assert!(!cpu.flags.sf());
    assert!(!cpu.flags.pf());
    assert!(!cpu.flags.of());
    assert!(cpu.flags.cf(), "INC leaves CF alone");
    assert_eq!(cpu.regs.eax().value() & 0xFFFF_FF00, 0xDEAD_BE00);
    assert_eq!(cpu.regs.eax().shadow(), 0xFFFF_0000);
}

#[test]
fn divide_by_zero_leaves_registers_untouched() {
    // div eax with eax = 0
    let mut cpu = cpu_defined();
    cpu.regs.set_eax(Shadowed::initialized(0));
    cpu.regs.set_edx(Shadowed::initialized(0x1234_5678));

    let err = cpu
        .exec(&Insn::new(Op::DivRm32).with_modrm(ModRm::Reg(0)))
        .unwrap_err();
    assert_eq!(err, Trap::DivideError);
    assert_eq!(cpu.regs.eax().value(), 0);
    assert_eq!(cpu.regs.edx().value(), 0x1234_5678);
}

#[test]
fn divide_quotient_overflow_faults() {
    // dx:ax = 0x0001_0000, divisor 1: quotient does not fit in AX.
    let mut cpu = cpu_defined();
    cpu.regs.set_ax(Shadowed::initialized(0));
    cpu.regs.set_dx(Shadowed::initialized(1));
    cpu.set_gpr::<u16>(3, Shadowed::initialized(1)); // bx

    let err = cpu
        .exec(&Insn::new(Op::DivRm16).with_modrm(ModRm::Reg(3)))
        .unwrap_err();
    assert_eq!(err, Trap::DivideError);
}

#[test]
fn div_splits_quotient_and_remainder() {
    let mut cpu = cpu_defined();
    cpu.regs.set_ax(Shadowed::initialized(100));
    cpu.set_gpr::<u8>(1, Shadowed::initialized(7)); // cl
    cpu.exec(&Insn::new(Op::DivRm8).with_modrm(ModRm::Reg(1)))
        .unwrap();
    assert_eq!(cpu.regs.al().value(), 14);
    assert_eq!(cpu.regs.ah().value(), 2);
}

#[test]
fn idiv_min_over_minus_one_faults() {
    let mut cpu = cpu_defined();
    cpu.regs.set_eax(Shadowed::initialized(0x8000_0000));
    cpu.regs.set_edx(Shadowed::initialized(0xFFFF_FFFF));
    cpu.set_gpr::<u32>(1, Shadowed::initialized(0xFFFF_FFFF)); // ecx = -1

    let err = cpu
        .exec(&Insn::new(Op::IdivRm32).with_modrm(ModRm::Reg(1)))
        .unwrap_err();
    assert_eq!(err, Trap::DivideError);
}

#[test]
fn mul_sets_carry_when_high_half_used() {
    let mut cpu = cpu_defined();
    cpu.regs.set_eax(Shadowed::initialized(0x1_0000));
    cpu.set_gpr::<u32>(1, Shadowed::initialized(0x1_0000));
    cpu.exec(&Insn::new(Op::MulRm32).with_modrm(ModRm::Reg(1)))
        .unwrap();
    assert_eq!(cpu.regs.eax().value(), 0);
    assert_eq!(cpu.regs.edx().value(), 1);
    assert!(cpu.flags.cf());
    assert!(cpu.flags.of());
}

#[test]
fn imul_two_operand_no_overflow() {
    let mut cpu = cpu_defined();
    cpu.set_gpr::<u32>(3, Shadowed::initialized(6));
    cpu.set_gpr::<u32>(1, Shadowed::initialized((-7i32) as u32));
    let insn = Insn::new(Op::ImulReg32Rm32)
        .with_reg(3)
        .with_modrm(ModRm::Reg(1));
    cpu.exec(&insn).unwrap();
    assert_eq!(cpu.gpr::<u32>(3).value(), (-42i32) as u32);
    assert!(!cpu.flags.cf());
    assert!(!cpu.flags.of());
}

#[test]
fn adc_uses_carry_in() {
    let mut cpu = cpu_defined();
    cpu.regs.set_eax(Shadowed::initialized(0xFFFF_FFFF));
    cpu.exec(&Insn::new(Op::AddEaxImm32).with_imm1(1)).unwrap();
    assert!(cpu.flags.cf());
    assert!(cpu.flags.zf());

    // adc eax, 0 now adds the carry.
    cpu.exec(&Insn::new(Op::AdcEaxImm32).with_imm1(0)).unwrap();
    assert_eq!(cpu.regs.eax().value(), 1);
    assert!(!cpu.flags.cf());
}

#[test]
fn cmp_does_not_write_back() {
    let mut cpu = cpu_defined();
    cpu.regs.set_eax(Shadowed::initialized(5));
    cpu.exec(&Insn::new(Op::CmpEaxImm32).with_imm1(9)).unwrap();
    assert_eq!(cpu.regs.eax().value(), 5);
    assert!(cpu.flags.cf(), "5 - 9 borrows");
    assert!(cpu.flags.sf());
}

#[test]
fn sign_extended_imm8_forms() {
    // sub eax, -1 (imm8 sign-extended): eax = 5 → 6.
    let mut cpu = cpu_defined();
    cpu.regs.set_eax(Shadowed::initialized(5));
    let insn = Insn::new(Op::SubRm32Imm8)
        .with_modrm(ModRm::Reg(0))
        .with_imm1(0xFF);
    cpu.exec(&insn).unwrap();
    assert_eq!(cpu.regs.eax().value(), 6);
}

#[test]
fn memory_read_modify_write() {
    let mut cpu = cpu_defined();
    let addr = MEM_BASE + 0x100;
    cpu.mmu.load(addr, &[0x34, 0x12]);
    cpu.set_gpr::<u16>(3, Shadowed::initialized(0x1111)); // bx

    // add [addr], bx
    let insn = Insn::new(Op::AddRm16Reg16)
        .with_modrm(ModRm::Mem(MemRef::absolute(addr as i32)))
        .with_reg(3);
    cpu.exec(&insn).unwrap();
    assert_eq!(cpu.mmu.value_at(addr), 0x45);
    assert_eq!(cpu.mmu.value_at(addr + 1), 0x23);
    assert_eq!(cpu.mmu.shadow_at(addr), 0);
}

#[test]
fn effective_address_with_base_index_scale() {
    let mut cpu = cpu_defined();
    let addr = MEM_BASE + 0x200;
    cpu.mmu.load(addr, &[0xAA, 0xBB, 0xCC, 0xDD]);
    cpu.set_gpr::<u32>(Reg32::Esi as u8, Shadowed::initialized(MEM_BASE));
    cpu.set_gpr::<u32>(Reg32::Ecx as u8, Shadowed::initialized(0x80));

    // mov eax, [esi + ecx*4 + 0]
    let mem = MemRef {
        base: Some(Reg32::Esi),
        index: Some(Reg32::Ecx),
        scale: 4,
        disp: 0,
    };
    let insn = Insn::new(Op::MovReg32Rm32)
        .with_reg(0)
        .with_modrm(ModRm::Mem(mem));
    cpu.exec(&insn).unwrap();
    assert_eq!(cpu.regs.eax().value(), 0xDDCC_BBAA);
}

#[test]
fn bt_sets_carry_from_bit() {
    let mut cpu = cpu_defined();
    cpu.set_gpr::<u32>(2, Shadowed::initialized(0b100)); // edx
    let insn = Insn::new(Op::BtRm32Imm8)
        .with_modrm(ModRm::Reg(2))
        .with_imm1(2);
    cpu.exec(&insn).unwrap();
    assert!(cpu.flags.cf());

    // btc flips it.
    let insn = Insn::new(Op::BtcRm32Imm8)
        .with_modrm(ModRm::Reg(2))
        .with_imm1(2);
    cpu.exec(&insn).unwrap();
    assert_eq!(cpu.gpr::<u32>(2).value(), 0);
}

#[test]
fn bsf_bsr_and_zero_source() {
    let mut cpu = cpu_defined();
    cpu.set_gpr::<u32>(1, Shadowed::initialized(0x0080_0100));
    cpu.set_gpr::<u32>(0, Shadowed::initialized(0x5555_5555));

    let insn = Insn::new(Op::BsfReg32Rm32)
        .with_reg(0)
        .with_modrm(ModRm::Reg(1));
    cpu.exec(&insn).unwrap();
    assert!(!cpu.flags.zf());
    assert_eq!(cpu.regs.eax().value(), 8);

    let insn = Insn::new(Op::BsrReg32Rm32)
        .with_reg(0)
        .with_modrm(ModRm::Reg(1));
    cpu.exec(&insn).unwrap();
    assert_eq!(cpu.regs.eax().value(), 23);

    // Zero source: ZF=1, destination untouched.
    cpu.set_gpr::<u32>(1, Shadowed::initialized(0));
    cpu.exec(&insn).unwrap();
    assert!(cpu.flags.zf());
    assert_eq!(cpu.regs.eax().value(), 23);
}

#[test]
fn shift_group_routes_by_slot() {
    let mut cpu = cpu_defined();
    cpu.set_gpr::<u8>(3, Shadowed::initialized(0b0000_0001)); // bl

    // C0 /4 (shl bl, 3)
    let insn = Insn::new(Op::ShiftGrpRm8Imm8)
        .with_modrm(ModRm::Reg(3))
        .with_reg(4)
        .with_imm1(3);
    cpu.exec(&insn).unwrap();
    assert_eq!(cpu.gpr::<u8>(3).value(), 0b1000);

    // C0 /0 (rol bl, 1)
    let insn = Insn::new(Op::ShiftGrpRm8Imm8)
        .with_modrm(ModRm::Reg(3))
        .with_reg(0)
        .with_imm1(1);
    cpu.exec(&insn).unwrap();
    assert_eq!(cpu.gpr::<u8>(3).value(), 0b1_0000);
}

#[test]
fn shld_pulls_bits_from_source_register() {
    let mut cpu = cpu_defined();
    cpu.set_gpr::<u32>(0, Shadowed::initialized(0x8000_0001));
    cpu.set_gpr::<u32>(3, Shadowed::initialized(0xF000_0000));
    let insn = Insn::new(Op::ShldRm32Reg32Imm8)
        .with_modrm(ModRm::Reg(0))
        .with_reg(3)
        .with_imm1(4);
    cpu.exec(&insn).unwrap();
    assert_eq!(cpu.regs.eax().value(), 0x0000_001F);
    assert!(
        !cpu.flags.cf(),
        "bit 28 of the old destination shifts out last and it is clear"
    );
}

#[test]
fn xadd_swaps_old_value_into_source() {
    let mut cpu = cpu_defined();
    cpu.set_gpr::<u32>(0, Shadowed::initialized(10));
    cpu.set_gpr::<u32>(3, Shadowed::initialized(32));
    let insn = Insn::new(Op::XaddRm32Reg32)
        .with_modrm(ModRm::Reg(0))
        .with_reg(3);
    cpu.exec(&insn).unwrap();
    assert_eq!(cpu.regs.eax().value(), 42);
    assert_eq!(cpu.gpr::<u32>(3).value(), 10);
}

#[test]
fn cmpxchg_match_and_mismatch() {
    let mut cpu = cpu_defined();
    cpu.regs.set_eax(Shadowed::initialized(7));
    cpu.set_gpr::<u32>(1, Shadowed::initialized(7)); // ecx (dest)
    cpu.set_gpr::<u32>(3, Shadowed::initialized(99)); // ebx (replacement)

    let insn = Insn::new(Op::CmpxchgRm32Reg32)
        .with_modrm(ModRm::Reg(1))
        .with_reg(3);
    cpu.exec(&insn).unwrap();
    assert!(cpu.flags.zf());
    assert_eq!(cpu.gpr::<u32>(1).value(), 99);

    // Mismatch loads the accumulator instead.
    cpu.exec(&insn).unwrap();
    assert!(!cpu.flags.zf());
    assert_eq!(cpu.regs.eax().value(), 99);
}

#[test]
fn bcd_daa_adjusts_packed_sum() {
    // 0x15 + 0x27 = 0x3C, DAA corrects to 0x42.
    let mut cpu = cpu_defined();
    cpu.regs.set_eax(Shadowed::initialized(0x15));
    let insn = Insn::new(Op::AddRm8Imm8)
        .with_modrm(ModRm::Reg(0))
        .with_imm1(0x27);
    cpu.exec(&insn).unwrap();
    assert_eq!(cpu.regs.al().value(), 0x3C);
    cpu.exec(&Insn::new(Op::Daa)).unwrap();
    assert_eq!(cpu.regs.al().value(), 0x42);
    assert!(!cpu.flags.cf());
}

#[test]
fn bcd_aam_splits_digits() {
    let mut cpu = cpu_defined();
    cpu.regs.set_eax(Shadowed::initialized(53));
    cpu.exec(&Insn::new(Op::Aam).with_imm1(10)).unwrap();
    assert_eq!(cpu.regs.ah().value(), 5);
    assert_eq!(cpu.regs.al().value(), 3);

    let err = cpu.exec(&Insn::new(Op::Aam).with_imm1(0)).unwrap_err();
    assert_eq!(err, Trap::DivideError);
}

#[test]
fn movzx_movsx_values() {
    let mut cpu = cpu_defined();
    cpu.set_gpr::<u8>(1, Shadowed::initialized(0x80)); // cl
    let insn = Insn::new(Op::MovzxReg32Rm8)
        .with_reg(0)
        .with_modrm(ModRm::Reg(1));
    cpu.exec(&insn).unwrap();
    assert_eq!(cpu.regs.eax().value(), 0x80);

    let insn = Insn::new(Op::MovsxReg32Rm8)
        .with_reg(0)
        .with_modrm(ModRm::Reg(1));
    cpu.exec(&insn).unwrap();
    assert_eq!(cpu.regs.eax().value(), 0xFFFF_FF80);
}

#[test]
fn cwd_cdq_replicate_the_sign() {
    let mut cpu = cpu_defined();
    cpu.regs.set_eax(Shadowed::initialized(0x8000_0000));
    cpu.exec(&Insn::new(Op::Cdq)).unwrap();
    assert_eq!(cpu.regs.edx().value(), 0xFFFF_FFFF);

    cpu.regs.set_ax(Shadowed::initialized(0x7FFF));
    cpu.exec(&Insn::new(Op::Cwd)).unwrap();
    assert_eq!(cpu.regs.dx().value(), 0);
}

#[test]
fn bswap_reverses_bytes() {
    let mut cpu = cpu_defined();
    cpu.set_gpr::<u32>(2, Shadowed::initialized(0x1122_3344));
    cpu.exec(&Insn::new(Op::BswapReg32).with_reg(2)).unwrap();
    assert_eq!(cpu.gpr::<u32>(2).value(), 0x4433_2211);
}

#[test]
fn xlat_translates_through_table() {
    let mut cpu = cpu_defined();
    let table = MEM_BASE + 0x300;
    cpu.mmu.load(table, &[10, 20, 30, 40]);
    cpu.set_gpr::<u32>(Reg32::Ebx as u8, Shadowed::initialized(table));
    cpu.regs.set_al(Shadowed::initialized(2));
    cpu.exec(&Insn::new(Op::Xlat)).unwrap();
    assert_eq!(cpu.regs.al().value(), 30);
}

#[test]
fn unimplemented_coprocessor_and_invalid_opcodes() {
    let mut cpu = cpu_defined();
    assert_eq!(cpu.exec(&Insn::new(Op::Ud2)).unwrap_err(), Trap::InvalidOpcode);
    assert_eq!(
        cpu.exec(&Insn::new(Op::X87(umbra_cpu_core::X87Op::FaddRm32)))
            .unwrap_err(),
        Trap::Unimplemented("x87")
    );
    assert_eq!(
        cpu.exec(&Insn::new(Op::Mmx(umbra_cpu_core::MmxOp::MovqMmRm64)))
            .unwrap_err(),
        Trap::InvalidOpcode
    );
}

#[test]
fn cpuid_reports_the_virtual_identity() {
    let mut cpu = cpu_defined();
    cpu.regs.set_eax(Shadowed::initialized(0));
    cpu.exec(&Insn::new(Op::Cpuid)).unwrap();
    assert_eq!(cpu.regs.eax().value(), 1);
    let mut vendor = Vec::new();
    vendor.extend_from_slice(&cpu.regs.ebx().value().to_le_bytes());
    vendor.extend_from_slice(&cpu.regs.edx().value().to_le_bytes());
    vendor.extend_from_slice(&cpu.regs.ecx().value().to_le_bytes());
    assert_eq!(&vendor, b"UmbraSoftCPU");

    cpu.regs.set_eax(Shadowed::initialized(1));
    cpu.exec(&Insn::new(Op::Cpuid)).unwrap();
    assert_ne!(cpu.regs.edx().value() & 1, 0, "FPU bit");
}

#[test]
fn rdtsc_is_monotonic() {
    let mut cpu = cpu_defined();
    cpu.exec(&Insn::new(Op::Rdtsc)).unwrap();
    let first = (u64::from(cpu.regs.edx().value()) << 32) | u64::from(cpu.regs.eax().value());
    cpu.exec(&Insn::new(Op::Nop)).unwrap();
    cpu.exec(&Insn::new(Op::Rdtsc)).unwrap();
    let second = (u64::from(cpu.regs.edx().value()) << 32) | u64::from(cpu.regs.eax().value());
    assert!(second > first);
}

#[test]
fn rdrand_reports_success_with_defined_bytes() {
    let mut cpu = cpu_defined();
    cpu.exec(&Insn::new(Op::RdrandReg).with_reg(3)).unwrap();
    assert!(cpu.flags.cf());
    assert!(!cpu.gpr::<u32>(3).is_uninitialized());
}

#[test]
fn int_and_io_delegate_to_the_emulator() {
    let mut cpu = cpu_defined();
    assert_eq!(
        cpu.exec(&Insn::new(Op::IntImm8).with_imm1(0x80)).unwrap_err(),
        Trap::Interrupt { vector: 0x80 }
    );
    assert_eq!(cpu.exec(&Insn::new(Op::Hlt)).unwrap_err(), Trap::Halted);
    assert_eq!(
        cpu.exec(&Insn::new(Op::OutImm8Al).with_imm1(0x3F8)).unwrap_err(),
        Trap::PrivilegedIo { port: 0xF8 }
    );
}
