//! Property tests for the part-addressable register file: narrow writes
//! must never disturb the untouched bytes of value or shadow.

mod common;

use proptest::prelude::*;
use umbra_cpu_core::{Reg16, Reg32, Reg8, RegisterFile};
use umbra_shadow::Shadowed;

proptest! {
    #[test]
    fn low8_write_preserves_upper_bytes(
        cell_value in any::<u32>(),
        cell_shadow in any::<u32>(),
        byte_value in any::<u8>(),
        byte_shadow in any::<u8>(),
    ) {
        let mut regs = RegisterFile::new();
        regs.set_gpr32(Reg32::Eax, Shadowed::new(cell_value, cell_shadow));
        regs.set_gpr8(Reg8::Al, Shadowed::new(byte_value, byte_shadow));

        let after = regs.gpr32(Reg32::Eax);
        prop_assert_eq!(after.value() & 0xFFFF_FF00, cell_value & 0xFFFF_FF00);
        prop_assert_eq!(after.shadow() & 0xFFFF_FF00, cell_shadow & 0xFFFF_FF00);
        prop_assert_eq!(after.value() as u8, byte_value);
        prop_assert_eq!(after.shadow() as u8, byte_shadow);
    }

    #[test]
    fn high8_write_only_touches_byte_one(
        cell_value in any::<u32>(),
        cell_shadow in any::<u32>(),
        byte_value in any::<u8>(),
        byte_shadow in any::<u8>(),
    ) {
        let mut regs = RegisterFile::new();
        regs.set_gpr32(Reg32::Edx, Shadowed::new(cell_value, cell_shadow));
        regs.set_gpr8(Reg8::Dh, Shadowed::new(byte_value, byte_shadow));

        let after = regs.gpr32(Reg32::Edx);
        prop_assert_eq!(after.value() & 0xFFFF_00FF, cell_value & 0xFFFF_00FF);
        prop_assert_eq!(after.shadow() & 0xFFFF_00FF, cell_shadow & 0xFFFF_00FF);
        prop_assert_eq!((after.value() >> 8) as u8, byte_value);
        prop_assert_eq!((after.shadow() >> 8) as u8, byte_shadow);
    }

    #[test]
    fn low16_write_preserves_high_half(
        cell_value in any::<u32>(),
        cell_shadow in any::<u32>(),
        word_value in any::<u16>(),
        word_shadow in any::<u16>(),
    ) {
        let mut regs = RegisterFile::new();
        regs.set_gpr32(Reg32::Esi, Shadowed::new(cell_value, cell_shadow));
        regs.set_gpr16(Reg16::Si, Shadowed::new(word_value, word_shadow));

        let after = regs.gpr32(Reg32::Esi);
        prop_assert_eq!(after.value() >> 16, cell_value >> 16);
        prop_assert_eq!(after.shadow() >> 16, cell_shadow >> 16);
        prop_assert_eq!(after.value() as u16, word_value);
        prop_assert_eq!(after.shadow() as u16, word_shadow);
    }

    #[test]
    fn slice_reads_match_the_cell(
        cell_value in any::<u32>(),
        cell_shadow in any::<u32>(),
    ) {
        let mut regs = RegisterFile::new();
        regs.set_gpr32(Reg32::Ebx, Shadowed::new(cell_value, cell_shadow));

        prop_assert_eq!(regs.gpr16(Reg16::Bx).value(), cell_value as u16);
        prop_assert_eq!(regs.gpr16(Reg16::Bx).shadow(), cell_shadow as u16);
        prop_assert_eq!(regs.gpr8(Reg8::Bl).value(), cell_value as u8);
        prop_assert_eq!(regs.gpr8(Reg8::Bh).value(), (cell_value >> 8) as u8);
        prop_assert_eq!(regs.gpr8(Reg8::Bh).shadow(), (cell_shadow >> 8) as u8);
    }

    #[test]
    fn push_pop_is_the_identity(
        value in any::<u32>(),
        shadow in any::<u32>(),
    ) {
        let mut cpu = common::cpu();
        cpu.push32(Shadowed::new(value, shadow)).unwrap();
        let back = cpu.pop32().unwrap();
        prop_assert_eq!(back.value(), value);
        prop_assert_eq!(back.shadow(), shadow);
    }
}
