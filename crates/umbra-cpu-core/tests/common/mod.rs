// Shared test helpers (integration tests compile as separate crates, so
// each binary only uses a subset of these).
#![allow(dead_code)]

use umbra_cpu_core::{FlatMmu, SoftCpu};
use umbra_shadow::Shadowed;

pub const MEM_BASE: u32 = 0x1000;
pub const MEM_SIZE: usize = 0x4000;
pub const STACK_TOP: u32 = MEM_BASE + MEM_SIZE as u32;

/// A CPU over one flat region with a defined stack pointer at the top of
/// memory. Registers other than ESP keep their born-uninitialized shadow.
pub fn cpu() -> SoftCpu<FlatMmu> {
    let mmu = FlatMmu::new(MEM_BASE, MEM_SIZE);
    let mut cpu = SoftCpu::new(mmu);
    cpu.regs.set_esp(Shadowed::initialized(STACK_TOP));
    cpu
}

/// Same, but with every GP register defined to zero, for tests that only
/// care about values and flags.
pub fn cpu_defined() -> SoftCpu<FlatMmu> {
    let mut cpu = cpu();
    for i in 0..8u8 {
        if i != 4 {
            cpu.set_gpr::<u32>(i, Shadowed::initialized(0));
        }
    }
    cpu
}
