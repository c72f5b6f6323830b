//! The instruction-fetch fast path: stream reads, cache rebuilds and
//! faults.

mod common;

use common::{cpu, MEM_BASE, MEM_SIZE};
use pretty_assertions::assert_eq;
use umbra_cpu_core::{InsnStream, LogicalAddress, Trap};
use umbra_shadow::Shadowed;

#[test]
fn stream_reads_advance_eip() {
    let mut cpu = cpu();
    cpu.mmu.load(MEM_BASE, &[0x90, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12]);
    cpu.set_eip(MEM_BASE);

    assert_eq!(cpu.read_u8().unwrap(), 0x90);
    assert_eq!(cpu.eip(), MEM_BASE + 1);
    assert_eq!(cpu.read_u16().unwrap(), 0x1234);
    assert_eq!(cpu.eip(), MEM_BASE + 3);
    assert_eq!(cpu.read_u32().unwrap(), 0x1234_5678);
    assert_eq!(cpu.eip(), MEM_BASE + 7);
}

#[test]
fn the_stream_never_claims_readability() {
    let cpu = cpu();
    assert!(!cpu.can_read());
}

#[test]
fn fetch_outside_any_region_faults() {
    let mut cpu = cpu();
    cpu.set_eip(0x10);
    assert_eq!(
        cpu.read_u8().unwrap_err(),
        Trap::MemoryFault { addr: 0x10 }
    );
}

#[test]
fn fetch_running_off_the_region_end_faults() {
    let mut cpu = cpu();
    let last = MEM_BASE + MEM_SIZE as u32 - 1;
    cpu.mmu.load(last, &[0xC3]);
    cpu.set_eip(last);
    assert_eq!(cpu.read_u8().unwrap(), 0xC3);
    assert_eq!(
        cpu.read_u8().unwrap_err(),
        Trap::MemoryFault {
            addr: MEM_BASE + MEM_SIZE as u32
        }
    );
}

#[test]
fn wide_fetch_at_the_boundary_faults() {
    let mut cpu = cpu();
    let near_end = MEM_BASE + MEM_SIZE as u32 - 2;
    cpu.mmu.load(near_end, &[0xAA, 0xBB]);
    cpu.set_eip(near_end);
    assert_eq!(
        cpu.read_u32().unwrap_err(),
        Trap::MemoryFault { addr: near_end }
    );
    // A narrower read at the same spot still works.
    assert_eq!(cpu.read_u16().unwrap(), 0xBBAA);
}

#[test]
fn cache_rebuilds_after_a_jump_and_eip_stays_in_region() {
    let mut cpu = cpu();
    cpu.mmu.load(MEM_BASE, &[0x11; 16]);
    cpu.mmu.load(MEM_BASE + 0x800, &[0x22; 16]);

    cpu.set_eip(MEM_BASE);
    assert_eq!(cpu.read_u8().unwrap(), 0x11);

    // A jump elsewhere: next fetch resolves the region again.
    cpu.set_eip(MEM_BASE + 0x800);
    assert_eq!(cpu.read_u8().unwrap(), 0x22);
    assert_eq!(cpu.eip(), MEM_BASE + 0x801);
}

#[test]
fn fetched_bytes_track_memory_writes() {
    // Self-modifying code: a store through the MMU must be visible to the
    // next fetch from the same region.
    let mut cpu = cpu();
    cpu.mmu.load(MEM_BASE, &[0x90, 0x90]);
    cpu.set_eip(MEM_BASE);
    assert_eq!(cpu.read_u8().unwrap(), 0x90);

    cpu.write_mem(
        LogicalAddress::new(0, MEM_BASE + 1),
        Shadowed::initialized(0xCCu8),
    )
    .unwrap();
    assert_eq!(cpu.read_u8().unwrap(), 0xCC);
}

#[test]
fn code_bytes_fetch_regardless_of_shadow() {
    // The fetch path does not consult shadow bookkeeping: code that was
    // never "initialized" still executes.
    let mut cpu = cpu();
    cpu.set_eip(MEM_BASE + 0x100);
    // Nothing was loaded there; the bytes are zero and tainted, but the
    // fetch succeeds.
    assert_eq!(cpu.read_u8().unwrap(), 0);
    assert_eq!(cpu.mmu.shadow_at(MEM_BASE + 0x100), 0xFF);
}

#[test]
fn read_u64_assembles_little_endian() {
    let mut cpu = cpu();
    cpu.mmu
        .load(MEM_BASE, &[1, 2, 3, 4, 5, 6, 7, 8]);
    cpu.set_eip(MEM_BASE);
    assert_eq!(cpu.read_u64().unwrap(), 0x0807_0605_0403_0201);
}
