//! Architectural CPU state and the operand plumbing the handlers share.

use std::fmt::Write as _;

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use umbra_shadow::{Shadowed, Word};

use crate::flags::Flags;
use crate::fpu::SoftFpu;
use crate::insn::{AddressSize, Insn, InsnStream, MemRef, ModRm};
use crate::mem::{CodeRegion, LogicalAddress, Mmu};
use crate::regs::{Reg16, Reg32, Reg8, RegisterFile, SegReg};
use crate::trap::Trap;
use crate::vpu::SoftVpu;

/// One taint diagnostic: where execution was (`base_eip` of the consuming
/// instruction) and what consumed the uninitialized data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaintReport {
    pub eip: u32,
    pub context: String,
}

/// The taint-tracking 32-bit x86 interpreter core.
///
/// Owns the register file, EFLAGS, the fetch cache and the coprocessor
/// sub-objects; the memory subsystem is supplied by the emulator and
/// accessed through the [`Mmu`] trait.
pub struct SoftCpu<M: Mmu> {
    pub mmu: M,
    pub regs: RegisterFile,
    pub flags: Flags,
    pub(crate) fpu: SoftFpu,
    pub(crate) vpu: SoftVpu,
    eip: u32,
    base_eip: u32,
    pub(crate) tsc: u64,
    code_cache: Option<CodeRegion>,
    taint_reports: Vec<TaintReport>,
    pub(crate) rng: SmallRng,
}

impl<M: Mmu> SoftCpu<M> {
    pub fn new(mmu: M) -> Self {
        SoftCpu {
            mmu,
            regs: RegisterFile::new(),
            flags: Flags::new(),
            fpu: SoftFpu::new(),
            vpu: SoftVpu::new(),
            eip: 0,
            base_eip: 0,
            tsc: 0,
            code_cache: None,
            taint_reports: Vec::new(),
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn eip(&self) -> u32 {
        self.eip
    }

    pub fn set_eip(&mut self, eip: u32) {
        self.eip = eip;
    }

    pub fn base_eip(&self) -> u32 {
        self.base_eip
    }

    /// Host-loop protocol: snapshot EIP before decoding so faults and taint
    /// diagnostics can name the instruction that caused them.
    pub fn save_base_eip(&mut self) {
        self.base_eip = self.eip;
    }

    pub fn tsc(&self) -> u64 {
        self.tsc
    }

    pub fn fpu(&self) -> &SoftFpu {
        &self.fpu
    }

    pub fn vpu(&self) -> &SoftVpu {
        &self.vpu
    }

    // ------------------------------------------------------------------
    // Instruction fetch.
    // ------------------------------------------------------------------

    fn update_code_cache(&mut self) -> Result<(), Trap> {
        self.code_cache = self.mmu.code_region(self.eip);
        if self.code_cache.is_some() {
            Ok(())
        } else {
            Err(Trap::MemoryFault { addr: self.eip })
        }
    }

    fn fetch<const N: usize>(&mut self) -> Result<[u8; N], Trap> {
        let cached = self
            .code_cache
            .as_ref()
            .is_some_and(|region| region.contains(self.eip));
        if !cached {
            self.update_code_cache()?;
        }
        let Some(region) = self.code_cache.as_ref() else {
            return Err(Trap::MemoryFault { addr: self.eip });
        };
        let Some(bytes) = region.read_at::<N>(self.eip) else {
            // EIP sits in the region but the read runs off its end.
            return Err(Trap::MemoryFault { addr: self.eip });
        };
        self.eip = self.eip.wrapping_add(N as u32);
        Ok(bytes)
    }

    // ------------------------------------------------------------------
    // Register access, width-generic for the operation templates.
    // ------------------------------------------------------------------

    pub fn gpr<T: Word>(&self, index: u8) -> Shadowed<T> {
        match T::BITS {
            8 => {
                let v = self.regs.gpr8(Reg8::from_index(index));
                Shadowed::new(T::from_u64(v.value().into()), T::from_u64(v.shadow().into()))
            }
            16 => {
                let v = self.regs.gpr16(Reg16::from_index(index));
                Shadowed::new(T::from_u64(v.value().into()), T::from_u64(v.shadow().into()))
            }
            32 => {
                let v = self.regs.gpr32(Reg32::from_index(index));
                Shadowed::new(T::from_u64(v.value().into()), T::from_u64(v.shadow().into()))
            }
            bits => panic!("unsupported register width: {bits}"),
        }
    }

    pub fn set_gpr<T: Word>(&mut self, index: u8, v: Shadowed<T>) {
        match T::BITS {
            8 => self.regs.set_gpr8(
                Reg8::from_index(index),
                Shadowed::new(v.value().to_u64() as u8, v.shadow().to_u64() as u8),
            ),
            16 => self.regs.set_gpr16(
                Reg16::from_index(index),
                Shadowed::new(v.value().to_u64() as u16, v.shadow().to_u64() as u16),
            ),
            32 => self.regs.set_gpr32(
                Reg32::from_index(index),
                Shadowed::new(v.value().to_u64() as u32, v.shadow().to_u64() as u32),
            ),
            bits => panic!("unsupported register width: {bits}"),
        }
    }

    /// The accumulator at width `T` (AL/AX/EAX share index 0).
    pub fn acc<T: Word>(&self) -> Shadowed<T> {
        self.gpr::<T>(0)
    }

    pub fn set_acc<T: Word>(&mut self, v: Shadowed<T>) {
        self.set_gpr::<T>(0, v);
    }

    pub fn segment(&self, seg: SegReg) -> u16 {
        self.regs.segment(seg)
    }

    pub fn set_segment(&mut self, seg: SegReg, selector: u16) {
        self.regs.set_segment(seg, selector);
    }

    // ------------------------------------------------------------------
    // Memory access.
    // ------------------------------------------------------------------

    pub fn logical(&self, seg: SegReg, offset: u32) -> LogicalAddress {
        LogicalAddress::new(self.segment(seg), offset)
    }

    pub fn read_mem<T: umbra_shadow::MemValue>(
        &mut self,
        addr: LogicalAddress,
    ) -> Result<Shadowed<T>, Trap> {
        self.mmu.read(addr)
    }

    pub fn write_mem<T: umbra_shadow::MemValue>(
        &mut self,
        addr: LogicalAddress,
        v: Shadowed<T>,
    ) -> Result<(), Trap> {
        self.mmu.write(addr, v)
    }

    /// Effective-address computation for a ModRM memory operand. Consuming
    /// an uninitialized register slice as an address component is a taint
    /// diagnostic (but not a fault).
    pub fn resolve_ea(&mut self, insn: &Insn) -> LogicalAddress {
        let ModRm::Mem(mem) = insn.rm() else {
            panic!("resolve_ea on a register operand");
        };
        self.resolve_mem(insn, &mem)
    }

    pub(crate) fn resolve_mem(&mut self, insn: &Insn, mem: &MemRef) -> LogicalAddress {
        let mut offset = mem.disp as u32;
        let mut tainted = false;

        if let Some(base) = mem.base {
            let v = self.regs.gpr32(base);
            offset = offset.wrapping_add(v.value());
            tainted |= self.slice_tainted(v, insn.address_size);
        }
        if let Some(index) = mem.index {
            let v = self.regs.gpr32(index);
            let scaled = v.value().wrapping_mul(u32::from(mem.scale.max(1)));
            offset = offset.wrapping_add(scaled);
            tainted |= self.slice_tainted(v, insn.address_size);
        }
        if insn.address_size == AddressSize::A16 {
            offset &= 0xFFFF;
        }

        if tainted {
            self.report_taint("memory address");
        }

        let seg = insn.seg_override.unwrap_or_else(|| mem.default_segment());
        self.logical(seg, offset)
    }

    fn slice_tainted(&self, v: Shadowed<u32>, address_size: AddressSize) -> bool {
        match address_size {
            AddressSize::A32 => v.is_uninitialized(),
            AddressSize::A16 => (v.shadow() & 0xFFFF) != 0,
        }
    }

    /// moff forms address memory with a bare displacement (segment
    /// override still applies).
    pub(crate) fn moff_address(&self, insn: &Insn) -> LogicalAddress {
        let seg = insn.seg_override.unwrap_or(SegReg::Ds);
        let offset = match insn.address_size {
            AddressSize::A16 => insn.imm1 & 0xFFFF,
            AddressSize::A32 => insn.imm1,
        };
        self.logical(seg, offset)
    }

    pub fn read_rm<T: Word>(&mut self, insn: &Insn) -> Result<Shadowed<T>, Trap> {
        match insn.rm() {
            ModRm::Reg(r) => Ok(self.gpr::<T>(r)),
            ModRm::Mem(_) => {
                let addr = self.resolve_ea(insn);
                self.read_mem(addr)
            }
        }
    }

    pub fn write_rm<T: Word>(&mut self, insn: &Insn, v: Shadowed<T>) -> Result<(), Trap> {
        match insn.rm() {
            ModRm::Reg(r) => {
                self.set_gpr::<T>(r, v);
                Ok(())
            }
            ModRm::Mem(_) => {
                let addr = self.resolve_ea(insn);
                self.write_mem(addr, v)
            }
        }
    }

    // ------------------------------------------------------------------
    // Stack.
    // ------------------------------------------------------------------

    pub fn push32(&mut self, v: Shadowed<u32>) -> Result<(), Trap> {
        let esp = self.regs.esp();
        if esp.is_uninitialized() {
            self.report_taint("stack pointer");
        }
        let new_sp = esp.value().wrapping_sub(4);
        let addr = self.logical(SegReg::Ss, new_sp);
        self.write_mem(addr, v)?;
        self.regs.set_esp(Shadowed::new(new_sp, esp.shadow()));
        Ok(())
    }

    pub fn pop32(&mut self) -> Result<Shadowed<u32>, Trap> {
        let esp = self.regs.esp();
        if esp.is_uninitialized() {
            self.report_taint("stack pointer");
        }
        let addr = self.logical(SegReg::Ss, esp.value());
        let v = self.read_mem(addr)?;
        self.regs
            .set_esp(Shadowed::new(esp.value().wrapping_add(4), esp.shadow()));
        Ok(v)
    }

    pub fn push16(&mut self, v: Shadowed<u16>) -> Result<(), Trap> {
        let esp = self.regs.esp();
        if esp.is_uninitialized() {
            self.report_taint("stack pointer");
        }
        let new_sp = esp.value().wrapping_sub(2);
        let addr = self.logical(SegReg::Ss, new_sp);
        self.write_mem(addr, v)?;
        self.regs.set_esp(Shadowed::new(new_sp, esp.shadow()));
        Ok(())
    }

    pub fn pop16(&mut self) -> Result<Shadowed<u16>, Trap> {
        let esp = self.regs.esp();
        if esp.is_uninitialized() {
            self.report_taint("stack pointer");
        }
        let addr = self.logical(SegReg::Ss, esp.value());
        let v = self.read_mem(addr)?;
        self.regs
            .set_esp(Shadowed::new(esp.value().wrapping_add(2), esp.shadow()));
        Ok(v)
    }

    /// Loader helper: place a defined byte blob on the stack.
    pub fn push_buffer(&mut self, data: &[u8]) -> Result<u32, Trap> {
        let new_sp = self.regs.esp().value().wrapping_sub(data.len() as u32);
        for (i, &byte) in data.iter().enumerate() {
            let addr = self.logical(SegReg::Ss, new_sp.wrapping_add(i as u32));
            self.write_mem(addr, Shadowed::initialized(byte))?;
        }
        self.regs.set_esp(Shadowed::initialized(new_sp));
        Ok(new_sp)
    }

    /// Loader helper: place a NUL-terminated string on the stack and return
    /// its address.
    pub fn push_string(&mut self, s: &str) -> Result<u32, Trap> {
        let mut bytes = s.as_bytes().to_vec();
        bytes.push(0);
        self.push_buffer(&bytes)
    }

    // ------------------------------------------------------------------
    // String-operation index registers.
    // ------------------------------------------------------------------

    pub fn source_index(&self, address_size: AddressSize) -> Shadowed<u32> {
        self.index_reg(Reg32::Esi, address_size)
    }

    pub fn destination_index(&self, address_size: AddressSize) -> Shadowed<u32> {
        self.index_reg(Reg32::Edi, address_size)
    }

    pub fn loop_index(&self, address_size: AddressSize) -> Shadowed<u32> {
        self.index_reg(Reg32::Ecx, address_size)
    }

    fn index_reg(&self, reg: Reg32, address_size: AddressSize) -> Shadowed<u32> {
        let v = self.regs.gpr32(reg);
        match address_size {
            AddressSize::A32 => v,
            AddressSize::A16 => Shadowed::new(v.value() & 0xFFFF, v.shadow() & 0xFFFF),
        }
    }

    /// ECX/CX predecrement; answers whether the counter reached zero.
    pub fn decrement_loop_index(&mut self, address_size: AddressSize) -> bool {
        match address_size {
            AddressSize::A32 => {
                let ecx = self.regs.ecx();
                let new = ecx.value().wrapping_sub(1);
                self.regs.set_ecx(Shadowed::new(new, ecx.shadow()));
                new == 0
            }
            AddressSize::A16 => {
                let cx = self.regs.cx();
                let new = cx.value().wrapping_sub(1);
                self.regs.set_gpr16(Reg16::Cx, Shadowed::new(new, cx.shadow()));
                new == 0
            }
        }
    }

    pub fn step_source_index(&mut self, address_size: AddressSize, step: u32) {
        self.step_index(Reg32::Esi, address_size, step);
    }

    pub fn step_destination_index(&mut self, address_size: AddressSize, step: u32) {
        self.step_index(Reg32::Edi, address_size, step);
    }

    fn step_index(&mut self, reg: Reg32, address_size: AddressSize, step: u32) {
        let v = self.regs.gpr32(reg);
        let stepped = if self.flags.df() {
            v.value().wrapping_sub(step)
        } else {
            v.value().wrapping_add(step)
        };
        let new = match address_size {
            AddressSize::A32 => stepped,
            AddressSize::A16 => (v.value() & 0xFFFF_0000) | (stepped & 0xFFFF),
        };
        self.regs.set_gpr32(reg, Shadowed::new(new, v.shadow()));
    }

    // ------------------------------------------------------------------
    // Taint diagnostics.
    // ------------------------------------------------------------------

    pub fn warn_if_flags_tainted(&mut self, context: &str) {
        if self.flags.tainted() {
            self.report_taint(context);
        }
    }

    pub(crate) fn report_taint(&mut self, context: &str) {
        tracing::warn!(
            base_eip = self.base_eip,
            "use of uninitialized value: {context}"
        );
        self.taint_reports.push(TaintReport {
            eip: self.base_eip,
            context: context.to_owned(),
        });
    }

    pub fn taint_reports(&self) -> &[TaintReport] {
        &self.taint_reports
    }

    pub fn drain_taint_reports(&mut self) -> Vec<TaintReport> {
        std::mem::take(&mut self.taint_reports)
    }

    // ------------------------------------------------------------------
    // Debugging.
    // ------------------------------------------------------------------

    /// Register/flag snapshot for the debugger.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let regs = [
            ("eax", self.regs.eax()),
            ("ebx", self.regs.ebx()),
            ("ecx", self.regs.ecx()),
            ("edx", self.regs.edx()),
            ("esp", self.regs.esp()),
            ("ebp", self.regs.ebp()),
            ("esi", self.regs.esi()),
            ("edi", self.regs.edi()),
        ];
        for (name, v) in regs {
            let _ = writeln!(
                out,
                "{name}={:#010x} shadow={:#010x}",
                v.value(),
                v.shadow()
            );
        }
        let f = &self.flags;
        let _ = writeln!(
            out,
            "eip={:#010x} eflags={:#010x} o={} s={} z={} a={} p={} c={}{}",
            self.eip,
            f.bits(),
            f.of() as u8,
            f.sf() as u8,
            f.zf() as u8,
            f.af() as u8,
            f.pf() as u8,
            f.cf() as u8,
            if f.tainted() { " (tainted)" } else { "" },
        );
        let _ = writeln!(
            out,
            "cs={:#06x} ds={:#06x} es={:#06x} ss={:#06x} fs={:#06x} gs={:#06x}",
            self.segment(SegReg::Cs),
            self.segment(SegReg::Ds),
            self.segment(SegReg::Es),
            self.segment(SegReg::Ss),
            self.segment(SegReg::Fs),
            self.segment(SegReg::Gs),
        );
        out
    }

    pub(crate) fn random_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }
}

impl<M: Mmu> InsnStream for SoftCpu<M> {
    fn can_read(&self) -> bool {
        false
    }

    fn read_u8(&mut self) -> Result<u8, Trap> {
        Ok(u8::from_le_bytes(self.fetch::<1>()?))
    }

    fn read_u16(&mut self) -> Result<u16, Trap> {
        Ok(u16::from_le_bytes(self.fetch::<2>()?))
    }

    fn read_u32(&mut self) -> Result<u32, Trap> {
        Ok(u32::from_le_bytes(self.fetch::<4>()?))
    }

    fn read_u64(&mut self) -> Result<u64, Trap> {
        Ok(u64::from_le_bytes(self.fetch::<8>()?))
    }
}
