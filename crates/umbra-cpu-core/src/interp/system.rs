//! System, I/O and identification instructions.
//!
//! User-mode execution means most of these delegate: software interrupts
//! and HLT surface as traps for the emulator to service, port I/O and the
//! descriptor-table loads are privileged. CPUID/RDTSC/RDRAND are answered
//! locally.

use umbra_shadow::Shadowed;

use crate::cpu::SoftCpu;
use crate::insn::{Insn, OperandSize};
use crate::mem::Mmu;
use crate::trap::Trap;

/// CPUID identity: a deliberately boring virtual CPU. Leaf 1 reports
/// family 6, plus FPU/TSC/CMOV/CMPXCHG8B and the RDRND bit matching what
/// this core actually answers.
const CPUID_VENDOR: [u32; 3] = [
    u32::from_le_bytes(*b"Umbr"),
    u32::from_le_bytes(*b"aSof"),
    u32::from_le_bytes(*b"tCPU"),
];
const CPUID_MAX_LEAF: u32 = 1;
const CPUID_SIGNATURE: u32 = 0x0000_0611;
const CPUID_FEATURES_ECX: u32 = 1 << 30; // RDRND
const CPUID_FEATURES_EDX: u32 = (1 << 0) | (1 << 4) | (1 << 8) | (1 << 15); // FPU, TSC, CX8, CMOV

impl<M: Mmu> SoftCpu<M> {
    pub(crate) fn cpuid(&mut self) {
        let leaf = self.regs.eax();
        if leaf.is_uninitialized() {
            self.report_taint("cpuid leaf");
        }
        let (eax, ebx, ecx, edx) = match leaf.value() {
            0 => (
                CPUID_MAX_LEAF,
                CPUID_VENDOR[0],
                CPUID_VENDOR[2],
                CPUID_VENDOR[1],
            ),
            1 => (
                CPUID_SIGNATURE,
                0,
                CPUID_FEATURES_ECX,
                CPUID_FEATURES_EDX,
            ),
            _ => (0, 0, 0, 0),
        };
        self.regs.set_eax(Shadowed::initialized(eax));
        self.regs
            .set_gpr32(crate::regs::Reg32::Ebx, Shadowed::initialized(ebx));
        self.regs.set_ecx(Shadowed::initialized(ecx));
        self.regs.set_edx(Shadowed::initialized(edx));
    }

    pub(crate) fn rdtsc(&mut self) {
        let tsc = self.tsc;
        self.regs.set_eax(Shadowed::initialized(tsc as u32));
        self.regs
            .set_edx(Shadowed::initialized((tsc >> 32) as u32));
    }

    /// RDRAND/RDSEED: defined bytes from the host RNG, CF=1 for success.
    pub(crate) fn rdrand(&mut self, insn: &Insn) {
        let value = self.random_u64();
        match insn.operand_size {
            OperandSize::O16 => {
                self.set_gpr::<u16>(insn.reg, Shadowed::initialized(value as u16))
            }
            OperandSize::O32 => {
                self.set_gpr::<u32>(insn.reg, Shadowed::initialized(value as u32))
            }
        }
        self.flags.update_oszapc(false, false, false, false, false, true);
        self.flags.taint_from([false]);
    }

    pub(crate) fn int_imm8(&mut self, insn: &Insn) -> Result<(), Trap> {
        Err(Trap::Interrupt {
            vector: insn.imm8(),
        })
    }

    /// INTO: #OF (vector 4) only when OF is set; deciding that from
    /// tainted flags is a diagnostic.
    pub(crate) fn into_insn(&mut self) -> Result<(), Trap> {
        self.warn_if_flags_tainted("into");
        if self.flags.of() {
            return Err(Trap::Interrupt { vector: 4 });
        }
        Ok(())
    }

    pub(crate) fn in_insn(&mut self, port: u16) -> Result<(), Trap> {
        Err(Trap::PrivilegedIo { port })
    }

    pub(crate) fn out_insn(&mut self, port: u16) -> Result<(), Trap> {
        Err(Trap::PrivilegedIo { port })
    }

    pub(crate) fn io_port_from_dx(&mut self) -> u16 {
        let dx = self.regs.dx();
        if dx.is_uninitialized() {
            self.report_taint("i/o port");
        }
        dx.value()
    }

    /// LAR/LSL/VERR/VERW: no descriptor tables exist here, so every
    /// selector is "not accessible" and ZF answers 0.
    pub(crate) fn descriptor_query(&mut self, insn: &Insn) -> Result<(), Trap> {
        // The operand still decodes; read it for fault behavior.
        let _ = self.read_rm::<u16>(insn)?;
        self.flags.set_zf(false);
        self.flags.taint_from([false]);
        Ok(())
    }

    pub(crate) fn ldmxcsr(&mut self, insn: &Insn) -> Result<(), Trap> {
        let addr = self.resolve_ea(insn);
        let value = self.read_mem::<u32>(addr)?;
        if value.is_uninitialized() {
            self.report_taint("ldmxcsr");
        }
        self.vpu.set_mxcsr(value.value())
    }

    pub(crate) fn stmxcsr(&mut self, insn: &Insn) -> Result<(), Trap> {
        let addr = self.resolve_ea(insn);
        let value = self.vpu.mxcsr();
        self.write_mem(addr, Shadowed::initialized(value))
    }

    /// FNSTCW/FLDCW move the x87 control word through memory.
    pub(crate) fn fnstcw(&mut self, insn: &Insn) -> Result<(), Trap> {
        let addr = self.resolve_ea(insn);
        let fcw = self.fpu.control_word();
        self.write_mem(addr, Shadowed::initialized(fcw))
    }

    pub(crate) fn fldcw(&mut self, insn: &Insn) -> Result<(), Trap> {
        let addr = self.resolve_ea(insn);
        let value = self.read_mem::<u16>(addr)?;
        if value.is_uninitialized() {
            self.report_taint("fldcw");
        }
        self.fpu.set_control_word(value.value());
        Ok(())
    }

    /// FNSTSW AX: the x87 status word lands in AX, defined.
    pub(crate) fn fnstsw_ax(&mut self) {
        let fsw = self.fpu.status_word();
        self.regs.set_ax(Shadowed::initialized(fsw));
    }

    pub(crate) fn fnstsw_rm(&mut self, insn: &Insn) -> Result<(), Trap> {
        let fsw = self.fpu.status_word();
        self.write_rm::<u16>(insn, Shadowed::initialized(fsw))
    }
}
