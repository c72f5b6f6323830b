//! The x87/MMX coprocessor sub-object.
//!
//! The integer core forwards every x87/MMX escape here. This build keeps
//! only the architectural control state the integer core is coupled to
//! (`FNSTSW AX` reads the status word, `FNINIT`/`FNCLEX`/`EMMS` reset it);
//! the arithmetic stack itself lives behind [`Trap::Unimplemented`] until
//! the full coprocessor lands.

use crate::op::{MmxOp, X87Op};
use crate::trap::Trap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftFpu {
    /// FPU Control Word.
    fcw: u16,
    /// FPU Status Word; TOP-of-stack lives in bits 11..=13.
    fsw: u16,
    /// Abridged tag word.
    ftw: u8,
}

impl Default for SoftFpu {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftFpu {
    pub fn new() -> Self {
        let mut fpu = SoftFpu {
            fcw: 0,
            fsw: 0,
            ftw: 0,
        };
        fpu.reset();
        fpu
    }

    /// FNINIT.
    pub fn reset(&mut self) {
        self.fcw = 0x037F;
        self.fsw = 0;
        self.ftw = 0;
    }

    pub fn control_word(&self) -> u16 {
        self.fcw
    }

    pub fn set_control_word(&mut self, fcw: u16) {
        self.fcw = fcw;
    }

    pub fn status_word(&self) -> u16 {
        self.fsw
    }

    /// FNCLEX: drop the sticky exception bits and ES/B.
    pub fn clear_exceptions(&mut self) {
        self.fsw &= !0xC0FF;
    }

    /// EMMS: mark every register empty.
    pub fn emms(&mut self) {
        self.ftw = 0;
    }

    pub fn exec_x87(&mut self, op: X87Op) -> Result<(), Trap> {
        match op {
            X87Op::Fnop => Ok(()),
            X87Op::Fninit => {
                self.reset();
                Ok(())
            }
            X87Op::Fnclex => {
                self.clear_exceptions();
                Ok(())
            }
            // 8087 relics; modern CPUs treat them as no-ops.
            X87Op::Fneni | X87Op::Fndisi | X87Op::Fnsetpm => Ok(()),
            _ => Err(Trap::Unimplemented("x87")),
        }
    }

    pub fn exec_mmx(&mut self, op: MmxOp) -> Result<(), Trap> {
        match op {
            MmxOp::Emms => {
                self.emms();
                Ok(())
            }
            // Long-mode-only encodings decode but never execute here.
            MmxOp::MovqMmRm64 | MmxOp::MovqRm64Mm => Err(Trap::InvalidOpcode),
            _ => Err(Trap::Unimplemented("mmx")),
        }
    }
}
