use thiserror::Error;

/// Condition that terminates the current instruction and hands control back
/// to the emulator.
///
/// Architectural faults (`#UD`, `#DE`, memory faults) and delegated system
/// events (software interrupts, HLT, port I/O) travel the same way: the
/// handler returns early through `?` without having committed any
/// architectural state, and the host decides whether to service, resume or
/// terminate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Trap {
    #[error("#UD invalid opcode")]
    InvalidOpcode,

    #[error("#DE divide error")]
    DivideError,

    #[error("memory fault at {addr:#010x}")]
    MemoryFault { addr: u32 },

    /// Software interrupt (`INT n`, `INT1`, `INT3`, `INTO`). EIP has already
    /// advanced past the instruction, so the host can service the vector and
    /// resume at the next one.
    #[error("int {vector:#04x}")]
    Interrupt { vector: u8 },

    #[error("halted")]
    Halted,

    /// Port I/O is not executable in user mode; the emulator decides what a
    /// port access means.
    #[error("privileged i/o on port {port:#06x}")]
    PrivilegedIo { port: u16 },

    #[error("privileged instruction")]
    Privileged,

    /// Decoded but deliberately not implemented by this core (x87/SSE
    /// arithmetic forwarded to a coprocessor stub).
    #[error("unimplemented: {0}")]
    Unimplemented(&'static str),
}
