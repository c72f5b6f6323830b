//! The decoded-opcode catalog.
//!
//! One variant per decoder output; [`crate::SoftCpu::exec`] routes each to
//! exactly one handler. Coprocessor escapes are grouped ([`X87Op`],
//! [`MmxOp`], [`SseOp`]) so the integer core can forward them wholesale and
//! still special-case the few entries that touch integer state.

/// Integer-core opcodes plus the coprocessor escape groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Aaa,
    Aad,
    Aam,
    Aas,
    AdcAlImm8,
    AdcAxImm16,
    AdcEaxImm32,
    AdcRm16Imm16,
    AdcRm16Imm8,
    AdcRm16Reg16,
    AdcRm32Imm32,
    AdcRm32Imm8,
    AdcRm32Reg32,
    AdcRm8Imm8,
    AdcRm8Reg8,
    AdcReg16Rm16,
    AdcReg32Rm32,
    AdcReg8Rm8,
    AddAlImm8,
    AddAxImm16,
    AddEaxImm32,
    AddRm16Imm16,
    AddRm16Imm8,
    AddRm16Reg16,
    AddRm32Imm32,
    AddRm32Imm8,
    AddRm32Reg32,
    AddRm8Imm8,
    AddRm8Reg8,
    AddReg16Rm16,
    AddReg32Rm32,
    AddReg8Rm8,
    AndAlImm8,
    AndAxImm16,
    AndEaxImm32,
    AndRm16Imm16,
    AndRm16Imm8,
    AndRm16Reg16,
    AndRm32Imm32,
    AndRm32Imm8,
    AndRm32Reg32,
    AndRm8Imm8,
    AndRm8Reg8,
    AndReg16Rm16,
    AndReg32Rm32,
    AndReg8Rm8,
    Arpl,
    Bound,
    BsfReg16Rm16,
    BsfReg32Rm32,
    BsrReg16Rm16,
    BsrReg32Rm32,
    BswapReg32,
    BtcRm16Imm8,
    BtcRm16Reg16,
    BtcRm32Imm8,
    BtcRm32Reg32,
    BtrRm16Imm8,
    BtrRm16Reg16,
    BtrRm32Imm8,
    BtrRm32Reg32,
    BtsRm16Imm8,
    BtsRm16Reg16,
    BtsRm32Imm8,
    BtsRm32Reg32,
    BtRm16Imm8,
    BtRm16Reg16,
    BtRm32Imm8,
    BtRm32Reg32,
    CallFarMem16,
    CallFarMem32,
    CallRm16,
    CallRm32,
    CallImm16,
    CallImm16Imm16,
    CallImm16Imm32,
    CallImm32,
    Cbw,
    Cdq,
    Clc,
    Cld,
    Cli,
    Clts,
    Cmc,
    CmovccReg16Rm16,
    CmovccReg32Rm32,
    Cmpsb,
    Cmpsd,
    Cmpsw,
    CmpxchgRm16Reg16,
    CmpxchgRm32Reg32,
    CmpxchgRm8Reg8,
    Cmpxchg8bM64,
    CmpAlImm8,
    CmpAxImm16,
    CmpEaxImm32,
    CmpRm16Imm16,
    CmpRm16Imm8,
    CmpRm16Reg16,
    CmpRm32Imm32,
    CmpRm32Imm8,
    CmpRm32Reg32,
    CmpRm8Imm8,
    CmpRm8Reg8,
    CmpReg16Rm16,
    CmpReg32Rm32,
    CmpReg8Rm8,
    Cpuid,
    Cwd,
    Cwde,
    Daa,
    Das,
    DecRm16,
    DecRm32,
    DecRm8,
    DecReg16,
    DecReg32,
    DivRm16,
    DivRm32,
    DivRm8,
    Enter16,
    Enter32,
    Escape,
    Hlt,
    IdivRm16,
    IdivRm32,
    IdivRm8,
    ImulRm16,
    ImulRm32,
    ImulRm8,
    ImulReg16Rm16,
    ImulReg16Rm16Imm16,
    ImulReg16Rm16Imm8,
    ImulReg32Rm32,
    ImulReg32Rm32Imm32,
    ImulReg32Rm32Imm8,
    IncRm16,
    IncRm32,
    IncRm8,
    IncReg16,
    IncReg32,
    Insb,
    Insd,
    Insw,
    Int1,
    Int3,
    Into,
    IntImm8,
    Invlpg,
    InAlDx,
    InAlImm8,
    InAxDx,
    InAxImm8,
    InEaxDx,
    InEaxImm8,
    Iret,
    JcxzImm8,
    JmpFarMem16,
    JmpFarMem32,
    JmpRm16,
    JmpRm32,
    JmpImm16,
    JmpImm16Imm16,
    JmpImm16Imm32,
    JmpImm32,
    JmpShortImm8,
    JccNearImm,
    JccImm8,
    Lahf,
    LarReg16Rm16,
    LarReg32Rm32,
    LdsReg16Mem16,
    LdsReg32Mem32,
    Leave16,
    Leave32,
    LeaReg16Mem16,
    LeaReg32Mem32,
    LesReg16Mem16,
    LesReg32Mem32,
    LfsReg16Mem16,
    LfsReg32Mem32,
    Lgdt,
    LgsReg16Mem16,
    LgsReg32Mem32,
    Lidt,
    LldtRm16,
    LmswRm16,
    Lodsb,
    Lodsd,
    Lodsw,
    LoopnzImm8,
    LoopzImm8,
    LoopImm8,
    LslReg16Rm16,
    LslReg32Rm32,
    LssReg16Mem16,
    LssReg32Mem32,
    LtrRm16,
    Movsb,
    Movsd,
    Movsw,
    MovsxReg16Rm8,
    MovsxReg32Rm16,
    MovsxReg32Rm8,
    MovzxReg16Rm8,
    MovzxReg32Rm16,
    MovzxReg32Rm8,
    MovAlMoff8,
    MovAxMoff16,
    MovCrReg32,
    MovDrReg32,
    MovEaxMoff32,
    MovRm16Imm16,
    MovRm16Reg16,
    MovRm16Seg,
    MovRm32Imm32,
    MovRm32Reg32,
    MovRm8Imm8,
    MovRm8Reg8,
    MovMoff16Ax,
    MovMoff32Eax,
    MovMoff8Al,
    MovReg16Rm16,
    MovReg16Imm16,
    MovReg32Cr,
    MovReg32Dr,
    MovReg32Rm32,
    MovReg32Imm32,
    MovReg8Rm8,
    MovReg8Imm8,
    MovSegRm16,
    MovSegRm32,
    MulRm16,
    MulRm32,
    MulRm8,
    NegRm16,
    NegRm32,
    NegRm8,
    Nop,
    NotRm16,
    NotRm32,
    NotRm8,
    OrAlImm8,
    OrAxImm16,
    OrEaxImm32,
    OrRm16Imm16,
    OrRm16Imm8,
    OrRm16Reg16,
    OrRm32Imm32,
    OrRm32Imm8,
    OrRm32Reg32,
    OrRm8Imm8,
    OrRm8Reg8,
    OrReg16Rm16,
    OrReg32Rm32,
    OrReg8Rm8,
    Outsb,
    Outsd,
    Outsw,
    OutDxAl,
    OutDxAx,
    OutDxEax,
    OutImm8Al,
    OutImm8Ax,
    OutImm8Eax,
    Popa,
    Popad,
    Popf,
    Popfd,
    PopDs,
    PopEs,
    PopFs,
    PopGs,
    PopRm16,
    PopRm32,
    PopSs,
    PopReg16,
    PopReg32,
    Pusha,
    Pushad,
    Pushf,
    Pushfd,
    PushCs,
    PushDs,
    PushEs,
    PushFs,
    PushGs,
    PushRm16,
    PushRm32,
    PushSp8086,
    PushSs,
    PushImm16,
    PushImm32,
    PushImm8,
    PushReg16,
    PushReg32,
    Prefetchnta,
    Prefetcht0,
    Prefetcht1,
    Prefetcht2,
    Ldmxcsr,
    Stmxcsr,
    RclRm16One,
    RclRm16Cl,
    RclRm16Imm8,
    RclRm32One,
    RclRm32Cl,
    RclRm32Imm8,
    RclRm8One,
    RclRm8Cl,
    RclRm8Imm8,
    RcrRm16One,
    RcrRm16Cl,
    RcrRm16Imm8,
    RcrRm32One,
    RcrRm32Cl,
    RcrRm32Imm8,
    RcrRm8One,
    RcrRm8Cl,
    RcrRm8Imm8,
    Rdtsc,
    RdrandReg,
    RdseedReg,
    Ret,
    Retf,
    RetfImm16,
    RetImm16,
    RolRm16One,
    RolRm16Cl,
    RolRm16Imm8,
    RolRm32One,
    RolRm32Cl,
    RolRm32Imm8,
    RolRm8One,
    RolRm8Cl,
    RolRm8Imm8,
    RorRm16One,
    RorRm16Cl,
    RorRm16Imm8,
    RorRm32One,
    RorRm32Cl,
    RorRm32Imm8,
    RorRm8One,
    RorRm8Cl,
    RorRm8Imm8,
    Sahf,
    Salc,
    SarRm16One,
    SarRm16Cl,
    SarRm16Imm8,
    SarRm32One,
    SarRm32Cl,
    SarRm32Imm8,
    SarRm8One,
    SarRm8Cl,
    SarRm8Imm8,
    SbbAlImm8,
    SbbAxImm16,
    SbbEaxImm32,
    SbbRm16Imm16,
    SbbRm16Imm8,
    SbbRm16Reg16,
    SbbRm32Imm32,
    SbbRm32Imm8,
    SbbRm32Reg32,
    SbbRm8Imm8,
    SbbRm8Reg8,
    SbbReg16Rm16,
    SbbReg32Rm32,
    SbbReg8Rm8,
    Scasb,
    Scasd,
    Scasw,
    SetccRm8,
    Sgdt,
    ShldRm16Reg16Cl,
    ShldRm16Reg16Imm8,
    ShldRm32Reg32Cl,
    ShldRm32Reg32Imm8,
    ShlRm16One,
    ShlRm16Cl,
    ShlRm16Imm8,
    ShlRm32One,
    ShlRm32Cl,
    ShlRm32Imm8,
    ShlRm8One,
    ShlRm8Cl,
    ShlRm8Imm8,
    ShrdRm16Reg16Cl,
    ShrdRm16Reg16Imm8,
    ShrdRm32Reg32Cl,
    ShrdRm32Reg32Imm8,
    ShrRm16One,
    ShrRm16Cl,
    ShrRm16Imm8,
    ShrRm32One,
    ShrRm32Cl,
    ShrRm32Imm8,
    ShrRm8One,
    ShrRm8Cl,
    ShrRm8Imm8,
    Sidt,
    SldtRm16,
    SmswRm16,
    Stc,
    Std,
    Sti,
    Stosb,
    Stosd,
    Stosw,
    StrRm16,
    SubAlImm8,
    SubAxImm16,
    SubEaxImm32,
    SubRm16Imm16,
    SubRm16Imm8,
    SubRm16Reg16,
    SubRm32Imm32,
    SubRm32Imm8,
    SubRm32Reg32,
    SubRm8Imm8,
    SubRm8Reg8,
    SubReg16Rm16,
    SubReg32Rm32,
    SubReg8Rm8,
    TestAlImm8,
    TestAxImm16,
    TestEaxImm32,
    TestRm16Imm16,
    TestRm16Reg16,
    TestRm32Imm32,
    TestRm32Reg32,
    TestRm8Imm8,
    TestRm8Reg8,
    Ud0,
    Ud1,
    Ud2,
    VerrRm16,
    VerwRm16,
    Wait,
    Wbinvd,
    XaddRm16Reg16,
    XaddRm32Reg32,
    XaddRm8Reg8,
    XchgAxReg16,
    XchgEaxReg32,
    XchgReg16Rm16,
    XchgReg32Rm32,
    XchgReg8Rm8,
    Xlat,
    XorAlImm8,
    XorAxImm16,
    XorEaxImm32,
    XorRm16Imm16,
    XorRm16Imm8,
    XorRm16Reg16,
    XorRm32Imm32,
    XorRm32Imm8,
    XorRm32Reg32,
    XorRm8Imm8,
    XorRm8Reg8,
    XorReg16Rm16,
    XorReg32Rm32,
    XorReg8Rm8,
    /// Shift-group opcodes (`C0`/`C1`/`D0`–`D3`): the reg field selects
    /// ROL/ROR/RCL/RCR/SHL/SHR/SAL/SAR.
    ShiftGrpRm8Imm8,
    ShiftGrpRm16Imm8,
    ShiftGrpRm32Imm8,
    ShiftGrpRm8One,
    ShiftGrpRm16One,
    ShiftGrpRm32One,
    ShiftGrpRm8Cl,
    ShiftGrpRm16Cl,
    ShiftGrpRm32Cl,
    X87(X87Op),
    Mmx(MmxOp),
    Sse(SseOp),
}

/// x87 escape opcodes, forwarded to the [`crate::SoftFpu`] sub-object.
/// `FNSTSW_AX` and the few control-word entries that touch integer state
/// are handled by the integer core before forwarding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum X87Op {
    FaddRm32,
    FmulRm32,
    FcomRm32,
    FcompRm32,
    FsubRm32,
    FsubrRm32,
    FdivRm32,
    FdivrRm32,
    FldRm32,
    Fxch,
    FstRm32,
    Fnop,
    FstpRm32,
    Fldenv,
    Fchs,
    Fabs,
    Ftst,
    Fxam,
    Fldcw,
    Fld1,
    Fldl2t,
    Fldl2e,
    Fldpi,
    Fldlg2,
    Fldln2,
    Fldz,
    Fnstenv,
    F2xm1,
    Fyl2x,
    Fptan,
    Fpatan,
    Fxtract,
    Fprem1,
    Fdecstp,
    Fincstp,
    Fnstcw,
    Fprem,
    Fyl2xp1,
    Fsqrt,
    Fsincos,
    Frndint,
    Fscale,
    Fsin,
    Fcos,
    FiaddRm32,
    Fcmovb,
    FimulRm32,
    Fcmove,
    FicomRm32,
    Fcmovbe,
    FicompRm32,
    Fcmovu,
    FisubRm32,
    FisubrRm32,
    Fucompp,
    FidivRm32,
    FidivrRm32,
    FildRm32,
    Fcmovnb,
    FisttpRm32,
    Fcmovne,
    FistRm32,
    Fcmovnbe,
    FistpRm32,
    Fcmovnu,
    Fneni,
    Fndisi,
    Fnclex,
    Fninit,
    Fnsetpm,
    FldRm80,
    Fucomi,
    Fcomi,
    FstpRm80,
    FaddRm64,
    FmulRm64,
    FcomRm64,
    FcompRm64,
    FsubRm64,
    FsubrRm64,
    FdivRm64,
    FdivrRm64,
    FldRm64,
    Ffree,
    FisttpRm64,
    FstRm64,
    FstpRm64,
    Frstor,
    Fucom,
    Fucomp,
    Fnsave,
    Fnstsw,
    FiaddRm16,
    Faddp,
    FimulRm16,
    Fmulp,
    FicomRm16,
    FicompRm16,
    Fcompp,
    FisubRm16,
    Fsubrp,
    FisubrRm16,
    Fsubp,
    FidivRm16,
    Fdivrp,
    FidivrRm16,
    Fdivp,
    FildRm16,
    Ffreep,
    FisttpRm16,
    FistRm16,
    FistpRm16,
    FbldM80,
    FnstswAx,
    FildRm64,
    Fucomip,
    FbstpM80,
    Fcomip,
    FistpRm64,
}

/// MMX opcodes, forwarded to the FPU sub-object (MMX aliases x87 state).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MmxOp {
    Packssdw,
    Packsswb,
    Packuswb,
    Paddb,
    Paddw,
    Paddd,
    Paddq,
    Paddsb,
    Paddsw,
    Paddusb,
    Paddusw,
    Pand,
    Pandn,
    Pavgb,
    Pavgw,
    Pcmpeqb,
    Pcmpeqw,
    Pcmpeqd,
    Pcmpgtb,
    Pcmpgtw,
    Pcmpgtd,
    Pextrw,
    Pinsrw,
    Pmaddwd,
    Pmaxsb,
    Pmaxub,
    Pminsb,
    Pminub,
    Pmovmskb,
    Pmulhuw,
    Pmulhw,
    Pmullw,
    Pmuludq,
    PmuludqM128,
    Por,
    Psadbw,
    Pshufw,
    PsllwMm,
    PsllwImm8,
    PslldMm,
    PslldImm8,
    PsllqMm,
    PsllqImm8,
    PsrawMm,
    PsrawImm8,
    PsradMm,
    PsradImm8,
    PsrlwMm,
    PsrlwImm8,
    PsrldMm,
    PsrldImm8,
    PsrlqMm,
    PsrlqImm8,
    Psubb,
    Psubw,
    Psubd,
    Psubq,
    Psubsb,
    Psubsw,
    Psubusb,
    Psubusw,
    Punpckhbw,
    Punpckhwd,
    Punpckhdq,
    Punpcklbw,
    Punpcklwd,
    Punpckldq,
    Pxor,
    MovqMmMm64,
    MovqMm64Mm,
    MovdMmRm32,
    /// Long-mode encoding; decodes but is an explicit error on this core.
    MovqMmRm64,
    MovdRm32Mm,
    /// Long-mode encoding; decodes but is an explicit error on this core.
    MovqRm64Mm,
    Movntq,
    Maskmovq,
    Emms,
}

/// SSE/SSE2 opcodes, forwarded to the [`crate::SoftVpu`] sub-object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SseOp {
    MovupsLoad,
    MovupsStore,
    MovssLoad,
    MovssStore,
    MovlpsLoad,
    MovlpsStore,
    MovhpsLoad,
    MovhpsStore,
    MovapsLoad,
    MovapsStore,
    Unpcklps,
    Unpckhps,
    Cvtpi2ps,
    Cvtsi2ss,
    Movntps,
    Cvttps2pi,
    Cvttss2si,
    Cvtps2pi,
    Cvtss2si,
    Ucomiss,
    Comiss,
    Movmskps,
    Sqrtps,
    Sqrtss,
    Rsqrtps,
    Rsqrtss,
    Rcpps,
    Rcpss,
    Andps,
    Andnps,
    Orps,
    Xorps,
    Addps,
    Addss,
    Mulps,
    Mulss,
    Subps,
    Subss,
    Minps,
    Minss,
    Divps,
    Divss,
    Maxps,
    Maxss,
    Cmpps,
    Cmpss,
    Pinsrw,
    Pextrw,
    Shufps,
    Pmovmskb,
    Pminub,
    Pmaxub,
    Pavgb,
    Pavgw,
    Pmulhuw,
    Pminsb,
    Pmaxsb,
    Psadbw,
    MovupdLoad,
    MovupdStore,
    MovsdLoad,
    MovsdStore,
    MovlpdLoad,
    MovlpdStore,
    MovhpdLoad,
    MovapdLoad,
    MovapdStore,
    Cvtpi2pd,
    Cvtsi2sd,
    Cvttpd2pi,
    Cvttsd2si,
    Cvtpd2pi,
    Cvtsd2si,
    Ucomisd,
    Comisd,
    Movmskpd,
    Sqrtpd,
    Sqrtsd,
    Andpd,
    Andnpd,
    Orpd,
    Xorpd,
    Addpd,
    Addsd,
    Mulpd,
    Mulsd,
    Cvtps2pd,
    Cvtpd2ps,
    Cvtss2sd,
    Cvtsd2ss,
    Cvtdq2ps,
    Cvtps2dq,
    Cvttps2dq,
    Subpd,
    Subsd,
    Minpd,
    Minsd,
    Divpd,
    Divsd,
    Maxpd,
    Maxsd,
    Punpcklqdq,
    Punpckhqdq,
    MovdqaLoad,
    MovdqaStore,
    MovdquLoad,
    MovdquStore,
    Pshufd,
    Pshufhw,
    Pshuflw,
    PsrlqImm8,
    PsrldqImm8,
    PsllqImm8,
    PslldqImm8,
    MovdRm32Xmm,
    MovqXmmXmm,
    MovqXmmStore,
    Cmppd,
    Cmpsd,
    Shufpd,
    Movq2dq,
    Movdq2q,
    Cvttpd2dq,
    Cvtpd2dq,
    Cvtdq2pd,
}
