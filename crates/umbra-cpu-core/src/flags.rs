//! EFLAGS storage, flag-group updates and condition evaluation.

pub const FLAG_CF: u32 = 1 << 0;
pub const FLAG_PF: u32 = 1 << 2;
pub const FLAG_AF: u32 = 1 << 4;
pub const FLAG_ZF: u32 = 1 << 6;
pub const FLAG_SF: u32 = 1 << 7;
pub const FLAG_TF: u32 = 1 << 8;
pub const FLAG_IF: u32 = 1 << 9;
pub const FLAG_DF: u32 = 1 << 10;
pub const FLAG_OF: u32 = 1 << 11;

/// Flag bits user code can set through POPF/IRET.
pub const FLAGS_USER_MASK: u32 =
    FLAG_CF | FLAG_PF | FLAG_AF | FLAG_ZF | FLAG_SF | FLAG_TF | FLAG_IF | FLAG_DF | FLAG_OF;

/// Bit 1 always reads as 1.
const FLAGS_RESERVED_SET: u32 = 1 << 1;

/// Bits PUSHFD is allowed to expose (VM and RF read as 0).
const FLAGS_PUSHFD_MASK: u32 = 0x00FC_FFFF;

/// The arithmetic flags plus the one-bit taint summary.
///
/// `tainted` is set by every flag-producing operation to the OR of its
/// operands' `is_uninitialized()`; flag consumers check it before acting on
/// a condition.
#[derive(Debug, Clone)]
pub struct Flags {
    bits: u32,
    tainted: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Self::new()
    }
}

impl Flags {
    pub fn new() -> Self {
        Flags {
            bits: FLAGS_RESERVED_SET,
            tainted: false,
        }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Raw replacement (reset/snapshot restore); keeps the always-1 bit.
    pub fn set_bits(&mut self, bits: u32) {
        self.bits = bits | FLAGS_RESERVED_SET;
    }

    /// The image PUSHFD stores.
    pub fn pushed_bits(&self) -> u32 {
        (self.bits & FLAGS_PUSHFD_MASK) | FLAGS_RESERVED_SET
    }

    /// POPF/POPFD/IRET: only the user-visible bits take effect.
    pub fn pop_bits(&mut self, popped: u32) {
        self.bits = (self.bits & !FLAGS_USER_MASK) | (popped & FLAGS_USER_MASK) | FLAGS_RESERVED_SET;
    }

    pub fn get(&self, mask: u32) -> bool {
        (self.bits & mask) != 0
    }

    pub fn set(&mut self, mask: u32, value: bool) {
        if value {
            self.bits |= mask;
        } else {
            self.bits &= !mask;
        }
    }

    pub fn cf(&self) -> bool {
        self.get(FLAG_CF)
    }

    pub fn pf(&self) -> bool {
        self.get(FLAG_PF)
    }

    pub fn af(&self) -> bool {
        self.get(FLAG_AF)
    }

    pub fn zf(&self) -> bool {
        self.get(FLAG_ZF)
    }

    pub fn sf(&self) -> bool {
        self.get(FLAG_SF)
    }

    pub fn tf(&self) -> bool {
        self.get(FLAG_TF)
    }

    pub fn interrupt_flag(&self) -> bool {
        self.get(FLAG_IF)
    }

    pub fn df(&self) -> bool {
        self.get(FLAG_DF)
    }

    pub fn of(&self) -> bool {
        self.get(FLAG_OF)
    }

    pub fn set_cf(&mut self, v: bool) {
        self.set(FLAG_CF, v);
    }

    pub fn set_pf(&mut self, v: bool) {
        self.set(FLAG_PF, v);
    }

    pub fn set_af(&mut self, v: bool) {
        self.set(FLAG_AF, v);
    }

    pub fn set_zf(&mut self, v: bool) {
        self.set(FLAG_ZF, v);
    }

    pub fn set_sf(&mut self, v: bool) {
        self.set(FLAG_SF, v);
    }

    pub fn set_df(&mut self, v: bool) {
        self.set(FLAG_DF, v);
    }

    pub fn set_if(&mut self, v: bool) {
        self.set(FLAG_IF, v);
    }

    pub fn set_of(&mut self, v: bool) {
        self.set(FLAG_OF, v);
    }

    fn set_with_mask(&mut self, new_flags: u32, mask: u32) {
        self.bits = (self.bits & !mask) | (new_flags & mask);
    }

    fn pack(of: bool, sf: bool, zf: bool, af: bool, pf: bool, cf: bool) -> u32 {
        (of as u32) * FLAG_OF
            | (sf as u32) * FLAG_SF
            | (zf as u32) * FLAG_ZF
            | (af as u32) * FLAG_AF
            | (pf as u32) * FLAG_PF
            | (cf as u32) * FLAG_CF
    }

    /// ADD/SUB-class update: all six arithmetic flags.
    pub fn update_oszapc(&mut self, of: bool, sf: bool, zf: bool, af: bool, pf: bool, cf: bool) {
        self.set_with_mask(
            Self::pack(of, sf, zf, af, pf, cf),
            FLAG_OF | FLAG_SF | FLAG_ZF | FLAG_AF | FLAG_PF | FLAG_CF,
        );
    }

    /// INC/DEC-class update: CF is preserved.
    pub fn update_oszap(&mut self, of: bool, sf: bool, zf: bool, af: bool, pf: bool) {
        self.set_with_mask(
            Self::pack(of, sf, zf, af, pf, false),
            FLAG_OF | FLAG_SF | FLAG_ZF | FLAG_AF | FLAG_PF,
        );
    }

    /// Logic/shift-class update: AF is left alone (architecturally
    /// undefined; this core's fixed choice is "unchanged").
    pub fn update_oszpc(&mut self, of: bool, sf: bool, zf: bool, pf: bool, cf: bool) {
        self.set_with_mask(
            Self::pack(of, sf, zf, false, pf, cf),
            FLAG_OF | FLAG_SF | FLAG_ZF | FLAG_PF | FLAG_CF,
        );
    }

    /// Rotate/multiply-class update: only OF and CF are defined.
    pub fn update_oc(&mut self, of: bool, cf: bool) {
        self.set_with_mask(Self::pack(of, false, false, false, false, cf), FLAG_OF | FLAG_CF);
    }

    pub fn tainted(&self) -> bool {
        self.tainted
    }

    pub fn set_tainted(&mut self, tainted: bool) {
        self.tainted = tainted;
    }

    /// Record whether the inputs of the flag computation that just ran were
    /// trustworthy.
    pub fn taint_from<const N: usize>(&mut self, taints: [bool; N]) {
        self.tainted = taints.into_iter().any(|t| t);
    }

    /// The 16 Jcc/SETcc/CMOVcc predicates, by condition-code nibble.
    pub fn evaluate_condition(&self, cc: u8) -> bool {
        match cc & 0xF {
            0 => self.of(),
            1 => !self.of(),
            2 => self.cf(),
            3 => !self.cf(),
            4 => self.zf(),
            5 => !self.zf(),
            6 => self.cf() || self.zf(),
            7 => !(self.cf() || self.zf()),
            8 => self.sf(),
            9 => !self.sf(),
            10 => self.pf(),
            11 => !self.pf(),
            12 => self.sf() != self.of(),
            13 => self.sf() == self.of(),
            14 => (self.sf() != self.of()) || self.zf(),
            15 => !((self.sf() != self.of()) || self.zf()),
            _ => unreachable!(),
        }
    }
}

/// Mnemonic suffix for a condition code, used in taint diagnostics.
pub fn condition_name(cc: u8) -> &'static str {
    match cc & 0xF {
        0 => "o",
        1 => "no",
        2 => "b",
        3 => "nb",
        4 => "z",
        5 => "nz",
        6 => "be",
        7 => "nbe",
        8 => "s",
        9 => "ns",
        10 => "p",
        11 => "np",
        12 => "l",
        13 => "nl",
        14 => "le",
        15 => "nle",
        _ => unreachable!(),
    }
}

pub(crate) fn parity(byte: u8) -> bool {
    byte.count_ones() % 2 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_bit_always_set() {
        let mut f = Flags::new();
        assert_eq!(f.bits() & 0x2, 0x2);
        f.pop_bits(0);
        assert_eq!(f.bits() & 0x2, 0x2);
    }

    #[test]
    fn pop_only_touches_user_bits() {
        let mut f = Flags::new();
        f.pop_bits(0xFFFF_FFFF);
        assert_eq!(f.bits() & !0x2, FLAGS_USER_MASK);
    }

    #[test]
    fn condition_table() {
        let mut f = Flags::new();
        f.set_zf(true);
        assert!(f.evaluate_condition(4));
        assert!(!f.evaluate_condition(5));
        // BE = CF || ZF
        assert!(f.evaluate_condition(6));
        f.set_zf(false);
        f.set_sf(true);
        f.set_of(false);
        // L = SF != OF, LE = L || ZF
        assert!(f.evaluate_condition(12));
        assert!(f.evaluate_condition(14));
        assert!(!f.evaluate_condition(13));
    }

    #[test]
    fn group_updates_preserve_unnamed_flags() {
        let mut f = Flags::new();
        f.set_cf(true);
        f.update_oszap(false, true, false, true, false);
        assert!(f.cf(), "oszap must not touch CF");
        f.set_af(true);
        f.update_oszpc(false, false, true, true, false);
        assert!(f.af(), "oszpc must not touch AF");
    }
}
