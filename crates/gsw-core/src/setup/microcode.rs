//! Default packet parser microcode.
//!
//! Each row is a parser instruction: match a 16-bit header word against
//! `value`/`mask`, extract `length` words into `out`, then jump to row
//! `next`. Rows past the ruleset are `END` padding.

/// Parser table depth.
pub const MICROCODE_ROWS: usize = 64;

/// Extraction target of a parser instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum OutField {
    Mac0 = 0,
    EthType = 6,
    Vtag0 = 7,
    Itag0 = 9,
    Ip0 = 13,
    Ip3 = 16,
    Sip0 = 17,
    Dip7 = 32,
    Prot = 34,
    None = 63,
}

/// Header flag raised when an instruction matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ParserFlag {
    Itag = 0,
    Vlan = 1,
    Snap = 2,
    Pppoe = 3,
    Ipv6 = 4,
    Ipv4 = 6,
    Hop = 9,
    Nn1 = 10,
    Nn2 = 11,
    End = 12,
    No = 13,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum InstrType {
    Instr = 0,
    Ipv6 = 1,
    LenAccu = 2,
}

/// One parser instruction before packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserRule {
    pub value: u16,
    pub mask: u16,
    pub next: u16,
    pub out: OutField,
    pub length: u16,
    pub kind: InstrType,
    pub flag: ParserFlag,
    pub ipv4_len: u16,
}

impl ParserRule {
    const END: ParserRule = rule(0x0000, 0x0000, 0, OutField::None, 0, InstrType::Instr, ParserFlag::End, 0);

    /// Table words 0..=3. Word 3 bit 15 (the length LSB) is left clear, the
    /// same as every shipped ruleset.
    pub const fn pack(&self) -> [u16; 4] {
        [
            self.value,
            self.mask,
            (self.next << 10) | ((self.out as u16) << 4) | (self.length >> 1),
            ((self.kind as u16) << 13) | ((self.flag as u16) << 9) | (self.ipv4_len << 8),
        ]
    }
}

#[allow(clippy::too_many_arguments)]
const fn rule(
    value: u16,
    mask: u16,
    next: u16,
    out: OutField,
    length: u16,
    kind: InstrType,
    flag: ParserFlag,
    ipv4_len: u16,
) -> ParserRule {
    ParserRule {
        value,
        mask,
        next,
        out,
        length,
        kind,
        flag,
        ipv4_len,
    }
}

use InstrType as T;
use OutField as O;
use ParserFlag as F;

#[rustfmt::skip]
const RULES: [ParserRule; 41] = [
    //    value   mask    next out         len type        flag      ipv4_len
    rule(0x88c3, 0xffff,  1, O::Itag0,    4, T::Instr,   F::Itag,  0),
    rule(0x8100, 0xffff,  2, O::Vtag0,    2, T::Instr,   F::Vlan,  0),
    rule(0x88a8, 0xffff,  1, O::Vtag0,    2, T::Instr,   F::Vlan,  0),
    rule(0x8100, 0xffff,  1, O::Vtag0,    2, T::Instr,   F::Vlan,  0),
    rule(0x8864, 0xffff, 17, O::EthType,  1, T::Instr,   F::No,    0),
    rule(0x0800, 0xffff, 21, O::EthType,  1, T::Instr,   F::No,    0),
    rule(0x86dd, 0xffff, 22, O::EthType,  1, T::Instr,   F::No,    0),
    rule(0x8863, 0xffff, 16, O::EthType,  1, T::Instr,   F::No,    0),
    rule(0x0000, 0xf800, 10, O::None,     0, T::Instr,   F::No,    0),
    rule(0x0000, 0x0000, 40, O::EthType,  1, T::Instr,   F::No,    0),
    rule(0x0600, 0x0600, 40, O::EthType,  1, T::Instr,   F::No,    0),
    rule(0x0000, 0x0000, 12, O::None,     1, T::Instr,   F::No,    0),
    rule(0xaaaa, 0xffff, 14, O::None,     1, T::Instr,   F::No,    0),
    rule(0x0300, 0xff00, 41, O::None,     0, T::Instr,   F::Snap,  0),
    rule(0x0000, 0x0000, 41, O::None,     0, T::Instr,   F::No,    0),
    rule(0x0000, 0x0000, 41, O::Dip7,     3, T::Instr,   F::No,    0),
    rule(0x0000, 0x0000, 18, O::Dip7,     3, T::Instr,   F::Pppoe, 0),
    rule(0x0021, 0xffff, 21, O::None,     1, T::Instr,   F::No,    0),
    rule(0x0057, 0xffff, 22, O::None,     1, T::Instr,   F::No,    0),
    rule(0x0000, 0x0000, 40, O::None,     0, T::Instr,   F::No,    0),
    rule(0x4000, 0xf000, 24, O::Ip0,      4, T::Instr,   F::Ipv4,  1),
    rule(0x6000, 0xf000, 27, O::Ip0,      3, T::Instr,   F::Ipv6,  0),
    rule(0x0000, 0x0000, 41, O::None,     0, T::Instr,   F::No,    0),
    rule(0x0000, 0x0000, 25, O::Ip3,      2, T::Instr,   F::No,    0),
    rule(0x0000, 0x0000, 26, O::Sip0,     4, T::Instr,   F::No,    0),
    rule(0x0000, 0x0000, 38, O::None,     0, T::LenAccu, F::No,    0),
    rule(0x1100, 0xff00, 37, O::Prot,     1, T::Instr,   F::No,    0),
    rule(0x0600, 0xff00, 37, O::Prot,     1, T::Instr,   F::No,    0),
    rule(0x0000, 0xff00, 33, O::Ip3,     17, T::Instr,   F::Hop,   0),
    rule(0x2b00, 0xff00, 33, O::Ip3,     17, T::Instr,   F::Nn1,   0),
    rule(0x3c00, 0xff00, 33, O::Ip3,     17, T::Instr,   F::Nn2,   0),
    rule(0x0000, 0x0000, 37, O::Prot,     1, T::Instr,   F::No,    0),
    rule(0x0000, 0x00e0, 35, O::None,     0, T::Instr,   F::No,    0),
    rule(0x0000, 0x0000, 40, O::None,     0, T::Instr,   F::No,    0),
    rule(0x0000, 0xff00, 33, O::None,     0, T::Ipv6,    F::Hop,   0),
    rule(0x2b00, 0xff00, 33, O::None,     0, T::Ipv6,    F::Nn1,   0),
    rule(0x3c00, 0xff00, 33, O::None,     0, T::Ipv6,    F::Nn2,   0),
    rule(0x0000, 0x0000, 38, O::Prot,     1, T::Ipv6,    F::No,    0),
    rule(0x0000, 0x0000, 38, O::None,     0, T::LenAccu, F::No,    0),
    rule(0x0000, 0x0000, 39, O::None,     0, T::Instr,   F::No,    0),
    rule(0x0000, 0x0000, 40, O::None,     0, T::Instr,   F::End,   0),
];

const fn build() -> [[u16; 4]; MICROCODE_ROWS] {
    let mut rows = [ParserRule::END.pack(); MICROCODE_ROWS];
    let mut i = 0;
    while i < RULES.len() {
        rows[i] = RULES[i].pack();
        i += 1;
    }
    rows
}

/// The packed default ruleset, ready for [`TableEngine::load_microcode`].
///
/// [`TableEngine::load_microcode`]: crate::pce::TableEngine::load_microcode
pub static DEFAULT_MICROCODE: [[u16; 4]; MICROCODE_ROWS] = build();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_vlan_rule() {
        // 0x8100 -> next 2, VTAG0, 2 words, VLAN flag.
        assert_eq!(DEFAULT_MICROCODE[1], [0x8100, 0xffff, 0x0871, 0x0200]);
    }

    #[test]
    fn test_pack_ipv4_rule() {
        assert_eq!(DEFAULT_MICROCODE[20], [0x4000, 0xf000, 0x60d2, 0x0d00]);
    }

    #[test]
    fn test_pack_drops_length_lsb() {
        let rows = &DEFAULT_MICROCODE;
        // Length 17 packs as 8, length 1 as 0.
        assert_eq!(rows[28][2], (33 << 10) | (16 << 4) | 8);
        assert_eq!(rows[4][2], (17 << 10) | (6 << 4));
    }

    #[test]
    fn test_padding_is_end() {
        let end = [0x0000, 0x0000, 0x03f0, 0x1800];
        assert_eq!(DEFAULT_MICROCODE[40][3] & 0x1e00, 0x1800);
        assert!(DEFAULT_MICROCODE[41..].iter().all(|row| *row == end));
    }
}
