//! Fixed mapping from record attributes to prefix template bytes.
//!
//! Templates are the prefix bytes with every register field set to its
//! encoding of register 0 (the VEX/EVEX R, X, B, R', V' and vvvv fields are
//! stored inverted). The assembler merges the actual operands into them.
//!
//! ```text
//! VEX (3 byte): C4  [R X B m-mmmm]  [W vvvv L pp]
//! EVEX:         62  [R X B R' 0 0 mm]  [W vvvv 1 pp]  [z L'L b V' aaa]
//! ```

use std::fmt;

use crate::error::Malformed;
use crate::record::{
    EncodingClass, EvexAttributes, InstructionRecord, MandatoryPrefix, OpcodeMap, TupleType, VectorLength, WidthFlag,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EvexFlags {
    pub disp8_scale: u8,
    pub broadcast: bool,
    pub rounding: bool,
    pub sae: bool,
    pub zeroing: bool,
}

impl fmt::Display for EvexFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.disp8_scale)?;

        for (set, name) in [
            (self.broadcast, "BCST"),
            (self.rounding, "ER"),
            (self.sae, "SAE"),
            (self.zeroing, "Z"),
        ] {
            if set {
                write!(f, " | {name}")?;
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpBytes {
    pub prefix: Vec<u8>,
    pub opcode: u8,
    pub digit: Option<u8>,
    pub evex: Option<EvexFlags>,
}

impl OpBytes {
    pub fn compute(record: &InstructionRecord) -> Result<Self, Malformed> {
        if let Some(digit) = record.digit {
            if digit > 7 {
                return Err(Malformed::DigitOutOfRange(digit));
            }
        }

        let (prefix, evex) = match (record.encoding, &record.evex) {
            (EncodingClass::Legacy, None) => (legacy_prefix(record), None),
            (EncodingClass::Vex, None) => (vex_prefix(record)?, None),
            (EncodingClass::Evex, Some(attrs)) => (evex_prefix(record)?, Some(evex_flags(attrs, record.length)?)),
            (EncodingClass::Evex, None) => return Err(Malformed::MissingEvexAttributes),
            (class, Some(_)) => return Err(Malformed::UnexpectedEvexAttributes(class)),
        };

        Ok(OpBytes {
            prefix,
            opcode: record.opcode,
            digit: record.digit,
            evex,
        })
    }
}

fn pp(prefix: MandatoryPrefix) -> u8 {
    match prefix {
        MandatoryPrefix::None => 0b00,
        MandatoryPrefix::P66 => 0b01,
        MandatoryPrefix::PF3 => 0b10,
        MandatoryPrefix::PF2 => 0b11,
    }
}

fn mm(record: &InstructionRecord) -> Result<u8, Malformed> {
    match record.map {
        OpcodeMap::Legacy => Err(Malformed::MissingMap(record.encoding)),
        OpcodeMap::Map0F => Ok(0b01),
        OpcodeMap::Map0F38 => Ok(0b10),
        OpcodeMap::Map0F3A => Ok(0b11),
    }
}

fn w(width: WidthFlag) -> u8 {
    match width {
        WidthFlag::W1 => 1,
        WidthFlag::W0 | WidthFlag::Wig => 0,
    }
}

fn legacy_prefix(record: &InstructionRecord) -> Vec<u8> {
    let mut bytes = Vec::new();
    match record.prefix {
        MandatoryPrefix::None => (),
        MandatoryPrefix::P66 => bytes.push(0x66),
        MandatoryPrefix::PF2 => bytes.push(0xF2),
        MandatoryPrefix::PF3 => bytes.push(0xF3),
    }

    match record.map {
        OpcodeMap::Legacy => (),
        OpcodeMap::Map0F => bytes.push(0x0F),
        OpcodeMap::Map0F38 => bytes.extend([0x0F, 0x38]),
        OpcodeMap::Map0F3A => bytes.extend([0x0F, 0x3A]),
    }

    bytes
}

fn vex_prefix(record: &InstructionRecord) -> Result<Vec<u8>, Malformed> {
    let l = match record.length {
        VectorLength::Lig | VectorLength::L128 => 0,
        VectorLength::L256 => 1,
        VectorLength::L512 => return Err(Malformed::Vex512),
    };

    Ok(vec![
        0xC4,
        0b1110_0000 | mm(record)?,
        (w(record.width) << 7) | (0b1111 << 3) | (l << 2) | pp(record.prefix),
    ])
}

fn evex_prefix(record: &InstructionRecord) -> Result<Vec<u8>, Malformed> {
    let ll = match record.length {
        VectorLength::Lig | VectorLength::L128 => 0b00,
        VectorLength::L256 => 0b01,
        VectorLength::L512 => 0b10,
    };

    Ok(vec![
        0x62,
        0b1111_0000 | mm(record)?,
        (w(record.width) << 7) | (0b1111 << 3) | 0b100 | pp(record.prefix),
        (ll << 5) | 0b1000,
    ])
}

fn evex_flags(attrs: &EvexAttributes, length: VectorLength) -> Result<EvexFlags, Malformed> {
    Ok(EvexFlags {
        disp8_scale: disp8_scale(attrs, length)?,
        broadcast: attrs.broadcast,
        rounding: attrs.rounding,
        sae: attrs.sae,
        zeroing: attrs.zeroing,
    })
}

/// Computes N for disp8*N from the tuple type (Intel SDM Vol. 2A, 2.7.5).
pub fn disp8_scale(attrs: &EvexAttributes, length: VectorLength) -> Result<u8, Malformed> {
    let tuple = attrs.tuple;
    let vl = length.bytes();
    let element = attrs.element_bits / 8;
    let bad_element = || Malformed::TupleElement {
        tuple,
        element_bits: attrs.element_bits,
        length,
    };
    let vector = || vl.ok_or(Malformed::TupleNeedsLength(tuple));

    if attrs.broadcast && !matches!(tuple, TupleType::Full | TupleType::Half) {
        return Err(Malformed::BroadcastTuple(tuple));
    }

    let n = match tuple {
        TupleType::Full if attrs.broadcast => match element {
            4 | 8 => element,
            _ => return Err(bad_element()),
        },
        TupleType::Full => vector()?,
        TupleType::Half if attrs.broadcast => match element {
            4 => 4,
            _ => return Err(bad_element()),
        },
        TupleType::Half => vector()? / 2,
        TupleType::FullMem => vector()?,
        TupleType::Tuple1Scalar => match element {
            1 | 2 | 4 | 8 => element,
            _ => return Err(bad_element()),
        },
        TupleType::Tuple1Fixed => match element {
            4 | 8 => element,
            _ => return Err(bad_element()),
        },
        TupleType::Tuple2 => match (element, vl) {
            (4, _) => 8,
            (8, Some(32 | 64)) => 16,
            _ => return Err(bad_element()),
        },
        TupleType::Tuple4 => match (element, vl) {
            (4, Some(32 | 64)) => 16,
            (8, Some(64)) => 32,
            _ => return Err(bad_element()),
        },
        TupleType::Tuple8 => match (element, vl) {
            (4, Some(64)) => 32,
            _ => return Err(bad_element()),
        },
        TupleType::HalfMem => vector()? / 2,
        TupleType::QuarterMem => vector()? / 4,
        TupleType::EighthMem => vector()? / 8,
        TupleType::Mem128 | TupleType::Tuple1x4 => 16,
        TupleType::MovDdup => match vector()? {
            16 => 8,
            n => n,
        },
    };

    Ok(n as u8)
}
