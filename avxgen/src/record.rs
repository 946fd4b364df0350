use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OpcodeMap {
    #[serde(rename = "legacy")]
    Legacy,
    #[serde(rename = "0F")]
    Map0F,
    #[serde(rename = "0F38")]
    Map0F38,
    #[serde(rename = "0F3A")]
    Map0F3A,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MandatoryPrefix {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "66")]
    P66,
    #[serde(rename = "F2")]
    PF2,
    #[serde(rename = "F3")]
    PF3,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingClass {
    Legacy,
    Vex,
    Evex,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WidthFlag {
    W0,
    W1,
    #[serde(rename = "WIG")]
    Wig,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VectorLength {
    #[serde(rename = "LIG")]
    Lig,
    #[serde(rename = "128")]
    L128,
    #[serde(rename = "256")]
    L256,
    #[serde(rename = "512")]
    L512,
}

impl VectorLength {
    pub fn bytes(&self) -> Option<u16> {
        match self {
            VectorLength::Lig => None,
            VectorLength::L128 => Some(16),
            VectorLength::L256 => Some(32),
            VectorLength::L512 => Some(64),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TupleType {
    #[serde(rename = "FV")]
    Full,
    #[serde(rename = "HV")]
    Half,
    #[serde(rename = "FVM")]
    FullMem,
    #[serde(rename = "T1S")]
    Tuple1Scalar,
    #[serde(rename = "T1F")]
    Tuple1Fixed,
    #[serde(rename = "T2")]
    Tuple2,
    #[serde(rename = "T4")]
    Tuple4,
    #[serde(rename = "T8")]
    Tuple8,
    #[serde(rename = "HVM")]
    HalfMem,
    #[serde(rename = "QVM")]
    QuarterMem,
    #[serde(rename = "OVM")]
    EighthMem,
    #[serde(rename = "M128")]
    Mem128,
    #[serde(rename = "T1_4X")]
    Tuple1x4,
    #[serde(rename = "DUP")]
    MovDdup,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Masking {
    #[default]
    None,
    Optional,
    Required,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvexAttributes {
    pub tuple: TupleType,

    #[serde(default)]
    pub element_bits: u16,

    #[serde(default)]
    pub broadcast: bool,

    #[serde(default)]
    pub rounding: bool,

    #[serde(default)]
    pub sae: bool,

    #[serde(default)]
    pub masking: Masking,

    #[serde(default)]
    pub zeroing: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    #[default]
    Any,
    Intel,
    Amd,
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Vendor::Any => "any",
            Vendor::Intel => "intel",
            Vendor::Amd => "amd",
        })
    }
}

impl FromStr for Vendor {
    type Err = UnknownVendor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(Vendor::Any),
            "intel" => Ok(Vendor::Intel),
            "amd" => Ok(Vendor::Amd),
            _ => Err(UnknownVendor(s.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown vendor {0:?}, expected one of any, intel, amd")]
pub struct UnknownVendor(String);

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperandKind {
    Xmm,
    Ymm,
    Zmm,
    Gpr32,
    Gpr64,
    Mask,
    Mem,
    VsibXmm,
    VsibYmm,
    VsibZmm,
    Imm8,

    Mmx,
    X87,
    Segment,
    Control,
    Debug,
    Bound,
    Tile,
    Relbr,
    Agen,
}

impl OperandKind {
    pub fn is_modeled(&self) -> bool {
        !matches!(
            self,
            OperandKind::Mmx
                | OperandKind::X87
                | OperandKind::Segment
                | OperandKind::Control
                | OperandKind::Debug
                | OperandKind::Bound
                | OperandKind::Tile
                | OperandKind::Relbr
                | OperandKind::Agen
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Reg,
    Vvvv,
    Rm,
    Is4,
    Imm,
    // Not written in assembly syntax (flags, MXCSR, fixed registers).
    Implicit,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "r")]
    Read,
    #[serde(rename = "w")]
    Write,
    #[serde(rename = "rw")]
    ReadWrite,
}

impl Role {
    pub fn writes(&self) -> bool {
        matches!(self, Role::Write | Role::ReadWrite)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operand {
    pub kind: OperandKind,
    pub slot: Slot,
    pub role: Role,

    // Memory width in bits (element width for broadcasts and VSIB accesses).
    #[serde(default)]
    pub bits: u16,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstructionRecord {
    pub mnemonic: String,
    pub operands: Vec<Operand>,
    pub map: OpcodeMap,
    pub prefix: MandatoryPrefix,
    pub encoding: EncodingClass,
    pub width: WidthFlag,
    pub length: VectorLength,

    #[serde(default)]
    pub evex: Option<EvexAttributes>,

    #[serde(with = "hex_byte")]
    pub opcode: u8,

    #[serde(default)]
    pub digit: Option<u8>,

    pub extension: String,

    #[serde(default)]
    pub vendor: Vendor,
}

impl fmt::Display for InstructionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:?} {:?} {:?} {:?} {:?} {:#04x}, {})",
            self.mnemonic, self.encoding, self.length, self.prefix, self.map, self.width, self.opcode, self.extension
        )
    }
}

mod hex_byte {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u8, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{value:#04x}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
        let s = String::deserialize(deserializer)?;
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| D::Error::custom(format!("opcode byte {s:?} must start with 0x")))?;

        u8::from_str_radix(digits, 16).map_err(|e| D::Error::custom(format!("opcode byte {s:?}: {e}")))
    }
}
