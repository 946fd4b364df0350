use crate::record::*;

pub fn src(kind: OperandKind, slot: Slot) -> Operand {
    Operand {
        kind,
        slot,
        role: Role::Read,
        bits: 0,
    }
}

pub fn dst(kind: OperandKind, slot: Slot) -> Operand {
    Operand {
        kind,
        slot,
        role: Role::Write,
        bits: 0,
    }
}

pub fn mem(bits: u16, role: Role) -> Operand {
    Operand {
        kind: OperandKind::Mem,
        slot: Slot::Rm,
        role,
        bits,
    }
}

pub fn imm8() -> Operand {
    src(OperandKind::Imm8, Slot::Imm)
}

pub fn vex(mnemonic: &str, length: VectorLength, operands: Vec<Operand>) -> InstructionRecord {
    InstructionRecord {
        mnemonic: mnemonic.to_string(),
        operands,
        map: OpcodeMap::Map0F,
        prefix: MandatoryPrefix::P66,
        encoding: EncodingClass::Vex,
        width: WidthFlag::Wig,
        length,
        evex: None,
        opcode: 0x58,
        digit: None,
        extension: String::from("AVX"),
        vendor: Vendor::Any,
    }
}

pub fn evex(mnemonic: &str, length: VectorLength, operands: Vec<Operand>, attrs: EvexAttributes) -> InstructionRecord {
    InstructionRecord {
        encoding: EncodingClass::Evex,
        width: WidthFlag::W1,
        evex: Some(attrs),
        extension: String::from("AVX512F"),
        ..vex(mnemonic, length, operands)
    }
}

pub fn attrs(element_bits: u16) -> EvexAttributes {
    EvexAttributes {
        tuple: TupleType::Full,
        element_bits,
        broadcast: false,
        rounding: false,
        sae: false,
        masking: Masking::Optional,
        zeroing: true,
    }
}
