use std::collections::{HashMap, HashSet};
use std::fmt;

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::error::{Error, Malformed, Result};
use crate::record::{
    EncodingClass, InstructionRecord, Masking, Operand, OperandKind, Slot, VectorLength, WidthFlag,
};
use crate::ytab::{ArgClass, Field, OperandForm, Token};

lazy_static! {
    static ref DECORATED_MNEMONIC: Regex =
        Regex::new(r"^(?:(?:REPNE|REPE|REP|LOCK)_)?(?P<name>[A-Z0-9]+?)(?:_(?:C5|LOCK|NOREX))?$").unwrap();
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    NotVector(EncodingClass),
    UnsupportedMnemonic(String),
    UnsupportedOperand(OperandKind),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotVector(class) => write!(f, "{class:?} encoding is not a vector encoding"),
            SkipReason::UnsupportedMnemonic(m) => write!(f, "cannot derive an assembler name from {m:?}"),
            SkipReason::UnsupportedOperand(kind) => write!(f, "{kind:?} operands are not modeled"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedInst<'a> {
    pub name: String,
    pub form: OperandForm,
    pub record: &'a InstructionRecord,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<'a> {
    Accepted(NormalizedInst<'a>),
    Skipped(SkipReason),
}

#[derive(Clone, Debug, Default)]
pub struct Normalizer {
    width_ambiguous: HashSet<String>,

    memory_ambiguous: HashSet<(String, OperandForm)>,
}

impl Normalizer {
    pub fn new<'a>(records: impl IntoIterator<Item = &'a InstructionRecord>) -> Self {
        let mut gpr_widths = HashMap::<&str, (bool, bool)>::new();
        let mut prepared = Vec::new();
        for record in records {
            if skip_reason(record).is_some() {
                continue;
            }

            let Some(base) = base_name(&record.mnemonic) else { continue };
            let Ok(form) = build_form(record) else { continue };

            match gpr_bits(&form) {
                Some(64) => gpr_widths.entry(base).or_default().1 = true,
                Some(_) => gpr_widths.entry(base).or_default().0 = true,
                None => (),
            }

            prepared.push((record, base, form));
        }

        let mut normalizer = Normalizer {
            width_ambiguous: gpr_widths
                .into_iter()
                .filter(|&(_, (narrow, wide))| narrow && wide)
                .map(|(base, _)| base.to_string())
                .collect(),
            memory_ambiguous: HashSet::new(),
        };

        let mut lengths = HashMap::<(String, OperandForm), HashSet<VectorLength>>::new();
        for (record, base, form) in prepared {
            if !form.has_memory() || record.length == VectorLength::Lig {
                continue;
            }

            if let Ok(name) = normalizer.resolve_width(base, &form, record) {
                lengths.entry((name, erase_memory_widths(&form))).or_default().insert(record.length);
            }
        }

        normalizer.memory_ambiguous = lengths
            .into_iter()
            .filter(|(_, lengths)| lengths.len() > 1)
            .map(|(key, _)| key)
            .collect();

        debug!(
            "Normalizer: {} width-ambiguous mnemonics, {} memory-ambiguous forms",
            normalizer.width_ambiguous.len(),
            normalizer.memory_ambiguous.len()
        );

        normalizer
    }

    pub fn normalize<'a>(&self, record: &'a InstructionRecord) -> Result<Outcome<'a>> {
        if let Some(reason) = skip_reason(record) {
            return Ok(Outcome::Skipped(reason));
        }

        let Some(base) = base_name(&record.mnemonic) else {
            return Ok(Outcome::Skipped(SkipReason::UnsupportedMnemonic(record.mnemonic.clone())));
        };

        let form = build_form(record).map_err(|reason| Error::malformed(&record.mnemonic, reason))?;
        let mut name = self.resolve_width(base, &form, record)?;

        if form.has_memory() && self.memory_ambiguous.contains(&(name.clone(), erase_memory_widths(&form))) {
            match record.length {
                VectorLength::L128 => name.push('X'),
                VectorLength::L256 => name.push('Y'),
                VectorLength::L512 => name.push('Z'),
                VectorLength::Lig => (),
            }
        }

        Ok(Outcome::Accepted(NormalizedInst {
            name,
            form,
            record,
        }))
    }

    fn resolve_width(&self, base: &str, form: &OperandForm, record: &InstructionRecord) -> Result<String> {
        if !self.width_ambiguous.contains(base) {
            return Ok(base.to_string());
        }

        let wide = match (gpr_bits(form), record.width) {
            (Some(bits), _) => bits == 64,
            (None, WidthFlag::W0) => false,
            (None, WidthFlag::W1) => true,
            (None, WidthFlag::Wig) => return Err(Error::malformed(&record.mnemonic, Malformed::UnresolvedWidth)),
        };

        let name = format!("{base}{}", if wide { 'Q' } else { 'L' });
        Ok(match compat_name(&name) {
            Some(compat) => compat.to_string(),
            None => name,
        })
    }
}

// Names that keep their historical spelling without the `L` suffix.
fn compat_name(name: &str) -> Option<&'static str> {
    match name {
        "VCVTSD2SIL" => Some("VCVTSD2SI"),
        "VCVTSS2SIL" => Some("VCVTSS2SI"),
        "VCVTTSD2SIL" => Some("VCVTTSD2SI"),
        "VCVTTSS2SIL" => Some("VCVTTSS2SI"),
        _ => None,
    }
}

fn skip_reason(record: &InstructionRecord) -> Option<SkipReason> {
    if record.encoding == EncodingClass::Legacy {
        return Some(SkipReason::NotVector(record.encoding));
    }

    record
        .operands
        .iter()
        .find(|op| !op.kind.is_modeled())
        .map(|op| SkipReason::UnsupportedOperand(op.kind))
}

fn base_name(mnemonic: &str) -> Option<&str> {
    DECORATED_MNEMONIC
        .captures(mnemonic)
        .and_then(|c| c.name("name"))
        .map(|m| m.as_str())
}

fn build_form(record: &InstructionRecord) -> std::result::Result<OperandForm, Malformed> {
    let is_evex = record.encoding == EncodingClass::Evex;
    let attrs = match (&record.evex, is_evex) {
        (Some(attrs), true) => Some(attrs),
        (None, false) => None,
        (None, true) => return Err(Malformed::MissingEvexAttributes),
        (Some(_), false) => return Err(Malformed::UnexpectedEvexAttributes(record.encoding)),
    };

    let broadcast = attrs.is_some_and(|a| a.broadcast);
    let rounding = attrs.is_some_and(|a| a.rounding || a.sae);
    let explicit = record.operands.iter().filter(|op| op.slot != Slot::Implicit).collect::<Vec<_>>();
    let mut tokens = explicit
        .iter()
        .map(|op| operand_token(op, is_evex, broadcast))
        .collect::<Vec<_>>();

    let has_memory = tokens.iter().any(|t| t.class.is_memory());
    if broadcast && !has_memory {
        return Err(Malformed::BroadcastWithoutMemory);
    }

    if rounding && broadcast {
        return Err(Malformed::BroadcastWithRounding);
    }

    if rounding && has_memory {
        return Err(Malformed::RoundingWithMemory);
    }

    if let Some(attrs) = attrs {
        // The opmask follows the destination, or the memory operand of forms
        // that write nothing (prefetch gathers and scatters).
        let mask_index = explicit
            .iter()
            .position(|op| op.role.writes())
            .or_else(|| tokens.iter().position(|t| t.class.is_memory()))
            .map_or(0, |index| index + 1);
        match attrs.masking {
            Masking::None => (),
            Masking::Optional => tokens.insert(mask_index, Token::optional(ArgClass::Yknot0, Field::K)),
            Masking::Required => tokens.insert(mask_index, Token::new(ArgClass::Yknot0, Field::K)),
        }

        if attrs.rounding {
            tokens.push(Token::new(ArgClass::Yrn, Field::E));
        } else if attrs.sae {
            tokens.push(Token::new(ArgClass::Ysae, Field::E));
        }
    }

    Ok(OperandForm::new(tokens))
}

fn operand_token(op: &Operand, is_evex: bool, broadcast: bool) -> Token {
    let field = match op.slot {
        Slot::Reg => Field::R,
        Slot::Vvvv => Field::V,
        Slot::Rm | Slot::Implicit => Field::M,
        Slot::Is4 => Field::S,
        Slot::Imm => Field::I,
    };

    let class = match op.kind {
        OperandKind::Xmm if is_evex => ArgClass::YxrEvex,
        OperandKind::Xmm => ArgClass::Yxr,
        OperandKind::Ymm if is_evex => ArgClass::YyrEvex,
        OperandKind::Ymm => ArgClass::Yyr,
        OperandKind::Zmm => ArgClass::Yzr,
        OperandKind::Gpr32 => ArgClass::Yrl32,
        OperandKind::Gpr64 => ArgClass::Yrl64,
        OperandKind::Mask => ArgClass::Yk,
        OperandKind::Mem if broadcast => ArgClass::Ybcst(op.bits),
        OperandKind::Mem => ArgClass::Ym(op.bits),
        OperandKind::VsibXmm if is_evex => ArgClass::YxvmEvex,
        OperandKind::VsibXmm => ArgClass::Yxvm,
        OperandKind::VsibYmm if is_evex => ArgClass::YyvmEvex,
        OperandKind::VsibYmm => ArgClass::Yyvm,
        OperandKind::VsibZmm => ArgClass::Yzvm,
        OperandKind::Imm8 => ArgClass::Yu8,
        OperandKind::Mmx
        | OperandKind::X87
        | OperandKind::Segment
        | OperandKind::Control
        | OperandKind::Debug
        | OperandKind::Bound
        | OperandKind::Tile
        | OperandKind::Relbr
        | OperandKind::Agen => unreachable!("unmodeled operand kinds are skipped before forms are built"),
    };

    Token::new(class, field)
}

fn gpr_bits(form: &OperandForm) -> Option<u16> {
    form.tokens()
        .iter()
        .filter_map(|t| match t.class {
            ArgClass::Yrl32 => Some(32),
            ArgClass::Yrl64 => Some(64),
            _ => None,
        })
        .max()
}

fn erase_memory_widths(form: &OperandForm) -> OperandForm {
    OperandForm::new(
        form.tokens()
            .iter()
            .map(|t| match t.class {
                ArgClass::Ym(_) => Token {
                    class: ArgClass::Ym(0),
                    ..*t
                },
                _ => *t,
            })
            .collect(),
    )
}
