use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::record::{EncodingClass, TupleType, VectorLength};

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot open instruction database {path:?}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("cannot parse instruction database file {path:?}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },

    #[error("malformed record {mnemonic}: {reason}")]
    Malformed { mnemonic: String, reason: Malformed },

    #[error("cannot write tables: {0}")]
    Write(#[from] io::Error),
}

impl Error {
    pub fn malformed(mnemonic: &str, reason: Malformed) -> Self {
        Error::Malformed {
            mnemonic: mnemonic.to_string(),
            reason,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Malformed {
    #[error("VEX encodings cannot use a 512-bit vector length")]
    Vex512,

    #[error("{0:?} encodings need an escape map")]
    MissingMap(EncodingClass),

    #[error("EVEX attributes on a {0:?} record")]
    UnexpectedEvexAttributes(EncodingClass),

    #[error("EVEX record without EVEX attributes")]
    MissingEvexAttributes,

    #[error("opcode extension /{0} does not fit in ModRM.reg")]
    DigitOutOfRange(u8),

    #[error("broadcast without a memory operand")]
    BroadcastWithoutMemory,

    #[error("broadcast on tuple type {0:?}")]
    BroadcastTuple(TupleType),

    #[error("embedded rounding or SAE on a memory form")]
    RoundingWithMemory,

    #[error("broadcast combined with embedded rounding")]
    BroadcastWithRounding,

    #[error("tuple type {0:?} needs an explicit vector length")]
    TupleNeedsLength(TupleType),

    #[error("tuple type {tuple:?} cannot use {element_bits}-bit elements at {length:?}")]
    TupleElement {
        tuple: TupleType,
        element_bits: u16,
        length: VectorLength,
    },

    #[error("cannot resolve the 32/64-bit destination width")]
    UnresolvedWidth,
}

pub type Result<T> = std::result::Result<T, Error>;
