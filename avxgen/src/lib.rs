use log::{debug, info};

pub mod config;
pub mod coverage;
pub mod database;
pub mod encoding;
pub mod error;
pub mod normalize;
pub mod optab;
pub mod record;
pub mod serialize;
pub mod ytab;

#[cfg(test)]
mod testutil;

pub use config::GeneratorConfig;
pub use database::Database;
pub use error::{Error, Malformed, Result};
pub use normalize::{NormalizedInst, Normalizer, Outcome, SkipReason};
pub use optab::{Optab, OptabBuilder, OptabEntry, OptabTable, Tables};
pub use record::InstructionRecord;
pub use ytab::{OperandForm, YtabGroup, YtabGroupId};

pub fn build_tables<'a>(
    records: impl IntoIterator<Item = &'a InstructionRecord>, config: &GeneratorConfig,
) -> Result<Tables> {
    let records = records.into_iter().collect::<Vec<_>>();
    let normalizer = Normalizer::new(records.iter().copied());

    let mut insts = Vec::with_capacity(records.len());
    let mut num_skipped = 0usize;
    for record in records.iter().copied() {
        match normalizer.normalize(record)? {
            Outcome::Accepted(inst) => insts.push(inst),
            Outcome::Skipped(reason) => {
                debug!("Skipping {record}: {reason}");
                num_skipped += 1;
            },
        }
    }

    info!(
        "Normalized {} records: {} accepted, {num_skipped} skipped",
        records.len(),
        insts.len()
    );

    OptabBuilder::new(config).build(insts)
}

pub fn generate(db: &Database, config: &GeneratorConfig) -> Result<String> {
    Ok(build_tables(db.records(), config)?.render())
}
