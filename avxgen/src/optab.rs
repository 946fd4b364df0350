use std::collections::HashMap;

use itertools::Itertools;
use log::{debug, info};

use crate::config::GeneratorConfig;
use crate::encoding::OpBytes;
use crate::error::{Error, Result};
use crate::normalize::NormalizedInst;
use crate::record::{EncodingClass, VectorLength};
use crate::ytab::{OperandForm, Specificity, YtabGroup, YtabGroupId, YtabInterner};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptabEntry {
    pub ytab: YtabGroupId,
    pub class: EncodingClass,
    pub length: VectorLength,
    pub form: OperandForm,
    pub bytes: OpBytes,
}

impl OptabEntry {
    pub fn specificity(&self) -> Specificity {
        self.form.specificity()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Optab {
    pub mnemonic: String,
    pub entries: Vec<OptabEntry>,
}

#[derive(Clone, Debug, Default)]
pub struct OptabTable {
    optabs: Vec<Optab>,
    index: HashMap<String, usize>,
}

impl OptabTable {
    fn new(optabs: Vec<Optab>) -> Self {
        debug_assert!(optabs.windows(2).all(|w| w[0].mnemonic < w[1].mnemonic));
        let index = optabs
            .iter()
            .enumerate()
            .map(|(index, optab)| (optab.mnemonic.clone(), index))
            .collect();

        OptabTable {
            optabs,
            index,
        }
    }

    pub fn get(&self, mnemonic: &str) -> Option<&Optab> {
        self.index.get(mnemonic).map(|&index| &self.optabs[index])
    }

    pub fn contains(&self, mnemonic: &str) -> bool {
        self.index.contains_key(mnemonic)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Optab> + '_ {
        self.optabs.iter()
    }

    pub fn mnemonics(&self) -> impl Iterator<Item = &str> + '_ {
        self.optabs.iter().map(|optab| optab.mnemonic.as_str())
    }

    pub fn len(&self) -> usize {
        self.optabs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.optabs.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct Tables {
    pub header: String,
    pub ytabs: Vec<YtabGroup>,
    pub optabs: OptabTable,
}

impl Tables {
    pub fn ytab(&self, id: YtabGroupId) -> &YtabGroup {
        &self.ytabs[id.as_index()]
    }
}

struct Candidate {
    name: String,
    class: EncodingClass,
    length: VectorLength,
    form: OperandForm,
    bytes: OpBytes,
}

impl Candidate {
    fn key(&self) -> (&str, EncodingClass, VectorLength, Specificity, &OperandForm, &OpBytes) {
        (
            &self.name,
            self.class,
            self.length,
            self.form.specificity(),
            &self.form,
            &self.bytes,
        )
    }
}

pub struct OptabBuilder<'c> {
    config: &'c GeneratorConfig,
}

impl<'c> OptabBuilder<'c> {
    pub fn new(config: &'c GeneratorConfig) -> Self {
        OptabBuilder {
            config,
        }
    }

    pub fn build(&self, insts: Vec<NormalizedInst<'_>>) -> Result<Tables> {
        let mut candidates = Vec::with_capacity(insts.len());
        let mut num_excluded = 0usize;
        for inst in insts {
            let record = inst.record;
            if self.config.excludes(record) {
                debug!("Excluding {record}, vendor {}", record.vendor);
                num_excluded += 1;
                continue;
            }

            let bytes = OpBytes::compute(record).map_err(|reason| Error::malformed(&record.mnemonic, reason))?;
            candidates.push(Candidate {
                name: inst.name,
                class: record.encoding,
                length: record.length,
                form: inst.form,
                bytes,
            });
        }

        candidates.sort_by(|a, b| a.key().cmp(&b.key()));

        let num_candidates = candidates.len();
        candidates.dedup_by(|a, b| a.key() == b.key());
        if candidates.len() != num_candidates {
            debug!("Collapsed {} duplicate variants", num_candidates - candidates.len());
        }

        // Identities are assigned while walking the sorted candidates, so
        // they do not depend on the order in which records were supplied.
        let mut interner = YtabInterner::new();
        let mut optabs = Vec::new();
        let grouped = candidates.into_iter().group_by(|c| c.name.clone());
        for (mnemonic, variants) in &grouped {
            let entries = variants
                .map(|c| OptabEntry {
                    ytab: interner.intern(&c.form, &mnemonic),
                    class: c.class,
                    length: c.length,
                    form: c.form,
                    bytes: c.bytes,
                })
                .collect();

            optabs.push(Optab {
                mnemonic,
                entries,
            });
        }

        info!(
            "Built {} optabs and {} ytab groups ({num_excluded} variants excluded)",
            optabs.len(),
            interner.len()
        );

        Ok(Tables {
            header: self.config.header.clone(),
            ytabs: interner.into_groups(),
            optabs: OptabTable::new(optabs),
        })
    }
}
