use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::{InstructionRecord, Vendor};

pub const DEFAULT_HEADER: &str = "Code generated by avxgen. DO NOT EDIT.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub excluded_vendors: BTreeSet<Vendor>,

    pub excluded_extensions: BTreeSet<String>,

    pub header: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            excluded_vendors: BTreeSet::from([Vendor::Amd]),
            excluded_extensions: BTreeSet::new(),
            header: DEFAULT_HEADER.to_string(),
        }
    }
}

impl GeneratorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_reader(BufReader::new(file)).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn excludes(&self, record: &InstructionRecord) -> bool {
        self.excluded_vendors.contains(&record.vendor) || self.excluded_extensions.contains(&record.extension)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::record::{OperandKind, Slot, VectorLength};
    use crate::testutil::*;

    #[test]
    fn default_excludes_amd() {
        let config = GeneratorConfig::default();
        let mut record = vex("VFMADDPD", VectorLength::L128, vec![dst(OperandKind::Xmm, Slot::Reg)]);
        assert!(!config.excludes(&record));

        record.vendor = Vendor::Amd;
        assert!(config.excludes(&record));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: GeneratorConfig = serde_json::from_str(r#"{ "excluded_extensions": ["AVX512ER"] }"#).unwrap();

        assert!(config.excluded_vendors.contains(&Vendor::Amd));
        assert!(config.excluded_extensions.contains("AVX512ER"));
        assert_eq!(config.header, DEFAULT_HEADER);
    }
}
