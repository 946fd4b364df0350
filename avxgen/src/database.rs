use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{Error, Result};
use crate::record::InstructionRecord;

#[derive(Clone, Debug)]
pub struct Database {
    records: Vec<InstructionRecord>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = fs::metadata(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let files = if metadata.is_dir() {
            list_json_files(path)?
        } else {
            vec![path.to_path_buf()]
        };

        let mut records = Vec::new();
        for file in files.iter() {
            debug!("Loading records from {file:?}");
            records.extend(load_file(file)?);
        }

        info!("Loaded {} records from {} file(s) in {path:?}", records.len(), files.len());
        Ok(Database {
            records,
        })
    }

    pub fn from_records(records: Vec<InstructionRecord>) -> Self {
        Database {
            records,
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &InstructionRecord> + '_ {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let open_error = |source| Error::Open {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(open_error)? {
        let path = entry.map_err(open_error)?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn load_file(path: &Path) -> Result<Vec<InstructionRecord>> {
    let file = File::open(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_reader(BufReader::new(file)).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use test_log::test;

    use super::*;

    fn fixture() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata").join("xed.json")
    }

    #[test]
    fn open_fixture() {
        let db = Database::open(fixture()).unwrap();
        assert!(!db.is_empty());
        assert!(db.records().any(|r| r.mnemonic == "VADDPD"));
    }

    #[test]
    fn open_directory() {
        let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata");
        let from_dir = Database::open(dir).unwrap();
        let from_file = Database::open(fixture()).unwrap();

        assert_eq!(from_dir.len(), from_file.len());
    }

    #[test]
    fn open_missing() {
        match Database::open("/nonexistent/avxgen/xed.json") {
            Err(Error::Open {
                path, ..
            }) => assert_eq!(path, PathBuf::from("/nonexistent/avxgen/xed.json")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
