use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use avxgen::coverage::{missing_mnemonics, parse_mnemonic_list};
use avxgen::record::Vendor;
use avxgen::{build_tables, generate, Database, GeneratorConfig};
use clap::Parser;
use log::{info, warn};
use rayon::iter::{IntoParallelIterator, ParallelIterator};

#[derive(clap::Parser)]
enum Args {
    /// Generates the ytab and optab tables.
    Generate {
        database: PathBuf,

        #[clap(long)]
        output: Option<PathBuf>,

        #[clap(long)]
        config: Option<PathBuf>,

        #[clap(long)]
        include_vendor: Vec<Vendor>,

        #[clap(long)]
        exclude_extension: Vec<String>,
    },

    /// Lists mnemonics from a reference vocabulary that have no optab.
    CheckCoverage {
        database: PathBuf,

        #[clap(long)]
        vocabulary: PathBuf,

        #[clap(long)]
        vendor_excluded: Option<PathBuf>,

        #[clap(long)]
        config: Option<PathBuf>,
    },

    /// Regenerates the tables concurrently from independent database handles
    /// and checks that every run produces the same output.
    VerifyStability {
        database: PathBuf,

        #[clap(long, default_value = "8")]
        runs: usize,

        #[clap(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<GeneratorConfig, avxgen::Error> {
    match path {
        Some(path) => GeneratorConfig::load(path),
        None => Ok(GeneratorConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();
    match args {
        Args::Generate {
            database,
            output,
            config,
            include_vendor,
            exclude_extension,
        } => {
            let mut config = load_config(config.as_deref())?;
            for vendor in include_vendor.iter() {
                config.excluded_vendors.remove(vendor);
            }

            config.excluded_extensions.extend(exclude_extension);

            let db = Database::open(&database)?;
            let tables = build_tables(db.records(), &config)?;
            match output {
                Some(output) => {
                    let mut out = BufWriter::new(File::create(&output)?);
                    tables.write_to(&mut out)?;
                    info!("Wrote {} optabs to {output:?}", tables.optabs.len());
                },
                None => {
                    let stdout = io::stdout();
                    let mut out = stdout.lock();
                    tables.write_to(&mut out)?;
                },
            }
        },
        Args::CheckCoverage {
            database,
            vocabulary,
            vendor_excluded,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let db = Database::open(&database)?;
            let tables = build_tables(db.records(), &config)?;

            let vocabulary = fs::read_to_string(&vocabulary)?;
            let vendor_excluded = match vendor_excluded {
                Some(path) => fs::read_to_string(path)?,
                None => String::new(),
            };

            let missing = missing_mnemonics(
                &tables.optabs,
                parse_mnemonic_list(&vocabulary),
                parse_mnemonic_list(&vendor_excluded),
            );

            for mnemonic in missing.iter() {
                println!("{mnemonic}");
            }

            if !missing.is_empty() {
                return Err(format!("{} mnemonics have no optab", missing.len()).into());
            }

            println!("All mnemonics covered ({} optabs)", tables.optabs.len());
        },
        Args::VerifyStability {
            database,
            runs,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let outputs = (0..runs.max(2))
                .into_par_iter()
                .map(|_| Database::open(&database).and_then(|db| generate(&db, &config)))
                .collect::<Result<Vec<_>, _>>()?;

            let mismatches = outputs.iter().skip(1).filter(|output| *output != &outputs[0]).count();
            if mismatches > 0 {
                warn!("{mismatches} of {} runs differ from the first run", outputs.len());
                return Err(format!("output is not stable across {} runs", outputs.len()).into());
            }

            println!("{} runs produced identical output ({} bytes)", outputs.len(), outputs[0].len());
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use test_log::test;

    use super::*;

    #[test]
    fn parse_generate() {
        let args = Args::try_parse_from([
            "avxgen",
            "generate",
            "xed.json",
            "--include-vendor",
            "amd",
            "--exclude-extension",
            "AVX512ER",
            "--exclude-extension",
            "AVX512PF",
        ])
        .unwrap();

        match args {
            Args::Generate {
                database,
                output,
                include_vendor,
                exclude_extension,
                ..
            } => {
                assert_eq!(database, PathBuf::from("xed.json"));
                assert_eq!(output, None);
                assert_eq!(include_vendor, vec![Vendor::Amd]);
                assert_eq!(exclude_extension, vec!["AVX512ER", "AVX512PF"]);
            },
            _ => panic!("expected the generate subcommand"),
        }
    }

    #[test]
    fn parse_verify_stability() {
        match Args::try_parse_from(["avxgen", "verify-stability", "xed.json"]).unwrap() {
            Args::VerifyStability {
                runs, ..
            } => assert_eq!(runs, 8),
            _ => panic!("expected the verify-stability subcommand"),
        }
    }

    #[test]
    fn reject_unknown_vendor() {
        assert!(Args::try_parse_from(["avxgen", "generate", "xed.json", "--include-vendor", "via"]).is_err());
    }
}
