use std::collections::BTreeSet;

use crate::optab::OptabTable;

pub fn missing_mnemonics<'a>(
    table: &OptabTable, vocabulary: impl IntoIterator<Item = &'a str>, vendor_excluded: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let excluded = vendor_excluded.into_iter().collect::<BTreeSet<_>>();
    vocabulary
        .into_iter()
        .filter(|mnemonic| !excluded.contains(mnemonic) && !table.contains(mnemonic))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::from)
        .collect()
}

pub fn parse_mnemonic_list(text: &str) -> Vec<&str> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::config::GeneratorConfig;
    use crate::record::{InstructionRecord, OperandKind, Slot, Vendor, VectorLength};
    use crate::testutil::*;

    fn xmm3(mnemonic: &str) -> InstructionRecord {
        vex(
            mnemonic,
            VectorLength::L128,
            vec![
                dst(OperandKind::Xmm, Slot::Reg),
                src(OperandKind::Xmm, Slot::Vvvv),
                src(OperandKind::Xmm, Slot::Rm),
            ],
        )
    }

    #[test]
    fn reports_missing() {
        let mut fma4 = xmm3("VFMADDPD");
        fma4.vendor = Vendor::Amd;
        let records = vec![xmm3("VADDPD"), xmm3("VSUBPD"), fma4];
        let tables = crate::build_tables(&records, &GeneratorConfig::default()).unwrap();

        let vocabulary = ["VSUBPD", "VMULPD", "VADDPD", "VFMADDPD", "VMULPD"];
        assert_eq!(missing_mnemonics(&tables.optabs, vocabulary, [] as [&str; 0]), vec!["VFMADDPD", "VMULPD"]);
        assert_eq!(missing_mnemonics(&tables.optabs, vocabulary, ["VFMADDPD"]), vec!["VMULPD"]);
        assert!(missing_mnemonics(&tables.optabs, vocabulary, ["VFMADDPD", "VMULPD"]).is_empty());
    }

    #[test]
    fn parse_list() {
        let text = "VADDPD\n\n  VSUBPD  \n# AMD only\nVFMADDPD # FMA4\n";
        assert_eq!(parse_mnemonic_list(text), vec!["VADDPD", "VSUBPD", "VFMADDPD"]);
    }
}
