use std::fmt;
use std::io;

use itertools::Itertools;

use crate::encoding::OpBytes;
use crate::error::Result;
use crate::optab::{Optab, OptabEntry, Tables};
use crate::ytab::YtabGroup;

impl Tables {
    pub fn write_to(&self, out: &mut impl io::Write) -> Result<()> {
        write!(out, "{self}")?;
        out.flush()?;
        Ok(())
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Tables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "// {}", self.header)?;

        for group in self.ytabs.iter() {
            writeln!(f)?;
            write_group(f, group)?;
        }

        for optab in self.optabs.iter() {
            writeln!(f)?;
            write_optab(f, self, optab)?;
        }

        writeln!(f)?;
        writeln!(f, "pub static OPTABS: &[(&str, &[Optab])] = &[")?;
        for mnemonic in self.optabs.mnemonics() {
            writeln!(f, "    (\"{mnemonic}\", OPTAB_{mnemonic}),")?;
        }

        writeln!(f, "];")
    }
}

fn write_group(f: &mut fmt::Formatter<'_>, group: &YtabGroup) -> fmt::Result {
    writeln!(f, "static {}: &[Ytab] = &[", group.name)?;
    for row in group.rows.iter() {
        writeln!(f, "    {row},")?;
    }

    writeln!(f, "];")
}

fn write_optab(f: &mut fmt::Formatter<'_>, tables: &Tables, optab: &Optab) -> fmt::Result {
    writeln!(f, "static OPTAB_{}: &[Optab] = &[", optab.mnemonic)?;
    for entry in optab.entries.iter() {
        writeln!(f, "    {},", EntryLine(tables, entry))?;
    }

    writeln!(f, "];")
}

struct EntryLine<'a>(&'a Tables, &'a OptabEntry);

impl fmt::Display for EntryLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let EntryLine(tables, entry) = self;
        let OpBytes {
            prefix,
            opcode,
            digit,
            evex,
        } = &entry.bytes;

        write!(
            f,
            "Optab {{ ytab: {}, prefix: &[{}], op: 0x{opcode:02X}, ",
            tables.ytab(entry.ytab).name,
            prefix.iter().map(|b| format!("0x{b:02X}")).format(", ")
        )?;

        match digit {
            Some(digit) => write!(f, "digit: Some({digit}), ")?,
            None => write!(f, "digit: None, ")?,
        }

        match evex {
            Some(flags) => write!(f, "evex: Some({flags}) }}"),
            None => write!(f, "evex: None }}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::config::GeneratorConfig;
    use crate::record::{InstructionRecord, OperandKind, Role, Slot, TupleType, VectorLength, WidthFlag};
    use crate::testutil::*;

    #[test]
    fn render_vaddpd() {
        let records = vec![vex(
            "VADDPD",
            VectorLength::L128,
            vec![
                dst(OperandKind::Xmm, Slot::Reg),
                src(OperandKind::Xmm, Slot::Vvvv),
                src(OperandKind::Xmm, Slot::Rm),
            ],
        )];

        let output = crate::build_tables(&records, &GeneratorConfig::default()).unwrap().render();
        assert_eq!(
            output,
            "// Code generated by avxgen. DO NOT EDIT.

static Y0_VADDPD: &[Ytab] = &[
    Ytab { args: &[Yxr, Yxr, Yxr], enc: &[R, V, M] },
];

static OPTAB_VADDPD: &[Optab] = &[
    Optab { ytab: Y0_VADDPD, prefix: &[0xC4, 0xE1, 0x79], op: 0x58, digit: None, evex: None },
];

pub static OPTABS: &[(&str, &[Optab])] = &[
    (\"VADDPD\", OPTAB_VADDPD),
];
"
        );
    }

    #[test]
    fn render_evex_entry() {
        let mut shift = attrs(32);
        shift.broadcast = true;
        let mut record = evex(
            "VPSLLD",
            VectorLength::L512,
            vec![dst(OperandKind::Zmm, Slot::Vvvv), mem(32, Role::Read), imm8()],
            shift,
        );
        record.opcode = 0x72;
        record.digit = Some(6);
        record.width = WidthFlag::W0;

        let output = crate::build_tables([&record], &GeneratorConfig::default()).unwrap().render();
        assert!(output.contains(
            "static Y0_VPSLLD: &[Ytab] = &[
    Ytab { args: &[Yzr, Ybcst32, Yu8], enc: &[V, M, I] },
    Ytab { args: &[Yzr, Yknot0, Ybcst32, Yu8], enc: &[V, K, M, I] },
];"
        ));
        assert!(output.contains(
            "    Optab { ytab: Y0_VPSLLD, prefix: &[0x62, 0xF1, 0x7D, 0x48], op: 0x72, digit: Some(6), evex: Some(N4 | BCST | Z) },"
        ));
    }

    #[test]
    fn render_empty() {
        let records: Vec<InstructionRecord> = Vec::new();
        let output = crate::build_tables(&records, &GeneratorConfig::default()).unwrap().render();
        assert_eq!(
            output,
            "// Code generated by avxgen. DO NOT EDIT.

pub static OPTABS: &[(&str, &[Optab])] = &[
];
"
        );
    }

    #[test]
    fn write_matches_render() {
        let mut scalar = attrs(64);
        scalar.tuple = TupleType::Tuple1Scalar;
        let record = evex(
            "VADDSD",
            VectorLength::Lig,
            vec![
                dst(OperandKind::Xmm, Slot::Reg),
                src(OperandKind::Xmm, Slot::Vvvv),
                mem(64, Role::Read),
            ],
            scalar,
        );

        let tables = crate::build_tables([&record], &GeneratorConfig::default()).unwrap();
        let mut buf = Vec::new();
        tables.write_to(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), tables.render());
    }

    struct BrokenPipe;

    impl io::Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failure() {
        let records: Vec<InstructionRecord> = Vec::new();
        let tables = crate::build_tables(&records, &GeneratorConfig::default()).unwrap();
        match tables.write_to(&mut BrokenPipe) {
            Err(crate::Error::Write(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
