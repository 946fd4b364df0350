use std::collections::HashMap;
use std::fmt;

use itertools::Itertools;
use log::trace;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArgClass {
    Yxr,
    YxrEvex,
    Yyr,
    YyrEvex,
    Yzr,
    Yrl32,
    Yrl64,
    Yk,
    Yknot0,
    Ym(u16),
    Ybcst(u16),
    Yxvm,
    YxvmEvex,
    Yyvm,
    YyvmEvex,
    Yzvm,
    Yu8,
    Yrn,
    Ysae,
}

impl ArgClass {
    pub fn is_memory(&self) -> bool {
        matches!(
            self,
            ArgClass::Ym(_)
                | ArgClass::Ybcst(_)
                | ArgClass::Yxvm
                | ArgClass::YxvmEvex
                | ArgClass::Yyvm
                | ArgClass::YyvmEvex
                | ArgClass::Yzvm
        )
    }
}

impl fmt::Display for ArgClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgClass::Yxr => f.write_str("Yxr"),
            ArgClass::YxrEvex => f.write_str("YxrEvex"),
            ArgClass::Yyr => f.write_str("Yyr"),
            ArgClass::YyrEvex => f.write_str("YyrEvex"),
            ArgClass::Yzr => f.write_str("Yzr"),
            ArgClass::Yrl32 => f.write_str("Yrl32"),
            ArgClass::Yrl64 => f.write_str("Yrl64"),
            ArgClass::Yk => f.write_str("Yk"),
            ArgClass::Yknot0 => f.write_str("Yknot0"),
            ArgClass::Ym(bits) => write!(f, "Ym{bits}"),
            ArgClass::Ybcst(bits) => write!(f, "Ybcst{bits}"),
            ArgClass::Yxvm => f.write_str("Yxvm"),
            ArgClass::YxvmEvex => f.write_str("YxvmEvex"),
            ArgClass::Yyvm => f.write_str("Yyvm"),
            ArgClass::YyvmEvex => f.write_str("YyvmEvex"),
            ArgClass::Yzvm => f.write_str("Yzvm"),
            ArgClass::Yu8 => f.write_str("Yu8"),
            ArgClass::Yrn => f.write_str("Yrn"),
            ArgClass::Ysae => f.write_str("Ysae"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    R,
    V,
    M,
    I,
    S,
    K,
    E,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::R => "R",
            Field::V => "V",
            Field::M => "M",
            Field::I => "I",
            Field::S => "S",
            Field::K => "K",
            Field::E => "E",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token {
    pub class: ArgClass,
    pub field: Field,

    pub optional: bool,
}

impl Token {
    pub fn new(class: ArgClass, field: Field) -> Self {
        Token {
            class,
            field,
            optional: false,
        }
    }

    pub fn optional(class: ArgClass, field: Field) -> Self {
        Token {
            class,
            field,
            optional: true,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            write!(f, "[{}/{}]", self.class, self.field)
        } else {
            write!(f, "{}/{}", self.class, self.field)
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Specificity {
    RegisterOnly,
    Memory,
    Broadcast,
    Rounding,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperandForm(Vec<Token>);

impl OperandForm {
    pub fn new(tokens: Vec<Token>) -> Self {
        OperandForm(tokens)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_memory(&self) -> bool {
        self.0.iter().any(|t| t.class.is_memory())
    }

    pub fn specificity(&self) -> Specificity {
        let classes = || self.0.iter().map(|t| t.class);
        if classes().any(|c| matches!(c, ArgClass::Yrn | ArgClass::Ysae)) {
            Specificity::Rounding
        } else if classes().any(|c| matches!(c, ArgClass::Ybcst(_))) {
            Specificity::Broadcast
        } else if classes().any(|c| c.is_memory()) {
            Specificity::Memory
        } else {
            Specificity::RegisterOnly
        }
    }

    pub fn rows(&self) -> Vec<Ytab> {
        let full = Ytab::from_tokens(self.0.iter());
        if self.0.iter().any(|t| t.optional) {
            vec![Ytab::from_tokens(self.0.iter().filter(|t| !t.optional)), full]
        } else {
            vec![full]
        }
    }
}

impl fmt::Display for OperandForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().format(", "))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ytab {
    pub args: Vec<ArgClass>,
    pub fields: Vec<Field>,
}

impl Ytab {
    fn from_tokens<'a>(tokens: impl Iterator<Item = &'a Token>) -> Self {
        let (args, fields) = tokens.map(|t| (t.class, t.field)).unzip();
        Ytab {
            args,
            fields,
        }
    }
}

impl fmt::Display for Ytab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ytab {{ args: &[{}], enc: &[{}] }}",
            self.args.iter().format(", "),
            self.fields.iter().format(", ")
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YtabGroupId(usize);

impl YtabGroupId {
    pub fn as_index(&self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct YtabGroup {
    pub id: YtabGroupId,
    pub name: String,
    pub form: OperandForm,
    pub rows: Vec<Ytab>,
}

// Identities follow first-intern order. Callers intern in a canonical order.
#[derive(Clone, Debug, Default)]
pub struct YtabInterner {
    ids: HashMap<OperandForm, YtabGroupId>,
    groups: Vec<YtabGroup>,
}

impl YtabInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, form: &OperandForm, first_user: &str) -> YtabGroupId {
        if let Some(&id) = self.ids.get(form) {
            return id;
        }

        let id = YtabGroupId(self.groups.len());
        let name = format!("Y{}_{}", id.0, first_user);
        trace!("Interned {name}: {form}");

        self.groups.push(YtabGroup {
            id,
            name,
            form: form.clone(),
            rows: form.rows(),
        });
        self.ids.insert(form.clone(), id);

        id
    }

    pub fn get(&self, id: YtabGroupId) -> &YtabGroup {
        &self.groups[id.0]
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn into_groups(self) -> Vec<YtabGroup> {
        self.groups
    }
}
