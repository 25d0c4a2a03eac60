//! Dialect tables for the P16 instruction set.
//!
//! The branch-condition aliases and the ALU/RAM sub-operation tables are
//! data, not code: they live in `tables/p16.json` and are deserialized at
//! first use. Earlier hardware revisions shuffled individual entries (the
//! one-operand ALU `nop`/`dup` codes swapped at one point), so keeping the
//! tables in a data file lets a different dialect be swapped in without
//! touching the assembler.

use crate::error::{AsmError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Embedded default dialect, the latest P16 revision.
const P16_TABLES: &str = include_str!("../tables/p16.json");

/// Which sub-op family an `ALU`/`RAM` mnemonic selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluRamClass {
    Alu,
    Ram,
}

impl AluRamClass {
    /// The mnemonic this class belongs to.
    pub fn name(self) -> &'static str {
        match self {
            AluRamClass::Alu => "ALU",
            AluRamClass::Ram => "RAM",
        }
    }
}

/// A loaded and validated set of dialect tables.
#[derive(Debug, Clone, Deserialize)]
pub struct Dialect {
    /// Dialect name, e.g. `p16`.
    pub name: String,
    branch_conditions: HashMap<String, u8>,
    alu_unary: HashMap<String, u8>,
    ram_unary: HashMap<String, u8>,
    alu_binary: HashMap<String, u8>,
    ram_binary: HashMap<String, u8>,
}

impl Dialect {
    /// Parse a dialect from its JSON table file and validate it.
    pub fn from_json(text: &str) -> Result<Dialect> {
        let dialect: Dialect = serde_json::from_str(text).map_err(|e| AsmError::Dialect {
            message: format!("malformed dialect table: {}", e),
        })?;
        dialect.validate()?;
        Ok(dialect)
    }

    /// The built-in P16 dialect.
    pub fn p16() -> &'static Dialect {
        static DIALECT: OnceLock<Dialect> = OnceLock::new();
        DIALECT.get_or_init(|| {
            Dialect::from_json(P16_TABLES).expect("embedded dialect table is valid")
        })
    }

    /// Every value in every table must fit in one nibble.
    fn validate(&self) -> Result<()> {
        let tables: [(&str, &HashMap<String, u8>); 5] = [
            ("branch_conditions", &self.branch_conditions),
            ("alu_unary", &self.alu_unary),
            ("ram_unary", &self.ram_unary),
            ("alu_binary", &self.alu_binary),
            ("ram_binary", &self.ram_binary),
        ];
        for (name, table) in tables {
            if table.is_empty() {
                return Err(AsmError::Dialect {
                    message: format!("table `{}` is empty", name),
                });
            }
            for (key, code) in table {
                if *code > 15 {
                    return Err(AsmError::Dialect {
                        message: format!("table `{}` entry `{}` = {} is not a nibble", name, key, code),
                    });
                }
            }
        }
        Ok(())
    }

    /// Look up a branch-condition alias, returning its 4-bit code.
    pub fn branch_condition(&self, alias: &str) -> Option<u8> {
        self.branch_conditions.get(alias).copied()
    }

    /// Look up an ALU/RAM sub-operation by class and operand arity.
    pub fn sub_op(&self, class: AluRamClass, binary: bool, name: &str) -> Option<u8> {
        let table = match (class, binary) {
            (AluRamClass::Alu, false) => &self.alu_unary,
            (AluRamClass::Alu, true) => &self.alu_binary,
            (AluRamClass::Ram, false) => &self.ram_unary,
            (AluRamClass::Ram, true) => &self.ram_binary,
        };
        table.get(name).copied()
    }

    /// Number of distinct branch-condition aliases.
    pub fn branch_alias_count(&self) -> usize {
        self.branch_conditions.len()
    }
}
