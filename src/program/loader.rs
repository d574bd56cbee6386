//! Program file loading
//!
//! Programs arrive as TOML produced by the external compiler. The file form
//! references goto targets by table name; loading resolves every name to a
//! `TableId` so the frozen program is index-addressed.

use super::{Action, Field, Program, Rule, RuleKey, Space, Table};
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Load a program from a TOML file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Program> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

/// Parse a program from TOML text.
pub fn parse(text: &str) -> Result<Program> {
    let file: ProgramFile =
        toml::from_str(text).map_err(|e| Error::ProgramFormat(e.to_string()))?;
    file.resolve()
}

#[derive(Debug, Deserialize)]
struct ProgramFile {
    #[serde(default)]
    tables: Vec<TableSpec>,
}

#[derive(Debug, Deserialize)]
struct TableSpec {
    name: String,
    #[serde(default)]
    prep: Vec<ActionSpec>,
    #[serde(default)]
    rules: Vec<RuleSpec>,
}

#[derive(Debug, Deserialize)]
struct RuleSpec {
    key: KeySpec,
    #[serde(default)]
    actions: Vec<ActionSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum KeySpec {
    Scalar(u64),
    Port(u16),
    Any,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SpaceSpec {
    Packet,
    Header,
    Meta,
    Key,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct FieldSpec {
    space: SpaceSpec,
    pos: u32,
    width: u32,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ActionSpec {
    Advance {
        amount: i64,
    },
    Copy {
        src: FieldSpec,
        dst: FieldSpec,
        width: u32,
    },
    Set {
        field: FieldSpec,
        value: u64,
        width: u32,
    },
    Write {
        action: Box<ActionSpec>,
    },
    Clear,
    Drop,
    Match,
    Goto {
        table: String,
    },
    Output {
        port: u16,
    },
}

impl ProgramFile {
    fn resolve(self) -> Result<Program> {
        let mut by_name: HashMap<&str, usize> = HashMap::new();
        for (index, table) in self.tables.iter().enumerate() {
            if by_name.insert(&table.name, index).is_some() {
                return Err(Error::ProgramFormat(format!(
                    "duplicate table name: {}",
                    table.name
                )));
            }
        }

        let mut tables = Vec::with_capacity(self.tables.len());
        for spec in &self.tables {
            let prep = resolve_actions(&spec.prep, &by_name)?;
            let mut rules = Vec::with_capacity(spec.rules.len());
            for rule in &spec.rules {
                rules.push(Rule {
                    key: rule.key.resolve(),
                    actions: resolve_actions(&rule.actions, &by_name)?,
                });
            }
            tables.push(Table {
                name: spec.name.clone(),
                prep,
                rules,
            });
        }

        Ok(Program::new(tables))
    }
}

fn resolve_actions(specs: &[ActionSpec], by_name: &HashMap<&str, usize>) -> Result<Vec<Action>> {
    specs.iter().map(|s| s.resolve(by_name)).collect()
}

impl KeySpec {
    fn resolve(&self) -> RuleKey {
        match *self {
            KeySpec::Scalar(value) => RuleKey::Scalar(value),
            KeySpec::Port(port) => RuleKey::Port(port),
            KeySpec::Any => RuleKey::Any,
        }
    }
}

impl FieldSpec {
    fn resolve(self) -> Field {
        let space = match self.space {
            SpaceSpec::Packet => Space::Packet,
            SpaceSpec::Header => Space::Header,
            SpaceSpec::Meta => Space::Meta,
            SpaceSpec::Key => Space::Key,
        };
        Field {
            space,
            pos: self.pos,
            width: self.width,
        }
    }
}

impl ActionSpec {
    fn resolve(&self, by_name: &HashMap<&str, usize>) -> Result<Action> {
        let action = match self {
            ActionSpec::Advance { amount } => Action::Advance { amount: *amount },
            ActionSpec::Copy { src, dst, width } => Action::Copy {
                src: src.resolve(),
                dst: dst.resolve(),
                width: *width,
            },
            ActionSpec::Set {
                field,
                value,
                width,
            } => Action::Set {
                field: field.resolve(),
                value: *value,
                width: *width,
            },
            ActionSpec::Write { action } => Action::Write(Box::new(action.resolve(by_name)?)),
            ActionSpec::Clear => Action::Clear,
            ActionSpec::Drop => Action::Drop,
            ActionSpec::Match => Action::Match,
            ActionSpec::Goto { table } => {
                let index = by_name
                    .get(table.as_str())
                    .ok_or_else(|| Error::UnknownTable(table.clone()))?;
                Action::Goto(super::TableId(*index))
            }
            ActionSpec::Output { port } => Action::Output { port: *port },
        };
        Ok(action)
    }
}
