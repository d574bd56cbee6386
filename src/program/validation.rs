//! Static program validation
//!
//! Catches malformed compiled programs before any packet is evaluated. The
//! evaluator enforces the same rules at runtime; validation exists so a bad
//! program is reported once at load time instead of once per packet.

use super::{Action, Program, RuleKey, Space};
use crate::bits::MAX_REGISTER_WIDTH;

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn print_diagnostics(&self) {
        for warning in &self.warnings {
            println!("[WARN] {}", warning);
        }
        for error in &self.errors {
            println!("[ERROR] {}", error);
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate a loaded program and return warnings/errors.
pub fn validate(program: &Program) -> ValidationResult {
    let mut result = ValidationResult::new();

    if program.is_empty() {
        result.error("program declares no tables");
        return result;
    }

    for table in program.tables() {
        validate_action_list(&table.name, "prep", &table.prep, &mut result);

        if table.prep.contains(&Action::Match) && table.rules.is_empty() {
            result.warn(format!(
                "table {}: match action but no rules; nothing can fire",
                table.name
            ));
        }

        for (index, rule) in table.rules.iter().enumerate() {
            let context = format!("rules[{}]", index);
            validate_action_list(&table.name, &context, &rule.actions, &mut result);

            if rule.key == RuleKey::Any && index + 1 < table.rules.len() {
                result.warn(format!(
                    "table {}: wildcard rule at position {} is not last; later rules still fire",
                    table.name, index
                ));
            }
        }
    }

    result
}

fn validate_action_list(
    table: &str,
    context: &str,
    actions: &[Action],
    result: &mut ValidationResult,
) {
    for (index, action) in actions.iter().enumerate() {
        validate_action(table, context, action, result);

        if matches!(action, Action::Goto(_)) && index + 1 < actions.len() {
            result.warn(format!(
                "table {} {}: goto is not the final action; the evaluator will abort",
                table, context
            ));
        }
    }
}

fn validate_action(table: &str, context: &str, action: &Action, result: &mut ValidationResult) {
    match action {
        Action::Copy { src, dst, width } => {
            if src.space == Space::Key {
                result.error(format!(
                    "table {} {}: copy reads from the key register",
                    table, context
                ));
            }
            if src.width != dst.width {
                result.error(format!(
                    "table {} {}: copy source width {} != destination width {}",
                    table, context, src.width, dst.width
                ));
            }
            if *width > src.width || *width > dst.width {
                result.error(format!(
                    "table {} {}: copy width {} overflows a declared field",
                    table, context, width
                ));
            }
            if dst.space == Space::Key && src.width > MAX_REGISTER_WIDTH {
                result.error(format!(
                    "table {} {}: key extraction of {} bits exceeds the {}-bit register",
                    table, context, src.width, MAX_REGISTER_WIDTH
                ));
            }
            if src.space == Space::Meta {
                result.error(format!(
                    "table {} {}: copy from the meta space is not materialized",
                    table, context
                ));
            }
        }
        Action::Set {
            field,
            width,
            value: _,
        } => {
            if *width > field.width {
                result.warn(format!(
                    "table {} {}: set value width {} exceeds the field width {}",
                    table, context, width, field.width
                ));
            }
            if field.space == Space::Key {
                result.error(format!(
                    "table {} {}: set cannot target the key register",
                    table, context
                ));
            }
        }
        Action::Write(inner) => validate_action(table, context, inner, result),
        _ => {}
    }
}
