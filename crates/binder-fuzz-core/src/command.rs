//! Fuzz command value object and its canonical textual rendering.

use serde::{Deserialize, Serialize};

use crate::catalog::ValueType;

/// One fully-bound service call: a transaction code plus a typed argument
/// schema and the literal value chosen for each position.
///
/// Immutable once constructed; `schema` and `values` always have equal length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub service_name: String,
    pub transaction_code: u32,
    pub schema: Vec<ValueType>,
    pub values: Vec<String>,
}

impl Command {
    /// Canonical rendering: `service call <name> <code> <type value>...`.
    pub fn render(&self) -> String {
        let mut out = format!("service call {} {}", self.service_name, self.transaction_code);
        for (ty, value) in self.schema.iter().zip(&self.values) {
            out.push(' ');
            out.push_str(ty.wire_token());
            out.push(' ');
            out.push_str(value);
        }
        out
    }

    pub fn args_count(&self) -> usize {
        self.schema.len()
    }
}
