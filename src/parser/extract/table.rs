use serde::{Deserialize, Serialize};
use tracing::debug;

/// One row of the component pin table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    pub component: String,
    pub pin: String,
    pub description: String,
}

/// Parse `component - pin - description` lines. Lines that don't split into exactly
/// three parts on `-` are dropped.
pub fn extract(body: &str) -> Vec<TableEntry> {
    body.trim().lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<TableEntry> {
    let parts: Vec<&str> = line.split('-').collect();
    match parts.as_slice() {
        [component, pin, description] => Some(TableEntry {
            component: component.trim().to_string(),
            pin: pin.trim().to_string(),
            description: description.trim().to_string(),
        }),
        _ => {
            debug!(line, parts = parts.len(), "Dropping components table line");
            None
        }
    }
}
