use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FootprintEntry {
    pub component: String,
    pub footprint: String,
}

/// Parse `component: footprint` lines, splitting on the first `:` only.
pub fn extract(body: &str) -> Vec<FootprintEntry> {
    body.trim()
        .lines()
        .filter_map(|line| match line.split_once(':') {
            Some((component, footprint)) => Some(FootprintEntry {
                component: component.trim().to_string(),
                footprint: footprint.trim().to_string(),
            }),
            None => {
                debug!(line, "Dropping carbon footprint line without ':'");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_colon_only() {
        assert_eq!(
            extract("LED: 0.5kg: extra"),
            vec![FootprintEntry {
                component: "LED".into(),
                footprint: "0.5kg: extra".into(),
            }]
        );
    }

    #[test]
    fn drops_lines_without_colon() {
        let rows = extract("\nMicrocontroller: 2.1kg\nEstimates vary\nPIR Sensor: 0.8kg\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].component, "Microcontroller");
        assert_eq!(rows[1].footprint, "0.8kg");
    }

    #[test]
    fn bullet_prefix_is_kept() {
        let rows = extract("* Buzzer: 0.2 kg CO2e");
        assert_eq!(rows[0].component, "* Buzzer");
        assert_eq!(rows[0].footprint, "0.2 kg CO2e");
    }
}
