pub mod footprint;
pub mod lists;
pub mod table;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::fields::{classify, Field};
use super::segments::Segment;

pub use footprint::FootprintEntry;
pub use table::TableEntry;

/// Structured record built from one raw description. Every field is always serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionResult {
    pub item_name: String,
    pub components: Vec<String>,
    pub projects: Vec<String>,
    pub serial_flow_diagram: String,
    pub components_table: Vec<TableEntry>,
    pub project_diagrams: Vec<String>,
    pub carbon_footprint: Vec<FootprintEntry>,
    pub reengineering_guide: String,
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        self.populated_fields() == 0
    }

    /// Number of fields holding a non-default value.
    pub fn populated_fields(&self) -> usize {
        [
            !self.item_name.is_empty(),
            !self.components.is_empty(),
            !self.projects.is_empty(),
            !self.serial_flow_diagram.is_empty(),
            !self.components_table.is_empty(),
            !self.project_diagrams.is_empty(),
            !self.carbon_footprint.is_empty(),
            !self.reengineering_guide.is_empty(),
        ]
        .into_iter()
        .filter(|populated| *populated)
        .count()
    }
}

/// Classify one segment and write its converted body into `result`.
/// Returns the field written, or `None` when the segment was skipped.
pub fn apply(segment: &Segment, result: &mut ExtractionResult) -> Option<Field> {
    let field = classify(segment)?;
    let Some(body) = segment.body() else {
        debug!(field = field.name(), "Segment has no ':' delimiter, skipping");
        return None;
    };

    match field {
        Field::ItemName => result.item_name = lists::scalar(body),
        Field::Components => result.components = lists::comma_list(body),
        Field::Projects => result.projects = lists::line_list(body),
        Field::SerialFlowDiagram => result.serial_flow_diagram = lists::scalar(body),
        Field::ComponentsTable => result.components_table = table::extract(body),
        Field::ProjectDiagrams => result.project_diagrams = lists::line_list(body),
        Field::CarbonFootprint => result.carbon_footprint = footprint::extract(body),
        Field::ReengineeringGuide => result.reengineering_guide = lists::scalar(body),
    }

    Some(field)
}

/// Run every segment through the classifier, later sections overwriting earlier ones.
pub fn extract_all<'a>(segments: impl IntoIterator<Item = Segment<'a>>) -> ExtractionResult {
    let mut result = ExtractionResult::default();
    let mut matched = 0usize;
    for segment in segments {
        if apply(&segment, &mut result).is_some() {
            matched += 1;
        }
    }
    debug!(
        matched,
        populated = result.populated_fields(),
        "Extraction finished"
    );
    result
}

// ── Tests ──
