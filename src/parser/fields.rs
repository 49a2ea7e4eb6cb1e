use super::segments::Segment;

/// Destination field of a classified segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ItemName,
    Components,
    Projects,
    SerialFlowDiagram,
    ComponentsTable,
    ProjectDiagrams,
    CarbonFootprint,
    ReengineeringGuide,
}

struct Anchor {
    field: Field,
    keyword: &'static str,
    excludes: Option<&'static str>,
}

impl Anchor {
    fn matches(&self, lowercased: &str) -> bool {
        lowercased.contains(self.keyword)
            && self.excludes.map_or(true, |phrase| !lowercased.contains(phrase))
    }
}

// Evaluated top to bottom; the first match wins.
const ANCHORS: &[Anchor] = &[
    Anchor { field: Field::ItemName, keyword: "item name", excludes: None },
    Anchor { field: Field::Components, keyword: "components", excludes: Some("components table") },
    Anchor { field: Field::Projects, keyword: "projects", excludes: Some("project diagrams") },
    Anchor { field: Field::SerialFlowDiagram, keyword: "serial flow diagram", excludes: None },
    Anchor { field: Field::ComponentsTable, keyword: "components table", excludes: None },
    Anchor { field: Field::ProjectDiagrams, keyword: "project diagrams", excludes: None },
    Anchor { field: Field::CarbonFootprint, keyword: "carbon footprint", excludes: None },
    Anchor { field: Field::ReengineeringGuide, keyword: "reengineering guide", excludes: None },
];

/// Match a segment against the keyword anchors.
pub fn classify(segment: &Segment) -> Option<Field> {
    ANCHORS
        .iter()
        .find(|a| a.matches(&segment.lowercased))
        .map(|a| a.field)
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::ItemName => "item_name",
            Field::Components => "components",
            Field::Projects => "projects",
            Field::SerialFlowDiagram => "serial_flow_diagram",
            Field::ComponentsTable => "components_table",
            Field::ProjectDiagrams => "project_diagrams",
            Field::CarbonFootprint => "carbon_footprint",
            Field::ReengineeringGuide => "reengineering_guide",
        }
    }
}

// ── Tests ──
