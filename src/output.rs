use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use tracing::info;

use crate::parser::extract::ExtractionResult;

/// Extracted description together with the hosted image it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub image_url: String,
    pub description: ExtractionResult,
}

impl Detection {
    pub fn new(image_url: impl Into<String>, description: ExtractionResult) -> Self {
        Self {
            image_url: image_url.into(),
            description,
        }
    }

    /// Serialize with a four-space indent.
    pub fn write_pretty<W: Write>(&self, writer: W) -> Result<()> {
        let mut ser =
            serde_json::Serializer::with_formatter(writer, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut ser)?;
        Ok(())
    }

    pub fn to_pretty_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_pretty(&mut buf)?;
        Ok(String::from_utf8(buf)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        self.write_pretty(&mut writer)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        info!("Detection saved to {}", path.display());
        Ok(())
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::extract::FootprintEntry;
    use crate::parser::process_description;

    #[test]
    fn schema_and_field_order() {
        let d = Detection::new("https://i.imgur.com/abc.jpg", ExtractionResult::default());
        let json = d.to_pretty_string().unwrap();
        let expected = r#"{
    "image_url": "https://i.imgur.com/abc.jpg",
    "description": {
        "item_name": "",
        "components": [],
        "projects": [],
        "serial_flow_diagram": "",
        "components_table": [],
        "project_diagrams": [],
        "carbon_footprint": [],
        "reengineering_guide": ""
    }
}"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn nested_records_are_objects() {
        let mut description = ExtractionResult::default();
        description.carbon_footprint.push(FootprintEntry {
            component: "LED".into(),
            footprint: "0.5kg".into(),
        });
        let value = serde_json::to_value(Detection::new("u", description)).unwrap();
        assert_eq!(
            value["description"]["carbon_footprint"][0],
            serde_json::json!({ "component": "LED", "footprint": "0.5kg" })
        );
    }

    #[test]
    fn save_and_read_back() {
        let raw = std::fs::read_to_string("tests/fixtures/llama_full.txt").unwrap();
        let d = Detection::new("https://i.imgur.com/mouse.jpg", process_description(&raw));
        let path = std::env::temp_dir().join(format!("detect-output-{}.json", std::process::id()));
        d.save(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        let back: Detection = serde_json::from_str(&text).unwrap();
        assert_eq!(back, d);
    }
}
