pub mod json;
pub mod text;

use crate::error::MineError;
use crate::types::report::FleetSummary;

#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn render(summary: &FleetSummary, format: OutputFormat) -> Result<String, MineError> {
    match format {
        OutputFormat::Text => Ok(text::to_text(summary)),
        OutputFormat::Json => json::to_json(summary).map_err(MineError::Json),
    }
}
