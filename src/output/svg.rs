//! SVG flame graph rendering and output.
//!
//! Folded lines from `render_folded` are handed to inferno, which lays out
//! and colours the graph.

use super::json::{create_parent_dirs, validate_output_path};
use crate::utils::error::OutputError;
use inferno::flamegraph::{self, Options};
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Flame graph configuration
#[derive(Debug, Clone)]
pub struct FlamegraphConfig {
    pub title: String,
    pub width: Option<usize>,
}

impl Default for FlamegraphConfig {
    fn default() -> Self {
        Self {
            title: "Live Stacks".to_string(),
            width: None,
        }
    }
}

impl FlamegraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }
}

/// Render folded lines into an SVG document
///
/// **Public** - main entry point for flame graph generation
///
/// # Errors
/// * `OutputError::EmptyStacks` - No folded lines to draw
/// * `OutputError::GenerationFailed` - inferno failed to render
pub fn render_flamegraph(
    folded: &[String],
    config: &FlamegraphConfig,
) -> Result<String, OutputError> {
    if folded.is_empty() {
        return Err(OutputError::EmptyStacks);
    }

    info!("Generating flamegraph with {} stacks", folded.len());

    let mut options = Options::default();
    options.title = config.title.clone();
    options.count_name = "samples".to_string();
    options.image_width = config.width;

    let mut svg = Vec::new();
    flamegraph::from_lines(&mut options, folded.iter().map(String::as_str), &mut svg)
        .map_err(|e| OutputError::GenerationFailed(e.to_string()))?;

    Ok(String::from_utf8_lossy(&svg).into_owned())
}

/// Write SVG content to a file
///
/// **Public** - main entry point for SVG output
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::InvalidPath` - Path is invalid
pub fn write_svg(svg_content: &str, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing SVG to: {}", output_path.display());

    validate_output_path(output_path)?;
    create_parent_dirs(output_path)?;

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let mut writer = BufWriter::new(file);

    writer
        .write_all(svg_content.as_bytes())
        .map_err(OutputError::WriteFailed)?;
    writer.flush().map_err(OutputError::WriteFailed)?;

    let file_size = svg_content.len();
    info!(
        "SVG written successfully ({} bytes, {:.2} KB)",
        file_size,
        file_size as f64 / 1024.0
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_flamegraph_empty() {
        let result = render_flamegraph(&[], &FlamegraphConfig::new());
        assert!(matches!(result, Err(OutputError::EmptyStacks)));
    }

    #[test]
    fn test_render_flamegraph_produces_svg() {
        let folded = vec!["nginx;main;read 3".to_string(), "nginx;main;write 1".to_string()];
        let svg = render_flamegraph(&folded, &FlamegraphConfig::new().with_title("test")).unwrap();

        assert!(svg.contains("<svg"));
        assert!(svg.contains("read"));
    }

    #[test]
    fn test_render_flamegraph_with_width() {
        let folded = vec![
            "redis;main;0x401000+0x10 5".to_string(),
            "redis;main;write 2".to_string(),
        ];
        let config = FlamegraphConfig::new().with_width(800);

        let svg = render_flamegraph(&folded, &config).unwrap();

        assert!(svg.contains("width=\"800\""));
        assert!(svg.contains("redis"));
    }

    #[test]
    fn test_generation_error_message() {
        let err = OutputError::GenerationFailed("bad xml".to_string());
        assert_eq!(err.to_string(), "Flame graph generation failed: bad xml");
    }

    #[test]
    fn test_write_svg() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("out/flame.svg");

        write_svg("<svg></svg>", &path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<svg></svg>");
    }
}
