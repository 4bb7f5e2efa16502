use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{FramestackError, FramestackResult};

/// Suffix appended to the image path to name the sidecar.
pub const DEFAULT_SIDECAR_SUFFIX: &str = ".mcmeta";

#[derive(serde::Serialize)]
struct McMeta {
    animation: AnimationSection,
}

// Always empty: frame timing is left to the consumer's defaults.
#[derive(serde::Serialize)]
struct AnimationSection {}

/// The sidecar document. Constant: it does not depend on the frames.
pub fn render_sidecar() -> FramestackResult<String> {
    let doc = McMeta {
        animation: AnimationSection {},
    };
    Ok(serde_json::to_string_pretty(&doc).context("serialize sidecar")?)
}

/// Write the sidecar to `path`, replacing any existing file.
pub fn write_sidecar(path: &Path) -> FramestackResult<()> {
    let body = render_sidecar()?;
    std::fs::write(path, body).map_err(|e| FramestackError::sidecar(path, e))
}

#[cfg(test)]
#[path = "../../tests/unit/output/sidecar.rs"]
mod tests;
