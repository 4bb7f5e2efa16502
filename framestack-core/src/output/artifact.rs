use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::foundation::core::InputFile;

/// Where the composited image goes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputPlacement {
    /// Write over the first input (lowest ordering key), in its directory.
    ///
    /// The existing file is replaced without confirmation, even when it is a
    /// GIF: the bytes written are always PNG.
    #[default]
    OverwriteFirstInput,
    /// Write to this exact path instead.
    Path(PathBuf),
}

/// Resolved output locations for one batch.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct OutputArtifact {
    /// The composited PNG.
    pub image_path: PathBuf,
    /// `image_path` with the sidecar suffix appended.
    pub sidecar_path: PathBuf,
}

impl OutputArtifact {
    /// Resolve the artifact for a batch whose first ordered input is `first`.
    pub fn resolve(placement: &OutputPlacement, first: &InputFile, sidecar_suffix: &str) -> Self {
        let image_path = match placement {
            OutputPlacement::OverwriteFirstInput => {
                let dir = first.path().parent().unwrap_or_else(|| Path::new(""));
                dir.join(first.file_name())
            }
            OutputPlacement::Path(p) => p.clone(),
        };
        let sidecar_path = append_suffix(&image_path, sidecar_suffix);
        Self {
            image_path,
            sidecar_path,
        }
    }

    /// Whether writing this artifact replaces one of the batch inputs.
    pub fn overwrites_input(&self, inputs: &[InputFile]) -> bool {
        inputs.iter().any(|f| f.path() == self.image_path)
    }
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

#[cfg(test)]
#[path = "../../tests/unit/output/artifact.rs"]
mod tests;
