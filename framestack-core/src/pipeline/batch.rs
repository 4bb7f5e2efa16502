use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use image::RgbaImage;

use crate::{
    codec::image_codec::{DefaultCodec, ImageCodec},
    compose::stack::{MAX_CANVAS_BYTES, composite_vertical},
    foundation::{
        core::{ImageKind, InputFile, RasterFrame},
        error::{FramestackError, FramestackResult},
    },
    output::{
        artifact::{OutputArtifact, OutputPlacement},
        sidecar::{DEFAULT_SIDECAR_SUFFIX, write_sidecar},
    },
    pipeline::report::{Reporter, Severity, TracingReporter},
    select::{
        filter::select_inputs,
        ordering::{OrderingKey, order_inputs},
    },
};

/// Options for a [`Pipeline`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchOpts {
    /// Where the composited image is written.
    pub placement: OutputPlacement,
    /// Appended to the image path to name the sidecar.
    pub sidecar_suffix: String,
    /// Skip the sidecar entirely when false.
    pub write_sidecar: bool,
    /// Refuse canvases with more RGBA8 bytes than this.
    pub max_canvas_bytes: u64,
    /// Create missing parent directories of the output image once the batch
    /// reaches [`BatchStage::Writing`].
    pub create_parent_dirs: bool,
}

impl Default for BatchOpts {
    fn default() -> Self {
        Self {
            placement: OutputPlacement::default(),
            sidecar_suffix: DEFAULT_SIDECAR_SUFFIX.to_owned(),
            write_sidecar: true,
            max_canvas_bytes: MAX_CANVAS_BYTES,
            create_parent_dirs: false,
        }
    }
}

/// Progress of a batch. Stages only move forward; the last four are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub enum BatchStage {
    /// Nothing submitted yet.
    Idle,
    /// Dropping unsupported paths.
    Filtering,
    /// Inputs ordered by key.
    Sorted,
    /// Expanding inputs into frames.
    Decoding,
    /// Painting the canvas.
    Compositing,
    /// Encoding and writing output.
    Writing,
    /// Image written (the sidecar may still have failed).
    Done,
    /// Aborted: no supported inputs.
    SelectionEmpty,
    /// Aborted: no input produced a frame.
    AllDecodeFailed,
    /// Aborted: the image could not be produced or written.
    WriteFailed,
}

impl BatchStage {
    /// Whether the batch has finished, successfully or not.
    pub fn is_terminal(self) -> bool {
        self >= Self::Done
    }
}

/// One input that made it into the canvas.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ContributedFile {
    /// Input path.
    pub path: PathBuf,
    /// Input format.
    pub kind: ImageKind,
    /// Ordering key, in decimal.
    pub key: String,
    /// Frames it contributed (0 for an empty GIF).
    pub frames: usize,
}

/// One input the batch skipped.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SkippedFile {
    /// Input path.
    pub path: PathBuf,
    /// Why it was skipped.
    pub reason: String,
}

/// Result of a batch that reached [`BatchStage::Done`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct BatchOutcome {
    /// Where the image and sidecar went.
    pub artifact: OutputArtifact,
    /// Canvas width.
    pub width: u32,
    /// Canvas height.
    pub height: u32,
    /// Total frames painted.
    pub frame_count: usize,
    /// Inputs in paint order.
    pub files: Vec<ContributedFile>,
    /// Inputs that failed to decode, in submission order after sorting.
    pub skipped: Vec<SkippedFile>,
    /// False if the sidecar was disabled or could not be written.
    pub sidecar_written: bool,
    /// True if the image replaced one of the inputs.
    pub overwrote_input: bool,
}

/// Select and order `paths` without decoding anything.
///
/// Returns the inputs with their keys, or [`FramestackError::SelectionEmpty`].
pub fn plan_inputs<I, P>(paths: I) -> FramestackResult<Vec<(InputFile, OrderingKey)>>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    let selected = select_inputs(paths);
    if selected.is_empty() {
        return Err(FramestackError::SelectionEmpty);
    }
    Ok(order_inputs(selected)
        .into_iter()
        .map(|f| {
            let key = OrderingKey::from_file_name(&f.file_name());
            (f, key)
        })
        .collect())
}

/// The select → order → expand → composite → write pipeline.
///
/// One call to [`Pipeline::process_batch`] runs one batch to a terminal
/// stage. The pipeline itself is not `Sync`; wrap it in
/// [`crate::SharedPipeline`] to accept batches from several threads.
pub struct Pipeline<C = DefaultCodec, R = TracingReporter> {
    codec: C,
    reporter: R,
    opts: BatchOpts,
    stage: BatchStage,
}

impl Pipeline {
    /// Pipeline using the `image` codec and `tracing` reports.
    pub fn new(opts: BatchOpts) -> Self {
        Self::with_collaborators(DefaultCodec, TracingReporter, opts)
    }
}

impl<C: ImageCodec, R: Reporter> Pipeline<C, R> {
    /// Pipeline with explicit collaborators.
    pub fn with_collaborators(codec: C, reporter: R, opts: BatchOpts) -> Self {
        Self {
            codec,
            reporter,
            opts,
            stage: BatchStage::Idle,
        }
    }

    /// Stage reached by the most recent batch.
    pub fn stage(&self) -> BatchStage {
        self.stage
    }

    /// Options in effect.
    pub fn opts(&self) -> &BatchOpts {
        &self.opts
    }

    /// The reporter, e.g. to inspect collected messages.
    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Run one batch of paths to completion.
    ///
    /// Files that fail to decode are reported and skipped. The batch aborts
    /// with [`FramestackError::SelectionEmpty`] when nothing is selected,
    /// [`FramestackError::AllDecodeFailed`] when no frame was decoded, and
    /// [`FramestackError::Write`] when the image cannot be written; none of
    /// these leave any output behind. The image is written to a sibling
    /// temporary file and renamed over its destination, so an input that is
    /// being replaced stays intact until the new image is complete. A failed
    /// sidecar is reported but does not fail the batch.
    #[tracing::instrument(skip_all, fields(placement = ?self.opts.placement))]
    pub fn process_batch<I, P>(&mut self, paths: I) -> FramestackResult<BatchOutcome>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.stage = BatchStage::Idle;
        self.enter(BatchStage::Filtering);
        let selected = select_inputs(paths);
        if selected.is_empty() {
            return Err(self.abort(FramestackError::SelectionEmpty));
        }

        let ordered = order_inputs(selected);
        self.enter(BatchStage::Sorted);

        self.enter(BatchStage::Decoding);
        let mut frames: Vec<RasterFrame> = Vec::new();
        let mut files = Vec::with_capacity(ordered.len());
        let mut skipped = Vec::new();
        for file in &ordered {
            match self.codec.decode(file) {
                Ok(decoded) => {
                    tracing::debug!(
                        path = %file.path().display(),
                        frames = decoded.len(),
                        "decoded input"
                    );
                    files.push(ContributedFile {
                        path: file.path().to_path_buf(),
                        kind: file.kind(),
                        key: OrderingKey::from_file_name(&file.file_name()).to_string(),
                        frames: decoded.len(),
                    });
                    frames.extend(decoded);
                }
                Err(err) => {
                    self.reporter.report(Severity::Warning, &err.to_string());
                    skipped.push(SkippedFile {
                        path: file.path().to_path_buf(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        if frames.is_empty() {
            return Err(self.abort(FramestackError::AllDecodeFailed {
                attempted: ordered.len(),
                failed: skipped.len(),
            }));
        }

        self.enter(BatchStage::Compositing);
        let canvas = match composite_vertical(&frames, self.opts.max_canvas_bytes) {
            Ok(c) => c,
            Err(err) => return Err(self.abort(err)),
        };
        let frame_count = frames.len();
        drop(frames);

        self.enter(BatchStage::Writing);
        let artifact =
            OutputArtifact::resolve(&self.opts.placement, &ordered[0], &self.opts.sidecar_suffix);
        let overwrote_input = artifact.overwrites_input(&ordered);
        if overwrote_input {
            tracing::warn!(
                path = %artifact.image_path.display(),
                "output replaces an input file"
            );
        }
        if let Err(err) = self.write_image(&artifact.image_path, &canvas) {
            return Err(self.abort(err));
        }
        self.reporter.report(
            Severity::Info,
            &format!(
                "combined {frame_count} frames from {} files into '{}' ({}x{})",
                files.len(),
                artifact.image_path.display(),
                canvas.width(),
                canvas.height()
            ),
        );

        let sidecar_written =
            self.opts.write_sidecar && self.try_write_sidecar(&artifact.sidecar_path);
        self.enter(BatchStage::Done);

        Ok(BatchOutcome {
            width: canvas.width(),
            height: canvas.height(),
            artifact,
            frame_count,
            files,
            skipped,
            sidecar_written,
            overwrote_input,
        })
    }

    fn write_image(&self, path: &Path, canvas: &RgbaImage) -> FramestackResult<()> {
        let bytes = self
            .codec
            .encode_png(canvas)
            .map_err(|e| FramestackError::write(path, e))?;

        if self.opts.create_parent_dirs
            && let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty())
        {
            std::fs::create_dir_all(parent).map_err(|e| FramestackError::write(path, e))?;
        }

        let tmp = staging_path(path)
            .ok_or_else(|| FramestackError::write(path, "output path has no file name"))?;
        let written = std::fs::write(&tmp, bytes).and_then(|()| std::fs::rename(&tmp, path));
        if let Err(err) = written {
            let _ = std::fs::remove_file(&tmp);
            return Err(FramestackError::write(path, err));
        }
        Ok(())
    }

    fn try_write_sidecar(&mut self, path: &Path) -> bool {
        match write_sidecar(path) {
            Ok(()) => true,
            Err(err) => {
                self.reporter.report(Severity::Warning, &err.to_string());
                false
            }
        }
    }

    fn enter(&mut self, next: BatchStage) {
        debug_assert!(next > self.stage, "stage {next:?} re-entered from {:?}", self.stage);
        tracing::debug!(from = ?self.stage, to = ?next, "batch stage");
        self.stage = next;
    }

    fn abort(&mut self, err: FramestackError) -> FramestackError {
        let terminal = err.abort_stage().unwrap_or(BatchStage::WriteFailed);
        self.enter(terminal);
        self.reporter.report(Severity::Error, &err.to_string());
        err
    }
}

/// Hidden sibling of `path` the image is staged in before the rename.
fn staging_path(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?;
    let mut staged = OsString::from(".");
    staged.push(name);
    staged.push(".framestack-tmp");
    Some(path.with_file_name(staged))
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/batch.rs"]
mod tests;
