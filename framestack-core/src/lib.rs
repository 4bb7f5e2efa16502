//! Framestack turns a batch of PNG and GIF files into one vertically stacked
//! animation strip, the layout block-game resource packs expect for animated
//! textures, plus a `.mcmeta` sidecar marking the strip as an animation.
//!
//! # Pipeline overview
//!
//! 1. **Select**: keep only paths ending in `.png` / `.gif` (case-insensitive).
//! 2. **Order**: stable-sort the selection by the integer formed from the
//!    digits in each filename (`bg` = 0, `tile2` = 2, `tile10` = 10).
//! 3. **Expand**: decode every file into frames (one per PNG, every stored
//!    frame of a GIF). Files that fail to decode are reported and skipped.
//! 4. **Composite**: paint the frames top to bottom onto a transparent canvas
//!    `max(width)` wide and `sum(height)` tall.
//! 5. **Write**: encode the canvas as PNG, then write the sidecar.
//!
//! By default the output lands on the first selected file's own path, so the
//! lowest-keyed input is overwritten. See [`OutputPlacement`].
//!
//! The codec and the user-facing message sink are injected through
//! [`ImageCodec`] and [`Reporter`]; [`Pipeline::process_batch`] is the
//! single entry point.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod codec;
mod compose;
mod foundation;
mod output;
mod pipeline;
mod select;

#[cfg(test)]
#[path = "../tests/unit/support.rs"]
mod test_support;

pub use codec::image_codec::{DefaultCodec, ImageCodec};
pub use compose::stack::{MAX_CANVAS_BYTES, StackLayout, StripPlacement, composite_vertical};
pub use foundation::core::{ImageKind, InputFile, RasterFrame};
pub use foundation::error::{FramestackError, FramestackResult};
pub use output::artifact::{OutputArtifact, OutputPlacement};
pub use output::sidecar::{DEFAULT_SIDECAR_SUFFIX, render_sidecar, write_sidecar};
pub use pipeline::batch::{
    BatchOpts, BatchOutcome, BatchStage, ContributedFile, Pipeline, SkippedFile, plan_inputs,
};
pub use pipeline::report::{Reporter, Severity, TracingReporter};
pub use pipeline::shared::SharedPipeline;
pub use select::filter::select_inputs;
pub use select::ordering::{OrderingKey, order_inputs};
