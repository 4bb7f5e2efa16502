use std::collections::HashMap;

use super::*;
use crate::{
    output::sidecar::render_sidecar,
    test_support::{scratch_dir, write_gif, write_png},
};

type Reports = Vec<(Severity, String)>;

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];

fn pipeline(opts: BatchOpts) -> Pipeline<DefaultCodec, Reports> {
    Pipeline::with_collaborators(DefaultCodec, Vec::new(), opts)
}

fn load(path: &Path) -> RgbaImage {
    let bytes = std::fs::read(path).unwrap();
    image::load_from_memory_with_format(&bytes, image::ImageFormat::Png)
        .unwrap()
        .into_rgba8()
}

fn has_report(reports: &Reports, severity: Severity, needle: &str) -> bool {
    reports
        .iter()
        .any(|(s, m)| *s == severity && m.contains(needle))
}

/// Frames keyed by file name; `None` makes decoding that file fail.
struct ScriptedCodec(HashMap<&'static str, Option<Vec<RasterFrame>>>);

impl ImageCodec for ScriptedCodec {
    fn decode_still(&self, path: &Path) -> FramestackResult<RasterFrame> {
        let mut frames = self.decode_animation(path)?;
        Ok(frames.remove(0))
    }

    fn decode_animation(&self, path: &Path) -> FramestackResult<Vec<RasterFrame>> {
        let name = path.file_name().unwrap().to_str().unwrap();
        match self.0.get(name) {
            Some(Some(frames)) => Ok(frames.clone()),
            _ => Err(FramestackError::decode(path, "scripted failure")),
        }
    }

    fn encode_png(&self, canvas: &RgbaImage) -> FramestackResult<Vec<u8>> {
        DefaultCodec.encode_png(canvas)
    }
}

#[test]
fn end_to_end_stacks_in_key_order_and_overwrites_first_input() {
    let dir = scratch_dir("batch_e2e");
    write_png(&dir.join("tile10.png"), 50, 20, RED);
    write_gif(&dir.join("tile2.gif"), 50, 20, &[GREEN, BLUE]);
    write_png(&dir.join("bg.png"), 50, 20, WHITE);

    let mut p = pipeline(BatchOpts::default());
    let out = p
        .process_batch([
            dir.join("tile10.png"),
            dir.join("tile2.gif"),
            dir.join("bg.png"),
        ])
        .unwrap();

    assert_eq!(p.stage(), BatchStage::Done);
    assert_eq!((out.width, out.height), (50, 80));
    assert_eq!(out.frame_count, 4);
    assert!(out.overwrote_input);
    assert!(out.sidecar_written);
    assert!(out.skipped.is_empty());

    let order: Vec<(&str, usize)> = out
        .files
        .iter()
        .map(|f| (f.key.as_str(), f.frames))
        .collect();
    assert_eq!(order, [("0", 1), ("2", 2), ("10", 1)]);

    assert_eq!(out.artifact.image_path, dir.join("bg.png"));
    assert_eq!(out.artifact.sidecar_path, dir.join("bg.png.mcmeta"));

    let img = load(&out.artifact.image_path);
    assert_eq!(img.dimensions(), (50, 80));
    assert_eq!(img.get_pixel(10, 5).0, WHITE);
    assert_eq!(img.get_pixel(10, 25).0, GREEN);
    assert_eq!(img.get_pixel(10, 45).0, BLUE);
    assert_eq!(img.get_pixel(49, 79).0, RED);

    let sidecar = std::fs::read_to_string(&out.artifact.sidecar_path).unwrap();
    assert_eq!(sidecar, render_sidecar().unwrap());
    assert!(has_report(p.reporter(), Severity::Info, "combined 4 frames"));
}

#[test]
fn failed_file_is_skipped_and_the_rest_keep_their_order() {
    let dir = scratch_dir("batch_partial");
    write_png(&dir.join("a1.png"), 3, 2, RED);
    std::fs::write(dir.join("b2.png"), b"garbage").unwrap();
    write_png(&dir.join("c3.png"), 3, 4, BLUE);

    let mut p = pipeline(BatchOpts::default());
    let out = p
        .process_batch([dir.join("c3.png"), dir.join("b2.png"), dir.join("a1.png")])
        .unwrap();

    assert_eq!((out.width, out.height), (3, 6));
    assert_eq!(out.files.len(), 2);
    assert_eq!(out.skipped.len(), 1);
    assert_eq!(out.skipped[0].path, dir.join("b2.png"));
    assert!(has_report(p.reporter(), Severity::Warning, "b2.png"));

    let img = load(&dir.join("a1.png"));
    assert_eq!(img.get_pixel(0, 1).0, RED);
    assert_eq!(img.get_pixel(0, 2).0, BLUE);
    assert_eq!(img.get_pixel(2, 5).0, BLUE);
}

#[test]
fn no_supported_files_aborts_without_side_effects() {
    let dir = scratch_dir("batch_empty");
    std::fs::write(dir.join("notes.txt"), "hi").unwrap();

    let mut p = pipeline(BatchOpts::default());
    let err = p
        .process_batch([dir.join("notes.txt"), dir.join("photo.jpg")])
        .unwrap_err();

    assert!(matches!(err, FramestackError::SelectionEmpty));
    assert_eq!(p.stage(), BatchStage::SelectionEmpty);
    assert!(has_report(
        p.reporter(),
        Severity::Error,
        "no supported image files"
    ));
    assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 1);
}

#[test]
fn every_file_failing_aborts_before_writing() {
    let dir = scratch_dir("batch_all_failed");
    std::fs::write(dir.join("x1.png"), b"nope").unwrap();
    std::fs::write(dir.join("x2.gif"), b"nope").unwrap();

    let mut p = pipeline(BatchOpts::default());
    let err = p
        .process_batch([dir.join("x2.gif"), dir.join("x1.png")])
        .unwrap_err();

    assert!(matches!(
        err,
        FramestackError::AllDecodeFailed {
            attempted: 2,
            failed: 2
        }
    ));
    assert_eq!(p.stage(), BatchStage::AllDecodeFailed);
    assert_eq!(std::fs::read(dir.join("x1.png")).unwrap(), b"nope");
    assert!(!dir.join("x1.png.mcmeta").exists());
}

#[test]
fn empty_animation_contributes_no_frames() {
    let codec = ScriptedCodec(HashMap::from([
        ("anim1.gif", Some(Vec::new())),
        ("still2.png", Some(vec![RasterFrame::filled(2, 2, GREEN)])),
    ]));
    let dir = scratch_dir("batch_empty_gif");
    let mut p = Pipeline::with_collaborators(codec, Reports::new(), BatchOpts::default());

    let out = p
        .process_batch([dir.join("still2.png"), dir.join("anim1.gif")])
        .unwrap();
    assert_eq!(out.frame_count, 1);
    assert_eq!(out.files[0].frames, 0);
    // The empty GIF still has the lowest key, so it names the output.
    assert_eq!(out.artifact.image_path, dir.join("anim1.gif"));
    assert_eq!(load(&dir.join("anim1.gif")).dimensions(), (2, 2));

    let err = p.process_batch([dir.join("anim1.gif")]).unwrap_err();
    assert!(matches!(
        err,
        FramestackError::AllDecodeFailed {
            attempted: 1,
            failed: 0
        }
    ));
}

#[test]
fn equal_keys_keep_submission_order() {
    let codec = ScriptedCodec(HashMap::from([
        ("zeta.png", Some(vec![RasterFrame::filled(1, 1, RED)])),
        ("alpha.png", Some(vec![RasterFrame::filled(1, 1, BLUE)])),
    ]));
    let dir = scratch_dir("batch_ties");
    let mut p = Pipeline::with_collaborators(codec, Reports::new(), BatchOpts::default());

    let out = p
        .process_batch([dir.join("zeta.png"), dir.join("alpha.png")])
        .unwrap();
    assert_eq!(out.artifact.image_path, dir.join("zeta.png"));
    let img = load(&out.artifact.image_path);
    assert_eq!(img.get_pixel(0, 0).0, RED);
    assert_eq!(img.get_pixel(0, 1).0, BLUE);
}

#[test]
fn write_failure_is_fatal_and_skips_sidecar() {
    let dir = scratch_dir("batch_write_failed");
    write_png(&dir.join("a.png"), 2, 2, RED);
    let target = dir.join("missing").join("out.png");

    let mut p = pipeline(BatchOpts {
        placement: OutputPlacement::Path(target.clone()),
        ..BatchOpts::default()
    });
    let err = p.process_batch([dir.join("a.png")]).unwrap_err();

    assert!(matches!(err, FramestackError::Write { ref path, .. } if path == &target));
    assert_eq!(p.stage(), BatchStage::WriteFailed);
    assert!(has_report(p.reporter(), Severity::Error, "write error"));
    assert!(!dir.join("missing").exists());
}

/// Decodes with the real codec but refuses to encode.
struct BrokenEncoder;

impl ImageCodec for BrokenEncoder {
    fn decode_still(&self, path: &Path) -> FramestackResult<RasterFrame> {
        DefaultCodec.decode_still(path)
    }

    fn decode_animation(&self, path: &Path) -> FramestackResult<Vec<RasterFrame>> {
        DefaultCodec.decode_animation(path)
    }

    fn encode_png(&self, _canvas: &RgbaImage) -> FramestackResult<Vec<u8>> {
        Err(FramestackError::validation("encoder unavailable"))
    }
}

fn dir_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn failed_encode_leaves_the_first_input_untouched() {
    let dir = scratch_dir("batch_encode_failed");
    write_png(&dir.join("a1.png"), 2, 2, RED);
    write_png(&dir.join("a2.png"), 2, 2, BLUE);
    let before = std::fs::read(dir.join("a1.png")).unwrap();

    let mut p = Pipeline::with_collaborators(BrokenEncoder, Reports::new(), BatchOpts::default());
    let err = p
        .process_batch([dir.join("a2.png"), dir.join("a1.png")])
        .unwrap_err();

    assert!(matches!(err, FramestackError::Write { ref path, .. } if path == &dir.join("a1.png")));
    assert_eq!(p.stage(), BatchStage::WriteFailed);
    assert_eq!(std::fs::read(dir.join("a1.png")).unwrap(), before);
    assert_eq!(dir_names(&dir), ["a1.png", "a2.png"]);
}

#[test]
fn failed_rename_leaves_no_staging_file() {
    let dir = scratch_dir("batch_rename_failed");
    write_png(&dir.join("a.png"), 2, 2, RED);
    // A non-empty directory at the destination cannot be replaced by a file.
    let target = dir.join("occupied");
    std::fs::create_dir(&target).unwrap();
    std::fs::write(target.join("keep.txt"), "x").unwrap();

    let mut p = pipeline(BatchOpts {
        placement: OutputPlacement::Path(target.clone()),
        ..BatchOpts::default()
    });
    let err = p.process_batch([dir.join("a.png")]).unwrap_err();

    assert!(matches!(err, FramestackError::Write { ref path, .. } if path == &target));
    assert_eq!(p.stage(), BatchStage::WriteFailed);
    assert!(target.join("keep.txt").exists());
    assert_eq!(dir_names(&dir), ["a.png", "occupied"]);
}

#[test]
fn overwritten_input_is_replaced_without_leftovers() {
    let dir = scratch_dir("batch_replace_clean");
    write_png(&dir.join("a1.png"), 2, 1, RED);
    write_png(&dir.join("a2.png"), 2, 1, BLUE);

    let mut p = pipeline(BatchOpts {
        write_sidecar: false,
        ..BatchOpts::default()
    });
    p.process_batch([dir.join("a1.png"), dir.join("a2.png")])
        .unwrap();

    assert_eq!(load(&dir.join("a1.png")).dimensions(), (2, 2));
    assert_eq!(dir_names(&dir), ["a1.png", "a2.png"]);
}

#[test]
fn parent_dirs_are_created_only_when_asked() {
    let dir = scratch_dir("batch_create_parents");
    write_png(&dir.join("a.png"), 1, 1, GREEN);
    let target = dir.join("nested").join("deeper").join("strip.png");

    let mut p = pipeline(BatchOpts {
        placement: OutputPlacement::Path(target.clone()),
        create_parent_dirs: true,
        ..BatchOpts::default()
    });
    let out = p.process_batch([dir.join("a.png")]).unwrap();

    assert_eq!(out.artifact.image_path, target);
    assert_eq!(load(&target).get_pixel(0, 0).0, GREEN);
    assert!(dir.join("nested/deeper/strip.png.mcmeta").exists());
}

#[test]
fn aborted_batch_does_not_create_parent_dirs() {
    let dir = scratch_dir("batch_no_parents_on_abort");
    std::fs::write(dir.join("x1.png"), b"nope").unwrap();
    let target = dir.join("nested").join("strip.png");

    let mut p = pipeline(BatchOpts {
        placement: OutputPlacement::Path(target),
        create_parent_dirs: true,
        ..BatchOpts::default()
    });
    let err = p.process_batch([dir.join("x1.png")]).unwrap_err();

    assert!(matches!(err, FramestackError::AllDecodeFailed { .. }));
    assert!(!dir.join("nested").exists());
}

#[test]
fn oversized_canvas_aborts_as_write_failure() {
    let dir = scratch_dir("batch_canvas_limit");
    write_png(&dir.join("a1.png"), 4, 4, RED);
    write_png(&dir.join("a2.png"), 4, 4, BLUE);
    let before = std::fs::read(dir.join("a1.png")).unwrap();

    let mut p = pipeline(BatchOpts {
        max_canvas_bytes: 64,
        ..BatchOpts::default()
    });
    let err = p
        .process_batch([dir.join("a1.png"), dir.join("a2.png")])
        .unwrap_err();

    assert!(matches!(err, FramestackError::Validation(_)));
    assert_eq!(p.stage(), BatchStage::WriteFailed);
    assert!(has_report(p.reporter(), Severity::Error, "too large"));
    assert_eq!(std::fs::read(dir.join("a1.png")).unwrap(), before);
}

#[test]
fn sidecar_failure_keeps_the_image() {
    let dir = scratch_dir("batch_sidecar_failed");
    write_png(&dir.join("a.png"), 2, 2, RED);
    write_png(&dir.join("b.png"), 2, 2, BLUE);
    // A directory squatting on the sidecar path makes the write fail.
    std::fs::create_dir(dir.join("a.png.mcmeta")).unwrap();

    let mut p = pipeline(BatchOpts::default());
    let out = p
        .process_batch([dir.join("a.png"), dir.join("b.png")])
        .unwrap();

    assert_eq!(p.stage(), BatchStage::Done);
    assert!(!out.sidecar_written);
    assert_eq!(load(&dir.join("a.png")).dimensions(), (2, 4));
    assert!(has_report(p.reporter(), Severity::Warning, "sidecar error"));
}

#[test]
fn explicit_output_and_disabled_sidecar() {
    let dir = scratch_dir("batch_explicit");
    write_png(&dir.join("f1.png"), 4, 1, RED);
    write_png(&dir.join("f2.png"), 2, 1, GREEN);
    let target = dir.join("strip.png");

    let mut p = pipeline(BatchOpts {
        placement: OutputPlacement::Path(target.clone()),
        sidecar_suffix: ".json".to_owned(),
        write_sidecar: false,
        ..BatchOpts::default()
    });
    let out = p
        .process_batch([dir.join("f2.png"), dir.join("f1.png")])
        .unwrap();

    assert!(!out.overwrote_input);
    assert!(!out.sidecar_written);
    assert!(!dir.join("strip.png.json").exists());

    let img = load(&target);
    assert_eq!(img.dimensions(), (4, 2));
    assert_eq!(img.get_pixel(3, 1).0, [0, 0, 0, 0]);
    assert_eq!(load(&dir.join("f1.png")).dimensions(), (4, 1));
}

#[test]
fn plan_orders_without_decoding() {
    let planned = plan_inputs(["tile10.png", "readme.md", "tile2.gif", "bg.png"]).unwrap();
    let names: Vec<(String, String)> = planned
        .iter()
        .map(|(f, k)| (f.file_name(), k.to_string()))
        .collect();
    assert_eq!(
        names,
        [
            ("bg.png".to_owned(), "0".to_owned()),
            ("tile2.gif".to_owned(), "2".to_owned()),
            ("tile10.png".to_owned(), "10".to_owned()),
        ]
    );
    assert!(matches!(
        plan_inputs(["a.txt"]),
        Err(FramestackError::SelectionEmpty)
    ));
}

#[test]
fn stages_are_ordered_and_terminal_states_are_last() {
    assert!(BatchStage::Idle < BatchStage::Filtering);
    assert!(BatchStage::Writing < BatchStage::Done);
    assert!(!BatchStage::Compositing.is_terminal());
    for s in [
        BatchStage::Done,
        BatchStage::SelectionEmpty,
        BatchStage::AllDecodeFailed,
        BatchStage::WriteFailed,
    ] {
        assert!(s.is_terminal());
    }
}
