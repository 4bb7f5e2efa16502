use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use framestack::ImageCodec as _;
use sha2::Digest as _;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "framestack", version)]
struct Cli {
    /// Log more (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stack PNG/GIF frames into one PNG strip and write a .mcmeta sidecar.
    Combine(CombineArgs),
    /// Show which files a batch would use, in stacking order.
    Plan(PlanArgs),
}

#[derive(Parser, Debug)]
struct CombineArgs {
    /// Image files, or directories whose entries are all submitted.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Output PNG path. Defaults to overwriting the first file in stacking order.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Suffix appended to the output path for the sidecar.
    #[arg(long, default_value = framestack::DEFAULT_SIDECAR_SUFFIX)]
    sidecar_suffix: String,

    /// Do not write the sidecar.
    #[arg(long)]
    no_sidecar: bool,

    /// Print the batch outcome as JSON on stdout.
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Image files, or directories whose entries are all considered.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Also count the frames in each file (decodes GIFs).
    #[arg(long)]
    frames: bool,

    /// Print the plan as JSON on stdout.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Combine(args) => cmd_combine(args),
        Command::Plan(args) => cmd_plan(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Replace each directory with its entries, sorted by file name.
fn expand_paths(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut out = Vec::with_capacity(paths.len());
    for p in paths {
        if !p.is_dir() {
            out.push(p.clone());
            continue;
        }
        let mut entries = std::fs::read_dir(p)
            .with_context(|| format!("list directory '{}'", p.display()))?
            .map(|e| e.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("read directory entry in '{}'", p.display()))?;
        entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        out.extend(entries);
    }
    Ok(out)
}

fn cmd_combine(args: CombineArgs) -> anyhow::Result<()> {
    let paths = expand_paths(&args.paths)?;

    // The pipeline creates missing `--out` directories when it reaches the write step.
    let create_parent_dirs = args.out.is_some();
    let placement = match args.out {
        Some(out) => framestack::OutputPlacement::Path(out),
        None => framestack::OutputPlacement::OverwriteFirstInput,
    };
    let opts = framestack::BatchOpts {
        placement,
        sidecar_suffix: args.sidecar_suffix,
        write_sidecar: !args.no_sidecar,
        create_parent_dirs,
        ..framestack::BatchOpts::default()
    };

    let mut pipeline = framestack::Pipeline::new(opts);
    let outcome = pipeline.process_batch(paths)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    let image_path = &outcome.artifact.image_path;
    let bytes = std::fs::read(image_path)
        .with_context(|| format!("read back '{}'", image_path.display()))?;
    eprintln!(
        "wrote {} ({}x{}, {} frames from {} files)",
        image_path.display(),
        outcome.width,
        outcome.height,
        outcome.frame_count,
        outcome.files.len()
    );
    eprintln!("    sha256: {}", sha256_hex(&bytes));
    if outcome.sidecar_written {
        eprintln!("wrote {}", outcome.artifact.sidecar_path.display());
    }
    for s in &outcome.skipped {
        eprintln!("skipped {}: {}", s.path.display(), s.reason);
    }
    Ok(())
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let paths = expand_paths(&args.paths)?;
    let planned = framestack::plan_inputs(paths)?;

    let mut rows = Vec::with_capacity(planned.len());
    for (file, key) in &planned {
        let frames = if args.frames {
            count_frames(file.path(), file.kind())
        } else {
            None
        };
        rows.push(serde_json::json!({
            "path": file.path(),
            "kind": file.kind(),
            "key": key.to_string(),
            "frames": frames,
        }));
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for (idx, (file, key)) in planned.iter().enumerate() {
        print!(
            "{idx:>3}  key={:<6} {}",
            key.as_decimal(),
            file.path().display()
        );
        if let Some(n) = rows[idx]["frames"].as_u64() {
            print!("  ({n} frames)");
        } else if args.frames {
            print!("  (unreadable)");
        }
        println!();
    }
    Ok(())
}

fn count_frames(path: &Path, kind: framestack::ImageKind) -> Option<usize> {
    let counted = match kind {
        framestack::ImageKind::Png => framestack::DefaultCodec.decode_still(path).map(|_| 1),
        framestack::ImageKind::Gif => framestack::DefaultCodec.frame_count(path),
    };
    match counted {
        Ok(n) => Some(n),
        Err(err) => {
            tracing::warn!("{err}");
            None
        }
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
