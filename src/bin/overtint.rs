use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use overtint::{MaskPayload, PixelBuffer, Rgba, Style};

#[derive(Parser, Debug)]
#[command(name = "overtint", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a mask payload and write it as a black/white PNG.
    Decode(DecodeArgs),
    /// Composite a segment preview over a base image and write a PNG.
    Preview(PreviewArgs),
    /// Bake a color into a base image and write the committed PNG.
    Commit(CommitArgs),
}

#[derive(Parser, Debug)]
struct DecodeArgs {
    /// Mask payload JSON: {"mask": "<base64>", "shape": [height, width]}.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    /// Base image (PNG, JPEG, ...).
    #[arg(long)]
    base: PathBuf,

    /// Mask payload JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Style JSON; omitted means the stock preview look.
    #[arg(long)]
    style: Option<PathBuf>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct CommitArgs {
    /// Base image (PNG, JPEG, ...).
    #[arg(long)]
    base: PathBuf,

    /// Mask payload JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Paint color, e.g. "rgba(255, 0, 0, 0.7)" or "#ff0000".
    #[arg(long)]
    color: String,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Decode(args) => cmd_decode(args),
        Command::Preview(args) => cmd_preview(args),
        Command::Commit(args) => cmd_commit(args),
    }
}

fn read_payload_json(path: &Path) -> anyhow::Result<MaskPayload> {
    let f = File::open(path).with_context(|| format!("open payload '{}'", path.display()))?;
    let r = BufReader::new(f);
    let payload: MaskPayload = serde_json::from_reader(r).context("parse payload JSON")?;
    Ok(payload)
}

fn read_base_image(path: &Path) -> anyhow::Result<PixelBuffer> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read base image '{}'", path.display()))?;
    Ok(PixelBuffer::decode(&bytes)?)
}

fn write_png(out: &Path, buf: &PixelBuffer) -> anyhow::Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        out,
        buf.data(),
        buf.width(),
        buf.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", out.display()))?;

    eprintln!("wrote {}", out.display());
    Ok(())
}

fn cmd_decode(args: DecodeArgs) -> anyhow::Result<()> {
    let mask = read_payload_json(&args.in_path)?.decode()?;

    let mut buf = PixelBuffer::filled(mask.width(), mask.height(), Rgba::opaque(0, 0, 0));
    for y in 0..mask.height() {
        for x in 0..mask.width() {
            if mask.get(x, y) {
                buf.blend_pixel(x, y, Rgba::opaque(255, 255, 255), 1.0);
            }
        }
    }

    write_png(&args.out, &buf)
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let base = read_base_image(&args.base)?;
    let mask = read_payload_json(&args.in_path)?.decode()?;

    let style = match &args.style {
        Some(path) => {
            let f = File::open(path).with_context(|| format!("open style '{}'", path.display()))?;
            serde_json::from_reader(BufReader::new(f)).context("parse style JSON")?
        }
        None => Style::preview(),
    };

    let out = overtint::compose(&base, &mask, &style)?;
    write_png(&args.out, &out)
}

fn cmd_commit(args: CommitArgs) -> anyhow::Result<()> {
    let base = read_base_image(&args.base)?;
    let mask = read_payload_json(&args.in_path)?.decode()?;
    let color = Rgba::parse(&args.color)?;

    let out = overtint::commit(&base, &mask, &Style::fill(color))?;
    write_png(&args.out, &out)
}
