use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "uniframes", version)]
struct Cli {
    /// JSON settings file; `UNIFRAMES_*` environment overrides apply otherwise.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crop a photo and write the committed JPEG.
    Crop(CropArgs),
    /// Crop, composite with a frame and export the profile photo PNG.
    Compose(ComposeArgs),
}

#[derive(Parser, Debug)]
struct CropArgs {
    /// Source photo.
    #[arg(long)]
    photo: PathBuf,

    /// Crop rectangle as `x,y,width,height` in source pixels.
    #[arg(long)]
    rect: uniframes::CropRect,

    /// Output JPEG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Source photo.
    #[arg(long)]
    photo: PathBuf,

    /// Crop rectangle as `x,y,width,height`; defaults to the largest centered square.
    #[arg(long)]
    rect: Option<uniframes::CropRect>,

    /// Frame overlay: https/http URL, file path, or data URL.
    #[arg(long)]
    frame: String,

    /// University name, used to derive the output file name.
    #[arg(long)]
    university: String,

    /// Device pixel ratio of the target display.
    #[arg(long)]
    dpr: Option<f64>,

    /// Directory the PNG is written to.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = match &cli.settings {
        Some(path) => uniframes::PipelineSettings::from_json_file(path)?,
        None => uniframes::PipelineSettings::from_env(),
    };
    settings.validate()?;

    match cli.cmd {
        Command::Crop(args) => cmd_crop(args, &settings).await,
        Command::Compose(args) => cmd_compose(args, &settings).await,
    }
}

fn read_source(
    path: &Path,
    settings: &uniframes::PipelineSettings,
) -> anyhow::Result<uniframes::SourceImage> {
    let bytes = std::fs::read(path).with_context(|| format!("read photo '{}'", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(uniframes::SourceImage::new(name, bytes, settings.max_source_bytes)?)
}

async fn commit_crop(
    source: uniframes::SourceImage,
    rect: Option<uniframes::CropRect>,
    settings: &uniframes::PipelineSettings,
) -> anyhow::Result<uniframes::CroppedImage> {
    let rect = match rect {
        Some(r) => r,
        None => {
            let (w, h) = image::ImageReader::new(std::io::Cursor::new(source.bytes().as_slice()))
                .with_guessed_format()
                .context("sniff photo format")?
                .into_dimensions()
                .context("read photo dimensions")?;
            uniframes::CropRect::centered_square(w, h)
        }
    };

    let mut session = uniframes::CropSession::new(source, settings);
    session
        .commit_now(rect)
        .await?
        .context("fresh crop session produced no commit (bug)")
}

async fn cmd_crop(args: CropArgs, settings: &uniframes::PipelineSettings) -> anyhow::Result<()> {
    let source = read_source(&args.photo, settings)?;
    let cropped = commit_crop(source, Some(args.rect), settings).await?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, cropped.image.bytes.as_slice())
        .with_context(|| format!("write jpeg '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({}x{})",
        args.out.display(),
        cropped.image.width,
        cropped.image.height
    );
    Ok(())
}

async fn cmd_compose(
    args: ComposeArgs,
    settings: &uniframes::PipelineSettings,
) -> anyhow::Result<()> {
    let source = read_source(&args.photo, settings)?;

    let mut state = uniframes::PipelineState::new();
    state.upload(source.clone());
    state.commit_crop(commit_crop(source, args.rect, settings).await?)?;
    state.select_university(uniframes::University {
        id: args.university.clone(),
        name: args.university.clone(),
    });
    state.select_frame(uniframes::FrameAsset::from_url(&args.frame));

    let compositor = uniframes::Compositor::new(settings)?;
    let dpr = uniframes::DevicePixelRatio::new(args.dpr);
    compositor.regenerate(&mut state, dpr).await?;

    let link = uniframes::DownloadLink::prepare(state.composite(), &args.university)?;
    let path = link.save_in(&args.out_dir)?;

    eprintln!("wrote {}", path.display());
    Ok(())
}
