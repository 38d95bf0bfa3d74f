use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "mockup", version)]
struct Cli {
    /// Log debug events to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Place an artwork onto a template and write the composite.
    Place(PlaceArgs),
    /// Print the marker regions found in a template as JSON.
    Detect(DetectArgs),
}

#[derive(Parser, Debug)]
struct PlaceArgs {
    /// Template manifest JSON.
    #[arg(long)]
    template: PathBuf,

    /// Artwork image.
    #[arg(long)]
    artwork: PathBuf,

    /// Output image path.
    #[arg(long)]
    out: PathBuf,

    /// Placement strategy; defaults to what the manifest declares.
    #[arg(long, value_enum)]
    strategy: Option<StrategyChoice>,

    /// Output encoding.
    #[arg(long, value_enum, default_value_t = FormatChoice::Png)]
    format: FormatChoice,

    /// Write placement diagnostics JSON here.
    #[arg(long)]
    diagnostics: Option<PathBuf>,

    /// Worker threads for row-parallel detection and warping.
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Parser, Debug)]
struct DetectArgs {
    /// Template manifest JSON.
    #[arg(long)]
    template: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyChoice {
    Auto,
    MarkerRegion,
    QuadTransform,
    LayerBounds,
}

impl From<StrategyChoice> for mockup::Strategy {
    fn from(c: StrategyChoice) -> Self {
        match c {
            StrategyChoice::Auto => Self::Auto,
            StrategyChoice::MarkerRegion => Self::MarkerRegion,
            StrategyChoice::QuadTransform => Self::QuadTransform,
            StrategyChoice::LayerBounds => Self::LayerBounds,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Png,
    Jpeg,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    match cli.cmd {
        Command::Place(args) => cmd_place(args),
        Command::Detect(args) => cmd_detect(args),
    }
}

fn read_raster(path: &Path) -> anyhow::Result<mockup::Raster> {
    let bytes = std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    mockup::Raster::decode(&bytes).with_context(|| format!("decode image '{}'", path.display()))
}

fn cmd_place(args: PlaceArgs) -> anyhow::Result<()> {
    let spec = mockup::TemplateSpec::load(&args.template)?;
    let template = spec
        .load_background()
        .with_context(|| format!("load template for '{}'", args.template.display()))?;
    let artwork = read_raster(&args.artwork)?;

    let parallel = args.threads.is_none_or(|n| n > 1);
    let mut options = mockup::PlacementOptions {
        strategy: args.strategy.map(Into::into),
        ..Default::default()
    };
    options.detector.parallel = parallel;
    options.warp.parallel = parallel;

    let pool = mockup::PlacementPool::new(args.threads)?;
    let result = pool.install(|| mockup::place_mockup(&artwork, &template, &spec, &options))?;
    for w in &result.warnings {
        tracing::warn!("{w}");
    }

    let format = match args.format {
        FormatChoice::Png => mockup::OutputFormat::Png,
        FormatChoice::Jpeg => mockup::OutputFormat::jpeg(),
    };
    let bytes = result.encode(format)?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, bytes)
        .with_context(|| format!("write {} '{}'", format.extension(), args.out.display()))?;

    if let Some(path) = &args.diagnostics {
        let f = std::fs::File::create(path)
            .with_context(|| format!("create diagnostics '{}'", path.display()))?;
        serde_json::to_writer_pretty(f, &result.diagnostics())
            .with_context(|| "write diagnostics JSON")?;
    }

    eprintln!("wrote {} ({})", args.out.display(), result.method);
    Ok(())
}

fn cmd_detect(args: DetectArgs) -> anyhow::Result<()> {
    let spec = mockup::TemplateSpec::load(&args.template)?;
    let template = spec.load_background()?;
    let detection = mockup::detect_regions(
        &template,
        &spec.marker_rule(),
        &mockup::DetectorConfig::default(),
    )?;

    let report = serde_json::json!({
        "totalMarkerPixels": detection.total_marker_pixels(),
        "regions": detection.regions,
        "largest": detection.largest().map(|s| s.region),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
