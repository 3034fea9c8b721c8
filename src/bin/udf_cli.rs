//! udf_cli - native driver for the blend and validation tools.
//!
//! Subcommands:
//! - `blend-boxes`: close the gap between two open boxes with transition faces
//! - `validate`: measure a tessellation dump against a reference box
//! - `sample`: histogram of distances from random points to a box
//! - `dump`: write the tessellation dump of a box or a blended pair

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use udf_engine::blend::{
    BlendInput, BlendOptions, CornerFade, SampleMode, SlopeMethod, build_and_stitch,
};
use udf_engine::compare::{
    Histogram, SearchOptions, SolidSnapshot, ValidateOptions, distance_to_solid, validate_dump,
};
use udf_engine::geom::Point3;
use udf_engine::kernel::memory::{BoxSide, MemoryKernel};
use udf_engine::kernel::{AttrValue, BodyId, Entity, GeometryKernel};
use udf_engine::parse::tess_dump;

#[derive(Parser, Debug)]
#[command(name = "udf_cli")]
#[command(about = "Cross-blend surfaces and distance validation against B-rep solids", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Blend the open top of one box into the open bottom of another
    #[command(name = "blend-boxes")]
    BlendBoxes(BlendArgs),
    /// Validate a tessellation dump against a reference box
    Validate(ValidateArgs),
    /// Histogram of distances from random points to a reference box
    Sample(SampleArgs),
    /// Write the tessellation dump of a box, or of a blended box pair
    Dump(DumpArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MethodArg {
    Raw,
    CornerFix,
    PlaneIntersection,
    Projection,
}

impl From<MethodArg> for SlopeMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Raw => Self::Raw,
            MethodArg::CornerFix => Self::CornerFix,
            MethodArg::PlaneIntersection => Self::PlaneIntersection,
            MethodArg::Projection => Self::Projection,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SampleArg {
    ArcLength,
    ParametricArc,
    ArcParametric,
    Parametric,
}

impl From<SampleArg> for SampleMode {
    fn from(arg: SampleArg) -> Self {
        match arg {
            SampleArg::ArcLength => Self::ArcLengthBoth,
            SampleArg::ParametricArc => Self::ParametricAArcB,
            SampleArg::ArcParametric => Self::ArcAParametricB,
            SampleArg::Parametric => Self::ParametricBoth,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FadeArg {
    Linear,
    Cosine,
}

impl From<FadeArg> for CornerFade {
    fn from(arg: FadeArg) -> Self {
        match arg {
            FadeArg::Linear => Self::Linear,
            FadeArg::Cosine => Self::Cosine,
        }
    }
}

#[derive(Parser, Debug)]
struct BlendArgs {
    /// Distance between the two boxes
    #[arg(long, default_value = "1.0")]
    gap: f64,

    /// Horizontal offset of the upper box
    #[arg(long, default_value = "0.0")]
    shift: f64,

    #[arg(long, value_enum, default_value = "corner-fix")]
    method: MethodArg,

    #[arg(long, value_enum, default_value = "parametric")]
    sample_mode: SampleArg,

    #[arg(long, value_enum, default_value = "linear")]
    fade: FadeArg,

    /// Samples per edge, corners included
    #[arg(long, default_value = "9")]
    npnt: usize,

    /// Slope multipliers for side A and side B
    #[arg(long, num_args = 2, default_values_t = vec![1.0, 1.0])]
    slopes: Vec<f64>,

    /// Keep loop B as extracted instead of aligning it to loop A
    #[arg(long)]
    no_reorder: bool,

    /// Write the blend report as XML
    #[arg(long)]
    xml: Option<PathBuf>,

    /// Overwrite existing output files
    #[arg(long)]
    overwrite: bool,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Tessellation dump to measure
    dump: PathBuf,

    /// Minimum corner of the reference box
    #[arg(long, num_args = 3, default_values_t = vec![0.0, 0.0, 0.0])]
    min: Vec<f64>,

    /// Maximum corner of the reference box
    #[arg(long, num_args = 3, default_values_t = vec![1.0, 1.0, 1.0])]
    max: Vec<f64>,

    /// Histogram thresholds, ascending
    #[arg(long, num_args = 1..)]
    thresholds: Option<Vec<f64>>,

    /// Skip the untrimmed-surface refinement
    #[arg(long)]
    no_refine: bool,

    /// Write the validation report as XML
    #[arg(long)]
    xml: Option<PathBuf>,

    #[arg(long)]
    overwrite: bool,
}

#[derive(Parser, Debug)]
struct SampleArgs {
    /// Number of random points
    #[arg(long, default_value = "1000")]
    count: usize,

    #[arg(long, default_value = "7")]
    seed: u64,

    /// Half-width of the sampling cube around the unit box centre
    #[arg(long, default_value = "1.0")]
    spread: f64,
}

#[derive(Parser, Debug)]
struct DumpArgs {
    /// Output dump file
    #[arg(short, long)]
    output: PathBuf,

    /// Subdivisions per edge and face direction
    #[arg(long, default_value = "4")]
    n: usize,

    /// Dump the blended box pair instead of a single unit box
    #[arg(long)]
    blended: bool,

    #[arg(long)]
    overwrite: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename = "blend")]
struct BlendReport {
    method: String,
    sample_mode: String,
    npnt: usize,
    body: u32,
    transition_faces: usize,
    shift: Option<usize>,
    reversed: Option<bool>,
    twist_cost: Option<f64>,
    #[serde(rename = "warning")]
    warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename = "validation")]
struct ValidationReport {
    dump: String,
    count: u64,
    max: f64,
    mean: f64,
    rms: f64,
    refined: u64,
    #[serde(rename = "threshold")]
    thresholds: Vec<f64>,
    #[serde(rename = "bucket")]
    counts: Vec<u64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::BlendBoxes(args) => run_blend(&args),
        Commands::Validate(args) => run_validate(&args),
        Commands::Sample(args) => run_sample(&args),
        Commands::Dump(args) => run_dump(&args),
    }
}

fn point(values: &[f64]) -> Result<Point3> {
    match values {
        [x, y, z] => Ok(Point3::new(*x, *y, *z)),
        _ => bail!("expected three coordinates, got {}", values.len()),
    }
}

fn ensure_writable(path: &Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        bail!("{} already exists (use --overwrite)", path.display());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

fn write_xml<T: Serialize>(path: &Path, report: &T, overwrite: bool) -> Result<()> {
    ensure_writable(path, overwrite)?;
    let xml = quick_xml::se::to_string(report).context("failed to serialise report")?;
    fs::write(path, xml).with_context(|| format!("failed to write {}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}

fn blend_options(args: &BlendArgs) -> Result<BlendOptions> {
    let [slope_a, slope_b] = args.slopes[..] else {
        bail!("--slopes takes two values");
    };
    Ok(BlendOptions::default()
        .with_method(args.method.into())
        .with_sample_mode(args.sample_mode.into())
        .with_fade(args.fade.into())
        .with_npnt(args.npnt)
        .with_slopes(slope_a, slope_b)
        .with_reorder(!args.no_reorder))
}

/// Builds a unit box with its top removed and a second one `gap` above it
/// with its bottom removed, both tagged with `marker`.
fn open_box_pair(
    kernel: &mut MemoryKernel,
    gap: f64,
    shift: f64,
    marker: &str,
) -> Result<(BodyId, BodyId)> {
    let lower = kernel.make_box(Point3::ORIGIN, Point3::new(1.0, 1.0, 1.0))?;
    let base = 1.0 + gap;
    let upper = kernel.make_box(
        Point3::new(shift, 0.0, base),
        Point3::new(1.0 + shift, 1.0, base + 1.0),
    )?;
    let tag = AttrValue::Int(vec![1]);
    kernel.set_attribute(Entity::Face(lower.face(BoxSide::ZMax)), marker, tag.clone())?;
    kernel.set_attribute(Entity::Face(upper.face(BoxSide::ZMin)), marker, tag)?;
    Ok((lower.body, upper.body))
}

fn run_blend(args: &BlendArgs) -> Result<()> {
    if args.gap.is_nan() || args.gap <= 0.0 {
        bail!("--gap must be positive");
    }
    let options = blend_options(args)?;
    let mut kernel = MemoryKernel::new();
    let (lower, upper) = open_box_pair(&mut kernel, args.gap, args.shift, &options.removal_marker)?;

    let outcome = build_and_stitch(&mut kernel, BlendInput::Dual(lower, upper), &options)
        .context("blend failed")?;

    println!(
        "blended body {} with {} transition face(s)",
        outcome.body,
        outcome.transition_faces.len()
    );
    if let Some(alignment) = outcome.alignment {
        println!(
            "alignment: shift {} reversed {} cost {:.6}",
            alignment.shift, alignment.reversed, alignment.cost
        );
    }
    for warning in &outcome.warnings {
        println!("warning: {warning}");
    }

    if let Some(path) = &args.xml {
        let report = BlendReport {
            method: format!("{:?}", options.method),
            sample_mode: format!("{:?}", options.sample_mode),
            npnt: options.npnt,
            body: outcome.body.0,
            transition_faces: outcome.transition_faces.len(),
            shift: outcome.alignment.map(|a| a.shift),
            reversed: outcome.alignment.map(|a| a.reversed),
            twist_cost: outcome.alignment.map(|a| a.cost),
            warnings: outcome.warnings,
        };
        write_xml(path, &report, args.overwrite)?;
    }
    Ok(())
}

fn run_validate(args: &ValidateArgs) -> Result<()> {
    let dump = tess_dump::read_file(&args.dump)
        .with_context(|| format!("failed to load {}", args.dump.display()))?;

    let mut kernel = MemoryKernel::new();
    let reference = kernel.make_box(point(&args.min)?, point(&args.max)?)?;
    let snapshot = SolidSnapshot::capture(&kernel, reference.body)?;

    let mut options =
        ValidateOptions::default().with_search(SearchOptions::default().with_refine(!args.no_refine));
    if let Some(thresholds) = &args.thresholds {
        options = options.with_thresholds(thresholds.clone());
    }

    let report = validate_dump(&kernel, &snapshot, &dump, &options).context("validation failed")?;

    println!("{} point(s) measured", report.count);
    println!(
        "max {:e}  mean {:e}  rms {:e}  refined {}",
        report.max, report.mean, report.rms, report.refined
    );
    print!("{}", report.histogram);

    if let Some(path) = &args.xml {
        let xml_report = ValidationReport {
            dump: args.dump.display().to_string(),
            count: report.count,
            max: report.max,
            mean: report.mean,
            rms: report.rms,
            refined: report.refined,
            thresholds: report.histogram.thresholds().to_vec(),
            counts: report.histogram.counts().to_vec(),
        };
        write_xml(path, &xml_report, args.overwrite)?;
    }
    Ok(())
}

fn run_sample(args: &SampleArgs) -> Result<()> {
    if args.count == 0 {
        bail!("--count must be at least 1");
    }
    let mut kernel = MemoryKernel::new();
    let reference = kernel.make_box(Point3::ORIGIN, Point3::new(1.0, 1.0, 1.0))?;
    let snapshot = SolidSnapshot::capture(&kernel, reference.body)?;
    let search = SearchOptions::default();

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut histogram = Histogram::new(vec![1e-3, 1e-2, 1e-1, 0.5, 1.0])?;
    let spread = args.spread.abs();
    for _ in 0..args.count {
        let mut coordinate = || 0.5 + rng.random_range(-spread..=spread);
        let query = Point3::new(coordinate(), coordinate(), coordinate());
        let result = distance_to_solid(&kernel, &snapshot, query, &search)?;
        histogram.add(result.distance);
    }

    println!("{} random point(s), seed {}", args.count, args.seed);
    print!("{histogram}");
    Ok(())
}

fn run_dump(args: &DumpArgs) -> Result<()> {
    let mut kernel = MemoryKernel::new();
    let body = if args.blended {
        let options = BlendOptions::default();
        let (lower, upper) = open_box_pair(&mut kernel, 1.0, 0.0, &options.removal_marker)?;
        build_and_stitch(&mut kernel, BlendInput::Dual(lower, upper), &options)
            .context("blend failed")?
            .body
    } else {
        kernel
            .make_box(Point3::ORIGIN, Point3::new(1.0, 1.0, 1.0))?
            .body
    };

    let dump = kernel.tessellate_body(body, args.n)?;
    ensure_writable(&args.output, args.overwrite)?;
    fs::write(&args.output, tess_dump::write_string(&dump))
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!(
        "wrote {} ({} nodes, {} edges, {} faces)",
        args.output.display(),
        dump.nodes.len(),
        dump.edges.len(),
        dump.faces.len()
    );
    Ok(())
}
