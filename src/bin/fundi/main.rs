//! Fundi CLI - fold and fundus extraction from surface meshes.
//!
//! Usage: fundi <COMMAND> [OPTIONS] <INPUT> [OUTPUT]
//!
//! Run `fundi --help` for available commands. Set `RUST_LOG=debug` for
//! per-fold detail.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use clap::{Parser, Subcommand};

use fundi::algo::folds::extract_folds;
use fundi::algo::fundi::{extract_fundi_with_progress, FundusOptions};
use fundi::algo::Progress;
use fundi::config;
use fundi::io::{self, scalars, Surface};
use fundi::mesh::NeighborList;

#[derive(Parser)]
#[command(name = "fundi")]
#[command(author, version, about = "Sulcal fold and fundus extraction", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct FieldArgs {
    /// Name of the depth vertex property
    #[arg(long, default_value = "depth")]
    depth_field: String,

    /// Name of the curvature vertex property
    #[arg(long, default_value = "curvature")]
    curvature_field: String,

    /// Plain-text depth file (overrides the vertex property)
    #[arg(long)]
    depth: Option<PathBuf>,

    /// Plain-text curvature file (overrides the vertex property)
    #[arg(long)]
    curvature: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Display surface information
    Info {
        /// Input surface file
        input: PathBuf,
    },

    /// Segment a surface into folds
    Folds {
        /// Input surface file
        input: PathBuf,

        /// Output surface file with a `fold` vertex property
        output: PathBuf,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Extract fundus curves
    Extract {
        /// Input surface file
        input: PathBuf,

        /// Output surface file with fold, likelihood and fundus properties
        output: PathBuf,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        fields: FieldArgs,

        /// Write a per-fold JSON report
        #[arg(long)]
        report: Option<PathBuf>,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info { input } => {
            cmd_info(&input)?;
        }

        Commands::Folds {
            input,
            output,
            config,
            fields,
        } => {
            cmd_folds(&input, &output, config.as_deref(), &fields)?;
        }

        Commands::Extract {
            input,
            output,
            config,
            fields,
            report,
            sequential,
        } => {
            cmd_extract(
                &input,
                &output,
                config.as_deref(),
                &fields,
                report.as_deref(),
                sequential,
            )?;
        }
    }

    Ok(())
}

fn load_options(path: Option<&Path>) -> Result<FundusOptions, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => config::load_config(path)?,
        None => FundusOptions::default(),
    })
}

/// Resolve a field from a plain-text override or a vertex property.
fn resolve_field(
    surface: &Surface,
    file: Option<&Path>,
    name: &str,
) -> Result<Vec<f64>, Box<dyn std::error::Error>> {
    let values = match file {
        Some(path) => scalars::load(path)?,
        None => surface.field(name)?.to_vec(),
    };
    let n = surface.mesh.num_vertices();
    if values.len() != n {
        return Err(fundi::error::FundiError::field_length(name, n, values.len()).into());
    }
    Ok(values)
}

fn create_progress() -> Progress {
    let last = AtomicUsize::new(0);

    Progress::new(move |done, total, message| {
        if total == 0 {
            return;
        }
        // Folds finish out of order; only ever move forward
        let previous = last.fetch_max(done, Ordering::Relaxed);
        if done <= previous {
            return;
        }

        let bar_width = 30;
        let filled = (done * bar_width) / total;
        let bar: String = "=".repeat(filled);
        let space: String = " ".repeat(bar_width - filled);

        eprint!("\r[{}{}] {}/{} {}", bar, space, done, total, message);
        let _ = std::io::stderr().flush();

        if done >= total {
            eprintln!();
        }
    })
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let surface = io::load_surface(input)?;
    let mesh = &surface.mesh;
    let neighbors = NeighborList::build(mesh);

    println!("File: {}", input.display());
    println!("Vertices: {}", mesh.num_vertices());
    println!("Faces: {}", mesh.num_faces());
    println!("Edges: {}", neighbors.num_edges());

    let degrees: Vec<usize> = (0..neighbors.len()).map(|v| neighbors.degree(v)).collect();
    let min_degree = degrees.iter().copied().min().unwrap_or(0);
    let avg_degree = degrees.iter().sum::<usize>() as f64 / degrees.len().max(1) as f64;
    println!(
        "Neighbors per vertex: min={}, max={}, avg={:.2}",
        min_degree,
        neighbors.max_degree(),
        avg_degree
    );
    let isolated = degrees.iter().filter(|&&d| d == 0).count();
    if isolated > 0 {
        println!("Isolated vertices: {}", isolated);
    }

    if let Some((min, max)) = mesh.bounding_box() {
        let diag = max - min;
        println!(
            "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
        println!("Dimensions: {:.3} x {:.3} x {:.3}", diag.x, diag.y, diag.z);
    }
    println!("Average edge length: {:.6}", mesh.average_edge_length());

    if surface.fields.is_empty() {
        println!("Fields: none");
    } else {
        println!("Fields:");
        for (name, values) in &surface.fields {
            let (lo, hi) = values
                .iter()
                .copied()
                .filter(|v| v.is_finite())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
            println!("  {}: min={:.4}, max={:.4}", name, lo, hi);
        }
    }

    Ok(())
}

fn cmd_folds(
    input: &Path,
    output: &Path,
    config: Option<&Path>,
    fields: &FieldArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = load_options(config)?;
    let surface = io::load_surface(input)?;
    println!(
        "Loaded: {} vertices, {} faces",
        surface.mesh.num_vertices(),
        surface.mesh.num_faces()
    );
    let depth = resolve_field(&surface, fields.depth.as_deref(), &fields.depth_field)?;

    let start = Instant::now();
    let neighbors = NeighborList::build(&surface.mesh);
    let folds = extract_folds(&surface.mesh, &neighbors, &depth, &options.folds)?;
    let elapsed = start.elapsed();

    println!(
        "Folds: {} (depth threshold {:.4}, {} holes filled)",
        folds.len(),
        folds.depth_threshold(),
        folds.holes_filled()
    );
    for fold in folds.folds() {
        println!("  fold {}: {} vertices", fold.label, fold.len());
    }

    let labels: Vec<f64> = folds.labels().iter().map(|&l| l as f64).collect();
    io::save_surface(output, &surface.mesh, &[("depth", &depth), ("fold", &labels)])?;
    println!("Saved: {} ({:.2?})", output.display(), elapsed);

    Ok(())
}

fn cmd_extract(
    input: &Path,
    output: &Path,
    config: Option<&Path>,
    fields: &FieldArgs,
    report: Option<&Path>,
    sequential: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = load_options(config)?;
    if sequential {
        options.parallel = false;
    }

    let surface = io::load_surface(input)?;
    println!(
        "Loaded: {} vertices, {} faces",
        surface.mesh.num_vertices(),
        surface.mesh.num_faces()
    );
    let depth = resolve_field(&surface, fields.depth.as_deref(), &fields.depth_field)?;
    let curvature = resolve_field(&surface, fields.curvature.as_deref(), &fields.curvature_field)?;

    let mode = if options.parallel { "parallel" } else { "sequential" };
    println!("Extracting fundi ({})...", mode);

    let start = Instant::now();
    let neighbors = NeighborList::build(&surface.mesh);
    let progress = create_progress();
    let extraction = extract_fundi_with_progress(
        &surface.mesh,
        &neighbors,
        &depth,
        &curvature,
        &options,
        &progress,
    )?;
    let elapsed = start.elapsed();

    for result in extraction.results() {
        println!(
            "  fold {}: {} vertices, {} anchors, {} curve vertices ({:?})",
            result.fold.label,
            result.fold.len(),
            result.anchors.len(),
            result.curve.len(),
            result.status
        );
    }
    println!(
        "Result: {} fundi from {} folds",
        extraction.num_fundi(),
        extraction.num_folds()
    );

    let folds: Vec<f64> = extraction.fold_labels().iter().map(|&l| l as f64).collect();
    let fundi: Vec<f64> = extraction.fundus_labels().iter().map(|&l| l as f64).collect();
    let likelihood = extraction.likelihood_field();
    let hmmf = extraction.hmmf_field();
    io::save_surface(
        output,
        &surface.mesh,
        &[
            ("fold", &folds),
            ("likelihood", &likelihood),
            ("hmmf", &hmmf),
            ("fundus", &fundi),
        ],
    )?;
    println!("Saved: {} ({:.2?})", output.display(), elapsed);

    if let Some(path) = report {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &extraction.report())?;
        writer.flush()?;
        println!("Report: {}", path.display());
    }

    Ok(())
}
