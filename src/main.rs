// src/main.rs
//
// Command-line front end.
//
// Examples:
//
//   omf-views run job.toml -o views
//       -> reads every OMF file listed in job.toml, writes one JSON holomap
//          per requested view (inplane.json, angle.json, ...), optional PNGs,
//          and, if an ODT file is configured, odt_table.json + curves.json.
//
//   omf-views validate job.toml
//       -> checks the job file, the slice axis and that all inputs exist.
//
//   omf-views density run/sim-Oxs_MinDriver-Magnetization-00-0000120.omf --coord 1e-9
//       -> prints the slice shape and its total topological charge.
//
//   omf-views seed skyrmion.omf --kind skyrmion --nx 64 --ny 64
//       -> writes a synthetic OVF 2.0 binary snapshot.
//
// Typical outputs of `run` (per output directory):
//   views/
//     ├── config.json
//     ├── inplane.json / angle.json / outofplane.json / density.json
//     ├── odt_table.json, curves.json      (if input.odt is set)
//     └── png/*.png                        (if output.png = true)
//
// Set RUST_LOG=debug for per-file progress.

use std::fs::{create_dir_all, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use serde::Serialize;

use omf_views::config::{load_config, JobConfig};
use omf_views::field::{Field3D, Mesh, SliceAxis};
use omf_views::initial_states;
use omf_views::maps::create_field_holomap;
use omf_views::odt_views::OdtViews;
use omf_views::ovf::{read_ovf, write_ovf2_binary4, OvfMeta};
use omf_views::topology::{compute_density_with, topological_charge, BoundaryPolicy};
use omf_views::views::{Curve, FieldView, FieldViewKind};
use omf_views::visualisation::{save_curve_plot, save_image_plot, save_vector_plot};

#[derive(Parser, Debug)]
#[command(name = "omf-views", version, about = "Turn OMF/ODT simulation output into plot-ready views")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build every configured view and write it to the output directory.
    Run {
        job: PathBuf,
        /// Overrides output.directory from the job file.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Check a job file without producing output.
    Validate { job: PathBuf },
    /// Print the total topological charge of one slice.
    Density {
        omf: PathBuf,
        #[arg(long, default_value = "z")]
        axis: String,
        /// Slice position in metres; defaults to the middle of the mesh.
        #[arg(long)]
        coord: Option<f64>,
        #[arg(long, default_value = "zero")]
        boundary: String,
    },
    /// Write a synthetic magnetisation snapshot.
    Seed {
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = SeedKind::Skyrmion)]
        kind: SeedKind,
        #[arg(long, default_value_t = 64)]
        nx: usize,
        #[arg(long, default_value_t = 64)]
        ny: usize,
        #[arg(long, default_value_t = 1)]
        nz: usize,
        /// Cubic cell edge in metres.
        #[arg(long, default_value_t = 1e-9)]
        cell: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SeedKind {
    Uniform,
    Skyrmion,
    Vortex,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Run { job, out } => run(&job, out),
        Command::Validate { job } => validate(&job),
        Command::Density {
            omf,
            axis,
            coord,
            boundary,
        } => density(&omf, &axis, coord, &boundary),
        Command::Seed {
            out,
            kind,
            nx,
            ny,
            nz,
            cell,
        } => seed(&out, kind, [nx, ny, nz], cell),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    Ok(())
}

/// Middle of the mesh along `axis`.
fn mid_coord(field: &Field3D, axis: SliceAxis) -> f64 {
    let (_, _, a) = axis.components();
    0.5 * (field.mesh.p1[a] + field.mesh.p2[a])
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

fn slice_coords(cfg: &JobConfig, axis: SliceAxis) -> Result<Vec<f64>> {
    if !cfg.slice.coordinates.is_empty() {
        return Ok(cfg.slice.coordinates.clone());
    }
    let first = &cfg.input.omf[0];
    let field = read_ovf(first).with_context(|| format!("reading {}", first.display()))?;
    let c = mid_coord(&field, axis);
    info!("no slice coordinates given, using mesh centre {:e}", c);
    Ok(vec![c])
}

fn run(job: &Path, out: Option<PathBuf>) -> Result<()> {
    let cfg = load_config(job).with_context(|| format!("loading {}", job.display()))?;
    let axis = cfg.axis()?;
    let out_dir = out.unwrap_or_else(|| cfg.output.directory.clone());
    create_dir_all(&out_dir)?;
    let png_dir = out_dir.join("png");
    if cfg.output.png {
        create_dir_all(&png_dir)?;
    }

    let coords = slice_coords(&cfg, axis)?;
    println!(
        "{} files, slicing along {} at {:?}",
        cfg.input.omf.len(),
        axis,
        coords
    );

    for &kind in &cfg.output.views {
        let map = create_field_holomap(&cfg.input.omf, &coords, axis, kind, cfg.output.boundary)?;
        let path = out_dir.join(format!("{}.json", kind.as_str()));
        write_json(&path, &map)?;
        println!("wrote {} ({} entries)", path.display(), map.len());

        for (n, (key, view)) in map.iter().enumerate() {
            if kind == FieldViewKind::Density {
                if let FieldView::Image(img) = view {
                    println!(
                        "  file {} {}={:e}: Q = {:.4}",
                        key[0],
                        axis,
                        key[1].as_f64().unwrap_or(f64::NAN),
                        topological_charge(&img.data)
                    );
                }
            }
            if !cfg.output.png {
                continue;
            }
            let png = png_dir.join(format!("{}_{}_{:03}.png", kind.as_str(), sanitize(&key[0].to_string()), n));
            let rendered = match view {
                FieldView::VectorField(v) => save_vector_plot(v, &png),
                FieldView::Image(img) => save_image_plot(img, &png),
            };
            if let Err(e) = rendered {
                warn!("skipping {}: {}", png.display(), e);
            }
        }
    }

    if let Some(odt) = &cfg.input.odt {
        let views = OdtViews::new(odt, &cfg.input.omf)?;
        write_json(&out_dir.join("odt_table.json"), &views.table())?;
        println!("wrote odt_table.json ({} rows)", views.rows.len());

        let curves: Vec<Curve> = cfg
            .curves
            .iter()
            .map(|c| views.get_curve(&c.x, &c.y))
            .collect::<omf_views::error::Result<_>>()?;
        if !curves.is_empty() {
            write_json(&out_dir.join("curves.json"), &curves)?;
            println!("wrote curves.json ({} curves)", curves.len());
        }
        if cfg.output.png {
            for c in &curves {
                let png = png_dir.join(format!("curve_{}_{}.png", sanitize(&c.kdim), sanitize(&c.vdim)));
                if let Err(e) = save_curve_plot(c, &png) {
                    warn!("skipping {}: {}", png.display(), e);
                }
            }
        }
    }

    cfg.write_to_dir(&out_dir)?;
    println!("done: {}", out_dir.display());
    Ok(())
}

fn validate(job: &Path) -> Result<()> {
    let cfg = load_config(job).with_context(|| format!("loading {}", job.display()))?;
    let axis = cfg.axis()?;
    println!("job:      {}", job.display());
    println!("omf:      {} files", cfg.input.omf.len());
    println!("axis:     {}", axis);
    println!("views:    {:?}", cfg.output.views);
    println!("boundary: {:?}", cfg.output.boundary);

    let missing = cfg.missing_inputs();
    if !missing.is_empty() {
        for p in &missing {
            eprintln!("missing input: {}", p.display());
        }
        bail!("{} input file(s) not found", missing.len());
    }

    if let Some(odt) = &cfg.input.odt {
        let views = OdtViews::new(odt, &cfg.input.omf)?;
        println!("odt:      {} matched rows, columns {:?}", views.rows.len(), views.headers);
        for c in &cfg.curves {
            views.get_curve(&c.x, &c.y)?;
        }
    }
    println!("ok");
    Ok(())
}

fn density(omf: &Path, axis: &str, coord: Option<f64>, boundary: &str) -> Result<()> {
    let axis: SliceAxis = axis.parse()?;
    let policy: BoundaryPolicy = boundary.parse()?;
    let field = read_ovf(omf).with_context(|| format!("reading {}", omf.display()))?;
    let coord = coord.unwrap_or_else(|| mid_coord(&field, axis));

    let mut slice = field.slice(axis, coord)?;
    slice.vectors.normalise();
    let q = compute_density_with(&slice.vectors, policy)?;
    let g = slice.vectors.grid;

    println!("file:     {}", omf.display());
    println!("slice:    {} = {:e} (layer centre {:e})", axis, coord, slice.coord);
    println!("grid:     {} x {} ({} x {})", g.nx, g.ny, slice.kdims()[0], slice.kdims()[1]);
    println!("boundary: {:?}", policy);
    println!("Q:        {:.6}", topological_charge(&q));
    Ok(())
}

fn seed(out: &Path, kind: SeedKind, n: [usize; 3], cell: f64) -> Result<()> {
    if n.iter().any(|&k| k == 0) || !cell.is_finite() || cell <= 0.0 {
        bail!("mesh needs positive cell counts and cell size");
    }
    let mesh = Mesh::from_cell(n, [cell; 3]);
    let lateral = n[0].min(n[1]) as f64 * cell;

    let (field, desc) = match kind {
        SeedKind::Uniform => (initial_states::uniform(mesh, [0.0, 0.0, 1.0]), "uniform +z".to_string()),
        SeedKind::Skyrmion => {
            let r0 = 0.25 * lateral;
            let delta = r0 / 3.0;
            (
                initial_states::skyrmion(mesh, r0, delta, 1.0),
                format!("Neel skyrmion R0={:e} delta={:e}", r0, delta),
            )
        }
        SeedKind::Vortex => {
            let core = 0.1 * lateral;
            (
                initial_states::vortex(mesh, 1.0, core),
                format!("CCW vortex core radius={:e}", core),
            )
        }
    };

    let mut meta = OvfMeta::magnetization();
    meta.push_desc_line(desc);
    write_ovf2_binary4(out, &field, &meta).with_context(|| format!("writing {}", out.display()))?;
    println!("wrote {} ({} x {} x {} cells)", out.display(), n[0], n[1], n[2]);
    Ok(())
}
