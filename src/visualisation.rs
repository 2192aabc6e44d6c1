// src/visualisation.rs
//
// Static PNG rendering of the plot objects in views.rs.

use std::error::Error;
use std::path::Path;

use log::debug;
use plotters::prelude::*;

use crate::error::{Result, ViewError};
use crate::views::{Curve, ImageView, VectorFieldView};

type PlotResult = std::result::Result<(), Box<dyn Error>>;

fn plot_err(e: Box<dyn Error>) -> ViewError {
    ViewError::Plot(e.to_string())
}

/// Map a value to a blue–white–red colour over [lo, hi].
///
/// lo maps to blue, hi maps to red, midpoint to white.
fn diverging_color(v: f64, lo: f64, hi: f64) -> RGBColor {
    // Protect against lo ≈ hi (e.g. perfectly uniform state)
    let (mut lo, mut hi) = (lo, hi);
    if !lo.is_finite() || !hi.is_finite() || (hi - lo).abs() < 1e-12 {
        lo = -1.0;
        hi = 1.0;
    }
    if !v.is_finite() {
        return RGBColor(128, 128, 128);
    }

    let x = ((v - lo) / (hi - lo)).clamp(0.0, 1.0);

    // blue–white–red: x=0 -> blue, x=0.5 -> white, x=1 -> red
    let r = (255.0 * (2.0 * x).min(1.0)) as u8;
    let b = (255.0 * (2.0 * (1.0 - x)).min(1.0)) as u8;
    let g = (255.0 * (1.0 - (2.0 * (x - 0.5).abs()))).clamp(0.0, 255.0) as u8;

    RGBColor(r, g, b)
}

/// Cyclic hue for an angle in radians.
fn angle_color(a: f64) -> HSLColor {
    let h = (a / std::f64::consts::TAU).rem_euclid(1.0);
    HSLColor(h, 0.9, 0.5)
}

/// Colour scale for an image: symmetric about zero unless the view
/// declares its own range.
fn image_scale(img: &ImageView) -> (f64, f64) {
    if img.vdim.range.is_some() {
        return img.value_range();
    }
    let (lo, hi) = img.value_range();
    let m = lo.abs().max(hi.abs());
    (-m, m)
}

fn non_degenerate(lo: f64, hi: f64) -> (f64, f64) {
    if hi > lo {
        (lo, hi)
    } else {
        (lo - 0.5, lo + 0.5)
    }
}

/// Smallest positive gap between coordinate values, or 1.0.
fn spacing(values: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|&d| d > 0.0)
        .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.min(d))))
        .unwrap_or(1.0)
}

fn draw_image(img: &ImageView, filename: &Path) -> PlotResult {
    let [left, bottom, right, top] = img.bounds;
    let (x0, x1) = non_degenerate(left, right);
    let (y0, y1) = non_degenerate(bottom, top);
    let cw = (x1 - x0) / img.nx.max(1) as f64;
    let ch = (y1 - y0) / img.ny.max(1) as f64;
    let (lo, hi) = image_scale(img);
    let cyclic = img.vdim.name == "xyfield";

    let root = BitMapBackend::new(filename, (800, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let caption = if cyclic {
        img.label.clone()
    } else {
        format!("{} (blue = {:.3e}, red = {:.3e})", img.label, lo, hi)
    };
    let mut chart = ChartBuilder::on(&root)
        .margin(40)
        .caption(caption, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart
        .configure_mesh()
        .x_desc(format!("{} (m)", img.kdims[0]))
        .y_desc(format!("{} (m)", img.kdims[1]))
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    // One coloured rectangle per cell
    chart.draw_series((0..img.ny).flat_map(|j| {
        (0..img.nx).map(move |i| {
            let v = img.get(i, j);
            let cx = x0 + i as f64 * cw;
            let cy = y0 + j as f64 * ch;
            let style = if cyclic {
                angle_color(v).filled()
            } else {
                diverging_color(v, lo, hi).filled()
            };
            Rectangle::new([(cx, cy), (cx + cw, cy + ch)], style)
        })
    }))?;

    root.present()?;
    Ok(())
}

fn draw_vectors(view: &VectorFieldView, filename: &Path) -> PlotResult {
    let dx = spacing(&view.x);
    let dy = spacing(&view.y);
    let fold = |v: &[f64]| {
        v.iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(a, b), &x| (a.min(x), b.max(x)))
    };
    let (xmin, xmax) = fold(&view.x);
    let (ymin, ymax) = fold(&view.y);
    if !xmin.is_finite() || !ymin.is_finite() {
        return Err("vector field has no finite positions".into());
    }
    let x_range = (xmin - 0.5 * dx)..(xmax + 0.5 * dx);
    let y_range = (ymin - 0.5 * dy)..(ymax + 0.5 * dy);

    let root = BitMapBackend::new(filename, (800, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(40)
        .caption(&view.label, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc(format!("{} (m)", view.kdims[0]))
        .y_desc(format!("{} (m)", view.kdims[1]))
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    // Arrow shaft centred on the cell, coloured by direction
    let half = 0.45 * dx.min(dy);
    chart.draw_series((0..view.x.len()).map(|k| {
        let (x, y) = (view.x[k], view.y[k]);
        let a = view.angle[k];
        let len = half * view.magnitude[k].clamp(0.0, 1.0);
        let (ux, uy) = (a.cos() * len, a.sin() * len);
        PathElement::new(
            vec![(x - ux, y - uy), (x + ux, y + uy)],
            angle_color(a).stroke_width(2),
        )
    }))?;

    // Heads: a dot at the tip
    chart.draw_series((0..view.x.len()).filter(|&k| view.magnitude[k] > 1e-3).map(|k| {
        let a = view.angle[k];
        let len = half * view.magnitude[k].clamp(0.0, 1.0);
        Circle::new(
            (view.x[k] + a.cos() * len, view.y[k] + a.sin() * len),
            2,
            angle_color(a).filled(),
        )
    }))?;

    root.present()?;
    Ok(())
}

fn draw_curve(curve: &Curve, filename: &Path) -> PlotResult {
    let pts: Vec<(f64, f64)> = curve
        .x
        .iter()
        .zip(&curve.y)
        .map(|(&x, &y)| (x, y))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if pts.is_empty() {
        return Ok(()); // nothing to plot
    }

    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(x, y) in &pts {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    let (x_min, x_max) = non_degenerate(x_min, x_max);

    if (y_max - y_min).abs() < 1e-30 {
        // all values essentially identical; broaden the window
        let delta = if y_max.abs() < 1e-30 { 1.0 } else { 0.1 * y_max.abs() };
        y_min -= delta;
        y_max += delta;
    } else {
        // 10% margin around the data range
        let margin = 0.1 * (y_max - y_min);
        y_min -= margin;
        y_max += margin;
    }

    let root = BitMapBackend::new(filename, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(format!("{} vs {}", curve.vdim, curve.kdim), ("sans-serif", 30))
        .set_left_and_bottom_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc(curve.kdim.as_str())
        .y_desc(curve.vdim.as_str())
        .label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()?;

    chart.draw_series(LineSeries::new(pts.iter().copied(), &BLUE))?;
    chart.draw_series(pts.iter().map(|&p| Circle::new(p, 3, BLUE.filled())))?;

    root.present()?;
    Ok(())
}

/// Save an image view as a heat map.
/// - angle images use a cyclic hue
/// - everything else is blue–white–red, symmetric about zero when the
///   view has no declared range
pub fn save_image_plot(img: &ImageView, filename: &Path) -> Result<()> {
    debug!("rendering {} to {}", img.label, filename.display());
    draw_image(img, filename).map_err(plot_err)
}

/// Save an in-plane vector field as short arrows coloured by direction.
pub fn save_vector_plot(view: &VectorFieldView, filename: &Path) -> Result<()> {
    debug!("rendering {} to {}", view.label, filename.display());
    draw_vectors(view, filename).map_err(plot_err)
}

pub fn save_curve_plot(curve: &Curve, filename: &Path) -> Result<()> {
    debug!("rendering {} vs {} to {}", curve.vdim, curve.kdim, filename.display());
    draw_curve(curve, filename).map_err(plot_err)
}
