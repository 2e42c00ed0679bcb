//! PNG porkchop rendering: C3 heatmap, C3 and TOF contours, optimum marker
//! and colour legend.

use std::path::{Path, PathBuf};

use astrochop_core::time::format_julian_date;
use astrochop_export::{ExportError, GridRecord, OutputGuard};
use astrochop_transfer::PorkchopGrid;
use plotters::coord::Shift;
use plotters::coord::types::RangedCoordf64;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use thiserror::Error;
use tracing::debug;

/// TOF contours every 50 days from 100 to 1000.
const TOF_LEVELS: std::ops::RangeInclusive<u32> = 2..=20;
const TOF_LEVEL_STEP_DAYS: f64 = 50.0;
const C3_LEVELS: usize = 30;
const LEGEND_WIDTH: i32 = 140;

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("no feasible transfers to plot")]
    NoFeasibleCells,
    #[error("drawing failed: {0}")]
    Drawing(String),
    #[error(transparent)]
    Export(#[from] ExportError),
}

#[derive(Debug, Clone)]
pub struct PlotOptions {
    pub width: u32,
    pub height: u32,
    /// Colours saturate at `min C3 × high_clip_factor`.
    pub high_clip_factor: f64,
    pub title: String,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 900,
            high_clip_factor: 4.0,
            title: "Porkchop plot".to_string(),
        }
    }
}

/// C3 and TOF fields laid out as `[arrival][departure]` rows for drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotField {
    departure_jd: Vec<f64>,
    arrival_jd: Vec<f64>,
    c3: Vec<Vec<f64>>,
    tof_days: Vec<Vec<f64>>,
}

impl PlotField {
    pub fn from_grid(grid: &PorkchopGrid) -> Self {
        let transpose = |field: &[f64]| -> Vec<Vec<f64>> {
            (0..grid.cols())
                .map(|j| (0..grid.rows()).map(|i| field[i * grid.cols() + j]).collect())
                .collect()
        };
        Self {
            departure_jd: grid.departure_epochs().to_vec(),
            arrival_jd: grid.arrival_epochs().to_vec(),
            c3: transpose(grid.c3_values()),
            tof_days: transpose(grid.tof_values()),
        }
    }

    /// Rebuild the field from CSV records. Axes are the distinct epochs found.
    pub fn from_records(records: &[GridRecord]) -> Self {
        let axis = |epoch: fn(&GridRecord) -> f64| {
            let mut values: Vec<f64> = records
                .iter()
                .map(epoch)
                .filter(|v| v.is_finite())
                .collect();
            values.sort_by(f64::total_cmp);
            values.dedup();
            values
        };
        let departure_jd = axis(|r| r.departure_jd);
        let arrival_jd = axis(|r| r.arrival_jd);
        let mut c3 = vec![vec![f64::NAN; departure_jd.len()]; arrival_jd.len()];
        let mut tof_days = c3.clone();
        for record in records {
            let (Ok(i), Ok(j)) = (
                departure_jd.binary_search_by(|x| x.total_cmp(&record.departure_jd)),
                arrival_jd.binary_search_by(|x| x.total_cmp(&record.arrival_jd)),
            ) else {
                continue;
            };
            tof_days[j][i] = record.tof_days.unwrap_or(f64::NAN);
            if record.feasible {
                c3[j][i] = record.c3_km2_s2.unwrap_or(f64::NAN);
            }
        }
        Self {
            departure_jd,
            arrival_jd,
            c3,
            tof_days,
        }
    }

    pub fn departure_jd(&self) -> &[f64] {
        &self.departure_jd
    }

    pub fn arrival_jd(&self) -> &[f64] {
        &self.arrival_jd
    }

    /// `(departure index, arrival index, C3)` of the lowest finite C3. Ties go
    /// to the shorter flight, then the lower departure index, then the lower
    /// arrival index, the same order the grid optimum uses.
    pub fn minimum(&self) -> Option<(usize, usize, f64)> {
        let tof = |&(i, j, _): &(usize, usize, f64)| self.tof_days[j][i];
        self.c3
            .iter()
            .enumerate()
            .flat_map(|(j, row)| row.iter().enumerate().map(move |(i, &v)| (i, j, v)))
            .filter(|(_, _, v)| v.is_finite())
            .min_by(|a, b| {
                a.2.total_cmp(&b.2)
                    .then(tof(a).total_cmp(&tof(b)))
                    .then(a.0.cmp(&b.0))
                    .then(a.1.cmp(&b.1))
            })
    }

    fn max_c3(&self) -> f64 {
        self.c3
            .iter()
            .flatten()
            .copied()
            .filter(|v| v.is_finite())
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Render `field` to a PNG at `path`, written atomically through `guard`.
pub fn render_porkchop<P: AsRef<Path>>(
    field: &PlotField,
    path: P,
    options: &PlotOptions,
    guard: &OutputGuard,
) -> Result<PathBuf, PlotError> {
    if field.minimum().is_none() {
        return Err(PlotError::NoFeasibleCells);
    }
    debug!(
        departures = field.departure_jd.len(),
        arrivals = field.arrival_jd.len(),
        "rendering porkchop plot"
    );
    guard.render_atomic(path, "png", |temp| {
        let root = BitMapBackend::new(temp, (options.width, options.height)).into_drawing_area();
        draw_porkchop(&root, field, options)
            .and_then(|()| root.present())
            .map_err(|err| PlotError::Drawing(err.to_string()))
    })
}

fn draw_porkchop<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    field: &PlotField,
    options: &PlotOptions,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let Some((min_dep, min_arr, min_c3)) = field.minimum() else {
        return Ok(());
    };
    root.fill(&WHITE)?;

    let font_family = select_font_family();
    let caption_font = FontDesc::new(font_family, 24.0, FontStyle::Bold);
    let label_font = FontDesc::new(font_family, 18.0, FontStyle::Normal);

    let dep_origin = field.departure_jd[0];
    let arr_origin = field.arrival_jd[0];
    let dep_coords: Vec<f64> = field.departure_jd.iter().map(|jd| jd - dep_origin).collect();
    let arr_coords: Vec<f64> = field.arrival_jd.iter().map(|jd| jd - arr_origin).collect();
    let dep_span = span(&dep_coords);
    let arr_span = span(&arr_coords);

    let max_c3 = field.max_c3();
    let mut high_clip = (min_c3 * options.high_clip_factor).min(max_c3);
    if !high_clip.is_finite() || high_clip <= min_c3 {
        high_clip = max_c3.max(min_c3 * 1.001 + f64::EPSILON);
    }
    let scale = |value: f64| (value.clamp(min_c3, high_clip) - min_c3) / (high_clip - min_c3);
    let clipped: Vec<Vec<f64>> = field
        .c3
        .iter()
        .map(|row| {
            row.iter()
                .map(|&v| if v.is_finite() { v.min(high_clip) } else { v })
                .collect()
        })
        .collect();
    let c3_levels: Vec<f64> = (0..C3_LEVELS)
        .map(|k| min_c3 + (high_clip - min_c3) * k as f64 / (C3_LEVELS - 1) as f64)
        .collect();
    let tof_levels: Vec<f64> = TOF_LEVELS.map(|k| f64::from(k) * TOF_LEVEL_STEP_DAYS).collect();

    let (plot_area, legend_area) =
        root.split_horizontally((options.width as i32 - LEGEND_WIDTH).max(200));

    {
        let mut chart = ChartBuilder::on(&plot_area)
            .margin(20)
            .caption(options.title.clone(), caption_font)
            .x_label_area_size(60)
            .y_label_area_size(90)
            .build_cartesian_2d(-0.5..dep_span + 0.5, -0.5..arr_span + 0.5)?;

        chart
            .configure_mesh()
            .x_desc("Departure date")
            .y_desc("Arrival date")
            .label_style(label_font.clone())
            .x_labels(6)
            .y_labels(6)
            .x_label_formatter(&|d| format_julian_date(dep_origin + d))
            .y_label_formatter(&|d| format_julian_date(arr_origin + d))
            .draw()?;

        for (j, row) in field.c3.iter().enumerate() {
            let (y0, y1) = cell_bounds(&arr_coords, j);
            for (i, &value) in row.iter().enumerate() {
                if !value.is_finite() {
                    continue;
                }
                let (x0, x1) = cell_bounds(&dep_coords, i);
                chart.draw_series(std::iter::once(Rectangle::new(
                    [(x0, y0), (x1, y1)],
                    jet_color(scale(value)).filled(),
                )))?;
            }
        }

        for &level in &c3_levels {
            let style = ShapeStyle::from(&jet_color(scale(level)).mix(0.9)).stroke_width(1);
            for (p1, p2) in contour_segments(&clipped, &dep_coords, &arr_coords, level) {
                chart.draw_series(std::iter::once(PathElement::new(vec![p1, p2], style)))?;
            }
        }
        let tof_style = ShapeStyle::from(&RED.mix(0.8)).stroke_width(1);
        for &level in &tof_levels {
            for (p1, p2) in contour_segments(&field.tof_days, &dep_coords, &arr_coords, level) {
                for dash in dashes(p1, p2) {
                    chart.draw_series(std::iter::once(PathElement::new(dash, tof_style)))?;
                }
            }
        }

        draw_optimum(
            &mut chart,
            (dep_coords[min_dep], arr_coords[min_arr]),
            (dep_span, arr_span),
            min_c3,
            &label_font,
        )?;
    }

    let mut legend = ChartBuilder::on(&legend_area)
        .margin_left(20)
        .margin_right(20)
        .margin_top(30)
        .margin_bottom(30)
        .x_label_area_size(0)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..1.0, min_c3..high_clip)?;
    for k in 0..300 {
        let (t0, t1) = (k as f64 / 300.0, (k + 1) as f64 / 300.0);
        let v0 = min_c3 + (high_clip - min_c3) * t0;
        let v1 = min_c3 + (high_clip - min_c3) * t1;
        legend.draw_series(std::iter::once(Rectangle::new(
            [(0.0, v0), (1.0, v1)],
            jet_color(t0).filled(),
        )))?;
    }
    legend
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(0)
        .y_labels(6)
        .y_desc("C3 (km^2/s^2)")
        .y_label_style(label_font.clone())
        .axis_desc_style(label_font)
        .y_label_formatter(&|v| format!("{v:.1}"))
        .draw()?;
    Ok(())
}

fn draw_optimum<DB: DrawingBackend>(
    chart: &mut ChartContext<DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    (x, y): (f64, f64),
    (dep_span, arr_span): (f64, f64),
    c3: f64,
    font: &FontDesc<'_>,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let guide = ShapeStyle::from(&BLACK.mix(0.5)).stroke_width(1);
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(x, -0.5), (x, arr_span + 0.5)],
        guide,
    )))?;
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(-0.5, y), (dep_span + 0.5, y)],
        guide,
    )))?;

    let marker_color = RGBColor(210, 100, 20);
    let marker = ShapeStyle::from(&marker_color).stroke_width(3);
    let (half_w, half_h) = ((dep_span * 0.02).max(0.5), (arr_span * 0.02).max(0.5));
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(x - half_w, y), (x + half_w, y)],
        marker,
    )))?;
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(x, y - half_h), (x, y + half_h)],
        marker,
    )))?;
    chart.draw_series(std::iter::once(Text::new(
        format!("C3 = {c3:.2} km^2/s^2"),
        (x + 0.02 * dep_span, y + 0.02 * arr_span),
        font.clone().color(&marker_color),
    )))?;
    Ok(())
}

fn select_font_family() -> FontFamily<'static> {
    if cfg!(target_os = "macos") {
        FontFamily::Name("Helvetica")
    } else if cfg!(target_os = "windows") {
        FontFamily::Name("Arial")
    } else {
        FontFamily::SansSerif
    }
}

fn span(coords: &[f64]) -> f64 {
    coords.last().copied().unwrap_or(0.0).max(1.0)
}

fn jet_color(t_in: f64) -> RGBColor {
    let t = t_in.clamp(0.0, 1.0);
    let comp = |v: f64| (1.0 - (v - 1.0).abs()).clamp(0.0, 1.0);
    let r = comp(1.5 - 4.0 * (t - 0.75).abs());
    let g = comp(1.5 - 4.0 * (t - 0.5).abs());
    let b = comp(1.5 - 4.0 * (t - 0.25).abs());
    RGBColor((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
}

/// Half-open extent of cell `idx` on an axis of cell centres.
fn cell_bounds(coords: &[f64], idx: usize) -> (f64, f64) {
    let center = coords[idx];
    let prev = idx.checked_sub(1).and_then(|i| coords.get(i)).copied();
    let next = coords.get(idx + 1).copied();
    let left = match (prev, next) {
        (Some(prev), _) => 0.5 * (prev + center),
        (None, Some(next)) => center - 0.5 * (next - center),
        (None, None) => center - 0.5,
    };
    let right = match (prev, next) {
        (_, Some(next)) => 0.5 * (center + next),
        (Some(prev), None) => center + 0.5 * (center - prev),
        (None, None) => center + 0.5,
    };
    (left, right)
}

type Point = (f64, f64);

/// Marching-squares segments of `grid` (`[y][x]`) at `level`. Quads with a
/// non-finite corner are skipped.
fn contour_segments(grid: &[Vec<f64>], xs: &[f64], ys: &[f64], level: f64) -> Vec<(Point, Point)> {
    let mut segments = Vec::new();
    if xs.len() < 2 || ys.len() < 2 {
        return segments;
    }
    for j in 0..ys.len() - 1 {
        for i in 0..xs.len() - 1 {
            let values = [grid[j][i], grid[j][i + 1], grid[j + 1][i + 1], grid[j + 1][i]];
            if values.iter().any(|v| !v.is_finite()) {
                continue;
            }
            let corners = [
                (xs[i], ys[j]),
                (xs[i + 1], ys[j]),
                (xs[i + 1], ys[j + 1]),
                (xs[i], ys[j + 1]),
            ];
            segments.extend(marching_square(values, corners, level));
        }
    }
    segments
}

fn marching_square(values: [f64; 4], corners: [Point; 4], level: f64) -> Vec<(Point, Point)> {
    let case = values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v >= level)
        .fold(0u8, |acc, (k, _)| acc | (1 << k));

    // Edge k joins corner k to corner (k + 1) % 4.
    let edge = |k: usize| -> Point {
        let (a, b) = (k, (k + 1) % 4);
        let (va, vb) = (values[a], values[b]);
        let ((xa, ya), (xb, yb)) = (corners[a], corners[b]);
        if (vb - va).abs() < f64::EPSILON {
            return ((xa + xb) * 0.5, (ya + yb) * 0.5);
        }
        let t = (level - va) / (vb - va);
        (xa + t * (xb - xa), ya + t * (yb - ya))
    };
    let pairs: &[(usize, usize)] = match case {
        1 | 14 => &[(3, 0)],
        2 | 13 => &[(0, 1)],
        3 | 12 => &[(3, 1)],
        4 | 11 => &[(1, 2)],
        5 => &[(3, 2), (0, 1)],
        6 | 9 => &[(0, 2)],
        7 | 8 => &[(3, 2)],
        10 => &[(3, 0), (1, 2)],
        _ => &[],
    };
    pairs.iter().map(|&(a, b)| (edge(a), edge(b))).collect()
}

/// Split a segment into four pieces and keep the first and third.
fn dashes(p1: Point, p2: Point) -> [Vec<Point>; 2] {
    let at = |t: f64| (p1.0 + t * (p2.0 - p1.0), p1.1 + t * (p2.1 - p1.1));
    [vec![at(0.0), at(0.25)], vec![at(0.5), at(0.75)]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_corner_above_level_cuts_two_edges() {
        let corners = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        let segments = marching_square([1.0, 0.0, 0.0, 0.0], corners, 0.5);
        assert_eq!(segments, vec![((0.0, 0.5), (0.5, 0.0))]);
        assert!(marching_square([1.0; 4], corners, 0.5).is_empty());
        assert_eq!(marching_square([1.0, 0.0, 1.0, 0.0], corners, 0.5).len(), 2);
    }

    #[test]
    fn records_rebuild_axes_in_order() {
        let record = |dep: f64, arr: f64, c3: Option<f64>| GridRecord {
            departure_jd: dep,
            arrival_jd: arr,
            departure_date: String::new(),
            arrival_date: String::new(),
            tof_days: Some(arr - dep),
            c3_km2_s2: c3,
            vinf_dep_km_s: c3.map(f64::sqrt),
            vinf_arr_km_s: c3,
            feasible: c3.is_some(),
            failure: String::new(),
        };
        let field = PlotField::from_records(&[
            record(10.0, 200.0, Some(9.0)),
            record(0.0, 200.0, Some(16.0)),
            record(0.0, 250.0, None),
            record(10.0, 250.0, Some(12.0)),
        ]);
        assert_eq!(field.departure_jd(), &[0.0, 10.0]);
        assert_eq!(field.arrival_jd(), &[200.0, 250.0]);
        assert_eq!(field.minimum(), Some((1, 0, 9.0)));
        assert!(field.c3[1][0].is_nan());
        assert_eq!(field.tof_days[1][0], 250.0);
    }

    #[test]
    fn equal_c3_marks_the_shorter_flight() {
        let record = |dep: f64, arr: f64| GridRecord {
            departure_jd: dep,
            arrival_jd: arr,
            departure_date: String::new(),
            arrival_date: String::new(),
            tof_days: Some(arr - dep),
            c3_km2_s2: Some(12.0),
            vinf_dep_km_s: Some(12f64.sqrt()),
            vinf_arr_km_s: Some(3.0),
            feasible: true,
            failure: String::new(),
        };
        let field = PlotField::from_records(&[record(0.0, 300.0), record(10.0, 300.0)]);
        assert_eq!(field.minimum(), Some((1, 0, 12.0)));

        let field = PlotField::from_records(&[
            record(0.0, 300.0),
            record(10.0, 310.0),
            record(0.0, 310.0),
        ]);
        // Two cells share C3 12 and TOF 300; the lower departure index wins.
        assert_eq!(field.minimum(), Some((0, 0, 12.0)));
    }

    #[test]
    fn cell_bounds_split_between_centres() {
        let coords = [0.0, 10.0, 30.0];
        assert_eq!(cell_bounds(&coords, 0), (-5.0, 5.0));
        assert_eq!(cell_bounds(&coords, 1), (5.0, 20.0));
        assert_eq!(cell_bounds(&coords, 2), (20.0, 40.0));
        assert_eq!(cell_bounds(&[3.0], 0), (2.5, 3.5));
    }
}
