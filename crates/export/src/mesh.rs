//! Triangulated height-field meshes of porkchop fields, for 3-D viewers.

use std::str::FromStr;

use astrochop_core::vector::{self, Vector3};
use astrochop_transfer::PorkchopGrid;
use thiserror::Error;

use crate::ExportError;

/// Parallel-ray and self-hit threshold for ray picking.
const RAY_EPSILON: f64 = 1e-7;

/// Dense scalar field over an (x, y) lattice, stored row by row in y.
#[derive(Debug, Clone, PartialEq)]
pub struct DataGrid {
    values: Vec<f64>,
    x_axis: Vec<f64>,
    y_axis: Vec<f64>,
}

impl DataGrid {
    /// `values[y * x_axis.len() + x]` is the sample at `(x_axis[x], y_axis[y])`.
    pub fn new(values: Vec<f64>, x_axis: Vec<f64>, y_axis: Vec<f64>) -> Result<Self, ExportError> {
        let expected = x_axis.len().checked_mul(y_axis.len());
        if expected != Some(values.len()) {
            return Err(ExportError::ShapeMismatch {
                rows: y_axis.len(),
                cols: x_axis.len(),
                len: values.len(),
            });
        }
        Ok(Self {
            values,
            x_axis,
            y_axis,
        })
    }

    /// C3 surface with departure along x and arrival along y.
    pub fn c3_surface(grid: &PorkchopGrid) -> Self {
        let (rows, cols) = (grid.rows(), grid.cols());
        let c3 = grid.c3_values();
        let mut values = Vec::with_capacity(c3.len());
        for j in 0..cols {
            values.extend((0..rows).map(|i| c3[i * cols + j]));
        }
        Self {
            values,
            x_axis: grid.departure_epochs().to_vec(),
            y_axis: grid.arrival_epochs().to_vec(),
        }
    }

    pub fn width(&self) -> usize {
        self.x_axis.len()
    }

    pub fn height(&self) -> usize {
        self.y_axis.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn x_axis(&self) -> &[f64] {
        &self.x_axis
    }

    pub fn y_axis(&self) -> &[f64] {
        &self.y_axis
    }
}

/// Height transform applied before scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Morph {
    #[default]
    Linear,
    LogE,
    Log10,
}

#[derive(Debug, Error)]
#[error("unknown morph `{0}` (expected linear, log_e or log_10)")]
pub struct UnknownMorph(String);

impl FromStr for Morph {
    type Err = UnknownMorph;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "log_e" | "ln" => Ok(Self::LogE),
            "log_10" | "log10" => Ok(Self::Log10),
            _ => Err(UnknownMorph(text.to_string())),
        }
    }
}

impl Morph {
    fn apply(self, value: f64) -> f64 {
        match self {
            Self::Linear => value,
            Self::LogE => value.ln(),
            Self::Log10 => value.log10(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshBounds {
    pub x: (f64, f64),
    pub y: (f64, f64),
    pub z: (f64, f64),
}

/// Nearest ray/mesh intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub t: f64,
    pub triangle: usize,
    pub point: Vector3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PorkchopMesh {
    vertices: Vec<Vector3>,
    triangles: Vec<[usize; 3]>,
    scalars: Vec<f64>,
    normalized: Vec<f64>,
    bounds: MeshBounds,
}

impl PorkchopMesh {
    /// Build the height field. Vertex `y * width + x` sits at
    /// `(x_axis[x], y_axis[y], morphed * z_scale)`; each lattice quad becomes
    /// two triangles stored back to back.
    pub fn generate(grid: &DataGrid, z_scale: f64, morph: Morph) -> Self {
        let scalars = morph_values(grid.values(), morph);
        let normalized = normalize(&scalars);
        let (nx, ny) = (grid.width(), grid.height());

        let mut vertices = Vec::with_capacity(scalars.len());
        for (y_index, &y) in grid.y_axis().iter().enumerate() {
            for (x_index, &x) in grid.x_axis().iter().enumerate() {
                vertices.push([x, y, scalars[y_index * nx + x_index] * z_scale]);
            }
        }

        let quads = nx.saturating_sub(1) * ny.saturating_sub(1);
        let mut triangles = Vec::with_capacity(2 * quads);
        for y in 0..ny.saturating_sub(1) {
            for x in 0..nx.saturating_sub(1) {
                let v0 = y * nx + x;
                let (v1, v2) = (v0 + 1, v0 + nx);
                let v3 = v2 + 1;
                triangles.push([v0, v2, v1]);
                triangles.push([v1, v2, v3]);
            }
        }

        let bounds = MeshBounds {
            x: min_max(grid.x_axis().iter().copied()),
            y: min_max(grid.y_axis().iter().copied()),
            z: min_max(vertices.iter().map(|v| v[2])),
        };
        Self {
            vertices,
            triangles,
            scalars,
            normalized,
            bounds,
        }
    }

    pub fn vertices(&self) -> &[Vector3] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Morphed values, before `z_scale`.
    pub fn scalars(&self) -> &[f64] {
        &self.scalars
    }

    /// Morphed values mapped onto 0..1.
    pub fn normalized(&self) -> &[f64] {
        &self.normalized
    }

    pub fn bounds(&self) -> MeshBounds {
        self.bounds
    }

    /// Möller–Trumbore against every triangle; both faces count.
    pub fn intersect_ray(&self, origin: &Vector3, direction: &Vector3) -> Option<RayHit> {
        let mut best: Option<(f64, usize)> = None;
        for (index, triangle) in self.triangles.iter().enumerate() {
            let Some(t) = self.hit_distance(triangle, origin, direction) else {
                continue;
            };
            if best.is_none_or(|(best_t, _)| t < best_t) {
                best = Some((t, index));
            }
        }
        best.map(|(t, triangle)| RayHit {
            t,
            triangle,
            point: vector::add(origin, &vector::scale(direction, t)),
        })
    }

    fn hit_distance(
        &self,
        triangle: &[usize; 3],
        origin: &Vector3,
        direction: &Vector3,
    ) -> Option<f64> {
        let v0 = &self.vertices[triangle[0]];
        let edge1 = vector::sub(&self.vertices[triangle[1]], v0);
        let edge2 = vector::sub(&self.vertices[triangle[2]], v0);
        let h = vector::cross(direction, &edge2);
        let a = vector::dot(&edge1, &h);
        if a.abs() <= RAY_EPSILON {
            return None;
        }
        let f = 1.0 / a;
        let s = vector::sub(origin, v0);
        let u = f * vector::dot(&s, &h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = vector::cross(&s, &edge1);
        let v = f * vector::dot(direction, &q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = f * vector::dot(&edge2, &q);
        (t > RAY_EPSILON).then_some(t)
    }
}

/// Non-finite samples take the largest finite sample. Under a log morph,
/// non-positive samples take the smallest morphed positive sample.
fn morph_values(values: &[f64], morph: Morph) -> Vec<f64> {
    let fill = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .reduce(f64::max)
        .unwrap_or(0.0);
    let cleaned = values.iter().map(|&v| if v.is_finite() { v } else { fill });
    if morph == Morph::Linear {
        return cleaned.collect();
    }

    let morphed: Vec<Option<f64>> = cleaned.map(|v| (v > 0.0).then(|| morph.apply(v))).collect();
    let floor = morphed
        .iter()
        .flatten()
        .copied()
        .reduce(f64::min)
        .unwrap_or(0.0);
    morphed.into_iter().map(|v| v.unwrap_or(floor)).collect()
}

fn normalize(values: &[f64]) -> Vec<f64> {
    let (lo, hi) = min_max(values.iter().copied());
    if hi > lo {
        values.iter().map(|v| (v - lo) / (hi - lo)).collect()
    } else {
        vec![0.0; values.len()]
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_is_checked() {
        assert!(matches!(
            DataGrid::new(vec![1.0; 5], vec![0.0, 1.0], vec![0.0, 1.0]),
            Err(ExportError::ShapeMismatch {
                rows: 2,
                cols: 2,
                len: 5
            })
        ));
    }

    #[test]
    fn morph_names_parse() {
        assert_eq!("log_e".parse::<Morph>().unwrap(), Morph::LogE);
        assert_eq!("LOG10".parse::<Morph>().unwrap(), Morph::Log10);
        assert!("cubic".parse::<Morph>().is_err());
    }

    #[test]
    fn log_morph_floors_non_positive_samples() {
        let morphed = morph_values(&[f64::NAN, 0.0, 10.0, 100.0], Morph::Log10);
        assert_eq!(morphed, vec![2.0, 1.0, 1.0, 2.0]);
        assert_eq!(morph_values(&[-1.0, 0.0], Morph::LogE), vec![0.0, 0.0]);
    }

    #[test]
    fn flat_field_normalises_to_zero() {
        assert_eq!(normalize(&[3.0, 3.0, 3.0]), vec![0.0, 0.0, 0.0]);
        assert_eq!(normalize(&[1.0, 2.0, 3.0]), vec![0.0, 0.5, 1.0]);
    }
}
