//! Vectorization of label rasters.
//!
//! Every 8-connected region of one label value is traced along pixel edges
//! into closed rings. Rings that touch themselves at a lattice vertex are
//! split there, so each emitted ring is simple. Holes are attached to the
//! smallest shell of the same region that contains them, then the result is
//! mapped to world coordinates.

use std::collections::HashMap;

use geo::{
    AffineOps, Contains,
    orient::{Direction, Orient},
};
use geo_types::{Coord, Geometry, LineString, MultiPolygon, Point, Polygon};
use image::Luma;
use imageproc::region_labelling::{Connectivity, connected_components};
use tracing::debug;

use crate::{
    error::{BoatError, Result},
    types::{GeoTransform, LabelRaster, LabeledPolygon},
};

/// Pixel-corner lattice point `(x, y)`, `y` pointing down.
type Vertex = (i64, i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Right,
    Down,
    Left,
    Up,
}

impl Step {
    fn delta(self) -> (i64, i64) {
        match self {
            Step::Right => (1, 0),
            Step::Down => (0, 1),
            Step::Left => (-1, 0),
            Step::Up => (0, -1),
        }
    }

    /// Step taken at a vertex where two diagonal pixels of the region meet.
    fn pinch_turn(self) -> Step {
        match self {
            Step::Down => Step::Right,
            Step::Up => Step::Left,
            Step::Right => Step::Up,
            Step::Left => Step::Down,
        }
    }
}

/// Unit boundary edge; the region lies to its right in screen orientation.
#[derive(Debug, Clone, Copy)]
struct Edge {
    from: Vertex,
    step: Step,
}

impl Edge {
    fn to(&self) -> Vertex {
        let (dx, dy) = self.step.delta();
        (self.from.0 + dx, self.from.1 + dy)
    }
}

#[derive(Debug, Clone)]
struct Ring {
    vertices: Vec<Vertex>,
    /// Twice the shoelace area; positive for shells, negative for holes
    doubled_area: i64,
    /// Centre of a pixel just outside the region, next to the first edge
    outside: (f64, f64),
}

/// Boundary edges of one region, clockwise around the region on screen.
fn boundary_edges(regions: &LabelRaster, region: u32, pixels: &[(u32, u32)]) -> Vec<Edge> {
    let (width, height) = regions.dimensions();
    let inside = |x: i64, y: i64| {
        x >= 0
            && y >= 0
            && (x as u32) < width
            && (y as u32) < height
            && regions.get_pixel(x as u32, y as u32)[0] == region
    };

    let mut edges = Vec::new();
    for &(px, py) in pixels {
        let (x, y) = (px as i64, py as i64);
        if !inside(x, y - 1) {
            edges.push(Edge {
                from: (x, y),
                step: Step::Right,
            });
        }
        if !inside(x + 1, y) {
            edges.push(Edge {
                from: (x + 1, y),
                step: Step::Down,
            });
        }
        if !inside(x, y + 1) {
            edges.push(Edge {
                from: (x + 1, y + 1),
                step: Step::Left,
            });
        }
        if !inside(x - 1, y) {
            edges.push(Edge {
                from: (x, y + 1),
                step: Step::Up,
            });
        }
    }
    edges
}

/// Link boundary edges into closed vertex loops.
fn trace_loops(edges: &[Edge], label: u32) -> Result<Vec<Vec<Edge>>> {
    let invalid = |reason: &str| BoatError::InvalidGeometry {
        label,
        reason: reason.to_string(),
    };

    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::new();
    for (i, edge) in edges.iter().enumerate() {
        outgoing.entry(edge.from).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut loops = Vec::new();
    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        let mut ring = Vec::new();
        let mut current = start;
        loop {
            used[current] = true;
            ring.push(edges[current]);

            let candidates = outgoing
                .get(&edges[current].to())
                .map(Vec::as_slice)
                .unwrap_or_default();
            let next = match candidates {
                [only] => *only,
                [a, b] => {
                    let turn = edges[current].step.pinch_turn();
                    if edges[*a].step == turn {
                        *a
                    } else if edges[*b].step == turn {
                        *b
                    } else {
                        return Err(invalid("ambiguous boundary vertex"));
                    }
                }
                _ => return Err(invalid("boundary does not close")),
            };

            if next == start {
                break;
            }
            if used[next] {
                return Err(invalid("boundary edge visited twice"));
            }
            current = next;
        }
        loops.push(ring);
    }
    Ok(loops)
}

/// Split a loop wherever it revisits a vertex, giving loops without repeats.
fn split_at_repeats(edges: Vec<Edge>) -> Vec<Vec<Edge>> {
    let mut stack: Vec<Edge> = Vec::with_capacity(edges.len());
    let mut seen: HashMap<Vertex, usize> = HashMap::new();
    let mut pieces = Vec::new();

    for edge in edges {
        if let Some(&i) = seen.get(&edge.from) {
            let piece = stack.split_off(i);
            for e in &piece {
                seen.remove(&e.from);
            }
            pieces.push(piece);
        }
        seen.insert(edge.from, stack.len());
        stack.push(edge);
    }
    pieces.push(stack);
    pieces
}

fn doubled_area(vertices: &[Vertex]) -> i64 {
    let n = vertices.len();
    (0..n)
        .map(|i| {
            let (x0, y0) = vertices[i];
            let (x1, y1) = vertices[(i + 1) % n];
            x0 * y1 - x1 * y0
        })
        .sum()
}

fn without_collinear(edges: &[Edge]) -> Vec<Vertex> {
    let n = edges.len();
    (0..n)
        .filter(|&i| edges[(i + n - 1) % n].step != edges[i].step)
        .map(|i| edges[i].from)
        .collect()
}

fn to_ring(edges: &[Edge]) -> Option<Ring> {
    let first = edges.first()?;
    let vertices = without_collinear(edges);
    let doubled_area = doubled_area(&vertices);
    if doubled_area == 0 {
        return None;
    }

    let (x, y) = (first.from.0 as f64, first.from.1 as f64);
    let (dx, dy) = first.step.delta();
    let (dx, dy) = (dx as f64, dy as f64);
    Some(Ring {
        vertices,
        doubled_area,
        outside: (x + 0.5 * (dx + dy), y + 0.5 * (dy - dx)),
    })
}

fn line_string(vertices: &[Vertex]) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = vertices
        .iter()
        .map(|&(x, y)| Coord {
            x: x as f64,
            y: y as f64,
        })
        .collect();
    if let Some(&first) = coords.first() {
        coords.push(first);
    }
    LineString::new(coords)
}

/// Build the pixel-space polygons of one region.
fn region_polygons(edges: &[Edge], label: u32) -> Result<Vec<Polygon<f64>>> {
    let mut shells = Vec::new();
    let mut holes = Vec::new();
    for traced in trace_loops(edges, label)? {
        for piece in split_at_repeats(traced) {
            let Some(ring) = to_ring(&piece) else {
                continue;
            };
            if ring.vertices.len() < 4 {
                return Err(BoatError::InvalidGeometry {
                    label,
                    reason: format!("ring with {} vertices", ring.vertices.len()),
                });
            }
            if ring.doubled_area > 0 {
                shells.push(ring);
            } else {
                holes.push(ring);
            }
        }
    }

    let outlines: Vec<Polygon<f64>> = shells
        .iter()
        .map(|shell| Polygon::new(line_string(&shell.vertices), vec![]))
        .collect();
    let mut interiors: Vec<Vec<LineString<f64>>> = vec![Vec::new(); shells.len()];

    for hole in &holes {
        let outside = Point::new(hole.outside.0, hole.outside.1);
        let owner = outlines
            .iter()
            .enumerate()
            .filter(|(_, outline)| outline.contains(&outside))
            .min_by_key(|(i, _)| shells[*i].doubled_area)
            .map(|(i, _)| i)
            .ok_or_else(|| BoatError::InvalidGeometry {
                label,
                reason: "hole outside every shell".to_string(),
            })?;
        interiors[owner].push(line_string(&hole.vertices));
    }

    Ok(outlines
        .into_iter()
        .zip(interiors)
        .map(|(outline, interiors)| Polygon::new(outline.into_inner().0, interiors))
        .collect())
}

/// Vectorize every region of constant label into a world-space polygon
/// tagged with `{"id": label}`.
///
/// Regions are 8-connected. Output follows the raster-scan order of each
/// region's first pixel. Pixels equal to `ignore_label` are skipped.
pub fn labels_to_polygons(
    labels: &LabelRaster,
    transform: &GeoTransform,
    ignore_label: u32,
) -> Result<Vec<LabeledPolygon>> {
    let (width, height) = labels.dimensions();
    if width == 0 || height == 0 {
        return Ok(Vec::new());
    }

    let regions = connected_components(labels, Connectivity::Eight, Luma([ignore_label]));
    let region_count = regions.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;

    let mut pixels: Vec<Vec<(u32, u32)>> = vec![Vec::new(); region_count + 1];
    for (x, y, p) in regions.enumerate_pixels() {
        if p[0] != 0 {
            pixels[p[0] as usize].push((x, y));
        }
    }

    let affine = transform.to_affine();
    let mut features = Vec::with_capacity(region_count);
    for (region, region_pixels) in pixels.iter().enumerate().skip(1) {
        let Some(&(x0, y0)) = region_pixels.first() else {
            continue;
        };
        let label = labels.get_pixel(x0, y0)[0];

        let edges = boundary_edges(&regions, region as u32, region_pixels);
        let mut polygons: Vec<Polygon<f64>> = region_polygons(&edges, label)?
            .into_iter()
            .map(|polygon| polygon.affine_transform(&affine).orient(Direction::Default))
            .collect();

        let geometry = match polygons.len() {
            0 => {
                return Err(BoatError::InvalidGeometry {
                    label,
                    reason: "region has no outer boundary".to_string(),
                });
            }
            1 => Geometry::Polygon(polygons.swap_remove(0)),
            _ => Geometry::MultiPolygon(MultiPolygon::new(polygons)),
        };
        features.push(LabeledPolygon::new(geometry, label));
    }

    debug!(
        regions = region_count,
        polygons = features.len(),
        "vectorized label raster"
    );
    Ok(features)
}
