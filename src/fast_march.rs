//! Classical fast-marching inpainting backend.
//!
//! Fills masked pixels in order of their distance from the known region,
//! each one with a Gaussian-weighted average of the already known pixels
//! around it. It needs no model weights, which makes it a usable default
//! for the command-line tool and a deterministic backend for tests.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ndarray::{Array2, Array4, ArrayView4};

use crate::error::BoxedError;
use crate::inference::InpaintModel;

/// Default neighbourhood radius in pixels.
pub const DEFAULT_RADIUS: usize = 5;

/// Inpainting backend based on the fast marching method.
#[derive(Debug, Clone, Copy)]
pub struct FastMarchInpainter {
    radius: usize,
}

impl Default for FastMarchInpainter {
    fn default() -> Self {
        Self::new(DEFAULT_RADIUS)
    }
}

impl FastMarchInpainter {
    /// Create a backend averaging known pixels within `radius` (at least 1).
    #[must_use]
    pub fn new(radius: usize) -> Self {
        Self {
            radius: radius.max(1),
        }
    }

    /// Neighbourhood radius in pixels.
    #[must_use]
    pub fn radius(&self) -> usize {
        self.radius
    }
}

/// Heap entry ordered so that `BinaryHeap` pops the smallest distance first.
#[derive(Debug, Clone, Copy)]
struct Front {
    x: usize,
    y: usize,
    distance: f32,
}

impl PartialEq for Front {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Front {}

impl PartialOrd for Front {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Front {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for a min-heap; ties broken by position for determinism.
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| (other.y, other.x).cmp(&(self.y, self.x)))
    }
}

const STEPS: [(isize, isize, f32); 8] = [
    (-1, 0, 1.0),
    (1, 0, 1.0),
    (0, -1, 1.0),
    (0, 1, 1.0),
    (-1, -1, std::f32::consts::SQRT_2),
    (1, -1, std::f32::consts::SQRT_2),
    (-1, 1, std::f32::consts::SQRT_2),
    (1, 1, std::f32::consts::SQRT_2),
];

impl InpaintModel for FastMarchInpainter {
    fn infer(
        &self,
        image: ArrayView4<'_, f32>,
        mask: ArrayView4<'_, f32>,
    ) -> Result<Array4<f32>, BoxedError> {
        let (_, channels, height, width) = image.dim();
        if mask.dim() != (1, 1, height, width) {
            return Err(format!(
                "mask shape {:?} does not match image shape {:?}",
                mask.shape(),
                image.shape()
            )
            .into());
        }

        let mut out = image.to_owned();
        let mut known = Array2::from_shape_fn((height, width), |(y, x)| mask[[0, 0, y, x]] <= 0.0);
        let mut heap = BinaryHeap::new();

        for y in 0..height {
            for x in 0..width {
                if known[(y, x)] {
                    push_unknown_neighbours(&mut heap, &known, x, y, 0.0);
                }
            }
        }

        let sigma = self.radius as f32 / 2.0;
        let mut values = vec![0.0_f32; channels];

        while let Some(Front { x, y, distance }) = heap.pop() {
            if known[(y, x)] {
                continue;
            }

            if weighted_average(&out, &known, x, y, self.radius, sigma, &mut values) {
                for (ch, &v) in values.iter().enumerate() {
                    out[[0, ch, y, x]] = v;
                }
            }
            known[(y, x)] = true;
            push_unknown_neighbours(&mut heap, &known, x, y, distance);
        }

        Ok(out)
    }
}

fn push_unknown_neighbours(
    heap: &mut BinaryHeap<Front>,
    known: &Array2<bool>,
    x: usize,
    y: usize,
    distance: f32,
) {
    let (height, width) = known.dim();
    for &(dx, dy, step) in &STEPS {
        let (Some(nx), Some(ny)) = (x.checked_add_signed(dx), y.checked_add_signed(dy)) else {
            continue;
        };
        if nx < width && ny < height && !known[(ny, nx)] {
            heap.push(Front {
                x: nx,
                y: ny,
                distance: distance + step,
            });
        }
    }
}

/// Gaussian-weighted mean of known pixels around `(x, y)`, written into `values`.
///
/// Returns `false` when no known pixel lies within `radius`.
#[allow(clippy::cast_precision_loss)]
fn weighted_average(
    image: &Array4<f32>,
    known: &Array2<bool>,
    x: usize,
    y: usize,
    radius: usize,
    sigma: f32,
    values: &mut [f32],
) -> bool {
    let (height, width) = known.dim();
    values.fill(0.0);
    let mut total = 0.0_f32;

    for ny in y.saturating_sub(radius)..(y + radius + 1).min(height) {
        for nx in x.saturating_sub(radius)..(x + radius + 1).min(width) {
            if !known[(ny, nx)] {
                continue;
            }
            let dx = nx as f32 - x as f32;
            let dy = ny as f32 - y as f32;
            let weight = (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp();
            for (ch, v) in values.iter_mut().enumerate() {
                *v += image[[0, ch, ny, nx]] * weight;
            }
            total += weight;
        }
    }

    if total <= 0.0 {
        return false;
    }
    for v in values.iter_mut() {
        *v /= total;
    }
    true
}
