//! Padding-inference geometry for the U-shaped architecture.
//!
//! A U-shaped network cannot process arbitrary spatial extents: every
//! stride-2 down-step halves an extent exactly, and in `valid` border mode
//! every convolution block shrinks it further. Rather than constraining the
//! simulation grid, the input is zero-padded up to the smallest extent the
//! network can traverse:
//!
//! ```text
//! desired extent
//!   │ reverse_up_step    × nb_steps   (undo the decoder)
//!   │ reverse_down_step  × nb_steps   (undo the encoder)
//!   │ reverse_first_step × 1          (undo the entry block)
//!   ▼
//! minimal extent  ==  padded input extent
//! ```
//!
//! The step functions here and the layer stack in the network module are two
//! views of the same receptive-field arithmetic: a kernel-3 convolution
//! block shrinks an extent by `border`, a kernel-2 stride-2 down-convolution
//! halves it, a kernel-2 stride-2 transpose convolution doubles it. Changing
//! a kernel or stride there requires the matching change here.

use super::BorderMode;

/// Per-block extent shrinkage of a convolution block.
///
/// Each kernel-3 sublayer loses 2 voxels in `valid` mode; `same` mode pads
/// inside the convolutions, so blocks preserve extent.
pub fn border(two_sublayers: bool, border_mode: &BorderMode) -> usize {
    match border_mode {
        BorderMode::Same => 0,
        BorderMode::Valid => {
            if two_sublayers {
                4
            } else {
                2
            }
        }
    }
}

/// Extent after the entry convolution block.
pub fn first_step(x: usize, border: usize) -> usize {
    debug_assert!(x >= border + 1);
    x - border
}

/// Extent after one encoder stage: stride-2 halving, then a block.
///
/// The halving is exact; callers present even extents, which the reverse
/// chain guarantees for every shape it emits.
pub fn down_step(x: usize, border: usize) -> usize {
    debug_assert!(x % 2 == 0);
    debug_assert!(x / 2 >= border + 1);
    x / 2 - border
}

/// Extent after one decoder stage: stride-2 doubling, then a block.
pub fn up_step(x: usize, border: usize) -> usize {
    debug_assert!(2 * x >= border + 1);
    2 * x - border
}

/// Smallest extent whose entry block yields `x`.
pub fn reverse_first_step(x: usize, border: usize) -> usize {
    x + border
}

/// Smallest extent whose encoder stage yields `x`.
pub fn reverse_down_step(x: usize, border: usize) -> usize {
    (x + border) * 2
}

/// Smallest extent whose decoder stage yields at least `x`.
///
/// The ceiling-division inverse of the stride-2 doubling: the decoder may
/// overshoot an odd target by one voxel, never undershoot.
pub fn reverse_up_step(x: usize, border: usize) -> usize {
    (x + border - 1) / 2 + 1
}

/// Smallest per-axis extents the network can traverse that come out at least
/// as large as `desired` after the full down/up pass.
pub fn minimal_shape(desired: &[usize], nb_steps: usize, border: usize) -> Vec<usize> {
    desired
        .iter()
        .map(|&d| {
            debug_assert!(d > 0, "spatial extents must be positive");
            let mut x = d;
            for _ in 0..nb_steps {
                x = reverse_up_step(x, border);
            }
            for _ in 0..nb_steps {
                x = reverse_down_step(x, border);
            }
            reverse_first_step(x, border)
        })
        .collect()
}

/// Zero-padding amounts turning a desired spatial shape into the minimal
/// traversable shape, plus their exact negation for cropping afterwards.
///
/// All per-axis sequences share the axis order of the shape the plan was
/// computed from (the compute-layout spatial order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddingPlan {
    /// Spatial shape the plan was computed for.
    pub desired: Vec<usize>,
    /// Smallest traversable shape; equals the padded input shape.
    pub minimal: Vec<usize>,
    /// (low, high) zero-padding per axis.
    pub forward: Vec<(usize, usize)>,
    /// Exact negation of `forward`; negative padding means cropping.
    pub inverse: Vec<(i64, i64)>,
}

impl PaddingPlan {
    /// Compute the plan for a desired spatial shape and topology parameters.
    ///
    /// When the gap between minimal and desired extent is odd, the extra
    /// voxel of padding goes to the high side.
    pub fn compute(
        desired: &[usize],
        nb_steps: usize,
        two_sublayers: bool,
        border_mode: &BorderMode,
    ) -> Self {
        let border = border(two_sublayers, border_mode);
        let minimal = minimal_shape(desired, nb_steps, border);

        // minimal >= desired per axis: the reverse chain only grows extents.
        let forward: Vec<(usize, usize)> = minimal
            .iter()
            .zip(desired)
            .map(|(&m, &d)| {
                let diff = m - d;
                let low = diff / 2;
                (low, diff - low)
            })
            .collect();
        let inverse = forward
            .iter()
            .map(|&(low, high)| (-(low as i64), -(high as i64)))
            .collect();

        Self {
            desired: desired.to_vec(),
            minimal,
            forward,
            inverse,
        }
    }

    /// Padded per-axis extents (identical to the minimal shape).
    pub fn padded_shape(&self) -> &[usize] {
        &self.minimal
    }

    /// True when no axis needs padding.
    pub fn is_identity(&self) -> bool {
        self.forward.iter().all(|&(low, high)| low == 0 && high == 0)
    }
}
