//! Data transformations between the simulation's data layout and the
//! network's compute layout.
//!
//! The simulation exchanges fields as `[batch, s2, s1, s0, channels]` with a
//! trailing channel axis, or any flattening of that shape; the network
//! consumes `[batch, channels, s2, s1, s0]`. Three stages bracket every
//! prediction:
//!
//! 1. [`UNetTransform::transform_before_prediction`] reshapes into compute
//!    layout and zero-pads up to the minimal traversable extents.
//! 2. [`UNetTransform::transform_before_loss`] crops the prediction back and
//!    restores data layout; the ground truth is reshaped and scaled.
//! 3. [`UNetTransform::transform_before_apply`] removes the training scale
//!    so the prediction lives in simulation units again.

use burn::prelude::*;

use super::geometry::PaddingPlan;
use super::UNetTopology;
use crate::error::{ModelError, Result};

/// Three-stage data pipeline around a U-Net prediction.
///
/// The padding plan is computed from the topology on the first input and
/// reused for the lifetime of the pipeline; later batches may vary in size
/// but must share the sample geometry.
#[derive(Debug, Clone)]
pub struct UNetTransform {
    topology: UNetTopology,
    plan: Option<PaddingPlan>,
}

impl UNetTransform {
    pub fn new(topology: UNetTopology) -> Self {
        Self {
            topology,
            plan: None,
        }
    }

    /// Structural parameters the pipeline was built from.
    pub fn topology(&self) -> &UNetTopology {
        &self.topology
    }

    /// The cached padding plan, once an input has been transformed.
    pub fn padding_plan(&self) -> Option<&PaddingPlan> {
        self.plan.as_ref()
    }

    /// Reshape a raw input batch into compute layout and zero-pad it.
    ///
    /// The input may arrive flat or loosely shaped; its element count must
    /// be a whole multiple of one sample. The first call computes and caches
    /// the padding plan, later calls reuse it unconditionally.
    pub fn transform_before_prediction<B: Backend, const D: usize>(
        &mut self,
        data_in: Tensor<B, D>,
    ) -> Result<Tensor<B, 5>> {
        let [s0, s1, s2] = self.topology.input_size;
        let channels = self.topology.nb_input_channels;
        let batch = infer_batch(&data_in.dims(), &[s2, s1, s0, channels])?;

        // [batch, s2, s1, s0, C] -> [batch, C, s2, s1, s0]
        let data = data_in
            .reshape([batch, s2, s1, s0, channels])
            .permute([0, 4, 1, 2, 3]);

        let topology = &self.topology;
        let plan = self.plan.get_or_insert_with(|| {
            PaddingPlan::compute(
                &[s2, s1, s0],
                topology.nb_steps,
                topology.two_sublayers,
                &topology.border_mode,
            )
        });
        if plan.is_identity() {
            return Ok(data);
        }

        let device = data.device();
        let padded_dims = [
            batch,
            channels,
            plan.minimal[0],
            plan.minimal[1],
            plan.minimal[2],
        ];
        let mut ranges = [0..batch, 0..channels, 0..0, 0..0, 0..0];
        for (axis, (&(low, _), &desired)) in plan.forward.iter().zip(&plan.desired).enumerate() {
            ranges[axis + 2] = low..low + desired;
        }
        Ok(Tensor::zeros(padded_dims, &device).slice_assign(ranges, data))
    }

    /// Crop a prediction back to the desired extents and restore data
    /// layout; reshape and scale the ground truth when present.
    ///
    /// Requires a cached plan, so a prediction must have been transformed
    /// first.
    pub fn transform_before_loss<B: Backend, const D: usize>(
        &self,
        data_out: Tensor<B, 5>,
        data_gt: Option<Tensor<B, D>>,
    ) -> Result<(Tensor<B, 5>, Option<Tensor<B, 5>>)> {
        let plan = self.plan.as_ref().ok_or(ModelError::PlanNotReady)?;

        let data_gt = match data_gt {
            Some(gt) => {
                let [s0, s1, s2] = self.topology.input_size;
                let channels = self.topology.nb_output_channels;
                let batch = infer_batch(&gt.dims(), &[s2, s1, s0, channels])?;
                Some(
                    gt.reshape([batch, s2, s1, s0, channels])
                        .mul_scalar(self.topology.data_scale),
                )
            }
            None => None,
        };

        let dims = data_out.dims();
        let cropped = if plan.is_identity() {
            data_out
        } else {
            // Consume the stored negative pads as crop margins.
            let mut ranges = [0..dims[0], 0..dims[1], 0..0, 0..0, 0..0];
            for (axis, &(low, high)) in plan.inverse.iter().enumerate() {
                let low = (-low) as usize;
                let high = (-high) as usize;
                match dims[axis + 2].checked_sub(high) {
                    Some(end) if end > low => ranges[axis + 2] = low..end,
                    _ => {
                        return Err(ModelError::incompatible_data(
                            plan.minimal.clone(),
                            dims[2..].to_vec(),
                        ))
                    }
                }
            }
            data_out.slice(ranges)
        };

        // [batch, C, s2, s1, s0] -> [batch, s2, s1, s0, C]
        Ok((cropped.permute([0, 2, 3, 4, 1]), data_gt))
    }

    /// Remove the training scale so the prediction lives in simulation
    /// units. Shape-preserving for any rank.
    pub fn transform_before_apply<B: Backend, const D: usize>(
        &self,
        data_out: Tensor<B, D>,
    ) -> Tensor<B, D> {
        data_out.div_scalar(self.topology.data_scale)
    }
}

/// Batch extent implied by a raw tensor's element count and one sample's
/// layout. Errors when the count is not a whole multiple of a sample.
fn infer_batch(dims: &[usize], sample_layout: &[usize]) -> Result<usize> {
    let total: usize = dims.iter().product();
    let sample: usize = sample_layout.iter().product();
    if sample == 0 || total % sample != 0 {
        return Err(ModelError::incompatible_data(
            sample_layout.to_vec(),
            dims.to_vec(),
        ));
    }
    Ok(total / sample)
}
