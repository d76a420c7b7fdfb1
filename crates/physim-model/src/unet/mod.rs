//! 3-D U-Net over voxel-grid physics fields.
//!
//! The architecture, the padding inference that feeds arbitrary grid extents
//! through it, and the data-layout transformations bracketing each
//! prediction all derive from one [`UNetTopology`] record, so the three
//! stay structurally consistent by construction.

pub mod geometry;
mod network;
mod transform;

pub use network::{ConvBlock, ConvBlockConfig, DownStage, UNet, UpStage};
pub use transform::UNetTransform;

use burn::prelude::*;

use crate::error::ModelError;

/// Convolution padding policy of the kernel-3 blocks.
#[derive(Config, Debug, PartialEq)]
pub enum BorderMode {
    /// No implicit padding: each kernel-3 sublayer shrinks the extent by 2.
    Valid,
    /// Implicit padding of 1: blocks preserve spatial extent.
    Same,
}

/// Structural parameters shared by the network and its data pipeline.
///
/// Both consumers must observe identical values: the padding inference in
/// [`geometry`] encodes the same receptive-field arithmetic as the layer
/// stack built by [`UNetTopology::init`].
#[derive(Config, Debug)]
pub struct UNetTopology {
    /// Spatial extents of one sample in data layout; index 0 is the
    /// fastest-varying axis of a flattened sample.
    pub input_size: [usize; 3],
    /// Channels of the input field.
    #[config(default = 1)]
    pub nb_input_channels: usize,
    /// Channels of the predicted field.
    #[config(default = 3)]
    pub nb_output_channels: usize,
    /// Channels after the entry block; doubled at every down-step.
    #[config(default = 64)]
    pub nb_first_layer_channels: usize,
    /// Down/up stage count on each side of the U.
    #[config(default = 3)]
    pub nb_steps: usize,
    /// Two convolution sublayers per block instead of one.
    #[config(default = true)]
    pub two_sublayers: bool,
    /// Padding policy of the kernel-3 convolutions.
    #[config(default = "BorderMode::Valid")]
    pub border_mode: BorderMode,
    /// Bypass the encoder-to-decoder concatenations.
    #[config(default = false)]
    pub skip_merge: bool,
    /// Multiplier applied to ground truth before the loss and removed from
    /// predictions before they are applied to the simulation.
    #[config(default = 1.0)]
    pub data_scale: f64,
}

impl UNetTopology {
    /// Check the construction-time value constraints.
    ///
    /// Extents and channel counts must be positive, `data_scale` strictly
    /// positive. A zero `nb_steps` is legal: the network degenerates to the
    /// entry block and the final projection.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.input_size.iter().any(|&extent| extent == 0) {
            return Err(ModelError::invalid_topology(format!(
                "input_size must have positive extents, got {:?}",
                self.input_size
            )));
        }
        if self.nb_input_channels == 0 {
            return Err(ModelError::invalid_topology(
                "nb_input_channels must be positive",
            ));
        }
        if self.nb_output_channels == 0 {
            return Err(ModelError::invalid_topology(
                "nb_output_channels must be positive",
            ));
        }
        if self.nb_first_layer_channels == 0 {
            return Err(ModelError::invalid_topology(
                "nb_first_layer_channels must be positive",
            ));
        }
        if self.data_scale <= 0.0 {
            return Err(ModelError::invalid_topology(format!(
                "data_scale must be strictly positive, got {}",
                self.data_scale
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_topology() {
        let topology = UNetTopology::new([10, 10, 10]);
        assert_eq!(topology.nb_input_channels, 1);
        assert_eq!(topology.nb_output_channels, 3);
        assert_eq!(topology.nb_first_layer_channels, 64);
        assert_eq!(topology.nb_steps, 3);
        assert!(topology.two_sublayers);
        assert_eq!(topology.border_mode, BorderMode::Valid);
        assert!(!topology.skip_merge);
        assert_eq!(topology.data_scale, 1.0);
        assert!(topology.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_extents() {
        assert!(UNetTopology::new([0, 10, 10]).validate().is_err());
        assert!(UNetTopology::new([10, 0, 10]).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_channels() {
        let base = UNetTopology::new([10, 10, 10]);
        assert!(base.clone().with_nb_input_channels(0).validate().is_err());
        assert!(base.clone().with_nb_output_channels(0).validate().is_err());
        assert!(base
            .clone()
            .with_nb_first_layer_channels(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_rejects_non_positive_scale() {
        let base = UNetTopology::new([10, 10, 10]);
        assert!(base.clone().with_data_scale(0.0).validate().is_err());
        assert!(base.with_data_scale(-1.0).validate().is_err());
    }

    #[test]
    fn test_zero_steps_is_legal() {
        assert!(UNetTopology::new([10, 10, 10])
            .with_nb_steps(0)
            .validate()
            .is_ok());
    }
}
