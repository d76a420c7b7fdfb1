//! Session configuration wiring a network to its optimization and data
//! pipeline.
//!
//! One [`UNetConfig`] describes a whole training or prediction session. The
//! factories validate it eagerly and hand the manager the three pieces it
//! drives: the network, the [`Optimization`] wrapper, and the
//! [`UNetTransform`] pipeline, all built from the same topology record.

use std::path::{Path, PathBuf};

use burn::module::AutodiffModule;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use physim_model::unet::{UNet, UNetTopology, UNetTransform};
use physim_model::PersistableParameters;

use crate::checkpoint;
use crate::error::{Result as TrainResult, TrainError};
use crate::optimization::Optimization;

/// Immutable description of one network session.
#[derive(Config, Debug)]
pub struct UNetConfig {
    /// Structural parameters shared by the network and its data pipeline.
    pub topology: UNetTopology,
    /// Base name of saved parameter records.
    #[config(default = "String::from(\"unet\")")]
    pub network_name: String,
    /// Directory holding previously saved parameters to restore.
    pub network_dir: Option<String>,
    /// Index of the record to restore when several were saved.
    #[config(default = 0)]
    pub which_network: usize,
    /// Keep a snapshot per epoch instead of one rolling record.
    #[config(default = false)]
    pub save_each_epoch: bool,
    /// Adam learning rate; required when `require_training` is set.
    pub learning_rate: Option<f64>,
    /// Reject the session unless it is able to train.
    #[config(default = false)]
    pub require_training: bool,
}

impl UNetConfig {
    /// Check the session and topology constraints.
    ///
    /// A configured network directory must already exist; a training session
    /// must carry a positive learning rate.
    pub fn validate(&self) -> TrainResult<()> {
        self.topology.validate()?;
        if let Some(learning_rate) = self.learning_rate {
            if learning_rate <= 0.0 {
                return Err(TrainError::invalid_session(format!(
                    "learning rate must be strictly positive, got {learning_rate}"
                )));
            }
        }
        if self.require_training && self.learning_rate.is_none() {
            return Err(TrainError::invalid_session(
                "training requires a learning rate",
            ));
        }
        if let Some(dir) = &self.network_dir {
            if !Path::new(dir).is_dir() {
                return Err(TrainError::NetworkDirMissing {
                    path: PathBuf::from(dir),
                });
            }
        }
        Ok(())
    }

    /// Build the network on `device`, restoring saved parameters when a
    /// network directory is configured.
    pub fn create_network<B: Backend>(&self, device: &B::Device) -> TrainResult<UNet<B>> {
        self.validate()?;
        let network = self.topology.init::<B>(device);
        match &self.network_dir {
            Some(dir) => {
                let record = checkpoint::find_saved_parameters(Path::new(dir), self.which_network)?;
                tracing::info!("Restoring network parameters from {:?}", record);
                Ok(network.load_parameters(&record, device)?)
            }
            None => Ok(network),
        }
    }

    /// Build the optimization wrapper for this session.
    pub fn create_optimization<M, B>(&self) -> TrainResult<Optimization<M, B>>
    where
        M: AutodiffModule<B>,
        B: AutodiffBackend,
    {
        self.validate()?;
        Ok(match self.learning_rate {
            Some(learning_rate) => Optimization::new(learning_rate),
            None => Optimization::without_optimizer(),
        })
    }

    /// Build the data-transformation pipeline for this session.
    pub fn create_data_transformation(&self) -> TrainResult<UNetTransform> {
        self.validate()?;
        Ok(UNetTransform::new(self.topology.clone()))
    }

    /// Record path for this session's save policy at the given epoch.
    pub fn parameter_path(&self, dir: &Path, epoch: usize) -> PathBuf {
        let epoch = self.save_each_epoch.then_some(epoch);
        checkpoint::parameter_path(dir, &self.network_name, epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use physim_model::BorderMode;

    type TestBackend = NdArray<f32>;

    fn small_topology() -> UNetTopology {
        UNetTopology::new([8, 8, 8])
            .with_nb_first_layer_channels(2)
            .with_nb_steps(1)
            .with_border_mode(BorderMode::Same)
    }

    #[test]
    fn test_default_session() {
        let config = UNetConfig::new(small_topology());
        assert_eq!(config.network_name, "unet");
        assert_eq!(config.which_network, 0);
        assert!(config.network_dir.is_none());
        assert!(!config.require_training);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_training_requires_learning_rate() {
        let config = UNetConfig::new(small_topology()).with_require_training(true);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, TrainError::InvalidSession(_)));

        let config = UNetConfig::new(small_topology())
            .with_require_training(true)
            .with_learning_rate(Some(1e-4));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_learning_rate() {
        let config = UNetConfig::new(small_topology()).with_learning_rate(Some(0.0));
        assert!(config.validate().is_err());
        let config = UNetConfig::new(small_topology()).with_learning_rate(Some(-1.0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_missing_network_dir() {
        let config = UNetConfig::new(small_topology())
            .with_network_dir(Some("no/such/directory".into()));
        let err = config.validate().unwrap_err();
        assert!(matches!(err, TrainError::NetworkDirMissing { .. }));
    }

    #[test]
    fn test_invalid_topology_surfaces_through_session() {
        let config = UNetConfig::new(UNetTopology::new([0, 8, 8]));
        let err = config.validate().unwrap_err();
        assert!(matches!(err, TrainError::Model(_)));
    }

    #[test]
    fn test_create_network_without_saved_parameters() {
        let device = Default::default();
        let config = UNetConfig::new(small_topology());
        let network = config.create_network::<TestBackend>(&device).unwrap();
        assert!(network.nb_parameters() > 0);
    }

    #[test]
    fn test_parameter_path_policy() {
        let dir = Path::new("sessions/beam");
        let rolling = UNetConfig::new(small_topology());
        assert_eq!(
            rolling.parameter_path(dir, 4),
            PathBuf::from("sessions/beam/unet")
        );
        let snapshots = UNetConfig::new(small_topology()).with_save_each_epoch(true);
        assert_eq!(
            snapshots.parameter_path(dir, 4),
            PathBuf::from("sessions/beam/unet_epoch_4")
        );
    }

    #[test]
    fn test_create_data_transformation_shares_topology() {
        let config = UNetConfig::new(small_topology());
        let transform = config.create_data_transformation().unwrap();
        assert_eq!(transform.topology().input_size, [8, 8, 8]);
    }
}
