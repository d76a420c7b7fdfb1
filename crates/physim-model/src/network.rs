//! Capability contracts between network architectures and the services that
//! train and persist them.

use std::path::Path;

use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, RecorderError};

use crate::unet::UNet;

/// Inference surface every architecture exposes to the outside manager.
pub trait Trainable<B: Backend> {
    /// Raw forward pass in compute layout.
    fn forward(&self, input: Tensor<B, 5>) -> Tensor<B, 5>;

    /// Total number of trainable parameters.
    fn nb_parameters(&self) -> usize;
}

/// Saving and restoring of parameter records.
///
/// Paths are given without extension; the record format appends its own.
pub trait PersistableParameters<B: Backend>: Sized {
    fn save_parameters<P: AsRef<Path>>(&self, path: P) -> Result<(), RecorderError>;

    fn load_parameters<P: AsRef<Path>>(
        self,
        path: P,
        device: &B::Device,
    ) -> Result<Self, RecorderError>;
}

impl<B: Backend> Trainable<B> for UNet<B> {
    fn forward(&self, input: Tensor<B, 5>) -> Tensor<B, 5> {
        UNet::forward(self, input)
    }

    fn nb_parameters(&self) -> usize {
        self.num_params()
    }
}

impl<B: Backend> PersistableParameters<B> for UNet<B> {
    fn save_parameters<P: AsRef<Path>>(&self, path: P) -> Result<(), RecorderError> {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        self.clone().save_file(path.as_ref().to_path_buf(), &recorder)
    }

    fn load_parameters<P: AsRef<Path>>(
        self,
        path: P,
        device: &B::Device,
    ) -> Result<Self, RecorderError> {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        self.load_file(path.as_ref().to_path_buf(), &recorder, device)
    }
}
