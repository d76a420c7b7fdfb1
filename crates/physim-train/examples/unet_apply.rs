//! U-Net Prediction Example
//!
//! This example restores the parameters saved by the training example and
//! runs a prediction session without an optimizer:
//!
//! 1. Point the session at the saved network directory
//! 2. Restore the network on an inference backend
//! 3. Predict on a fresh excitation field
//! 4. Rescale the prediction into simulation units
//!
//! Usage:
//!   cargo run --example unet_train
//!   cargo run --example unet_apply

use burn::tensor::{Distribution, Tensor};
use burn_ndarray::NdArray;
use physim_model::{BorderMode, UNetTopology};
use physim_train::UNetConfig;
use std::path::Path;

type Backend = NdArray<f32>;

const ARTIFACT_DIR: &str = "artifacts";
const GRID: usize = 16;

fn main() -> anyhow::Result<()> {
    println!("physim U-Net Prediction Example");
    println!("===============================\n");

    tracing_subscriber::fmt().with_env_filter("info").init();

    let device = Default::default();

    if !Path::new(ARTIFACT_DIR).is_dir() {
        anyhow::bail!(
            "No saved network in {}. Run: cargo run --example unet_train",
            ARTIFACT_DIR
        );
    }

    // =======================================================================
    // Step 1: Describe the prediction session
    // =======================================================================
    println!("Step 1: Configuring session...");
    let topology = UNetTopology::new([GRID, GRID, GRID])
        .with_nb_first_layer_channels(8)
        .with_nb_steps(2)
        .with_border_mode(BorderMode::Same);
    let config = UNetConfig::new(topology).with_network_dir(Some(ARTIFACT_DIR.into()));

    // =======================================================================
    // Step 2: Restore the network
    // =======================================================================
    println!("Step 2: Restoring network parameters...");
    let network = config.create_network::<Backend>(&device)?;
    let mut transform = config.create_data_transformation()?;
    println!("  Network parameters: {}", network.nb_parameters());

    // =======================================================================
    // Step 3: Predict on a fresh field
    // =======================================================================
    println!("Step 3: Predicting...");
    let field = Tensor::<Backend, 3>::random(
        [GRID, GRID, GRID],
        Distribution::Normal(0.0, 1.0),
        &device,
    );

    let input = transform.transform_before_prediction(field)?;
    let prediction = network.forward(input);
    let (prediction, _) = transform.transform_before_loss::<Backend, 3>(prediction, None)?;
    println!("  Prediction shape: {:?}", prediction.dims());

    // =======================================================================
    // Step 4: Back into simulation units
    // =======================================================================
    println!("Step 4: Rescaling for the simulation...");
    let displacement = transform.transform_before_apply(prediction);
    let magnitude: f32 = displacement
        .powf_scalar(2.0)
        .sum()
        .sqrt()
        .into_scalar();
    println!("  Displacement field norm: {:.4}", magnitude);

    println!("\nPrediction finished successfully!");
    Ok(())
}
