//! U-Net Training Example
//!
//! This example trains a small 3-D U-Net on a synthetic physics task: each
//! voxel of the input excitation field maps to three scaled displacement
//! components. It shows the complete session workflow:
//!
//! 1. Describe the session with a topology and a learning rate
//! 2. Create the network, optimization, and data pipeline from it
//! 3. Run the training loop on simulation-layout batches
//! 4. Save the trained parameters for the apply example
//!
//! Usage:
//!   cargo run --example unet_train

use std::fs;
use std::path::Path;
use std::time::Instant;

use burn::backend::Autodiff;
use burn::module::AutodiffModule;
use burn::tensor::{Distribution, Tensor};
use burn_ndarray::NdArray;
use physim_model::{BorderMode, PersistableParameters, UNetTopology};
use physim_train::UNetConfig;

type Backend = Autodiff<NdArray<f32>>;

const ARTIFACT_DIR: &str = "artifacts";
const GRID: usize = 16;

fn main() -> anyhow::Result<()> {
    println!("physim U-Net Training Example");
    println!("=============================\n");

    tracing_subscriber::fmt().with_env_filter("info").init();

    let device = Default::default();

    // =======================================================================
    // Step 1: Describe the session
    // =======================================================================
    println!("Step 1: Configuring session...");
    let topology = UNetTopology::new([GRID, GRID, GRID])
        .with_nb_first_layer_channels(8)
        .with_nb_steps(2)
        .with_border_mode(BorderMode::Same);
    let config = UNetConfig::new(topology)
        .with_learning_rate(Some(1e-3))
        .with_require_training(true);

    // =======================================================================
    // Step 2: Create the session pieces
    // =======================================================================
    println!("Step 2: Creating network, optimization, and data pipeline...");
    let mut network = config.create_network::<Backend>(&device)?;
    let mut optimization = config.create_optimization()?;
    let mut transform = config.create_data_transformation()?;
    println!("  Network parameters: {}", network.nb_parameters());

    // =======================================================================
    // Step 3: Training loop
    // =======================================================================
    let epochs = 10;
    let batch_size = 2;
    println!("Step 3: Training for {} epochs...", epochs);

    for epoch in 0..epochs {
        let start = Instant::now();
        let (field, truth) = synthetic_batch(batch_size, &device);

        let input = transform.transform_before_prediction(field)?;
        let prediction = network.forward(input);
        let (prediction, target) = transform.transform_before_loss(prediction, Some(truth))?;

        let loss = optimization.compute_loss(prediction, target.unwrap());
        let loss_value: f32 = loss.clone().into_scalar();
        network = optimization.optimize(loss, network)?;

        println!(
            "Epoch {} | Loss: {:.6} | Time: {:?}",
            epoch,
            loss_value,
            start.elapsed()
        );
    }

    // =======================================================================
    // Step 4: Save the trained parameters
    // =======================================================================
    println!("Step 4: Saving parameters...");
    fs::create_dir_all(ARTIFACT_DIR)?;
    let path = config.parameter_path(Path::new(ARTIFACT_DIR), epochs - 1);
    network.save_parameters(&path)?;
    println!("  Saved to {}.mpk", path.display());

    // Quick sanity check with the inference-side module.
    let inference = network.valid();
    let (field, _) = synthetic_batch::<NdArray<f32>>(1, &Default::default());
    let input = transform.transform_before_prediction(field)?;
    let prediction = inference.forward(input);
    println!("  Inference output shape: {:?}", prediction.dims());

    println!("\nTraining finished successfully!");
    Ok(())
}

/// Builds one synthetic batch: an excitation field and its three scaled
/// displacement components in simulation layout.
fn synthetic_batch<B: burn::prelude::Backend>(
    batch_size: usize,
    device: &B::Device,
) -> (Tensor<B, 4>, Tensor<B, 5>) {
    let field = Tensor::<B, 4>::random(
        [batch_size, GRID, GRID, GRID],
        Distribution::Normal(0.0, 1.0),
        device,
    );
    let component = |scale: f64| {
        field
            .clone()
            .mul_scalar(scale)
            .reshape([batch_size, GRID, GRID, GRID, 1])
    };
    let truth = Tensor::cat(vec![component(0.8), component(0.5), component(0.2)], 4);
    (field, truth)
}
