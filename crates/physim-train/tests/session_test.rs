use burn::backend::Autodiff;
use burn::tensor::{Distribution, Tensor};
use burn_ndarray::NdArray;
use physim_model::{BorderMode, PersistableParameters, UNetTopology};
use physim_train::{TrainError, UNetConfig};

type Backend = Autodiff<NdArray<f32>>;
type InferenceBackend = NdArray<f32>;

fn small_topology() -> UNetTopology {
    UNetTopology::new([6, 6, 6])
        .with_nb_first_layer_channels(2)
        .with_nb_steps(1)
        .with_border_mode(BorderMode::Same)
}

#[test]
fn test_training_session_reduces_loss() {
    let device = Default::default();
    let config = UNetConfig::new(small_topology())
        .with_learning_rate(Some(1e-2))
        .with_require_training(true);

    let mut network = config.create_network::<Backend>(&device).unwrap();
    let mut optimization = config.create_optimization().unwrap();
    let mut transform = config.create_data_transformation().unwrap();

    // A fixed batch: the network learns to null its own output.
    let field = Tensor::<Backend, 3>::random([6, 6, 6], Distribution::Default, &device);
    let truth = Tensor::<Backend, 1>::zeros([6 * 6 * 6 * 3], &device);

    let mut history = Vec::new();
    for _ in 0..15 {
        let input = transform
            .transform_before_prediction(field.clone())
            .unwrap();
        let prediction = network.forward(input);
        let (prediction, target) = transform
            .transform_before_loss(prediction, Some(truth.clone()))
            .unwrap();
        let loss = optimization.compute_loss(prediction, target.unwrap());
        history.push(loss.clone().into_scalar());
        network = optimization.optimize(loss, network).unwrap();
    }

    let first = history.first().copied().unwrap();
    let last = history.last().copied().unwrap();
    assert!(
        last < first,
        "loss should decrease over the session: {first} -> {last}"
    );
}

#[test]
fn test_saved_session_restores_identical_network() {
    let device = Default::default();
    let dir = tempfile::tempdir().unwrap();

    let train_config = UNetConfig::new(small_topology());
    let network = train_config
        .create_network::<InferenceBackend>(&device)
        .unwrap();
    network
        .save_parameters(train_config.parameter_path(dir.path(), 0))
        .unwrap();

    let field =
        Tensor::<InferenceBackend, 5>::random([1, 1, 6, 6, 6], Distribution::Default, &device);
    let expected = network.forward(field.clone());

    // A fresh session pointed at the directory restores the same parameters.
    let apply_config = UNetConfig::new(small_topology())
        .with_network_dir(Some(dir.path().to_string_lossy().into_owned()));
    let restored = apply_config
        .create_network::<InferenceBackend>(&device)
        .unwrap();
    let difference = (expected - restored.forward(field)).abs().max().into_scalar();
    assert!(difference < 1e-6);
}

#[test]
fn test_which_network_selects_among_snapshots() {
    let device = Default::default();
    let dir = tempfile::tempdir().unwrap();

    let config = UNetConfig::new(small_topology()).with_save_each_epoch(true);
    let first = config.create_network::<InferenceBackend>(&device).unwrap();
    first
        .save_parameters(config.parameter_path(dir.path(), 0))
        .unwrap();
    let second = config.create_network::<InferenceBackend>(&device).unwrap();
    second
        .save_parameters(config.parameter_path(dir.path(), 1))
        .unwrap();

    let field =
        Tensor::<InferenceBackend, 5>::random([1, 1, 6, 6, 6], Distribution::Default, &device);

    let load = |which: usize| {
        UNetConfig::new(small_topology())
            .with_network_dir(Some(dir.path().to_string_lossy().into_owned()))
            .with_which_network(which)
            .create_network::<InferenceBackend>(&device)
    };
    let restored_first = load(0).unwrap();
    let difference = (first.forward(field.clone()) - restored_first.forward(field.clone()))
        .abs()
        .max()
        .into_scalar();
    assert!(difference < 1e-6);

    let err = load(5).unwrap_err();
    assert!(matches!(err, TrainError::AmbiguousSavedParameters { .. }));
}

#[test]
fn test_session_without_records_reports_it() {
    let device = Default::default();
    let dir = tempfile::tempdir().unwrap();
    let config = UNetConfig::new(small_topology())
        .with_network_dir(Some(dir.path().to_string_lossy().into_owned()));
    let err = config.create_network::<InferenceBackend>(&device).unwrap_err();
    assert!(matches!(err, TrainError::NoSavedParameters { .. }));
}
