use burn::backend::Autodiff;
use burn::optim::GradientsParams;
use burn::prelude::Backend as BackendTrait;
use burn::tensor::{Distribution, Tensor};
use burn_ndarray::NdArray;
use physim_model::{BorderMode, UNet, UNetTopology};
use physim_train::UNetConfig;

type Inner = NdArray<f32>;
type Backend = Autodiff<Inner>;

fn small_topology() -> UNetTopology {
    UNetTopology::new([6, 6, 6])
        .with_nb_first_layer_channels(2)
        .with_nb_steps(1)
        .with_border_mode(BorderMode::Same)
}

fn named_params(net: &UNet<Backend>) -> Vec<(String, burn::module::ParamId, usize)> {
    let mut out: Vec<(String, burn::module::ParamId, usize)> = Vec::new();
    for (i, stage) in net.down.iter().enumerate() {
        if let Some(down) = &stage.down {
            out.push((format!("down[{i}].down.weight"), down.weight.id, 5));
            if let Some(b) = &down.bias {
                out.push((format!("down[{i}].down.bias"), b.id, 1));
            }
        }
        for (j, conv) in stage.block.convs.iter().enumerate() {
            out.push((format!("down[{i}].block.convs[{j}].weight"), conv.weight.id, 5));
            if let Some(b) = &conv.bias {
                out.push((format!("down[{i}].block.convs[{j}].bias"), b.id, 1));
            }
        }
    }
    for (i, stage) in net.up.iter().enumerate() {
        out.push((format!("up[{i}].up.weight"), stage.up.weight.id, 5));
        if let Some(b) = &stage.up.bias {
            out.push((format!("up[{i}].up.bias"), b.id, 1));
        }
        for (j, conv) in stage.block.convs.iter().enumerate() {
            out.push((format!("up[{i}].block.convs[{j}].weight"), conv.weight.id, 5));
            if let Some(b) = &conv.bias {
                out.push((format!("up[{i}].block.convs[{j}].bias"), b.id, 1));
            }
        }
    }
    out.push(("final_layer.weight".into(), net.final_layer.weight.id, 5));
    if let Some(b) = &net.final_layer.bias {
        out.push(("final_layer.bias".into(), b.id, 1));
    }
    out
}

fn check_ops(name: &str, g: Tensor<Inner, 5>) {
    let a: Vec<f32> = g.to_data().to_vec().unwrap();

    // op 1: mul_scalar
    let b: Vec<f32> = g.clone().mul_scalar(0.5).to_data().to_vec().unwrap();
    let mul_mismatch = a
        .iter()
        .zip(&b)
        .filter(|(x, y)| (**x * 0.5 - **y).abs() > 1e-9)
        .count();

    // op 2: powf_scalar(2.0)
    let c: Vec<f32> = g.clone().powf_scalar(2.0).to_data().to_vec().unwrap();
    let pow_mismatch = a
        .iter()
        .zip(&c)
        .filter(|(x, y)| (**x * **x - **y).abs() > 1e-9)
        .count();

    // op 3: the adam composite m/(sqrt(v)+eps) with m=0.1g, v=0.001g^2
    let m = g.clone().mul_scalar(0.1);
    let v = g.clone().powf_scalar(2.0).mul_scalar(0.001);
    let m_hat = m.div_scalar(0.1);
    let v_hat = v.div_scalar(0.001);
    let update: Vec<f32> = m_hat
        .div(v_hat.sqrt().add_scalar(1e-5))
        .to_data()
        .to_vec()
        .unwrap();
    let comp_mismatch = a
        .iter()
        .zip(&update)
        .filter(|(x, y)| {
            let expected = **x / (x.abs() + 1e-5);
            (expected - **y).abs() > 1e-3
        })
        .count();

    println!(
        "{name}: n={} mul_mismatch={mul_mismatch} pow_mismatch={pow_mismatch} composite_mismatch={comp_mismatch}",
        a.len()
    );
    if comp_mismatch > 0 {
        for (i, (x, y)) in a.iter().zip(&update).enumerate() {
            let expected = *x / (x.abs() + 1e-5);
            if (expected - *y).abs() > 1e-3 {
                println!("    el[{i}]: g={x} expected update {expected}, got {y}");
                if i > 60 {
                    break;
                }
            }
        }
    }
}

fn main() {
    <Backend as BackendTrait>::seed(5);
    let device = Default::default();
    let config = UNetConfig::new(small_topology())
        .with_learning_rate(Some(1e-2))
        .with_require_training(true);

    let network = config.create_network::<Backend>(&device).unwrap();
    let mut transform = config.create_data_transformation().unwrap();

    let field = Tensor::<Backend, 3>::random([6, 6, 6], Distribution::Default, &device);
    let truth = Tensor::<Backend, 1>::zeros([6 * 6 * 6 * 3], &device);

    let input = transform
        .transform_before_prediction(field.clone())
        .unwrap();
    let prediction = network.forward(input);
    let (prediction, target) = transform
        .transform_before_loss(prediction, Some(truth.clone()))
        .unwrap();
    let diff = prediction.clone() - target.clone().unwrap();
    let loss = diff.clone().powf_scalar(2.0).mean();
    println!("loss={}", loss.clone().into_scalar());

    let grads = loss.backward();
    let grads = GradientsParams::from_grads(grads, &network);

    for (name, id, d) in named_params(&network) {
        if d == 5 {
            if let Some(g) = grads.get::<Inner, 5>(id) {
                check_ops(&name, g);
            } else {
                println!("{name}: NO GRADIENT");
            }
        }
    }
}
