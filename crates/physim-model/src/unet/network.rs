use burn::{
    nn::{
        conv::{Conv3d, Conv3dConfig, ConvTranspose3d, ConvTranspose3dConfig},
        PaddingConfig3d, Relu,
    },
    prelude::*,
};

use super::{BorderMode, UNetTopology};

/// One or two kernel-3 convolution sublayers, each followed by ReLU.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub convs: Vec<Conv3d<B>>,
    pub activation: Relu,
}

#[derive(Config, Debug)]
pub struct ConvBlockConfig {
    pub in_channels: usize,
    pub out_channels: usize,
    #[config(default = true)]
    pub two_sublayers: bool,
    #[config(default = "PaddingConfig3d::Valid")]
    pub padding: PaddingConfig3d,
}

impl ConvBlockConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConvBlock<B> {
        let mut convs = vec![
            Conv3dConfig::new([self.in_channels, self.out_channels], [3, 3, 3])
                .with_padding(self.padding.clone())
                .init(device),
        ];
        if self.two_sublayers {
            convs.push(
                Conv3dConfig::new([self.out_channels, self.out_channels], [3, 3, 3])
                    .with_padding(self.padding.clone())
                    .init(device),
            );
        }
        ConvBlock {
            convs,
            activation: Relu::new(),
        }
    }
}

impl<B: Backend> ConvBlock<B> {
    pub fn forward(&self, input: Tensor<B, 5>) -> Tensor<B, 5> {
        self.convs
            .iter()
            .fold(input, |x, conv| self.activation.forward(conv.forward(x)))
    }
}

/// Encoder stage: optional stride-2 down-convolution, then a block.
///
/// The entry stage carries no down-convolution, so a network with `nb_steps`
/// halvings holds `nb_steps + 1` encoder stages.
#[derive(Module, Debug)]
pub struct DownStage<B: Backend> {
    pub down: Option<Conv3d<B>>,
    pub block: ConvBlock<B>,
}

impl<B: Backend> DownStage<B> {
    pub fn forward(&self, input: Tensor<B, 5>) -> Tensor<B, 5> {
        let x = match &self.down {
            Some(down) => down.forward(input),
            None => input,
        };
        self.block.forward(x)
    }
}

/// Decoder stage: stride-2 transpose convolution, skip merge, then a block.
#[derive(Module, Debug)]
pub struct UpStage<B: Backend> {
    pub up: ConvTranspose3d<B>,
    pub block: ConvBlock<B>,
    pub merge: bool,
}

impl<B: Backend> UpStage<B> {
    /// `skip` is the matching encoder output. In `valid` border mode its
    /// extents exceed the upsampled ones and are center-cropped first.
    pub fn forward(&self, input: Tensor<B, 5>, skip: Option<Tensor<B, 5>>) -> Tensor<B, 5> {
        let x = self.up.forward(input);
        let x = match skip {
            Some(skip) if self.merge => {
                let skip = crop_to_match(skip, &x);
                Tensor::cat(vec![x, skip], 1)
            }
            _ => x,
        };
        self.block.forward(x)
    }
}

/// Center-crop the spatial axes of `skip` to the extents of `target`.
fn crop_to_match<B: Backend>(skip: Tensor<B, 5>, target: &Tensor<B, 5>) -> Tensor<B, 5> {
    let skip_dims = skip.dims();
    let target_dims = target.dims();
    if skip_dims == target_dims {
        return skip;
    }
    let mut ranges = [
        0..skip_dims[0],
        0..skip_dims[1],
        0..skip_dims[2],
        0..skip_dims[3],
        0..skip_dims[4],
    ];
    for axis in 2..5 {
        let start = (skip_dims[axis] - target_dims[axis]) / 2;
        ranges[axis] = start..start + target_dims[axis];
    }
    skip.slice(ranges)
}

/// 3-D U-Net assembled from a [`UNetTopology`].
#[derive(Module, Debug)]
pub struct UNet<B: Backend> {
    pub down: Vec<DownStage<B>>,
    pub up: Vec<UpStage<B>>,
    pub final_layer: Conv3d<B>,
}

impl UNetTopology {
    /// Build the network on `device`.
    ///
    /// Counts are taken as-is; run [`UNetTopology::validate`] first when the
    /// record comes from an untrusted session description.
    pub fn init<B: Backend>(&self, device: &B::Device) -> UNet<B> {
        let flc = self.nb_first_layer_channels;
        let padding = match self.border_mode {
            BorderMode::Valid => PaddingConfig3d::Valid,
            BorderMode::Same => PaddingConfig3d::Explicit(1, 1, 1),
        };
        let block = |in_channels: usize, out_channels: usize| {
            ConvBlockConfig::new(in_channels, out_channels)
                .with_two_sublayers(self.two_sublayers)
                .with_padding(padding.clone())
        };

        // Encoder: entry block, then one halving stage per step.
        let mut down = Vec::with_capacity(self.nb_steps + 1);
        down.push(DownStage {
            down: None,
            block: block(self.nb_input_channels, flc).init(device),
        });
        for i in 0..self.nb_steps {
            let channels = flc << i;
            down.push(DownStage {
                down: Some(
                    Conv3dConfig::new([channels, channels * 2], [2, 2, 2])
                        .with_stride([2, 2, 2])
                        .init(device),
                ),
                block: block(channels * 2, channels * 2).init(device),
            });
        }

        // Decoder, mirrored. Concatenation happens in forward, so a merging
        // block sees the transpose output and the skip stacked on channels.
        let merge = !self.skip_merge;
        let mut up = Vec::with_capacity(self.nb_steps);
        for i in (0..self.nb_steps).rev() {
            let channels = flc << i;
            let block_in = if merge { channels * 2 } else { channels };
            up.push(UpStage {
                up: ConvTranspose3dConfig::new([channels * 2, channels], [2, 2, 2])
                    .with_stride([2, 2, 2])
                    .init(device),
                block: block(block_in, channels).init(device),
                merge,
            });
        }

        // Extent-preserving projection to the output field.
        let final_layer =
            Conv3dConfig::new([flc, self.nb_output_channels], [1, 1, 1]).init(device);

        UNet {
            down,
            up,
            final_layer,
        }
    }
}

impl<B: Backend> UNet<B> {
    /// Full encoder/decoder pass.
    ///
    /// Expects compute layout `[batch, channels, s2, s1, s0]` with spatial
    /// extents produced by the padding plan of the same topology.
    pub fn forward(&self, input: Tensor<B, 5>) -> Tensor<B, 5> {
        let bottom = self.down.len() - 1;
        let mut skips: Vec<Tensor<B, 5>> = Vec::with_capacity(bottom);
        let mut x = input;
        for (i, stage) in self.down.iter().enumerate() {
            x = stage.forward(x);
            if i < bottom {
                skips.push(x.clone());
            }
        }
        for stage in &self.up {
            x = stage.forward(x, skips.pop());
        }
        self.final_layer.forward(x)
    }

    /// Total number of trainable parameters.
    pub fn nb_parameters(&self) -> usize {
        self.num_params()
    }
}
