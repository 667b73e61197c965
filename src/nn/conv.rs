//! Convolutional layers

use super::layer::{Layer, LayerKind};
use crate::autograd::ops::{conv2d, conv_transpose2d, ConvDims, ConvTransposeDims};
use crate::autograd::Tensor;
use crate::data::ImageBatch;
use crate::latent::standard_normal;
use rand::Rng;

fn xavier_normal<R: Rng>(rng: &mut R, len: usize, fan_in: usize, fan_out: usize) -> Vec<f32> {
    let std = (2.0 / (fan_in + fan_out) as f64).sqrt() as f32;
    (0..len).map(|_| standard_normal(rng) * std).collect()
}

/// Strided 2-D convolution layer (square kernel)
pub struct Conv2d {
    weight: Tensor,
    bias: Tensor,
    in_channels: usize,
    out_channels: usize,
    kernel: usize,
    stride: usize,
    padding: usize,
}

impl Conv2d {
    /// Create a layer with Xavier-initialized weights and zero bias
    pub fn new<R: Rng>(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        padding: usize,
        rng: &mut R,
    ) -> Self {
        let fan = kernel * kernel;
        let weight = Tensor::from_vec(
            xavier_normal(
                rng,
                out_channels * in_channels * fan,
                in_channels * fan,
                out_channels * fan,
            ),
            true,
        );
        let bias = Tensor::zeros(out_channels, true);
        Self {
            weight,
            bias,
            in_channels,
            out_channels,
            kernel,
            stride,
            padding,
        }
    }
}

impl Layer for Conv2d {
    fn forward(&self, input: &ImageBatch) -> ImageBatch {
        let [batch, channels, h, w] = input.shape();
        assert_eq!(channels, self.in_channels, "Conv2d channel mismatch");
        let dims = ConvDims {
            batch,
            in_channels: self.in_channels,
            out_channels: self.out_channels,
            in_h: h,
            in_w: w,
            kernel: self.kernel,
            stride: self.stride,
            padding: self.padding,
        };
        let out = conv2d(input.tensor(), &self.weight, Some(&self.bias), &dims);
        ImageBatch::new(out, [batch, self.out_channels, dims.out_h(), dims.out_w()])
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Convolutional
    }

    fn parameters(&self) -> Vec<Tensor> {
        vec![self.weight.clone(), self.bias.clone()]
    }

    fn weight(&self) -> Option<Tensor> {
        Some(self.weight.clone())
    }

    fn bias(&self) -> Option<Tensor> {
        Some(self.bias.clone())
    }
}

/// Transposed 2-D convolution layer, the generator's upsampling block
pub struct ConvTranspose2d {
    weight: Tensor,
    bias: Tensor,
    in_channels: usize,
    out_channels: usize,
    kernel: usize,
    stride: usize,
    padding: usize,
}

impl ConvTranspose2d {
    /// Create a layer with Xavier-initialized weights and zero bias
    pub fn new<R: Rng>(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        padding: usize,
        rng: &mut R,
    ) -> Self {
        let fan = kernel * kernel;
        let weight = Tensor::from_vec(
            xavier_normal(
                rng,
                in_channels * out_channels * fan,
                in_channels * fan,
                out_channels * fan,
            ),
            true,
        );
        let bias = Tensor::zeros(out_channels, true);
        Self {
            weight,
            bias,
            in_channels,
            out_channels,
            kernel,
            stride,
            padding,
        }
    }
}

impl Layer for ConvTranspose2d {
    fn forward(&self, input: &ImageBatch) -> ImageBatch {
        let [batch, channels, h, w] = input.shape();
        assert_eq!(channels, self.in_channels, "ConvTranspose2d channel mismatch");
        let dims = ConvTransposeDims {
            batch,
            in_channels: self.in_channels,
            out_channels: self.out_channels,
            in_h: h,
            in_w: w,
            kernel: self.kernel,
            stride: self.stride,
            padding: self.padding,
        };
        let out = conv_transpose2d(input.tensor(), &self.weight, Some(&self.bias), &dims);
        ImageBatch::new(out, [batch, self.out_channels, dims.out_h(), dims.out_w()])
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Convolutional
    }

    fn parameters(&self) -> Vec<Tensor> {
        vec![self.weight.clone(), self.bias.clone()]
    }

    fn weight(&self) -> Option<Tensor> {
        Some(self.weight.clone())
    }

    fn bias(&self) -> Option<Tensor> {
        Some(self.bias.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_conv2d_forward_shape() {
        let mut rng = StdRng::seed_from_u64(42);
        let layer = Conv2d::new(3, 8, 4, 2, 1, &mut rng);
        let input = ImageBatch::zeros([2, 3, 8, 8]);
        let out = layer.forward(&input);
        assert_eq!(out.shape(), [2, 8, 4, 4]);
    }

    #[test]
    fn test_conv_transpose2d_forward_shape() {
        let mut rng = StdRng::seed_from_u64(42);
        let layer = ConvTranspose2d::new(16, 8, 4, 2, 1, &mut rng);
        let input = ImageBatch::zeros([2, 16, 4, 4]);
        let out = layer.forward(&input);
        assert_eq!(out.shape(), [2, 8, 8, 8]);
    }

    #[test]
    fn test_conv_layers_report_convolutional_kind() {
        let mut rng = StdRng::seed_from_u64(42);
        let conv = Conv2d::new(1, 1, 3, 1, 1, &mut rng);
        let tconv = ConvTranspose2d::new(1, 1, 3, 1, 1, &mut rng);
        assert_eq!(conv.kind(), LayerKind::Convolutional);
        assert_eq!(tconv.kind(), LayerKind::Convolutional);
    }

    #[test]
    fn test_parameters_share_storage_with_layer() {
        let mut rng = StdRng::seed_from_u64(42);
        let layer = Conv2d::new(1, 1, 1, 1, 0, &mut rng);
        let params = layer.parameters();
        params[0].data_mut()[0] = 123.0;
        assert_eq!(layer.weight().expect("weight").data()[0], 123.0);
    }

    #[test]
    #[should_panic(expected = "channel mismatch")]
    fn test_conv2d_rejects_wrong_channels() {
        let mut rng = StdRng::seed_from_u64(42);
        let layer = Conv2d::new(3, 8, 3, 1, 1, &mut rng);
        let input = ImageBatch::zeros([1, 1, 8, 8]);
        let _ = layer.forward(&input);
    }
}
