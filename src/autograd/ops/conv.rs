//! Convolution autograd operations: conv2d, conv_transpose2d
//!
//! Direct-loop kernels over flat row-major storage. Shapes are passed
//! explicitly alongside the flat tensors; kernels are square.

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Shape arguments for [`conv2d`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvDims {
    pub batch: usize,
    pub in_channels: usize,
    pub out_channels: usize,
    pub in_h: usize,
    pub in_w: usize,
    pub kernel: usize,
    pub stride: usize,
    pub padding: usize,
}

impl ConvDims {
    /// Output height: (in_h + 2*pad - kernel) / stride + 1
    pub fn out_h(&self) -> usize {
        (self.in_h + 2 * self.padding - self.kernel) / self.stride + 1
    }

    /// Output width
    pub fn out_w(&self) -> usize {
        (self.in_w + 2 * self.padding - self.kernel) / self.stride + 1
    }
}

/// Shape arguments for [`conv_transpose2d`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvTransposeDims {
    pub batch: usize,
    pub in_channels: usize,
    pub out_channels: usize,
    pub in_h: usize,
    pub in_w: usize,
    pub kernel: usize,
    pub stride: usize,
    pub padding: usize,
}

impl ConvTransposeDims {
    /// Output height: (in_h - 1) * stride - 2*pad + kernel
    pub fn out_h(&self) -> usize {
        (self.in_h - 1) * self.stride + self.kernel - 2 * self.padding
    }

    /// Output width
    pub fn out_w(&self) -> usize {
        (self.in_w - 1) * self.stride + self.kernel - 2 * self.padding
    }
}

fn conv2d_forward(input: &[f32], weight: &[f32], bias: Option<&[f32]>, d: &ConvDims) -> Vec<f32> {
    let (oh, ow) = (d.out_h(), d.out_w());
    let mut out = vec![0.0f32; d.batch * d.out_channels * oh * ow];

    for b in 0..d.batch {
        for oc in 0..d.out_channels {
            let base = bias.map_or(0.0, |bv| bv[oc]);
            for y in 0..oh {
                for x in 0..ow {
                    let mut acc = base;
                    for ic in 0..d.in_channels {
                        for ky in 0..d.kernel {
                            for kx in 0..d.kernel {
                                let iy = (y * d.stride + ky) as isize - d.padding as isize;
                                let ix = (x * d.stride + kx) as isize - d.padding as isize;
                                if iy < 0 || ix < 0 {
                                    continue;
                                }
                                let (iy, ix) = (iy as usize, ix as usize);
                                if iy >= d.in_h || ix >= d.in_w {
                                    continue;
                                }
                                let in_idx =
                                    ((b * d.in_channels + ic) * d.in_h + iy) * d.in_w + ix;
                                let w_idx =
                                    ((oc * d.in_channels + ic) * d.kernel + ky) * d.kernel + kx;
                                acc += input[in_idx] * weight[w_idx];
                            }
                        }
                    }
                    out[((b * d.out_channels + oc) * oh + y) * ow + x] = acc;
                }
            }
        }
    }

    out
}

/// 2-D convolution with zero padding
///
/// - `input` is (batch, in_channels, in_h, in_w) flattened
/// - `weight` is (out_channels, in_channels, kernel, kernel) flattened
/// - `bias` is (out_channels), optional
pub fn conv2d(input: &Tensor, weight: &Tensor, bias: Option<&Tensor>, dims: &ConvDims) -> Tensor {
    assert_eq!(
        input.len(),
        dims.batch * dims.in_channels * dims.in_h * dims.in_w,
        "conv2d input size mismatch"
    );
    assert_eq!(
        weight.len(),
        dims.out_channels * dims.in_channels * dims.kernel * dims.kernel,
        "conv2d weight size mismatch"
    );

    let input_data = input.data();
    let weight_data = weight.data();
    let bias_data = bias.map(Tensor::data);
    let out = conv2d_forward(
        input_data.as_slice().expect("input must be contiguous"),
        weight_data.as_slice().expect("weight must be contiguous"),
        bias_data.as_ref().map(|b| b.as_slice().expect("bias must be contiguous")),
        dims,
    );

    let requires_grad = input.requires_grad()
        || weight.requires_grad()
        || bias.is_some_and(Tensor::requires_grad);
    let mut result = Tensor::new(Array1::from(out), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(Conv2dBackward {
            input: input.clone(),
            weight: weight.clone(),
            bias: bias.cloned(),
            dims: *dims,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct Conv2dBackward {
    input: Tensor,
    weight: Tensor,
    bias: Option<Tensor>,
    dims: ConvDims,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for Conv2dBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            let d = &self.dims;
            let (oh, ow) = (d.out_h(), d.out_w());
            let grad_out = grad_output.as_slice().expect("gradient must be contiguous");
            let input_data = self.input.data();
            let weight_data = self.weight.data();
            let input_s = input_data.as_slice().expect("input must be contiguous");
            let weight_s = weight_data.as_slice().expect("weight must be contiguous");

            let mut grad_input = vec![0.0f32; input_s.len()];
            let mut grad_weight = vec![0.0f32; weight_s.len()];
            let mut grad_bias = vec![0.0f32; d.out_channels];

            for b in 0..d.batch {
                for oc in 0..d.out_channels {
                    for y in 0..oh {
                        for x in 0..ow {
                            let g = grad_out[((b * d.out_channels + oc) * oh + y) * ow + x];
                            grad_bias[oc] += g;
                            for ic in 0..d.in_channels {
                                for ky in 0..d.kernel {
                                    for kx in 0..d.kernel {
                                        let iy =
                                            (y * d.stride + ky) as isize - d.padding as isize;
                                        let ix =
                                            (x * d.stride + kx) as isize - d.padding as isize;
                                        if iy < 0 || ix < 0 {
                                            continue;
                                        }
                                        let (iy, ix) = (iy as usize, ix as usize);
                                        if iy >= d.in_h || ix >= d.in_w {
                                            continue;
                                        }
                                        let in_idx = ((b * d.in_channels + ic) * d.in_h + iy)
                                            * d.in_w
                                            + ix;
                                        let w_idx = ((oc * d.in_channels + ic) * d.kernel + ky)
                                            * d.kernel
                                            + kx;
                                        grad_input[in_idx] += g * weight_s[w_idx];
                                        grad_weight[w_idx] += g * input_s[in_idx];
                                    }
                                }
                            }
                        }
                    }
                }
            }

            if self.input.requires_grad() {
                self.input.accumulate_grad(Array1::from(grad_input));
            }
            if self.weight.requires_grad() {
                self.weight.accumulate_grad(Array1::from(grad_weight));
            }
            if let Some(bias) = &self.bias {
                if bias.requires_grad() {
                    bias.accumulate_grad(Array1::from(grad_bias));
                }
            }

            // Recursively call backward on inputs (weight and bias are leaves
            // in practice, input usually is not)
            if let Some(op) = self.input.backward_op() {
                op.backward();
            }
            if let Some(op) = self.weight.backward_op() {
                op.backward();
            }
            if let Some(op) = self.bias.as_ref().and_then(Tensor::backward_op) {
                op.backward();
            }
        }
    }
}

fn conv_transpose2d_forward(
    input: &[f32],
    weight: &[f32],
    bias: Option<&[f32]>,
    d: &ConvTransposeDims,
) -> Vec<f32> {
    let (oh, ow) = (d.out_h(), d.out_w());
    let mut out = vec![0.0f32; d.batch * d.out_channels * oh * ow];

    if let Some(bv) = bias {
        for b in 0..d.batch {
            for oc in 0..d.out_channels {
                let start = ((b * d.out_channels + oc) * oh) * ow;
                for v in &mut out[start..start + oh * ow] {
                    *v = bv[oc];
                }
            }
        }
    }

    // Scatter: every input pixel contributes a kernel-sized patch to the output
    for b in 0..d.batch {
        for ic in 0..d.in_channels {
            for iy in 0..d.in_h {
                for ix in 0..d.in_w {
                    let v = input[((b * d.in_channels + ic) * d.in_h + iy) * d.in_w + ix];
                    for oc in 0..d.out_channels {
                        for ky in 0..d.kernel {
                            for kx in 0..d.kernel {
                                let oy = (iy * d.stride + ky) as isize - d.padding as isize;
                                let ox = (ix * d.stride + kx) as isize - d.padding as isize;
                                if oy < 0 || ox < 0 {
                                    continue;
                                }
                                let (oy, ox) = (oy as usize, ox as usize);
                                if oy >= oh || ox >= ow {
                                    continue;
                                }
                                let w_idx = ((ic * d.out_channels + oc) * d.kernel + ky)
                                    * d.kernel
                                    + kx;
                                out[((b * d.out_channels + oc) * oh + oy) * ow + ox] +=
                                    v * weight[w_idx];
                            }
                        }
                    }
                }
            }
        }
    }

    out
}

/// Transposed 2-D convolution (fractionally-strided upsampling)
///
/// - `input` is (batch, in_channels, in_h, in_w) flattened
/// - `weight` is (in_channels, out_channels, kernel, kernel) flattened
/// - `bias` is (out_channels), optional
pub fn conv_transpose2d(
    input: &Tensor,
    weight: &Tensor,
    bias: Option<&Tensor>,
    dims: &ConvTransposeDims,
) -> Tensor {
    assert_eq!(
        input.len(),
        dims.batch * dims.in_channels * dims.in_h * dims.in_w,
        "conv_transpose2d input size mismatch"
    );
    assert_eq!(
        weight.len(),
        dims.in_channels * dims.out_channels * dims.kernel * dims.kernel,
        "conv_transpose2d weight size mismatch"
    );

    let input_data = input.data();
    let weight_data = weight.data();
    let bias_data = bias.map(Tensor::data);
    let out = conv_transpose2d_forward(
        input_data.as_slice().expect("input must be contiguous"),
        weight_data.as_slice().expect("weight must be contiguous"),
        bias_data.as_ref().map(|b| b.as_slice().expect("bias must be contiguous")),
        dims,
    );

    let requires_grad = input.requires_grad()
        || weight.requires_grad()
        || bias.is_some_and(Tensor::requires_grad);
    let mut result = Tensor::new(Array1::from(out), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(ConvTranspose2dBackward {
            input: input.clone(),
            weight: weight.clone(),
            bias: bias.cloned(),
            dims: *dims,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct ConvTranspose2dBackward {
    input: Tensor,
    weight: Tensor,
    bias: Option<Tensor>,
    dims: ConvTransposeDims,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for ConvTranspose2dBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            let d = &self.dims;
            let (oh, ow) = (d.out_h(), d.out_w());
            let grad_out = grad_output.as_slice().expect("gradient must be contiguous");
            let input_data = self.input.data();
            let weight_data = self.weight.data();
            let input_s = input_data.as_slice().expect("input must be contiguous");
            let weight_s = weight_data.as_slice().expect("weight must be contiguous");

            let mut grad_input = vec![0.0f32; input_s.len()];
            let mut grad_weight = vec![0.0f32; weight_s.len()];
            let mut grad_bias = vec![0.0f32; d.out_channels];

            for b in 0..d.batch {
                for oc in 0..d.out_channels {
                    for oy in 0..oh {
                        for ox in 0..ow {
                            grad_bias[oc] +=
                                grad_out[((b * d.out_channels + oc) * oh + oy) * ow + ox];
                        }
                    }
                }
            }

            // Gather back along the same scatter pattern as the forward pass
            for b in 0..d.batch {
                for ic in 0..d.in_channels {
                    for iy in 0..d.in_h {
                        for ix in 0..d.in_w {
                            let in_idx =
                                ((b * d.in_channels + ic) * d.in_h + iy) * d.in_w + ix;
                            for oc in 0..d.out_channels {
                                for ky in 0..d.kernel {
                                    for kx in 0..d.kernel {
                                        let oy =
                                            (iy * d.stride + ky) as isize - d.padding as isize;
                                        let ox =
                                            (ix * d.stride + kx) as isize - d.padding as isize;
                                        if oy < 0 || ox < 0 {
                                            continue;
                                        }
                                        let (oy, ox) = (oy as usize, ox as usize);
                                        if oy >= oh || ox >= ow {
                                            continue;
                                        }
                                        let g = grad_out
                                            [((b * d.out_channels + oc) * oh + oy) * ow + ox];
                                        let w_idx = ((ic * d.out_channels + oc) * d.kernel + ky)
                                            * d.kernel
                                            + kx;
                                        grad_input[in_idx] += g * weight_s[w_idx];
                                        grad_weight[w_idx] += g * input_s[in_idx];
                                    }
                                }
                            }
                        }
                    }
                }
            }

            if self.input.requires_grad() {
                self.input.accumulate_grad(Array1::from(grad_input));
            }
            if self.weight.requires_grad() {
                self.weight.accumulate_grad(Array1::from(grad_weight));
            }
            if let Some(bias) = &self.bias {
                if bias.requires_grad() {
                    bias.accumulate_grad(Array1::from(grad_bias));
                }
            }

            if let Some(op) = self.input.backward_op() {
                op.backward();
            }
            if let Some(op) = self.weight.backward_op() {
                op.backward();
            }
            if let Some(op) = self.bias.as_ref().and_then(Tensor::backward_op) {
                op.backward();
            }
        }
    }
}
