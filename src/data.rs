//! Image batches and batch sources

use crate::autograd::Tensor;
use crate::device::Device;

/// A rank-4 image batch: (batch, channel, height, width) over flat storage.
#[derive(Clone)]
pub struct ImageBatch {
    data: Tensor,
    shape: [usize; 4],
}

impl ImageBatch {
    /// Create a batch from a tensor and its shape
    ///
    /// Panics if the tensor length does not match the shape product; batches
    /// are rank-4 by construction.
    pub fn new(data: Tensor, shape: [usize; 4]) -> Self {
        assert_eq!(
            data.len(),
            shape.iter().product::<usize>(),
            "tensor length must match batch shape"
        );
        Self { data, shape }
    }

    /// Create a batch from raw values
    pub fn from_vec(values: Vec<f32>, shape: [usize; 4], requires_grad: bool) -> Self {
        Self::new(Tensor::from_vec(values, requires_grad), shape)
    }

    /// Zero-filled batch
    pub fn zeros(shape: [usize; 4]) -> Self {
        Self::new(Tensor::zeros(shape.iter().product(), false), shape)
    }

    /// (batch, channel, height, width)
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    /// Number of samples in the batch
    pub fn batch_size(&self) -> usize {
        self.shape[0]
    }

    /// Channel count
    pub fn channels(&self) -> usize {
        self.shape[1]
    }

    /// Image height
    pub fn height(&self) -> usize {
        self.shape[2]
    }

    /// Image width
    pub fn width(&self) -> usize {
        self.shape[3]
    }

    /// The underlying flat tensor
    pub fn tensor(&self) -> &Tensor {
        &self.data
    }

    /// Flatten to the underlying tensor handle (shares storage and tape)
    pub fn flatten(&self) -> Tensor {
        self.data.clone()
    }

    /// Same pixels, cut loose from the gradient tape
    pub fn detach(&self) -> Self {
        Self {
            data: self.data.detach(),
            shape: self.shape,
        }
    }

    /// Place the batch on a compute device.
    ///
    /// Placement is a shallow handle copy: the CPU backend keeps all tensors
    /// host-resident, so no data moves.
    pub fn to_device(&self, device: Device) -> Self {
        match device {
            Device::Cpu => self.clone(),
        }
    }
}

impl std::fmt::Debug for ImageBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageBatch").field("shape", &self.shape).finish()
    }
}

/// A source of training batches.
///
/// This is the recognized batch-iterator abstraction the trainer requires:
/// anything that can replay its rank-4 batches once per epoch. Implementing
/// the trait is the type-level precondition; the trainer additionally
/// validates the yielded shapes before the first step.
pub trait DataLoader {
    /// Iterate the batches of one epoch, in order
    fn batches(&self) -> Box<dyn Iterator<Item = ImageBatch> + '_>;

    /// Number of batches per epoch
    fn len(&self) -> usize;

    /// Whether the source has no batches
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Batch source backed by pre-split in-memory batches.
pub struct InMemoryLoader {
    batches: Vec<ImageBatch>,
}

impl InMemoryLoader {
    /// Create a loader over pre-built batches
    pub fn new(batches: Vec<ImageBatch>) -> Self {
        Self { batches }
    }
}

impl DataLoader for InMemoryLoader {
    fn batches(&self) -> Box<dyn Iterator<Item = ImageBatch> + '_> {
        Box::new(self.batches.iter().cloned())
    }

    fn len(&self) -> usize {
        self.batches.len()
    }
}
