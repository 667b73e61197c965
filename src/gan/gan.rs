//! GAN orchestrator: construction, the training loop, and sampling.

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::config::{GanConfig, GenerateOptions, TrainOptions};
use crate::autograd::{self, Tensor};
use crate::data::{DataLoader, ImageBatch};
use crate::device::Device;
use crate::error::{GanError, Result};
use crate::latent::LatentBatch;
use crate::loss::{BCEWithLogitsLoss, LossFn};
use crate::nn::{init_weights, Module};
use crate::optim::{AdamW, Optimizer};
use crate::viz::Visualizer;

/// Smoothed target for real samples
pub const REAL_LABEL: f32 = 0.9;
/// Smoothed target for generated samples
pub const FAKE_LABEL: f32 = 0.1;

/// Latent vectors held fixed across a training run, so epoch-end previews
/// show the same points of the latent space evolving
const FIXED_LATENT_SAMPLES: usize = 128;

/// Preview grid dimensions at epoch end
const PREVIEW_ROWS: usize = 8;
const PREVIEW_COLS: usize = 8;

/// Output of [`Gan::generate`]
pub struct Generated {
    /// Generated images, detached from gradient tracking
    pub images: ImageBatch,
    /// The latent vectors the images were generated from, when requested
    pub latents: Option<LatentBatch>,
}

/// Generator/discriminator pair with the training loop that pits them
/// against each other.
///
/// Both networks are consumed as black boxes: anything implementing
/// [`Module`] works. Construction validates the config, initializes the
/// weights of both networks, and samples the fixed preview latent batch.
pub struct Gan {
    /// Hyperparameters, immutable after construction
    pub config: GanConfig,
    generator: Box<dyn Module>,
    discriminator: Box<dyn Module>,
    fixed_latent: LatentBatch,
    steps: usize,
    rng: StdRng,
}

impl Gan {
    /// Create a GAN with OS-seeded randomness
    pub fn new(
        config: GanConfig,
        generator: impl Module + 'static,
        discriminator: impl Module + 'static,
    ) -> Result<Self> {
        Self::build(
            config,
            Box::new(generator),
            Box::new(discriminator),
            StdRng::from_os_rng(),
        )
    }

    /// Create a GAN with a seed for reproducibility
    pub fn with_seed(
        config: GanConfig,
        generator: impl Module + 'static,
        discriminator: impl Module + 'static,
        seed: u64,
    ) -> Result<Self> {
        Self::build(
            config,
            Box::new(generator),
            Box::new(discriminator),
            StdRng::seed_from_u64(seed),
        )
    }

    fn build(
        config: GanConfig,
        generator: Box<dyn Module>,
        discriminator: Box<dyn Module>,
        mut rng: StdRng,
    ) -> Result<Self> {
        config.validate()?;
        init_weights(&*generator, &mut rng);
        init_weights(&*discriminator, &mut rng);
        let fixed_latent = LatentBatch::sample(&mut rng, FIXED_LATENT_SAMPLES, config.latent_dim);
        Ok(Self {
            config,
            generator,
            discriminator,
            fixed_latent,
            steps: 0,
            rng,
        })
    }

    /// Total training steps performed, across all [`Gan::train`] calls
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// The generator network
    pub fn generator(&self) -> &dyn Module {
        &*self.generator
    }

    /// The discriminator network
    pub fn discriminator(&self) -> &dyn Module {
        &*self.discriminator
    }

    /// The latent batch sampled once at construction for epoch-end previews
    pub fn fixed_latent(&self) -> &LatentBatch {
        &self.fixed_latent
    }

    /// Run the adversarial training loop.
    ///
    /// Each step updates the discriminator on a real batch plus a detached
    /// fake batch, then updates the generator by re-classifying the same
    /// fake batch with gradients flowing. The two discriminator losses are
    /// backpropagated separately, real first, and only summed for reporting.
    pub fn train(
        &mut self,
        loader: &dyn DataLoader,
        opts: &TrainOptions,
        mut visualizer: Option<&mut dyn Visualizer>,
    ) -> Result<()> {
        validate_source(loader)?;

        let mut gen_opt = AdamW::with_betas(self.config.gen_lr, self.config.gen_betas);
        let mut dis_opt = AdamW::with_betas(self.config.dis_lr, self.config.dis_betas);
        let mut gen_params = self.generator.parameters();
        let mut dis_params = self.discriminator.parameters();
        let loss_fn = BCEWithLogitsLoss;

        for epoch in 0..opts.epochs {
            for (step, real) in loader.batches().enumerate() {
                // Discriminator phase
                dis_opt.zero_grad(&mut dis_params);

                let latent =
                    LatentBatch::sample(&mut self.rng, real.batch_size(), self.config.latent_dim);
                let fake = self.generator.forward(&latent.as_images());
                let real = real.to_device(opts.device);

                let real_logits = self.discriminator.forward(&real);
                let mut real_loss = loss_fn.forward(
                    real_logits.tensor(),
                    &Tensor::full(real_logits.tensor().len(), REAL_LABEL),
                );

                // Detached: discriminator gradients must not reach the generator
                let fake_logits = self.discriminator.forward(&fake.detach());
                let mut fake_loss = loss_fn.forward(
                    fake_logits.tensor(),
                    &Tensor::full(fake_logits.tensor().len(), FAKE_LABEL),
                );

                autograd::backward(&mut real_loss, None);
                autograd::backward(&mut fake_loss, None);
                let disc_loss = real_loss.item() + fake_loss.item();
                dis_opt.step(&mut dis_params);

                // Generator phase: the same fake batch, tape intact this time
                gen_opt.zero_grad(&mut gen_params);
                let tracked_logits = self.discriminator.forward(&fake);
                let mut gen_loss = loss_fn.forward(
                    tracked_logits.tensor(),
                    &Tensor::full(tracked_logits.tensor().len(), REAL_LABEL),
                );
                autograd::backward(&mut gen_loss, None);
                let gen_loss = gen_loss.item();
                gen_opt.step(&mut gen_params);

                self.steps += 1;

                if logs_at(step, self.config.log_every) {
                    println!(
                        "{}",
                        progress_line(step, epoch, opts.epochs, disc_loss, gen_loss)
                    );
                }
            }

            if opts.visualize {
                if let Some(viz) = visualizer.as_deref_mut() {
                    let preview = self
                        .generator
                        .forward(&self.fixed_latent.as_images().to_device(opts.device))
                        .detach()
                        .to_device(Device::Cpu);
                    viz.render(&preview, PREVIEW_ROWS, PREVIEW_COLS);
                }
            }
        }
        Ok(())
    }

    /// Sample fresh latents and run the generator, without gradient tracking.
    pub fn generate(
        &mut self,
        opts: &GenerateOptions,
        mut visualizer: Option<&mut dyn Visualizer>,
    ) -> Result<Generated> {
        if opts.rows == 0 || opts.cols == 0 {
            return Err(GanError::InvalidHyperparameter(format!(
                "generation grid must be non-empty, got {}x{}",
                opts.rows, opts.cols
            )));
        }

        let latents =
            LatentBatch::sample(&mut self.rng, opts.rows * opts.cols, self.config.latent_dim);
        let images = self
            .generator
            .forward(&latents.as_images().to_device(opts.device))
            .detach()
            .to_device(Device::Cpu);

        if opts.visualize {
            if let Some(viz) = visualizer.as_deref_mut() {
                viz.render(&images, opts.rows, opts.cols);
            }
        }

        Ok(Generated {
            images,
            latents: opts.return_latents.then_some(latents),
        })
    }
}

/// Whether the step at this per-epoch index produces a console line.
///
/// The index restarts at 0 each epoch, so the first step of every epoch
/// always logs.
fn logs_at(step: usize, log_every: usize) -> bool {
    step % log_every == 0
}

/// One training-progress console line.
fn progress_line(step: usize, epoch: usize, num_epochs: usize, disc_loss: f32, gen_loss: f32) -> String {
    format!(
        "Iteration {step}\t[Epoch {epoch}/{num_epochs}]\tLosses:\t L_discriminator = {disc_loss:.4}\t L_generator = {gen_loss:.4}"
    )
}

/// Check the batch source before the first training step.
///
/// The source must yield at least one batch, every batch must have all four
/// dimensions non-zero, and all batches must agree on channel count.
fn validate_source(loader: &dyn DataLoader) -> Result<()> {
    let mut expected_channels = None;
    for (index, batch) in loader.batches().enumerate() {
        let shape = batch.shape();
        if shape.contains(&0) {
            return Err(GanError::EmptyBatch { index, shape });
        }
        match expected_channels {
            None => expected_channels = Some(batch.channels()),
            Some(expected) if batch.channels() != expected => {
                return Err(GanError::ChannelMismatch {
                    index,
                    got: batch.channels(),
                    expected,
                    shape,
                });
            }
            Some(_) => {}
        }
    }
    if expected_channels.is_none() {
        return Err(GanError::EmptyBatchSource);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryLoader;
    use crate::nn::{Conv2d, ConvTranspose2d, Sequential, Tanh};
    use rand::Rng;

    const LATENT_DIM: usize = 4;

    fn small_config() -> GanConfig {
        GanConfig {
            latent_dim: LATENT_DIM,
            ..Default::default()
        }
    }

    /// Generator (b, 4, 1, 1) -> (b, 1, 2, 2), discriminator (b, 1, 2, 2) -> (b, 1, 1, 1)
    fn small_networks(seed: u64) -> (Sequential, Sequential) {
        let mut rng = StdRng::seed_from_u64(seed);
        let generator = Sequential::new()
            .push(ConvTranspose2d::new(LATENT_DIM, 1, 2, 1, 0, &mut rng))
            .push(Tanh);
        let discriminator = Sequential::new().push(Conv2d::new(1, 1, 2, 1, 0, &mut rng));
        (generator, discriminator)
    }

    fn real_batches(count: usize, batch_size: usize) -> InMemoryLoader {
        let mut rng = StdRng::seed_from_u64(99);
        let batches = (0..count)
            .map(|_| {
                let pixels: Vec<f32> = (0..batch_size * 4)
                    .map(|_| rng.random::<f32>() * 2.0 - 1.0)
                    .collect();
                ImageBatch::from_vec(pixels, [batch_size, 1, 2, 2], false)
            })
            .collect();
        InMemoryLoader::new(batches)
    }

    fn snapshot(params: &[Tensor]) -> Vec<Vec<f32>> {
        params.iter().map(Tensor::to_vec).collect()
    }

    struct RecordingVisualizer {
        calls: Vec<([usize; 4], usize, usize)>,
    }

    impl Visualizer for RecordingVisualizer {
        fn render(&mut self, images: &ImageBatch, rows: usize, cols: usize) {
            self.calls.push((images.shape(), rows, cols));
        }
    }

    #[test]
    fn test_construction_rejects_invalid_config() {
        let (g, d) = small_networks(1);
        let config = GanConfig { latent_dim: 0, ..Default::default() };
        assert!(matches!(
            Gan::with_seed(config, g, d, 7),
            Err(GanError::InvalidHyperparameter(_))
        ));
    }

    #[test]
    fn test_seeded_construction_is_reproducible() {
        let (g1, d1) = small_networks(1);
        let (g2, d2) = small_networks(1);
        let gan_a = Gan::with_seed(small_config(), g1, d1, 7).expect("valid config");
        let gan_b = Gan::with_seed(small_config(), g2, d2, 7).expect("valid config");
        assert_eq!(
            gan_a.fixed_latent().tensor().to_vec(),
            gan_b.fixed_latent().tensor().to_vec()
        );
        assert_eq!(
            snapshot(&gan_a.generator().parameters()),
            snapshot(&gan_b.generator().parameters())
        );
    }

    #[test]
    fn test_fixed_latent_dimensions() {
        let (g, d) = small_networks(1);
        let gan = Gan::with_seed(small_config(), g, d, 7).expect("valid config");
        assert_eq!(gan.fixed_latent().batch_size(), FIXED_LATENT_SAMPLES);
        assert_eq!(gan.fixed_latent().dim(), LATENT_DIM);
    }

    #[test]
    fn test_train_rejects_empty_source() {
        let (g, d) = small_networks(1);
        let mut gan = Gan::with_seed(small_config(), g, d, 7).expect("valid config");
        let loader = InMemoryLoader::new(Vec::new());
        let opts = TrainOptions { epochs: 1, visualize: false, ..Default::default() };
        assert!(matches!(
            gan.train(&loader, &opts, None),
            Err(GanError::EmptyBatchSource)
        ));
    }

    #[test]
    fn test_train_rejects_channel_mismatch_before_any_step() {
        let (g, d) = small_networks(1);
        let mut gan = Gan::with_seed(small_config(), g, d, 7).expect("valid config");
        let before = snapshot(&gan.discriminator().parameters());

        let loader = InMemoryLoader::new(vec![
            ImageBatch::zeros([2, 1, 2, 2]),
            ImageBatch::zeros([2, 3, 2, 2]),
        ]);
        let opts = TrainOptions { epochs: 1, visualize: false, ..Default::default() };
        assert!(matches!(
            gan.train(&loader, &opts, None),
            Err(GanError::ChannelMismatch { index: 1, got: 3, expected: 1, .. })
        ));
        // Fail-fast: nothing trained
        assert_eq!(snapshot(&gan.discriminator().parameters()), before);
        assert_eq!(gan.steps(), 0);
    }

    #[test]
    fn test_train_rejects_zero_dimension_batch() {
        let (g, d) = small_networks(1);
        let mut gan = Gan::with_seed(small_config(), g, d, 7).expect("valid config");
        let loader = InMemoryLoader::new(vec![ImageBatch::zeros([0, 1, 2, 2])]);
        let opts = TrainOptions { epochs: 1, visualize: false, ..Default::default() };
        assert!(matches!(
            gan.train(&loader, &opts, None),
            Err(GanError::EmptyBatch { index: 0, .. })
        ));
    }

    #[test]
    fn test_one_epoch_trains_both_networks() {
        let (g, d) = small_networks(1);
        let mut gan = Gan::with_seed(small_config(), g, d, 7).expect("valid config");
        let gen_before = snapshot(&gan.generator().parameters());
        let dis_before = snapshot(&gan.discriminator().parameters());

        let loader = real_batches(2, 4);
        let opts = TrainOptions { epochs: 1, visualize: false, ..Default::default() };
        gan.train(&loader, &opts, None).expect("training succeeds");

        assert_eq!(gan.steps(), 2);
        // A NaN or infinite loss would have poisoned the optimizer updates
        let gen_after = snapshot(&gan.generator().parameters());
        let dis_after = snapshot(&gan.discriminator().parameters());
        assert!(gen_after.iter().flatten().all(|v| v.is_finite()));
        assert!(dis_after.iter().flatten().all(|v| v.is_finite()));
        assert_ne!(gen_after, gen_before);
        assert_ne!(dis_after, dis_before);
    }

    #[test]
    fn test_epoch_end_preview_goes_to_visualizer() {
        let (g, d) = small_networks(1);
        let mut gan = Gan::with_seed(small_config(), g, d, 7).expect("valid config");
        let loader = real_batches(1, 2);
        let mut viz = RecordingVisualizer { calls: Vec::new() };

        let opts = TrainOptions { epochs: 2, visualize: true, ..Default::default() };
        gan.train(&loader, &opts, Some(&mut viz)).expect("training succeeds");

        assert_eq!(viz.calls.len(), 2);
        let (shape, rows, cols) = viz.calls[0];
        assert_eq!(shape, [FIXED_LATENT_SAMPLES, 1, 2, 2]);
        assert_eq!((rows, cols), (8, 8));
    }

    #[test]
    fn test_visualize_flag_off_suppresses_preview() {
        let (g, d) = small_networks(1);
        let mut gan = Gan::with_seed(small_config(), g, d, 7).expect("valid config");
        let loader = real_batches(1, 2);
        let mut viz = RecordingVisualizer { calls: Vec::new() };

        let opts = TrainOptions { epochs: 1, visualize: false, ..Default::default() };
        gan.train(&loader, &opts, Some(&mut viz)).expect("training succeeds");
        assert!(viz.calls.is_empty());
    }

    #[test]
    fn test_generate_returns_grid_of_images() {
        let (g, d) = small_networks(1);
        let mut gan = Gan::with_seed(small_config(), g, d, 7).expect("valid config");

        let opts = GenerateOptions {
            rows: 2,
            cols: 3,
            visualize: false,
            return_latents: false,
            ..Default::default()
        };
        let out = gan.generate(&opts, None).expect("generation succeeds");

        assert_eq!(out.images.shape(), [6, 1, 2, 2]);
        assert!(!out.images.tensor().requires_grad());
        assert!(out.images.tensor().backward_op().is_none());
        assert!(out.latents.is_none());
    }

    #[test]
    fn test_generate_returns_latents_by_default() {
        let (g, d) = small_networks(1);
        let mut gan = Gan::with_seed(small_config(), g, d, 7).expect("valid config");

        let opts = GenerateOptions {
            rows: 2,
            cols: 3,
            visualize: false,
            ..Default::default()
        };
        let out = gan.generate(&opts, None).expect("generation succeeds");

        let latents = out.latents.expect("latents returned by default");
        assert_eq!(latents.batch_size(), 6);
        assert_eq!(latents.dim(), LATENT_DIM);
    }

    #[test]
    fn test_generate_rejects_empty_grid() {
        let (g, d) = small_networks(1);
        let mut gan = Gan::with_seed(small_config(), g, d, 7).expect("valid config");
        let opts = GenerateOptions { rows: 0, cols: 3, ..Default::default() };
        assert!(matches!(
            gan.generate(&opts, None),
            Err(GanError::InvalidHyperparameter(_))
        ));
    }

    #[test]
    fn test_generate_renders_when_visualize_on() {
        let (g, d) = small_networks(1);
        let mut gan = Gan::with_seed(small_config(), g, d, 7).expect("valid config");
        let mut viz = RecordingVisualizer { calls: Vec::new() };

        let opts = GenerateOptions { rows: 2, cols: 2, visualize: true, ..Default::default() };
        gan.generate(&opts, Some(&mut viz)).expect("generation succeeds");

        assert_eq!(viz.calls.len(), 1);
        assert_eq!(viz.calls[0], ([4, 1, 2, 2], 2, 2));
    }

    #[test]
    fn test_smoothed_labels_are_exact() {
        let real = Tensor::full(5, REAL_LABEL);
        let fake = Tensor::full(5, FAKE_LABEL);
        assert!(real.to_vec().iter().all(|&v| v == 0.9));
        assert!(fake.to_vec().iter().all(|&v| v == 0.1));
    }

    #[test]
    fn test_progress_line_format() {
        assert_eq!(
            progress_line(0, 0, 5, 1.25, 0.5),
            "Iteration 0\t[Epoch 0/5]\tLosses:\t L_discriminator = 1.2500\t L_generator = 0.5000"
        );
    }

    #[test]
    fn test_log_cadence_restarts_each_epoch() {
        // log_every = 2, two epochs of three batches: the per-epoch step
        // index logs at 0 and 2 in both epochs, with 0-based epoch numbers
        let log_every = 2;
        let mut lines = Vec::new();
        for epoch in 0..2 {
            for step in 0..3 {
                if logs_at(step, log_every) {
                    lines.push(progress_line(step, epoch, 2, 1.0, 1.0));
                }
            }
        }
        let headers: Vec<String> = lines
            .iter()
            .map(|l| l.split("\tLosses:").next().expect("header").to_string())
            .collect();
        assert_eq!(
            headers,
            vec![
                "Iteration 0\t[Epoch 0/2]",
                "Iteration 2\t[Epoch 0/2]",
                "Iteration 0\t[Epoch 1/2]",
                "Iteration 2\t[Epoch 1/2]",
            ]
        );
    }
}
