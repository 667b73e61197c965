//! Visualization hooks for generated images
//!
//! The trainer and sampler hand image batches to a [`Visualizer`] instead of
//! drawing anything themselves. Generated pixels live in `[-1, 1]` (tanh
//! output range); [`to_display_grid`] maps them back to display bytes with
//! `x * 127.5 + 127.5` and tiles the batch into a rows x cols montage.

use std::fs::File;
use std::io::Write as _;
use std::path::PathBuf;

use crate::data::ImageBatch;

/// A rows x cols montage of images, channels-last, one byte per channel.
#[derive(Debug, Clone)]
pub struct ImageGrid {
    /// Pixel bytes in `[h][w][c]` order
    pub pixels: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub channels: usize,
}

/// Receives image batches during training and generation.
///
/// Implementations render however they like: write files, update a UI,
/// record for assertions. Rendering must not fail the training loop.
pub trait Visualizer {
    /// Display `images` tiled into a `rows` x `cols` grid.
    ///
    /// The batch may hold fewer than `rows * cols` images; missing tiles
    /// are left black.
    fn render(&mut self, images: &ImageBatch, rows: usize, cols: usize);
}

/// Tile a batch into a displayable byte grid.
///
/// Pixels are mapped from the generator's `[-1, 1]` range to `[0, 255]`
/// and clamped, so out-of-range activations saturate instead of wrapping.
pub fn to_display_grid(images: &ImageBatch, rows: usize, cols: usize) -> ImageGrid {
    let [batch, channels, img_h, img_w] = images.shape();
    let height = rows * img_h;
    let width = cols * img_w;
    let mut pixels = vec![0u8; height * width * channels];

    let data = images.tensor().data();
    for tile in 0..(rows * cols).min(batch) {
        let tile_row = tile / cols;
        let tile_col = tile % cols;
        for c in 0..channels {
            for y in 0..img_h {
                for x in 0..img_w {
                    let src = ((tile * channels + c) * img_h + y) * img_w + x;
                    let gy = tile_row * img_h + y;
                    let gx = tile_col * img_w + x;
                    let dst = (gy * width + gx) * channels + c;
                    pixels[dst] = renormalize(data[src]);
                }
            }
        }
    }

    ImageGrid { pixels, width, height, channels }
}

fn renormalize(x: f32) -> u8 {
    (x * 127.5 + 127.5).clamp(0.0, 255.0) as u8
}

/// Writes each rendered grid as a binary PPM (P6) file.
///
/// Files are numbered sequentially (`frame_0000.ppm`, `frame_0001.ppm`, ...)
/// under the configured directory. Single-channel batches are written as
/// grayscale RGB.
pub struct PpmVisualizer {
    dir: PathBuf,
    frame: usize,
}

impl PpmVisualizer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), frame: 0 }
    }

    /// Number of frames written so far
    pub fn frames(&self) -> usize {
        self.frame
    }

    fn write_ppm(&self, grid: &ImageGrid) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("frame_{:04}.ppm", self.frame));
        let mut file = File::create(path)?;
        write!(file, "P6\n{} {}\n255\n", grid.width, grid.height)?;

        match grid.channels {
            3 => file.write_all(&grid.pixels)?,
            1 => {
                let rgb: Vec<u8> =
                    grid.pixels.iter().flat_map(|&g| [g, g, g]).collect();
                file.write_all(&rgb)?;
            }
            n => {
                // Keep the first three channels, drop the rest
                let rgb: Vec<u8> = grid
                    .pixels
                    .chunks(n)
                    .flat_map(|px| [px[0], px[(n - 1).min(1)], px[(n - 1).min(2)]])
                    .collect();
                file.write_all(&rgb)?;
            }
        }
        Ok(())
    }
}

impl Visualizer for PpmVisualizer {
    fn render(&mut self, images: &ImageBatch, rows: usize, cols: usize) {
        let grid = to_display_grid(images, rows, cols);
        if let Err(e) = self.write_ppm(&grid) {
            eprintln!("ppm visualizer: failed to write frame {}: {e}", self.frame);
        }
        self.frame += 1;
    }
}
