//! Compact autoencoder for reconstruction-error scoring.
//!
//! Architecture: `D -> H (tanh) -> D (linear)` with `H < D`, trained with
//! mini-batch SGD to reproduce its own input. Rows unlike the training
//! population reconstruct poorly.

use fraudlens_core::FeatureMatrix;
use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Debug, Clone)]
pub struct AutoencoderParams {
    /// Bottleneck width.
    pub hidden: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub batch_size: usize,
}

#[derive(Debug, Clone)]
pub struct Autoencoder {
    input_dim: usize,
    hidden_dim: usize,
    /// Encoder weights, hidden × input, row-major.
    w_enc: Vec<f64>,
    b_enc: Vec<f64>,
    /// Decoder weights, input × hidden, row-major.
    w_dec: Vec<f64>,
    b_dec: Vec<f64>,
    final_loss: f64,
}

/// Gradient accumulator for one mini-batch.
struct Gradients {
    w_enc: Vec<f64>,
    b_enc: Vec<f64>,
    w_dec: Vec<f64>,
    b_dec: Vec<f64>,
}

impl Gradients {
    fn zeros(d: usize, h: usize) -> Self {
        Self {
            w_enc: vec![0.0; h * d],
            b_enc: vec![0.0; h],
            w_dec: vec![0.0; d * h],
            b_dec: vec![0.0; d],
        }
    }

    fn reset(&mut self) {
        self.w_enc.fill(0.0);
        self.b_enc.fill(0.0);
        self.w_dec.fill(0.0);
        self.b_dec.fill(0.0);
    }
}

impl Autoencoder {
    /// Train on every row of `data`. Fails if the batch is empty or the loss
    /// stops being finite.
    pub fn train<R: Rng>(
        data: &FeatureMatrix,
        params: &AutoencoderParams,
        rng: &mut R,
    ) -> Result<Self, String> {
        let d = data.cols();
        if data.is_empty() || d == 0 {
            return Err("cannot train on an empty batch".to_string());
        }
        let h = params.hidden.clamp(1, d);

        let mut model = Self::init(d, h, rng);
        let mut grads = Gradients::zeros(d, h);
        let mut hidden = vec![0.0; h];
        let mut output = vec![0.0; d];

        let mut order: Vec<usize> = (0..data.rows()).collect();
        let batch_size = params.batch_size.max(1);
        let mut epoch_loss = f64::INFINITY;

        for _ in 0..params.epochs.max(1) {
            order.shuffle(rng);
            let mut loss_sum = 0.0;

            for chunk in order.chunks(batch_size) {
                grads.reset();
                for &i in chunk {
                    loss_sum += model.accumulate(data.row(i), &mut hidden, &mut output, &mut grads);
                }
                model.apply(&grads, params.learning_rate / chunk.len() as f64);
            }

            epoch_loss = loss_sum / data.rows() as f64;
            if !epoch_loss.is_finite() {
                return Err(format!("training diverged (loss={})", epoch_loss));
            }
        }

        model.final_loss = epoch_loss;
        Ok(model)
    }

    /// Xavier-uniform initialization.
    fn init<R: Rng>(d: usize, h: usize, rng: &mut R) -> Self {
        let limit = (6.0 / (d + h) as f64).sqrt();
        let mut uniform = |len: usize| -> Vec<f64> {
            (0..len).map(|_| rng.gen_range(-limit..limit)).collect()
        };
        Self {
            input_dim: d,
            hidden_dim: h,
            w_enc: uniform(h * d),
            b_enc: vec![0.0; h],
            w_dec: uniform(d * h),
            b_dec: vec![0.0; d],
            final_loss: f64::INFINITY,
        }
    }

    fn forward(&self, x: &[f64], hidden: &mut [f64], output: &mut [f64]) {
        let (d, h) = (self.input_dim, self.hidden_dim);
        for j in 0..h {
            let weights = &self.w_enc[j * d..(j + 1) * d];
            let z: f64 = self.b_enc[j] + weights.iter().zip(x).map(|(w, v)| w * v).sum::<f64>();
            hidden[j] = z.tanh();
        }
        for k in 0..d {
            let weights = &self.w_dec[k * h..(k + 1) * h];
            output[k] = self.b_dec[k] + weights.iter().zip(hidden.iter()).map(|(w, v)| w * v).sum::<f64>();
        }
    }

    /// Forward + backward pass for one row. Returns the row's MSE.
    fn accumulate(
        &self,
        x: &[f64],
        hidden: &mut [f64],
        output: &mut [f64],
        grads: &mut Gradients,
    ) -> f64 {
        let (d, h) = (self.input_dim, self.hidden_dim);
        self.forward(x, hidden, output);

        // Turn `output` into dLoss/dOutput in place.
        let mut loss = 0.0;
        for k in 0..d {
            let diff = output[k] - x[k];
            loss += diff * diff;
            output[k] = 2.0 * diff / d as f64;
        }
        let dy = &*output;

        for k in 0..d {
            grads.b_dec[k] += dy[k];
            for j in 0..h {
                grads.w_dec[k * h + j] += dy[k] * hidden[j];
            }
        }

        for j in 0..h {
            let dh: f64 = (0..d).map(|k| self.w_dec[k * h + j] * dy[k]).sum();
            let dz = dh * (1.0 - hidden[j] * hidden[j]);
            grads.b_enc[j] += dz;
            for k in 0..d {
                grads.w_enc[j * d + k] += dz * x[k];
            }
        }

        loss / d as f64
    }

    fn apply(&mut self, grads: &Gradients, step: f64) {
        let update = |params: &mut [f64], g: &[f64]| {
            for (p, g) in params.iter_mut().zip(g) {
                *p -= step * g;
            }
        };
        update(&mut self.w_enc, &grads.w_enc);
        update(&mut self.b_enc, &grads.b_enc);
        update(&mut self.w_dec, &grads.w_dec);
        update(&mut self.b_dec, &grads.b_dec);
    }

    /// Per-row mean squared reconstruction error.
    pub fn reconstruction_errors(&self, data: &FeatureMatrix) -> Vec<f64> {
        let mut hidden = vec![0.0; self.hidden_dim];
        let mut output = vec![0.0; self.input_dim];
        data.iter_rows()
            .map(|row| {
                self.forward(row, &mut hidden, &mut output);
                row.iter()
                    .zip(&output)
                    .map(|(x, y)| (x - y) * (x - y))
                    .sum::<f64>()
                    / self.input_dim as f64
            })
            .collect()
    }

    pub fn final_loss(&self) -> f64 {
        self.final_loss
    }
}
