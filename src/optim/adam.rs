use crate::{layers::dense::Layer, math::matrix::Matrix};
use crate::error::{Error, Result};

/// First/second moment estimates for one layer's weights and biases.
#[derive(Debug, Clone)]
struct Moments {
    weights_m: Matrix,
    weights_v: Matrix,
    biases_m: Matrix,
    biases_v: Matrix,
}

impl Moments {
    fn for_layer(layer: &Layer) -> Moments {
        let (wr, wc) = (layer.weights.rows, layer.weights.cols);
        let (br, bc) = (layer.biases.rows, layer.biases.cols);
        Moments {
            weights_m: Matrix::zeros(wr, wc),
            weights_v: Matrix::zeros(wr, wc),
            biases_m: Matrix::zeros(br, bc),
            biases_v: Matrix::zeros(br, bc),
        }
    }
}

/// Adam optimizer with bias correction folded into the step size:
/// `p -= lr · sqrt(1 - β2ᵗ) / (1 - β1ᵗ) · m / (sqrt(v) + ε)`.
#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    beta1_t: f64,
    beta2_t: f64,
    t: u32,
    moments: Vec<Moments>,
}

impl Adam {
    /// Adam with the usual defaults: β1 = 0.9, β2 = 0.999, ε = 1e-7.
    pub fn new(learning_rate: f64) -> Adam {
        Adam::with_params(learning_rate, 0.9, 0.999, 1e-7)
    }

    pub fn with_params(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Adam {
        Adam {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            beta1_t: 1.0,
            beta2_t: 1.0,
            t: 0,
            moments: Vec::new(),
        }
    }

    /// Number of updates applied so far.
    pub fn steps(&self) -> u32 {
        self.t
    }

    /// Applies one update to every layer. `grads[i]` holds the mean
    /// (weights_grad, biases_grad) of layer `i` over the mini-batch.
    pub fn step(&mut self, layers: &mut [Layer], grads: &[(Matrix, Matrix)]) -> Result<()> {
        if layers.len() != grads.len() {
            return Err(Error::mismatch("optimizer", "gradient pairs", layers.len(), grads.len()));
        }
        if self.moments.len() != layers.len() {
            self.moments = layers.iter().map(Moments::for_layer).collect();
        }

        self.t += 1;
        self.beta1_t *= self.beta1;
        self.beta2_t *= self.beta2;
        let step_size = self.learning_rate * (1.0 - self.beta2_t).sqrt() / (1.0 - self.beta1_t);

        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);
        for ((layer, (w_grad, b_grad)), moments) in
            layers.iter_mut().zip(grads.iter()).zip(self.moments.iter_mut())
        {
            let w_step = moment_step(&mut moments.weights_m, &mut moments.weights_v, w_grad, b1, b2, eps, step_size);
            let b_step = moment_step(&mut moments.biases_m, &mut moments.biases_v, b_grad, b1, b2, eps, step_size);
            layer.apply_gradients(&w_step, &b_step);
        }
        Ok(())
    }
}

/// Updates `m` and `v` in place from `grad` and returns the parameter step.
fn moment_step(
    m: &mut Matrix,
    v: &mut Matrix,
    grad: &Matrix,
    b1: f64,
    b2: f64,
    eps: f64,
    step_size: f64,
) -> Matrix {
    let mut step = Matrix::zeros(grad.rows, grad.cols);
    for i in 0..grad.rows {
        for j in 0..grad.cols {
            let g = grad.data[i][j];
            let mi = &mut m.data[i][j];
            let vi = &mut v.data[i][j];
            *mi = b1 * *mi + (1.0 - b1) * g;
            *vi = b2 * *vi + (1.0 - b2) * g * g;
            step.data[i][j] = step_size * *mi / (vi.sqrt() + eps);
        }
    }
    step
}
