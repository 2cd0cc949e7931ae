//! Per-sample gradient storage.

/// First- and second-order gradients for every training row.
///
/// Filled once per boosting round by the objective, read by the histogram
/// builder. Allocated once and reused across rounds.
#[derive(Debug, Clone)]
pub struct GradientBuffer {
    grad: Vec<f32>,
    hess: Vec<f32>,
}

impl GradientBuffer {
    /// Allocate zeroed buffers for `n_rows` samples.
    pub fn new(n_rows: usize) -> Self {
        Self { grad: vec![0.0; n_rows], hess: vec![0.0; n_rows] }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.grad.len()
    }

    /// True if the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.grad.is_empty()
    }

    /// Gradient values.
    #[inline]
    pub fn grad(&self) -> &[f32] {
        &self.grad
    }

    /// Hessian values.
    #[inline]
    pub fn hess(&self) -> &[f32] {
        &self.hess
    }

    /// Mutable views of both buffers for the objective to fill.
    #[inline]
    pub fn as_mut_slices(&mut self) -> (&mut [f32], &mut [f32]) {
        (&mut self.grad, &mut self.hess)
    }
}
