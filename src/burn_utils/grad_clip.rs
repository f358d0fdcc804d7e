use std::marker::PhantomData;

use burn::module::{AutodiffModule, ModuleVisitor, ParamId};
use burn::optim::GradientsParams;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::cast::ToElement;
use burn::tensor::Tensor;

struct GradNormVisitor<'a, B: AutodiffBackend> {
    grads: &'a GradientsParams,
    sum_sq: f64,
    _backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for GradNormVisitor<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(id) {
            self.sum_sq += grad.powf_scalar(2.0).sum().into_scalar().to_f64();
        }
    }
}

struct GradScaleVisitor<'a, B: AutodiffBackend> {
    grads: &'a mut GradientsParams,
    scale: f32,
    _backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for GradScaleVisitor<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(id) {
            self.grads
                .register::<B::InnerBackend, D>(id, grad.mul_scalar(self.scale));
        }
    }
}

/// L2 norm over every parameter gradient of `module`.
pub fn grad_norm<B: AutodiffBackend, M: AutodiffModule<B>>(
    module: &M,
    grads: &GradientsParams,
) -> f32 {
    let mut visitor = GradNormVisitor::<B> {
        grads,
        sum_sq: 0.0,
        _backend: PhantomData,
    };
    module.visit(&mut visitor);
    visitor.sum_sq.sqrt() as f32
}

/// Rescales `grads` in place so their global L2 norm is at most `max_norm`.
/// Returns the norm measured before clipping.
pub fn clip_grad_norm<B: AutodiffBackend, M: AutodiffModule<B>>(
    module: &M,
    grads: &mut GradientsParams,
    max_norm: f32,
) -> f32 {
    let total_norm = grad_norm::<B, M>(module, grads);
    let clip_coef = max_norm / (total_norm + 1e-6);
    if clip_coef < 1.0 {
        let mut visitor = GradScaleVisitor::<B> {
            grads,
            scale: clip_coef,
            _backend: PhantomData,
        };
        module.visit(&mut visitor);
    }
    total_norm
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
    use burn::nn::{Linear, LinearConfig};

    type AB = Autodiff<NdArray>;

    fn grads_of(linear: &Linear<AB>, scale: f32) -> GradientsParams {
        let device = NdArrayDevice::default();
        let x = Tensor::<AB, 2>::ones([4, 3], &device);
        let loss = linear.forward(x).sum().mul_scalar(scale);
        GradientsParams::from_grads(loss.backward(), linear)
    }

    #[test]
    fn test_large_gradients_are_rescaled() {
        let linear = LinearConfig::new(3, 2).init::<AB>(&NdArrayDevice::default());
        let mut grads = grads_of(&linear, 100.0);

        let before = clip_grad_norm::<AB, _>(&linear, &mut grads, 0.5);
        assert!(before > 0.5);
        let after = grad_norm::<AB, _>(&linear, &grads);
        assert!((after - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_small_gradients_are_untouched() {
        let linear = LinearConfig::new(3, 2).init::<AB>(&NdArrayDevice::default());
        let mut grads = grads_of(&linear, 0.01);

        let before = clip_grad_norm::<AB, _>(&linear, &mut grads, 10.0);
        let after = grad_norm::<AB, _>(&linear, &grads);
        assert_eq!(before, after);
    }
}
