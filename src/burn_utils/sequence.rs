use burn::{
    nn::{Linear, LinearConfig, Tanh},
    prelude::*,
};

#[derive(Module, Debug)]
pub enum BurnForwarder<B: Backend> {
    Linear(Linear<B>),
    Tanh(Tanh),
}

#[derive(Module, Debug)]
pub struct Sequence<B: Backend> {
    forwarder_vec: Vec<BurnForwarder<B>>,
}

impl<B: Backend> Sequence<B> {
    pub fn push(&mut self, forwarder: BurnForwarder<B>) {
        self.forwarder_vec.push(forwarder);
    }

    pub fn len(&self) -> usize {
        self.forwarder_vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forwarder_vec.is_empty()
    }

    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        let mut out = input;
        for forwarder in &self.forwarder_vec {
            out = match forwarder {
                BurnForwarder::Linear(linear) => linear.forward(out),
                BurnForwarder::Tanh(tanh) => tanh.forward(out),
            }
        }
        out
    }
}

/// `n_layers` tanh hidden layers of width `hidden_dim`, then a linear head.
pub fn build_mlp<B: Backend>(
    input_size: usize,
    output_size: usize,
    n_layers: usize,
    hidden_dim: usize,
    device: &B::Device,
) -> Sequence<B> {
    let mut seq: Sequence<B> = Sequence {
        forwarder_vec: vec![],
    };
    let mut in_size = input_size;
    for _ in 0..n_layers {
        seq.push(BurnForwarder::Linear(
            LinearConfig::new(in_size, hidden_dim).init(device),
        ));
        seq.push(BurnForwarder::Tanh(Tanh::new()));
        in_size = hidden_dim;
    }
    seq.push(BurnForwarder::Linear(
        LinearConfig::new(in_size, output_size).init(device),
    ));
    seq
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};

    #[test]
    fn test_build_mlp() {
        let device = NdArrayDevice::default();
        let mlp = build_mlp::<NdArray>(5, 3, 2, 16, &device);
        assert_eq!(mlp.len(), 5);

        let out = mlp.forward(Tensor::<NdArray, 2>::ones([7, 5], &device));
        assert_eq!(out.dims(), [7, 3]);
    }
}
