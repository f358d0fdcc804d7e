use burn::prelude::Backend;
use burn::tensor::{Element, Tensor, TensorData};
use ndarray::Array2;

use crate::error::Result;

pub fn vec2tensor1<B: Backend, T: Element>(arr: Vec<T>, device: &B::Device) -> Tensor<B, 1> {
    let shape = [arr.len()];
    Tensor::<B, 1>::from_data(TensorData::new(arr, shape), device)
}

pub fn ndarray2tensor2<B: Backend, T: Element>(arr: Array2<T>, device: &B::Device) -> Tensor<B, 2> {
    let shape = arr.shape().to_vec();
    let vec = arr.into_raw_vec_and_offset().0;
    Tensor::<B, 2>::from_data(TensorData::new(vec, shape), device)
}

/// Stacks equally sized rows into a (rows, width) tensor.
pub fn rows2tensor2<B: Backend, T: Element>(
    rows: &[Vec<T>],
    width: usize,
    device: &B::Device,
) -> Result<Tensor<B, 2>> {
    let flat: Vec<T> = rows.iter().flat_map(|row| row.iter().copied()).collect();
    let arr = Array2::from_shape_vec((rows.len(), width), flat)?;
    Ok(ndarray2tensor2(arr, device))
}

pub fn tensor2vec1<B: Backend>(tensor: &Tensor<B, 1>) -> Vec<f32> {
    tensor.to_data().iter::<f32>().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};
    use ndarray::Array;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;

    #[test]
    fn test_rows_round_trip() {
        let device = NdArrayDevice::default();
        let arr = Array::random((6, 4), Uniform::new(-1.0f32, 1.0));
        let rows: Vec<Vec<f32>> = arr.rows().into_iter().map(|r| r.to_vec()).collect();

        let tensor = rows2tensor2::<NdArray, f32>(&rows, 4, &device).unwrap();
        assert_eq!(tensor.dims(), [6, 4]);
        let flat: Vec<f32> = arr.iter().copied().collect();
        assert_eq!(tensor.into_data().to_vec::<f32>().unwrap(), flat);
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let rows = vec![vec![1.0f32, 2.0], vec![3.0]];
        assert!(rows2tensor2::<NdArray, f32>(&rows, 2, &NdArrayDevice::default()).is_err());
    }
}
