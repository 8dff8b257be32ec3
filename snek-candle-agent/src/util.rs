//! Utilities.
use anyhow::Result;
use candle_core::{Device, Tensor, WithDType};
use num_traits::AsPrimitive;

/// Interface for handling output dimensions.
pub trait OutDim {
    /// Returns the output dimension.
    fn get_out_dim(&self) -> i64;

    /// Sets the output dimension.
    fn set_out_dim(&mut self, v: i64);
}

/// Converts a vector into a 1-D tensor on the given device.
pub fn vec_to_tensor<T1, T2>(v: Vec<T1>, device: &Device) -> Result<Tensor>
where
    T1: AsPrimitive<T2>,
    T2: WithDType,
{
    let v = v.iter().map(|e| e.as_()).collect::<Vec<T2>>();
    let n = v.len();
    Ok(Tensor::from_vec(v, (n,), device)?)
}

/// One-hot encodes action indices into a `[n, n_actions]` float tensor.
pub fn one_hot(acts: &[usize], n_actions: usize, device: &Device) -> Result<Tensor> {
    let mut data = vec![0f32; acts.len() * n_actions];
    for (i, &a) in acts.iter().enumerate() {
        data[i * n_actions + a] = 1.0;
    }
    Ok(Tensor::from_vec(data, (acts.len(), n_actions), device)?)
}
