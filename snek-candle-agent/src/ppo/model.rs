use crate::{
    model::SubModel1,
    opt::{Optimizer, OptimizerConfig},
    util::OutDim,
};
use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use log::info;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`PpoModel`].
pub struct PpoModelConfig<P>
where
    P: OutDim,
{
    pub(super) pi_config: Option<P>,
    pub(super) opt_config: OptimizerConfig,
}

impl<P> Default for PpoModelConfig<P>
where
    P: OutDim,
{
    fn default() -> Self {
        Self {
            pi_config: None,
            opt_config: OptimizerConfig::default(),
        }
    }
}

impl<P> PpoModelConfig<P>
where
    P: DeserializeOwned + Serialize + OutDim,
{
    /// Sets configurations for the actor-critic network.
    pub fn pi_config(mut self, v: P) -> Self {
        self.pi_config = Some(v);
        self
    }

    /// Sets output dimension of the model.
    pub fn out_dim(mut self, v: i64) -> Self {
        match &mut self.pi_config {
            None => {}
            Some(pi_config) => pi_config.set_out_dim(v),
        };
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Constructs [`PpoModelConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`PpoModelConfig`] to as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Actor-critic network with its optimizer.
pub struct PpoModel<P>
where
    P: SubModel1<Output = (Tensor, Tensor)>,
    P::Config: DeserializeOwned + Serialize + OutDim,
{
    device: Device,
    varmap: VarMap,

    // Dimension of the action logits (equal to the number of actions).
    pub(super) out_dim: i64,

    // Actor-critic network
    pi: P,

    // Optimizer
    opt: Optimizer,
}

impl<P> PpoModel<P>
where
    P: SubModel1<Output = (Tensor, Tensor)>,
    P::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    /// Constructs [`PpoModel`].
    pub fn build(config: PpoModelConfig<P::Config>, device: Device) -> Result<Self> {
        let pi_config = config.pi_config.context("pi_config is not set.")?;
        let out_dim = pi_config.get_out_dim();
        let opt_config = config.opt_config;
        let varmap = VarMap::new();
        let pi = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
            P::build(vb, pi_config.clone())
        };
        let opt = opt_config.build(varmap.all_vars())?;

        Ok(Self {
            device,
            varmap,
            out_dim,
            pi,
            opt,
        })
    }

    /// Outputs action logits and state values given observation(s).
    pub fn forward(&self, obs: &P::Input) -> (Tensor, Tensor) {
        self.pi.forward(obs)
    }

    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        self.opt.backward_step(loss)
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn save<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        self.varmap.save(&path)?;
        info!("Save ppomodel to {:?}", path.as_ref());
        Ok(())
    }

    pub fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.varmap.load(&path)?;
        info!("Load ppomodel from {:?}", path.as_ref());
        Ok(())
    }
}
