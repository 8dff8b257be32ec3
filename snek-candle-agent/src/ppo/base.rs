//! PPO agent with a clipped surrogate objective.
use super::{config::PpoConfig, model::PpoModel};
use crate::{
    model::SubModel1,
    util::{one_hot, vec_to_tensor, OutDim},
};
use anyhow::Result;
use candle_core::{shape::D, Device, Tensor};
use candle_nn::{loss::mse, ops::softmax};
use rand::{
    distributions::{Distribution, WeightedIndex},
    rngs::SmallRng,
    seq::SliceRandom,
    SeedableRng,
};
use serde::{de::DeserializeOwned, Serialize};
use snek_core::{
    record::{Record, RecordValue},
    Agent, Configurable, Env, Policy, StochasticPolicy, TrainingSet,
};
use std::{fs, marker::PhantomData, path::Path};

/// Epsilon guarding the denominator of the importance ratio and the
/// arguments of the logarithms in the KL estimate.
const PROB_EPS: f64 = 1e-8;

/// Clipped surrogate actor loss over selected action probabilities.
///
/// All three tensors are 1-D with one element per transition. The loss is
/// the negated mean of `min(ratio * adv, clamp(ratio, 1 - eps, 1 + eps) * adv)`
/// where `ratio` is the probability under the current parameters divided by
/// the probability recorded at collection time.
pub(crate) fn clipped_surrogate(
    new_probs: &Tensor,
    old_probs: &Tensor,
    advs: &Tensor,
    clip_eps: f64,
) -> Result<Tensor> {
    let ratio = new_probs.div(&(old_probs + PROB_EPS)?)?;
    let surr = ratio.mul(advs)?;
    let clipped = ratio.clamp(1.0 - clip_eps, 1.0 + clip_eps)?.mul(advs)?;
    Ok(surr.minimum(&clipped)?.mean_all()?.neg()?)
}

/// First-order estimate of the KL divergence between the collecting policy
/// and the current policy, over the selected actions of the whole dataset.
pub(crate) fn approx_kl(old_probs: &Tensor, new_probs: &Tensor) -> Result<f32> {
    let old_log = (old_probs + PROB_EPS)?.log()?;
    let new_log = (new_probs + PROB_EPS)?.log()?;
    Ok((old_log - new_log)?.mean_all()?.to_scalar::<f32>()?)
}

/// Mean of `p * ln(p)` over the action distributions, the negated entropy.
///
/// Minimizing this quantity pushes the distributions toward uniform.
pub(crate) fn neg_entropy(probs: &Tensor) -> Result<Tensor> {
    Ok(probs.mul(&(probs + PROB_EPS)?.log()?)?.mean_all()?)
}

/// PPO agent over a discrete action set.
///
/// The actor and critic share the trunk of a single network `P` emitting
/// action logits and a state value. Each [`Agent::opt`] call runs several
/// epochs of clipped surrogate updates over shuffled minibatches, stopping
/// early when the policy drifts too far from the one that collected the
/// batch, then updates the critic once against the normalized returns.
pub struct Ppo<E, P>
where
    E: Env,
    E::Obs: AsRef<[f32]>,
    E::Act: From<usize>,
    P: SubModel1<Input = Tensor, Output = (Tensor, Tensor)>,
    P::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
{
    pub(in crate::ppo) model: PpoModel<P>,
    pub(in crate::ppo) n_epochs: usize,
    pub(in crate::ppo) batch_size: usize,
    pub(in crate::ppo) clip_eps: f64,
    pub(in crate::ppo) target_kl: f64,
    pub(in crate::ppo) use_entropy: bool,
    pub(in crate::ppo) beta: f64,
    pub(in crate::ppo) train: bool,
    pub(in crate::ppo) device: Device,
    pub(in crate::ppo) n_opts: usize,
    rng: SmallRng,
    phantom: PhantomData<E>,
}

impl<E, P> Ppo<E, P>
where
    E: Env,
    E::Obs: AsRef<[f32]>,
    E::Act: From<usize>,
    P: SubModel1<Input = Tensor, Output = (Tensor, Tensor)>,
    P::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
{
    /// Stacks observations into a `[n, dim]` tensor.
    fn obs_batch(&self, obs: &[E::Obs]) -> Result<Tensor> {
        let dim = obs[0].as_ref().len();
        let mut data = Vec::with_capacity(obs.len() * dim);
        for o in obs {
            data.extend_from_slice(o.as_ref());
        }
        Ok(Tensor::from_vec(data, (obs.len(), dim), &self.device)?)
    }

    /// Action distribution of the current policy for a single observation.
    fn action_probs(&self, obs: &E::Obs) -> Result<Vec<f32>> {
        let dim = obs.as_ref().len();
        let xs = Tensor::from_slice(obs.as_ref(), (1, dim), &self.device)?;
        let (logits, _) = self.model.forward(&xs);
        Ok(softmax(&logits, D::Minus1)?.squeeze(0)?.to_vec1::<f32>()?)
    }

    /// Probabilities of the selected actions under the current parameters.
    fn selected_probs(&self, obs: &Tensor, acts: &Tensor) -> Result<Tensor> {
        let (logits, _) = self.model.forward(obs);
        Ok(softmax(&logits, D::Minus1)?.mul(acts)?.sum(D::Minus1)?)
    }

    fn opt_(&mut self, dataset: &TrainingSet<E::Obs>) -> Result<Record> {
        let n = dataset.len();
        let obs = self.obs_batch(&dataset.obs)?;
        let acts = one_hot(&dataset.acts, self.n_actions(), &self.device)?;
        let old_probs = vec_to_tensor::<f32, f32>(dataset.old_probs.clone(), &self.device)?;
        let returns = vec_to_tensor::<f32, f32>(dataset.returns.clone(), &self.device)?;

        // Actor epochs with early stopping on the KL drift
        let mut indices: Vec<u32> = (0..n as u32).collect();
        let mut loss_actor = 0f32;
        let mut n_steps = 0;
        let mut opt_epochs = 0;
        let mut kl = 0f32;
        for _ in 0..self.n_epochs {
            indices.shuffle(&mut self.rng);
            for chunk in indices.chunks(self.batch_size) {
                let ixs = Tensor::from_slice(chunk, chunk.len(), &self.device)?;
                let obs_mb = obs.index_select(&ixs, 0)?;
                let acts_mb = acts.index_select(&ixs, 0)?;
                let old_mb = old_probs.index_select(&ixs, 0)?;
                let ret_mb = returns.index_select(&ixs, 0)?;

                let (logits, values) = self.model.forward(&obs_mb);
                let advs = (ret_mb - values.squeeze(D::Minus1)?.detach())?;
                let new_mb = softmax(&logits, D::Minus1)?.mul(&acts_mb)?.sum(D::Minus1)?;
                let loss = clipped_surrogate(&new_mb, &old_mb, &advs, self.clip_eps)?;
                self.model.backward_step(&loss)?;

                loss_actor += loss.to_scalar::<f32>()?;
                n_steps += 1;
            }
            opt_epochs += 1;

            let new_probs = self.selected_probs(&obs, &acts)?;
            kl = approx_kl(&old_probs, &new_probs)?;
            if kl as f64 > 1.5 * self.target_kl {
                break;
            }
        }
        loss_actor /= n_steps as f32;

        // Entropy of the current policy, optionally used as a bonus
        let (logits, _) = self.model.forward(&obs);
        let ent = neg_entropy(&softmax(&logits, D::Minus1)?)?;
        let entropy = ent.to_scalar::<f32>()?;
        if self.use_entropy {
            let loss = (ent * self.beta)?;
            self.model.backward_step(&loss)?;
        }

        // A single critic step per update call
        let (_, values) = self.model.forward(&obs);
        let pred = values.squeeze(D::Minus1)?;
        let loss = mse(&pred, &returns)?;
        self.model.backward_step(&loss)?;
        let loss_critic = loss.to_scalar::<f32>()?;

        self.n_opts += 1;

        Ok(Record::from_slice(&[
            ("loss_actor", RecordValue::Scalar(loss_actor)),
            ("loss_critic", RecordValue::Scalar(loss_critic)),
            ("kl", RecordValue::Scalar(kl)),
            ("entropy", RecordValue::Scalar(entropy)),
            ("opt_epochs", RecordValue::Scalar(opt_epochs as f32)),
        ]))
    }
}

impl<E, P> Policy<E> for Ppo<E, P>
where
    E: Env,
    E::Obs: AsRef<[f32]>,
    E::Act: From<usize>,
    P: SubModel1<Input = Tensor, Output = (Tensor, Tensor)>,
    P::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
{
    /// In evaluation mode, takes the most probable action.
    fn sample(&mut self, obs: &E::Obs) -> E::Act {
        let probs = self.action_probs(obs).unwrap();
        let ix = if self.train {
            WeightedIndex::new(&probs).unwrap().sample(&mut self.rng)
        } else {
            probs
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.total_cmp(b))
                .map(|(i, _)| i)
                .unwrap()
        };
        ix.into()
    }
}

impl<E, P> StochasticPolicy<E> for Ppo<E, P>
where
    E: Env,
    E::Obs: AsRef<[f32]>,
    E::Act: From<usize>,
    P: SubModel1<Input = Tensor, Output = (Tensor, Tensor)>,
    P::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
{
    fn n_actions(&self) -> usize {
        self.model.out_dim as usize
    }

    fn sample_with_prob(&mut self, obs: &E::Obs) -> Result<(E::Act, usize, f32)> {
        let probs = self.action_probs(obs)?;
        let ix = WeightedIndex::new(&probs)?.sample(&mut self.rng);
        Ok((ix.into(), ix, probs[ix]))
    }
}

impl<E, P> Configurable<E> for Ppo<E, P>
where
    E: Env,
    E::Obs: AsRef<[f32]>,
    E::Act: From<usize>,
    P: SubModel1<Input = Tensor, Output = (Tensor, Tensor)>,
    P::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
{
    type Config = PpoConfig<P>;

    /// Constructs PPO agent.
    fn build(config: Self::Config) -> Self {
        let device: Device = config
            .device
            .expect("No device is given for PPO agent")
            .into();
        let model = PpoModel::build(config.model_config, device.clone()).unwrap();

        Ppo {
            model,
            n_epochs: config.n_epochs,
            batch_size: config.batch_size,
            clip_eps: config.clip_eps,
            target_kl: config.target_kl,
            use_entropy: config.use_entropy,
            beta: config.beta,
            train: config.train,
            device,
            n_opts: 0,
            rng: SmallRng::seed_from_u64(config.seed),
            phantom: PhantomData,
        }
    }
}

impl<E, P> Agent<E> for Ppo<E, P>
where
    E: Env,
    E::Obs: AsRef<[f32]>,
    E::Act: From<usize>,
    P: SubModel1<Input = Tensor, Output = (Tensor, Tensor)>,
    P::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
{
    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    fn opt(&mut self, dataset: &TrainingSet<E::Obs>) -> Result<Record> {
        self.opt_(dataset)
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        self.model
            .save(path.join("actor_critic.safetensors").as_path())?;
        Ok(())
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        self.model
            .load(path.join("actor_critic.safetensors").as_path())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mlp::{ActorCriticMlp, MlpConfig},
        ppo::PpoModelConfig,
        Activation,
    };
    use snek_env::{SnekEnv, SnekObs};
    use tempdir::TempDir;

    type PpoAgent = Ppo<SnekEnv, ActorCriticMlp>;

    fn agent(n_epochs: usize, target_kl: f64) -> PpoAgent {
        let model_config = PpoModelConfig::default()
            .pi_config(MlpConfig::new(6, vec![16, 16], 4, Activation::Sigmoid));
        let config = PpoConfig::<ActorCriticMlp>::default()
            .model_config(model_config)
            .n_epochs(n_epochs)
            .batch_size(4)
            .target_kl(target_kl)
            .seed(7)
            .device(crate::Device::Cpu);
        let mut agent = PpoAgent::build(config);
        agent.train();
        agent
    }

    fn dataset(n: usize, old_prob: f32) -> TrainingSet<SnekObs> {
        let obs = (0..n)
            .map(|i| SnekObs(vec![i as f32, 1.0, 2.0, 3.0, 0.0, 4.0]))
            .collect::<Vec<_>>();
        let acts = (0..n).map(|i| i % 4).collect::<Vec<_>>();
        let returns = (0..n).map(|i| (i as f32) / n as f32 - 0.5).collect();
        TrainingSet {
            obs,
            acts,
            old_probs: vec![old_prob; n],
            returns,
        }
    }

    #[test]
    fn clipped_surrogate_clips_large_ratios() -> Result<()> {
        let device = Device::Cpu;
        let new = Tensor::from_slice(&[0.5f32], (1,), &device)?;
        let old = Tensor::from_slice(&[0.25f32], (1,), &device)?;

        // Positive advantage, ratio 2.0 clipped down to 1.2
        let advs = Tensor::from_slice(&[1.0f32], (1,), &device)?;
        let loss = clipped_surrogate(&new, &old, &advs, 0.2)?.to_scalar::<f32>()?;
        assert!((loss + 1.2).abs() < 1e-4);

        // Negative advantage, the unclipped term is the pessimistic one
        let advs = Tensor::from_slice(&[-1.0f32], (1,), &device)?;
        let loss = clipped_surrogate(&new, &old, &advs, 0.2)?.to_scalar::<f32>()?;
        assert!((loss - 2.0).abs() < 1e-4);
        Ok(())
    }

    #[test]
    fn clipped_surrogate_depends_only_on_the_ratio() -> Result<()> {
        let device = Device::Cpu;
        let advs = Tensor::from_slice(&[1.0f32, -0.5, 2.0], (3,), &device)?;
        let new = [0.3f32, 0.1, 0.45];
        let old = [0.2f32, 0.2, 0.3];
        let scaled_new = new.map(|p| 0.5 * p);
        let scaled_old = old.map(|p| 0.5 * p);

        let loss = clipped_surrogate(
            &Tensor::from_slice(&new[..], (3,), &device)?,
            &Tensor::from_slice(&old[..], (3,), &device)?,
            &advs,
            0.2,
        )?
        .to_scalar::<f32>()?;
        let scaled = clipped_surrogate(
            &Tensor::from_slice(&scaled_new[..], (3,), &device)?,
            &Tensor::from_slice(&scaled_old[..], (3,), &device)?,
            &advs,
            0.2,
        )?
        .to_scalar::<f32>()?;
        assert!((loss - scaled).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn approx_kl_is_zero_for_identical_distributions() -> Result<()> {
        let device = Device::Cpu;
        let p = Tensor::from_slice(&[0.4f32, 0.6], (2,), &device)?;
        let kl = approx_kl(&p, &p)?;
        assert!(kl.abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn approx_kl_grows_as_probabilities_drop() -> Result<()> {
        let device = Device::Cpu;
        let old = Tensor::from_slice(&[0.5f32, 0.5], (2,), &device)?;
        let new = Tensor::from_slice(&[0.9f32, 0.1], (2,), &device)?;
        let kl = approx_kl(&old, &new)?;
        assert!((kl - 0.5108).abs() < 1e-3);
        Ok(())
    }

    #[test]
    fn neg_entropy_is_smallest_for_uniform_distribution() -> Result<()> {
        let device = Device::Cpu;
        let uniform = Tensor::from_slice(&[0.25f32; 4], (1, 4), &device)?;
        let peaked = Tensor::from_slice(&[0.97f32, 0.01, 0.01, 0.01], (1, 4), &device)?;
        let e_uniform = neg_entropy(&uniform)?.to_scalar::<f32>()?;
        let e_peaked = neg_entropy(&peaked)?.to_scalar::<f32>()?;
        assert!(e_uniform < e_peaked);
        Ok(())
    }

    #[test]
    fn excessive_kl_stops_the_epochs_early() -> Result<()> {
        // A fresh network assigns roughly 0.25 to each action, far from the
        // recorded probabilities, so the first KL check already trips.
        let mut agent = agent(5, 0.01);
        let record = agent.opt(&dataset(16, 0.999))?;
        assert_eq!(record.get_scalar("opt_epochs")?, 1.0);
        assert!(record.get_scalar("kl")? > 0.0);
        Ok(())
    }

    #[test]
    fn all_epochs_run_under_a_loose_kl_threshold() -> Result<()> {
        let mut agent = agent(3, 1e9);
        let record = agent.opt(&dataset(16, 0.25))?;
        assert_eq!(record.get_scalar("opt_epochs")?, 3.0);
        record.get_scalar("loss_actor")?;
        record.get_scalar("loss_critic")?;
        record.get_scalar("entropy")?;
        Ok(())
    }

    #[test]
    fn saved_params_restore_the_action_distribution() -> Result<()> {
        let mut a = agent(1, 0.01);
        let mut b = agent(1, 0.01);
        // Nudge the parameters of `a` away from the initialization of `b`.
        a.opt(&dataset(16, 0.25))?;

        let dir = TempDir::new("ppo_params")?;
        a.save_params(dir.path())?;
        b.load_params(dir.path())?;

        let obs = SnekObs(vec![1.0, 2.0, 3.0, 4.0, 0.0, 4.0]);
        let pa = a.action_probs(&obs)?;
        let pb = b.action_probs(&obs)?;
        for (x, y) in pa.iter().zip(pb.iter()) {
            assert!((x - y).abs() < 1e-6);
        }
        Ok(())
    }

    #[test]
    fn sampled_probabilities_match_the_distribution() -> Result<()> {
        let mut a = agent(1, 0.01);
        let obs = SnekObs(vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
        let probs = a.action_probs(&obs)?;
        let (_, ix, p) = a.sample_with_prob(&obs)?;
        assert!(ix < 4);
        assert!((p - probs[ix]).abs() < 1e-6);
        Ok(())
    }
}
