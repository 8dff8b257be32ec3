use anyhow::Result;
use clap::Parser;
use log::info;
use snek_candle_agent::{
    mlp::{ActorCriticMlp, MlpConfig},
    opt::OptimizerConfig,
    ppo::{Ppo, PpoConfig, PpoModelConfig},
    Activation, Device,
};
use snek_core::{
    record::CsvRecorder, Agent, Configurable, Evaluator, RewardShaping, Trainer, TrainerConfig,
};
use snek_env::{SnekEnv, SnekEnvConfig};
use std::{fs, path::Path};

type PpoAgent = Ppo<SnekEnv, ActorCriticMlp>;

const DIM_OBS: i64 = 6;
const DIM_ACT: i64 = 4;
const N_EPISODES_PER_EVAL: usize = 5;

/// Train/eval a PPO agent in the snake environment
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Train the agent, not evaluate
    #[arg(short, long, default_value_t = false)]
    train: bool,

    /// Evaluate the agent, not train
    #[arg(short, long, default_value_t = false)]
    eval: bool,

    /// Resume training from the best saved parameters
    #[arg(short, long, default_value_t = false)]
    resume: bool,

    /// Side length of the square grid
    #[arg(long, default_value_t = 12)]
    size: i64,

    /// Steps allowed without a fruit before the episode is truncated
    #[arg(long, default_value_t = 15)]
    hunger: usize,

    /// Wrap around the grid edges instead of dying on them
    #[arg(long, default_value_t = false)]
    no_walls: bool,

    /// Width of the hidden layers of the actor-critic network
    #[arg(long, default_value_t = 30)]
    hidden: i64,

    /// Number of training iterations
    #[arg(long, default_value_t = 500)]
    n_iter: usize,

    /// Number of episodes collected per batch
    #[arg(long, default_value_t = 32)]
    episodes_per_batch: usize,

    /// Discount factor
    #[arg(long, default_value_t = 0.99)]
    gamma: f32,

    /// Number of actor epochs per update
    #[arg(long, default_value_t = 5)]
    n_epochs: usize,

    /// Minibatch size of the actor epochs
    #[arg(long, default_value_t = 32)]
    minibatch: usize,

    /// Clipping range of the importance ratio
    #[arg(long, default_value_t = 0.2)]
    clip_eps: f64,

    /// KL divergence threshold for stopping the actor epochs early
    #[arg(long, default_value_t = 0.01)]
    target_kl: f64,

    /// Reward shaping mode: none, close-bonus or diff-dist-bonus
    #[arg(long, default_value = "none")]
    rs: String,

    /// Distance coefficient of the diff-dist-bonus shaping
    #[arg(long, default_value_t = 0.2)]
    dist_bonus: f32,

    /// Add an entropy bonus to the actor updates
    #[arg(long, default_value_t = false)]
    use_entropy: bool,

    /// Coefficient of the entropy bonus
    #[arg(long, default_value_t = 0.2)]
    beta: f64,

    /// Learning rate of the optimizer
    #[arg(long, default_value_t = 1e-3)]
    lr: f64,

    /// Random seed for the environment and the action sampler
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Directory where the best model parameters and metrics are saved
    #[arg(long, default_value = "./model/snek_ppo")]
    model_dir: String,
}

fn env_config(args: &Args) -> SnekEnvConfig {
    SnekEnvConfig::default()
        .size(args.size, args.size)
        .hunger(args.hunger)
        .walls(!args.no_walls)
}

fn agent_config(args: &Args) -> PpoConfig<ActorCriticMlp> {
    let opt_config = OptimizerConfig::default().learning_rate(args.lr);
    let mlp_config = MlpConfig::new(
        DIM_OBS,
        vec![args.hidden, args.hidden],
        DIM_ACT,
        Activation::Sigmoid,
    );
    let model_config = PpoModelConfig::default()
        .pi_config(mlp_config)
        .opt_config(opt_config);
    PpoConfig::default()
        .model_config(model_config)
        .n_epochs(args.n_epochs)
        .batch_size(args.minibatch)
        .clip_eps(args.clip_eps)
        .target_kl(args.target_kl)
        .use_entropy(args.use_entropy)
        .beta(args.beta)
        .seed(args.seed)
        .device(Device::Cpu)
}

fn train(args: &Args, model_dir: &str) -> Result<()> {
    let shaping = RewardShaping::parse(&args.rs, args.dist_bonus)?;
    let trainer_config = TrainerConfig::default()
        .n_iterations(args.n_iter)
        .episodes_per_batch(args.episodes_per_batch)
        .gamma(args.gamma)
        .reward_shaping(shaping)
        .seed(args.seed)
        .model_dir(model_dir);

    fs::create_dir_all(model_dir)?;
    let mut recorder = CsvRecorder::new(Path::new(model_dir).join("train.csv"))?;
    let mut trainer = Trainer::<SnekEnv>::build(trainer_config, env_config(args));
    let mut agent = PpoAgent::build(agent_config(args));
    if args.resume {
        agent.load_params(&Path::new(model_dir).join("best"))?;
        info!("Resumed from the parameters in {}/best", model_dir);
    }

    trainer.train(&mut agent, &mut recorder)?;
    info!(
        "Finished training, best reward: {:.3}, best length: {:.3}",
        trainer.best_reward(),
        trainer.best_length()
    );

    Ok(())
}

fn eval(args: &Args, model_dir: &str) -> Result<()> {
    let mut agent = PpoAgent::build(agent_config(args));
    agent.load_params(&Path::new(model_dir).join("best"))?;
    agent.eval();

    let record =
        Evaluator::<SnekEnv>::new(&env_config(args), args.seed + 1, N_EPISODES_PER_EVAL)?
            .evaluate(&mut agent)?;
    info!("eval_reward: {:.3}", record.get_scalar("eval_reward")?);

    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let model_dir = args.model_dir.clone();

    if args.train {
        train(&args, &model_dir)?;
    } else if args.eval {
        eval(&args, &model_dir)?;
    } else {
        train(&args, &model_dir)?;
        eval(&args, &model_dir)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_train_and_eval() -> Result<()> {
        let tmp_dir = TempDir::new("snek_ppo")?;
        let model_dir = match tmp_dir.as_ref().to_str() {
            Some(s) => s,
            None => panic!("Failed to get string of temporary directory"),
        };
        let args = Args::parse_from([
            "snek-train",
            "--size",
            "6",
            "--n-iter",
            "2",
            "--episodes-per-batch",
            "2",
            "--n-epochs",
            "1",
            "--hidden",
            "8",
        ]);
        train(&args, model_dir)?;
        eval(&args, model_dir)?;
        assert!(tmp_dir.path().join("train.csv").exists());
        assert!(tmp_dir.path().join("best").exists());
        Ok(())
    }
}
