use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use burn::config::Config;
use burn::module::AutodiffModule;
use burn::tensor::backend::AutodiffBackend;
use chrono::Utc;
use chrono_tz::Tz;
use log::{debug, info, warn};

use crate::error::{PpoError, Result};
use crate::rl_env::env::RlEnv;
use crate::rl_env::env_sampler::{collect_rollout, run_eval_episode, EvalInfo, RolloutStats};

use super::checkpoint::{load_checkpoint, save_checkpoint};
use super::config::TrainConfig;
use super::model::{ActorModel, BaselineModel, InferenceMode, PolicyParameters, RlTrainAlgorithm};
use super::rl_utils::{estimate_advantages, mean, AdvantageTargets, UpdateInfo};
use super::{EpochLogger, MetricsSink, TrainingContext};

type Snapshot<B, AM, BM> = InferenceMode<
    <B as AutodiffBackend>::InnerBackend,
    <AM as AutodiffModule<B>>::InnerModule,
    <BM as AutodiffModule<B>>::InnerModule,
>;

fn snapshot<B, AM, BM>(params: &PolicyParameters<B, AM, BM>) -> Snapshot<B, AM, BM>
where
    B: AutodiffBackend,
    AM: ActorModel<B> + AutodiffModule<B>,
    AM::InnerModule: ActorModel<B::InnerBackend>,
    BM: BaselineModel<B> + AutodiffModule<B>,
    BM::InnerModule: BaselineModel<B::InnerBackend>,
{
    InferenceMode::enter::<B, AM, BM>(&params.actor, &params.critic)
}

/// Drives collect -> estimate -> update -> evaluate on a single environment.
pub struct OnPolicyRunner<E: RlEnv, B: AutodiffBackend, S: MetricsSink = EpochLogger> {
    env: E,
    device: B::Device,
    config: TrainConfig,
    sink: S,
    stop: Arc<AtomicBool>,
    exp_name: String,
    exp_base_path: PathBuf,
    backend: PhantomData<B>,
}

impl<E: RlEnv, B: AutodiffBackend> OnPolicyRunner<E, B, EpochLogger> {
    /// Scalars go to TensorBoard under `{log_dir}/{exp_name}`.
    pub fn new(env: E, device: B::Device, config: TrainConfig) -> Result<Self> {
        let exp_name = experiment_name(&config)?;
        let logger = EpochLogger::new(&format!("{}/{}", config.log_dir, exp_name));
        Self::build(env, device, config, logger, exp_name)
    }
}

impl<E: RlEnv, B: AutodiffBackend, S: MetricsSink> OnPolicyRunner<E, B, S> {
    pub fn with_sink(env: E, device: B::Device, config: TrainConfig, sink: S) -> Result<Self> {
        let exp_name = experiment_name(&config)?;
        Self::build(env, device, config, sink, exp_name)
    }

    fn build(env: E, device: B::Device, config: TrainConfig, sink: S, exp_name: String) -> Result<Self> {
        config.validate()?;
        let exp_base_path = Path::new(&config.ckpt_save_path).join(&exp_name);
        std::fs::create_dir_all(&exp_base_path)?;
        info!("experiment {}", exp_name);
        Ok(Self {
            env,
            device,
            config,
            sink,
            stop: Arc::new(AtomicBool::new(false)),
            exp_name,
            exp_base_path,
            backend: PhantomData,
        })
    }

    pub fn exp_name(&self) -> &str {
        &self.exp_name
    }

    pub fn exp_base_path(&self) -> &Path {
        &self.exp_base_path
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Setting the flag ends training at the next iteration boundary.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn with_stop_handle(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn checkpoint_dir(&self, name: &str) -> PathBuf {
        Path::new(&self.config.ckpt_save_path).join(name)
    }

    /// Trains until `train_iter` iterations, a stop request or an error.
    /// The parameters are saved as `ppo_{run_tag}_latest` on every exit
    /// taken after the loop has started.
    pub fn train<AM, BM, RlAlgo>(
        &mut self,
        params: &mut PolicyParameters<B, AM, BM>,
        train_algo: &mut RlAlgo,
    ) -> Result<TrainingContext>
    where
        AM: ActorModel<B> + AutodiffModule<B>,
        AM::InnerModule: ActorModel<B::InnerBackend>,
        BM: BaselineModel<B> + AutodiffModule<B>,
        BM::InnerModule: BaselineModel<B::InnerBackend>,
        RlAlgo: RlTrainAlgorithm<B, AM, BM>,
    {
        self.config.save(self.exp_base_path.join("config.json"))?;
        let start_iteration = self.resume(params)?;
        let mut ctx = TrainingContext::new(start_iteration);

        let outcome = self.train_loop(params, train_algo, &mut ctx);
        let latest = self.checkpoint_dir(&self.config.latest_checkpoint_name());
        let saved = save_checkpoint(params, &latest);
        match (outcome, saved) {
            (Ok(()), Ok(_)) => {
                info!(
                    "training finished at iteration {}, {} successful overtakes",
                    ctx.iteration, ctx.success_count
                );
                Ok(ctx)
            }
            (Ok(()), Err(err)) => Err(err),
            (Err(err), Ok(_)) => Err(err),
            (Err(err), Err(save_err)) => {
                warn!("final checkpoint failed: {}", save_err);
                Err(err)
            }
        }
    }

    fn resume<AM, BM>(&self, params: &mut PolicyParameters<B, AM, BM>) -> Result<usize>
    where
        AM: AutodiffModule<B>,
        BM: AutodiffModule<B>,
    {
        let Some(iteration) = self.config.resume_iteration else {
            return Ok(0);
        };
        let dir = self.checkpoint_dir(&self.config.periodic_checkpoint_name(iteration));
        load_checkpoint(params, &dir, &self.device)?;
        info!("resuming at iteration {}", iteration);
        Ok(iteration)
    }

    fn train_loop<AM, BM, RlAlgo>(
        &mut self,
        params: &mut PolicyParameters<B, AM, BM>,
        train_algo: &mut RlAlgo,
        ctx: &mut TrainingContext,
    ) -> Result<()>
    where
        AM: ActorModel<B> + AutodiffModule<B>,
        AM::InnerModule: ActorModel<B::InnerBackend>,
        BM: BaselineModel<B> + AutodiffModule<B>,
        BM::InnerModule: BaselineModel<B::InnerBackend>,
        RlAlgo: RlTrainAlgorithm<B, AM, BM>,
    {
        while ctx.iteration < self.config.train_iter {
            if self.stop.load(Ordering::SeqCst) {
                info!("stop requested at iteration {}", ctx.iteration);
                break;
            }
            self.train_iteration(params, train_algo, ctx)?;
        }
        Ok(())
    }

    fn train_iteration<AM, BM, RlAlgo>(
        &mut self,
        params: &mut PolicyParameters<B, AM, BM>,
        train_algo: &mut RlAlgo,
        ctx: &mut TrainingContext,
    ) -> Result<()>
    where
        AM: ActorModel<B> + AutodiffModule<B>,
        AM::InnerModule: ActorModel<B::InnerBackend>,
        BM: BaselineModel<B> + AutodiffModule<B>,
        BM::InnerModule: BaselineModel<B::InnerBackend>,
        RlAlgo: RlTrainAlgorithm<B, AM, BM>,
    {
        let iteration = ctx.iteration;
        info!("iteration {}", iteration);

        let (trajectory, stats) = {
            let policy = snapshot(params);
            collect_rollout(&mut self.env, &policy, self.config.horizon)?
        };
        self.log_rollout(&stats);

        let ppo_config = &self.config.ppo_train_config;
        let targets = estimate_advantages(&trajectory, ppo_config.gamma, ppo_config.gae_lambda);
        let update_info = train_algo.train(params, &trajectory, &targets, &self.device)?;
        self.log_update(&update_info, &targets);

        if (iteration + 1) % self.config.save_model_freq == 0 {
            let name = self.config.periodic_checkpoint_name(iteration + 1);
            save_checkpoint(params, &self.checkpoint_dir(&name))?;
        }

        let eval_info = {
            let policy = snapshot(params);
            run_eval_episode(&mut self.env, &policy, self.config.render_eval)?
        };
        if eval_info.success {
            ctx.success_count += 1;
            info!("overtake succeeded at iteration {}", iteration);
        } else {
            info!("overtake failed at iteration {}", iteration);
        }
        info!("success rate: {}/{}", ctx.success_count, iteration + 1);
        self.log_eval(&eval_info);

        ctx.iteration += 1;
        self.sink
            .add_scalar("time/elapsed_seconds", ctx.elapsed().as_secs_f32());
        self.sink
            .add_scalar("time/episodes_per_second", ctx.episodes_per_second());
        self.sink.flush(iteration);
        Ok(())
    }

    fn log_rollout(&mut self, stats: &RolloutStats) {
        let (Some(mean_reward), Some(min_reward), Some(max_reward)) = (
            stats.mean_episode_reward(),
            stats.min_episode_reward(),
            stats.max_episode_reward(),
        ) else {
            debug!("no episode finished inside the rollout");
            return;
        };
        self.sink.add_scalar("rollout/mean_episode_reward", mean_reward);
        self.sink.add_scalar("rollout/min_episode_reward", min_reward);
        self.sink.add_scalar("rollout/max_episode_reward", max_reward);
    }

    fn log_update(&mut self, update_info: &UpdateInfo, targets: &AdvantageTargets) {
        if update_info.early_stopped {
            info!(
                "kl early stop after {} applied epochs",
                update_info.applied_steps
            );
        }
        self.sink.add_scalar("train/total_loss", update_info.total_loss);
        self.sink.add_scalar("train/value_loss", update_info.value_loss);
        self.sink.add_scalar("train/kl_divergence", update_info.kl);
        self.sink
            .add_scalar("train/mean_advantage", mean(&targets.advantages));
        self.sink.add_scalar("train/mean_return", mean(&targets.returns));
    }

    fn log_eval(&mut self, eval_info: &EvalInfo) {
        self.sink
            .add_scalar("eval/episode_reward", eval_info.episode_reward);
        self.sink
            .add_scalar("eval/min_relative_distance", eval_info.min_relative_distance);
        self.sink
            .add_scalar("eval/success", if eval_info.success { 1.0 } else { 0.0 });
    }

    /// Runs `episodes` evaluation episodes without touching the parameters.
    pub fn evaluate<AM, BM>(
        &mut self,
        params: &PolicyParameters<B, AM, BM>,
        episodes: usize,
    ) -> Result<Vec<EvalInfo>>
    where
        AM: ActorModel<B> + AutodiffModule<B>,
        AM::InnerModule: ActorModel<B::InnerBackend>,
        BM: BaselineModel<B> + AutodiffModule<B>,
        BM::InnerModule: BaselineModel<B::InnerBackend>,
    {
        let policy = snapshot(params);
        let mut results = Vec::with_capacity(episodes);
        let mut success_count = 0;
        for episode in 0..episodes {
            let eval_info = run_eval_episode(&mut self.env, &policy, self.config.render_eval)?;
            if eval_info.success {
                success_count += 1;
            }
            info!(
                "eval episode {}: reward={} min_relative_distance={} success={}",
                episode, eval_info.episode_reward, eval_info.min_relative_distance, eval_info.success
            );
            self.log_eval(&eval_info);
            self.sink.flush(episode);
            results.push(eval_info);
        }
        info!("success rate: {}/{}", success_count, episodes);
        Ok(results)
    }
}

/// `{model}_{env}[_{tag}]_{timestamp}` in the configured timezone.
pub fn experiment_name(config: &TrainConfig) -> Result<String> {
    let tz: Tz = config
        .log_timezone
        .parse()
        .map_err(|_| PpoError::Config(format!("unknown timezone {}", config.log_timezone)))?;
    let timestamp = Utc::now().with_timezone(&tz).format("%m-%d_%H-%M-%S");
    Ok(match &config.run_tag {
        Some(tag) => format!("{}_{}_{}_{}", config.model_name, config.env_name, tag, timestamp),
        None => format!("{}_{}_{}", config.model_name, config.env_name, timestamp),
    })
}
