use std::path::{Path, PathBuf};

use burn::module::AutodiffModule;
use burn::optim::Optimizer;
use burn::prelude::Backend;
use burn::record::{DefaultFileRecorder, FullPrecisionSettings, Record, Recorder, RecorderError};
use burn::tensor::backend::AutodiffBackend;
use log::info;

use crate::error::{PpoError, Result};

use super::model::{adam_config, PolicyParameters};

pub const ACTOR_STATE: &str = "actor_state";
pub const CRITIC_STATE: &str = "critic_state";
pub const ACTOR_OPTIMIZER_STATE: &str = "actor_optimizer_state";
pub const CRITIC_OPTIMIZER_STATE: &str = "critic_optimizer_state";

type CheckpointRecorder = DefaultFileRecorder<FullPrecisionSettings>;

fn checkpoint_err(op: &'static str, field: &'static str, dir: &Path) -> impl Fn(RecorderError) -> PpoError {
    let path = dir.to_path_buf();
    move |err| PpoError::Checkpoint {
        op,
        field,
        path: path.clone(),
        reason: err.to_string(),
    }
}

fn save_field<B: Backend, R: Record<B>>(
    recorder: &CheckpointRecorder,
    record: R,
    dir: &Path,
    field: &'static str,
) -> Result<()> {
    recorder
        .record(record, dir.join(field))
        .map_err(checkpoint_err("save", field, dir))?;
    Ok(())
}

fn load_field<B: Backend, R: Record<B>>(
    recorder: &CheckpointRecorder,
    dir: &Path,
    field: &'static str,
    device: &B::Device,
) -> Result<R> {
    recorder
        .load(dir.join(field), device)
        .map_err(checkpoint_err("load", field, dir))
}

/// Writes the four records of `params` into the directory `dir`.
pub fn save_checkpoint<B, AM, BM>(params: &PolicyParameters<B, AM, BM>, dir: &Path) -> Result<PathBuf>
where
    B: AutodiffBackend,
    AM: AutodiffModule<B>,
    BM: AutodiffModule<B>,
{
    std::fs::create_dir_all(dir)?;
    let recorder = CheckpointRecorder::new();
    save_field::<B, _>(&recorder, params.actor.clone().into_record(), dir, ACTOR_STATE)?;
    save_field::<B, _>(&recorder, params.critic.clone().into_record(), dir, CRITIC_STATE)?;
    save_field::<B, _>(
        &recorder,
        params.actor_optimizer.to_record(),
        dir,
        ACTOR_OPTIMIZER_STATE,
    )?;
    save_field::<B, _>(
        &recorder,
        params.critic_optimizer.to_record(),
        dir,
        CRITIC_OPTIMIZER_STATE,
    )?;
    info!("checkpoint saved to {}", dir.display());
    Ok(dir.to_path_buf())
}

/// Restores `params` from `dir`. Either all four records load or `params`
/// is left unchanged.
pub fn load_checkpoint<B, AM, BM>(
    params: &mut PolicyParameters<B, AM, BM>,
    dir: &Path,
    device: &B::Device,
) -> Result<()>
where
    B: AutodiffBackend,
    AM: AutodiffModule<B>,
    BM: AutodiffModule<B>,
{
    if !dir.is_dir() {
        return Err(PpoError::CheckpointMissing(dir.to_path_buf()));
    }
    let recorder = CheckpointRecorder::new();
    let actor_record = load_field::<B, _>(&recorder, dir, ACTOR_STATE, device)?;
    let critic_record = load_field::<B, _>(&recorder, dir, CRITIC_STATE, device)?;
    let actor_opti_record = load_field::<B, _>(&recorder, dir, ACTOR_OPTIMIZER_STATE, device)?;
    let critic_opti_record = load_field::<B, _>(&recorder, dir, CRITIC_OPTIMIZER_STATE, device)?;

    params.actor = params.actor.clone().load_record(actor_record);
    params.critic = params.critic.clone().load_record(critic_record);
    params.actor_optimizer = std::mem::replace(
        &mut params.actor_optimizer,
        adam_config().init::<B, AM>(),
    )
    .load_record(actor_opti_record);
    params.critic_optimizer = std::mem::replace(
        &mut params.critic_optimizer,
        adam_config().init::<B, BM>(),
    )
    .load_record(critic_opti_record);
    info!("checkpoint loaded from {}", dir.display());
    Ok(())
}
