use std::env;

use anyhow::{Context, Result, bail};
use log::info;

use replay_trainer::{config::TrainerSpec, training::TrainerBuilder};

fn main() -> Result<()> {
    env_logger::init();

    let Some(path) = env::args().nth(1) else {
        bail!("usage: replay-trainer <spec.json>");
    };

    let spec = TrainerSpec::from_path(&path).with_context(|| format!("loading {path}"))?;
    let mut trainer = TrainerBuilder::new().build(&spec)?;

    let report = trainer.train(spec.epochs.get())?;
    info!(
        "trained {} epochs with {} optimizer steps, last loss {:?}",
        report.losses().len(),
        report.optimizer_steps(),
        report.last_loss()
    );

    let total = trainer.total_loss()?;
    println!("total loss: {total}");

    Ok(())
}
