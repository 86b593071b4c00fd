use log::info;
use ndarray::ArrayView2;

use crate::{arch::Model, device::Device};

/// What an epoch-start hook gets to see.
#[derive(Clone, Copy)]
pub struct EpochStart<'a> {
    pub epoch: usize,
    pub model: &'a dyn Model,
    pub device: &'a Device,
}

/// What an epoch-finish hook gets to see.
///
/// During training `epoch` is the index of the epoch that stepped the optimizer and `losses`
/// is empty. During evaluation `epoch` is the batch number and `losses` holds the
/// `(loss, samples)` pairs recorded so far. During training `model` has already been
/// stepped by the optimizer.
#[derive(Clone, Copy)]
pub struct EpochFinish<'a> {
    pub epoch: usize,
    pub model: &'a dyn Model,
    pub loss: f32,
    pub x: ArrayView2<'a, f32>,
    pub y_pred: ArrayView2<'a, f32>,
    pub y: ArrayView2<'a, f32>,
    pub uuids: &'a [String],
    pub losses: &'a [(f32, usize)],
    pub device: &'a Device,
}

/// Observes a trainer's progress.
///
/// Hooks only receive read-only views, they can keep their own state but can't change the
/// trainer's. Both methods default to doing nothing.
pub trait Hook {
    fn on_epoch_start(&mut self, _ctx: &EpochStart<'_>) {}

    fn on_epoch_finish(&mut self, _ctx: &EpochFinish<'_>) {}
}

/// A hook that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHook;

impl Hook for NoHook {}

/// The default hook: logs every finished epoch with its loss and the device's free memory.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEpochs;

impl Hook for LogEpochs {
    fn on_epoch_finish(&mut self, ctx: &EpochFinish<'_>) {
        info!(
            "epoch {} finished with {}, free: {}",
            ctx.epoch,
            ctx.loss,
            ctx.device.memory_remaining()
        );
    }
}

/// Collects what it observes, for inspecting a run afterwards.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Recorder {
    pub started: Vec<usize>,
    pub finished: Vec<usize>,
    pub losses: Vec<f32>,
    pub uuids: Vec<Vec<String>>,
    pub params: Vec<Vec<f32>>,
}

impl Hook for Recorder {
    fn on_epoch_start(&mut self, ctx: &EpochStart<'_>) {
        self.started.push(ctx.epoch);
    }

    fn on_epoch_finish(&mut self, ctx: &EpochFinish<'_>) {
        self.finished.push(ctx.epoch);
        self.losses.push(ctx.loss);
        self.uuids.push(ctx.uuids.to_vec());
        self.params.push(ctx.model.params().to_vec());
    }
}

impl<A: Hook, B: Hook> Hook for (A, B) {
    fn on_epoch_start(&mut self, ctx: &EpochStart<'_>) {
        self.0.on_epoch_start(ctx);
        self.1.on_epoch_start(ctx);
    }

    fn on_epoch_finish(&mut self, ctx: &EpochFinish<'_>) {
        self.0.on_epoch_finish(ctx);
        self.1.on_epoch_finish(ctx);
    }
}

impl<H: Hook + ?Sized> Hook for &mut H {
    fn on_epoch_start(&mut self, ctx: &EpochStart<'_>) {
        (**self).on_epoch_start(ctx);
    }

    fn on_epoch_finish(&mut self, ctx: &EpochFinish<'_>) {
        (**self).on_epoch_finish(ctx);
    }
}

impl<H: Hook + ?Sized> Hook for Box<H> {
    fn on_epoch_start(&mut self, ctx: &EpochStart<'_>) {
        (**self).on_epoch_start(ctx);
    }

    fn on_epoch_finish(&mut self, ctx: &EpochFinish<'_>) {
        (**self).on_epoch_finish(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{Sequential, layers::Layer};
    use ndarray::array;

    #[test]
    fn pairs_fan_out_to_both_hooks() {
        let device = Device::cpu();
        let model = Sequential::with_params([Layer::dense((1, 1), None)], vec![0.5, 1.]).unwrap();
        let x = array![[1.]];
        let uuids = vec!["a".to_string()];
        let mut hooks = (Recorder::default(), (LogEpochs, Recorder::default()));

        hooks.on_epoch_start(&EpochStart {
            epoch: 3,
            model: &model,
            device: &device,
        });
        hooks.on_epoch_finish(&EpochFinish {
            epoch: 3,
            model: &model,
            loss: 0.5,
            x: x.view(),
            y_pred: x.view(),
            y: x.view(),
            uuids: &uuids,
            losses: &[],
            device: &device,
        });

        let (first, (_, second)) = hooks;
        assert_eq!(first, second);
        assert_eq!(first.started, [3]);
        assert_eq!(first.finished, [3]);
        assert_eq!(first.losses, [0.5]);
        assert_eq!(first.uuids, [["a"]]);
        assert_eq!(first.params, [[0.5, 1.]]);
    }
}
