/// What a `train` call went through.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TrainReport {
    losses: Vec<f32>,
    optimizer_steps: usize,
}

impl TrainReport {
    pub(super) fn record(&mut self, loss: f32, stepped: bool) {
        self.losses.push(loss);
        self.optimizer_steps += stepped as usize;
    }

    /// The masked mean loss of every epoch, in order.
    pub fn losses(&self) -> &[f32] {
        &self.losses
    }

    /// The amount of times the optimizer updated the parameters.
    pub fn optimizer_steps(&self) -> usize {
        self.optimizer_steps
    }

    pub fn last_loss(&self) -> Option<f32> {
        self.losses.last().copied()
    }
}
