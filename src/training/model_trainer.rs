use std::num::NonZeroUsize;

use log::{debug, info};
use ndarray::Array2;

use super::{
    EpochFinish, EpochStart, Hook, LogEpochs, ModelFactory, TrainReport,
    options::TrainerOptions,
};
use crate::{
    Result, TrainErr,
    arch::{Model, loss::{LossFn, Mse}},
    data::{Batch, BatchSource, ReplayDataset},
    device::Device,
    optimization::{Adam, Optimizer},
};

/// A model `Trainer`. Contains the relevant components needed for training a model,
/// including the model itself.
///
/// An *epoch* here consumes exactly one batch. Gradients accumulate over
/// `accumulation_steps` epochs before the optimizer updates the parameters.
pub struct ModelTrainer<M, S, H = LogEpochs, L = Mse, O = Adam>
where
    M: Model,
    S: BatchSource,
    H: Hook,
    L: LossFn,
    O: Optimizer,
{
    model: M,
    source: S,
    optimizer: O,
    loss_fn: L,
    device: Device,
    accumulation_steps: NonZeroUsize,
    hook: H,
}

impl<M, S, H, L> ModelTrainer<M, S, H, L, Adam>
where
    M: Model,
    S: BatchSource,
    H: Hook,
    L: LossFn,
{
    /// Returns a new `ModelTrainer` optimizing with `Adam`.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained.
    /// * `source` - The batches the model will be trained with.
    /// * `device` - Where the model and the batches are placed.
    /// * `options` - Loss function, hook, accumulation steps and learning rate.
    pub fn new(model: M, source: S, device: Device, options: TrainerOptions<L, H>) -> Self {
        let optimizer = Adam::with_learning_rate(model.size(), options.learning_rate);
        Self::assemble(model, source, device, optimizer, options)
    }

    /// Returns a new `ModelTrainer` for a dataset.
    ///
    /// When no `model` is given one is built by `factory` out of the dataset's header and
    /// playlist. The dataset is then split into batches of `batch_size` samples.
    pub fn from_dataset<D, F>(
        dataset: D,
        model: Option<M>,
        factory: &F,
        device: Device,
        batch_size: NonZeroUsize,
        options: TrainerOptions<L, H>,
    ) -> Result<Self>
    where
        D: ReplayDataset<Source = S>,
        F: ModelFactory<Model = M>,
    {
        let model = match model {
            Some(model) => model,
            None => factory.build(dataset.header_info(), dataset.playlist())?,
        };

        let source = dataset.batched(batch_size);
        Ok(Self::new(model, source, device, options))
    }
}

impl<M, S, H, L, O> ModelTrainer<M, S, H, L, O>
where
    M: Model,
    S: BatchSource,
    H: Hook,
    L: LossFn,
    O: Optimizer,
{
    /// Returns a new `ModelTrainer` with the given optimizer. `options.learning_rate` is
    /// ignored, the optimizer carries its own.
    ///
    /// # Errors
    /// `SizeMismatch` if the optimizer wasn't created for the model's parameters.
    pub fn with_optimizer(
        model: M,
        source: S,
        device: Device,
        optimizer: O,
        options: TrainerOptions<L, H>,
    ) -> Result<Self> {
        if optimizer.size() != model.size() {
            return Err(TrainErr::SizeMismatch {
                what: "optimizer parameters",
                got: optimizer.size(),
                expected: model.size(),
            });
        }

        Ok(Self::assemble(model, source, device, optimizer, options))
    }

    fn assemble(
        model: M,
        source: S,
        mut device: Device,
        optimizer: O,
        options: TrainerOptions<L, H>,
    ) -> Self {
        device.place_model(model.size());

        Self {
            model,
            source,
            optimizer,
            loss_fn: options.loss_fn,
            device,
            accumulation_steps: options.accumulation_steps,
            hook: options.hook,
        }
    }

    /// Trains the model for `epochs` epochs, one batch per epoch.
    ///
    /// The source is rewound before the first epoch and again whenever it runs out of
    /// batches, so any amount of epochs can be run over any non empty source.
    ///
    /// # Returns
    /// The masked mean loss of every epoch and the amount of optimizer steps taken.
    ///
    /// # Errors
    /// `EmptySource` if the source has no batches, or whatever the model, loss or optimizer
    /// fail with. A failing epoch aborts the whole call.
    pub fn train(&mut self, epochs: usize) -> Result<TrainReport> {
        info!("starting training for {epochs} epochs on {}", self.device);

        self.source.rewind();
        let mut report = TrainReport::default();

        for epoch in 0..epochs {
            let batch = self.next_batch()?;

            self.hook.on_epoch_start(&EpochStart {
                epoch,
                model: &self.model,
                device: &self.device,
            });

            let (loss, stepped) = self.step(epoch, batch)?;
            report.record(loss, stepped);
        }

        info!(
            "training finished after {epochs} epochs and {} optimizer steps",
            report.optimizer_steps()
        );

        Ok(report)
    }

    /// Computes the average loss over a whole pass of the source, weighting every batch by
    /// its amount of samples. Parameters are left untouched and no gradient is tracked.
    ///
    /// # Errors
    /// `EmptySource` if the source yields no samples.
    pub fn total_loss(&mut self) -> Result<f32> {
        self.source.rewind();

        let mut losses = Vec::new();
        let mut batch_number = 0;

        while let Some(batch) = self.source.next_batch() {
            let x = self.device.place(batch.x);
            let y = self.device.place(batch.y);

            let result = self.evaluate(batch_number, &x, &y, &batch.uuids, &mut losses);

            self.device.release(&x);
            self.device.release(&y);
            result?;

            batch_number += 1;
        }

        let samples: usize = losses.iter().map(|&(_, n)| n).sum();
        if samples == 0 {
            return Err(TrainErr::EmptySource);
        }

        let weighted: f32 = losses.iter().map(|&(loss, n)| loss * n as f32).sum();
        Ok(weighted / samples as f32)
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }

    pub fn hook(&self) -> &H {
        &self.hook
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn accumulation_steps(&self) -> NonZeroUsize {
        self.accumulation_steps
    }

    /// Consumes the trainer, returning the trained model.
    pub fn into_model(self) -> M {
        self.model
    }

    fn next_batch(&mut self) -> Result<Batch> {
        if let Some(batch) = self.source.next_batch() {
            return Ok(batch);
        }

        debug!("batch source exhausted, rewinding");
        self.source.rewind();
        self.source.next_batch().ok_or(TrainErr::EmptySource)
    }

    /// Runs a single epoch over `batch`, placing its tensors on the device for the duration
    /// of the epoch.
    fn step(&mut self, epoch: usize, batch: Batch) -> Result<(f32, bool)> {
        let Batch { x, y, mask, uuids } = batch;
        let mask = mask.unwrap_or_else(|| Array2::ones(y.dim()));

        let x = self.device.place(x);
        let y = self.device.place(y);
        let mask = self.device.place(mask);

        let result = self.backprop(epoch, &x, &y, &mask, &uuids);

        self.device.release(&x);
        self.device.release(&y);
        self.device.release(&mask);
        result
    }

    fn backprop(
        &mut self,
        epoch: usize,
        x: &Array2<f32>,
        y: &Array2<f32>,
        mask: &Array2<f32>,
        uuids: &[String],
    ) -> Result<(f32, bool)> {
        if mask.dim() != y.dim() {
            return Err(TrainErr::SizeMismatch {
                what: "batch mask",
                got: mask.len(),
                expected: y.len(),
            });
        }

        let y_pred = self.model.forward(x.view())?;
        check_prediction(&y_pred, y)?;

        let loss = self.loss_fn.elementwise(y_pred.view(), y.view());
        let mean_loss = masked_mean(&loss, mask);

        // d(mean_loss)/d(y_pred) = mask * loss' / sum(mask)
        let d = self.loss_fn.elementwise_prime(y_pred.view(), y.view()) * mask / mask.sum();
        self.model.backward(d)?;

        if (epoch + 1) % self.accumulation_steps.get() != 0 {
            return Ok((mean_loss, false));
        }

        let (params, grad) = self.model.params_and_grad();
        self.optimizer.update_params(grad, params)?;
        self.model.zero_grad();

        self.hook.on_epoch_finish(&EpochFinish {
            epoch,
            model: &self.model,
            loss: mean_loss,
            x: x.view(),
            y_pred: y_pred.view(),
            y: y.view(),
            uuids,
            losses: &[],
            device: &self.device,
        });

        Ok((mean_loss, true))
    }

    fn evaluate(
        &mut self,
        batch_number: usize,
        x: &Array2<f32>,
        y: &Array2<f32>,
        uuids: &[String],
        losses: &mut Vec<(f32, usize)>,
    ) -> Result<()> {
        let y_pred = self.model.predict(x.view())?;
        check_prediction(&y_pred, y)?;

        let loss = self.loss_fn.loss(y_pred.view(), y.view());
        losses.push((loss, y.nrows()));

        self.hook.on_epoch_finish(&EpochFinish {
            epoch: batch_number,
            model: &self.model,
            loss,
            x: x.view(),
            y_pred: y_pred.view(),
            y: y.view(),
            uuids,
            losses: losses.as_slice(),
            device: &self.device,
        });

        Ok(())
    }
}

/// The mean of `loss` over the positions `mask` marks as valid: `sum(loss * mask) / sum(mask)`.
///
/// A mask without valid positions yields a non finite value.
pub fn masked_mean(loss: &Array2<f32>, mask: &Array2<f32>) -> f32 {
    (loss * mask).sum() / mask.sum()
}

fn check_prediction(y_pred: &Array2<f32>, y: &Array2<f32>) -> Result<()> {
    if y_pred.dim() != y.dim() {
        return Err(TrainErr::SizeMismatch {
            what: "prediction",
            got: y_pred.len(),
            expected: y.len(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::{
        arch::{Sequential, layers::Layer},
        data::{BatchList, HeaderInfo, InMemoryDataset, Playlist},
        optimization::GradientDescent,
        training::{NoHook, Recorder},
    };
    use ndarray::array;

    /// Counts its calls and leaves the parameters alone.
    struct CountingOptimizer {
        size: usize,
        steps: usize,
    }

    impl Optimizer for CountingOptimizer {
        fn size(&self) -> usize {
            self.size
        }

        fn update_params(&mut self, _grad: &[f32], _params: &mut [f32]) -> Result<()> {
            self.steps += 1;
            Ok(())
        }
    }

    fn zero_model() -> Sequential {
        Sequential::new([Layer::dense((1, 1), None)])
    }

    fn batch(ys: &[f32], name: &str) -> Batch {
        let x = Array2::ones((ys.len(), 1));
        let y = Array2::from_shape_vec((ys.len(), 1), ys.to_vec()).unwrap();
        let uuids = (0..ys.len()).map(|i| format!("{name}-{i}")).collect();

        Batch::new(x, y).unwrap().with_uuids(uuids).unwrap()
    }

    fn recorded<M: Model, S: BatchSource>(
        model: M,
        source: S,
        accumulation_steps: usize,
    ) -> ModelTrainer<M, S, Recorder, Mse, CountingOptimizer> {
        let optimizer = CountingOptimizer {
            size: model.size(),
            steps: 0,
        };
        let options = TrainerOptions::default()
            .hook(Recorder::default())
            .accumulation_steps(NonZeroUsize::new(accumulation_steps).unwrap());

        ModelTrainer::with_optimizer(model, source, Device::cpu(), optimizer, options).unwrap()
    }

    #[test]
    fn source_restarts_when_epochs_outnumber_batches() {
        let source = BatchList::new(vec![batch(&[1.], "a"), batch(&[2.], "b")]);
        let mut trainer = recorded(zero_model(), source, 1);

        let report = trainer.train(5).unwrap();

        assert_eq!(report.losses(), [1., 4., 1., 4., 1.]);
        assert_eq!(trainer.hook().started, [0, 1, 2, 3, 4]);
        assert_eq!(
            trainer.hook().uuids,
            [["a-0"], ["b-0"], ["a-0"], ["b-0"], ["a-0"]]
        );

        // a second call starts over from the first batch
        trainer.train(1).unwrap();
        assert_eq!(trainer.hook().uuids.last().unwrap(), &["a-0"]);
    }

    #[test]
    fn optimizer_steps_every_accumulation_steps_epochs() {
        let source = BatchList::new(vec![batch(&[1., 2.], "a")]);
        let mut trainer = recorded(zero_model(), source, 3);

        let report = trainer.train(6).unwrap();

        assert_eq!(report.optimizer_steps(), 2);
        assert_eq!(trainer.optimizer().steps, 2);
        assert_eq!(trainer.hook().finished, [2, 5]);
        assert_eq!(trainer.hook().started, [0, 1, 2, 3, 4, 5]);
        assert_eq!(report.losses().len(), 6);
    }

    #[test]
    fn gradient_accumulates_between_steps() {
        let source = BatchList::new(vec![batch(&[1.], "a")]);
        let mut trainer = recorded(zero_model(), source, 2);

        trainer.train(1).unwrap();
        let once = trainer.model().grad().to_vec();
        assert_eq!(once, [-2., -2.]);

        trainer.train(1).unwrap();
        assert_eq!(trainer.model().grad(), [-4., -4.]);

        // the second epoch of a call completes the accumulation
        trainer.train(2).unwrap();
        assert_eq!(trainer.model().grad(), [0., 0.]);
    }

    #[test]
    fn masked_positions_neither_count_nor_train() {
        let masked = batch(&[1., 2.], "a").with_mask(array![[1.], [0.]]).unwrap();
        let model = zero_model();
        let optimizer = GradientDescent::new(model.size(), 0.5);
        let options = TrainerOptions::default().hook(NoHook);

        let mut trainer = ModelTrainer::with_optimizer(
            model,
            BatchList::new(vec![masked]),
            Device::cpu(),
            optimizer,
            options,
        )
        .unwrap();

        let report = trainer.train(1).unwrap();

        // only the first sample counts: (0 - 1)^2
        assert_eq!(report.losses(), [1.]);
        // d = 2 * (0 - 1) on the first row, x = 1, lr = 0.5
        assert_eq!(trainer.model().params(), [1., 1.]);
    }

    #[test]
    fn masked_mean_only_averages_valid_positions() {
        let loss = array![[1., 100.], [3., 5.]];
        let mask = array![[1., 0.], [1., 1.]];

        assert_eq!(masked_mean(&loss, &mask), 3.);
        assert_eq!(masked_mean(&loss, &Array2::ones((2, 2))), 27.25);
    }

    #[test]
    fn total_loss_weights_batches_by_their_samples() {
        let source = BatchList::new(vec![
            batch(&[1., 1.], "a"),
            batch(&[1., 1., 2.], "b"),
            batch(&[1., 1., 0.5, 0.5, 0.], "c"),
        ]);
        let mut trainer = recorded(zero_model(), source, 1);

        let total = trainer.total_loss().unwrap();

        assert!((total - 1.05).abs() < 1e-6, "got {total}");
        assert_eq!(trainer.hook().finished, [0, 1, 2]);
        assert_eq!(trainer.hook().losses, [1., 2., 0.5]);
        assert!(trainer.hook().started.is_empty());
    }

    #[test]
    fn total_loss_leaves_the_model_untouched() {
        let model = Sequential::with_params([Layer::dense((1, 1), None)], vec![0.3, -0.2]).unwrap();
        let source = BatchList::new(vec![batch(&[1., 2.], "a")]);
        let mut trainer = recorded(model, source, 1);

        trainer.total_loss().unwrap();

        assert_eq!(trainer.model().params(), [0.3, -0.2]);
        assert_eq!(trainer.model().grad(), [0., 0.]);
        assert_eq!(trainer.optimizer().steps, 0);
    }

    #[test]
    fn empty_sources_are_an_error() {
        let mut trainer = recorded(zero_model(), BatchList::default(), 1);

        assert!(matches!(trainer.train(1), Err(TrainErr::EmptySource)));
        assert!(matches!(trainer.total_loss(), Err(TrainErr::EmptySource)));
        assert!(trainer.train(0).unwrap().losses().is_empty());
    }

    #[test]
    fn huge_epoch_counts_fail_on_an_empty_source() {
        let mut trainer = recorded(zero_model(), BatchList::default(), 1);
        assert!(matches!(trainer.train(usize::MAX / 2), Err(TrainErr::EmptySource)));
    }

    #[test]
    fn all_zero_mask_yields_a_nan_loss() {
        let masked = batch(&[1., 2.], "a").with_mask(Array2::zeros((2, 1))).unwrap();
        let mut trainer = recorded(zero_model(), BatchList::new(vec![masked]), 1);

        let report = trainer.train(1).unwrap();

        assert_eq!(report.losses().len(), 1);
        assert!(report.losses()[0].is_nan());
    }

    #[test]
    fn hooks_see_the_stepped_model() {
        let model = zero_model();
        let optimizer = GradientDescent::new(model.size(), 0.5);
        let options = TrainerOptions::default().hook(Recorder::default());
        let source = BatchList::new(vec![batch(&[1.], "a")]);

        let mut trainer =
            ModelTrainer::with_optimizer(model, source, Device::cpu(), optimizer, options).unwrap();
        trainer.train(2).unwrap();

        let seen = &trainer.hook().params;
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], [1., 1.]);
        assert_eq!(seen[1], trainer.model().params());

        trainer.total_loss().unwrap();
        assert_eq!(trainer.hook().params.last().unwrap(), trainer.model().params());
    }

    #[test]
    fn optimizer_must_fit_the_model() {
        let optimizer = GradientDescent::new(3, 0.1);
        let result = ModelTrainer::with_optimizer(
            zero_model(),
            BatchList::default(),
            Device::cpu(),
            optimizer,
            TrainerOptions::default(),
        );

        assert!(matches!(
            result,
            Err(TrainErr::SizeMismatch { got: 3, expected: 2, .. })
        ));
    }

    #[test]
    fn batches_are_released_from_the_device() {
        let source = BatchList::new(vec![batch(&[1., 2., 3.], "a")]);
        let mut trainer = recorded(zero_model(), source, 1);
        let model_bytes = trainer.device().allocated();

        trainer.train(2).unwrap();
        trainer.total_loss().unwrap();

        assert_eq!(trainer.device().allocated(), model_bytes);
        assert!(trainer.device().memory_remaining() > 0);
    }

    /// Remembers what it was asked to build for.
    #[derive(Default)]
    struct SpyFactory {
        seen: RefCell<Vec<(HeaderInfo, Playlist)>>,
    }

    impl ModelFactory for SpyFactory {
        type Model = Sequential;

        fn build(&self, header: &HeaderInfo, playlist: &Playlist) -> Result<Sequential> {
            self.seen
                .borrow_mut()
                .push((header.clone(), playlist.clone()));

            Ok(Sequential::new([Layer::dense(
                (header.input_size(), header.output_size()),
                None,
            )]))
        }
    }

    fn dataset() -> InMemoryDataset {
        let header = HeaderInfo::new(vec!["boost".into(), "speed".into()], vec!["mmr".into()]);
        InMemoryDataset::new(
            header,
            Playlist::new("ranked-duel"),
            vec![1., 2., 3., 4., 5., 6.],
            vec![1., 0., 1.],
        )
        .unwrap()
    }

    #[test]
    fn from_dataset_builds_the_model_out_of_the_metadata() {
        let factory = SpyFactory::default();

        let mut trainer = ModelTrainer::from_dataset(
            dataset(),
            None,
            &factory,
            Device::cpu(),
            NonZeroUsize::new(2).unwrap(),
            TrainerOptions::default().hook(NoHook),
        )
        .unwrap();

        let seen = factory.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.features, ["boost", "speed"]);
        assert_eq!(seen[0].1.as_str(), "ranked-duel");

        assert_eq!(trainer.model().size(), 3);
        assert_eq!(trainer.train(3).unwrap().losses().len(), 3);
    }

    #[test]
    fn from_dataset_prefers_the_given_model() {
        let factory = SpyFactory::default();
        let model = Sequential::new([Layer::dense((2, 1), None)]);

        let trainer = ModelTrainer::from_dataset(
            dataset(),
            Some(model),
            &factory,
            Device::cpu(),
            NonZeroUsize::MIN,
            TrainerOptions::default().hook(NoHook),
        )
        .unwrap();

        assert!(factory.seen.borrow().is_empty());
        assert_eq!(trainer.optimizer().size(), 3);
    }
}
