use log::debug;
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{Hook, LogEpochs, ModelFactory, ModelTrainer, SequentialFactory, TrainerOptions};
use crate::{
    Result,
    arch::{
        Model, Sequential,
        activations::ActFn,
        layers::Layer,
        loss::{LossFn, Mae, Mse},
    },
    config::{ActFnSpec, DatasetSpec, LayerSpec, LossFnSpec, ModelSpec, OptimizerSpec, TrainerSpec},
    data::{DataLoader, InMemoryDataset, ReplayDataset},
    device::Device,
    optimization::{Adam, GradientDescent, GradientDescentWithMomentum, Optimizer},
};

/// A trainer assembled out of a `TrainerSpec`.
pub type SpecTrainer<H = LogEpochs> =
    ModelTrainer<Sequential, DataLoader, H, Box<dyn LossFn>, Box<dyn Optimizer>>;

/// Builds `ModelTrainer`s out of a `TrainerSpec`.
#[derive(Debug, Default)]
pub struct TrainerBuilder;

impl TrainerBuilder {
    /// Creates a new `TrainerBuilder`.
    pub fn new() -> Self {
        Self
    }

    /// Builds a new trainer following a spec, logging every finished epoch.
    ///
    /// # Arguments
    /// * `spec` - What the trainer is made of.
    pub fn build(&self, spec: &TrainerSpec) -> Result<SpecTrainer> {
        self.build_with_hook(spec, LogEpochs)
    }

    /// Builds a new trainer following a spec, observed by `hook`.
    pub fn build_with_hook<H: Hook>(&self, spec: &TrainerSpec, hook: H) -> Result<SpecTrainer<H>> {
        spec.validate()?;

        let mut rng = self.generate_rng(spec.seed);
        let dataset = self.resolve_dataset(&spec.dataset)?;
        let model = self.resolve_model(&spec.model, &dataset, &mut rng)?;
        let optimizer = self.resolve_optimizer(spec.optimizer, model.size());

        let options = TrainerOptions::default()
            .loss_fn(self.resolve_loss(spec.loss))
            .hook(hook)
            .accumulation_steps(spec.accumulation_steps);

        let mut loader = dataset.batched(spec.batch_size);
        if spec.shuffle {
            loader = loader.shuffled(StdRng::seed_from_u64(rng.random()));
        }

        debug!(
            params = model.size(), batches = loader.num_batches();
            "assembled trainer from spec"
        );

        ModelTrainer::with_optimizer(model, loader, Device::named(&spec.device), optimizer, options)
    }

    fn resolve_dataset(&self, spec: &DatasetSpec) -> Result<InMemoryDataset> {
        let mut dataset = InMemoryDataset::new(
            spec.header.clone(),
            spec.playlist.clone(),
            spec.x.clone(),
            spec.y.clone(),
        )?;

        if let Some(mask) = &spec.mask {
            dataset = dataset.with_mask(mask.clone())?;
        }

        if let Some(uuids) = &spec.uuids {
            dataset = dataset.with_uuids(uuids.clone())?;
        }

        Ok(dataset)
    }

    fn resolve_model(
        &self,
        spec: &ModelSpec,
        dataset: &InMemoryDataset,
        rng: &mut StdRng,
    ) -> Result<Sequential> {
        match spec {
            ModelSpec::Sequential { layers, init } => {
                let layers = layers.iter().map(|&ls| self.resolve_layer(ls));
                let mut model = Sequential::new(layers);
                model.initialize(*init, rng)?;
                Ok(model)
            }
            ModelSpec::FromDataset {
                hidden,
                act_fn,
                init,
            } => SequentialFactory::new(hidden.clone(), act_fn.map(|spec| self.resolve_act_fn(spec)))
                .with_init(*init)
                .with_seed(rng.random())
                .build(dataset.header_info(), dataset.playlist()),
        }
    }

    fn resolve_layer(&self, spec: LayerSpec) -> Layer {
        match spec {
            LayerSpec::Dense { dim, act_fn } => {
                Layer::dense(dim, act_fn.map(|spec| self.resolve_act_fn(spec)))
            }
        }
    }

    fn resolve_act_fn(&self, spec: ActFnSpec) -> ActFn {
        match spec {
            ActFnSpec::Sigmoid { amp } => ActFn::sigmoid(amp),
            ActFnSpec::Relu => ActFn::relu(),
        }
    }

    fn resolve_optimizer(&self, spec: OptimizerSpec, size: usize) -> Box<dyn Optimizer> {
        match spec {
            OptimizerSpec::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => Box::new(Adam::new(size, learning_rate, beta1, beta2, epsilon)),
            OptimizerSpec::GradientDescent { learning_rate } => {
                Box::new(GradientDescent::new(size, learning_rate))
            }
            OptimizerSpec::GradientDescentWithMomentum {
                learning_rate,
                momentum,
            } => Box::new(GradientDescentWithMomentum::new(size, learning_rate, momentum)),
        }
    }

    fn resolve_loss(&self, spec: LossFnSpec) -> Box<dyn LossFn> {
        match spec {
            LossFnSpec::Mse => Box::new(Mse::new()),
            LossFnSpec::Mae => Box::new(Mae::new()),
        }
    }

    fn generate_rng(&self, seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}
