use log::debug;
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    Result, TrainErr,
    arch::{Model, Sequential, activations::ActFn, layers::Layer},
    data::{HeaderInfo, Playlist},
    initialization::Init,
};

/// Builds a model for a dataset out of its metadata.
pub trait ModelFactory {
    type Model: Model;

    /// Builds a model whose input and output match `header`'s layout.
    fn build(&self, header: &HeaderInfo, playlist: &Playlist) -> Result<Self::Model>;
}

/// Builds `Sequential` models: hidden dense layers with an activation, followed by a linear
/// output layer.
#[derive(Debug, Clone)]
pub struct SequentialFactory {
    hidden: Vec<usize>,
    act_fn: Option<ActFn>,
    init: Init,
    seed: Option<u64>,
}

impl SequentialFactory {
    /// Creates a new `SequentialFactory`.
    ///
    /// # Arguments
    /// * `hidden` - The width of each hidden layer.
    /// * `act_fn` - The activation of the hidden layers.
    pub fn new(hidden: Vec<usize>, act_fn: Option<ActFn>) -> Self {
        Self {
            hidden,
            act_fn,
            init: Init::default(),
            seed: None,
        }
    }

    pub fn with_init(mut self, init: Init) -> Self {
        self.init = init;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl ModelFactory for SequentialFactory {
    type Model = Sequential;

    fn build(&self, header: &HeaderInfo, playlist: &Playlist) -> Result<Sequential> {
        let (input, output) = (header.input_size(), header.output_size());

        if input == 0 || output == 0 || self.hidden.contains(&0) {
            return Err(TrainErr::InvalidConfig(format!(
                "can't build a model with a zero sized layer for playlist {playlist}"
            )));
        }

        let mut dims = Vec::with_capacity(self.hidden.len() + 2);
        dims.push(input);
        dims.extend(&self.hidden);
        dims.push(output);

        let last = dims.len() - 2;
        let layers = dims.windows(2).enumerate().map(|(i, w)| {
            let act_fn = if i < last { self.act_fn.clone() } else { None };
            Layer::dense((w[0], w[1]), act_fn)
        });

        let mut model = Sequential::new(layers);
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        model.initialize(self.init, &mut rng)?;

        debug!(params = model.size(); "built model for playlist {playlist}");
        Ok(model)
    }
}
