use std::{fs, num::NonZeroUsize};

use ndarray::Array2;
use ndarray_rand::{RandomExt, rand_distr::Uniform};
use rand::{SeedableRng, rngs::StdRng};

use replay_trainer::{
    arch::{Model, Sequential, layers::Layer},
    config::TrainerSpec,
    data::{HeaderInfo, InMemoryDataset, Playlist, ReplayDataset},
    device::Device,
    optimization::GradientDescent,
    training::{ModelTrainer, NoHook, Recorder, TrainerBuilder, TrainerOptions},
};

/// Samples of `y = 2x + 1` with `x` in `[-1, 1)`.
fn line(samples: usize, seed: u64) -> InMemoryDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = Uniform::new(-1f32, 1.).unwrap();
    let x: Array2<f32> = Array2::random_using((samples, 1), dist, &mut rng);
    let y = x.mapv(|v| 2. * v + 1.);

    let header = HeaderInfo::new(vec!["x".into()], vec!["y".into()]);
    InMemoryDataset::new(
        header,
        Playlist::new("line"),
        x.into_raw_vec_and_offset().0,
        y.into_raw_vec_and_offset().0,
    )
    .unwrap()
}

#[test]
fn gradient_descent_fits_a_line() {
    let loader = line(64, 11)
        .batched(NonZeroUsize::new(16).unwrap())
        .shuffled(StdRng::seed_from_u64(3));

    let model = Sequential::new([Layer::dense((1, 1), None)]);
    let optimizer = GradientDescent::new(model.size(), 0.1);
    let options = TrainerOptions::default().hook(NoHook);

    let mut trainer =
        ModelTrainer::with_optimizer(model, loader, Device::cpu(), optimizer, options).unwrap();

    let report = trainer.train(400).unwrap();
    assert_eq!(report.optimizer_steps(), 400);
    assert!(report.last_loss().unwrap() < report.losses()[0]);

    let total = trainer.total_loss().unwrap();
    assert!(total < 1e-4, "got {total}");

    let params = trainer.model().params();
    assert!((params[0] - 2.).abs() < 1e-2, "w = {}", params[0]);
    assert!((params[1] - 1.).abs() < 1e-2, "b = {}", params[1]);
}

#[test]
fn accumulated_gradient_matches_a_bigger_batch() {
    let dataset = line(8, 5);

    let train = |batch_size: usize, accumulation_steps: usize| {
        let model = Sequential::with_params([Layer::dense((1, 1), None)], vec![0.5, -0.5]).unwrap();
        let optimizer = GradientDescent::new(model.size(), 0.1);
        let options = TrainerOptions::default()
            .hook(NoHook)
            .accumulation_steps(NonZeroUsize::new(accumulation_steps).unwrap());
        let loader = dataset.clone().batched(NonZeroUsize::new(batch_size).unwrap());

        let mut trainer =
            ModelTrainer::with_optimizer(model, loader, Device::cpu(), optimizer, options).unwrap();
        trainer.train(accumulation_steps).unwrap();
        trainer.into_model().params().to_vec()
    };

    // each half batch is averaged over its own 4 samples, so together they add up to twice
    // the full batch's gradient
    let full = train(8, 1);
    let halves = train(4, 2);

    let initial = [0.5, -0.5];
    for i in 0..2 {
        let full_step = full[i] - initial[i];
        let halves_step = halves[i] - initial[i];
        assert!((halves_step - 2. * full_step).abs() < 1e-5);
    }
}

#[test]
fn a_json_spec_trains_end_to_end() {
    let spec = r#"{
        "model": { "from_dataset": { "hidden": [], "act_fn": null, "init": { "const": { "value": 0.0 } } } },
        "optimizer": { "gradient_descent": { "learning_rate": 0.2 } },
        "loss": "mse",
        "dataset": {
            "header": { "features": ["boost"], "targets": ["mmr"] },
            "playlist": "ranked-standard",
            "x": [0.0, 0.5, 1.0, 1.5],
            "y": [1.0, 2.0, 3.0, 4.0],
            "mask": [1.0, 1.0, 1.0, 1.0],
            "uuids": ["g0", "g1", "g2", "g3"]
        },
        "epochs": 300,
        "batch_size": 4,
        "device": "cpu",
        "seed": 7
    }"#;

    let path = std::env::temp_dir().join("replay-trainer-end-to-end.json");
    fs::write(&path, spec).unwrap();
    let spec = TrainerSpec::from_path(&path).unwrap();
    fs::remove_file(&path).unwrap();

    let mut trainer = TrainerBuilder::new()
        .build_with_hook(&spec, Recorder::default())
        .unwrap();

    let before = trainer.total_loss().unwrap();
    trainer.train(spec.epochs.get()).unwrap();
    let after = trainer.total_loss().unwrap();

    assert_eq!(before, (1. + 4. + 9. + 16.) / 4.);
    assert!(after < 1e-3, "got {after}");

    // one entry per training epoch plus one per evaluated batch
    let hook = trainer.hook();
    assert_eq!(hook.finished.len(), 300 + 2);
    assert_eq!(hook.uuids[0], ["g0", "g1", "g2", "g3"]);
}
