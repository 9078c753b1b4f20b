mod common;

use burn::{
    backend::{ndarray::NdArrayDevice, NdArray},
    module::Module,
    optim::AdamWConfig,
};
use pretty_assertions::assert_eq;
use spam_finetune::{
    datasets::split::{Partitions, SplitConfig},
    pipelines::text_classification::{
        batcher::{sequential_loader, shuffled_loader},
        loss::WeightedNllLoss,
        report::RESULTS_HEADER,
        run,
        training::{Loaders, Phase, TrainingError},
        Artifacts, Checkpoint, Config, TrainingContext,
    },
    utils::tensors::to_vec,
};

use common::{dataset, encoder, temp_dir, BagOfWords, TestBackend};

fn checkpoint_files(dir: &std::path::Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .expect("artifact dir")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| name.ends_with(".mpk"))
        .collect()
}

#[tokio::test]
async fn trains_evaluates_and_reports_end_to_end() {
    let dir = temp_dir("end-to-end");
    let device = NdArrayDevice::Cpu;

    let partitions = Partitions::split(dataset(60, 40), &SplitConfig::new());
    assert_eq!(partitions.train.len(), 70);
    assert_eq!(partitions.validation.len(), 15);
    assert_eq!(partitions.test.len(), 15);

    let config = Config::new()
        .with_model_name("toy".to_string())
        .with_num_epochs(1)
        .with_batch_size(10);
    let artifacts = Artifacts::new(&dir, dir.join("result.txt"));

    let summary = run::<TestBackend, _>(
        device,
        BagOfWords::<TestBackend>::new(&device),
        &encoder(),
        &partitions,
        &config,
        &artifacts,
    )
    .await
    .expect("pipeline run");

    assert_eq!(checkpoint_files(&dir), vec!["saved_toy.mpk".to_string()]);
    assert!(summary.checkpoint.exists());
    assert!(dir.join("saved_toy.json").exists());

    let epochs = summary.history.epochs();
    assert_eq!(epochs.len(), 1);
    assert!(epochs[0].improved);
    for stats in epochs {
        assert!(stats.train_loss.is_finite() && stats.train_loss >= 0.0);
        assert!(stats.valid_loss.is_finite() && stats.valid_loss >= 0.0);
    }

    assert_eq!(summary.report.macro_avg().support, partitions.test.len());

    let results = std::fs::read_to_string(dir.join("result.txt")).expect("results file");
    assert!(results.starts_with(RESULTS_HEADER));
    assert!(results.contains("toy, "));
    for needle in ["precision", "recall", "f1-score", "ham", "spam", "accuracy"] {
        assert!(results.contains(needle), "missing {needle} in {results}");
    }

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn appends_one_block_per_run() {
    let dir = temp_dir("append");
    let device = NdArrayDevice::Cpu;

    let partitions = Partitions::split(dataset(60, 40), &SplitConfig::new());
    let config = Config::new()
        .with_model_name("toy".to_string())
        .with_num_epochs(1)
        .with_batch_size(16);
    let artifacts = Artifacts::new(&dir, dir.join("result.txt"));

    for _ in 0..2 {
        run::<TestBackend, _>(
            device,
            BagOfWords::<TestBackend>::new(&device),
            &encoder(),
            &partitions,
            &config,
            &artifacts,
        )
        .await
        .expect("pipeline run");
    }

    let results = std::fs::read_to_string(dir.join("result.txt")).expect("results file");
    assert_eq!(results.matches(RESULTS_HEADER).count(), 2);
    assert_eq!(checkpoint_files(&dir).len(), 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn non_finite_loss_aborts_before_any_checkpoint() {
    let dir = temp_dir("diverged");
    let device = NdArrayDevice::Cpu;
    let encoder = encoder();

    let items = encoder
        .encode_partition(&dataset(6, 4))
        .expect("encoded items");

    let loaders = Loaders {
        train: shuffled_loader::<TestBackend>(items.clone(), 5, 7, device),
        n_train_batches: 2,
        valid: sequential_loader::<NdArray>(items, 5, device),
        n_valid_batches: 2,
    };

    let model = BagOfWords::<TestBackend>::new(&device);
    let optimizer = AdamWConfig::new().init::<TestBackend, BagOfWords<TestBackend>>();
    let context = TrainingContext::new(
        model,
        optimizer,
        WeightedNllLoss::new(vec![f32::NAN, 1.0]),
        device,
        1e-3,
        1.0,
    );

    let mut checkpoint = Checkpoint::for_model(&dir, "toy");
    let result = context.fit(&loaders, &mut checkpoint, 3);

    assert!(matches!(
        result,
        Err(TrainingError::NonFiniteLoss {
            epoch: 1,
            batch: 1,
            phase: Phase::Training,
        })
    ));
    assert_eq!(checkpoint.best_epoch(), None);
    assert!(!checkpoint.file_path().exists());

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn zero_epoch_run_never_reports_an_earlier_checkpoint() {
    let dir = temp_dir("zero-epochs");
    let device = NdArrayDevice::Cpu;

    let partitions = Partitions::split(dataset(60, 40), &SplitConfig::new());
    let artifacts = Artifacts::new(&dir, dir.join("result.txt"));
    let config = Config::new()
        .with_model_name("toy".to_string())
        .with_num_epochs(1)
        .with_batch_size(16);

    run::<TestBackend, _>(
        device,
        BagOfWords::<TestBackend>::new(&device),
        &encoder(),
        &partitions,
        &config,
        &artifacts,
    )
    .await
    .expect("first run");

    let result = run::<TestBackend, _>(
        device,
        BagOfWords::<TestBackend>::new(&device),
        &encoder(),
        &partitions,
        &config.clone().with_num_epochs(0),
        &artifacts,
    )
    .await;

    assert!(result.is_err());

    let results = std::fs::read_to_string(dir.join("result.txt")).expect("results file");
    assert_eq!(results.matches(RESULTS_HEADER).count(), 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn frozen_parameters_are_never_updated() {
    let dir = temp_dir("frozen");
    let device = NdArrayDevice::Cpu;
    let encoder = encoder();

    let train = encoder
        .encode_partition(&dataset(12, 8))
        .expect("encoded items");
    let valid = encoder
        .encode_partition(&dataset(3, 2))
        .expect("encoded items");

    let loaders = Loaders {
        train: shuffled_loader::<TestBackend>(train, 5, 7, device),
        n_train_batches: 4,
        valid: sequential_loader::<NdArray>(valid, 5, device),
        n_valid_batches: 1,
    };

    let mut model = BagOfWords::<TestBackend>::new(&device);
    model.embedding = model.embedding.no_grad();

    let embedding_before = to_vec(model.embedding.weight.val());
    let head_before = to_vec(model.head.output.weight.val());

    let optimizer = AdamWConfig::new().init::<TestBackend, BagOfWords<TestBackend>>();
    let context = TrainingContext::new(
        model,
        optimizer,
        WeightedNllLoss::new(vec![1.0, 1.0]),
        device,
        1e-2,
        1.0,
    );

    let mut checkpoint = Checkpoint::for_model(&dir, "toy");
    let (model, history) = context
        .fit(&loaders, &mut checkpoint, 2)
        .expect("training run");

    assert_eq!(history.epochs().len(), 2);
    assert_eq!(to_vec(model.embedding.weight.val()), embedding_before);
    assert_ne!(to_vec(model.head.output.weight.val()), head_before);

    let _ = std::fs::remove_dir_all(&dir);
}
