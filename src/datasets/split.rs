use std::collections::BTreeMap;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use super::spam::{label_counts, Item};

/// Partitioning policy: train takes `1 - holdout_size`, and the holdout is split again
/// between validation and test
#[derive(burn::config::Config)]
pub struct SplitConfig {
    /// Share of the records held out from training
    #[config(default = 0.3)]
    pub holdout_size: f64,

    /// Share of the holdout that goes to the test partition
    #[config(default = 0.5)]
    pub test_share: f64,

    /// Seed for the shuffles, so partitions are reproducible
    #[config(default = 2018)]
    pub seed: u64,
}

/// The three disjoint partitions of a labeled dataset
#[derive(Clone, Debug)]
pub struct Partitions {
    /// Records used for parameter updates
    pub train: Vec<Item>,

    /// Records used to pick the best checkpoint
    pub validation: Vec<Item>,

    /// Records reserved for the final report
    pub test: Vec<Item>,
}

impl Partitions {
    /// Apply two successive stratified splits: train vs. holdout, then validation vs. test
    pub fn split(items: Vec<Item>, config: &SplitConfig) -> Self {
        let (train, holdout) = stratified_split(items, config.holdout_size, config.seed);
        let (validation, test) = stratified_split(holdout, config.test_share, config.seed);

        log::info!(
            "Partitioned into {} train {:?}, {} validation {:?}, {} test {:?} (ham, spam)",
            train.len(),
            label_counts(&train),
            validation.len(),
            label_counts(&validation),
            test.len(),
            label_counts(&test),
        );

        Self {
            train,
            validation,
            test,
        }
    }
}

/// Split `items` into `(kept, held_out)` so that each label contributes
/// `round(count * held_out_size)` records to the held-out side.
pub fn stratified_split(
    items: Vec<Item>,
    held_out_size: f64,
    seed: u64,
) -> (Vec<Item>, Vec<Item>) {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut by_label: BTreeMap<u8, Vec<Item>> = BTreeMap::new();
    for item in items {
        by_label.entry(item.label).or_default().push(item);
    }

    let mut kept = Vec::new();
    let mut held_out = Vec::new();

    for (_, mut group) in by_label {
        group.shuffle(&mut rng);

        let n_held_out = ((group.len() as f64) * held_out_size).round() as usize;
        let rest = group.split_off(n_held_out.min(group.len()));

        held_out.extend(group);
        kept.extend(rest);
    }

    // Interleave the labels again
    kept.shuffle(&mut rng);
    held_out.shuffle(&mut rng);

    (kept, held_out)
}
