use std::path::{Path, PathBuf};

use burn::{
    backend::NdArray,
    module::Module,
    record::{FileRecorder, FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
    tensor::backend::Backend,
};

/// Named MessagePack at full precision, so the reloaded model is exactly the saved one
type CheckpointRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Checkpoint Error
#[derive(thiserror::Error, Debug)]
pub enum CheckpointError {
    /// The record could not be written
    #[error("unable to save checkpoint {path}: {message}")]
    Save {
        /// Checkpoint file
        path: PathBuf,
        /// Recorder error message
        message: String,
    },

    /// The record could not be read back
    #[error("unable to load checkpoint {path}: {message}")]
    Load {
        /// Checkpoint file
        path: PathBuf,
        /// Recorder error message
        message: String,
    },

    /// Evaluation was requested before any checkpoint was written
    #[error("no checkpoint has been written to {0}")]
    Missing(PathBuf),
}

/// The single best-model snapshot of a run, rewritten whenever validation loss strictly
/// improves
#[derive(Debug, Clone)]
pub struct Checkpoint {
    /// Path without the recorder extension (e.g., `saved_roberta-base`)
    stem: PathBuf,

    /// Lowest validation loss seen so far
    best_loss: f64,

    /// Epoch that produced `best_loss`
    best_epoch: Option<usize>,
}

impl Checkpoint {
    /// Track a checkpoint at `stem`; the recorder appends its own extension
    pub fn new(stem: impl Into<PathBuf>) -> Self {
        Self {
            stem: stem.into(),
            best_loss: f64::INFINITY,
            best_epoch: None,
        }
    }

    /// The conventional checkpoint stem for a model name inside `dir`
    pub fn for_model(dir: impl AsRef<Path>, model_name: &str) -> Self {
        Self::new(dir.as_ref().join(format!("saved_{}", model_name.replace('/', "_"))))
    }

    /// Path without the recorder extension
    pub fn stem(&self) -> &Path {
        &self.stem
    }

    /// The file the recorder writes
    pub fn file_path(&self) -> PathBuf {
        let mut path = self.stem.clone().into_os_string();
        path.push(".");
        // The extension does not depend on the backend
        path.push(<CheckpointRecorder as FileRecorder<NdArray>>::file_extension());

        path.into()
    }

    /// Lowest validation loss persisted so far, `+∞` before the first save
    pub fn best_loss(&self) -> f64 {
        self.best_loss
    }

    /// Epoch of the persisted snapshot, if any
    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }

    /// Persist `module` if `valid_loss` is strictly lower than every loss seen before.
    /// Returns whether the snapshot was rewritten.
    pub fn consider<B: Backend, M: Module<B>>(
        &mut self,
        epoch: usize,
        valid_loss: f64,
        module: &M,
    ) -> Result<bool, CheckpointError> {
        if valid_loss.is_nan() || valid_loss >= self.best_loss {
            return Ok(false);
        }

        CheckpointRecorder::new()
            .record(module.clone().into_record(), self.stem.clone())
            .map_err(|e| CheckpointError::Save {
                path: self.file_path(),
                message: e.to_string(),
            })?;

        self.best_loss = valid_loss;
        self.best_epoch = Some(epoch);

        log::info!(
            "Saved checkpoint {} (epoch {}, validation loss {:.4})",
            self.file_path().display(),
            epoch,
            valid_loss
        );

        Ok(true)
    }

    /// Load the snapshot persisted by this checkpoint into `module`. Files left by earlier
    /// runs are never picked up.
    pub fn load<B: Backend, M: Module<B>>(
        &self,
        module: M,
        device: &B::Device,
    ) -> Result<M, CheckpointError> {
        if self.best_epoch.is_none() {
            return Err(CheckpointError::Missing(self.file_path()));
        }

        let record = CheckpointRecorder::new()
            .load(self.stem.clone(), device)
            .map_err(|e| CheckpointError::Load {
                path: self.file_path(),
                message: e.to_string(),
            })?;

        Ok(module.load_record(record))
    }
}

#[cfg(test)]
mod tests {
    use burn::nn::LinearConfig;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn derives_the_path_from_the_model_name() {
        let checkpoint = Checkpoint::for_model("runs", "bert-base-uncased");

        assert_eq!(checkpoint.stem(), Path::new("runs/saved_bert-base-uncased"));
        assert_eq!(
            checkpoint.file_path(),
            PathBuf::from("runs/saved_bert-base-uncased.mpk")
        );
    }

    #[test]
    fn replaces_path_separators_in_hub_ids() {
        let checkpoint = Checkpoint::for_model(".", "FacebookAI/roberta-base");

        assert_eq!(checkpoint.stem(), Path::new("./saved_FacebookAI_roberta-base"));
    }

    #[test]
    fn writes_the_file_it_names() {
        let dir = std::env::temp_dir().join(format!("spam-finetune-ckpt-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let device = Default::default();
        let module = LinearConfig::new(3, 2).init::<NdArray>(&device);

        let mut checkpoint = Checkpoint::for_model(&dir, "linear");
        assert!(checkpoint.consider::<NdArray, _>(1, 0.5, &module).unwrap());

        assert!(checkpoint.file_path().exists());

        let loaded = checkpoint
            .load::<NdArray, _>(LinearConfig::new(3, 2).init::<NdArray>(&device), &device)
            .unwrap();
        assert_eq!(
            loaded.weight.val().into_data().value,
            module.weight.val().into_data().value
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn ignores_files_left_by_earlier_runs() {
        let dir = std::env::temp_dir().join(format!("spam-finetune-stale-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let device = Default::default();
        let module = LinearConfig::new(3, 2).init::<NdArray>(&device);

        let mut earlier = Checkpoint::for_model(&dir, "linear");
        earlier.consider::<NdArray, _>(1, 0.5, &module).unwrap();

        let fresh = Checkpoint::for_model(&dir, "linear");
        let result = fresh.load::<NdArray, _>(module, &device);

        assert!(matches!(result, Err(CheckpointError::Missing(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn starts_without_a_best_loss() {
        let checkpoint = Checkpoint::new("saved_model");

        assert_eq!(checkpoint.best_loss(), f64::INFINITY);
        assert_eq!(checkpoint.best_epoch(), None);
    }
}
