use std::{fmt, path::Path};

use tokio::{fs::OpenOptions, io::AsyncWriteExt};

/// Header line written before every results block
pub const RESULTS_HEADER: &str = "Model, Test accuracy\n";

/// Precision, recall, F1 and support of one class or one average
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassMetrics {
    /// Share of predictions of the class that were right
    pub precision: f64,

    /// Share of items of the class that were found
    pub recall: f64,

    /// Harmonic mean of precision and recall
    pub f1: f64,

    /// Number of true items of the class
    pub support: usize,
}

/// Division that yields 0.0 for an empty denominator
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Per-class metrics of a classifier on a labelled partition
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    labels: Vec<String>,
    classes: Vec<ClassMetrics>,
    accuracy: f64,
    macro_avg: ClassMetrics,
    weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    /// Compute the report from true and predicted class ids. `labels[i]` names class `i`.
    pub fn new(targets: &[usize], predicted: &[usize], labels: &[&str]) -> Self {
        let confusion = ConfusionMatrix::new(targets, predicted, labels);
        let n_classes = labels.len();
        let total = targets.len();

        let classes: Vec<ClassMetrics> = (0..n_classes)
            .map(|class| {
                let true_positives = confusion.counts[class][class] as f64;
                let predicted_total = confusion.predicted_total(class) as f64;
                let support = confusion.support(class);

                let precision = ratio(true_positives, predicted_total);
                let recall = ratio(true_positives, support as f64);
                let f1 = ratio(2.0 * precision * recall, precision + recall);

                ClassMetrics {
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        let correct: usize = (0..n_classes).map(|class| confusion.counts[class][class]).sum();
        let accuracy = ratio(correct as f64, total as f64);

        let average = |weight: &dyn Fn(&ClassMetrics) -> f64| {
            let weights: f64 = classes.iter().map(weight).sum();
            let mean = |metric: fn(&ClassMetrics) -> f64| {
                ratio(
                    classes.iter().map(|c| weight(c) * metric(c)).sum::<f64>(),
                    weights,
                )
            };

            ClassMetrics {
                precision: mean(|c| c.precision),
                recall: mean(|c| c.recall),
                f1: mean(|c| c.f1),
                support: total,
            }
        };

        let macro_avg = average(&|_| 1.0);
        let weighted_avg = average(&|c| c.support as f64);

        Self {
            labels: labels.iter().map(|label| label.to_string()).collect(),
            classes,
            accuracy,
            macro_avg,
            weighted_avg,
        }
    }

    /// Metrics of class `class`
    pub fn class(&self, class: usize) -> Option<&ClassMetrics> {
        self.classes.get(class)
    }

    /// Share of correct predictions
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    /// Unweighted mean over classes
    pub fn macro_avg(&self) -> &ClassMetrics {
        &self.macro_avg
    }

    /// Support-weighted mean over classes
    pub fn weighted_avg(&self) -> &ClassMetrics {
        &self.weighted_avg
    }
}

/// Renders the same layout as scikit-learn's `classification_report`, two digits
impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .labels
            .iter()
            .map(|label| label.len())
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or_default();

        let row = |f: &mut fmt::Formatter<'_>, name: &str, m: &ClassMetrics| {
            writeln!(
                f,
                "{:>width$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )
        };

        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;

        for (label, metrics) in self.labels.iter().zip(&self.classes) {
            row(f, label, metrics)?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        row(f, "macro avg", &self.macro_avg)?;
        row(f, "weighted avg", &self.weighted_avg)
    }
}

/// Counts of (true label, predicted label) pairs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    labels: Vec<String>,

    /// `counts[true][predicted]`
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Tally the pairs. Ids outside `labels` are ignored.
    pub fn new(targets: &[usize], predicted: &[usize], labels: &[&str]) -> Self {
        let n_classes = labels.len();
        let mut counts = vec![vec![0; n_classes]; n_classes];

        for (&target, &prediction) in targets.iter().zip(predicted) {
            if let Some(count) = counts
                .get_mut(target)
                .and_then(|row| row.get_mut(prediction))
            {
                *count += 1;
            }
        }

        Self {
            labels: labels.iter().map(|label| label.to_string()).collect(),
            counts,
        }
    }

    /// Number of items of class `target` predicted as `prediction`
    pub fn count(&self, target: usize, prediction: usize) -> usize {
        self.counts
            .get(target)
            .and_then(|row| row.get(prediction))
            .copied()
            .unwrap_or_default()
    }

    /// Number of true items of `class`
    pub fn support(&self, class: usize) -> usize {
        self.counts.get(class).map_or(0, |row| row.iter().sum())
    }

    /// Number of items predicted as `class`
    pub fn predicted_total(&self, class: usize) -> usize {
        self.counts
            .iter()
            .filter_map(|row| row.get(class))
            .sum()
    }
}

/// Rows are true labels, columns predicted labels
impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .labels
            .iter()
            .map(|label| label.len())
            .chain(["true \\ pred".len()])
            .max()
            .unwrap_or_default();
        let cell = self
            .labels
            .iter()
            .map(|label| label.len())
            .chain(self.counts.iter().flatten().map(|n| n.to_string().len()))
            .max()
            .unwrap_or_default();

        write!(f, "{:>width$}", "true \\ pred")?;
        for label in &self.labels {
            write!(f, "  {:>cell$}", label)?;
        }
        writeln!(f)?;

        for (label, row) in self.labels.iter().zip(&self.counts) {
            write!(f, "{:>width$}", label)?;
            for count in row {
                write!(f, "  {:>cell$}", count)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Append a results block for `model_name` to `path`, creating the file if needed. Existing
/// content is never truncated.
pub async fn append_results(
    path: impl AsRef<Path>,
    model_name: &str,
    report: &ClassificationReport,
) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.as_ref())
        .await?;

    file.write_all(RESULTS_HEADER.as_bytes()).await?;
    file.write_all(format!("{}, {}", model_name, report).as_bytes())
        .await?;
    file.flush().await
}
