//! Command line tool to fine-tune a spam classifier and report its test metrics

use std::path::PathBuf;

use anyhow::anyhow;
use burn::{
    backend::{Autodiff, LibTorch},
    tensor::backend::Backend,
};
use pico_args::Arguments;
use spam_finetune::{
    cli::{
        device,
        models::{Model, DEFAULT_MODEL},
    },
    datasets::{
        spam::{self, label_counts},
        split::{Partitions, SplitConfig},
    },
    models::bert,
    pipelines::text_classification::{self, Artifacts, TextEncoder},
};
use tokenizers::Tokenizer;

const HELP: &str = "\
Usage: train [OPTIONS]

Options:
  -h, --help             Print help
  -m, --model            The pretrained model to use (defaults to 'roberta-base')
  -b, --batch-size       Batch size (defaults to 32)
  -n, --epochs           Number of epochs to train for (defaults to 10)
  -d, --data             The labelled CSV file (defaults to 'spamdata_v2.csv')
  -o, --results          The results file to append to (defaults to 'result.txt')
  --lr                   Learning rate (defaults to 1e-3)
  --max-grad-norm        Gradient norm ceiling (defaults to 1.0)
  --max-seq-len          Tokens per message (defaults to 25)
  --seed                 Seed for the splits and shuffles (defaults to 2018)
  --cpu                  Train on the CPU instead of CUDA
";

type B = Autodiff<LibTorch>;

#[derive(Debug)]
struct Args {
    model: String,
    batch_size: usize,
    epochs: usize,
    data: PathBuf,
    results: PathBuf,
    learning_rate: f64,
    max_grad_norm: f64,
    max_seq_len: usize,
    seed: u64,
    cpu: bool,
}

impl Args {
    fn parse() -> anyhow::Result<Option<Self>> {
        let mut pargs = Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let defaults = text_classification::Config::new();

        let batch_size = match pargs.opt_value_from_str(["-b", "--batch-size"])? {
            Some(batch_size) => Some(batch_size),
            None => pargs.opt_value_from_str("--batch_size")?,
        };

        let args = Args {
            model: pargs
                .opt_value_from_str(["-m", "--model"])?
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            batch_size: batch_size.unwrap_or(defaults.batch_size),
            epochs: pargs
                .opt_value_from_str(["-n", "--epochs"])?
                .unwrap_or(defaults.num_epochs),
            data: pargs
                .opt_value_from_str(["-d", "--data"])?
                .unwrap_or_else(|| PathBuf::from(spam::DEFAULT_FILE)),
            results: pargs
                .opt_value_from_str(["-o", "--results"])?
                .unwrap_or_else(|| PathBuf::from("result.txt")),
            learning_rate: pargs
                .opt_value_from_str("--lr")?
                .unwrap_or(defaults.learning_rate),
            max_grad_norm: pargs
                .opt_value_from_str("--max-grad-norm")?
                .unwrap_or(defaults.max_grad_norm),
            max_seq_len: pargs
                .opt_value_from_str("--max-seq-len")?
                .unwrap_or(defaults.max_seq_length),
            seed: pargs
                .opt_value_from_str("--seed")?
                .unwrap_or(defaults.seed),
            cpu: pargs.contains("--cpu"),
        };

        if args.epochs == 0 {
            return Err(anyhow!("--epochs must be at least 1"));
        }

        if args.batch_size == 0 {
            return Err(anyhow!("--batch-size must be at least 1"));
        }

        let remaining = pargs.finish();
        if !remaining.is_empty() {
            return Err(anyhow!("Unexpected arguments: {:?}", remaining));
        }

        Ok(Some(args))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let Some(args) = Args::parse()? else {
        print!("{}", HELP);

        return Ok(());
    };

    let model = Model::try_from(args.model.as_str())?;
    let device = device::select(args.cpu)?;

    log::info!("Using {} ({}) on {:?}", model, model.family(), device);

    let items = spam::load(&args.data)?;
    let [n_ham, n_spam] = label_counts(&items);
    log::info!(
        "Loaded {} records from {} ({} ham, {} spam)",
        items.len(),
        args.data.display(),
        n_ham,
        n_spam
    );

    let partitions = Partitions::split(items, &SplitConfig::new().with_seed(args.seed));

    let config = text_classification::Config::new()
        .with_model_name(model.name().to_string())
        .with_batch_size(args.batch_size)
        .with_num_epochs(args.epochs)
        .with_learning_rate(args.learning_rate)
        .with_max_grad_norm(args.max_grad_norm)
        .with_max_seq_length(args.max_seq_len)
        .with_seed(args.seed);
    config.validate()?;

    log::info!("Training config: {}", config);

    B::seed(config.seed);

    let pretrained = bert::from_pretrained(model.name(), &config).await?;
    let classifier = bert::Model::<B>::from_safetensors(
        &device,
        pretrained.weights_file.clone(),
        &pretrained.config,
    );

    let tokenizer = Tokenizer::from_file(&pretrained.tokenizer_file)
        .map_err(|e| anyhow!("Unable to load tokenizer for {}: {}", model, e))?;
    let pad_token_id = u32::try_from(classifier.pad_token_id())?;
    let encoder = TextEncoder::new(tokenizer, config.max_seq_length, pad_token_id)?;

    let summary = text_classification::run::<B, _>(
        device,
        classifier,
        &encoder,
        &partitions,
        &config,
        &Artifacts::new(".", &args.results),
    )
    .await?;

    log::info!(
        "Test accuracy {:.2} from {}; results appended to {}",
        summary.report.accuracy(),
        summary.checkpoint.display(),
        args.results.display()
    );

    Ok(())
}
