use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use digit_net::{
    data::{load_csv, load_raw_files},
    evaluate,
    train::EpochSummary,
    ActivationFn, CompletionFn, CostFn, DataPoint, HyperParameters, HyperParametersBuilder,
    NetTrainerBuilder, TrainingObserver,
};

#[derive(Parser)]
#[command(name = "digit-net")]
#[command(about = "Train and evaluate feedforward digit classifiers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Train a new network and save it as JSON
    Train(TrainArgs),
    /// Report the accuracy of a saved network on a data set
    Evaluate(EvaluateArgs),
}

#[derive(Args)]
struct DataArgs {
    /// CSV file with a header row
    #[arg(long, conflicts_with_all = ["images", "labels"])]
    csv: Option<PathBuf>,

    /// Name of the CSV column holding the class index
    #[arg(long, default_value = "label")]
    label_column: String,

    /// Factor applied to every CSV input value
    #[arg(long, default_value_t = 1.0)]
    input_scale: f64,

    /// Raw image bytes, one byte per pixel channel
    #[arg(long, requires = "labels")]
    images: Option<PathBuf>,

    /// Raw label bytes, one per image
    #[arg(long, requires = "images")]
    labels: Option<PathBuf>,

    /// Width and height of the raw images
    #[arg(long, default_value_t = 28)]
    image_size: usize,

    /// Raw images have three channels
    #[arg(long)]
    rgb: bool,

    /// Number of classes
    #[arg(long, default_value_t = 10)]
    num_labels: usize,
}

#[derive(Args)]
struct TrainArgs {
    #[command(flatten)]
    data: DataArgs,

    /// JSON hyperparameters; replaces the network and optimizer flags below
    #[arg(long)]
    config: Option<PathBuf>,

    /// Hidden layer sizes
    #[arg(long, value_delimiter = ',', default_value = "100")]
    hidden: Vec<usize>,

    #[arg(long)]
    activation: Option<ActivationFn>,

    #[arg(long)]
    output_activation: Option<ActivationFn>,

    #[arg(long)]
    cost: Option<CostFn>,

    #[arg(long)]
    learning_rate: Option<f64>,

    #[arg(long)]
    learn_rate_decay: Option<f64>,

    #[arg(long)]
    minibatch_size: Option<usize>,

    #[arg(long)]
    momentum: Option<f64>,

    #[arg(long)]
    regularization: Option<f64>,

    /// Share of the data used for training, the rest is validation
    #[arg(long, default_value_t = 0.8)]
    training_split: f64,

    #[arg(long, default_value_t = 10)]
    epochs: usize,

    /// Stop after this many seconds even if epochs remain
    #[arg(long)]
    max_seconds: Option<u64>,

    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads, defaults to the number of cores
    #[arg(long)]
    threads: Option<usize>,

    #[arg(short, long, default_value = "network.json")]
    output: PathBuf,
}

#[derive(Args)]
struct EvaluateArgs {
    #[command(flatten)]
    data: DataArgs,

    /// Saved network
    #[arg(long)]
    network: PathBuf,
}

fn load_data(args: &DataArgs) -> Result<Vec<DataPoint>, Box<dyn Error>> {
    let data = match (&args.csv, &args.images, &args.labels) {
        (Some(csv), _, _) => load_csv(csv, &args.label_column, args.num_labels, args.input_scale)?,
        (None, Some(images), Some(labels)) => {
            load_raw_files(images, labels, args.image_size, !args.rgb, args.num_labels)?
        },
        _ => return Err("either --csv or --images and --labels is required".into()),
    };
    info!(points = data.len(), "loaded data set");
    Ok(data)
}

fn hyper_parameters(args: &TrainArgs, input_size: usize) -> Result<HyperParameters, Box<dyn Error>> {
    if let Some(config) = &args.config {
        let hyper_parameters: HyperParameters = serde_json::from_str(&fs::read_to_string(config)?)?;
        return Ok(hyper_parameters);
    }

    let mut layer_sizes = vec![input_size];
    layer_sizes.extend(args.hidden.iter().cloned());
    layer_sizes.push(args.data.num_labels);

    let mut builder = HyperParametersBuilder::default().layer_sizes(layer_sizes);
    if let Some(activation) = args.activation {
        builder = builder.activation(activation);
    }
    if let Some(output_activation) = args.output_activation {
        builder = builder.output_activation(output_activation);
    }
    if let Some(cost) = args.cost {
        builder = builder.cost(cost);
    }
    if let Some(learning_rate) = args.learning_rate {
        builder = builder.initial_learning_rate(learning_rate);
    }
    if let Some(decay) = args.learn_rate_decay {
        builder = builder.learn_rate_decay(decay);
    }
    if let Some(minibatch_size) = args.minibatch_size {
        builder = builder.minibatch_size(minibatch_size);
    }
    if let Some(momentum) = args.momentum {
        builder = builder.momentum(momentum);
    }
    if let Some(regularization) = args.regularization {
        builder = builder.regularization(regularization);
    }
    Ok(builder.build()?)
}

struct ValidationLogger;

impl TrainingObserver for ValidationLogger {
    fn on_epoch_complete(&mut self, summary: &EpochSummary) {
        if summary.validation_data.is_empty() {
            return;
        }
        match evaluate(summary.network, summary.validation_data) {
            Ok(evaluation) => info!(
                epoch = summary.epoch,
                elapsed_seconds = summary.session_info.elapsed_time_seconds,
                "validation {}",
                evaluation.accuracy_string()
            ),
            Err(err) => warn!(epoch = summary.epoch, "validation skipped: {}", err),
        }
    }
}

fn train(args: TrainArgs) -> Result<(), Box<dyn Error>> {
    let data = load_data(&args.data)?;
    let input_size = match data.first() {
        Some(point) => point.inputs().len(),
        None => return Err("data set is empty".into()),
    };
    let hyper_parameters = hyper_parameters(&args, input_size)?;

    let mut builder = NetTrainerBuilder::default()
        .data(data)
        .hyper_parameters(hyper_parameters)
        .training_split(args.training_split)
        .seed(args.seed);
    if let Some(threads) = args.threads {
        builder = builder.worker_threads(threads);
    }
    let mut trainer = builder.build()?;
    trainer.add_observer(ValidationLogger);

    let mut completion = CompletionFn::stop_after_epochs(args.epochs);
    if let Some(max_seconds) = args.max_seconds {
        completion = completion.or_after_duration(Duration::from_secs(max_seconds));
    }

    trainer.start_training_session()?;
    trainer.run_until(&completion)?;

    info!("training: {}", trainer.evaluate(false)?);
    info!("validation: {}", trainer.evaluate(true)?);
    trainer.save(&args.output)?;
    Ok(())
}

fn evaluate_saved(args: EvaluateArgs) -> Result<(), Box<dyn Error>> {
    let network = digit_net::load_network_from_file(&args.network)?;
    let data = load_data(&args.data)?;
    let evaluation = evaluate(&network, &data)?;
    println!("{}", evaluation);
    for class in 0..evaluation.total_per_class.len() {
        println!(
            "class {}: {:.2}% of {}, predicted wrongly {} times",
            class,
            evaluation.class_accuracy(class) * 100.0,
            evaluation.total_per_class[class],
            evaluation.wrongly_predicted_as[class]
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Command::Train(args) => train(args),
        Command::Evaluate(args) => evaluate_saved(args),
    }
}
