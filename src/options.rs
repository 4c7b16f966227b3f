use clap::{Parser, Subcommand};

/// SMS spam filter: train, query, and serve a Naive Bayes text classifier.
#[derive(Parser, Debug)]
#[command(name = "rs_spamfilter")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train, query, and serve an SMS spam classifier")]
pub struct Options {
    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fit the pipeline on a labeled CSV corpus and save a snapshot
    Train(TrainArgs),

    /// Classify a single message with a saved snapshot
    Predict(PredictArgs),

    /// Expose a saved snapshot over a websocket endpoint
    Serve(ServeArgs),
}

#[derive(Parser, Debug)]
pub struct TrainArgs {
    /// Path to the `label,text` CSV corpus
    #[arg(long, default_value = "data/sms_sample_20.csv")]
    pub data: String,

    /// Where to write the trained snapshot (defaults to the config file's model path)
    #[arg(long)]
    pub model: Option<String>,

    /// Cap on the number of corpus rows to use
    #[arg(long)]
    pub n: Option<usize>,

    /// Additive smoothing constant
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Minimum document frequency for vocabulary tokens
    #[arg(long)]
    pub min_df: Option<usize>,
}

#[derive(Parser, Debug)]
pub struct PredictArgs {
    /// Path to a trained snapshot (defaults to the config file's model path)
    #[arg(long)]
    pub model: Option<String>,

    /// The message to classify
    #[arg(long)]
    pub message: String,
}

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Path to a trained snapshot (defaults to the config file's model path)
    #[arg(long)]
    pub model: Option<String>,

    /// Listen address, e.g. 127.0.0.1:9002 (defaults to the config file's)
    #[arg(long)]
    pub address: Option<String>,
}
