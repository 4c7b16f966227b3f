pub mod classifiers;
pub mod config;
pub mod corpus;
pub mod logging;
pub mod options;
pub mod pipeline;
pub mod server;
pub mod snapshot;
pub mod vectorizer;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use crate::config::Config;
use crate::logging::setup_logger;
use crate::options::{Command, Options, PredictArgs, ServeArgs, TrainArgs};
use crate::pipeline::Pipeline;
use crate::server::ClassifyServer;

#[tokio::main]
async fn main() -> Result<()> {
    let options = Options::parse();
    let config = Config::new()?;
    let level = options
        .log_level
        .as_deref()
        .unwrap_or(&config.logging.level);
    setup_logger(level);

    match options.command {
        Command::Train(args) => train(args, &config),
        Command::Predict(args) => predict(args, &config),
        Command::Serve(args) => serve(args, &config).await,
    }
}

fn train(args: TrainArgs, config: &Config) -> Result<()> {
    let model_path = args.model.unwrap_or_else(|| config.model.path.clone());
    let alpha = args.alpha.unwrap_or(config.model.alpha);
    let min_df = args.min_df.unwrap_or(config.model.min_df);

    let (texts, labels) = corpus::load_csv(&args.data, args.n)?;
    let pipeline = Pipeline::train(&texts, &labels, alpha, min_df)?;
    let accuracy = pipeline.evaluate(&texts, &labels)?;
    pipeline.save_to_file(&model_path)?;

    println!(
        "Trained on {} samples. Accuracy (train): {:.3}",
        texts.len(),
        accuracy
    );
    println!("Model saved to {}", model_path);
    Ok(())
}

fn predict(args: PredictArgs, config: &Config) -> Result<()> {
    let model_path = args.model.unwrap_or_else(|| config.model.path.clone());
    let pipeline = Pipeline::load_from_file(&model_path)?;
    let prediction = pipeline.predict(&args.message)?;

    println!("Message: {}", args.message);
    println!("Predicted: {}", prediction.label);
    println!("Class probabilities:");
    for (class, p) in &prediction.probabilities {
        println!("  {}: {:.4}", class, p);
    }
    Ok(())
}

async fn serve(args: ServeArgs, config: &Config) -> Result<()> {
    let model_path = args.model.unwrap_or_else(|| config.model.path.clone());
    let address = args.address.unwrap_or_else(|| config.server.address.clone());

    let pipeline = Arc::new(Pipeline::load_from_file(&model_path)?);
    info!("Serving classes: {:?}", pipeline.classes());

    let server = ClassifyServer::new(&address, pipeline);
    server.run().await
}
