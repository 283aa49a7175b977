mod api;
mod database;
mod ingest;
mod lexicon;
mod settings;
mod tagging;
mod web;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub(crate) use crate::database::Database;
use crate::{
    lexicon::Lexicon,
    settings::{Args, Settings},
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let settings = Settings::from_file(&args.config)?;
    let lexicon = match &settings.lexicon {
        Some(lexicon) => Lexicon::from_file(&lexicon.path)?,
        None => Lexicon::default(),
    };
    let database = Database::connect(&settings.database.path)?;

    info!("review dashboard server {}", env!("CARGO_PKG_VERSION"));
    let schema = api::schema(database.clone(), settings.metrics_scope);
    web::serve(schema, database, lexicon, settings.web.address).await;
    Ok(())
}
