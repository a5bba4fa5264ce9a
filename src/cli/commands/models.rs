use anyhow::Result;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat, Provider};
use crate::services::embedding::LOCAL_MODELS;

pub async fn handle_models(config: &Config, format: OutputFormat, verbose: bool) -> Result<()> {
    let formatter = get_formatter(format);
    let current = match config.embedding.provider {
        Provider::Local => config.embedding.model.as_str(),
        Provider::Remote => "",
    };

    print!("{}", formatter.format_models(LOCAL_MODELS, current));
    if verbose && format == OutputFormat::Text {
        let cache = config.embedding.model_cache_dir();
        print!(
            "{}",
            formatter.format_message(&format!("\nModel cache: {}", cache.display()))
        );
    }
    Ok(())
}
