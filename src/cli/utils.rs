use serde_json::{json, Value};

use crate::app::AppState;
use crate::cli::OutputFormat;
use crate::config;
use crate::database::DatabaseManager;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output a list of lines in text mode, or the value as-is in JSON mode
pub fn output_details(output_format: &OutputFormat, lines: &[String], value: &Value) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => {
            for line in lines {
                println!("  {}", line);
            }
        }
    }
    Ok(())
}

/// Connect to the configured database and wire the same state the server uses.
pub async fn load_state() -> anyhow::Result<AppState> {
    let _ = dotenvy::dotenv();
    let config = config::config().clone();
    let pool = DatabaseManager::connect(&config.database).await?;
    AppState::from_config(config, pool)
}
