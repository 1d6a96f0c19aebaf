use anyhow::anyhow;
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{load_state, output_details, output_success};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum SyncCommands {
    #[command(about = "Run a full sync of every listed partner case")]
    Run,

    #[command(about = "Sync a single case and print the outcome")]
    Case {
        #[arg(help = "Partner case id")]
        case_id: i64,
    },
}

pub async fn handle(cmd: SyncCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let state = load_state().await?;

    match cmd {
        SyncCommands::Run => {
            let guard = state
                .tracker
                .try_begin()
                .ok_or_else(|| anyhow!("A sync is already in progress"))?;
            let stats = state.engine.run_full(&guard).await?;

            output_success(
                &output_format,
                &format!("Sync {} finished", guard.run_id()),
                Some(json!({ "run_id": guard.run_id(), "stats": stats })),
            )?;
            if matches!(output_format, OutputFormat::Text) {
                output_details(
                    &output_format,
                    &[
                        format!("total cases:           {}", stats.total_cases),
                        format!("processed:             {}", stats.processed),
                        format!("upserted:              {}", stats.upserted),
                        format!("skipped (no change):   {}", stats.skipped_no_change),
                        format!("skipped (no insurer):  {}", stats.skipped_not_insurance),
                        format!("errors:                {}", stats.errors),
                    ],
                    &json!(stats),
                )?;
            }
            Ok(())
        }
        SyncCommands::Case { case_id } => {
            let outcome = state.engine.sync_single(case_id).await;
            let message = format!("Sync test for case {} completed.", case_id);
            output_success(&output_format, &message, Some(json!({ "result": outcome })))?;
            if matches!(output_format, OutputFormat::Text) {
                println!("  result: {}", outcome);
            }
            if outcome.is_error() {
                return Err(anyhow!("case {} finished with {}", case_id, outcome));
            }
            Ok(())
        }
    }
}
