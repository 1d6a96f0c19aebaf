use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{load_state, output_success};
use crate::cli::OutputFormat;
use crate::export::{export_partner_cases, xlsx, FileDownload};

#[derive(Subcommand)]
pub enum ExportCommands {
    #[command(about = "Export cases missing from the last partner sync to XLSX")]
    Old {
        #[arg(long, short, help = "Destination .xlsx file")]
        output: PathBuf,
    },

    #[command(about = "Fetch cases by number from the partner API and export them to XLSX")]
    Partner {
        #[arg(long, short, help = "Destination .xlsx file")]
        output: PathBuf,
        #[arg(long, help = "File with one case number per line")]
        file: Option<PathBuf>,
        #[arg(help = "Case numbers")]
        numbers: Vec<String>,
    },
}

pub async fn handle(cmd: ExportCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let state = load_state().await?;

    match cmd {
        ExportCommands::Old { output } => {
            let rows = state.cases.select_absent_cases().await?;
            let download = xlsx::old_cases_download(&rows)?;
            write_download(&download, &output)?;
            output_success(
                &output_format,
                &format!("Wrote {} old cases to {}", rows.len(), output.display()),
                Some(json!({ "rows": rows.len(), "output": output })),
            )
        }
        ExportCommands::Partner { output, file, numbers } => {
            let mut case_numbers = numbers;
            if let Some(path) = file {
                case_numbers.extend(read_case_numbers(&path)?);
            }

            let export = export_partner_cases(state.partner.as_ref(), &case_numbers, &state.config.export).await?;
            let found = export.found.len();
            let not_found = export.not_found.clone();
            let download = export.into_download()?;
            write_download(&download, &output)?;

            output_success(
                &output_format,
                &format!("Wrote {} partner cases to {}", found, output.display()),
                Some(json!({ "found": found, "not_found": not_found, "output": output })),
            )?;
            if matches!(output_format, OutputFormat::Text) && !not_found.is_empty() {
                println!("  not found: {}", not_found.join(", "));
            }
            Ok(())
        }
    }
}

fn read_case_numbers(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(parse_case_numbers(&content))
}

fn parse_case_numbers(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn write_download(download: &FileDownload, path: &Path) -> anyhow::Result<()> {
    std::fs::write(path, &download.bytes).with_context(|| format!("failed to write {}", path.display()))
}
