pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "repairdesk")]
#[command(about = "Repairdesk CLI - partner sync and spreadsheet exports without the HTTP server")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Synchronize insurance cases from the partner API")]
    Sync {
        #[command(subcommand)]
        cmd: commands::sync::SyncCommands,
    },

    #[command(about = "Write spreadsheet exports to disk")]
    Export {
        #[command(subcommand)]
        cmd: commands::export::ExportCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::Sync { cmd } => commands::sync::handle(cmd, output_format).await,
        Commands::Export { cmd } => commands::export::handle(cmd, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partner_export_arguments() {
        let cli = Cli::parse_from([
            "repairdesk",
            "--json",
            "export",
            "partner",
            "--output",
            "out.xlsx",
            "4711",
            "4712",
        ]);
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        match cli.command {
            Commands::Export {
                cmd: commands::export::ExportCommands::Partner { output, file, numbers },
            } => {
                assert_eq!(output.to_str(), Some("out.xlsx"));
                assert!(file.is_none());
                assert_eq!(numbers, vec!["4711", "4712"]);
            }
            _ => panic!("expected export partner"),
        }
    }

    #[test]
    fn parses_single_case_sync() {
        let cli = Cli::parse_from(["repairdesk", "sync", "case", "42"]);
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Text));
        assert!(matches!(
            cli.command,
            Commands::Sync { cmd: commands::sync::SyncCommands::Case { case_id: 42 } }
        ));
    }
}
