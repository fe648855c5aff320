use std::process::ExitCode;
use std::sync::Arc;

use azure_identity::DefaultAzureCredential;
use clap::Parser;

use vhd_export::cli::Cli;
use vhd_export::cloud::arm::ArmClient;
use vhd_export::cloud::blob::BlobCopier;
use vhd_export::export::{ExportOutcome, Exporter};
use vhd_export::prompt::TerminalPrompt;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let request = cli.request();

    // The credential chain ends with the Azure CLI, so an interactive
    // `az login` session satisfies it.
    let credential = Arc::new(DefaultAzureCredential::default());
    let arm = match ArmClient::new(credential, &cli.subscription_id) {
        Ok(client) => Arc::new(client),
        Err(error) => {
            eprintln!("vhd-export: {error}");
            return ExitCode::FAILURE;
        }
    };

    let exporter = Exporter::new(
        arm.clone(),
        arm.clone(),
        arm.clone(),
        arm,
        Arc::new(BlobCopier),
    );

    match exporter.run(&request, &TerminalPrompt).await {
        Ok(ExportOutcome::Completed(outcome)) => {
            println!(
                "Copied {} bytes in {:.1?}.",
                outcome.bytes_copied, outcome.elapsed
            );
            println!("Complete!");
            ExitCode::SUCCESS
        }
        Ok(ExportOutcome::Cancelled) => {
            println!("Cancelled; nothing was copied.");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("vhd-export: {error}");
            ExitCode::FAILURE
        }
    }
}
