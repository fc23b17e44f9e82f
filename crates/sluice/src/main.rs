//! sluice CLI: list, delete and classify entries on a storage service.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use cli::{CliArgs, Command};
use sluice_core::{FileType, FilesystemHandle, StorageContext, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();
    let context = StorageContext::new();
    let identity = args.identity.as_deref();
    let config_path = args.config.as_deref();

    if let Command::Conf { locator } = &args.command {
        return print_configuration(&context, locator, identity, config_path).await;
    }

    let handle = match context
        .acquire(args.command.target(), identity, config_path)
        .await
    {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to acquire filesystem: {e}");
            return ExitCode::FAILURE;
        }
    };

    match &args.command {
        Command::Ls { locator, glob } => {
            for entry in handle.list_entries(locator, *glob).await {
                let kind = if entry.is_dir { "d" } else { "-" };
                println!("{kind} {:>12} {}", entry.size, entry.path);
            }
            ExitCode::SUCCESS
        }
        Command::Rm {
            locator,
            recursive,
            glob,
        } => {
            let report = handle.delete_entries(locator, *recursive, *glob).await;
            for path in report.deleted() {
                println!("deleted {path}");
            }
            for (path, e) in report.failures() {
                eprintln!("failed {path}: {e}");
            }
            if let Some(e) = &report.listing_error {
                eprintln!("Failed to list {locator}: {e}");
            }
            info!(deleted = report.deleted().count(), "Delete finished");
            if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Command::Sniff { locators } => sniff(&handle, locators).await,
        Command::Conf { .. } => ExitCode::SUCCESS,
    }
}

async fn sniff(handle: &FilesystemHandle, locators: &[String]) -> ExitCode {
    let mut status = ExitCode::SUCCESS;
    for locator in locators {
        let file_type = match handle.classify(locator).await {
            Ok(file_type) => file_type,
            Err(e) => {
                eprintln!("{locator}: {e}");
                status = ExitCode::FAILURE;
                continue;
            }
        };
        println!("{locator}: {file_type}");

        if file_type == FileType::SequenceContainer {
            match handle.read_sequence_header(locator).await {
                Ok(header) => {
                    println!("  version: {}", header.version);
                    println!("  key: {}", header.key_class);
                    println!("  value: {}", header.value_class);
                    if let Some(codec) = &header.codec_class {
                        println!("  codec: {codec}");
                    }
                }
                Err(e) => {
                    eprintln!("{locator}: {e}");
                    status = ExitCode::FAILURE;
                }
            }
        }
    }
    status
}

async fn print_configuration(
    context: &StorageContext,
    locator: &str,
    identity: Option<&str>,
    config_path: Option<&str>,
) -> ExitCode {
    let configuration = match context
        .resolve_configuration(locator, identity, config_path)
        .await
    {
        Ok(configuration) => configuration,
        Err(e) => {
            eprintln!("Failed to resolve configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match serde_yaml::to_string(configuration.as_ref()) {
        Ok(yaml) => {
            print!("{yaml}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to render configuration: {e}");
            ExitCode::FAILURE
        }
    }
}
