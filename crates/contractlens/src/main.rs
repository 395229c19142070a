//! contractlens CLI: upload contracts, inspect analyses and ask questions.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;
use thiserror::Error;

use contractlens::config::{apply_env_overrides, default_config_path, load_config};
use contractlens::db::project_repo::ProjectChanges;
use contractlens::logging::{self, LoggingError};
use contractlens::worker::JobResult;
use contractlens::{Config, ContractLensError, ContractService, ProcessingStatus, ServiceError};

/// contractlens: staged LLM analysis of contract documents.
#[derive(Parser)]
#[command(name = "contractlens", version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.contractlens/config.json when present).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a project to group contracts.
    ProjectCreate {
        name: String,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        job_number: Option<String>,
    },

    /// List projects.
    Projects,

    /// Show a project with its contracts.
    Project { project_id: i64 },

    /// Change a project's name, description or job number.
    ProjectUpdate {
        project_id: i64,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        job_number: Option<String>,
    },

    /// Delete a project, its contracts and their stored documents.
    ProjectDelete { project_id: i64 },

    /// Upload a document and wait for its analysis.
    Upload {
        project_id: i64,

        file: PathBuf,

        /// Skip printing the result. Queued analysis still finishes before exit.
        #[arg(long)]
        no_wait: bool,
    },

    /// Schedule analysis of a pending contract.
    Submit {
        contract_id: i64,

        #[arg(long)]
        no_wait: bool,
    },

    /// Show a contract's status and analysis.
    Show { contract_id: i64 },

    /// List a project's contracts.
    List { project_id: i64 },

    /// Re-run analysis of a completed or failed contract.
    Reanalyze {
        contract_id: i64,

        #[arg(long)]
        no_wait: bool,
    },

    /// Ask a question about an analyzed contract.
    Ask {
        contract_id: i64,

        question: String,

        /// Extra context passed along with the question.
        #[arg(long)]
        context: Option<String>,
    },

    /// Force a contract's processing status.
    SetStatus {
        contract_id: i64,

        /// pending, processing, completed or failed.
        status: ProcessingStatus,

        /// JSON document replacing the contract data.
        #[arg(long)]
        data: Option<String>,
    },

    /// Delete a contract and its stored document.
    Delete { contract_id: i64 },
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    App(#[from] ContractLensError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("Failed to read '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Workers stopped before contract {0} finished")]
    NoResult(i64),
}

impl From<ServiceError> for CliError {
    fn from(err: ServiceError) -> Self {
        CliError::App(err.into())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = resolve_config(cli.config.as_deref())?;
    match cli.verbose {
        0 => {}
        1 => config.logging.filter = "contractlens=debug".to_string(),
        _ => config.logging.filter = "contractlens=trace,debug".to_string(),
    }
    config.logging.json |= cli.log_json;
    logging::init(&config.logging)?;

    info!("Starting contractlens v{}", env!("CARGO_PKG_VERSION"));

    let service = ContractService::from_config(&config)?;
    let outcome = dispatch(&service, cli.command);
    service.shutdown();
    outcome
}

fn resolve_config(path: Option<&Path>) -> Result<Config, ContractLensError> {
    let config = match path {
        Some(path) => load_config(path)?,
        None => match default_config_path().filter(|p| p.is_file()) {
            Some(path) => load_config(path)?,
            None => Config::default(),
        },
    };
    Ok(apply_env_overrides(config)?)
}

fn dispatch(service: &ContractService, command: Command) -> Result<(), CliError> {
    match command {
        Command::ProjectCreate {
            name,
            description,
            job_number,
        } => print_json(&service.create_project(
            &name,
            description.as_deref(),
            job_number.as_deref(),
        )?),

        Command::Projects => print_json(&service.list_projects()?),

        Command::Project { project_id } => print_json(&service.get_project_detail(project_id)?),

        Command::ProjectUpdate {
            project_id,
            name,
            description,
            job_number,
        } => {
            let changes = ProjectChanges {
                name: name.as_deref(),
                description: description.as_deref(),
                job_number: job_number.as_deref(),
            };
            service.update_project(project_id, &changes)?;
            print_json(&service.get_project_detail(project_id)?)
        }

        Command::ProjectDelete { project_id } => {
            service.delete_project(project_id)?;
            println!("Deleted project {}", project_id);
            Ok(())
        }

        Command::Upload {
            project_id,
            file,
            no_wait,
        } => {
            let content = std::fs::read(&file).map_err(|e| CliError::ReadFile {
                path: file.clone(),
                source: e,
            })?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "document".to_string());

            let contract = service.upload(project_id, &file_name, &content)?;
            if !no_wait {
                wait_for(service, contract.id)?;
            }
            print_json(&service.get_contract(contract.id)?)
        }

        Command::Submit {
            contract_id,
            no_wait,
        } => {
            service.submit(contract_id)?;
            if !no_wait {
                wait_for(service, contract_id)?;
            }
            print_json(&service.get_contract(contract_id)?)
        }

        Command::Show { contract_id } => print_json(&service.get_contract(contract_id)?),

        Command::List { project_id } => print_json(&service.list_project_contracts(project_id)?),

        Command::Reanalyze {
            contract_id,
            no_wait,
        } => {
            service.reanalyze(contract_id)?;
            if !no_wait {
                wait_for(service, contract_id)?;
            }
            print_json(&service.get_result(contract_id)?)
        }

        Command::Ask {
            contract_id,
            question,
            context,
        } => print_json(&service.ask(contract_id, &question, context.as_deref())?),

        Command::SetStatus {
            contract_id,
            status,
            data,
        } => {
            let data = data
                .map(|raw| serde_json::from_str::<serde_json::Value>(&raw))
                .transpose()?;
            print_json(&service.update_status(contract_id, status, data.as_ref())?)
        }

        Command::Delete { contract_id } => {
            service.delete_contract(contract_id)?;
            println!("Deleted contract {}", contract_id);
            Ok(())
        }
    }
}

fn wait_for(service: &ContractService, contract_id: i64) -> Result<JobResult, CliError> {
    while let Some(result) = service.recv_result() {
        if result.contract_id == contract_id {
            if let Some(error) = &result.error {
                log::warn!("Contract {} failed: {}", contract_id, error);
            }
            return Ok(result);
        }
    }
    Err(CliError::NoResult(contract_id))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
