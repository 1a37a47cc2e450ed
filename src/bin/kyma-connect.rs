// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Connector Command-Line Tool
//!
//! Enrolls an application with a one-time configuration URL, keeps the key
//! material in a local directory and calls the application APIs with the
//! enrolled identity.
//!
//! # Usage
//!
//! ```text
//! kyma-connect [OPTIONS] <COMMAND>
//!
//! Commands:
//!   enroll            Enroll with a one-time configuration URL
//!   status            Show the stored identity
//!   renew             Rotate the key pair and certificate
//!   revoke            Revoke the current certificate
//!   register-service  Register a service document
//!   update-service    Replace a registered service document
//!   delete-service    Delete a registered service
//!   publish-event     Publish an event document
//!   events            List subscribed events
//!
//! Options:
//!   -s, --store <DIR>           Key material directory
//!       --ca-cert <PATH>        Trust only these CA certificates (PEM)
//!       --timeout <SECS>        Transport timeout
//!       --key-algorithm <ALG>   Override the key algorithm hint
//!   -v, --verbose               Enable verbose output
//!   -q, --quiet                 Suppress non-error output
//!       --json-logs             Emit logs as JSON
//! ```
//!
//! # Examples
//!
//! ```bash
//! # Enroll with the URL shown in the cluster console
//! kyma-connect enroll "https://connector.example.com/v1/applications/signingRequests/info?token=abc"
//!
//! # Register a service
//! kyma-connect register-service --file service.json
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use kyma_connector::logging::{init_logging, LogConfig, LogLevel};
use kyma_connector::{
    ConnectError, Connector, ConnectorConfig, ConnectorState, FileStore, KeyAlgorithm,
};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Connector Command-Line Tool
#[derive(Parser)]
#[command(name = "kyma-connect")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Enroll an application and call its APIs over mutual TLS", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Directory holding the key material
    #[arg(short, long, global = true, value_name = "DIR", default_value = "kyma-connect")]
    store: PathBuf,

    /// Trust only these CA certificates (PEM file, repeatable)
    #[arg(long = "ca-cert", global = true, value_name = "PATH")]
    ca_certs: Vec<PathBuf>,

    /// Transport timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    /// Key algorithm (rsa2048, rsa3072, rsa4096, ecdsa-p256, ecdsa-p384)
    #[arg(long, global = true, value_name = "ALG")]
    key_algorithm: Option<KeyAlgorithm>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll with a one-time configuration URL
    Enroll {
        /// Configuration URL
        url: String,
    },

    /// Show the stored identity
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rotate the key pair and certificate
    Renew,

    /// Revoke the current certificate
    Revoke,

    /// Register a service document
    RegisterService {
        /// JSON service document
        #[arg(short, long, value_name = "PATH")]
        file: PathBuf,
    },

    /// Replace a registered service document
    UpdateService {
        /// Service ID
        id: String,

        /// JSON service document
        #[arg(short, long, value_name = "PATH")]
        file: PathBuf,
    },

    /// Delete a registered service
    DeleteService {
        /// Service ID
        id: String,
    },

    /// Publish an event document
    PublishEvent {
        /// JSON event document
        #[arg(short, long, value_name = "PATH")]
        file: PathBuf,
    },

    /// List subscribed events
    Events,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.quiet {
        LogLevel::Error
    } else if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let mut log_config = LogConfig::default().with_level(level);
    if cli.json_logs {
        log_config = log_config.with_json();
    }
    if let Err(e) = init_logging(&log_config) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run_command(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_command(cli: Cli) -> CliResult {
    let config = build_config(&cli)?;
    let store = FileStore::new(&cli.store)?;

    match &cli.command {
        Commands::Enroll { url } => cmd_enroll(&cli, store, config, url).await,
        Commands::Status { json } => cmd_status(store, config, *json),
        Commands::Renew => {
            let mut connector = Connector::open(store, config)?;
            connector.renew().await?;
            print_unless_quiet(&cli, "Certificate renewed");
            Ok(())
        }
        Commands::Revoke => {
            let mut connector = Connector::open(store, config)?;
            connector.revoke().await?;
            print_unless_quiet(&cli, "Certificate revoked");
            Ok(())
        }
        Commands::RegisterService { file } => {
            let connector = Connector::open(store, config)?;
            let id = connector.register_service(&read_document(file)?).await?;
            println!("{}", id);
            Ok(())
        }
        Commands::UpdateService { id, file } => {
            let connector = Connector::open(store, config)?;
            connector.update_service(id, &read_document(file)?).await?;
            print_unless_quiet(&cli, &format!("Service {} updated", id));
            Ok(())
        }
        Commands::DeleteService { id } => {
            let connector = Connector::open(store, config)?;
            connector.delete_service(id).await?;
            print_unless_quiet(&cli, &format!("Service {} deleted", id));
            Ok(())
        }
        Commands::PublishEvent { file } => {
            let connector = Connector::open(store, config)?;
            connector.publish_event(&read_document(file)?).await?;
            print_unless_quiet(&cli, "Event published");
            Ok(())
        }
        Commands::Events => {
            let connector = Connector::open(store, config)?;
            for event in connector.subscribed_events().await? {
                println!("{}\t{}", event.name, event.version);
            }
            Ok(())
        }
    }
}

fn build_config(cli: &Cli) -> Result<ConnectorConfig, Box<dyn std::error::Error>> {
    let mut builder = ConnectorConfig::builder();

    if !cli.ca_certs.is_empty() {
        let certs = cli
            .ca_certs
            .iter()
            .map(|path| {
                std::fs::read(path)
                    .map_err(|e| format!("Failed to read {}: {}", path.display(), e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        builder = builder.trust_explicit(certs);
    }

    if let Some(secs) = cli.timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    if let Some(algorithm) = cli.key_algorithm {
        builder = builder.key_algorithm(algorithm);
    }

    Ok(builder.build())
}

async fn cmd_enroll(
    cli: &Cli,
    store: FileStore,
    config: ConnectorConfig,
    url: &str,
) -> CliResult {
    let mut connector = Connector::new(store, config);
    connector.enroll(url).await?;

    if !cli.quiet {
        println!("Enrolled");
        if let Some(info) = connector.runtime_info() {
            println!("  Application: {}", info.client_identity.application);
        }
        if let Some(client) = connector.secure_client() {
            println!("  Fingerprint: {}", client.fingerprint_hex());
        }
        println!("  Store: {}", connector.store().root().display());
    }

    Ok(())
}

fn cmd_status(store: FileStore, config: ConnectorConfig, json: bool) -> CliResult {
    let connector = match Connector::open(store.clone(), config.clone()) {
        Ok(connector) => connector,
        Err(ConnectError::NoPersistedIdentity { .. }) => Connector::new(store, config),
        Err(e) => return Err(e.into()),
    };

    let state = connector.state();
    let application = connector
        .runtime_info()
        .map(|info| info.client_identity.application.clone());
    let client = connector.secure_client();

    if json {
        let status = serde_json::json!({
            "state": state.to_string(),
            "application": application,
            "commonName": client.and_then(|c| c.common_name()),
            "fingerprint": client.map(|c| c.fingerprint_hex()),
            "urls": connector.runtime_info().map(|info| &info.urls),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("State: {}", state);
    if state == ConnectorState::Unenrolled {
        return Ok(());
    }
    if let Some(application) = application {
        println!("  Application: {}", application);
    }
    if let Some(client) = client {
        if let Some(cn) = client.common_name() {
            println!("  Common Name: {}", cn);
        }
        println!("  Fingerprint: {}", client.fingerprint_hex());
    }
    if let Some(info) = connector.runtime_info() {
        println!("  Metadata URL: {}", info.urls.metadata_url);
        println!("  Events URL: {}", info.urls.events_url);
        println!("  Renew URL: {}", info.urls.renew_cert_url);
        println!("  Revoke URL: {}", info.urls.revoke_cert_url);
    }

    Ok(())
}

fn read_document(path: &Path) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let data = std::fs::read(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let document = serde_json::from_slice(&data)
        .map_err(|e| format!("Invalid JSON in {}: {}", path.display(), e))?;
    Ok(document)
}

fn print_unless_quiet(cli: &Cli, message: &str) {
    if !cli.quiet {
        println!("{}", message);
    }
}
