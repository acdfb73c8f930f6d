/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/


use clap::Parser;
use radar_exchange::control_plane::config::{
    read_config, ConfigDocument, NodeConfig, PublicationConfig, SubscriptionConfig,
};
use radar_exchange::control_plane::plugin_registry::PluginRegistry;
use radar_exchange::matching::{evaluate, Filter};
use radar_exchange::storage::StorageRegistry;
use radar_exchange::{ExchangeError, Metadata, Result};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser)]
#[command(about = "Validates exchange subscription and publication configuration files")]
struct CheckArgs {
    /// Subscription or publication configuration files (JSON5).
    #[arg(required = true, value_name = "FILE")]
    configs: Vec<PathBuf>,

    /// Node configuration file to validate as well.
    #[arg(short, long, value_name = "FILE")]
    node: Option<PathBuf>,

    /// Metadata document (JSON) to evaluate every filter against.
    #[arg(short, long, value_name = "FILE")]
    metadata: Option<PathBuf>,

    /// Also resolve connection, sender and decorator classes against the built-in plugins.
    #[arg(long)]
    check_plugins: bool,
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();
    let args = CheckArgs::parse();

    if let Some(node) = &args.node {
        let config: NodeConfig = read_config(node)?;
        println!(
            "{}: node '{}' (handled_files_limit={})",
            node.display(),
            config.node_name,
            config.handled_files_limit
        );
    }

    let metadata = args
        .metadata
        .as_deref()
        .map(read_metadata)
        .transpose()?;
    let plugins = args.check_plugins.then(PluginRegistry::with_defaults);

    let mut failures = 0;
    for path in &args.configs {
        if let Err(err) = check_file(path, metadata.as_ref(), plugins.as_ref()) {
            error!(path = %path.display(), err = %err, "configuration rejected");
            println!("{}: INVALID: {err}", path.display());
            failures += 1;
        }
    }

    info!(checked = args.configs.len(), failures, "configuration check finished");
    if failures > 0 {
        return Err(ExchangeError::Config {
            msg: format!("{failures} of {} configuration files invalid", args.configs.len()),
        });
    }
    Ok(())
}

fn read_metadata(path: &Path) -> Result<Metadata> {
    let contents = std::fs::read(path)?;
    Ok(serde_json::from_slice(&contents)?)
}

fn check_file(
    path: &Path,
    metadata: Option<&Metadata>,
    plugins: Option<&PluginRegistry>,
) -> Result<()> {
    match ConfigDocument::read(path)? {
        ConfigDocument::Subscription(config) => {
            describe_subscription(path, &config);
            report_filter(config.filter.as_ref(), metadata)
        }
        ConfigDocument::Publication(config) => {
            config.validate_class()?;
            describe_publication(path, &config);
            if let Some(plugins) = plugins {
                let storages = StorageRegistry::new();
                let connection = plugins.build_connection(&config.connection, &storages)?;
                let decorators = plugins.build_decorators(&config.decorators)?;
                println!(
                    "  plugins: connection={} senders={:?} decorators={}",
                    connection.kind(),
                    connection.sender_ids(),
                    decorators.len()
                );
            }
            report_filter(config.filter.as_ref(), metadata)
        }
    }
}

fn describe_subscription(path: &Path, config: &SubscriptionConfig) {
    println!(
        "{}: subscription '{}' active={} storages={:?} allow_duplicates={} allowed_ids={:?}",
        path.display(),
        config.id.as_deref().unwrap_or("-"),
        config.active,
        config.storage,
        config.allow_duplicates,
        config.allowed_ids
    );
}

fn describe_publication(path: &Path, config: &PublicationConfig) {
    println!(
        "{}: publication '{}' active={} origins={:?} connection={} decorators={} threads={} \
         queue_size={}",
        path.display(),
        config.name,
        config.active,
        config.subscription_origin,
        config.connection.class,
        config.decorators.len(),
        config.extra_arguments.threads,
        config.extra_arguments.queue_size
    );
}

fn report_filter(filter: Option<&Filter>, metadata: Option<&Metadata>) -> Result<()> {
    let expression = filter.cloned().unwrap_or_default().compile();
    println!("  filter: {expression}");

    if let Some(metadata) = metadata {
        let value = evaluate(metadata, &expression)?;
        println!("  evaluates to: {value}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::check_file;
    use radar_exchange::control_plane::plugin_registry::PluginRegistry;
    use radar_exchange::Metadata;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn accepts_subscription_and_evaluates_filter() {
        let file = config_file(
            r#"{subscription: {id: "s", filter: {filter_type: "attribute_filter",
                name: "/what/object", operation: "=", value_type: "string", value: "PVOL"}}}"#,
        );
        let metadata = Metadata::new().with_attribute("/what/object", "PVOL");

        assert!(check_file(file.path(), Some(&metadata), None).is_ok());
    }

    #[test]
    fn rejects_unknown_sender_when_checking_plugins() {
        let file = config_file(
            r#"{publication: {name: "p", connection: {class: "simple",
                arguments: {sender: {class: "sftp"}}}}}"#,
        );
        let plugins = PluginRegistry::with_defaults();

        assert!(check_file(file.path(), None, None).is_ok());
        assert!(check_file(file.path(), None, Some(&plugins)).is_err());
    }

    #[test]
    fn rejects_malformed_filter() {
        let file =
            config_file(r#"{subscription: {filter: {filter_type: "and_filter", value: 1}}}"#);

        assert!(check_file(file.path(), None, None).is_err());
    }
}
