//! Command dispatch
//!
//! Loads settings, opens the store through the service container and routes
//! each subcommand to the hierarchy service.

use std::io;

use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_dir, global_config_path, Settings};
use crate::domain::{DomainError, Node, NodeId};
use crate::infrastructure::di::ServiceContainer;
use crate::util::path::expand_env_vars;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see `lineage --help`".to_string(),
        ));
    };

    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Commands::Config { command } => handle_config(cli, command),
        _ => {
            let container = ServiceContainer::new(&load_settings(cli)?)?;
            let result = dispatch(&container, command);
            // Release the store even when the command failed.
            let shutdown = container.hierarchy.shutdown();
            result?;
            Ok(shutdown?)
        }
    }
}

/// Settings with CLI flags layered on top of config files and environment.
fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(store) = &cli.store {
        settings.store = expand_env_vars(store);
    }
    if let Some(strategy) = cli.strategy {
        settings.closure_strategy = strategy;
    }
    debug!(store = %settings.store, strategy = %settings.closure_strategy, "effective settings");
    Ok(settings)
}

fn dispatch(container: &ServiceContainer, command: &Commands) -> CliResult<()> {
    let service = &container.hierarchy;
    match command {
        Commands::AddRoot { id } => {
            let node = service.add_root(*id)?;
            output::success(&format!("added root {}", node.id));
        }
        Commands::AddChild { id, parent } => {
            let node = service.add_child(*id, *parent)?;
            output::success(&format!("added {} under {}", node.id, parent));
        }
        Commands::Delete { id } => {
            let node = service.delete_leaf(*id)?;
            output::success(&format!("deleted {}", node.id));
        }
        Commands::DeleteSubtree { id } => {
            let removed = service.delete_subtree(*id)?;
            output::success(&format!("deleted {} node(s)", removed.len()));
            output::detail(&removed.iter().join(" "));
        }
        Commands::Get { id } => {
            let node = service.get(*id)?.ok_or(ApplicationError::from(DomainError::NotFound(*id)))?;
            output::info(&node);
        }
        Commands::Children { id } => print_nodes(&service.children(*id)?),
        Commands::Parent { id } => match service.parent(*id)? {
            Some(parent) => output::info(&parent),
            None => output::warning(&format!("{id} is a root")),
        },
        Commands::Root { id } => output::info(&service.root(*id)?),
        Commands::Ancestors { id } => print_nodes(&service.ancestors(*id)?),
        Commands::Descendants { id } => print_nodes(&service.descendants(*id)?),
        Commands::Tree { id } => _tree(container, *id)?,
        Commands::Forest => _forest(container)?,
        Commands::Check => _check(container)?,
        Commands::Config { .. } | Commands::Completion { .. } => {
            return Err(CliError::Usage(
                "command does not operate on a store".to_string(),
            ))
        }
    }
    Ok(())
}

fn print_nodes(nodes: &[Node]) {
    for node in nodes {
        output::info(node);
    }
}

#[instrument(skip(container))]
fn _tree(container: &ServiceContainer, id: NodeId) -> CliResult<()> {
    let tree = container.hierarchy.descendants_tree(id)?;
    debug!(nodes = tree.len(), depth = tree.depth(), "subtree assembled");
    print!("{}", tree.render());
    Ok(())
}

#[instrument(skip(container))]
fn _forest(container: &ServiceContainer) -> CliResult<()> {
    let trees = container.hierarchy.forest()?;
    if trees.is_empty() {
        output::warning("store is empty");
        return Ok(());
    }
    for tree in trees {
        print!("{}", tree.render());
    }
    Ok(())
}

#[instrument(skip(container))]
fn _check(container: &ServiceContainer) -> CliResult<()> {
    let report = container.hierarchy.check_integrity()?;
    output::header(&format!(
        "{}: {} node(s), {} tree(s)",
        container.hierarchy.descriptor(),
        report.nodes,
        report.trees
    ));
    if report.is_clean() {
        output::success_detail("no violations");
        return Ok(());
    }
    for violation in &report.violations {
        output::failure(violation);
    }
    Err(CliError::IntegrityViolations(report.violations.len()))
}

fn handle_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Init { global } => {
            let path = if *global {
                let dir = global_config_dir().ok_or_else(|| {
                    CliError::Usage("cannot determine config directory".to_string())
                })?;
                std::fs::create_dir_all(&dir).map_err(|e| {
                    CliError::Usage(format!("create {}: {}", dir.display(), e))
                })?;
                dir.join("lineage.toml")
            } else {
                std::path::PathBuf::from("lineage.toml")
            };
            if path.exists() {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            std::fs::write(&path, Settings::template())
                .map_err(|e| CliError::Usage(format!("write {}: {}", path.display(), e)))?;
            output::action("Created", &path.display());
        }
        ConfigCommands::Path => match global_config_path() {
            Some(path) => {
                let marker = if path.exists() { "" } else { " (not found)" };
                output::info(&format!("global: {}{}", path.display(), marker));
            }
            None => output::warning("cannot determine config directory"),
        },
    }
    Ok(())
}
