//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

use crate::application::services::ClosureStrategy;
use crate::domain::NodeId;

/// Single-parent hierarchy store: ancestor/descendant closures, subtree assembly
/// and cascading deletes
#[derive(Parser, Debug)]
#[command(name = "lineage")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Store descriptor, e.g. memory: or file:~/forest.toml (overrides config)
    #[arg(short, long, global = true)]
    pub store: Option<String>,

    /// Closure strategy: walk or scan (overrides config)
    #[arg(long, global = true, value_parser = parse_strategy)]
    pub strategy: Option<ClosureStrategy>,

    /// Explicit config file
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a root node
    AddRoot {
        id: NodeId,
    },

    /// Create a node under an existing parent
    AddChild {
        id: NodeId,
        /// Parent node id
        parent: NodeId,
    },

    /// Delete a node without children
    Delete {
        id: NodeId,
    },

    /// Delete a node and everything below it
    DeleteSubtree {
        id: NodeId,
    },

    /// Show a single node
    Get {
        id: NodeId,
    },

    /// List direct children
    Children {
        id: NodeId,
    },

    /// Show the direct parent
    Parent {
        id: NodeId,
    },

    /// Show the top-most ancestor
    Root {
        id: NodeId,
    },

    /// List ancestors, nearest first
    Ancestors {
        id: NodeId,
    },

    /// List all descendants
    Descendants {
        id: NodeId,
    },

    /// Print the subtree rooted at a node
    Tree {
        id: NodeId,
    },

    /// Print every tree in the store
    Forest,

    /// Verify structural invariants across the whole store
    Check,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Print a commented config template
    Template,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}

fn parse_strategy(s: &str) -> Result<ClosureStrategy, String> {
    s.parse().map_err(|e: crate::application::ApplicationError| e.to_string())
}
