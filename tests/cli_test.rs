//! End-to-end CLI dispatch against a file store

use clap::Parser;
use tempfile::TempDir;

use lineage::cli::args::Cli;
use lineage::cli::commands::execute_command;
use lineage::cli::CliError;
use lineage::domain::NodeId;
use lineage::exitcode;
use lineage::infrastructure::di::ServiceContainer;

fn run(store: &str, args: &[&str]) -> Result<(), CliError> {
    let mut argv = vec!["lineage", "--store", store];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).expect("valid arguments");
    execute_command(&cli)
}

fn file_store(temp: &TempDir) -> String {
    format!("file:{}", temp.path().join("forest.toml").display())
}

#[test]
fn given_commands_across_invocations_when_running_then_state_persists() {
    let temp = TempDir::new().unwrap();
    let store = file_store(&temp);

    run(&store, &["add-root", "1"]).unwrap();
    run(&store, &["add-child", "2", "1"]).unwrap();
    run(&store, &["add-child", "3", "2"]).unwrap();
    run(&store, &["tree", "1"]).unwrap();
    run(&store, &["check"]).unwrap();

    let service = ServiceContainer::open(&store).unwrap().hierarchy;
    assert_eq!(service.root(NodeId(3)).unwrap().id, NodeId(1));
}

#[test]
fn given_missing_parent_when_adding_child_then_noinput_exit_code() {
    let temp = TempDir::new().unwrap();
    let store = file_store(&temp);

    let error = run(&store, &["add-child", "5", "99"]).unwrap_err();

    assert_eq!(error.exit_code(), exitcode::NOINPUT);
}

#[test]
fn given_node_with_children_when_deleting_then_cantcreat_exit_code() {
    let temp = TempDir::new().unwrap();
    let store = file_store(&temp);
    run(&store, &["add-root", "1"]).unwrap();
    run(&store, &["add-child", "2", "1"]).unwrap();

    let error = run(&store, &["delete", "1"]).unwrap_err();

    assert_eq!(error.exit_code(), exitcode::CANTCREAT);
    run(&store, &["delete-subtree", "1"]).unwrap();
    run(&store, &["forest"]).unwrap();
}

#[test]
fn given_unreachable_store_when_running_then_unavailable_exit_code() {
    let temp = TempDir::new().unwrap();
    let store = format!("file:{}", temp.path().join("missing").join("forest.toml").display());

    let error = run(&store, &["forest"]).unwrap_err();

    assert_eq!(error.exit_code(), exitcode::UNAVAILABLE);
}

#[test]
fn given_no_subcommand_when_running_then_usage_error() {
    let cli = Cli::try_parse_from(["lineage"]).unwrap();

    let error = execute_command(&cli).unwrap_err();

    assert_eq!(error.exit_code(), exitcode::USAGE);
}
