//! Command scripts run from files

use hashchain_ledger::command::ScriptSummary;
use hashchain_ledger::CommandProcessor;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

fn run_file(path: impl AsRef<Path>) -> (ScriptSummary, String) {
    let mut processor = CommandProcessor::new(Vec::new());
    let summary = processor.process_file(path).unwrap();
    let out = String::from_utf8(processor.into_inner()).unwrap();
    (summary, out)
}

fn demo_script() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../demos/ledger.script")
}

#[test]
fn demo_script_seals_and_validates() {
    let (summary, out) = run_file(demo_script());

    assert_eq!(summary.command_errors, 0);
    // The low-fee transaction is the only ledger failure
    assert_eq!(summary.ledger_failures, 1);

    assert!(out.contains("Creating Ledger: test test ledger 2023 chapman"));
    assert!(out.contains("No Account Has Been Committed"));
    assert!(out.contains("Account Balance for: mary is 910"));
    assert!(out.contains("Account Balance for: sergey is 1040"));
    assert!(out.contains("Account Balance for: bob is 980"));
    assert!(out.contains("Failed due to: Transaction Fee Must Be Greater Than 10"));
    assert!(out.contains("Block Number: 1 Hash: "));
    assert!(out.contains(
        "Transaction ID: 11 Amount: 60 Fee: 10 Note: next block Payer: mary Receiver: sergey"
    ));
    assert!(out.contains("Validate: Valid"));
}

#[test]
fn script_file_with_errors_keeps_going() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "create-account early").unwrap();
    writeln!(file, r#"create-ledger t description "d d" seed s"#).unwrap();
    writeln!(file, "create-account mary").unwrap();
    writeln!(file, "get-block x").unwrap();
    writeln!(file, "get-block 5").unwrap();
    writeln!(file, "get-transaction 99").unwrap();
    writeln!(file, "validate").unwrap();
    file.flush().unwrap();

    let mut processor = CommandProcessor::new(Vec::new());
    let summary = processor.process_file(file.path()).unwrap();
    assert_eq!(summary.commands, 7);
    assert_eq!(summary.command_errors, 2);
    assert_eq!(summary.ledger_failures, 2);

    let ledger = processor.ledger().cloned().unwrap();
    assert!(ledger.open_block().account("mary").is_some());

    let out = String::from_utf8(processor.into_inner()).unwrap();
    assert!(out.contains(
        "Failed due to: Ledger Not Created for Command: create-account On Line Number: 1"
    ));
    assert!(out.contains("Failed due to: Invalid Number for Command: get-block On Line Number: 4"));
    assert!(out.contains("Failed due to: Block Does Not Exist"));
    assert!(out.contains("Failed due to: Transaction Does Not Exist"));
    assert!(out.contains("Validate: Valid"));
}

#[test]
fn missing_script_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut processor = CommandProcessor::new(Vec::new());
    assert!(processor.process_file(dir.path().join("absent.script")).is_err());
}
