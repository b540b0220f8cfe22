//! Line-oriented command interpreter
//!
//! Parses textual commands, calls into the ledger, and writes a readable
//! report for each one. Ledger failures are reported and processing goes on;
//! malformed commands surface as [`CommandError`].
//!
//! ```text
//! create-ledger <name> description <description> seed <seed>
//! create-account <address>
//! get-account-balance <address>
//! get-account-balances
//! process-transaction <id> amount <n> fee <n> note <note> payer <addr> receiver <addr>
//! get-block <number>
//! get-transaction <id>
//! validate
//! ```
//!
//! Tokens are separated by whitespace; a double-quoted token may contain
//! spaces or be empty (`""`) and has its quotes stripped.

use crate::registry::{LedgerRegistry, Opened};
use crate::types::Transaction;
use crate::{Config, Error, Ledger};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error as ThisError;

/// Bare word, or a double-quoted run that may contain spaces or be empty
static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^"]\S*|".*?")\s*"#).expect("token pattern is a valid regex")
});

/// Malformed or unusable command
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
#[error("{reason} for Command: {command}")]
pub struct CommandError {
    /// Command verb
    pub command: String,
    /// Why it was rejected
    pub reason: String,
    /// 1-based script line, when run from a script
    pub line_number: Option<usize>,
}

impl CommandError {
    fn new(command: &str, reason: impl Into<String>) -> Self {
        Self {
            command: command.to_string(),
            reason: reason.into(),
            line_number: None,
        }
    }
}

impl From<io::Error> for CommandError {
    fn from(err: io::Error) -> Self {
        Self::new("output", format!("Output Error: {}", err))
    }
}

/// Counters for a processed script
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptSummary {
    /// Commands executed (comments and blank lines excluded)
    pub commands: usize,
    /// Commands rejected as malformed
    pub command_errors: usize,
    /// Ledger operations that reported a failure
    pub ledger_failures: usize,
}

/// Command interpreter bound to an output sink
#[derive(Debug)]
pub struct CommandProcessor<W: Write> {
    registry: LedgerRegistry,
    base: Config,
    ledger: Option<Arc<Ledger>>,
    out: W,
    ledger_failures: usize,
}

impl<W: Write> CommandProcessor<W> {
    /// Create a processor writing its report to `out`
    pub fn new(out: W) -> Self {
        Self::with_config(out, Config::default())
    }

    /// Create a processor whose ledgers start from `base`
    ///
    /// `create-ledger` supplies the name, description and seed; every other
    /// setting comes from `base`.
    pub fn with_config(out: W, base: Config) -> Self {
        Self {
            registry: LedgerRegistry::new(),
            base,
            ledger: None,
            out,
            ledger_failures: 0,
        }
    }

    /// Ledger created by `create-ledger`, if any
    pub fn ledger(&self) -> Option<&Arc<Ledger>> {
        self.ledger.as_ref()
    }

    /// Consume the processor and return the output sink
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Split a command line into tokens
    pub fn tokenize(&self, line: &str) -> Vec<String> {
        TOKEN_PATTERN
            .captures_iter(line.trim())
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().replace('"', ""))
            .collect()
    }

    /// Execute a single command line
    pub fn process_command(&mut self, line: &str) -> Result<(), CommandError> {
        let tokens = self.tokenize(line);
        let Some(verb) = tokens.first().map(String::as_str) else {
            return Err(CommandError::new("", "Invalid Command"));
        };

        match verb {
            "create-ledger" => self.create_ledger(&tokens),
            "create-account" => self.create_account(&tokens),
            "get-account-balance" => self.get_account_balance(&tokens),
            "get-account-balances" => self.get_account_balances(),
            "process-transaction" => self.process_transaction(&tokens),
            "get-block" => self.get_block(&tokens),
            "get-transaction" => self.get_transaction(&tokens),
            "validate" => self.validate(),
            other => Err(CommandError::new(other, "Invalid Command")),
        }
    }

    /// Execute every command read from `reader`
    ///
    /// Blank lines and lines starting with `#` are skipped. Command errors
    /// are reported with their line number and do not stop the script.
    pub fn process_script<R: BufRead>(&mut self, reader: R) -> crate::Result<ScriptSummary> {
        let mut summary = ScriptSummary::default();
        let failures_before = self.ledger_failures;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            summary.commands += 1;
            if let Err(mut e) = self.process_command(trimmed) {
                e.line_number = Some(index + 1);
                summary.command_errors += 1;
                tracing::warn!(line = index + 1, command = %e.command, "Command rejected: {}", e.reason);
                writeln!(
                    self.out,
                    "Failed due to: {} for Command: {} On Line Number: {}",
                    e.reason,
                    e.command,
                    index + 1
                )?;
            }
        }

        summary.ledger_failures = self.ledger_failures - failures_before;
        Ok(summary)
    }

    /// Execute a script file
    pub fn process_file(&mut self, path: impl AsRef<Path>) -> crate::Result<ScriptSummary> {
        let file = std::fs::File::open(path)?;
        self.process_script(io::BufReader::new(file))
    }

    fn require_ledger(&self, command: &str) -> Result<Arc<Ledger>, CommandError> {
        self.ledger
            .clone()
            .ok_or_else(|| CommandError::new(command, "Ledger Not Created"))
    }

    fn report_failure(&mut self, err: &Error) -> Result<(), CommandError> {
        self.ledger_failures += 1;
        writeln!(self.out, "Failed due to: {}", err.reason())?;
        Ok(())
    }

    fn expect_arity(tokens: &[String], arity: usize) -> Result<(), CommandError> {
        if tokens.len() != arity {
            return Err(CommandError::new(&tokens[0], "Missing Arguments"));
        }
        Ok(())
    }

    fn parse_number(command: &str, token: &str) -> Result<u64, CommandError> {
        token
            .parse()
            .map_err(|_| CommandError::new(command, "Invalid Number"))
    }

    fn create_ledger(&mut self, tokens: &[String]) -> Result<(), CommandError> {
        Self::expect_arity(tokens, 6)?;
        let (name, description, seed) = (&tokens[1], &tokens[3], &tokens[5]);

        writeln!(self.out, "Creating Ledger: {} {} {}", name, description, seed)?;
        let config = Config {
            name: name.clone(),
            description: description.clone(),
            seed: seed.clone(),
            ..self.base.clone()
        };
        match self.registry.open_with(config) {
            Ok((ledger, opened)) => {
                if opened == Opened::Existing {
                    writeln!(self.out, "Using Existing Ledger: {}", ledger.name())?;
                }
                self.ledger = Some(ledger);
                Ok(())
            }
            Err(e) => self.report_failure(&e),
        }
    }

    fn create_account(&mut self, tokens: &[String]) -> Result<(), CommandError> {
        Self::expect_arity(tokens, 2)?;
        let ledger = self.require_ledger(&tokens[0])?;

        writeln!(self.out, "Creating Account: {}", tokens[1])?;
        match ledger.create_account(&tokens[1]) {
            Ok(_) => Ok(()),
            Err(e) => self.report_failure(&e),
        }
    }

    fn get_account_balance(&mut self, tokens: &[String]) -> Result<(), CommandError> {
        Self::expect_arity(tokens, 2)?;
        let ledger = self.require_ledger(&tokens[0])?;

        writeln!(self.out, "Getting Balance for: {}", tokens[1])?;
        match ledger.get_account_balance(&tokens[1]) {
            Ok(balance) => {
                writeln!(self.out, "Account Balance for: {} is {}", tokens[1], balance)?;
                Ok(())
            }
            Err(e) => self.report_failure(&e),
        }
    }

    fn get_account_balances(&mut self) -> Result<(), CommandError> {
        let ledger = self.require_ledger("get-account-balances")?;

        writeln!(self.out, "Getting All Balances")?;
        match ledger.get_account_balances() {
            None => writeln!(self.out, "No Account Has Been Committed")?,
            Some(balances) => {
                for (address, balance) in balances {
                    writeln!(self.out, "Account Balance for: {} is {}", address, balance)?;
                }
            }
        }
        Ok(())
    }

    fn process_transaction(&mut self, tokens: &[String]) -> Result<(), CommandError> {
        Self::expect_arity(tokens, 12)?;
        let command = tokens[0].as_str();
        let ledger = self.require_ledger(command)?;

        writeln!(
            self.out,
            "Processing Transaction: {} {} {} {} {} {}",
            tokens[1], tokens[3], tokens[5], tokens[7], tokens[9], tokens[11]
        )?;

        let amount = Self::parse_number(command, &tokens[3])?;
        let fee = Self::parse_number(command, &tokens[5])?;

        // Accounts are resolved against the open block, as the ledger expects
        let open = ledger.open_block();
        let (Some(payer), Some(receiver)) = (open.account(&tokens[9]), open.account(&tokens[11]))
        else {
            return Err(CommandError::new(command, "Account Does Not Exist"));
        };

        let tx = Transaction::new(tokens[1].as_str(), amount, fee, tokens[7].as_str(), payer, receiver);
        match ledger.admit(tx) {
            Ok(_) => Ok(()),
            Err(e) => self.report_failure(&e),
        }
    }

    fn get_block(&mut self, tokens: &[String]) -> Result<(), CommandError> {
        Self::expect_arity(tokens, 2)?;
        let ledger = self.require_ledger(&tokens[0])?;
        let number = Self::parse_number(&tokens[0], &tokens[1])?;

        writeln!(self.out, "Get Block: {}", number)?;
        let block = match ledger.get_block(number) {
            Ok(block) => block,
            Err(e) => return self.report_failure(&e),
        };

        writeln!(
            self.out,
            "Block Number: {} Hash: {} Previous Hash: {}",
            block.number,
            block.hash.as_deref().unwrap_or(""),
            block.previous_hash
        )?;
        for tx in &block.transactions {
            writeln!(self.out, "{}", tx)?;
        }
        Ok(())
    }

    fn get_transaction(&mut self, tokens: &[String]) -> Result<(), CommandError> {
        Self::expect_arity(tokens, 2)?;
        let ledger = self.require_ledger(&tokens[0])?;

        writeln!(self.out, "Get Transaction: {}", tokens[1])?;
        match ledger.get_transaction(&tokens[1]) {
            Some(tx) => {
                writeln!(
                    self.out,
                    "Transaction ID: {} Amount: {} Fee: {} Note: {} Payer: {} Receiver: {}",
                    tx.id, tx.amount, tx.fee, tx.note, tx.payer, tx.receiver
                )?;
                Ok(())
            }
            None => self.report_failure(&Error::TransactionNotFound(tokens[1].clone())),
        }
    }

    fn validate(&mut self) -> Result<(), CommandError> {
        let ledger = self.require_ledger("validate")?;

        write!(self.out, "Validate: ")?;
        match ledger.validate() {
            Ok(()) => {
                writeln!(self.out, "Valid")?;
                Ok(())
            }
            Err(e) => self.report_failure(&e),
        }
    }
}
