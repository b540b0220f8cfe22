//! Actor-based front end for the ledger
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One task applies every request, in mailbox order
//! - Async message passing with backpressure (bounded mailbox)
//! - Replies travel back on per-request oneshot channels
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │         Callers (CLI, tasks, tests)                   │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │         Sends messages to actor mailbox              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │        Ledger::admit / create_account / ...           │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! Every ledger operation is bounded and in-memory, so the actor calls the
//! engine directly from its task without blocking the runtime for long.

use crate::config::ActorConfig;
use crate::types::{Account, Block, Transaction, TransactionId};
use crate::{Error, Ledger, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Create an account
    CreateAccount {
        /// Address to create
        address: String,
        /// Reply channel
        response: oneshot::Sender<Result<Account>>,
    },

    /// Admit a transaction
    Admit {
        /// Transaction to admit
        transaction: Transaction,
        /// Reply channel
        response: oneshot::Sender<Result<TransactionId>>,
    },

    /// Get a balance from the latest sealed block
    GetAccountBalance {
        /// Account address
        address: String,
        /// Reply channel
        response: oneshot::Sender<Result<u64>>,
    },

    /// Get all balances from the latest sealed block
    GetAccountBalances {
        /// Reply channel
        response: oneshot::Sender<Option<BTreeMap<String, u64>>>,
    },

    /// Get block by number
    GetBlock {
        /// Block number
        number: u64,
        /// Reply channel
        response: oneshot::Sender<Result<Block>>,
    },

    /// Get transaction by ID
    GetTransaction {
        /// Transaction ID
        id: String,
        /// Reply channel
        response: oneshot::Sender<Option<Transaction>>,
    },

    /// Get the open block
    GetOpenBlock {
        /// Reply channel
        response: oneshot::Sender<Block>,
    },

    /// Validate the sealed chain
    Validate {
        /// Reply channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes ledger messages
#[derive(Debug)]
pub struct LedgerActor {
    /// Ledger engine
    ledger: Arc<Ledger>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(ledger: Arc<Ledger>, mailbox: mpsc::Receiver<LedgerMessage>) -> Self {
        Self { ledger, mailbox }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            if let LedgerMessage::Shutdown = msg {
                tracing::debug!("Ledger actor shutting down");
                break;
            }
            self.handle_message(msg);
        }
    }

    /// Handle a single message
    fn handle_message(&self, msg: LedgerMessage) {
        // A dropped reply receiver only means the caller went away
        match msg {
            LedgerMessage::CreateAccount { address, response } => {
                let _ = response.send(self.ledger.create_account(&address));
            }

            LedgerMessage::Admit {
                transaction,
                response,
            } => {
                let _ = response.send(self.ledger.admit(transaction));
            }

            LedgerMessage::GetAccountBalance { address, response } => {
                let _ = response.send(self.ledger.get_account_balance(&address));
            }

            LedgerMessage::GetAccountBalances { response } => {
                let _ = response.send(self.ledger.get_account_balances());
            }

            LedgerMessage::GetBlock { number, response } => {
                let _ = response.send(self.ledger.get_block(number));
            }

            LedgerMessage::GetTransaction { id, response } => {
                let _ = response.send(self.ledger.get_transaction(&id));
            }

            LedgerMessage::GetOpenBlock { response } => {
                let _ = response.send(self.ledger.open_block());
            }

            LedgerMessage::Validate { response } => {
                let _ = response.send(self.ledger.validate());
            }

            LedgerMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Clone, Debug)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> LedgerMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Create an account
    pub async fn create_account(&self, address: impl Into<String>) -> Result<Account> {
        let address = address.into();
        self.request(|response| LedgerMessage::CreateAccount { address, response })
            .await?
    }

    /// Admit a transaction
    pub async fn admit(&self, transaction: Transaction) -> Result<TransactionId> {
        self.request(|response| LedgerMessage::Admit {
            transaction,
            response,
        })
        .await?
    }

    /// Balance in the latest sealed block
    pub async fn get_account_balance(&self, address: impl Into<String>) -> Result<u64> {
        let address = address.into();
        self.request(|response| LedgerMessage::GetAccountBalance { address, response })
            .await?
    }

    /// All balances in the latest sealed block
    pub async fn get_account_balances(&self) -> Result<Option<BTreeMap<String, u64>>> {
        self.request(|response| LedgerMessage::GetAccountBalances { response })
            .await
    }

    /// Block by number
    pub async fn get_block(&self, number: u64) -> Result<Block> {
        self.request(|response| LedgerMessage::GetBlock { number, response })
            .await?
    }

    /// Transaction by ID
    pub async fn get_transaction(&self, id: impl Into<String>) -> Result<Option<Transaction>> {
        let id = id.into();
        self.request(|response| LedgerMessage::GetTransaction { id, response })
            .await
    }

    /// Copy of the open block
    pub async fn open_block(&self) -> Result<Block> {
        self.request(|response| LedgerMessage::GetOpenBlock { response })
            .await
    }

    /// Validate the sealed chain
    pub async fn validate(&self) -> Result<()> {
        self.request(|response| LedgerMessage::Validate { response })
            .await?
    }

    /// Mailbox size the actor was spawned with
    pub fn mailbox_capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor with a mailbox sized by `config`
pub fn spawn_ledger_actor(ledger: Arc<Ledger>, config: &ActorConfig) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(config.mailbox_capacity); // Bounded channel for backpressure
    let actor = LedgerActor::new(ledger, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    fn spawn_test_actor() -> (Arc<Ledger>, LedgerHandle) {
        let ledger = Arc::new(Ledger::new(Config::new("test", "actor", "chapman")).unwrap());
        let handle = spawn_ledger_actor(ledger.clone(), &ActorConfig { mailbox_capacity: 16 });
        (ledger, handle)
    }

    #[tokio::test]
    async fn test_actor_spawn_and_shutdown() {
        let (_, handle) = spawn_test_actor();
        assert_eq!(handle.mailbox_capacity(), 16);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_mailbox_sized_from_config() {
        let mut config = Config::new("test", "actor", "chapman");
        config.actor.mailbox_capacity = 3;
        let ledger = Arc::new(Ledger::new(config.clone()).unwrap());

        let handle = spawn_ledger_actor(ledger, &config.actor);
        assert_eq!(handle.mailbox_capacity(), 3);
        handle.shutdown().await.unwrap();

        let handle = spawn_ledger_actor(
            Arc::new(Ledger::new(Config::default()).unwrap()),
            &Config::default().actor,
        );
        assert_eq!(handle.mailbox_capacity(), 1000);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_admit() {
        let (ledger, handle) = spawn_test_actor();
        handle.create_account("mary").await.unwrap();

        let open = handle.open_block().await.unwrap();
        let tx = Transaction::new(
            "1",
            100,
            10,
            "funding",
            open.account("master").unwrap(),
            open.account("mary").unwrap(),
        );
        let id = handle.admit(tx).await.unwrap();
        assert_eq!(id.as_str(), "1");

        let found = handle.get_transaction("1").await.unwrap().unwrap();
        assert_eq!(found.amount, 100);
        assert_eq!(ledger.open_block().account("mary").unwrap().balance, 100);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_propagates_ledger_errors() {
        let (_, handle) = spawn_test_actor();
        handle.create_account("mary").await.unwrap();

        let err = handle.create_account("mary").await.unwrap_err();
        assert!(matches!(err, Error::AccountAlreadyExists(_)));

        let err = handle.get_account_balance("mary").await.unwrap_err();
        assert!(matches!(err, Error::NoCommittedBlock));
        assert!(handle.get_account_balances().await.unwrap().is_none());
        assert!(matches!(
            handle.get_block(7).await,
            Err(Error::BlockNotFound(7))
        ));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_mailbox() {
        let (_, handle) = spawn_test_actor();
        handle.shutdown().await.unwrap();

        // Let the actor observe the shutdown and drop its receiver
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let err = handle.validate().await.unwrap_err();
        assert!(matches!(err, Error::Concurrency(_)));
    }
}
