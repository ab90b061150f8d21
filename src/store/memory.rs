//! In-process order store with an optional append-only journal.
//!
//! # Journal format
//! One JSON order per line. An order counts as committed once its
//! terminating newline is durable; an unterminated final line is the tail of
//! an interrupted append and is cut off when the journal is opened.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use async_trait::async_trait;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::{OrderStore, StoreError};
use crate::models::Order;

/// Order store keeping every order in memory.
///
/// When opened with a journal path each persisted order is appended as one
/// JSON line, and the journal is replayed on the next open.
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    orders: HashMap<String, Order>,
    journal: Option<Journal>,
}

impl MemoryOrderStore {
    /// Creates an empty store without a journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `orders`, no journal.
    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let orders = orders
            .into_iter()
            .map(|order| (order.order_uid.clone(), order))
            .collect();
        Self {
            inner: RwLock::new(Inner {
                orders,
                journal: None,
            }),
        }
    }

    /// Opens a journaled store, replaying any orders already in `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let replay = replay_journal(path).await?;
        info!(
            path = %path.display(),
            orders = replay.orders.len(),
            "Order journal replayed"
        );

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        if replay.torn_bytes > 0 {
            warn!(
                path = %path.display(),
                bytes = replay.torn_bytes,
                "Discarding incomplete trailing journal entry"
            );
            file.set_len(replay.committed_len).await?;
        }

        Ok(Self {
            inner: RwLock::new(Inner {
                orders: replay.orders,
                journal: Some(Journal::new(file)),
            }),
        })
    }

    /// Journaled store writing through an already opened file.
    #[cfg(test)]
    fn with_journal_file(file: File) -> Self {
        Self {
            inner: RwLock::new(Inner {
                orders: HashMap::new(),
                journal: Some(Journal::new(file)),
            }),
        }
    }

    /// Number of stored orders.
    pub async fn len(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

// == Journal ==
/// Append handle that never leaves a partial line behind a later append.
#[derive(Debug)]
struct Journal {
    file: File,
    /// Set when a failed append could not be rolled back
    poisoned: bool,
}

impl Journal {
    fn new(file: File) -> Self {
        Self {
            file,
            poisoned: false,
        }
    }

    /// Appends one line durably. On failure the file is cut back to its
    /// previous length; if that fails too, every later append is refused.
    async fn append(&mut self, line: &[u8]) -> Result<(), StoreError> {
        if self.poisoned {
            return Err(StoreError::Backend(
                "order journal refused writes after a failed rollback".to_string(),
            ));
        }

        let committed_len = self.file.metadata().await?.len();
        if let Err(e) = self.write_synced(line).await {
            match self.file.set_len(committed_len).await {
                Ok(()) => warn!(error = %e, "Journal append failed, rolled back"),
                Err(rollback) => {
                    self.poisoned = true;
                    error!(
                        error = %e,
                        rollback_error = %rollback,
                        "Journal append failed and could not be rolled back"
                    );
                }
            }
            return Err(e.into());
        }
        Ok(())
    }

    async fn write_synced(&mut self, line: &[u8]) -> io::Result<()> {
        self.file.write_all(line).await?;
        self.file.flush().await?;
        self.file.sync_data().await
    }
}

struct Replay {
    orders: HashMap<String, Order>,
    committed_len: u64,
    torn_bytes: usize,
}

async fn replay_journal(path: &Path) -> Result<Replay, StoreError> {
    let contents = match fs::read(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Ok(Replay {
                orders: HashMap::new(),
                committed_len: 0,
                torn_bytes: 0,
            })
        }
        Err(e) => return Err(e.into()),
    };

    let committed = contents
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |i| i + 1);

    let mut orders = HashMap::new();
    for (line_no, line) in contents[..committed].split(|b| *b == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let order: Order = serde_json::from_slice(line).map_err(|e| {
            StoreError::Backend(format!(
                "corrupt journal {} at line {}: {}",
                path.display(),
                line_no + 1,
                e
            ))
        })?;
        orders.insert(order.order_uid.clone(), order);
    }

    Ok(Replay {
        orders,
        committed_len: committed as u64,
        torn_bytes: contents.len() - committed,
    })
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn fetch_by_uid(&self, uid: &str) -> Result<Order, StoreError> {
        self.inner
            .read()
            .await
            .orders
            .get(uid)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(uid.to_string()))
    }

    async fn fetch_recent(&self, n: usize) -> Result<Vec<Order>, StoreError> {
        let inner = self.inner.read().await;
        let mut orders: Vec<&Order> = inner.orders.values().collect();
        orders.sort_by(|a, b| b.date_created.cmp(&a.date_created));
        Ok(orders.into_iter().take(n).cloned().collect())
    }

    async fn persist(&self, order: &Order) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.orders.contains_key(&order.order_uid) {
            return Err(StoreError::Conflict(order.order_uid.clone()));
        }

        // Journal first: the in-memory copy is only updated once durable
        if let Some(journal) = inner.journal.as_mut() {
            let mut line = serde_json::to_vec(order)
                .map_err(|e| StoreError::Backend(format!("failed to encode order: {}", e)))?;
            line.push(b'\n');
            journal.append(&line).await?;
        }

        inner.orders.insert(order.order_uid.clone(), order.clone());
        debug!(order_uid = %order.order_uid, "Order persisted");
        Ok(())
    }
}
