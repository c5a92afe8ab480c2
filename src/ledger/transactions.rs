use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::LedgerError;
use crate::models::{NewTransaction, Transaction, TransactionStatus};

/// Append-only log of transactions, indexed by id and by external hash.
#[derive(Debug, Default)]
pub struct TransactionLog {
    entries: Vec<Transaction>,
    by_id: HashMap<Uuid, usize>,
    by_hash: HashMap<String, Uuid>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a new transaction in Pending (default) or Processing status.
    pub fn record(
        &mut self,
        new: NewTransaction,
        now: DateTime<Utc>,
    ) -> Result<&Transaction, LedgerError> {
        let hash = new.hash.trim().to_string();
        if hash.is_empty() {
            return Err(LedgerError::InvalidTransaction("hash must not be empty".into()));
        }
        if self.by_hash.contains_key(&hash) {
            return Err(LedgerError::DuplicateHash(hash));
        }

        let money = new.money.validated()?;
        if money.is_zero() {
            return Err(LedgerError::InvalidAmount("transaction amount must be positive".into()));
        }

        let id = Uuid::new_v4();
        let status = new.status.unwrap_or(TransactionStatus::Pending);
        if status.is_terminal() {
            return Err(LedgerError::InvalidTransition {
                id,
                from: TransactionStatus::Pending,
                to: status,
            });
        }

        let tx = Transaction {
            id,
            direction: new.direction,
            money,
            status,
            hash: hash.clone(),
            created_at: new.created_at.unwrap_or(now),
            updated_at: now,
        };

        self.by_hash.insert(hash, id);
        self.by_id.insert(id, self.entries.len());
        self.entries.push(tx);

        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn mark_processing(
        &mut self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<&Transaction, LedgerError> {
        self.transition(id, TransactionStatus::Processing, now)
    }

    pub fn confirm(&mut self, id: Uuid, now: DateTime<Utc>) -> Result<&Transaction, LedgerError> {
        self.transition(id, TransactionStatus::Confirmed, now)
    }

    pub fn fail(&mut self, id: Uuid, now: DateTime<Utc>) -> Result<&Transaction, LedgerError> {
        self.transition(id, TransactionStatus::Failed, now)
    }

    fn transition(
        &mut self,
        id: Uuid,
        next: TransactionStatus,
        now: DateTime<Utc>,
    ) -> Result<&Transaction, LedgerError> {
        let index = *self
            .by_id
            .get(&id)
            .ok_or_else(|| LedgerError::not_found("transaction", id))?;

        let tx = &mut self.entries[index];
        if !tx.status.can_transition_to(next) {
            return Err(LedgerError::InvalidTransition {
                id,
                from: tx.status,
                to: next,
            });
        }

        tx.status = next;
        tx.updated_at = now;
        Ok(&self.entries[index])
    }

    pub fn get(&self, id: Uuid) -> Option<&Transaction> {
        self.by_id.get(&id).map(|&i| &self.entries[i])
    }

    pub fn find_by_hash(&self, hash: &str) -> Option<&Transaction> {
        self.by_hash.get(hash.trim()).and_then(|id| self.get(*id))
    }

    /// All transactions, newest first.
    pub fn list(&self) -> Vec<Transaction> {
        let mut all: Vec<Transaction> = self.entries.iter().rev().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    /// Newest-first transactions whose hash, currency or network contains `query`.
    pub fn search(&self, query: &str) -> Vec<Transaction> {
        let query = query.trim();
        if query.is_empty() {
            return self.list();
        }
        self.list().into_iter().filter(|tx| tx.matches(query)).collect()
    }
}
