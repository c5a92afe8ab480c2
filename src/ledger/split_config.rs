use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::LedgerError;
use crate::models::{Recipient, RecipientUpdate};

pub const FULL_SPLIT_PERCENTAGE: u32 = 100;

/// Ordered recipients with percentage shares. Insertion order is payout order.
///
/// Every mutation bumps `revision`. The first allocation made at a revision
/// freezes it into a [`ConfigSnapshot`] that allocations reference forever.
#[derive(Debug, Clone, Default)]
pub struct SplitConfiguration {
    recipients: Vec<Recipient>,
    revision: u64,
    snapshots: Vec<ConfigSnapshot>,
}

/// Immutable copy of the recipients at one revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub id: Uuid,
    pub revision: u64,
    pub recipients: Vec<Recipient>,
    pub frozen_at: DateTime<Utc>,
}

/// Read model of the live configuration for the split editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitSummary {
    pub recipients: Vec<Recipient>,
    pub total_percentage: u32,
    pub is_valid: bool,
    pub revision: u64,
}

impl ConfigSnapshot {
    pub fn total_percentage(&self) -> u32 {
        self.recipients.iter().map(|r| r.percentage).sum()
    }

    pub fn is_valid(&self) -> bool {
        !self.recipients.is_empty() && self.total_percentage() == FULL_SPLIT_PERCENTAGE
    }
}

impl SplitConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn summary(&self) -> SplitSummary {
        SplitSummary {
            recipients: self.recipients.clone(),
            total_percentage: self.total_percentage(),
            is_valid: self.is_valid(),
            revision: self.revision,
        }
    }

    pub fn recipient(&self, id: Uuid) -> Option<&Recipient> {
        self.recipients.iter().find(|r| r.id == id)
    }

    /// Append a recipient. Returns the new total percentage.
    pub fn add_recipient(
        &mut self,
        name: &str,
        percentage: u32,
        address: &str,
    ) -> Result<u32, LedgerError> {
        let name = validate_text("name", name)?;
        let address = validate_text("address", address)?;
        validate_percentage(percentage)?;

        let recipient = Recipient {
            id: Uuid::new_v4(),
            name,
            percentage,
            address,
        };
        tracing::info!(
            target: "audit",
            recipient_id = %recipient.id,
            name = %recipient.name,
            percentage = recipient.percentage,
            address = %recipient.address,
            "Split recipient added"
        );
        self.recipients.push(recipient);
        self.revision += 1;

        Ok(self.total_percentage())
    }

    /// Update the given fields in place. Id and position never change.
    pub fn update_recipient(
        &mut self,
        id: Uuid,
        update: RecipientUpdate,
    ) -> Result<&Recipient, LedgerError> {
        let index = self
            .recipients
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| LedgerError::not_found("recipient", id))?;

        // Validate everything before touching the record
        let name = update.name.as_deref().map(|n| validate_text("name", n)).transpose()?;
        let address = update
            .address
            .as_deref()
            .map(|a| validate_text("address", a))
            .transpose()?;
        if let Some(p) = update.percentage {
            validate_percentage(p)?;
        }

        let recipient = &mut self.recipients[index];
        if let Some(name) = name {
            recipient.name = name;
        }
        if let Some(address) = address {
            recipient.address = address;
        }
        if let Some(p) = update.percentage {
            recipient.percentage = p;
        }
        self.revision += 1;

        tracing::info!(
            target: "audit",
            recipient_id = %id,
            name = %recipient.name,
            percentage = recipient.percentage,
            address = %recipient.address,
            "Split recipient updated"
        );

        Ok(&self.recipients[index])
    }

    pub fn remove_recipient(&mut self, id: Uuid) -> Result<Recipient, LedgerError> {
        let index = self
            .recipients
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| LedgerError::not_found("recipient", id))?;

        let removed = self.recipients.remove(index);
        self.revision += 1;

        tracing::info!(
            target: "audit",
            recipient_id = %id,
            name = %removed.name,
            remaining = self.recipients.len(),
            "Split recipient removed"
        );

        Ok(removed)
    }

    pub fn total_percentage(&self) -> u32 {
        self.recipients.iter().map(|r| r.percentage).sum()
    }

    pub fn is_valid(&self) -> bool {
        !self.recipients.is_empty() && self.total_percentage() == FULL_SPLIT_PERCENTAGE
    }

    /// Freeze the current revision, reusing the snapshot if one exists.
    pub fn freeze(&mut self, now: DateTime<Utc>) -> &ConfigSnapshot {
        let current = self
            .snapshots
            .iter()
            .position(|s| s.revision == self.revision);

        let index = match current {
            Some(index) => index,
            None => {
                let snapshot = ConfigSnapshot {
                    id: Uuid::new_v4(),
                    revision: self.revision,
                    recipients: self.recipients.clone(),
                    frozen_at: now,
                };
                tracing::info!(
                    target: "audit",
                    snapshot_id = %snapshot.id,
                    revision = snapshot.revision,
                    recipients = snapshot.recipients.len(),
                    "Split configuration frozen"
                );
                self.snapshots.push(snapshot);
                self.snapshots.len() - 1
            }
        };

        &self.snapshots[index]
    }

    pub fn snapshot(&self, id: Uuid) -> Option<&ConfigSnapshot> {
        self.snapshots.iter().find(|s| s.id == id)
    }
}

fn validate_text(field: &str, value: &str) -> Result<String, LedgerError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidRecipient(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn validate_percentage(percentage: u32) -> Result<(), LedgerError> {
    if !(1..=FULL_SPLIT_PERCENTAGE).contains(&percentage) {
        return Err(LedgerError::InvalidRecipient(format!(
            "percentage {percentage} outside 1..=100"
        )));
    }
    Ok(())
}
