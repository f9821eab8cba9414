//! Read-before-write reconciliation protocol
//!
//! Converges one provider's live record to one desired record:
//!
//! 1. **Read** the live record (skipped for write-only providers)
//! 2. **Compare** content, TTL and proxy flag
//! 3. **Write** only on divergence or when the record does not exist
//! 4. **Report** the outcome for this (provider, record) pair
//!
//! The protocol is identical for every backend; providers only supply the
//! transport for the read and write steps. Errors are returned to the
//! caller and never retried here.

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::traits::{DnsProvider, DnsRecord, UpdateResult};

/// Reconcile one desired record against one provider
pub async fn reconcile(provider: &dyn DnsProvider, record: &DnsRecord) -> Result<UpdateResult> {
    let name = provider.provider_name();

    if !provider.supports_record_type(record.record_type) {
        return Err(Error::unsupported_record_type(name, record.record_type));
    }

    if provider.write_only() {
        provider.write_record(record, None).await?;
        info!(
            "[{}] Pushed {} {} -> {} (TTL: {})",
            name, record.record_type, record.name, record.content, record.ttl
        );
        return Ok(UpdateResult::Pushed);
    }

    let outcome = match provider.fetch_record(record).await? {
        Some(live) if live.matches(record) => {
            debug!(
                "[{}] Already up-to-date: {} {} -> {}",
                name, record.record_type, record.name, record.content
            );
            UpdateResult::Unchanged
        }
        Some(live) => {
            provider.write_record(record, Some(&live)).await?;
            info!(
                "[{}] Updated {} {} -> {} (was: {}, TTL: {}, proxied: {})",
                name,
                record.record_type,
                record.name,
                record.content,
                live.content,
                record.ttl,
                record.proxied
            );
            UpdateResult::Updated {
                previous: live.content,
            }
        }
        None => {
            provider.write_record(record, None).await?;
            info!(
                "[{}] Created {} {} -> {} (TTL: {}, proxied: {})",
                name, record.record_type, record.name, record.content, record.ttl, record.proxied
            );
            UpdateResult::Created
        }
    };

    Ok(outcome)
}
