use std::collections::HashSet;

use rusqlite::Connection;
use tracing::{info, warn};

use crate::catalog_store::{self, StoreError};
use crate::discovery::Enumeration;
use crate::model::{ApplicationRecord, RawApplicationDescriptor};

/// Catalogs smaller than this are never protected by the collapse check.
const TRUST_CHECK_MIN_RECORDS: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trust {
    /// Full replace: absent ids are deleted.
    Authoritative,
    /// Upsert only: nothing is deleted.
    MergeOnly,
    /// Leave the catalog untouched.
    Reject,
}

/// Decides how far an enumeration may be trusted against a catalog of `stored_count` records.
pub fn assess(enumeration: &Enumeration, stored_count: usize, min_trusted_ratio: f64) -> Trust {
    let found = enumeration.apps.len();
    if found == 0 {
        return Trust::Reject;
    }
    if !enumeration.complete {
        return Trust::MergeOnly;
    }
    if stored_count >= TRUST_CHECK_MIN_RECORDS
        && (found as f64) < (stored_count as f64) * min_trusted_ratio
    {
        warn!(
            found,
            stored_count, min_trusted_ratio, "enumeration collapsed against stored catalog, merging only"
        );
        return Trust::MergeOnly;
    }
    Trust::Authoritative
}

/// Full-replace reconciliation in one transaction: refresh or insert every discovered
/// id, then delete every stored id that was not discovered.
pub fn reconcile(
    db: &Connection,
    fresh: &[RawApplicationDescriptor],
) -> Result<ReconcileReport, StoreError> {
    apply(db, fresh, true)
}

/// Same upsert as [`reconcile`] without the deletion pass.
pub fn merge(
    db: &Connection,
    fresh: &[RawApplicationDescriptor],
) -> Result<ReconcileReport, StoreError> {
    apply(db, fresh, false)
}

fn apply(
    db: &Connection,
    fresh: &[RawApplicationDescriptor],
    delete_absent: bool,
) -> Result<ReconcileReport, StoreError> {
    let mut keep = HashSet::with_capacity(fresh.len());
    let records: Vec<ApplicationRecord> = fresh
        .iter()
        .filter(|descriptor| keep.insert(descriptor.id.clone()))
        .map(ApplicationRecord::from_descriptor)
        .collect();

    let tx = db.unchecked_transaction()?;
    let inserted = catalog_store::write_identity(&tx, &records)?;
    let removed = if delete_absent {
        catalog_store::remove_absent(&tx, &keep)?
    } else {
        0
    };
    tx.commit()?;

    let report = ReconcileReport {
        inserted,
        updated: records.len() - inserted,
        removed,
    };
    info!(
        inserted = report.inserted,
        updated = report.updated,
        removed = report.removed,
        full = delete_absent,
        "catalog reconciled"
    );
    Ok(report)
}
