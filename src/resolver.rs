use crate::errors::StoreError;
use crate::models::{has_signal, JournalDocument, LineId, VersionToken};
use crate::store::RemoteStore;
use std::collections::btree_map::Entry;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub document: JournalDocument,
    pub token: VersionToken,
}

/// Remote entries win unless the remote one is blank and the local one
/// carries signal. When both sides hold non-zero values for the same date
/// the local values are dropped; there is no field-level merge.
pub fn merge_documents(local: &JournalDocument, remote: &JournalDocument) -> JournalDocument {
    let mut merged = JournalDocument::default();

    for line in LineId::ALL {
        let target = merged.line_mut(line);
        *target = remote.line(line).clone();

        for (date, local_entry) in local.line(line) {
            match target.entry(date.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(local_entry.clone());
                }
                Entry::Occupied(mut slot) => {
                    if has_signal(local_entry) && !has_signal(slot.get()) {
                        slot.insert(local_entry.clone());
                    }
                }
            }
        }
    }

    merged
}

pub async fn resolve_conflict(
    store: &RemoteStore,
    local: &JournalDocument,
) -> Result<Resolution, StoreError> {
    let remote = store.load_fresh().await?;
    let document = merge_documents(local, &remote.document);
    let token = store.write_once(&document, remote.token.as_deref()).await?;
    info!(token = %token, "conflict resolved by merge");
    Ok(Resolution { document, token })
}
