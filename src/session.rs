use crate::auth::Capability;
use crate::errors::{SessionError, StoreError};
use crate::models::{
    entry_fields, parse_date, DateEntry, EntryChange, FieldValue, JournalDocument, JournalSummary,
    LineId, LineSummary, SaveOutcome, VersionToken,
};
use crate::resolver::resolve_conflict;
use crate::store::{RemoteStore, Snapshot};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use tracing::{info, warn};

struct OpenJournal {
    capability: Capability,
    document: JournalDocument,
    token: Option<VersionToken>,
    hidden: bool,
}

impl OpenJournal {
    fn adopt(&mut self, snapshot: Snapshot) {
        self.document = snapshot.document;
        self.token = snapshot.token;
        self.hidden = snapshot.hidden;
    }
}

pub struct JournalSession {
    store: RemoteStore,
    open: Option<OpenJournal>,
}

impl JournalSession {
    pub fn new(store: RemoteStore) -> Self {
        Self { store, open: None }
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub async fn open(&mut self, capability: Capability) -> Result<&JournalDocument, SessionError> {
        if !capability.can_read() {
            return Err(SessionError::Forbidden);
        }
        self.store.test_connection().await?;
        let snapshot = self.store.load().await?;
        info!(
            dates = snapshot.document.date_count(),
            writable = capability.can_write(),
            hidden = snapshot.hidden,
            "journal opened"
        );

        let journal = self.open.insert(OpenJournal {
            capability,
            document: snapshot.document,
            token: snapshot.token,
            hidden: snapshot.hidden,
        });
        Ok(&journal.document)
    }

    pub async fn close(&mut self) {
        if self.open.take().is_some() {
            info!("journal closed");
        }
        self.store.invalidate_cache().await;
    }

    pub fn document(&self) -> Result<&JournalDocument, SessionError> {
        self.journal().map(|journal| &journal.document)
    }

    pub fn token(&self) -> Option<&str> {
        self.open.as_ref().and_then(|journal| journal.token.as_deref())
    }

    pub fn entry(&self, line: LineId, date: &str) -> Result<Option<&DateEntry>, SessionError> {
        parse_date(date)?;
        Ok(self.journal()?.document.entry(line, date))
    }

    /// Blank inputs clear their field. Every value is validated before the
    /// document is touched, so one bad field rejects the whole save.
    pub async fn save_entry(
        &mut self,
        line: LineId,
        date: &str,
        inputs: &BTreeMap<String, String>,
    ) -> Result<SaveOutcome, SessionError> {
        parse_date(date)?;
        let journal = self.open.as_mut().ok_or(SessionError::NotOpen)?;
        if !journal.capability.can_write() {
            return Err(SessionError::Forbidden);
        }

        let mut updates = Vec::with_capacity(inputs.len());
        for (field, raw) in inputs {
            let raw = raw.trim();
            let value = if raw.is_empty() {
                None
            } else {
                Some(FieldValue::normalize(field, raw)?)
            };
            updates.push((field, value));
        }

        // A guest view is empty only because the read was refused; edits must
        // start from the real remote contents.
        if journal.hidden {
            let snapshot = self.store.load_fresh().await?;
            if snapshot.hidden {
                return Err(StoreError::CredentialRequired.into());
            }
            info!(dates = snapshot.document.date_count(), "guest view replaced by remote journal");
            journal.adopt(snapshot);
        }

        let mut entry = journal.document.entry(line, date).cloned().unwrap_or_default();
        for (field, value) in updates {
            match value {
                Some(value) => {
                    entry.insert(field.clone(), value);
                }
                None => {
                    entry.remove(field);
                }
            }
        }
        let change = if journal.document.put_entry(line, date, entry) {
            EntryChange::Saved
        } else {
            EntryChange::Deleted
        };

        // Without a token no file was seen, so the write may only create one.
        let resolved_conflict = match self
            .store
            .write_once(&journal.document, journal.token.as_deref())
            .await
        {
            Ok(token) => {
                journal.token = Some(token);
                false
            }
            Err(err) if err.is_conflict() => {
                warn!(%line, date, "save rejected by a newer remote version, merging");
                let resolution = resolve_conflict(&self.store, &journal.document).await?;
                journal.document = resolution.document;
                journal.token = Some(resolution.token);
                true
            }
            Err(err) => return Err(err.into()),
        };

        info!(%line, date, ?change, resolved_conflict, "entry stored");
        Ok(SaveOutcome {
            line,
            date: date.to_string(),
            change,
            fields: entry_fields(journal.document.entry(line, date)),
            resolved_conflict,
        })
    }

    pub async fn sync(&mut self) -> Result<&JournalDocument, SessionError> {
        let journal = self.open.as_mut().ok_or(SessionError::NotOpen)?;
        let snapshot = self.store.load_fresh().await?;
        journal.adopt(snapshot);
        Ok(&journal.document)
    }

    pub fn marked_dates(&self, line: LineId, month: &str) -> Result<Vec<String>, SessionError> {
        let first = NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
            .map_err(|_| SessionError::InvalidMonth(month.to_string()))?;
        let document = self.document()?;

        Ok(document
            .dates_with_signal(line)
            .filter(|date| {
                parse_date(date)
                    .map(|day| day.year() == first.year() && day.month() == first.month())
                    .unwrap_or(false)
            })
            .map(str::to_string)
            .collect())
    }

    pub fn summary(&self) -> Result<JournalSummary, SessionError> {
        let document = self.document()?;
        Ok(JournalSummary {
            lines: LineId::ALL
                .iter()
                .map(|line| LineSummary {
                    line: *line,
                    dates: document.line(*line).len(),
                })
                .collect(),
        })
    }

    pub async fn set_credential(&self, token: &str) -> Result<(), SessionError> {
        self.store.set_credential(token).await?;
        Ok(())
    }

    pub async fn has_credential(&self) -> bool {
        self.store.has_credential().await
    }

    fn journal(&self) -> Result<&OpenJournal, SessionError> {
        self.open.as_ref().ok_or(SessionError::NotOpen)
    }
}
