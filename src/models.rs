use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};

pub type VersionToken = String;

pub type DateEntry = BTreeMap<String, FieldValue>;

pub type LineEntries = BTreeMap<String, DateEntry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineId {
    Line1,
    Line2,
    Line3,
}

impl LineId {
    pub const ALL: [LineId; 3] = [LineId::Line1, LineId::Line2, LineId::Line3];

    pub fn as_str(self) -> &'static str {
        match self {
            LineId::Line1 => "line1",
            LineId::Line2 => "line2",
            LineId::Line3 => "line3",
        }
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LineId {
    type Err = UnknownLine;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "line1" => Ok(LineId::Line1),
            "line2" => Ok(LineId::Line2),
            "line3" => Ok(LineId::Line3),
            other => Err(UnknownLine(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown line '{0}', expected line1, line2 or line3")]
pub struct UnknownLine(pub String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field '{field}': '{value}' does not match the 00.0 format")]
pub struct InvalidFieldValue {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a YYYY-MM-DD date")]
pub struct InvalidDate(pub String);

// Values read back from the remote file are kept verbatim, so a value
// somebody else wrote in a different shape still round-trips untouched.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldValue(String);

impl FieldValue {
    pub fn normalize(field: &str, input: &str) -> Result<Self, InvalidFieldValue> {
        let invalid = || InvalidFieldValue {
            field: field.to_string(),
            value: input.to_string(),
        };

        let (integer, fraction) = input.split_once('.').ok_or_else(invalid)?;
        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !(1..=2).contains(&integer.len()) || fraction.len() != 1 {
            return Err(invalid());
        }
        if !digits(integer) || !digits(fraction) {
            return Err(invalid());
        }

        Ok(Self(format!("{integer:0>2}.{fraction}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn numeric(&self) -> Option<f64> {
        self.0.trim().parse::<f64>().ok()
    }

    pub fn is_positive(&self) -> bool {
        self.numeric().is_some_and(|value| value > 0.0)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

pub fn has_signal(entry: &DateEntry) -> bool {
    entry.values().any(FieldValue::is_positive)
}

pub fn parse_date(value: &str) -> Result<NaiveDate, InvalidDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| InvalidDate(value.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JournalDocument {
    #[serde(default)]
    pub line1: LineEntries,
    #[serde(default)]
    pub line2: LineEntries,
    #[serde(default)]
    pub line3: LineEntries,
}

impl JournalDocument {
    pub fn line(&self, line: LineId) -> &LineEntries {
        match line {
            LineId::Line1 => &self.line1,
            LineId::Line2 => &self.line2,
            LineId::Line3 => &self.line3,
        }
    }

    pub fn line_mut(&mut self, line: LineId) -> &mut LineEntries {
        match line {
            LineId::Line1 => &mut self.line1,
            LineId::Line2 => &mut self.line2,
            LineId::Line3 => &mut self.line3,
        }
    }

    pub fn entry(&self, line: LineId, date: &str) -> Option<&DateEntry> {
        self.line(line).get(date)
    }

    // Returns false when the entry carried no signal and the date was dropped.
    pub fn put_entry(&mut self, line: LineId, date: &str, entry: DateEntry) -> bool {
        let entries = self.line_mut(line);
        if has_signal(&entry) {
            entries.insert(date.to_string(), entry);
            true
        } else {
            entries.remove(date);
            false
        }
    }

    pub fn dates_with_signal(&self, line: LineId) -> impl Iterator<Item = &str> {
        self.line(line)
            .iter()
            .filter(|(_, entry)| has_signal(entry))
            .map(|(date, _)| date.as_str())
    }

    pub fn date_count(&self) -> usize {
        LineId::ALL.iter().map(|line| self.line(*line).len()).sum()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CredentialRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct EntryQuery {
    pub line: String,
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveEntryRequest {
    pub line: String,
    pub date: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub line: String,
    pub month: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EntryResponse {
    pub line: LineId,
    pub date: String,
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryChange {
    Saved,
    Deleted,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub line: LineId,
    pub date: String,
    pub change: EntryChange,
    pub fields: BTreeMap<String, String>,
    pub resolved_conflict: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LineSummary {
    pub line: LineId,
    pub dates: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JournalSummary {
    pub lines: Vec<LineSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CalendarResponse {
    pub line: LineId,
    pub month: String,
    pub dates: Vec<String>,
}

pub fn entry_fields(entry: Option<&DateEntry>) -> BTreeMap<String, String> {
    entry
        .map(|entry| {
            entry
                .iter()
                .map(|(field, value)| (field.clone(), value.as_str().to_string()))
                .collect()
        })
        .unwrap_or_default()
}
