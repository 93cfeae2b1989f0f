use crate::errors::StoreError;
use crate::models::JournalDocument;
use base64::{engine::general_purpose::STANDARD, Engine as _};

pub fn encode_document(doc: &JournalDocument) -> Result<String, StoreError> {
    let json = serde_json::to_string_pretty(doc).map_err(|err| StoreError::Encoding(err.to_string()))?;
    Ok(STANDARD.encode(json.as_bytes()))
}

pub fn decode_document(payload: &str) -> Result<JournalDocument, StoreError> {
    // GitHub wraps the base64 body every 60 characters.
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|err| StoreError::Encoding(format!("base64: {err}")))?;
    let text = String::from_utf8(bytes).map_err(|err| StoreError::Encoding(format!("utf-8: {err}")))?;
    serde_json::from_str(&text).map_err(|err| StoreError::Encoding(format!("json: {err}")))
}
