use crate::errors::AppError;
use crate::models::{
    entry_fields, CalendarQuery, CalendarResponse, CredentialRequest, EntryQuery, EntryResponse,
    JournalSummary, LineId, LoginRequest, SaveEntryRequest, SaveOutcome,
};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info};

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<JournalSummary>, AppError> {
    let capability = state
        .gate
        .authorize(payload.login.trim(), &payload.password)
        .ok_or_else(|| AppError::unauthorized("invalid login or password"))?;

    let mut session = state.session.lock().await;
    session.open(capability).await.map_err(|err| {
        error!("failed to open journal: {err}");
        AppError::from(err)
    })?;
    Ok(Json(session.summary()?))
}

pub async fn logout(State(state): State<AppState>) -> StatusCode {
    state.session.lock().await.close().await;
    StatusCode::NO_CONTENT
}

pub async fn put_credential(
    State(state): State<AppState>,
    Json(payload): Json<CredentialRequest>,
) -> Result<StatusCode, AppError> {
    if payload.token.trim().is_empty() {
        return Err(AppError::bad_request("token must not be empty"));
    }
    state.session.lock().await.set_credential(&payload.token).await?;
    info!("credential replaced");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_entry(
    State(state): State<AppState>,
    Query(query): Query<EntryQuery>,
) -> Result<Json<EntryResponse>, AppError> {
    let line: LineId = query.line.parse()?;
    let session = state.session.lock().await;
    let fields = entry_fields(session.entry(line, &query.date)?);

    Ok(Json(EntryResponse {
        line,
        date: query.date,
        fields,
    }))
}

pub async fn save_entry(
    State(state): State<AppState>,
    Json(payload): Json<SaveEntryRequest>,
) -> Result<Json<SaveOutcome>, AppError> {
    let line: LineId = payload.line.parse()?;
    let mut session = state.session.lock().await;
    let outcome = session
        .save_entry(line, &payload.date, &payload.fields)
        .await
        .map_err(|err| {
            error!("failed to save {line} {}: {err}", payload.date);
            AppError::from(err)
        })?;
    Ok(Json(outcome))
}

pub async fn sync(State(state): State<AppState>) -> Result<Json<JournalSummary>, AppError> {
    let mut session = state.session.lock().await;
    session.sync().await?;
    Ok(Json(session.summary()?))
}

pub async fn calendar(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarResponse>, AppError> {
    let line: LineId = query.line.parse()?;
    let session = state.session.lock().await;
    let dates = session.marked_dates(line, &query.month)?;

    Ok(Json(CalendarResponse {
        line,
        month: query.month,
        dates,
    }))
}
