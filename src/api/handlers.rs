//! HTTP request handlers for the leave engine API.
//!
//! This module contains the handler functions for all API endpoints. Each
//! handler tags its log events with a fresh correlation id, locks the store
//! for the duration of the request, and maps engine errors onto JSON error
//! bodies.

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{OwnerId, PatternId, SourceRef, SourceType, WorkPatternDraft, WorkPatternUpdate};
use crate::services::{BalanceLedger, ExpiryEngine, IntervalIndex, WorkPatternCalendar};

use super::request::{
    BalanceChangeRequest, BalanceQuery, ContactsQuery, ContractsQuery, CountQuery, ExpireRequest,
    LeaveDaysRequest, LeaveDaysTarget,
};
use super::response::{
    ApiError, ApiErrorResponse, BalanceResponse, ContactsCountResponse, LeaveDaysResponse,
};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/work-patterns",
            get(list_work_patterns_handler).post(create_work_pattern_handler),
        )
        .route(
            "/work-patterns/:id",
            get(get_work_pattern_handler).patch(update_work_pattern_handler),
        )
        .route("/work-patterns/:id/leave-days", post(leave_days_handler))
        .route("/balance-changes", post(record_balance_change_handler))
        .route("/balances/expire", post(expire_all_handler))
        .route("/balances/:source_type/:source_id", get(balance_handler))
        .route(
            "/balances/:source_type/:source_id/expire",
            post(expire_source_handler),
        )
        .route("/contracts", get(contracts_handler))
        .route("/contacts", get(contacts_handler))
        .route("/contacts/count", get(contacts_count_handler))
        .with_state(state)
}

// =============================================================================
// Work patterns
// =============================================================================

/// Handler for GET /work-patterns.
///
/// Lists every pattern with its number of weeks and hours.
async fn list_work_patterns_handler(State(state): State<AppState>) -> Response {
    let correlation_id = Uuid::new_v4();
    let start_time = Instant::now();
    info!(correlation_id = %correlation_id, "Listing work patterns");

    let result = state.store().and_then(|mut store| {
        let calendar = WorkPatternCalendar::new(&mut *store, state.rotation_anchor());
        calendar.distinct_week_counts_and_hours()
    });
    respond(correlation_id, start_time, StatusCode::OK, result)
}

/// Handler for POST /work-patterns.
async fn create_work_pattern_handler(
    State(state): State<AppState>,
    payload: Result<Json<WorkPatternDraft>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let start_time = Instant::now();
    info!(correlation_id = %correlation_id, "Processing create work pattern request");

    let draft = match payload {
        Ok(Json(draft)) => draft,
        Err(rejection) => return json_rejection_response(correlation_id, rejection),
    };

    let result = state.store().and_then(|mut store| {
        let mut calendar = WorkPatternCalendar::new(&mut *store, state.rotation_anchor());
        calendar.create(draft)
    });
    respond(correlation_id, start_time, StatusCode::CREATED, result)
}

/// Handler for GET /work-patterns/:id.
///
/// Returns the full schedule, or 404 if the pattern does not exist.
async fn get_work_pattern_handler(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let start_time = Instant::now();
    let id = match id {
        Ok(Path(id)) => PatternId(id),
        Err(rejection) => return parameter_rejection_response(correlation_id, rejection.body_text()),
    };
    info!(correlation_id = %correlation_id, pattern_id = %id, "Fetching work pattern");

    let result = state.store().and_then(|mut store| {
        let calendar = WorkPatternCalendar::new(&mut *store, state.rotation_anchor());
        calendar
            .pattern_summary(id)?
            .ok_or_else(|| EngineError::not_found("Work pattern", id))
    });
    respond(correlation_id, start_time, StatusCode::OK, result)
}

/// Handler for PATCH /work-patterns/:id.
async fn update_work_pattern_handler(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<WorkPatternUpdate>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let start_time = Instant::now();
    let id = match id {
        Ok(Path(id)) => PatternId(id),
        Err(rejection) => return parameter_rejection_response(correlation_id, rejection.body_text()),
    };
    info!(correlation_id = %correlation_id, pattern_id = %id, "Processing update work pattern request");

    let changes = match payload {
        Ok(Json(changes)) => changes,
        Err(rejection) => return json_rejection_response(correlation_id, rejection),
    };

    let result = state.store().and_then(|mut store| {
        let mut calendar = WorkPatternCalendar::new(&mut *store, state.rotation_anchor());
        calendar.update(id, changes)
    });
    respond(correlation_id, start_time, StatusCode::OK, result)
}

/// Handler for POST /work-patterns/:id/leave-days.
///
/// Computes the leave days of a single date or an inclusive range.
async fn leave_days_handler(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<LeaveDaysRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let start_time = Instant::now();
    let id = match id {
        Ok(Path(id)) => PatternId(id),
        Err(rejection) => return parameter_rejection_response(correlation_id, rejection.body_text()),
    };
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return json_rejection_response(correlation_id, rejection),
    };
    info!(correlation_id = %correlation_id, pattern_id = %id, "Processing leave days request");

    let result = request.target().and_then(|target| {
        let mut store = state.store()?;
        let calendar = WorkPatternCalendar::new(&mut *store, state.rotation_anchor());
        let leave_days = match target {
            LeaveDaysTarget::Date(date) => calendar.leave_days_for_date(
                id,
                date,
                request.reference_start,
                request.reference_end,
            )?,
            LeaveDaysTarget::Period(from, to) => calendar.leave_days_for_period(
                id,
                from,
                to,
                request.reference_start,
                request.reference_end,
            )?,
        };
        Ok(LeaveDaysResponse {
            pattern_id: id,
            leave_days,
        })
    });
    respond(correlation_id, start_time, StatusCode::OK, result)
}

// =============================================================================
// Balance ledger and expiry
// =============================================================================

/// Handler for POST /balance-changes.
async fn record_balance_change_handler(
    State(state): State<AppState>,
    payload: Result<Json<BalanceChangeRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let start_time = Instant::now();
    info!(correlation_id = %correlation_id, "Processing balance change request");

    let entry = match payload {
        Ok(Json(request)) => request.into_balance_change(Utc::now().naive_utc()),
        Err(rejection) => return json_rejection_response(correlation_id, rejection),
    };

    let result = state.store().and_then(|mut store| {
        let mut ledger = BalanceLedger::new(&mut *store);
        ledger.record(entry)
    });
    respond(correlation_id, start_time, StatusCode::CREATED, result)
}

/// Handler for GET /balances/:source_type/:source_id.
///
/// Returns the balance as of `as_of` (today by default) with every entry.
async fn balance_handler(
    State(state): State<AppState>,
    source: Result<Path<(SourceType, u64)>, PathRejection>,
    query: Result<Query<BalanceQuery>, QueryRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let start_time = Instant::now();
    let source = match source {
        Ok(Path((source_type, source_id))) => SourceRef {
            source_type,
            source_id,
        },
        Err(rejection) => return parameter_rejection_response(correlation_id, rejection.body_text()),
    };
    let as_of = match query {
        Ok(Query(query)) => query.as_of.unwrap_or_else(|| Utc::now().date_naive()),
        Err(rejection) => return parameter_rejection_response(correlation_id, rejection.body_text()),
    };
    info!(correlation_id = %correlation_id, source = %source, as_of = %as_of, "Fetching balance");

    let result = state.store().and_then(|mut store| {
        let ledger = BalanceLedger::new(&mut *store);
        Ok(BalanceResponse {
            source,
            as_of,
            balance: ledger.current_balance(source, as_of)?,
            entries: ledger.entries_for_source(source)?,
        })
    });
    respond(correlation_id, start_time, StatusCode::OK, result)
}

/// Handler for POST /balances/:source_type/:source_id/expire.
async fn expire_source_handler(
    State(state): State<AppState>,
    source: Result<Path<(SourceType, u64)>, PathRejection>,
    payload: Result<Json<ExpireRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let start_time = Instant::now();
    let source = match source {
        Ok(Path((source_type, source_id))) => SourceRef {
            source_type,
            source_id,
        },
        Err(rejection) => return parameter_rejection_response(correlation_id, rejection.body_text()),
    };
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return json_rejection_response(correlation_id, rejection),
    };
    info!(correlation_id = %correlation_id, source = %source, "Processing expiry request");

    let result = state.store().and_then(|mut store| {
        let mut engine = ExpiryEngine::new(&mut *store);
        engine.expire_as_of(source, request.reference_date)
    });
    respond(correlation_id, start_time, StatusCode::OK, result)
}

/// Handler for POST /balances/expire.
///
/// Runs the expiry sweep over every source.
async fn expire_all_handler(
    State(state): State<AppState>,
    payload: Result<Json<ExpireRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let start_time = Instant::now();
    info!(correlation_id = %correlation_id, "Processing expiry sweep request");

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return json_rejection_response(correlation_id, rejection),
    };

    let result = state.store().and_then(|mut store| {
        let mut engine = ExpiryEngine::new(&mut *store);
        engine.expire_all(request.reference_date)
    });
    respond(correlation_id, start_time, StatusCode::OK, result)
}

// =============================================================================
// Contracts
// =============================================================================

/// Handler for GET /contracts.
async fn contracts_handler(
    State(state): State<AppState>,
    query: Result<Query<ContractsQuery>, QueryRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let start_time = Instant::now();
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return parameter_rejection_response(correlation_id, rejection.body_text()),
    };
    info!(correlation_id = %correlation_id, "Querying active contracts");

    let result = state.store().and_then(|store| {
        IntervalIndex::new(&*store).active_contracts_in_period(
            query.start,
            query.end,
            query.owner.map(OwnerId),
        )
    });
    respond(correlation_id, start_time, StatusCode::OK, result)
}

/// Handler for GET /contacts.
async fn contacts_handler(
    State(state): State<AppState>,
    query: Result<Query<ContactsQuery>, QueryRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let start_time = Instant::now();
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return parameter_rejection_response(correlation_id, rejection.body_text()),
    };
    info!(correlation_id = %correlation_id, "Querying contacts with active contracts");

    let result = state.store().and_then(|store| {
        IntervalIndex::new(&*store).owners_with_active_contract_in_period(query.start, query.end)
    });
    respond(correlation_id, start_time, StatusCode::OK, result)
}

/// Handler for GET /contacts/count.
async fn contacts_count_handler(
    State(state): State<AppState>,
    query: Result<Query<CountQuery>, QueryRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let start_time = Instant::now();
    let as_of = match query {
        Ok(Query(query)) => query.as_of.unwrap_or_else(|| Utc::now().date_naive()),
        Err(rejection) => return parameter_rejection_response(correlation_id, rejection.body_text()),
    };
    info!(correlation_id = %correlation_id, as_of = %as_of, "Counting contacts with active contracts");

    let result = state.store().and_then(|store| {
        let count = IntervalIndex::new(&*store).active_owner_count(as_of)?;
        Ok(ContactsCountResponse { as_of, count })
    });
    respond(correlation_id, start_time, StatusCode::OK, result)
}

// =============================================================================
// Response helpers
// =============================================================================

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(body),
    )
        .into_response()
}

/// Turns a handler result into a response, logging the outcome.
fn respond<T: Serialize>(
    correlation_id: Uuid,
    start_time: Instant,
    status: StatusCode,
    result: EngineResult<T>,
) -> Response {
    match result {
        Ok(body) => {
            let response = json_response(status, body);
            info!(
                correlation_id = %correlation_id,
                status = status.as_u16(),
                duration_us = start_time.elapsed().as_micros(),
                "Request completed successfully"
            );
            response
        }
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "Request failed"
            );
            let api_error: ApiErrorResponse = err.into();
            json_response(api_error.status, api_error.error)
        }
    }
}

fn json_rejection_response(correlation_id: Uuid, rejection: JsonRejection) -> Response {
    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            // Get the body text which contains the detailed error from serde
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") {
                ApiError::new("VALIDATION_ERROR", body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    json_response(StatusCode::BAD_REQUEST, error)
}

fn parameter_rejection_response(correlation_id: Uuid, message: String) -> Response {
    warn!(
        correlation_id = %correlation_id,
        error = %message,
        "Invalid path or query parameter"
    );
    json_response(StatusCode::BAD_REQUEST, ApiError::invalid_parameter(message))
}
