//! HTTP serving surface for the derivers.
//!
//! One route per deriver plus a signatures route for registration tooling.
//! The caller supplies the credit-card reference time via the `at` query
//! parameter; the server never substitutes its own clock.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::features::{
    derive_credit_card_features, derive_transaction_features, DeriveConfig, DeriveError,
};
use crate::signature::{credit_card_signature, transaction_signature};
use crate::store::{FetchError, RecordFetcher};

pub const REFERENCE_TIME_QUERY_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Clone)]
struct FeatureAppState {
    fetcher: Arc<dyn RecordFetcher>,
    cfg: Arc<DeriveConfig>,
}

pub fn feature_router(fetcher: Arc<dyn RecordFetcher>, cfg: DeriveConfig) -> Router {
    Router::new()
        .route(
            "/features/credit-card/{cc_num}",
            get(get_credit_card_features),
        )
        .route("/features/transaction/{tid}", get(get_transaction_features))
        .route("/features/signatures", get(get_signatures))
        .with_state(FeatureAppState {
            fetcher,
            cfg: Arc::new(cfg),
        })
}

#[derive(Debug, Deserialize)]
struct CreditCardQuery {
    at: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

async fn get_credit_card_features(
    State(state): State<FeatureAppState>,
    Path(cc_num): Path<i64>,
    Query(query): Query<CreditCardQuery>,
) -> Response {
    let Some(raw_at) = query.at else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "missing required query parameter 'at'".to_string(),
        );
    };

    let reference_time = match NaiveDateTime::parse_from_str(&raw_at, REFERENCE_TIME_QUERY_FORMAT) {
        Ok(reference_time) => reference_time,
        Err(_) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!(
                    "query parameter 'at' value '{raw_at}' does not match {REFERENCE_TIME_QUERY_FORMAT}"
                ),
            );
        }
    };

    match derive_credit_card_features(cc_num, reference_time, state.fetcher.as_ref(), &state.cfg) {
        Ok(features) => (StatusCode::OK, Json(features)).into_response(),
        Err(err) => derive_error_response("credit_card_features", err),
    }
}

async fn get_transaction_features(
    State(state): State<FeatureAppState>,
    Path(tid): Path<i64>,
) -> Response {
    match derive_transaction_features(tid, state.fetcher.as_ref(), &state.cfg) {
        Ok(features) => (StatusCode::OK, Json(features)).into_response(),
        Err(err) => derive_error_response("transaction_features", err),
    }
}

async fn get_signatures() -> impl IntoResponse {
    Json(vec![credit_card_signature(), transaction_signature()])
}

fn derive_error_response(deriver: &'static str, err: DeriveError) -> Response {
    let status = derive_error_status(&err);
    warn!(
        component = "serving",
        event = "serving.derive.failed",
        deriver,
        status = status.as_u16(),
        error = %err
    );
    error_response(status, err.to_string())
}

fn derive_error_status(err: &DeriveError) -> StatusCode {
    match err {
        DeriveError::Fetch(FetchError::RecordNotFound { .. }) => StatusCode::NOT_FOUND,
        DeriveError::Fetch(_) | DeriveError::MalformedDate(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorBody { error })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datefmt::MalformedDate;

    #[test]
    fn record_not_found_maps_to_404() {
        let err = DeriveError::Fetch(FetchError::RecordNotFound {
            table: "credit_cards",
            key: 1,
        });
        assert_eq!(derive_error_status(&err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn stored_data_failures_map_to_500() {
        let malformed = DeriveError::MalformedDate(MalformedDate {
            field: "expires",
            value: "13/99".to_string(),
            format: "%m/%y".to_string(),
        });
        assert_eq!(
            derive_error_status(&malformed),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let duplicate = DeriveError::Fetch(FetchError::MultipleRecords {
            table: "credit_cards",
            key: 1,
        });
        assert_eq!(
            derive_error_status(&duplicate),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn reference_time_query_format_parses_rfc3339_like_values() {
        let parsed =
            NaiveDateTime::parse_from_str("2024-01-15T00:00:00", REFERENCE_TIME_QUERY_FORMAT)
                .unwrap();
        assert_eq!(parsed.to_string(), "2024-01-15 00:00:00");
    }
}
