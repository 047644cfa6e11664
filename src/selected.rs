//! Bulk soft-delete and restore by id list.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::{AppState, Error, transaction::set_deleted_many};

/// The request body for the bulk soft-delete route.
#[derive(Debug, Default, Deserialize)]
pub struct SelectedRequest {
    /// The ids to flag. Must be present and non-empty.
    pub ids: Option<Vec<i64>>,
}

/// The query parameters for the bulk soft-delete route.
#[derive(Debug, Default, Deserialize)]
pub struct SelectedQuery {
    /// The value to write to the soft-delete flag. Defaults to `true`, so the
    /// route soft-deletes unless `isDeleted=false` asks it to restore.
    #[serde(rename = "isDeleted")]
    pub is_deleted: Option<String>,
}

impl SelectedQuery {
    fn resolve(&self) -> Result<bool, Error> {
        match self.is_deleted.as_deref() {
            None | Some("true") => Ok(true),
            Some("false") => Ok(false),
            Some(other) => Err(Error::Validation(format!(
                "Invalid isDeleted value: {other}"
            ))),
        }
    }
}

/// A route handler that soft-deletes (or restores) every transaction in the
/// request's id list.
///
/// Ids that match nothing are ignored, but if none match the response is a
/// 404 so clients notice a wholly stale selection.
pub async fn delete_selected_endpoint(
    State(state): State<AppState>,
    Query(query): Query<SelectedQuery>,
    Json(payload): Json<SelectedRequest>,
) -> Result<Response, Error> {
    let deleted = query.resolve()?;

    let ids = match payload.ids {
        Some(ids) if !ids.is_empty() => ids,
        _ => {
            return Err(Error::Validation(
                "Invalid request, ids must be a non-empty array".to_owned(),
            ));
        }
    };

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let updated = set_deleted_many(&ids, deleted, &connection)?;

    if updated == 0 {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No transactions found with the provided ids" })),
        )
            .into_response());
    }

    tracing::info!(
        "Set is_deleted = {deleted} on {updated} of {} selected transactions",
        ids.len()
    );

    Ok(Json(json!({ "message": "Selected transactions deleted successfully" })).into_response())
}
