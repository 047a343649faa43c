//! HTTP handler for the company policy preview.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    AppState,
    api::models::policies::PolicyResponse,
    db::handlers::Policies,
    errors::{Error, Result},
    types::CompanyId,
};

/// Get a company's reschedule/cancellation policy
#[utoipa::path(
    get,
    path = "/companies/{id}/policy",
    tag = "policies",
    summary = "Get a company's policy",
    description = "Returns the company's stored policy, or the documented defaults when none exists. \
                   Read-only; never mutates state.",
    params(("id" = i64, Path, description = "Company ID")),
    responses(
        (status = 200, description = "The effective policy", body = PolicyResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_policy(State(state): State<AppState>, Path(company_id): Path<CompanyId>) -> Result<Json<PolicyResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let policy = Policies::new(&mut conn).resolve(company_id).await?;

    Ok(Json(PolicyResponse::from(policy)))
}
