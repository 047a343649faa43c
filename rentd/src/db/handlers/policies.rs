//! Database repository for company policy resolution.

use sqlx::PgConnection;
use tracing::instrument;

use crate::db::errors::Result;
use crate::db::models::policies::Policy;
use crate::types::CompanyId;

pub struct Policies<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Policies<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Resolve the policy for a company, falling back to the documented
    /// defaults when no row exists. Never fails beyond a database error.
    #[instrument(skip(self), err)]
    pub async fn resolve(&mut self, company_id: CompanyId) -> Result<Policy> {
        let policy = sqlx::query_as::<_, Policy>(
            r#"
            SELECT * FROM company_policies WHERE company_id = $1
            "#,
        )
        .bind(company_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(policy.unwrap_or_else(|| Policy::default_for_company(company_id)))
    }

    /// Whether a stored policy row exists for the company (as opposed to the
    /// defaults applying).
    #[instrument(skip(self), err)]
    pub async fn exists(&mut self, company_id: CompanyId) -> Result<bool> {
        let row: Option<(CompanyId,)> =
            sqlx::query_as("SELECT company_id FROM company_policies WHERE company_id = $1")
                .bind(company_id)
                .fetch_optional(&mut *self.db)
                .await?;

        Ok(row.is_some())
    }
}
