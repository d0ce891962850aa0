//! Case repository implementation.

use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use orthox_core::{
    new_patient_reference, new_v7, patient_label, Case, CaseUpdate, CreateCaseRequest, Error,
    Result,
};

const CASE_COLUMNS: &str = "id, patient_reference_id, patient_name, diagnosis, treatment_plan, \
     implant_choice, outcome_notes, low_resource_mode, phi_confirmed, created_at";

/// PostgreSQL case repository.
#[derive(Clone)]
pub struct PgCaseRepository {
    pool: Pool<Postgres>,
}

impl PgCaseRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a new case with a pseudonymous reference and derived label.
    pub async fn insert(&self, req: CreateCaseRequest) -> Result<Case> {
        let reference = match req.patient_reference_id {
            Some(r) if !r.trim().is_empty() => r.trim().to_string(),
            _ => new_patient_reference(),
        };

        let case = Case {
            id: new_v7(),
            patient_name: patient_label(&reference),
            patient_reference_id: reference,
            diagnosis: None,
            treatment_plan: None,
            implant_choice: None,
            outcome_notes: None,
            low_resource_mode: req.low_resource_mode,
            phi_confirmed: false,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO cases (id, patient_reference_id, patient_name, low_resource_mode, phi_confirmed, created_at)
             VALUES ($1, $2, $3, $4, FALSE, $5)",
        )
        .bind(case.id)
        .bind(&case.patient_reference_id)
        .bind(&case.patient_name)
        .bind(case.low_resource_mode)
        .bind(case.created_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "cases",
            op = "insert",
            case_id = %case.id,
            "Created case"
        );

        Ok(case)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Case>> {
        let row = sqlx::query(&format!("SELECT {} FROM cases WHERE id = $1", CASE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.as_ref().map(case_from_row))
    }

    /// All cases, newest first.
    pub async fn list(&self) -> Result<Vec<Case>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM cases ORDER BY created_at DESC, id DESC",
            CASE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(case_from_row).collect())
    }

    pub async fn exists(&self, id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM cases WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(exists)
    }

    /// Apply the non-null fields of `update` in one statement.
    ///
    /// `phi_confirmed` can only move from false to true.
    pub async fn update_fields(&self, id: Uuid, update: &CaseUpdate) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE cases SET
                diagnosis         = COALESCE($2, diagnosis),
                treatment_plan    = COALESCE($3, treatment_plan),
                implant_choice    = COALESCE($4, implant_choice),
                outcome_notes     = COALESCE($5, outcome_notes),
                low_resource_mode = COALESCE($6, low_resource_mode),
                phi_confirmed     = phi_confirmed OR COALESCE($7, FALSE)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(update.diagnosis.as_deref())
        .bind(update.treatment_plan.as_deref())
        .bind(update.implant_choice.as_deref())
        .bind(update.outcome_notes.as_deref())
        .bind(update.low_resource_mode)
        .bind(update.phi_confirmed)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::CaseNotFound(id));
        }

        debug!(
            subsystem = "db",
            component = "cases",
            op = "update_fields",
            case_id = %id,
            "Updated case fields"
        );
        Ok(())
    }
}

fn case_from_row(r: &PgRow) -> Case {
    Case {
        id: r.get("id"),
        patient_reference_id: r.get("patient_reference_id"),
        patient_name: r.get("patient_name"),
        diagnosis: r.get("diagnosis"),
        treatment_plan: r.get("treatment_plan"),
        implant_choice: r.get("implant_choice"),
        outcome_notes: r.get("outcome_notes"),
        low_resource_mode: r.get("low_resource_mode"),
        phi_confirmed: r.get("phi_confirmed"),
        created_at: r.get("created_at"),
    }
}
