//! Biodata repository implementation.
//!
//! The dynamic field list is stored as a JSONB array so label order is
//! preserved exactly as submitted.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use biodesk_core::{BioDataRecord, BioDataRepository, BioField, Error, NewBioData, Result};

/// PostgreSQL implementation of BioDataRepository.
#[derive(Clone)]
pub struct PgBioDataRepository {
    pool: Pool<Postgres>,
}

impl PgBioDataRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn biodata_from_row(row: &sqlx::postgres::PgRow) -> BioDataRecord {
    let data: Json<Vec<BioField>> = row.get("data");
    BioDataRecord {
        id: row.get("id"),
        image_url: row.get("image_url"),
        data: data.0,
        birth_year: row.get("birth_year"),
        is_male: row.get("is_male"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl BioDataRepository for PgBioDataRepository {
    async fn insert(&self, biodata: NewBioData) -> Result<BioDataRecord> {
        let row = sqlx::query(
            r#"INSERT INTO biodata (id, image_url, data, birth_year, is_male)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, image_url, data, birth_year, is_male, created_at"#,
        )
        .bind(Uuid::now_v7())
        .bind(&biodata.image_url)
        .bind(Json(&biodata.data))
        .bind(biodata.birth_year)
        .bind(biodata.is_male)
        .fetch_one(&self.pool)
        .await?;

        Ok(biodata_from_row(&row))
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<BioDataRecord>> {
        let row = sqlx::query(
            r#"SELECT id, image_url, data, birth_year, is_male, created_at
               FROM biodata WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(biodata_from_row))
    }

    async fn update(&self, biodata: &BioDataRecord) -> Result<BioDataRecord> {
        let row = sqlx::query(
            r#"UPDATE biodata
               SET image_url = $2, data = $3, birth_year = $4, is_male = $5, updated_at = NOW()
               WHERE id = $1
               RETURNING id, image_url, data, birth_year, is_male, created_at"#,
        )
        .bind(biodata.id)
        .bind(&biodata.image_url)
        .bind(Json(&biodata.data))
        .bind(biodata.birth_year)
        .bind(biodata.is_male)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Biodata not found".to_string()))?;

        Ok(biodata_from_row(&row))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM biodata WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, birth_year: Option<i32>) -> Result<Vec<BioDataRecord>> {
        // NULL parameter disables the year filter
        let rows = sqlx::query(
            r#"SELECT id, image_url, data, birth_year, is_male, created_at
               FROM biodata
               WHERE ($1::INTEGER IS NULL OR birth_year = $1)
               ORDER BY created_at DESC, id DESC"#,
        )
        .bind(birth_year)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(biodata_from_row).collect())
    }

    async fn distinct_birth_years(&self) -> Result<Vec<i32>> {
        let years = sqlx::query_scalar::<_, i32>(
            r#"SELECT DISTINCT birth_year FROM biodata
               WHERE birth_year IS NOT NULL
               ORDER BY birth_year"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(years)
    }
}
