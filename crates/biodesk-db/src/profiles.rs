//! Profile repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use biodesk_core::{
    Error, NewProfile, ProfileFields, ProfileRecord, ProfileRepository, ProfileSummary, Result,
};

const PROFILE_COLUMNS: &str = "id, full_name, father_name, mother_name, mobile, age, occupation, \
     experience, salary, current_address, permanent_address, height, message, \
     photo1, photo2, created_at";

/// PostgreSQL implementation of ProfileRepository.
#[derive(Clone)]
pub struct PgProfileRepository {
    pool: Pool<Postgres>,
}

impl PgProfileRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn profile_from_row(row: &sqlx::postgres::PgRow) -> ProfileRecord {
    ProfileRecord {
        id: row.get("id"),
        fields: ProfileFields {
            full_name: row.get("full_name"),
            father_name: row.get("father_name"),
            mother_name: row.get("mother_name"),
            mobile: row.get("mobile"),
            age: row.get("age"),
            occupation: row.get("occupation"),
            experience: row.get("experience"),
            salary: row.get("salary"),
            current_address: row.get("current_address"),
            permanent_address: row.get("permanent_address"),
            height: row.get("height"),
            message: row.get("message"),
        },
        photo1: row.get("photo1"),
        photo2: row.get("photo2"),
        created_at: row.get("created_at"),
    }
}

/// Map a unique violation on `mobile` to a conflict.
pub(crate) fn map_unique_violation(err: sqlx::Error, what: &str) -> Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return Error::Conflict(format!("{} already exists", what));
        }
    }
    Error::Database(err)
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn insert(&self, profile: NewProfile) -> Result<ProfileRecord> {
        let f = profile.fields;
        let sql = format!(
            r#"INSERT INTO profile
               (id, full_name, father_name, mother_name, mobile, age, occupation,
                experience, salary, current_address, permanent_address, height,
                message, photo1, photo2)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
               RETURNING {}"#,
            PROFILE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::now_v7())
            .bind(&f.full_name)
            .bind(&f.father_name)
            .bind(&f.mother_name)
            .bind(&f.mobile)
            .bind(f.age)
            .bind(&f.occupation)
            .bind(&f.experience)
            .bind(&f.salary)
            .bind(&f.current_address)
            .bind(&f.permanent_address)
            .bind(&f.height)
            .bind(&f.message)
            .bind(&profile.photo1)
            .bind(&profile.photo2)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "A profile with this mobile number"))?;

        Ok(profile_from_row(&row))
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<ProfileRecord>> {
        let sql = format!("SELECT {} FROM profile WHERE id = $1", PROFILE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(profile_from_row))
    }

    async fn update(&self, profile: &ProfileRecord) -> Result<ProfileRecord> {
        let f = &profile.fields;
        let sql = format!(
            r#"UPDATE profile SET
                 full_name = $2, father_name = $3, mother_name = $4, mobile = $5,
                 age = $6, occupation = $7, experience = $8, salary = $9,
                 current_address = $10, permanent_address = $11, height = $12,
                 message = $13, photo1 = $14, photo2 = $15, updated_at = NOW()
               WHERE id = $1
               RETURNING {}"#,
            PROFILE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(profile.id)
            .bind(&f.full_name)
            .bind(&f.father_name)
            .bind(&f.mother_name)
            .bind(&f.mobile)
            .bind(f.age)
            .bind(&f.occupation)
            .bind(&f.experience)
            .bind(&f.salary)
            .bind(&f.current_address)
            .bind(&f.permanent_address)
            .bind(&f.height)
            .bind(&f.message)
            .bind(&profile.photo1)
            .bind(&profile.photo2)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "A profile with this mobile number"))?
            .ok_or_else(|| Error::NotFound("Profile not found".to_string()))?;

        Ok(profile_from_row(&row))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM profile WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_summaries(&self) -> Result<Vec<ProfileSummary>> {
        let rows = sqlx::query(
            r#"SELECT id, full_name, age, occupation, current_address
               FROM profile ORDER BY created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ProfileSummary {
                id: row.get("id"),
                full_name: row.get("full_name"),
                age: row.get("age"),
                occupation: row.get("occupation"),
                current_address: row.get("current_address"),
            })
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<ProfileRecord>> {
        let sql = format!(
            "SELECT {} FROM profile ORDER BY created_at DESC",
            PROFILE_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(profile_from_row).collect())
    }
}
