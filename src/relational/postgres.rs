//! Postgres Relational Driver
//!
//! Production driver over `sqlx`. Connection pooling, schema
//! materialization from the registered descriptors, parameterized queries
//! rendered by [`SelectQuery`].
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS "book" (
//!     "id" TEXT PRIMARY KEY,
//!     "created_at" TIMESTAMPTZ NOT NULL,
//!     "updated_at" TIMESTAMPTZ NOT NULL,
//!     -- one typed column per schema field
//!     "title" TEXT,
//!     "price" DOUBLE PRECISION
//! );
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tokio::sync::RwLock;

use crate::constants::ID_PROPERTY;
use crate::entity::Entity;
use crate::error::{DbError, DbResult};
use crate::schema::FieldKind;
use crate::value::Value;

use super::driver::{RelationalDriver, TableModel};
use super::query::{quote_ident, SelectQuery};

/// Pool size for the facade's single logical thread of control.
const POOL_CONNECTIONS_MAX: u32 = 10;

fn sql_type(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Text => "TEXT",
        FieldKind::Number => "DOUBLE PRECISION",
        FieldKind::Boolean => "BOOLEAN",
        FieldKind::Date => "TIMESTAMPTZ",
    }
}

// =============================================================================
// PostgresDriver
// =============================================================================

/// PostgreSQL driver for production use.
#[derive(Default)]
pub struct PostgresDriver {
    pool: RwLock<Option<PgPool>>,
}

impl PostgresDriver {
    /// Create a driver; the pool is built by `authenticate`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn pool(&self) -> DbResult<PgPool> {
        self.pool
            .read()
            .await
            .clone()
            .ok_or_else(|| DbError::connection("no pool: authenticate was never called"))
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

fn row_to_entity(row: &PgRow, model: &TableModel) -> DbResult<Entity> {
    let id: String = row
        .try_get(ID_PROPERTY)
        .map_err(|e| DbError::persistence(e.to_string()))?;
    let created_at: DateTime<Utc> = row
        .try_get("created_at")
        .map_err(|e| DbError::persistence(e.to_string()))?;
    let updated_at: DateTime<Utc> = row
        .try_get("updated_at")
        .map_err(|e| DbError::persistence(e.to_string()))?;

    let mut values = std::collections::HashMap::new();
    for (column, kind) in &model.columns {
        let value = match kind {
            FieldKind::Text => row
                .try_get::<Option<String>, _>(column.as_str())
                .map_err(|e| DbError::persistence(e.to_string()))?
                .map(Value::Str),
            FieldKind::Number => row
                .try_get::<Option<f64>, _>(column.as_str())
                .map_err(|e| DbError::persistence(e.to_string()))?
                .map(Value::Num),
            FieldKind::Boolean => row
                .try_get::<Option<bool>, _>(column.as_str())
                .map_err(|e| DbError::persistence(e.to_string()))?
                .map(Value::Bool),
            FieldKind::Date => row
                .try_get::<Option<DateTime<Utc>>, _>(column.as_str())
                .map_err(|e| DbError::persistence(e.to_string()))?
                .map(Value::Date),
        };
        if let Some(value) = value {
            values.insert(column.clone(), value);
        }
    }

    Ok(Entity::restore(
        id,
        model.name.clone(),
        values,
        Some(created_at),
        Some(updated_at),
    ))
}

// =============================================================================
// RelationalDriver Implementation
// =============================================================================

#[async_trait]
impl RelationalDriver for PostgresDriver {
    async fn authenticate(&self, connection: &str) -> DbResult<()> {
        if connection.is_empty() {
            return Err(DbError::connection("connection string cannot be empty"));
        }
        if !connection.starts_with("postgres://") && !connection.starts_with("postgresql://") {
            return Err(DbError::connection("connection string must be a postgres URL"));
        }

        let pool = PgPoolOptions::new()
            .max_connections(POOL_CONNECTIONS_MAX)
            .connect(connection)
            .await
            .map_err(|e| DbError::connection(format!("failed to connect: {e}")))?;

        *self.pool.write().await = Some(pool);
        Ok(())
    }

    async fn sync(&self, tables: &[TableModel]) -> DbResult<()> {
        let pool = self.pool().await?;

        for table in tables {
            let mut columns = vec![
                format!("{} TEXT PRIMARY KEY", quote_ident(ID_PROPERTY)),
                format!("{} TIMESTAMPTZ NOT NULL", quote_ident("created_at")),
                format!("{} TIMESTAMPTZ NOT NULL", quote_ident("updated_at")),
            ];
            for (column, kind) in &table.columns {
                columns.push(format!("{} {}", quote_ident(column), sql_type(*kind)));
            }

            let ddl = format!(
                "CREATE TABLE IF NOT EXISTS {} ({})",
                quote_ident(&table.name),
                columns.join(", ")
            );
            sqlx::query(&ddl)
                .execute(&pool)
                .await
                .map_err(|e| DbError::connection(format!("failed to create table: {e}")))?;
        }

        Ok(())
    }

    async fn close(&self) -> DbResult<()> {
        let pool = self.pool.write().await.take();
        match pool {
            Some(pool) => {
                pool.close().await;
                Ok(())
            }
            None => Err(DbError::connection("no pool to close")),
        }
    }

    async fn upsert(&self, table: &TableModel, entity: &mut Entity) -> DbResult<()> {
        // Precondition
        assert!(entity.id().is_some(), "entity must have id before upsert");

        for prop in entity.properties() {
            if prop != ID_PROPERTY && !table.has_column(prop) {
                return Err(DbError::persistence(format!(
                    "unknown column {prop} for table {}",
                    table.name
                )));
            }
        }

        entity.touch(Utc::now());
        let pool = self.pool().await?;

        let mut columns = vec![
            quote_ident(ID_PROPERTY),
            quote_ident("created_at"),
            quote_ident("updated_at"),
        ];
        for (column, _) in &table.columns {
            columns.push(quote_ident(column));
        }
        let placeholders: Vec<String> =
            (1..=columns.len()).map(|index| format!("${index}")).collect();
        let updates: Vec<String> = columns
            .iter()
            .skip(1)
            .map(|column| format!("{column} = EXCLUDED.{column}"))
            .collect();

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO UPDATE SET {}",
            quote_ident(&table.name),
            columns.join(", "),
            placeholders.join(", "),
            quote_ident(ID_PROPERTY),
            updates.join(", ")
        );

        let mut query = sqlx::query(&sql)
            .bind(entity.id().map(ToString::to_string))
            .bind(entity.created_at())
            .bind(entity.updated_at());
        for (column, kind) in &table.columns {
            let value = entity.get(column);
            query = match kind {
                FieldKind::Text => query.bind(value.and_then(|v| v.as_str().map(ToString::to_string))),
                FieldKind::Number => query.bind(value.and_then(|v| v.as_f64())),
                FieldKind::Boolean => query.bind(match value {
                    Some(Value::Bool(b)) => Some(b),
                    _ => None,
                }),
                FieldKind::Date => query.bind(match value {
                    Some(Value::Date(d)) => Some(d),
                    _ => None,
                }),
            };
        }

        query
            .execute(&pool)
            .await
            .map_err(|e| DbError::persistence(format!("failed to store row: {e}")))?;

        Ok(())
    }

    async fn select(&self, table: &TableModel, query: &SelectQuery) -> DbResult<Vec<Entity>> {
        let pool = self.pool().await?;

        let (sql, binds) = query.to_sql(&table.name);
        let mut prepared = sqlx::query(&sql);
        for value in binds {
            prepared = match value {
                Value::Str(s) => prepared.bind(s),
                Value::Num(n) => prepared.bind(n),
                Value::Bool(b) => prepared.bind(b),
                Value::Date(d) => prepared.bind(d),
                Value::Null => prepared.bind(Option::<String>::None),
            };
        }

        let rows = prepared
            .fetch_all(&pool)
            .await
            .map_err(|e| DbError::persistence(format!("failed to select rows: {e}")))?;

        let mut entities = Vec::with_capacity(rows.len());
        for row in &rows {
            entities.push(row_to_entity(row, table)?);
        }
        Ok(entities)
    }

    async fn delete(&self, table: &TableModel, id: &str) -> DbResult<bool> {
        // Precondition
        assert!(!id.is_empty(), "id cannot be empty");

        let pool = self.pool().await?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = $1",
            quote_ident(&table.name),
            quote_ident(ID_PROPERTY)
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| DbError::persistence(format!("failed to delete row: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Tests (require running Postgres)
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaDescriptor;
    use std::env;

    /// Get test database URL from environment.
    fn test_db_url() -> Option<String> {
        env::var("TEST_POSTGRES_URL").ok()
    }

    /// Skip test if no database available.
    macro_rules! require_db {
        () => {
            match test_db_url() {
                Some(url) => url,
                None => {
                    eprintln!("Skipping test: TEST_POSTGRES_URL not set");
                    return;
                }
            }
        };
    }

    fn book_table() -> TableModel {
        TableModel::from_schema(
            &SchemaDescriptor::new("hashi_test_book")
                .field("title", FieldKind::Text)
                .field("price", FieldKind::Number),
        )
    }

    #[tokio::test]
    async fn test_postgres_connect_and_sync() {
        let url = require_db!();

        let driver = PostgresDriver::new();
        driver.authenticate(&url).await.unwrap();
        driver.sync(&[book_table()]).await.unwrap();
        driver.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_postgres_crud_and_range_select() {
        let url = require_db!();
        let driver = PostgresDriver::new();
        driver.authenticate(&url).await.unwrap();
        let table = book_table();
        driver.sync(&[table.clone()]).await.unwrap();

        let mut values = std::collections::HashMap::new();
        values.insert("title".to_string(), Value::from("dune"));
        values.insert("price".to_string(), Value::from(50.0));
        let mut entity = Entity::new(table.name.clone(), values);
        let id = entity.id().unwrap().to_string();

        driver.upsert(&table, &mut entity).await.unwrap();

        let query = SelectQuery::filter(super::super::query::Predicate::Between(
            "price".to_string(),
            10.0,
            100.0,
        ));
        let results = driver.select(&table, &query).await.unwrap();
        assert!(results.iter().any(|row| row.id() == Some(id.as_str())));

        assert!(driver.delete(&table, &id).await.unwrap());
        driver.close().await.unwrap();
    }
}
