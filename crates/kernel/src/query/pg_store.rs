//! PostgreSQL store delegate.
//!
//! Runs compiled list queries through sqlx, returning each row as JSON via
//! `row_to_json`, and resolves the include tree with one batched query per
//! relation per level.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use super::sql::{SqlQueryBuilder, build_relation};
use super::store::QueryStore;
use super::types::{CompiledQuerySpec, CountSpec, EntitySchema, FilterValue, IncludeTree, RelationSpec};

/// Maximum nesting depth for includes to prevent unbounded recursion.
pub const MAX_INCLUDE_DEPTH: u8 = 3;

/// Related rows loaded per relation per level.
pub const MAX_RELATION_ROWS: usize = 1000;

const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// List-query store for one entity table.
pub struct PgStore {
    pool: PgPool,
    schema: EntitySchema,
    statement_timeout: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool, schema: EntitySchema) -> Self {
        Self {
            pool,
            schema,
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT,
        }
    }

    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    /// Begin a transaction with the statement timeout applied.
    /// `SET LOCAL` resets on commit or rollback.
    async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin transaction")?;

        sqlx::query(&format!(
            "SET LOCAL statement_timeout = '{}ms'",
            self.statement_timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await
        .context("failed to set statement timeout")?;

        Ok(tx)
    }

    /// Run a SELECT and return each row as a JSON object.
    async fn fetch_json(&self, select_sql: &str) -> Result<Vec<Value>> {
        let mut tx = self.begin().await?;
        let rows: Vec<Value> =
            sqlx::query_scalar(&format!("SELECT row_to_json(t) FROM ({select_sql}) t"))
                .fetch_all(&mut *tx)
                .await?;
        tx.commit()
            .await
            .context("failed to commit query transaction")?;
        Ok(rows)
    }

    /// Load each relation for `parents` and embed the results.
    fn load_relations<'a>(
        &'a self,
        parents: &'a mut [Value],
        relations: &'a IncludeTree,
        depth: u8,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if depth >= MAX_INCLUDE_DEPTH {
                tracing::warn!(
                    depth,
                    "include depth limit ({}) reached, skipping nested includes",
                    MAX_INCLUDE_DEPTH
                );
                return Ok(());
            }

            for (name, relation) in relations {
                let keys = parent_keys(parents, &relation.local_field);
                let Some(sql) = build_relation(relation, &keys, MAX_RELATION_ROWS as u64 + 1)
                else {
                    distribute(parents, name, relation, Vec::new());
                    continue;
                };

                let mut children = self
                    .fetch_json(&sql)
                    .await
                    .with_context(|| format!("failed to load relation '{name}'"))?;

                if children.len() > MAX_RELATION_ROWS {
                    tracing::warn!(
                        include = %name,
                        returned = MAX_RELATION_ROWS,
                        "include results truncated"
                    );
                    children.truncate(MAX_RELATION_ROWS);
                }

                if !relation.include.is_empty() {
                    self.load_relations(&mut children, &relation.include, depth + 1)
                        .await?;
                }

                distribute(parents, name, relation, children);
            }

            Ok(())
        })
    }
}

#[async_trait]
impl QueryStore for PgStore {
    type Record = Value;

    async fn find_many(&self, spec: &CompiledQuerySpec) -> Result<Vec<Value>> {
        let sql = SqlQueryBuilder::new(&self.schema).build(spec);
        let mut rows = self
            .fetch_json(&sql)
            .await
            .context("failed to execute main query")?;

        if !spec.include.is_empty() {
            self.load_relations(&mut rows, &spec.include, 0).await?;
        }

        Ok(rows)
    }

    async fn count(&self, spec: &CountSpec) -> Result<u64> {
        let sql = SqlQueryBuilder::new(&self.schema).build_count(spec);
        let mut tx = self.begin().await?;
        let total: i64 = sqlx::query_scalar(&sql)
            .fetch_one(&mut *tx)
            .await
            .context("failed to execute count query")?;
        tx.commit()
            .await
            .context("failed to commit query transaction")?;
        Ok(u64::try_from(total).unwrap_or_default())
    }
}

/// Distinct join-key values of `field` across `records`, in first-seen order.
fn parent_keys(records: &[Value], field: &str) -> Vec<FilterValue> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter_map(|record| record.get(field))
        .filter(|value| seen.insert(join_key(value)))
        .filter_map(key_value)
        .collect()
}

/// Comparable form of a join-key value. `Null` never joins.
fn join_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn key_value(value: &Value) -> Option<FilterValue> {
    match value {
        Value::String(s) => Some(FilterValue::String(s.clone())),
        Value::Bool(b) => Some(FilterValue::Boolean(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(FilterValue::Integer)
            .or_else(|| n.as_f64().map(FilterValue::Float)),
        _ => None,
    }
}

/// Embed related rows under `name` on each parent: an object or `null` for
/// singular relations, an array otherwise.
fn distribute(parents: &mut [Value], name: &str, relation: &RelationSpec, children: Vec<Value>) {
    let mut by_key: HashMap<String, Vec<Value>> = HashMap::new();
    for child in children {
        if let Some(key) = child.get(&relation.foreign_field).and_then(join_key) {
            by_key.entry(key).or_default().push(child);
        }
    }

    for parent in parents.iter_mut() {
        let matching = parent
            .get(&relation.local_field)
            .and_then(join_key)
            .and_then(|key| by_key.get(&key))
            .cloned()
            .unwrap_or_default();

        if let Some(obj) = parent.as_object_mut() {
            let embedded = if relation.singular {
                matching.into_iter().next().unwrap_or(Value::Null)
            } else {
                Value::Array(matching)
            };
            obj.insert(name.to_string(), embedded);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parent_keys_dedupe_and_skip_null() {
        let records = vec![
            json!({"id": "a", "user_id": "u1"}),
            json!({"id": "b", "user_id": "u1"}),
            json!({"id": "c", "user_id": null}),
            json!({"id": "d"}),
            json!({"id": "e", "user_id": 7}),
        ];
        assert_eq!(
            parent_keys(&records, "user_id"),
            vec![FilterValue::String("u1".into()), FilterValue::Integer(7)]
        );
    }

    #[test]
    fn distribute_many() {
        let mut parents = vec![json!({"id": "d1"}), json!({"id": "d2"})];
        let relation = RelationSpec::many("reviews", "id", "doctor_id");
        let children = vec![
            json!({"id": "r1", "doctor_id": "d1"}),
            json!({"id": "r2", "doctor_id": "d1"}),
            json!({"id": "r3", "doctor_id": "x"}),
        ];
        distribute(&mut parents, "reviews", &relation, children);

        assert_eq!(parents[0]["reviews"].as_array().unwrap().len(), 2);
        assert_eq!(parents[1]["reviews"], json!([]));
    }

    #[test]
    fn distribute_singular() {
        let mut parents = vec![
            json!({"id": "d1", "user_id": "u1"}),
            json!({"id": "d2", "user_id": null}),
        ];
        let relation = RelationSpec::one("users", "user_id", "id");
        let children = vec![json!({"id": "u1", "email": "a@b.c"})];
        distribute(&mut parents, "user", &relation, children);

        assert_eq!(parents[0]["user"]["email"], "a@b.c");
        assert_eq!(parents[1]["user"], Value::Null);
    }

    #[test]
    fn distribute_with_no_children_embeds_empty() {
        let mut parents = vec![json!({"id": "d1"})];
        distribute(
            &mut parents,
            "schedules",
            &RelationSpec::many("doctor_schedules", "id", "doctor_id"),
            Vec::new(),
        );
        assert_eq!(parents[0]["schedules"], json!([]));
    }
}
