//! SQL generation for compiled list queries using SeaQuery.
//!
//! Renders PostgreSQL for:
//! - the page query (projection, filter tree, ordering, LIMIT/OFFSET)
//! - the count query (filter tree only)
//! - batched relation loads (`foreign_field IN (...)`)
//!
//! Dotted field paths resolve through the entity's relations into correlated
//! `EXISTS` subqueries. A condition that cannot be compiled becomes `FALSE`.

use sea_query::{
    Alias, Asterisk, Cond, Expr, ExprTrait, Func, Order, PostgresQueryBuilder, Query,
    SelectStatement, SimpleExpr, Value,
};

use super::types::{
    CompiledQuerySpec, Condition, CountSpec, EntitySchema, FilterOperator, FilterValue,
    IncludeTree, Predicate, RelationSpec, SortDirection,
};

/// PostgreSQL rejects offsets beyond `BIGINT`.
const MAX_OFFSET: u64 = i64::MAX as u64;

/// Query builder for one entity.
pub struct SqlQueryBuilder<'a> {
    schema: &'a EntitySchema,
}

impl<'a> SqlQueryBuilder<'a> {
    pub fn new(schema: &'a EntitySchema) -> Self {
        Self { schema }
    }

    /// Build the page SELECT.
    pub fn build(&self, spec: &CompiledQuerySpec) -> String {
        let table = &self.schema.table;
        let mut query = Query::select();

        match &spec.select {
            Some(columns) => {
                for column in columns {
                    query.column((Alias::new(table), Alias::new(column)));
                }
            }
            None => {
                query.column((Alias::new(table), Asterisk));
            }
        }

        query.from(Alias::new(table));
        self.add_filter(&mut query, spec.filter().as_ref());

        if let Some(order_by) = &spec.order_by {
            let order = match order_by.direction {
                SortDirection::Asc => Order::Asc,
                SortDirection::Desc => Order::Desc,
            };
            query.order_by((Alias::new(table), Alias::new(&order_by.field)), order);
        }

        if let Some(take) = spec.take {
            query.limit(take);
        }
        if spec.skip > 0 {
            query.offset(spec.skip.min(MAX_OFFSET));
        }

        query.to_string(PostgresQueryBuilder)
    }

    /// Build a COUNT query sharing the page query's filter.
    pub fn build_count(&self, spec: &CountSpec) -> String {
        let mut query = Query::select();
        query.expr(Expr::col(Asterisk).count());
        query.from(Alias::new(&self.schema.table));
        self.add_filter(&mut query, spec.filter.as_ref());
        query.to_string(PostgresQueryBuilder)
    }

    fn add_filter(&self, query: &mut SelectStatement, filter: Option<&Predicate>) {
        if let Some(predicate) = filter {
            query.and_where(compile_predicate(
                &self.schema.table,
                &self.schema.relations,
                predicate,
                0,
            ));
        }
    }
}

/// Build a batched load of related rows whose join key is one of `keys`.
/// Returns `None` when there is nothing to load.
pub fn build_relation(relation: &RelationSpec, keys: &[FilterValue], limit: u64) -> Option<String> {
    let values: Vec<Value> = keys.iter().filter_map(sql_value).collect();
    if values.is_empty() {
        return None;
    }

    let table = Alias::new(&relation.table);
    let mut query = Query::select();
    match relation.columns() {
        Some(columns) => {
            for column in columns {
                query.column((table.clone(), Alias::new(column)));
            }
        }
        None => {
            query.column((table.clone(), Asterisk));
        }
    }
    query
        .from(table.clone())
        .and_where(Expr::col((table, Alias::new(&relation.foreign_field))).is_in(values))
        .limit(limit);

    Some(query.to_string(PostgresQueryBuilder))
}

fn compile_predicate(
    table: &str,
    relations: &IncludeTree,
    predicate: &Predicate,
    depth: usize,
) -> SimpleExpr {
    match predicate {
        Predicate::Condition(condition) => compile_condition(table, relations, condition, depth),
        Predicate::And(children) => {
            if children.is_empty() {
                return Expr::cust("TRUE");
            }
            children
                .iter()
                .fold(Cond::all(), |cond, child| {
                    cond.add(compile_predicate(table, relations, child, depth))
                })
                .into()
        }
        Predicate::Or(children) => {
            if children.is_empty() {
                return Expr::cust("FALSE");
            }
            children
                .iter()
                .fold(Cond::any(), |cond, child| {
                    cond.add(compile_predicate(table, relations, child, depth))
                })
                .into()
        }
        Predicate::Not(inner) => Cond::all()
            .not()
            .add(compile_predicate(table, relations, inner, depth))
            .into(),
    }
}

/// Compile a leaf. Dotted paths become `EXISTS` over the named relation.
fn compile_condition(
    table: &str,
    relations: &IncludeTree,
    condition: &Condition,
    depth: usize,
) -> SimpleExpr {
    let Some((name, rest)) = condition.field.split_once('.') else {
        let column = Expr::col((Alias::new(table), Alias::new(&condition.field)));
        return compare(column.into(), condition);
    };

    let Some(relation) = relations.get(name) else {
        tracing::error!(
            field = %condition.field,
            "field path names an unknown relation; restricting results"
        );
        return Expr::cust("FALSE");
    };

    let alias = format!("{name}_{depth}");
    let nested = Condition {
        field: rest.to_string(),
        ..condition.clone()
    };

    let mut subquery = Query::select();
    subquery
        .expr(Expr::cust("1"))
        .from_as(Alias::new(&relation.table), Alias::new(&alias))
        .and_where(
            Expr::col((Alias::new(&alias), Alias::new(&relation.foreign_field)))
                .equals((Alias::new(table), Alias::new(&relation.local_field))),
        )
        .and_where(compile_condition(
            &alias,
            &relation.include,
            &nested,
            depth + 1,
        ));

    Expr::exists(subquery)
}

fn compare(column: SimpleExpr, condition: &Condition) -> SimpleExpr {
    let value = &condition.value;
    match condition.operator {
        FilterOperator::Contains => {
            let Some(term) = value.as_string() else {
                return restrict(condition);
            };
            if condition.case_insensitive {
                let pattern = format!("%{}%", escape_like_wildcards(&term.to_lowercase()));
                Expr::expr(Func::lower(column)).like(pattern)
            } else {
                column.like(format!("%{}%", escape_like_wildcards(&term)))
            }
        }
        FilterOperator::In | FilterOperator::NotIn => {
            let FilterValue::List(items) = value else {
                return restrict(condition);
            };
            let values: Vec<Value> = items.iter().filter_map(sql_value).collect();
            if values.is_empty() || values.len() != items.len() {
                return restrict(condition);
            }
            if condition.operator == FilterOperator::In {
                column.is_in(values)
            } else {
                column.is_not_in(values)
            }
        }
        FilterOperator::Equals => scalar(condition).map_or_else(|| restrict(condition), |v| column.eq(v)),
        FilterOperator::Not => scalar(condition).map_or_else(|| restrict(condition), |v| column.ne(v)),
        FilterOperator::GreaterThan => {
            scalar(condition).map_or_else(|| restrict(condition), |v| column.gt(v))
        }
        FilterOperator::GreaterOrEqual => {
            scalar(condition).map_or_else(|| restrict(condition), |v| column.gte(v))
        }
        FilterOperator::LessThan => {
            scalar(condition).map_or_else(|| restrict(condition), |v| column.lt(v))
        }
        FilterOperator::LessOrEqual => {
            scalar(condition).map_or_else(|| restrict(condition), |v| column.lte(v))
        }
    }
}

fn scalar(condition: &Condition) -> Option<Value> {
    sql_value(&condition.value)
}

fn restrict(condition: &Condition) -> SimpleExpr {
    tracing::error!(
        field = %condition.field,
        operator = ?condition.operator,
        "condition value does not fit its operator; restricting results"
    );
    Expr::cust("FALSE")
}

/// SQL literal for a scalar filter value. Lists have none.
pub fn sql_value(value: &FilterValue) -> Option<Value> {
    match value {
        FilterValue::String(s) => Some(Value::from(s.clone())),
        FilterValue::Integer(i) => Some(Value::from(*i)),
        FilterValue::Float(f) => Some(Value::from(*f)),
        FilterValue::Boolean(b) => Some(Value::from(*b)),
        FilterValue::Uuid(u) => Some(Value::from(*u)),
        FilterValue::List(_) => None,
    }
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::query::types::OrderBy;

    fn schema() -> EntitySchema {
        EntitySchema::new("doctors")
            .with_relation("user", RelationSpec::one("users", "user_id", "id"))
            .with_relation(
                "specialties",
                RelationSpec::many("doctor_specialties", "id", "doctor_id").with_include(
                    "specialty",
                    RelationSpec::one("specialties", "specialty_id", "id"),
                ),
            )
    }

    fn spec_with(filter: Predicate) -> CompiledQuerySpec {
        CompiledQuerySpec {
            where_clause: vec![filter],
            ..Default::default()
        }
    }

    #[test]
    fn page_query_build() {
        let schema = schema();
        let spec = CompiledQuerySpec {
            where_clause: vec![Predicate::equals("is_deleted", FilterValue::Boolean(false))],
            order_by: Some(OrderBy::new("created_at", SortDirection::Desc)),
            skip: 20,
            take: Some(10),
            ..Default::default()
        };
        let sql = SqlQueryBuilder::new(&schema).build(&spec);

        assert!(sql.contains("SELECT \"doctors\".* FROM \"doctors\""), "{sql}");
        assert!(sql.contains("\"doctors\".\"is_deleted\" = FALSE"), "{sql}");
        assert!(sql.contains("ORDER BY \"doctors\".\"created_at\" DESC"), "{sql}");
        assert!(sql.contains("LIMIT 10"), "{sql}");
        assert!(sql.contains("OFFSET 20"), "{sql}");
    }

    #[test]
    fn projection_selects_columns() {
        let schema = schema();
        let spec = CompiledQuerySpec {
            select: Some(vec!["name".to_string(), "user_id".to_string()]),
            ..Default::default()
        };
        let sql = SqlQueryBuilder::new(&schema).build(&spec);
        assert!(sql.contains("\"doctors\".\"name\", \"doctors\".\"user_id\""), "{sql}");
        assert!(!sql.contains('*'), "{sql}");
    }

    #[test]
    fn count_query_build() {
        let schema = schema();
        let count = CountSpec {
            filter: Some(Predicate::equals("gender", FilterValue::String("MALE".into()))),
        };
        let sql = SqlQueryBuilder::new(&schema).build_count(&count);

        assert!(sql.contains("COUNT(*)"), "{sql}");
        assert!(sql.contains("FROM \"doctors\""), "{sql}");
        assert!(sql.contains("'MALE'"), "{sql}");
        assert!(!sql.contains("LIMIT"), "{sql}");
        assert!(!sql.contains("ORDER BY"), "{sql}");
    }

    #[test]
    fn search_compiles_to_lower_like() {
        let schema = schema();
        let spec = spec_with(Predicate::or(vec![
            Predicate::contains("name", "John"),
            Predicate::contains("email", "John"),
        ]));
        let sql = SqlQueryBuilder::new(&schema).build(&spec);

        assert!(sql.contains("LOWER(\"doctors\".\"name\") LIKE '%john%'"), "{sql}");
        assert!(sql.contains(" OR "), "{sql}");
    }

    #[test]
    fn like_wildcards_escaped() {
        let schema = schema();
        let sql = SqlQueryBuilder::new(&schema).build(&spec_with(Predicate::contains("name", "100%_done")));
        assert!(
            sql.contains("100\\\\%\\\\_done") || sql.contains("100\\%\\_done"),
            "LIKE wildcards should be escaped: {sql}"
        );
        assert!(!sql.contains("%100%_done%"), "{sql}");
    }

    #[test]
    fn escape_like_wildcards_function() {
        assert_eq!(escape_like_wildcards("hello"), "hello");
        assert_eq!(escape_like_wildcards("100%"), "100\\%");
        assert_eq!(escape_like_wildcards("a_b"), "a\\_b");
        assert_eq!(escape_like_wildcards("a\\b"), "a\\\\b");
    }

    #[test]
    fn relation_path_compiles_to_exists() {
        let schema = schema();
        let spec = spec_with(Predicate::contains("specialties.specialty.title", "Cardio"));
        let sql = SqlQueryBuilder::new(&schema).build(&spec);

        assert!(sql.contains("EXISTS"), "{sql}");
        assert!(sql.contains("\"doctor_specialties\" AS \"specialties_0\""), "{sql}");
        assert!(
            sql.contains("\"specialties_0\".\"doctor_id\" = \"doctors\".\"id\""),
            "{sql}"
        );
        assert!(sql.contains("\"specialties\" AS \"specialty_1\""), "{sql}");
        assert!(sql.contains("LOWER(\"specialty_1\".\"title\") LIKE '%cardio%'"), "{sql}");
    }

    #[test]
    fn unknown_relation_restricts() {
        let schema = schema();
        let spec = spec_with(Predicate::equals("billing.iban", FilterValue::String("x".into())));
        let sql = SqlQueryBuilder::new(&schema).build(&spec);
        assert!(sql.contains("WHERE FALSE"), "{sql}");
    }

    #[test]
    fn mismatched_value_restricts() {
        let schema = schema();
        let spec = spec_with(Predicate::condition(
            "experience",
            FilterOperator::In,
            FilterValue::Integer(3),
        ));
        let sql = SqlQueryBuilder::new(&schema).build(&spec);
        assert!(sql.contains("WHERE FALSE"), "{sql}");
    }

    #[test]
    fn empty_or_matches_nothing() {
        let schema = schema();
        let sql = SqlQueryBuilder::new(&schema).build(&spec_with(Predicate::or(vec![])));
        assert!(sql.contains("WHERE FALSE"), "{sql}");
    }

    #[test]
    fn list_and_range_operators() {
        let schema = schema();
        let spec = CompiledQuerySpec {
            where_clause: vec![
                Predicate::condition(
                    "experience",
                    FilterOperator::In,
                    FilterValue::List(vec![FilterValue::Integer(1), FilterValue::Integer(2)]),
                ),
                Predicate::condition(
                    "appointment_fee",
                    FilterOperator::LessOrEqual,
                    FilterValue::Float(500.5),
                ),
            ],
            ..Default::default()
        };
        let sql = SqlQueryBuilder::new(&schema).build(&spec);
        assert!(sql.contains("\"doctors\".\"experience\" IN (1, 2)"), "{sql}");
        assert!(sql.contains("\"doctors\".\"appointment_fee\" <= 500.5"), "{sql}");
    }

    #[test]
    fn relation_load_build() {
        let relation = RelationSpec::many("doctor_specialties", "id", "doctor_id");
        let keys = vec![FilterValue::String("a".into()), FilterValue::String("b".into())];
        let sql = build_relation(&relation, &keys, 1001).unwrap();

        assert!(sql.contains("FROM \"doctor_specialties\""), "{sql}");
        assert!(
            sql.contains("\"doctor_specialties\".\"doctor_id\" IN ('a', 'b')"),
            "{sql}"
        );
        assert!(sql.contains("LIMIT 1001"), "{sql}");
        assert!(build_relation(&relation, &[], 10).is_none());
    }

    #[test]
    fn huge_offset_is_clamped() {
        let schema = schema();
        let spec = CompiledQuerySpec {
            skip: u64::MAX,
            take: Some(10),
            ..Default::default()
        };
        let sql = SqlQueryBuilder::new(&schema).build(&spec);
        assert!(sql.contains(&format!("OFFSET {}", i64::MAX)), "{sql}");
    }
}
