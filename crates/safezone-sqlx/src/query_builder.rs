// Query builder: converts core adapter types into SQL fragments.
//
// Generates SQL with positional bind parameters ($1, $2, ...), which both
// SQLite and Postgres accept through the sqlx `Any` driver.

use safezone_core::db::adapter::{FindManyQuery, Operator, SortDirection, WhereClause};

/// A built SQL fragment with its bind values.
#[derive(Debug, Clone)]
pub struct SqlFragment {
    pub sql: String,
    pub binds: Vec<serde_json::Value>,
}

impl SqlFragment {
    pub fn empty() -> Self {
        Self {
            sql: String::new(),
            binds: Vec::new(),
        }
    }
}

/// Build a WHERE clause. Returns " WHERE ..." or an empty fragment when
/// there are no clauses. `bind_offset` is the number of placeholders already
/// used by the statement.
pub fn build_where(clauses: &[WhereClause], bind_offset: usize) -> SqlFragment {
    if clauses.is_empty() {
        return SqlFragment::empty();
    }

    let mut sql = String::from(" WHERE ");
    let mut binds = Vec::new();
    let mut param_idx = bind_offset + 1;

    for (i, clause) in clauses.iter().enumerate() {
        if i > 0 {
            sql.push_str(" AND ");
        }

        let quoted_field = quote_identifier(&clause.field);
        match (clause.operator, clause.value.is_null()) {
            (Operator::Eq, true) => sql.push_str(&format!("{quoted_field} IS NULL")),
            (Operator::Ne, true) => sql.push_str(&format!("{quoted_field} IS NOT NULL")),
            (op, false) => {
                let symbol = if op == Operator::Eq { "=" } else { "!=" };
                sql.push_str(&format!("{quoted_field} {symbol} ${param_idx}"));
                binds.push(clause.value.clone());
                param_idx += 1;
            }
        }
    }

    SqlFragment { sql, binds }
}

pub fn build_order_by(query: &FindManyQuery) -> String {
    match &query.sort_by {
        Some(sort) => {
            let dir = match sort.direction {
                SortDirection::Asc => "ASC",
                SortDirection::Desc => "DESC",
            };
            format!(" ORDER BY {} {}", quote_identifier(&sort.field), dir)
        }
        None => String::new(),
    }
}

pub fn build_limit(query: &FindManyQuery) -> String {
    query
        .limit
        .map(|limit| format!(" LIMIT {limit}"))
        .unwrap_or_default()
}

/// Build `INSERT ... RETURNING *`. Null values are left out so the column
/// falls back to its default (or NULL) without binding an untyped null.
pub fn build_insert(table: &str, data: &serde_json::Value) -> SqlFragment {
    let Some(obj) = data.as_object() else {
        return SqlFragment::empty();
    };

    let mut columns = Vec::new();
    let mut placeholders = Vec::new();
    let mut binds = Vec::new();

    for (key, value) in obj.iter().filter(|(_, v)| !v.is_null()) {
        columns.push(quote_identifier(key));
        placeholders.push(format!("${}", binds.len() + 1));
        binds.push(value.clone());
    }

    let sql = if columns.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING *", quote_identifier(table))
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            quote_identifier(table),
            columns.join(", "),
            placeholders.join(", ")
        )
    };

    SqlFragment { sql, binds }
}

/// Build the SET portion of an UPDATE from a JSON object.
pub fn build_update_set(data: &serde_json::Value, bind_offset: usize) -> SqlFragment {
    let Some(obj) = data.as_object() else {
        return SqlFragment::empty();
    };

    let mut set_parts = Vec::new();
    let mut binds = Vec::new();
    let mut param_idx = bind_offset + 1;

    for (key, value) in obj {
        set_parts.push(format!("{} = ${}", quote_identifier(key), param_idx));
        binds.push(value.clone());
        param_idx += 1;
    }

    SqlFragment {
        sql: set_parts.join(", "),
        binds,
    }
}

/// Build `UPDATE t SET ... WHERE ... RETURNING *`.
pub fn build_update(table: &str, where_clauses: &[WhereClause], data: &serde_json::Value) -> SqlFragment {
    let set_frag = build_update_set(data, 0);
    let where_frag = build_where(where_clauses, set_frag.binds.len());
    let mut binds = set_frag.binds;
    binds.extend(where_frag.binds);

    SqlFragment {
        sql: format!(
            "UPDATE {} SET {}{} RETURNING *",
            quote_identifier(table),
            set_frag.sql,
            where_frag.sql
        ),
        binds,
    }
}

/// Build `UPDATE t SET f = f + $1 WHERE ... RETURNING *`.
pub fn build_increment(table: &str, where_clauses: &[WhereClause], field: &str, by: i64) -> SqlFragment {
    let column = quote_identifier(field);
    let where_frag = build_where(where_clauses, 1);
    let mut binds = vec![serde_json::Value::from(by)];
    binds.extend(where_frag.binds);

    SqlFragment {
        sql: format!(
            "UPDATE {} SET {column} = {column} + $1{} RETURNING *",
            quote_identifier(table),
            where_frag.sql
        ),
        binds,
    }
}

/// Quote a SQL identifier (table/column name). Double quotes work for both
/// SQLite and Postgres; embedded quotes are stripped.
pub fn quote_identifier(name: &str) -> String {
    let clean = name.replace('"', "");
    format!("\"{clean}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use safezone_core::db::adapter::SortBy;
    use serde_json::json;

    #[test]
    fn test_build_where_empty() {
        let frag = build_where(&[], 0);
        assert!(frag.sql.is_empty());
        assert!(frag.binds.is_empty());
    }

    #[test]
    fn test_build_where_eq_and_offset() {
        let frag = build_where(&[WhereClause::eq("email", "ana@safezone.ph")], 2);
        assert_eq!(frag.sql, " WHERE \"email\" = $3");
        assert_eq!(frag.binds, vec![json!("ana@safezone.ph")]);
    }

    #[test]
    fn test_build_where_null_and_ne() {
        let frag = build_where(
            &[
                WhereClause::eq("volunteer_id", serde_json::Value::Null),
                WhereClause::ne("status", "completed"),
            ],
            0,
        );
        assert_eq!(
            frag.sql,
            " WHERE \"volunteer_id\" IS NULL AND \"status\" != $1"
        );
        assert_eq!(frag.binds.len(), 1);
    }

    #[test]
    fn test_order_and_limit() {
        let query = FindManyQuery {
            limit: Some(5),
            ..Default::default()
        }
        .sorted(SortBy::desc("id"));
        assert_eq!(build_order_by(&query), " ORDER BY \"id\" DESC");
        assert_eq!(build_limit(&query), " LIMIT 5");
        assert_eq!(build_limit(&FindManyQuery::default()), "");
    }

    #[test]
    fn test_build_insert_skips_nulls() {
        let frag = build_insert(
            "tasks",
            &json!({"title": "Sweep", "created_by": null, "points": 30}),
        );
        assert!(frag.sql.starts_with("INSERT INTO \"tasks\""));
        assert!(frag.sql.ends_with("RETURNING *"));
        assert!(!frag.sql.contains("created_by"));
        assert_eq!(frag.binds.len(), 2);
    }

    #[test]
    fn test_build_update() {
        let frag = build_update("tasks", &[WhereClause::eq("id", 4)], &json!({"status": "completed"}));
        assert_eq!(
            frag.sql,
            "UPDATE \"tasks\" SET \"status\" = $1 WHERE \"id\" = $2 RETURNING *"
        );
        assert_eq!(frag.binds, vec![json!("completed"), json!(4)]);
    }

    #[test]
    fn test_build_increment() {
        let frag = build_increment("users", &[WhereClause::eq("id", 7)], "points", 25);
        assert_eq!(
            frag.sql,
            "UPDATE \"users\" SET \"points\" = \"points\" + $1 WHERE \"id\" = $2 RETURNING *"
        );
        assert_eq!(frag.binds, vec![json!(25), json!(7)]);
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users"), "\"users\"");
        assert_eq!(quote_identifier("a\"b"), "\"ab\"");
    }
}
