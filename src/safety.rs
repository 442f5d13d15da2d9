//! Read-only guard for catalog SQL.
//!
//! Catalog templates are reports: every one must be a single statement that
//! reads data and never writes it. Templates are parsed with the PostgreSQL
//! dialect at registration time, after their placeholders have been rendered
//! as `$n` markers.

use sqlparser::ast::{Query, Select, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

/// Outcome of inspecting one SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// A single statement that only reads.
    ReadOnly,
    /// The text writes, locks, or could not be understood. Carries the reason.
    Rejected(String),
}

impl Verdict {
    /// Returns true if the SQL only reads data.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Verdict::ReadOnly)
    }
}

/// Inspects `sql` and decides whether it is a single read-only statement.
pub fn check_read_only(sql: &str) -> Verdict {
    let statements = match Parser::parse_sql(&PostgreSqlDialect {}, sql) {
        Ok(statements) => statements,
        Err(e) => return Verdict::Rejected(format!("could not parse SQL: {e}")),
    };

    match statements.as_slice() {
        [] => Verdict::Rejected("empty SQL statement".to_string()),
        [statement] => match statement_writes(statement) {
            Some(reason) => Verdict::Rejected(reason.to_string()),
            None => Verdict::ReadOnly,
        },
        _ => Verdict::Rejected(format!(
            "expected exactly one statement, found {}",
            statements.len()
        )),
    }
}

/// Returns why a statement is not read-only, or `None` if it is.
fn statement_writes(statement: &Statement) -> Option<&'static str> {
    match statement {
        Statement::Query(query) => query_writes(query),
        // EXPLAIN ANALYZE runs the inner statement
        Statement::Explain {
            analyze, statement, ..
        } => {
            if *analyze {
                statement_writes(statement)
            } else {
                None
            }
        }
        Statement::Insert(_) => Some("INSERT modifies data"),
        Statement::Update { .. } => Some("UPDATE modifies data"),
        Statement::Delete(_) => Some("DELETE removes data"),
        Statement::Merge { .. } => Some("MERGE modifies data"),
        Statement::Drop { .. } | Statement::Truncate { .. } => Some("statement removes data"),
        _ => Some("only SELECT queries are allowed in a catalog"),
    }
}

fn query_writes(query: &Query) -> Option<&'static str> {
    if !query.locks.is_empty() {
        return Some("row locking clauses (FOR UPDATE/SHARE) are not allowed");
    }

    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            if let Some(reason) = query_writes(&cte.query) {
                return Some(reason);
            }
        }
    }

    set_expr_writes(&query.body)
}

fn set_expr_writes(set_expr: &SetExpr) -> Option<&'static str> {
    match set_expr {
        SetExpr::Select(select) => select_writes(select),
        SetExpr::Query(query) => query_writes(query),
        SetExpr::SetOperation { left, right, .. } => {
            set_expr_writes(left).or_else(|| set_expr_writes(right))
        }
        SetExpr::Values(_) | SetExpr::Table(_) => None,
        // Data-modifying CTE bodies (INSERT/UPDATE/DELETE ... RETURNING)
        _ => Some("data-modifying statement inside query"),
    }
}

fn select_writes(select: &Select) -> Option<&'static str> {
    if select.into.is_some() {
        return Some("SELECT INTO creates a table");
    }
    select.from.iter().find_map(table_with_joins_writes)
}

fn table_with_joins_writes(twj: &TableWithJoins) -> Option<&'static str> {
    table_factor_writes(&twj.relation).or_else(|| {
        twj.joins
            .iter()
            .find_map(|join| table_factor_writes(&join.relation))
    })
}

fn table_factor_writes(factor: &TableFactor) -> Option<&'static str> {
    match factor {
        TableFactor::Derived { subquery, .. } => query_writes(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => table_with_joins_writes(table_with_joins),
        _ => None,
    }
}
