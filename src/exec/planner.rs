//! Planner: SELECT AST → operator tree.
//!
//! A fixed rule sequence with no optimizer:
//!
//! 1. a relation-tagged scan per table;
//! 2. a hash join when a JOIN is present (the ON condition must be an
//!    equality of two `{n}` column references);
//! 3. a selection when a WHERE is present;
//! 4. a hash aggregation when GROUP BY or any select-list aggregate is
//!    present.
//!
//! ORDER BY and LIMIT are accepted by the parser but not executed.

use std::fmt;

use log::warn;

use crate::buffer::BufferManager;
use crate::exec::aggregate::{AggrFunc, AggrOp, HashAggregationOperator};
use crate::exec::join::HashJoinOperator;
use crate::exec::predicate::{CompareOp, LogicOp, Operand, Predicate};
use crate::exec::scan::ScanOperator;
use crate::exec::select::SelectOperator;
use crate::exec::{ExecError, Operator, Row};
use crate::field::Field;
use crate::sql::ast::{AggregateFunc, BinaryOp, Expr, Literal, SelectStmt};
use crate::sql::ParseError;

/// Errors from AST-to-operator translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// The JOIN condition is not an equality of two `{n}` column references.
    JoinNotSupported,
    /// A construct the planner cannot translate.
    Unsupported(String),
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::JoinNotSupported => {
                write!(f, "JOIN ON must equate two {{n}} column references")
            }
            PlanError::Unsupported(what) => write!(f, "unsupported in planner: {}", what),
        }
    }
}

impl std::error::Error for PlanError {}

/// Any failure on the parse–plan–execute path.
#[derive(Debug)]
pub enum QueryError {
    /// Lexing or parsing failed.
    Parse(ParseError),
    /// Planning failed.
    Plan(PlanError),
    /// Execution failed.
    Exec(ExecError),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Parse(e) => write!(f, "{}", e),
            QueryError::Plan(e) => write!(f, "{}", e),
            QueryError::Exec(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueryError::Parse(e) => Some(e),
            QueryError::Plan(e) => Some(e),
            QueryError::Exec(e) => Some(e),
        }
    }
}

impl From<ParseError> for QueryError {
    fn from(e: ParseError) -> Self {
        QueryError::Parse(e)
    }
}

impl From<PlanError> for QueryError {
    fn from(e: PlanError) -> Self {
        QueryError::Plan(e)
    }
}

impl From<ExecError> for QueryError {
    fn from(e: ExecError) -> Self {
        QueryError::Exec(e)
    }
}

/// Translates a statement into an executable operator tree.
///
/// # Errors
///
/// Fails with [`PlanError::JoinNotSupported`] for a non-`{n} = {m}` join
/// condition and [`PlanError::Unsupported`] for constructs outside the
/// planner's rules (named columns in predicates, NULL literals, AVG,
/// non-`{n}` GROUP BY or aggregate arguments).
pub fn plan<'a>(
    stmt: &SelectStmt,
    buffer: &'a BufferManager,
) -> Result<Box<dyn Operator + 'a>, PlanError> {
    let mut root: Box<dyn Operator + 'a> =
        Box::new(ScanOperator::with_relation(buffer, stmt.from.name.clone()));

    if let Some(join) = &stmt.join {
        let right = ScanOperator::with_relation(buffer, join.table.name.clone());
        let (left_attr, right_attr) = join_attrs(&join.condition)?;
        root = Box::new(HashJoinOperator::new(root, right, left_attr, right_attr));
    }

    if let Some(where_clause) = &stmt.where_clause {
        let predicate = expr_to_predicate(where_clause)?;
        root = Box::new(SelectOperator::new(root, predicate));
    }

    if !stmt.group_by.is_empty() || stmt.has_aggregates() {
        let mut group_attrs = Vec::with_capacity(stmt.group_by.len());
        for expr in &stmt.group_by {
            group_attrs.push(column_index(expr).ok_or_else(|| {
                PlanError::Unsupported("GROUP BY requires {n} column references".to_string())
            })?);
        }
        let aggregates = extract_aggregates(stmt)?;
        root = Box::new(HashAggregationOperator::new(root, group_attrs, aggregates));
    }

    if !stmt.order_by.is_empty() {
        warn!("ORDER BY is parsed but not executed");
    }
    if stmt.limit.is_some() {
        warn!("LIMIT is parsed but not executed");
    }

    Ok(root)
}

/// Parses, plans, and drains a query, returning all result rows.
pub fn execute_sql(query: &str, buffer: &BufferManager) -> Result<Vec<Row>, QueryError> {
    let stmt = crate::sql::parse(query)?;
    let mut root = plan(&stmt, buffer)?;

    let mut rows = Vec::new();
    root.open().map_err(|e| {
        root.close();
        e
    })?;
    loop {
        match root.next() {
            Ok(true) => rows.push(root.output()),
            Ok(false) => break,
            Err(e) => {
                root.close();
                return Err(e.into());
            }
        }
    }
    root.close();
    Ok(rows)
}

/// Extracts the zero-based join attribute pair from an ON condition of the
/// form `{n} = {m}`.
fn join_attrs(condition: &Expr) -> Result<(usize, usize), PlanError> {
    if let Expr::Binary {
        op: BinaryOp::Eq,
        left,
        right,
    } = condition
    {
        if let (Some(left_attr), Some(right_attr)) = (column_index(left), column_index(right)) {
            return Ok((left_attr, right_attr));
        }
    }
    Err(PlanError::JoinNotSupported)
}

/// Zero-based index of a `{n}` reference; `None` for any other expression.
fn column_index(expr: &Expr) -> Option<usize> {
    match expr {
        Expr::ColumnIndex(n) if *n >= 1 => Some(*n as usize - 1),
        _ => None,
    }
}

/// Translates a WHERE expression into a predicate tree.
fn expr_to_predicate(expr: &Expr) -> Result<Predicate, PlanError> {
    match expr {
        Expr::Binary { op, left, right } => match op {
            BinaryOp::And | BinaryOp::Or => {
                let logic = if *op == BinaryOp::And {
                    LogicOp::And
                } else {
                    LogicOp::Or
                };
                Ok(Predicate::Boolean {
                    op: logic,
                    children: vec![expr_to_predicate(left)?, expr_to_predicate(right)?],
                })
            }
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le
            | BinaryOp::Ge => {
                let compare = match op {
                    BinaryOp::Eq => CompareOp::Eq,
                    BinaryOp::Ne => CompareOp::Ne,
                    BinaryOp::Lt => CompareOp::Lt,
                    BinaryOp::Gt => CompareOp::Gt,
                    BinaryOp::Le => CompareOp::Le,
                    _ => CompareOp::Ge,
                };
                Ok(Predicate::compare(
                    expr_to_operand(left)?,
                    compare,
                    expr_to_operand(right)?,
                ))
            }
        },
        other => Err(PlanError::Unsupported(format!(
            "expression in WHERE: {:?}",
            other
        ))),
    }
}

/// Translates a comparison operand.
///
/// Integer literals narrow from 64 to 32 bits; float literals narrow to
/// int32 with precision loss, matching the engine's 32-bit field types.
fn expr_to_operand(expr: &Expr) -> Result<Operand, PlanError> {
    match expr {
        Expr::ColumnIndex(_) => {
            let index = column_index(expr)
                .ok_or_else(|| PlanError::Unsupported("column reference {0}".to_string()))?;
            Ok(Operand::Column(index))
        }
        Expr::Column { .. } => Err(PlanError::Unsupported(
            "named columns require a schema lookup".to_string(),
        )),
        Expr::Literal(Literal::Int(v)) => Ok(Operand::Literal(Field::Int(*v as i32))),
        Expr::Literal(Literal::Str(s)) => Ok(Operand::Literal(Field::Str(s.clone()))),
        Expr::Literal(Literal::Float(v)) => Ok(Operand::Literal(Field::Int(*v as i32))),
        Expr::Literal(Literal::Null) => Err(PlanError::Unsupported(
            "NULL in predicates".to_string(),
        )),
        other => Err(PlanError::Unsupported(format!(
            "operand expression: {:?}",
            other
        ))),
    }
}

/// Collects the select list's aggregates.
fn extract_aggregates(stmt: &SelectStmt) -> Result<Vec<AggrFunc>, PlanError> {
    let mut aggregates = Vec::new();
    for column in &stmt.columns {
        if let Expr::Aggregate { func, arg } = column {
            let op = match func {
                AggregateFunc::Sum => AggrOp::Sum,
                AggregateFunc::Count => AggrOp::Count,
                AggregateFunc::Min => AggrOp::Min,
                AggregateFunc::Max => AggrOp::Max,
                AggregateFunc::Avg => {
                    return Err(PlanError::Unsupported("AVG".to_string()));
                }
            };
            let attr = column_index(arg).ok_or_else(|| {
                PlanError::Unsupported(
                    "aggregate argument must be a {n} column reference".to_string(),
                )
            })?;
            aggregates.push(AggrFunc { op, attr });
        }
    }
    Ok(aggregates)
}
