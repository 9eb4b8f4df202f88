//! Recursive-descent SQL parser.
//!
//! One method per grammar rule. Precedence, low to high:
//! `OR < AND < NOT < comparison < primary`. Fails fast on the first error;
//! there is no recovery.
//!
//! Accepted grammar:
//!
//! ```text
//! select_stmt  := SELECT select_list FROM table_ref
//!                 [ JOIN table_ref ON expr ]
//!                 [ WHERE expr ]
//!                 [ aggregate ]                 legacy: SUM{n} after WHERE
//!                 [ GROUP BY expr { , expr } ]
//!                 [ ORDER BY expr [ASC|DESC] { , ... } ]
//!                 [ LIMIT int_lit ]
//! select_list  := select_item { , select_item }
//! select_item  := aggregate | * | expr
//! aggregate    := (SUM|COUNT|MIN|MAX|AVG) ( COLUMN_REF | '(' expr ')' )
//! table_ref    := IDENT [ IDENT ]
//! ```

use crate::sql::ast::{
    AggregateFunc, BinaryOp, Expr, JoinClause, Literal, OrderDir, SelectStmt, TableRef, UnaryOp,
};
use crate::sql::error::ParseError;
use crate::sql::lexer::Lexer;
use crate::sql::token::{Token, TokenKind};

/// Parses a SQL string into a [`SelectStmt`].
pub fn parse(query: &str) -> Result<SelectStmt, ParseError> {
    let tokens = Lexer::new(query).tokenize()?;
    Parser::new(tokens).parse_select()
}

/// Token-stream parser.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Creates a parser over a token stream ending in `Eof`.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parses one SELECT statement.
    pub fn parse_select(&mut self) -> Result<SelectStmt, ParseError> {
        self.expect(&TokenKind::Select, "expected SELECT")?;

        let mut columns = vec![self.parse_select_item()?];
        while self.matches(&TokenKind::Comma) {
            columns.push(self.parse_select_item()?);
        }

        self.expect(&TokenKind::From, "expected FROM")?;
        let from = self.parse_table_ref()?;

        let mut stmt = SelectStmt::new(from);
        stmt.columns = columns;

        if self.matches(&TokenKind::Join) {
            let table = self.parse_table_ref()?;
            self.expect(&TokenKind::On, "expected ON after JOIN table")?;
            let condition = self.parse_expr()?;
            stmt.join = Some(JoinClause { table, condition });
        }

        if self.matches(&TokenKind::Where) {
            stmt.where_clause = Some(self.parse_expr()?);
        }

        // Legacy position: an aggregate after WHERE replaces the select list.
        if self.check_aggregate() {
            let aggregate = self.parse_aggregate()?;
            stmt.columns = vec![aggregate];
        }

        if self.matches(&TokenKind::Group) {
            self.expect(&TokenKind::By, "expected BY after GROUP")?;
            stmt.group_by.push(self.parse_expr()?);
            while self.matches(&TokenKind::Comma) {
                stmt.group_by.push(self.parse_expr()?);
            }
        }

        if self.matches(&TokenKind::Order) {
            self.expect(&TokenKind::By, "expected BY after ORDER")?;
            loop {
                let expr = self.parse_expr()?;
                let dir = if self.matches(&TokenKind::Desc) {
                    OrderDir::Desc
                } else {
                    self.matches(&TokenKind::Asc);
                    OrderDir::Asc
                };
                stmt.order_by.push((expr, dir));
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }

        if self.matches(&TokenKind::Limit) {
            let token = self.advance().clone();
            match token.kind {
                TokenKind::IntLit(n) => stmt.limit = Some(n),
                _ => {
                    return Err(self.error_at(&token, "expected integer after LIMIT"));
                }
            }
        }

        Ok(stmt)
    }

    // ---- token navigation ----

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> &Token {
        if !self.at_end() {
            self.pos += 1;
        }
        &self.tokens[self.pos - 1]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        !self.at_end() && self.peek().kind == *kind
    }

    fn matches(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, message: &str) -> Result<(), ParseError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            let found = self.peek();
            Err(ParseError::new(
                format!("{}, found {}", message, found.kind.display_name()),
                found.line,
                found.column,
            ))
        }
    }

    fn error_at(&self, token: &Token, message: &str) -> ParseError {
        ParseError::new(message, token.line, token.column)
    }

    // ---- grammar rules ----

    fn check_aggregate(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Sum | TokenKind::Count | TokenKind::Min | TokenKind::Max | TokenKind::Avg
        )
    }

    fn parse_select_item(&mut self) -> Result<Expr, ParseError> {
        if self.check_aggregate() {
            return self.parse_aggregate();
        }
        if self.matches(&TokenKind::Star) {
            return Ok(Expr::Star { table: None });
        }
        self.parse_expr()
    }

    fn parse_table_ref(&mut self) -> Result<TableRef, ParseError> {
        let token = self.advance().clone();
        let name = match token.kind {
            TokenKind::Ident(name) => name,
            _ => {
                return Err(self.error_at(&token, "expected table name"));
            }
        };

        let alias = match &self.peek().kind {
            TokenKind::Ident(alias) => {
                let alias = alias.clone();
                self.advance();
                Some(alias)
            }
            _ => None,
        };

        Ok(TableRef { name, alias })
    }

    fn parse_aggregate(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance().clone();
        let func = match token.kind {
            TokenKind::Sum => AggregateFunc::Sum,
            TokenKind::Count => AggregateFunc::Count,
            TokenKind::Min => AggregateFunc::Min,
            TokenKind::Max => AggregateFunc::Max,
            TokenKind::Avg => AggregateFunc::Avg,
            _ => {
                return Err(self.error_at(&token, "expected aggregate function"));
            }
        };

        // Legacy form without parentheses: SUM{3}.
        if let TokenKind::ColumnRef(index) = self.peek().kind {
            self.advance();
            return Ok(Expr::Aggregate {
                func,
                arg: Box::new(Expr::ColumnIndex(index)),
            });
        }

        self.expect(&TokenKind::LParen, "expected '(' after aggregate function")?;
        let arg = self.parse_expr()?;
        self.expect(&TokenKind::RParen, "expected ')' after aggregate argument")?;
        Ok(Expr::Aggregate {
            func,
            arg: Box::new(arg),
        })
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.matches(&TokenKind::Or) {
            let right = self.parse_and()?;
            left = Expr::binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        while self.matches(&TokenKind::And) {
            let right = self.parse_not()?;
            left = Expr::binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.matches(&TokenKind::Not) {
            let operand = self.parse_not()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_primary()?;

        let op = match self.peek().kind {
            TokenKind::Eq => Some(BinaryOp::Eq),
            TokenKind::Ne => Some(BinaryOp::Ne),
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::Le => Some(BinaryOp::Le),
            TokenKind::Ge => Some(BinaryOp::Ge),
            _ => None,
        };

        match op {
            Some(op) => {
                self.advance();
                let right = self.parse_primary()?;
                Ok(Expr::binary(left, op, right))
            }
            None => Ok(left),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance().clone();
        match token.kind {
            TokenKind::IntLit(n) => Ok(Expr::Literal(Literal::Int(n))),
            TokenKind::StrLit(s) => Ok(Expr::Literal(Literal::Str(s))),
            TokenKind::ColumnRef(n) => Ok(Expr::ColumnIndex(n)),
            TokenKind::Star => Ok(Expr::Star { table: None }),
            TokenKind::Ident(first) => {
                if self.matches(&TokenKind::Dot) {
                    if self.matches(&TokenKind::Star) {
                        return Ok(Expr::Star { table: Some(first) });
                    }
                    let next = self.advance().clone();
                    match next.kind {
                        TokenKind::Ident(name) => Ok(Expr::Column {
                            table: Some(first),
                            name,
                        }),
                        _ => Err(self.error_at(&next, "expected column name after '.'")),
                    }
                } else {
                    Ok(Expr::Column {
                        table: None,
                        name: first,
                    })
                }
            }
            TokenKind::LParen => {
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen, "expected ')' after expression")?;
                Ok(expr)
            }
            _ => Err(self.error_at(&token, "expected expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_select() {
        let stmt = parse("SELECT * FROM t").unwrap();
        assert_eq!(stmt.columns, vec![Expr::Star { table: None }]);
        assert_eq!(stmt.from.name, "t");
        assert!(stmt.join.is_none());
        assert!(stmt.where_clause.is_none());
    }

    #[test]
    fn test_braced_table_and_star() {
        let stmt = parse("SELECT {*} FROM {STUDENTS}").unwrap();
        assert_eq!(stmt.columns, vec![Expr::Star { table: None }]);
        assert_eq!(stmt.from.name, "STUDENTS");
    }

    #[test]
    fn test_table_alias() {
        let stmt = parse("SELECT * FROM students s").unwrap();
        assert_eq!(stmt.from.alias.as_deref(), Some("s"));
    }

    #[test]
    fn test_where_precedence() {
        let stmt = parse("SELECT * FROM t WHERE {1} > 5 AND {2} < 3 OR {3} = 1").unwrap();
        // OR binds loosest: (a AND b) OR c.
        match stmt.where_clause.unwrap() {
            Expr::Binary {
                op: BinaryOp::Or,
                left,
                ..
            } => match *left {
                Expr::Binary {
                    op: BinaryOp::And, ..
                } => {}
                other => panic!("expected AND under OR, got {:?}", other),
            },
            other => panic!("expected OR at root, got {:?}", other),
        }
    }

    #[test]
    fn test_not_precedence() {
        let stmt = parse("SELECT * FROM t WHERE NOT {1} = 2").unwrap();
        match stmt.where_clause.unwrap() {
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => match *operand {
                Expr::Binary {
                    op: BinaryOp::Eq, ..
                } => {}
                other => panic!("expected comparison under NOT, got {:?}", other),
            },
            other => panic!("expected NOT at root, got {:?}", other),
        }
    }

    #[test]
    fn test_join_on() {
        let stmt = parse("SELECT {*} FROM {A} JOIN {B} ON {1} = {1}").unwrap();
        let join = stmt.join.unwrap();
        assert_eq!(join.table.name, "B");
        assert_eq!(
            join.condition,
            Expr::binary(Expr::ColumnIndex(1), BinaryOp::Eq, Expr::ColumnIndex(1))
        );
    }

    #[test]
    fn test_legacy_aggregate_after_where() {
        let stmt = parse("SELECT {*} FROM {T} WHERE {1} > 2 SUM{3} GROUP BY {1}").unwrap();
        assert_eq!(
            stmt.columns,
            vec![Expr::Aggregate {
                func: AggregateFunc::Sum,
                arg: Box::new(Expr::ColumnIndex(3)),
            }]
        );
        assert_eq!(stmt.group_by, vec![Expr::ColumnIndex(1)]);
        assert!(stmt.where_clause.is_some());
    }

    #[test]
    fn test_aggregate_call_forms() {
        let stmt = parse("SELECT COUNT({2}), MIN({1}) FROM t").unwrap();
        assert_eq!(stmt.columns.len(), 2);
        assert!(stmt.has_aggregates());
    }

    #[test]
    fn test_order_by_and_limit() {
        let stmt = parse("SELECT * FROM t ORDER BY {1} DESC, {2} LIMIT 10").unwrap();
        assert_eq!(stmt.order_by.len(), 2);
        assert_eq!(stmt.order_by[0].1, OrderDir::Desc);
        assert_eq!(stmt.order_by[1].1, OrderDir::Asc);
        assert_eq!(stmt.limit, Some(10));
    }

    #[test]
    fn test_qualified_column() {
        let stmt = parse("SELECT t.x FROM t").unwrap();
        assert_eq!(
            stmt.columns,
            vec![Expr::Column {
                table: Some("t".into()),
                name: "x".into(),
            }]
        );
    }

    #[test]
    fn test_error_carries_position() {
        let err = parse("SELECT * FROM").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("table name"));

        let err = parse("SELECT * WHERE").unwrap_err();
        assert!(err.message.contains("expected FROM"));
    }

    #[test]
    fn test_limit_requires_integer() {
        assert!(parse("SELECT * FROM t LIMIT x").is_err());
    }
}
