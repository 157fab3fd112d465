use std::iter::Peekable;

use crate::{
    error::{Error, Result},
    sql::{
        parser::{
            ast::{Column, Consts, Expression, FromItem, JoinType, Operation, OrderDirection},
            lexer::{Keyword, Lexer, Token},
        },
        types::DataType,
    },
};

pub mod ast;
mod lexer;

/// SQL Parser - Converts tokens into an Abstract Syntax Tree (AST)
pub struct Parser<'a> {
    lexer: Peekable<Lexer<'a>>,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser {
            lexer: Lexer::new(input).peekable(),
        }
    }

    /// Parses exactly one statement, optionally terminated by a semicolon
    pub fn parse(&mut self) -> Result<ast::Statement> {
        let stmt = self.parse_statement()?;
        self.next_if_token(Token::Semicolon);
        if let Some(token) = self.peek()? {
            return Err(Error::Parse(format!("[Parser] Unexpected token {}", token)));
        }
        Ok(stmt)
    }

    fn parse_statement(&mut self) -> Result<ast::Statement> {
        match self.peek()? {
            Some(Token::Keyword(Keyword::Create)) => self.parse_ddl(),
            Some(Token::Keyword(Keyword::Select)) => self.parse_select(),
            Some(Token::Keyword(Keyword::Insert)) => self.parse_insert(),
            Some(t) => Err(Error::Parse(format!("[Parser] Unexpected token {}", t))),
            None => Err(Error::Parse("[Parser] Unexpected end of input".into())),
        }
    }

    fn parse_ddl(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Create))?;
        match self.next()? {
            Token::Keyword(Keyword::Table) => self.parse_ddl_create_table(),
            token => Err(Error::Parse(format!("[Parser] Unexpected token {}", token))),
        }
    }

    fn parse_ddl_create_table(&mut self) -> Result<ast::Statement> {
        let name = self.next_ident()?;
        self.next_expect(Token::OpenParen)?;

        let mut columns = Vec::new();
        loop {
            columns.push(self.parse_ddl_column()?);
            if self.next_if_token(Token::Comma).is_none() {
                break;
            }
        }
        self.next_expect(Token::CloseParen)?;
        Ok(ast::Statement::CreateTable { name, columns })
    }

    fn parse_ddl_column(&mut self) -> Result<Column> {
        let mut column = Column {
            name: self.next_ident()?,
            datatype: match self.next()? {
                Token::Keyword(Keyword::Int | Keyword::Integer) => DataType::Integer,
                Token::Keyword(Keyword::Bool | Keyword::Boolean) => DataType::Boolean,
                Token::Keyword(Keyword::Float | Keyword::Double) => DataType::Float,
                Token::Keyword(Keyword::String | Keyword::Text | Keyword::Varchar) => {
                    DataType::String
                }
                token => return Err(Error::Parse(format!("[Parser] Unexpected token {}", token))),
            },
            nullable: None,
            default: None,
        };

        // Column constraints: NULL, NOT NULL, DEFAULT expr
        while let Some(Token::Keyword(keyword)) = self.next_if_keyword() {
            match keyword {
                Keyword::Null => column.nullable = Some(true),
                Keyword::Not => {
                    self.next_expect(Token::Keyword(Keyword::Null))?;
                    column.nullable = Some(false);
                }
                Keyword::Default => column.default = Some(self.parse_expression()?),
                k => return Err(Error::Parse(format!("[Parser] Unexpected keyword {}", k))),
            }
        }
        Ok(column)
    }

    fn parse_select(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Select))?;
        let distinct = self.next_if_token(Token::Keyword(Keyword::Distinct)).is_some();

        let mut select = Vec::new();
        if self.next_if_token(Token::Asterisk).is_none() {
            loop {
                let expr = self.parse_expression()?;
                let alias = match self.next_if_token(Token::Keyword(Keyword::As)) {
                    Some(_) => Some(self.next_ident()?),
                    None => None,
                };
                select.push((expr, alias));
                if self.next_if_token(Token::Comma).is_none() {
                    break;
                }
            }
        }

        self.next_expect(Token::Keyword(Keyword::From))?;
        let from = self.parse_from_clause()?;

        let where_clause = match self.next_if_token(Token::Keyword(Keyword::Where)) {
            Some(_) => Some(self.parse_expression()?),
            None => None,
        };

        let mut order_by = Vec::new();
        if self.next_if_token(Token::Keyword(Keyword::Order)).is_some() {
            self.next_expect(Token::Keyword(Keyword::By))?;
            loop {
                let expr = self.parse_expression()?;
                let direction = match self.next_if(|t| {
                    matches!(t, Token::Keyword(Keyword::Asc | Keyword::Desc))
                }) {
                    Some(Token::Keyword(Keyword::Desc)) => OrderDirection::Desc,
                    _ => OrderDirection::Asc,
                };
                order_by.push((expr, direction));
                if self.next_if_token(Token::Comma).is_none() {
                    break;
                }
            }
        }

        let limit = match self.next_if_token(Token::Keyword(Keyword::Limit)) {
            Some(_) => Some(self.parse_expression()?),
            None => None,
        };
        let offset = match self.next_if_token(Token::Keyword(Keyword::Offset)) {
            Some(_) => Some(self.parse_expression()?),
            None => None,
        };

        Ok(ast::Statement::Select {
            distinct,
            select,
            from,
            where_clause,
            order_by,
            limit,
            offset,
        })
    }

    /// Parses `table { [CROSS | INNER | LEFT [OUTER]] JOIN table [ON expr] }`
    fn parse_from_clause(&mut self) -> Result<FromItem> {
        let mut item = FromItem::Table {
            name: self.next_ident()?,
        };
        while let Some(join_type) = self.parse_join_type()? {
            let right = FromItem::Table {
                name: self.next_ident()?,
            };
            let predicate = match join_type {
                JoinType::Cross => None,
                _ => {
                    self.next_expect(Token::Keyword(Keyword::On))?;
                    Some(self.parse_expression()?)
                }
            };
            item = FromItem::Join {
                left: Box::new(item),
                right: Box::new(right),
                join_type,
                predicate,
            };
        }
        Ok(item)
    }

    fn parse_join_type(&mut self) -> Result<Option<JoinType>> {
        let join_type = if self.next_if_token(Token::Keyword(Keyword::Join)).is_some() {
            return Ok(Some(JoinType::Inner));
        } else if self.next_if_token(Token::Keyword(Keyword::Cross)).is_some() {
            JoinType::Cross
        } else if self.next_if_token(Token::Keyword(Keyword::Inner)).is_some() {
            JoinType::Inner
        } else if self.next_if_token(Token::Keyword(Keyword::Left)).is_some() {
            self.next_if_token(Token::Keyword(Keyword::Outer));
            JoinType::Left
        } else {
            return Ok(None);
        };
        self.next_expect(Token::Keyword(Keyword::Join))?;
        Ok(Some(join_type))
    }

    fn parse_insert(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Insert))?;
        self.next_expect(Token::Keyword(Keyword::Into))?;
        let table_name = self.next_ident()?;

        let columns = match self.next_if_token(Token::OpenParen) {
            Some(_) => {
                let mut cols = Vec::new();
                loop {
                    cols.push(self.next_ident()?);
                    match self.next()? {
                        Token::CloseParen => break,
                        Token::Comma => {}
                        token => {
                            return Err(Error::Parse(format!(
                                "[Parser] Unexpected token {}",
                                token
                            )));
                        }
                    }
                }
                Some(cols)
            }
            None => None,
        };

        self.next_expect(Token::Keyword(Keyword::Values))?;
        // Multiple rows: INSERT INTO tbl VALUES (1, 2), (3, 4)
        let mut values = Vec::new();
        loop {
            self.next_expect(Token::OpenParen)?;
            let mut row = Vec::new();
            loop {
                row.push(self.parse_expression()?);
                match self.next()? {
                    Token::CloseParen => break,
                    Token::Comma => {}
                    token => {
                        return Err(Error::Parse(format!("[Parser] Unexpected token {}", token)));
                    }
                }
            }
            values.push(row);
            if self.next_if_token(Token::Comma).is_none() {
                break;
            }
        }
        Ok(ast::Statement::Insert {
            table_name,
            columns,
            values,
        })
    }

    /// Parses an expression. Precedence, loosest first: OR, AND, NOT,
    /// comparison, unary minus.
    fn parse_expression(&mut self) -> Result<Expression> {
        let mut lhs = self.parse_and()?;
        while self.next_if_token(Token::Keyword(Keyword::Or)).is_some() {
            let rhs = self.parse_and()?;
            lhs = Operation::Or(Box::new(lhs), Box::new(rhs)).into();
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expression> {
        let mut lhs = self.parse_not()?;
        while self.next_if_token(Token::Keyword(Keyword::And)).is_some() {
            let rhs = self.parse_not()?;
            lhs = Operation::And(Box::new(lhs), Box::new(rhs)).into();
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expression> {
        if self.next_if_token(Token::Keyword(Keyword::Not)).is_some() {
            return Ok(Operation::Not(Box::new(self.parse_not()?)).into());
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expression> {
        let lhs = self.parse_atom()?;
        let op = self.next_if(|t| {
            matches!(
                t,
                Token::Equal
                    | Token::NotEqual
                    | Token::GreaterThan
                    | Token::GreaterThanOrEqual
                    | Token::LessThan
                    | Token::LessThanOrEqual
            )
        });
        let Some(op) = op else {
            return Ok(lhs);
        };
        let (l, r) = (Box::new(lhs), Box::new(self.parse_atom()?));
        Ok(match op {
            Token::Equal => Operation::Equal(l, r),
            Token::NotEqual => Operation::NotEqual(l, r),
            Token::GreaterThan => Operation::GreaterThan(l, r),
            Token::GreaterThanOrEqual => Operation::GreaterThanOrEqual(l, r),
            Token::LessThan => Operation::LessThan(l, r),
            _ => Operation::LessThanOrEqual(l, r),
        }
        .into())
    }

    fn parse_atom(&mut self) -> Result<Expression> {
        Ok(match self.next()? {
            Token::Number(n) => {
                // The lexer scans both 123 and 123.45 as Token::Number
                if n.chars().all(|c| c.is_ascii_digit()) {
                    Consts::Integer(n.parse()?).into()
                } else {
                    Consts::Float(n.parse()?).into()
                }
            }
            Token::String(s) => Consts::String(s).into(),
            Token::Keyword(Keyword::True) => Consts::Boolean(true).into(),
            Token::Keyword(Keyword::False) => Consts::Boolean(false).into(),
            Token::Keyword(Keyword::Null) => Consts::Null.into(),
            Token::Param(name) => Expression::Param(name),
            Token::Minus => Operation::Negate(Box::new(self.parse_atom()?)).into(),
            Token::OpenParen => {
                let expr = self.parse_expression()?;
                self.next_expect(Token::CloseParen)?;
                expr
            }
            Token::Ident(name) => self.parse_field(name)?,
            Token::Keyword(k) if k.is_type_name() => self.parse_field(k.to_str().to_lowercase())?,
            t => {
                return Err(Error::Parse(format!(
                    "[Parser] Unexpected expression token {}",
                    t
                )));
            }
        })
    }

    /// `name` or `table.name`, with the first part already consumed
    fn parse_field(&mut self, name: String) -> Result<Expression> {
        Ok(match self.next_if_token(Token::Period) {
            Some(_) => Expression::Field(Some(name), self.next_ident()?),
            None => Expression::Field(None, name),
        })
    }

    fn peek(&mut self) -> Result<Option<Token>> {
        self.lexer.peek().cloned().transpose()
    }

    fn next(&mut self) -> Result<Token> {
        self.lexer
            .next()
            .unwrap_or_else(|| Err(Error::Parse("[Parser] Unexpected end of input".into())))
    }

    fn next_ident(&mut self) -> Result<String> {
        match self.next()? {
            Token::Ident(ident) => Ok(ident),
            Token::Keyword(k) if k.is_type_name() => Ok(k.to_str().to_lowercase()),
            token => Err(Error::Parse(format!(
                "[Parser] Expected ident, got token {}",
                token
            ))),
        }
    }

    fn next_expect(&mut self, expect: Token) -> Result<()> {
        let token = self.next()?;
        if token != expect {
            return Err(Error::Parse(format!(
                "[Parser] Expected token {}, got {}",
                expect, token
            )));
        }
        Ok(())
    }

    /// Consumes next token if it satisfies the predicate
    fn next_if<F: Fn(&Token) -> bool>(&mut self, predicate: F) -> Option<Token> {
        self.peek().unwrap_or(None).filter(|t| predicate(t))?;
        self.next().ok()
    }

    fn next_if_keyword(&mut self) -> Option<Token> {
        self.next_if(|t| matches!(t, Token::Keyword(_)))
    }

    fn next_if_token(&mut self, token: Token) -> Option<Token> {
        self.next_if(|t| t == &token)
    }
}
