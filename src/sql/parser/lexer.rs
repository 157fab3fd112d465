//! SQL Lexer - Tokenizes SQL input text into a stream of tokens

use std::{fmt::Display, iter::Peekable, str::Chars};

use crate::error::{Error, Result};

/// Represents a single lexical token in the SQL input
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// SQL reserved keyword
    Keyword(Keyword),
    /// Identifier such as table name or column name, folded to lower case
    Ident(String),
    /// String literal
    String(String),
    /// Numeric literal (integer or floating-point)
    Number(String),
    /// Named placeholder without the leading colon
    Param(String),
    OpenParen,
    CloseParen,
    Comma,
    Semicolon,
    Period,
    Asterisk,
    Minus,
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Keyword(keyword) => f.write_str(keyword.to_str()),
            Token::Ident(ident) => f.write_str(ident),
            Token::String(v) => write!(f, "'{}'", v),
            Token::Number(n) => f.write_str(n),
            Token::Param(p) => write!(f, ":{}", p),
            Token::OpenParen => f.write_str("("),
            Token::CloseParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
            Token::Semicolon => f.write_str(";"),
            Token::Period => f.write_str("."),
            Token::Asterisk => f.write_str("*"),
            Token::Minus => f.write_str("-"),
            Token::Equal => f.write_str("="),
            Token::NotEqual => f.write_str("!="),
            Token::GreaterThan => f.write_str(">"),
            Token::GreaterThanOrEqual => f.write_str(">="),
            Token::LessThan => f.write_str("<"),
            Token::LessThanOrEqual => f.write_str("<="),
        }
    }
}

/// Declares [`Keyword`] with its spelling in one place.
macro_rules! keywords {
    ( $( $variant:ident => $text:literal ),* $(,)? ) => {
        /// SQL reserved keywords
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub enum Keyword {
            $( $variant ),*
        }

        impl Keyword {
            /// Attempts to parse a string as a keyword (case-insensitive)
            pub fn from_str(ident: &str) -> Option<Keyword> {
                match ident.to_uppercase().as_str() {
                    $( $text => Some(Keyword::$variant), )*
                    _ => None,
                }
            }

            /// Returns the uppercase string representation of the keyword
            pub fn to_str(&self) -> &'static str {
                match self {
                    $( Keyword::$variant => $text ),*
                }
            }
        }
    };
}

keywords! {
    Create => "CREATE",
    Table => "TABLE",
    Int => "INT",
    Integer => "INTEGER",
    Boolean => "BOOLEAN",
    Bool => "BOOL",
    String => "STRING",
    Text => "TEXT",
    Varchar => "VARCHAR",
    Float => "FLOAT",
    Double => "DOUBLE",
    Select => "SELECT",
    Distinct => "DISTINCT",
    As => "AS",
    From => "FROM",
    Where => "WHERE",
    Insert => "INSERT",
    Into => "INTO",
    Values => "VALUES",
    Join => "JOIN",
    Inner => "INNER",
    Left => "LEFT",
    Outer => "OUTER",
    Cross => "CROSS",
    On => "ON",
    Order => "ORDER",
    By => "BY",
    Asc => "ASC",
    Desc => "DESC",
    Limit => "LIMIT",
    Offset => "OFFSET",
    And => "AND",
    Or => "OR",
    Not => "NOT",
    True => "TRUE",
    False => "FALSE",
    Null => "NULL",
    Default => "DEFAULT",
}

impl Keyword {
    /// Type names are only reserved where a type is expected, so they can
    /// also name tables and columns.
    pub fn is_type_name(&self) -> bool {
        matches!(
            self,
            Keyword::Int
                | Keyword::Integer
                | Keyword::Boolean
                | Keyword::Bool
                | Keyword::String
                | Keyword::Text
                | Keyword::Varchar
                | Keyword::Float
                | Keyword::Double
        )
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

/// SQL lexical analyzer
pub struct Lexer<'a> {
    iter: Peekable<Chars<'a>>,
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.scan() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => self
                .iter
                .peek()
                .map(|c| Err(Error::Parse(format!("[Lexer] Unexpected character {}", c)))),
            Err(err) => Some(Err(err)),
        }
    }
}

impl<'a> Lexer<'a> {
    pub fn new(sql_text: &'a str) -> Self {
        Self {
            iter: sql_text.chars().peekable(),
        }
    }

    /// Consumes the next character if it satisfies the predicate
    fn next_if<F: Fn(char) -> bool>(&mut self, predicate: F) -> Option<char> {
        self.iter.peek().filter(|&c| predicate(*c))?;
        self.iter.next()
    }

    /// Consumes consecutive characters while they satisfy the predicate
    fn next_while<F: Fn(char) -> bool>(&mut self, predicate: F) -> Option<String> {
        let mut value = String::new();
        while let Some(c) = self.next_if(&predicate) {
            value.push(c);
        }
        Some(value).filter(|v| !v.is_empty())
    }

    /// Looks one character past the peeked one
    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.iter.clone();
        ahead.next();
        ahead.next()
    }

    /// Skips whitespace and `--` line comments
    fn erase_whitespace(&mut self) {
        loop {
            self.next_while(|c| c.is_whitespace());
            if self.iter.peek() == Some(&'-') && self.peek_second() == Some('-') {
                self.next_while(|c| c != '\n');
            } else {
                break;
            }
        }
    }

    fn scan(&mut self) -> Result<Option<Token>> {
        self.erase_whitespace();
        match self.iter.peek() {
            Some('\'') => self.scan_string(),
            Some('"') => self.scan_quoted_ident(),
            Some(':') => self.scan_param(),
            Some(c) if c.is_ascii_digit() => Ok(self.scan_number()),
            Some(c) if c.is_alphabetic() || *c == '_' => Ok(self.scan_ident()),
            Some(_) => self.scan_symbol(),
            None => Ok(None),
        }
    }

    /// Scans a string literal; `''` inside it is an escaped quote
    fn scan_string(&mut self) -> Result<Option<Token>> {
        self.iter.next();
        let mut val = String::new();
        loop {
            match self.iter.next() {
                Some('\'') if self.next_if(|c| c == '\'').is_some() => val.push('\''),
                Some('\'') => break,
                Some(c) => val.push(c),
                None => return Err(Error::Parse("[Lexer] Unexpected end of string".into())),
            }
        }
        Ok(Some(Token::String(val)))
    }

    /// Scans a `"quoted"` identifier, never a keyword; `""` is an escaped quote
    fn scan_quoted_ident(&mut self) -> Result<Option<Token>> {
        self.iter.next();
        let mut val = String::new();
        loop {
            match self.iter.next() {
                Some('"') if self.next_if(|c| c == '"').is_some() => val.push('"'),
                Some('"') => break,
                Some(c) => val.push(c),
                None => return Err(Error::Parse("[Lexer] Unexpected end of identifier".into())),
            }
        }
        if val.is_empty() {
            return Err(Error::Parse("[Lexer] Empty quoted identifier".into()));
        }
        Ok(Some(Token::Ident(val.to_lowercase())))
    }

    fn scan_param(&mut self) -> Result<Option<Token>> {
        self.iter.next();
        match self.next_while(|c| c.is_alphanumeric() || c == '_') {
            Some(name) => Ok(Some(Token::Param(name))),
            None => Err(Error::Parse("[Lexer] Expected parameter name after :".into())),
        }
    }

    /// Scans a numeric literal (integer or floating-point)
    fn scan_number(&mut self) -> Option<Token> {
        let mut val = self.next_while(|c| c.is_ascii_digit())?;
        if let Some(sep) = self.next_if(|c| c == '.') {
            val.push(sep);
            while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
                val.push(c);
            }
        }
        Some(Token::Number(val))
    }

    /// Scans an identifier or keyword
    fn scan_ident(&mut self) -> Option<Token> {
        let val = self.next_while(|c| c.is_alphanumeric() || c == '_')?;
        Some(Keyword::from_str(&val).map_or(Token::Ident(val.to_lowercase()), Token::Keyword))
    }

    /// Scans a one or two character symbol
    fn scan_symbol(&mut self) -> Result<Option<Token>> {
        let Some(c) = self.iter.peek() else {
            return Ok(None);
        };
        let token = match c {
            '*' => Token::Asterisk,
            '(' => Token::OpenParen,
            ')' => Token::CloseParen,
            ',' => Token::Comma,
            ';' => Token::Semicolon,
            '.' => Token::Period,
            '-' => Token::Minus,
            '=' => Token::Equal,
            '>' => Token::GreaterThan,
            '<' => Token::LessThan,
            '!' => Token::NotEqual,
            _ => return Ok(None),
        };
        self.iter.next();
        Ok(Some(match token {
            Token::GreaterThan if self.next_if(|c| c == '=').is_some() => Token::GreaterThanOrEqual,
            Token::LessThan if self.next_if(|c| c == '=').is_some() => Token::LessThanOrEqual,
            Token::LessThan if self.next_if(|c| c == '>').is_some() => Token::NotEqual,
            Token::NotEqual if self.next_if(|c| c == '=').is_none() => {
                return Err(Error::Parse("[Lexer] Expected = after !".into()));
            }
            token => token,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::Lexer;
    use crate::{
        error::Result,
        sql::parser::lexer::{Keyword, Token},
    };

    fn ident(name: &str) -> Token {
        Token::Ident(name.to_string())
    }

    #[test]
    fn test_lexer_create_table() -> Result<()> {
        let tokens = Lexer::new("CREATE TABLE Person (name STRING, age INTEGER);")
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(
            tokens,
            vec![
                Token::Keyword(Keyword::Create),
                Token::Keyword(Keyword::Table),
                ident("person"),
                Token::OpenParen,
                ident("name"),
                Token::Keyword(Keyword::String),
                Token::Comma,
                ident("age"),
                Token::Keyword(Keyword::Integer),
                Token::CloseParen,
                Token::Semicolon,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_lexer_insert_with_params() -> Result<()> {
        let tokens = Lexer::new("insert into book values (:owner, 'It''s', -4.5)")
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(
            tokens,
            vec![
                Token::Keyword(Keyword::Insert),
                Token::Keyword(Keyword::Into),
                ident("book"),
                Token::Keyword(Keyword::Values),
                Token::OpenParen,
                Token::Param("owner".to_string()),
                Token::Comma,
                Token::String("It's".to_string()),
                Token::Comma,
                Token::Minus,
                Token::Number("4.5".to_string()),
                Token::CloseParen,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_lexer_select_with_comments() -> Result<()> {
        let tokens = Lexer::new(
            "SELECT DISTINCT    -- any person owning any books
                Person.name
            FROM Person
            WHERE age <= :cutoff AND age <> 3 OR age != 4 AND age >= 1",
        )
        .collect::<Result<Vec<_>>>()?;
        assert_eq!(
            tokens,
            vec![
                Token::Keyword(Keyword::Select),
                Token::Keyword(Keyword::Distinct),
                ident("person"),
                Token::Period,
                ident("name"),
                Token::Keyword(Keyword::From),
                ident("person"),
                Token::Keyword(Keyword::Where),
                ident("age"),
                Token::LessThanOrEqual,
                Token::Param("cutoff".to_string()),
                Token::Keyword(Keyword::And),
                ident("age"),
                Token::NotEqual,
                Token::Number("3".to_string()),
                Token::Keyword(Keyword::Or),
                ident("age"),
                Token::NotEqual,
                Token::Number("4".to_string()),
                Token::Keyword(Keyword::And),
                ident("age"),
                Token::GreaterThanOrEqual,
                Token::Number("1".to_string()),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_lexer_quoted_identifiers() -> Result<()> {
        let tokens = Lexer::new(r#"select "Text", "limit", "a""b" from "Note""#)
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(
            tokens,
            vec![
                Token::Keyword(Keyword::Select),
                ident("text"),
                Token::Comma,
                ident("limit"),
                Token::Comma,
                ident("a\"b"),
                Token::Keyword(Keyword::From),
                ident("note"),
            ]
        );
        assert!(Lexer::new(r#"select "open"#).collect::<Result<Vec<_>>>().is_err());
        assert!(Lexer::new(r#"select """#).collect::<Result<Vec<_>>>().is_err());
        Ok(())
    }

    #[test]
    fn test_lexer_errors() {
        assert!(Lexer::new("select 'open").collect::<Result<Vec<_>>>().is_err());
        assert!(Lexer::new("select a ! b").collect::<Result<Vec<_>>>().is_err());
        assert!(Lexer::new("select : a").collect::<Result<Vec<_>>>().is_err());
    }
}
