//! Statement splitting and classification for stage scripts
//!
//! Scripts are split on `;` only at the top level. Semicolons inside
//! single-quoted strings, double-quoted identifiers, `--` / `/* */` comments
//! and `$tag$ ... $tag$` blocks never end a statement.

use thiserror::Error;

/// Errors raised while lexing or classifying a statement
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatementError {
    #[error("unterminated string literal starting at byte {0}")]
    UnterminatedString(usize),

    #[error("unterminated quoted identifier starting at byte {0}")]
    UnterminatedIdentifier(usize),

    #[error("unterminated block comment starting at byte {0}")]
    UnterminatedComment(usize),

    #[error("unterminated dollar-quoted block '{tag}' starting at byte {offset}")]
    UnterminatedDollarBlock { tag: String, offset: usize },

    #[error("unsupported statement '{0}': only CREATE TABLE ... AS, DROP TABLE and queries are allowed")]
    Unsupported(String),

    #[error("malformed statement: {0}")]
    Malformed(String),
}

/// A lexical token of a SQL script
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// Keyword, unquoted identifier or number
    Word(&'a str),
    /// Double-quoted identifier with `""` escapes resolved
    QuotedIdent(String),
    /// String literal or dollar-quoted block
    Literal,
    Symbol(char),
}

/// A token with its byte span in the source text
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<'a> {
    pub token: Token<'a>,
    pub start: usize,
    pub end: usize,
}

/// What a single statement does to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// `CREATE [OR REPLACE] TABLE [IF NOT EXISTS] name AS <query>`
    CreateTableAs {
        table: String,
        if_not_exists: bool,
        query: String,
    },
    /// `DROP TABLE [IF EXISTS] name[, name ...]`
    DropTable { tables: Vec<String>, if_exists: bool },
    /// Read-only `SELECT` / `WITH` query
    Query,
}

/// Tokenize a script, skipping whitespace and comments
pub fn tokenize(sql: &str) -> Result<Vec<Spanned<'_>>, StatementError> {
    let bytes = sql.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            _ if c.is_ascii_whitespace() => i += 1,
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = sql[i..].find('\n').map_or(bytes.len(), |off| i + off + 1);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let close = sql[i + 2..]
                    .find("*/")
                    .ok_or(StatementError::UnterminatedComment(i))?;
                i += 2 + close + 2;
            }
            b'\'' => {
                let end = scan_quoted(bytes, i, b'\'').ok_or(StatementError::UnterminatedString(i))?;
                tokens.push(Spanned {
                    token: Token::Literal,
                    start: i,
                    end,
                });
                i = end;
            }
            b'"' => {
                let end =
                    scan_quoted(bytes, i, b'"').ok_or(StatementError::UnterminatedIdentifier(i))?;
                let ident = sql[i + 1..end - 1].replace("\"\"", "\"");
                tokens.push(Spanned {
                    token: Token::QuotedIdent(ident),
                    start: i,
                    end,
                });
                i = end;
            }
            b'$' => match dollar_tag_len(&sql[i..]) {
                Some(tag_len) => {
                    let delimiter = &sql[i..i + tag_len];
                    let body = i + tag_len;
                    let close = sql[body..].find(delimiter).ok_or_else(|| {
                        StatementError::UnterminatedDollarBlock {
                            tag: delimiter.to_string(),
                            offset: i,
                        }
                    })?;
                    let end = body + close + tag_len;
                    tokens.push(Spanned {
                        token: Token::Literal,
                        start: i,
                        end,
                    });
                    i = end;
                }
                None => {
                    tokens.push(Spanned {
                        token: Token::Symbol('$'),
                        start: i,
                        end: i + 1,
                    });
                    i += 1;
                }
            },
            _ if is_word_byte(c) => {
                let start = i;
                while i < bytes.len() && is_word_byte(bytes[i]) {
                    i += 1;
                }
                tokens.push(Spanned {
                    token: Token::Word(&sql[start..i]),
                    start,
                    end: i,
                });
            }
            _ => {
                // Non-word bytes below 0x80 are always single-byte chars
                tokens.push(Spanned {
                    token: Token::Symbol(c as char),
                    start: i,
                    end: i + 1,
                });
                i += 1;
            }
        }
    }

    Ok(tokens)
}

/// Split a script into individual statements.
///
/// Leading comments are dropped and statements consisting only of comments
/// or whitespace are skipped. Each returned statement spans from its first
/// token to its last, so interior comments are preserved.
pub fn split_statements(script: &str) -> Result<Vec<String>, StatementError> {
    let tokens = tokenize(script)?;
    let mut statements = Vec::new();
    let mut start: Option<usize> = None;
    let mut last_end = 0;

    for tok in &tokens {
        if tok.token == Token::Symbol(';') {
            if let Some(s) = start.take() {
                statements.push(script[s..last_end].to_string());
            }
        } else {
            start.get_or_insert(tok.start);
            last_end = tok.end;
        }
    }
    if let Some(s) = start {
        statements.push(script[s..last_end].to_string());
    }

    Ok(statements)
}

/// Classify a single statement
pub fn classify(statement: &str) -> Result<StatementKind, StatementError> {
    let tokens = tokenize(statement)?;
    let mut cursor = Cursor {
        tokens: &tokens,
        pos: 0,
    };

    let Some(first) = tokens.first() else {
        return Err(StatementError::Malformed("empty statement".to_string()));
    };

    if cursor.keyword("CREATE") {
        if cursor.keyword("OR") && !cursor.keyword("REPLACE") {
            return Err(StatementError::Malformed(
                "expected REPLACE after CREATE OR".to_string(),
            ));
        }
        if !cursor.keyword("TABLE") {
            let what = cursor.peek_word().unwrap_or_default().to_uppercase();
            return Err(StatementError::Unsupported(format!("CREATE {what}")));
        }
        let if_not_exists = cursor.keyword_sequence(&["IF", "NOT", "EXISTS"]);
        let table = cursor.table_name()?;
        if !cursor.keyword("AS") {
            return Err(StatementError::Malformed(format!(
                "CREATE TABLE {table} must be followed by AS <query>"
            )));
        }
        let query = cursor
            .remaining_start()
            .map(|offset| statement[offset..].trim().to_string())
            .unwrap_or_default();
        if query.is_empty() {
            return Err(StatementError::Malformed(format!(
                "CREATE TABLE {table} AS has no query"
            )));
        }
        return Ok(StatementKind::CreateTableAs {
            table,
            if_not_exists,
            query,
        });
    }

    if cursor.keyword("DROP") {
        if !cursor.keyword("TABLE") {
            let what = cursor.peek_word().unwrap_or_default().to_uppercase();
            return Err(StatementError::Unsupported(format!("DROP {what}")));
        }
        let if_exists = cursor.keyword_sequence(&["IF", "EXISTS"]);
        let mut tables = vec![cursor.table_name()?];
        while cursor.symbol(',') {
            tables.push(cursor.table_name()?);
        }
        return Ok(StatementKind::DropTable { tables, if_exists });
    }

    match &first.token {
        Token::Word(w) if w.eq_ignore_ascii_case("SELECT") || w.eq_ignore_ascii_case("WITH") => {
            Ok(StatementKind::Query)
        }
        Token::Symbol('(') => Ok(StatementKind::Query),
        Token::Word(w) => Err(StatementError::Unsupported(w.to_uppercase())),
        _ => Err(StatementError::Malformed(format!(
            "statement starts with unexpected token at byte {}",
            first.start
        ))),
    }
}

struct Cursor<'t, 'a> {
    tokens: &'t [Spanned<'a>],
    pos: usize,
}

impl Cursor<'_, '_> {
    fn peek_word(&self) -> Option<&str> {
        match self.tokens.get(self.pos).map(|t| &t.token) {
            Some(Token::Word(w)) => Some(*w),
            _ => None,
        }
    }

    fn keyword(&mut self, kw: &str) -> bool {
        if self.peek_word().is_some_and(|w| w.eq_ignore_ascii_case(kw)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume the whole sequence or nothing
    fn keyword_sequence(&mut self, kws: &[&str]) -> bool {
        let matches = kws.iter().enumerate().all(|(offset, kw)| {
            matches!(
                self.tokens.get(self.pos + offset).map(|t| &t.token),
                Some(Token::Word(w)) if w.eq_ignore_ascii_case(kw)
            )
        });
        if matches {
            self.pos += kws.len();
        }
        matches
    }

    fn symbol(&mut self, c: char) -> bool {
        if self.tokens.get(self.pos).map(|t| &t.token) == Some(&Token::Symbol(c)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn table_name(&mut self) -> Result<String, StatementError> {
        let name = match self.tokens.get(self.pos).map(|t| &t.token) {
            Some(Token::Word(w)) => w.to_string(),
            Some(Token::QuotedIdent(ident)) => ident.clone(),
            _ => return Err(StatementError::Malformed("expected a table name".to_string())),
        };
        self.pos += 1;
        if self.tokens.get(self.pos).map(|t| &t.token) == Some(&Token::Symbol('.')) {
            return Err(StatementError::Malformed(format!(
                "qualified table name '{name}.<table>' is not supported"
            )));
        }
        Ok(name)
    }

    fn remaining_start(&self) -> Option<usize> {
        self.tokens.get(self.pos).map(|t| t.start)
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

/// End offset (exclusive) of a quoted run starting at `start`, honouring doubled quotes
fn scan_quoted(bytes: &[u8], start: usize, quote: u8) -> Option<usize> {
    let mut j = start + 1;
    while j < bytes.len() {
        if bytes[j] == quote {
            if bytes.get(j + 1) == Some(&quote) {
                j += 2;
                continue;
            }
            return Some(j + 1);
        }
        j += 1;
    }
    None
}

/// Length of a `$tag$` delimiter at the start of `s`, if it is one
fn dollar_tag_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut j = 1;
    while j < bytes.len() {
        let b = bytes[j];
        if b == b'$' {
            return Some(j + 1);
        }
        let valid = if j == 1 {
            b.is_ascii_alphabetic() || b == b'_'
        } else {
            b.is_ascii_alphanumeric() || b == b'_'
        };
        if !valid {
            return None;
        }
        j += 1;
    }
    None
}
