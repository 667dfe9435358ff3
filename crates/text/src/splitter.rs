// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Statement splitter
//!
//! Segments raw SQL text into discrete statements in source order.
//!
//! The splitter scans for a fixed set of bookend tokens (`;`, `'`, `''`,
//! `"`, `""`, `--`, `/* */`) and tracks four boolean states: line comment,
//! block comment, quoted identifier and string literal. A statement begins
//! at the first top-level character that is neither whitespace nor a
//! comment opener, and ends at a semicolon seen while all four states are
//! off. Bookends nested inside comments or quoted spans never terminate a
//! statement.
//!
//! Statement text is the verbatim source slice, so joining the yielded
//! statements with the skipped inter-statement text reproduces the input.
//! A trailing statement cut off by end of input is still yielded: with a
//! synthetic `;` appended when the lexical state is clean, or as-is with
//! [`Statement::unterminated`] set when the input ends inside a string,
//! quoted identifier or block comment (callers decide how to report that).

/// One statement produced by the splitter.
///
/// `start_line`/`start_col` are zero-based positions of the first
/// character of the statement in the source document. `lines` holds the
/// statement's physical lines without line terminators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Verbatim statement text, including the terminating semicolon.
    pub text: String,

    /// Zero-based line of the first statement character.
    pub start_line: usize,

    /// Zero-based column of the first statement character.
    pub start_col: usize,

    /// Physical lines of `text`, line terminators stripped.
    pub lines: Vec<String>,

    /// True when input ended inside a string literal, quoted identifier
    /// or block comment. No synthetic terminator is appended in that case.
    pub unterminated: bool,
}

/// Lazy, restartable statement iterator over a source snapshot.
///
/// ```
/// use postgres_sql_lsp_text::StatementSplitter;
///
/// let statements: Vec<_> = StatementSplitter::new("SELECT 1; SELECT 2;").collect();
/// assert_eq!(statements.len(), 2);
/// assert_eq!(statements[0].text, "SELECT 1;");
/// ```
pub struct StatementSplitter {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl StatementSplitter {
    /// Create a splitter over a source snapshot.
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 0,
            col: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn bump(&mut self) {
        if self.chars[self.pos] == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        self.pos += 1;
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) {
        // consumes the opening `/*` and everything up to the closing `*/`
        self.bump();
        self.bump();
        while let Some(c) = self.peek() {
            if c == '*' && self.peek2() == Some('/') {
                self.bump();
                self.bump();
                return;
            }
            self.bump();
        }
    }

    fn emit(&self, start: usize, start_line: usize, start_col: usize, unterminated: bool) -> Statement {
        let text: String = self.chars[start..self.pos].iter().collect();
        let lines = text
            .split('\n')
            .map(|l| l.trim_end_matches('\r').to_string())
            .collect();
        Statement {
            text,
            start_line,
            start_col,
            lines,
            unterminated,
        }
    }
}

impl Iterator for StatementSplitter {
    type Item = Statement;

    fn next(&mut self) -> Option<Statement> {
        // Skip the gap between statements: whitespace and comments never
        // open a statement.
        loop {
            match self.peek() {
                None => return None,
                Some(c) if c.is_whitespace() => self.bump(),
                Some('-') if self.peek2() == Some('-') => self.skip_line_comment(),
                Some('/') if self.peek2() == Some('*') => self.skip_block_comment(),
                Some(';') => self.bump(),
                Some(_) => break,
            }
        }

        let start = self.pos;
        let start_line = self.line;
        let start_col = self.col;

        let mut in_line_comment = false;
        let mut in_block_comment = false;
        let mut in_identifier = false;
        let mut in_quote = false;

        while let Some(c) = self.peek() {
            if in_line_comment {
                if c == '\n' {
                    in_line_comment = false;
                }
                self.bump();
                continue;
            }
            if in_block_comment {
                if c == '*' && self.peek2() == Some('/') {
                    self.bump();
                    self.bump();
                    in_block_comment = false;
                } else {
                    self.bump();
                }
                continue;
            }
            if in_quote {
                if c == '\'' {
                    // doubled quote is an escape; first match wins
                    if self.peek2() == Some('\'') {
                        self.bump();
                        self.bump();
                    } else {
                        self.bump();
                        in_quote = false;
                    }
                } else {
                    self.bump();
                }
                continue;
            }
            if in_identifier {
                if c == '"' {
                    if self.peek2() == Some('"') {
                        self.bump();
                        self.bump();
                    } else {
                        self.bump();
                        in_identifier = false;
                    }
                } else {
                    self.bump();
                }
                continue;
            }

            match c {
                ';' => {
                    self.bump();
                    return Some(self.emit(start, start_line, start_col, false));
                }
                '\'' => {
                    in_quote = true;
                    self.bump();
                }
                '"' => {
                    in_identifier = true;
                    self.bump();
                }
                '-' if self.peek2() == Some('-') => {
                    in_line_comment = true;
                    self.bump();
                    self.bump();
                }
                '/' if self.peek2() == Some('*') => {
                    in_block_comment = true;
                    self.bump();
                    self.bump();
                }
                _ => self.bump(),
            }
        }

        // End of input with an open statement. An open line comment is
        // unambiguous (it ends with the input); an open quote, identifier
        // or block comment is not, so the statement is yielded as-is and
        // flagged instead of guessing a terminator.
        let unterminated = in_block_comment || in_identifier || in_quote;
        let mut statement = self.emit(start, start_line, start_col, unterminated);
        if !unterminated {
            if in_line_comment {
                // the terminator must land outside the comment
                statement.text.push_str("\n;");
                statement.lines.push(";".to_string());
            } else {
                statement.text.push(';');
                match statement.lines.last_mut() {
                    Some(last) => last.push(';'),
                    None => statement.lines.push(";".to_string()),
                }
            }
        }
        Some(statement)
    }
}

/// Locate a zero-based char offset within a statement's text.
///
/// Returns `(line_index, column)` relative to the statement itself,
/// clamped to the last line when the offset overruns the text.
pub fn locate(statement: &Statement, offset: usize) -> (usize, usize) {
    let mut remaining = offset;
    let last = statement.lines.len().saturating_sub(1);
    for (idx, line) in statement.lines.iter().enumerate() {
        let len = line.chars().count();
        if remaining <= len || idx == last {
            return (idx, remaining.min(len));
        }
        // line terminator
        remaining -= len + 1;
    }
    (0, 0)
}
