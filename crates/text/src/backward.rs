// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Backward token iterator
//!
//! Scans backward character-by-character from a cursor position to recover
//! the lexical context a completion or signature-help request needs:
//! the identifier before the cursor, a dotted identifier chain, or the
//! argument position inside the nearest enclosing call.
//!
//! Line boundaries are crossed transparently, emitting a synthetic `\n`;
//! the start of the buffer is reported as [`BOF`]. Every operation is a
//! total function: an exhausted buffer produces empty or sentinel values,
//! never an error.

/// Sentinel returned once the scan has moved past the start of the buffer.
pub const BOF: char = '\0';

/// An identifier recovered by [`BackwardIterator::read_ident`].
///
/// Quoted identifiers come back with the surrounding double quotes
/// stripped and `quoted` set; their internal characters (including spaces
/// and case) are preserved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ident {
    pub text: String,
    pub quoted: bool,
}

impl Ident {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The identifier as PostgreSQL resolves it: unquoted identifiers fold
    /// to lowercase, quoted identifiers keep their exact case.
    pub fn folded(&self) -> String {
        if self.quoted {
            self.text.clone()
        } else {
            self.text.to_lowercase()
        }
    }
}

/// Backward character scanner over a document snapshot.
///
/// The iterator is positioned on the character *before* the cursor, so for
/// a cursor at `(line, character)` the first [`next`](Self::next) returns
/// the character at column `character - 1`.
pub struct BackwardIterator {
    lines: Vec<Vec<char>>,
    line: isize,
    offset: isize,
}

impl BackwardIterator {
    /// Create an iterator from a document snapshot and a zero-based cursor
    /// position. Out-of-range positions are clamped to the buffer.
    pub fn new(text: &str, line: u32, character: u32) -> Self {
        let lines: Vec<Vec<char>> = text
            .split('\n')
            .map(|l| l.trim_end_matches('\r').chars().collect())
            .collect();
        let line = (line as isize).min(lines.len() as isize - 1).max(0);
        let line_len = lines[line as usize].len() as isize;
        let offset = (character as isize - 1).min(line_len - 1);
        Self { lines, line, offset }
    }

    /// Whether another character (or the BOF sentinel) can still be read.
    pub fn has_next(&self) -> bool {
        self.line >= 0
    }

    /// The character the next call to [`next`](Self::next) will return.
    pub fn peek_next(&self) -> char {
        if self.line < 0 {
            return BOF;
        }
        if self.offset < 0 {
            return if self.line > 0 { '\n' } else { BOF };
        }
        self.lines[self.line as usize][self.offset as usize]
    }

    /// The character just past the current position, toward the cursor.
    pub fn peek_forward(&self) -> char {
        if self.line < 0 {
            return BOF;
        }
        let line = &self.lines[self.line as usize];
        let forward = self.offset + 1;
        if forward >= line.len() as isize {
            if (self.line as usize) + 1 >= self.lines.len() {
                BOF
            } else {
                '\n'
            }
        } else {
            line[forward as usize]
        }
    }

    pub fn is_next_dquote(&self) -> bool {
        self.peek_next() == '"'
    }

    pub fn is_next_period(&self) -> bool {
        self.peek_next() == '.'
    }

    pub fn is_forward_dquote(&self) -> bool {
        self.peek_forward() == '"'
    }

    /// Consume and return the previous character, crossing line boundaries
    /// with a synthetic `\n` and returning [`BOF`] at the buffer start.
    pub fn next(&mut self) -> char {
        if self.line < 0 {
            return BOF;
        }
        if self.offset < 0 {
            if self.line > 0 {
                self.line -= 1;
                self.offset = self.lines[self.line as usize].len() as isize - 1;
                return '\n';
            }
            self.line = -1;
            return BOF;
        }
        let ch = self.lines[self.line as usize][self.offset as usize];
        self.offset -= 1;
        ch
    }

    /// Count comma-separated argument positions backward to the nearest
    /// unmatched `(`.
    ///
    /// Nested `()`, `[]` and `{}` groups are skipped, as are single- and
    /// double-quoted spans. Returns the zero-based parameter index reached,
    /// or `-1` when no enclosing `(` exists before the start of the buffer.
    pub fn read_arguments(&mut self) -> i32 {
        let mut paren_nesting = 0i32;
        let mut bracket_nesting = 0i32;
        let mut curly_nesting = 0i32;
        let mut param_count = 0i32;
        while self.has_next() {
            let ch = self.next();
            match ch {
                '(' => {
                    paren_nesting -= 1;
                    if paren_nesting < 0 {
                        return param_count;
                    }
                }
                ')' => paren_nesting += 1,
                '{' => curly_nesting -= 1,
                '}' => curly_nesting += 1,
                '[' => bracket_nesting -= 1,
                ']' => bracket_nesting += 1,
                '"' | '\'' => {
                    // skip back to the matching quote
                    while self.has_next() && self.next() != ch {}
                }
                ',' => {
                    if paren_nesting == 0 && bracket_nesting == 0 && curly_nesting == 0 {
                        param_count += 1;
                    }
                }
                _ => {}
            }
        }
        -1
    }

    /// Read the identifier immediately preceding the current position.
    ///
    /// Leading whitespace is skipped. An unquoted identifier is a run of
    /// alphanumerics and underscores; a double-quoted identifier is
    /// consumed greedily back to its opening quote with internal
    /// characters preserved. Any other character ends the scan with an
    /// empty result.
    pub fn read_ident(&mut self) -> Ident {
        let mut started = false;
        let mut quoted = false;
        let mut text = String::new();
        while self.has_next() {
            let ch = self.peek_next();
            if started && !quoted && !is_ident_part(ch) {
                break;
            }
            let ch = self.next();
            if !started {
                if ch == ' ' || ch == '\t' || ch == '\n' {
                    continue;
                }
                if ch == '"' {
                    started = true;
                    quoted = true;
                } else if is_ident_part(ch) {
                    started = true;
                    text.insert(0, ch);
                } else {
                    break;
                }
            } else if quoted {
                if ch == BOF || ch == '"' {
                    break;
                }
                text.insert(0, ch);
            } else {
                text.insert(0, ch);
            }
        }
        Ident { text, quoted }
    }

    /// Read up to `max_levels` dot-separated identifiers backward,
    /// returned in forward (left-to-right) order.
    pub fn read_idents(&mut self, max_levels: usize) -> Vec<Ident> {
        let mut idents = Vec::new();
        for _ in 0..max_levels {
            let ident = self.read_ident();
            if ident.is_empty() {
                break;
            }
            idents.push(ident);
            if !self.is_next_period() {
                break;
            }
            self.next();
        }
        idents.reverse();
        idents
    }
}

fn is_ident_part(ch: char) -> bool {
    ch == '_' || ch.is_ascii_alphanumeric()
}
