//! Lexer for the grammar source language. Tokenizes identifiers, literal
//! strings, regex bodies, directives (`@start`, `@allow`), and the small
//! set of punctuation the grammar and regex grammars need.

use crate::token::Token;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokKind {
  Ident(String),
  /// The text between the quotes of a `"literal"`, already unescaped.
  LiteralString(String),
  /// The raw text between the slashes of a `/regex/`, unescaped bytes as
  /// written (the regex parser does its own escape handling).
  RegexBody(String),
  Arrow,    // ->
  Colon,    // :
  Semi,     // ;
  Pipe,     // |
  Slash,    // /  (prioritized-choice separator; RegexBody tokens never
  // collide with this because the lexer only emits RegexBody between a
  // terminal's `:` and the regex's own closing `/`)
  Question, // ?
  Star,     // *
  Plus,     // +
  Minus,    // -
  Dot,      // .
  Equals,   // =
  Comma,    // ,
  LParen,
  RParen,
  At(String), // @start / @allow, keyword text without the @
  Eof,
}

#[derive(Clone, Debug)]
pub struct Tok {
  pub kind: TokKind,
  pub token: Token,
}

pub struct Lexer<'a> {
  src: &'a [u8],
  pos: usize,
  line: u32,
  column: u32,
}

impl<'a> Lexer<'a> {
  pub fn new(src: &'a str) -> Self {
    Self { src: src.as_bytes(), pos: 0, line: 1, column: 1 }
  }

  fn peek(&self) -> Option<u8> {
    self.src.get(self.pos).copied()
  }

  fn peek_at(&self, off: usize) -> Option<u8> {
    self.src.get(self.pos + off).copied()
  }

  fn advance(&mut self) -> Option<u8> {
    let c = self.peek()?;
    self.pos += 1;
    if c == b'\n' {
      self.line += 1;
      self.column = 1;
    } else {
      self.column += 1;
    }
    Some(c)
  }

  /// Skips whitespace and `//`/`/* */` comments. Not called while inside a
  /// regex body, so comment markers never eat into a terminal's regex.
  fn skip_ignored(&mut self) {
    loop {
      match self.peek() {
        Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
          self.advance();
        }
        Some(b'/') if self.peek_at(1) == Some(b'/') => {
          while self.peek().is_some() && self.peek() != Some(b'\n') {
            self.advance();
          }
        }
        Some(b'/') if self.peek_at(1) == Some(b'*') => {
          self.advance();
          self.advance();
          while self.peek().is_some() && !(self.peek() == Some(b'*') && self.peek_at(1) == Some(b'/')) {
            self.advance();
          }
          self.advance();
          self.advance();
        }
        _ => break,
      }
    }
  }

  fn make_token(&self, offset: usize, line: u32, column: u32) -> Token {
    Token::new(offset as u32, (self.pos - offset) as u32, line, column)
  }

  pub fn next(&mut self) -> Result<Tok, (String, Token)> {
    self.skip_ignored();
    let start = self.pos;
    let (line, column) = (self.line, self.column);

    let Some(c) = self.peek() else {
      return Ok(Tok { kind: TokKind::Eof, token: self.make_token(start, line, column) });
    };

    let kind = match c {
      b'-' if self.peek_at(1) == Some(b'>') => {
        self.advance();
        self.advance();
        TokKind::Arrow
      }
      b':' => {
        self.advance();
        TokKind::Colon
      }
      b';' => {
        self.advance();
        TokKind::Semi
      }
      b'|' => {
        self.advance();
        TokKind::Pipe
      }
      b'?' => {
        self.advance();
        TokKind::Question
      }
      b'*' => {
        self.advance();
        TokKind::Star
      }
      b'+' => {
        self.advance();
        TokKind::Plus
      }
      b'-' => {
        self.advance();
        TokKind::Minus
      }
      b'.' => {
        self.advance();
        TokKind::Dot
      }
      b'=' => {
        self.advance();
        TokKind::Equals
      }
      b',' => {
        self.advance();
        TokKind::Comma
      }
      b'(' => {
        self.advance();
        TokKind::LParen
      }
      b')' => {
        self.advance();
        TokKind::RParen
      }
      b'/' => {
        self.advance();
        let body_start = self.pos;
        while let Some(ch) = self.peek() {
          if ch == b'\\' {
            self.advance();
            self.advance();
            continue;
          }
          if ch == b'/' {
            break;
          }
          self.advance();
        }
        if self.peek() != Some(b'/') {
          return Err(("unterminated regex literal".into(), self.make_token(start, line, column)));
        }
        let body = String::from_utf8_lossy(&self.src[body_start..self.pos]).into_owned();
        self.advance();
        TokKind::RegexBody(body)
      }
      b'"' => {
        self.advance();
        let mut out = String::new();
        loop {
          match self.advance() {
            None => return Err(("unterminated string literal".into(), self.make_token(start, line, column))),
            Some(b'"') => break,
            Some(b'\\') => match self.advance() {
              Some(b'n') => out.push('\n'),
              Some(b't') => out.push('\t'),
              Some(b'\\') => out.push('\\'),
              Some(b'"') => out.push('"'),
              Some(other) => out.push(other as char),
              None => return Err(("unterminated string literal".into(), self.make_token(start, line, column))),
            },
            Some(other) => out.push(other as char),
          }
        }
        TokKind::LiteralString(out)
      }
      b'@' => {
        self.advance();
        let ident_start = self.pos;
        while matches!(self.peek(), Some(ch) if ch.is_ascii_alphanumeric() || ch == b'_') {
          self.advance();
        }
        if self.pos == ident_start {
          return Err(("expected directive name after '@'".into(), self.make_token(start, line, column)));
        }
        TokKind::At(String::from_utf8_lossy(&self.src[ident_start..self.pos]).into_owned())
      }
      ch if ch.is_ascii_alphabetic() || ch == b'_' => {
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
          self.advance();
        }
        TokKind::Ident(String::from_utf8_lossy(&self.src[start..self.pos]).into_owned())
      }
      other => {
        return Err((format!("unexpected character '{}'", other as char), self.make_token(start, line, column)));
      }
    };

    Ok(Tok { kind, token: self.make_token(start, line, column) })
  }
}
