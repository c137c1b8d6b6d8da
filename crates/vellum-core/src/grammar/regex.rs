//! A small regex sub-parser: recursive descent over the body text of a
//! `/.../ ` terminal, emitting character classes as `IntSet`s and building
//! the NFA fragment directly via the `fa::thompson` combinators. Supports
//! literals, `.`, character classes (`[a-z]`, `[^...]`), common escapes,
//! grouping, alternation, and `?`/`*`/`+`.

use crate::fa::intfa_edge::IntFaProps;
use crate::fa::thompson;
use crate::fa::Automaton;
use crate::intset::IntSet;
use crate::token::Token;

pub struct RegexParser<'a> {
  chars: Vec<char>,
  pos: usize,
  source: &'a str,
}

pub type Nfa = Automaton<IntSet, IntFaProps, ()>;

impl<'a> RegexParser<'a> {
  pub fn new(source: &'a str) -> Self {
    Self { chars: source.chars().collect(), pos: 0, source }
  }

  fn peek(&self) -> Option<char> {
    self.chars.get(self.pos).copied()
  }

  fn advance(&mut self) -> Option<char> {
    let c = self.peek()?;
    self.pos += 1;
    Some(c)
  }

  pub fn parse(&mut self, fa: &mut Nfa, anchor: Token) -> Result<thompson::Fragment, (String, Token)> {
    let frag = self.parse_alternation(fa, anchor)?;
    if self.pos != self.chars.len() {
      return Err((format!("unexpected character '{}' in regex /{}/", self.chars[self.pos], self.source), anchor));
    }
    Ok(frag)
  }

  fn parse_alternation(&mut self, fa: &mut Nfa, anchor: Token) -> Result<thompson::Fragment, (String, Token)> {
    let mut branches = vec![self.parse_concat(fa, anchor)?];
    while self.peek() == Some('|') {
      self.advance();
      branches.push(self.parse_concat(fa, anchor)?);
    }
    if branches.len() == 1 {
      Ok(branches.pop().unwrap())
    } else {
      Ok(thompson::alt(fa, branches))
    }
  }

  fn parse_concat(&mut self, fa: &mut Nfa, anchor: Token) -> Result<thompson::Fragment, (String, Token)> {
    let mut frag: Option<thompson::Fragment> = None;
    while matches!(self.peek(), Some(c) if c != '|' && c != ')') {
      let next = self.parse_repeat(fa, anchor)?;
      frag = Some(match frag {
        None => next,
        Some(prev) => thompson::concat(fa, prev, next),
      });
    }
    match frag {
      Some(f) => Ok(f),
      None => Ok(thompson::epsilon(fa)),
    }
  }

  fn parse_repeat(&mut self, fa: &mut Nfa, anchor: Token) -> Result<thompson::Fragment, (String, Token)> {
    let atom = self.parse_atom(fa, anchor)?;
    match self.peek() {
      Some('?') => {
        self.advance();
        Ok(thompson::optional(fa, atom))
      }
      Some('*') => {
        self.advance();
        Ok(thompson::kleene(fa, atom))
      }
      Some('+') => {
        self.advance();
        Ok(thompson::plus(fa, atom))
      }
      _ => Ok(atom),
    }
  }

  fn parse_atom(&mut self, fa: &mut Nfa, anchor: Token) -> Result<thompson::Fragment, (String, Token)> {
    match self.advance() {
      Some('(') => {
        let inner = self.parse_alternation(fa, anchor)?;
        if self.advance() != Some(')') {
          return Err(("unterminated group in regex".into(), anchor));
        }
        Ok(inner)
      }
      Some('.') => Ok(thompson::symbol(fa, IntSet::from_range(0, 255))),
      Some('[') => self.parse_class(fa, anchor),
      Some('\\') => {
        let set = self.parse_escape(anchor)?;
        Ok(thompson::symbol(fa, set))
      }
      Some(c) => Ok(thompson::symbol(fa, IntSet::single(c as u32))),
      None => Err(("unexpected end of regex".into(), anchor)),
    }
  }

  fn parse_escape(&mut self, anchor: Token) -> Result<IntSet, (String, Token)> {
    match self.advance() {
      Some('d') => Ok(IntSet::from_range(b'0' as u32, b'9' as u32)),
      Some('w') => Ok(word_class()),
      Some('s') => Ok(whitespace_class()),
      Some('n') => Ok(IntSet::single(b'\n' as u32)),
      Some('t') => Ok(IntSet::single(b'\t' as u32)),
      Some('r') => Ok(IntSet::single(b'\r' as u32)),
      Some(c) => Ok(IntSet::single(c as u32)),
      None => Err(("dangling escape at end of regex".into(), anchor)),
    }
  }

  fn parse_class(&mut self, _fa: &mut Nfa, anchor: Token) -> Result<thompson::Fragment, (String, Token)> {
    let negated = self.peek() == Some('^');
    if negated {
      self.advance();
    }
    let mut ranges: Vec<(u32, u32)> = Vec::new();
    while self.peek() != Some(']') {
      let lo = match self.advance() {
        Some('\\') => char_code_of(self.parse_escape(anchor)?),
        Some(c) => c as u32,
        None => return Err(("unterminated character class".into(), anchor)),
      };
      if self.peek() == Some('-') && self.chars.get(self.pos + 1) != Some(&']') {
        self.advance();
        let hi = match self.advance() {
          Some('\\') => char_code_of(self.parse_escape(anchor)?),
          Some(c) => c as u32,
          None => return Err(("unterminated character class range".into(), anchor)),
        };
        ranges.push((lo, hi));
      } else {
        ranges.push((lo, lo));
      }
    }
    self.advance();
    let mut set = IntSet::from_ranges(ranges);
    if negated {
      set = set.invert();
    }
    Ok(thompson::symbol(_fa, set))
  }
}

fn char_code_of(set: IntSet) -> u32 {
  set.sample_element().unwrap_or(0)
}

fn word_class() -> IntSet {
  IntSet::from_ranges([(b'a' as u32, b'z' as u32), (b'A' as u32, b'Z' as u32), (b'0' as u32, b'9' as u32), (b'_' as u32, b'_' as u32)])
}

fn whitespace_class() -> IntSet {
  IntSet::from_ranges([(b' ' as u32, b' ' as u32), (b'\t' as u32, b'\t' as u32), (b'\n' as u32, b'\n' as u32), (b'\r' as u32, b'\r' as u32)])
}
