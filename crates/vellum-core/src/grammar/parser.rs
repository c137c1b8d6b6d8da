//! Recursive-descent parser over the grammar source language's token
//! stream, producing a `GrammarAst`. One token of lookahead throughout.

use super::ast::*;
use super::lexer::{Lexer, Tok, TokKind};
use crate::token::Token;

pub struct Parser<'a> {
  lexer: Lexer<'a>,
  current: Tok,
}

pub type ParseResult<T> = Result<T, (String, Token)>;

impl<'a> Parser<'a> {
  pub fn new(source: &'a str) -> ParseResult<Self> {
    let mut lexer = Lexer::new(source);
    let current = lexer.next()?;
    Ok(Self { lexer, current })
  }

  fn bump(&mut self) -> ParseResult<Tok> {
    let next = self.lexer.next()?;
    Ok(std::mem::replace(&mut self.current, next))
  }

  fn expect(&mut self, kind: &TokKind) -> ParseResult<Tok> {
    if std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind) {
      self.bump()
    } else {
      Err((format!("unexpected token {:?}, expected {:?}", self.current.kind, kind), self.current.token))
    }
  }

  pub fn parse_grammar(&mut self) -> ParseResult<GrammarAst> {
    let mut ast = GrammarAst::default();
    while self.current.kind != TokKind::Eof {
      match &self.current.kind {
        TokKind::At(name) if name == "start" => {
          self.bump()?;
          let (name, tok) = self.parse_ident()?;
          self.expect(&TokKind::Semi)?;
          ast.start = Some((name, tok));
        }
        TokKind::At(name) if name == "allow" => {
          let tok = self.current.token;
          self.bump()?;
          let (subparser, _) = self.parse_ident()?;
          let (start_rule, _) = self.parse_ident()?;
          let mut end_rules = Vec::new();
          while self.current.kind == TokKind::Comma {
            self.bump()?;
            let (name, _) = self.parse_ident()?;
            end_rules.push(name);
          }
          self.expect(&TokKind::Semi)?;
          ast.allows.push(AllowDirective { subparser, start_rule, end_rules, token: tok });
        }
        TokKind::At(other) => {
          return Err((format!("unknown directive '@{other}'"), self.current.token));
        }
        TokKind::Ident(_) => {
          let (name, name_token) = self.parse_ident()?;
          match &self.current.kind {
            TokKind::Arrow => {
              self.bump()?;
              let rhs = self.parse_alternation()?;
              self.expect(&TokKind::Semi)?;
              ast.rules.push(RuleDef { name, name_token, rhs });
            }
            TokKind::Colon => {
              self.bump()?;
              let (body, regex_token) = match self.bump()?.kind {
                TokKind::RegexBody(body) => (body, name_token),
                other => return Err((format!("expected regex literal, found {other:?}"), name_token)),
              };
              self.expect(&TokKind::Semi)?;
              ast.terminals.push(TerminalDef { name, name_token, regex_source: body, regex_token });
            }
            other => {
              return Err((format!("expected '->' or ':' after '{name}', found {other:?}"), self.current.token));
            }
          }
        }
        other => return Err((format!("unexpected top-level token {other:?}"), self.current.token)),
      }
    }
    Ok(ast)
  }

  fn parse_ident(&mut self) -> ParseResult<(String, Token)> {
    let tok = self.bump()?;
    match tok.kind {
      TokKind::Ident(name) => Ok((name, tok.token)),
      other => Err((format!("expected identifier, found {other:?}"), tok.token)),
    }
  }

  fn parse_alternation(&mut self) -> ParseResult<Alternation> {
    let mut groups = vec![self.parse_prioritized_group()?];
    while self.current.kind == TokKind::Pipe {
      self.bump()?;
      groups.push(self.parse_prioritized_group()?);
    }
    Ok(Alternation { groups })
  }

  fn parse_prioritized_group(&mut self) -> ParseResult<PrioritizedGroup> {
    let mut derivations = vec![self.parse_derivation()?];
    while self.current.kind == TokKind::Slash {
      self.bump()?;
      derivations.push(self.parse_derivation()?);
    }
    Ok(PrioritizedGroup { derivations })
  }

  fn parse_derivation(&mut self) -> ParseResult<Derivation> {
    let mut terms = Vec::new();
    while self.starts_term() {
      terms.push(self.parse_term()?);
    }
    Ok(terms)
  }

  fn starts_term(&self) -> bool {
    matches!(self.current.kind, TokKind::Ident(_) | TokKind::LiteralString(_) | TokKind::LParen | TokKind::Dot)
  }

  fn parse_term(&mut self) -> ParseResult<Term> {
    if self.current.kind == TokKind::Dot {
      self.bump()?;
      let (name, _) = self.parse_ident()?;
      self.expect(&TokKind::Equals)?;
      let inner = self.parse_term()?;
      return Ok(Term::Named { name, inner: Box::new(inner) });
    }

    let bumped = self.bump()?;
    let atom = match bumped.kind {
      TokKind::LiteralString(s) => Term::Literal(s, bumped.token),
      TokKind::Ident(name) => Term::Ref(name, bumped.token),
      TokKind::LParen => {
        let inner = self.parse_alternation()?;
        self.expect(&TokKind::RParen)?;
        Term::Group(Box::new(inner))
      }
      other => return Err((format!("unexpected token in term position: {other:?}"), bumped.token)),
    };

    self.parse_repeat_suffix(atom)
  }

  fn parse_repeat_suffix(&mut self, atom: Term) -> ParseResult<Term> {
    let op = match self.current.kind {
      TokKind::Question => RepeatOp::Question,
      TokKind::Star => RepeatOp::Star,
      TokKind::Plus => RepeatOp::Plus,
      _ => return Ok(atom),
    };
    self.bump()?;

    let mut separator = None;
    if self.current.kind == TokKind::LParen {
      if op == RepeatOp::Question {
        return Err(("'?' cannot take a separator".into(), self.current.token));
      }
      self.bump()?;
      separator = Some(Box::new(self.parse_term()?));
      self.expect(&TokKind::RParen)?;
    }

    let mut prefer_more = None;
    if op != RepeatOp::Question {
      match self.current.kind {
        TokKind::Plus => {
          self.bump()?;
          prefer_more = Some(true);
        }
        TokKind::Minus => {
          self.bump()?;
          prefer_more = Some(false);
        }
        _ => {}
      }
    }

    Ok(Term::Repeat { inner: Box::new(atom), op, separator, prefer_more })
  }
}
