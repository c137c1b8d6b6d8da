//! End-to-end tests driving the compile pipeline and the runtime
//! interpreter together, against small grammars covering a concatenation,
//! a repetition, two compile-time error shapes, a grammar that forces GLA
//! construction, and an `@allow` subparser.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use vellum_core::{GrammarConfig, VellumError};
use vellum_runtime::{
  alloc_parse_state, bind_grammar, finish_parse, load_grammar, parse, ControlFlow, FinishStatus, LoadedGrammar, ParseCallbacks,
  ParseStatus,
};

#[derive(Clone, Debug, PartialEq, Eq)]
enum Event {
  Start(String),
  End(String),
  Terminal(String, usize, usize),
}

struct Recorder {
  grammar: Arc<LoadedGrammar>,
  events: Rc<RefCell<Vec<Event>>>,
}

impl ParseCallbacks for Recorder {
  fn start_rule(&mut self, rule: u32) {
    self.events.borrow_mut().push(Event::Start(self.grammar.nonterm_name(rule).to_string()));
  }

  fn end_rule(&mut self, rule: u32) {
    self.events.borrow_mut().push(Event::End(self.grammar.nonterm_name(rule).to_string()));
  }

  fn terminal(&mut self, terminal: u32, offset: usize, len: usize) -> ControlFlow {
    self.events.borrow_mut().push(Event::Terminal(self.grammar.terminal_name(terminal).to_string(), offset, len));
    ControlFlow::Continue
  }
}

fn compile(source: &str) -> Vec<u8> {
  vellum_core::compile(source, "test.vlg", GrammarConfig::default()).unwrap_or_else(|errors| {
    panic!("unexpected compile errors: {}", errors.iter().map(VellumError::to_string).collect::<Vec<_>>().join("\n"))
  })
}

fn run(source: &str, input: &[u8]) -> (Vec<Event>, ParseStatus, usize, FinishStatus) {
  let bytes = compile(source);
  let grammar = Arc::new(load_grammar(&bytes).expect("artifact should load"));
  let events = Rc::new(RefCell::new(Vec::new()));
  let recorder = Recorder { grammar: grammar.clone(), events: events.clone() };
  let mut state = alloc_parse_state(bind_grammar(grammar, recorder));
  let (status, consumed) = parse(&mut state, input).expect("parse should not error");
  let finish = finish_parse(&mut state).expect("finish_parse should not error");
  (events.borrow().clone(), status, consumed, finish)
}

#[test]
fn simple_concatenation() {
  let (events, status, consumed, finish) = run(r#"s -> "a" "b";"#, b"ab");

  // `s` fully returns exactly as the buffer ends, so the frame stack is
  // already empty by the time `parse` looks at it: that's reported as Eof.
  assert_eq!(status, ParseStatus::Eof);
  assert_eq!(consumed, 2);
  assert_eq!(finish, FinishStatus::Complete);
  assert_eq!(
    events,
    vec![
      Event::Start("s".into()),
      Event::Terminal("\"a\"".into(), 0, 1),
      Event::Terminal("\"b\"".into(), 1, 1),
      Event::End("s".into()),
    ]
  );
}

#[test]
fn kleene_star_repetition() {
  let (events, status, consumed, finish) = run(r#"s -> "a"* "b";"#, b"aaab");

  assert_eq!(status, ParseStatus::Eof);
  assert_eq!(consumed, 4);
  assert_eq!(finish, FinishStatus::Complete);
  assert_eq!(
    events,
    vec![
      Event::Start("s".into()),
      Event::Terminal("\"a\"".into(), 0, 1),
      Event::Terminal("\"a\"".into(), 1, 1),
      Event::Terminal("\"a\"".into(), 2, 1),
      Event::Terminal("\"b\"".into(), 3, 1),
      Event::End("s".into()),
    ]
  );
}

#[test]
fn left_recursion_is_a_compile_error_naming_the_rule() {
  let source = r#"
    s -> e;
    e -> e "+" e | num;
    num: /[0-9]+/;
  "#;

  let errors = vellum_core::compile(source, "test.vlg", GrammarConfig::default()).expect_err("left recursion should fail to compile");

  assert!(
    errors.iter().any(|e| matches!(e, VellumError::LeftRecursion { nonterminal, .. } if nonterminal == "e")),
    "expected a LeftRecursion error naming `e`, got: {errors:?}"
  );
}

#[test]
fn unreachable_prioritized_alternative_is_a_compile_error() {
  let source = r#"s -> "X" / "X";"#;

  let errors = vellum_core::compile(source, "test.vlg", GrammarConfig::default())
    .expect_err("an alternative that can never win over an identical higher-priority one should fail to compile");

  assert!(
    errors.iter().any(|e| matches!(e, VellumError::UnreachableAlternative { nonterminal, .. } if nonterminal == "s")),
    "expected an UnreachableAlternative error naming `s`, got: {errors:?}"
  );
}

#[test]
fn dangling_else_requires_gla_and_nests_callbacks_correctly() {
  let source = r#"
    s -> ("if" expr "then" s ("else" s)?) | "x";
    expr: /[a-z]+/;
  "#;

  let (events, status, consumed, finish) = run(source, b"if a then if b then x else x");

  assert_eq!(status, ParseStatus::Eof);
  assert_eq!(consumed, "if a then if b then x else x".len());
  assert_eq!(finish, FinishStatus::Complete);

  let starts = events.iter().filter(|e| matches!(e, Event::Start(n) if n == "s")).count();
  let ends = events.iter().filter(|e| matches!(e, Event::End(n) if n == "s")).count();
  assert_eq!(starts, 4, "outer if, inner if, and each of its two branches should each start `s` once");
  assert_eq!(ends, starts, "every started `s` must also end");

  let mut depth = 0i32;
  for event in &events {
    match event {
      Event::Start(n) if n == "s" => depth += 1,
      Event::End(n) if n == "s" => {
        depth -= 1;
        assert!(depth >= 0, "an `s` should never end before it has started");
      }
      _ => {}
    }
  }
  assert_eq!(depth, 0, "every `s` frame must be closed by the time the parse finishes");

  let terminal_names: Vec<&str> = events
    .iter()
    .filter_map(|e| match e {
      Event::Terminal(name, ..) => Some(name.as_str()),
      _ => None,
    })
    .collect();
  assert_eq!(
    terminal_names,
    vec!["\"if\"", "expr", "\"then\"", "\"if\"", "expr", "\"then\"", "\"x\"", "\"else\"", "\"x\""],
    "the dangling else should bind to the nearer `if`"
  );

  let mut prev_end = 0usize;
  for event in &events {
    if let Event::Terminal(_, offset, len) = event {
      assert!(*offset >= prev_end, "terminal callbacks must fire in non-overlapping input order");
      prev_end = offset + len;
    }
  }
}

#[test]
fn allow_directive_hides_whitespace_from_callbacks() {
  let source = r#"
    @allow ws s;
    s -> "a" "b";
    ws: /[ \t\n]+/;
  "#;

  let (events, status, consumed, finish) = run(source, b"  a  b  ");

  // The grammar's own rule ends as soon as "b" is matched; the trailing
  // whitespace is never fed because no frame remains to allow it through.
  assert_eq!(status, ParseStatus::Eof);
  assert_eq!(consumed, 6);
  assert_eq!(finish, FinishStatus::Complete);

  let terminals: Vec<&Event> = events.iter().filter(|e| matches!(e, Event::Terminal(..))).collect();
  assert_eq!(terminals.len(), 2, "whitespace terminals must never reach the callback surface");
  assert_eq!(terminals[0], &Event::Terminal("\"a\"".into(), 2, 1));
  assert_eq!(terminals[1], &Event::Terminal("\"b\"".into(), 5, 1));
}
