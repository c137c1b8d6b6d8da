use clap::{arg, value_parser, ArgMatches, Command};
use std::{fs, path::PathBuf, process::ExitCode};
use vellum_core::{GrammarConfig, VellumError};
use vellum_runtime::{LoadedGrammar, RtnStateKind};

fn command() -> ArgMatches {
  Command::new("vellum")
    .version("1.0.0-beta1")
    .author("Vellum Contributors")
    .subcommand(
      Command::new("compile")
        .about("Compiles a grammar source file into a loadable bytecode artifact.")
        .arg(arg!(-o --out <OUTPUT_PATH> "Path the compiled artifact will be written to.\n  Defaults to the input path with its extension replaced by `.vlc`").required(false).value_parser(value_parser!(PathBuf)))
        .arg(arg!(--"max-k" <DEPTH> "Maximum lookahead depth the lookahead-automaton construction will explore").required(false).value_parser(value_parser!(u32)))
        .arg(arg!(<INPUT> "Path to the source grammar file").required(true).value_parser(value_parser!(PathBuf))),
    )
    .subcommand(
      Command::new("disassemble")
        .about("Prints a human-readable listing of a compiled artifact's lexer, lookahead, and parser tables.")
        .arg(arg!(<INPUT> "Path to a compiled artifact").required(true).value_parser(value_parser!(PathBuf))),
    )
    .get_matches()
}

fn run_compile(matches: &ArgMatches) -> Result<(), String> {
  let input = matches.get_one::<PathBuf>("INPUT").unwrap();

  let out_path = matches.get_one::<PathBuf>("out").cloned().unwrap_or_else(|| input.with_extension("vlc"));

  let source = fs::read_to_string(input).map_err(|e| format!("{}: {e}", input.display()))?;
  let source_name = input.to_string_lossy().into_owned();

  let mut config = GrammarConfig::default();
  if let Some(&max_k) = matches.get_one::<u32>("max-k") {
    config.max_k = max_k;
  }

  let bytes = vellum_core::compile(&source, &source_name, config).map_err(|errors| {
    errors.iter().map(VellumError::to_string).collect::<Vec<_>>().join("\n")
  })?;

  fs::write(&out_path, bytes).map_err(|e| format!("{}: {e}", out_path.display()))?;
  println!("wrote {}", out_path.display());
  Ok(())
}

fn run_disassemble(matches: &ArgMatches) -> Result<(), String> {
  let input = matches.get_one::<PathBuf>("INPUT").unwrap();
  let bytes = fs::read(input).map_err(|e| format!("{}: {e}", input.display()))?;
  let grammar = vellum_runtime::load_grammar(&bytes).map_err(|e| format!("{}: {e}", input.display()))?;
  print_disassembly(&grammar);
  Ok(())
}

fn print_disassembly(g: &LoadedGrammar) {
  println!("start rule: {}", g.nonterm_name(g.start_rule));

  println!("\nIntFA ({} states, start {}):", g.intfa.states.len(), g.intfa.start);
  for (idx, state) in g.intfa.states.iter().enumerate() {
    let marker = if idx as u32 == g.intfa.start { "*" } else { " " };
    match state.final_terminal {
      Some(t) => println!("{marker} s{idx}: final({})", g.terminal_name(t)),
      None => println!("{marker} s{idx}:"),
    }
    for t in &state.transitions {
      if t.lo == t.hi {
        println!("      [{:#04x}] -> s{}", t.lo, t.target);
      } else {
        println!("      [{:#04x}-{:#04x}] -> s{}", t.lo, t.hi, t.target);
      }
    }
  }

  for (gla_idx, gla) in g.glas.iter().enumerate() {
    println!("\nGLA {gla_idx} ({} states, start {}):", gla.states.len(), gla.start);
    for (idx, state) in gla.states.iter().enumerate() {
      let marker = if idx as u32 == gla.start { "*" } else { " " };
      println!("{marker} s{idx}:");
      for t in &state.transitions {
        let edge = match t.edge {
          vellum_runtime::GlaEdge::Terminal(term) => g.terminal_name(term).to_string(),
          vellum_runtime::GlaEdge::Eof => "$".to_string(),
        };
        println!("      {edge} -> s{}", t.target);
      }
      match state.prediction {
        Some(vellum_runtime::GlaPrediction::Transition(i)) => println!("      predicts: transition #{i}"),
        Some(vellum_runtime::GlaPrediction::Return) => println!("      predicts: return"),
        None => {}
      }
    }
  }

  for (rule_idx, rtn) in g.rtns.iter().enumerate() {
    println!("\nRTN {} ({} states, start {}):", g.nonterm_name(rule_idx as u32), rtn.states.len(), rtn.start);
    for (idx, state) in rtn.states.iter().enumerate() {
      let marker = if idx as u32 == rtn.start { "*" } else { " " };
      let kind = match state.kind {
        RtnStateKind::Trivial => "trivial".to_string(),
        RtnStateKind::WithIntFa => "lexer-lookahead".to_string(),
        RtnStateKind::WithGla(gla) => format!("gla-lookahead({gla})"),
      };
      let fin = if state.is_final { " final" } else { "" };
      println!("{marker} s{idx}: {kind}{fin}");
      for t in &state.transitions {
        let edge = match t.edge {
          vellum_runtime::RtnEdge::Terminal(term) => g.terminal_name(term).to_string(),
          vellum_runtime::RtnEdge::NonTerm(callee) => format!("<{}>", g.nonterm_name(callee)),
        };
        match t.slot {
          Some(slot) => println!("      {edge} [.{slot}] -> s{}", t.target),
          None => println!("      {edge} -> s{}", t.target),
        }
      }
    }
  }

  if !g.allowed_subparsers.is_empty() {
    println!("\nallowed subparsers:");
    for (rule, terminals) in &g.allowed_subparsers {
      let names: Vec<_> = terminals.iter().map(|&t| g.terminal_name(t)).collect();
      println!("  {}: {}", g.nonterm_name(*rule), names.join(", "));
    }
  }
}

fn main() -> ExitCode {
  let matches = command();

  let result = if let Some(matches) = matches.subcommand_matches("compile") {
    run_compile(matches)
  } else if let Some(matches) = matches.subcommand_matches("disassemble") {
    run_disassemble(matches)
  } else {
    Err("no subcommand given; run with --help for usage".to_string())
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(message) => {
      eprintln!("{message}");
      ExitCode::FAILURE
    }
  }
}
