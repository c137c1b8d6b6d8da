//! The journal tracks configuration and collects timed, named reports for
//! each phase of a compile — the thing a CLI or test prints back when a
//! compile misbehaves.

use crate::error::VellumError;
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::time::Instant;

/// Which compile phase a `Report` belongs to. `Any` matches every report
/// when filtering, the way `debug_error_report` sweeps for errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReportType {
  Any,
  GrammarParse,
  ThompsonConstruction,
  NfaToDfa,
  Minimization,
  PriorityPropagation,
  GlaConstruction,
  Coalescing,
  Linearization,
}

impl ReportType {
  fn matches(self, other: ReportType) -> bool {
    self == ReportType::Any || other == ReportType::Any || self == other
  }
}

#[derive(Clone, Copy)]
pub struct Timing {
  label: &'static str,
  start: Instant,
  end: Instant,
  active: bool,
}

impl Timing {
  pub fn new(label: &'static str) -> Self {
    Timing { label, start: Instant::now(), end: Instant::now(), active: true }
  }

  pub fn stop(&mut self) {
    self.end = Instant::now();
    self.active = false;
  }

  pub fn is_active(&self) -> bool {
    self.active
  }
}

impl Debug for Timing {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}: {:?}", self.label, self.end.saturating_duration_since(self.start))
  }
}

impl Display for Timing {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    Debug::fmt(self, f)
  }
}

/// One phase's worth of collected errors and named timings.
#[derive(Debug)]
pub struct Report {
  pub name: String,
  pub report_type: ReportType,
  pub create_time: Instant,
  errors: Vec<VellumError>,
  timings: HashMap<&'static str, Timing>,
}

impl Default for Report {
  fn default() -> Self {
    Self { name: String::new(), report_type: ReportType::Any, create_time: Instant::now(), errors: Vec::new(), timings: HashMap::new() }
  }
}

impl Report {
  pub fn add_error(&mut self, error: VellumError) {
    self.errors.push(error);
  }

  pub fn errors(&self) -> &[VellumError] {
    &self.errors
  }

  pub fn start_timer(&mut self, label: &'static str) {
    self.timings.insert(label, Timing::new(label));
  }

  pub fn stop_timer(&mut self, label: &'static str) {
    if let Some(t) = self.timings.get_mut(label) {
      t.stop();
    }
  }

  pub fn type_matches(&self, report_type: ReportType) -> bool {
    self.report_type.matches(report_type)
  }

  pub fn debug_string(&self) -> String {
    let mut out = String::new();
    for (label, timing) in &self.timings {
      out.push_str(&format!("  {label}: {timing:?}\n"));
    }
    for err in &self.errors {
      out.push_str(&format!("  error: {err}\n"));
    }
    out
  }
}

/// Compile-wide settings read by the grammar parser and every later phase.
/// Mirrors the `ALLOW_*` boolean-flag style of a hand-tuned parser config:
/// each flag trades strictness for permissiveness in one specific place.
#[derive(Clone, Debug)]
pub struct GrammarConfig {
  /// Maximum lookahead depth the GLA construction will explore before
  /// giving up and reporting an ambiguous/non-LL(*) grammar.
  pub max_k: u32,
  /// When an ambiguity is found, prefer the earlier-declared priority
  /// class's alternative instead of failing the compile.
  pub allow_ambiguous_priority_resolution: bool,
  /// Allow a subparser (`@allow ... ends;`) to be injected between any two
  /// tokens of the host grammar, not just at explicitly marked points.
  pub allow_subparser_injection: bool,
  /// Emit a warning (rather than staying silent) for prioritized
  /// alternatives that are reachable but never preferred.
  pub report_unreachable_alternatives: bool,
}

impl Default for GrammarConfig {
  fn default() -> Self {
    Self { max_k: 8, allow_ambiguous_priority_resolution: false, allow_subparser_injection: true, report_unreachable_alternatives: true }
  }
}

/// Collects reports and configuration across one compile. Cheap to create
/// per-compile; not meant to be shared across threads.
#[derive(Debug)]
pub struct Journal {
  config: GrammarConfig,
  reports: HashMap<ReportType, Box<Report>>,
  active: Option<Box<Report>>,
  sink: Report,
  create_time: Instant,
}

impl Journal {
  pub fn new(config: GrammarConfig) -> Self {
    Self { config, reports: HashMap::new(), active: None, sink: Report::default(), create_time: Instant::now() }
  }

  pub fn config(&self) -> &GrammarConfig {
    &self.config
  }

  pub fn set_active_report(&mut self, name: &str, report_type: ReportType) {
    if let Some(prev) = self.active.take() {
      self.reports.insert(prev.report_type, prev);
    }
    let report = self.reports.remove(&report_type).unwrap_or_else(|| {
      Box::new(Report { name: name.to_string(), report_type, ..Default::default() })
    });
    self.active = Some(report);
  }

  pub fn report_mut(&mut self) -> &mut Report {
    self.active.as_mut().map(|r| r.as_mut()).unwrap_or(&mut self.sink)
  }

  pub fn report(&self) -> &Report {
    self.active.as_ref().map(|r| r.as_ref()).unwrap_or(&self.sink)
  }

  pub fn get_reports(&self, report_type: ReportType, mut closure: impl FnMut(&Report)) {
    for report in self.reports.values() {
      if report.type_matches(report_type) {
        closure(report);
      }
    }
    if let Some(active) = &self.active {
      if active.type_matches(report_type) {
        closure(active);
      }
    }
  }

  /// Collects every error logged across every report so far.
  pub fn all_errors(&self) -> Vec<VellumError> {
    let mut out = Vec::new();
    self.get_reports(ReportType::Any, |report| out.extend(report.errors().iter().cloned()));
    out
  }

  pub fn debug_print_reports(&self, report_type: ReportType) {
    self.get_reports(report_type, |report| {
      eprintln!(
        "\n{:=<80}\nreport [{}] at {:?}:\n{}{:=<80}",
        "",
        report.name,
        report.create_time.duration_since(self.create_time),
        report.debug_string(),
        ""
      );
    });
  }

  /// Moves the currently active report into the completed-reports map.
  pub fn flush_active(&mut self) {
    if let Some(active) = self.active.take() {
      self.reports.insert(active.report_type, active);
    }
  }
}

impl Drop for Journal {
  fn drop(&mut self) {
    self.flush_active();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn collects_errors_across_phases() {
    let mut j = Journal::new(GrammarConfig::default());
    j.set_active_report("grammar parse", ReportType::GrammarParse);
    j.report_mut().add_error(VellumError::GrammarError { message: "bad".into(), source_name: "g".into(), token: None });
    j.set_active_report("minimize", ReportType::Minimization);
    j.report_mut().add_error(VellumError::LexerConflict { state_description: "s0".into() });

    let all = j.all_errors();
    assert_eq!(all.len(), 2);
  }

  #[test]
  fn timing_reports_elapsed_duration() {
    let mut t = Timing::new("phase");
    assert!(t.is_active());
    t.stop();
    assert!(!t.is_active());
  }
}
