//! Participant session lifecycle.
//!
//! The engine is a pure state machine: callers feed it timer ticks, editor
//! events, and execution outcomes, and it emits [`Effect`]s describing the
//! persistence calls and log lines to perform. All IO lives in the caller,
//! which keeps every transition unit-testable.

use std::collections::{BTreeMap, BTreeSet};

use common::{ExecutionOutcome, metrics, pattern};

/// A paste is authorized only if an in-app copy happened within this window.
pub const PASTE_WINDOW_MS: u64 = 5 * 60 * 1000;

/// Lifecycle phase. `Locked` precedes the explicit start action; the two
/// terminal phases accept no further edits, runs, or syncs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Locked,
    Active,
    Finished,
    Disqualified,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Disqualified)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogKind {
    System,
    Info,
    Output,
    Success,
    Warning,
    Error,
}

/// One terminal-style log line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogLine {
    pub kind: LogKind,
    pub text: String,
}

impl LogLine {
    fn new(kind: LogKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// One target pattern from the catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternInfo {
    pub id: i32,
    pub name: String,
    pub target_output: String,
    pub level_order: i32,
}

/// Aggregates shipped on every sync and on finish.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub total_time_ms: u64,
    pub warnings: u32,
    pub lines_of_code: u32,
    pub no_of_loops: u32,
    pub attempts: u32,
    pub patterns_completed: u32,
    /// Pattern id → source snapshot.
    pub code_map: BTreeMap<i32, String>,
}

/// Security toggles mirrored from the server settings snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SecuritySettings {
    pub paste_security: bool,
    pub focus_security: bool,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            paste_security: true,
            focus_security: true,
        }
    }
}

/// Side effects the caller must perform.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Create or resume the persisted session.
    Login,
    /// Out-of-band progress sync, fired immediately on pattern completion.
    SyncNow,
    /// One terminal finish call with the final aggregates.
    Finish(SessionReport),
    /// One terminal disqualify call.
    Disqualify,
    Log(LogLine),
}

/// Why an edit, selection, or run was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EditRejected {
    #[error("session is not active")]
    NotActive,
    #[error("pattern is locked until earlier patterns are completed")]
    Locked,
    #[error("pattern already completed; read-only")]
    Completed,
}

pub struct SessionEngine {
    phase: SessionPhase,
    duration_ms: u64,
    remaining_ms: u64,
    catalog: Vec<PatternInfo>,
    completed: BTreeSet<i32>,
    code: BTreeMap<i32, String>,
    current: usize,
    warnings: u32,
    attempts: u32,
    security: SecuritySettings,
    /// Milliseconds since the last in-app copy, advanced by `tick`.
    ms_since_copy: Option<u64>,
}

impl SessionEngine {
    pub fn new(mut catalog: Vec<PatternInfo>, duration_ms: u64, security: SecuritySettings) -> Self {
        catalog.sort_by_key(|p| p.level_order);
        Self {
            phase: SessionPhase::Locked,
            duration_ms,
            remaining_ms: duration_ms,
            catalog,
            completed: BTreeSet::new(),
            code: BTreeMap::new(),
            current: 0,
            warnings: 0,
            attempts: 0,
            security,
            ms_since_copy: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn warnings(&self) -> u32 {
        self.warnings
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn catalog(&self) -> &[PatternInfo] {
        &self.catalog
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn current_pattern(&self) -> Option<&PatternInfo> {
        self.catalog.get(self.current)
    }

    pub fn code_for_current(&self) -> Option<&str> {
        let pattern = self.current_pattern()?;
        self.code.get(&pattern.id).map(String::as_str)
    }

    /// The countdown duration may only change before the session starts.
    pub fn set_duration(&mut self, duration_ms: u64) {
        if self.phase == SessionPhase::Locked {
            self.duration_ms = duration_ms;
            self.remaining_ms = duration_ms;
        }
    }

    /// Settings snapshots are re-polled; apply the latest toggles.
    pub fn update_security(&mut self, security: SecuritySettings) {
        self.security = security;
    }

    /// Explicit start action: `Locked → Active`.
    pub fn start(&mut self) -> Vec<Effect> {
        if self.phase != SessionPhase::Locked {
            return vec![];
        }
        self.phase = SessionPhase::Active;
        vec![
            Effect::Log(LogLine::new(
                LogKind::System,
                "SESSION STARTED. EDITOR UNLOCKED.",
            )),
            Effect::Login,
        ]
    }

    /// Advance the countdown. Clamped at zero; the instant it reaches zero
    /// while active the session disqualifies, exactly once.
    pub fn tick(&mut self, elapsed_ms: u64) -> Vec<Effect> {
        if self.phase != SessionPhase::Active {
            return vec![];
        }
        if let Some(ms) = self.ms_since_copy.as_mut() {
            *ms = ms.saturating_add(elapsed_ms);
        }
        self.remaining_ms = self.remaining_ms.saturating_sub(elapsed_ms);
        if self.remaining_ms > 0 {
            return vec![];
        }
        self.phase = SessionPhase::Disqualified;
        vec![
            Effect::Log(LogLine::new(
                LogKind::Error,
                "TIME LIMIT EXCEEDED. SYSTEM HALTED.",
            )),
            Effect::Disqualify,
        ]
    }

    /// A pattern is accessible only when every catalog position before it is
    /// completed. Pure function of the completed set; recomputed on demand.
    pub fn is_unlocked(&self, index: usize) -> bool {
        index < self.catalog.len()
            && self.catalog[..index]
                .iter()
                .all(|p| self.completed.contains(&p.id))
    }

    pub fn is_completed(&self, pattern_id: i32) -> bool {
        self.completed.contains(&pattern_id)
    }

    pub fn select_pattern(&mut self, index: usize) -> Result<(), EditRejected> {
        if !self.is_unlocked(index) {
            return Err(EditRejected::Locked);
        }
        self.current = index;
        Ok(())
    }

    /// Store the current pattern's source. Completed patterns are read-only
    /// and terminal phases reject all edits.
    pub fn set_code(&mut self, source: String) -> Result<(), EditRejected> {
        if self.phase != SessionPhase::Active {
            return Err(EditRejected::NotActive);
        }
        let pattern = self.current_pattern().ok_or(EditRejected::Locked)?;
        if self.completed.contains(&pattern.id) {
            return Err(EditRejected::Completed);
        }
        let id = pattern.id;
        self.code.insert(id, source);
        Ok(())
    }

    /// Register a run attempt and hand back the source to submit.
    pub fn begin_run(&mut self) -> Result<String, EditRejected> {
        if self.phase != SessionPhase::Active {
            return Err(EditRejected::NotActive);
        }
        let pattern = self.current_pattern().ok_or(EditRejected::Locked)?;
        if self.completed.contains(&pattern.id) {
            return Err(EditRejected::Completed);
        }
        let source = self.code.get(&pattern.id).cloned().unwrap_or_default();
        self.attempts += 1;
        Ok(source)
    }

    /// Feed an execution result back into the machine. A signalled or
    /// stderr-producing run is a failed attempt regardless of stdout.
    pub fn apply_run_outcome(&mut self, outcome: &ExecutionOutcome) -> Vec<Effect> {
        if self.phase != SessionPhase::Active {
            return vec![];
        }
        let Some(pattern) = self.current_pattern().cloned() else {
            return vec![];
        };

        let mut effects = vec![Effect::Log(LogLine::new(
            LogKind::System,
            "Execution complete.",
        ))];

        if let Some(signal) = outcome.run.signal.as_deref().filter(|s| !s.is_empty()) {
            effects.push(Effect::Log(LogLine::new(
                LogKind::Error,
                format!("PROCESS TERMINATED: {signal} (likely time/memory limit exceeded)"),
            )));
            return effects;
        }

        if !outcome.run.stderr.is_empty() {
            effects.push(Effect::Log(LogLine::new(
                LogKind::Error,
                outcome.run.stderr.clone(),
            )));
            return effects;
        }

        effects.push(Effect::Log(LogLine::new(
            LogKind::Output,
            outcome.run.stdout.clone(),
        )));

        if !pattern::matches(&outcome.run.stdout, &pattern.target_output) {
            effects.push(Effect::Log(LogLine::new(
                LogKind::Error,
                "PATTERN MISMATCH. ACCESS DENIED.",
            )));
            return effects;
        }

        if !self.completed.insert(pattern.id) {
            effects.push(Effect::Log(LogLine::new(
                LogKind::Info,
                "Pattern already completed.",
            )));
            return effects;
        }

        effects.push(Effect::Log(LogLine::new(
            LogKind::Success,
            "PATTERN MATCHED! ACCESS GRANTED.",
        )));
        // Persist the completion immediately rather than waiting for the
        // periodic sync; an abrupt session end must not lose it.
        effects.push(Effect::SyncNow);

        if self.completed.len() == self.catalog.len() {
            self.phase = SessionPhase::Finished;
            effects.push(Effect::Log(LogLine::new(
                LogKind::Success,
                "ALL PATTERNS MATCHED. MISSION ACCOMPLISHED.",
            )));
            effects.push(Effect::Finish(self.report()));
        } else if let Some(next) = self.advance_pointer() {
            effects.push(Effect::Log(LogLine::new(
                LogKind::Info,
                format!("Advancing to '{next}'"),
            )));
        }

        effects
    }

    /// Move to the next uncompleted pattern in catalog order.
    fn advance_pointer(&mut self) -> Option<String> {
        let len = self.catalog.len();
        for offset in 1..=len {
            let index = (self.current + offset) % len;
            if !self.completed.contains(&self.catalog[index].id) {
                self.current = index;
                return Some(self.catalog[index].name.clone());
            }
        }
        None
    }

    /// An in-app copy opens the paste window.
    pub fn record_copy(&mut self) {
        if self.phase == SessionPhase::Active {
            self.ms_since_copy = Some(0);
        }
    }

    /// A paste without a recent in-app copy accrues a warning when paste
    /// security is on. Never changes the phase.
    pub fn record_paste(&mut self) -> Vec<Effect> {
        if self.phase != SessionPhase::Active || !self.security.paste_security {
            return vec![];
        }
        if matches!(self.ms_since_copy, Some(ms) if ms < PASTE_WINDOW_MS) {
            return vec![];
        }
        self.warnings += 1;
        vec![Effect::Log(LogLine::new(
            LogKind::Warning,
            "UNAUTHORIZED PASTE ATTEMPT DETECTED. VIOLATION RECORDED.",
        ))]
    }

    /// Focus loss accrues a warning when focus security is on.
    pub fn record_focus_loss(&mut self) -> Vec<Effect> {
        if self.phase != SessionPhase::Active || !self.security.focus_security {
            return vec![];
        }
        self.warnings += 1;
        vec![Effect::Log(LogLine::new(
            LogKind::Warning,
            "WINDOW FOCUS LOST. VIOLATION RECORDED.",
        ))]
    }

    /// Current aggregates: elapsed = configured duration − remaining; LOC and
    /// loop counts summed across all per-pattern snapshots.
    pub fn report(&self) -> SessionReport {
        let stats = metrics::aggregate(&self.code);
        SessionReport {
            total_time_ms: self.duration_ms - self.remaining_ms,
            warnings: self.warnings,
            lines_of_code: stats.lines_of_code,
            no_of_loops: stats.loop_constructs,
            attempts: self.attempts,
            patterns_completed: self.completed.len() as u32,
            code_map: self.code.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProcessStage;

    fn catalog() -> Vec<PatternInfo> {
        vec![
            PatternInfo {
                id: 11,
                name: "Triangle".into(),
                target_output: "*\n* *\n* * *".into(),
                level_order: 1,
            },
            PatternInfo {
                id: 12,
                name: "Square".into(),
                target_output: "* *\n* *".into(),
                level_order: 2,
            },
            PatternInfo {
                id: 13,
                name: "Diamond".into(),
                target_output: "*\n* *\n*".into(),
                level_order: 3,
            },
        ]
    }

    fn active_engine() -> SessionEngine {
        let mut engine = SessionEngine::new(catalog(), 60_000, SecuritySettings::default());
        engine.start();
        engine
    }

    fn clean_run(stdout: &str) -> ExecutionOutcome {
        ExecutionOutcome {
            run: ProcessStage {
                stdout: stdout.into(),
                code: Some(0),
                ..Default::default()
            },
        }
    }

    fn complete_current(engine: &mut SessionEngine) -> Vec<Effect> {
        let target = engine.current_pattern().unwrap().target_output.clone();
        engine.begin_run().unwrap();
        engine.apply_run_outcome(&clean_run(&target))
    }

    fn non_log(effects: &[Effect]) -> Vec<&Effect> {
        effects
            .iter()
            .filter(|e| !matches!(e, Effect::Log(_)))
            .collect()
    }

    #[test]
    fn start_emits_login_and_activates() {
        let mut engine = SessionEngine::new(catalog(), 60_000, SecuritySettings::default());
        assert_eq!(engine.phase(), SessionPhase::Locked);
        let effects = engine.start();
        assert!(effects.contains(&Effect::Login));
        assert_eq!(engine.phase(), SessionPhase::Active);
        // Starting twice is a no-op.
        assert!(engine.start().is_empty());
    }

    #[test]
    fn duration_is_frozen_once_started() {
        let mut engine = SessionEngine::new(catalog(), 60_000, SecuritySettings::default());
        engine.set_duration(120_000);
        assert_eq!(engine.remaining_ms(), 120_000);
        engine.start();
        engine.set_duration(1);
        assert_eq!(engine.remaining_ms(), 120_000);
    }

    #[test]
    fn countdown_clamps_at_zero_and_disqualifies_once() {
        let mut engine = active_engine();
        assert!(engine.tick(59_999).is_empty());
        assert_eq!(engine.remaining_ms(), 1);

        let effects = engine.tick(5_000);
        assert_eq!(engine.remaining_ms(), 0);
        assert_eq!(engine.phase(), SessionPhase::Disqualified);
        assert_eq!(non_log(&effects), [&Effect::Disqualify]);

        // Further ticks never fire again.
        assert!(engine.tick(1_000).is_empty());
        assert_eq!(engine.remaining_ms(), 0);
    }

    #[test]
    fn disqualification_never_fires_for_a_finished_session() {
        let mut engine = active_engine();
        for _ in 0..3 {
            complete_current(&mut engine);
        }
        assert_eq!(engine.phase(), SessionPhase::Finished);
        assert!(engine.tick(120_000).is_empty());
        assert_eq!(engine.phase(), SessionPhase::Finished);
    }

    #[test]
    fn completing_a_pattern_syncs_immediately_and_advances() {
        let mut engine = active_engine();
        let effects = complete_current(&mut engine);
        assert!(effects.contains(&Effect::SyncNow));
        assert_eq!(engine.completed_count(), 1);
        assert_eq!(engine.current_pattern().unwrap().id, 12);
    }

    #[test]
    fn completing_all_patterns_finishes_with_final_aggregates() {
        let mut engine = active_engine();
        engine.tick(10_000);

        engine.set_code("for(;;){}\nline2".into()).unwrap();
        complete_current(&mut engine);
        engine.set_code("while(1){}".into()).unwrap();
        complete_current(&mut engine);
        engine.set_code("puts(\"x\");".into()).unwrap();
        let effects = complete_current(&mut engine);

        assert_eq!(engine.phase(), SessionPhase::Finished);
        let report = effects
            .iter()
            .find_map(|e| match e {
                Effect::Finish(r) => Some(r.clone()),
                _ => None,
            })
            .expect("exactly one finish effect");
        assert_eq!(report.patterns_completed, 3);
        assert_eq!(report.total_time_ms, 10_000);
        assert_eq!(report.attempts, 3);
        assert_eq!(report.lines_of_code, 4);
        assert_eq!(report.no_of_loops, 2);
    }

    #[test]
    fn signalled_output_never_matches() {
        let mut engine = active_engine();
        let target = engine.current_pattern().unwrap().target_output.clone();
        engine.begin_run().unwrap();
        let outcome = ExecutionOutcome {
            run: ProcessStage {
                stdout: target,
                signal: Some("SIGKILL".into()),
                ..Default::default()
            },
        };
        let effects = engine.apply_run_outcome(&outcome);
        assert!(non_log(&effects).is_empty());
        assert_eq!(engine.completed_count(), 0);
    }

    #[test]
    fn stderr_output_never_matches() {
        let mut engine = active_engine();
        let target = engine.current_pattern().unwrap().target_output.clone();
        engine.begin_run().unwrap();
        let outcome = ExecutionOutcome {
            run: ProcessStage {
                stdout: target,
                stderr: "warning: implicit declaration".into(),
                ..Default::default()
            },
        };
        engine.apply_run_outcome(&outcome);
        assert_eq!(engine.completed_count(), 0);
    }

    #[test]
    fn mismatched_output_is_a_failed_attempt() {
        let mut engine = active_engine();
        engine.begin_run().unwrap();
        let effects = engine.apply_run_outcome(&clean_run("wrong"));
        assert!(non_log(&effects).is_empty());
        assert_eq!(engine.completed_count(), 0);
        assert_eq!(engine.attempts(), 1);
        assert_eq!(engine.phase(), SessionPhase::Active);
    }

    #[test]
    fn matching_tolerates_whitespace_noise() {
        let mut engine = active_engine();
        engine.begin_run().unwrap();
        let effects = engine.apply_run_outcome(&clean_run("  *  \r\n* *\r\n\r\n* * *\r\n"));
        assert!(effects.contains(&Effect::SyncNow));
        assert_eq!(engine.completed_count(), 1);
    }

    #[test]
    fn pattern_lock_gating_follows_the_completed_prefix() {
        let mut engine = active_engine();
        assert!(engine.is_unlocked(0));
        assert!(!engine.is_unlocked(1));
        assert!(!engine.is_unlocked(2));
        assert_eq!(engine.select_pattern(2), Err(EditRejected::Locked));

        complete_current(&mut engine);
        assert!(engine.is_unlocked(1));
        assert!(!engine.is_unlocked(2));
        assert_eq!(engine.select_pattern(1), Ok(()));
    }

    #[test]
    fn completed_patterns_are_read_only() {
        let mut engine = active_engine();
        complete_current(&mut engine);
        engine.select_pattern(0).unwrap();
        assert_eq!(
            engine.set_code("edit".into()),
            Err(EditRejected::Completed)
        );
        assert_eq!(engine.begin_run(), Err(EditRejected::Completed));
    }

    #[test]
    fn terminal_phases_reject_edits_and_runs() {
        let mut engine = active_engine();
        engine.tick(60_000);
        assert_eq!(engine.phase(), SessionPhase::Disqualified);
        assert_eq!(engine.set_code("x".into()), Err(EditRejected::NotActive));
        assert_eq!(engine.begin_run(), Err(EditRejected::NotActive));
        assert!(engine.apply_run_outcome(&clean_run("anything")).is_empty());
    }

    #[test]
    fn paste_without_recent_copy_accrues_a_warning() {
        let mut engine = active_engine();
        let effects = engine.record_paste();
        assert_eq!(engine.warnings(), 1);
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn paste_after_in_app_copy_is_authorized() {
        let mut engine = active_engine();
        engine.record_copy();
        engine.tick(1_000);
        assert!(engine.record_paste().is_empty());
        assert_eq!(engine.warnings(), 0);
    }

    #[test]
    fn paste_window_expires() {
        let mut engine = SessionEngine::new(catalog(), PASTE_WINDOW_MS * 2, SecuritySettings::default());
        engine.start();
        engine.record_copy();
        engine.tick(PASTE_WINDOW_MS);
        engine.record_paste();
        assert_eq!(engine.warnings(), 1);
    }

    #[test]
    fn paste_security_toggle_disables_the_check() {
        let mut engine = active_engine();
        engine.update_security(SecuritySettings {
            paste_security: false,
            focus_security: true,
        });
        assert!(engine.record_paste().is_empty());
        assert_eq!(engine.warnings(), 0);
    }

    #[test]
    fn focus_loss_warns_only_when_enabled() {
        let mut engine = active_engine();
        engine.record_focus_loss();
        assert_eq!(engine.warnings(), 1);

        engine.update_security(SecuritySettings {
            paste_security: true,
            focus_security: false,
        });
        assert!(engine.record_focus_loss().is_empty());
        assert_eq!(engine.warnings(), 1);
    }

    #[test]
    fn warnings_are_counted_into_reports() {
        let mut engine = active_engine();
        engine.record_focus_loss();
        engine.record_paste();
        assert_eq!(engine.report().warnings, 2);
    }

    #[test]
    fn catalog_is_ordered_by_level_order_not_insertion() {
        let mut shuffled = catalog();
        shuffled.reverse();
        let engine = SessionEngine::new(shuffled, 60_000, SecuritySettings::default());
        let orders: Vec<i32> = engine.catalog().iter().map(|p| p.level_order).collect();
        assert_eq!(orders, [1, 2, 3]);
    }
}
