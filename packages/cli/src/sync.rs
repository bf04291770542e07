//! Timer and progress-sync loops around the session engine.
//!
//! Both loops are best-effort on the network: a failed sync is logged and
//! skipped, never retried, and never blocks the countdown.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::warn;

use crate::client::SessionTransport;
use crate::session::{Effect, LogLine, SessionEngine};

/// Countdown resolution; well under a second for sub-second display.
pub const TIMER_TICK: Duration = Duration::from_millis(50);

/// Periodic progress sync interval.
pub const SYNC_INTERVAL: Duration = Duration::from_secs(5);

/// Execute one non-log effect over the transport.
pub async fn perform(
    transport: &dyn SessionTransport,
    engine: &Mutex<SessionEngine>,
    effect: Effect,
) {
    match effect {
        Effect::Login => {
            if let Err(e) = transport.login().await {
                warn!("Login sync failed: {e}");
            }
        }
        Effect::SyncNow => {
            let report = engine.lock().unwrap().report();
            if let Err(e) = transport.sync_progress(&report).await {
                warn!("Completion sync failed: {e}");
            }
        }
        Effect::Finish(report) => {
            if let Err(e) = transport.finish(&report).await {
                warn!("Finish call failed: {e}");
            }
        }
        Effect::Disqualify => {
            if let Err(e) = transport.disqualify().await {
                warn!("Disqualify call failed: {e}");
            }
        }
        Effect::Log(_) => {}
    }
}

/// Drive the countdown until the session reaches a terminal phase. Emitted
/// log lines are forwarded to `on_log`.
pub async fn run_timer(
    engine: Arc<Mutex<SessionEngine>>,
    transport: Arc<dyn SessionTransport>,
    on_log: impl Fn(&LogLine),
) {
    let mut ticker = interval(TIMER_TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last = Instant::now();

    loop {
        ticker.tick().await;
        let now = Instant::now();
        let elapsed_ms = now.duration_since(last).as_millis() as u64;
        last = now;

        let (effects, terminal) = {
            let mut guard = engine.lock().unwrap();
            let effects = guard.tick(elapsed_ms);
            (effects, guard.phase().is_terminal())
        };

        for effect in effects {
            if let Effect::Log(line) = &effect {
                on_log(line);
            }
            perform(transport.as_ref(), &engine, effect).await;
        }

        if terminal {
            break;
        }
    }
}

/// Periodic best-effort progress persistence while the session is active.
pub async fn run_sync(engine: Arc<Mutex<SessionEngine>>, transport: Arc<dyn SessionTransport>) {
    let mut ticker = interval(SYNC_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let (report, phase) = {
            let guard = engine.lock().unwrap();
            (guard.report(), guard.phase())
        };

        if phase.is_terminal() {
            break;
        }
        if phase != crate::session::SessionPhase::Active {
            continue;
        }

        if let Err(e) = transport.sync_progress(&report).await {
            warn!("Progress sync failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{PatternInfo, SecuritySettings, SessionReport};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingTransport {
        syncs: AtomicUsize,
        disqualifies: AtomicUsize,
        fail_syncs: AtomicBool,
    }

    #[async_trait]
    impl SessionTransport for RecordingTransport {
        async fn login(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn sync_progress(&self, _report: &SessionReport) -> anyhow::Result<()> {
            self.syncs.fetch_add(1, Ordering::SeqCst);
            if self.fail_syncs.load(Ordering::SeqCst) {
                anyhow::bail!("store unreachable");
            }
            Ok(())
        }

        async fn finish(&self, _report: &SessionReport) -> anyhow::Result<()> {
            Ok(())
        }

        async fn disqualify(&self) -> anyhow::Result<()> {
            self.disqualifies.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn catalog() -> Vec<PatternInfo> {
        vec![PatternInfo {
            id: 1,
            name: "Triangle".into(),
            target_output: "*".into(),
            level_order: 1,
        }]
    }

    fn active_engine(duration_ms: u64) -> Arc<Mutex<SessionEngine>> {
        let mut engine = SessionEngine::new(catalog(), duration_ms, SecuritySettings::default());
        engine.start();
        Arc::new(Mutex::new(engine))
    }

    async fn settle() {
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_sync_fires_on_the_interval() {
        let engine = active_engine(3_600_000);
        let transport = Arc::new(RecordingTransport::default());
        let handle = tokio::spawn(run_sync(engine.clone(), transport.clone()));

        settle().await;
        for _ in 0..3 {
            tokio::time::advance(SYNC_INTERVAL).await;
            settle().await;
        }

        // First tick fires immediately, then one per interval.
        assert_eq!(transport.syncs.load(Ordering::SeqCst), 4);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn sync_failures_do_not_stop_the_loop() {
        let engine = active_engine(3_600_000);
        let transport = Arc::new(RecordingTransport::default());
        transport.fail_syncs.store(true, Ordering::SeqCst);
        let handle = tokio::spawn(run_sync(engine.clone(), transport.clone()));

        settle().await;
        for _ in 0..2 {
            tokio::time::advance(SYNC_INTERVAL).await;
            settle().await;
        }

        assert!(transport.syncs.load(Ordering::SeqCst) >= 3);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn sync_loop_stops_on_terminal_phase() {
        let engine = active_engine(3_600_000);
        let transport = Arc::new(RecordingTransport::default());
        let handle = tokio::spawn(run_sync(engine.clone(), transport.clone()));

        settle().await;
        engine.lock().unwrap().tick(3_600_000);

        tokio::time::advance(SYNC_INTERVAL).await;
        settle().await;

        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn timer_disqualifies_and_stops_at_zero() {
        let engine = active_engine(200);
        let transport = Arc::new(RecordingTransport::default());
        let handle = tokio::spawn(run_timer(engine.clone(), transport.clone(), |_| {}));

        settle().await;
        tokio::time::advance(Duration::from_millis(400)).await;
        settle().await;

        assert!(handle.is_finished());
        assert_eq!(transport.disqualifies.load(Ordering::SeqCst), 1);
        assert!(
            engine.lock().unwrap().phase()
                == crate::session::SessionPhase::Disqualified
        );
    }
}
