mod client;
mod session;
mod settings;
mod sync;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::{Parser, Subcommand};
use common::Language;
use console::style;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::client::{ApiClient, Identity, RunResponse, SessionTransport};
use crate::session::{
    Effect, LogKind, LogLine, SecuritySettings, SessionEngine, SessionPhase,
};
use crate::settings::OptimisticSetting;

#[derive(Parser)]
#[command(name = "gauntlet", about = "Participant client for the Gauntlet pattern assessment")]
struct Cli {
    /// Server base URL.
    #[arg(long, env = "GAUNTLET_SERVER", default_value = "http://127.0.0.1:5000")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a proctored session and drive it from the terminal.
    Run {
        #[arg(long)]
        lot_number: String,
        #[arg(long)]
        lot_name: String,
        #[arg(long)]
        college: Option<String>,
        /// Language for every pattern: "c" or "java".
        #[arg(long, default_value = "c")]
        language: String,
    },
    /// Print the current leaderboard.
    Leaderboard,
    /// Update one system setting (applied optimistically, reverted on failure).
    Settings { key: String, value: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            lot_number,
            lot_name,
            college,
            language,
        } => {
            let language: Language = language
                .parse()
                .map_err(|e| anyhow::anyhow!("{e}; expected \"c\" or \"java\""))?;
            let identity = Identity {
                lot_number,
                lot_name,
                college_name: college,
            };
            run_session(&cli.server, identity, language).await
        }
        Command::Leaderboard => print_leaderboard(&cli.server).await,
        Command::Settings { key, value } => update_setting(&cli.server, &key, &value).await,
    }
}

fn print_log(line: &LogLine) {
    let rendered = match line.kind {
        LogKind::System => style(&line.text).cyan().to_string(),
        LogKind::Info => style(&line.text).dim().to_string(),
        LogKind::Output => line.text.clone(),
        LogKind::Success => style(&line.text).green().bold().to_string(),
        LogKind::Warning => style(&line.text).yellow().to_string(),
        LogKind::Error => style(&line.text).red().to_string(),
    };
    println!("{rendered}");
}

/// Render remaining time as HH:MM:SS:cc.
fn format_time(ms: u64) -> String {
    let h = ms / 3_600_000;
    let m = (ms % 3_600_000) / 60_000;
    let s = (ms % 60_000) / 1000;
    let centis = (ms % 1000) / 10;
    format!("{h:02}:{m:02}:{s:02}:{centis:02}")
}

/// Duration from the settings snapshot, milliseconds taking precedence over
/// minutes, falling back to one hour.
fn session_duration_ms(snapshot: &BTreeMap<String, String>) -> u64 {
    if let Some(ms) = snapshot
        .get("SESSION_DURATION_MS")
        .and_then(|v| v.parse().ok())
    {
        return ms;
    }
    if let Some(minutes) = snapshot
        .get("SESSION_DURATION_MINUTES")
        .and_then(|v| v.parse::<u64>().ok())
    {
        return minutes * 60 * 1000;
    }
    3_600_000
}

fn security_settings(snapshot: &BTreeMap<String, String>) -> SecuritySettings {
    let enabled = |key: &str| snapshot.get(key).map(String::as_str) == Some("true");
    SecuritySettings {
        paste_security: enabled("PASTE_SECURITY"),
        focus_security: enabled("FOCUS_SECURITY"),
    }
}

async fn dispatch(
    effects: Vec<Effect>,
    client: &Arc<ApiClient>,
    engine: &Arc<Mutex<SessionEngine>>,
) {
    for effect in effects {
        if let Effect::Log(line) = &effect {
            print_log(line);
        }
        sync::perform(client.as_ref() as &dyn SessionTransport, engine, effect).await;
    }
}

async fn run_session(server: &str, identity: Identity, language: Language) -> anyhow::Result<()> {
    let client = Arc::new(ApiClient::new(server, identity));

    let snapshot = client
        .fetch_settings()
        .await
        .context("Failed to load settings")?;
    let duration_ms = session_duration_ms(&snapshot);
    let security = security_settings(&snapshot);

    let patterns = client
        .fetch_patterns()
        .await
        .context("Failed to load the pattern catalog")?;
    anyhow::ensure!(!patterns.is_empty(), "No patterns configured");

    println!(
        "{} {} patterns, {} on the clock, language {}",
        style("GAUNTLET").cyan().bold(),
        patterns.len(),
        format_time(duration_ms),
        language,
    );
    println!("Commands: run <file> | switch <n> | copy | paste | blur | status | quit");

    let engine = Arc::new(Mutex::new(SessionEngine::new(patterns, duration_ms, security)));

    // Settings re-poll: duration may still change while locked, and the
    // security toggles apply live during the session.
    let poller = tokio::spawn({
        let engine = engine.clone();
        let client = client.clone();
        async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(2));
            loop {
                ticker.tick().await;
                if engine.lock().unwrap().phase().is_terminal() {
                    break;
                }
                if let Ok(snapshot) = client.fetch_settings().await {
                    let mut guard = engine.lock().unwrap();
                    guard.update_security(security_settings(&snapshot));
                    if guard.phase() == SessionPhase::Locked {
                        guard.set_duration(session_duration_ms(&snapshot));
                    }
                }
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Press Enter to start the session...");
    lines.next_line().await?;

    let start_effects = engine.lock().unwrap().start();
    dispatch(start_effects, &client, &engine).await;

    let timer = tokio::spawn(sync::run_timer(
        engine.clone(),
        client.clone() as Arc<dyn SessionTransport>,
        print_log,
    ));
    let syncer = tokio::spawn(sync::run_sync(
        engine.clone(),
        client.clone() as Arc<dyn SessionTransport>,
    ));

    while let Some(line) = lines.next_line().await? {
        if engine.lock().unwrap().phase().is_terminal() {
            break;
        }

        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("run"), Some(path)) => {
                run_file(path, language, &client, &engine).await;
            }
            (Some("run"), None) => println!("usage: run <file>"),
            (Some("switch"), Some(index)) => match index.parse::<usize>() {
                Ok(n) => {
                    let result = engine.lock().unwrap().select_pattern(n.saturating_sub(1));
                    match result {
                        Ok(()) => {
                            let guard = engine.lock().unwrap();
                            if let Some(p) = guard.current_pattern() {
                                println!("Now on '{}':\n{}", p.name, p.target_output);
                            }
                        }
                        Err(e) => print_log(&LogLine {
                            kind: LogKind::Error,
                            text: e.to_string(),
                        }),
                    }
                }
                Err(_) => println!("usage: switch <pattern number>"),
            },
            (Some("copy"), _) => engine.lock().unwrap().record_copy(),
            (Some("paste"), _) => {
                let effects = engine.lock().unwrap().record_paste();
                dispatch(effects, &client, &engine).await;
            }
            (Some("blur"), _) => {
                let effects = engine.lock().unwrap().record_focus_loss();
                dispatch(effects, &client, &engine).await;
            }
            (Some("status"), _) => {
                let guard = engine.lock().unwrap();
                println!(
                    "{} | {}/{} patterns | {} warnings | {} attempts",
                    format_time(guard.remaining_ms()),
                    guard.completed_count(),
                    guard.catalog().len(),
                    guard.warnings(),
                    guard.attempts(),
                );
            }
            (Some("quit"), _) => break,
            (Some(other), _) => println!("unknown command '{other}'"),
            (None, _) => {}
        }
    }

    poller.abort();
    syncer.abort();
    timer.abort();

    let phase = engine.lock().unwrap().phase();
    if phase == SessionPhase::Active {
        // One last best-effort sync so a voluntary quit is not lost.
        let report = engine.lock().unwrap().report();
        let _ = client.sync_progress(&report).await;
    }

    Ok(())
}

async fn run_file(
    path: &str,
    language: Language,
    client: &Arc<ApiClient>,
    engine: &Arc<Mutex<SessionEngine>>,
) {
    let source = match tokio::fs::read_to_string(path).await {
        Ok(source) => source,
        Err(e) => {
            print_log(&LogLine {
                kind: LogKind::Error,
                text: format!("Cannot read {path}: {e}"),
            });
            return;
        }
    };

    let submitted = {
        let mut guard = engine.lock().unwrap();
        match guard.set_code(source) {
            Ok(()) => guard.begin_run(),
            Err(e) => Err(e),
        }
    };
    let code = match submitted {
        Ok(code) => code,
        Err(e) => {
            print_log(&LogLine {
                kind: LogKind::Error,
                text: e.to_string(),
            });
            return;
        }
    };

    print_log(&LogLine {
        kind: LogKind::Info,
        text: format!("> Sending code to compiler ({language})..."),
    });

    match client.execute(language.as_str(), &code).await {
        Ok(RunResponse::Completed(outcome)) => {
            let effects = engine.lock().unwrap().apply_run_outcome(&outcome);
            dispatch(effects, client, engine).await;
        }
        Ok(RunResponse::Rejected { status, message }) => {
            // Rate limiting is a wait-and-retry, not a failure.
            let kind = if status == 429 {
                LogKind::Warning
            } else {
                LogKind::Error
            };
            print_log(&LogLine {
                kind,
                text: format!("> Server: {message}"),
            });
        }
        Err(e) => print_log(&LogLine {
            kind: LogKind::Error,
            text: format!("> Network error: {e}"),
        }),
    }
}

async fn print_leaderboard(server: &str) -> anyhow::Result<()> {
    let client = ApiClient::new(
        server,
        Identity {
            lot_number: String::new(),
            lot_name: String::new(),
            college_name: None,
        },
    );
    let rows = client.fetch_leaderboard().await?;

    println!(
        "{:<4} {:<12} {:<20} {:<13} {:>9} {:>12} {:>6} {:>5} {:>9} {:>9}",
        "#", "LOT", "NAME", "STATUS", "PATTERNS", "TIME", "LOOPS", "LOC", "WARNINGS", "ATTEMPTS"
    );
    for (position, row) in rows.iter().enumerate() {
        println!(
            "{:<4} {:<12} {:<20} {:<13} {:>9} {:>12} {:>6} {:>5} {:>9} {:>9}",
            position + 1,
            row.lot_number,
            row.lot_name,
            row.status,
            row.patterns_completed,
            format_time(row.total_time.max(0) as u64),
            row.no_of_loops,
            row.lines_of_code,
            row.warnings,
            row.attempts,
        );
    }
    Ok(())
}

async fn update_setting(server: &str, key: &str, value: &str) -> anyhow::Result<()> {
    let client = ApiClient::new(
        server,
        Identity {
            lot_number: String::new(),
            lot_name: String::new(),
            college_name: None,
        },
    );

    let snapshot = client.fetch_settings().await?;
    let current = snapshot
        .get(key)
        .with_context(|| format!("Unknown setting '{key}'"))?;

    let mut setting = OptimisticSetting::new(key, current);
    setting.begin_update(value);
    println!("{} = {} (pending)", setting.key(), setting.value());

    match client.update_setting(key, value).await {
        Ok(()) => {
            setting.commit();
            println!("{} = {} {}", setting.key(), setting.value(), style("saved").green());
        }
        Err(e) => {
            setting.revert();
            println!(
                "{} = {} {} ({e})",
                setting.key(),
                setting.value(),
                style("reverted").red()
            );
        }
    }
    Ok(())
}
