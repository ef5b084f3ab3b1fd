//! Offline submission verifier.
//!
//! Runs one recorded submission through an in-memory service with a session
//! opened to match it, then prints the outcome and any recorded flags as JSON.
//!
//! Usage:
//!   cargo run --bin verify_submission -- submission.json
//!   cargo run --bin verify_submission -- submission.json --config scoreguard.toml --mode free

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use scoreguard_server::clock::{Clock, SystemClock};
use scoreguard_server::config::ServiceConfig;
use scoreguard_server::escalation::PlayerAccount;
use scoreguard_server::session::{GameMode, GameSession};
use scoreguard_server::{GameSubmission, ScoreService, SubmitRequest};
use serde::Deserialize;
use serde_json::json;
use tracing::Level;

const SESSION_TTL_MS: u64 = 3_600_000;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Free,
    Ranked,
    Tournament,
}

impl From<Mode> for GameMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Free => GameMode::Free,
            Mode::Ranked => GameMode::Ranked,
            Mode::Tournament => GameMode::Tournament,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Verify a recorded score submission offline")]
struct Args {
    /// JSON submission, bare or wrapped in `{ "gameData": ... }`
    submission: PathBuf,

    /// TOML service config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address submitting the score
    #[arg(long, default_value = "0xverifier")]
    player: String,

    #[arg(long, value_enum, default_value = "ranked")]
    mode: Mode,

    /// Log replay and analyzer detail
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SubmissionFile {
    Wrapped(SubmitRequest),
    Bare(GameSubmission),
}

fn load_submission(path: &Path) -> Result<GameSubmission> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read submission {}", path.display()))?;
    let file: SubmissionFile =
        serde_json::from_str(&raw).context("Failed to parse submission JSON")?;
    Ok(match file {
        SubmissionFile::Wrapped(request) => request.game_data,
        SubmissionFile::Bare(submission) => submission,
    })
}

fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    let Some(path) = path else {
        return Ok(ServiceConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    Ok(ServiceConfig::from_toml_str(&raw)?)
}

fn run(args: &Args) -> Result<bool> {
    let submission = load_submission(&args.submission)?;
    let config = load_config(args.config.as_deref())?;
    let player = args.player.to_ascii_lowercase();

    let clock = Arc::new(SystemClock);
    let now = clock.now_ms();
    let service = ScoreService::in_memory(config, clock);
    service.players().insert(PlayerAccount::new(&player));
    service.sessions().insert(GameSession {
        session_id: submission.session_id.clone(),
        player: player.clone(),
        game_id: submission.game_id.clone(),
        mode: args.mode.into(),
        seed: submission.seed,
        started_at: now.saturating_sub(submission.duration),
        expires_at: now + SESSION_TTL_MS,
        completed_at: None,
        final_score: None,
        verified: false,
    })?;

    let result = service.submit_score(Some(&player), &submission);
    let flags = service
        .players()
        .get(&player)
        .map(|account| account.flags.reasons)
        .unwrap_or_default();

    let report = match &result {
        Ok(outcome) => json!({ "outcome": outcome, "flags": flags }),
        Err(err) => json!({
            "rejected": { "kind": err.kind(), "message": err.to_string() },
            "flags": flags,
        }),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(result.is_ok())
}

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}
