use std::io::Read;
use std::{fs, path::PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use encoding_rs::Encoding;
use gacha_engine::api::{self, BattleConfig};
use gacha_engine::{content, BattleResult, LogLevel};
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, ValueEnum)]
enum Sink {
    Battle,
    Info,
    Detail,
}

#[derive(Copy, Clone, ValueEnum)]
enum ContentKind {
    Skills,
    Monsters,
    Rosters,
}

#[derive(Subcommand)]
enum Cmd {
    /// Resolve one battle described by a JSON or YAML config file
    Battle {
        /// Path to the battle config
        #[arg(long)]
        config: PathBuf,
        /// Override the config's RNG seed
        #[arg(long)]
        seed: Option<u64>,
        /// Which log sink to print
        #[arg(long, value_enum, default_value_t = Sink::Battle)]
        log: Sink,
        /// Print the full result as JSON instead of the log
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Resolve a battle between bundled roster and monster
    Quick {
        #[arg(long, default_value = "starter_party")]
        roster: String,
        #[arg(long, default_value = "goblin_chief")]
        monster: String,
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Turn cap
        #[arg(long)]
        max_turns: Option<u32>,
        /// Which log sink to print
        #[arg(long, value_enum, default_value_t = Sink::Battle)]
        log: Sink,
    },
    /// Print bundled content tables
    Content {
        #[arg(value_enum)]
        kind: ContentKind,
        /// Only this id (monsters and rosters)
        #[arg(long)]
        id: Option<String>,
    },
    /// Read a JSON battle request on stdin, write the JSON reply to stdout
    Json,
}

#[derive(Parser)]
#[command(name = "gacha-cli")]
#[command(about = "Gacha battle engine harness")]
struct Cli {
    /// More tracing output on stderr (-v info, -vv debug); RUST_LOG wins
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Cmd,
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_text_auto(path: &std::path::Path) -> anyhow::Result<String> {
    let bytes = fs::read(path)?;
    if let Some((enc, bom_len)) = Encoding::for_bom(&bytes) {
        let (cow, _, _) = enc.decode(&bytes[bom_len..]);
        Ok(cow.into_owned())
    } else {
        Ok(String::from_utf8(bytes)?)
    }
}

fn print_result(result: &BattleResult, sink: Sink) {
    let level = match sink {
        Sink::Battle => LogLevel::Battle,
        Sink::Info => LogLevel::Info,
        Sink::Detail => LogLevel::Detail,
    };
    for line in result.full_log.lines(level) {
        println!("{}", line);
    }
    let mvp = result
        .mvp
        .as_ref()
        .map(|m| format!("{} ({:.0})", m.id, m.score))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "victory={} turns={} gold={} exp={} mvp={}",
        result.victory, result.turns, result.gold, result.exp, mvp
    );
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Cmd::Battle { config, seed, log, json } => {
            let text = read_text_auto(&config)
                .with_context(|| format!("failed to read config: {}", config.display()))?;
            let mut cfg = api::parse_config(&text, &config.to_string_lossy())?;
            if let Some(seed) = seed {
                cfg.seed = seed;
            }
            let result = api::simulate_battle(&cfg)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result, log);
            }
        }
        Cmd::Quick { roster, monster, seed, max_turns, log } => {
            let cfg = BattleConfig {
                roster_path: None,
                roster_id: Some(roster),
                monster_path: None,
                monster_id: Some(monster),
                skill_paths: Vec::new(),
                include_builtin_skills: true,
                seed,
                keep_buffs: false,
                max_turns,
            };
            let result = api::simulate_battle(&cfg)?;
            print_result(&result, log);
        }
        Cmd::Content { kind, id } => match kind {
            ContentKind::Skills => println!("{}", content::builtin_skills()),
            ContentKind::Monsters | ContentKind::Rosters => {
                let table = match kind {
                    ContentKind::Monsters => content::builtin_monsters(),
                    _ => content::builtin_rosters(),
                };
                match id {
                    Some(id) => match table.get(id.as_str()) {
                        Some(text) => println!("{}", text),
                        None => bail!("no bundled entry '{}'", id),
                    },
                    None => {
                        let mut ids: Vec<_> = table.keys().copied().collect();
                        ids.sort_unstable();
                        for id in ids {
                            println!("{}", id);
                        }
                    }
                }
            }
        },
        Cmd::Json => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("failed to read request from stdin")?;
            println!("{}", gacha_ffi::resolve_battle_json(&input));
        }
    }
    Ok(())
}
