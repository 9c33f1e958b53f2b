use std::{collections::BTreeMap, fs, path::PathBuf};

use clap::Parser;
use encoding_rs::Encoding;
use gacha_engine::data::{MonsterData, RosterEntry, SkillBook};
use gacha_engine::{content, resolve_battle, BattleOptions};

#[derive(Parser)]
#[command(name = "simulate-many")]
#[command(about = "Monte Carlo sim: many seeded battles of one roster vs one monster")]
struct Args {
    /// Roster JSON file (falls back to the bundled --roster-id)
    #[arg(long)]
    roster: Option<PathBuf>,

    #[arg(long, default_value = "starter_party")]
    roster_id: String,

    /// Monster JSON file (falls back to the bundled --monster-id)
    #[arg(long)]
    monster: Option<PathBuf>,

    #[arg(long, default_value = "goblin_chief")]
    monster_id: String,

    /// Extra skill table JSON merged over the bundled one
    #[arg(long)]
    skills: Vec<PathBuf>,

    /// Number of trials
    #[arg(long, default_value_t = 200)]
    trials: u32,

    /// Turn cap per trial
    #[arg(long, default_value_t = 99)]
    max_turns: u32,

    /// RNG base seed (trial i uses seed+i)
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Keep buffs after a win, as inside a dungeon run
    #[arg(long, default_value_t = false)]
    keep_buffs: bool,
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

fn load_roster(args: &Args) -> anyhow::Result<Vec<RosterEntry>> {
    match &args.roster {
        Some(path) => Ok(serde_json::from_str(&read_text_auto(path)?)?),
        None => content::roster(&args.roster_id),
    }
}

fn load_monster(args: &Args) -> anyhow::Result<MonsterData> {
    match &args.monster {
        Some(path) => Ok(serde_json::from_str(&read_text_auto(path)?)?),
        None => content::monster(&args.monster_id),
    }
}

fn load_book(args: &Args) -> anyhow::Result<SkillBook> {
    let mut book = content::skill_book()?;
    for path in &args.skills {
        book.merge(SkillBook::from_json_str(&read_text_auto(path)?)?);
    }
    book.validate()?;
    Ok(book)
}

fn median(sorted: &[u32]) -> u32 {
    if sorted.is_empty() {
        return 0;
    }
    let m = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[m]
    } else {
        (sorted[m - 1] + sorted[m]) / 2
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.trials == 0 {
        anyhow::bail!("--trials must be at least 1");
    }

    let roster = load_roster(&args)?;
    let monster = load_monster(&args)?;
    let book = load_book(&args)?;

    let mut wins = 0u32;
    let mut capped = 0u32;
    let mut win_turns: Vec<u32> = Vec::with_capacity(args.trials as usize);
    let mut damage_total = 0i64;
    let mut gold_total = 0u64;
    let mut mvps: BTreeMap<String, u32> = BTreeMap::new();

    for i in 0..args.trials {
        let options = BattleOptions {
            seed: args.seed.wrapping_add(i as u64),
            keep_buffs: args.keep_buffs,
            max_turns: args.max_turns,
        };
        let result = resolve_battle(&roster, &monster, book.clone(), options)?;
        damage_total += result.battle_stats.total_damage;
        gold_total += result.gold;
        if result.victory {
            wins += 1;
            win_turns.push(result.turns);
        } else if result.turns >= args.max_turns {
            capped += 1;
        }
        if let Some(mvp) = result.mvp {
            *mvps.entry(mvp.id).or_insert(0) += 1;
        }
    }

    win_turns.sort_unstable();
    let trials_f = args.trials as f64;
    let avg_turns = if win_turns.is_empty() {
        0.0
    } else {
        win_turns.iter().map(|&t| t as u64).sum::<u64>() as f64 / win_turns.len() as f64
    };

    println!("simulate-many results");
    println!("---------------------");
    println!("trials:             {}", args.trials);
    println!("roster:             {} members", roster.len());
    println!("monster:            {} ({:?} HP)", monster.name, monster.max_hp);
    println!();
    println!("win rate:           {:.1}%", wins as f64 / trials_f * 100.0);
    println!("turn cap reached:   {}", capped);
    println!("avg turns (wins):   {:.2}", avg_turns);
    println!("median turns:       {}", median(&win_turns));
    println!("avg party damage:   {:.0}", damage_total as f64 / trials_f);
    println!("avg gold:           {:.1}", gold_total as f64 / trials_f);
    println!();
    println!("mvp counts:");
    for (id, count) in &mvps {
        println!("  {:<16} {}", id, count);
    }

    Ok(())
}
