//! Turn loop and result assembly.
//!
//! A battle runs `TurnStart → SkillPhase → AttackPhase → EnemyPhase →
//! TurnEnd` until the monster falls, the party is wiped out or the turn cap
//! is reached. Every phase boundary checks for the end of the battle.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::buffs::{self, Buff, BuffKind};
use crate::combat::actions::{normal_attack, pick_threat_target};
use crate::combat::procs::{self, ProcContext};
use crate::combat::skills;
use crate::combatant::{
    CombatCounters, Combatant, Side, Stats, BASE_CRIT_DAMAGE, BASE_CRIT_RATE, MONSTER_DA_RATE,
    MONSTER_TA_RATE,
};
use crate::data::{GoldReward, MonsterData, RosterEntry, SkillBook, Trigger};
use crate::error::DataError;
use crate::log::BattleLog;
use crate::roster;
use crate::session::BattleSession;
use crate::Dice;

pub const MAX_TURNS: u32 = 99;
pub const VICTORY_HEAL_RATIO: f64 = 0.25;
pub const FALLBACK_MONSTER_HP: i64 = 10_000;
pub const MVP_HEALING_WEIGHT: f64 = 1.5;
const CARRIED_BUFF_DURATION: i32 = 3;

/// Presentation events, one per re-render a client would need.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum BattleEvent {
    #[serde(rename = "battle:start")]
    Start {
        front_line: Vec<Option<String>>,
        back_line: Vec<String>,
        monster: String,
    },
    #[serde(rename = "battle:turn-end")]
    TurnEnd { turn: u32, hp: IndexMap<String, i64> },
    #[serde(rename = "battle:frontlineChanged")]
    FrontlineChanged {
        slot: usize,
        combatant: String,
        front_line: Vec<Option<String>>,
    },
    #[serde(rename = "battle:end")]
    End { victory: bool, turns: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct BattleOptions {
    pub seed: u64,
    /// Dungeon runs keep buffs between encounters.
    pub keep_buffs: bool,
    pub max_turns: u32,
}

impl Default for BattleOptions {
    fn default() -> Self {
        Self { seed: 0, keep_buffs: false, max_turns: MAX_TURNS }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mvp {
    pub id: String,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleStats {
    pub total_damage: i64,
    pub total_healing: i64,
    pub character_stats: IndexMap<String, CombatCounters>,
    pub monster_stats: CombatCounters,
    pub skills_used: IndexMap<String, u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleResult {
    pub success: bool,
    pub victory: bool,
    pub turns: u32,
    pub gold: u64,
    pub exp: u64,
    pub mvp: Option<Mvp>,
    pub battle_stats: BattleStats,
    pub battle_log: Vec<String>,
    pub events: Vec<BattleEvent>,
    pub combatants: Vec<Combatant>,
    /// Every sink, for callers that want the detail or info lines too.
    #[serde(skip)]
    pub full_log: BattleLog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Victory,
    Defeat,
    TurnCap,
}

/// What the monster drops on victory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rewards {
    pub exp: u64,
    pub gold: GoldReward,
}

impl From<&MonsterData> for Rewards {
    fn from(m: &MonsterData) -> Self {
        Self { exp: m.xp_reward, gold: m.gold_reward }
    }
}

fn monster_combatant(data: &MonsterData) -> (Combatant, bool) {
    let hp = data.max_hp.filter(|hp| hp.is_finite() && *hp >= 1.0);
    let malformed = hp.is_none();
    let base = Stats {
        max_hp: hp.map_or(FALLBACK_MONSTER_HP, |hp| hp.floor() as i64),
        attack: data.attack.max(0.0),
        defense: data.defense.max(0.0),
        crit_rate: data.crit_rate.unwrap_or(BASE_CRIT_RATE),
        crit_damage: BASE_CRIT_DAMAGE,
        da_rate: data.da_rate.unwrap_or(MONSTER_DA_RATE),
        ta_rate: data.ta_rate.unwrap_or(MONSTER_TA_RATE),
        ignore_defense: 0.0,
    };
    let c = Combatant::new(data.id.clone(), data.name.clone(), Side::Enemy, base)
        .with_element(data.element)
        .with_skills(data.skills.clone())
        .with_passives(data.passives.clone());
    (c, malformed)
}

fn player_combatant(entry: &RosterEntry) -> Combatant {
    let c = Combatant::new(entry.id.clone(), entry.name.clone(), Side::Player, entry.stats)
        .with_element(entry.element)
        .with_skills(entry.skills.clone())
        .with_passives(entry.passives.clone());
    match entry.hp {
        Some(hp) => c.with_hp(hp),
        None => c,
    }
}

/// Builds the session for one encounter. Roster problems are reported here;
/// nothing after this point fails.
pub fn build_session(
    roster: &[RosterEntry],
    monster: &MonsterData,
    book: SkillBook,
    dice: Dice,
) -> Result<BattleSession, DataError> {
    if roster.is_empty() {
        return Err(DataError::EmptyRoster);
    }
    let mut seen = HashSet::new();
    for id in roster.iter().map(|e| e.id.as_str()).chain(std::iter::once(monster.id.as_str())) {
        if !seen.insert(id) {
            return Err(DataError::DuplicateCombatant(id.to_string()));
        }
    }
    book.validate()?;

    let players = roster.iter().map(player_combatant).collect();
    let (monster_c, malformed) = monster_combatant(monster);
    let mut session = BattleSession::new(players, monster_c, book, dice);

    if malformed {
        session.log.error(format!(
            "monster '{}' has no usable max HP; using {}",
            monster.id, FALLBACK_MONSTER_HP
        ));
    }
    for c in &session.combatants {
        for skill in c.skills.iter().chain(&c.passives) {
            if session.book.get(skill).is_none() {
                let line = format!("[DATA][{}] unknown skill '{}' will be ignored", c.name, skill);
                session.log.warn(line);
            }
        }
    }
    for (idx, entry) in roster.iter().enumerate() {
        for spec in &entry.carried_buffs {
            let buff = Buff::from_spec(spec, None, CARRIED_BUFF_DURATION);
            buffs::apply_buff(&mut session.combatants[idx], buff, &mut session.log);
        }
    }
    Ok(session)
}

/// Resolves one encounter end to end with a seeded RNG.
pub fn resolve_battle(
    roster: &[RosterEntry],
    monster: &MonsterData,
    book: SkillBook,
    options: BattleOptions,
) -> Result<BattleResult, DataError> {
    let session = build_session(roster, monster, book, Dice::from_seed(options.seed))?;
    Ok(BattleController::new(session, Rewards::from(monster), options).run())
}

pub struct BattleController {
    session: BattleSession,
    rewards: Rewards,
    options: BattleOptions,
}

impl BattleController {
    pub fn new(session: BattleSession, rewards: Rewards, options: BattleOptions) -> Self {
        Self { session, rewards, options }
    }

    pub fn session(&self) -> &BattleSession {
        &self.session
    }

    pub fn run(mut self) -> BattleResult {
        self.start();
        let mut outcome = None;
        while outcome.is_none() && self.session.turn < self.options.max_turns {
            outcome = self.play_turn();
        }
        let outcome = outcome.unwrap_or_else(|| {
            self.session.log.battle("[BATTLE] turn limit reached");
            Outcome::TurnCap
        });
        self.finish(outcome)
    }

    fn over(&self) -> Option<Outcome> {
        if !self.session.monster().is_alive() {
            Some(Outcome::Victory)
        } else if roster::is_team_defeated(&self.session) {
            Some(Outcome::Defeat)
        } else {
            None
        }
    }

    fn start(&mut self) {
        let s = &mut self.session;
        let line = format!(
            "[BATTLE] {} party members vs {} ({} HP)",
            s.player_ids().len(),
            s.monster().name,
            s.monster().hp
        );
        s.log.battle(line);
        let event = BattleEvent::Start {
            front_line: s.front_line_keys(),
            back_line: s.back_line.iter().map(|id| s.get(*id).key.clone()).collect(),
            monster: s.monster().key.clone(),
        };
        s.events.push(event);

        let mut everyone = s.player_ids();
        everyone.push(s.monster);
        for id in everyone {
            procs::fire(s, id, Trigger::BattleStart, ProcContext::default());
        }
    }

    fn play_turn(&mut self) -> Option<Outcome> {
        let phases: [fn(&mut Self) -> Option<Outcome>; 5] = [
            Self::turn_start,
            Self::skill_phase,
            Self::attack_phase,
            Self::enemy_phase,
            Self::turn_end,
        ];
        phases.into_iter().find_map(|phase| phase(self))
    }

    fn turn_start(&mut self) -> Option<Outcome> {
        let s = &mut self.session;
        s.turn += 1;
        s.log.set_turn(s.turn);
        s.log.battle(format!("[TURN] turn {} begins", s.turn));
        roster::check_reinforcement(s);

        for id in s.active_ids() {
            let tick = buffs::process_turn_start(&mut s.combatants[id.0], &mut s.log);
            if tick.damage > 0 && !s.get(id).is_alive() {
                roster::handle_defeat(s, id);
            }
        }
        for id in s.active_ids() {
            procs::fire(s, id, Trigger::OnTurnStart, ProcContext::default());
        }
        self.over()
    }

    fn skill_phase(&mut self) -> Option<Outcome> {
        for id in self.session.front_ids() {
            let skill_ids = self.session.get(id).skills.clone();
            for skill_id in skill_ids {
                let c = self.session.get(id);
                if !self.session.is_front(id) || !c.is_alive() || c.has_buff(BuffKind::Stun) {
                    break;
                }
                let usable = self.session.book.get(&skill_id).is_some_and(|s| !s.is_passive());
                if !usable || c.is_on_cooldown(&skill_id) {
                    continue;
                }
                skills::use_skill(&mut self.session, id, &skill_id);
                if let Some(outcome) = self.over() {
                    return Some(outcome);
                }
            }
        }
        None
    }

    fn attack_phase(&mut self) -> Option<Outcome> {
        let monster = self.session.monster;
        for id in self.session.front_ids() {
            let c = self.session.get(id);
            if !self.session.is_front(id) || !c.is_alive() {
                continue;
            }
            if c.has_buff(BuffKind::Stun) || c.has_buff(BuffKind::Numbness) {
                let line = format!("[ATK][{}] cannot move", c.name);
                self.session.log.info(line);
                continue;
            }
            normal_attack(&mut self.session, id, monster);
            if let Some(outcome) = self.over() {
                return Some(outcome);
            }
        }
        None
    }

    /// The monster acts once: a threshold skill, else a regular skill, else
    /// a normal attack on its threat pick.
    fn enemy_phase(&mut self) -> Option<Outcome> {
        if let Some(outcome) = self.over() {
            return Some(outcome);
        }
        let s = &mut self.session;
        let monster = s.monster;
        let m = s.get(monster);
        if m.has_buff(BuffKind::Stun) {
            let line = format!("[ENEMY][{}] is stunned", m.name);
            s.log.battle(line);
            return None;
        }

        let ratio = m.hp_ratio();
        let mut threshold: Vec<(i32, String)> = Vec::new();
        let mut regular: Vec<String> = Vec::new();
        for skill_id in &m.skills {
            let Some(skill) = s.book.get(skill_id) else {
                continue;
            };
            if skill.is_passive() || m.is_on_cooldown(skill_id) {
                continue;
            }
            match skill.hp_threshold {
                Some(t) if ratio <= t && !m.has_used(skill_id) => threshold.push((skill.priority, skill_id.clone())),
                Some(_) => {}
                None => regular.push(skill_id.clone()),
            }
        }
        threshold.sort_by(|a, b| b.0.cmp(&a.0));

        // nobody on the field until reinforcements arrive
        let Some(primary) = pick_threat_target(s) else {
            return None;
        };

        let mut acted = false;
        for (_, skill_id) in &threshold {
            if skills::use_skill_on(s, monster, skill_id, Some(primary)).success {
                acted = true;
                break;
            }
        }
        if !acted && !regular.is_empty() {
            let weights = vec![1.0; regular.len()];
            if let Some(idx) = s.dice.weighted_index(&weights) {
                acted = skills::use_skill_on(s, monster, &regular[idx], Some(primary)).success;
            }
        }
        if !acted && s.get(monster).is_alive() && s.get(primary).is_alive() {
            normal_attack(s, monster, primary);
        }
        self.over()
    }

    fn turn_end(&mut self) -> Option<Outcome> {
        let s = &mut self.session;
        for id in s.active_ids() {
            if !s.get(id).is_alive() {
                continue;
            }
            buffs::update_durations(&mut s.combatants[id.0], &mut s.log);
            s.get_mut(id).tick_cooldowns();
        }
        for id in s.active_ids() {
            procs::fire(s, id, Trigger::OnTurnEnd, ProcContext::default());
        }

        let snapshot: Vec<String> = s
            .combatants
            .iter()
            .map(|c| format!("{} {}/{}", c.name, c.hp, c.max_hp()))
            .collect();
        s.log.info(format!("[HP] {}", snapshot.join(", ")));
        let hp = s.combatants.iter().map(|c| (c.key.clone(), c.hp)).collect();
        let turn = s.turn;
        s.events.push(BattleEvent::TurnEnd { turn, hp });
        self.over()
    }

    fn finish(mut self, outcome: Outcome) -> BattleResult {
        let victory = outcome == Outcome::Victory;
        let s = &mut self.session;
        let mut gold = 0;
        let mut exp = 0;

        match outcome {
            Outcome::Victory => {
                let reward = self.rewards.gold;
                gold = s.dice.range_inclusive(reward.min, reward.max.max(reward.min));
                exp = self.rewards.exp;
                let line = format!("[VICTORY] {} falls after {} turns", s.monster().name, s.turn);
                s.log.battle(line);
                s.log.battle(format!("[REWARD] {} exp, {} gold", exp, gold));
                for id in s.player_ids() {
                    let c = s.get_mut(id);
                    let amount = ((c.max_hp() as f64) * VICTORY_HEAL_RATIO).floor() as i64;
                    let healed = c.heal(amount);
                    if healed > 0 {
                        let line = format!("[REST][{}] recovers {} HP", c.name, healed);
                        s.log.info(line);
                    }
                }
            }
            Outcome::Defeat => {
                let line = format!("[DEFEAT] the party is wiped out on turn {}", s.turn);
                s.log.battle(line);
            }
            Outcome::TurnCap => {
                let line = format!("[DEFEAT] {} is still standing", s.monster().name);
                s.log.battle(line);
            }
        }

        if !(victory && self.options.keep_buffs) {
            for c in s.combatants.iter_mut() {
                buffs::clear_all(c);
            }
        }

        let turns = s.turn;
        s.events.push(BattleEvent::End { victory, turns });

        let mut stats = BattleStats { skills_used: s.skills_used.clone(), ..BattleStats::default() };
        for c in &s.combatants {
            match c.side {
                Side::Player => {
                    stats.total_damage += c.stats.total_damage;
                    stats.total_healing += c.stats.total_healing;
                    stats.character_stats.insert(c.key.clone(), c.stats.clone());
                }
                Side::Enemy => stats.monster_stats = c.stats.clone(),
            }
        }

        BattleResult {
            success: true,
            victory,
            turns,
            gold,
            exp,
            mvp: mvp(&s.combatants),
            battle_stats: stats,
            battle_log: s.log.battle_lines(),
            events: std::mem::take(&mut s.events),
            combatants: std::mem::take(&mut s.combatants),
            full_log: std::mem::take(&mut s.log),
        }
    }
}

/// Highest `damage + 1.5 × healing` among the players; nobody when nobody scored.
pub fn mvp(combatants: &[Combatant]) -> Option<Mvp> {
    combatants
        .iter()
        .filter(|c| c.side == Side::Player)
        .map(|c| Mvp {
            id: c.key.clone(),
            score: c.stats.total_damage as f64 + MVP_HEALING_WEIGHT * c.stats.total_healing as f64,
        })
        .filter(|m| m.score > 0.0)
        .fold(None, |best: Option<Mvp>, m| match best {
            Some(b) if b.score >= m.score => Some(b),
            _ => Some(m),
        })
}
