use crate::buffs::BuffKind;
use crate::combat::effects::{apply_effects, EffectCtx};
use crate::combat::procs::{self, ProcContext};
use crate::combatant::{CombatantId, Side};
use crate::data::{EffectKind, Skill, Trigger};
use crate::session::BattleSession;

pub const PLAYER_SKILL_COOLDOWN: u32 = 5;
pub const MONSTER_SKILL_COOLDOWN: u32 = 3;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkillOutcome {
    pub success: bool,
    pub message: String,
    pub damage: i64,
    pub healing: i64,
    /// Kinds of the effects that took hold, in order.
    pub effects: Vec<EffectKind>,
}

impl SkillOutcome {
    fn failed(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), ..Self::default() }
    }
}

/// Why a skill cannot be used right now, if anything.
fn gate(session: &mut BattleSession, caster: CombatantId, skill: &Skill) -> Option<String> {
    let c = session.get_mut(caster);
    if !c.is_alive() {
        return Some(format!("{} is down", c.name));
    }
    if skill.is_passive() {
        return Some(format!("{} is passive", skill.name));
    }
    if c.is_on_cooldown(&skill.id) {
        return Some(format!("{} is on cooldown", skill.name));
    }
    if let Some(initial) = skill.initial_cooldown.filter(|cd| *cd > 0) {
        if !c.has_used(&skill.id) && !c.cooldowns.contains_key(&skill.id) {
            c.cooldowns.insert(skill.id.clone(), initial);
            return Some(format!("{} starts on a {} turn cooldown", skill.name, initial));
        }
    }
    let silenced = c.has_buff(BuffKind::Silence)
        && !c
            .buffs_of(BuffKind::StatusImmunity)
            .any(|b| b.guards.is_none_or(|g| g == BuffKind::Silence));
    if silenced {
        return Some(format!("{} is silenced", c.name));
    }
    None
}

/// Uses a skill from the caster's list, with all gating and cooldown bookkeeping.
pub fn use_skill(session: &mut BattleSession, caster: CombatantId, skill_id: &str) -> SkillOutcome {
    resolve(session, caster, skill_id, None, false)
}

/// Like [`use_skill`] with an enemy already chosen (the monster's threat pick).
pub fn use_skill_on(
    session: &mut BattleSession,
    caster: CombatantId,
    skill_id: &str,
    primary: Option<CombatantId>,
) -> SkillOutcome {
    resolve(session, caster, skill_id, primary, false)
}

/// A skill cast by another skill's effect. Skips gating and cooldowns.
pub fn cast_triggered(
    session: &mut BattleSession,
    caster: CombatantId,
    skill_id: &str,
    primary: Option<CombatantId>,
) -> SkillOutcome {
    resolve(session, caster, skill_id, primary, true)
}

fn resolve(
    session: &mut BattleSession,
    caster: CombatantId,
    skill_id: &str,
    primary: Option<CombatantId>,
    triggered: bool,
) -> SkillOutcome {
    let Some(skill) = session.book.get(skill_id).cloned() else {
        let line = format!("[SKILL][{}] unknown skill '{}'; skipped", session.name(caster), skill_id);
        session.log.warn(line);
        return SkillOutcome::failed(format!("unknown skill '{}'", skill_id));
    };

    if !triggered {
        if let Some(reason) = gate(session, caster, &skill) {
            session.log.detail(format!("[SKILL] {}", reason));
            return SkillOutcome::failed(reason);
        }
    }

    if triggered && session.proc_depth >= procs::MAX_PROC_DEPTH {
        session.log.warn(format!("[SKILL] {} chained too deep; skipped", skill.name));
        return SkillOutcome::failed("chain too deep");
    }

    let mut ctx = EffectCtx::new(caster, skill.name.clone(), skill.target_type);
    ctx.primary = primary;
    ctx.default_duration = skill.duration;
    ctx.skip_critical = skill.skip_critical;
    ctx.element = skill.element;
    if triggered {
        session.proc_depth += 1;
    }
    let report = apply_effects(session, &ctx, &skill.effects);
    if triggered {
        session.proc_depth -= 1;
    }

    let name = session.name(caster).to_string();
    if !report.success {
        // a paid HP cost means the skill went off, even if nothing landed
        if !triggered && report.hp_paid > 0 {
            record_use(session, caster, &skill);
        }
        let message = format!("{} used {} but nothing happened", name, skill.name);
        session.log.info(format!("[SKILL][{}] {} had no effect", name, skill.name));
        return SkillOutcome::failed(message);
    }

    if !triggered {
        record_use(session, caster, &skill);
    }

    let mut message = format!("{} used {}", name, skill.name);
    if report.damage > 0 {
        message.push_str(&format!(", dealing {} damage", report.damage));
    }
    if report.healing > 0 {
        message.push_str(&format!(", restoring {} HP", report.healing));
    }
    session.log.battle(format!("[SKILL][{}] {}", name, message));

    if !triggered {
        procs::fire(session, caster, Trigger::OnSkillUse, ProcContext { amount: report.damage, other: primary });
    }

    SkillOutcome {
        success: true,
        message,
        damage: report.damage,
        healing: report.healing,
        effects: report.applied,
    }
}

/// Cooldown and usage bookkeeping for a skill cast from the caster's list.
fn record_use(session: &mut BattleSession, caster: CombatantId, skill: &Skill) {
    let c = session.get_mut(caster);
    let default_cd = match c.side {
        Side::Player => PLAYER_SKILL_COOLDOWN,
        Side::Enemy => MONSTER_SKILL_COOLDOWN,
    };
    let cooldown = if c.has_used(&skill.id) {
        skill.next_cooldown.or(skill.cooldown)
    } else {
        skill.cooldown
    }
    .unwrap_or(default_cd);
    c.cooldowns.insert(skill.id.clone(), cooldown);
    *c.usage_count.entry(skill.id.clone()).or_insert(0) += 1;
    c.stats.skills_used += 1;
    *session.skills_used.entry(skill.name.clone()).or_insert(0) += 1;
}
