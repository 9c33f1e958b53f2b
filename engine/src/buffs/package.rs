use serde::{Deserialize, Serialize};

use super::{
    check_immunity, insert, merge_duration, ApplyOutcome, Buff, BuffId, BuffKind, BuffSpec,
};
use crate::combatant::{Combatant, CombatantId};
use crate::log::BattleLog;

pub const DEFAULT_PACKAGE_STACKS: u32 = 3;

/// A named bundle of buffs applied and removed as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuffPackage {
    pub name: String,
    #[serde(default = "default_duration")]
    pub duration: i32,
    #[serde(default)]
    pub max_stacks: Option<u32>,
    /// Sub-buffs granted per stack of the package.
    pub buffs_per_stack: Vec<BuffSpec>,
    #[serde(default = "default_true")]
    pub positive: bool,
    #[serde(default = "default_true")]
    pub dispellable: bool,
}

fn default_duration() -> i32 {
    3
}

fn default_true() -> bool {
    true
}

fn parent_buff(package: &BuffPackage, source: Option<CombatantId>) -> Buff {
    let mut parent = Buff::from_spec(
        &BuffSpec::new(BuffKind::CompositeBuff, 0.0, package.duration).named(package.name.clone()),
        source,
        package.duration,
    );
    parent.max_stacks = package.max_stacks.unwrap_or(DEFAULT_PACKAGE_STACKS).max(1);
    parent.is_positive = package.positive;
    parent.can_dispel = package.dispellable;
    parent
}

fn grant_sub_buffs(target: &mut Combatant, package: &BuffPackage, parent: BuffId, stacks: u32, duration: i32, source: Option<CombatantId>) {
    for spec in &package.buffs_per_stack {
        let mut sub = Buff::from_spec(spec, source, duration);
        sub.value = spec.value * stacks as f64;
        sub.duration = duration;
        sub.parent = Some(parent);
        sub.current_stacks = stacks;
        if sub.kind == BuffKind::Shield {
            target.shield += sub.value.max(0.0) as i64;
        }
        insert(target, sub);
    }
}

/// Applies a package. A live package of the same name and source gains a
/// stack (up to its max) and has its sub-buffs rebuilt for the new count.
pub fn apply_package(
    target: &mut Combatant,
    package: &BuffPackage,
    source: Option<CombatantId>,
    log: &mut BattleLog,
) -> ApplyOutcome {
    if !target.is_alive() {
        return ApplyOutcome::Blocked(super::BlockReason::Dead);
    }
    let parent = parent_buff(package, source);
    if let Some(reason) = check_immunity(target, &parent) {
        log.info(format!("[BUFF][{}] package {} blocked ({:?})", target.name, package.name, reason));
        target.refresh_stats();
        return ApplyOutcome::Blocked(reason);
    }

    let live = target.buffs.iter_mut().find(|b| {
        b.kind == BuffKind::CompositeBuff && b.name == package.name && b.source == source && b.duration != 0
    });

    let outcome = match live {
        Some(live) => {
            let stacked = live.current_stacks < live.max_stacks;
            if stacked {
                live.current_stacks += 1;
            }
            live.duration = merge_duration(live.duration, package.duration);
            let (id, stacks, duration) = (live.id, live.current_stacks, live.duration);
            let old_shield: f64 = target
                .buffs
                .iter()
                .filter(|b| b.parent == Some(id) && b.kind == BuffKind::Shield)
                .map(|b| b.value.max(0.0))
                .sum();
            target.shield = (target.shield - old_shield as i64).max(0);
            target.buffs.retain(|b| b.parent != Some(id));
            grant_sub_buffs(target, package, id, stacks, duration, source);
            log.detail(format!(
                "[PACKAGE][{}] {} now {} stack(s), sub-buffs rebuilt",
                target.name, package.name, stacks
            ));
            if stacked { ApplyOutcome::Stacked(id) } else { ApplyOutcome::Refreshed(id) }
        }
        None => {
            let duration = parent.duration;
            let id = insert(target, parent);
            grant_sub_buffs(target, package, id, 1, duration, source);
            log.detail(format!(
                "[PACKAGE][{}] gains {} ({} sub-buffs)",
                target.name,
                package.name,
                package.buffs_per_stack.len()
            ));
            ApplyOutcome::Added(id)
        }
    };
    target.refresh_stats();
    outcome
}
