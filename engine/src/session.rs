use std::collections::VecDeque;

use indexmap::IndexMap;

use crate::battle::BattleEvent;
use crate::combat::effects::EffectRegistry;
use crate::combatant::{Combatant, CombatantId, Side};
use crate::data::{SkillBook, Trigger};
use crate::log::BattleLog;
use crate::Dice;

pub const FRONT_SLOTS: usize = 4;

/// Counter key for procs with a limited number of activations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcKey {
    pub entity: CombatantId,
    pub source: String,
    pub trigger: Trigger,
}

/// All mutable state of one battle. Every component receives the session
/// explicitly; nothing is shared outside of it.
pub struct BattleSession {
    pub turn: u32,
    pub combatants: Vec<Combatant>,
    pub front_line: [Option<CombatantId>; FRONT_SLOTS],
    pub back_line: VecDeque<CombatantId>,
    pub monster: CombatantId,
    pub proc_counts: IndexMap<ProcKey, u32>,
    pub skills_used: IndexMap<String, u32>,
    pub dice: Dice,
    pub log: BattleLog,
    pub book: SkillBook,
    pub registry: EffectRegistry,
    pub events: Vec<BattleEvent>,
    pub(crate) proc_depth: u32,
}

impl BattleSession {
    /// The first four players start in the front line, the rest wait in the
    /// back line in roster order. A starter already knocked out leaves its
    /// slot empty and queues behind the reserves, as if it had just fallen.
    pub fn new(players: Vec<Combatant>, monster: Combatant, book: SkillBook, dice: Dice) -> Self {
        let mut combatants = players;
        let player_count = combatants.len();
        combatants.push(monster);
        for c in combatants.iter_mut() {
            c.refresh_stats();
        }
        let mut front_line = [None; FRONT_SLOTS];
        let mut back_line = VecDeque::new();
        let mut knocked_out = Vec::new();
        for idx in 0..player_count {
            let id = CombatantId(idx);
            if idx >= FRONT_SLOTS {
                back_line.push_back(id);
            } else if combatants[idx].is_alive() {
                front_line[idx] = Some(id);
            } else {
                knocked_out.push(id);
            }
        }
        back_line.extend(knocked_out);
        Self {
            turn: 0,
            combatants,
            front_line,
            back_line,
            monster: CombatantId(player_count),
            proc_counts: IndexMap::new(),
            skills_used: IndexMap::new(),
            dice,
            log: BattleLog::new(),
            book,
            registry: EffectRegistry::with_defaults(),
            events: Vec::new(),
            proc_depth: 0,
        }
    }

    pub fn with_registry(mut self, registry: EffectRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn get(&self, id: CombatantId) -> &Combatant {
        &self.combatants[id.0]
    }

    pub fn get_mut(&mut self, id: CombatantId) -> &mut Combatant {
        &mut self.combatants[id.0]
    }

    pub fn name(&self, id: CombatantId) -> &str {
        &self.combatants[id.0].name
    }

    pub fn find(&self, key: &str) -> Option<CombatantId> {
        self.combatants.iter().position(|c| c.key == key).map(CombatantId)
    }

    pub fn monster(&self) -> &Combatant {
        self.get(self.monster)
    }

    pub fn is_front(&self, id: CombatantId) -> bool {
        self.front_line.contains(&Some(id))
    }

    /// Occupied front slots, left to right, dead occupants included.
    pub fn front_ids(&self) -> Vec<CombatantId> {
        self.front_line.iter().flatten().copied().collect()
    }

    pub fn living_front(&self) -> Vec<CombatantId> {
        self.front_ids().into_iter().filter(|id| self.get(*id).is_alive()).collect()
    }

    /// Every player in roster order, wherever they stand.
    pub fn player_ids(&self) -> Vec<CombatantId> {
        self.combatants
            .iter()
            .enumerate()
            .filter(|(_, c)| c.side == Side::Player)
            .map(|(idx, _)| CombatantId(idx))
            .collect()
    }

    /// Combatants currently taking part in the fight: front line plus monster.
    pub fn active_ids(&self) -> Vec<CombatantId> {
        let mut ids = self.front_ids();
        ids.push(self.monster);
        ids
    }

    /// Living teammates of `id` that are on the field, the caster included.
    pub fn allies_of(&self, id: CombatantId) -> Vec<CombatantId> {
        match self.get(id).side {
            Side::Player => self.living_front(),
            Side::Enemy => {
                if self.monster().is_alive() {
                    vec![self.monster]
                } else {
                    Vec::new()
                }
            }
        }
    }

    pub fn enemies_of(&self, id: CombatantId) -> Vec<CombatantId> {
        match self.get(id).side {
            Side::Player => {
                if self.monster().is_alive() {
                    vec![self.monster]
                } else {
                    Vec::new()
                }
            }
            Side::Enemy => self.living_front(),
        }
    }

    pub fn front_line_keys(&self) -> Vec<Option<String>> {
        self.front_line
            .iter()
            .map(|slot| slot.map(|id| self.get(id).key.clone()))
            .collect()
    }
}
