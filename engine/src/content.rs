//! Tables bundled into the binary so the CLI and the mobile client can run
//! a battle without any files on disk.

use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::data::{MonsterData, RosterEntry, SkillBook};

pub fn builtin_skills() -> &'static str {
    include_str!("../content/skills.json")
}

pub fn builtin_monsters() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("goblin_chief", include_str!("../content/monsters/goblin_chief.json")),
        ("ancient_dragon", include_str!("../content/monsters/ancient_dragon.json")),
    ])
}

pub fn builtin_rosters() -> HashMap<&'static str, &'static str> {
    HashMap::from([(
        "starter_party",
        include_str!("../content/rosters/starter_party.json"),
    )])
}

pub fn skill_book() -> Result<SkillBook> {
    SkillBook::from_json_str(builtin_skills()).context("bundled skill table is invalid")
}

pub fn monster(id: &str) -> Result<MonsterData> {
    let text = builtin_monsters()
        .get(id)
        .copied()
        .ok_or_else(|| anyhow::anyhow!("no bundled monster '{}'", id))?;
    serde_json::from_str(text).with_context(|| format!("bundled monster '{}' is invalid", id))
}

pub fn roster(id: &str) -> Result<Vec<RosterEntry>> {
    let text = builtin_rosters()
        .get(id)
        .copied()
        .ok_or_else(|| anyhow::anyhow!("no bundled roster '{}'", id))?;
    serde_json::from_str(text).with_context(|| format!("bundled roster '{}' is invalid", id))
}
