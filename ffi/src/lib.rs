use anyhow::{bail, Context, Result};
use gacha_engine::data::{MonsterData, RosterEntry, Skill, SkillBook};
use gacha_engine::{api, content, resolve_battle, BattleOptions};
use indexmap::IndexMap;
use jni::objects::{JClass, JString};
use jni::sys::jstring;
use jni::JNIEnv;
use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_SAMPLES: u32 = 100;

/// A battle as sent by the client: inline tables, bundled ids, or a mix.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BattleRequest {
    #[serde(default)]
    pub roster: Option<Vec<RosterEntry>>,
    #[serde(default)]
    pub roster_id: Option<String>,
    #[serde(default)]
    pub monster: Option<MonsterData>,
    #[serde(default)]
    pub monster_id: Option<String>,
    #[serde(default)]
    pub skills: IndexMap<String, Skill>,
    #[serde(default = "default_true")]
    pub include_builtin_skills: bool,
    #[serde(default)]
    pub options: BattleOptions,
    #[serde(default)]
    pub samples: Option<u32>,
}

fn default_true() -> bool {
    true
}

impl BattleRequest {
    fn roster(&self) -> Result<Vec<RosterEntry>> {
        match (&self.roster, &self.roster_id) {
            (Some(roster), _) => Ok(roster.clone()),
            (None, Some(id)) => content::roster(id),
            (None, None) => bail!("request has neither roster nor roster_id"),
        }
    }

    fn monster(&self) -> Result<MonsterData> {
        match (&self.monster, &self.monster_id) {
            (Some(monster), _) => Ok(monster.clone()),
            (None, Some(id)) => content::monster(id),
            (None, None) => bail!("request has neither monster nor monster_id"),
        }
    }

    fn book(&self) -> Result<SkillBook> {
        let mut book = if self.include_builtin_skills {
            content::skill_book()?
        } else {
            SkillBook::new()
        };
        book.extend(self.skills.clone());
        book.validate().context("invalid skill table")?;
        Ok(book)
    }
}

fn parse_request(input: &str) -> Result<BattleRequest> {
    serde_json::from_str(input).context("invalid_config")
}

fn envelope(result: Result<Value>) -> String {
    let payload = match result {
        Ok(value) => json!({ "ok": true, "result": value }),
        Err(e) => json!({ "ok": false, "error": format!("{:#}", e) }),
    };
    payload.to_string()
}

fn resolve(input: &str) -> Result<Value> {
    let req = parse_request(input)?;
    let roster = req.roster()?;
    let monster = req.monster()?;
    let result = resolve_battle(&roster, &monster, req.book()?, req.options)?;
    Ok(serde_json::to_value(result)?)
}

fn simulate_many(input: &str) -> Result<Value> {
    let req = parse_request(input)?;
    let samples = req.samples.unwrap_or(DEFAULT_SAMPLES);
    let stats = api::run_batch(&req.roster()?, &req.monster()?, &req.book()?, req.options, samples)?;
    Ok(serde_json::to_value(stats)?)
}

/// Resolves one battle request. Always returns a JSON envelope
/// `{"ok": true, "result": ...}` or `{"ok": false, "error": "..."}`.
pub fn resolve_battle_json(input: &str) -> String {
    envelope(resolve(input))
}

/// Runs `samples` seeded battles of one request and returns win statistics.
pub fn simulate_many_json(input: &str) -> String {
    envelope(simulate_many(input))
}

fn to_jstring(env: &JNIEnv, s: String) -> jstring {
    match env.new_string(s) {
        Ok(js) => js.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

fn read_input(env: &mut JNIEnv, json: &JString) -> std::result::Result<String, String> {
    env.get_string(json).map(Into::into).map_err(|e| e.to_string())
}

fn input_error(e: String) -> String {
    json!({ "ok": false, "error": e }).to_string()
}

#[no_mangle]
pub extern "system" fn Java_com_gacha_Ffi_version<'local>(env: JNIEnv<'local>, _class: JClass<'local>) -> jstring {
    to_jstring(&env, format!("gacha-ffi {}", env!("CARGO_PKG_VERSION")))
}

#[no_mangle]
pub extern "system" fn Java_com_gacha_Ffi_resolveBattleJson(mut env: JNIEnv, _class: JClass, json: JString) -> jstring {
    let reply = match read_input(&mut env, &json) {
        Ok(input) => resolve_battle_json(&input),
        Err(e) => input_error(e),
    };
    to_jstring(&env, reply)
}

#[no_mangle]
pub extern "system" fn Java_com_gacha_Ffi_simulateManyJson(mut env: JNIEnv, _class: JClass, json: JString) -> jstring {
    let reply = match read_input(&mut env, &json) {
        Ok(input) => simulate_many_json(&input),
        Err(e) => input_error(e),
    };
    to_jstring(&env, reply)
}
