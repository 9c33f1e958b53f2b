use thiserror::Error;

/// Problems found while loading or validating battle data. These are raised
/// before a battle starts; nothing inside a turn returns them.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DataError {
    #[error("roster is empty")]
    EmptyRoster,
    #[error("duplicate combatant id '{0}'")]
    DuplicateCombatant(String),
    #[error("skill '{skill}' casts unknown skill '{target}'")]
    DanglingCast { skill: String, target: String },
    #[error("buff package '{package}' in skill '{skill}' has no effects")]
    EmptyPackage { skill: String, package: String },
    #[error("skill '{skill}': {reason}")]
    InvalidSkill { skill: String, reason: String },
}
