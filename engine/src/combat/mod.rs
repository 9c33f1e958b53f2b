pub mod actions;
pub mod damage;
pub mod effects;
pub mod procs;
pub mod skills;
pub mod targets;
