pub mod cli;
pub mod clients;
pub mod compose;
pub mod core;
pub mod domain;
pub mod exec;
pub mod infra;
pub mod tools;
