// Library root: squad selection as a linear program over a player pool.
//
// `builder` is the entry point for building a squad; `engine` and `extract`
// expose the constraint layer for callers that assemble their own problems.

pub mod builder;
pub mod catalogue;
pub mod config;
pub mod engine;
pub mod extract;
pub mod player;
pub mod pool;
pub mod rules;
pub mod squad;
pub mod validator;
