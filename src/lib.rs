pub mod assets;
pub mod command_handler;
pub mod commands;
pub mod config;
pub mod cooldown;
pub mod discord;
pub mod duration;
pub mod error;
pub mod fetch;
pub mod generation;
pub mod platform;
pub mod scheduler;
pub mod state;

#[cfg(test)]
mod test_support;
