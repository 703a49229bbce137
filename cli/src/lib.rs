pub mod actions;
pub mod cli;
