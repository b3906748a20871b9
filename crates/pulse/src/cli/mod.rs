pub mod commands;
pub mod display;
pub mod input;
