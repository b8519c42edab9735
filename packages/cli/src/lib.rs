// ABOUTME: Library side of the seedplan binary
// ABOUTME: Chat line parsing and terminal rendering

pub mod commands;
pub mod display;
