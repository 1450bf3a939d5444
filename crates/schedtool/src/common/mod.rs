pub mod cli;
pub mod config;
pub mod setup;
pub mod timeutils;
