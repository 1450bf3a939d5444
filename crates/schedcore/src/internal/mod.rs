#[macro_use]
pub(crate) mod common;
pub mod classad;
pub mod config;
pub mod messages;
pub mod negotiate;
pub mod policy;
pub(crate) mod transfer;

#[cfg(test)]
pub mod tests;
