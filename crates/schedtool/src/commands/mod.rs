pub mod negotiate;
pub mod policy;
pub mod schedd;
