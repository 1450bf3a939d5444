pub mod firing;
pub mod system;
pub mod user;
