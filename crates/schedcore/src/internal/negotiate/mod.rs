pub mod channel;
pub mod request;
pub mod requestlist;
pub mod schedd;
