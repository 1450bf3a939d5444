pub mod ad;
pub mod attrs;
pub mod expr;
pub mod parser;
pub mod status;
pub mod value;
