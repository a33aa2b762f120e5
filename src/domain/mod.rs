pub mod date_range;
pub mod message;
pub mod transaction;
