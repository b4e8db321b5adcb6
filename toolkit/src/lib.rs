pub mod anytime;
pub mod argument;
