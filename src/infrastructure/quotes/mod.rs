pub mod cache;
pub mod yahoo;
