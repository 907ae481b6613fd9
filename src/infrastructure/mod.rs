pub mod gatherers;
pub mod memory_lock;
pub mod quotes;
pub mod reasoning;
pub mod sqlite;
pub mod universe;
