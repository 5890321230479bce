mod store;
mod table;

pub use store::WavetableStore;
pub use table::{is_valid_table_size, TableConfig, Wavetable, MAX_TABLE_SIZE, MIN_TABLE_SIZE};
