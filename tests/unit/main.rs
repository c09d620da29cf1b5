#[path = "../fixtures/mod.rs"]
mod fixtures;

mod config_path_test;
mod migration_test;
mod reader_test;
mod sync_test;
