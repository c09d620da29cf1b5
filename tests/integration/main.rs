#[path = "../fixtures/mod.rs"]
mod fixtures;

mod cli_test;
mod list_test;
