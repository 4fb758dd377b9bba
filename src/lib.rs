pub mod cli;
pub mod config;
pub mod core;
pub mod models;
#[cfg(test)]
pub mod test_helpers;
pub mod trading;
