//! A singleton whose constructor can fail, and the retry that follows.
//!
//! `cargo run --example fallible_config`

use solitary::{Construct, DoubleChecked, Singleton};
use std::sync::atomic::{AtomicBool, Ordering};

static CONFIG_READY: AtomicBool = AtomicBool::new(false);

#[derive(Debug, thiserror::Error)]
enum ConfigError {
    #[error("configuration source is not ready")]
    NotReady,
}

#[derive(Debug)]
struct Config {
    workers: usize,
}

impl Singleton for Config {
    type Cell = DoubleChecked<Config>;
    type Error = ConfigError;

    fn cell() -> &'static Self::Cell {
        static CELL: DoubleChecked<Config> = DoubleChecked::new();
        &CELL
    }

    fn construct(_: Construct<Self>) -> Result<Self, Self::Error> {
        if !CONFIG_READY.load(Ordering::SeqCst) {
            return Err(ConfigError::NotReady);
        }
        Ok(Config { workers: 4 })
    }
}

fn main() {
    match Config::instance() {
        Ok(config) => println!("unexpected early config: {config:?}"),
        Err(e) => println!("first attempt: {e}"),
    }
    println!("guard after failure: {:?}", Config::cell().stats());

    CONFIG_READY.store(true, Ordering::SeqCst);
    match Config::instance() {
        Ok(config) => println!("second attempt: {} workers", config.workers),
        Err(e) => println!("second attempt failed too: {e}"),
    }
    println!("guard after success: {:?}", Config::cell().stats());
}
