//! The three guard strategies side by side.
//!
//! `cargo run --example strategies`

use solitary::{Construct, DoubleChecked, Eager, Locked, Singleton};
use std::convert::Infallible;
use std::thread;

mod printer {
    use super::*;

    /// Only this module can build a `Printer`; everyone else goes through
    /// `Printer::instance()`.
    pub struct Printer {
        name: &'static str,
    }

    impl Printer {
        pub fn print(&self, line: &str) {
            println!("[{}] {line}", self.name);
        }
    }

    impl Singleton for Printer {
        type Cell = DoubleChecked<Printer>;
        type Error = Infallible;

        fn cell() -> &'static Self::Cell {
            static CELL: DoubleChecked<Printer> = DoubleChecked::new();
            &CELL
        }

        fn construct(_: Construct<Self>) -> Result<Self, Self::Error> {
            println!("constructing the double-checked printer");
            Ok(Printer { name: "double-checked" })
        }
    }
}

mod audit {
    use super::*;

    pub struct AuditLog {
        target: String,
    }

    impl AuditLog {
        pub fn target(&self) -> &str {
            &self.target
        }
    }

    impl Singleton for AuditLog {
        type Cell = Locked<AuditLog>;
        type Error = Infallible;

        fn cell() -> &'static Self::Cell {
            static CELL: Locked<AuditLog> = Locked::new();
            &CELL
        }

        fn construct(_: Construct<Self>) -> Result<Self, Self::Error> {
            println!("constructing the always-locked audit log");
            Ok(AuditLog {
                target: format!("audit-{}.log", std::process::id()),
            })
        }
    }
}

mod build_info {
    use super::*;

    pub struct BuildInfo {
        pub version: &'static str,
    }

    impl Singleton for BuildInfo {
        type Cell = Eager<BuildInfo>;
        type Error = Infallible;

        fn cell() -> &'static Self::Cell {
            static CELL: Eager<BuildInfo> = Eager::new(BuildInfo {
                version: env!("CARGO_PKG_VERSION"),
            });
            &CELL
        }

        fn construct(_: Construct<Self>) -> Result<Self, Self::Error> {
            unreachable!("built at compile time")
        }
    }
}

use audit::AuditLog;
use build_info::BuildInfo;
use printer::Printer;

fn main() -> Result<(), solitary::ConstructionError> {
    logwise::info_sync!("strategies demo starting");

    let handles: Vec<_> = (0..4)
        .map(|i| {
            thread::spawn(move || {
                let printer = Printer::instance().expect("infallible");
                printer.print(&format!("hello from thread {i}"));
                printer as *const Printer as usize
            })
        })
        .collect();
    let addresses: Vec<usize> = handles
        .into_iter()
        .map(|handle| handle.join().expect("printer thread panicked"))
        .collect();
    println!(
        "all threads shared one printer: {}",
        addresses.iter().all(|a| *a == addresses[0])
    );

    let first = AuditLog::instance()?;
    let second = AuditLog::instance()?;
    println!(
        "audit log at {} (same instance: {})",
        first.target(),
        std::ptr::eq(first, second)
    );

    println!("build version {}", BuildInfo::instance()?.version);
    Ok(())
}
