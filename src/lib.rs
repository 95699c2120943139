// Hostwarden - autonomous host watchdog
// Library root

pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod notify;
pub mod remediation;
pub mod report;
pub mod scheduler;
pub mod version;
pub mod watchdog;

// Test modules (only compiled during tests)
#[cfg(test)]
mod config_tests;
#[cfg(test)]
mod scheduler_tests;
