//! Attendance to payroll arithmetic. Everything here is pure; the current
//! date always comes in through a [`clock::Clock`].

pub mod clock;
pub mod month;
pub mod schedule;
pub mod stats;
pub mod summary;
