//! Time and Scheduling Integrity Engine for restaurant payroll
//!
//! This crate validates shift schedules against double-booking, drives time
//! entries from clock-in through approval, and aggregates completed work into
//! daily, weekly and monthly reports that freeze the underlying entries once
//! signed.

#![warn(missing_docs)]

pub mod audit;
pub mod calculation;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod store;
