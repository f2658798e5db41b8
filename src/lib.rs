//! hd-smart-idle - smart standby timer management for mechanical disks
//!
//! Library half of the daemon, exported for integration testing.

pub mod cli;
pub mod config;
pub mod daemon;
pub mod hw;
pub mod schedule;
pub mod standby;
pub mod state;
