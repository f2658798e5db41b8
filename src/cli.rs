//! Command-line arguments for hd-smart-idle

use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use crate::config::{DaemonConfig, ExecutionMode, DEFAULT_SCHEDULE, DEFAULT_STANDBY_VALUE};

/// Daemon to smartly manage HDD standby timers
#[derive(Debug, Parser)]
#[command(name = "hd-smart-idle", version, about, long_about = None)]
pub struct Cli {
    /// Log level: debug|info|warn|error
    #[arg(long, global = true, default_value = "info", env = "HD_SMART_IDLE_LOG")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the daemon
    Run(RunArgs),
    /// Set standby timeout for mechanical disks once
    Standby(StandbyArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Daily time ("hour min") to set the standby timeout on all mechanical disks
    #[arg(short = 't', long = "time", default_value = DEFAULT_SCHEDULE, env = "HD_SMART_IDLE_TIME")]
    pub schedule: String,

    /// hdparm -S value to set at the scheduled time (e.g. 120 = 10 minutes)
    #[arg(short, long, default_value_t = DEFAULT_STANDBY_VALUE, env = "HD_SMART_IDLE_STANDBY")]
    pub standby: u8,

    /// Poll interval for checking disk state (e.g. 10s, 1m30s)
    #[arg(short, long, default_value = "10s", value_parser = parse_duration, env = "HD_SMART_IDLE_POLL")]
    pub poll: Duration,

    /// Do not execute hdparm -S, only log actions
    #[arg(short, long)]
    pub dry_run: bool,

    /// Devices to monitor (e.g. /dev/sda,/dev/sdb); auto-detects rotational disks if not set
    #[arg(short = 'D', long, value_delimiter = ',')]
    pub devices: Vec<String>,
}

impl RunArgs {
    /// Daemon configuration for the given device set
    pub fn to_config(&self, devices: Vec<String>) -> DaemonConfig {
        DaemonConfig::new(
            devices,
            self.poll,
            &self.schedule,
            self.standby,
            ExecutionMode::from_dry_run(self.dry_run),
        )
    }
}

#[derive(Debug, Args)]
pub struct StandbyArgs {
    /// Standby timeout in hdparm -S units (e.g. 120 = 10 minutes)
    #[arg(short = 's', long = "value", default_value_t = DEFAULT_STANDBY_VALUE)]
    pub value: u8,

    /// Do not execute hdparm -S, only log actions
    #[arg(short, long)]
    pub dry_run: bool,

    /// Devices to configure (e.g. /dev/sda,/dev/sdb)
    #[arg(short = 'D', long, value_delimiter = ',', required = true)]
    pub devices: Vec<String>,
}

/// Parse durations like "10s", "5m", "1h30m", "250ms".
/// A bare number is read as seconds; zero is rejected.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<u64>() {
        return nonzero(Duration::from_secs(secs), s);
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(format!("invalid duration {:?}: expected a number", s));
        }
        let n: u64 = rest[..digits]
            .parse()
            .map_err(|e| format!("invalid duration {:?}: {}", s, e))?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "ms" => Duration::from_millis(n),
            "s" => Duration::from_secs(n),
            "m" => Duration::from_secs(n.saturating_mul(60)),
            "h" => Duration::from_secs(n.saturating_mul(3600)),
            "" => return Err(format!("invalid duration {:?}: missing unit", s)),
            unit => return Err(format!("invalid duration {:?}: unknown unit {:?}", s, unit)),
        };
        total = total.saturating_add(part);
        rest = &rest[unit_len..];
    }

    nonzero(total, s)
}

fn nonzero(d: Duration, s: &str) -> Result<Duration, String> {
    if d.is_zero() {
        Err(format!("invalid duration {:?}: must be greater than 0", s))
    } else {
        Ok(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults() {
        let cli = parse(&["hd-smart-idle", "run"]);
        assert_eq!(cli.log_level, "info");
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.schedule, "22 00");
        assert_eq!(args.standby, 120);
        assert_eq!(args.poll, Duration::from_secs(10));
        assert!(!args.dry_run);
        assert!(args.devices.is_empty());
    }

    #[test]
    fn test_run_all_flags() {
        let cli = parse(&[
            "hd-smart-idle",
            "--log-level",
            "debug",
            "run",
            "-t",
            "2 30",
            "-s",
            "240",
            "-p",
            "1m",
            "-d",
            "-D",
            "/dev/sdb,/dev/sda",
        ]);
        assert_eq!(cli.log_level, "debug");
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        let config = args.to_config(args.devices.clone());
        assert_eq!(config.devices, vec!["/dev/sdb", "/dev/sda"]);
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.standby_value, 240);
        assert_eq!(config.mode, ExecutionMode::DryRun);
        let schedule = config.schedule.expect("schedule should parse");
        assert_eq!((schedule.hour(), schedule.minute()), (2, 30));
    }

    #[test]
    fn test_run_bad_schedule_still_parses() {
        // the daemon degrades to poll-only instead of refusing to start
        let cli = parse(&["hd-smart-idle", "run", "--time", "99 99"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(args.to_config(Vec::new()).schedule.is_err());
    }

    #[test]
    fn test_run_rejects_out_of_range_standby() {
        assert!(Cli::try_parse_from(["hd-smart-idle", "run", "-s", "256"]).is_err());
        assert!(Cli::try_parse_from(["hd-smart-idle", "run", "-s", "-1"]).is_err());
    }

    #[test]
    fn test_run_rejects_zero_poll() {
        assert!(Cli::try_parse_from(["hd-smart-idle", "run", "-p", "0s"]).is_err());
    }

    #[test]
    fn test_standby_requires_devices() {
        assert!(Cli::try_parse_from(["hd-smart-idle", "standby"]).is_err());

        let cli = parse(&["hd-smart-idle", "standby", "-s", "60", "-D", "/dev/sda"]);
        let Command::Standby(args) = cli.command else {
            panic!("expected standby");
        };
        assert_eq!(args.value, 60);
        assert_eq!(args.devices, vec!["/dev/sda"]);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("10s"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("5m"), Ok(Duration::from_secs(300)));
        assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(7200)));
        assert_eq!(parse_duration("1m30s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("1h2m3s"), Ok(Duration::from_secs(3723)));
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("15"), Ok(Duration::from_secs(15)));
    }

    #[test]
    fn test_parse_duration_invalid() {
        for input in ["", "0", "0s", "s", "10x", "1.5s", "-5s", "10 s", "m5"] {
            assert!(parse_duration(input).is_err(), "{input:?} should be rejected");
        }
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn parse_duration_never_panics(input in ".*") {
            let _ = parse_duration(&input);
        }

        #[test]
        fn minutes_and_seconds_add_up(m in 0u64..1000, s in 1u64..1000) {
            prop_assert_eq!(
                parse_duration(&format!("{m}m{s}s")),
                Ok(Duration::from_secs(m * 60 + s))
            );
        }
    }
}
