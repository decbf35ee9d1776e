//! Runtime configuration, parsed from flags or environment.

use clap::Parser;

use crate::domain::DEFAULT_LOCKOUT_HOURS;

/// Server configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "dispatch-backend", about = "Delivery-logistics back office")]
pub struct Config {
    /// Address the HTTP server binds to.
    #[arg(long, env = "DISPATCH_BIND_ADDR", default_value = "0.0.0.0")]
    pub bind_addr: String,

    /// Port the HTTP server listens on.
    #[arg(long, env = "DISPATCH_PORT", default_value_t = 8080)]
    pub port: u16,

    /// UTC hour of day (0-23) the daily reset sweep fires.
    #[arg(
        long,
        env = "DISPATCH_RESET_HOUR",
        default_value_t = 3,
        value_parser = clap::value_parser!(u32).range(0..=23)
    )]
    pub reset_hour: u32,

    /// Lockout duration, in hours, applied after a negative declaration.
    #[arg(
        long,
        env = "DISPATCH_LOCKOUT_HOURS",
        default_value_t = DEFAULT_LOCKOUT_HOURS,
        value_parser = clap::value_parser!(i64).range(1..)
    )]
    pub lockout_hours: i64,

    /// Seed example users and packages on startup.
    #[arg(long, env = "DISPATCH_SEED", default_value_t = false)]
    pub seed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_flags() {
        let config = Config::parse_from(["dispatch-backend"]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.reset_hour, 3);
        assert_eq!(config.lockout_hours, DEFAULT_LOCKOUT_HOURS);
        assert!(!config.seed);
    }

    #[test]
    fn reset_hour_is_bounded() {
        let result = Config::try_parse_from(["dispatch-backend", "--reset-hour", "24"]);
        assert!(result.is_err());
    }
}
