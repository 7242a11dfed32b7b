use crate::config::Settings;
use crate::domain::model::AgeLimit;
use crate::utils::error::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "showads-etl")]
#[command(about = "Send CSV customers to ShowAds")]
pub struct CliConfig {
    /// Path to CSV file with customers data
    pub csv_path: PathBuf,

    /// Age limit for customers as two integers: MIN MAX
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], allow_negative_numbers = true)]
    pub age_limit: Option<Vec<i64>>,

    /// TOML settings file; SHOWADS_* environment variables are used when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    pub fn age_limit(&self) -> AgeLimit {
        match self.age_limit.as_deref() {
            Some([min_age, max_age]) => AgeLimit::new(*min_age, *max_age),
            _ => AgeLimit::default(),
        }
    }

    pub fn load_settings(&self) -> Result<Settings> {
        match &self.config {
            Some(path) => Settings::from_file(path),
            None => Settings::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_age_limit() {
        let config = CliConfig::try_parse_from(["showads-etl", "data.csv"]).unwrap();
        assert_eq!(config.csv_path, PathBuf::from("data.csv"));
        assert_eq!(config.age_limit(), AgeLimit::default());
        assert!(config.config.is_none());
    }

    #[test]
    fn test_explicit_age_limit() {
        let config =
            CliConfig::try_parse_from(["showads-etl", "data.csv", "--age-limit", "21", "65"])
                .unwrap();
        assert_eq!(config.age_limit(), AgeLimit::new(21, 65));
    }

    #[test]
    fn test_age_limit_requires_two_values() {
        let result = CliConfig::try_parse_from(["showads-etl", "data.csv", "--age-limit", "21"]);
        assert!(result.is_err());
    }
}
