use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Submission category. Each format admits its own duration range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BattleFormat {
    MainBattle,
    MiniBattle,
    ThemeChallenge,
}

/// Inclusive duration bounds in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationRange {
    pub min_seconds: f64,
    pub max_seconds: f64,
}

impl DurationRange {
    pub fn contains(&self, seconds: f64) -> bool {
        seconds >= self.min_seconds && seconds <= self.max_seconds
    }
}

impl Display for DurationRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}-{}", self.min_seconds, self.max_seconds)
    }
}

impl BattleFormat {
    pub const ALL: [BattleFormat; 3] = [
        BattleFormat::MainBattle,
        BattleFormat::MiniBattle,
        BattleFormat::ThemeChallenge,
    ];

    pub fn duration_range(self) -> DurationRange {
        let (min_seconds, max_seconds) = match self {
            BattleFormat::MainBattle => (60.0, 120.0),
            BattleFormat::MiniBattle => (30.0, 59.0),
            BattleFormat::ThemeChallenge => (30.0, 120.0),
        };
        DurationRange {
            min_seconds,
            max_seconds,
        }
    }

    /// Wire name sent to the backend
    pub fn as_str(self) -> &'static str {
        match self {
            BattleFormat::MainBattle => "MAIN_BATTLE",
            BattleFormat::MiniBattle => "MINI_BATTLE",
            BattleFormat::ThemeChallenge => "THEME_CHALLENGE",
        }
    }
}

impl Display for BattleFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for BattleFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "MAIN_BATTLE" | "MAIN" => Ok(BattleFormat::MainBattle),
            "MINI_BATTLE" | "MINI" => Ok(BattleFormat::MiniBattle),
            "THEME_CHALLENGE" | "THEME" => Ok(BattleFormat::ThemeChallenge),
            _ => Err(anyhow::anyhow!("Invalid battle format: {}", s)),
        }
    }
}
