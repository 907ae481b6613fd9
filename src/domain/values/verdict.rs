use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    BuyNow,
    Watch,
    Avoid,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::BuyNow => write!(f, "BUY_NOW"),
            Verdict::Watch => write!(f, "WATCH"),
            Verdict::Avoid => write!(f, "AVOID"),
        }
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY_NOW" => Ok(Verdict::BuyNow),
            "WATCH" => Ok(Verdict::Watch),
            "AVOID" => Ok(Verdict::Avoid),
            _ => Err(format!("Unknown verdict: '{s}'")),
        }
    }
}

/// How long a thesis is expected to take to play out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeHorizon {
    Intraday,
    Swing,
    Position,
    LongTerm,
}

impl TimeHorizon {
    pub const ALLOWED: &'static str = "INTRADAY | SWING | POSITION | LONG_TERM";
}

impl fmt::Display for TimeHorizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeHorizon::Intraday => write!(f, "INTRADAY"),
            TimeHorizon::Swing => write!(f, "SWING"),
            TimeHorizon::Position => write!(f, "POSITION"),
            TimeHorizon::LongTerm => write!(f, "LONG_TERM"),
        }
    }
}

impl FromStr for TimeHorizon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace([' ', '-'], "_").as_str() {
            "INTRADAY" => Ok(TimeHorizon::Intraday),
            "SWING" => Ok(TimeHorizon::Swing),
            "POSITION" => Ok(TimeHorizon::Position),
            "LONG_TERM" => Ok(TimeHorizon::LongTerm),
            _ => Err(format!("Unknown time horizon: '{s}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_wire_format() {
        assert_eq!(serde_json::to_string(&Verdict::BuyNow).unwrap(), "\"BUY_NOW\"");
        assert_eq!("buy_now".parse::<Verdict>().unwrap(), Verdict::BuyNow);
        assert!("BUY".parse::<Verdict>().is_err());
    }

    #[test]
    fn horizon_accepts_loose_spelling() {
        assert_eq!("long-term".parse::<TimeHorizon>().unwrap(), TimeHorizon::LongTerm);
        assert_eq!(
            serde_json::to_string(&TimeHorizon::LongTerm).unwrap(),
            "\"LONG_TERM\""
        );
    }
}
