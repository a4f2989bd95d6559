//! Time-of-day risk flag
//!
//! Night travel (22:00 through 05:59 local) is flagged high risk. The
//! reported coordinates play no part in the decision.

use chrono::{DateTime, TimeZone, Timelike};
use serde::Serialize;

pub const HIGH_RISK_SCORE: f64 = 0.85;
pub const SAFE_SCORE: f64 = 0.15;

pub const HIGH_RISK_MESSAGE: &str = "High Risk: Night Travel Detected";
pub const SAFE_MESSAGE: &str = "Safe Zone";

/// First hour of the night window
const NIGHT_STARTS: u32 = 22;
/// Last hour of the night window
const NIGHT_ENDS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    HighRisk,
    Safe,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub score: f64,
    pub message: &'static str,
}

impl RiskAssessment {
    pub fn for_hour(hour: u32) -> Self {
        if hour >= NIGHT_STARTS || hour <= NIGHT_ENDS {
            Self {
                level: RiskLevel::HighRisk,
                score: HIGH_RISK_SCORE,
                message: HIGH_RISK_MESSAGE,
            }
        } else {
            Self {
                level: RiskLevel::Safe,
                score: SAFE_SCORE,
                message: SAFE_MESSAGE,
            }
        }
    }

    /// Assess using the wall-clock hour of `at` in its own offset
    pub fn at<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        Self::for_hour(at.hour())
    }

    pub fn is_high_risk(&self) -> bool {
        self.level == RiskLevel::HighRisk
    }
}
