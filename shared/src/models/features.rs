//! Model feature assembly
//!
//! The risk model was trained on 13 features in a fixed order: a rain-risk
//! trigger followed by a one-hot encoding of the forecast month.

use chrono::{Datelike, Month, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of features the risk model expects
pub const FEATURE_COUNT: usize = 13;

/// Feature names in the exact order used during training
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "risk_trigger",
    "month_1",
    "month_2",
    "month_3",
    "month_4",
    "month_5",
    "month_6",
    "month_7",
    "month_8",
    "month_9",
    "month_10",
    "month_11",
    "month_12",
];

/// Forecast precipitation (mm) above which the rain-risk trigger fires
pub const RAIN_THRESHOLD_MM: f64 = 10.0;

/// Binary rain-risk flag derived from the next-day precipitation forecast
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RainTrigger {
    Yes,
    No,
}

impl RainTrigger {
    /// Fires only when precipitation strictly exceeds the threshold
    pub fn from_precipitation(precipitation_mm: f64) -> Self {
        if precipitation_mm > RAIN_THRESHOLD_MM {
            RainTrigger::Yes
        } else {
            RainTrigger::No
        }
    }

    pub fn as_flag(&self) -> u8 {
        match self {
            RainTrigger::Yes => 1,
            RainTrigger::No => 0,
        }
    }

    pub fn is_triggered(&self) -> bool {
        matches!(self, RainTrigger::Yes)
    }
}

impl fmt::Display for RainTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RainTrigger::Yes => write!(f, "YES"),
            RainTrigger::No => write!(f, "NO"),
        }
    }
}

/// Positional feature vector fed to the risk model
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FeatureVector([f32; FEATURE_COUNT]);

impl FeatureVector {
    /// Build the vector from the trigger and the forecast month.
    ///
    /// Index 0 holds the trigger. Index `month` is set to 1 only when the
    /// month is in 1..=12; any other month leaves every month slot at zero.
    pub fn assemble(trigger: RainTrigger, month: u32) -> Self {
        let mut values = [0.0_f32; FEATURE_COUNT];
        values[0] = f32::from(trigger.as_flag());
        if (1..=12).contains(&month) {
            values[month as usize] = 1.0;
        }
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.0.get(index).copied()
    }

    pub fn risk_trigger(&self) -> RainTrigger {
        if self.0[0] > 0.0 {
            RainTrigger::Yes
        } else {
            RainTrigger::No
        }
    }

    /// The encoded month, if exactly one month slot is set
    pub fn month(&self) -> Option<u32> {
        let mut set = self.0[1..]
            .iter()
            .enumerate()
            .filter(|(_, v)| **v == 1.0)
            .map(|(i, _)| i as u32 + 1);
        match (set.next(), set.next()) {
            (Some(month), None) => Some(month),
            _ => None,
        }
    }

    /// Pairs each value with its training-time feature name
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.0.iter().copied())
    }
}

/// The forecast covers tomorrow; returns tomorrow's date and calendar month
pub fn forecast_month(today: NaiveDate) -> (NaiveDate, u32) {
    let tomorrow = today.succ_opt().unwrap_or(today);
    (tomorrow, tomorrow.month())
}

/// English month name for display ("January", ...)
pub fn month_name(month: u32) -> Option<&'static str> {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name())
}
