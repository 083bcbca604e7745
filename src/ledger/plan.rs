//! Mining plan table

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Lock period of a position, restarted on every top-up
pub const LOCK_PERIOD_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Starter,
    Growth,
    Wealth,
}

impl Plan {
    pub const ALL: [Plan; 3] = [Plan::Starter, Plan::Growth, Plan::Wealth];

    /// Current daily ROI for new positions (0.5% / 1.2% / 2.5%)
    pub fn daily_roi(&self) -> Decimal {
        match self {
            Plan::Starter => Decimal::new(5, 3),
            Plan::Growth => Decimal::new(12, 3),
            Plan::Wealth => Decimal::new(25, 3),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Starter => "starter",
            Plan::Growth => "growth",
            Plan::Wealth => "wealth",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Plan::Starter => "Starter Miner",
            Plan::Growth => "Growth Rig",
            Plan::Wealth => "Wealth Farm",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "starter" => Ok(Plan::Starter),
            "growth" => Ok(Plan::Growth),
            "wealth" => Ok(Plan::Wealth),
            _ => Err(format!("Unknown plan: {}", s)),
        }
    }
}

/// End of the lock period for a position opened or topped up at `from`
pub fn lock_until(from: DateTime<Utc>) -> DateTime<Utc> {
    from + Duration::days(LOCK_PERIOD_DAYS)
}

/// Public plan description for the dashboard
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlanInfo {
    pub id: Plan,
    pub name: &'static str,
    #[schema(value_type = String, example = "0.005")]
    pub daily_roi: Decimal,
    pub lock_days: i64,
}

impl From<Plan> for PlanInfo {
    fn from(plan: Plan) -> Self {
        Self {
            id: plan,
            name: plan.display_name(),
            daily_roi: plan.daily_roi(),
            lock_days: LOCK_PERIOD_DAYS,
        }
    }
}
