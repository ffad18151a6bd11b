// Business Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Minutes per customer assumed when a business has no usable service time
pub const DEFAULT_SERVICE_MINUTES: u32 = 10;

/// Business ID of the demo profile
pub const DEMO_BUSINESS_ID: &str = "demo-business";

/// Staff-reported crowding, independent of queue length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionLevel {
    #[default]
    Low,
    Moderate,
    High,
}

impl CongestionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CongestionLevel::Low => "low",
            CongestionLevel::Moderate => "moderate",
            CongestionLevel::High => "high",
        }
    }
}

impl std::fmt::Display for CongestionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CongestionLevel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "low" => Ok(CongestionLevel::Low),
            "moderate" => Ok(CongestionLevel::Moderate),
            "high" => Ok(CongestionLevel::High),
            other => Err(DomainError::InvalidCongestionLevel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessSettings {
    pub max_queue_size: u32,
    /// Mirrors `Business::average_service_time`
    pub estimated_service_time: u32,
    pub allow_phone_notifications: bool,
    pub allow_email_notifications: bool,
}

/// Profile used when a business is created lazily on first join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessDefaults {
    pub name: String,
    pub category: String,
    pub description: String,
    pub average_service_time: u32,
    pub settings: BusinessSettings,
}

impl BusinessDefaults {
    pub fn for_business(business_id: &str) -> Self {
        let name = if business_id == DEMO_BUSINESS_ID {
            "Demo Restaurant"
        } else {
            "Sample Business"
        };

        Self {
            name: name.to_string(),
            category: "restaurant".to_string(),
            description: "A sample business for testing".to_string(),
            average_service_time: DEFAULT_SERVICE_MINUTES,
            settings: BusinessSettings {
                max_queue_size: 50,
                estimated_service_time: DEFAULT_SERVICE_MINUTES,
                allow_phone_notifications: true,
                allow_email_notifications: true,
            },
        }
    }

    pub fn with_average_service_time(mut self, minutes: u32) -> Self {
        self.average_service_time = minutes;
        self.settings.estimated_service_time = minutes;
        self
    }
}

/// One served-entity profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Business {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub average_service_time: u32, // minutes per customer
    /// Cached count of waiting entries (display only)
    pub current_queue_length: u32,
    pub is_open: bool,
    pub congestion_level: CongestionLevel,
    pub congestion_updated_at: Option<i64>,
    pub settings: BusinessSettings,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Business {
    pub fn from_defaults(id: impl Into<String>, defaults: &BusinessDefaults, now_millis: i64) -> Self {
        Self {
            id: id.into(),
            name: defaults.name.clone(),
            category: defaults.category.clone(),
            description: defaults.description.clone(),
            average_service_time: defaults.average_service_time,
            current_queue_length: 0,
            is_open: true,
            congestion_level: CongestionLevel::Low,
            congestion_updated_at: None,
            settings: defaults.settings.clone(),
            created_at: now_millis,
            updated_at: now_millis,
        }
    }

    /// Service time used by the fallback formula (never zero)
    pub fn service_minutes(&self) -> u32 {
        if self.average_service_time == 0 {
            DEFAULT_SERVICE_MINUTES
        } else {
            self.average_service_time
        }
    }

    /// `position * service minutes`
    pub fn fallback_wait_minutes(&self, position: u32) -> u32 {
        position.saturating_mul(self.service_minutes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_congestion_level() {
        assert_eq!("moderate".parse::<CongestionLevel>().unwrap(), CongestionLevel::Moderate);
        let err = "extreme".parse::<CongestionLevel>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidCongestionLevel(ref s) if s == "extreme"));
    }

    #[test]
    fn test_defaults_by_id() {
        assert_eq!(BusinessDefaults::for_business("demo-business").name, "Demo Restaurant");
        let defaults = BusinessDefaults::for_business("b1");
        assert_eq!(defaults.name, "Sample Business");
        assert_eq!(defaults.average_service_time, 10);
        assert_eq!(defaults.settings.max_queue_size, 50);
    }

    #[test]
    fn test_fallback_wait_uses_default_when_unset() {
        let mut business = Business::from_defaults("b1", &BusinessDefaults::for_business("b1"), 0);
        assert_eq!(business.fallback_wait_minutes(3), 30);

        business.average_service_time = 0;
        assert_eq!(business.fallback_wait_minutes(2), 20);

        business.average_service_time = 7;
        assert_eq!(business.fallback_wait_minutes(4), 28);
    }

    #[test]
    fn test_new_business_is_open_and_calm() {
        let business = Business::from_defaults("b1", &BusinessDefaults::for_business("b1"), 42);
        assert!(business.is_open);
        assert_eq!(business.congestion_level, CongestionLevel::Low);
        assert_eq!(business.current_queue_length, 0);
        assert_eq!(business.created_at, 42);
    }
}
