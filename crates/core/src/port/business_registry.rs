// Business Registry Port (Interface)

use crate::domain::{Business, BusinessDefaults, CongestionLevel};
use crate::error::Result;
use async_trait::async_trait;

/// Storage of business profiles
#[async_trait]
pub trait BusinessRegistry: Send + Sync {
    /// Find business by ID
    async fn get_business(&self, id: &str) -> Result<Option<Business>>;

    /// Create-if-absent, returning the stored profile
    async fn ensure_business(
        &self,
        id: &str,
        defaults: &BusinessDefaults,
        now_millis: i64,
    ) -> Result<Business>;

    /// Set congestion level (fails with NotFound when the business is absent)
    async fn set_congestion(&self, id: &str, level: CongestionLevel, at: i64) -> Result<()>;

    /// Open or close the line (fails with NotFound when the business is absent)
    async fn set_open(&self, id: &str, is_open: bool, at: i64) -> Result<()>;

    /// Refresh the cached waiting count
    async fn record_queue_length(&self, id: &str, length: u32, at: i64) -> Result<()>;

    /// All known businesses
    async fn list_businesses(&self) -> Result<Vec<Business>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::DomainError;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// In-memory BusinessRegistry
    #[derive(Clone, Default)]
    pub struct InMemoryBusinessRegistry {
        businesses: Arc<Mutex<HashMap<String, Business>>>,
        fail_queue_length: Arc<Mutex<bool>>,
    }

    impl InMemoryBusinessRegistry {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn put(&self, business: Business) {
            self.businesses
                .lock()
                .unwrap()
                .insert(business.id.clone(), business);
        }

        pub fn get(&self, id: &str) -> Option<Business> {
            self.businesses.lock().unwrap().get(id).cloned()
        }

        /// Make `record_queue_length` fail
        pub fn fail_queue_length_updates(&self) {
            *self.fail_queue_length.lock().unwrap() = true;
        }

        fn modify(&self, id: &str, f: impl FnOnce(&mut Business)) -> Result<()> {
            let mut businesses = self.businesses.lock().unwrap();
            let business = businesses
                .get_mut(id)
                .ok_or_else(|| AppError::from(DomainError::BusinessNotFound(id.to_string())))?;
            f(business);
            Ok(())
        }
    }

    #[async_trait]
    impl BusinessRegistry for InMemoryBusinessRegistry {
        async fn get_business(&self, id: &str) -> Result<Option<Business>> {
            Ok(self.get(id))
        }

        async fn ensure_business(
            &self,
            id: &str,
            defaults: &BusinessDefaults,
            now_millis: i64,
        ) -> Result<Business> {
            let mut businesses = self.businesses.lock().unwrap();
            Ok(businesses
                .entry(id.to_string())
                .or_insert_with(|| Business::from_defaults(id, defaults, now_millis))
                .clone())
        }

        async fn set_congestion(&self, id: &str, level: CongestionLevel, at: i64) -> Result<()> {
            self.modify(id, |b| {
                b.congestion_level = level;
                b.congestion_updated_at = Some(at);
                b.updated_at = at;
            })
        }

        async fn set_open(&self, id: &str, is_open: bool, at: i64) -> Result<()> {
            self.modify(id, |b| {
                b.is_open = is_open;
                b.updated_at = at;
            })
        }

        async fn record_queue_length(&self, id: &str, length: u32, at: i64) -> Result<()> {
            if *self.fail_queue_length.lock().unwrap() {
                return Err(AppError::Database("injected queue length failure".to_string()));
            }
            self.modify(id, |b| {
                b.current_queue_length = length;
                b.updated_at = at;
            })
        }

        async fn list_businesses(&self) -> Result<Vec<Business>> {
            let mut all: Vec<Business> = self.businesses.lock().unwrap().values().cloned().collect();
            all.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(all)
        }
    }
}
