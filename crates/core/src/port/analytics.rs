// Wait-time analytics port

use crate::domain::WaitTimeSample;
use crate::error::Result;
use async_trait::async_trait;

/// Sink for served-customer wait samples
#[async_trait]
pub trait WaitTimeRecorder: Send + Sync {
    async fn record(&self, sample: &WaitTimeSample) -> Result<()>;
}

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct InMemoryRecorder {
        samples: Arc<Mutex<Vec<WaitTimeSample>>>,
    }

    impl InMemoryRecorder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn samples(&self) -> Vec<WaitTimeSample> {
            self.samples.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WaitTimeRecorder for InMemoryRecorder {
        async fn record(&self, sample: &WaitTimeSample) -> Result<()> {
            self.samples.lock().unwrap().push(sample.clone());
            Ok(())
        }
    }
}
