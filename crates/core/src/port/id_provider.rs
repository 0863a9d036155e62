// ID Provider Port (for deterministic testing)

use crate::domain::RunId;

/// Length of the run id stamped on sentinels
pub const RUN_ID_LEN: usize = 8;

/// ID provider interface (allows deterministic run ids in tests)
pub trait IdProvider: Send + Sync {
    /// Generate a new run id
    fn generate_run_id(&self) -> RunId;
}

/// UUID v4 provider (production), truncated to [`RUN_ID_LEN`] hex chars
pub struct UuidProvider;

impl IdProvider for UuidProvider {
    fn generate_run_id(&self) -> RunId {
        let id = uuid::Uuid::new_v4().simple().to_string();
        RunId::new(&id[..RUN_ID_LEN])
    }
}

pub mod mocks {
    use super::*;

    pub struct FixedIdProvider(pub RunId);

    impl IdProvider for FixedIdProvider {
        fn generate_run_id(&self) -> RunId {
            self.0.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_run_id_shape() {
        let id = UuidProvider.generate_run_id();
        assert_eq!(id.as_str().len(), RUN_ID_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, UuidProvider.generate_run_id());
    }
}
