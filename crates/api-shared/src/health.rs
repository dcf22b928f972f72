use crate::dto::HealthRes;

/// Simple health service shared by the API binaries.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Static health check; does not touch the store.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "MediDesk is alive".into(),
        }
    }
}
