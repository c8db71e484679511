use crate::HealthRes;

/// Simple health service shared by the REST surfaces.
///
/// This service provides a standardised way to check the health status of the clinic service.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Static method to check health without creating an instance.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Clinic prescription service is alive".into(),
        }
    }
}
