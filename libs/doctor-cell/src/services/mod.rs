pub mod profile;
pub mod records;

pub use profile::{DoctorProfileService, PromotedDoctor};
pub use records::{DiagnosisService, PrescriptionService};
