pub mod attendance;
pub mod reconciler;
pub mod scheduler;

pub use attendance::AttendanceService;
pub use reconciler::Reconciler;
pub use scheduler::ReconciliationScheduler;
