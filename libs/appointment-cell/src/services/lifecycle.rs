// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use shared_models::auth::Role;

use crate::models::{AppointmentError, AppointmentStatus};

pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    /// Valid next statuses. Only `scheduled` has any; everything else is
    /// terminal.
    pub fn get_valid_transitions(current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Scheduled => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::Serviced,
            ],
            AppointmentStatus::Completed
            | AppointmentStatus::Cancelled
            | AppointmentStatus::Serviced => vec![],
        }
    }

    pub fn validate_status_transition(
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !Self::get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    /// Statuses a role may set by hand. `serviced` belongs to the
    /// reconciliation job alone.
    pub fn role_may_set(role: Role, status: AppointmentStatus) -> bool {
        match role {
            Role::Doctor => matches!(status, AppointmentStatus::Completed | AppointmentStatus::Cancelled),
            Role::Patient => status == AppointmentStatus::Cancelled,
            Role::Admin => status != AppointmentStatus::Serviced,
            Role::LabTechnician => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduled_moves_to_any_terminal_state() {
        for next in [AppointmentStatus::Completed, AppointmentStatus::Cancelled, AppointmentStatus::Serviced] {
            assert!(AppointmentLifecycleService::validate_status_transition(AppointmentStatus::Scheduled, next).is_ok());
        }
    }

    #[test]
    fn terminal_states_are_final() {
        let result = AppointmentLifecycleService::validate_status_transition(
            AppointmentStatus::Serviced,
            AppointmentStatus::Scheduled,
        );
        assert!(matches!(result, Err(AppointmentError::InvalidStatusTransition { .. })));
        assert!(AppointmentLifecycleService::get_valid_transitions(AppointmentStatus::Cancelled).is_empty());
    }

    #[test]
    fn only_the_job_services_appointments() {
        assert!(!AppointmentLifecycleService::role_may_set(Role::Doctor, AppointmentStatus::Serviced));
        assert!(!AppointmentLifecycleService::role_may_set(Role::Admin, AppointmentStatus::Serviced));
        assert!(AppointmentLifecycleService::role_may_set(Role::Doctor, AppointmentStatus::Completed));
        assert!(!AppointmentLifecycleService::role_may_set(Role::Patient, AppointmentStatus::Completed));
    }
}
