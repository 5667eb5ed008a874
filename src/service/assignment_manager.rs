//! Assignment lifecycle: placement, status moves and the employee dashboard.

use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::{join, join_all};
use tracing::{debug, info, warn};

use super::events::{AssignmentEvent, EventSink};
use super::selector::Selector;
use crate::clients::{AppointmentDirectory, EmployeeDirectory};
use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::model::assignment::{Assignment, AssignmentStatus, required_specialization};
use crate::model::employee::Employee;
use crate::models::{AppointmentSummary, EnrichedAssignment};
use crate::store::WorkStore;

pub struct AssignmentManager {
    store: Arc<dyn WorkStore>,
    selector: Selector,
    employees: Arc<dyn EmployeeDirectory>,
    appointments: Arc<dyn AppointmentDirectory>,
    clock: Arc<dyn Clock>,
    events: EventSink,
}

impl AssignmentManager {
    pub fn new(
        store: Arc<dyn WorkStore>,
        employees: Arc<dyn EmployeeDirectory>,
        appointments: Arc<dyn AppointmentDirectory>,
        clock: Arc<dyn Clock>,
        events: EventSink,
    ) -> Self {
        Self {
            store,
            selector: Selector::new(employees.clone()),
            employees,
            appointments,
            clock,
            events,
        }
    }

    /// Manual placement. Both ids are checked against their directories first.
    pub async fn assign(&self, employee_id: u64, appointment_id: u64) -> AppResult<Assignment> {
        let (employee, appointment) = join(
            self.employees.find_employee(employee_id),
            self.appointments.get_appointment(appointment_id),
        )
        .await;

        let employee = employee?
            .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", employee_id)))?;
        let appointment = appointment?
            .ok_or_else(|| AppError::NotFound(format!("Appointment {} not found", appointment_id)))?;

        let assignment = self
            .store
            .insert_assignment(employee_id, appointment_id, self.clock.now())
            .await?;
        info!(
            assignment_id = assignment.id,
            appointment_id,
            employee_id,
            "Appointment assigned manually"
        );

        self.events.emit(AssignmentEvent::Created {
            assignment: assignment.clone(),
            specialization: employee.job_title.clone(),
            employee: Some(employee),
            appointment_date: appointment.appointment_date,
        });
        Ok(assignment)
    }

    /// Booking-flow entry point: maps the service category to a job title.
    /// A blank category is looked up on the appointment itself.
    pub async fn auto_assign(
        &self,
        appointment_id: u64,
        service_category: &str,
        appointment_date: Option<NaiveDate>,
    ) -> AppResult<Assignment> {
        if !service_category.trim().is_empty() {
            let specialization = required_specialization(service_category);
            return self
                .auto_assign_for_specialization(appointment_id, specialization, appointment_date)
                .await;
        }

        let (category, date) = match self.appointments.get_appointment(appointment_id).await {
            Ok(Some(appt)) => (
                appt.service_category().unwrap_or_default().to_string(),
                appointment_date.or(appt.appointment_date),
            ),
            Ok(None) => (String::new(), appointment_date),
            Err(e) => {
                warn!(appointment_id, error = %e, "Service category lookup failed, using general pool");
                (String::new(), appointment_date)
            }
        };
        let specialization = required_specialization(&category);
        self.auto_assign_for_specialization(appointment_id, specialization, date)
            .await
    }

    pub async fn auto_assign_for_specialization(
        &self,
        appointment_id: u64,
        specialization: &str,
        appointment_date: Option<NaiveDate>,
    ) -> AppResult<Assignment> {
        let specialization = specialization.trim();
        if specialization.is_empty() {
            return Err(AppError::Validation("Job title must not be empty".to_string()));
        }
        if let Some(existing) = self.store.active_assignment_for_appointment(appointment_id).await? {
            return Err(AppError::Conflict(format!(
                "Appointment {} is already assigned to employee {}",
                appointment_id, existing.employee_id
            )));
        }

        let pool = self.selector.candidates(specialization).await?;
        let assignment = self
            .store
            .claim_least_loaded(appointment_id, &pool.ids(), self.clock.now())
            .await?;
        info!(
            assignment_id = assignment.id,
            appointment_id,
            employee_id = assignment.employee_id,
            specialization,
            fallback = pool.fallback,
            "Appointment auto-assigned"
        );

        self.events.emit(AssignmentEvent::Created {
            assignment: assignment.clone(),
            employee: pool.get(assignment.employee_id).cloned(),
            appointment_date,
            specialization: Some(pool.specialization.clone()),
        });
        Ok(assignment)
    }

    /// Moves an assignment along the transition table. Writing the current
    /// status again returns the row untouched.
    pub async fn update_status(&self, assignment_id: u64, next: AssignmentStatus) -> AppResult<Assignment> {
        let current = self
            .store
            .get_assignment(assignment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Assignment {} not found", assignment_id)))?;

        if current.status == next {
            debug!(assignment_id, status = %next, "Status unchanged");
            return Ok(current);
        }
        if !current.status.can_transition_to(next) {
            return Err(AppError::Validation(format!(
                "Cannot change assignment {} from {} to {}",
                assignment_id, current.status, next
            )));
        }

        let updated = self
            .store
            .transition_assignment(assignment_id, current.status, next, self.clock.now())
            .await?;
        info!(assignment_id, from = %current.status, to = %next, "Assignment status updated");

        self.events.emit(AssignmentEvent::StatusChanged {
            assignment: updated.clone(),
            previous: current.status,
        });
        Ok(updated)
    }

    /// An employee's assignments with appointment details fetched concurrently.
    /// A failed lookup leaves that entry's summary empty.
    pub async fn list_assignments(&self, employee_id: u64) -> AppResult<Vec<EnrichedAssignment>> {
        let assignments = self.store.assignments_for_employee(employee_id).await?;

        let lookups = assignments
            .iter()
            .map(|a| self.appointments.get_appointment(a.appointment_id));
        let details = join_all(lookups).await;

        Ok(assignments
            .into_iter()
            .zip(details)
            .map(|(assignment, detail)| {
                let summary = match detail {
                    Ok(found) => found.map(AppointmentSummary::from),
                    Err(e) => {
                        debug!(
                            appointment_id = assignment.appointment_id,
                            error = %e,
                            "Could not fetch appointment details"
                        );
                        None
                    }
                };
                EnrichedAssignment::new(assignment, summary)
            })
            .collect())
    }

    /// Employee currently holding the appointment, if any.
    pub async fn employee_for_appointment(&self, appointment_id: u64) -> AppResult<Option<Employee>> {
        let Some(assignment) = self.store.active_assignment_for_appointment(appointment_id).await? else {
            return Ok(None);
        };
        let employee = self.employees.find_employee(assignment.employee_id).await?;
        if employee.is_none() {
            warn!(
                appointment_id,
                employee_id = assignment.employee_id,
                "Assigned employee missing from directory"
            );
        }
        Ok(employee)
    }
}
