//! Side effects of assignment writes, run off the request path.
//!
//! The manager publishes an [`AssignmentEvent`] once its row is committed; the
//! [`Notifier`] task turns it into emails, SMS and status hints. Nothing here
//! can fail or slow down the write that produced the event.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::clients::{AppointmentDirectory, NotificationDispatcher};
use crate::model::appointment::{Appointment, Customer};
use crate::model::assignment::{Assignment, AssignmentStatus};
use crate::model::employee::Employee;

const TBD: &str = "TBD";

#[derive(Debug, Clone)]
pub enum AssignmentEvent {
    Created {
        assignment: Assignment,
        employee: Option<Employee>,
        appointment_date: Option<NaiveDate>,
        specialization: Option<String>,
    },
    StatusChanged {
        assignment: Assignment,
        previous: AssignmentStatus,
    },
}

impl AssignmentEvent {
    pub fn assignment(&self) -> &Assignment {
        match self {
            AssignmentEvent::Created { assignment, .. }
            | AssignmentEvent::StatusChanged { assignment, .. } => assignment,
        }
    }
}

/// Publishing half held by the manager.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<AssignmentEvent>,
}

pub fn channel(capacity: usize) -> (EventSink, mpsc::Receiver<AssignmentEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSink { tx }, rx)
}

impl EventSink {
    /// Never waits: a full or closed queue drops the event with a warning.
    pub fn emit(&self, event: AssignmentEvent) {
        let assignment_id = event.assignment().id;
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(assignment_id, "Notification queue full, event dropped")
            }
            Err(TrySendError::Closed(_)) => {
                warn!(assignment_id, "Notifier stopped, event dropped")
            }
        }
    }
}

pub struct Notifier {
    notifications: Arc<dyn NotificationDispatcher>,
    appointments: Arc<dyn AppointmentDirectory>,
    fallback_sms: Option<String>,
}

impl Notifier {
    pub fn new(
        notifications: Arc<dyn NotificationDispatcher>,
        appointments: Arc<dyn AppointmentDirectory>,
        fallback_sms: Option<String>,
    ) -> Self {
        Self {
            notifications,
            appointments,
            fallback_sms,
        }
    }

    /// Drains the queue until every sink is dropped.
    pub async fn run(self, mut rx: mpsc::Receiver<AssignmentEvent>) {
        info!("Notifier started");
        while let Some(event) = rx.recv().await {
            self.handle(event).await;
        }
        info!("Notifier stopped");
    }

    pub async fn handle(&self, event: AssignmentEvent) {
        match event {
            AssignmentEvent::Created {
                assignment,
                employee,
                appointment_date,
                specialization,
            } => {
                self.push_status_hint(&assignment).await;
                if let Some(employee) = &employee {
                    self.notify_employee(&assignment, employee, appointment_date, specialization.as_deref())
                        .await;
                }
                self.notify_customer(&assignment, appointment_date).await;
            }
            AssignmentEvent::StatusChanged { assignment, previous } => {
                debug!(
                    assignment_id = assignment.id,
                    from = %previous,
                    to = %assignment.status,
                    "Assignment status changed"
                );
                self.push_status_hint(&assignment).await;
            }
        }
    }

    async fn push_status_hint(&self, assignment: &Assignment) {
        let hint = assignment.status.appointment_status_hint();
        if let Err(e) = self.appointments.set_status(assignment.appointment_id, hint).await {
            warn!(
                appointment_id = assignment.appointment_id,
                status = hint,
                error = %e,
                "Appointment status sync failed"
            );
        }
    }

    async fn notify_employee(
        &self,
        assignment: &Assignment,
        employee: &Employee,
        date: Option<NaiveDate>,
        specialization: Option<&str>,
    ) {
        let date = date.map_or_else(|| TBD.to_string(), |d| d.to_string());
        let specialization = specialization.unwrap_or("GENERAL EMPLOYEE");

        if let Some(email) = employee.email.as_deref().filter(|e| !e.is_empty()) {
            let body = format!(
                "You have been assigned appointment #{} on {} ({})",
                assignment.appointment_id, date, specialization
            );
            if let Err(e) = self.notifications.send_email(email, "Appointment Assigned", &body).await {
                warn!(employee_id = employee.id, error = %e, "Employee email failed");
            }
        }

        let phone = employee
            .phone_number
            .as_deref()
            .filter(|p| !p.is_empty())
            .or(self.fallback_sms.as_deref());
        if let Some(phone) = phone {
            let message = format!("Appointment assigned on {} ({})", date, specialization);
            if let Err(e) = self.notifications.send_sms(phone, &message).await {
                warn!(employee_id = employee.id, error = %e, "Employee SMS failed");
            }
        }
    }

    async fn notify_customer(&self, assignment: &Assignment, date: Option<NaiveDate>) {
        let appointment_id = assignment.appointment_id;
        let appointment = match self.appointments.get_appointment(appointment_id).await {
            Ok(Some(a)) => a,
            Ok(None) => {
                warn!(appointment_id, "Appointment not found, skipping customer notification");
                return;
            }
            Err(e) => {
                warn!(appointment_id, error = %e, "Appointment lookup failed, skipping customer notification");
                return;
            }
        };

        let Some(customer_id) = appointment.customer_id else {
            warn!(appointment_id, "Appointment has no customer, skipping customer notification");
            return;
        };
        let customer = match self.appointments.get_customer(customer_id).await {
            Ok(Some(c)) => c,
            Ok(None) => {
                warn!(appointment_id, customer_id, "Customer not found, skipping customer notification");
                return;
            }
            Err(e) => {
                warn!(appointment_id, customer_id, error = %e, "Customer lookup failed");
                return;
            }
        };

        let message = CustomerMessage::new(&appointment, &customer, date);

        match customer.email.as_deref().filter(|e| !e.is_empty()) {
            Some(email) => {
                match self
                    .notifications
                    .send_email(email, "Appointment Confirmation", &message.email_body())
                    .await
                {
                    Ok(()) => info!(appointment_id, customer_id, "Confirmation email sent"),
                    Err(e) => warn!(appointment_id, customer_id, error = %e, "Confirmation email failed"),
                }
            }
            None => warn!(appointment_id, customer_id, "Customer has no email"),
        }

        match customer.phone.as_deref().filter(|p| !p.is_empty()) {
            Some(phone) => match self.notifications.send_sms(phone, &message.sms()).await {
                Ok(()) => info!(appointment_id, customer_id, "Confirmation SMS sent"),
                Err(e) => warn!(appointment_id, customer_id, error = %e, "Confirmation SMS failed"),
            },
            None => warn!(appointment_id, customer_id, "Customer has no phone number"),
        }
    }
}

struct CustomerMessage {
    name: String,
    service: String,
    date: String,
    time: String,
}

impl CustomerMessage {
    fn new(appointment: &Appointment, customer: &Customer, date: Option<NaiveDate>) -> Self {
        let name = customer
            .name
            .as_deref()
            .or(appointment.customer_name.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("Customer")
            .to_string();
        Self {
            name,
            service: appointment.service_name().unwrap_or("service").to_string(),
            date: date
                .or(appointment.appointment_date)
                .map_or_else(|| TBD.to_string(), |d| d.to_string()),
            time: appointment
                .appointment_time
                .clone()
                .unwrap_or_else(|| TBD.to_string()),
        }
    }

    fn email_body(&self) -> String {
        format!(
            "Dear {},\n\nYour appointment has been confirmed!\n\nAppointment Details:\n\
             - Service: {}\n- Date: {}\n- Time: {}\n\n\
             We look forward to serving you.\n\nBest regards,\nService Team",
            self.name, self.service, self.date, self.time
        )
    }

    fn sms(&self) -> String {
        format!(
            "Your appointment is confirmed for {} at {}. Service: {}. Thank you!",
            self.date, self.time, self.service
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fakes::{FakeAppointments, RecordingNotifications, Sent, appointment, employee};
    use chrono::NaiveDate;

    fn assignment(status: AssignmentStatus) -> Assignment {
        let at = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        Assignment {
            id: 1,
            appointment_id: 4031,
            employee_id: 7,
            status,
            created_at: at,
            updated_at: at,
        }
    }

    fn setup() -> (Arc<RecordingNotifications>, Arc<FakeAppointments>, Notifier) {
        let notes = Arc::new(RecordingNotifications::default());
        let appts = Arc::new(FakeAppointments::default());
        appts.add_appointment(appointment(4031, 55, "MECHANICAL"));
        appts.add_customer(Customer {
            id: 55,
            name: Some("Nimal Perera".to_string()),
            email: Some("nimal@mail.test".to_string()),
            phone: Some("+94770000000".to_string()),
        });
        let notifier = Notifier::new(notes.clone(), appts.clone(), Some("+94712345678".to_string()));
        (notes, appts, notifier)
    }

    #[actix_web::test]
    async fn created_notifies_employee_and_customer() {
        let (notes, appts, notifier) = setup();
        notifier
            .handle(AssignmentEvent::Created {
                assignment: assignment(AssignmentStatus::Assigned),
                employee: Some(employee(7, "MECHANIC")),
                appointment_date: NaiveDate::from_ymd_opt(2024, 5, 1),
                specialization: Some("MECHANIC".to_string()),
            })
            .await;

        let sent = notes.sent();
        assert_eq!(
            sent[0],
            Sent::Email {
                to: "emp7@shop.test".to_string(),
                subject: "Appointment Assigned".to_string(),
                body: "You have been assigned appointment #4031 on 2024-05-01 (MECHANIC)".to_string(),
            }
        );
        assert_eq!(
            sent[1],
            Sent::Sms {
                to: "+94712345678".to_string(),
                message: "Appointment assigned on 2024-05-01 (MECHANIC)".to_string(),
            }
        );
        assert!(matches!(&sent[2], Sent::Email { to, subject, body }
            if to == "nimal@mail.test"
                && subject == "Appointment Confirmation"
                && body.contains("- Service: Brake service")
                && body.contains("- Time: 10:30")));
        assert_eq!(
            sent[3],
            Sent::Sms {
                to: "+94770000000".to_string(),
                message: "Your appointment is confirmed for 2024-05-01 at 10:30. Service: Brake service. Thank you!"
                    .to_string(),
            }
        );
        assert_eq!(appts.statuses(), vec![(4031, "CONFIRMED".to_string())]);
    }

    #[actix_web::test]
    async fn failures_are_swallowed() {
        let (notes, appts, notifier) = setup();
        notes.set_failing(true);
        appts.set_failing(true);

        notifier
            .handle(AssignmentEvent::Created {
                assignment: assignment(AssignmentStatus::Assigned),
                employee: Some(employee(7, "MECHANIC")),
                appointment_date: None,
                specialization: None,
            })
            .await;

        assert!(notes.sent().is_empty());
        assert!(appts.statuses().is_empty());
    }

    #[actix_web::test]
    async fn status_change_pushes_hint_only() {
        let (notes, appts, notifier) = setup();
        notifier
            .handle(AssignmentEvent::StatusChanged {
                assignment: assignment(AssignmentStatus::Completed),
                previous: AssignmentStatus::InProgress,
            })
            .await;

        assert!(notes.sent().is_empty());
        assert_eq!(appts.statuses(), vec![(4031, "COMPLETED".to_string())]);
    }

    #[actix_web::test]
    async fn full_queue_drops_without_blocking() {
        let (sink, mut rx) = channel(1);
        sink.emit(AssignmentEvent::StatusChanged {
            assignment: assignment(AssignmentStatus::InProgress),
            previous: AssignmentStatus::Assigned,
        });
        sink.emit(AssignmentEvent::StatusChanged {
            assignment: assignment(AssignmentStatus::Completed),
            previous: AssignmentStatus::InProgress,
        });

        let first = rx.recv().await.unwrap();
        assert_eq!(first.assignment().status, AssignmentStatus::InProgress);
        assert!(rx.try_recv().is_err());
    }
}
