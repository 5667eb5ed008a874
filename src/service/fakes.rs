//! In-memory collaborators for engine and handler tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use actix_web::web::Data;
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::mpsc::Receiver;

use super::aggregator::DailyHoursAggregator;
use super::assignment_manager::AssignmentManager;
use super::events::{self, AssignmentEvent};
use super::time_tracker::TimeTracker;
use crate::clients::{
    AppointmentDirectory, ClientError, ClientResult, EmployeeDirectory, NotificationDispatcher,
};
use crate::clock::ManualClock;
use crate::model::appointment::{Appointment, Customer, ServiceSummary};
use crate::model::employee::Employee;
use crate::store::memory::MemoryStore;

pub fn employee(id: u64, job_title: &str) -> Employee {
    Employee {
        id,
        first_name: Some(format!("Emp{}", id)),
        last_name: None,
        email: Some(format!("emp{}@shop.test", id)),
        phone_number: None,
        job_title: Some(job_title.to_string()),
        role: Some("EMPLOYEE".to_string()),
        active: true,
    }
}

pub fn appointment(id: u64, customer_id: u64, category: &str) -> Appointment {
    Appointment {
        id,
        customer_id: Some(customer_id),
        customer_name: Some("Nimal Perera".to_string()),
        appointment_date: NaiveDate::from_ymd_opt(2024, 5, 1),
        appointment_time: Some("10:30".to_string()),
        status: Some("PENDING".to_string()),
        service: Some(ServiceSummary {
            id: Some(1),
            name: Some("Brake service".to_string()),
            category: Some(category.to_string()),
        }),
        vehicle: None,
    }
}

fn outage() -> ClientError {
    ClientError::Http("connection refused".to_string())
}

#[derive(Default)]
pub struct FakeEmployees {
    roster: Mutex<Vec<Employee>>,
    failing: AtomicBool,
}

impl FakeEmployees {
    pub fn with(roster: Vec<Employee>) -> Self {
        Self {
            roster: Mutex::new(roster),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn snapshot(&self) -> ClientResult<Vec<Employee>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(outage());
        }
        Ok(self.roster.lock().unwrap().clone())
    }
}

#[async_trait]
impl EmployeeDirectory for FakeEmployees {
    async fn list_by_specialization(&self, tag: &str) -> ClientResult<Vec<Employee>> {
        Ok(self
            .snapshot()?
            .into_iter()
            .filter(|e| e.active && e.has_specialization(tag))
            .collect())
    }

    async fn list_all(&self) -> ClientResult<Vec<Employee>> {
        self.snapshot()
    }
}

#[derive(Default)]
pub struct FakeAppointments {
    appointments: Mutex<HashMap<u64, Appointment>>,
    customers: Mutex<HashMap<u64, Customer>>,
    pub status_updates: Mutex<Vec<(u64, String)>>,
    failing: AtomicBool,
}

impl FakeAppointments {
    pub fn add_appointment(&self, appointment: Appointment) {
        self.appointments
            .lock()
            .unwrap()
            .insert(appointment.id, appointment);
    }

    pub fn add_customer(&self, customer: Customer) {
        self.customers.lock().unwrap().insert(customer.id, customer);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn statuses(&self) -> Vec<(u64, String)> {
        self.status_updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl AppointmentDirectory for FakeAppointments {
    async fn get_appointment(&self, id: u64) -> ClientResult<Option<Appointment>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(outage());
        }
        Ok(self.appointments.lock().unwrap().get(&id).cloned())
    }

    async fn get_customer(&self, id: u64) -> ClientResult<Option<Customer>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(outage());
        }
        Ok(self.customers.lock().unwrap().get(&id).cloned())
    }

    async fn set_status(&self, id: u64, status: &str) -> ClientResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(outage());
        }
        self.status_updates
            .lock()
            .unwrap()
            .push((id, status.to_string()));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Email { to: String, subject: String, body: String },
    Sms { to: String, message: String },
}

#[derive(Default)]
pub struct RecordingNotifications {
    sent: Mutex<Vec<Sent>>,
    failing: AtomicBool,
}

impl RecordingNotifications {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingNotifications {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> ClientResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(outage());
        }
        self.sent.lock().unwrap().push(Sent::Email {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn send_sms(&self, to: &str, message: &str) -> ClientResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(outage());
        }
        self.sent.lock().unwrap().push(Sent::Sms {
            to: to.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }
}

/// Engine wired to a fresh `MemoryStore`, the fakes above and a manual clock
/// at 2024-05-01 08:00.
pub struct TestEngine {
    pub store: Arc<MemoryStore>,
    pub employees: Arc<FakeEmployees>,
    pub appointments: Arc<FakeAppointments>,
    pub clock: Arc<ManualClock>,
    pub manager: Data<AssignmentManager>,
    pub tracker: Data<TimeTracker>,
    pub aggregator: Data<DailyHoursAggregator>,
    pub events: Receiver<AssignmentEvent>,
}

pub fn engine(roster: Vec<Employee>) -> TestEngine {
    let store = Arc::new(MemoryStore::new());
    let employees = Arc::new(FakeEmployees::with(roster));
    let appointments = Arc::new(FakeAppointments::default());
    let clock = Arc::new(ManualClock::new(
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap(),
    ));
    let (sink, events) = events::channel(64);

    let aggregator = Arc::new(DailyHoursAggregator::new(store.clone(), clock.clone()));
    let tracker = TimeTracker::new(store.clone(), aggregator.clone(), clock.clone());
    let manager = AssignmentManager::new(
        store.clone(),
        employees.clone(),
        appointments.clone(),
        clock.clone(),
        sink,
    );

    TestEngine {
        store,
        employees,
        appointments,
        clock,
        manager: Data::new(manager),
        tracker: Data::new(tracker),
        aggregator: Data::from(aggregator),
        events,
    }
}
