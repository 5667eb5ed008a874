//! Greedy minimum-load placement.
//!
//! Candidates come from the employee directory in two tiers: the
//! specialization pool, then the whole assignable roster. Scoring itself
//! happens inside the store's claim so the count and the insert are atomic.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::clients::EmployeeDirectory;
use crate::error::{AppError, AppResult};
use crate::model::employee::Employee;

/// Lowest `load` wins; on a tie the earlier candidate wins.
pub fn pick_least_loaded(candidates: &[u64], load: impl Fn(u64) -> u32) -> Option<u64> {
    let mut best: Option<(u64, u32)> = None;
    for &id in candidates {
        let n = load(id);
        if best.map_or(true, |(_, min)| n < min) {
            best = Some((id, n));
        }
    }
    best.map(|(id, _)| id)
}

#[derive(Debug, Clone)]
pub struct CandidatePool {
    pub specialization: String,
    /// Directory order, no duplicates.
    pub employees: Vec<Employee>,
    /// True when the specialization pool was empty and the full roster is used.
    pub fallback: bool,
}

impl CandidatePool {
    pub fn ids(&self) -> Vec<u64> {
        self.employees.iter().map(|e| e.id).collect()
    }

    pub fn get(&self, id: u64) -> Option<&Employee> {
        self.employees.iter().find(|e| e.id == id)
    }
}

pub struct Selector {
    directory: Arc<dyn EmployeeDirectory>,
}

impl Selector {
    pub fn new(directory: Arc<dyn EmployeeDirectory>) -> Self {
        Self { directory }
    }

    /// Directory failures surface as `UpstreamUnavailable`: selection cannot
    /// run without a roster. An empty roster is `Unavailable`.
    pub async fn candidates(&self, specialization: &str) -> AppResult<CandidatePool> {
        let matched = assignable(self.directory.list_by_specialization(specialization).await?);
        if !matched.is_empty() {
            debug!(specialization, count = matched.len(), "Specialization pool found");
            return Ok(CandidatePool {
                specialization: specialization.to_string(),
                employees: matched,
                fallback: false,
            });
        }

        warn!(specialization, "No employees with this job title, falling back to the full roster");
        let roster = assignable(self.directory.list_all().await?);
        if roster.is_empty() {
            return Err(AppError::Unavailable("No employees available for assignment".to_string()));
        }

        Ok(CandidatePool {
            specialization: specialization.to_string(),
            employees: roster,
            fallback: true,
        })
    }
}

fn assignable(employees: Vec<Employee>) -> Vec<Employee> {
    let mut seen = HashSet::new();
    employees
        .into_iter()
        .filter(|e| e.is_assignable() && seen.insert(e.id))
        .collect()
}
