use crate::{
    error::{Result, ServiceError},
    hours::{
        BillableHours, BillableStatus, HourRegistrationResponse, LeaveHours, LeaveStatus,
        RegisterBillableHoursRequest, RegisterLeaveHoursRequest,
    },
    store::Store,
};
use chrono::Utc;
use tracing::{debug, info};

const MAX_HOURS_PER_DAY: f64 = 8.0;
const MAX_HOURS_PER_WORK_DATE: f64 = 24.0;

/// Business logic over the two hour-record kinds. Validation happens here;
/// the store below only moves rows.
#[derive(Clone)]
pub struct HourRegistrationService {
    store: Store,
}

impl HourRegistrationService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn register_leave_hours(
        &self,
        request: RegisterLeaveHoursRequest,
    ) -> Result<HourRegistrationResponse> {
        info!(
            employee_id = %request.employee_id,
            leave_type = %request.leave_type,
            hours = request.total_hours,
            "registering leave hours"
        );

        validate_leave_request(&request)?;

        let record = LeaveHours {
            id: 0,
            employee_id: request.employee_id,
            leave_type: request.leave_type,
            start_date: request.start_date,
            end_date: request.end_date,
            total_hours: request.total_hours,
            description: request.description,
            status: LeaveStatus::Pending,
            requested_at: Utc::now(),
            approved_at: None,
            approved_by: None,
        };

        let saved = self.store.insert_leave_hours(record).await?;
        info!(id = saved.id, employee_id = %saved.employee_id, "leave hours registered");

        Ok(HourRegistrationResponse {
            id: saved.id,
            message: format!(
                "Leave hours registered successfully. Request ID: {}",
                saved.id
            ),
            status: LeaveStatus::Pending.to_string(),
        })
    }

    pub async fn register_billable_hours(
        &self,
        request: RegisterBillableHoursRequest,
    ) -> Result<HourRegistrationResponse> {
        info!(
            employee_id = %request.employee_id,
            client = %request.client_name,
            hours = request.hours_worked,
            "registering billable hours"
        );

        validate_billable_request(&request)?;

        let client_name = request.client_name.clone();
        let record = BillableHours {
            id: 0,
            employee_id: request.employee_id,
            client_name: request.client_name,
            project_name: request.project_name,
            location: request.location,
            work_date: request.work_date,
            hours_worked: request.hours_worked,
            description: request.description,
            travel_type: request.travel_type,
            travel_kilometers: request.travel_kilometers,
            travel_from_location: request.travel_from_location,
            travel_to_location: request.travel_to_location,
            hourly_rate: request.hourly_rate,
            status: BillableStatus::Pending,
            created_at: Utc::now(),
            submitted_at: None,
            approved_at: None,
            invoiced_at: None,
        };

        let saved = self.store.insert_billable_hours(record).await?;
        info!(id = saved.id, employee_id = %saved.employee_id, "billable hours registered");

        Ok(HourRegistrationResponse {
            id: saved.id,
            message: format!(
                "Billable hours registered successfully for client {}. Entry ID: {}",
                client_name, saved.id
            ),
            status: BillableStatus::Pending.to_string(),
        })
    }

    /// All leave records for an employee, newest start date first.
    pub async fn leave_hours_by_employee(&self, employee_id: &str) -> Result<Vec<LeaveHours>> {
        debug!(%employee_id, "retrieving leave hours");
        self.store.leave_hours_by_employee(employee_id).await
    }

    /// All billable records for an employee, newest work date first.
    pub async fn billable_hours_by_employee(
        &self,
        employee_id: &str,
    ) -> Result<Vec<BillableHours>> {
        debug!(%employee_id, "retrieving billable hours");
        self.store.billable_hours_by_employee(employee_id).await
    }

    /// APPROVED leave hours with a start date in the given calendar year.
    pub async fn total_leave_hours_for_year(&self, employee_id: &str, year: i32) -> Result<f64> {
        debug!(%employee_id, year, "calculating total leave hours");
        self.store
            .total_approved_leave_hours(employee_id, year)
            .await
    }

    /// APPROVED + INVOICED billable hours worked in the given calendar year.
    pub async fn total_billable_hours_for_year(&self, employee_id: &str, year: i32) -> Result<f64> {
        debug!(%employee_id, year, "calculating total billable hours");
        self.store.total_billable_hours(employee_id, year).await
    }
}

fn validate_leave_request(request: &RegisterLeaveHoursRequest) -> Result<()> {
    if request.employee_id.trim().is_empty() {
        return Err(ServiceError::validation("Employee ID is required"));
    }
    if request.end_date < request.start_date {
        return Err(ServiceError::validation(
            "End date must be after or equal to start date",
        ));
    }
    if request.total_hours <= 0.0 {
        return Err(ServiceError::validation("Total hours must be positive"));
    }

    let days = (request.end_date - request.start_date).num_days() + 1;
    let max_hours = days as f64 * MAX_HOURS_PER_DAY;
    if request.total_hours > max_hours {
        return Err(ServiceError::validation(format!(
            "Total hours ({}) exceed maximum for the date range ({} hours for {} days)",
            request.total_hours, max_hours, days
        )));
    }

    Ok(())
}

fn validate_billable_request(request: &RegisterBillableHoursRequest) -> Result<()> {
    if request.employee_id.trim().is_empty() {
        return Err(ServiceError::validation("Employee ID is required"));
    }
    if request.client_name.trim().is_empty() {
        return Err(ServiceError::validation("Client name is required"));
    }
    if request.location.trim().is_empty() {
        return Err(ServiceError::validation("Location is required"));
    }
    if request.description.trim().is_empty() {
        return Err(ServiceError::validation("Description is required"));
    }
    if request.hours_worked <= 0.0 {
        return Err(ServiceError::validation("Hours worked must be positive"));
    }
    if request.hours_worked > MAX_HOURS_PER_WORK_DATE {
        return Err(ServiceError::validation(
            "Hours worked cannot exceed 24 hours per day",
        ));
    }
    if let Some(km) = request.travel_kilometers {
        if km < 0.0 {
            return Err(ServiceError::validation(
                "Travel kilometers must be zero or positive",
            ));
        }
        if km > 0.0 && request.travel_type.is_none() {
            return Err(ServiceError::validation(
                "Travel type is required when travel kilometers are specified",
            ));
        }
    }

    Ok(())
}
