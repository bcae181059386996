//! The six hour-registration tools exposed to the model.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{Tool, ToolRegistry};
use crate::hours::{
    LeaveType, RegisterBillableHoursRequest, RegisterLeaveHoursRequest, TravelType,
};
use crate::registration::HourRegistrationService;

/// Register all six tools against one domain service.
pub fn register_hour_tools(registry: &mut ToolRegistry, service: HourRegistrationService) {
    registry.register(Box::new(RegisterLeaveHoursTool {
        service: service.clone(),
    }));
    registry.register(Box::new(RegisterBillableHoursTool {
        service: service.clone(),
    }));
    registry.register(Box::new(TotalLeaveHoursTool {
        service: service.clone(),
    }));
    registry.register(Box::new(TotalBillableHoursTool {
        service: service.clone(),
    }));
    registry.register(Box::new(LeaveHistoryTool {
        service: service.clone(),
    }));
    registry.register(Box::new(BillableHistoryTool { service }));
}

fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, String> {
    serde_json::from_value(arguments).map_err(|e| format!("invalid arguments: {e}"))
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("{field} must be a date in YYYY-MM-DD format, got '{value}'"))
}

// --- registerLeaveHours ------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeaveRegistrationArgs {
    employee_id: String,
    leave_type: String,
    start_date: String,
    end_date: String,
    total_hours: f64,
    #[serde(default)]
    description: Option<String>,
}

struct RegisterLeaveHoursTool {
    service: HourRegistrationService,
}

#[async_trait]
impl Tool for RegisterLeaveHoursTool {
    fn name(&self) -> &'static str {
        "registerLeaveHours"
    }

    fn description(&self) -> &'static str {
        "Register leave hours (vacation, sick leave, etc.) for an employee"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "employeeId": { "type": "string", "description": "Employee identifier" },
                "leaveType": {
                    "type": "string",
                    "description": "One of ANNUAL_LEAVE, SICK_LEAVE, PERSONAL_LEAVE, MATERNITY_LEAVE, PATERNITY_LEAVE, BEREAVEMENT_LEAVE, OTHER"
                },
                "startDate": { "type": "string", "description": "First day of leave, YYYY-MM-DD" },
                "endDate": { "type": "string", "description": "Last day of leave, YYYY-MM-DD" },
                "totalHours": { "type": "number", "description": "Total leave hours requested" },
                "description": { "type": "string", "description": "Optional free-form reason" }
            },
            "required": ["employeeId", "leaveType", "startDate", "endDate", "totalHours"]
        })
    }

    async fn execute(&self, arguments: Value) -> String {
        let result = async {
            let args: LeaveRegistrationArgs = parse_args(arguments)?;
            let request = RegisterLeaveHoursRequest {
                employee_id: args.employee_id,
                leave_type: args.leave_type.parse::<LeaveType>()?,
                start_date: parse_date("startDate", &args.start_date)?,
                end_date: parse_date("endDate", &args.end_date)?,
                total_hours: args.total_hours,
                description: args.description,
            };
            self.service
                .register_leave_hours(request)
                .await
                .map_err(|e| e.to_string())
        }
        .await;

        match result {
            Ok(response) => format!("✅ {}", response.message),
            Err(e) => format!("❌ Error registering leave hours: {e}"),
        }
    }
}

// --- registerBillableHours ---------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BillableRegistrationArgs {
    employee_id: String,
    client_name: String,
    #[serde(default)]
    project_name: Option<String>,
    location: String,
    work_date: String,
    hours_worked: f64,
    description: String,
    #[serde(default)]
    travel_type: Option<String>,
    #[serde(default)]
    travel_kilometers: Option<f64>,
    #[serde(default)]
    travel_from_location: Option<String>,
    #[serde(default)]
    travel_to_location: Option<String>,
    #[serde(default)]
    hourly_rate: Option<f64>,
}

struct RegisterBillableHoursTool {
    service: HourRegistrationService,
}

#[async_trait]
impl Tool for RegisterBillableHoursTool {
    fn name(&self) -> &'static str {
        "registerBillableHours"
    }

    fn description(&self) -> &'static str {
        "Register billable client hours for an employee, optionally with travel details"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "employeeId": { "type": "string", "description": "Employee identifier" },
                "clientName": { "type": "string", "description": "Name of the client" },
                "projectName": { "type": "string", "description": "Optional project name" },
                "location": { "type": "string", "description": "Where the work happened" },
                "workDate": { "type": "string", "description": "Day of work, YYYY-MM-DD" },
                "hoursWorked": { "type": "number", "description": "Hours worked, at most 24" },
                "description": { "type": "string", "description": "What work was done" },
                "travelType": {
                    "type": "string",
                    "description": "One of CAR, BIKE, PUBLIC_TRANSPORT, FLIGHT, TRAIN, OTHER, NO_TRAVEL"
                },
                "travelKilometers": { "type": "number", "description": "Kilometers traveled" },
                "travelFromLocation": { "type": "string", "description": "Travel origin" },
                "travelToLocation": { "type": "string", "description": "Travel destination" },
                "hourlyRate": { "type": "number", "description": "Hourly rate in euros" }
            },
            "required": ["employeeId", "clientName", "location", "workDate", "hoursWorked", "description"]
        })
    }

    async fn execute(&self, arguments: Value) -> String {
        let result = async {
            let args: BillableRegistrationArgs = parse_args(arguments)?;
            let travel_type = args
                .travel_type
                .as_deref()
                .map(|t| t.parse::<TravelType>())
                .transpose()?;
            let request = RegisterBillableHoursRequest {
                employee_id: args.employee_id,
                client_name: args.client_name,
                project_name: args.project_name,
                location: args.location,
                work_date: parse_date("workDate", &args.work_date)?,
                hours_worked: args.hours_worked,
                description: args.description,
                travel_type,
                travel_kilometers: args.travel_kilometers,
                travel_from_location: args.travel_from_location,
                travel_to_location: args.travel_to_location,
                hourly_rate: args.hourly_rate,
            };
            self.service
                .register_billable_hours(request)
                .await
                .map_err(|e| e.to_string())
        }
        .await;

        match result {
            Ok(response) => format!("✅ {}", response.message),
            Err(e) => format!("❌ Error registering billable hours: {e}"),
        }
    }
}

// --- summaries and history ---------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmployeeYearArgs {
    employee_id: String,
    year: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmployeeArgs {
    employee_id: String,
}

fn employee_year_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "employeeId": { "type": "string", "description": "Employee identifier" },
            "year": { "type": "integer", "description": "Calendar year, e.g. 2025" }
        },
        "required": ["employeeId", "year"]
    })
}

fn employee_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "employeeId": { "type": "string", "description": "Employee identifier" }
        },
        "required": ["employeeId"]
    })
}

struct TotalLeaveHoursTool {
    service: HourRegistrationService,
}

#[async_trait]
impl Tool for TotalLeaveHoursTool {
    fn name(&self) -> &'static str {
        "getTotalLeaveHours"
    }

    fn description(&self) -> &'static str {
        "Get the total approved leave hours an employee has used in a year"
    }

    fn parameters(&self) -> Value {
        employee_year_schema()
    }

    async fn execute(&self, arguments: Value) -> String {
        let args: EmployeeYearArgs = match parse_args(arguments) {
            Ok(args) => args,
            Err(e) => return format!("❌ Error retrieving leave hours: {e}"),
        };

        match self
            .service
            .total_leave_hours_for_year(&args.employee_id, args.year)
            .await
        {
            Ok(total) => format!(
                "Employee {} has used {} leave hours in {}",
                args.employee_id, total, args.year
            ),
            Err(e) => format!("❌ Error retrieving leave hours: {e}"),
        }
    }
}

struct TotalBillableHoursTool {
    service: HourRegistrationService,
}

#[async_trait]
impl Tool for TotalBillableHoursTool {
    fn name(&self) -> &'static str {
        "getTotalBillableHours"
    }

    fn description(&self) -> &'static str {
        "Get the total approved or invoiced billable hours an employee logged in a year"
    }

    fn parameters(&self) -> Value {
        employee_year_schema()
    }

    async fn execute(&self, arguments: Value) -> String {
        let args: EmployeeYearArgs = match parse_args(arguments) {
            Ok(args) => args,
            Err(e) => return format!("❌ Error retrieving billable hours: {e}"),
        };

        match self
            .service
            .total_billable_hours_for_year(&args.employee_id, args.year)
            .await
        {
            Ok(total) => format!(
                "Employee {} has logged {} billable hours in {}",
                args.employee_id, total, args.year
            ),
            Err(e) => format!("❌ Error retrieving billable hours: {e}"),
        }
    }
}

const HISTORY_LIMIT: usize = 5;

struct LeaveHistoryTool {
    service: HourRegistrationService,
}

#[async_trait]
impl Tool for LeaveHistoryTool {
    fn name(&self) -> &'static str {
        "getLeaveHistory"
    }

    fn description(&self) -> &'static str {
        "Get the most recent leave requests for an employee"
    }

    fn parameters(&self) -> Value {
        employee_schema()
    }

    async fn execute(&self, arguments: Value) -> String {
        let args: EmployeeArgs = match parse_args(arguments) {
            Ok(args) => args,
            Err(e) => return format!("❌ Error retrieving leave history: {e}"),
        };

        match self.service.leave_hours_by_employee(&args.employee_id).await {
            Ok(records) if records.is_empty() => {
                format!("No leave hours found for employee {}", args.employee_id)
            }
            Ok(records) => {
                let summary = records
                    .iter()
                    .take(HISTORY_LIMIT)
                    .map(|leave| {
                        format!(
                            "• {} from {} to {} ({}h) - {}",
                            leave.leave_type,
                            leave.start_date,
                            leave.end_date,
                            leave.total_hours,
                            leave.status
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                format!(
                    "Recent leave history for employee {}:\n{}",
                    args.employee_id, summary
                )
            }
            Err(e) => format!("❌ Error retrieving leave history: {e}"),
        }
    }
}

struct BillableHistoryTool {
    service: HourRegistrationService,
}

#[async_trait]
impl Tool for BillableHistoryTool {
    fn name(&self) -> &'static str {
        "getBillableHistory"
    }

    fn description(&self) -> &'static str {
        "Get the most recent billable hour entries for an employee"
    }

    fn parameters(&self) -> Value {
        employee_schema()
    }

    async fn execute(&self, arguments: Value) -> String {
        let args: EmployeeArgs = match parse_args(arguments) {
            Ok(args) => args,
            Err(e) => return format!("❌ Error retrieving billable history: {e}"),
        };

        match self
            .service
            .billable_hours_by_employee(&args.employee_id)
            .await
        {
            Ok(records) if records.is_empty() => {
                format!("No billable hours found for employee {}", args.employee_id)
            }
            Ok(records) => {
                let summary = records
                    .iter()
                    .take(HISTORY_LIMIT)
                    .map(|hours| {
                        format!(
                            "• {}: {}h for {} at {} - {}",
                            hours.work_date,
                            hours.hours_worked,
                            hours.client_name,
                            hours.location,
                            hours.status
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                format!(
                    "Recent billable hours for employee {}:\n{}",
                    args.employee_id, summary
                )
            }
            Err(e) => format!("❌ Error retrieving billable history: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    async fn registry() -> ToolRegistry {
        let store = Store::in_memory().await.unwrap();
        store.init().await.unwrap();
        let service = HourRegistrationService::new(store);
        let mut registry = ToolRegistry::new();
        register_hour_tools(&mut registry, service);
        registry
    }

    async fn dispatch(registry: &ToolRegistry, name: &str, arguments: Value) -> String {
        registry
            .dispatch(&crate::llm::ToolCall {
                name: name.to_string(),
                arguments,
            })
            .await
    }

    #[tokio::test]
    async fn registry_exposes_six_definitions() {
        let registry = registry().await;
        let mut names: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "getBillableHistory",
                "getLeaveHistory",
                "getTotalBillableHours",
                "getTotalLeaveHours",
                "registerBillableHours",
                "registerLeaveHours",
            ]
        );
    }

    #[tokio::test]
    async fn register_leave_succeeds_with_case_insensitive_type() {
        let registry = registry().await;
        let result = dispatch(
            &registry,
            "registerLeaveHours",
            json!({
                "employeeId": "employee123",
                "leaveType": "sick_leave",
                "startDate": "2025-06-13",
                "endDate": "2025-06-13",
                "totalHours": 8.0
            }),
        )
        .await;

        assert!(result.starts_with("✅"), "unexpected result: {result}");
        assert!(result.contains("Request ID:"));
    }

    #[tokio::test]
    async fn register_leave_renders_validation_failure_as_text() {
        let registry = registry().await;
        let result = dispatch(
            &registry,
            "registerLeaveHours",
            json!({
                "employeeId": "employee123",
                "leaveType": "SICK_LEAVE",
                "startDate": "2025-06-14",
                "endDate": "2025-06-13",
                "totalHours": 8.0
            }),
        )
        .await;

        assert!(result.starts_with("❌"), "unexpected result: {result}");
    }

    #[tokio::test]
    async fn unknown_enum_token_becomes_failure_text() {
        let registry = registry().await;
        let result = dispatch(
            &registry,
            "registerLeaveHours",
            json!({
                "employeeId": "employee123",
                "leaveType": "LONG_WEEKEND",
                "startDate": "2025-06-13",
                "endDate": "2025-06-13",
                "totalHours": 8.0
            }),
        )
        .await;

        assert!(result.starts_with("❌"));
        assert!(result.contains("unknown leave type"));
    }

    #[tokio::test]
    async fn malformed_date_becomes_failure_text() {
        let registry = registry().await;
        let result = dispatch(
            &registry,
            "registerLeaveHours",
            json!({
                "employeeId": "employee123",
                "leaveType": "SICK_LEAVE",
                "startDate": "13-06-2025",
                "endDate": "2025-06-13",
                "totalHours": 8.0
            }),
        )
        .await;

        assert!(result.starts_with("❌"));
        assert!(result.contains("YYYY-MM-DD"));
    }

    #[tokio::test]
    async fn register_billable_without_travel_succeeds() {
        let registry = registry().await;
        let result = dispatch(
            &registry,
            "registerBillableHours",
            json!({
                "employeeId": "employee123",
                "clientName": "ClientABC",
                "location": "Amsterdam",
                "workDate": "2025-06-13",
                "hoursWorked": 6.0,
                "description": "Consulting"
            }),
        )
        .await;

        assert!(result.starts_with("✅"), "unexpected result: {result}");
        assert!(result.contains("ClientABC"));
    }

    #[tokio::test]
    async fn billable_travel_without_type_becomes_failure_text() {
        let registry = registry().await;
        let result = dispatch(
            &registry,
            "registerBillableHours",
            json!({
                "employeeId": "employee123",
                "clientName": "ClientABC",
                "location": "Amsterdam",
                "workDate": "2025-06-13",
                "hoursWorked": 6.0,
                "description": "Consulting",
                "travelKilometers": 30.0
            }),
        )
        .await;

        assert!(result.starts_with("❌"));
        assert!(result.contains("Travel type"));
    }

    #[tokio::test]
    async fn totals_report_zero_for_fresh_employee() {
        let registry = registry().await;
        let result = dispatch(
            &registry,
            "getTotalLeaveHours",
            json!({ "employeeId": "employee123", "year": 2025 }),
        )
        .await;
        assert_eq!(result, "Employee employee123 has used 0 leave hours in 2025");

        let result = dispatch(
            &registry,
            "getTotalBillableHours",
            json!({ "employeeId": "employee123", "year": 2025 }),
        )
        .await;
        assert_eq!(
            result,
            "Employee employee123 has logged 0 billable hours in 2025"
        );
    }

    #[tokio::test]
    async fn history_renders_bulleted_summary() {
        let registry = registry().await;
        dispatch(
            &registry,
            "registerLeaveHours",
            json!({
                "employeeId": "employee123",
                "leaveType": "SICK_LEAVE",
                "startDate": "2025-06-13",
                "endDate": "2025-06-13",
                "totalHours": 8.0
            }),
        )
        .await;

        let result = dispatch(
            &registry,
            "getLeaveHistory",
            json!({ "employeeId": "employee123" }),
        )
        .await;

        assert!(result.contains("Recent leave history for employee employee123"));
        assert!(result.contains("• SICK_LEAVE from 2025-06-13 to 2025-06-13 (8h) - PENDING"));
    }

    #[tokio::test]
    async fn empty_history_says_so() {
        let registry = registry().await;
        let result = dispatch(
            &registry,
            "getBillableHistory",
            json!({ "employeeId": "nobody" }),
        )
        .await;
        assert_eq!(result, "No billable hours found for employee nobody");
    }
}
