use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveType {
    #[serde(rename = "ANNUAL_LEAVE")]
    AnnualLeave,
    #[serde(rename = "SICK_LEAVE")]
    SickLeave,
    #[serde(rename = "PERSONAL_LEAVE")]
    PersonalLeave,
    #[serde(rename = "MATERNITY_LEAVE")]
    MaternityLeave,
    #[serde(rename = "PATERNITY_LEAVE")]
    PaternityLeave,
    #[serde(rename = "BEREAVEMENT_LEAVE")]
    BereavementLeave,
    #[serde(rename = "OTHER")]
    Other,
}

impl LeaveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveType::AnnualLeave => "ANNUAL_LEAVE",
            LeaveType::SickLeave => "SICK_LEAVE",
            LeaveType::PersonalLeave => "PERSONAL_LEAVE",
            LeaveType::MaternityLeave => "MATERNITY_LEAVE",
            LeaveType::PaternityLeave => "PATERNITY_LEAVE",
            LeaveType::BereavementLeave => "BEREAVEMENT_LEAVE",
            LeaveType::Other => "OTHER",
        }
    }
}

impl fmt::Display for LeaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeaveType {
    type Err = String;

    /// Case-insensitive match against the fixed token set. Model-supplied
    /// arguments arrive in whatever casing the model picked.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ANNUAL_LEAVE" => Ok(LeaveType::AnnualLeave),
            "SICK_LEAVE" => Ok(LeaveType::SickLeave),
            "PERSONAL_LEAVE" => Ok(LeaveType::PersonalLeave),
            "MATERNITY_LEAVE" => Ok(LeaveType::MaternityLeave),
            "PATERNITY_LEAVE" => Ok(LeaveType::PaternityLeave),
            "BEREAVEMENT_LEAVE" => Ok(LeaveType::BereavementLeave),
            "OTHER" => Ok(LeaveType::Other),
            other => Err(format!("unknown leave type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "PENDING",
            LeaveStatus::Approved => "APPROVED",
            LeaveStatus::Rejected => "REJECTED",
            LeaveStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeaveStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(LeaveStatus::Pending),
            "APPROVED" => Ok(LeaveStatus::Approved),
            "REJECTED" => Ok(LeaveStatus::Rejected),
            "CANCELLED" => Ok(LeaveStatus::Cancelled),
            other => Err(format!("unknown leave status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelType {
    Car,
    Bike,
    PublicTransport,
    Flight,
    Train,
    Other,
    NoTravel,
}

impl TravelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelType::Car => "CAR",
            TravelType::Bike => "BIKE",
            TravelType::PublicTransport => "PUBLIC_TRANSPORT",
            TravelType::Flight => "FLIGHT",
            TravelType::Train => "TRAIN",
            TravelType::Other => "OTHER",
            TravelType::NoTravel => "NO_TRAVEL",
        }
    }
}

impl fmt::Display for TravelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CAR" => Ok(TravelType::Car),
            "BIKE" => Ok(TravelType::Bike),
            "PUBLIC_TRANSPORT" => Ok(TravelType::PublicTransport),
            "FLIGHT" => Ok(TravelType::Flight),
            "TRAIN" => Ok(TravelType::Train),
            "OTHER" => Ok(TravelType::Other),
            "NO_TRAVEL" => Ok(TravelType::NoTravel),
            other => Err(format!("unknown travel type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BillableStatus {
    Pending,
    Submitted,
    Approved,
    Invoiced,
    Rejected,
}

impl BillableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillableStatus::Pending => "PENDING",
            BillableStatus::Submitted => "SUBMITTED",
            BillableStatus::Approved => "APPROVED",
            BillableStatus::Invoiced => "INVOICED",
            BillableStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for BillableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillableStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BillableStatus::Pending),
            "SUBMITTED" => Ok(BillableStatus::Submitted),
            "APPROVED" => Ok(BillableStatus::Approved),
            "INVOICED" => Ok(BillableStatus::Invoiced),
            "REJECTED" => Ok(BillableStatus::Rejected),
            other => Err(format!("unknown billable status: {other}")),
        }
    }
}

/// A leave-of-absence request. Created PENDING; approval happens in an
/// external workflow and only ever touches the status/approved fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveHours {
    pub id: i64,
    pub employee_id: String,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_hours: f64,
    pub description: Option<String>,
    pub status: LeaveStatus,
    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
}

/// Client-chargeable work time for one day, optionally with travel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillableHours {
    pub id: i64,
    pub employee_id: String,
    pub client_name: String,
    pub project_name: Option<String>,
    pub location: String,
    pub work_date: NaiveDate,
    pub hours_worked: f64,
    pub description: String,
    pub travel_type: Option<TravelType>,
    pub travel_kilometers: Option<f64>,
    pub travel_from_location: Option<String>,
    pub travel_to_location: Option<String>,
    pub hourly_rate: Option<f64>,
    pub status: BillableStatus,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub invoiced_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterLeaveHoursRequest {
    pub employee_id: String,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_hours: f64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBillableHoursRequest {
    pub employee_id: String,
    pub client_name: String,
    #[serde(default)]
    pub project_name: Option<String>,
    pub location: String,
    pub work_date: NaiveDate,
    pub hours_worked: f64,
    pub description: String,
    #[serde(default)]
    pub travel_type: Option<TravelType>,
    #[serde(default)]
    pub travel_kilometers: Option<f64>,
    #[serde(default)]
    pub travel_from_location: Option<String>,
    #[serde(default)]
    pub travel_to_location: Option<String>,
    #[serde(default)]
    pub hourly_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourRegistrationResponse {
    pub id: i64,
    pub message: String,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leave_type_parses_case_insensitively() {
        assert_eq!("sick_leave".parse::<LeaveType>(), Ok(LeaveType::SickLeave));
        assert_eq!(
            "Annual_Leave".parse::<LeaveType>(),
            Ok(LeaveType::AnnualLeave)
        );
        assert!("HOLIDAY".parse::<LeaveType>().is_err());
    }

    #[test]
    fn travel_type_parses_case_insensitively() {
        assert_eq!("car".parse::<TravelType>(), Ok(TravelType::Car));
        assert_eq!(
            "public_transport".parse::<TravelType>(),
            Ok(TravelType::PublicTransport)
        );
        assert!("teleport".parse::<TravelType>().is_err());
    }

    #[test]
    fn statuses_round_trip_through_strings() {
        assert_eq!(
            LeaveStatus::Pending.as_str().parse::<LeaveStatus>(),
            Ok(LeaveStatus::Pending)
        );
        assert_eq!(
            BillableStatus::Invoiced.as_str().parse::<BillableStatus>(),
            Ok(BillableStatus::Invoiced)
        );
    }

    #[test]
    fn leave_type_serializes_screaming_snake() {
        let json = serde_json::to_string(&LeaveType::SickLeave).unwrap();
        assert_eq!(json, "\"SICK_LEAVE\"");
    }
}
