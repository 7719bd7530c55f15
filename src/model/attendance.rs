use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Day classification as marked on the attendance grid.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    EnumString,
    Display,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum AttendanceStatus {
    Present,
    Absent,
    HalfDay,
    Late,
    Leave,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LeaveType {
    Casual,
    Sick,
    Paid,
    Unpaid,
    Emergency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": 42,
        "staff_id": "HK-0107",
        "date": "2024-02-05",
        "status": "Leave",
        "leave_type": "sick",
        "time_in": null,
        "time_out": null,
        "revision": 2
    })
)]
pub struct AttendanceRecord {
    pub id: u64,

    pub staff_id: String,

    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,

    pub status: AttendanceStatus,

    #[schema(nullable = true)]
    pub leave_type: Option<LeaveType>,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub time_in: Option<NaiveDateTime>,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub time_out: Option<NaiveDateTime>,

    /// Bumped on every change; callers echo it back to detect lost updates.
    pub revision: u32,
}

/// One cell of the dense monthly grid. `status == None` means not marked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LedgerDay {
    pub day: u32,

    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,

    pub status: Option<AttendanceStatus>,

    pub leave_type: Option<LeaveType>,
}
