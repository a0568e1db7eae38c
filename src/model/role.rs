use strum_macros::{AsRefStr, Display, EnumString};

/// Role names mirror the rows seeded into the `roles` table. "User" is the
/// generic role every self-registered applicant starts with; approval of a
/// job application swaps it for "Employee".
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, AsRefStr, EnumString)]
pub enum Role {
    Admin = 1,
    #[strum(serialize = "HR")]
    Hr = 2,
    Recruiter = 3,
    Manager = 4,
    Employee = 5,
    User = 6,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Recruiter),
            4 => Some(Role::Manager),
            5 => Some(Role::Employee),
            6 => Some(Role::User),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}
