use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

lazy_static! {
    pub static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[0-9 ()\-]+$").unwrap();
}

/// Membership tier of a profile.
/// Corresponds to the `membership_type` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "membership_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MembershipType {
    Basic,
    Standard,
    Premium,
}

/// A member profile joined with the username and email of its account.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct MemberProfile {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub phone_number: String,
    pub address: String,
    pub membership_type: MembershipType,
    pub is_active_member: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a member may change on their own profile.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(
        length(min = 6, max = 20),
        regex(path = "PHONE_REGEX", message = "Phone number may contain digits, spaces, +, - and parentheses")
    )]
    pub phone_number: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub address: String,
    pub membership_type: MembershipType,
}
