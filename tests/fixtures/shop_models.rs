use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type UserId = u64;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[openapi(required)]
    pub id: UserId,
    #[openapi(required, format = "email", example = "ada@example.com")]
    pub email_address: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub address: Option<Address>,
    pub tags: Vec<String>,
    pub attributes: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub password_hash: String,
    internal_score: u32,
    #[openapi(system, description = "A registered shop user")]
    _meta: (),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Customer,
    #[serde(skip)]
    Robot,
}

#[derive(Serialize, Deserialize)]
pub struct Address {
    pub city: String,
    #[openapi_desc = "Postal code"]
    pub zip: String,
}

/// A category tree node.
#[derive(Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub parent: Option<Box<Category>>,
    pub children: Vec<Category>,
}

#[derive(Deserialize)]
pub struct NewUser {
    pub email: String,
    #[openapi(type = "string", format = "password")]
    pub password: Secret,
}
