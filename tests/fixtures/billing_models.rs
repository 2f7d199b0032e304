use crate::models::Address;
use serde::{Deserialize, Serialize};

/// A billing account, not to be confused with a shop user.
#[derive(Serialize, Deserialize)]
pub struct User {
    #[openapi(required)]
    pub account_id: i64,
    pub balance: f64,
    pub billing_address: Address,
}

#[derive(Serialize, Deserialize)]
pub enum Payment {
    Card {
        number: String,
        #[openapi(format = "date")]
        expires: String,
    },
    Transfer(Iban),
    Cash,
}

#[derive(Serialize, Deserialize)]
pub struct Iban(pub String);
