use crate::billing;
use crate::models::{Category, NewUser, User};

/// Returns one user.
///
/// @openapi GET /users/{id}
/// @openapiTags users
/// @openapiSummary Get a user
/// @openapiParam id in=path, type=u64, example=11
/// @openapiResponse 200 application/json User
/// @openapiResponse 404 application/json {"error": "not found"}
/// @openapiSecurity api_key apiKey header X-API-Key
pub async fn get_user() {}

/// @openapi GET /users
/// @openapiTags users
/// @openapiDesc Pages through all users.
/// @openapiParam limit in=query, type=int, default=20
/// @openapiResponse 200 application/json Vec<User>
pub async fn list_users() {}

/// @openapi POST /users
/// @openapiTags users
/// @openapiRequest application/json NewUser
/// @openapiRequest multipart/form-data NewUser
/// @openapiResponse 201 application/json {user: User, created: bool}
pub async fn create_user() {}

/**
 * @openapi GET /categories/{id}
 * @openapi GET /v1/categories/{id} deprecated
 * @openapiParam id in=path, type=string
 * @openapiResponse 200 application/json Category
 */
pub async fn get_category() {}

/// @openapi GET /billing/accounts/{id}
/// @openapiTags billing
/// @openapiParam id in=path, type=int
/// @openapiResponse 200 application/json billing::User
/// @openapiResponse 200 text/plain
pub async fn get_account() {}

/// @openapi GET /invoices/{id}/pdf
/// @openapiTags billing
/// @openapiParam id in=path, type=int
/// @openapiResponse 200 application/octet-stream
/// @openapiSecurity bearer http header bearer
pub async fn download_invoice() {}

/// @openapi POST /payments
/// @openapiTags billing
/// @openapiRequest application/json billing::Payment
/// @openapiResponse 202 text/plain
pub async fn pay() {}
