use serde::{Deserialize, Serialize};

/// Request body for the static-secret admin login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct AdminLoginRequest {
    pub email: String,
    pub password: String,
}

/// Response carrying the fixed admin bearer token.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AdminLoginResponse {
    pub success: bool,
    pub token: String,
}
