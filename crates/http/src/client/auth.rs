//! Authentication and profile endpoints

use super::{ApiClient, ApiRequest, ClientError};
use crate::types::{
    Admin, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, LoginResponse,
    MessageResponse,
};
use dashboard_core::TokenKey;
use tracing::{info, warn};

impl ApiClient {
    /// Sign in and persist the issued tokens
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let request = ApiRequest::post("/login").json(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        let response: LoginResponse = self.execute(request).await?;

        self.session.set(TokenKey::Access, &response.access_token)?;
        self.session.set(TokenKey::Refresh, &response.refresh_token)?;
        info!("Signed in");
        Ok(response)
    }

    /// Sign out. The local session is cleared and the login page shown whether
    /// or not the server acknowledged the call.
    pub async fn logout(&self) -> Result<MessageResponse, ClientError> {
        let endings = self.session_endings();
        let result = self.execute(ApiRequest::post("/logout")).await;
        if let Err(e) = &result {
            warn!(kind = %e.kind(), "Remote logout failed: {e}");
        }
        // A failed refresh on the way has already cleared the session and
        // redirected
        if self.session_endings() == endings {
            self.end_session();
        }
        result
    }

    /// Ask the server to send a password reset link
    pub async fn forgot_password(&self, email: &str) -> Result<MessageResponse, ClientError> {
        let request = ApiRequest::post("/forgot-password").json(&ForgotPasswordRequest {
            email: email.to_string(),
        })?;
        self.execute(request).await
    }

    /// Profile of the signed-in admin
    pub async fn get_profile(&self) -> Result<Admin, ClientError> {
        self.execute(ApiRequest::get("/profile")).await
    }

    /// Change the signed-in admin's password
    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<MessageResponse, ClientError> {
        let request = ApiRequest::put("/profile/change-password").json(&ChangePasswordRequest {
            old_password: old_password.to_string(),
            new_password: new_password.to_string(),
        })?;
        self.execute(request).await
    }
}
