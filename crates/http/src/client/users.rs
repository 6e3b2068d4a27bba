//! User management endpoints

use super::{ApiClient, ApiRequest, ClientError};
use crate::types::{MessageResponse, Paginated, User, UserInput, UserQuery};

impl ApiClient {
    /// List users matching the query
    pub async fn list_users(&self, query: &UserQuery) -> Result<Paginated<User>, ClientError> {
        self.execute(ApiRequest::get("/users").query(query)?).await
    }

    /// Get user by ID
    pub async fn get_user(&self, id: u64) -> Result<User, ClientError> {
        self.execute(ApiRequest::get(format!("/users/{id}"))).await
    }

    /// Create a user; the server requires both email and password
    pub async fn create_user(&self, input: &UserInput) -> Result<User, ClientError> {
        self.execute(ApiRequest::post("/users").json(input)?).await
    }

    /// Update the fields set in `input`
    pub async fn update_user(&self, id: u64, input: &UserInput) -> Result<User, ClientError> {
        self.execute(ApiRequest::put(format!("/users/{id}")).json(input)?)
            .await
    }

    /// Delete user by ID
    pub async fn delete_user(&self, id: u64) -> Result<MessageResponse, ClientError> {
        self.execute(ApiRequest::delete(format!("/users/{id}"))).await
    }
}
