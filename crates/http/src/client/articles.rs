//! Article management endpoints

use super::{ApiClient, ApiRequest, ClientError};
use crate::types::{Article, ArticleInput, ArticleQuery, MessageResponse, Paginated};

impl ApiClient {
    /// List articles matching the query
    pub async fn list_articles(
        &self,
        query: &ArticleQuery,
    ) -> Result<Paginated<Article>, ClientError> {
        self.execute(ApiRequest::get("/articles").query(query)?).await
    }

    /// Get article by ID
    pub async fn get_article(&self, id: u64) -> Result<Article, ClientError> {
        self.execute(ApiRequest::get(format!("/articles/{id}"))).await
    }

    /// Create an article; the server requires both title and content
    pub async fn create_article(&self, input: &ArticleInput) -> Result<Article, ClientError> {
        self.execute(ApiRequest::post("/articles").json(input)?).await
    }

    /// Update the fields set in `input`
    pub async fn update_article(
        &self,
        id: u64,
        input: &ArticleInput,
    ) -> Result<Article, ClientError> {
        self.execute(ApiRequest::put(format!("/articles/{id}")).json(input)?)
            .await
    }

    /// Delete article by ID
    pub async fn delete_article(&self, id: u64) -> Result<MessageResponse, ClientError> {
        self.execute(ApiRequest::delete(format!("/articles/{id}"))).await
    }
}
