//! PostgREST client for the `profiles`, `posts`, and `comments` tables.

use crate::error::{GatewayError, GatewayResult};
use crate::response::rejection;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Query parameters sent to PostgREST (`select`, filters, `order`, paging).
pub type QueryParams = Vec<(&'static str, String)>;

/// Supabase REST API client.
///
/// Calls are authorized with the caller's access token when one is given,
/// otherwise with the anon key, exactly like the JS client before sign-in.
#[derive(Clone)]
pub struct SupabaseRestClient {
    http_client: reqwest::Client,
    api_url: String,
    anon_key: String,
}

impl SupabaseRestClient {
    /// Create a new REST client.
    ///
    /// # Arguments
    /// * `api_url` - The Supabase project API URL (e.g., `https://xyz.supabase.co`)
    /// * `anon_key` - The Supabase anonymous API key
    pub fn new(api_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self::with_http_client(reqwest::Client::new(), api_url, anon_key)
    }

    /// Create a client sharing an existing connection pool.
    pub fn with_http_client(
        http_client: reqwest::Client,
        api_url: impl Into<String>,
        anon_key: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        }
    }

    /// Build the REST API URL for a table.
    pub(crate) fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.api_url, table)
    }

    fn authorize(
        &self,
        builder: reqwest::RequestBuilder,
        access_token: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let bearer = access_token.unwrap_or(&self.anon_key);
        builder
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", bearer))
            .header("Accept", "application/json")
    }

    /// `GET /rest/v1/<table>?<params>`
    pub(crate) async fn select_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &QueryParams,
        access_token: Option<&str>,
    ) -> GatewayResult<Vec<T>> {
        tracing::debug!(table, "Selecting rows");

        let request = self
            .http_client
            .get(self.rest_url(table))
            .query(params);
        let response = self.authorize(request, access_token).send().await?;

        if !response.status().is_success() {
            return Err(rejection(response, &format!("select from {}", table)).await);
        }

        Ok(response.json().await?)
    }

    /// `POST /rest/v1/<table>` returning the inserted row.
    pub(crate) async fn insert_row<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
        params: &QueryParams,
        access_token: Option<&str>,
    ) -> GatewayResult<T> {
        tracing::debug!(table, "Inserting row");

        let request = self
            .http_client
            .post(self.rest_url(table))
            .query(params)
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .json(body);
        let response = self.authorize(request, access_token).send().await?;

        if !response.status().is_success() {
            return Err(rejection(response, &format!("insert into {}", table)).await);
        }

        let rows: Vec<T> = response.json().await?;
        rows.into_iter().next().ok_or_else(|| {
            GatewayError::UnexpectedResponse(format!("insert into {} returned no row", table))
        })
    }

    /// `PATCH /rest/v1/<table>?<filters>` returning the first updated row.
    pub(crate) async fn update_rows<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
        params: &QueryParams,
        access_token: Option<&str>,
    ) -> GatewayResult<Option<T>> {
        tracing::debug!(table, "Updating rows");

        let request = self
            .http_client
            .patch(self.rest_url(table))
            .query(params)
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .json(body);
        let response = self.authorize(request, access_token).send().await?;

        if !response.status().is_success() {
            return Err(rejection(response, &format!("update {}", table)).await);
        }

        let rows: Vec<T> = response.json().await?;
        Ok(rows.into_iter().next())
    }

    /// `DELETE /rest/v1/<table>?<filters>`
    pub(crate) async fn delete_rows(
        &self,
        table: &str,
        params: &QueryParams,
        access_token: Option<&str>,
    ) -> GatewayResult<()> {
        tracing::debug!(table, "Deleting rows");

        let request = self.http_client.delete(self.rest_url(table)).query(params);
        let response = self.authorize(request, access_token).send().await?;

        if !response.status().is_success() {
            return Err(rejection(response, &format!("delete from {}", table)).await);
        }

        Ok(())
    }
}

/// PostgREST equality filter value.
pub(crate) fn eq(value: &str) -> String {
    format!("eq.{}", value)
}
