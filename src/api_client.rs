use crate::config::{Config, TwitterCredentials};
use crate::dto::*;
use crate::error::TwitterError;
use crate::oauth::OAuthSigner;
use crate::retry::{MessageClassifier, ThrottledInvoker};
use reqwest::{header::AUTHORIZATION, Client};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use tracing::debug;

/// Largest page the members endpoint accepts.
const LIST_MEMBERS_PAGE_SIZE: u32 = 5000;
/// Largest page the friends endpoint accepts.
const FRIENDS_PAGE_SIZE: u32 = 200;

/// Client for the Twitter v1.1 REST API. Every call except
/// `verify_credentials` goes through the throttled invoker, one page per
/// invocation.
pub struct TwitterApiClient {
    client: Client,
    base_url: String,
    signer: OAuthSigner,
    invoker: ThrottledInvoker<MessageClassifier>,
}

impl TwitterApiClient {
    pub fn new(config: &Config, credentials: &TwitterCredentials) -> Self {
        Self {
            client: Client::new(),
            base_url: config.twitter.api_base.trim_end_matches('/').to_string(),
            signer: OAuthSigner::new(credentials),
            invoker: ThrottledInvoker::new(
                config.retry.throttle_config(),
                config.retry.classifier(),
            ),
        }
    }

    pub fn with_invoker(mut self, invoker: ThrottledInvoker<MessageClassifier>) -> Self {
        self.invoker = invoker;
        self
    }

    pub fn invoker(&self) -> &ThrottledInvoker<MessageClassifier> {
        &self.invoker
    }

    /// The authenticated user. Not retried: a failure here means the
    /// credentials are unusable.
    pub async fn verify_credentials(&self) -> Result<User, TwitterError> {
        self.get_json(
            "account/verify_credentials.json",
            &[("skip_status".to_string(), "true".to_string())],
        )
        .await
    }

    /// Lists owned by or subscribed to by `user_id`.
    pub async fn lists(&self, user_id: u64) -> Result<Vec<TwitterList>, TwitterError> {
        let params = vec![("user_id".to_string(), user_id.to_string())];
        let params = &params;
        self.invoker
            .invoke_async("lists/list", move || {
                self.get_json::<Vec<TwitterList>>("lists/list.json", params)
            })
            .await
    }

    /// All members of `list`, following cursors to the end.
    pub async fn list_members(&self, list: &TwitterList) -> Result<Vec<User>, TwitterError> {
        let base = vec![
            ("list_id".to_string(), list.id.to_string()),
            ("count".to_string(), LIST_MEMBERS_PAGE_SIZE.to_string()),
            ("skip_status".to_string(), "true".to_string()),
        ];
        debug!("Fetching members of list {} ({})", list.slug, list.id);
        self.paginate_users("lists/members", "lists/members.json", base)
            .await
    }

    /// Everyone the authenticated user follows, following cursors to the end.
    pub async fn friends(&self) -> Result<Vec<User>, TwitterError> {
        let base = vec![
            ("count".to_string(), FRIENDS_PAGE_SIZE.to_string()),
            ("skip_status".to_string(), "true".to_string()),
            ("include_user_entities".to_string(), "false".to_string()),
        ];
        self.paginate_users("friends/list", "friends/list.json", base)
            .await
    }

    async fn paginate_users(
        &self,
        operation: &str,
        path: &str,
        base: Vec<(String, String)>,
    ) -> Result<Vec<User>, TwitterError> {
        let mut users = Vec::new();
        let mut cursor = START_CURSOR;
        let mut seen = HashSet::from([START_CURSOR]);

        loop {
            let mut params = base.clone();
            params.push(("cursor".to_string(), cursor.to_string()));
            let params = &params;

            let page: UserPage = self
                .invoker
                .invoke_async(operation, move || self.get_json(path, params))
                .await?;
            debug!(
                "{} page (cursor {}): {} users, next cursor {}",
                operation,
                cursor,
                page.users.len(),
                page.next_cursor
            );

            if page.is_last() {
                users.extend(page.users);
                return Ok(users);
            }
            // A repeated cursor would page forever.
            if !seen.insert(page.next_cursor) {
                return Err(TwitterError::StalledCursor {
                    operation: operation.to_string(),
                    cursor: page.next_cursor,
                });
            }
            cursor = page.next_cursor;
            users.extend(page.users);
        }
    }

    /// One signed GET. Non-success statuses become `TwitterError::Api`.
    async fn get_json<T>(&self, path: &str, params: &[(String, String)]) -> Result<T, TwitterError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        let authorization = self.signer.authorization_header("GET", &url, params)?;

        debug!("API request: GET {} {:?}", url, params);
        let response = self
            .client
            .get(&url)
            .query(params)
            .header(AUTHORIZATION, authorization)
            .send()
            .await?;

        let status = response.status();
        debug!("API response status: {}", status);

        let response_text = response.text().await?;
        debug!("API response: {}", response_text);

        if !status.is_success() {
            return Err(TwitterError::from_response(
                status.as_u16(),
                &response_text,
            ));
        }

        Ok(serde_json::from_str(&response_text)?)
    }
}
