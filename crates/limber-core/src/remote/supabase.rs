//! `PostgREST` client for a Supabase project.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};

use super::{RemoteError, RemoteResult, RemoteRow, RemoteService};
use crate::auth::{parse_api_error, AuthSession, SessionPersistence, SupabaseAuthClient};

const UPSERT_PREFERENCE: &str = "resolution=merge-duplicates,return=minimal";
const PULL_ORDER: &str = "created_at.asc,id.asc";

/// Remote service backed by the project's REST endpoint. Requests carry the
/// signed-in account's bearer token; row-level security scopes every table
/// to that account.
#[derive(Clone)]
pub struct SupabaseRemote<S: SessionPersistence> {
    rest_url: String,
    anon_key: String,
    client: Client,
    auth: SupabaseAuthClient<S>,
}

impl<S: SessionPersistence> SupabaseRemote<S> {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>, store: S) -> RemoteResult<Self> {
        let anon_key = anon_key.into().trim().to_string();
        let base = url
            .as_ref()
            .trim()
            .trim_end_matches('/')
            .trim_end_matches("/rest/v1");
        let auth = SupabaseAuthClient::new(base, anon_key.clone(), store)?;

        Ok(Self {
            rest_url: format!("{base}/rest/v1"),
            anon_key,
            client: Client::builder().build()?,
            auth,
        })
    }

    /// The auth client sharing this remote's session store
    pub const fn auth(&self) -> &SupabaseAuthClient<S> {
        &self.auth
    }

    async fn session(&self) -> RemoteResult<AuthSession> {
        self.auth
            .restore_session()
            .await?
            .ok_or(RemoteError::NotAuthenticated)
    }

    fn authorized(&self, request: RequestBuilder, session: &AuthSession) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.rest_url)
    }
}

#[async_trait]
impl<S: SessionPersistence> RemoteService for SupabaseRemote<S> {
    async fn account_id(&self) -> RemoteResult<Option<String>> {
        Ok(self
            .auth
            .restore_session()
            .await?
            .map(|session| session.account_id().to_string()))
    }

    async fn upsert(
        &self,
        table: &str,
        rows: Vec<RemoteRow>,
        conflict_key: &str,
    ) -> RemoteResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let session = self.session().await?;
        let total = rows.len();

        // Every object in a bulk body must list the same columns.
        for group in group_by_columns(rows) {
            let request = self.authorized(
                self.client
                    .post(self.table_url(table))
                    .query(&[("on_conflict", conflict_key)])
                    .header("Prefer", UPSERT_PREFERENCE)
                    .json(&group),
                &session,
            );
            check_status(request.send().await?).await?;
        }

        tracing::debug!("Upserted {total} row(s) into {table}");
        Ok(())
    }

    async fn select_all_ordered(
        &self,
        table: &str,
        page_size: usize,
    ) -> RemoteResult<Vec<RemoteRow>> {
        let page_size = page_size.max(1);
        let session = self.session().await?;
        let mut rows = Vec::new();
        let mut offset = 0usize;

        loop {
            let request = self.authorized(
                self.client
                    .get(self.table_url(table))
                    .query(&[
                        ("select", "*".to_string()),
                        ("order", PULL_ORDER.to_string()),
                        ("limit", page_size.to_string()),
                        ("offset", offset.to_string()),
                    ])
                    .header("Accept", "application/json"),
                &session,
            );

            let page: Vec<RemoteRow> = check_status(request.send().await?).await?.json().await?;
            let fetched = page.len();
            rows.extend(page);

            if fetched < page_size {
                break;
            }
            offset += fetched;
        }

        tracing::debug!("Fetched {} row(s) from {table}", rows.len());
        Ok(rows)
    }
}

/// Split rows into runs sharing one column set, keeping first-seen order.
fn group_by_columns(rows: Vec<RemoteRow>) -> Vec<Vec<RemoteRow>> {
    let mut groups: Vec<(Vec<String>, Vec<RemoteRow>)> = Vec::new();
    for row in rows {
        let mut columns: Vec<String> = row.keys().cloned().collect();
        columns.sort_unstable();
        match groups.iter_mut().find(|(existing, _)| *existing == columns) {
            Some((_, group)) => group.push(row),
            None => groups.push((columns, vec![row])),
        }
    }
    groups.into_iter().map(|(_, group)| group).collect()
}

async fn check_status(response: Response) -> RemoteResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::Api(parse_api_error(status, &body)))
}
