//! PostgREST reads over [`ResilientRequest`].

use crate::{BufferedResponse, LoaderError, LoaderResult};
use async_trait::async_trait;
use conf_storage::ConfManager;
use resilient_request::{RequestOptions, ResilientRequest, ResponseLike};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use ui_signal_ports::UiSignals;
use url::Url;

/// Something that returns table rows for a query.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// `query` is a PostgREST query string without the leading `?`.
    async fn fetch_rows(&self, table: &str, query: &str) -> LoaderResult<Vec<Value>>;
}

/// REST client for the hosted database.
pub struct RestClient {
    http: reqwest::Client,
    conf: ConfManager,
    request: Arc<ResilientRequest>,
    signals: Arc<dyn UiSignals>,
}

impl RestClient {
    pub fn new(conf: ConfManager, request: Arc<ResilientRequest>, signals: Arc<dyn UiSignals>) -> Self {
        Self::with_client(reqwest::Client::new(), conf, request, signals)
    }

    pub fn with_client(
        http: reqwest::Client,
        conf: ConfManager,
        request: Arc<ResilientRequest>,
        signals: Arc<dyn UiSignals>,
    ) -> Self {
        Self {
            http,
            conf,
            request,
            signals,
        }
    }

    /// GET a table and return the buffered response, whatever its status.
    pub async fn get(&self, table: &str, query: &str) -> LoaderResult<BufferedResponse> {
        let url = self.rest_url(table, query)?;
        let options = RequestOptions::new(table);
        debug!(table, query, "Reading table");

        let response = self
            .request
            .execute(&options, |headers| {
                let mut builder = self.http.get(url.clone());
                for (name, value) in headers.pairs() {
                    builder = builder.header(name, value);
                }
                async move {
                    let response = builder.send().await?;
                    BufferedResponse::read(response).await
                }
            })
            .await?;
        Ok(response)
    }

    fn rest_url(&self, table: &str, query: &str) -> LoaderResult<Url> {
        let endpoint = match self.conf.rest_endpoint()? {
            Some(endpoint) => endpoint,
            None => {
                warn!(table, "No REST endpoint configured");
                self.signals.open_login_overlay(true);
                return Err(LoaderError::ConfigMissing("rest endpoint"));
            }
        };
        build_rest_url(&endpoint, table, query)
    }
}

#[async_trait]
impl RowSource for RestClient {
    async fn fetch_rows(&self, table: &str, query: &str) -> LoaderResult<Vec<Value>> {
        let response = self.get(table, query).await?;
        if !response.is_ok() {
            return Err(LoaderError::Status {
                table: table.to_string(),
                status: response.status(),
                message: response.text(),
            });
        }
        response.json().map_err(|e| LoaderError::Decode {
            table: table.to_string(),
            reason: e.to_string(),
        })
    }
}

/// `{endpoint}/rest/v1/{table}?{query}`
pub(crate) fn build_rest_url(endpoint: &str, table: &str, query: &str) -> LoaderResult<Url> {
    let mut url = Url::parse(&format!("{}/rest/v1/{}", endpoint.trim_end_matches('/'), table))
        .map_err(|e| LoaderError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
    if !query.is_empty() {
        url.set_query(Some(query));
    }
    Ok(url)
}
