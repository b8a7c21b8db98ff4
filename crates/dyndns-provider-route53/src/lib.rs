// # Route 53 Zone Provider
//
// This crate provides the AWS Route 53 implementation of `ZoneProvider`.
//
// ## Scope
//
// - Lists every record set of a hosted zone, following pagination
// - Submits change batches (UPSERT only)
// - Maps AWS status codes and error codes to `dyndns_core::Error` kinds
// - Dry-run mode: reads normally, logs the batch instead of submitting it
//
// Retries and backoff are owned by the engine; this provider makes exactly
// one HTTP request per page or per batch.
//
// ## Security Requirements
//
// - Secret key and session token NEVER appear in logs
// - Requests are signed with SigV4 (region us-east-1, service route53)
//
// ## API Reference
//
// - List: GET `/2013-04-01/hostedzone/{Id}/rrset?name=&type=&identifier=`
// - Change: POST `/2013-04-01/hostedzone/{Id}/rrset/`

pub mod signing;
pub mod xml;

use async_trait::async_trait;
use dyndns_core::config::ProviderConfig;
use dyndns_core::traits::{ChangeBatch, ChangeReceipt, RecordSet, ZoneProvider};
use dyndns_core::{Error, Result};
use reqwest::{Method, StatusCode, Url};
use std::time::Duration;
use tracing::{debug, info};

use signing::{Credentials, Scope, SignableRequest};
use xml::{
    ChangeResourceRecordSetsRequest, ChangeResourceRecordSetsResponse, ErrorDocument,
    ListResourceRecordSetsResponse,
};

/// Public Route 53 endpoint
pub const ROUTE53_ENDPOINT: &str = "https://route53.amazonaws.com";

/// Route 53 API version
const API_VERSION: &str = "2013-04-01";

/// Route 53 is a global service signed in us-east-1
const SIGNING_SCOPE: Scope<'static> = Scope {
    region: "us-east-1",
    service: "route53",
};

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Receipt id reported for batches skipped in dry-run mode
pub const DRY_RUN_CHANGE_ID: &str = "dry-run";

const PROVIDER_NAME: &str = "route53";

/// Route 53 zone provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all list requests
/// - Log the change batch it would submit
/// - **NOT** submit it
///
/// # Security
///
/// The Debug implementation does NOT expose the secret key.
pub struct Route53Provider {
    credentials: Credentials,

    /// Scheme, host and port of the API
    endpoint: Url,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, list normally but skip change submissions
    dry_run: bool,
}

impl std::fmt::Debug for Route53Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route53Provider")
            .field("credentials", &self.credentials)
            .field("endpoint", &self.endpoint.as_str())
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Route53Provider {
    /// Create a provider
    ///
    /// `endpoint` defaults to [`ROUTE53_ENDPOINT`].
    pub fn new(credentials: Credentials, endpoint: Option<&str>, dry_run: bool) -> Result<Self> {
        let endpoint = endpoint.unwrap_or(ROUTE53_ENDPOINT);
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::config(format!("Invalid Route 53 endpoint {}: {}", endpoint, e)))?;
        if endpoint.host_str().is_none() {
            return Err(Error::config(format!(
                "Route 53 endpoint has no host: {}",
                endpoint
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            endpoint,
            client,
            dry_run,
        })
    }

    /// Create a provider from the provider configuration
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;
        Self::new(
            Credentials::new(
                config.access_key_id.clone(),
                config.secret_access_key.clone(),
                config.session_token.clone(),
            ),
            config.endpoint.as_deref(),
            config.dry_run,
        )
    }

    /// Whether change submissions are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Send one signed request and return the response body
    ///
    /// Non-success statuses are mapped to error kinds via [`map_api_error`].
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<String>,
    ) -> Result<String> {
        let mut url = self.endpoint.clone();
        url.set_path(path);
        let query = signing::canonical_query(query);
        url.set_query((!query.is_empty()).then_some(query.as_str()));

        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(Error::config("Route 53 endpoint has no host")),
        };

        let payload = body.unwrap_or_default();
        let signed = signing::sign(
            &self.credentials,
            &SignableRequest {
                method: method.as_str(),
                host: &host,
                path: url.path(),
                query: &query,
                payload: payload.as_bytes(),
            },
            SIGNING_SCOPE,
            chrono::Utc::now(),
        );

        let mut request = self.client.request(method.clone(), url.clone());
        for (name, value) in signed.iter() {
            request = request.header(name, value);
        }
        if !payload.is_empty() {
            request = request
                .header("content-type", "text/xml")
                .body(payload);
        }

        debug!("{} {}", method, url.path());

        let response = request.send().await.map_err(|e| {
            Error::unavailable(PROVIDER_NAME, format!("HTTP request failed: {}", e))
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            Error::unavailable(PROVIDER_NAME, format!("Failed to read response: {}", e))
        })?;

        if !status.is_success() {
            let document = ErrorDocument::parse(&text);
            let message = document
                .message()
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(map_api_error(status, document.code(), &message));
        }

        Ok(text)
    }
}

/// Map a failed Route 53 response to an error kind
///
/// The AWS error code wins over the HTTP status; Route 53 reports
/// throttling (`PriorRequestNotComplete`) with a 400.
pub fn map_api_error(status: StatusCode, code: Option<&str>, message: &str) -> Error {
    let detail = match code {
        Some(code) => format!("{}: {}", code, message),
        None => format!("HTTP {}: {}", status.as_u16(), message),
    };

    match code {
        Some(
            "AccessDenied"
            | "InvalidClientTokenId"
            | "SignatureDoesNotMatch"
            | "IncompleteSignature"
            | "MissingAuthenticationToken"
            | "ExpiredToken",
        ) => Error::auth(detail),
        Some("Throttling" | "ThrottlingException" | "PriorRequestNotComplete") => {
            Error::rate_limited(detail)
        }
        Some("NoSuchHostedZone") => Error::not_found(detail),
        Some("InvalidChangeBatch" | "InvalidInput") => Error::invalid_input(detail),
        _ => match status.as_u16() {
            401 | 403 => Error::auth(detail),
            404 => Error::not_found(detail),
            429 => Error::rate_limited(detail),
            500..=599 => Error::unavailable(PROVIDER_NAME, detail),
            _ => Error::provider(PROVIDER_NAME, detail),
        },
    }
}

#[async_trait]
impl ZoneProvider for Route53Provider {
    /// List every record set of the zone
    ///
    /// # API Calls
    ///
    /// ```http
    /// GET /2013-04-01/hostedzone/:id/rrset
    /// GET /2013-04-01/hostedzone/:id/rrset?name=<NextRecordName>&type=<NextRecordType>
    /// ```
    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<RecordSet>> {
        let path = format!("/{}/hostedzone/{}/rrset", API_VERSION, zone_id);
        let mut record_sets = Vec::new();
        let mut next: Option<(String, Option<String>, Option<String>)> = None;
        let mut pages = 0;

        loop {
            let mut query: Vec<(&str, &str)> = Vec::new();
            if let Some((name, record_type, identifier)) = &next {
                query.push(("name", name.as_str()));
                if let Some(record_type) = record_type {
                    query.push(("type", record_type.as_str()));
                }
                if let Some(identifier) = identifier {
                    query.push(("identifier", identifier.as_str()));
                }
            }

            let body = self.send(Method::GET, &path, &query, None).await?;
            let page = ListResourceRecordSetsResponse::parse(&body).map_err(|e| {
                Error::provider(
                    PROVIDER_NAME,
                    format!("Failed to parse ListResourceRecordSets response: {}", e),
                )
            })?;
            pages += 1;

            let truncated = page.is_truncated;
            let marker = (
                page.next_record_name.clone(),
                page.next_record_type.clone(),
                page.next_record_identifier.clone(),
            );
            record_sets.extend(page.record_sets());

            if !truncated {
                break;
            }

            let (Some(name), record_type, identifier) = marker else {
                return Err(Error::provider(
                    PROVIDER_NAME,
                    "Truncated record set listing without NextRecordName",
                ));
            };
            next = Some((name, record_type, identifier));
        }

        debug!(
            "Listed {} record set(s) in {} page(s)",
            record_sets.len(),
            pages
        );
        Ok(record_sets)
    }

    /// Submit a change batch
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /2013-04-01/hostedzone/:id/rrset/
    /// <ChangeResourceRecordSetsRequest>...</ChangeResourceRecordSetsRequest>
    /// ```
    async fn change_record_sets(&self, zone_id: &str, batch: &ChangeBatch) -> Result<ChangeReceipt> {
        let body = ChangeResourceRecordSetsRequest::from_batch(batch)
            .to_xml()
            .map_err(|e| {
                Error::invalid_input(format!("Failed to serialize change batch: {}", e))
            })?;

        if self.dry_run {
            info!(
                "[DRY-RUN] Would submit {} change(s) to zone {}: {}",
                batch.changes.len(),
                zone_id,
                body
            );
            return Ok(ChangeReceipt {
                id: DRY_RUN_CHANGE_ID.to_string(),
                status: "DRY_RUN".to_string(),
            });
        }

        let path = format!("/{}/hostedzone/{}/rrset/", API_VERSION, zone_id);
        let response = self.send(Method::POST, &path, &[], Some(body)).await?;
        let response = ChangeResourceRecordSetsResponse::parse(&response).map_err(|e| {
            Error::provider(
                PROVIDER_NAME,
                format!("Failed to parse ChangeResourceRecordSets response: {}", e),
            )
        })?;

        Ok(ChangeReceipt {
            id: response.change_info.id,
            status: response.change_info.status,
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}
