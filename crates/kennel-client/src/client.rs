//! HTTP implementation of `KennelApi`
//!
//! Every call goes through `send`, which attaches the session headers, retries
//! 5xx answers to replayable requests with doubling backoff and decodes the
//! body through the standard envelope. Creates are never replayed: a 5xx may
//! arrive after the backend already stored the reservation.

use async_trait::async_trait;
use kennel_core::{KennelConfig, KennelError, Reservation, Resource, ResourceAvailability, Result};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::api::KennelApi;
use crate::auth::{Session, TokenProvider};
use crate::envelope::{
    decode_envelope, error_message, ApiEnvelope, BatchAvailability, Page, ReservationList,
    ResourceList,
};
use crate::types::{
    BatchAvailabilityRequest, NewReservation, ReservationQuery, ReservationUpdate, ResourceQuery,
};

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_MAX_RETRIES: u32 = 2;
const INITIAL_BACKOFF_MS: u64 = 250;
const MAX_BACKOFF_MS: u64 = 4_000;

/// Booking backend client over JSON/HTTP
#[derive(Debug, Clone)]
pub struct HttpKennelApi {
    http: reqwest::Client,
    base_url: String,
    session: Session,
    max_retries: u32,
    initial_backoff: Duration,
}

impl HttpKennelApi {
    /// Create a client for `base_url` acting within `session`
    pub fn new(base_url: impl Into<String>, session: Session) -> Result<Self> {
        Self::with_timeout(base_url, session, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    fn with_timeout(base_url: impl Into<String>, session: Session, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KennelError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        })
    }

    /// Build a client from tenant configuration
    pub fn from_config(config: &KennelConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let session = Session::new(config.tenant.id.clone(), tokens);
        let client = Self::with_timeout(
            config.api.base_url.clone(),
            session,
            Duration::from_secs(config.api.timeout_secs),
        )?;
        Ok(client.with_max_retries(config.api.max_retries))
    }

    /// Set how many times a 5xx answer is retried
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the first retry delay; later delays double
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL of one reservation, with the id percent-encoded as a single segment
    fn reservation_url(&self, id: &str) -> Result<String> {
        let mut url = Url::parse(&self.url("/api/reservations")).map_err(|e| {
            KennelError::Config(format!("Invalid base URL {:?}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                KennelError::Config(format!("Base URL {:?} cannot carry a path", self.base_url))
            })?
            .push(id);
        Ok(url.into())
    }

    async fn send<B, T>(
        &self,
        method: Method,
        url: &str,
        query: &[(&'static str, String)],
        body: Option<&B>,
        replay: Replay,
    ) -> Result<ApiEnvelope<T>>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let max_retries = match replay {
            Replay::Safe => self.max_retries,
            Replay::Never => 0,
        };
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            debug!("{} {} (attempt {})", method, url, retries + 1);

            let mut builder = self.http.request(method.clone(), url).query(query);
            if let Some(body) = body {
                builder = builder.json(body);
            }
            let builder = self.session.apply(builder);

            let response = builder.send().await.map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    KennelError::Unavailable(format!("{} {}: {}", method, url, e))
                } else {
                    KennelError::Http(format!("Failed to send request: {}", e))
                }
            })?;

            let status = response.status();
            let bytes = response
                .bytes()
                .await
                .map_err(|e| KennelError::Http(format!("Failed to read response body: {}", e)))?;

            if status.is_success() {
                return decode_envelope(&bytes);
            }

            // Retry on 5xx errors
            if status.is_server_error() {
                if retries < max_retries {
                    retries += 1;
                    warn!(
                        "Server error ({}) from {}. Waiting {:?} before retry {}/{}",
                        status, url, backoff, retries, max_retries
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(Duration::from_millis(MAX_BACKOFF_MS));
                    continue;
                }
                return Err(KennelError::Unavailable(format!(
                    "{} {} failed with {} after {} retries",
                    method, url, status, retries
                )));
            }

            return Err(client_error(status, &bytes));
        }
    }
}

/// Whether a request may be sent again after a 5xx answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Replay {
    /// Reads and whole-field updates; repeating them changes nothing
    Safe,
    /// Creates
    Never,
}

/// Map a 4xx answer to the error taxonomy
fn client_error(status: StatusCode, body: &[u8]) -> KennelError {
    let message = error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => KennelError::Unauthorized(message),
        StatusCode::NOT_FOUND => KennelError::NotFound(message),
        _ => KennelError::Rejected {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl KennelApi for HttpKennelApi {
    #[instrument(skip(self), fields(tenant = %self.session.tenant_id()))]
    async fn list_resources(&self, query: &ResourceQuery) -> Result<Page<Resource>> {
        let envelope: ApiEnvelope<ResourceList> = self
            .send::<(), _>(
                Method::GET,
                &self.url("/api/resources"),
                &query.to_query_pairs(),
                None,
                Replay::Safe,
            )
            .await?;
        Ok(Page::new(envelope.data.resources, envelope.pagination))
    }

    #[instrument(skip(self, request), fields(tenant = %self.session.tenant_id(), resources = request.resource_ids.len()))]
    async fn batch_availability(
        &self,
        request: &BatchAvailabilityRequest,
    ) -> Result<Vec<ResourceAvailability>> {
        let envelope: ApiEnvelope<BatchAvailability> = self
            .send(
                Method::POST,
                &self.url("/api/resources/availability/batch"),
                &[],
                Some(request),
                Replay::Safe,
            )
            .await?;
        Ok(envelope.data.resources)
    }

    #[instrument(skip(self), fields(tenant = %self.session.tenant_id()))]
    async fn list_reservations(&self, query: &ReservationQuery) -> Result<Page<Reservation>> {
        let envelope: ApiEnvelope<ReservationList> = self
            .send::<(), _>(
                Method::GET,
                &self.url("/api/reservations"),
                &query.to_query_pairs(),
                None,
                Replay::Safe,
            )
            .await?;
        Ok(Page::new(envelope.data.reservations, envelope.pagination))
    }

    #[instrument(skip(self, reservation), fields(tenant = %self.session.tenant_id(), pet = %reservation.pet_id))]
    async fn create_reservation(&self, reservation: &NewReservation) -> Result<Reservation> {
        let envelope: ApiEnvelope<Reservation> = self
            .send(
                Method::POST,
                &self.url("/api/reservations"),
                &[],
                Some(reservation),
                Replay::Never,
            )
            .await?;
        Ok(envelope.data)
    }

    #[instrument(skip(self, update), fields(tenant = %self.session.tenant_id()))]
    async fn update_reservation(
        &self,
        id: &str,
        update: &ReservationUpdate,
    ) -> Result<Reservation> {
        let url = self.reservation_url(id)?;
        let envelope: ApiEnvelope<Reservation> = self
            .send(Method::PUT, &url, &[], Some(update), Replay::Safe)
            .await?;
        Ok(envelope.data)
    }
}
