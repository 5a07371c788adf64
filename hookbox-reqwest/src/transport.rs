//! HTTP transport backed by `reqwest`.

use std::fmt;
use std::marker::PhantomData;

use futures::FutureExt;
use futures::future::BoxFuture;
use hookbox_core::{CancellationToken, FetchError, ResourceKey, Transport};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::{ConfigError, TransportConfig};

/// [`Transport`] that issues a `GET` for every key and decodes the JSON body.
///
/// - A key is resolved against the base URL when one is set, otherwise it must
///   be an absolute URL.
/// - Any non-success status becomes [`FetchError::Http`].
/// - Connection failures and client timeouts become [`FetchError::Network`].
/// - A body that does not decode into `T` becomes [`FetchError::Decode`].
/// - Cancelling the request token drops the request and yields
///   [`FetchError::Aborted`].
///
/// The payload type defaults to [`serde_json::Value`]; use
/// [`decode_as`](Self::decode_as) for a typed payload.
///
/// ```
/// use hookbox_reqwest::ReqwestTransport;
/// use reqwest::Url;
///
/// #[derive(Clone, serde::Deserialize)]
/// struct User {
///     name: String,
/// }
///
/// let transport = ReqwestTransport::new(reqwest::Client::new())
///     .with_base_url(Url::parse("https://api.example.com/").unwrap())
///     .decode_as::<User>();
/// ```
pub struct ReqwestTransport<T = Value> {
    client: Client,
    base_url: Option<Url>,
    _payload: PhantomData<fn() -> T>,
}

impl ReqwestTransport {
    /// Creates a transport decoding bodies as [`serde_json::Value`].
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: None,
            _payload: PhantomData,
        }
    }

    /// Builds the client and transport described by `config`.
    pub fn from_config(config: &TransportConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            headers.insert(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let transport = Self::new(builder.build()?);

        match &config.base_url {
            Some(base_url) => {
                let url = Url::parse(base_url)
                    .map_err(|_| ConfigError::InvalidBaseUrl(base_url.clone()))?;
                Ok(transport.with_base_url(url))
            }
            None => Ok(transport),
        }
    }
}

impl<T> ReqwestTransport<T> {
    /// Resolve keys against `base_url`.
    pub fn with_base_url(self, base_url: Url) -> Self {
        Self {
            base_url: Some(base_url),
            ..self
        }
    }

    /// Decode response bodies as `U` instead.
    pub fn decode_as<U>(self) -> ReqwestTransport<U> {
        ReqwestTransport {
            client: self.client,
            base_url: self.base_url,
            _payload: PhantomData,
        }
    }

    /// The underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The base URL keys are resolved against.
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Turns `key` into the URL to request.
    pub fn resolve(&self, key: &ResourceKey) -> Result<Url, FetchError> {
        let resolved = match &self.base_url {
            Some(base_url) => base_url.join(key.as_str()),
            None => Url::parse(key.as_str()),
        };
        resolved.map_err(|_| FetchError::InvalidKey(key.to_string()))
    }
}

impl<T> Clone for ReqwestTransport<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            _payload: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ReqwestTransport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("base_url", &self.base_url)
            .field("payload", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Transport for ReqwestTransport<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Payload = T;
    type Future = BoxFuture<'static, Result<T, FetchError>>;

    fn fetch(&self, key: &ResourceKey, cancel: CancellationToken) -> Self::Future {
        let client = self.client.clone();
        let url = self.resolve(key);

        async move {
            let url = url?;
            debug!(%url, "sending request");

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Aborted),
                response = client.get(url).send() => response.map_err(FetchError::network)?,
            };

            let status = response.status();
            if !status.is_success() {
                debug!(status = status.as_u16(), "unsuccessful response");
                return Err(FetchError::Http {
                    status: status.as_u16(),
                });
            }

            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Aborted),
                body = response.bytes() => body.map_err(FetchError::network)?,
            };
            serde_json::from_slice(&body).map_err(FetchError::decode)
        }
        .boxed()
    }
}
