use std::time::Duration;

use log::{debug, warn};
use url::Url;

use super::decode::{DecodedWorld, FrameDecoder};
use super::frame::Frame;
use crate::core::config::FeedConfig;
use crate::core::error::{ConfigError, FetchError};

pub const DEFAULT_CURSOR_PARAM: &str = "serial";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Produces one frame per call.
///
/// `cursor` is the sequence number the caller wants next; `None` lets the
/// server answer with whatever generation it considers current.
/// Implementations never fail: every problem is reported as
/// [`Frame::failed`].
pub trait FrameSource: Send + Sync {
    fn fetch(&self, cursor: Option<u64>) -> Frame;
}

pub struct HttpFrameSource {
    agent: ureq::Agent,
    url: Url,
    cursor_param: String,
    decoder: Box<dyn FrameDecoder>,
}

impl HttpFrameSource {
    pub fn new(
        url: &str,
        decoder: Box<dyn FrameDecoder>,
    ) -> Result<Self, ConfigError> {
        let url = Url::parse(url).map_err(|err| ConfigError::Url {
            url: url.to_string(),
            reason: err.to_string(),
        })?;

        Ok(Self {
            agent: build_agent(DEFAULT_REQUEST_TIMEOUT),
            url,
            cursor_param: DEFAULT_CURSOR_PARAM.to_string(),
            decoder,
        })
    }

    pub fn from_config(config: &FeedConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(&config.url, config.format.decoder())?
            .with_cursor_param(config.cursor_param.clone())
            .with_timeout(config.request_timeout()))
    }

    /// Name of the query parameter carrying the cursor.
    pub fn with_cursor_param(mut self, name: impl Into<String>) -> Self {
        self.cursor_param = name.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    pub fn request_url(&self, cursor: Option<u64>) -> Url {
        let mut url = self.url.clone();
        let value = cursor.map(|c| c.to_string());
        set_query_param(&mut url, &self.cursor_param, value.as_deref());
        url
    }

    fn fetch_decoded(
        &self,
        cursor: Option<u64>,
    ) -> Result<DecodedWorld, FetchError> {
        let url = self.request_url(cursor);
        debug!("GET {}", url);

        let mut response = self
            .agent
            .get(url.as_str())
            .call()
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|err| FetchError::Body(err.to_string()))?;

        if !status.is_success() {
            debug!("error body from {}: {}", url, body);
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        Ok(self.decoder.decode(&body)?)
    }
}

impl FrameSource for HttpFrameSource {
    fn fetch(&self, cursor: Option<u64>) -> Frame {
        match self.fetch_decoded(cursor) {
            Ok(world) if world.is_over => {
                Frame::finished(world.sequence, world.payload)
            }
            Ok(world) => Frame::live(world.sequence, world.payload),
            Err(err) => {
                warn!("failed to load world: {}", err);
                Frame::failed(format!("Can't load world: {}", err))
            }
        }
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build();
    config.into()
}

/// Replaces (or with `None` removes) one query parameter, keeping the rest
/// in order. Leaves no dangling `?` behind.
pub fn set_query_param(url: &mut Url, name: &str, value: Option<&str>) {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != name)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if let Some(value) = value {
        pairs.push((name.to_string(), value.to_string()));
    }

    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::decode::FeedFormat;

    fn source(url: &str) -> HttpFrameSource {
        HttpFrameSource::new(url, FeedFormat::Json.decoder()).unwrap()
    }

    #[test]
    fn cursor_is_omitted_until_a_sequence_is_known() {
        let source = source("http://127.0.0.1:5000/world");
        assert_eq!(
            source.request_url(None).as_str(),
            "http://127.0.0.1:5000/world"
        );
        assert_eq!(
            source.request_url(Some(11)).as_str(),
            "http://127.0.0.1:5000/world?serial=11"
        );
    }

    #[test]
    fn cursor_param_replaces_existing_value_and_keeps_others() {
        let source = source("http://localhost/world?size=20&gen=3")
            .with_cursor_param("gen");
        assert_eq!(
            source.request_url(Some(4)).as_str(),
            "http://localhost/world?size=20&gen=4"
        );
        assert_eq!(
            source.request_url(None).as_str(),
            "http://localhost/world?size=20"
        );
    }

    #[test]
    fn invalid_url_is_a_config_error() {
        let err = HttpFrameSource::new("not a url", FeedFormat::Html.decoder())
            .err()
            .expect("url must be rejected");
        assert!(matches!(err, ConfigError::Url { .. }));
    }
}
