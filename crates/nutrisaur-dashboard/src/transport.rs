use std::future::Future;
use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use tracing::debug;

use crate::error::DashboardError;
use crate::frame::SseParser;

/// `data:` payloads of one open event stream. The stream ending or yielding
/// an error means the connection dropped.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, DashboardError>> + Send>>;

pub trait EventTransport: Send + Sync {
    fn open(
        &self,
        barangay: &str,
    ) -> impl Future<Output = Result<FrameStream, DashboardError>> + Send;
}

/// Event stream over HTTP from `GET {base_url}/api/events`.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl EventTransport for HttpTransport {
    async fn open(&self, barangay: &str) -> Result<FrameStream, DashboardError> {
        let url = format!("{}/api/events", self.base_url);
        debug!("Opening event stream {} (barangay {:?})", url, barangay);

        let response = self
            .client
            .get(&url)
            .query(&[("barangay", barangay)])
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DashboardError::Status(response.status()));
        }

        let mut body = response.bytes_stream();
        let frames = async_stream::stream! {
            let mut parser = SseParser::default();
            while let Some(chunk) = body.next().await {
                match chunk {
                    Ok(bytes) => {
                        for data in parser.push(&bytes) {
                            yield Ok(data);
                        }
                    }
                    Err(e) => {
                        yield Err(DashboardError::Http(e));
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(frames))
    }
}
