//! HTTP quote polling for DEX and CEX prices

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::prelude::*;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use crate::{
    adapters::{PriceSource, Subscription, TickSender},
    config::Config,
    errors::{EngineError, EngineResult},
    types::{PriceObservation, Venue},
};

const ASSET_PLACEHOLDER: &str = "{asset}";

/// Polls two quote endpoints returning `{"price": "<decimal>"}`. URLs may
/// contain an `{asset}` placeholder.
#[derive(Clone)]
pub struct HttpPriceSource {
    client: reqwest::Client,
    dex_url: String,
    cex_url: String,
    assets: Vec<String>,
    poll_interval: Duration,
}

impl HttpPriceSource {
    pub fn new(
        dex_url: impl Into<String>,
        cex_url: impl Into<String>,
        assets: Vec<String>,
        poll_interval: Duration,
    ) -> EngineResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .map_err(|e| EngineError::external("HTTP client setup", e.into()))?;

        Ok(Self {
            client,
            dex_url: dex_url.into(),
            cex_url: cex_url.into(),
            assets,
            poll_interval,
        })
    }

    /// `None` when the quote URLs are not configured.
    pub fn from_config(config: &Config) -> EngineResult<Option<Self>> {
        match (&config.dex_price_url, &config.cex_price_url) {
            (Some(dex), Some(cex)) => Ok(Some(Self::new(
                dex.clone(),
                cex.clone(),
                config.assets.clone(),
                Duration::from_millis(config.price_poll_interval_ms.max(1)),
            )?)),
            (None, None) => Ok(None),
            _ => Err(EngineError::Config {
                message: "DEX_PRICE_URL and CEX_PRICE_URL must be set together".to_string(),
            }),
        }
    }

    fn url_for(&self, venue: Venue, asset: &str) -> String {
        let template = match venue {
            Venue::Dex => &self.dex_url,
            Venue::Cex => &self.cex_url,
        };
        template.replace(ASSET_PLACEHOLDER, asset)
    }

    pub async fn fetch_price(&self, venue: Venue, asset: &str) -> Result<Decimal> {
        let url = self.url_for(venue, asset);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("HTTP request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("{} quote API error: {} - {}", venue, status, body));
        }

        let json: serde_json::Value = response.json().await
            .context("Failed to parse JSON response")?;

        let price = match &json["price"] {
            serde_json::Value::String(s) => Decimal::from_str(s)
                .context("Failed to parse price string")?,
            serde_json::Value::Number(n) => Decimal::from_str(&n.to_string())
                .context("Failed to parse price number")?,
            _ => return Err(anyhow::anyhow!("Missing 'price' field in response")),
        };

        Ok(price)
    }

    async fn poll_loop(self, on_tick: TickSender, mut cancel: oneshot::Receiver<()>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        info!(assets = ?self.assets, "Price polling started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    for asset in &self.assets {
                        let Some(observation) = self.current_observation(asset).await else {
                            continue;
                        };
                        if on_tick.send(observation).await.is_err() {
                            debug!("Tick receiver closed, stopping price polling");
                            return;
                        }
                    }
                }
                _ = &mut cancel => {
                    info!("Price polling stopped");
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    fn subscribe(&self, on_tick: TickSender) -> Subscription {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        tokio::spawn(self.clone().poll_loop(on_tick, cancel_rx));
        Subscription::new(move || {
            let _ = cancel_tx.send(());
        })
    }

    async fn current_observation(&self, asset: &str) -> Option<PriceObservation> {
        let (dex, cex) = tokio::join!(
            self.fetch_price(Venue::Dex, asset),
            self.fetch_price(Venue::Cex, asset),
        );

        match (dex, cex) {
            (Ok(dex_price), Ok(cex_price)) => Some(PriceObservation::new(asset, dex_price, cex_price)),
            (Err(e), _) | (_, Err(e)) => {
                warn!(asset = %asset, "⚠️ Price fetch failed: {:#}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc;

    fn source_for(server: &mockito::ServerGuard) -> HttpPriceSource {
        HttpPriceSource::new(
            format!("{}/dex/{{asset}}", server.url()),
            format!("{}/cex/{{asset}}", server.url()),
            vec!["ETH".to_string()],
            Duration::from_millis(20),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_observation_from_both_venues() {
        let mut server = mockito::Server::new_async().await;
        let _dex = server.mock("GET", "/dex/ETH")
            .with_status(200)
            .with_body(r#"{"price":"1000.50"}"#)
            .create_async()
            .await;
        let _cex = server.mock("GET", "/cex/ETH")
            .with_status(200)
            .with_body(r#"{"price":1010.25}"#)
            .create_async()
            .await;

        let observation = source_for(&server).current_observation("ETH").await.unwrap();
        assert_eq!(observation.asset, "ETH");
        assert_eq!(observation.dex_price, dec!(1000.50));
        assert_eq!(observation.cex_price, dec!(1010.25));
    }

    #[tokio::test]
    async fn test_failed_venue_yields_none() {
        let mut server = mockito::Server::new_async().await;
        let _dex = server.mock("GET", "/dex/ETH")
            .with_status(200)
            .with_body(r#"{"price":"1000"}"#)
            .create_async()
            .await;
        let _cex = server.mock("GET", "/cex/ETH")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        assert!(source_for(&server).current_observation("ETH").await.is_none());
    }

    #[tokio::test]
    async fn test_missing_price_field_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _dex = server.mock("GET", "/dex/ETH")
            .with_status(200)
            .with_body(r#"{"symbol":"ETH"}"#)
            .create_async()
            .await;

        let err = source_for(&server).fetch_price(Venue::Dex, "ETH").await.unwrap_err();
        assert!(err.to_string().contains("price"));
    }

    #[tokio::test]
    async fn test_subscription_polls_until_cancelled() {
        let mut server = mockito::Server::new_async().await;
        let _dex = server.mock("GET", "/dex/ETH")
            .with_body(r#"{"price":"1000"}"#)
            .expect_at_least(1)
            .create_async()
            .await;
        let _cex = server.mock("GET", "/cex/ETH")
            .with_body(r#"{"price":"1001"}"#)
            .expect_at_least(1)
            .create_async()
            .await;

        let (tx, mut rx) = mpsc::channel(8);
        let subscription = source_for(&server).subscribe(tx);
        let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.cex_price, dec!(1001));

        subscription.unsubscribe();
        // The poller drops its sender once it observes the cancellation.
        let drained = tokio::time::timeout(Duration::from_secs(2), async {
            while rx.recv().await.is_some() {}
        })
        .await;
        assert!(drained.is_ok());
    }

    #[test]
    fn test_config_requires_both_urls() {
        let config = Config {
            dex_price_url: Some("http://localhost/dex".to_string()),
            ..Config::default()
        };
        assert!(HttpPriceSource::from_config(&config).is_err());
        assert!(HttpPriceSource::from_config(&Config::default()).unwrap().is_none());
    }
}
