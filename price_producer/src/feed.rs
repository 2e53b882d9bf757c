//! External price feed adapter.
//!
//! The pipeline only sees the [`FeedAdapter`] boundary: give it the instrument set, get
//! back a (possibly partial) price map or `None`. Transport, auth and parse failures
//! are logged here and never travel further.
//!
//! [`MetalPriceApi`] talks to the MetalpriceAPI `latest` endpoint. Its rates are quoted
//! as metal units per USD, so the USD price of one unit is `1 / rate`.

use crate::model::variation::round2;
use log::{debug, info, warn};
use price_common::{Instrument, ProducerError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// MetalpriceAPI endpoint for the latest rates.
pub const METALPRICE_URL: &str = "https://api.metalpriceapi.com/v1/latest";
/// Upper bound for one feed request.
pub const FEED_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of observed prices.
pub trait FeedAdapter {
    /// Observed USD prices for (some of) `instruments`, or `None` when the feed is
    /// unavailable.
    fn fetch(&self, instruments: &[Instrument]) -> Option<HashMap<Instrument, f64>>;
}

/// Body of a `latest` response. Only the fields we read.
#[derive(Debug, Deserialize)]
pub struct LatestRates {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    rates: HashMap<String, f64>,
}

/// Convert a `latest` response into USD prices.
///
/// Unknown currency codes and non-positive rates are skipped. Returns `None` when the
/// response is unsuccessful or nothing usable is left.
pub fn parse_latest_rates(body: &LatestRates) -> Option<HashMap<Instrument, f64>> {
    if !body.success {
        warn!("Price feed reported an unsuccessful response");
        return None;
    }

    let mut prices = HashMap::new();
    for (code, rate) in &body.rates {
        let Some(instrument) = Instrument::from_feed_code(code) else {
            continue;
        };
        if !rate.is_finite() || *rate <= 0.0 {
            debug!("Skipping non-positive rate {} for {}", rate, code);
            continue;
        }
        prices.insert(instrument, round2(1.0 / rate));
    }

    if prices.is_empty() { None } else { Some(prices) }
}

/// Blocking MetalpriceAPI client.
pub struct MetalPriceApi {
    client: reqwest::blocking::Client,
    url: String,
    api_key: Option<String>,
}

impl MetalPriceApi {
    /// Create a client against [`METALPRICE_URL`]. Without an API key every fetch
    /// returns `None` and no request is made.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_url(METALPRICE_URL, api_key)
    }

    /// Create a client against a custom endpoint.
    pub fn with_url(url: &str, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(FEED_TIMEOUT)
            .build()
            .map_err(|e| ProducerError::FeedUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            url: url.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    fn request(&self, api_key: &str, instruments: &[Instrument]) -> Result<LatestRates> {
        let currencies: Vec<&str> = instruments.iter().map(|i| i.feed_code()).collect();
        let currencies = currencies.join(",");
        let response = self
            .client
            .get(&self.url)
            .header("X-API-KEY", api_key)
            .query(&[("base", "USD"), ("currencies", currencies.as_str())])
            .send()
            .map_err(|e| ProducerError::FeedUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProducerError::FeedUnavailable(format!("{} - {}", status, body)));
        }
        response
            .json::<LatestRates>()
            .map_err(|e| ProducerError::FeedUnavailable(e.to_string()))
    }
}

impl FeedAdapter for MetalPriceApi {
    fn fetch(&self, instruments: &[Instrument]) -> Option<HashMap<Instrument, f64>> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("No API key configured, using simulated data only");
            return None;
        };

        match self.request(api_key, instruments) {
            Ok(body) => {
                let prices = parse_latest_rates(&body)?;
                info!("Fetched {} prices from MetalpriceAPI", prices.len());
                Some(prices)
            }
            Err(e) => {
                warn!("MetalpriceAPI request failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    fn body(json: &str) -> LatestRates {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn inverts_rates_into_usd_prices() {
        let parsed = parse_latest_rates(&body(
            r#"{"success":true,"base":"USD","rates":{"XAU":0.0005,"XAG":0.04,"EUR":0.92}}"#,
        ))
        .unwrap();

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[&Instrument::GOLD], 2000.0);
        assert_eq!(parsed[&Instrument::SILVER], 25.0);
    }

    #[test]
    fn skips_non_positive_rates() {
        let parsed = parse_latest_rates(&body(
            r#"{"success":true,"rates":{"XAU":0.000526315789,"XAG":0,"XPT":-1.0}}"#,
        ))
        .unwrap();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[&Instrument::GOLD], 1900.0);
    }

    #[test]
    fn unsuccessful_or_empty_is_none() {
        assert!(parse_latest_rates(&body(r#"{"success":false,"rates":{"XAU":0.0005}}"#)).is_none());
        assert!(parse_latest_rates(&body(r#"{"success":true,"rates":{}}"#)).is_none());
        assert!(parse_latest_rates(&body(r#"{"error":{"code":101}}"#)).is_none());
    }

    #[test]
    fn missing_api_key_means_no_request() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let url = format!("http://{}/latest", listener.local_addr().unwrap());

        let feed = MetalPriceApi::with_url(&url, None).unwrap();
        assert!(feed.fetch(&Instrument::all()).is_none());
        let blank = MetalPriceApi::with_url(&url, Some("  ".into())).unwrap();
        assert!(blank.fetch(&Instrument::all()).is_none());

        let err = listener.accept().unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::WouldBlock);
    }

    /// Serve one canned HTTP response and hand back the raw request.
    fn serve_once(status: &str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/latest", listener.local_addr().unwrap());
        let status = status.to_string();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let size = stream.read(&mut buf).unwrap();
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&buf[..size]).to_string()
        });
        (url, handle)
    }

    #[test]
    fn fetches_with_key_and_currency_list() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"success":true,"base":"USD","rates":{"XAU":0.0005,"XPT":0}}"#,
        );
        let feed = MetalPriceApi::with_url(&url, Some("secret".into())).unwrap();

        let prices = feed.fetch(&[Instrument::GOLD, Instrument::PLATINUM]).unwrap();
        let request = server.join().unwrap();

        assert_eq!(prices.len(), 1);
        assert_eq!(prices[&Instrument::GOLD], 2000.0);
        assert!(request.to_lowercase().contains("x-api-key: secret"));
        assert!(request.contains("currencies=XAU%2CXPT"));
        assert!(request.contains("base=USD"));
    }

    #[test]
    fn http_error_status_is_unavailable() {
        let (url, server) = serve_once("401 Unauthorized", r#"{"success":false}"#);
        let feed = MetalPriceApi::with_url(&url, Some("bad".into())).unwrap();

        assert!(feed.fetch(&Instrument::all()).is_none());
        server.join().unwrap();
    }
}
