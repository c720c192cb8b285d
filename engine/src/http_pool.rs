use crate::config::HttpConfig;
use anyhow::{Context, Result};
use prometheus::{HistogramVec, IntCounterVec, IntGaugeVec, Registry};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE},
    Client, ClientBuilder,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Shared reqwest client with per-request metrics. Used for both the odds
/// proxy and JSON-RPC traffic.
#[derive(Clone)]
pub struct HttpPool {
    client: Client,
    metrics: Arc<HttpMetrics>,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub json: Option<Value>,
    pub text: Option<String>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl HttpPool {
    pub fn new(cfg: &HttpConfig, registry: &Registry) -> Result<Self> {
        let client = ClientBuilder::new()
            .tcp_keepalive(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(cfg.max_connections)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .connect_timeout(Duration::from_millis(cfg.timeout_ms))
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .context("build reqwest client")?;
        let metrics = Arc::new(HttpMetrics::new(registry)?);
        Ok(Self { client, metrics })
    }

    fn default_headers() -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        h
    }

    /// Metric label: host and path only, so query strings don't explode
    /// cardinality.
    fn label(url: &Url) -> String {
        format!("{}{}", url.host_str().unwrap_or_default(), url.path())
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        let url = Url::parse(url).with_context(|| format!("parse url '{}'", url))?;
        let label = Self::label(&url);
        let builder = self.client.get(url).headers(Self::default_headers());
        self.do_req("GET", &label, builder).await
    }

    pub async fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse> {
        let url = Url::parse(url).with_context(|| format!("parse url '{}'", url))?;
        let label = Self::label(&url);
        let mut headers = Self::default_headers();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let builder = self.client.post(url).headers(headers).json(body);
        self.do_req("POST", &label, builder).await
    }

    async fn do_req(
        &self,
        method: &str,
        path: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<HttpResponse> {
        let start = Instant::now();
        self.metrics.inflight.with_label_values(&[method]).inc();
        self.metrics
            .req_total
            .with_label_values(&[method, path])
            .inc();
        let sent = builder.send().await;
        let resp = match sent {
            Ok(resp) => resp,
            Err(err) => {
                self.metrics.inflight.with_label_values(&[method]).dec();
                self.metrics
                    .fail_total
                    .with_label_values(&[method, path])
                    .inc();
                return Err(err).context("http send");
            }
        };
        let status = resp.status().as_u16();
        let body = resp.bytes().await;
        self.metrics.inflight.with_label_values(&[method]).dec();
        let body_bytes = body.context("read body bytes")?;
        let dur = start.elapsed().as_secs_f64();
        self.metrics
            .latency
            .with_label_values(&[method, path])
            .observe(dur);
        if status >= 400 {
            self.metrics
                .fail_total
                .with_label_values(&[method, path])
                .inc();
        }
        let dur_ms = (dur * 1000.0) as u64;
        tracing::debug!(target: "http", method=%method, path=%path, status=%status, latency_ms=%dur_ms, bytes=%body_bytes.len(), "HTTP request completed");
        Ok(Self::parse_body(status, &body_bytes))
    }

    fn parse_body(status: u16, bytes: &[u8]) -> HttpResponse {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(v) => HttpResponse {
                status,
                json: Some(v),
                text: None,
            },
            Err(_) => HttpResponse {
                status,
                json: None,
                text: Some(String::from_utf8_lossy(bytes).to_string()),
            },
        }
    }
}

#[derive(Clone)]
struct HttpMetrics {
    req_total: IntCounterVec,
    fail_total: IntCounterVec,
    inflight: IntGaugeVec,
    latency: HistogramVec,
}

impl HttpMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let req_total = IntCounterVec::new(
            prometheus::Opts::new("http_requests_total", "HTTP requests total"),
            &["method", "path"],
        )?;
        let fail_total = IntCounterVec::new(
            prometheus::Opts::new("http_failures_total", "HTTP failures total"),
            &["method", "path"],
        )?;
        let inflight = IntGaugeVec::new(
            prometheus::Opts::new("http_inflight", "HTTP inflight requests"),
            &["method"],
        )?;
        let latency = HistogramVec::new(
            prometheus::HistogramOpts::new("http_latency_seconds", "HTTP request latency seconds")
                .buckets(vec![
                    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ]),
            &["method", "path"],
        )?;
        // Re-registration on a shared registry is not an error for us.
        registry.register(Box::new(req_total.clone())).ok();
        registry.register(Box::new(fail_total.clone())).ok();
        registry.register(Box::new(inflight.clone())).ok();
        registry.register(Box::new(latency.clone())).ok();
        Ok(Self {
            req_total,
            fail_total,
            inflight,
            latency,
        })
    }
}
