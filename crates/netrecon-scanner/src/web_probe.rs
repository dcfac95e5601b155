//! Web Prober (C8): probe HTTP(S) surfaces on a device's open ports and
//! collect a `WebService` snapshot for each, with an optional best-effort
//! screenshot step.

use std::time::Duration;

use async_trait::async_trait;
use netrecon_models::port::{Port, PortState};
use netrecon_models::web_service::{WebProtocol, WebService};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum WebProbeError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("screenshot failed: {0}")]
    Screenshot(String),
}

/// Headless-browser screenshot capability, pluggable so the prober can run
/// without one installed. No screenshotting crate exists in this engine's
/// dependency stack, so the default implementation always fails — the step
/// is still structurally present and its failure is non-fatal per §4.8.
#[async_trait]
pub trait Screenshotter: Send + Sync {
    async fn capture(&self, url: &str) -> Result<Vec<u8>, WebProbeError>;
}

pub struct NoScreenshotter;

#[async_trait]
impl Screenshotter for NoScreenshotter {
    async fn capture(&self, _url: &str) -> Result<Vec<u8>, WebProbeError> {
        Err(WebProbeError::Screenshot("no screenshotter configured".into()))
    }
}

/// Probe every web-looking port on `device_id`, returning the full
/// replacement set of `WebService` rows for it.
pub async fn probe_device(
    device_id: &str,
    ipv4: &str,
    ports: &[Port],
    screenshots_enabled: bool,
    screenshotter: &dyn Screenshotter,
) -> Vec<WebService> {
    let mut services = Vec::new();
    for port in ports
        .iter()
        .filter(|p| p.state_enum() == PortState::Open && p.looks_like_web())
    {
        let protocol = WebProtocol::from_str_lossy(port.web_protocol());
        let url = format!("{}://{}:{}/", port.web_protocol(), ipv4, port.number);
        match probe_one(device_id.to_string(), url.clone(), port.number.clone(), protocol).await {
            Ok(mut service) => {
                if screenshots_enabled && is_html_2xx_3xx(&service) {
                    match screenshotter.capture(&url).await {
                        Ok(png) => {
                            use base64::Engine;
                            service.screenshot =
                                Some(base64::engine::general_purpose::STANDARD.encode(png));
                        }
                        Err(e) => {
                            tracing::debug!(url, error = %e, "screenshot skipped");
                        }
                    }
                }
                services.push(service);
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "web probe failed");
            }
        }
    }
    services
}

fn is_html_2xx_3xx(service: &WebService) -> bool {
    let status_ok = (200..400).contains(&service.status_code);
    let is_html = service
        .content_type
        .as_deref()
        .map(|ct| ct.to_ascii_lowercase().contains("html"))
        .unwrap_or(false);
    status_ok && is_html
}

async fn probe_one(
    device_id: String,
    url: String,
    port: String,
    protocol: WebProtocol,
) -> Result<WebService, WebProbeError> {
    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .timeout(PROBE_TIMEOUT)
        .build()
        .map_err(|e| WebProbeError::Request(e.to_string()))?;

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| WebProbeError::Request(e.to_string()))?;

    let status_code = response.status().as_u16() as i64;
    let server = response
        .headers()
        .get(reqwest::header::SERVER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body_bytes = response
        .bytes()
        .await
        .map_err(|e| WebProbeError::Request(e.to_string()))?;
    let truncated = &body_bytes[..body_bytes.len().min(MAX_BODY_BYTES)];
    let body = String::from_utf8_lossy(truncated);

    let mut service = WebService::new(device_id, url, port, protocol);
    service.status_code = status_code;
    service.server = server;
    service.size = body_bytes.len() as i64;
    service.title = content_type
        .as_deref()
        .map(|ct| ct.to_ascii_lowercase().contains("html"))
        .unwrap_or(false)
        .then(|| extract_title(&body))
        .flatten();
    service.content_type = content_type;
    Ok(service)
}

/// Extract the contents of the first `<title>...</title>` tag, if any.
fn extract_title(body: &str) -> Option<String> {
    let lower = body.to_ascii_lowercase();
    let start = lower.find("<title>")? + "<title>".len();
    let end = lower[start..].find("</title>")? + start;
    let title = body[start..end].trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}
