use crate::error::{Result, ScanError};
use crate::identity::{IdentityRotator, ProxyConfig};
use crate::result::ProbeResponse;
use reqwest::header::LOCATION;
use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Redirect hops followed before a probe is abandoned.
pub const MAX_REDIRECTS: usize = 10;

/// Issues single GET probes with a rotated identity.
///
/// Redirects are followed here rather than inside reqwest so every hop is
/// recorded in [`ProbeResponse::redirect_chain`]. One client is built per
/// configured proxy up front, since reqwest binds proxies at client level.
pub struct Prober {
    direct: Client,
    proxied: Vec<Client>,
    identity: Arc<IdentityRotator>,
}

impl Prober {
    pub fn new(identity: Arc<IdentityRotator>) -> Result<Self> {
        Self::with_timeout(identity, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(identity: Arc<IdentityRotator>, timeout_secs: u64) -> Result<Self> {
        let direct = Self::build_client(timeout_secs, None)?;
        let proxied = identity
            .proxies()
            .iter()
            .map(|proxy| Self::build_client(timeout_secs, Some(proxy)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            direct,
            proxied,
            identity,
        })
    }

    fn build_client(timeout_secs: u64, proxy: Option<&ProxyConfig>) -> Result<Client> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs))
            .cookie_store(true)
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::none());

        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(&proxy.uri).map_err(|e| ScanError::InvalidProxy {
                uri: proxy.uri.clone(),
                reason: e.to_string(),
            })?;
            builder = builder.proxy(proxy);
        }

        Ok(builder.build()?)
    }

    /// Probe `url`, returning `None` on any network-level failure.
    pub async fn probe(&self, url: &str) -> Option<ProbeResponse> {
        match self.fetch(url).await {
            Ok(response) => Some(response),
            Err(e) => {
                warn!("Request failed for {}: {}", url, e);
                None
            }
        }
    }

    /// Probe `url`, surfacing the failure cause.
    pub async fn fetch(&self, url: &str) -> Result<ProbeResponse> {
        let headers = self.identity.next_headers();
        let client = match self.identity.next_proxy() {
            Some(proxy) => self.proxied.get(proxy.slot).unwrap_or(&self.direct),
            None => &self.direct,
        };

        let mut current = Url::parse(url)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", url, e)))?;
        let mut redirect_chain = Vec::new();

        loop {
            debug!("GET {}", current);
            let response = client
                .get(current.clone())
                .headers(headers.clone())
                .send()
                .await?;

            if let Some(next) = redirect_target(&current, &response) {
                if redirect_chain.len() >= MAX_REDIRECTS {
                    return Err(ScanError::TooManyRedirects {
                        url: url.to_string(),
                        hops: redirect_chain.len(),
                    });
                }
                debug!("{} redirected to {}", current, next);
                redirect_chain.push(current.to_string());
                current = next;
                continue;
            }

            let status_code = response.status().as_u16();
            let response_headers = response.headers().clone();
            let body = response.text().await?;

            return Ok(ProbeResponse {
                requested_url: url.to_string(),
                final_url: current.to_string(),
                status_code,
                headers: response_headers,
                body,
                redirect_chain,
            });
        }
    }
}

/// Where a redirect response points, if it is one we follow.
fn redirect_target(current: &Url, response: &Response) -> Option<Url> {
    let followable = matches!(
        response.status(),
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    );
    if !followable {
        return None;
    }

    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    current.join(location).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::USER_AGENTS;
    use wiremock::{
        Mock, MockServer, Request, ResponseTemplate,
        matchers::{method, path},
    };

    fn prober_for(target: &str) -> Prober {
        Prober::new(Arc::new(IdentityRotator::new(target))).unwrap()
    }

    #[tokio::test]
    async fn test_probe_returns_status_and_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin"))
            .respond_with(ResponseTemplate::new(200).set_body_string("admin panel"))
            .mount(&mock_server)
            .await;

        let prober = prober_for(&mock_server.uri());
        let url = format!("{}/admin", mock_server.uri());
        let response = prober.probe(&url).await.unwrap();

        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, "admin panel");
        assert_eq!(response.requested_url, url);
        assert!(!response.was_redirected());
    }

    #[tokio::test]
    async fn test_probe_follows_redirect_chain() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(301).insert_header("Location", "/middle"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/middle"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/new"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("landed"))
            .mount(&mock_server)
            .await;

        let prober = prober_for(&mock_server.uri());
        let url = format!("{}/old", mock_server.uri());
        let response = prober.probe(&url).await.unwrap();

        assert_eq!(response.status_code, 200);
        assert_eq!(response.final_url, format!("{}/new", mock_server.uri()));
        assert_eq!(response.redirect_chain.len(), 2);
        assert_eq!(response.redirect_chain[0], url);
    }

    #[tokio::test]
    async fn test_redirect_without_location_is_final() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/moved"))
            .respond_with(ResponseTemplate::new(302))
            .mount(&mock_server)
            .await;

        let prober = prober_for(&mock_server.uri());
        let response = prober
            .probe(&format!("{}/moved", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(response.status_code, 302);
        assert!(!response.was_redirected());
        assert_eq!(response.location(), "");
    }

    #[tokio::test]
    async fn test_redirect_loop_is_absent() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/loop"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop"))
            .mount(&mock_server)
            .await;

        let prober = prober_for(&mock_server.uri());
        let url = format!("{}/loop", mock_server.uri());

        assert!(matches!(
            prober.fetch(&url).await,
            Err(ScanError::TooManyRedirects { hops: MAX_REDIRECTS, .. })
        ));
        assert!(prober.probe(&url).await.is_none());
    }

    fn user_agent_is(expected: &'static str) -> impl Fn(&Request) -> bool + Send + Sync {
        move |request: &Request| {
            request
                .headers
                .get("user-agent")
                .is_some_and(|value| value == expected)
        }
    }

    #[tokio::test]
    async fn test_probe_sends_rotated_user_agent() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ua"))
            .and(user_agent_is(USER_AGENTS[0]))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ua"))
            .and(user_agent_is(USER_AGENTS[1]))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let prober = prober_for(&mock_server.uri());
        let url = format!("{}/ua", mock_server.uri());

        assert_eq!(prober.probe(&url).await.unwrap().status_code, 200);
        assert_eq!(prober.probe(&url).await.unwrap().status_code, 204);
    }

    #[tokio::test]
    async fn test_probes_alternate_between_proxies() {
        let proxy_a = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&proxy_a)
            .await;
        let proxy_b = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&proxy_b)
            .await;

        let identity = Arc::new(IdentityRotator::with_proxies(
            "http://target.invalid",
            vec![proxy_a.uri(), proxy_b.uri()],
        ));
        let prober = Prober::new(identity).unwrap();

        let mut statuses = Vec::new();
        for _ in 0..4 {
            let response = prober.probe("http://target.invalid/admin").await;
            statuses.push(response.map(|r| r.status_code));
        }

        assert_eq!(statuses, vec![Some(201), Some(202), Some(201), Some(202)]);
    }

    #[tokio::test]
    async fn test_connection_failure_is_absent() {
        // Nothing listens on port 1
        let prober = prober_for("http://127.0.0.1:1");
        assert!(prober.probe("http://127.0.0.1:1/admin").await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_url_is_error() {
        let prober = prober_for("http://127.0.0.1:1");
        assert!(matches!(
            prober.fetch("not a url").await,
            Err(ScanError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_invalid_proxy_rejected() {
        let identity = Arc::new(IdentityRotator::with_proxies(
            "http://example.com",
            vec!["::not a proxy::".to_string()],
        ));
        assert!(matches!(
            Prober::new(identity),
            Err(ScanError::InvalidProxy { .. })
        ));
    }
}
