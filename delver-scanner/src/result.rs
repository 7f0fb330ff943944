use reqwest::header::{HeaderMap, LOCATION};

/// Final hop of a probe, with the hops that led to it.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub requested_url: String,
    pub final_url: String,
    pub status_code: u16,
    pub headers: HeaderMap,
    pub body: String,
    /// URLs that answered with a redirect before `final_url`, in order.
    pub redirect_chain: Vec<String>,
}

impl ProbeResponse {
    pub fn new(requested_url: String, status_code: u16) -> Self {
        Self {
            final_url: requested_url.clone(),
            requested_url,
            status_code,
            headers: HeaderMap::new(),
            body: String::new(),
            redirect_chain: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_final_url(mut self, final_url: impl Into<String>) -> Self {
        self.final_url = final_url.into();
        self
    }

    pub fn with_redirect_chain(mut self, chain: Vec<String>) -> Self {
        self.redirect_chain = chain;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn was_redirected(&self) -> bool {
        !self.redirect_chain.is_empty()
    }

    /// The `Location` header of the final hop, empty when missing or not valid text.
    pub fn location(&self) -> &str {
        self.headers
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }
}
