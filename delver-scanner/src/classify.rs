use crate::baseline::BaselineOracle;
use crate::result::ProbeResponse;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome category of one probed candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    Valid,
    Protected,
    Redirect,
    Soft404,
    NotFound,
    /// No response at all (network failure); assigned by the orchestrator.
    Error,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Valid => "valid",
            Classification::Protected => "protected",
            Classification::Redirect => "redirect",
            Classification::Soft404 => "soft-404",
            Classification::NotFound => "not-found",
            Classification::Error => "error",
        }
    }

    /// Whether hits of this kind go to the per-depth result files.
    pub fn is_persisted(&self) -> bool {
        matches!(self, Classification::Valid | Classification::Protected)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify `response` to a probe of `requested_url`. First matching rule wins:
///
/// 1. followed a redirect to a different URL: `Redirect`, note is the final URL
/// 2. 401 / 403: `Protected`
/// 3. 200: `Soft404` if it looks like the baseline, else `Valid`
/// 4. 301 / 302 / 307 / 308: `Redirect`, note is the `Location` header
/// 5. anything else: `NotFound`, note is the status code
pub fn classify(
    requested_url: &str,
    response: &ProbeResponse,
    oracle: &BaselineOracle,
) -> (Classification, String) {
    let requested = requested_url.trim_end_matches('/');
    let landed = response.final_url.trim_end_matches('/');
    if response.was_redirected() && landed != requested {
        return (Classification::Redirect, response.final_url.clone());
    }

    match response.status_code {
        401 | 403 => (Classification::Protected, "access controlled".to_string()),
        200 if oracle.is_soft_404(response) => {
            (Classification::Soft404, "matches baseline".to_string())
        }
        200 => (Classification::Valid, "OK".to_string()),
        301 | 302 | 307 | 308 => (Classification::Redirect, response.location().to_string()),
        status => (Classification::NotFound, status.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::ContentSignature;
    use reqwest::header::{HeaderMap, HeaderValue, LOCATION};

    const URL: &str = "http://t/admin";

    fn response(status: u16, body: &str) -> ProbeResponse {
        ProbeResponse::new(URL.to_string(), status).with_body(body)
    }

    fn oracle_for(body: &str) -> BaselineOracle {
        BaselineOracle::from_signature(ContentSignature::from_response(&response(200, body)))
    }

    #[test]
    fn test_redirect_history_beats_200() {
        let r = response(200, "login form")
            .with_final_url("http://t/login")
            .with_redirect_chain(vec![URL.to_string()]);

        let (class, note) = classify(URL, &r, &BaselineOracle::disabled());
        assert_eq!(class, Classification::Redirect);
        assert_eq!(note, "http://t/login");
    }

    #[test]
    fn test_trailing_slash_redirect_is_not_a_redirect() {
        let r = response(200, "directory index")
            .with_final_url("http://t/admin/")
            .with_redirect_chain(vec![URL.to_string()]);

        let (class, note) = classify(URL, &r, &BaselineOracle::disabled());
        assert_eq!(class, Classification::Valid);
        assert_eq!(note, "OK");
    }

    #[test]
    fn test_401_and_403_are_protected_regardless_of_baseline() {
        for status in [401, 403] {
            let r = response(status, "Forbidden");
            for oracle in [BaselineOracle::disabled(), oracle_for("Forbidden")] {
                let (class, note) = classify(URL, &r, &oracle);
                assert_eq!(class, Classification::Protected);
                assert_eq!(note, "access controlled");
            }
        }
    }

    #[test]
    fn test_200_unique_content_is_valid() {
        let (class, note) = classify(
            URL,
            &response(200, "<h1>Admin dashboard</h1>"),
            &oracle_for(""),
        );
        assert_eq!(class, Classification::Valid);
        assert_eq!(note, "OK");
    }

    #[test]
    fn test_200_matching_baseline_is_soft_404() {
        let (class, note) = classify(
            URL,
            &response(200, "Page not found"),
            &oracle_for("Page not found"),
        );
        assert_eq!(class, Classification::Soft404);
        assert_eq!(note, "matches baseline");
    }

    #[test]
    fn test_unfollowed_redirect_uses_location() {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_static("/elsewhere"));
        let r = response(307, "").with_headers(headers);

        let (class, note) = classify(URL, &r, &BaselineOracle::disabled());
        assert_eq!(class, Classification::Redirect);
        assert_eq!(note, "/elsewhere");

        let (class, note) = classify(URL, &response(308, ""), &BaselineOracle::disabled());
        assert_eq!(class, Classification::Redirect);
        assert_eq!(note, "");
    }

    #[test]
    fn test_other_status_is_not_found_with_code() {
        for status in [404, 500, 204, 303] {
            let (class, note) = classify(URL, &response(status, ""), &BaselineOracle::disabled());
            assert_eq!(class, Classification::NotFound);
            assert_eq!(note, status.to_string());
        }
    }

    #[test]
    fn test_classification_is_idempotent() {
        let oracle = oracle_for("Page not found");
        let r = response(200, "Page not found");

        assert_eq!(classify(URL, &r, &oracle), classify(URL, &r, &oracle));
    }

    #[test]
    fn test_labels() {
        assert_eq!(Classification::Soft404.to_string(), "soft-404");
        assert_eq!(Classification::NotFound.to_string(), "not-found");
        assert!(Classification::Protected.is_persisted());
        assert!(!Classification::Redirect.is_persisted());
    }
}
