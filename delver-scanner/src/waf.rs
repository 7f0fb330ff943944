// WAF fingerprinting: informational only, never part of classification

use crate::prober::Prober;
use crate::result::ProbeResponse;
use reqwest::header::SET_COOKIE;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Query string no sane application accepts; most WAFs block it outright.
const HOSTILE_QUERY: &str =
    "delver=%3Cscript%3Ealert(1)%3C%2Fscript%3E&file=..%2F..%2F..%2Fetc%2Fpasswd&id=1%27%20OR%201%3D1--";

/// Status codes WAFs commonly answer a blocked request with.
const BLOCK_STATUSES: &[u16] = &[403, 406, 419, 429, 501, 999];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WafDetection {
    pub name: String,
    pub notes: Option<String>,
}

struct WafSignature {
    name: &'static str,
    /// Substrings of a lowercased `name: value` header line.
    headers: &'static [&'static str],
    /// Substrings of lowercased `Set-Cookie` values.
    cookies: &'static [&'static str],
    /// Substrings of the lowercased body.
    body: &'static [&'static str],
}

const SIGNATURES: &[WafSignature] = &[
    WafSignature {
        name: "Cloudflare",
        headers: &["server: cloudflare", "cf-ray:", "cf-cache-status:"],
        cookies: &["__cfduid", "__cf_bm", "cf_clearance"],
        body: &["attention required! | cloudflare", "cloudflare ray id"],
    },
    WafSignature {
        name: "Akamai",
        headers: &["server: akamaighost", "x-akamai-transformed:"],
        cookies: &["ak_bmsc", "bm_sv"],
        body: &["access denied</h1>", "reference&#32;&#35;"],
    },
    WafSignature {
        name: "AWS WAF",
        headers: &["x-amzn-waf", "x-amz-cf-id:"],
        cookies: &["awsalb", "aws-waf-token"],
        body: &["request blocked", "generated by cloudfront"],
    },
    WafSignature {
        name: "Imperva Incapsula",
        headers: &["x-iinfo:", "x-cdn: incapsula"],
        cookies: &["incap_ses", "visid_incap"],
        body: &["incapsula incident id", "_incapsula_resource"],
    },
    WafSignature {
        name: "F5 BIG-IP",
        headers: &["server: bigip", "x-wa-info:", "x-cnection:"],
        cookies: &["bigipserver", "ts01", "f5_cspm"],
        body: &["the requested url was rejected"],
    },
    WafSignature {
        name: "Sucuri",
        headers: &["server: sucuri", "x-sucuri-id:", "x-sucuri-cache:"],
        cookies: &["sucuri_cloudproxy"],
        body: &["sucuri website firewall", "cloudproxy@sucuri.net"],
    },
    WafSignature {
        name: "ModSecurity",
        headers: &["server: mod_security", "mod_security", "modsecurity"],
        cookies: &[],
        body: &["mod_security", "this error was generated by mod_security"],
    },
    WafSignature {
        name: "FortiWeb",
        headers: &["fortiwafsid"],
        cookies: &["fortiwafsid", "cookiesession1"],
        body: &["fortigate", ".fgd_icon", "fortiweb"],
    },
    WafSignature {
        name: "Barracuda",
        headers: &["barra_counter_session"],
        cookies: &["barra_counter_session", "bni__barracuda_lb_cookie"],
        body: &["barracuda networks", "you are being blocked"],
    },
    WafSignature {
        name: "Wordfence",
        headers: &[],
        cookies: &["wfvt_"],
        body: &["generated by wordfence", "your access to this site has been limited"],
    },
];

/// Fingerprints the WAF in front of a target, if any.
pub struct WafProbe<'a> {
    prober: &'a Prober,
}

impl<'a> WafProbe<'a> {
    pub fn new(prober: &'a Prober) -> Self {
        Self { prober }
    }

    /// Probe `target` with a plain and a hostile request and match both
    /// against the vendor signatures. Network failures give an empty list.
    pub async fn detect(&self, target: &str) -> Vec<WafDetection> {
        let target = target.trim_end_matches('/');
        let normal = self.prober.probe(&format!("{}/", target)).await;
        let hostile = self
            .prober
            .probe(&format!("{}/?{}", target, HOSTILE_QUERY))
            .await;

        let mut detections = Vec::new();
        for response in [normal.as_ref(), hostile.as_ref()].into_iter().flatten() {
            for detection in match_signatures(response) {
                if !detections.iter().any(|d: &WafDetection| d.name == detection.name) {
                    detections.push(detection);
                }
            }
        }

        if detections.is_empty()
            && let Some(generic) = generic_block(normal.as_ref(), hostile.as_ref())
        {
            detections.push(generic);
        }

        if detections.is_empty() {
            debug!("No WAF signatures matched for {}", target);
        } else {
            info!("WAF detected for {}: {:?}", target, detections);
        }
        detections
    }
}

/// Vendor signatures matched by one response.
pub fn match_signatures(response: &ProbeResponse) -> Vec<WafDetection> {
    let header_lines: Vec<String> = response
        .headers
        .iter()
        .map(|(name, value)| {
            format!("{}: {}", name.as_str(), value.to_str().unwrap_or("")).to_lowercase()
        })
        .collect();
    let cookies: Vec<String> = response
        .headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_lowercase)
        .collect();
    let body = response.body.to_lowercase();

    SIGNATURES
        .iter()
        .filter_map(|sig| {
            let mut evidence = Vec::new();
            if let Some(hit) = sig
                .headers
                .iter()
                .find(|needle| header_lines.iter().any(|line| line.contains(*needle)))
            {
                evidence.push(format!("header '{}'", hit.trim_end_matches(':')));
            }
            if let Some(hit) = sig
                .cookies
                .iter()
                .find(|needle| cookies.iter().any(|c| c.contains(*needle)))
            {
                evidence.push(format!("cookie '{}'", hit));
            }
            if let Some(hit) = sig.body.iter().find(|needle| body.contains(*needle)) {
                evidence.push(format!("body '{}'", hit));
            }

            if evidence.is_empty() {
                None
            } else {
                Some(WafDetection {
                    name: sig.name.to_string(),
                    notes: Some(evidence.join(", ")),
                })
            }
        })
        .collect()
}

/// A WAF that only shows itself by blocking the hostile request.
fn generic_block(
    normal: Option<&ProbeResponse>,
    hostile: Option<&ProbeResponse>,
) -> Option<WafDetection> {
    let hostile = hostile?;
    if !BLOCK_STATUSES.contains(&hostile.status_code) {
        return None;
    }
    if normal.is_some_and(|n| n.status_code == hostile.status_code) {
        return None;
    }
    Some(WafDetection {
        name: "Generic WAF".to_string(),
        notes: Some(format!(
            "hostile request blocked with status {}",
            hostile.status_code
        )),
    })
}
