pub mod baseline;
pub mod classify;
pub mod error;
pub mod identity;
pub mod paths;
pub mod prober;
pub mod result;
pub mod similarity;
pub mod waf;

pub use baseline::{BaselineOracle, ContentSignature, SimilarityThresholds};
pub use classify::{Classification, classify};
pub use error::ScanError;
pub use identity::{IdentityRotator, ProxyConfig};
pub use paths::{PathCandidate, PathGenerator};
pub use prober::Prober;
pub use result::ProbeResponse;
pub use waf::{WafDetection, WafProbe};
