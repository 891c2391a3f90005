use chrono::{Duration, Utc};
use log::*;
use settlement_common::Secret;
use settlement_engine::{
    helpers::{calculate_hmac, verify_hmac},
    traits::{LabelUrlSigner, SignedLabelUrl},
};
use url::Url;

use crate::config::LabelConfig;

/// Issues label download links of the form `{base_url}/{path}?expires={unix_ts}&signature={hex}`, where the signature
/// is the HMAC-SHA256 of `{path}:{unix_ts}` under the label signing key. The file server that hosts the labels checks
/// the signature and the expiry with [`HmacLabelSigner::verify`].
///
/// Each path segment is percent-encoded in the link. The signature always covers the decoded path.
#[derive(Clone)]
pub struct HmacLabelSigner {
    base_url: String,
    key: Secret<String>,
    ttl: Duration,
}

impl HmacLabelSigner {
    pub fn new(config: &LabelConfig) -> Self {
        Self { base_url: config.base_url.clone(), key: config.signing_key.clone(), ttl: config.ttl }
    }

    fn message(path: &str, expires: i64) -> String {
        format!("{path}:{expires}")
    }

    fn link(&self, path: &str, expires: i64, signature: &str) -> Result<String, url::ParseError> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(path.split('/').filter(|s| !s.is_empty()));
        url.query_pairs_mut().clear().append_pair("expires", &expires.to_string()).append_pair("signature", signature);
        Ok(url.into())
    }

    pub fn verify(&self, path: &str, expires: i64, signature: &str) -> bool {
        let path = path.trim_start_matches('/');
        expires > Utc::now().timestamp() && verify_hmac(self.key.reveal(), Self::message(path, expires).as_bytes(), signature)
    }
}

impl LabelUrlSigner for HmacLabelSigner {
    fn sign(&self, path: &str) -> Option<SignedLabelUrl> {
        let path = path.trim().trim_start_matches('/');
        if path.is_empty() {
            return None;
        }
        let expires_at = Utc::now() + self.ttl;
        let expires = expires_at.timestamp();
        let signature = calculate_hmac(self.key.reveal(), Self::message(path, expires).as_bytes());
        let url = match self.link(path, expires, &signature) {
            Ok(url) => url,
            Err(e) => {
                warn!("📮️ Could not build a label link from base URL {}. {e}", self.base_url);
                return None;
            },
        };
        trace!("📮️ Signed label link for {path}, valid until {expires_at}");
        Some(SignedLabelUrl { url, expires_at })
    }
}
