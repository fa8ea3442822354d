use base64::{URL_SAFE_NO_PAD, encode_config};
use jwt_simple::prelude::ES256KeyPair;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::adapters::{ConfiguredSender, WebPushSender};
use crate::config;
use crate::types::push::VapidConfig;

#[derive(Debug, Clone)]
pub struct VapidCredentials {
    pub private_key: String,
    pub public_key: String,
}

#[derive(Debug, Clone)]
pub enum VapidConfigStatus {
    Missing,
    Incomplete,
    Ready(VapidConfig),
}

/// All three VAPID settings or none; anything in between is `Incomplete`.
pub fn load_vapid_config(config: &config::AppConfig) -> VapidConfigStatus {
    let private_key = non_blank(config.vapid_private_key.as_deref());
    let public_key = non_blank(config.vapid_public_key.as_deref());
    let subject = non_blank(config.vapid_subject.as_deref());
    let has_any = private_key.is_some() || public_key.is_some() || subject.is_some();

    match (private_key, public_key, subject) {
        (Some(private_key), Some(public_key), Some(subject)) => {
            VapidConfigStatus::Ready(VapidConfig {
                private_key: private_key.to_string(),
                public_key: public_key.to_string(),
                subject: subject.to_string(),
            })
        }
        _ if has_any => VapidConfigStatus::Incomplete,
        _ => VapidConfigStatus::Missing,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Push sender for the configured credentials; falls back to a disabled
/// sender (logged) so the rest of the service keeps running.
pub fn sender_from_config(config: &config::AppConfig) -> ConfiguredSender {
    let vapid = match load_vapid_config(config) {
        VapidConfigStatus::Ready(vapid) => vapid,
        VapidConfigStatus::Incomplete => {
            tracing::warn!("push notifications disabled: incomplete VAPID configuration");
            return ConfiguredSender::Disabled;
        }
        VapidConfigStatus::Missing => {
            tracing::info!("push notifications disabled: no VAPID configuration");
            return ConfiguredSender::Disabled;
        }
    };

    match WebPushSender::new(vapid) {
        Ok(sender) => ConfiguredSender::WebPush(sender),
        Err(err) => {
            tracing::error!(error = %err, "push notifications disabled: failed to init web-push");
            ConfiguredSender::Disabled
        }
    }
}

pub fn generate_vapid_credentials() -> Result<VapidCredentials, web_push::WebPushError> {
    let mut rng = OsRng;
    generate_vapid_credentials_with_rng(&mut rng)
}

pub(crate) fn generate_vapid_credentials_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> Result<VapidCredentials, web_push::WebPushError> {
    let key_pair = generate_es256_keypair_with_rng(rng);
    let private_key = encode_config(key_pair.to_bytes(), URL_SAFE_NO_PAD);
    let public_key =
        web_push::VapidSignatureBuilder::from_base64_no_sub(&private_key, URL_SAFE_NO_PAD)?
            .get_public_key();
    let public_key = encode_config(public_key, URL_SAFE_NO_PAD);

    Ok(VapidCredentials {
        private_key,
        public_key,
    })
}

fn generate_es256_keypair_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> ES256KeyPair {
    let mut key_bytes = [0u8; 32];
    loop {
        rng.fill_bytes(&mut key_bytes);
        if let Ok(key_pair) = ES256KeyPair::from_bytes(&key_bytes) {
            return key_pair;
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn config_with(
        private_key: Option<&str>,
        public_key: Option<&str>,
        subject: Option<&str>,
    ) -> config::AppConfig {
        config::AppConfig {
            vapid_private_key: private_key.map(str::to_string),
            vapid_public_key: public_key.map(str::to_string),
            vapid_subject: subject.map(str::to_string),
            ..config::AppConfig::default()
        }
    }

    #[test]
    fn load_vapid_config__should_be_missing_without_settings() {
        let status = load_vapid_config(&config_with(None, None, Some("  ")));

        assert!(matches!(status, VapidConfigStatus::Missing));
    }

    #[test]
    fn load_vapid_config__should_be_incomplete_with_partial_settings() {
        let status = load_vapid_config(&config_with(Some("private"), None, None));

        assert!(matches!(status, VapidConfigStatus::Incomplete));
    }

    #[test]
    fn load_vapid_config__should_be_ready_with_all_settings() {
        let status = load_vapid_config(&config_with(
            Some("private"),
            Some("public"),
            Some("mailto:ops@example.com"),
        ));

        let VapidConfigStatus::Ready(vapid) = status else {
            panic!("expected ready configuration");
        };
        assert_eq!(vapid.subject, "mailto:ops@example.com");
    }

    #[test]
    fn sender_from_config__should_disable_without_credentials() {
        let sender = sender_from_config(&config::AppConfig::default());

        assert!(matches!(sender, ConfiguredSender::Disabled));
    }

    #[test]
    fn generate_vapid_credentials_with_rng__should_return_expected_fixture() {
        // Given
        let seed = [7u8; 32];
        let mut rng = StdRng::from_seed(seed);

        // When
        let credentials =
            generate_vapid_credentials_with_rng(&mut rng).expect("credentials should generate");

        // Then
        assert_eq!(
            credentials.private_key,
            "9pKJeIXAyyCj5M0QagsVvDYHlPF-cymJCbB5iHPsdEE"
        );
        assert_eq!(
            credentials.public_key,
            "BCRweRf_U5iQM4pKNucGRzM6OuLp8Hisa8yX0N2ePIf1oxKitvFT6qvuGgYoTxlMatMDaytXbZR3rVClc2w_p6U"
        );
    }
}
