use std::future::{Ready, ready};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use crate::error::DeliveryError;
use crate::ports;
use crate::types::push::{Subscription, VapidConfig};

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimeProvider;

impl ports::TimeProvider for TokioTimeProvider {
    type Sleep<'a>
        = tokio::time::Sleep
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        tokio::time::sleep(duration)
    }
}

#[derive(Clone)]
pub struct WebPushSender {
    vapid: VapidConfig,
    client: Arc<web_push::WebPushClient>,
}

impl WebPushSender {
    pub fn new(vapid: VapidConfig) -> Result<Self, web_push::WebPushError> {
        let client = web_push::WebPushClient::new()?;
        Ok(Self {
            vapid,
            client: Arc::new(client),
        })
    }

    async fn try_send(
        &self,
        subscription: &Subscription,
        message: &str,
    ) -> Result<(), web_push::WebPushError> {
        let subscription_info = web_push::SubscriptionInfo::new(
            subscription.endpoint.clone(),
            subscription.keys.p256dh.clone(),
            subscription.keys.auth.clone(),
        );
        let mut builder = web_push::WebPushMessageBuilder::new(&subscription_info)?;
        builder.set_payload(web_push::ContentEncoding::Aes128Gcm, message.as_bytes());
        let mut signature_builder = web_push::VapidSignatureBuilder::from_base64(
            &self.vapid.private_key,
            web_push::URL_SAFE_NO_PAD,
            &subscription_info,
        )?;
        signature_builder.add_claim("sub", self.vapid.subject.as_str());
        builder.set_vapid_signature(signature_builder.build()?);
        self.client.send(builder.build()?).await
    }
}

/// Maps provider errors onto the delivery failure classes. 404/410 from the
/// push service surface as `EndpointNotFound`/`EndpointNotValid`.
pub(crate) fn classify_web_push_error(err: &web_push::WebPushError) -> DeliveryError {
    use web_push::WebPushError;

    let reason = err.to_string();
    match err {
        WebPushError::EndpointNotFound { .. } | WebPushError::EndpointNotValid { .. } => {
            DeliveryError::Expired(reason)
        }
        WebPushError::ServerError { .. } | WebPushError::Unspecified { .. } => {
            DeliveryError::Transient(reason)
        }
        _ => DeliveryError::Other(reason),
    }
}

impl ports::PushSender for WebPushSender {
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + 'a>>
    where
        Self: 'a;

    fn send<'a>(&'a self, subscription: &'a Subscription, message: &'a str) -> Self::Fut<'a> {
        Box::pin(async move {
            self.try_send(subscription, message)
                .await
                .map_err(|err| classify_web_push_error(&err))
        })
    }
}

/// The sender the server runs with: web push when VAPID credentials are
/// configured, otherwise every send fails fast without touching the network.
#[derive(Clone)]
pub enum ConfiguredSender {
    WebPush(WebPushSender),
    Disabled,
}

impl ports::PushSender for ConfiguredSender {
    type Fut<'a>
        = futures::future::Either<
        <WebPushSender as ports::PushSender>::Fut<'a>,
        Ready<Result<(), DeliveryError>>,
    >
    where
        Self: 'a;

    fn send<'a>(&'a self, subscription: &'a Subscription, message: &'a str) -> Self::Fut<'a> {
        match self {
            ConfiguredSender::WebPush(sender) => {
                futures::future::Either::Left(sender.send(subscription, message))
            }
            ConfiguredSender::Disabled => futures::future::Either::Right(ready(Err(
                DeliveryError::Other("push delivery is not configured".to_string()),
            ))),
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::ports::PushSender;

    #[test]
    fn classify_web_push_error__should_separate_transient_from_other() {
        assert!(matches!(
            classify_web_push_error(&web_push::WebPushError::Unspecified),
            DeliveryError::Transient(_)
        ));
        assert!(matches!(
            classify_web_push_error(&web_push::WebPushError::InvalidUri),
            DeliveryError::Other(_)
        ));
    }

    #[tokio::test]
    async fn configured_sender__should_fail_when_disabled() {
        // Given
        let sender = ConfiguredSender::Disabled;
        let subscription = Subscription::new("https://push.example/1", "p256", "auth");

        // When
        let result = sender.send(&subscription, "{}").await;

        // Then
        assert!(matches!(result, Err(DeliveryError::Other(_))));
    }
}
