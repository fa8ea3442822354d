use crate::error::DeliveryError;
use crate::types::push::Subscription;

/// Delivers one already-serialized payload to one subscription.
///
/// Implementations classify every failure into a [`DeliveryError`]; they must
/// not panic on provider errors.
pub trait PushSender: Clone + Send + Sync + 'static {
    type Fut<'a>: Future<Output = Result<(), DeliveryError>> + Send + 'a
    where
        Self: 'a;

    fn send<'a>(&'a self, subscription: &'a Subscription, message: &'a str) -> Self::Fut<'a>;
}
