use crate::error::DeliveryError;
use crate::ports;
use crate::types::push::Subscription;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::{Barrier, oneshot};

#[derive(Clone)]
pub(crate) struct TestTime {
    now: Arc<Mutex<OffsetDateTime>>,
    sleeps: Arc<Mutex<Vec<oneshot::Sender<()>>>>,
    durations: Arc<Mutex<Vec<Duration>>>,
}

impl TestTime {
    pub(crate) fn new(now: OffsetDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
            durations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn set_now(&self, now: OffsetDateTime) {
        *self.now.lock().expect("now lock") = now;
    }

    pub(crate) fn sleep_durations(&self) -> Vec<Duration> {
        self.durations.lock().expect("durations lock").clone()
    }

    pub(crate) fn trigger_all(&self) {
        let mut sends = self.sleeps.lock().expect("sleeps lock");
        for sender in sends.drain(..) {
            let _ = sender.send(());
        }
    }
}

pub(crate) struct ManualSleep {
    receiver: oneshot::Receiver<()>,
}

impl Future for ManualSleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(_) => Poll::Ready(()),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl ports::TimeProvider for TestTime {
    type Sleep<'a>
        = ManualSleep
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        *self.now.lock().expect("now lock")
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        let (sender, receiver) = oneshot::channel();
        self.durations
            .lock()
            .expect("durations lock")
            .push(duration);
        self.sleeps.lock().expect("sleeps lock").push(sender);
        ManualSleep { receiver }
    }
}

/// Records every delivery attempt; endpoints registered with `fail_with`
/// return the given error instead of succeeding.
#[derive(Clone, Default)]
pub(crate) struct TestSender {
    pub(crate) sent: Arc<Mutex<Vec<(String, String)>>>,
    failures: Arc<Mutex<HashMap<String, DeliveryError>>>,
}

impl TestSender {
    pub(crate) fn fail_with(&self, endpoint: &str, error: DeliveryError) {
        self.failures
            .lock()
            .expect("failures lock")
            .insert(endpoint.to_string(), error);
    }

    pub(crate) fn endpoints(&self) -> Vec<String> {
        let mut endpoints: Vec<String> = self
            .sent
            .lock()
            .expect("sent lock")
            .iter()
            .map(|(endpoint, _)| endpoint.clone())
            .collect();
        endpoints.sort();
        endpoints
    }
}

impl ports::PushSender for TestSender {
    type Fut<'a>
        = std::future::Ready<Result<(), DeliveryError>>
    where
        Self: 'a;

    fn send<'a>(&'a self, subscription: &'a Subscription, message: &'a str) -> Self::Fut<'a> {
        self.sent
            .lock()
            .expect("sent lock")
            .push((subscription.endpoint.clone(), message.to_string()));
        let failure = self
            .failures
            .lock()
            .expect("failures lock")
            .get(&subscription.endpoint)
            .cloned();
        std::future::ready(match failure {
            Some(err) => Err(err),
            None => Ok(()),
        })
    }
}

/// Every send waits on a shared barrier, so a batch only completes when all of
/// its sends are in flight at the same time.
#[derive(Clone)]
pub(crate) struct BarrierSender {
    barrier: Arc<Barrier>,
}

impl BarrierSender {
    pub(crate) fn new(sends: usize) -> Self {
        Self {
            barrier: Arc::new(Barrier::new(sends)),
        }
    }
}

impl ports::PushSender for BarrierSender {
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + 'a>>
    where
        Self: 'a;

    fn send<'a>(&'a self, _subscription: &'a Subscription, _message: &'a str) -> Self::Fut<'a> {
        Box::pin(async move {
            self.barrier.wait().await;
            Ok(())
        })
    }
}

pub(crate) fn subscription(endpoint: &str) -> Subscription {
    Subscription::new(endpoint, "p256", "auth")
}
