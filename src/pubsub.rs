//! In-process publish/subscribe relay used to push freshly created alerts and
//! notifications to live subscribers.
//!
//! Delivery is at-most-once and memory-only. A subscriber only sees events
//! published while it is registered, in publish order. Subscribers that fall
//! more than the channel capacity behind skip the overwritten events instead
//! of slowing down the publisher.

use dashmap::DashMap;
use futures_util::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, warn};

pub const NEW_ALERT_TOPIC: &str = "newAlert";
pub const NEW_NOTIFICATION_TOPIC: &str = "newNotification";

const DEFAULT_CAPACITY: usize = 256;

type Filter<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

pub struct PubSub<T> {
    topics: DashMap<String, broadcast::Sender<T>>,
    capacity: usize,
}

impl<T: Clone + Send + 'static> Default for PubSub<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<T: Clone + Send + 'static> PubSub<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Hands `payload` to every current subscriber of `topic` and returns how
    /// many subscribers it reached. No subscribers is not an error. A topic
    /// whose subscribers are all gone is dropped from the registry.
    pub fn publish(&self, topic: &str, payload: T) -> usize {
        let sent = match self.topics.get(topic) {
            Some(sender) => sender.send(payload),
            None => {
                debug!(topic, "Publish on a topic nobody subscribed to.");
                return 0;
            }
        };
        match sent {
            Ok(receivers) => receivers,
            Err(_) => {
                self.topics.remove_if(topic, |_, sender| sender.receiver_count() == 0);
                debug!(topic, "Publish with no active subscribers.");
                0
            }
        }
    }

    pub fn subscribe(&self, topic: &str) -> Subscription<T> {
        let receiver = self
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        Subscription {
            topic: topic.to_string(),
            stream: Some(BroadcastStream::new(receiver)),
            filter: None,
        }
    }

    /// Like [`PubSub::subscribe`], yielding only payloads accepted by `filter`.
    pub fn subscribe_filtered<F>(&self, topic: &str, filter: F) -> Subscription<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let mut subscription = self.subscribe(topic);
        subscription.filter = Some(Box::new(filter));
        subscription
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Number of topics currently registered.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

/// A live registration on one topic. Dropping it, or calling
/// [`Subscription::cancel`], unsubscribes.
pub struct Subscription<T> {
    topic: String,
    stream: Option<BroadcastStream<T>>,
    filter: Option<Filter<T>>,
}

impl<T> Subscription<T> {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn cancel(&mut self) {
        self.stream = None;
    }

    pub fn is_cancelled(&self) -> bool {
        self.stream.is_none()
    }
}

impl<T: Clone + Send + 'static> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = self.get_mut();
        loop {
            let Some(stream) = this.stream.as_mut() else {
                return Poll::Ready(None);
            };
            match Pin::new(stream).poll_next(cx) {
                Poll::Ready(Some(Ok(payload))) => {
                    let accepted = this.filter.as_ref().is_none_or(|filter| filter(&payload));
                    if accepted {
                        return Poll::Ready(Some(payload));
                    }
                }
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    warn!(topic = %this.topic, skipped, "Subscriber lagged behind, events dropped.");
                }
                Poll::Ready(None) => {
                    this.stream = None;
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
