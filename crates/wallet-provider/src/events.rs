//! Event hub for provider lifecycle events.
//!
//! Providers own a [`ProviderEvents`] hub and hand out [`EventSubscription`]
//! handles. A subscription only sees events emitted after it was created, so
//! consumers subscribe before enabling the provider.

use tokio::sync::broadcast;
use wallet_types::ProviderEvent;

/// Broadcast hub shared by a provider and its background tasks.
#[derive(Clone)]
pub struct ProviderEvents {
	sender: broadcast::Sender<ProviderEvent>,
}

impl ProviderEvents {
	/// Creates a hub buffering up to `capacity` events per subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Registers a new listener.
	pub fn subscribe(&self) -> EventSubscription {
		EventSubscription {
			receiver: self.sender.subscribe(),
		}
	}

	/// Delivers an event to every live subscription and returns how many
	/// received it. Emitting with no listeners is not an error.
	pub fn emit(&self, event: ProviderEvent) -> usize {
		tracing::debug!(event = event.name(), "Emitting provider event");
		self.sender.send(event).unwrap_or(0)
	}

	/// Number of live subscriptions.
	pub fn subscriber_count(&self) -> usize {
		self.sender.receiver_count()
	}
}

impl Default for ProviderEvents {
	fn default() -> Self {
		Self::new(32)
	}
}

impl std::fmt::Debug for ProviderEvents {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ProviderEvents")
			.field("subscribers", &self.subscriber_count())
			.finish()
	}
}

/// Listener handle returned by [`ProviderEvents::subscribe`].
#[derive(Debug)]
pub struct EventSubscription {
	receiver: broadcast::Receiver<ProviderEvent>,
}

impl EventSubscription {
	/// Waits for the next event. Returns `None` once the provider dropped its
	/// hub. If the listener fell behind, the skipped events are logged and
	/// the oldest retained event is returned.
	pub async fn recv(&mut self) -> Option<ProviderEvent> {
		loop {
			match self.receiver.recv().await {
				Ok(event) => return Some(event),
				Err(broadcast::error::RecvError::Lagged(skipped)) => {
					tracing::warn!(skipped, "Provider event listener lagged");
				},
				Err(broadcast::error::RecvError::Closed) => return None,
			}
		}
	}

	/// Returns an already queued event without waiting.
	pub fn try_recv(&mut self) -> Option<ProviderEvent> {
		loop {
			match self.receiver.try_recv() {
				Ok(event) => return Some(event),
				Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
				Err(_) => return None,
			}
		}
	}

	/// Releases the subscription.
	pub fn unsubscribe(self) {}
}
