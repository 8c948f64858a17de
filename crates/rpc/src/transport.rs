//! Channel shapes the client proxy can run over.
//!
//! Two shapes are supported: a two-way [`Transport`] whose send resolves
//! directly with the response, and a one-way [`Publish`] adapted into a
//! transport by [`CorrelatedTransport`], which pairs responses fed in via
//! an out-of-band subscription with their originating requests.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::Result;
use crate::correlate::Correlator;
use crate::message::{Envelope, Request, Response};
use crate::serve::{Target, serve};

/// Two-way request/response channel.
pub trait Transport: Send + Sync {
	/// Transport-specific transferable resource handle.
	type Transfer: Send + 'static;

	/// Sends a request and resolves with its response.
	fn send(
		&self,
		envelope: Envelope<Request, Self::Transfer>,
	) -> impl Future<Output = Result<Response>> + Send;

	/// Fire-and-forget send: resolves once the message has been handed to
	/// the channel, with no response expected.
	fn notify(
		&self,
		envelope: Envelope<Request, Self::Transfer>,
	) -> impl Future<Output = Result<()>> + Send {
		async { self.send(envelope).await.map(drop) }
	}
}

/// One-way publish half of a split channel.
pub trait Publish: Send + Sync {
	/// Transport-specific transferable resource handle.
	type Transfer: Send + 'static;

	/// Publishes a message; resolving means the send side effect
	/// completed, nothing more.
	fn publish(
		&self,
		envelope: Envelope<Request, Self::Transfer>,
	) -> impl Future<Output = Result<()>> + Send;
}

/// Adapts a one-way [`Publish`] plus an out-of-band response feed into a
/// two-way [`Transport`].
///
/// Outgoing requests are stamped with a fresh session id; responses
/// handed to [`deliver`](Self::deliver) resolve the matching in-flight
/// send. Requests expire after the configured timeout.
pub struct CorrelatedTransport<P> {
	publish: P,
	correlator: Correlator<Response>,
}

impl<P: Publish> CorrelatedTransport<P> {
	/// Creates an adapter whose requests expire after `timeout` (zero
	/// disables expiry).
	pub fn new(publish: P, timeout: Duration) -> Self {
		Self {
			publish,
			correlator: Correlator::new(timeout),
		}
	}

	/// Creates an adapter whose requests wait indefinitely.
	pub fn without_timeout(publish: P) -> Self {
		Self::new(publish, Duration::ZERO)
	}

	/// Feeds a response received through the out-of-band subscription.
	///
	/// Responses without a session id, or whose session is unknown (late,
	/// duplicate, or foreign), are dropped. Returns whether an in-flight
	/// send was resolved.
	pub fn deliver(&self, response: Response) -> bool {
		match response.session {
			Some(id) => self.correlator.receive(id, response),
			None => {
				debug!("dropping response without session id");
				false
			}
		}
	}

	/// Returns the number of in-flight requests.
	pub fn pending(&self) -> usize {
		self.correlator.pending()
	}
}

impl<P: Publish> Transport for CorrelatedTransport<P> {
	type Transfer = P::Transfer;

	async fn send(&self, mut envelope: Envelope<Request, P::Transfer>) -> Result<Response> {
		self.correlator
			.request(|id| {
				envelope.message.session = Some(id);
				self.publish.publish(envelope)
			})
			.await
	}

	async fn notify(&self, envelope: Envelope<Request, P::Transfer>) -> Result<()> {
		// No session id: nothing will ever correlate back.
		self.publish.publish(envelope).await
	}
}

/// In-process transport that dispatches straight into a served target
/// graph: the built-in same-process channel.
pub struct LocalTransport<H> {
	target: Target<H>,
}

impl<H: Send + 'static> LocalTransport<H> {
	/// Wraps a target graph as a two-way transport.
	pub fn new(target: Target<H>) -> Self {
		Self { target }
	}
}

impl<H: Send + 'static> Transport for LocalTransport<H> {
	type Transfer = H;

	async fn send(&self, envelope: Envelope<Request, H>) -> Result<Response> {
		// Same process: nothing to move between contexts, so transfer
		// hints on either side end here.
		Ok(serve(&self.target, envelope.message).await.message)
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::message::Outcome;

	#[tokio::test]
	async fn deliver_drops_sessionless_responses() {
		struct Sink;
		impl Publish for Sink {
			type Transfer = ();
			async fn publish(&self, _envelope: Envelope<Request, ()>) -> Result<()> {
				Ok(())
			}
		}

		let transport = CorrelatedTransport::without_timeout(Sink);
		assert!(!transport.deliver(Response::ok(None, json!(1))));
		assert!(!transport.deliver(Response::ok(Some(99), json!(1))));
		assert_eq!(transport.pending(), 0);
	}

	#[tokio::test]
	async fn local_transport_serves_in_process() {
		let target: Target<()> = Target::namespace().with(
			"ping",
			Target::method(|_args| async { Ok(json!("pong")) }),
		);
		let transport = LocalTransport::new(target);

		let request = Request::new(vec!["ping".into()], Vec::new());
		let response = transport.send(Envelope::new(request)).await.unwrap();
		assert_eq!(response.outcome, Outcome::Value(json!("pong")));
	}
}
