//! Request/response correlation over fire-and-forget channels.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use crate::message::{SessionCounter, SessionId};
use crate::{Error, Result};

/// Turns a one-way publish step into a request/response facility.
///
/// Each [`request`](Self::request) registers a pending session under a
/// fresh id, publishes through the caller-supplied closure, and resolves
/// when [`receive`](Self::receive) is fed a message carrying that id — or
/// rejects with [`Error::RequestTimeout`] when the window elapses first.
///
/// Sessions leave the pending map exactly once: on resolution, on
/// timeout, or when the publish step itself fails. Responses may arrive
/// in any order relative to their requests.
pub struct Correlator<R> {
	pending: Mutex<HashMap<SessionId, oneshot::Sender<R>>>,
	ids: SessionCounter,
	timeout: Option<Duration>,
}

impl<R> Correlator<R> {
	/// Creates a correlator whose requests expire after `timeout`.
	///
	/// A zero duration disables expiry entirely, same as
	/// [`without_timeout`](Self::without_timeout).
	#[must_use]
	pub fn new(timeout: Duration) -> Self {
		Self {
			pending: Mutex::new(HashMap::new()),
			ids: SessionCounter::new(),
			timeout: (!timeout.is_zero()).then_some(timeout),
		}
	}

	/// Creates a correlator whose requests wait indefinitely.
	#[must_use]
	pub fn without_timeout() -> Self {
		Self::new(Duration::ZERO)
	}

	/// Returns the number of in-flight sessions.
	#[must_use]
	pub fn pending(&self) -> usize {
		self.pending.lock().len()
	}

	/// Publishes a request stamped with a fresh session id and awaits its
	/// correlated response.
	///
	/// The session is registered *before* `publish` runs, so a response
	/// delivered from inside the publish call still correlates. If
	/// `publish` fails, the session is cancelled immediately and the error
	/// is returned through the same future the caller is already awaiting;
	/// publish-time and response-time failures surface on one path.
	pub async fn request<F, Fut>(&self, publish: F) -> Result<R>
	where
		F: FnOnce(SessionId) -> Fut,
		Fut: Future<Output = Result<()>>,
	{
		let id = self.ids.next();
		let (resolve, resolved) = oneshot::channel();
		self.pending.lock().insert(id, resolve);

		if let Err(err) = publish(id).await {
			self.cancel(id);
			return Err(err);
		}

		let response = match self.timeout {
			Some(window) => match tokio::time::timeout(window, resolved).await {
				Ok(result) => result,
				Err(_) => {
					self.cancel(id);
					debug!(session = id, window = ?window, "request timed out");
					return Err(Error::RequestTimeout(window));
				}
			},
			None => resolved.await,
		};
		response.map_err(|_| {
			self.cancel(id);
			Error::ChannelClosed
		})
	}

	/// Resolves the pending session matching `id` with `message`.
	///
	/// Late, duplicate, or foreign ids are a silent no-op. Returns whether
	/// a session was resolved.
	pub fn receive(&self, id: SessionId, message: R) -> bool {
		match self.pending.lock().remove(&id) {
			Some(resolve) => resolve.send(message).is_ok(),
			None => {
				debug!(session = id, "dropping uncorrelated response");
				false
			}
		}
	}

	fn cancel(&self, id: SessionId) {
		self.pending.lock().remove(&id);
	}
}
