//! Wire message shapes for the path-addressed RPC protocol.
//!
//! The shapes are fixed for interop: a request is `{p, a, s?}` and a
//! response is `{s?, v}` or `{s?, e}`. Transfer hints never ride inside
//! the payload; they accompany it out of band via [`Envelope`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Correlation id embedded in a request and echoed in its response.
///
/// Zero is never issued; an absent/zero session means "no response
/// expected".
pub type SessionId = u64;

/// Process-lifetime session id source: strictly increasing, starting at 1.
#[derive(Debug)]
pub struct SessionCounter(AtomicU64);

impl SessionCounter {
	/// Creates a counter whose first issued id is 1.
	#[must_use]
	pub const fn new() -> Self {
		Self(AtomicU64::new(1))
	}

	/// Issues the next unique session id.
	pub fn next(&self) -> SessionId {
		self.0.fetch_add(1, Ordering::Relaxed)
	}
}

impl Default for SessionCounter {
	fn default() -> Self {
		Self::new()
	}
}

/// One step of a remote member path: a property name or a numeric index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathKey {
	/// Numeric index key.
	Index(u64),
	/// Property name key.
	Name(String),
}

impl fmt::Display for PathKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Index(index) => write!(f, "{index}"),
			Self::Name(name) => f.write_str(name),
		}
	}
}

impl From<&str> for PathKey {
	fn from(name: &str) -> Self {
		Self::Name(name.to_owned())
	}
}

impl From<String> for PathKey {
	fn from(name: String) -> Self {
		Self::Name(name)
	}
}

impl From<u64> for PathKey {
	fn from(index: u64) -> Self {
		Self::Index(index)
	}
}

/// A remote invocation: member path, arguments, optional session id.
///
/// `path` is stored innermost-first — the invoked member is `path[0]` and
/// later entries are its enclosing namespaces in access order, so a client
/// chain `client.foo.bar(...)` produces `["bar", "foo"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
	/// Member path, innermost key first.
	#[serde(rename = "p")]
	pub path: Vec<PathKey>,
	/// Positional arguments.
	#[serde(rename = "a", default)]
	pub args: Vec<Value>,
	/// Correlation id; absent for fire-and-forget sends.
	#[serde(rename = "s", default, skip_serializing_if = "Option::is_none")]
	pub session: Option<SessionId>,
}

impl Request {
	/// Creates a request with no session id assigned yet.
	#[must_use]
	pub fn new(path: Vec<PathKey>, args: Vec<Value>) -> Self {
		Self {
			path,
			args,
			session: None,
		}
	}

	/// Renders the path in access order (`outer.inner.method`) for
	/// diagnostics.
	#[must_use]
	pub fn path_display(&self) -> String {
		let mut rendered = String::new();
		for key in self.path.iter().rev() {
			if !rendered.is_empty() {
				rendered.push('.');
			}
			rendered.push_str(&key.to_string());
		}
		rendered
	}
}

/// Result of one remote invocation: exactly one of `v` (success) or `e`
/// (failure).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
	/// Successful return value.
	#[serde(rename = "v")]
	Value(Value),
	/// Error value, propagated verbatim.
	#[serde(rename = "e")]
	Error(Value),
}

impl Outcome {
	/// Returns true for the error arm.
	#[must_use]
	pub fn is_error(&self) -> bool {
		matches!(self, Self::Error(_))
	}
}

/// A reply to a [`Request`], correlated by session id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
	/// Echo of the request's session id, when it had one.
	#[serde(rename = "s", default, skip_serializing_if = "Option::is_none")]
	pub session: Option<SessionId>,
	/// Success or failure payload.
	#[serde(flatten)]
	pub outcome: Outcome,
}

impl Response {
	/// Creates a success response.
	#[must_use]
	pub fn ok(session: Option<SessionId>, value: Value) -> Self {
		Self {
			session,
			outcome: Outcome::Value(value),
		}
	}

	/// Creates an error response.
	#[must_use]
	pub fn err(session: Option<SessionId>, error: Value) -> Self {
		Self {
			session,
			outcome: Outcome::Error(error),
		}
	}
}

/// A message plus the transport-specific transferable resources that
/// accompany it outside the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<M, H> {
	/// The wire message.
	pub message: M,
	/// Transferable resources handed off next to the message.
	pub transfer: Vec<H>,
}

impl<M, H> Envelope<M, H> {
	/// Wraps a message with no transfer list.
	#[must_use]
	pub fn new(message: M) -> Self {
		Self {
			message,
			transfer: Vec::new(),
		}
	}

	/// Wraps a message with an explicit transfer list.
	#[must_use]
	pub fn with_transfer(message: M, transfer: Vec<H>) -> Self {
		Self { message, transfer }
	}
}
