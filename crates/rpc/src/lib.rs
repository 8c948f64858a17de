//! Path-addressed RPC over pluggable message channels.
//!
//! This crate provides the pieces for invoking members of a remote object
//! graph by path, with request/response correlation and transferable-
//! resource tracking:
//!
//! * [`RemoteHandle`]: client-side path accumulation and invocation.
//! * [`serve`]/[`Target`]: server-side dispatch over a namespace/method
//!   graph; every failure folds into an error-tagged response.
//! * [`Correlator`]: pairs responses with requests over one-way channels,
//!   with timeout-based expiry.
//! * [`Transport`]/[`Publish`]: the two channel shapes, bridged by
//!   [`CorrelatedTransport`]; [`LocalTransport`] is the in-process case.
//! * [`TransferTable`]: weak, identity-keyed association from values to
//!   the transferable resources that should accompany them.
//!
//! Wire shapes are fixed for interop: requests are `{p, a, s?}`,
//! responses `{s?, v|e}`, and transfer lists ride beside the payload in
//! an [`Envelope`], never inside it.

#![warn(missing_docs)]

use std::time::Duration;

use serde_json::Value;

pub mod client;
pub mod correlate;
pub mod message;
pub mod serve;
pub mod transfer;
pub mod transport;

pub use client::RemoteHandle;
pub use correlate::Correlator;
pub use message::{Envelope, Outcome, PathKey, Request, Response, SessionCounter, SessionId};
pub use serve::{Method, MethodFuture, Reply, Target, serve};
pub use transfer::TransferTable;
pub use transport::{CorrelatedTransport, LocalTransport, Publish, Transport};

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// No response arrived within the configured window. Distinguishable
	/// from remote failures so callers can retry.
	#[error("request timed out after {0:?}")]
	RequestTimeout(Duration),
	/// The underlying channel failed to carry the message.
	#[error("transport error: {0}")]
	Transport(String),
	/// The remote side replied with an error; the payload is carried
	/// verbatim in `data`.
	#[error("{message}")]
	Remote {
		/// Human-readable message extracted from the payload.
		message: String,
		/// The error value exactly as it crossed the wire.
		data: Value,
	},
	/// The correlation session was dropped before a response arrived.
	#[error("correlation session closed before a response arrived")]
	ChannelClosed,
	/// An argument could not be serialized for the wire.
	#[error("serialization failed: {0}")]
	Serialize(String),
	/// The peer replied with an undecodable value.
	#[error("deserialization failed: {0}")]
	Deserialize(String),
}

impl Error {
	/// Wraps a wire error value, extracting a display message from a
	/// string payload or an object's `"message"` field.
	#[must_use]
	pub fn remote(data: Value) -> Self {
		let message = match &data {
			Value::String(message) => message.clone(),
			Value::Object(fields) => match fields.get("message").and_then(Value::as_str) {
				Some(message) => message.to_owned(),
				None => data.to_string(),
			},
			other => other.to_string(),
		};
		Self::Remote { message, data }
	}

	/// Returns the verbatim remote error payload, if this is a remote
	/// failure.
	#[must_use]
	pub fn remote_data(&self) -> Option<&Value> {
		match self {
			Self::Remote { data, .. } => Some(data),
			_ => None,
		}
	}

	/// Returns true for timeout failures.
	#[must_use]
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::RequestTimeout(_))
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Self::Deserialize(err.to_string())
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn remote_error_message_from_string_payload() {
		let err = Error::remote(json!("boom"));
		assert_eq!(err.to_string(), "boom");
		assert_eq!(err.remote_data(), Some(&json!("boom")));
	}

	#[test]
	fn remote_error_message_from_object_payload() {
		let err = Error::remote(json!({"message": "bad input", "code": 3}));
		assert_eq!(err.to_string(), "bad input");
		assert_eq!(err.remote_data(), Some(&json!({"message": "bad input", "code": 3})));
	}

	#[test]
	fn remote_error_message_falls_back_to_json_text() {
		let err = Error::remote(json!(17));
		assert_eq!(err.to_string(), "17");
	}

	#[test]
	fn timeout_is_distinguishable() {
		let err = Error::RequestTimeout(Duration::from_millis(100));
		assert!(err.is_timeout());
		assert!(!Error::remote(json!("boom")).is_timeout());
	}
}
