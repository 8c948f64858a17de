//! Client-side path-accumulating proxy handle.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::message::{Envelope, Outcome, PathKey, Request};
use crate::transfer::TransferTable;
use crate::transport::Transport;
use crate::{Error, Result};

/// A handle to "the remote value reachable via the accumulated path".
///
/// [`member`](Self::member) descends one step without touching the
/// network; the `call` family performs exactly one round trip per
/// invocation. The path is accumulated innermost-first — each `member`
/// prepends its key — so `root.member("foo").member("bar")` addresses
/// wire path `["bar", "foo"]`, the inverse of the server-side walk.
///
/// Handles are cheap to clone and share one transport and one
/// [`TransferTable`].
pub struct RemoteHandle<T: Transport> {
	transport: Arc<T>,
	transfers: Arc<TransferTable<T::Transfer>>,
	path: Vec<PathKey>,
}

impl<T: Transport> Clone for RemoteHandle<T> {
	fn clone(&self) -> Self {
		Self {
			transport: Arc::clone(&self.transport),
			transfers: Arc::clone(&self.transfers),
			path: self.path.clone(),
		}
	}
}

impl<T: Transport> RemoteHandle<T> {
	/// Creates a handle addressing the remote root.
	pub fn root(transport: impl Into<Arc<T>>) -> Self {
		Self {
			transport: transport.into(),
			transfers: Arc::new(TransferTable::new()),
			path: Vec::new(),
		}
	}

	/// Returns a handle one member deeper. Pure: no I/O happens until a
	/// call.
	#[must_use]
	pub fn member(&self, key: impl Into<PathKey>) -> Self {
		let mut path = Vec::with_capacity(self.path.len() + 1);
		path.push(key.into());
		path.extend(self.path.iter().cloned());
		Self {
			transport: Arc::clone(&self.transport),
			transfers: Arc::clone(&self.transfers),
			path,
		}
	}

	/// The accumulated wire path, innermost key first.
	pub fn path(&self) -> &[PathKey] {
		&self.path
	}

	/// The transfer-association table shared by all handles cloned from
	/// the same root.
	pub fn transfers(&self) -> &TransferTable<T::Transfer> {
		&self.transfers
	}

	/// Invokes the addressed member and resolves with its unwrapped
	/// return value; a failure response rejects with the carried error
	/// value via [`Error::Remote`].
	pub async fn call(&self, args: Vec<Value>) -> Result<Value> {
		self.call_with_transfer(args, Vec::new()).await
	}

	/// Like [`call`](Self::call), with an explicit transfer list carried
	/// beside the request.
	pub async fn call_with_transfer(
		&self,
		args: Vec<Value>,
		transfer: Vec<T::Transfer>,
	) -> Result<Value> {
		let request = Request::new(self.path.clone(), args);
		let response = self
			.transport
			.send(Envelope::with_transfer(request, transfer))
			.await?;
		match response.outcome {
			Outcome::Value(value) => Ok(value),
			Outcome::Error(error) => Err(Error::remote(error)),
		}
	}

	/// Invokes with shared arguments, collecting each argument's transfer
	/// hints from the handle's [`TransferTable`] by identity.
	pub async fn call_shared<V>(&self, args: &[Arc<V>]) -> Result<Value>
	where
		V: Serialize + Send + Sync + 'static,
		T::Transfer: Clone,
	{
		let mut transfer = Vec::new();
		let mut values = Vec::with_capacity(args.len());
		for arg in args {
			transfer.extend(self.transfers.hints_for(arg));
			let value =
				serde_json::to_value(&**arg).map_err(|err| Error::Serialize(err.to_string()))?;
			values.push(value);
		}
		self.call_with_transfer(values, transfer).await
	}

	/// Invokes and deserializes the result into `R`.
	pub async fn call_typed<R: DeserializeOwned>(&self, args: Vec<Value>) -> Result<R> {
		let value = self.call(args).await?;
		Ok(serde_json::from_value(value)?)
	}

	/// Fire-and-forget invocation: resolves once the underlying send
	/// completes, with no session id and no obtainable return value.
	pub async fn notify(&self, args: Vec<Value>) -> Result<()> {
		let request = Request::new(self.path.clone(), args);
		self.transport.notify(Envelope::new(request)).await
	}
}
