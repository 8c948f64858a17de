//! Server-side dispatch over a target graph.
//!
//! The served side of the protocol is a tree of [`Target`] nodes:
//! namespaces holding named children, and method leaves. [`serve`] walks a
//! request's path through the tree — the exact inverse of client-side
//! path accumulation — and folds every failure mode into an error-tagged
//! response; it never fails locally.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tracing::debug;

use crate::message::{Envelope, PathKey, Request, Response};

/// Future returned by a remotely invocable method.
pub type MethodFuture<'a, H> = Pin<Box<dyn Future<Output = Result<Reply<H>, Value>> + Send + 'a>>;

/// Successful method outcome: the return value plus the transfer hints
/// associated with it.
#[derive(Debug)]
pub struct Reply<H> {
	/// The value returned to the caller.
	pub value: Value,
	/// Transferable resources accompanying the value.
	pub transfer: Vec<H>,
}

impl<H> Reply<H> {
	/// A plain reply with no transfer hints.
	#[must_use]
	pub fn new(value: Value) -> Self {
		Self {
			value,
			transfer: Vec::new(),
		}
	}

	/// A reply whose value is accompanied by transferable resources.
	#[must_use]
	pub fn with_transfer(value: Value, transfer: Vec<H>) -> Self {
		Self { value, transfer }
	}
}

/// A remotely invocable method leaf.
///
/// Errors are returned as plain values so remote identity survives the
/// wire verbatim; use [`Target::method`] to adapt ordinary async closures.
pub trait Method<H>: Send + Sync {
	/// Invokes the method with positional arguments.
	fn invoke(&self, args: Vec<Value>) -> MethodFuture<'_, H>;
}

struct FnMethod<F>(F);

impl<H, F, Fut> Method<H> for FnMethod<F>
where
	F: Fn(Vec<Value>) -> Fut + Send + Sync,
	Fut: Future<Output = Result<Value, Value>> + Send + 'static,
{
	fn invoke(&self, args: Vec<Value>) -> MethodFuture<'_, H> {
		let call = (self.0)(args);
		Box::pin(async move { call.await.map(Reply::new) })
	}
}

struct FnReplyMethod<F>(F);

impl<H, F, Fut> Method<H> for FnReplyMethod<F>
where
	F: Fn(Vec<Value>) -> Fut + Send + Sync,
	Fut: Future<Output = Result<Reply<H>, Value>> + Send + 'static,
{
	fn invoke(&self, args: Vec<Value>) -> MethodFuture<'_, H> {
		Box::pin((self.0)(args))
	}
}

/// One node of the served object graph.
///
/// A method leaf is owned by its enclosing namespace; state a method
/// needs from its receiver is captured by the closure (or carried by the
/// [`Method`] implementor) when the graph is built.
pub enum Target<H> {
	/// Named children reachable by a path segment.
	Namespace(HashMap<String, Target<H>>),
	/// An invocable leaf.
	Method(Box<dyn Method<H>>),
}

impl<H> Target<H> {
	/// Creates an empty namespace node.
	#[must_use]
	pub fn namespace() -> Self {
		Self::Namespace(HashMap::new())
	}

	/// Adds a named child to a namespace node, builder style.
	///
	/// # Panics
	///
	/// Panics when called on a method leaf; methods have no children.
	#[must_use]
	pub fn with(mut self, name: impl Into<String>, child: Target<H>) -> Self {
		match &mut self {
			Self::Namespace(children) => {
				children.insert(name.into(), child);
			}
			Self::Method(_) => panic!("cannot add children to a method leaf"),
		}
		self
	}

	/// Wraps an async closure returning a plain value as a method leaf.
	#[must_use]
	pub fn method<F, Fut>(call: F) -> Self
	where
		F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Value, Value>> + Send + 'static,
	{
		Self::Method(Box::new(FnMethod(call)))
	}

	/// Wraps an async closure returning a [`Reply`] (value plus transfer
	/// hints) as a method leaf.
	#[must_use]
	pub fn method_with_transfer<F, Fut>(call: F) -> Self
	where
		F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Reply<H>, Value>> + Send + 'static,
	{
		Self::Method(Box::new(FnReplyMethod(call)))
	}

	fn child(&self, key: &PathKey) -> Option<&Target<H>> {
		let children = match self {
			Self::Namespace(children) => children,
			Self::Method(_) => return None,
		};
		match key {
			PathKey::Name(name) => children.get(name.as_str()),
			PathKey::Index(index) => children.get(index.to_string().as_str()),
		}
	}
}

/// Dispatches one request against a target graph.
///
/// The path is resolved from its last entry down to index 1 through
/// namespace nodes, then the member at `path[0]` is invoked with the
/// request's arguments. Success yields `{s, v}` plus the reply's transfer
/// list; any failure — empty path, missing intermediate segment,
/// non-invocable target, or a method error — yields `{s, e}` with no
/// transfer hints. `serve` itself never fails.
pub async fn serve<H>(target: &Target<H>, request: Request) -> Envelope<Response, H> {
	let session = request.session;
	match dispatch(target, request).await {
		Ok(reply) => Envelope::with_transfer(Response::ok(session, reply.value), reply.transfer),
		Err(error) => Envelope::new(Response::err(session, error)),
	}
}

async fn dispatch<H>(target: &Target<H>, request: Request) -> Result<Reply<H>, Value> {
	let rendered = request.path_display();
	let Request { path, args, .. } = request;
	let Some((method_key, ancestors)) = path.split_first() else {
		return Err(Value::String("empty invocation path".into()));
	};

	// Outermost ancestor first: the inverse of client-side accumulation.
	let mut node = target;
	for key in ancestors.iter().rev() {
		node = match node.child(key) {
			Some(child) => child,
			None => return Err(not_invocable(&rendered)),
		};
	}

	match node.child(method_key) {
		Some(Target::Method(method)) => method.invoke(args).await,
		_ => {
			debug!(path = %rendered, "dispatch failed: no invocable method");
			Err(not_invocable(&rendered))
		}
	}
}

fn not_invocable(path: &str) -> Value {
	Value::String(format!("no invocable method at path '{path}'"))
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;
	use crate::message::Outcome;

	/// `{ greet(name), fail(), outer: { inner: { whoami() } } }` with
	/// `whoami` reporting the receiver it was built into.
	fn demo_target() -> Target<u32> {
		Target::namespace()
			.with(
				"greet",
				Target::method(|args: Vec<Value>| async move {
					let name = args
						.first()
						.and_then(Value::as_str)
						.ok_or_else(|| Value::String("missing name".into()))?;
					Ok(Value::String(format!("Hello {name}")))
				}),
			)
			.with(
				"fail",
				Target::method(|_args| async { Err(Value::String("boom".into())) }),
			)
			.with(
				"outer",
				Target::namespace().with(
					"inner",
					Target::namespace().with(
						"whoami",
						Target::method(|_args| async { Ok(json!("outer.inner")) }),
					),
				),
			)
	}

	fn request(path: &[&str], args: Vec<Value>) -> Request {
		Request::new(path.iter().map(|&k| k.into()).collect(), args)
	}

	#[tokio::test]
	async fn invokes_a_top_level_method() {
		let target = demo_target();
		let reply = serve(&target, request(&["greet"], vec![json!("world")])).await;

		assert_eq!(reply.message.outcome, Outcome::Value(json!("Hello world")));
		assert!(reply.transfer.is_empty());
	}

	#[tokio::test]
	async fn walks_nested_namespaces_innermost_first() {
		let target = demo_target();
		// client.outer.inner.whoami() accumulates ["whoami","inner","outer"].
		let reply = serve(&target, request(&["whoami", "inner", "outer"], Vec::new())).await;

		assert_eq!(reply.message.outcome, Outcome::Value(json!("outer.inner")));
	}

	#[tokio::test]
	async fn echoes_the_session_id() {
		let target = demo_target();
		let mut req = request(&["greet"], vec![json!("x")]);
		req.session = Some(17);

		let reply = serve(&target, req).await;
		assert_eq!(reply.message.session, Some(17));
	}

	#[tokio::test]
	async fn method_error_becomes_an_error_response() {
		let target = demo_target();
		let reply = serve(&target, request(&["fail"], Vec::new())).await;

		assert_eq!(reply.message.outcome, Outcome::Error(json!("boom")));
		assert!(reply.transfer.is_empty());
	}

	#[tokio::test]
	async fn missing_segment_is_an_error_response_not_a_crash() {
		let target = demo_target();
		let reply = serve(&target, request(&["whoami", "nowhere"], Vec::new())).await;

		assert!(reply.message.outcome.is_error());
	}

	#[tokio::test]
	async fn non_invocable_target_is_an_error_response() {
		let target = demo_target();
		// "outer" resolves to a namespace, not a method.
		let reply = serve(&target, request(&["outer"], Vec::new())).await;

		assert!(reply.message.outcome.is_error());
	}

	#[tokio::test]
	async fn empty_path_is_an_error_response() {
		let target = demo_target();
		let reply = serve(&target, Request::new(Vec::new(), Vec::new())).await;

		assert!(reply.message.outcome.is_error());
	}

	#[tokio::test]
	async fn reply_transfer_hints_ride_beside_the_response() {
		let target: Target<u32> = Target::namespace().with(
			"snapshot",
			Target::method_with_transfer(|_args| async {
				Ok(Reply::with_transfer(json!({"frame": 1}), vec![41, 42]))
			}),
		);

		let reply = serve(&target, request(&["snapshot"], Vec::new())).await;
		assert_eq!(reply.message.outcome, Outcome::Value(json!({"frame": 1})));
		assert_eq!(reply.transfer, vec![41, 42]);
	}

	#[tokio::test]
	async fn numeric_path_keys_address_numeric_children() {
		let target: Target<u32> = Target::namespace().with(
			"items",
			Target::namespace().with("3", Target::method(|_args| async { Ok(json!("third")) })),
		);

		let req = Request::new(vec![PathKey::Index(3), PathKey::from("items")], Vec::new());
		let reply = serve(&target, req).await;
		assert_eq!(reply.message.outcome, Outcome::Value(json!("third")));
	}
}
