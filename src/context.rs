//! Request-scoped execution context.
//!
//! A [`Context`] is immutable. Every `with_*` method returns a *new* context
//! layered on top of the receiver; the receiver is left untouched. That is
//! what lets one middleware hand a richer context to the rest of the chain
//! without anything "to the left" ever observing the change.
//!
//! ```text
//! background ── tokenA=123 ── tokenB=456      ← what the handler sees
//!      ▲             ▲
//!      │             └─ what middleware B received
//!      └─ what middleware A received
//! ```
//!
//! Cloning is one `Arc` increment plus a cancellation-token clone. Values are
//! stored as a singly linked list of layers; lookups walk from the newest
//! layer to the root, so the nearest layer shadows older ones.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// An immutable, cancellable, key-value-scoped request context.
#[derive(Clone)]
pub struct Context {
    values: Option<Arc<Layer>>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

struct Layer {
    key: &'static str,
    value: Box<dyn Any + Send + Sync>,
    parent: Option<Arc<Layer>>,
}

impl Context {
    /// An empty context: no values, never cancelled, no deadline.
    ///
    /// This is what a request starts with when no root-context factory is
    /// configured.
    pub fn background() -> Self {
        Self {
            values: None,
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Returns a child context carrying `key = value`.
    ///
    /// The receiver is not modified. If `key` already exists further up the
    /// chain, the new value shadows it for the child and its descendants only.
    #[must_use]
    pub fn with_value<T>(&self, key: &'static str, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            values: Some(Arc::new(Layer {
                key,
                value: Box::new(value),
                parent: self.values.clone(),
            })),
            cancel: self.cancel.clone(),
            deadline: self.deadline,
        }
    }

    /// Looks up the value stored under `key` by the nearest layer.
    ///
    /// Returns `None` if no layer holds `key`, or if the nearest layer holding
    /// it stored a value of a different type. Shadowed values are never
    /// consulted.
    pub fn value<T: Any>(&self, key: &str) -> Option<&T> {
        let mut layer = self.values.as_deref();
        while let Some(l) = layer {
            if l.key == key {
                return l.value.downcast_ref::<T>();
            }
            layer = l.parent.as_deref();
        }
        None
    }

    /// Returns a child context that can be cancelled independently.
    ///
    /// Cancelling the returned handle cancels the child (and its descendants)
    /// but not the receiver. Cancelling the receiver still cancels the child.
    #[must_use]
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let token = self.cancel.child_token();
        let ctx = Self {
            values: self.values.clone(),
            cancel: token.clone(),
            deadline: self.deadline,
        };
        (ctx, CancelHandle(token))
    }

    /// Returns a child context that is considered cancelled once `deadline`
    /// passes. An earlier deadline inherited from the receiver wins.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current <= deadline => current,
            _ => deadline,
        };
        Self {
            values: self.values.clone(),
            cancel: self.cancel.clone(),
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => tokio::select! {
                () = self.cancel.cancelled() => {}
                () = tokio::time::sleep_until(deadline) => {}
            },
            None => self.cancel.cancelled().await,
        }
    }

    fn keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        let mut layer = self.values.as_deref();
        while let Some(l) = layer {
            keys.push(l.key);
            layer = l.parent.as_deref();
        }
        keys
    }
}

impl Default for Context {
    fn default() -> Self { Self::background() }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("keys", &self.keys())
            .field("cancelled", &self.cancel.is_cancelled())
            .field("deadline", &self.deadline)
            .finish()
    }
}

/// Cancels the context it was created with. See [`Context::with_cancel`].
#[derive(Clone, Debug)]
pub struct CancelHandle(CancellationToken);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.cancel();
    }
}
