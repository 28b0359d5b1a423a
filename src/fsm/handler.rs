//! Data Handlers
//!
//! A handler decides what replaces a matched region: it receives the bytes
//! deferred since the previous transition and the trigger that ended them,
//! and returns the bytes to emit instead.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Error type handlers may fail with
pub type HandlerError = Box<dyn StdError + Send + Sync>;

/// Replacement logic for a matched region.
///
/// Implemented for any `Fn(&mut C, &[u8], &[u8]) -> Result<Vec<u8>, HandlerError>`.
pub trait DataHandler<C>: Send + Sync {
    fn handle(&self, ctx: &mut C, deferred: &[u8], trigger: &[u8]) -> Result<Vec<u8>, HandlerError>;
}

impl<C, F> DataHandler<C> for F
where
    F: Fn(&mut C, &[u8], &[u8]) -> Result<Vec<u8>, HandlerError> + Send + Sync,
{
    fn handle(&self, ctx: &mut C, deferred: &[u8], trigger: &[u8]) -> Result<Vec<u8>, HandlerError> {
        self(ctx, deferred, trigger)
    }
}

/// What happens to the bytes of a matched transition
pub enum Action<C> {
    /// Emit deferred bytes and the trigger unchanged
    PassThrough,
    /// Replace deferred bytes and the trigger with the handler's output
    Replace(Arc<dyn DataHandler<C>>),
}

impl<C> Action<C> {
    /// Wrap a handler
    pub fn replace<H>(handler: H) -> Self
    where
        H: DataHandler<C> + 'static,
    {
        Action::Replace(Arc::new(handler))
    }

    pub fn has_handler(&self) -> bool {
        matches!(self, Action::Replace(_))
    }
}

impl<C> Clone for Action<C> {
    fn clone(&self) -> Self {
        match self {
            Action::PassThrough => Action::PassThrough,
            Action::Replace(h) => Action::Replace(Arc::clone(h)),
        }
    }
}

impl<C> fmt::Debug for Action<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::PassThrough => f.write_str("PassThrough"),
            Action::Replace(_) => f.write_str("Replace(..)"),
        }
    }
}

/// Built-in handler dropping both deferred and trigger bytes
pub fn void<C>(_ctx: &mut C, _deferred: &[u8], _trigger: &[u8]) -> Result<Vec<u8>, HandlerError> {
    Ok(Vec::new())
}

/// Built-in handler dropping the trigger and keeping deferred bytes
pub fn skip_token<C>(_ctx: &mut C, deferred: &[u8], _trigger: &[u8]) -> Result<Vec<u8>, HandlerError> {
    Ok(deferred.to_vec())
}

/// Built-in handler registered as `skip_deferred`.
///
/// Behaves exactly like [`skip_token`]: deferred bytes are kept and the
/// trigger is dropped. Kept under its own name so existing tables resolve.
pub fn skip_deferred<C>(_ctx: &mut C, deferred: &[u8], _trigger: &[u8]) -> Result<Vec<u8>, HandlerError> {
    Ok(deferred.to_vec())
}

/// Named handlers available to configuration-driven state tables
pub struct HandlerRegistry<C> {
    handlers: HashMap<String, Arc<dyn DataHandler<C>>>,
}

impl<C: 'static> HandlerRegistry<C> {
    /// Registry holding the built-ins `void`, `skip_token` and `skip_deferred`
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("void", void::<C>);
        registry.register("skip_token", skip_token::<C>);
        registry.register("skip_deferred", skip_deferred::<C>);
        registry
    }

    /// Registry with no handlers at all
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Add or replace a named handler
    pub fn register<H>(&mut self, name: &str, handler: H) -> &mut Self
    where
        H: DataHandler<C> + 'static,
    {
        self.handlers.insert(name.to_string(), Arc::new(handler));
        self
    }

    /// Resolve a name into a replacing action
    pub fn action(&self, name: &str) -> Option<Action<C>> {
        self.handlers.get(name).map(|h| Action::Replace(Arc::clone(h)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<C: 'static> Default for HandlerRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}
