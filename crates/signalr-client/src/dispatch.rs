//! Routing of inbound invocations to application code.
//!
//! A [`Handler`] is an explicit registry: a mandatory default function, an
//! optional start hook and any number of named methods with typed
//! parameters. For an invocation with target `T` and `N` arguments:
//!
//! - a method registered as `T` whose parameter tuple has arity `N` gets the
//!   arguments decoded positionally into its parameter types,
//! - if any argument fails to decode, the default handler gets the raw
//!   invocation instead,
//! - an unknown target or an arity mismatch also goes to the default handler.

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::value::RawValue;
use signalr_core::{BoxError, DispatchError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// What a handler gets to know about the invocation it is serving.
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    /// Cancelled when the surrounding `listen` call is cancelled.
    pub cancel: CancellationToken,
    /// Set when the caller expects a completion.
    pub invocation_id: Option<String>,
    /// Envelope headers.
    pub headers: HashMap<String, String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Arguments
// ─────────────────────────────────────────────────────────────────────────────

/// A parameter list decodable from positional raw JSON arguments.
///
/// Implemented for `()` and tuples of up to eight `DeserializeOwned` types.
pub trait FromArguments: Sized {
    /// Number of declared parameters.
    const ARITY: usize;

    /// Decode `args` positionally.
    fn from_arguments(args: &[Box<RawValue>]) -> Result<Self, serde_json::Error>;
}

impl FromArguments for () {
    const ARITY: usize = 0;

    fn from_arguments(_args: &[Box<RawValue>]) -> Result<Self, serde_json::Error> {
        Ok(())
    }
}

fn arg<T: DeserializeOwned>(args: &[Box<RawValue>], index: usize) -> Result<T, serde_json::Error> {
    let raw = args.get(index).ok_or_else(|| {
        <serde_json::Error as serde::de::Error>::custom(format!("missing argument {index}"))
    })?;
    serde_json::from_str(raw.get())
}

macro_rules! impl_from_arguments {
    ($arity:expr; $($ty:ident => $idx:tt),+) => {
        impl<$($ty: DeserializeOwned),+> FromArguments for ($($ty,)+) {
            const ARITY: usize = $arity;

            fn from_arguments(args: &[Box<RawValue>]) -> Result<Self, serde_json::Error> {
                Ok(($(arg::<$ty>(args, $idx)?,)+))
            }
        }
    };
}

impl_from_arguments!(1; A => 0);
impl_from_arguments!(2; A => 0, B => 1);
impl_from_arguments!(3; A => 0, B => 1, C => 2);
impl_from_arguments!(4; A => 0, B => 1, C => 2, D => 3);
impl_from_arguments!(5; A => 0, B => 1, C => 2, D => 3, E => 4);
impl_from_arguments!(6; A => 0, B => 1, C => 2, D => 3, E => 4, F => 5);
impl_from_arguments!(7; A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6);
impl_from_arguments!(8; A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6, H => 7);

// ─────────────────────────────────────────────────────────────────────────────
// Outcomes
// ─────────────────────────────────────────────────────────────────────────────

/// Conversion of a handler's return value into success or failure.
pub trait IntoOutcome {
    /// `Err` ends the receive loop.
    fn into_outcome(self) -> Result<(), BoxError>;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: Into<BoxError>,
{
    fn into_outcome(self) -> Result<(), BoxError> {
        match self {
            Ok(value) => value.into_outcome(),
            Err(e) => Err(e.into()),
        }
    }
}

impl IntoOutcome for serde_json::Value {
    fn into_outcome(self) -> Result<(), BoxError> {
        if !self.is_null() {
            warn!(value = %self, "handler returned a value that is not understood, ignoring");
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handler
// ─────────────────────────────────────────────────────────────────────────────

type DefaultFn = dyn Fn(&InvocationContext, &str, &[Box<RawValue>]) -> Result<(), BoxError> + Send + Sync;
type StartFn = dyn Fn() + Send + Sync;
type MethodFn = dyn Fn(&InvocationContext, &[Box<RawValue>]) -> MethodCall + Send + Sync;

enum MethodCall {
    Ran(Result<(), BoxError>),
    DecodeFailed(serde_json::Error),
}

struct Method {
    arity: usize,
    call: Box<MethodFn>,
}

/// Registry of application callbacks for one `listen` call.
pub struct Handler {
    default: Box<DefaultFn>,
    on_start: Option<Box<StartFn>>,
    methods: HashMap<String, Method>,
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.methods.keys().collect();
        names.sort();
        f.debug_struct("Handler")
            .field("on_start", &self.on_start.is_some())
            .field("methods", &names)
            .finish_non_exhaustive()
    }
}

impl Handler {
    /// Start a registry whose fallback is `default`.
    ///
    /// `default` receives the target name and the raw arguments.
    pub fn builder<F, R>(default: F) -> HandlerBuilder
    where
        F: Fn(&InvocationContext, &str, &[Box<RawValue>]) -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        HandlerBuilder {
            handler: Self {
                default: Box::new(
                    move |ctx: &InvocationContext, target: &str, args: &[Box<RawValue>]| {
                        default(ctx, target, args).into_outcome()
                    },
                ),
                on_start: None,
                methods: HashMap::new(),
            },
        }
    }

    /// Run the start hook, if any.
    pub fn start(&self) {
        if let Some(on_start) = &self.on_start {
            on_start();
        }
    }

    /// Route one invocation.
    pub fn dispatch(
        &self,
        ctx: &InvocationContext,
        target: &str,
        arguments: &[Box<RawValue>],
    ) -> Result<(), DispatchError> {
        let outcome = match self.methods.get(target) {
            Some(method) if method.arity == arguments.len() => match (method.call)(ctx, arguments) {
                MethodCall::Ran(outcome) => outcome,
                MethodCall::DecodeFailed(e) => {
                    warn!(method = target, error = %e, "argument decode failed, using default handler");
                    (self.default)(ctx, target, arguments)
                }
            },
            Some(method) => {
                debug!(
                    method = target,
                    expected = method.arity,
                    actual = arguments.len(),
                    "arity mismatch, using default handler"
                );
                (self.default)(ctx, target, arguments)
            }
            None => (self.default)(ctx, target, arguments),
        };

        outcome.map_err(|source| DispatchError::Handler {
            target: target.to_string(),
            source,
        })
    }
}

/// Builder for [`Handler`].
pub struct HandlerBuilder {
    handler: Handler,
}

impl fmt::Debug for HandlerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBuilder")
            .field("handler", &self.handler)
            .finish()
    }
}

impl HandlerBuilder {
    /// Called once, after the handshake and before the first frame is read.
    #[must_use]
    pub fn on_start<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.handler.on_start = Some(Box::new(f));
        self
    }

    /// Register `f` for invocations targeting `name`.
    ///
    /// The parameter tuple `A` decides how many arguments the method takes.
    /// Registering the same name twice keeps the last registration.
    #[must_use]
    pub fn method<A, F, R>(mut self, name: impl Into<String>, f: F) -> Self
    where
        A: FromArguments + 'static,
        F: Fn(&InvocationContext, A) -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        let call = move |ctx: &InvocationContext, args: &[Box<RawValue>]| match A::from_arguments(args) {
            Ok(decoded) => MethodCall::Ran(f(ctx, decoded).into_outcome()),
            Err(e) => MethodCall::DecodeFailed(e),
        };
        let _ = self.handler.methods.insert(
            name.into(),
            Method {
                arity: A::ARITY,
                call: Box::new(call),
            },
        );
        self
    }

    /// Finish the registry.
    pub fn build(self) -> Handler {
        self.handler
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
