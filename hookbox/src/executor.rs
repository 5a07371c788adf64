//! Observable execution of an arbitrary async operation.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;
use hookbox_core::{AsyncState, AsyncStatus};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{Instrument, debug, debug_span, warn};

use crate::metrics::record_execution;

type Operation<T, E, Args> = dyn Fn(Args) -> BoxFuture<'static, Result<T, E>> + Send + Sync;

struct Shared<T, E, Args> {
    operation: Box<Operation<T, E, Args>>,
    state: watch::Sender<AsyncState<T, E>>,
    attempts: AtomicU64,
}

/// An attempt whose `Pending` transition already happened.
struct Attempt<T, E> {
    id: u64,
    call: BoxFuture<'static, Result<T, E>>,
    started: Instant,
}

impl<T, E, Args> Shared<T, E, Args>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn begin(&self, args: Args) -> Attempt<T, E> {
        let id = self.attempts.fetch_add(1, Ordering::Relaxed);
        self.state.send_replace(AsyncState::Pending);
        debug!(attempt = id, "execution started");
        Attempt {
            id,
            call: (self.operation)(args),
            started: Instant::now(),
        }
    }

    async fn settle(&self, attempt: Attempt<T, E>) {
        let Attempt { id, call, started } = attempt;
        let state = match call.await {
            Ok(value) => AsyncState::Success(value),
            Err(error) => AsyncState::Error(Arc::new(error)),
        };
        let status = state.status();
        // Overlapping attempts are not ordered: whichever settles last wins.
        self.state.send_replace(state);
        debug!(attempt = id, %status, "execution settled");
        record_execution(status, started.elapsed());
    }
}

/// Wraps an async operation in an observable `idle → pending → success/error`
/// state machine.
///
/// The executor never surfaces the operation's failure to the caller of
/// [`execute`](Self::execute); failures are stored in the state instead. Observers
/// read the state with [`state`](Self::state) or follow every transition through
/// [`subscribe`](Self::subscribe).
///
/// # Overlapping calls
///
/// `execute` can be called in any state, including while a previous call is
/// still pending. Calls are neither queued nor cancelled: each one moves the
/// state to `Pending` when it starts and writes its own outcome when it settles.
/// If an earlier call settles after a later one, the earlier outcome is what
/// remains in the state.
///
/// # Examples
///
/// ```
/// use hookbox::AsyncExecutor;
/// use hookbox_core::AsyncStatus;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let submit = AsyncExecutor::manual(|(name,): (String,)| async move {
///     if name.is_empty() {
///         Err("name is required")
///     } else {
///         Ok(format!("saved {name}"))
///     }
/// });
///
/// submit.execute((String::from("Ada"),)).await;
/// assert_eq!(submit.state().value().map(String::as_str), Some("saved Ada"));
///
/// submit.execute((String::new(),)).await;
/// assert_eq!(submit.status(), AsyncStatus::Error);
/// # }
/// ```
pub struct AsyncExecutor<T, E, Args = ()> {
    shared: Arc<Shared<T, E, Args>>,
}

impl<T, E, Args> AsyncExecutor<T, E, Args>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
    Args: Send + 'static,
{
    /// Creates an executor that only runs when [`execute`](Self::execute) is called.
    pub fn manual<F, Fut>(operation: F) -> Self
    where
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (state, _) = watch::channel(AsyncState::Idle);
        Self {
            shared: Arc::new(Shared {
                operation: Box::new(move |args| operation(args).boxed()),
                state,
                attempts: AtomicU64::new(0),
            }),
        }
    }

    /// Creates an executor, running the operation once with default arguments
    /// when `auto_run` is set.
    ///
    /// With `auto_run`, the state is already `Pending` when this returns and
    /// the operation settles on the Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if `auto_run` is set and this is called outside a Tokio runtime.
    pub fn new<F, Fut>(operation: F, auto_run: bool) -> Self
    where
        Args: Default,
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let executor = Self::manual(operation);
        if auto_run {
            drop(executor.spawn(Args::default()));
        }
        executor
    }

    /// Runs the operation with `args` and waits for its outcome.
    ///
    /// The `Pending` transition happens before this returns. The operation
    /// runs as its own task, so dropping the returned future (or losing a
    /// `select!` or timeout race with it) does not stop the attempt from
    /// settling. The future resolves once the outcome has been written to the
    /// state; it never fails.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn execute(&self, args: Args) -> impl Future<Output = ()> + Send + 'static {
        let handle = self.spawn(args);
        async move {
            if let Err(error) = handle.await {
                warn!(%error, "execution task failed");
            }
        }
    }

    /// Runs the operation with `args` on the Tokio runtime.
    ///
    /// The `Pending` transition happens before this returns.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn(&self, args: Args) -> JoinHandle<()> {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(error) => panic!("AsyncExecutor must run within a Tokio runtime: {error}"),
        };
        let attempt = self.shared.begin(args);
        let shared = Arc::clone(&self.shared);
        let span = debug_span!("execute", attempt = attempt.id);
        runtime.spawn(async move { shared.settle(attempt).await }.instrument(span))
    }

    /// Current lifecycle stage.
    pub fn status(&self) -> AsyncStatus {
        self.shared.state.borrow().status()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> AsyncState<T, E>
    where
        T: Clone,
    {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<AsyncState<T, E>> {
        self.shared.state.subscribe()
    }
}

impl<T, E, Args> Clone for AsyncExecutor<T, E, Args> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E, Args> fmt::Debug for AsyncExecutor<T, E, Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncExecutor")
            .field("status", &self.shared.state.borrow().status())
            .field("attempts", &self.shared.attempts.load(Ordering::Relaxed))
            .finish()
    }
}
