use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use log::{debug, error, info, trace};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::state::PollingState;

type FetchFn<T> = dyn Fn() -> BoxFuture<'static, Result<T, String>> + Send + Sync;

struct Control {
    /// Tag of the most recent dispatch; results carrying any other tag are dropped
    generation: u64,
    active: bool,
    timer: Option<JoinHandle<()>>,
}

struct Shared<T> {
    fetch: Box<FetchFn<T>>,
    period: Duration,
    state: watch::Sender<PollingState<T>>,
    control: Mutex<Control>,
}

impl<T> Shared<T> {
    fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deactivate(&self) -> bool {
        let mut control = self.control();
        if let Some(timer) = control.timer.take() {
            timer.abort();
        }
        if !control.active {
            return false;
        }
        control.active = false;
        control.generation += 1;
        self.state
            .send_if_modified(|state| std::mem::replace(&mut state.is_loading, false));
        drop(control);

        info!("Polling deactivated");
        true
    }

    fn reset(&self) {
        self.state.send_replace(PollingState::default());
    }
}

impl<T: Send + Sync + 'static> Shared<T> {
    fn activate(self: &Arc<Self>) -> bool {
        {
            let mut control = self.control();
            if control.active {
                return false;
            }
            control.active = true;

            let weak = Arc::downgrade(self);
            let period = self.period;
            control.timer = Some(tokio::spawn(async move {
                let mut ticker = time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    let Some(shared) = weak.upgrade() else { break };
                    trace!("Poll tick");
                    if shared.dispatch().is_none() {
                        break;
                    }
                }
            }));
        }

        info!("Polling activated, refreshing every {:?}", self.period);
        self.dispatch();
        true
    }

    /// Start a fetch under a new generation. `None` when inactive.
    fn dispatch(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let generation = {
            let mut control = self.control();
            if !control.active {
                return None;
            }
            control.generation += 1;
            self.state.send_modify(|state| state.is_loading = true);
            control.generation
        };

        debug!("Dispatching fetch generation {}", generation);
        let fetch = AssertUnwindSafe((self.fetch)()).catch_unwind();
        let shared = Arc::clone(self);
        Some(tokio::spawn(async move {
            let result = fetch.await.unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                error!("Fetch generation {} {}", generation, message);
                Err(message)
            });
            shared.settle(generation, result);
        }))
    }

    fn settle(&self, generation: u64, result: Result<T, String>) {
        let control = self.control();
        if control.generation != generation {
            debug!(
                "Discarding result of generation {} (current is {})",
                generation, control.generation
            );
            return;
        }
        if let Err(message) = &result {
            debug!("Fetch generation {} failed: {}", generation, message);
        }
        self.state.send_modify(|state| state.apply(result));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "with a non-string payload".to_string());
    format!("panicked: {}", detail)
}

/// Keeps a cached value fresh by re-running a fetch on a fixed period.
///
/// Every fetch is tagged with a generation number when it is dispatched, and
/// its result is written to the state only if no newer fetch has been
/// dispatched since. Overlapping fetches are not cancelled; the older one is
/// simply ignored when it completes. Deactivating (or dropping) the poller
/// stops the timer and ignores everything still in flight.
///
/// Activation spawns tasks and must happen inside a tokio runtime.
///
/// ```no_run
/// # async fn run() {
/// use std::time::Duration;
/// use packsight_realtime::Poller;
///
/// let poller = Poller::new(Duration::from_secs(30), || async {
///     Ok::<_, std::io::Error>(42)
/// });
/// poller.activate();
/// let mut changes = poller.subscribe();
/// changes.changed().await.unwrap();
/// println!("{:?}", changes.borrow().data);
/// # }
/// ```
pub struct Poller<T> {
    shared: Arc<Shared<T>>,
    follower: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + Sync + 'static> Poller<T> {
    /// # Panics
    ///
    /// Panics if `period` is zero.
    pub fn new<F, Fut, E>(period: Duration, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: fmt::Display,
    {
        assert!(!period.is_zero(), "polling period must be non-zero");

        let fetch: Box<FetchFn<T>> =
            Box::new(move || fetch().map(|r| r.map_err(|e| e.to_string())).boxed());
        let (state, _) = watch::channel(PollingState::default());

        Self {
            shared: Arc::new(Shared {
                fetch,
                period,
                state,
                control: Mutex::new(Control {
                    generation: 0,
                    active: false,
                    timer: None,
                }),
            }),
            follower: Mutex::new(None),
        }
    }

    pub fn period(&self) -> Duration {
        self.shared.period
    }

    /// Fetch immediately, then once per period. Returns `false` if already active.
    pub fn activate(&self) -> bool {
        self.shared.activate()
    }

    /// Stop polling and ignore in-flight fetches. Returns `false` if already inactive.
    pub fn deactivate(&self) -> bool {
        self.shared.deactivate()
    }

    pub fn is_active(&self) -> bool {
        self.shared.control().active
    }

    /// Dispatch a fetch now, superseding any fetch in flight.
    ///
    /// The fetch starts when this is called; the returned future resolves once
    /// it has settled. Does nothing while inactive.
    pub fn refetch(&self) -> impl Future<Output = ()> + Send + 'static {
        let dispatched = self.shared.dispatch();
        async move {
            if let Some(handle) = dispatched {
                if let Err(e) = handle.await {
                    if e.is_panic() {
                        error!("Fetch task panicked: {}", e);
                    }
                }
            }
        }
    }

    pub fn state(&self) -> PollingState<T>
    where
        T: Clone,
    {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<PollingState<T>> {
        self.shared.state.subscribe()
    }

    /// Drive activation from `source`.
    ///
    /// The poller is active exactly while `is_active` holds for the latest
    /// value. Every change of `source` restarts it from an empty state, so data
    /// fetched for one value is never shown under the next.
    pub fn follow<S, P>(&self, mut source: watch::Receiver<S>, is_active: P)
    where
        S: Send + Sync + 'static,
        P: Fn(&S) -> bool + Send + 'static,
    {
        let initially = {
            let current = source.borrow_and_update();
            is_active(&*current)
        };
        if initially {
            self.shared.activate();
        } else {
            self.shared.deactivate();
        }

        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            while source.changed().await.is_ok() {
                let active = {
                    let current = source.borrow_and_update();
                    is_active(&*current)
                };
                shared.deactivate();
                shared.reset();
                if active {
                    shared.activate();
                }
            }
            debug!("Activation source closed");
            shared.deactivate();
        });

        let previous = self
            .follower
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        if let Some(follower) = self
            .follower
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            follower.abort();
        }
        self.shared.deactivate();
    }
}
