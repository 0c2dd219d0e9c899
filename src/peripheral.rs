use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::radio::{AdapterError, AdapterState, CentralId, Event, OpId, RadioAdapter};
use crate::{BringupStateMachine, Config, Failure, Result, Stage, State, SyncMutex};

/// Peripheral shared between the application and the radio stack event
/// source. All state machine and GATT server access is serialized by one
/// mutex, so events may be delivered from any thread.
#[derive(Debug)]
pub struct Peripheral<A> {
    inner: SyncMutex<Inner<A>>,
    w: watch::Sender<State>,
    timeout: Option<Duration>,
}

#[derive(Debug)]
struct Inner<A> {
    sm: BringupStateMachine<A>,
    adapter_state: AdapterState,
}

impl<A: RadioAdapter> Peripheral<A> {
    /// Creates an idle peripheral that will bring up the configured service
    /// through `adapter`.
    #[must_use]
    pub fn new(adapter: A, cfg: &Config) -> Self {
        let (w, _) = watch::channel(State::default());
        Self {
            inner: SyncMutex::new(Inner {
                sm: BringupStateMachine::new(adapter, cfg),
                adapter_state: AdapterState::default(),
            }),
            w,
            timeout: cfg.stage_timeout,
        }
    }

    /// Starts bringup. Returns `false` if bringup was already started.
    #[inline]
    pub fn start(&self) -> bool {
        self.update(|i| i.sm.start())
    }

    /// Cancels bringup and returns to [`Stage::Idle`].
    #[inline]
    pub fn reset(&self) {
        self.update(|i| i.sm.reset());
    }

    /// Returns the current bringup state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> State {
        self.inner.lock().sm.state()
    }

    /// Returns a receiver of bringup state changes.
    #[inline]
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<State> {
        self.w.subscribe()
    }

    /// Returns the failure that stopped bringup.
    #[inline]
    #[must_use]
    pub fn failure(&self) -> Option<Failure> {
        self.inner.lock().sm.failure().cloned()
    }

    /// Returns the stage and id of the operation awaiting confirmation.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> Option<(Stage, OpId)> {
        self.inner.lock().sm.pending()
    }

    /// Returns the last reported radio stack state.
    #[inline]
    #[must_use]
    pub fn adapter_state(&self) -> AdapterState {
        self.inner.lock().adapter_state
    }

    /// Replaces the characteristic value.
    #[inline]
    pub fn set_value(&self, v: impl Into<Vec<u8>>) -> Result<()> {
        self.inner.lock().sm.server_mut().set_value(v)
    }

    /// Removes the characteristic value.
    #[inline]
    pub fn clear_value(&self) -> Result<()> {
        self.inner.lock().sm.server_mut().clear_value()
    }

    /// Returns the centrals subscribed to characteristic notifications.
    #[must_use]
    pub fn subscribers(&self) -> Vec<CentralId> {
        self.inner.lock().sm.server().subscribers().collect()
    }

    /// Calls `f` with exclusive access to the radio adapter.
    pub fn with_adapter<T>(&self, f: impl FnOnce(&mut A) -> T) -> T {
        f(self.inner.lock().sm.adapter_mut())
    }

    /// Handles one radio stack event.
    pub fn handle_event(&self, evt: Event) {
        self.update(|i| match evt {
            Event::StateChanged(s) => {
                info!("Radio stack is {s}");
                i.adapter_state = s;
                if s.is_unavailable() {
                    i.sm.fail_pending(AdapterError::Unavailable(s));
                }
            }
            Event::ServiceAdded { op, result } => {
                i.sm.confirm(Stage::Published, op, result);
            }
            Event::AdvertisingStarted { op, result } => {
                i.sm.confirm(Stage::Advertising, op, result);
            }
            Event::ReadRequest(req) => {
                let out = i.sm.server().handle_read_request(&req);
                match out {
                    Ok(ref v) => debug!(
                        "{} {} read {} bytes of {} at offset {}",
                        req.id(),
                        req.central(),
                        v.len(),
                        req.uuid(),
                        req.offset()
                    ),
                    Err(ref e) => debug!(
                        "{} {} read of {} failed: {e}",
                        req.id(),
                        req.central(),
                        req.uuid()
                    ),
                }
                i.sm.adapter_mut().respond_to_read(&req, out);
            }
            Event::Subscribe {
                central,
                characteristic,
            } => {
                i.sm.server_mut().subscribe(central, characteristic);
            }
            Event::Unsubscribe {
                central,
                characteristic,
            } => {
                i.sm.server_mut().unsubscribe(central, characteristic);
            }
        });
    }

    /// Waits for bringup to complete. Returns the failure as an error if any
    /// stage fails.
    pub async fn ready(&self) -> Result<()> {
        let mut rx = self.w.subscribe();
        loop {
            let st = *rx.borrow_and_update();
            match st {
                State::At(Stage::Ready) => return Ok(()),
                State::Failed { .. } => {
                    if let Some(f) = self.failure() {
                        return Err(f.into());
                    }
                }
                State::At(_) => {}
            }
            // Sender is owned by self
            let _ = rx.changed().await;
        }
    }

    /// Receives radio stack events until cancellation or until the event
    /// channel is closed, failing any operation that is not confirmed within
    /// the configured stage timeout.
    pub async fn run(&self, mut events: mpsc::Receiver<Event>, ct: CancellationToken) {
        debug!("Peripheral event loop started");
        let mut rx = self.w.subscribe();
        let mut timer: Option<(Stage, OpId, Instant)> = None;
        loop {
            let pending = self.pending();
            if pending != timer.map(|(stage, op, _)| (stage, op)) {
                timer = (pending.zip(self.timeout)).and_then(|((stage, op), t)| {
                    Some((stage, op, Instant::now().checked_add(t)?))
                });
            }
            let deadline = timer.map_or_else(Instant::now, |(_, _, t)| t);
            tokio::select! {
                _ = ct.cancelled() => {
                    debug!("Peripheral event loop terminating");
                    return;
                }
                evt = events.recv() => match evt {
                    Some(evt) => self.handle_event(evt),
                    None => {
                        debug!("Radio event channel closed");
                        return;
                    }
                },
                Ok(()) = rx.changed() => {}
                _ = sleep_until(deadline), if timer.is_some() => {
                    if let Some((stage, op, _)) = timer.take() {
                        self.expire(stage, op);
                    }
                }
            }
        }
    }

    /// Fails an operation that was not confirmed in time.
    fn expire(&self, stage: Stage, op: OpId) {
        self.update(|i| {
            if i.sm.on_stage_failed(stage, op, AdapterError::Timeout(stage)) {
                warn!("Cancelling {op} after {:?}", self.timeout.unwrap_or_default());
                i.sm.adapter_mut().cancel(op);
            }
        });
    }

    /// Calls `f` with the lock held and publishes any resulting state change.
    fn update<T>(&self, f: impl FnOnce(&mut Inner<A>) -> T) -> T {
        let mut inner = self.inner.lock();
        let r = f(&mut inner);
        let st = inner.sm.state();
        self.w.send_if_modified(|s| {
            let diff = *s != st;
            if diff {
                debug!("Bringup state: {st:?}");
                *s = st;
            }
            diff
        });
        r
    }
}
