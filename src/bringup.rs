//! Staged peripheral bringup.
//!
//! ```text
//! Idle ──start──▶ Created ──▶ Published ──ok──▶ Advertising ──ok──▶ Ready
//!                               │                   │
//!                               └──err──▶ Failed ◀──err
//! ```
//!
//! `Created` is local object construction and completes immediately.
//! `Published` and `Advertising` each submit one radio stack operation and wait
//! for its confirmation. At most one operation is outstanding at any time and
//! only a confirmation carrying its [`OpId`] can move the sequence forward.

use tracing::{debug, error, info, warn};

use crate::gap::AdvertisementData;
use crate::gatt::GattServer;
use crate::radio::{AdapterError, OpId, RadioAdapter};
use crate::{Config, Error};

/// Bringup stage. Stages are totally ordered and only ever advance to their
/// immediate successor.
#[derive(
    Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, enum_iterator::Sequence,
)]
pub enum Stage {
    /// Nothing has been done yet.
    #[default]
    Idle,
    /// Service and characteristic definitions exist.
    Created,
    /// Service was submitted to the local GATT database.
    Published,
    /// Advertising was requested.
    Advertising,
    /// Service is live and read requests are being answered.
    Ready,
}

impl Stage {
    /// Returns the next stage or [`None`] for [`Stage::Ready`].
    #[inline]
    #[must_use]
    pub fn successor(self) -> Option<Self> {
        enum_iterator::next(&self)
    }
}

crate::impl_display_via_debug! { Stage }

/// Externally visible bringup state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum State {
    /// Bringup is at the specified stage.
    At(Stage),
    /// Bringup stopped because the operation for the specified stage failed.
    Failed { at: Stage },
}

impl State {
    /// Returns whether bringup completed successfully.
    #[inline]
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::At(Stage::Ready))
    }

    /// Returns whether no further progress is possible without a reset.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::At(Stage::Ready) | Self::Failed { .. })
    }
}

impl Default for State {
    #[inline]
    fn default() -> Self {
        Self::At(Stage::Idle)
    }
}

/// Bringup failure record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Failure {
    at: Stage,
    err: AdapterError,
}

impl Failure {
    /// Returns the stage whose operation failed.
    #[inline(always)]
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.at
    }

    /// Returns the radio stack error.
    #[inline(always)]
    #[must_use]
    pub const fn error(&self) -> &AdapterError {
        &self.err
    }
}

impl From<Failure> for Error {
    #[inline]
    fn from(f: Failure) -> Self {
        Self::AdapterOperationFailed {
            stage: f.at,
            source: f.err,
        }
    }
}

/// Outstanding radio stack operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Pending {
    stage: Stage,
    op: OpId,
}

/// Drives the service through creation, publication, and advertising.
#[derive(Debug)]
pub struct BringupStateMachine<A> {
    adapter: A,
    server: GattServer,
    adv: AdvertisementData,
    stage: Stage,
    pending: Option<Pending>,
    failure: Option<Failure>,
    last_op: u64,
}

impl<A: RadioAdapter> BringupStateMachine<A> {
    /// Creates an idle state machine that will publish the configured service
    /// through `adapter`.
    #[must_use]
    pub fn new(adapter: A, cfg: &Config) -> Self {
        Self {
            adapter,
            server: GattServer::new(cfg.service, cfg.characteristic),
            adv: AdvertisementData::new([cfg.service]).with_local_name(cfg.local_name.clone()),
            stage: Stage::Idle,
            pending: None,
            failure: None,
            last_op: 0,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> State {
        match self.failure {
            Some(ref f) => State::Failed { at: f.at },
            None => State::At(self.stage),
        }
    }

    /// Returns the failure that stopped bringup.
    #[inline]
    #[must_use]
    pub const fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// Returns the stage and id of the operation awaiting confirmation.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> Option<(Stage, OpId)> {
        self.pending.map(|p| (p.stage, p.op))
    }

    /// Returns the GATT server.
    #[inline(always)]
    #[must_use]
    pub const fn server(&self) -> &GattServer {
        &self.server
    }

    /// Returns the GATT server for value and subscription updates.
    #[inline(always)]
    pub fn server_mut(&mut self) -> &mut GattServer {
        &mut self.server
    }

    /// Returns the radio adapter.
    #[inline(always)]
    #[must_use]
    pub const fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Returns the radio adapter.
    #[inline(always)]
    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    /// Starts bringup. Returns `false` without doing anything unless the state
    /// is `Idle`.
    pub fn start(&mut self) -> bool {
        let st = self.state();
        if st != State::At(Stage::Idle) {
            debug!("Duplicate start ignored in {st:?}");
            return false;
        }
        info!("Starting peripheral bringup");
        self.advance();
        true
    }

    /// Handles a successful confirmation. Returns `false` if the confirmation
    /// was ignored.
    #[inline]
    pub fn on_stage_succeeded(&mut self, stage: Stage, op: OpId) -> bool {
        self.confirm(stage, op, Ok(()))
    }

    /// Handles a failed confirmation. Returns `false` if the confirmation was
    /// ignored.
    #[inline]
    pub fn on_stage_failed(&mut self, stage: Stage, op: OpId, err: AdapterError) -> bool {
        self.confirm(stage, op, Err(err))
    }

    /// Handles the confirmation of the operation submitted for `stage`.
    /// Confirmations that do not match the outstanding operation are ignored.
    pub fn confirm(&mut self, stage: Stage, op: OpId, r: Result<(), AdapterError>) -> bool {
        let want = Pending { stage, op };
        if self.pending != Some(want) {
            warn!(
                "Ignoring {stage} confirmation for {op} (waiting for {:?})",
                self.pending
            );
            return false;
        }
        self.pending = None;
        match r {
            Ok(()) => {
                debug!("{stage} confirmed by {op}");
                self.advance();
            }
            Err(e) => self.fail(e),
        }
        true
    }

    /// Fails the outstanding operation, if any, with the specified error.
    /// Returns `false` if nothing was outstanding.
    pub fn fail_pending(&mut self, err: AdapterError) -> bool {
        match self.pending {
            Some(p) => self.on_stage_failed(p.stage, p.op, err),
            None => false,
        }
    }

    /// Returns to `Idle`, cancelling the outstanding operation and clearing
    /// any failure. The created service is kept and reused by the next
    /// [`Self::start`].
    pub fn reset(&mut self) {
        if let Some(p) = self.pending.take() {
            debug!("Cancelling {} for {}", p.op, p.stage);
            self.adapter.cancel(p.op);
        }
        self.failure = None;
        self.stage = Stage::Idle;
        info!("Peripheral bringup reset");
    }

    /// Moves to the next stage and performs its action. Synchronous stages are
    /// chained until a stage needs to wait for the radio stack.
    fn advance(&mut self) {
        while self.pending.is_none() && self.failure.is_none() {
            let Some(next) = self.stage.successor() else {
                debug!("Bringup already complete");
                return;
            };
            self.stage = next;
            info!("Entering {next} stage");
            let r = match next {
                Stage::Idle => unreachable!("Idle has no predecessor"),
                Stage::Created => {
                    self.server.create();
                    continue;
                }
                Stage::Published => {
                    let op = self.submit(next);
                    self.adapter.add_service(op, self.server.create())
                }
                Stage::Advertising => {
                    let op = self.submit(next);
                    let svc = self.server.create().uuid();
                    self.adapter.start_advertising(op, svc, &self.adv)
                }
                Stage::Ready => {
                    info!("Peripheral is ready for requests from centrals");
                    return;
                }
            };
            if let Err(e) = r {
                self.pending = None;
                self.fail(e);
            }
        }
    }

    /// Allocates an operation id for `stage` and marks it outstanding.
    fn submit(&mut self, stage: Stage) -> OpId {
        self.last_op += 1;
        let op = OpId(self.last_op);
        self.pending = Some(Pending { stage, op });
        op
    }

    fn fail(&mut self, err: AdapterError) {
        error!("Could not complete {} stage: {err}", self.stage);
        self.failure = Some(Failure {
            at: self.stage,
            err,
        });
    }
}

#[cfg(test)]
mod tests;
