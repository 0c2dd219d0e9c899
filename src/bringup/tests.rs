use matches::assert_matches;

use crate::gap::Uuid;
use crate::radio::fake::{Call, FakeAdapter};
use crate::radio::AdapterState;
use crate::{DEFAULT_CHARACTERISTIC, DEFAULT_SERVICE};

use super::*;

type Machine = BringupStateMachine<FakeAdapter>;

fn machine() -> Machine {
    BringupStateMachine::new(FakeAdapter::default(), &Config::default())
}

fn stack_err() -> AdapterError {
    AdapterError::Stack("busy".into())
}

fn payload(cfg: &Config) -> Vec<u8> {
    (AdvertisementData::new([cfg.service]).with_local_name(cfg.local_name.clone()))
        .encode()
        .as_ref()
        .to_vec()
}

/// Runs bringup to the `Ready` state.
fn ready() -> Machine {
    let mut sm = machine();
    assert!(sm.start());
    assert!(sm.on_stage_succeeded(Stage::Published, OpId(1)));
    assert!(sm.on_stage_succeeded(Stage::Advertising, OpId(2)));
    assert!(sm.state().is_ready());
    sm
}

#[test]
fn stage_order() {
    let all: Vec<_> = enum_iterator::all::<Stage>().collect();
    assert_eq!(
        all,
        [
            Stage::Idle,
            Stage::Created,
            Stage::Published,
            Stage::Advertising,
            Stage::Ready
        ]
    );
    for w in all.windows(2) {
        assert!(w[0] < w[1]);
        assert_eq!(w[0].successor(), Some(w[1]));
    }
    assert_eq!(Stage::Ready.successor(), None);
    assert_eq!(Stage::default(), Stage::Idle);
    assert_eq!(State::default(), State::At(Stage::Idle));
}

#[test]
fn sequence() {
    let mut sm = machine();
    assert_eq!(sm.state(), State::At(Stage::Idle));
    assert!(sm.server().service().is_none());
    assert!(sm.adapter().calls.is_empty());

    // Created completes immediately and Published is submitted
    assert!(sm.start());
    assert_eq!(sm.state(), State::At(Stage::Published));
    assert_eq!(sm.pending(), Some((Stage::Published, OpId(1))));
    assert_eq!(sm.adapter().calls, [Call::AddService(OpId(1), DEFAULT_SERVICE)]);
    let ch = sm.server().characteristic().unwrap();
    assert_eq!(ch.uuid(), DEFAULT_CHARACTERISTIC);

    assert!(sm.on_stage_succeeded(Stage::Published, OpId(1)));
    assert_eq!(sm.state(), State::At(Stage::Advertising));
    assert_eq!(sm.pending(), Some((Stage::Advertising, OpId(2))));
    assert_eq!(
        sm.adapter().calls.last(),
        Some(&Call::StartAdvertising(
            OpId(2),
            DEFAULT_SERVICE,
            payload(&Config::default())
        ))
    );

    assert!(sm.on_stage_succeeded(Stage::Advertising, OpId(2)));
    assert_eq!(sm.state(), State::At(Stage::Ready));
    assert!(sm.state().is_terminal());
    assert_eq!(sm.pending(), None);
    assert_eq!(sm.failure(), None);
    assert_eq!(sm.adapter().submissions(), 2);
}

#[test]
fn advertised_name() {
    let cfg = Config {
        service: Uuid::from_u16(0x180F).unwrap(),
        local_name: Some("Chirp".into()),
        ..Config::default()
    };
    let mut sm = BringupStateMachine::new(FakeAdapter::default(), &cfg);
    sm.start();
    sm.on_stage_succeeded(Stage::Published, OpId(1));
    let Some(Call::StartAdvertising(_, svc, data)) = sm.adapter().calls.last() else {
        panic!("advertising not started");
    };
    assert_eq!(*svc, cfg.service);
    assert_eq!(*data, payload(&cfg));
    assert!(data.ends_with(b"Chirp"));
}

#[test]
fn publish_failure() {
    let mut sm = machine();
    sm.start();
    assert!(sm.on_stage_failed(Stage::Published, OpId(1), stack_err()));
    assert_eq!(sm.state(), State::Failed { at: Stage::Published });
    assert!(sm.state().is_terminal());
    assert!(!sm.state().is_ready());
    assert_eq!(sm.pending(), None);

    let f = sm.failure().unwrap().clone();
    assert_eq!(f.stage(), Stage::Published);
    assert_eq!(f.error(), &stack_err());
    assert_matches!(
        Error::from(f),
        Error::AdapterOperationFailed {
            stage: Stage::Published,
            source: AdapterError::Stack(_),
        }
    );

    // Advertising is never attempted
    assert!(!sm.on_stage_succeeded(Stage::Published, OpId(1)));
    assert!(!sm.start());
    assert_eq!(sm.adapter().submissions(), 1);
    assert_eq!(sm.state(), State::Failed { at: Stage::Published });
}

#[test]
fn advertise_failure() {
    let mut sm = machine();
    sm.start();
    sm.on_stage_succeeded(Stage::Published, OpId(1));
    assert!(sm.on_stage_failed(Stage::Advertising, OpId(2), stack_err()));
    assert_eq!(sm.state(), State::Failed { at: Stage::Advertising });
    assert!(!sm.on_stage_succeeded(Stage::Advertising, OpId(2)));
    assert_eq!(sm.adapter().submissions(), 2);
}

#[test]
fn stray_confirmations() {
    let mut sm = machine();
    // Nothing outstanding before start
    assert!(!sm.on_stage_succeeded(Stage::Published, OpId(1)));
    assert_eq!(sm.state(), State::At(Stage::Idle));

    sm.start();
    // Wrong stage, then wrong op
    assert!(!sm.on_stage_succeeded(Stage::Advertising, OpId(1)));
    assert!(!sm.on_stage_failed(Stage::Published, OpId(9), stack_err()));
    assert_eq!(sm.state(), State::At(Stage::Published));

    assert!(sm.on_stage_succeeded(Stage::Published, OpId(1)));
    // Duplicate
    assert!(!sm.on_stage_succeeded(Stage::Published, OpId(1)));
    assert!(!sm.on_stage_failed(Stage::Published, OpId(1), stack_err()));
    assert_eq!(sm.state(), State::At(Stage::Advertising));
    assert_eq!(sm.adapter().submissions(), 2);
}

#[test]
fn ready_is_terminal() {
    let mut sm = ready();
    let n = sm.adapter().calls.len();
    assert!(!sm.start());
    assert!(!sm.on_stage_succeeded(Stage::Advertising, OpId(2)));
    assert!(!sm.on_stage_succeeded(Stage::Ready, OpId(3)));
    assert!(!sm.fail_pending(stack_err()));
    sm.advance();
    assert_eq!(sm.state(), State::At(Stage::Ready));
    assert_eq!(sm.adapter().calls.len(), n);
}

#[test]
fn duplicate_start() {
    let mut sm = machine();
    assert!(sm.start());
    assert!(!sm.start());
    assert_eq!(sm.adapter().submissions(), 1);
    assert_eq!(sm.pending(), Some((Stage::Published, OpId(1))));
}

#[test]
fn rejected_submission() {
    let adapter = FakeAdapter {
        reject: Some(AdapterError::Unavailable(AdapterState::PoweredOff)),
        ..FakeAdapter::default()
    };
    let mut sm = BringupStateMachine::new(adapter, &Config::default());
    assert!(sm.start());
    assert_eq!(sm.state(), State::Failed { at: Stage::Published });
    assert_eq!(sm.pending(), None);
    assert!(!sm.on_stage_succeeded(Stage::Published, OpId(1)));

    let mut sm = machine();
    sm.start();
    sm.adapter_mut().reject = Some(stack_err());
    sm.on_stage_succeeded(Stage::Published, OpId(1));
    assert_eq!(sm.state(), State::Failed { at: Stage::Advertising });
}

#[test]
fn fail_pending() {
    let mut sm = machine();
    assert!(!sm.fail_pending(stack_err()));
    sm.start();
    let err = AdapterError::Unavailable(AdapterState::PoweredOff);
    assert!(sm.fail_pending(err.clone()));
    assert_eq!(sm.state(), State::Failed { at: Stage::Published });
    assert_eq!(sm.failure().map(Failure::error), Some(&err));
    assert!(!sm.fail_pending(stack_err()));
}

#[test]
fn reset() {
    let mut sm = machine();
    sm.start();
    sm.on_stage_succeeded(Stage::Published, OpId(1));
    sm.server_mut().set_value([1, 2, 3]).unwrap();

    sm.reset();
    assert_eq!(sm.state(), State::At(Stage::Idle));
    assert_eq!(sm.pending(), None);
    assert_eq!(sm.adapter().calls.last(), Some(&Call::Cancel(OpId(2))));
    // Late confirmation of the cancelled operation
    assert!(!sm.on_stage_succeeded(Stage::Advertising, OpId(2)));
    assert_eq!(sm.state(), State::At(Stage::Idle));

    // Restart reuses the existing service
    assert!(sm.start());
    assert_eq!(sm.pending(), Some((Stage::Published, OpId(3))));
    assert_eq!(
        sm.server().characteristic().unwrap().value(),
        Some(&[1, 2, 3][..])
    );
    assert!(sm.on_stage_succeeded(Stage::Published, OpId(3)));
    assert!(sm.on_stage_succeeded(Stage::Advertising, OpId(4)));
    assert!(sm.state().is_ready());
}

#[test]
fn reset_after_failure() {
    let mut sm = machine();
    sm.start();
    sm.on_stage_failed(Stage::Published, OpId(1), stack_err());
    let n = sm.adapter().calls.len();
    sm.reset();
    // Nothing to cancel
    assert_eq!(sm.adapter().calls.len(), n);
    assert_eq!(sm.state(), State::At(Stage::Idle));
    assert_eq!(sm.failure(), None);
    assert!(sm.start());
    assert_eq!(sm.state(), State::At(Stage::Published));
}
