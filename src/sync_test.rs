use std::cell::RefCell;

use glam::{Quat, Vec3};

use super::*;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn config() -> SyncConfig {
    SyncConfig { send_rate: 30.0, ..SyncConfig::default() }
}

fn controlling_session() -> Session {
    let mut s = Session::new();
    s.joined("ABCDE".into());
    s.start_local_control();
    s
}

fn receiving_session() -> Session {
    let mut s = Session::new();
    s.joined("ABCDE".into());
    s
}

fn moved(x: f32) -> Snapshot {
    Snapshot { position: Vec3::new(x, 0.0, 0.0), ..Snapshot::default() }
}

/// Records every datagram handed to it and answers with `accept`.
struct Wire {
    sent: RefCell<Vec<Vec<u8>>>,
    accept: bool,
}

impl Wire {
    fn new(accept: bool) -> Self {
        Self { sent: RefCell::new(Vec::new()), accept }
    }

    fn send(&self) -> impl FnOnce(&[u8]) -> bool + '_ {
        move |bytes: &[u8]| {
            self.sent.borrow_mut().push(bytes.to_vec());
            self.accept
        }
    }

    fn count(&self) -> usize {
        self.sent.borrow().len()
    }
}

// --- Branch selection ---

#[test]
fn branch_is_idle_outside_room() {
    let mut s = Session::new();
    s.start_local_control();
    assert_eq!(Branch::select(&s), Branch::Idle);
}

#[test]
fn branch_follows_control_flag_in_room() {
    assert_eq!(Branch::select(&controlling_session()), Branch::Sender);
    assert_eq!(Branch::select(&receiving_session()), Branch::Receiver);
}

#[test]
fn idle_tick_never_sends_or_moves() {
    let t0 = Instant::now();
    let mut sync = SyncLoop::new(&config(), Snapshot::default(), t0);
    let wire = Wire::new(true);
    let mut live = moved(5.0);

    let step = sync.step(&Session::new(), &mut live, t0 + ms(100), wire.send());

    assert_eq!(step, Step::Idle);
    assert_eq!(wire.count(), 0);
    assert_eq!(live, moved(5.0));
}

// --- Sender branch ---

#[test]
fn change_is_throttled_until_send_interval_elapses() {
    let t0 = Instant::now();
    let session = controlling_session();
    let mut sync = SyncLoop::new(&config(), Snapshot::default(), t0);
    let wire = Wire::new(true);
    let mut live = moved(0.02);

    assert_eq!(sync.step(&session, &mut live, t0 + ms(10), wire.send()), Step::Throttled);
    assert_eq!(sync.step(&session, &mut live, t0 + ms(20), wire.send()), Step::Throttled);
    assert_eq!(sync.step(&session, &mut live, t0 + ms(33), wire.send()), Step::Throttled);
    assert_eq!(wire.count(), 0);

    assert_eq!(sync.step(&session, &mut live, t0 + ms(34), wire.send()), Step::Sent);
    assert_eq!(wire.count(), 1);
    assert_eq!(sync.outbound().last_sent, moved(0.02));
    assert_eq!(sync.outbound().last_send_at, t0 + ms(34));
}

#[test]
fn sent_payload_is_current_live_snapshot() {
    let t0 = Instant::now();
    let session = controlling_session();
    let mut sync = SyncLoop::new(&config(), Snapshot::default(), t0);
    let wire = Wire::new(true);
    let mut live = Snapshot::new(Vec3::new(1.0, 2.0, 3.0), Quat::IDENTITY, Vec3::splat(2.0));

    assert_eq!(sync.step(&session, &mut live, t0 + ms(50), wire.send()), Step::Sent);

    let sent = wire.sent.borrow();
    let Some(Message::Transform(update)) = frames::decode_bytes(&sent[0]).expect("decode") else {
        panic!("expected transform");
    };
    assert_eq!(Snapshot::from(update), live);
}

#[test]
fn sub_threshold_motion_is_not_sent() {
    let t0 = Instant::now();
    let session = controlling_session();
    let mut sync = SyncLoop::new(&config(), Snapshot::default(), t0);
    let wire = Wire::new(true);
    let mut live = moved(0.005);

    assert_eq!(sync.step(&session, &mut live, t0 + ms(500), wire.send()), Step::Unchanged);
    assert_eq!(wire.count(), 0);
}

#[test]
fn no_resend_without_further_change() {
    let t0 = Instant::now();
    let session = controlling_session();
    let mut sync = SyncLoop::new(&config(), Snapshot::default(), t0);
    let wire = Wire::new(true);
    let mut live = moved(1.0);

    assert_eq!(sync.step(&session, &mut live, t0 + ms(40), wire.send()), Step::Sent);
    assert_eq!(sync.step(&session, &mut live, t0 + ms(80), wire.send()), Step::Unchanged);
    assert_eq!(sync.step(&session, &mut live, t0 + ms(500), wire.send()), Step::Unchanged);
    assert_eq!(wire.count(), 1);
}

#[test]
fn change_is_measured_against_last_sent_not_last_tick() {
    let t0 = Instant::now();
    let session = controlling_session();
    let mut sync = SyncLoop::new(&config(), Snapshot::default(), t0);
    let wire = Wire::new(true);

    // Small steps each under threshold, accumulating past it.
    let mut live = moved(0.006);
    assert_eq!(sync.step(&session, &mut live, t0 + ms(40), wire.send()), Step::Unchanged);
    live = moved(0.012);
    assert_eq!(sync.step(&session, &mut live, t0 + ms(80), wire.send()), Step::Sent);
}

#[test]
fn failed_send_leaves_marker_untouched_and_retries() {
    let t0 = Instant::now();
    let session = controlling_session();
    let mut sync = SyncLoop::new(&config(), Snapshot::default(), t0);
    let mut live = moved(1.0);

    let refusing = Wire::new(false);
    assert_eq!(sync.step(&session, &mut live, t0 + ms(40), refusing.send()), Step::SendFailed);
    assert_eq!(sync.outbound().last_sent, Snapshot::default());
    assert_eq!(sync.outbound().last_send_at, t0);

    let accepting = Wire::new(true);
    assert_eq!(sync.step(&session, &mut live, t0 + ms(41), accepting.send()), Step::Sent);
    assert_eq!(sync.outbound().last_sent, moved(1.0));
}

#[test]
fn sender_branch_never_moves_live_even_with_target() {
    let t0 = Instant::now();
    let session = controlling_session();
    let mut sync = SyncLoop::new(&config(), Snapshot::default(), t0);
    let wire = Wire::new(true);
    sync.set_target(moved(9.0));
    let mut live = Snapshot::default();

    for i in 1..=10 {
        sync.step(&session, &mut live, t0 + ms(i * 16), wire.send());
    }

    assert_eq!(live, Snapshot::default());
    assert!(sync.inbound().has_data);
    assert_eq!(sync.inbound().target, moved(9.0));
}

// --- Receiver branch ---

#[test]
fn receiver_waits_for_first_target() {
    let t0 = Instant::now();
    let mut sync = SyncLoop::new(&config(), Snapshot::default(), t0);
    let wire = Wire::new(true);
    let mut live = Snapshot::default();

    assert_eq!(sync.step(&receiving_session(), &mut live, t0 + ms(16), wire.send()), Step::AwaitingData);
    assert_eq!(live, Snapshot::default());
}

#[test]
fn receiver_interpolates_toward_target_and_tracks_marker() {
    let t0 = Instant::now();
    let session = receiving_session();
    let mut sync = SyncLoop::new(&config(), Snapshot::default(), t0);
    let wire = Wire::new(true);
    sync.set_target(moved(10.0));
    let mut live = Snapshot::default();

    sync.step(&session, &mut live, t0, wire.send());
    assert_eq!(sync.step(&session, &mut live, t0 + ms(16), wire.send()), Step::Interpolated);

    assert!(live.position.x > 0.0 && live.position.x < 10.0);
    assert_eq!(sync.outbound().last_sent, live);
    assert_eq!(sync.outbound().last_send_at, t0);
    assert_eq!(wire.count(), 0);
}

#[test]
fn receiver_holds_during_release_cooldown() {
    let t0 = Instant::now();
    let mut session = receiving_session();
    session.start_local_control();
    session.stop_local_control(t0, ms(200));

    let mut sync = SyncLoop::new(&config(), Snapshot::default(), t0);
    let wire = Wire::new(true);
    sync.set_target(moved(10.0));
    let mut live = Snapshot::default();

    for i in 0..12 {
        let step = sync.step(&session, &mut live, t0 + ms(i * 16), wire.send());
        assert_eq!(step, Step::CoolingDown);
    }
    assert_eq!(live, Snapshot::default());

    assert_eq!(sync.step(&session, &mut live, t0 + ms(200), wire.send()), Step::Interpolated);
    assert!(live.position.x > 0.0);
}

#[test]
fn receiver_holds_for_cooldown_too_long_for_an_instant() {
    let t0 = Instant::now();
    let mut session = receiving_session();
    session.stop_local_control(t0, Duration::MAX);

    let mut sync = SyncLoop::new(&config(), Snapshot::default(), t0);
    let wire = Wire::new(true);
    sync.set_target(moved(10.0));
    let mut live = Snapshot::default();

    sync.step(&session, &mut live, t0, wire.send());
    assert_eq!(sync.step(&session, &mut live, t0 + ms(50), wire.send()), Step::CoolingDown);
    assert_eq!(live, Snapshot::default());
}

#[test]
fn interpolated_motion_is_not_resent_after_taking_control() {
    let t0 = Instant::now();
    let mut session = receiving_session();
    let mut sync = SyncLoop::new(&config(), Snapshot::default(), t0);
    let wire = Wire::new(true);
    sync.set_target(moved(10.0));
    let mut live = Snapshot::default();

    for i in 0..=60 {
        sync.step(&session, &mut live, t0 + ms(i * 16), wire.send());
    }
    session.start_local_control();

    let step = sync.step(&session, &mut live, t0 + ms(61 * 16), wire.send());
    assert_eq!(step, Step::Unchanged);
    assert_eq!(wire.count(), 0);
}

// --- Targets ---

#[test]
fn first_target_reports_scale_change() {
    let mut sync = SyncLoop::new(&config(), Snapshot::default(), Instant::now());
    assert!(sync.set_target(Snapshot::default()));
}

#[test]
fn repeated_scale_does_not_report_change() {
    let mut sync = SyncLoop::new(&config(), Snapshot::default(), Instant::now());
    sync.set_target(moved(1.0));
    assert!(!sync.set_target(moved(2.0)));
    assert!(sync.set_target(Snapshot { scale: Vec3::splat(3.0), ..moved(2.0) }));
}
