//! End-to-end controller behavior with mock collaborators.

mod common;
use common::{MemoryStorage, MockFeedback, MockStrip};

use core::sync::atomic::{AtomicUsize, Ordering};

use embassy_time::{Duration, Instant};
use strand_light_control::persist::load;
use strand_light_control::state::DEFAULT_BRIGHTNESS;
use strand_light_control::{
    Controller, ControllerConfig, DeltaQueue, DeviceState, EffectId, EncoderMode, EncoderShared,
    IdleTimeouts, PressDuration, SpeedPreset, StateDelta,
};

const LEDS: usize = 16;
const QUEUE: usize = 4;

type TestController<'a> = Controller<'a, MockStrip, MockFeedback, MemoryStorage, LEDS, QUEUE>;

fn at(ms: u64) -> Instant {
    Instant::from_millis(ms)
}

fn controller<'a>(
    encoder: &'a EncoderShared,
    queue: &'a DeltaQueue<QUEUE>,
    storage: MemoryStorage,
    config: ControllerConfig,
) -> TestController<'a> {
    Controller::new(
        MockStrip::new(),
        MockFeedback::new(),
        storage,
        encoder,
        queue.receiver(),
        config,
    )
}

#[test]
fn fresh_boot_loads_defaults_and_fades_in() {
    let encoder = EncoderShared::new();
    let queue = DeltaQueue::new();
    let mut ctl = controller(
        &encoder,
        &queue,
        MemoryStorage::blank(),
        ControllerConfig::default(),
    );

    ctl.init(at(0));
    assert_eq!(ctl.state(), DeviceState::default());

    // The boot frame starts dark and ramps toward the default brightness.
    assert!(ctl.output().last_frame.iter().all(|p| p.r == 0 && p.g == 0));
    ctl.tick(at(500), None);
    let mid = ctl.output().last_frame.clone();
    assert!(mid.iter().any(|p| p.r > 0 || p.g > 0 || p.b > 0));
    ctl.tick(at(5_000), None);
    let settled = ctl.output().last_frame.clone();
    assert!(settled.iter().any(|p| p.r > 0 || p.g > 0 || p.b > 0));
}

#[test]
fn boot_with_saved_record_restores_it() {
    let saved = DeviceState {
        hue: 0.1,
        brightness: 0.8,
        effect: EffectId::WhiteChase,
        ..DeviceState::default()
    };
    let mut storage = MemoryStorage::blank();
    strand_light_control::persist::save(&mut storage, &saved).unwrap();

    let encoder = EncoderShared::new();
    let queue = DeltaQueue::new();
    let mut ctl = controller(&encoder, &queue, storage, ControllerConfig::default());
    ctl.init(at(0));

    let state = ctl.state();
    assert_eq!(state.effect, EffectId::WhiteChase);
    assert!((state.brightness - 0.8).abs() < 1e-6);
    // The menu always boots closed.
    assert_eq!(state.encoder_mode, EncoderMode::Off);
}

#[test]
fn apply_state_is_a_detected_noop_for_unchanged_state() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    fn observer(_state: DeviceState) {
        CALLS.fetch_add(1, Ordering::SeqCst);
    }

    let encoder = EncoderShared::new();
    let queue = DeltaQueue::new();
    let mut ctl = controller(
        &encoder,
        &queue,
        MemoryStorage::blank(),
        ControllerConfig::default(),
    );
    ctl.init(at(0));
    ctl.set_on_state_change(observer);

    let unchanged = ctl.state();
    ctl.apply_state(unchanged, at(100));
    assert_eq!(CALLS.load(Ordering::SeqCst), 0);

    let mut dimmer = unchanged;
    dimmer.brightness = 0.3;
    ctl.apply_state(dimmer, at(200));
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
}

#[test]
fn power_toggle_fades_from_the_pre_toggle_level() {
    let encoder = EncoderShared::new();
    let queue = DeltaQueue::new();
    let mut ctl = controller(
        &encoder,
        &queue,
        MemoryStorage::blank(),
        ControllerConfig::default(),
    );
    ctl.init(at(0));

    // Settle the boot fade-in.
    ctl.tick(at(5_000), None);
    let lit = ctl.output().last_frame.clone();

    let mut off = ctl.state();
    off.on = false;
    ctl.apply_state(off, at(5_000));

    // Immediately after the toggle the output is still at the lit level.
    ctl.tick(at(5_000), None);
    assert_eq!(ctl.output().last_frame, lit);

    // Once the fade-out elapses the strip is dark and stays dark.
    ctl.tick(at(10_000), None);
    assert!(ctl.output().last_frame.iter().all(|p| {
        p.r == 0 && p.g == 0 && p.b == 0 && p.a.0 == 0
    }));
    let writes = ctl.output().writes;
    ctl.tick(at(11_000), None);
    ctl.tick(at(12_000), None);
    assert_eq!(ctl.output().writes, writes);
}

#[test]
fn powering_back_on_replays_the_previous_parameters() {
    let encoder = EncoderShared::new();
    let queue = DeltaQueue::new();
    let mut ctl = controller(
        &encoder,
        &queue,
        MemoryStorage::blank(),
        ControllerConfig::default(),
    );
    ctl.init(at(0));

    let mut custom = ctl.state();
    custom.hue = 0.12;
    custom.effect = EffectId::WhiteChase;
    ctl.apply_state(custom, at(100));

    let mut off = ctl.state();
    off.on = false;
    ctl.apply_state(off, at(200));

    let mut on = ctl.state();
    on.on = true;
    ctl.apply_state(on, at(300));

    let state = ctl.state();
    assert!((state.hue - 0.12).abs() < 1e-6);
    assert_eq!(state.effect, EffectId::WhiteChase);
}

#[test]
fn stopping_through_zero_retains_the_last_speed() {
    let encoder = EncoderShared::new();
    let queue = DeltaQueue::new();
    let mut ctl = controller(
        &encoder,
        &queue,
        MemoryStorage::blank(),
        ControllerConfig::default(),
    );
    ctl.init(at(0));

    let mut moving = ctl.state();
    moving.speed = 0.05;
    ctl.apply_state(moving, at(100));

    let mut stop = ctl.state();
    stop.speed = 0.0;
    ctl.apply_state(stop, at(200));

    let state = ctl.state();
    assert!(state.stopped);
    assert!((state.speed - 0.05).abs() < 1e-6);
}

#[test]
fn pause_and_resume_preserve_the_animation_phase() {
    let encoder = EncoderShared::new();
    let queue = DeltaQueue::new();
    let mut ctl = controller(
        &encoder,
        &queue,
        MemoryStorage::blank(),
        ControllerConfig::default(),
    );
    ctl.init(at(0));

    // Render while running, then stop at the same instant.
    ctl.tick(at(2_000), None);
    let paused_frame = ctl.output().last_frame.clone();
    queue
        .sender()
        .try_send(StateDelta {
            speed: Some(0.0),
            ..StateDelta::default()
        })
        .unwrap();
    ctl.tick(at(2_000), None);

    // Frozen: no frames while stopped.
    let writes = ctl.output().writes;
    ctl.tick(at(3_000), None);
    ctl.tick(at(4_000), None);
    assert_eq!(ctl.output().writes, writes);

    // Resume three seconds later: the first frame matches the pause point.
    queue
        .sender()
        .try_send(StateDelta {
            speed: Some(DeviceState::default().speed),
            ..StateDelta::default()
        })
        .unwrap();
    ctl.tick(at(5_000), None);
    assert_eq!(ctl.output().last_frame, paused_frame);
}

#[test]
fn effect_spec_delta_sets_effect_and_speed_and_resumes() {
    let encoder = EncoderShared::new();
    let queue = DeltaQueue::new();
    let mut ctl = controller(
        &encoder,
        &queue,
        MemoryStorage::blank(),
        ControllerConfig::default(),
    );
    ctl.init(at(0));

    let mut stop = ctl.state();
    stop.speed = 0.0;
    ctl.apply_state(stop, at(100));
    assert!(ctl.state().stopped);

    let (effect, speed) = strand_light_control::parse_effect_spec("white_chase:fast").unwrap();
    queue
        .sender()
        .try_send(StateDelta {
            effect: Some(effect),
            speed,
            ..StateDelta::default()
        })
        .unwrap();
    ctl.tick(at(200), None);

    let state = ctl.state();
    assert_eq!(state.effect, EffectId::WhiteChase);
    assert!((state.speed - SpeedPreset::Fast.value()).abs() < 1e-6);
    assert!(!state.stopped);
}

#[test]
fn malformed_delta_is_dropped_whole() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    fn observer(_state: DeviceState) {
        CALLS.fetch_add(1, Ordering::SeqCst);
    }

    let encoder = EncoderShared::new();
    let queue = DeltaQueue::new();
    let mut ctl = controller(
        &encoder,
        &queue,
        MemoryStorage::blank(),
        ControllerConfig::default(),
    );
    ctl.init(at(0));
    ctl.set_on_state_change(observer);

    let before = ctl.state();
    queue
        .sender()
        .try_send(StateDelta {
            power: Some(false),
            hue: Some(f32::NAN),
            ..StateDelta::default()
        })
        .unwrap();
    ctl.tick(at(100), None);

    assert_eq!(ctl.state(), before);
    assert_eq!(CALLS.load(Ordering::SeqCst), 0);
}

#[test]
fn remote_brightness_and_hue_use_external_scales() {
    let encoder = EncoderShared::new();
    let queue = DeltaQueue::new();
    let mut ctl = controller(
        &encoder,
        &queue,
        MemoryStorage::blank(),
        ControllerConfig::default(),
    );
    ctl.init(at(0));

    queue
        .sender()
        .try_send(StateDelta {
            hue: Some(180.0),
            saturation: Some(50.0),
            brightness: Some(75.0),
            ..StateDelta::default()
        })
        .unwrap();
    ctl.tick(at(100), None);

    let state = ctl.state();
    assert!((state.hue - 0.5).abs() < 1e-6);
    assert!((state.angle - 0.5).abs() < 1e-6);
    assert!((state.brightness - 0.75).abs() < 1e-6);
}

#[test]
fn global_idle_powers_off_exactly_once() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    fn observer(state: DeviceState) {
        if !state.on {
            CALLS.fetch_add(1, Ordering::SeqCst);
        }
    }

    let encoder = EncoderShared::new();
    let queue = DeltaQueue::new();
    let config = ControllerConfig {
        timeouts: IdleTimeouts {
            global: Some(Duration::from_secs(10)),
            ..IdleTimeouts::default()
        },
        ..ControllerConfig::default()
    };
    let mut ctl = controller(&encoder, &queue, MemoryStorage::blank(), config);
    ctl.init(at(0));
    ctl.set_on_state_change(observer);

    ctl.tick(at(5_000), None);
    assert!(ctl.state().on);

    ctl.tick(at(11_000), None);
    assert!(!ctl.state().on);
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);

    // The timer does not re-fire until the next activity.
    ctl.tick(at(30_000), None);
    ctl.tick(at(60_000), None);
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
}

#[test]
fn encoder_idle_closes_the_menu_but_never_the_light() {
    let encoder = EncoderShared::new();
    let queue = DeltaQueue::new();
    let mut ctl = controller(
        &encoder,
        &queue,
        MemoryStorage::blank(),
        ControllerConfig::default(),
    );
    ctl.init(at(0));

    encoder.mark_clicked();
    ctl.tick(at(1_000), None);
    assert_eq!(ctl.state().encoder_mode, EncoderMode::Colour);

    // Default encoder timeout is 30 s past the last interaction.
    ctl.tick(at(40_000), None);
    assert_eq!(ctl.state().encoder_mode, EncoderMode::Off);
    assert!(ctl.state().on);
}

#[test]
fn menu_timeout_resumes_a_paused_animation() {
    let encoder = EncoderShared::new();
    let queue = DeltaQueue::new();
    let mut ctl = controller(
        &encoder,
        &queue,
        MemoryStorage::blank(),
        ControllerConfig::default(),
    );
    ctl.init(at(0));

    // Click into Colour/Adjust and nudge the hue: the clock pauses.
    encoder.mark_clicked();
    ctl.tick(at(1_000), None);
    encoder.add_rotation(2);
    ctl.tick(at(2_000), None);

    // Frozen while the adjustment session is open.
    let writes = ctl.output().writes;
    ctl.tick(at(3_000), None);
    ctl.tick(at(4_000), None);
    assert_eq!(ctl.output().writes, writes);

    // The idle timeout closes the menu and the animation picks back up.
    ctl.tick(at(33_000), None);
    assert_eq!(ctl.state().encoder_mode, EncoderMode::Off);
    let writes = ctl.output().writes;
    ctl.tick(at(34_000), None);
    assert!(ctl.output().writes > writes);
}

#[test]
fn click_from_idle_jumps_into_colour_adjustment() {
    let encoder = EncoderShared::new();
    let queue = DeltaQueue::new();
    let mut ctl = controller(
        &encoder,
        &queue,
        MemoryStorage::blank(),
        ControllerConfig::default(),
    );
    ctl.init(at(0));

    encoder.mark_clicked();
    ctl.tick(at(100), None);
    assert_eq!(ctl.state().encoder_mode, EncoderMode::Colour);

    // Rotation now adjusts hue directly: +5 detents move hue by 0.1.
    let hue = ctl.state().hue;
    encoder.add_rotation(5);
    ctl.tick(at(200), None);
    assert!((ctl.state().hue - (hue + 0.1)).abs() < 1e-5);
}

#[test]
fn menu_walk_reaches_brightness_and_adjusts_it_live() {
    let encoder = EncoderShared::new();
    let queue = DeltaQueue::new();
    let mut ctl = controller(
        &encoder,
        &queue,
        MemoryStorage::blank(),
        ControllerConfig::default(),
    );
    ctl.init(at(0));

    // Click into Colour/Adjust, click again back to Select.
    encoder.mark_clicked();
    ctl.tick(at(100), None);
    encoder.mark_clicked();
    ctl.tick(at(200), None);

    // Two single-detent steps: Colour -> Angle -> Brightness.
    encoder.add_rotation(1);
    ctl.tick(at(300), None);
    encoder.add_rotation(1);
    ctl.tick(at(400), None);
    assert_eq!(ctl.state().encoder_mode, EncoderMode::Brightness);

    // Into Adjust, then raise the value.
    encoder.mark_clicked();
    ctl.tick(at(500), None);
    encoder.add_rotation(5);
    ctl.tick(at(600), None);

    let expected = DEFAULT_BRIGHTNESS + 0.1;
    assert!((ctl.state().brightness - expected).abs() < 1e-5);
    // The feedback LED tracks the live value while adjusting brightness.
    // (Its brightness is resynced on every accepted state change.)
}

#[test]
fn short_press_restores_defaults() {
    let encoder = EncoderShared::new();
    let queue = DeltaQueue::new();
    let mut ctl = controller(
        &encoder,
        &queue,
        MemoryStorage::blank(),
        ControllerConfig::default(),
    );
    ctl.init(at(0));

    let mut custom = ctl.state();
    custom.hue = 0.9;
    custom.effect = EffectId::WhiteChase;
    custom.encoder_mode = EncoderMode::Speed;
    ctl.apply_state(custom, at(100));

    ctl.tick(at(200), Some(PressDuration::Short));
    let state = ctl.state();
    assert_eq!(state, DeviceState::default());
    assert_eq!(state.encoder_mode, EncoderMode::Off);
}

#[test]
fn presence_counts_as_activity_and_tracks_absence() {
    let encoder = EncoderShared::new();
    let queue = DeltaQueue::new();
    let config = ControllerConfig {
        timeouts: IdleTimeouts {
            global: Some(Duration::from_secs(10)),
            ..IdleTimeouts::default()
        },
        ..ControllerConfig::default()
    };
    let mut ctl = controller(&encoder, &queue, MemoryStorage::blank(), config);
    ctl.init(at(0));

    // Someone is around: the global-idle timer keeps re-arming.
    ctl.set_presence(true, at(8_000));
    ctl.tick(at(12_000), None);
    assert!(ctl.state().on);
    assert!(!ctl.state().absent);

    // They leave; absence is recorded and idle eventually powers off.
    ctl.set_presence(false, at(13_000));
    assert!(ctl.state().absent);
    ctl.tick(at(20_000), None);
    assert!(!ctl.state().on);
}

#[test]
fn long_press_persists_the_current_state() {
    let encoder = EncoderShared::new();
    let queue = DeltaQueue::new();
    let storage = MemoryStorage::blank();
    let mut ctl = controller(
        &encoder,
        &queue,
        storage.clone(),
        ControllerConfig::default(),
    );
    ctl.init(at(0));

    let mut custom = ctl.state();
    custom.hue = 0.33;
    ctl.apply_state(custom, at(100));

    ctl.tick(at(200), Some(PressDuration::Long));

    assert_eq!(storage.programs(), 1);
    let mut reader = storage.clone();
    let restored = load(&mut reader).unwrap();
    assert!((restored.hue - 0.33).abs() < 1e-6);
}
