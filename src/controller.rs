//! The controller: canonical state, tick loop, and the single mutation path.
//!
//! One instance owns the [`DeviceState`] plus every piece of bookkeeping the
//! original firmware kept in statics: animation clock, pause accounting,
//! feedback blink, last applied brightness. All collaborators are injected;
//! nothing here reaches for ambient hardware.

use embassy_time::{Duration, Instant};

use crate::delta::DeltaReceiver;
use crate::encoder::EncoderShared;
use crate::input::{InputEvents, PressDuration, Reconciler, dimmed, mode_color};
use crate::persist::{self, StateStorage};
use crate::render::{FrameParams, PIXEL_OFF, Rgbw, fill_frame};
use crate::state::{DeviceState, EncoderMode, MenuMode};
use crate::supervisor::{ActivitySupervisor, IdleTimeouts};
use crate::transition::{BrightnessFade, FadeTimings};
use crate::{FeedbackLed, OutputDriver};

/// Feedback LED blink period while a value is being adjusted.
const BLINK_INTERVAL: Duration = Duration::from_millis(500);
/// Strip dim factor during the persistence window ("do not power off").
const SAVE_DIM_FACTOR: f32 = 0.25;
/// Feedback LED brightness outside of brightness adjustment.
const ENCODER_DEFAULT_BRIGHTNESS: f32 = 1.0;

/// Single-subscriber state observer, called with a snapshot after every
/// accepted state change. Must not call back into the controller.
pub type StateObserver = fn(DeviceState);

/// Host-facing configuration.
#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    /// Compiled-in defaults, used on first boot and on reset.
    pub defaults: DeviceState,
    /// Frame rate the recommended sleep is derived from.
    pub updates_per_second: u32,
    pub fades: FadeTimings,
    pub timeouts: IdleTimeouts,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            defaults: DeviceState::default(),
            updates_per_second: 60,
            fades: FadeTimings::default(),
            timeouts: IdleTimeouts::default(),
        }
    }
}

/// Device state machine and animation engine.
///
/// `MAX_LEDS` is the strip length; `DELTAS` the remote command queue depth.
pub struct Controller<'a, O, F, S, const MAX_LEDS: usize, const DELTAS: usize>
where
    O: OutputDriver,
    F: FeedbackLed,
    S: StateStorage,
{
    // Injected collaborators
    output: O,
    feedback: F,
    storage: S,
    encoder: &'a EncoderShared,
    deltas: DeltaReceiver<'a, DELTAS>,
    config: ControllerConfig,

    // Canonical state
    state: DeviceState,
    reconciler: Reconciler,
    supervisor: ActivitySupervisor,
    fade: BrightnessFade,
    frame: [Rgbw; MAX_LEDS],

    // Animation clock and pause accounting
    cycle: bool,
    start_time: Instant,
    stop_time: Instant,
    render_once: bool,

    // Feedback blink
    encoder_last_blink: Option<Instant>,
    encoder_blink_state: bool,

    observer: Option<StateObserver>,
}

impl<'a, O, F, S, const MAX_LEDS: usize, const DELTAS: usize>
    Controller<'a, O, F, S, MAX_LEDS, DELTAS>
where
    O: OutputDriver,
    F: FeedbackLed,
    S: StateStorage,
{
    pub fn new(
        output: O,
        feedback: F,
        storage: S,
        encoder: &'a EncoderShared,
        deltas: DeltaReceiver<'a, DELTAS>,
        config: ControllerConfig,
    ) -> Self {
        let epoch = Instant::from_millis(0);
        Self {
            output,
            feedback,
            storage,
            encoder,
            deltas,
            state: config.defaults.sanitized(),
            reconciler: Reconciler::new(),
            supervisor: ActivitySupervisor::new(config.timeouts, epoch),
            fade: BrightnessFade::new(0.0),
            frame: [PIXEL_OFF; MAX_LEDS],
            cycle: true,
            start_time: epoch,
            stop_time: epoch,
            render_once: false,
            encoder_last_blink: None,
            encoder_blink_state: false,
            observer: None,
            config,
        }
    }

    /// Restore persisted state (or defaults), arm the boot fade-in and
    /// render the first frame.
    pub fn init(&mut self, now: Instant) {
        self.state = match persist::load(&mut self.storage) {
            Ok(saved) => {
                #[cfg(feature = "defmt")]
                defmt::info!("[controller] restored saved state");
                saved
            }
            Err(_) => {
                #[cfg(feature = "defmt")]
                defmt::info!("[controller] no saved state, using defaults");
                self.config.defaults.sanitized()
            }
        };
        // The menu always boots closed, whatever was on screen when saved.
        self.state.encoder_mode = EncoderMode::Off;

        self.supervisor = ActivitySupervisor::new(self.config.timeouts, now);
        self.start_time = now;
        self.stop_time = now;
        self.cycle = !self.state.stopped;

        self.fade = BrightnessFade::new(0.0);
        if self.state.on {
            self.fade
                .start(0.0, self.state.brightness, self.config.fades.fade_in, now);
        }

        self.sync_feedback();
        self.render_frame(now);
    }

    /// One frame of work. Returns the recommended sleep before the next
    /// call; the host may sleep less, never more usefully.
    pub fn tick(&mut self, now: Instant, button: Option<PressDuration>) -> Duration {
        let events = InputEvents {
            rotation: self.encoder.take_rotation().unwrap_or(0),
            clicked: self.encoder.take_clicked(),
            button,
        };
        if events.rotation != 0 || events.clicked {
            self.supervisor.note_encoder(now);
        } else if events.button.is_some() {
            self.supervisor.note_activity(now);
        }

        if !events.is_empty() {
            self.handle_input(&events, now);
        }

        self.drain_deltas(now);
        self.run_supervisor(now);

        let fade_changed = self.fade.tick(now).is_some();
        let animating = self.state.on && self.cycle && !self.state.stopped;
        if animating || fade_changed || self.render_once {
            self.render_frame(now);
            self.render_once = false;
        }

        if self.reconciler.menu_mode() == MenuMode::Adjust {
            self.blink_feedback(now);
        }

        Duration::from_millis(u64::from(1000 / self.config.updates_per_second.max(1)))
    }

    /// The single state-mutation entry point, used by local reconciliation,
    /// remote deltas and the supervisor alike.
    ///
    /// Ordering: sanitize, derive `stopped`, arm the fade from the
    /// pre-toggle effective brightness, detect material pattern changes,
    /// commit, resync feedback, notify. Observers never see a half-updated
    /// state.
    pub fn apply_state(&mut self, candidate: DeviceState, now: Instant) {
        let mut next = candidate.sanitized();

        // A zero speed is a stop request: remember the running speed so a
        // resume picks it back up instantly.
        if next.speed == 0.0 {
            next.stopped = true;
            next.speed = self.state.speed;
        }

        if next == self.state {
            return;
        }

        if next.on != self.state.on {
            let from = self.fade.current(now);
            let (to, duration) = if next.on {
                (next.brightness, self.config.fades.fade_in)
            } else {
                (0.0, self.config.fades.fade_out)
            };
            self.fade.start(from, to, duration, now);
        } else if next.on && next.brightness != self.state.brightness {
            self.fade.snap_to(next.brightness);
        }

        // Pattern-shaping fields force one render even while paused.
        if next.hue != self.state.hue
            || next.angle != self.state.angle
            || next.effect != self.state.effect
            || next.brightness != self.state.brightness
        {
            self.render_once = true;
        }

        let stop_changed = next.stopped != self.state.stopped;
        self.state = next;

        if stop_changed {
            self.set_cycle(!self.state.stopped, now);
        }

        self.sync_feedback();

        #[cfg(feature = "defmt")]
        defmt::debug!("[controller] state changed: {}", self.state);

        if let Some(observer) = self.observer {
            observer(self.state);
        }
    }

    /// Read-only snapshot for the command channel and tests.
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Register the single change observer. Initialization-time only; the
    /// observer runs synchronously inside `apply_state`.
    pub fn set_on_state_change(&mut self, observer: StateObserver) {
        self.observer = Some(observer);
    }

    /// Feed the presence collaborator's boolean in. Presence counts as
    /// activity for the global-idle timer.
    pub fn set_presence(&mut self, present: bool, now: Instant) {
        if present {
            self.supervisor.note_activity(now);
        }
        let absent = !present;
        if self.state.absent == absent {
            return;
        }
        let mut candidate = self.state;
        candidate.absent = absent;
        self.apply_state(candidate, now);
    }

    /// The most recently written frame.
    pub fn frame(&self) -> &[Rgbw] {
        &self.frame
    }

    /// Get a reference to the output driver.
    pub fn output(&self) -> &O {
        &self.output
    }

    /// Get a mutable reference to the output driver.
    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    fn handle_input(&mut self, events: &InputEvents, now: Instant) {
        let menu_before = self.reconciler.menu_mode();
        let outcome = self.reconciler.reconcile(&self.state, events);

        if outcome.save_requested {
            self.save_state(now);
        }

        self.apply_state(outcome.candidate, now);

        if let Some(cycle) = outcome.cycle {
            // A stopped strand keeps its clock frozen whatever the menu does.
            if !cycle {
                self.set_cycle(false, now);
            } else if !self.state.stopped {
                self.set_cycle(true, now);
            }
        }
        if outcome.render_once {
            self.render_once = true;
        }

        if self.reconciler.menu_mode() != menu_before {
            self.encoder_last_blink = None;
            self.encoder_blink_state = false;
            self.sync_feedback();
        }
    }

    fn drain_deltas(&mut self, now: Instant) {
        while let Some(delta) = self.deltas.try_receive() {
            match delta.apply_to(&self.state) {
                Ok(candidate) => {
                    self.supervisor.note_activity(now);
                    self.apply_state(candidate, now);
                }
                Err(_err) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("[controller] dropped malformed delta: {}", _err);
                }
            }
        }
    }

    fn run_supervisor(&mut self, now: Instant) {
        let menu_open = self.state.encoder_mode != EncoderMode::Off
            || self.reconciler.menu_mode() == MenuMode::Adjust;
        let actions = self.supervisor.poll(now, menu_open, self.state.on);

        if actions.exit_menu {
            #[cfg(feature = "defmt")]
            defmt::debug!("[controller] encoder idle, leaving menu");
            self.reconciler.exit_menu();
            self.encoder_last_blink = None;
            self.encoder_blink_state = false;
            let mut candidate = self.state;
            candidate.encoder_mode = EncoderMode::Off;
            self.apply_state(candidate, now);
            // Closing the menu ends any adjust-mode pause, like a click does.
            if !self.state.stopped {
                self.set_cycle(true, now);
            }
            self.sync_feedback();
        }

        if actions.power_off {
            #[cfg(feature = "defmt")]
            defmt::info!("[controller] global idle, powering off");
            let mut candidate = self.state;
            candidate.on = false;
            self.apply_state(candidate, now);
        }
    }

    /// Persist the current state, dimming the strip for the write window.
    fn save_state(&mut self, now: Instant) {
        let dim = FrameParams {
            hue: self.state.hue,
            angle: self.state.angle,
            time: self.animation_time(now),
            effect: self.state.effect,
            brightness: self.fade.current(now) * SAVE_DIM_FACTOR,
        };
        fill_frame(&mut self.frame, &dim);
        self.output.write(&self.frame);

        match persist::save(&mut self.storage, &self.state) {
            Ok(()) => {
                #[cfg(feature = "defmt")]
                defmt::info!("[controller] state saved");
            }
            Err(_err) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("[controller] save failed: {}", _err);
            }
        }
        // Restore the full-brightness frame on this tick.
        self.render_once = true;
    }

    /// Start or freeze the animation clock, folding paused time into the
    /// clock origin so the pattern resumes where it stopped.
    fn set_cycle(&mut self, run: bool, now: Instant) {
        if self.cycle == run {
            return;
        }
        if run {
            self.start_time += self.paused_time(now);
        } else {
            self.stop_time = now;
        }
        self.cycle = run;
    }

    fn paused_time(&self, now: Instant) -> Duration {
        if self.cycle {
            Duration::from_millis(0)
        } else {
            now - self.stop_time
        }
    }

    /// Unpaused milliseconds scaled by the current speed.
    #[allow(clippy::cast_precision_loss)]
    fn animation_time(&self, now: Instant) -> f32 {
        let elapsed = (now - self.start_time) - self.paused_time(now);
        elapsed.as_millis() as f32 * self.state.speed
    }

    fn render_frame(&mut self, now: Instant) {
        let params = FrameParams {
            hue: self.state.hue,
            angle: self.state.angle,
            time: self.animation_time(now),
            effect: self.state.effect,
            brightness: self.fade.current(now),
        };
        fill_frame(&mut self.frame, &params);
        self.output.write(&self.frame);
    }

    fn sync_feedback(&mut self) {
        let color = mode_color(self.state.encoder_mode);
        let brightness = if self.state.encoder_mode == EncoderMode::Brightness {
            self.state.brightness
        } else {
            ENCODER_DEFAULT_BRIGHTNESS
        };
        self.feedback.set_brightness(brightness);
        self.feedback.set_color(if self.encoder_blink_state {
            dimmed(color)
        } else {
            color
        });
    }

    fn blink_feedback(&mut self, now: Instant) {
        let due = match self.encoder_last_blink {
            None => true,
            Some(last) => now >= last + BLINK_INTERVAL,
        };
        if due {
            self.encoder_last_blink = Some(now);
            self.encoder_blink_state = !self.encoder_blink_state;
            self.sync_feedback();
        }
    }
}
