#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tick-driven effects for engaged anomalies.
//!
//! The world only records whether an anomaly's effect is engaged. This system
//! turns engagement changes into presentation cues and keeps the timers of
//! periodic effects, emitting messages and scale updates as time advances.
//! Cancelling an effect simply drops its timer state.

use std::time::Duration;

use loopwatch_core::{AnomalyId, AnomalyKind, Command, EffectCue, Event};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Share of the message interval during which a message stays on screen.
const MESSAGE_SCREEN_SHARE: f32 = 0.8;

const MESSAGES: [&str; 20] = [
    "- you left something behind -",
    "- it's getting harder to remember -",
    "- this place remembers you -",
    "- they're not gone. just quiet. -",
    "- the sky changed again. did you notice? -",
    "- we tried to warn you -",
    "- don't trust the lights -",
    "- did you think it was your idea? -",
    "- you've only made it worse -",
    "- return to the origin point -",
    "- connection lost. but you're still here. -",
    "- time since last incident: UNKNOWN -",
    "- subject has deviated from expected pattern -",
    "- oversight node offline. recalculating reality -",
    "- report filed: containment unsuccessful -",
    "- proximity alert: self detected -",
    "- system integrity: deteriorating -",
    "- last safe moment: corrupted -",
    "- you are not synced -",
    "- memory slot 03: empty (wasn't it full?) -",
];

/// Configuration parameters required to construct the effects system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided message selection seed.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self { rng_seed }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Timer {
    Messages {
        interval: Duration,
        until_next: Duration,
    },
    Shrink {
        elapsed: Duration,
        duration: Duration,
        min_scale: f32,
    },
}

#[derive(Clone, Debug, PartialEq)]
struct RunningEffect {
    anomaly: AnomalyId,
    timer: Timer,
}

/// Pure system that drives anomaly effects from world events.
#[derive(Debug)]
pub struct AnomalyEffects {
    rng: ChaCha8Rng,
    running: Option<RunningEffect>,
}

impl AnomalyEffects {
    /// Creates a new effects system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            running: None,
        }
    }

    /// Reports whether a periodic effect currently keeps a timer.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Consumes world events and emits cue and message commands.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::AnomalyEffectEngaged { anomaly, kind } => self.engage(*anomaly, kind, out),
                Event::AnomalyEffectDisengaged {
                    anomaly,
                    kind,
                    forced,
                } => self.disengage(*anomaly, kind, *forced, out),
                Event::TimeAdvanced { dt } => self.advance(*dt, out),
                Event::LevelCompleted | Event::LevelFailed { .. } => self.running = None,
                _ => {}
            }
        }
    }

    fn engage(&mut self, anomaly: AnomalyId, kind: &AnomalyKind, out: &mut Vec<Command>) {
        debug!(anomaly = anomaly.get(), ?kind, "effect engaged");
        self.running = None;
        match kind {
            AnomalyKind::Duck => cue(out, EffectCue::DuckWatching { following: true }),
            AnomalyKind::PlayerMessages { .. } => {
                let Some(interval) = kind.message_interval().filter(|value| !value.is_zero())
                else {
                    return;
                };
                self.fire_message(interval, out);
                self.running = Some(RunningEffect {
                    anomaly,
                    timer: Timer::Messages {
                        interval,
                        until_next: interval,
                    },
                });
            }
            AnomalyKind::KnockingOnDoor => {
                cue(out, EffectCue::MuseumVisible { visible: false });
                cue(out, EffectCue::MuseumDoorSealed { sealed: true });
                cue(out, EffectCue::Knocking { playing: true });
            }
            AnomalyKind::VoidMuseum => {
                cue(out, EffectCue::MuseumVisible { visible: false });
                cue(out, EffectCue::MuseumDoorOpen { open: true });
            }
            AnomalyKind::Shrink {
                duration_secs,
                min_scale,
            } => {
                let duration = Duration::try_from_secs_f32(*duration_secs).unwrap_or(Duration::ZERO);
                self.running = Some(RunningEffect {
                    anomaly,
                    timer: Timer::Shrink {
                        elapsed: Duration::ZERO,
                        duration,
                        min_scale: *min_scale,
                    },
                });
            }
        }
    }

    fn disengage(
        &mut self,
        anomaly: AnomalyId,
        kind: &AnomalyKind,
        forced: bool,
        out: &mut Vec<Command>,
    ) {
        debug!(anomaly = anomaly.get(), forced, "effect disengaged");
        if self
            .running
            .as_ref()
            .is_some_and(|running| running.anomaly == anomaly)
        {
            self.running = None;
        }
        match kind {
            AnomalyKind::Duck => cue(out, EffectCue::DuckWatching { following: false }),
            AnomalyKind::PlayerMessages { .. } => {}
            AnomalyKind::KnockingOnDoor => {
                cue(out, EffectCue::Knocking { playing: false });
                cue(out, EffectCue::MuseumDoorSealed { sealed: false });
                cue(out, EffectCue::MuseumVisible { visible: true });
            }
            AnomalyKind::VoidMuseum => {
                cue(out, EffectCue::MuseumDoorOpen { open: false });
                cue(out, EffectCue::MuseumVisible { visible: true });
            }
            AnomalyKind::Shrink { .. } => cue(out, EffectCue::PlayerScale { scale: 1.0 }),
        }
    }

    fn advance(&mut self, dt: Duration, out: &mut Vec<Command>) {
        let Some(mut running) = self.running.take() else {
            return;
        };
        let keep = match &mut running.timer {
            Timer::Messages {
                interval,
                until_next,
            } => {
                let mut remaining = dt;
                while remaining >= *until_next {
                    remaining -= *until_next;
                    *until_next = *interval;
                    self.fire_message(*interval, out);
                }
                *until_next -= remaining;
                true
            }
            Timer::Shrink {
                elapsed,
                duration,
                min_scale,
            } => {
                *elapsed = elapsed.saturating_add(dt).min(*duration);
                let progress = if duration.is_zero() {
                    1.0
                } else {
                    elapsed.as_secs_f32() / duration.as_secs_f32()
                };
                let scale = 1.0 + (*min_scale - 1.0) * progress;
                cue(out, EffectCue::PlayerScale { scale });
                elapsed < duration
            }
        };
        if keep {
            self.running = Some(running);
        }
    }

    fn fire_message(&mut self, interval: Duration, out: &mut Vec<Command>) {
        let message = MESSAGES[self.rng.gen_range(0..MESSAGES.len())];
        out.push(Command::NotifyPlayer {
            message: message.to_owned(),
            duration: interval.mul_f32(MESSAGE_SCREEN_SHARE),
        });
    }
}

fn cue(out: &mut Vec<Command>, cue: EffectCue) {
    out.push(Command::PlayCue { cue });
}
