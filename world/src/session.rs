//! Countdown, terminal flags and the report button of a running level.

use std::time::Duration;

use loopwatch_core::{ClockHour, Interactable};

/// Button the player presses to report an anomaly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReportButton {
    pressed: bool,
}

impl ReportButton {
    /// Whether the button was pressed since the last stage validation.
    #[must_use]
    pub const fn is_pressed(&self) -> bool {
        self.pressed
    }

    fn reset(&mut self) -> bool {
        std::mem::replace(&mut self.pressed, false)
    }
}

impl Interactable for ReportButton {
    /// Whether the interaction raised the flag.
    type Outcome = bool;

    fn is_interactable(&self) -> bool {
        !self.pressed
    }

    fn interact(&mut self, _held: Duration) -> Self::Outcome {
        !std::mem::replace(&mut self.pressed, true)
    }
}

/// Result of advancing the countdown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct ClockAdvance {
    pub(crate) hour_changed: Option<ClockHour>,
    pub(crate) expired: bool,
}

#[derive(Debug)]
pub(crate) struct LevelSession {
    started: bool,
    elapsed: Duration,
    limit: Duration,
    hour: ClockHour,
    objectives_met: bool,
    completed: bool,
    failed: bool,
    ended: bool,
    player_control: bool,
    guide_text_visible: bool,
    button: ReportButton,
}

impl LevelSession {
    pub(crate) fn new(limit: Duration) -> Self {
        Self {
            started: false,
            elapsed: Duration::ZERO,
            limit,
            hour: ClockHour::MIDNIGHT,
            objectives_met: false,
            completed: false,
            failed: false,
            ended: false,
            player_control: false,
            guide_text_visible: false,
            button: ReportButton::default(),
        }
    }

    /// Starts the clock; returns `false` when the level already started.
    pub(crate) fn start(&mut self) -> bool {
        if self.started {
            return false;
        }
        self.started = true;
        self.player_control = true;
        self.guide_text_visible = true;
        true
    }

    /// Whether the countdown still runs.
    pub(crate) const fn is_running(&self) -> bool {
        self.started && !self.objectives_met && !self.ended
    }

    pub(crate) fn advance(&mut self, dt: Duration) -> ClockAdvance {
        if !self.is_running() {
            return ClockAdvance::default();
        }
        self.elapsed = self.elapsed.saturating_add(dt).min(self.limit);
        let hour = ClockHour::from_elapsed(self.elapsed, self.limit);
        let hour_changed = (hour != self.hour).then(|| {
            self.hour = hour;
            hour
        });
        ClockAdvance {
            hour_changed,
            expired: self.elapsed >= self.limit,
        }
    }

    /// Latches that every target is done, which stops the clock.
    pub(crate) fn mark_objectives_met(&mut self) -> bool {
        if self.objectives_met || self.ended {
            return false;
        }
        self.objectives_met = true;
        true
    }

    /// Drops the objectives-met latch after a progress reset, restarting the clock.
    pub(crate) fn clear_objectives_met(&mut self) -> bool {
        if self.ended {
            return false;
        }
        std::mem::replace(&mut self.objectives_met, false)
    }

    /// Enters the successful end sequence; a no-op after any terminal transition.
    pub(crate) fn finish(&mut self) -> bool {
        if self.ended {
            return false;
        }
        self.completed = true;
        self.ended = true;
        self.player_control = false;
        true
    }

    /// Enters the failure end sequence; a no-op once the objectives are met or the level ended.
    pub(crate) fn fail(&mut self) -> bool {
        if self.objectives_met || self.ended {
            return false;
        }
        self.failed = true;
        self.ended = true;
        self.player_control = false;
        true
    }

    pub(crate) fn hide_guide_text(&mut self) -> bool {
        std::mem::replace(&mut self.guide_text_visible, false)
    }

    pub(crate) fn press_button(&mut self) -> bool {
        self.button.interact(Duration::ZERO)
    }

    pub(crate) fn reset_button(&mut self) -> bool {
        self.button.reset()
    }

    pub(crate) const fn is_started(&self) -> bool {
        self.started
    }

    pub(crate) const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub(crate) const fn limit(&self) -> Duration {
        self.limit
    }

    pub(crate) const fn hour(&self) -> ClockHour {
        self.hour
    }

    pub(crate) const fn objectives_met(&self) -> bool {
        self.objectives_met
    }

    pub(crate) const fn is_completed(&self) -> bool {
        self.completed
    }

    pub(crate) const fn is_failed(&self) -> bool {
        self.failed
    }

    pub(crate) const fn has_ended(&self) -> bool {
        self.ended
    }

    pub(crate) const fn player_control(&self) -> bool {
        self.player_control
    }

    pub(crate) const fn guide_text_visible(&self) -> bool {
        self.guide_text_visible
    }

    pub(crate) const fn button(&self) -> &ReportButton {
        &self.button
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(limit_secs: u64) -> LevelSession {
        let mut session = LevelSession::new(Duration::from_secs(limit_secs));
        assert!(session.start());
        session
    }

    #[test]
    fn clock_does_not_run_before_start() {
        let mut session = LevelSession::new(Duration::from_secs(360));
        assert_eq!(
            session.advance(Duration::from_secs(120)),
            ClockAdvance::default()
        );
        assert_eq!(session.elapsed(), Duration::ZERO);
    }

    #[test]
    fn hour_changes_are_reported_once() {
        let mut session = started(360);
        assert_eq!(session.advance(Duration::from_secs(30)).hour_changed, None);
        assert_eq!(
            session.advance(Duration::from_secs(30)).hour_changed,
            Some(ClockHour::new(1))
        );
        assert_eq!(session.advance(Duration::from_secs(1)).hour_changed, None);
    }

    #[test]
    fn countdown_expires_at_the_limit() {
        let mut session = started(360);
        let advance = session.advance(Duration::from_secs(400));
        assert!(advance.expired);
        assert_eq!(session.elapsed(), Duration::from_secs(360));
        assert_eq!(advance.hour_changed, Some(ClockHour::new(6)));
    }

    #[test]
    fn terminal_states_exclude_each_other() {
        let mut session = started(360);
        assert!(session.fail());
        assert!(!session.fail());
        assert!(!session.finish());
        assert!(!session.mark_objectives_met());
        assert!(session.is_failed());
        assert!(!session.is_completed());
        assert!(!session.player_control());
    }

    #[test]
    fn objectives_met_stops_the_clock_but_allows_the_exit() {
        let mut session = started(360);
        assert!(session.mark_objectives_met());
        assert!(!session.is_running());
        assert!(!session.has_ended());
        assert!(!session.fail());

        assert!(!session.is_completed());

        assert!(session.finish());
        assert!(!session.finish());
        assert!(session.has_ended());
        assert!(session.is_completed());
        assert!(!session.clear_objectives_met());
    }

    #[test]
    fn clearing_objectives_met_restarts_the_clock() {
        let mut session = started(360);
        assert!(session.mark_objectives_met());
        assert!(session.clear_objectives_met());
        assert!(!session.clear_objectives_met());
        assert!(session.is_running());
        assert!(!session.objectives_met());

        let advance = session.advance(Duration::from_secs(60));
        assert_eq!(advance.hour_changed, Some(ClockHour::new(1)));
        assert!(session.fail());
    }

    #[test]
    fn report_button_latches_until_reset() {
        let mut session = started(360);
        assert!(session.press_button());
        assert!(!session.press_button());
        assert!(session.button().is_pressed());
        assert!(session.reset_button());
        assert!(!session.reset_button());
    }
}
