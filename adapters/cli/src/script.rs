use std::time::Duration;

use loopwatch_core::{DoorSide, TargetId};
use thiserror::Error;

/// Marker introducing a comment that runs until the end of the line.
const COMMENT_PREFIX: char = '#';

/// Single player action of a walk script.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Step {
    /// Starts the level.
    Start,
    /// Lets simulated time pass.
    Wait(Duration),
    /// Presses the report button.
    Report,
    /// Presses the report button only when the current stage holds an anomaly.
    Observe,
    /// Crosses the current stage and the offload boundary of its successor.
    Walk,
    /// Uses a door of the current stage.
    Door(DoorSide),
    /// Holds the interact key on every visible target that is not completed.
    Collect,
    /// Holds the interact key on a specific target.
    Target {
        /// Target to use.
        target: TargetId,
        /// How long the key is held.
        held: Duration,
    },
    /// Steps into the end area.
    Escape,
    /// Lets an enemy reach the player.
    Caught,
}

/// Ordered list of player actions driven through a level.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Script {
    steps: Vec<Step>,
}

impl Script {
    /// Tour used when no script file is supplied.
    pub(crate) fn default_tour() -> Self {
        let mut steps = vec![Step::Start, Step::Wait(Duration::from_secs(12))];
        for _ in 0..4 {
            steps.extend([Step::Observe, Step::Walk, Step::Wait(Duration::from_secs(20))]);
        }
        steps.extend([Step::Collect, Step::Observe, Step::Walk, Step::Escape]);
        Self { steps }
    }

    /// Parses a script with one step per line.
    pub(crate) fn parse(text: &str) -> Result<Self, ScriptError> {
        let mut steps = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let content = raw
                .split_once(COMMENT_PREFIX)
                .map_or(raw, |(before, _)| before)
                .trim();
            if content.is_empty() {
                continue;
            }
            steps.push(parse_step(line, content)?);
        }
        Ok(Self { steps })
    }

    /// Steps in execution order.
    pub(crate) fn steps(&self) -> &[Step] {
        &self.steps
    }
}

/// Errors raised while reading a walk script.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub(crate) enum ScriptError {
    /// The line names an action that does not exist.
    #[error("line {line}: unknown step `{step}`")]
    UnknownStep {
        /// One-based line number.
        line: usize,
        /// Offending keyword.
        step: String,
    },
    /// A required argument is absent.
    #[error("line {line}: `{step}` expects {expected}")]
    MissingArgument {
        /// One-based line number.
        line: usize,
        /// Keyword of the step.
        step: &'static str,
        /// Description of the missing argument.
        expected: &'static str,
    },
    /// A numeric argument could not be parsed.
    #[error("line {line}: `{value}` is not a valid {expected}")]
    InvalidArgument {
        /// One-based line number.
        line: usize,
        /// Offending argument.
        value: String,
        /// Description of the expected argument.
        expected: &'static str,
    },
    /// The step received more arguments than it accepts.
    #[error("line {line}: unexpected argument `{value}`")]
    UnexpectedArgument {
        /// One-based line number.
        line: usize,
        /// First surplus argument.
        value: String,
    },
}

fn parse_step(line: usize, content: &str) -> Result<Step, ScriptError> {
    let mut parts = content.split_whitespace();
    let keyword = parts.next().unwrap_or_default();
    let step = match keyword {
        "start" => Step::Start,
        "wait" => Step::Wait(parse_seconds(line, parts.next(), "wait")?),
        "report" => Step::Report,
        "observe" => Step::Observe,
        "walk" => Step::Walk,
        "door" => Step::Door(parse_door(line, parts.next())?),
        "collect" => Step::Collect,
        "target" => {
            let target = parse_target(line, parts.next())?;
            let held = parse_seconds(line, parts.next(), "target")?;
            Step::Target { target, held }
        }
        "escape" => Step::Escape,
        "caught" => Step::Caught,
        other => {
            return Err(ScriptError::UnknownStep {
                line,
                step: other.to_owned(),
            })
        }
    };
    match parts.next() {
        Some(extra) => Err(ScriptError::UnexpectedArgument {
            line,
            value: extra.to_owned(),
        }),
        None => Ok(step),
    }
}

fn parse_seconds(
    line: usize,
    value: Option<&str>,
    step: &'static str,
) -> Result<Duration, ScriptError> {
    const EXPECTED: &str = "number of seconds";
    let value = value.ok_or(ScriptError::MissingArgument {
        line,
        step,
        expected: EXPECTED,
    })?;
    value
        .parse::<f32>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f32(secs).ok())
        .ok_or_else(|| ScriptError::InvalidArgument {
            line,
            value: value.to_owned(),
            expected: EXPECTED,
        })
}

fn parse_door(line: usize, value: Option<&str>) -> Result<DoorSide, ScriptError> {
    const EXPECTED: &str = "door (`entry` or `exit`)";
    match value {
        Some("entry") => Ok(DoorSide::Entry),
        Some("exit") => Ok(DoorSide::Exit),
        Some(other) => Err(ScriptError::InvalidArgument {
            line,
            value: other.to_owned(),
            expected: EXPECTED,
        }),
        None => Err(ScriptError::MissingArgument {
            line,
            step: "door",
            expected: EXPECTED,
        }),
    }
}

fn parse_target(line: usize, value: Option<&str>) -> Result<TargetId, ScriptError> {
    const EXPECTED: &str = "target id";
    let value = value.ok_or(ScriptError::MissingArgument {
        line,
        step: "target",
        expected: EXPECTED,
    })?;
    value
        .parse::<u32>()
        .map(TargetId::new)
        .map_err(|_| ScriptError::InvalidArgument {
            line,
            value: value.to_owned(),
            expected: EXPECTED,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_step_and_skips_comments() {
        let script = Script::parse(
            "# opening\n\
             start\n\
             wait 1.5\n\
             \n\
             report   # noticed the duck\n\
             observe\n\
             walk\n\
             door entry\n\
             collect\n\
             target 2 3\n\
             escape\n\
             caught\n",
        )
        .expect("valid script");

        assert_eq!(
            script.steps(),
            [
                Step::Start,
                Step::Wait(Duration::from_millis(1500)),
                Step::Report,
                Step::Observe,
                Step::Walk,
                Step::Door(DoorSide::Entry),
                Step::Collect,
                Step::Target {
                    target: TargetId::new(2),
                    held: Duration::from_secs(3),
                },
                Step::Escape,
                Step::Caught,
            ]
        );
    }

    #[test]
    fn unknown_steps_report_their_line() {
        let error = Script::parse("start\nrun\n").expect_err("unknown step");
        assert_eq!(
            error,
            ScriptError::UnknownStep {
                line: 2,
                step: "run".to_owned(),
            }
        );
        assert_eq!(error.to_string(), "line 2: unknown step `run`");
    }

    #[test]
    fn negative_waits_are_rejected() {
        let error = Script::parse("wait -3").expect_err("negative wait");
        assert!(matches!(
            error,
            ScriptError::InvalidArgument { line: 1, ref value, .. } if value == "-3"
        ));
    }

    #[test]
    fn arguments_are_checked() {
        assert!(matches!(
            Script::parse("door"),
            Err(ScriptError::MissingArgument { step: "door", .. })
        ));
        assert!(matches!(
            Script::parse("door window"),
            Err(ScriptError::InvalidArgument { .. })
        ));
        assert!(matches!(
            Script::parse("walk twice"),
            Err(ScriptError::UnexpectedArgument { line: 1, .. })
        ));
    }

    #[test]
    fn default_tour_starts_the_level_and_ends_at_the_exit() {
        let tour = Script::default_tour();
        assert_eq!(tour.steps().first(), Some(&Step::Start));
        assert_eq!(tour.steps().last(), Some(&Step::Escape));
    }
}
