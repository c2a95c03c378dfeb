use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StageError {
    #[error("traffic shape has no stages")]
    Empty,

    #[error("invalid duration '{0}': expected forms like 30s, 1m, 1m30s, 500ms, 2h")]
    InvalidDuration(String),

    #[error("traffic shape is too long")]
    TooLong,
}

/// One segment of the traffic shape: ramp linearly to `target` VUs over `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub duration: Duration,
    pub target: u32,
}

impl Stage {
    pub fn new(duration: Duration, target: u32) -> Self {
        Self { duration, target }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} VUs", format_duration(self.duration), self.target)
    }
}

/// Ordered traffic shape. The run starts at 0 VUs and each stage ramps from the
/// previous stage's target to its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Stage>", into = "Vec<Stage>")]
pub struct Stages(Vec<Stage>);

impl TryFrom<Vec<Stage>> for Stages {
    type Error = StageError;

    fn try_from(stages: Vec<Stage>) -> Result<Self, Self::Error> {
        Self::new(stages)
    }
}

impl From<Stages> for Vec<Stage> {
    fn from(stages: Stages) -> Self {
        stages.0
    }
}

impl Stages {
    pub fn new(stages: Vec<Stage>) -> Result<Self, StageError> {
        if stages.is_empty() {
            return Err(StageError::Empty);
        }
        // target_at and total_duration add stage durations unchecked
        stages
            .iter()
            .try_fold(Duration::ZERO, |acc, s| acc.checked_add(s.duration))
            .ok_or(StageError::TooLong)?;
        Ok(Self(stages))
    }

    pub fn as_slice(&self) -> &[Stage] {
        &self.0
    }

    pub fn total_duration(&self) -> Duration {
        self.0.iter().map(|s| s.duration).sum()
    }

    pub fn max_target(&self) -> u32 {
        self.0.iter().map(|s| s.target).max().unwrap_or(0)
    }

    pub fn is_finished(&self, elapsed: Duration) -> bool {
        elapsed >= self.total_duration()
    }

    /// Target VU count at `elapsed` since the start of the run.
    ///
    /// Past the final stage this returns the last stage's target; callers stop
    /// dispatching once [`Stages::is_finished`] is true.
    pub fn target_at(&self, elapsed: Duration) -> u32 {
        let mut from = 0u32;
        let mut stage_start = Duration::ZERO;

        for stage in &self.0 {
            let stage_end = stage_start + stage.duration;
            if elapsed < stage_end {
                let into = (elapsed - stage_start).as_secs_f64();
                let progress = into / stage.duration.as_secs_f64();
                let from_f = f64::from(from);
                let to_f = f64::from(stage.target);
                return (from_f + (to_f - from_f) * progress).round() as u32;
            }
            from = stage.target;
            stage_start = stage_end;
        }

        from
    }
}

impl Default for Stages {
    fn default() -> Self {
        Self(vec![
            Stage::new(Duration::from_secs(30), 10),
            Stage::new(Duration::from_secs(60), 10),
            Stage::new(Duration::from_secs(30), 0),
        ])
    }
}

/// Parse k6-style durations: `500ms`, `30s`, `1m`, `1m30s`, `2h`, `0`.
pub fn parse_duration(input: &str) -> Result<Duration, StageError> {
    let s = input.trim();
    let invalid = || StageError::InvalidDuration(input.to_string());

    if s.is_empty() {
        return Err(invalid());
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).ok_or_else(invalid)?;
        if digits == 0 {
            return Err(invalid());
        }
        let value: u64 = rest[..digits].parse().map_err(|_| invalid())?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let secs = |factor: u64| value.checked_mul(factor).map(Duration::from_secs);
        let part = match &rest[..unit_len] {
            "ms" => Some(Duration::from_millis(value)),
            "s" => Some(Duration::from_secs(value)),
            "m" => secs(60),
            "h" => secs(3600),
            _ => return Err(invalid()),
        };
        total = part
            .and_then(|p| total.checked_add(p))
            .ok_or_else(invalid)?;
        rest = &rest[unit_len..];
    }

    Ok(total)
}

pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis == 0 {
        return "0s".to_string();
    }
    if millis % 1000 != 0 {
        return format!("{millis}ms");
    }

    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let mut out = String::new();
    if h > 0 {
        out.push_str(&format!("{h}h"));
    }
    if m > 0 {
        out.push_str(&format!("{m}m"));
    }
    if s > 0 {
        out.push_str(&format!("{s}s"));
    }
    out
}

pub(crate) fn serialize_duration<S: Serializer>(d: &Duration, ser: S) -> Result<S::Ok, S::Error> {
    ser.serialize_str(&format_duration(*d))
}

pub(crate) fn deserialize_duration<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
    let raw = String::deserialize(de)?;
    parse_duration(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("30s", Duration::from_secs(30))]
    #[case("1m", Duration::from_secs(60))]
    #[case("1m30s", Duration::from_secs(90))]
    #[case("500ms", Duration::from_millis(500))]
    #[case("2h", Duration::from_secs(7200))]
    #[case("0", Duration::ZERO)]
    fn parses_k6_durations(#[case] input: &str, #[case] expected: Duration) {
        assert_eq!(parse_duration(input).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("30")]
    #[case("-5s")]
    #[case("1.5s")]
    #[case("10x")]
    #[case("s")]
    #[case("307445734561825861m")]
    #[case("5124095576030432h")]
    #[case("18446744073709551615s18446744073709551615s")]
    fn rejects_malformed_durations(#[case] input: &str) {
        assert!(matches!(
            parse_duration(input),
            Err(StageError::InvalidDuration(_))
        ));
    }

    #[test]
    fn format_round_trips_common_values() {
        for s in ["30s", "1m", "1m30s", "500ms", "2h"] {
            assert_eq!(format_duration(parse_duration(s).unwrap()), s);
        }
    }

    #[test]
    fn default_shape_midpoints() {
        let stages = Stages::default();
        assert_eq!(stages.total_duration(), Duration::from_secs(120));
        assert_eq!(stages.target_at(Duration::from_secs(0)), 0);
        assert_eq!(stages.target_at(Duration::from_secs(15)), 5);
        assert_eq!(stages.target_at(Duration::from_secs(30)), 10);
        assert_eq!(stages.target_at(Duration::from_secs(45)), 10);
        assert_eq!(stages.target_at(Duration::from_secs(105)), 5);
        assert!(stages.is_finished(Duration::from_secs(120)));
        assert!(!stages.is_finished(Duration::from_secs(119)));
    }

    #[test]
    fn zero_duration_stage_jumps() {
        let stages = Stages::new(vec![
            Stage::new(Duration::ZERO, 8),
            Stage::new(Duration::from_secs(10), 8),
        ])
        .unwrap();
        assert_eq!(stages.target_at(Duration::ZERO), 8);
        assert_eq!(stages.target_at(Duration::from_secs(5)), 8);
    }

    #[test]
    fn empty_shape_is_rejected() {
        assert_eq!(Stages::new(vec![]), Err(StageError::Empty));
        assert!(serde_json::from_str::<Stages>("[]").is_err());
    }

    #[test]
    fn overflowing_shape_is_rejected() {
        let huge = Duration::from_secs(u64::MAX);
        assert_eq!(
            Stages::new(vec![Stage::new(huge, 1), Stage::new(huge, 0)]),
            Err(StageError::TooLong)
        );
        let json = r#"[{"duration":"18446744073709551615s","target":1},{"duration":"1s","target":0}]"#;
        assert!(serde_json::from_str::<Stages>(json).is_err());
    }

    #[test]
    fn stage_display() {
        assert_eq!(
            Stage::new(Duration::from_secs(90), 10).to_string(),
            "1m30s -> 10 VUs"
        );
    }

    #[test]
    fn deserializes_stage_list() {
        let json = r#"[{"duration":"30s","target":10},{"duration":"1m","target":0}]"#;
        let stages: Stages = serde_json::from_str(json).unwrap();
        assert_eq!(stages.as_slice()[1], Stage::new(Duration::from_secs(60), 0));
        assert_eq!(stages.max_target(), 10);
    }

    proptest! {
        #[test]
        fn target_stays_within_stage_bounds(
            targets in proptest::collection::vec(0u32..200, 1..6),
            secs in proptest::collection::vec(1u64..120, 6),
            at_secs in 0u64..800,
        ) {
            let stages = Stages::new(
                targets.iter().zip(secs.iter()).map(|(t, s)| Stage::new(Duration::from_secs(*s), *t)).collect()
            ).unwrap();
            let v = stages.target_at(Duration::from_secs(at_secs));
            prop_assert!(v <= stages.max_target());
        }
    }
}
