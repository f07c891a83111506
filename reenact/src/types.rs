//! Value types for recorded touch sequences.
//!
//! A [`Sequence`] is produced by the ingestion pipeline (video upload and
//! remote processing) and is read-only once handed to the replay engine.

use serde::{Deserialize, Deserializer, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Frame rate of the source recordings. Frame indices in [`Action`] are
/// converted to real time at this fixed rate.
pub const RECORDING_FPS: i64 = 30;

/// Fallback gesture duration when no frame timing is available.
pub const DEFAULT_GESTURE_DURATION: Duration = Duration::from_millis(250);

/// A point in device-pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The kind of gesture a recorded action represents.
///
/// Wire values follow the processing server's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    #[serde(rename = "SWIPE")]
    Swipe,
    #[serde(rename = "CLICK")]
    Tap,
    #[serde(rename = "LONG_CLICK")]
    LongTap,
}

impl ActionType {
    /// Parse a wire string, returning `None` for anything unrecognized.
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw {
            "SWIPE" => Some(Self::Swipe),
            "CLICK" => Some(Self::Tap),
            "LONG_CLICK" => Some(Self::LongTap),
            _ => None,
        }
    }
}

/// One recorded user interaction.
///
/// `resulting_screen_ocr` is the text expected to be visible *after* this
/// action completes; the engine checks it before dispatching the action that
/// follows a tap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// The gesture variant. An unrecognized or missing type is a valid
    /// no-op: it never yields an executable gesture.
    #[serde(
        rename = "act_type",
        default,
        deserialize_with = "lenient_action_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub act_type: Option<ActionType>,

    /// Human-readable label from the processing server. Diagnostic only.
    #[serde(rename = "action_hint", default, skip_serializing_if = "Option::is_none")]
    pub action_hint: Option<String>,

    /// Frame index in the source recording where this action begins.
    #[serde(rename = "first_frame")]
    pub first_frame: i64,

    /// OCR'd text expected on screen once this action has completed.
    #[serde(rename = "resulting_screen_ocr")]
    pub resulting_screen_ocr: String,

    /// Touch points in the recording device's coordinate space. First and
    /// last are the gesture endpoints.
    pub taps: Vec<Position>,
}

/// Unknown wire strings deserialize to `None` instead of failing the whole
/// sequence parse.
fn lenient_action_type<'de, D>(deserializer: D) -> Result<Option<ActionType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(ActionType::from_wire))
}

impl PartialEq for Action {
    // Structural equality; `action_hint` is diagnostic and excluded.
    fn eq(&self, other: &Self) -> bool {
        self.act_type == other.act_type
            && self.first_frame == other.first_frame
            && self.resulting_screen_ocr == other.resulting_screen_ocr
            && self.taps == other.taps
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Type: {:?}, First frame: {}, OCR: {}",
            self.act_type, self.first_frame, self.resulting_screen_ocr
        )
    }
}

/// A named, timestamped recording of gestures plus the screen resolution
/// they were captured at.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sequence {
    /// The processed actions, in replay order. `None` means the recording
    /// has not been processed yet.
    #[serde(default)]
    pub result: Option<Vec<Action>>,

    /// Transient processing state reported by the ingestion pipeline.
    #[serde(default)]
    pub state: Option<String>,

    /// Processing outcome, e.g. "SUCCESS" or "FAILURE".
    #[serde(default)]
    pub status: Option<String>,

    /// User-facing name.
    #[serde(default)]
    pub name: Option<String>,

    /// Identity. Timestamp-derived; see [`next_sequence_id`].
    #[serde(default)]
    pub id: Option<i64>,

    #[serde(default)]
    pub creation_time: Option<i64>,

    /// Screen dimensions (width x height) of the recording device, used as
    /// the scaling reference during replay.
    #[serde(default)]
    pub dimensions: Option<Position>,
}

impl Sequence {
    /// The actions to replay, empty when the sequence is unprocessed.
    pub fn actions(&self) -> &[Action] {
        self.result.as_deref().unwrap_or(&[])
    }
}

// Identity is by id alone; two sequences with the same id are the same
// recording regardless of processing metadata.
impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Swipe duration for the action at `index`, derived from the frame delta to
/// the following action at [`RECORDING_FPS`]. Non-positive deltas and the
/// final action fall back to [`DEFAULT_GESTURE_DURATION`].
pub fn gesture_duration(actions: &[Action], index: usize) -> Duration {
    let (Some(current), Some(next)) = (actions.get(index), actions.get(index + 1)) else {
        return DEFAULT_GESTURE_DURATION;
    };
    let frames = next.first_frame - current.first_frame;
    if frames <= 0 {
        return DEFAULT_GESTURE_DURATION;
    }
    Duration::from_millis((frames as u64 * 1000) / RECORDING_FPS as u64)
}

/// A fresh sequence id derived from the wall clock, in milliseconds since
/// the epoch.
pub fn next_sequence_id() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(act_type: Option<ActionType>, first_frame: i64) -> Action {
        Action {
            act_type,
            action_hint: None,
            first_frame,
            resulting_screen_ocr: String::new(),
            taps: vec![Position::new(1.0, 2.0)],
        }
    }

    #[test]
    fn parses_wire_sequence() {
        let json = r#"{
            "result": [
                {
                    "act_type": "CLICK",
                    "action_hint": "Open settings",
                    "first_frame": 12,
                    "resulting_screen_ocr": "Settings",
                    "taps": [{"x": 100.0, "y": 200.0}]
                },
                {
                    "act_type": "SWIPE",
                    "first_frame": 45,
                    "resulting_screen_ocr": "",
                    "taps": [{"x": 10.0, "y": 600.0}, {"x": 10.0, "y": 100.0}]
                }
            ],
            "state": "DONE",
            "status": "SUCCESS"
        }"#;
        let sequence: Sequence = serde_json::from_str(json).unwrap();
        let actions = sequence.actions();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].act_type, Some(ActionType::Tap));
        assert_eq!(actions[0].action_hint.as_deref(), Some("Open settings"));
        assert_eq!(actions[1].act_type, Some(ActionType::Swipe));
        assert_eq!(actions[1].taps.len(), 2);
        assert_eq!(sequence.status.as_deref(), Some("SUCCESS"));
    }

    #[test]
    fn unknown_action_type_is_noop_not_error() {
        let json = r#"{
            "act_type": "PINCH",
            "first_frame": 3,
            "resulting_screen_ocr": "x",
            "taps": [{"x": 0.0, "y": 0.0}]
        }"#;
        let parsed: Action = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.act_type, None);
    }

    #[test]
    fn missing_action_type_is_noop() {
        let json = r#"{
            "first_frame": 3,
            "resulting_screen_ocr": "x",
            "taps": []
        }"#;
        let parsed: Action = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.act_type, None);
    }

    #[test]
    fn action_equality_ignores_hint() {
        let mut a = action(Some(ActionType::Tap), 5);
        let mut b = action(Some(ActionType::Tap), 5);
        a.action_hint = Some("left".into());
        b.action_hint = Some("right".into());
        assert_eq!(a, b);
        b.first_frame = 6;
        assert_ne!(a, b);
    }

    #[test]
    fn sequence_identity_is_by_id() {
        let a = Sequence {
            id: Some(7),
            name: Some("one".into()),
            ..Default::default()
        };
        let b = Sequence {
            id: Some(7),
            name: Some("two".into()),
            ..Default::default()
        };
        assert_eq!(a, b);
        let c = Sequence {
            id: Some(8),
            ..Default::default()
        };
        assert_ne!(a, c);
    }

    #[test]
    fn sequence_round_trips_through_json() {
        let original = Sequence {
            result: Some(vec![
                action(Some(ActionType::Swipe), 0),
                action(Some(ActionType::LongTap), 30),
            ]),
            state: Some("DONE".into()),
            status: Some("SUCCESS".into()),
            name: Some("login flow".into()),
            id: Some(next_sequence_id()),
            creation_time: Some(1_700_000_000_000),
            dimensions: Some(Position::new(1080.0, 2280.0)),
        };
        let encoded = serde_json::to_string(&original).unwrap();
        let decoded: Sequence = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.result, original.result);
        assert_eq!(decoded.dimensions, original.dimensions);
    }

    #[test]
    fn frame_delta_converts_to_milliseconds() {
        let actions = vec![action(Some(ActionType::Swipe), 0), action(None, 15)];
        // 15 frames at 30 fps is half a second.
        assert_eq!(gesture_duration(&actions, 0), Duration::from_millis(500));
    }

    #[test]
    fn non_positive_frame_delta_falls_back_to_default() {
        let actions = vec![action(Some(ActionType::Swipe), 20), action(None, 20)];
        assert_eq!(gesture_duration(&actions, 0), DEFAULT_GESTURE_DURATION);
        let reversed = vec![action(Some(ActionType::Swipe), 20), action(None, 5)];
        assert_eq!(gesture_duration(&reversed, 0), DEFAULT_GESTURE_DURATION);
    }

    #[test]
    fn last_action_uses_default_duration() {
        let actions = vec![action(Some(ActionType::Swipe), 0)];
        assert_eq!(gesture_duration(&actions, 0), DEFAULT_GESTURE_DURATION);
        assert_eq!(gesture_duration(&actions, 9), DEFAULT_GESTURE_DURATION);
    }
}
