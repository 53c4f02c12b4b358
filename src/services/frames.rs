//! Feed frame decoding and round reconstruction
//!
//! Frames are JSON arrays; the second element is an object carrying a
//! numeric `cmd`:
//! - `1008`: round announced, `sid` is the round id
//! - `1003`: dice result, `d1`/`d2`/`d3` plus a truthy `gBB` once settled
//!
//! Everything else is passed through as `Other` and ignored upstream.

use crate::types::RoundId;
use serde_json::Value;
use thiserror::Error;

pub const CMD_ROUND_ANNOUNCED: i64 = 1008;
pub const CMD_ROUND_RESULT: i64 = 1003;

/// A decoded feed frame
#[derive(Debug, Clone, PartialEq)]
pub enum FeedFrame {
    RoundAnnounced(RoundId),
    RoundSettled([u8; 3]),
    /// Result frame without final dice yet
    Unsettled,
    Other(i64),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame is not an array")]
    NotAnArray,
    #[error("frame has no payload object")]
    MissingPayload,
    #[error("payload has no numeric cmd")]
    MissingCmd,
    #[error("die {field} has value {value}, expected 0-6")]
    DieOutOfRange { field: &'static str, value: i64 },
}

/// Decode one text frame
pub fn decode_frame(text: &str) -> Result<FeedFrame, DecodeError> {
    let msg: Value = serde_json::from_str(text)?;
    let arr = msg.as_array().ok_or(DecodeError::NotAnArray)?;
    let payload = arr
        .get(1)
        .and_then(|v| v.as_object())
        .ok_or(DecodeError::MissingPayload)?;
    let cmd = payload
        .get("cmd")
        .and_then(|v| v.as_i64())
        .ok_or(DecodeError::MissingCmd)?;

    match cmd {
        CMD_ROUND_ANNOUNCED => Ok(payload
            .get("sid")
            .and_then(round_id)
            .map(FeedFrame::RoundAnnounced)
            .unwrap_or(FeedFrame::Other(cmd))),
        CMD_ROUND_RESULT => {
            if !payload.get("gBB").map(is_truthy).unwrap_or(false) {
                return Ok(FeedFrame::Unsettled);
            }
            let mut dice = [0u8; 3];
            for (slot, field) in dice.iter_mut().zip(["d1", "d2", "d3"]) {
                let value = payload.get(field).and_then(|v| v.as_i64()).unwrap_or(0);
                if !(0..=6).contains(&value) {
                    return Err(DecodeError::DieOutOfRange { field, value });
                }
                *slot = value as u8;
            }
            if dice.contains(&0) {
                return Ok(FeedFrame::Unsettled);
            }
            Ok(FeedFrame::RoundSettled(dice))
        }
        _ => Ok(FeedFrame::Other(cmd)),
    }
}

fn round_id(v: &Value) -> Option<RoundId> {
    match v {
        Value::Number(n) => n.as_i64().filter(|n| *n != 0).map(RoundId::Number),
        Value::String(s) if !s.is_empty() => Some(RoundId::Text(s.clone())),
        _ => None,
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
        Value::Null => false,
    }
}

/// A settled round as reconstructed from the feed
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedRound {
    pub round_id: Option<RoundId>,
    pub dice: [u8; 3],
}

/// Tracks the pending round id between announce and settle frames
#[derive(Debug, Default)]
pub struct RoundTracker {
    pending: Option<RoundId>,
}

impl RoundTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<&RoundId> {
        self.pending.as_ref()
    }

    /// Apply a frame, returning a round when one settles
    pub fn apply(&mut self, frame: FeedFrame) -> Option<CompletedRound> {
        match frame {
            FeedFrame::RoundAnnounced(id) => {
                self.pending = Some(id);
                None
            }
            FeedFrame::RoundSettled(dice) => Some(CompletedRound {
                round_id: self.pending.take(),
                dice,
            }),
            FeedFrame::Unsettled | FeedFrame::Other(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_announce() {
        let frame = decode_frame(r#"[5,{"cmd":1008,"sid":2212345}]"#).unwrap();
        assert_eq!(frame, FeedFrame::RoundAnnounced(RoundId::Number(2212345)));

        let frame = decode_frame(r#"[5,{"cmd":1008,"sid":"r-77"}]"#).unwrap();
        assert_eq!(frame, FeedFrame::RoundAnnounced(RoundId::Text("r-77".to_string())));
    }

    #[test]
    fn test_decode_announce_without_sid() {
        let frame = decode_frame(r#"[5,{"cmd":1008}]"#).unwrap();
        assert_eq!(frame, FeedFrame::Other(1008));
    }

    #[test]
    fn test_decode_settled() {
        let frame = decode_frame(r#"[5,{"cmd":1003,"gBB":true,"d1":6,"d2":4,"d3":1}]"#).unwrap();
        assert_eq!(frame, FeedFrame::RoundSettled([6, 4, 1]));

        let frame = decode_frame(r#"[5,{"cmd":1003,"gBB":1,"d1":1,"d2":1,"d3":1}]"#).unwrap();
        assert_eq!(frame, FeedFrame::RoundSettled([1, 1, 1]));
    }

    #[test]
    fn test_decode_unsettled() {
        let no_flag = decode_frame(r#"[5,{"cmd":1003,"d1":6,"d2":4,"d3":1}]"#).unwrap();
        assert_eq!(no_flag, FeedFrame::Unsettled);

        let zero_die = decode_frame(r#"[5,{"cmd":1003,"gBB":true,"d1":6,"d2":0,"d3":1}]"#).unwrap();
        assert_eq!(zero_die, FeedFrame::Unsettled);

        let missing = decode_frame(r#"[5,{"cmd":1003,"gBB":true,"d1":6}]"#).unwrap();
        assert_eq!(missing, FeedFrame::Unsettled);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(matches!(decode_frame("not json"), Err(DecodeError::Json(_))));
        assert!(matches!(decode_frame(r#"{"cmd":1003}"#), Err(DecodeError::NotAnArray)));
        assert!(matches!(decode_frame(r#"[5]"#), Err(DecodeError::MissingPayload)));
        assert!(matches!(decode_frame(r#"[5,"x"]"#), Err(DecodeError::MissingPayload)));
        assert!(matches!(decode_frame(r#"[5,{"sid":1}]"#), Err(DecodeError::MissingCmd)));
        assert!(matches!(
            decode_frame(r#"[5,{"cmd":1003,"gBB":true,"d1":9,"d2":1,"d3":1}]"#),
            Err(DecodeError::DieOutOfRange { field: "d1", value: 9 })
        ));
    }

    #[test]
    fn test_decode_other_cmd() {
        let frame = decode_frame(r#"[7,{"cmd":10001,"rooms":[]}]"#).unwrap();
        assert_eq!(frame, FeedFrame::Other(10001));
    }

    #[test]
    fn test_tracker_attaches_and_clears_pending_id() {
        let mut tracker = RoundTracker::new();
        assert_eq!(tracker.apply(FeedFrame::RoundAnnounced(RoundId::Number(10))), None);
        assert_eq!(tracker.pending(), Some(&RoundId::Number(10)));
        assert_eq!(tracker.apply(FeedFrame::Unsettled), None);

        let round = tracker.apply(FeedFrame::RoundSettled([2, 3, 4])).unwrap();
        assert_eq!(round.round_id, Some(RoundId::Number(10)));
        assert_eq!(round.dice, [2, 3, 4]);
        assert_eq!(tracker.pending(), None);

        // No announce before the next result
        let round = tracker.apply(FeedFrame::RoundSettled([6, 6, 6])).unwrap();
        assert_eq!(round.round_id, None);
    }

    #[test]
    fn test_tracker_latest_announce_wins() {
        let mut tracker = RoundTracker::new();
        tracker.apply(FeedFrame::RoundAnnounced(RoundId::Number(1)));
        tracker.apply(FeedFrame::RoundAnnounced(RoundId::Number(2)));
        let round = tracker.apply(FeedFrame::RoundSettled([1, 2, 3])).unwrap();
        assert_eq!(round.round_id, Some(RoundId::Number(2)));
    }
}
