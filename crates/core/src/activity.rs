// crates/core/src/activity.rs
//! Client-reported activity metadata attached to an answer.
//!
//! The browser-side monitor reports tab switches, paste events and speech
//! interruptions. Reports may arrive in several small batches between turns,
//! so the pending log for a session is merged report-by-report and drained
//! when the next turn is appended.

use serde::{Deserialize, Serialize};

/// Activity observed by the client while the candidate answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityLog {
    /// Number of times the candidate left the interview tab.
    pub tab_switches: u32,
    /// True if any paste event fired inside the answer field.
    pub paste_detected: bool,
    /// Times the candidate interrupted the interviewer's audio.
    pub interruptions: u32,
}

impl ActivityLog {
    /// Fold another report into this one. Counters add saturating (the
    /// counts are client-supplied), the paste flag is sticky.
    pub fn merge(&mut self, other: &ActivityLog) {
        self.tab_switches = self.tab_switches.saturating_add(other.tab_switches);
        self.paste_detected |= other.paste_detected;
        self.interruptions = self.interruptions.saturating_add(other.interruptions);
    }

    pub fn is_empty(&self) -> bool {
        *self == ActivityLog::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_adds_counters() {
        let mut a = ActivityLog {
            tab_switches: 2,
            paste_detected: false,
            interruptions: 1,
        };
        a.merge(&ActivityLog {
            tab_switches: 4,
            paste_detected: true,
            interruptions: 0,
        });
        assert_eq!(a.tab_switches, 6);
        assert!(a.paste_detected);
        assert_eq!(a.interruptions, 1);
    }

    #[test]
    fn test_merge_saturates_instead_of_overflowing() {
        let mut a = ActivityLog {
            tab_switches: u32::MAX - 1,
            interruptions: u32::MAX,
            ..Default::default()
        };
        a.merge(&ActivityLog {
            tab_switches: 5,
            interruptions: 1,
            ..Default::default()
        });
        assert_eq!(a.tab_switches, u32::MAX);
        assert_eq!(a.interruptions, u32::MAX);
    }

    #[test]
    fn test_paste_flag_is_sticky() {
        let mut a = ActivityLog {
            paste_detected: true,
            ..Default::default()
        };
        a.merge(&ActivityLog::default());
        assert!(a.paste_detected);
    }

    #[test]
    fn test_default_is_empty() {
        assert!(ActivityLog::default().is_empty());
        let a = ActivityLog {
            tab_switches: 1,
            ..Default::default()
        };
        assert!(!a.is_empty());
    }

    #[test]
    fn test_deserializes_with_missing_fields() {
        let a: ActivityLog = serde_json::from_str(r#"{"tabSwitches": 7}"#).unwrap();
        assert_eq!(a.tab_switches, 7);
        assert!(!a.paste_detected);
    }
}
