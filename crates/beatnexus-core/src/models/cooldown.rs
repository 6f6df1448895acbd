use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-enforced pause between a user's submissions, as last reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooldownState {
    pub can_submit: bool,
    pub remaining_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_submission_at: Option<DateTime<Utc>>,
}

impl CooldownState {
    pub fn ready() -> Self {
        Self {
            can_submit: true,
            remaining_minutes: 0,
            last_submission_at: None,
        }
    }

    pub fn active(remaining_minutes: u32) -> Self {
        Self {
            can_submit: false,
            remaining_minutes,
            last_submission_at: None,
        }
    }

    /// One minute elapsed locally. Returns true once the cooldown has run out.
    pub fn tick_minute(&mut self) -> bool {
        self.remaining_minutes = self.remaining_minutes.saturating_sub(1);
        if self.remaining_minutes == 0 {
            self.can_submit = true;
        }
        self.can_submit
    }

    /// Remaining time, formatted for users ("1h 25m", "12m")
    pub fn remaining_label(&self) -> String {
        let hours = self.remaining_minutes / 60;
        let minutes = self.remaining_minutes % 60;
        if hours > 0 {
            format!("{}h {}m", hours, minutes)
        } else {
            format!("{}m", minutes)
        }
    }

    pub fn message(&self) -> String {
        if self.can_submit {
            "You can submit a new video.".to_string()
        } else {
            format!(
                "Submission cooldown active. You can submit again in {}.",
                self.remaining_label()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_label() {
        assert_eq!(CooldownState::active(85).remaining_label(), "1h 25m");
        assert_eq!(CooldownState::active(12).remaining_label(), "12m");
    }

    #[test]
    fn test_tick_minute_releases_at_zero() {
        let mut state = CooldownState::active(2);
        assert!(!state.tick_minute());
        assert!(state.tick_minute());
        assert_eq!(state.remaining_minutes, 0);
        assert!(state.tick_minute());
    }

    #[test]
    fn test_message_mentions_remaining_time() {
        let message = CooldownState::active(30).message();
        assert!(message.contains("30m"));
        assert_eq!(CooldownState::ready().message(), "You can submit a new video.");
    }
}
