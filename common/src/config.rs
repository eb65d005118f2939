use serde::{Deserialize, Serialize};

/// Per-room rule settings. Private rooms fix these at creation; quick rooms
/// aggregate them from per-player votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    #[serde(default = "defaults::slap_down")]
    pub slap_down: bool,
    /// Turn time limit, in seconds.
    #[serde(default = "defaults::time_per_player")]
    pub time_per_player: u64,
    /// Hand value at or below which Yaniv may be called.
    #[serde(default = "defaults::can_call_yaniv")]
    pub can_call_yaniv: u32,
    /// Total score above which a player is eliminated.
    #[serde(default = "defaults::max_match_points")]
    pub max_match_points: i32,
}

pub mod defaults {
    pub const fn slap_down() -> bool {
        true
    }

    pub const fn time_per_player() -> u64 {
        15
    }

    pub const fn can_call_yaniv() -> u32 {
        7
    }

    pub const fn max_match_points() -> i32 {
        100
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            slap_down: defaults::slap_down(),
            time_per_player: defaults::time_per_player(),
            can_call_yaniv: defaults::can_call_yaniv(),
            max_match_points: defaults::max_match_points(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: RoomConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RoomConfig::default());

        let config: RoomConfig = serde_json::from_str(r#"{"max_match_points": 50}"#).unwrap();
        assert_eq!(config.max_match_points, 50);
        assert_eq!(config.time_per_player, 15);
    }
}
