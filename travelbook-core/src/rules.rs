use serde::Deserialize;

/// Tunables for the booking flow
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRules {
    /// Optional upper bound on seats in a single booking; unbounded when unset
    #[serde(default)]
    pub max_seats_per_booking: Option<i32>,
    /// How many fresh booking ids to try before giving up on collisions
    #[serde(default = "default_id_attempts")]
    pub id_attempts: u32,
    #[serde(default = "default_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_id_attempts() -> u32 { 5 }
fn default_channel_capacity() -> usize { 100 }

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            max_seats_per_booking: None,
            id_attempts: default_id_attempts(),
            event_channel_capacity: default_channel_capacity(),
        }
    }
}
