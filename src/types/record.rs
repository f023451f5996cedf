//! Decoded sensor snapshot

use serde::{Deserialize, Serialize};

/// Width of one frame on the wire, commas included.
pub const RECORD_SIZE: usize = 26;

/// Number of comma-separated fields in a frame.
pub const FIELD_COUNT: usize = 6;

/// Separator between fields inside a frame.
pub const FIELD_SEPARATOR: u8 = b',';

/// One sensor snapshot from the rig.
///
/// Fields hold the raw text exactly as transmitted: no numeric parsing, no
/// trimming. A record only ever comes out of a complete frame, so every
/// field is always present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorRecord {
    pub peltier_state: String,
    pub pump_state: String,
    pub therm1_temp: String,
    pub therm2_temp: String,
    pub therm3_temp: String,
    pub ir_temp: String,
}

impl SensorRecord {
    /// Field names in wire order.
    pub const FIELD_NAMES: [&'static str; FIELD_COUNT] =
        ["peltierState", "pumpState", "therm1Temp", "therm2Temp", "therm3Temp", "irTemp"];

    /// Build a record from its fields in wire order.
    pub fn from_fields(fields: [String; FIELD_COUNT]) -> Self {
        let [peltier_state, pump_state, therm1_temp, therm2_temp, therm3_temp, ir_temp] = fields;
        Self { peltier_state, pump_state, therm1_temp, therm2_temp, therm3_temp, ir_temp }
    }

    /// Field values in wire order.
    pub fn values(&self) -> [&str; FIELD_COUNT] {
        [
            &self.peltier_state,
            &self.pump_state,
            &self.therm1_temp,
            &self.therm2_temp,
            &self.therm3_temp,
            &self.ir_temp,
        ]
    }

    /// `(name, value)` pairs in wire order, for display.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        Self::FIELD_NAMES.into_iter().zip(self.values())
    }
}

impl std::fmt::Display for SensorRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (name, value) in self.fields() {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{}={:?}", name, value)?;
            first = false;
        }
        Ok(())
    }
}
