//! Flash configuration model
//!
//! Mirror of the device's non-volatile configuration record, plus a
//! declarative field table used to build set-field writes generically.

use serde::{Deserialize, Serialize};

/// Snapshot of the device's persisted configuration
///
/// Created empty, populated by a successful handshake fetch, overwritten
/// atomically on each subsequent fetch. Never partially updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashConfigData {
    /// Navigation filter update period (ms)
    pub nav_dt_ms: u32,

    /// INS rotation from sensor frame to vehicle frame (rad)
    pub ins_rotation: [f32; 3],

    /// INS offset from sensor origin to vehicle origin (m)
    pub ins_offset: [f32; 3],

    /// GPS antenna offset from sensor origin (m)
    pub gps_ant_offset: [f32; 3],

    /// Reference position for the NED frame (deg, deg, m)
    pub ref_lla: [f64; 3],

    /// Magnetic inclination (rad)
    pub mag_inclination: f32,

    /// Magnetic declination (rad)
    pub mag_declination: f32,

    /// Magnetic field magnitude (normalized)
    pub mag_magnitude: f32,

    /// INS dynamic model selector
    pub ins_dyn_model: u8,

    /// Serial port 0 baud rate
    pub ser0_baud_rate: u32,
}

impl Default for FlashConfigData {
    fn default() -> Self {
        Self {
            nav_dt_ms: 4,
            ins_rotation: [0.0; 3],
            ins_offset: [0.0; 3],
            gps_ant_offset: [0.0; 3],
            ref_lla: [0.0; 3],
            mag_inclination: 0.0,
            mag_declination: 0.0,
            mag_magnitude: 1.0,
            ins_dyn_model: 8,
            ser0_baud_rate: 3_000_000,
        }
    }
}

/// Identifies one settable field of the flash configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKey {
    NavDtMs,
    InsRotation,
    InsOffset,
    GpsAntOffset,
    RefLla,
    MagInclination,
    MagDeclination,
    MagMagnitude,
    InsDynModel,
    Ser0BaudRate,
}

impl FlashKey {
    /// Name used in logs and mismatch reports
    pub fn name(&self) -> &'static str {
        self.spec().name
    }

    /// Wire layout of the field
    pub fn spec(&self) -> &'static FlashFieldSpec {
        FLASH_FIELD_TABLE
            .iter()
            .find(|spec| spec.key == *self)
            .expect("every FlashKey has a table entry")
    }
}

/// Value of one flash configuration field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashValue {
    U8(u8),
    U32(u32),
    F32(f32),
    VecF32([f32; 3]),
    VecF64([f64; 3]),
}

/// One field write: key + new value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlashField {
    pub key: FlashKey,
    pub value: FlashValue,
}

/// Wire layout of a flash configuration field
///
/// The codec uses `offset`/`size` to build a set-field write; this crate only
/// carries the table so the provisioning layer can iterate fields generically.
#[derive(Debug, Clone, Copy)]
pub struct FlashFieldSpec {
    pub key: FlashKey,
    pub name: &'static str,
    pub offset: u16,
    pub size: u16,
}

/// Byte layout of the settable fields within the device's flash record
pub const FLASH_FIELD_TABLE: &[FlashFieldSpec] = &[
    FlashFieldSpec {
        key: FlashKey::NavDtMs,
        name: "nav_dt_ms",
        offset: 12,
        size: 4,
    },
    FlashFieldSpec {
        key: FlashKey::InsRotation,
        name: "ins_rotation",
        offset: 16,
        size: 12,
    },
    FlashFieldSpec {
        key: FlashKey::InsOffset,
        name: "ins_offset",
        offset: 28,
        size: 12,
    },
    FlashFieldSpec {
        key: FlashKey::GpsAntOffset,
        name: "gps_ant_offset",
        offset: 40,
        size: 12,
    },
    FlashFieldSpec {
        key: FlashKey::RefLla,
        name: "ref_lla",
        offset: 56,
        size: 24,
    },
    FlashFieldSpec {
        key: FlashKey::MagInclination,
        name: "mag_inclination",
        offset: 80,
        size: 4,
    },
    FlashFieldSpec {
        key: FlashKey::MagDeclination,
        name: "mag_declination",
        offset: 84,
        size: 4,
    },
    FlashFieldSpec {
        key: FlashKey::MagMagnitude,
        name: "mag_magnitude",
        offset: 88,
        size: 4,
    },
    FlashFieldSpec {
        key: FlashKey::InsDynModel,
        name: "ins_dyn_model",
        offset: 92,
        size: 1,
    },
    FlashFieldSpec {
        key: FlashKey::Ser0BaudRate,
        name: "ser0_baud_rate",
        offset: 96,
        size: 4,
    },
];

impl FlashConfigData {
    /// Current value of one field
    pub fn value_of(&self, key: FlashKey) -> FlashValue {
        match key {
            FlashKey::NavDtMs => FlashValue::U32(self.nav_dt_ms),
            FlashKey::InsRotation => FlashValue::VecF32(self.ins_rotation),
            FlashKey::InsOffset => FlashValue::VecF32(self.ins_offset),
            FlashKey::GpsAntOffset => FlashValue::VecF32(self.gps_ant_offset),
            FlashKey::RefLla => FlashValue::VecF64(self.ref_lla),
            FlashKey::MagInclination => FlashValue::F32(self.mag_inclination),
            FlashKey::MagDeclination => FlashValue::F32(self.mag_declination),
            FlashKey::MagMagnitude => FlashValue::F32(self.mag_magnitude),
            FlashKey::InsDynModel => FlashValue::U8(self.ins_dyn_model),
            FlashKey::Ser0BaudRate => FlashValue::U32(self.ser0_baud_rate),
        }
    }

    /// Apply one field write to this snapshot
    pub fn apply(&mut self, field: &FlashField) {
        match (field.key, field.value) {
            (FlashKey::NavDtMs, FlashValue::U32(v)) => self.nav_dt_ms = v,
            (FlashKey::InsRotation, FlashValue::VecF32(v)) => self.ins_rotation = v,
            (FlashKey::InsOffset, FlashValue::VecF32(v)) => self.ins_offset = v,
            (FlashKey::GpsAntOffset, FlashValue::VecF32(v)) => self.gps_ant_offset = v,
            (FlashKey::RefLla, FlashValue::VecF64(v)) => self.ref_lla = v,
            (FlashKey::MagInclination, FlashValue::F32(v)) => self.mag_inclination = v,
            (FlashKey::MagDeclination, FlashValue::F32(v)) => self.mag_declination = v,
            (FlashKey::MagMagnitude, FlashValue::F32(v)) => self.mag_magnitude = v,
            (FlashKey::InsDynModel, FlashValue::U8(v)) => self.ins_dyn_model = v,
            (FlashKey::Ser0BaudRate, FlashValue::U32(v)) => self.ser0_baud_rate = v,
            // Mismatched value shape: leave the snapshot untouched
            _ => {}
        }
    }
}

impl FlashValue {
    /// Approximate equality; float fields compare with a small tolerance
    pub fn matches(&self, other: &FlashValue) -> bool {
        const EPS_F32: f32 = 1e-6;
        const EPS_F64: f64 = 1e-9;
        match (self, other) {
            (FlashValue::U8(a), FlashValue::U8(b)) => a == b,
            (FlashValue::U32(a), FlashValue::U32(b)) => a == b,
            (FlashValue::F32(a), FlashValue::F32(b)) => (a - b).abs() <= EPS_F32,
            (FlashValue::VecF32(a), FlashValue::VecF32(b)) => {
                a.iter().zip(b).all(|(x, y)| (x - y).abs() <= EPS_F32)
            }
            (FlashValue::VecF64(a), FlashValue::VecF64(b)) => {
                a.iter().zip(b).all(|(x, y)| (x - y).abs() <= EPS_F64)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_key() {
        let keys = [
            FlashKey::NavDtMs,
            FlashKey::InsRotation,
            FlashKey::InsOffset,
            FlashKey::GpsAntOffset,
            FlashKey::RefLla,
            FlashKey::MagInclination,
            FlashKey::MagDeclination,
            FlashKey::MagMagnitude,
            FlashKey::InsDynModel,
            FlashKey::Ser0BaudRate,
        ];
        for key in keys {
            let spec = key.spec();
            assert_eq!(spec.key, key);
            assert!(spec.size > 0);
        }
        assert_eq!(FLASH_FIELD_TABLE.len(), keys.len());
    }

    #[test]
    fn table_fields_do_not_overlap() {
        let mut specs: Vec<_> = FLASH_FIELD_TABLE.to_vec();
        specs.sort_by_key(|s| s.offset);
        for pair in specs.windows(2) {
            assert!(
                pair[0].offset + pair[0].size <= pair[1].offset,
                "{} overlaps {}",
                pair[0].name,
                pair[1].name
            );
        }
    }

    #[test]
    fn apply_updates_snapshot() {
        let mut snap = FlashConfigData::default();
        snap.apply(&FlashField {
            key: FlashKey::NavDtMs,
            value: FlashValue::U32(10),
        });
        assert_eq!(snap.nav_dt_ms, 10);
        assert_eq!(snap.value_of(FlashKey::NavDtMs), FlashValue::U32(10));
    }

    #[test]
    fn apply_ignores_mismatched_value_shape() {
        let mut snap = FlashConfigData::default();
        snap.apply(&FlashField {
            key: FlashKey::NavDtMs,
            value: FlashValue::F32(10.0),
        });
        assert_eq!(snap.nav_dt_ms, FlashConfigData::default().nav_dt_ms);
    }

    #[test]
    fn float_matching_uses_tolerance() {
        let a = FlashValue::F32(1.000_000_1);
        let b = FlashValue::F32(1.000_000_2);
        assert!(a.matches(&b));

        let a = FlashValue::F32(1.0);
        let b = FlashValue::F32(1.1);
        assert!(!a.matches(&b));
    }
}
