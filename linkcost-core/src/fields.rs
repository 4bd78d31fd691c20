//! Field tables - the ordered per-link parameters each VDF variant reads
//!
//! Order is significant: column `i` of a [`LinkTable`](crate::LinkTable) holds
//! the field at position `i` of [`Variant::fields`]. The two non-functional
//! trailing host fields (link type and current cost) are kept outside these tables.

use serde::{Deserialize, Serialize};

use crate::{VdfError, MAX_FLOAT};

/// Identity of a functional link parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum FieldId {
    /// Free-flow travel time
    Time,
    /// Segment (mid-block) capacity
    Capacity,
    /// Intersection approach capacity, already net of g/c
    IntersectionCapacity,
    /// Signal cycle length
    Cycle,
    /// Progression factor
    ProgressionFactor,
    /// Green time over cycle length
    GreenRatio,
    Alpha1,
    Beta1,
    Alpha2,
    Beta2,
    LosC,
    LosD,
    LosE,
    LosFLow,
    LosFHigh,
    StaticReliability,
    Length,
    Preload,
}

impl FieldId {
    /// Key used for this field in JSON link records and config files
    pub fn key(self) -> &'static str {
        match self {
            FieldId::Time => "time",
            FieldId::Capacity => "capacity",
            FieldId::IntersectionCapacity => "intersection_capacity",
            FieldId::Cycle => "cycle",
            FieldId::ProgressionFactor => "pf",
            FieldId::GreenRatio => "gc",
            FieldId::Alpha1 => "alpha1",
            FieldId::Beta1 => "beta1",
            FieldId::Alpha2 => "alpha2",
            FieldId::Beta2 => "beta2",
            FieldId::LosC => "los_c",
            FieldId::LosD => "los_d",
            FieldId::LosE => "los_e",
            FieldId::LosFLow => "los_f_low",
            FieldId::LosFHigh => "los_f_high",
            FieldId::StaticReliability => "static_reliability",
            FieldId::Length => "length",
            FieldId::Preload => "preload",
        }
    }

    /// Look a field up by its key
    pub fn from_key(key: &str) -> Option<Self> {
        ALL_FIELDS.iter().copied().find(|f| f.key() == key)
    }
}

impl From<FieldId> for &'static str {
    fn from(id: FieldId) -> Self {
        id.key()
    }
}

impl TryFrom<String> for FieldId {
    type Error = VdfError;

    fn try_from(key: String) -> Result<Self, Self::Error> {
        FieldId::from_key(&key).ok_or(VdfError::UnknownField(key))
    }
}

const ALL_FIELDS: [FieldId; 18] = [
    FieldId::Time,
    FieldId::Capacity,
    FieldId::IntersectionCapacity,
    FieldId::Cycle,
    FieldId::ProgressionFactor,
    FieldId::GreenRatio,
    FieldId::Alpha1,
    FieldId::Beta1,
    FieldId::Alpha2,
    FieldId::Beta2,
    FieldId::LosC,
    FieldId::LosD,
    FieldId::LosE,
    FieldId::LosFLow,
    FieldId::LosFHigh,
    FieldId::StaticReliability,
    FieldId::Length,
    FieldId::Preload,
];

/// Static metadata for one parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub id: FieldId,
    /// Host-visible label
    pub name: &'static str,
    /// Value substituted for a missing cell; `None` means no default exists
    pub default: Option<f64>,
    /// Must be present after default-filling
    pub required: bool,
    /// Inclusive [lower, upper] range, when bounds-checked
    pub bounds: Option<(f64, f64)>,
}

impl FieldSpec {
    const fn checked(
        id: FieldId,
        name: &'static str,
        default: Option<f64>,
        lower: f64,
        upper: f64,
    ) -> Self {
        Self {
            id,
            name,
            default,
            required: true,
            bounds: Some((lower, upper)),
        }
    }

    const fn unchecked(id: FieldId, name: &'static str, default: f64, required: bool) -> Self {
        Self {
            id,
            name,
            default: Some(default),
            required,
            bounds: None,
        }
    }

    /// Whether `value` lies inside this field's bounds (always true when unchecked)
    pub fn in_bounds(&self, value: f64) -> bool {
        match self.bounds {
            Some((lower, upper)) => value >= lower && value <= upper,
            None => true,
        }
    }
}

const BASELINE_FIELDS: [FieldSpec; 10] = [
    FieldSpec::checked(FieldId::Time, "Time", None, 0.0, MAX_FLOAT),
    FieldSpec::checked(FieldId::Capacity, "Segment Capacity", None, 1.0, MAX_FLOAT),
    FieldSpec::checked(FieldId::Cycle, "Cycle", Some(90.0), 0.0, 200.0),
    FieldSpec::checked(FieldId::ProgressionFactor, "PF (Progression Factor)", Some(1.0), 0.2, 2.0),
    FieldSpec::checked(FieldId::GreenRatio, "GC (g/c ratio)", Some(0.41), 0.0, 1.0),
    FieldSpec::checked(FieldId::Alpha1, "Alpha1 for Segment", Some(1.9), 0.0, 300.0),
    FieldSpec::checked(FieldId::Beta1, "Beta1 for Segment", Some(1.9), 0.0, 300.0),
    FieldSpec::checked(FieldId::Alpha2, "Alpha2 for Junction", Some(2.0), 0.0, 300.0),
    FieldSpec::checked(FieldId::Beta2, "Beta2 for Junction", Some(2.4), 0.0, 300.0),
    FieldSpec::unchecked(FieldId::Preload, "Preload", 0.0, false),
];

const EXTENDED_FIELDS: [FieldSpec; 18] = [
    FieldSpec::checked(FieldId::Time, "Time", None, 0.0, MAX_FLOAT),
    FieldSpec::checked(FieldId::Capacity, "Segment Capacity", None, 1.0, MAX_FLOAT),
    FieldSpec::checked(FieldId::IntersectionCapacity, "Intersection Capacity", None, 0.0, MAX_FLOAT),
    FieldSpec::checked(FieldId::Cycle, "Cycle", Some(90.0), 0.0, 200.0),
    FieldSpec::checked(FieldId::ProgressionFactor, "PF (Progression Factor)", Some(1.0), 0.2, 2.0),
    FieldSpec::checked(FieldId::GreenRatio, "GC (g/c ratio)", Some(0.41), 0.0, 1.0),
    FieldSpec::checked(FieldId::Alpha1, "Alpha1 for Segment", Some(1.9), 0.0, 300.0),
    FieldSpec::checked(FieldId::Beta1, "Beta1 for Segment", Some(1.9), 0.0, 300.0),
    FieldSpec::checked(FieldId::Alpha2, "Alpha2 for Junction", Some(2.0), 0.0, 300.0),
    FieldSpec::checked(FieldId::Beta2, "Beta2 for Junction", Some(2.4), 0.0, 300.0),
    FieldSpec::unchecked(FieldId::LosC, "LOS C reliability factor", 0.0, true),
    FieldSpec::unchecked(FieldId::LosD, "LOS D reliability factor", 0.0, true),
    FieldSpec::unchecked(FieldId::LosE, "LOS E reliability factor", 0.0, true),
    FieldSpec::unchecked(FieldId::LosFLow, "LOS F.low reliability factor", 0.0, true),
    FieldSpec::unchecked(FieldId::LosFHigh, "LOS F.high reliability factor", 0.0, true),
    FieldSpec::unchecked(FieldId::StaticReliability, "Static link reliability factor", 0.0, true),
    FieldSpec::unchecked(FieldId::Length, "Length", 0.0, true),
    FieldSpec::unchecked(FieldId::Preload, "Preload", 0.0, false),
];

/// Which cost function a table is priced with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Segment + junction delay, junction capacity derived from g/c
    #[default]
    Baseline,
    /// Adds explicit junction capacity and the LOS reliability multiplier
    Extended,
}

impl Variant {
    /// Ordered field table
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            Variant::Baseline => &BASELINE_FIELDS,
            Variant::Extended => &EXTENDED_FIELDS,
        }
    }

    /// Number of functional fields
    pub fn field_count(self) -> usize {
        self.fields().len()
    }

    /// Column position of `id`, if this variant carries it
    pub fn index_of(self, id: FieldId) -> Option<usize> {
        self.fields().iter().position(|spec| spec.id == id)
    }

    pub fn spec(self, id: FieldId) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|spec| spec.id == id)
    }

    /// Default vector in field order
    pub fn defaults(self) -> Vec<Option<f64>> {
        self.fields().iter().map(|spec| spec.default).collect()
    }

    /// Human-readable function name shown by the host
    pub fn label(self) -> &'static str {
        match self {
            Variant::Baseline => "Tucson's link-junction VDF",
            Variant::Extended => "SANDAG SHRPC04 link-junction-reliability VDF",
        }
    }

    /// Whether the LOS reliability multiplier applies
    pub fn has_reliability(self) -> bool {
        matches!(self, Variant::Extended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_counts() {
        assert_eq!(Variant::Baseline.field_count(), 10);
        assert_eq!(Variant::Extended.field_count(), 18);
    }

    #[test]
    fn test_shared_prefix_order() {
        assert_eq!(Variant::Baseline.index_of(FieldId::Time), Some(0));
        assert_eq!(Variant::Extended.index_of(FieldId::Time), Some(0));
        assert_eq!(Variant::Baseline.index_of(FieldId::Cycle), Some(2));
        assert_eq!(Variant::Extended.index_of(FieldId::Cycle), Some(3));
        assert_eq!(Variant::Baseline.index_of(FieldId::Preload), Some(9));
        assert_eq!(Variant::Extended.index_of(FieldId::Preload), Some(17));
        assert_eq!(Variant::Baseline.index_of(FieldId::IntersectionCapacity), None);
    }

    #[test]
    fn test_defaults() {
        let defaults = Variant::Baseline.defaults();
        assert_eq!(defaults[0], None);
        assert_eq!(defaults[1], None);
        assert_eq!(defaults[2], Some(90.0));
        assert_eq!(defaults[4], Some(0.41));
        assert_eq!(defaults[8], Some(2.4));

        let extended = Variant::Extended.defaults();
        assert_eq!(extended[2], None);
        assert_eq!(extended[16], Some(0.0));
    }

    #[test]
    fn test_bounds() {
        let pf = Variant::Baseline.spec(FieldId::ProgressionFactor).unwrap();
        assert!(pf.in_bounds(0.2));
        assert!(pf.in_bounds(2.0));
        assert!(!pf.in_bounds(0.1));

        let los = Variant::Extended.spec(FieldId::LosC).unwrap();
        assert!(los.required);
        assert!(los.in_bounds(-1000.0));

        let preload = Variant::Extended.spec(FieldId::Preload).unwrap();
        assert!(!preload.required);
    }

    #[test]
    fn test_key_roundtrip() {
        for id in ALL_FIELDS {
            assert_eq!(FieldId::from_key(id.key()), Some(id));
        }
        assert_eq!(FieldId::from_key("nope"), None);
    }

    #[test]
    fn test_serde_uses_keys() {
        for id in ALL_FIELDS {
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.key()));
            assert_eq!(serde_json::from_str::<FieldId>(&json).unwrap(), id);
        }
        assert_eq!(serde_json::to_string(&FieldId::GreenRatio).unwrap(), "\"gc\"");
        assert!(serde_json::from_str::<FieldId>("\"green_ratio\"").is_err());
    }
}
