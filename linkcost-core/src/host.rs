//! Host facade - the entry-point surface a planning host calls
//!
//! Mirrors the host's calling convention: numeric status codes, sentinel
//! floats for missing values, fixed-width parameter labels. Each facade owns
//! its own [`VdfState`]; give every concurrent context its own facade.

use tracing::debug;

use crate::{
    calculus, cost, from_sentinel, preprocess, to_sentinel, LinkTable, Status, Variant, VdfError,
    VdfFlags, VdfState, LABEL_SIZE, MISSING_SENTINEL,
};

/// Flag bit: host prices by link type
pub const FLAG_LINK_TYPES: u32 = 1 << 0;
/// Flag bit: host applies turn penalties
pub const FLAG_TURN_PENALTIES: u32 = 1 << 1;

/// NUL-padded, truncated copy of `text` in a host label buffer
pub fn fixed_label(text: &str) -> [u8; LABEL_SIZE] {
    let mut buf = [0u8; LABEL_SIZE];
    let bytes = text.as_bytes();
    let n = bytes.len().min(LABEL_SIZE);
    buf[..n].copy_from_slice(&bytes[..n]);
    buf
}

/// A loaded VDF: one variant plus its evaluator state
#[derive(Debug, Clone)]
pub struct HostVdf {
    variant: Variant,
    state: VdfState,
    last_error: Option<VdfError>,
}

impl HostVdf {
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            state: VdfState::new(),
            last_error: None,
        }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn state(&self) -> &VdfState {
        &self.state
    }

    /// Status of the most recent call
    pub fn status(&self) -> Status {
        self.state.status
    }

    /// Error behind the most recent non-okay status, if any
    pub fn last_error(&self) -> Option<&VdfError> {
        self.last_error.as_ref()
    }

    fn set_status(&mut self, result: Result<(), VdfError>) -> Status {
        match result {
            Ok(()) => {
                self.state.status = Status::Okay;
                self.last_error = None;
            }
            Err(e) => {
                self.state.status = e.status();
                self.last_error = Some(e);
            }
        }
        self.state.status
    }

    /// Reject a table laid out for the other variant
    fn check_table(&self, table: &LinkTable) -> Result<(), VdfError> {
        if table.variant() == self.variant {
            Ok(())
        } else {
            Err(VdfError::VariantMismatch {
                expected: self.variant,
                found: table.variant(),
            })
        }
    }

    /// Table check followed by the link-index check
    fn check_link(&self, table: &LinkTable, link: usize) -> Result<(), VdfError> {
        self.check_table(table)?;
        table.ensure_link(link)
    }

    pub fn parameter_count(&self) -> usize {
        self.variant.field_count()
    }

    /// Field names in host label buffers, same layout as [`HostVdf::label`]
    pub fn parameter_names(&self) -> Vec<[u8; LABEL_SIZE]> {
        self.variant
            .fields()
            .iter()
            .map(|spec| fixed_label(spec.name))
            .collect()
    }

    /// Defaults in field order, missing encoded as the host sentinel
    pub fn defaults(&self) -> Vec<f64> {
        self.variant
            .defaults()
            .into_iter()
            .map(to_sentinel)
            .collect()
    }

    pub fn label(&self) -> [u8; LABEL_SIZE] {
        fixed_label(self.variant.label())
    }

    /// Store host flag bits; bits beyond the two known flags are reserved
    pub fn set_flags(&mut self, bits: u32) {
        self.state.set_flags(VdfFlags {
            use_link_types: bits & FLAG_LINK_TYPES != 0,
            use_turn_penalties: bits & FLAG_TURN_PENALTIES != 0,
        });
    }

    /// Fill defaults (host-encoded) and validate the whole table
    pub fn preprocess(&mut self, table: &mut LinkTable, defaults: &[f64]) -> Status {
        if let Err(e) = self.check_table(table) {
            return self.set_status(Err(e));
        }
        let defaults: Vec<Option<f64>> = defaults.iter().copied().map(from_sentinel).collect();
        let result = preprocess(&mut self.state, table, &defaults).map(|_| ());
        self.set_status(result)
    }

    /// Cost of one link; the missing sentinel when the link has no free-flow
    /// time or does not exist
    pub fn value(&mut self, flow: f64, link: usize, table: &LinkTable, disabled: &[bool]) -> f64 {
        let checked = self.check_link(table, link);
        if self.set_status(checked) != Status::Okay {
            return MISSING_SENTINEL;
        }
        to_sentinel(cost::value(&self.state, table, disabled, link, flow))
    }

    /// Evaluate every link and write current costs; `InvalidInput` after the
    /// batch means at least one cost was clamped to free-flow time
    pub fn values(&mut self, flows: &[f64], table: &mut LinkTable, disabled: &[bool]) -> Status {
        if let Err(e) = self.check_table(table) {
            return self.set_status(Err(e));
        }
        match cost::values(&mut self.state, table, disabled, flows) {
            Ok(summary) => {
                debug!(
                    evaluated = summary.evaluated,
                    clamped = summary.clamped,
                    "Evaluated batch"
                );
                self.last_error = None;
                self.state.status
            }
            Err(e) => self.set_status(Err(e)),
        }
    }

    /// Like [`HostVdf::values`] without the reliability multiplier
    pub fn time_only(&mut self, flows: &[f64], table: &mut LinkTable, disabled: &[bool]) -> Status {
        if let Err(e) = self.check_table(table) {
            return self.set_status(Err(e));
        }
        match cost::time_only(&mut self.state, table, disabled, flows) {
            Ok(_) => {
                self.last_error = None;
                self.state.status
            }
            Err(e) => self.set_status(Err(e)),
        }
    }

    pub fn derivative(
        &mut self,
        flow: f64,
        link: usize,
        table: &LinkTable,
        disabled: &[bool],
    ) -> f64 {
        let checked = self.check_link(table, link);
        if self.set_status(checked) != Status::Okay {
            return 0.0;
        }
        calculus::derivative(table, disabled, link, flow)
    }

    pub fn integral(&mut self, flow: f64, link: usize, table: &LinkTable, disabled: &[bool]) -> f64 {
        let checked = self.check_link(table, link);
        if self.set_status(checked) != Status::Okay {
            return 0.0;
        }
        calculus::integral(table, disabled, link, flow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldId, INFINITE_COST};

    fn host_table() -> LinkTable {
        let mut table = LinkTable::new(Variant::Baseline, 2);
        for link in 0..2 {
            table.set(FieldId::Time, link, Some(5.0));
            table.set(FieldId::Capacity, link, Some(1000.0));
            table.set(FieldId::GreenRatio, link, Some(0.0));
        }
        table
    }

    #[test]
    fn test_parameter_surface() {
        let host = HostVdf::new(Variant::Extended);
        assert_eq!(host.parameter_count(), 18);

        let names = host.parameter_names();
        assert_eq!(names.len(), 18);
        assert_eq!(names[2], fixed_label("Intersection Capacity"));
        assert!(names[17].starts_with(b"Preload\0"));
        assert!(names.iter().all(|name| name[LABEL_SIZE - 1] == 0));

        let defaults = host.defaults();
        assert_eq!(defaults[0], MISSING_SENTINEL);
        assert_eq!(defaults[3], 90.0);

        let label = host.label();
        assert!(label.starts_with(b"SANDAG SHRPC04"));
        assert_eq!(label[LABEL_SIZE - 1], 0);
    }

    #[test]
    fn test_fixed_label_truncates() {
        let long = "x".repeat(LABEL_SIZE + 10);
        let label = fixed_label(&long);
        assert!(label.iter().all(|b| *b == b'x'));
    }

    #[test]
    fn test_flags() {
        let mut host = HostVdf::new(Variant::Baseline);
        host.set_flags(FLAG_TURN_PENALTIES | 0x100);
        assert!(host.state().flags.use_turn_penalties);
        assert!(!host.state().flags.use_link_types);
    }

    #[test]
    fn test_preprocess_and_evaluate() {
        let mut host = HostVdf::new(Variant::Baseline);
        let mut table = host_table();
        let defaults = host.defaults();

        assert_eq!(host.preprocess(&mut table, &defaults), Status::Okay);
        assert_eq!(host.state().threshold, 5.0);

        let cost = host.value(500.0, 0, &table, &[]);
        assert!((cost - 7.5454).abs() < 1e-3);
        assert_eq!(host.value(500.0, 1, &table, &[false, true]), INFINITE_COST);

        assert_eq!(host.values(&[500.0, 0.0], &mut table, &[]), Status::Okay);
        assert!((host.state().threshold - cost).abs() < 1e-9);

        assert!(host.derivative(500.0, 0, &table, &[]) > 0.0);
        assert_eq!(host.integral(0.0, 0, &table, &[]), 0.0);
    }

    #[test]
    fn test_preprocess_failure_keeps_message() {
        let mut host = HostVdf::new(Variant::Baseline);
        let mut table = host_table();
        table.set(FieldId::Time, 1, None);
        let defaults = host.defaults();

        assert_eq!(host.preprocess(&mut table, &defaults), Status::InvalidInput);
        assert_eq!(
            host.last_error().map(ToString::to_string).as_deref(),
            Some("No value for required field 'Time' at link index 2")
        );
    }

    #[test]
    fn test_rejects_table_of_other_variant() {
        let mut host = HostVdf::new(Variant::Extended);
        let mut table = host_table();
        let defaults = host.defaults();

        assert_eq!(host.preprocess(&mut table, &defaults), Status::InvalidInput);
        assert!(matches!(
            host.last_error(),
            Some(VdfError::VariantMismatch {
                expected: Variant::Extended,
                found: Variant::Baseline,
            })
        ));
        // nothing was filled in
        assert_eq!(table.get(FieldId::Alpha1, 0), None);

        assert_eq!(host.value(500.0, 0, &table, &[]), MISSING_SENTINEL);
        assert_eq!(host.status(), Status::InvalidInput);
        assert_eq!(host.values(&[500.0, 0.0], &mut table, &[]), Status::InvalidInput);
        assert_eq!(table.current_cost(0), None);
        assert_eq!(host.time_only(&[500.0, 0.0], &mut table, &[]), Status::InvalidInput);
        assert_eq!(host.derivative(500.0, 0, &table, &[]), 0.0);
        assert_eq!(host.integral(500.0, 0, &table, &[]), 0.0);
        assert_eq!(host.status(), Status::InvalidInput);
    }

    #[test]
    fn test_unknown_link() {
        let mut host = HostVdf::new(Variant::Baseline);
        let table = host_table();

        assert_eq!(host.value(1.0, 7, &table, &[]), MISSING_SENTINEL);
        assert_eq!(host.status(), Status::NotFound);
        assert_eq!(host.derivative(1.0, 7, &table, &[]), 0.0);
        assert_eq!(host.status(), Status::NotFound);

        host.value(1.0, 0, &table, &[]);
        assert_eq!(host.status(), Status::Okay);
    }
}
