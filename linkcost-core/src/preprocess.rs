//! Preprocessor - default-filling and validation run once before evaluation
//!
//! Walks every link (outer) and every functional field (inner):
//! - Preload: missing or negative becomes 0
//! - Any other field: missing takes the default
//! - Required fields still missing, or bounded fields out of range, abort the
//!   pass with the field name and 1-based link index
//!
//! On success each link's current cost starts at its free-flow time.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{FieldId, LinkTable, Status, VdfError, VdfState};

/// Summary of a successful preprocessing pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessReport {
    /// Largest value seen per field, in field order (`None` for an empty table)
    pub max_by_field: Vec<Option<f64>>,
    /// Largest initial current cost
    pub max_current_cost: f64,
}

impl PreprocessReport {
    /// Largest value seen for `id`
    pub fn max_of(&self, table: &LinkTable, id: FieldId) -> Option<f64> {
        let index = table.variant().index_of(id)?;
        self.max_by_field.get(index).copied().flatten()
    }
}

/// Fill defaults and validate every link of `table` in place
pub fn preprocess_table(
    table: &mut LinkTable,
    defaults: &[Option<f64>],
) -> Result<PreprocessReport, VdfError> {
    let fields = table.variant().fields();
    if defaults.len() != fields.len() {
        return Err(VdfError::DefaultsLength {
            expected: fields.len(),
            found: defaults.len(),
        });
    }

    let mut max_by_field: Vec<Option<f64>> = vec![None; fields.len()];
    let mut max_current_cost = 0.0_f64;

    for link in 0..table.len() {
        for (index, (spec, default)) in fields.iter().zip(defaults).enumerate() {
            let cell = table.cell_mut(index, link);

            match spec.id {
                FieldId::Preload => {
                    if cell.map_or(true, |v| v < 0.0) {
                        *cell = Some(0.0);
                    }
                }
                _ => {
                    if cell.is_none() {
                        *cell = *default;
                    }
                }
            }

            // Time is always required
            let required = spec.required || spec.id == FieldId::Time;
            let value = match *cell {
                Some(value) => value,
                None if required => {
                    return Err(VdfError::MissingRequired {
                        field: spec.name,
                        link: link + 1,
                    });
                }
                None => continue,
            };

            if !spec.in_bounds(value) {
                return Err(VdfError::OutOfBounds {
                    field: spec.name,
                    link: link + 1,
                    value,
                });
            }
        }

        let t0 = table.get(FieldId::Time, link);
        table.set_current_cost(link, t0);
        if let Some(t0) = t0 {
            max_current_cost = max_current_cost.max(t0);
        }

        for (index, max) in max_by_field.iter_mut().enumerate() {
            if let Some(value) = table.column(index)[link] {
                *max = Some(max.map_or(value, |m: f64| m.max(value)));
            }
        }
    }

    Ok(PreprocessReport {
        max_by_field,
        max_current_cost,
    })
}

/// Preprocess and derive the evaluator scalars.
///
/// On success the running threshold becomes the largest free-flow time and the
/// overflow guard is recomputed from the largest Beta1. An empty table leaves
/// the guard untouched. On failure the status is set and the scalars are kept.
pub fn preprocess(
    state: &mut VdfState,
    table: &mut LinkTable,
    defaults: &[Option<f64>],
) -> Result<PreprocessReport, VdfError> {
    match preprocess_table(table, defaults) {
        Ok(report) => {
            state.threshold = report.max_current_cost;
            if let Some(max_beta) = report.max_of(table, FieldId::Beta1) {
                state.big_real = VdfState::guard_for_beta(max_beta);
            }
            state.status = Status::Okay;

            debug!(
                links = table.len(),
                big_real = state.big_real,
                threshold = state.threshold,
                "Preprocessed link table"
            );
            Ok(report)
        }
        Err(e) => {
            warn!("Preprocessing failed: {}", e);
            state.status = e.status();
            Err(e)
        }
    }
}
