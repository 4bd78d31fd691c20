//! Cost evaluator - segment BPR term, signalized junction delay, LOS reliability
//!
//! cost = t0·(1 + α1·(v/c)^β1) + pf·cyc/2·(1−gc)²·(1 + α2·(v/c_j)^β2)
//!
//! The extended variant multiplies the result by `1 + reliability`, where the
//! reliability factor accumulates one term per LOS band the v/c ratio reaches.

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::{
    FieldId, LinkTable, Status, Variant, VdfError, VdfState, INFINITE_COST, RELIABILITY_VC_CAP,
    THROUGH_TRAFFIC_SHARE,
};

/// LOS reliability bands: coefficient field and the v/c ratio at which it activates
pub const RELIABILITY_BANDS: [(FieldId, f64); 5] = [
    (FieldId::LosC, 0.7),
    (FieldId::LosD, 0.8),
    (FieldId::LosE, 0.9),
    (FieldId::LosFLow, 1.0),
    (FieldId::LosFHigh, 1.2),
];

/// Offset added with every active reliability band
const BAND_OFFSET: f64 = 0.01;

/// Parameters of one link, resolved from a table.
///
/// Free-flow time and capacities keep their missing state; every other
/// missing cell falls back to the field default (0 when there is none).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkParams {
    pub variant: Variant,
    pub t0: Option<f64>,
    pub capacity: Option<f64>,
    pub intersection_capacity: Option<f64>,
    pub cycle: f64,
    pub pf: f64,
    pub gc: f64,
    pub alpha1: f64,
    pub beta1: f64,
    pub alpha2: f64,
    pub beta2: f64,
    pub preload: f64,
    /// Coefficients in [`RELIABILITY_BANDS`] order
    pub los: [f64; 5],
    pub static_reliability: f64,
    pub length: f64,
}

impl LinkParams {
    pub fn from_table(table: &LinkTable, link: usize) -> Self {
        let variant = table.variant();
        let or_default = |id: FieldId| {
            table
                .get(id, link)
                .or_else(|| variant.spec(id).and_then(|spec| spec.default))
                .unwrap_or(0.0)
        };

        Self {
            variant,
            t0: table.get(FieldId::Time, link),
            capacity: table.get(FieldId::Capacity, link),
            intersection_capacity: table.get(FieldId::IntersectionCapacity, link),
            cycle: or_default(FieldId::Cycle),
            pf: or_default(FieldId::ProgressionFactor),
            gc: or_default(FieldId::GreenRatio),
            alpha1: or_default(FieldId::Alpha1),
            beta1: or_default(FieldId::Beta1),
            alpha2: or_default(FieldId::Alpha2),
            beta2: or_default(FieldId::Beta2),
            preload: table.get(FieldId::Preload, link).unwrap_or(0.0).max(0.0),
            los: RELIABILITY_BANDS.map(|(id, _)| or_default(id)),
            static_reliability: or_default(FieldId::StaticReliability),
            length: or_default(FieldId::Length),
        }
    }

    /// Flow plus preload
    pub fn volume(&self, flow: f64) -> f64 {
        flow + self.preload
    }

    /// Junction delay scale: pf·cyc/2·(1−gc)²
    pub fn junction_scale(&self) -> f64 {
        self.pf * self.cycle / 2.0 * (1.0 - self.gc).powi(2)
    }

    /// d(junction v/c)/d(volume), or `None` when the link has no signal term.
    ///
    /// The baseline derives junction capacity from g/c assuming 85% through
    /// traffic; the extended variant reads it directly.
    pub fn junction_factor(&self) -> Option<f64> {
        if self.gc <= 0.0 {
            return None;
        }
        match self.variant {
            Variant::Baseline => {
                let cap = self.capacity?;
                Some(THROUGH_TRAFFIC_SHARE / (cap * self.gc))
            }
            Variant::Extended => self.intersection_capacity.map(|cap| 1.0 / cap),
        }
    }
}

/// Segment plus junction travel time, before reliability.
///
/// `None` only when the free-flow time is missing. A missing capacity passes
/// the free-flow time through; a non-positive capacity saturates both ratios
/// at `big_real`, which suppresses the junction term.
pub fn base_delay(params: &LinkParams, flow: f64, big_real: f64) -> Option<f64> {
    let t0 = params.t0?;
    let Some(cap) = params.capacity else {
        return Some(t0);
    };

    let volume = params.volume(flow);
    let (ratio_s, ratio_j) = if cap > 0.0 {
        let ratio_j = params
            .junction_factor()
            .map_or(big_real, |factor| volume * factor);
        (volume / cap, ratio_j)
    } else {
        (big_real, big_real)
    };

    // past the guard the power would overflow, use the ratio itself
    let term_s = if ratio_s >= big_real {
        ratio_s
    } else {
        ratio_s.powf(params.beta1)
    };
    let mut cost = t0 * (1.0 + params.alpha1 * term_s);

    if ratio_j < big_real {
        let lambda_j = 1.0 + params.alpha2 * ratio_j.powf(params.beta2);
        cost += params.junction_scale() * lambda_j;
    }

    Some(cost)
}

/// Segment v/c ratio used by the reliability rule, capped at 1.5
fn reliability_ratio(params: &LinkParams, flow: f64) -> Option<f64> {
    params.t0?;
    let cap = params.capacity.filter(|cap| *cap > 0.0)?;
    Some((params.volume(flow) / cap).min(RELIABILITY_VC_CAP))
}

/// Reliability factor added to 1 in the extended cost multiplier.
///
/// Every band at or below the capped v/c ratio contributes
/// `coefficient·ratio − threshold + 0.01`; the sum is floored at 0, the
/// static term added and the total scaled by link length.
pub fn reliability_factor(params: &LinkParams, flow: f64) -> f64 {
    let Some(ratio) = reliability_ratio(params, flow) else {
        return 0.0;
    };

    let banded: f64 = RELIABILITY_BANDS
        .iter()
        .zip(params.los)
        .filter(|((_, threshold), _)| ratio >= *threshold)
        .map(|((_, threshold), coef)| coef * ratio - threshold + BAND_OFFSET)
        .sum();

    (banded.max(0.0) + params.static_reliability) * params.length
}

/// Sum of the LOS coefficients active at this flow, floored at 0
pub fn active_reliability_sum(params: &LinkParams, flow: f64) -> f64 {
    let Some(ratio) = reliability_ratio(params, flow) else {
        return 0.0;
    };

    let sum: f64 = RELIABILITY_BANDS
        .iter()
        .zip(params.los)
        .filter(|((_, threshold), _)| ratio >= *threshold)
        .map(|(_, coef)| coef)
        .sum();

    sum.max(0.0)
}

/// Full cost of one link: base delay, times `1 + reliability` in the extended variant
pub fn link_cost(params: &LinkParams, flow: f64, big_real: f64) -> Option<f64> {
    let base = base_delay(params, flow, big_real)?;
    if params.variant.has_reliability() {
        Some(base + reliability_factor(params, flow) * base)
    } else {
        Some(base)
    }
}

pub(crate) fn is_disabled(disabled: &[bool], link: usize) -> bool {
    disabled.get(link).copied().unwrap_or(false)
}

/// Cost of `link` at `flow`. Disabled links cost [`INFINITE_COST`];
/// `None` means the link has no free-flow time.
pub fn value(
    state: &VdfState,
    table: &LinkTable,
    disabled: &[bool],
    link: usize,
    flow: f64,
) -> Option<f64> {
    if is_disabled(disabled, link) {
        return Some(INFINITE_COST);
    }
    link_cost(&LinkParams::from_table(table, link), flow, state.big_real)
}

/// Outcome of a batch evaluation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Links whose current cost was written
    pub evaluated: usize,
    /// Links raised to their free-flow time
    pub clamped: usize,
    /// Largest current cost written
    pub threshold: f64,
}

/// Evaluate every enabled link at its flow and write the current-cost column.
///
/// Costs below free-flow time are raised to it and flag the state
/// `InvalidInput` without stopping the batch.
pub fn values(
    state: &mut VdfState,
    table: &mut LinkTable,
    disabled: &[bool],
    flows: &[f64],
) -> Result<BatchSummary, VdfError> {
    evaluate_batch(state, table, disabled, flows, true)
}

/// Like [`values`] but without the reliability multiplier, for reporting
/// pure travel time. Identical to [`values`] for the baseline variant.
pub fn time_only(
    state: &mut VdfState,
    table: &mut LinkTable,
    disabled: &[bool],
    flows: &[f64],
) -> Result<BatchSummary, VdfError> {
    evaluate_batch(state, table, disabled, flows, false)
}

fn evaluate_batch(
    state: &mut VdfState,
    table: &mut LinkTable,
    disabled: &[bool],
    flows: &[f64],
    with_reliability: bool,
) -> Result<BatchSummary, VdfError> {
    if flows.len() != table.len() {
        return Err(VdfError::ColumnLength {
            field: "flow".to_string(),
            expected: table.len(),
            found: flows.len(),
        });
    }

    state.status = Status::Okay;
    state.threshold = 0.0;
    let mut summary = BatchSummary::default();

    for (link, &flow) in flows.iter().enumerate() {
        if is_disabled(disabled, link) {
            continue;
        }

        let params = LinkParams::from_table(table, link);
        let Some(t0) = params.t0 else {
            table.set_current_cost(link, None);
            continue;
        };

        let cost = if with_reliability {
            link_cost(&params, flow, state.big_real)
        } else {
            base_delay(&params, flow, state.big_real)
        }
        .unwrap_or(t0);

        let current = if cost < t0 {
            trace!(link, cost, t0, "Cost below free-flow time, clamping");
            state.status = Status::InvalidInput;
            summary.clamped += 1;
            t0
        } else {
            cost
        };

        table.set_current_cost(link, Some(current));
        state.threshold = state.threshold.max(current);
        summary.evaluated += 1;
    }

    summary.threshold = state.threshold;
    if summary.clamped > 0 {
        warn!(
            clamped = summary.clamped,
            "Link costs fell below free-flow time and were clamped"
        );
    }

    Ok(summary)
}
