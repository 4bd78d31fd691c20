//! Closed-form derivative and integral of link cost with respect to flow
//!
//! Both return 0 for disabled links, links without free-flow time or
//! capacity, and non-positive capacity, instead of evaluating an ill-defined
//! term. Neither integrates the reliability multiplier.

use crate::{active_reliability_sum, cost::is_disabled, LinkParams, LinkTable, Variant};

/// Segment and junction capacity, when both t0 and a positive capacity exist
fn priced_capacity(params: &LinkParams) -> Option<f64> {
    params.t0?;
    params.capacity.filter(|cap| *cap > 0.0)
}

/// d(cost)/d(flow) for one link
pub fn link_derivative(params: &LinkParams, flow: f64) -> f64 {
    let (Some(t0), Some(cap)) = (params.t0, priced_capacity(params)) else {
        return 0.0;
    };

    let volume = params.volume(flow);
    if volume == 0.0 {
        return 0.0;
    }

    let vc_s = volume / cap;
    let mut slope =
        t0 * params.alpha1 * params.beta1 * vc_s.powf(params.beta1 - 1.0) * (1.0 / cap);

    if let Some(factor) = params.junction_factor() {
        let vc_j = volume * factor;
        let lambda_j = params.alpha2 * params.beta2 * vc_j.powf(params.beta2 - 1.0) * factor;
        slope += params.junction_scale() * lambda_j;
    }

    if params.variant.has_reliability() {
        slope += reliability_derivative(params, flow);
    }

    slope
}

/// Reliability contribution to the extended derivative:
///
/// r·(2·α1·β1·t0·c^−β1·x^β1 + α2·β2·(gc−1)²·pf·cyc·n^−β2·x^β2) / (2x)
///
/// with r the active LOS coefficient sum times length over capacity, x the
/// volume, c the segment and n the junction capacity.
pub fn reliability_derivative(params: &LinkParams, flow: f64) -> f64 {
    let (Some(t0), Some(cap)) = (params.t0, priced_capacity(params)) else {
        return 0.0;
    };

    let x = params.volume(flow);
    if x == 0.0 {
        return 0.0;
    }

    let r = active_reliability_sum(params, flow) * params.length / cap;
    if r <= 0.0 {
        return 0.0;
    }

    let segment = 2.0
        * params.alpha1
        * params.beta1
        * t0
        * cap.powf(-params.beta1)
        * x.powf(params.beta1);
    let junction = params.intersection_capacity.map_or(0.0, |n| {
        params.alpha2
            * params.beta2
            * (params.gc - 1.0).powi(2)
            * params.pf
            * params.cycle
            * n.powf(-params.beta2)
            * x.powf(params.beta2)
    });

    r * (segment + junction) / (2.0 * x)
}

/// ∫ cost d(flow) from 0 to `flow` for one link, reliability excluded
pub fn link_integral(params: &LinkParams, flow: f64) -> f64 {
    let (Some(t0), Some(cap)) = (params.t0, priced_capacity(params)) else {
        return 0.0;
    };
    if flow <= 0.0 {
        return 0.0;
    }

    let volume = params.volume(flow);
    let ratio_s = volume / cap;
    let lambda_s = 1.0 + ratio_s.powf(params.beta1) * params.alpha1 / (params.beta1 + 1.0);

    // the extended reference weights the segment term by volume and takes the
    // junction ratio against segment capacity
    let (segment_weight, junction_ratio) = match params.variant {
        Variant::Baseline => (flow, params.junction_factor().map(|k| volume * k)),
        Variant::Extended => (volume, (params.gc > 0.0).then_some(volume / cap)),
    };

    let mut area = t0 * segment_weight * lambda_s;

    if let Some(ratio_j) = junction_ratio {
        let lambda_j = 1.0 + ratio_j.powf(params.beta2) * params.alpha2 / (params.beta2 + 1.0);
        area += params.junction_scale() * flow * lambda_j;
    }

    area
}

/// Derivative at `flow`; 0 for disabled links
pub fn derivative(table: &LinkTable, disabled: &[bool], link: usize, flow: f64) -> f64 {
    if is_disabled(disabled, link) {
        return 0.0;
    }
    link_derivative(&LinkParams::from_table(table, link), flow)
}

/// Integral from 0 to `flow`; 0 for disabled links
pub fn integral(table: &LinkTable, disabled: &[bool], link: usize, flow: f64) -> f64 {
    if is_disabled(disabled, link) {
        return 0.0;
    }
    link_integral(&LinkParams::from_table(table, link), flow)
}
