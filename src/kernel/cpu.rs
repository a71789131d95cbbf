//! CPU-bound kernel: the alternating series for pi, summed forever or for a
//! fixed number of terms.

use std::hint::black_box;

use serde::{Deserialize, Serialize};

use crate::context::CancelToken;

/// What a CPU kernel invocation got through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuOutcome {
    pub iterations: u64,
    pub value: f64,
}

/// Term `i` of the series: `4 * (-1)^i / (2i + 1)`.
#[inline]
pub fn term(i: u64) -> f64 {
    let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
    4.0 * sign / (2.0 * i as f64 + 1.0)
}

/// Sum terms until `cancel` is set. Polls the token once per term.
pub fn spin_until_cancelled(cancel: &CancelToken) -> CpuOutcome {
    let mut value = 0.0;
    let mut i: u64 = 0;
    while !cancel.is_cancelled() {
        value = black_box(value + term(i));
        i = i.wrapping_add(1);
    }
    CpuOutcome {
        iterations: i,
        value,
    }
}

/// Sum exactly `iterations` terms.
pub fn spin_bounded(iterations: u64) -> CpuOutcome {
    let mut value = 0.0;
    for i in 0..iterations {
        value = black_box(value + term(i));
    }
    CpuOutcome { iterations, value }
}
