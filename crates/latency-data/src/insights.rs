//! Rule-based findings shown on the summary page.
//!
//! Each [`InsightRule`] pairs a name with a pure evaluation function. Rules
//! run in [`RULES`] order and may look at what earlier rules produced.

use std::collections::HashSet;

use latency_core::formatting::{format_rate, format_seconds, ratio};
use serde::Serialize;

use crate::aggregator::{MetricsSnapshot, HIGH_LATENCY_MS};

/// Success rate (fraction) below which overall stability is flagged.
pub const MIN_SUCCESS_RATE: f64 = 0.95;
/// Mean successful latency above which an API is flagged as slow.
pub const SLOW_MEAN_MS: f64 = 5_000.0;
/// Upper bound on the number of insights shown.
pub const MAX_INSIGHTS: usize = 8;

// ── Severity ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Notice,
    Muted,
    Positive,
}

impl Severity {
    /// Text colour used by the summary page.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Critical => "#C0392B",
            Self::Warning => "#D35400",
            Self::Notice => "#F39C12",
            Self::Muted => "#7F8C8D",
            Self::Positive => "#27AE60",
        }
    }
}

// ── Insight ───────────────────────────────────────────────────────────────────

/// One human-readable finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insight {
    pub severity: Severity,
    pub message: String,
    /// Rendered in bold.
    pub emphasized: bool,
}

impl Insight {
    fn new(severity: Severity, message: impl Into<String>, emphasized: bool) -> Self {
        Self {
            severity,
            message: message.into(),
            emphasized,
        }
    }
}

// ── Rules ─────────────────────────────────────────────────────────────────────

/// What a rule sees: the metrics and the insights produced before it.
pub struct RuleContext<'a> {
    pub snapshot: &'a MetricsSnapshot,
    pub fired_so_far: &'a [Insight],
}

pub struct InsightRule {
    pub name: &'static str,
    pub evaluate: fn(&RuleContext<'_>) -> Vec<Insight>,
}

/// All rules in evaluation order.
pub const RULES: &[InsightRule] = &[
    InsightRule { name: "network_errors", evaluate: network_errors },
    InsightRule { name: "server_errors", evaluate: server_errors },
    InsightRule { name: "client_errors", evaluate: client_errors },
    InsightRule { name: "low_success_rate", evaluate: low_success_rate },
    InsightRule { name: "slow_mean", evaluate: slow_mean },
    InsightRule { name: "latency_spike", evaluate: latency_spike },
    InsightRule { name: "no_successes", evaluate: no_successes },
    InsightRule { name: "nominal", evaluate: nominal },
    InsightRule { name: "disconnected_calls", evaluate: disconnected_calls },
    InsightRule { name: "disconnected_failures", evaluate: disconnected_failures },
    InsightRule { name: "weak_signal", evaluate: weak_signal },
];

fn network_errors(ctx: &RuleContext<'_>) -> Vec<Insight> {
    let status = &ctx.snapshot.status;
    if status.network_errors == 0 {
        return Vec::new();
    }
    vec![Insight::new(
        Severity::Critical,
        format!(
            "NETWORK: {}% calls failed due to network (Status 0).",
            format_rate(status.network_error_rate())
        ),
        true,
    )]
}

fn server_errors(ctx: &RuleContext<'_>) -> Vec<Insight> {
    let status = &ctx.snapshot.status;
    if status.server_errors == 0 {
        return Vec::new();
    }
    vec![Insight::new(
        Severity::Critical,
        format!(
            "CRITICAL: {}% calls failed with Server Errors (5xx).",
            format_rate(status.server_error_rate())
        ),
        true,
    )]
}

fn client_errors(ctx: &RuleContext<'_>) -> Vec<Insight> {
    let status = &ctx.snapshot.status;
    if status.client_errors == 0 {
        return Vec::new();
    }
    vec![Insight::new(
        Severity::Warning,
        format!(
            "WARNING: {}% calls failed with Client Errors (4xx).",
            format_rate(status.client_error_rate())
        ),
        false,
    )]
}

fn low_success_rate(ctx: &RuleContext<'_>) -> Vec<Insight> {
    let status = &ctx.snapshot.status;
    if status.total == 0 || status.success_rate() >= MIN_SUCCESS_RATE {
        return Vec::new();
    }
    vec![Insight::new(
        Severity::Warning,
        format!(
            "STABILITY: Overall success rate is low ({}%).",
            format_rate(status.success_rate())
        ),
        true,
    )]
}

fn slow_mean(ctx: &RuleContext<'_>) -> Vec<Insight> {
    ctx.snapshot
        .apis
        .iter()
        .filter_map(|api| {
            let mean = api.mean_ms.filter(|m| *m > SLOW_MEAN_MS)?;
            Some(Insight::new(
                Severity::Warning,
                format!(
                    "PERFORMANCE: {} avg latency {}s.",
                    api.api_name,
                    format_seconds(mean)
                ),
                true,
            ))
        })
        .collect()
}

fn latency_spike(ctx: &RuleContext<'_>) -> Vec<Insight> {
    ctx.snapshot
        .apis
        .iter()
        .filter_map(|api| {
            let max = api.max_ms.filter(|m| *m > HIGH_LATENCY_MS)?;
            Some(Insight::new(
                Severity::Critical,
                format!("SPIKE: {} max latency {}s.", api.api_name, format_seconds(max)),
                true,
            ))
        })
        .collect()
}

fn no_successes(ctx: &RuleContext<'_>) -> Vec<Insight> {
    if ctx.snapshot.status.success > 0 {
        return Vec::new();
    }
    vec![Insight::new(
        Severity::Muted,
        "No successful API calls (Status 200) found.",
        false,
    )]
}

fn nominal(ctx: &RuleContext<'_>) -> Vec<Insight> {
    if !ctx.fired_so_far.is_empty() {
        return Vec::new();
    }
    vec![Insight::new(
        Severity::Positive,
        "All APIs are performing within normal parameters.",
        true,
    )]
}

fn disconnected_calls(ctx: &RuleContext<'_>) -> Vec<Insight> {
    let Some(conn) = &ctx.snapshot.connectivity else {
        return Vec::new();
    };
    if conn.disconnected_calls == 0 {
        return Vec::new();
    }
    vec![Insight::new(
        Severity::Warning,
        format!(
            "CONNECTIVITY: {}% calls made while NOT connected (e.g., {}).",
            format_rate(ratio(conn.disconnected_calls, ctx.snapshot.total_calls)),
            conn.disconnected_states.join(", ")
        ),
        true,
    )]
}

fn disconnected_failures(ctx: &RuleContext<'_>) -> Vec<Insight> {
    let Some(conn) = &ctx.snapshot.connectivity else {
        return Vec::new();
    };
    if conn.disconnected_failures == 0 {
        return Vec::new();
    }
    vec![Insight::new(
        Severity::Critical,
        format!(
            "RISK: {}% failure rate when not 'connected'.",
            format_rate(conn.disconnected_failure_rate())
        ),
        true,
    )]
}

fn weak_signal(ctx: &RuleContext<'_>) -> Vec<Insight> {
    match ctx.snapshot.weak_signal_calls {
        Some(n) if n > 0 => vec![Insight::new(
            Severity::Notice,
            format!("SIGNAL: {} calls made with weak signal (<20%).", n),
            false,
        )],
        _ => Vec::new(),
    }
}

// ── Derivation ────────────────────────────────────────────────────────────────

/// Run every rule over `snapshot`, dedup by message and cap the list.
///
/// An empty snapshot yields no insights.
pub fn derive_insights(snapshot: &MetricsSnapshot) -> Vec<Insight> {
    if snapshot.total_calls == 0 {
        return Vec::new();
    }

    let mut fired: Vec<Insight> = Vec::new();
    for rule in RULES {
        let produced = (rule.evaluate)(&RuleContext {
            snapshot,
            fired_so_far: &fired,
        });
        if !produced.is_empty() {
            tracing::debug!("insight rule {} fired {} time(s)", rule.name, produced.len());
        }
        fired.extend(produced);
    }

    let mut seen = HashSet::new();
    fired.retain(|insight| seen.insert(insight.message.clone()));
    fired.truncate(MAX_INSIGHTS);
    fired
}

// ── Tests ─────────────────────────────────────────────────────────────────────
