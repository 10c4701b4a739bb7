//! `heat replay` — run a reading sequence through the state machine and
//! router offline, with fresh memory for every server.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result, bail};
use serde::Serialize;

use heat_core::{HeatDecision, ServerId};
use heatgrid_engine::EntityMemory;
use heatgrid_router::{FreezePolicy, RouteState, update_and_select};

/// One `<server-id>:<hit>` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    server_id: ServerId,
    hit: i32,
}

/// Outcome of one replayed reading.
#[derive(Debug, Serialize)]
struct ReplayStep {
    server_id: ServerId,
    hit: i32,
    #[serde(flatten)]
    decision: HeatDecision,
    freeze: bool,
    target: Option<ServerId>,
}

pub fn replay(steps: &[String], freeze: i32, release: i32, format: &str) -> Result<()> {
    let policy = FreezePolicy::new(freeze, release)?;
    let steps = steps
        .iter()
        .map(|raw| parse_step(raw))
        .collect::<Result<Vec<_>>>()?;

    let outcomes = run_replay(&steps, &policy);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&outcomes)?);
        }
        _ => {
            for outcome in &outcomes {
                println!("{}", format_step(outcome));
            }
        }
    }

    Ok(())
}

fn parse_step(raw: &str) -> Result<Step> {
    let Some((server_id, hit)) = raw.rsplit_once(':') else {
        bail!("invalid step '{raw}': expected <server-id>:<hit>");
    };
    if server_id.is_empty() {
        bail!("invalid step '{raw}': server id is empty");
    }
    let hit = hit
        .trim()
        .parse::<i32>()
        .with_context(|| format!("invalid hit value in step '{raw}'"))?;

    Ok(Step {
        server_id: server_id.to_string(),
        hit,
    })
}

fn run_replay(steps: &[Step], policy: &FreezePolicy) -> Vec<ReplayStep> {
    let mut memories: HashMap<ServerId, EntityMemory> = HashMap::new();
    let mut routes: BTreeMap<ServerId, RouteState> = BTreeMap::new();

    steps
        .iter()
        .map(|step| {
            let decision = memories
                .entry(step.server_id.clone())
                .or_default()
                .transition(step.hit);
            let target = update_and_select(&mut routes, &step.server_id, step.hit, policy);
            let freeze = routes
                .get(&step.server_id)
                .is_some_and(|route| route.freeze);

            ReplayStep {
                server_id: step.server_id.clone(),
                hit: step.hit,
                decision,
                freeze,
                target,
            }
        })
        .collect()
}

fn format_step(step: &ReplayStep) -> String {
    let mut flags = Vec::new();
    if step.decision.locked {
        flags.push("LOCKED");
    }
    if step.freeze {
        flags.push("FROZEN");
    }
    let flags = if flags.is_empty() {
        String::new()
    } else {
        format!(" ({})", flags.join(", "))
    };

    format!(
        "{id}:{hit:<4} {state} [{severity}]{flags} -> {target}",
        id = step.server_id,
        hit = step.hit,
        state = step.decision.state,
        severity = step.decision.severity,
        target = step.target.as_deref().unwrap_or("HOLD"),
    )
}
