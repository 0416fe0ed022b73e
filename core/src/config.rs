use crate::{
    adjacency::{AdjacencyMatrix, DistanceMatrix},
    disease::Disease,
    error::{SimError, SimResult},
    policy::{
        BetweenDistancePressureHandler, ConnectivityPolicy, DistancePressureHandler,
        FlickerEdges, GlobalPressureHandler, MultiPolicy, MultiPressureHandler, NoUpdate,
        PressureFlicker, PressureHandler, RandomFlicker, StaticFlicker,
    },
    rewiring::{AgentBehavior, TimeBasedAgentRewiring},
    sir::InitialInfected,
    types::{NodeId, Tick},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ── Connectivity policies ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyConfig {
    NoUpdate,
    StaticFlicker {
        pattern: Vec<bool>,
        /// Overrides the externally supplied flicker set.
        #[serde(default)]
        edges: Option<Vec<(NodeId, NodeId)>>,
        #[serde(default)]
        name: Option<String>,
    },
    RandomFlicker {
        probability: f64,
        #[serde(default)]
        edges: Option<Vec<(NodeId, NodeId)>>,
        #[serde(default)]
        name: Option<String>,
    },
    PressureFlicker {
        handler: PressureConfig,
        flicker_probability: f64,
        #[serde(default)]
        threshold: f64,
        /// Defaults to every base edge.
        #[serde(default)]
        edges: Option<Vec<(NodeId, NodeId)>>,
        #[serde(default)]
        name: Option<String>,
    },
    Multi {
        policies: Vec<PolicyConfig>,
        #[serde(default)]
        name: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PressureConfig {
    Distance { radius: u32 },
    BetweenDistance { min: u32, max: u32 },
    Global,
    Multi { handlers: Vec<PressureConfig> },
}

impl PressureConfig {
    /// `distances` caches the hop-distance matrix across handlers.
    pub fn build(
        &self,
        base: &AdjacencyMatrix,
        distances: &mut Option<DistanceMatrix>,
    ) -> SimResult<Box<dyn PressureHandler>> {
        let handler: Box<dyn PressureHandler> = match self {
            Self::Distance { radius } => {
                Box::new(DistancePressureHandler::new(cached(base, distances), *radius))
            }
            Self::BetweenDistance { min, max } => Box::new(BetweenDistancePressureHandler::new(
                cached(base, distances),
                *min,
                *max,
            )?),
            Self::Global => Box::new(GlobalPressureHandler),
            Self::Multi { handlers } => {
                let built = handlers
                    .iter()
                    .map(|h| h.build(base, distances))
                    .collect::<SimResult<Vec<_>>>()?;
                Box::new(MultiPressureHandler::new(built)?)
            }
        };
        Ok(handler)
    }
}

fn cached<'d>(base: &AdjacencyMatrix, distances: &'d mut Option<DistanceMatrix>) -> &'d DistanceMatrix {
    distances.get_or_insert_with(|| base.hop_distances())
}

impl PolicyConfig {
    /// Build a fresh policy for one run over `base`.
    ///
    /// `flicker_edges` is the eligible set supplied by a partitioning step.
    /// Flicker variants fall back to every base edge when neither it nor the
    /// config names any edges.
    pub fn build(
        &self,
        base: &AdjacencyMatrix,
        flicker_edges: Option<&FlickerEdges>,
    ) -> SimResult<Box<dyn ConnectivityPolicy>> {
        let mut distances = None;
        self.build_with(base, flicker_edges, &mut distances)
    }

    fn build_with(
        &self,
        base: &AdjacencyMatrix,
        flicker_edges: Option<&FlickerEdges>,
        distances: &mut Option<DistanceMatrix>,
    ) -> SimResult<Box<dyn ConnectivityPolicy>> {
        let eligible = |edges: &Option<Vec<(NodeId, NodeId)>>| -> SimResult<FlickerEdges> {
            match (edges, flicker_edges) {
                (Some(pairs), _) => FlickerEdges::new(base, pairs),
                (None, Some(supplied)) => Ok(supplied.clone()),
                (None, None) => Ok(FlickerEdges::all(base)),
            }
        };

        let policy: Box<dyn ConnectivityPolicy> = match self {
            Self::NoUpdate => Box::new(NoUpdate),
            Self::StaticFlicker { pattern, edges, name } => {
                let policy = StaticFlicker::new(eligible(edges)?, pattern.clone())?;
                match name {
                    Some(name) => Box::new(policy.with_name(name.clone())),
                    None => Box::new(policy),
                }
            }
            Self::RandomFlicker { probability, edges, name } => {
                let policy = RandomFlicker::new(eligible(edges)?, *probability)?;
                match name {
                    Some(name) => Box::new(policy.with_name(name.clone())),
                    None => Box::new(policy),
                }
            }
            Self::PressureFlicker { handler, flicker_probability, threshold, edges, name } => {
                let handler = handler.build(base, distances)?;
                let mut policy = PressureFlicker::new(handler, *flicker_probability)?
                    .with_threshold(*threshold)?;
                if let Some(pairs) = edges {
                    policy = policy.with_edges(FlickerEdges::new(base, pairs)?);
                }
                match name {
                    Some(name) => Box::new(policy.with_name(name.clone())),
                    None => Box::new(policy),
                }
            }
            Self::Multi { policies, name } => {
                let built = policies
                    .iter()
                    .map(|p| p.build_with(base, flicker_edges, distances))
                    .collect::<SimResult<Vec<_>>>()?;
                let policy = MultiPolicy::new(built)?;
                match name {
                    Some(name) => Box::new(policy.with_name(name.clone())),
                    None => Box::new(policy),
                }
            }
        };
        Ok(policy)
    }
}

// ── Agent-based generation ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewiringConfig {
    pub agents:          usize,
    pub lower_bound:     usize,
    pub upper_bound:     usize,
    pub steps_to_stable: u64,
    /// Step budget for a single generation attempt.
    pub max_steps:       u64,
    /// Consecutive failed attempts before giving up.
    pub max_failures:    usize,
}

impl RewiringConfig {
    pub fn make_behavior(&self) -> SimResult<Box<dyn AgentBehavior>> {
        Ok(Box::new(TimeBasedAgentRewiring::new(
            self.agents,
            self.lower_bound,
            self.upper_bound,
            self.steps_to_stable,
        )?))
    }
}

// ── Run configuration ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub disease:          Disease,
    pub policy:           PolicyConfig,
    pub initial_infected: InitialInfected,
    pub max_steps:        Tick,
    /// Used by the runner when no network file is given.
    #[serde(default)]
    pub rewiring:         Option<RewiringConfig>,
}

impl RunConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: RunConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that do not need the network itself.
    pub fn validate(&self) -> SimResult<()> {
        if let InitialInfected::Count(0) = self.initial_infected {
            log::warn!("run config starts with no infected nodes");
        }
        if let Some(rewiring) = &self.rewiring {
            if rewiring.max_failures == 0 {
                return Err(SimError::invalid_parameter("max_failures", "must be positive"));
            }
        }
        Ok(())
    }

    /// Config with hardcoded defaults for use in tests and quick runs:
    /// 4 ticks infectious, 0.3 transmission, one random patient zero,
    /// no mitigations, 200 ticks.
    pub fn default_test() -> Self {
        Self {
            disease: Disease::default(),
            policy: PolicyConfig::NoUpdate,
            initial_infected: InitialInfected::Count(1),
            max_steps: 200,
            rewiring: None,
        }
    }

    /// Patient zero at each of `nodes`.
    pub fn with_initial_nodes(mut self, nodes: &[NodeId]) -> Self {
        self.initial_infected = InitialInfected::Nodes(nodes.iter().copied().collect::<BTreeSet<_>>());
        self
    }
}
