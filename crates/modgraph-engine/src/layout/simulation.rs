//! Background force-directed layout.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┬──────────────────────────────────┐
//! │  Caller                      │  Worker thread                   │
//! │  ──────                      │  ─────────────                   │
//! │  LayoutSession::start ───────┼→ build ForceGraph from snapshot  │
//! │                              │  update() × snapshot_every       │
//! │  LayoutSession::poll   ←─────┼─ send positions (bounded, 1)     │
//! │  merge, check movement       │  ...until cancelled or budget    │
//! │  LayoutSession::stop ────────┼→ cancel flag, receiver dropped   │
//! └──────────────────────────────┴──────────────────────────────────┘
//! ```
//!
//! At most one worker runs per session: starting a new run cancels and joins
//! the previous one first. The snapshot channel holds a single entry, so the
//! worker never runs more than one batch ahead of the poller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};
use modgraph_core::GraphConfig;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::build::RenderableGraph;

/// A node that moved no more than this since the previous snapshot is at rest.
pub const SETTLE_THRESHOLD: f64 = 0.1;

const TIME_STEP: f32 = 0.016;
const FORCE_CHARGE: f32 = 150.0;
const FORCE_SPRING: f32 = 0.05;
const FORCE_MAX: f32 = 100.0;
const NODE_SPEED: f32 = 3000.0;
const NODE_MASS: f32 = 10.0;
const MIN_DAMPING: f32 = 0.5;
const MAX_DAMPING: f32 = 0.99;

/// Simulation knobs derived from the graph config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutSettings {
    /// `layoutEnable`: whether [`LayoutSession::start`] runs anything.
    pub enabled: bool,
    /// `layoutForcePower`: scales edge attraction.
    pub edge_weight_influence: f32,
    /// `layoutForceSlowdown`: higher values damp movement harder.
    pub slow_down: f32,
    /// Iterations between two snapshots.
    pub snapshot_every: usize,
    /// Iteration budget; the worker stops on its own once spent.
    pub max_iterations: usize,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self::from_config(&GraphConfig::default())
    }
}

impl LayoutSettings {
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_config(config: &GraphConfig) -> Self {
        Self {
            enabled: config.layout_enable,
            edge_weight_influence: config.layout_force_power as f32,
            slow_down: config.layout_force_slowdown as f32,
            snapshot_every: 10,
            max_iterations: 5_000,
        }
    }

    /// Physics parameters for the force engine.
    #[must_use]
    pub fn parameters(&self) -> SimulationParameters {
        SimulationParameters {
            force_charge: FORCE_CHARGE,
            force_spring: FORCE_SPRING * self.edge_weight_influence.max(0.0),
            force_max: FORCE_MAX,
            node_speed: NODE_SPEED,
            damping_factor: (1.0 - 1.0 / self.slow_down.max(1.0)).clamp(MIN_DAMPING, MAX_DAMPING),
        }
    }
}

/// Where the current run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutStatus {
    /// Nothing is running.
    Idle,
    /// A worker is producing snapshots.
    Running,
    /// Positions stopped moving (or the budget ran out); the worker is gone.
    Settled,
}

struct Snapshot {
    iteration: usize,
    positions: Vec<(f32, f32)>,
}

struct Worker {
    cancel: Arc<AtomicBool>,
    receiver: Receiver<Snapshot>,
    handle: JoinHandle<()>,
}

/// Owner of the background simulation for one graph session.
pub struct LayoutSession {
    worker: Option<Worker>,
    status: LayoutStatus,
    paths: Vec<String>,
    last: Vec<(f64, f64)>,
    iterations: usize,
}

impl Default for LayoutSession {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutSession {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            worker: None,
            status: LayoutStatus::Idle,
            paths: Vec::new(),
            last: Vec::new(),
            iterations: 0,
        }
    }

    #[must_use]
    pub const fn status(&self) -> LayoutStatus {
        self.status
    }

    /// Iterations covered by the last merged snapshot.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Cancel any previous run and start simulating `graph`.
    ///
    /// Does nothing (and reports [`LayoutStatus::Idle`]) when the layout is
    /// disabled or the graph is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread cannot be spawned.
    pub fn start(&mut self, graph: &RenderableGraph, settings: &LayoutSettings) -> Result<LayoutStatus> {
        self.stop();
        self.status = LayoutStatus::Idle;
        self.iterations = 0;
        if !settings.enabled || graph.is_empty() {
            return Ok(self.status);
        }

        self.paths = graph.paths().map(str::to_string).collect();
        self.last = graph.nodes.iter().map(|node| (node.x, node.y)).collect();

        let seed = seed_nodes(graph);
        let edges = graph.layout_edges();
        let edge_count = edges.len();
        let settings = *settings;
        let cancel = Arc::new(AtomicBool::new(false));
        let (sender, receiver) = mpsc::sync_channel(1);
        let worker_cancel = Arc::clone(&cancel);
        let handle = thread::Builder::new()
            .name("modgraph-layout".to_string())
            .spawn(move || simulate(&seed, &edges, settings, &worker_cancel, &sender))
            .context("failed to spawn layout worker")?;

        info!(
            nodes = graph.len(),
            edges = edge_count,
            max_iterations = settings.max_iterations,
            "layout started"
        );
        self.worker = Some(Worker {
            cancel,
            receiver,
            handle,
        });
        self.status = LayoutStatus::Running;
        Ok(self.status)
    }

    /// Merge the newest snapshot into `graph` and report progress.
    ///
    /// Snapshots are ignored when `graph` no longer has the node set the run
    /// was started with. Once no node moves more than [`SETTLE_THRESHOLD`]
    /// between two snapshots the run is stopped and
    /// [`LayoutStatus::Settled`] is returned.
    pub fn poll(&mut self, graph: &mut RenderableGraph) -> LayoutStatus {
        let Some(worker) = &self.worker else {
            return self.status;
        };

        let mut latest = None;
        let mut finished = false;
        loop {
            match worker.receiver.try_recv() {
                Ok(snapshot) => latest = Some(snapshot),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    finished = true;
                    break;
                }
            }
        }

        let mut settled = finished;
        if let Some(snapshot) = latest {
            if graph.paths().eq(self.paths.iter().map(String::as_str)) {
                settled |= self.merge(graph, &snapshot);
            } else {
                debug!("graph changed under the running layout, snapshot dropped");
            }
        }

        if settled {
            self.stop();
            self.status = LayoutStatus::Settled;
            info!(iterations = self.iterations, "layout settled");
        }
        self.status
    }

    /// Block until the run settles, calling [`LayoutSession::poll`] at most
    /// `max_polls` times. Returns the final status.
    pub fn wait(&mut self, graph: &mut RenderableGraph, max_polls: usize) -> LayoutStatus {
        for _ in 0..max_polls {
            if self.poll(graph) != LayoutStatus::Running {
                break;
            }
            thread::yield_now();
        }
        self.status
    }

    /// Cancel and join the running worker, if any.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        worker.cancel.store(true, Ordering::Relaxed);
        drop(worker.receiver);
        if worker.handle.join().is_err() {
            warn!("layout worker panicked");
        }
        if self.status == LayoutStatus::Running {
            self.status = LayoutStatus::Idle;
        }
    }

    /// Returns `true` when nothing moved more than the threshold.
    fn merge(&mut self, graph: &mut RenderableGraph, snapshot: &Snapshot) -> bool {
        let mut at_rest = true;
        for ((node, last), &(x, y)) in graph.nodes.iter_mut().zip(&mut self.last).zip(&snapshot.positions) {
            let (x, y) = (f64::from(x), f64::from(y));
            if (x - last.0).abs() > SETTLE_THRESHOLD || (y - last.1).abs() > SETTLE_THRESHOLD {
                at_rest = false;
            }
            *last = (x, y);
            node.x = x;
            node.y = y;
        }
        self.iterations = snapshot.iteration;
        at_rest
    }
}

impl Drop for LayoutSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[allow(clippy::cast_possible_truncation)]
fn seed_nodes(graph: &RenderableGraph) -> Vec<(f32, f32)> {
    graph
        .nodes
        .iter()
        .map(|node| (node.x as f32, node.y as f32))
        .collect()
}

fn simulate(
    seed: &[(f32, f32)],
    edges: &[(usize, usize)],
    settings: LayoutSettings,
    cancel: &AtomicBool,
    sender: &SyncSender<Snapshot>,
) {
    let mut graph: ForceGraph<usize, ()> = ForceGraph::new(settings.parameters());
    let handles: Vec<DefaultNodeIdx> = seed
        .iter()
        .enumerate()
        .map(|(idx, &(x, y))| {
            graph.add_node(NodeData {
                x,
                y,
                mass: NODE_MASS,
                is_anchor: false,
                user_data: idx,
            })
        })
        .collect();
    for &(a, b) in edges {
        if a != b {
            graph.add_edge(handles[a], handles[b], EdgeData::default());
        }
    }

    let every = settings.snapshot_every.max(1);
    for iteration in 1..=settings.max_iterations {
        if cancel.load(Ordering::Relaxed) {
            return;
        }
        graph.update(TIME_STEP);
        if iteration % every != 0 && iteration != settings.max_iterations {
            continue;
        }

        let mut positions = vec![(0.0, 0.0); seed.len()];
        graph.visit_nodes(|node| {
            positions[node.data.user_data] = (node.x(), node.y());
        });
        if sender.send(Snapshot { iteration, positions }).is_err() {
            return;
        }
    }
}
