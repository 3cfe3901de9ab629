//! Alpacalert composes heterogeneous external systems — Kubernetes clusters,
//! Grafana alert trees, Prometheus query results — into one hierarchical
//! tree of health checks rooted at a user-defined service.
//!
//! The building blocks: [`models`] defines the three-valued state algebra
//! and the `Scanner` tree; [`instrument`] dispatches external objects to
//! scanner builders through a kind-keyed registry; [`k8s`], [`grafana`],
//! and [`prometheus`] hold the per-system instrumentor catalogs; and
//! [`console`] renders the finished tree.
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions, // InstrumentorRegistry, K8sObject etc. are fine
    clippy::must_use_candidate,
    clippy::missing_errors_doc,      // errors are typed; the variants document themselves
)]

pub mod cli;
pub mod config;
pub mod console;
pub mod generic;
pub mod grafana;
pub mod instrument;
pub mod k8s;
pub mod models;
pub mod prometheus;
pub mod transform;
