use clap::{Parser, Subcommand, ValueEnum};

use crate::console::Show;

#[derive(Parser, Debug)]
#[command(
    name = "alpacalert",
    about = "Compose Kubernetes, Grafana, and Prometheus into one tree of health checks",
    version
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Show the whole tree, or only the subtrees that are not passing.
    #[arg(long, global = true, value_enum)]
    pub show: Option<ShowArg>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a Kubernetes cluster (or one namespace of it).
    Kubernetes {
        /// Namespace to scan; "all" means the whole cluster.
        #[arg(long, default_value = "all")]
        namespace: String,

        /// Display name for the cluster service. Defaults to the current
        /// kubeconfig context.
        #[arg(long)]
        name: Option<String>,

        /// Also attach per-container Prometheus metrics from this base URL.
        #[arg(long)]
        prometheus_url: Option<String>,
    },
    /// Scan a Grafana instance's alert tree.
    Grafana {
        /// Grafana base URL; falls back to `grafana.base_url` in the config
        /// file.
        #[arg(long)]
        base_url: Option<String>,

        /// Display name for the Grafana service.
        #[arg(long, default_value = "Grafana")]
        name: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowArg {
    All,
    OnlyFailing,
}

impl From<ShowArg> for Show {
    fn from(arg: ShowArg) -> Self {
        match arg {
            ShowArg::All => Show::All,
            ShowArg::OnlyFailing => Show::OnlyFailing,
        }
    }
}
