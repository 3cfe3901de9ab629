#![warn(clippy::all, clippy::pedantic)]

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use alpacalert::cli::{Args, Command};
use alpacalert::config::Config;
use alpacalert::console::{ConsoleVisualiser, Show, Symbols};
use alpacalert::generic::{ServiceBasic, SystemAll};
use alpacalert::grafana::{self, GrafanaApi};
use alpacalert::instrument::Target;
use alpacalert::k8s::{self, KubeApi, NamespaceScope, K8s};
use alpacalert::models::Visualiser;
use alpacalert::prometheus::{ContainerMetricsInstrumentor, PrometheusApi};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load();
    let visualiser = ConsoleVisualiser::new(symbols(&config), show(&args, &config));

    match args.command {
        Command::Kubernetes {
            namespace,
            name,
            prometheus_url,
        } => {
            let client = k8s::build_client().await?;
            let facade = Arc::new(K8s::new(Arc::new(KubeApi::new(client))));
            let mut registry = k8s::registry(facade);
            if let Some(url) = prometheus_url {
                let api = Arc::new(PrometheusApi::new(url));
                registry.register_all(Arc::new(ContainerMetricsInstrumentor::new(api)));
            }

            let cluster = name.unwrap_or_else(k8s::current_context);
            let systems = registry
                .instrument(
                    &k8s::kind("Clusters"),
                    &Target::Cluster {
                        cluster: cluster.clone(),
                        namespace: NamespaceScope::parse(&namespace),
                    },
                )
                .await
                .with_context(|| format!("scanning cluster {cluster}"))?;

            let service_name = format!("cluster {cluster}");
            let service = ServiceBasic::new(
                service_name.clone(),
                Arc::new(SystemAll::new(service_name.clone(), systems)),
            );
            print!("{}", visualiser.visualise(&service));
        }
        Command::Grafana { base_url, name } => {
            let base_url = base_url
                .or_else(|| config.grafana.as_ref().and_then(|g| g.base_url.clone()))
                .context("no Grafana base URL: pass --base-url or set grafana.base_url in the config file")?;
            let api = Arc::new(GrafanaApi::new(base_url));
            let registry = grafana::registry(api);

            let systems = registry
                .instrument(
                    &grafana::kind("grafana"),
                    &Target::GrafanaRoot { name: name.clone() },
                )
                .await
                .with_context(|| format!("scanning grafana {name}"))?;

            let service =
                ServiceBasic::new(name.clone(), Arc::new(SystemAll::new(name, systems)));
            print!("{}", visualiser.visualise(&service));
        }
    }

    Ok(())
}

fn show(args: &Args, config: &Config) -> Show {
    if let Some(arg) = args.show {
        return arg.into();
    }
    match config.show.as_deref() {
        Some("only-failing" | "only_failing") => Show::OnlyFailing,
        _ => Show::All,
    }
}

fn symbols(config: &Config) -> Symbols {
    let mut symbols = Symbols::emoji();
    if let Some(overrides) = &config.symbols {
        if let Some(passing) = &overrides.passing {
            symbols.passing.clone_from(passing);
        }
        if let Some(failing) = &overrides.failing {
            symbols.failing.clone_from(failing);
        }
        if let Some(unknown) = &overrides.unknown {
            symbols.unknown.clone_from(unknown);
        }
    }
    symbols
}
