use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use super::{Cli, CliError, Commands, DumpCommand, GlobalArgs, MetricsCommand};
use crate::client::{make_http_client, PromClient};
use crate::compress::{compress, Compression};
use crate::model::{marshal, Format, Layout};
use crate::query::{
    metrics_with_labels, product, MultiQueryConfig, ProductQueryConfig, RangeQuerier,
};

/// Everything a dump needs besides the client
#[derive(Debug, Clone)]
pub struct DumpConfig {
    pub query: ProductQueryConfig,
    pub layout: Layout,
    pub format: Format,
    pub compression: Compression,
}

impl DumpConfig {
    pub fn from_args(global: &GlobalArgs, command: DumpCommand, now: DateTime<Utc>) -> Self {
        Self {
            query: ProductQueryConfig {
                multi: MultiQueryConfig {
                    timerange: global.timerange(now),
                    queries: command.queries,
                },
                urls: command.urls,
            },
            layout: global.layout,
            format: global.format,
            compression: global.compress,
        }
    }
}

pub async fn run(cli: Cli, cancel: CancellationToken) -> Result<(), CliError> {
    match cli.command {
        Commands::Dump(command) => {
            let config = DumpConfig::from_args(&cli.global, command, Utc::now());
            let client = client(&cli.global)?;
            let output = dump(&client, &config, &cancel).await?;
            write_stdout(&output).await
        }
        Commands::Metrics(command) => {
            let client = client(&cli.global)?;
            let output = metrics(&client, &command, &cancel).await?;
            write_stdout(&output).await
        }
        Commands::Version => {
            write_stdout(format!("promdump {}\n", env!("CARGO_PKG_VERSION")).as_bytes()).await
        }
    }
}

fn client(global: &GlobalArgs) -> Result<PromClient, CliError> {
    let http_client = make_http_client(global.backend, global.client_cert.as_deref())?;
    Ok(PromClient::new(http_client))
}

/// Query every source, then marshal and compress the combined result
pub async fn dump<Q: RangeQuerier + ?Sized>(
    querier: &Q,
    config: &DumpConfig,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, CliError> {
    let range = &config.query.multi.timerange;
    tracing::info!(
        sources = config.query.urls.len(),
        queries = config.query.multi.queries.len(),
        start = %range.start,
        end = %range.end,
        step = ?range.step,
        layout = %config.layout,
        format = %config.format,
        "Dumping range queries"
    );

    let values = product(querier, &config.query, cancel).await?;
    let encoded = marshal(values, config.layout, config.format)?;
    Ok(compress(encoded, config.compression)?)
}

async fn metrics(
    client: &PromClient,
    command: &MetricsCommand,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, CliError> {
    let inventory = metrics_with_labels(client, &command.url, cancel).await?;
    Ok(serde_json::to_vec(&inventory)?)
}

async fn write_stdout(bytes: &[u8]) -> Result<(), CliError> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(bytes).await?;
    stdout.flush().await?;
    Ok(())
}
