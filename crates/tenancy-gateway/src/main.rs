//! OpenTenancy gateway server

use tracing_subscriber::EnvFilter;

use tenancy_gateway::GatewayConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::var("TENANCY_GATEWAY_CONFIG") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str::<GatewayConfig>(&raw)?
        }
        Err(_) => GatewayConfig::default(),
    };

    tenancy_gateway::serve(config).await?;
    Ok(())
}
