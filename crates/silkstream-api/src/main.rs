use silkstream_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (store, storage, services, routes)
    let (_state, router) = silkstream_api::setup::initialize_app(config.clone()).await?;

    // Start the server
    silkstream_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
