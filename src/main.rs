use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use log::{error, info};

use ticketbot::channels::{ChatPlatform, DiscordProvider};
use ticketbot::config::AppConfig;
use ticketbot::discord::commands;
use ticketbot::main_module::run_axum_server;
use ticketbot::shared::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    info!("Starting ticketbot {}", env!("CARGO_PKG_VERSION"));

    let platform: Arc<dyn ChatPlatform> = Arc::new(
        DiscordProvider::new(&config.discord).context("Failed to build the Discord client")?,
    );

    if config.discord.register_commands {
        let scope = config.discord.guild_id.as_deref();
        match platform
            .register_commands(scope, &commands::definitions())
            .await
        {
            Ok(()) => info!(
                "Registered slash commands ({})",
                scope.map_or_else(|| "global".to_string(), |g| format!("guild {g}"))
            ),
            Err(e) => error!("Failed to register slash commands: {}", e),
        }
    }

    let state = AppState::new(config, platform).context("Invalid DISCORD_PUBLIC_KEY")?;
    run_axum_server(Arc::new(state))
        .await
        .context("HTTP server failed")?;

    info!("ticketbot stopped");
    Ok(())
}
