mod commands;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod nouns_api;
mod report;
mod store;
mod voting;

use config::Config;
use db::{Database, NameHistory};
use handlers::AppState;
use log::{error, info};
use nouns_api::NounsApi;
use report::ReportAssembler;
use serenity::async_trait;
use serenity::model::application::interaction::Interaction;
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::prelude::*;
use std::sync::Arc;

struct Bot {
    state: Arc<AppState>,
    guild_id: String,
}

#[async_trait]
impl EventHandler for Bot {
    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let state = Arc::clone(&self.state);

        // Reports await the proposal indexer, so keep them off the gateway task
        tokio::spawn(async move {
            handlers::handle_interaction(&state, &ctx, interaction).await;
        });
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);

        let guild_id = match self.guild_id.parse::<u64>() {
            Ok(id) => GuildId(id),
            Err(_) => {
                error!("NOUNCIL_GUILD_ID {:?} is not a Discord guild id", self.guild_id);
                return;
            }
        };

        match commands::register_commands(&ctx, guild_id).await {
            Ok(()) => info!("Registered slash commands for guild {}.", guild_id),
            Err(why) => error!("Failed to register slash commands: {:?}", why),
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    // Initialize logging
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };

    let database = match Database::new(&config.database_url).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return;
        }
    };

    let proposals = match NounsApi::new(
        &config.nouns_api_url,
        config.nouns_api_timeout,
        config.nouns_api_retries,
    ) {
        Ok(api) => api,
        Err(e) => {
            error!("Failed to build proposal indexer client: {}", e);
            return;
        }
    };

    let assembler = ReportAssembler::new(
        database.clone(),
        database.clone(),
        database.clone(),
        Arc::new(NameHistory::new(database, config.guild_id.clone())),
        Arc::new(proposals),
    );
    let state = Arc::new(AppState {
        assembler,
        channel_id: config.channel_id.clone(),
    });

    let intents = GatewayIntents::GUILDS;
    let mut client = match Client::builder(&config.discord_token, intents)
        .event_handler(Bot {
            state,
            guild_id: config.guild_id.clone(),
        })
        .await
    {
        Ok(client) => client,
        Err(e) => {
            error!("Error creating client: {:?}", e);
            return;
        }
    };

    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }
}
