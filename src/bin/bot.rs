use anyhow::Result;
use log::{error, info};
use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::{Activity, Ready};
use serenity::prelude::*;
use std::sync::Arc;

use gremlin::command_handler::CommandHandler;
use gremlin::config::Config;
use gremlin::discord::DiscordPlatform;
use gremlin::platform::{ChatPlatform, IncomingMessage, Invoker, Origin};
use gremlin::state::BotState;

struct Handler {
    command_handler: CommandHandler,
}

fn incoming(msg: &Message) -> IncomingMessage {
    IncomingMessage {
        author: Invoker {
            user_id: msg.author.id.0,
            name: msg.author.name.clone(),
            is_bot: msg.author.bot,
        },
        content: msg.content.clone(),
        origin: Origin {
            channel_id: msg.channel_id.0,
            guild_id: msg.guild_id.map(|g| g.0),
            message_id: msg.id.0,
        },
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let platform: Arc<dyn ChatPlatform> = Arc::new(DiscordPlatform::new(ctx.http.clone()));
        if let Err(e) = self.command_handler.handle_message(platform, &incoming(&msg)).await {
            error!("Error handling message: {}", e);
            if let Err(why) = msg
                .channel_id
                .say(&ctx.http, "Sorry, I encountered an error processing your message.")
                .await
            {
                error!("Failed to send error message: {}", why);
            }
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🎉 {} is connected and ready!", ready.user.name);
        info!("📡 Connected to {} guilds", ready.guilds.len());
        info!("🤖 Bot ID: {}", ready.user.id);

        if let Some(shard) = ready.shard {
            info!("⚡ Shard: {}/{}", shard[0] + 1, shard[1]);
        }

        let prefix = &self.command_handler.state().prefix;
        ctx.set_activity(Activity::playing(format!("{}help · now with ✨silliness✨", prefix)))
            .await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting Gremlin Discord Bot...");

    let state = BotState::from_config(&config)?;
    info!(
        "Prefix `{}`, {} stashed picture(s), mute role `{}`",
        state.prefix,
        state.assets.len(),
        state.mute_role
    );

    let command_handler = CommandHandler::new(state);
    let maintenance = command_handler.spawn_maintenance();

    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MEMBERS;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(Handler {
            command_handler: command_handler.clone(),
        })
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {}", e);
            anyhow::anyhow!("Client creation failed: {}", e)
        })?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down...");
            shard_manager.lock().await.shutdown_all().await;
        }
    });

    info!("Establishing WebSocket connection to Discord gateway...");
    info!("Gateway intents: {:?}", intents);

    let outcome = client.start().await;

    command_handler.shutdown();
    maintenance.abort();

    if let Err(why) = outcome {
        error!("Gateway connection failed: {:?}", why);
        return Err(anyhow::anyhow!("Failed to establish gateway connection: {}", why));
    }

    Ok(())
}
