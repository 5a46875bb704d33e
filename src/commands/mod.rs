pub mod nouncil;

use serenity::model::id::GuildId;
use serenity::prelude::*;

pub async fn register_commands(ctx: &Context, guild_id: GuildId) -> Result<(), serenity::Error> {
    // Guild commands show up immediately, unlike global ones
    guild_id
        .set_application_commands(&ctx.http, |commands| {
            commands.create_application_command(|command| nouncil::create_nouncil_command(command))
        })
        .await?;

    Ok(())
}
