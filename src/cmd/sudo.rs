use std::collections::HashSet;

use anyhow::bail;
use coloriz_logger::info;
use twilight_model::guild::{Permissions, Role};
use twilight_model::id::marker::{GuildMarker, RoleMarker, UserMarker};
use twilight_model::id::Id;

use crate::bot::client::ApiRef;
use crate::bot::interaction::CommandCtx;
use crate::cmd::{CommandOptionResolver, OnCommand};
use crate::util::ext::RoleExt;
use crate::util::Result;

/// The number of members fetched per request.
pub const MEMBER_PAGE: u16 = 1000;

crate::register_command! {
    ChatInput("sudo") {
        let in_dms = false;
        let require = MANAGE_ROLES;
        let options = [
            SubCommand("cleanup") {},
        ];
        let handlers = {
            command = self::execute_command;
        };
    }
}

async fn execute_command<'api: 'evt, 'evt>(
    cmd: &(dyn OnCommand + Send + Sync),
    mut ctx: CommandCtx<'api, 'evt>,
) -> Result {
    let resolver = CommandOptionResolver::new(ctx.data);

    if resolver.get_subcommand("cleanup").is_ok() {
        let Some(guild_id) = ctx.event.guild_id else {
            bail!("command must be used within a guild");
        };

        let permissions = ctx.event.member.as_ref().and_then(|m| m.permissions);

        if !permissions.is_some_and(|p| p.contains(Permissions::MANAGE_ROLES)) {
            return ctx.failure(&format!("{}.forbidden", cmd.entry().name), None).await;
        }

        ctx.defer(true).await?;

        let removed = self::cleanup(ctx.api, guild_id).await?;

        info!("removed {removed} unused color roles from guild {guild_id}")?;

        return ctx.success(&format!("{}.cleanup", cmd.entry().name), Some(&[("count", removed.to_string())])).await;
    }

    bail!("unknown or missing subcommand");
}

/// Deletes every color role in the guild that no member holds, returning how many were deleted.
///
/// # Errors
///
/// This function will return an error if the guild's members or roles could not be fetched, or if
/// a role could not be deleted.
async fn cleanup(api: ApiRef<'_>, guild_id: Id<GuildMarker>) -> Result<usize> {
    let held = self::held_roles(api, guild_id).await?;
    let roles = api.http.roles(guild_id).await?.model().await?;
    let mut removed = 0;

    for role in self::unheld(&roles, &held) {
        api.http.delete_role(guild_id, role.id).await?;

        removed += 1;
    }

    Ok(removed)
}

/// Returns every role held by at least one guild member.
///
/// # Errors
///
/// This function will return an error if the guild's members could not be fetched.
async fn held_roles(api: ApiRef<'_>, guild_id: Id<GuildMarker>) -> Result<HashSet<Id<RoleMarker>>> {
    let mut held = HashSet::new();
    let mut after: Option<Id<UserMarker>> = None;

    loop {
        let mut request = api.http.guild_members(guild_id).limit(MEMBER_PAGE)?;

        if let Some(user_id) = after {
            request = request.after(user_id);
        }

        let members = request.await?.models().await?;

        held.extend(members.iter().flat_map(|m| m.roles.iter().copied()));
        after = members.last().map(|m| m.user.id);

        if members.len() < usize::from(MEMBER_PAGE) {
            break Ok(held);
        }
    }
}

/// Returns the color roles that are not in the given set.
fn unheld<'r>(roles: &'r [Role], held: &'r HashSet<Id<RoleMarker>>) -> impl Iterator<Item = &'r Role> {
    roles.iter().filter(|r| r.is_color_role() && !held.contains(&r.id))
}
