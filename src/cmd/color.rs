use std::time::Instant;

use anyhow::bail;
use coloriz_logger::{debug, warn};
use time::OffsetDateTime;
use twilight_model::application::command::{CommandOptionChoice, CommandOptionChoiceValue};
use twilight_model::guild::Role;
use twilight_model::id::marker::{GuildMarker, RoleMarker, UserMarker};
use twilight_model::id::Id;

use crate::bot::client::ApiRef;
use crate::bot::interaction::CommandCtx;
use crate::cmd::{CommandOptionResolver, Focus, OnCommand, OnComplete};
use crate::color::history::History;
use crate::color::{classify, names, ColorEntry, ColorError, Rgb};
use crate::util::ext::RoleExt;
use crate::util::Result;

/// The most auto-completion choices Discord will display.
pub const CHOICE_LIMIT: usize = 25;
/// The longest choice name Discord accepts.
pub const CHOICE_LENGTH: usize = 100;
/// The most search results listed in a single response.
pub const SEARCH_LIMIT: usize = 50;

crate::register_command! {
    ChatInput("color") {
        let in_dms = false;
        let options = [
            SubCommand("show") {
                let options = [
                    User("user") {},
                ];
            },
            SubCommand("set") {
                let options = [
                    String("input") {
                        let required = true;
                        let autocomplete = true;
                        let maximum = 100;
                    },
                ];
            },
            SubCommand("random") {},
            SubCommand("clear") {},
            SubCommand("search") {
                let options = [
                    String("query") {
                        let required = true;
                        let maximum = 100;
                    },
                ];
            },
        ];
        let handlers = {
            command = self::execute_command;
            complete = self::execute_complete;
        };
    }
}

async fn execute_command<'api: 'evt, 'evt>(
    cmd: &(dyn OnCommand + Send + Sync),
    mut ctx: CommandCtx<'api, 'evt>,
) -> Result {
    let resolver = CommandOptionResolver::new(ctx.data);

    if let Ok(resolver) = resolver.get_subcommand("show") {
        let user_id = resolver.get_user_id("user")?;

        ctx.defer(false).await?;

        return self::show(cmd, ctx, user_id).await;
    }
    if let Ok(resolver) = resolver.get_subcommand("set") {
        let input = resolver.get_str("input")?;
        let Some(table) = names::table() else {
            bail!("the color name table has not been loaded");
        };
        let tokens = input.split_whitespace().collect::<Vec<_>>();

        let color = match classify(table, &tokens) {
            Ok(color) => color,
            Err(error) => return self::reject(ctx, &error).await,
        };

        ctx.defer(false).await?;

        return self::apply(cmd, ctx, Some(color)).await;
    }
    if resolver.get_subcommand("random").is_ok() {
        ctx.defer(false).await?;

        return self::apply(cmd, ctx, Some(Rgb::random())).await;
    }
    if resolver.get_subcommand("clear").is_ok() {
        ctx.defer(false).await?;

        return self::apply(cmd, ctx, None).await;
    }
    if let Ok(resolver) = resolver.get_subcommand("search") {
        let query = resolver.get_str("query")?;

        return self::search(cmd, ctx, query).await;
    }

    bail!("unknown or missing subcommand");
}

async fn execute_complete<'api: 'evt, 'evt>(
    _: &(dyn OnComplete + Send + Sync),
    _: CommandCtx<'api, 'evt>,
    (name, text, _): Focus<'evt>,
) -> Result<Vec<CommandOptionChoice>> {
    if name != "input" {
        bail!("unexpected focused option '{name}'");
    }

    let Some(table) = names::table() else {
        return Ok(vec![]);
    };

    Ok(self::choices(table.search(text)))
}

/// Builds auto-completion choices from the given named colors.
fn choices<'t>(entries: impl Iterator<Item = &'t ColorEntry>) -> Vec<CommandOptionChoice> {
    let choices = entries.filter_map(|entry| {
        let name = format!("{} ({})", entry.display, entry.hex);

        (name.chars().count() <= CHOICE_LENGTH).then(|| CommandOptionChoice {
            name,
            name_localizations: None,
            value: CommandOptionChoiceValue::String(entry.display.to_string()),
        })
    });

    choices.take(CHOICE_LIMIT).collect()
}

/// Tells the user why their input could not be understood.
async fn reject(ctx: CommandCtx<'_, '_>, error: &ColorError) -> Result {
    ctx.failure(error.key(), Some(&[("input", error.input().to_string())])).await
}

/// Shows the given user's current color, defaulting to the executing user.
async fn show<'api: 'evt, 'evt>(
    cmd: &(dyn OnCommand + Send + Sync),
    ctx: CommandCtx<'api, 'evt>,
    user_id: Option<Id<UserMarker>>,
) -> Result {
    let Some(guild_id) = ctx.event.guild_id else {
        bail!("command must be used within a guild");
    };
    let Some(user_id) = user_id.or_else(|| ctx.event.author_id()) else {
        bail!("command must be used by a user");
    };

    let held = self::member_roles(ctx.api, guild_id, user_id).await?;
    let roles = ctx.api.http.roles(guild_id).await?.model().await?;
    let current = roles.into_iter().find(|r| r.is_color_role() && held.contains(&r.id));
    let user = format!("<@{user_id}>");

    if let Some(role) = current {
        ctx.notify(&format!("{}.show", cmd.entry().name), Some(&[("user", user), ("color", role.name)])).await
    } else {
        ctx.notify(&format!("{}.show_none", cmd.entry().name), Some(&[("user", user)])).await
    }
}

/// Gives the executing member the given color, or clears their color if `None`, and records the
/// change in their history.
async fn apply<'api: 'evt, 'evt>(
    cmd: &(dyn OnCommand + Send + Sync),
    ctx: CommandCtx<'api, 'evt>,
    color: Option<Rgb>,
) -> Result {
    let Some(guild_id) = ctx.event.guild_id else {
        bail!("command must be used within a guild");
    };
    let Some(user_id) = ctx.event.author_id() else {
        bail!("command must be used by a user");
    };

    let hex = color.map(Rgb::hex);
    let changed = self::assign(ctx.api, guild_id, user_id, hex.as_deref()).await?;
    let now = OffsetDateTime::now_utc();

    let recorded = hex.clone();

    History::update((guild_id, user_id), move |history| history.record(recorded.as_deref(), now)).await?;

    match hex {
        Some(hex) => ctx.success(&format!("{}.set", cmd.entry().name), Some(&[("color", hex)])).await,
        None if changed => ctx.success(&format!("{}.clear", cmd.entry().name), None).await,
        None => ctx.notify(&format!("{}.clear_none", cmd.entry().name), None).await,
    }
}

/// Returns the roles held by a guild member, preferring the cache.
async fn member_roles(
    api: ApiRef<'_>,
    guild_id: Id<GuildMarker>,
    user_id: Id<UserMarker>,
) -> Result<Vec<Id<RoleMarker>>> {
    let cached = api.cache.member(guild_id, user_id).map(|member| member.roles().to_vec());

    if let Some(roles) = cached {
        return Ok(roles);
    }

    Ok(api.http.guild_member(guild_id, user_id).await?.model().await?.roles)
}

/// Replaces the member's color roles with the role named `hex`, creating it if the guild does not
/// have one yet. Passing `None` only removes their color roles.
///
/// Returns whether the member's roles changed.
///
/// # Errors
///
/// This function will return an error if the guild's roles could not be fetched or modified.
async fn assign(
    api: ApiRef<'_>,
    guild_id: Id<GuildMarker>,
    user_id: Id<UserMarker>,
    hex: Option<&str>,
) -> Result<bool> {
    let roles = api.http.roles(guild_id).await?.model().await?;
    let held = self::member_roles(api, guild_id, user_id).await?;

    let target = match hex {
        None => None,
        Some(hex) => match roles.iter().find(|r| r.name == hex) {
            Some(role) => Some(role.id),
            None => {
                let Ok(color) = crate::color::parse_hex(hex) else {
                    bail!("invalid color role name '{hex}'");
                };
                let role = api.http.create_role(guild_id).color(color.into()).name(hex).await?.model().await?;

                debug!("created color role {hex} ({}) in guild {guild_id}", role.id)?;

                if let Err(error) = self::raise(api, guild_id, &roles, role.id).await {
                    warn!("unable to position color role {hex} in guild {guild_id}: {error}")?;
                }

                Some(role.id)
            }
        },
    };

    let is_color = |id: &Id<RoleMarker>| roles.iter().any(|r| r.id == *id && r.is_color_role());
    let mut update = held.iter().copied().filter(|id| !is_color(id)).collect::<Vec<_>>();

    update.extend(target);

    if update.len() == held.len() && update.iter().all(|id| held.contains(id)) {
        return Ok(false);
    }

    api.http.update_guild_member(guild_id, user_id).roles(&update).await?;

    Ok(true)
}

/// Moves a new color role just below the bot's highest role, above the colors of other roles.
async fn raise(api: ApiRef<'_>, guild_id: Id<GuildMarker>, roles: &[Role], role_id: Id<RoleMarker>) -> Result {
    let bot_id = match api.cache.current_user() {
        Some(user) => user.id,
        None => api.http.current_user().await?.model().await?.id,
    };
    let held = self::member_roles(api, guild_id, bot_id).await?;
    let positions = roles.iter().filter(|role| held.contains(&role.id)).map(|role| role.position);

    let Some(position) = self::color_position(positions) else {
        bail!("the bot has no role to place colors below");
    };

    api.http.update_role_positions(guild_id, &[(role_id, position)]).await?;

    Ok(())
}

/// Returns the position just below the highest of the bot's role positions.
///
/// Returns `None` if that would be the position of the `@everyone` role or lower.
fn color_position(positions: impl IntoIterator<Item = i64>) -> Option<u64> {
    let top = positions.into_iter().max()?;

    u64::try_from(top - 1).ok().filter(|&position| position > 0)
}

/// Lists the named colors containing the query.
async fn search<'api: 'evt, 'evt>(
    cmd: &(dyn OnCommand + Send + Sync),
    ctx: CommandCtx<'api, 'evt>,
    query: &'evt str,
) -> Result {
    let Some(table) = names::table() else {
        bail!("the color name table has not been loaded");
    };

    let key = format!("{}.search_none", cmd.entry().name);

    if names::normalize(query).is_empty() {
        return ctx.failure(&key, Some(&[("input", query.to_string())])).await;
    }

    let started = Instant::now();
    let (total, shown) = self::collect(table.search(query));
    let elapsed = started.elapsed();

    if total == 0 {
        return ctx.failure(&key, Some(&[("input", query.to_string())])).await;
    }

    let list = shown.iter().map(|e| format!("`{}` {}", e.hex, e.display)).collect::<Vec<_>>();
    let values = [
        ("input", query.to_string()),
        ("total", total.to_string()),
        ("shown", shown.len().to_string()),
        ("elapsed", format!("{elapsed:.2?}")),
        ("results", list.join("\n")),
    ];

    ctx.success(&format!("{}.search", cmd.entry().name), Some(&values)).await
}

/// Counts every matching entry while keeping at most [`SEARCH_LIMIT`] of them.
fn collect<'t>(entries: impl Iterator<Item = &'t ColorEntry>) -> (usize, Vec<&'t ColorEntry>) {
    entries.fold((0, Vec::with_capacity(SEARCH_LIMIT)), |(total, mut shown), entry| {
        if shown.len() < SEARCH_LIMIT {
            shown.push(entry);
        }

        (total + 1, shown)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::NameTable;

    fn blues(count: usize) -> NameTable {
        NameTable::new((0 .. count).map(|n| (format!("Blue {n:03}"), format!("#0000{:02X}", n % 256))))
    }

    #[test]
    fn caps_autocompletion() {
        let table = blues(40);
        let choices = choices(table.search("blue"));

        assert_eq!(choices.len(), CHOICE_LIMIT);
        assert_eq!(choices[0].name, "Blue 000 (#000000)");
        assert_eq!(choices[0].value, CommandOptionChoiceValue::String("Blue 000".to_string()));
    }

    #[test]
    fn skips_overlong_choices() {
        let long = "x".repeat(CHOICE_LENGTH);
        let table = NameTable::new([(long.as_str(), "#000000"), ("Sky Blue", "#87CEEB")]);
        let choices = choices(table.entries().iter());

        assert_eq!(choices.len(), 1);
        assert_eq!(choices[0].name, "Sky Blue (#87CEEB)");
    }

    #[test]
    fn counts_past_the_search_limit() {
        let table = blues(120);
        let (total, shown) = collect(table.search("BLUE"));

        assert_eq!(total, 120);
        assert_eq!(shown.len(), SEARCH_LIMIT);
        assert_eq!(&*shown[0].display, "Blue 000");

        let (total, shown) = collect(table.search("blue 11"));

        assert_eq!(total, 10);
        assert_eq!(shown.len(), 10);
    }

    #[test]
    fn places_colors_below_the_top_role() {
        assert_eq!(color_position([3, 7, 5]), Some(6));
        assert_eq!(color_position([2]), Some(1));
    }

    #[test]
    fn refuses_positions_at_the_bottom() {
        assert_eq!(color_position([1]), None);
        assert_eq!(color_position([0]), None);
        assert_eq!(color_position(std::iter::empty()), None);
    }
}
