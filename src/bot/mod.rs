use std::sync::Arc;

use anyhow::bail;
use coloriz_localizer::localize;
use coloriz_logger::{error, info, warn};
use futures_util::{Stream, StreamExt};
use rand::{thread_rng, Rng};
use tokio::task::JoinSet;
use twilight_cache_inmemory::{InMemoryCache, ResourceType};
use twilight_gateway::stream::{create_recommended, ShardEventStream};
use twilight_gateway::{ConfigBuilder, Event, Intents, Shard};
use twilight_http::Client;
use twilight_model::application::interaction::application_command::{
    CommandData, CommandDataOption, CommandOptionValue,
};
use twilight_model::application::interaction::{Interaction, InteractionData, InteractionType};
use twilight_model::channel::message::embed::EmbedAuthor;
use twilight_model::channel::message::MessageFlags;
use twilight_model::gateway::payload::incoming::{InteractionCreate, Ready};
use twilight_model::gateway::payload::outgoing::update_presence::UpdatePresencePayload;
use twilight_model::gateway::presence::{ActivityType, MinimalActivity, Status};
use twilight_model::http::interaction::InteractionResponseType;
use twilight_util::builder::embed::EmbedBuilder;
use twilight_util::builder::InteractionResponseDataBuilder;

use crate::bot::client::{Api, ApiRef};
use crate::bot::interaction::CommandCtx;
use crate::cmd::{registry, CommandEntry, Focus};
use crate::util::ext::{EmbedAuthorExt, InteractionExt};
use crate::util::{Result, FAILURE};

/// Provides the bot's shared API handles.
pub mod client;
/// Provides interaction contexts and response helpers.
pub mod interaction;

/// How many localized error titles exist.
pub const ERROR_TITLES: usize = 4;
/// The bot's gateway intents.
///
/// Member events keep the cache's member role lists current.
pub const INTENTS: Intents = Intents::GUILDS.union(Intents::GUILD_MEMBERS);

/// The bot's gateway connection and shared APIs.
#[derive(Debug)]
pub struct BotClient {
    api: Api,
    shards: Box<[Shard]>,
}

impl BotClient {
    /// Connects to Discord using the `CLIENT_TOKEN` environment variable.
    ///
    /// # Errors
    ///
    /// This function will return an error if the token is missing or the gateway is unreachable.
    pub async fn new() -> Result<Self> {
        let token = crate::util::env::token()?.into_string();
        let http = Arc::new(Client::new(token.clone()));
        let resources = ResourceType::GUILD | ResourceType::MEMBER | ResourceType::ROLE | ResourceType::USER_CURRENT;
        let cache = InMemoryCache::builder().resource_types(resources).build();

        let config = ConfigBuilder::new(token, INTENTS).presence(self::presence()?).build();
        let shards = create_recommended(&http, config, |_, builder| builder.build()).await?.collect();

        Ok(Self { api: Api::new(http, Arc::new(cache)), shards })
    }

    /// Receives gateway events until a shard fails fatally, handling each in its own task.
    ///
    /// # Errors
    ///
    /// This function will return an error if a shard failed fatally.
    pub async fn start(mut self) -> Result {
        let mut tasks = JoinSet::new();
        let mut events = ShardEventStream::new(self.shards.iter_mut());

        let result = loop {
            let event = match self::next_event(&mut events, &mut tasks).await {
                None => break Ok(()),
                Some((_, Ok(event))) => event,
                Some((_, Err(error))) if error.is_fatal() => {
                    error!("a shard failed fatally: {error}")?;
                    break Err(error.into());
                }
                Some((_, Err(error))) => {
                    warn!("unable to receive an event: {error}")?;
                    continue;
                }
            };

            self.api.cache.update(&event);
            tasks.spawn(self::handle_event(self.api.clone(), event));
        };

        drop(events);

        // let running interactions finish before shutting down
        while tasks.join_next().await.is_some() {}

        result
    }
}

/// Waits for the stream's next item, reaping handler tasks that finish in the meantime.
async fn next_event<S: Stream + Unpin>(events: &mut S, tasks: &mut JoinSet<Result>) -> Option<S::Item> {
    loop {
        tokio::select! {
            item = events.next() => return item,
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(error) = joined {
                    warn!("an event task was aborted: {error}").ok();
                }
            }
        }
    }
}

/// Returns the bot's gateway presence, which shows whether it is a development build.
///
/// # Errors
///
/// This function will return an error if the presence is invalid.
fn presence() -> Result<UpdatePresencePayload> {
    let (status, name) = if cfg!(debug_assertions) {
        (Status::Idle, "for API events")
    } else {
        (Status::Online, "for /color!")
    };
    let activity = MinimalActivity { kind: ActivityType::Watching, name: name.to_string(), url: None };

    Ok(UpdatePresencePayload::new(vec![activity.into()], false, None, status)?)
}

/// Handles a gateway event, logging rather than returning failures.
///
/// # Errors
///
/// This function will return an error if the logger is closed.
async fn handle_event(api: Api, event: Event) -> Result {
    let api = api.view();
    let result = match event {
        Event::Ready(event) => self::handle_ready(api, *event).await,
        Event::InteractionCreate(event) => self::handle_interaction(api, *event).await,
        _ => Ok(()),
    };

    if let Err(error) = result {
        warn!("unable to handle an event: {error}")?;
    }

    Ok(())
}

/// Logs the connection and publishes the bot's commands.
///
/// Commands are patched into the testing guild when one is configured, and globally in release
/// builds.
///
/// # Errors
///
/// This function will return an error if the command lists could not be replaced.
async fn handle_ready(api: ApiRef<'_>, event: Ready) -> Result {
    info!("connected to discord as @{}", event.user.name)?;

    let client = api.http.interaction(event.application.id);

    if let Ok(guild_id) = crate::util::env::testing_guild_id() {
        let commands = registry().build_all(Some(guild_id));
        let patched = client.set_guild_commands(guild_id, &commands).await?.model().await?;

        info!("registered {} commands in guild {guild_id}", patched.len())?;
    }

    if cfg!(not(debug_assertions)) {
        let commands = registry().build_all(None);
        let patched = client.set_global_commands(&commands).await?.model().await?;

        info!("registered {} global commands", patched.len())?;
    }

    Ok(())
}

/// Handles an interaction event, reporting failures to the user and the developers.
///
/// # Errors
///
/// This function will return an error if the logger is closed.
async fn handle_interaction(api: ApiRef<'_>, event: InteractionCreate) -> Result {
    let label = event.label();

    info!("received interaction: {label}")?;

    let result = match event.kind {
        InteractionType::ApplicationCommandAutocomplete => self::handle_autocomplete(api, &event).await,
        InteractionType::ApplicationCommand => self::handle_command(api, &event).await,
        _ => Ok(()),
    };

    if let Err(error) = result {
        warn!("interaction failed: {label} - {error}")?;

        // autocompletion failures have nobody to show an error to
        if event.kind == InteractionType::ApplicationCommand {
            self::handle_error(api, &event, &error).await?;
        }
    } else {
        info!("interaction succeeded: {label}")?;
    }

    Ok(())
}

/// Returns the focused option's name, current text and type, searching through sub-commands.
fn focused(options: &[CommandDataOption]) -> Option<Focus<'_>> {
    options.iter().find_map(|option| match option.value {
        CommandOptionValue::Focused(ref value, kind) => Some((&(*option.name), &(**value), kind)),
        CommandOptionValue::SubCommand(ref options) | CommandOptionValue::SubCommandGroup(ref options) => {
            self::focused(options)
        }
        _ => None,
    })
}

/// Returns an application command interaction's data and registered command.
///
/// # Errors
///
/// This function will return an error if the event is not a command or the command is unknown.
fn resolve(event: &Interaction) -> Result<(&CommandData, &'static CommandEntry)> {
    let Some(InteractionData::ApplicationCommand(ref data)) = event.data else {
        bail!("missing command data");
    };
    let Some(entry) = registry().get(&data.name) else {
        bail!("unknown command '{}'", data.name);
    };

    Ok((data, entry))
}

/// Handles an autocomplete interaction event.
///
/// # Errors
///
/// This function will return an error if the event could not be handled.
async fn handle_autocomplete(api: ApiRef<'_>, event: &Interaction) -> Result {
    let (data, entry) = self::resolve(event)?;
    let Some(handler) = entry.complete() else {
        bail!("'{}' has no auto-completion handler", entry.name);
    };
    let Some(focus) = self::focused(&data.options) else {
        bail!("no option is focused");
    };

    let ctx = CommandCtx::new(api, event, data);
    let choices = handler.execute(ctx, focus).await?;

    ctx.suggest(choices).await
}

/// Handles a command interaction event.
///
/// # Errors
///
/// This function will return an error if the event could not be handled.
async fn handle_command(api: ApiRef<'_>, event: &Interaction) -> Result {
    let (data, entry) = self::resolve(event)?;
    let Some(handler) = entry.command() else {
        bail!("'{}' has no command handler", entry.name);
    };

    handler.execute(CommandCtx::new(api, event, data)).await
}

/// Called to notify an executing user and the bot developer(s) when an error occurs.
///
/// # Errors
///
/// This function will return an error if the logger could not print properly.
async fn handle_error(api: ApiRef<'_>, event: &Interaction, error: &anyhow::Error) -> Result {
    let title = thread_rng().gen_range(0 .. ERROR_TITLES);

    if let Err(error) = self::error_notify_user(api, event, error, title).await {
        error!("unable to notify executing user: {error}")?;
    }
    if let Err(error) = self::error_notify_devs(api, event, error, title).await {
        error!("unable to notify bot developers: {error}")?;
    }

    // write failures out immediately
    Ok(coloriz_logger::flush()?)
}

/// Notifies an executing user that an error has occurred.
///
/// # Errors
///
/// This function will return an error if the user could not be notified.
async fn error_notify_user(api: ApiRef<'_>, event: &Interaction, error: &anyhow::Error, index: usize) -> Result {
    let locale = event.preferred_locale();
    let title = localize!(try in locale, "text.error.title_{index}");
    let embed = EmbedBuilder::new().color(FAILURE).description(format!("> {error}")).title(title);

    let client = api.http.interaction(event.application_id);
    let flags = MessageFlags::EPHEMERAL;
    let defer = InteractionResponseDataBuilder::new().flags(flags).build();
    let kind = InteractionResponseType::DeferredChannelMessageWithSource;

    // fails if the command already responded or deferred
    interaction::respond(&client, event, kind, Some(defer)).await.ok();
    interaction::followup(&client, event, &[embed.build()], flags).await
}

/// Notifies the bot developer(s) that an error has occurred.
///
/// # Errors
///
/// This function will return an error if the developers could not be notified.
async fn error_notify_devs(api: ApiRef<'_>, event: &Interaction, error: &anyhow::Error, index: usize) -> Result {
    let title = localize!("text.error.title_{index}");
    let mut embed = EmbedBuilder::new()
        .color(FAILURE)
        .description(format!("**ID:** `{}`\n\n```\n{error:?}\n```", event.label()))
        .title(title);

    if let Some(user) = event.author() {
        embed = embed.author(EmbedAuthor::from_user(user));
    }

    api.http
        .create_message(crate::util::env::error_channel_id()?)
        .embeds(&[embed.build()])?
        .flags(MessageFlags::SUPPRESS_NOTIFICATIONS)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::stream;
    use twilight_model::application::command::CommandOptionType;

    use super::*;

    fn option(name: &str, value: CommandOptionValue) -> CommandDataOption {
        CommandDataOption { name: name.to_string(), value }
    }

    #[test]
    fn finds_nested_focus() {
        let options = vec![option(
            "set",
            CommandOptionValue::SubCommand(vec![option(
                "input",
                CommandOptionValue::Focused("sky bl".to_string(), CommandOptionType::String),
            )]),
        )];

        assert_eq!(focused(&options), Some(("input", "sky bl", CommandOptionType::String)));
    }

    #[test]
    fn missing_focus_is_none() {
        let options = vec![option("user", CommandOptionValue::String("someone".to_string()))];

        assert_eq!(focused(&options), None);
        assert_eq!(focused(&[]), None);
    }

    #[tokio::test]
    async fn reaps_finished_tasks_while_waiting() {
        let mut tasks = JoinSet::new();

        for _ in 0 .. 3 {
            tasks.spawn(async { Ok(()) });
        }

        let mut events = Box::pin(stream::once(async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            "ready"
        }));

        assert_eq!(next_event(&mut events, &mut tasks).await, Some("ready"));
        assert!(tasks.is_empty());
        assert_eq!(next_event(&mut events, &mut tasks).await, None);
    }

    #[tokio::test]
    async fn failed_interactions_are_reported_once() -> Result {
        let dir = tempfile::tempdir()?;
        let config = coloriz_logger::Config { print: false, write: false, ..Default::default() };
        let _thread = coloriz_logger::install(config, dir.path())?;

        let api = Api::new(Arc::new(Client::new(String::new())), Arc::new(InMemoryCache::new()));
        let event: Interaction = serde_json::from_value(serde_json::json!({
            "id": "2",
            "application_id": "1",
            "type": 4,
            "token": "token",
            "version": 1,
        }))?;

        // the failure is logged and swallowed here, so the event loop does not log it again
        assert!(handle_autocomplete(api.view(), &event).await.is_err());
        assert!(handle_interaction(api.view(), InteractionCreate(event)).await.is_ok());

        Ok(())
    }
}
