use coloriz_localizer::{localize, Locale};
use twilight_http::client::InteractionClient;
use twilight_model::application::command::CommandOptionChoice;
use twilight_model::application::interaction::application_command::CommandData;
use twilight_model::application::interaction::Interaction;
use twilight_model::channel::message::{Embed, MessageFlags};
use twilight_model::http::interaction::{InteractionResponse, InteractionResponseData, InteractionResponseType};
use twilight_util::builder::embed::EmbedBuilder;
use twilight_util::builder::InteractionResponseDataBuilder;

use crate::bot::client::ApiRef;
use crate::util::ext::InteractionExt;
use crate::util::{Result, BRANDING, FAILURE, SUCCESS};

/// Sends the initial response to an interaction.
///
/// # Errors
///
/// This function will return an error if the interaction was already responded to.
pub async fn respond(
    client: &InteractionClient<'_>,
    event: &Interaction,
    kind: InteractionResponseType,
    data: Option<InteractionResponseData>,
) -> Result {
    client.create_response(event.id, &event.token, &InteractionResponse { kind, data }).await?;

    Ok(())
}

/// Sends a follow-up message to a deferred interaction.
///
/// # Errors
///
/// This function will return an error if the embeds are invalid or the message could not be sent.
pub async fn followup(
    client: &InteractionClient<'_>,
    event: &Interaction,
    embeds: &[Embed],
    flags: MessageFlags,
) -> Result {
    client.create_followup(&event.token).embeds(embeds)?.flags(flags).await?;

    Ok(())
}

/// The flags of an ephemeral or public message.
const fn visibility(ephemeral: bool) -> MessageFlags {
    if ephemeral { MessageFlags::EPHEMERAL } else { MessageFlags::empty() }
}

/// A command or auto-completion interaction event context.
#[derive(Clone, Copy, Debug)]
pub struct CommandCtx<'api: 'evt, 'evt> {
    /// The HTTP and cache APIs.
    pub api: ApiRef<'api>,
    /// The interaction event.
    pub event: &'evt Interaction,
    /// The interaction's command data.
    pub data: &'evt CommandData,
    /// The flags the interaction was deferred with, if it was deferred.
    deferred: Option<MessageFlags>,
}

impl<'api: 'evt, 'evt> CommandCtx<'api, 'evt> {
    /// Creates a new [`CommandCtx`].
    pub const fn new(api: ApiRef<'api>, event: &'evt Interaction, data: &'evt CommandData) -> Self {
        Self { api, event, data, deferred: None }
    }

    /// Returns the interaction client of this context.
    pub fn client(&self) -> InteractionClient<'api> {
        self.api.http.interaction(self.event.application_id)
    }

    /// Returns the locale of the user that started the interaction.
    pub fn locale(&self) -> Locale {
        self.event.preferred_locale()
    }

    /// Acknowledges the interaction so that it may be answered later. Repeated calls do nothing.
    ///
    /// # Errors
    ///
    /// This function will return an error if responding failed.
    pub async fn defer(&mut self, ephemeral: bool) -> Result {
        if self.deferred.is_some() {
            return Ok(());
        }

        let flags = self::visibility(ephemeral);
        let data = InteractionResponseDataBuilder::new().flags(flags).build();

        self::respond(&self.client(), self.event, InteractionResponseType::DeferredChannelMessageWithSource, Some(data))
            .await?;

        self.deferred = Some(flags);

        Ok(())
    }

    /// Sends the given embed.
    ///
    /// Deferred interactions are followed up with the visibility they were deferred with. Others
    /// are answered ephemerally.
    ///
    /// # Errors
    ///
    /// This function will return an error if the interaction could not be responded to.
    pub async fn embed(&self, embed: Embed) -> Result {
        if let Some(flags) = self.deferred {
            return self::followup(&self.client(), self.event, &[embed], flags).await;
        }

        let data = InteractionResponseDataBuilder::new().embeds([embed]).flags(self::visibility(true)).build();

        self::respond(&self.client(), self.event, InteractionResponseType::ChannelMessageWithSource, Some(data)).await
    }

    /// Answers an auto-completion interaction with the given choices.
    ///
    /// # Errors
    ///
    /// This function will return an error if the interaction could not be responded to.
    pub async fn suggest(&self, choices: Vec<CommandOptionChoice>) -> Result {
        let data = InteractionResponseDataBuilder::new().choices(choices).build();

        self::respond(&self.client(), self.event, InteractionResponseType::ApplicationCommandAutocompleteResult, Some(data))
            .await
    }

    /// Responds with a localized `{group}.{key}` title and, if `values` is given, a description
    /// with those placeholders filled.
    async fn reply(&self, group: &str, key: &str, color: u32, values: Option<&[(&str, String)]>) -> Result {
        let locale = self.locale();
        let mut embed = EmbedBuilder::new().color(color).title(localize!(try in locale, "{group}.{key}.title"));

        if let Some(values) = values {
            let description = localize!(try in locale, "{group}.{key}.description");

            embed = embed.description(coloriz_localizer::fill(&description, values));
        }

        self.embed(embed.build()).await
    }

    /// Responds to the interaction with a success message.
    ///
    /// # Errors
    ///
    /// This function will return an error if the interaction could not be responded to.
    pub async fn success(&self, key: &str, values: Option<&[(&str, String)]>) -> Result {
        self.reply("success", key, SUCCESS, values).await
    }

    /// Responds to the interaction with a notification message.
    ///
    /// # Errors
    ///
    /// This function will return an error if the interaction could not be responded to.
    pub async fn notify(&self, key: &str, values: Option<&[(&str, String)]>) -> Result {
        self.reply("notify", key, BRANDING, values).await
    }

    /// Responds to the interaction with a failure message.
    ///
    /// # Errors
    ///
    /// This function will return an error if the interaction could not be responded to.
    pub async fn failure(&self, key: &str, values: Option<&[(&str, String)]>) -> Result {
        self.reply("failure", key, FAILURE, values).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_ephemeral_messages_are_flagged() {
        assert_eq!(visibility(true), MessageFlags::EPHEMERAL);
        assert!(visibility(false).is_empty());
    }
}
