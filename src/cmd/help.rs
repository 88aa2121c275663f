use coloriz_localizer::{fill, localize, Locale};
use twilight_model::application::command::Command;
use twilight_util::builder::embed::{EmbedBuilder, EmbedFooterBuilder};

use crate::bot::interaction::CommandCtx;
use crate::cmd::OnCommand;
use crate::util::{Result, BRANDING, COLOR_LIST_URL};

crate::register_command! {
    ChatInput("help") {
        let in_dms = true;
        let handlers = {
            command = self::execute_command;
        };
    }
}

async fn execute_command<'api: 'evt, 'evt>(
    cmd: &(dyn OnCommand + Send + Sync),
    mut ctx: CommandCtx<'api, 'evt>,
) -> Result {
    ctx.defer(true).await?;

    let name = cmd.entry().name;
    let locale = ctx.locale();
    let mut sections = vec![localize!(try in locale, "text.{name}.header").into_string()];

    if let Some(guild_id) = ctx.event.guild_id {
        let commands = ctx.client().guild_commands(guild_id).await?.model().await?;

        if !commands.is_empty() {
            sections.push(self::section(name, locale, "server_header", &self::list(name, locale, &commands)));
        }
    }

    let commands = ctx.client().global_commands().await?.model().await?;
    let list = if commands.is_empty() {
        format!("> *{}*", localize!(try in locale, "text.{name}.missing_commands"))
    } else {
        self::list(name, locale, &commands)
    };

    sections.push(self::section(name, locale, "global_header", &list));
    sections.push(self::section(name, locale, "input_header", &self::input_help(name, locale)));

    let footer = EmbedFooterBuilder::new(localize!(try in locale, "text.{name}.footer"));
    let embed = EmbedBuilder::new()
        .color(BRANDING)
        .title(localize!(try in locale, "text.{name}.title"))
        .description(sections.join("\n\n"))
        .footer(footer);

    ctx.embed(embed.build()).await
}

/// Formats a titled block of the help message.
fn section(name: &str, locale: Locale, header: &str, body: &str) -> String {
    format!("**__{}__**\n{body}", localize!(try in locale, "text.{name}.{header}"))
}

/// Describes the accepted color inputs, linking to the list of named colors.
fn input_help(name: &str, locale: Locale) -> String {
    let lines = ["hex", "triplet", "named"].map(|kind| {
        let text = localize!(try in locale, "text.{name}.input_{kind}");

        format!("- {}", fill(&text, &[("url", COLOR_LIST_URL)]))
    });

    lines.join("\n")
}

fn list(name: &str, locale: Locale, commands: &[Command]) -> String {
    commands.iter().map(|c| self::describe(name, locale, c)).collect::<Vec<_>>().join("\n")
}

/// Describes a command on one line, with a second line noting how it may be used.
fn describe(name: &str, locale: Locale, command: &Command) -> String {
    let key = &command.name;
    let description = localize!(try in locale, "command.{key}.description");
    let line = match command.id {
        Some(id) => format!("- </{key}:{id}> - {description}"),
        None => format!("- `/{}` - {description}", localize!(try in locale, "command.{key}.name")),
    };

    let notes = [
        ("has_subcommands", command.options.iter().any(|o| o.options.is_some())),
        ("allows_dms", command.dm_permission.unwrap_or(true)),
        ("needs_permissions", command.default_member_permissions.is_some_and(|p| !p.is_empty())),
    ];
    let notes = notes
        .into_iter()
        .filter(|(_, applies)| *applies)
        .map(|(note, _)| localize!(try in locale, "text.{name}.{note}").into_string())
        .collect::<Vec<_>>();

    if notes.is_empty() { line } else { format!("{line}\n> *{}*", notes.join(", ")) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::registry;

    #[test]
    fn lists_every_input_kind() {
        let help = input_help("help", Locale::EnglishUS);

        assert_eq!(help, "- text.help.input_hex\n- text.help.input_triplet\n- text.help.input_named");
    }

    #[test]
    fn notes_restricted_commands() {
        let Some(sudo) = registry().get("sudo").and_then(|e| e.build(None).ok()) else {
            panic!("missing sudo command");
        };
        let line = describe("help", Locale::EnglishUS, &sudo);

        assert!(line.starts_with("- `/command.sudo.name` - command.sudo.description"));
        assert!(line.contains("text.help.needs_permissions"));
        assert!(!line.contains("text.help.allows_dms"));
    }

    #[test]
    fn formats_sections() {
        assert_eq!(section("help", Locale::EnglishUS, "input_header", "body"), "**__text.help.input_header__**\nbody");
    }
}
