use anyhow::bail;
use coloriz_localizer::{fill, localize, Locale};
use time::OffsetDateTime;
use twilight_util::builder::embed::EmbedBuilder;

use crate::bot::interaction::CommandCtx;
use crate::cmd::{CommandOptionResolver, OnCommand};
use crate::color::history::{humanize, Held, History};
use crate::color::parse_hex;
use crate::util::{Result, BRANDING};

crate::register_command! {
    ChatInput("stats") {
        let in_dms = false;
        let options = [
            User("user") {},
        ];
        let handlers = {
            command = self::execute_command;
        };
    }
}

async fn execute_command<'api: 'evt, 'evt>(
    cmd: &(dyn OnCommand + Send + Sync),
    ctx: CommandCtx<'api, 'evt>,
) -> Result {
    let Some(guild_id) = ctx.event.guild_id else {
        bail!("command must be used within a guild");
    };

    let resolver = CommandOptionResolver::new(ctx.data);
    let Some(user_id) = resolver.get_user_id("user")?.or_else(|| ctx.event.author_id()) else {
        bail!("command must be used by a user");
    };

    let history = History::load((guild_id, user_id)).await?;
    let user = format!("<@{user_id}>");

    if history.is_empty() {
        return ctx.notify(&format!("{}.empty", cmd.entry().name), Some(&[("user", user)])).await;
    }

    let now = OffsetDateTime::now_utc();
    let locale = ctx.locale();
    let title = localize!(try in locale, "text.{}.title", cmd.entry().name);
    let summary = self::summarize(&history, now);
    let lines = summary.into_iter().map(|(key, held)| self::describe(cmd.entry().name, locale, key, held));
    let lines = lines.collect::<Vec<_>>().join("\n");

    let color = history.current(now).and_then(|held| parse_hex(&held.record.color).ok());
    let embed = EmbedBuilder::new()
        .color(color.map_or(BRANDING, Into::into))
        .title(fill(&title, &[("user", &user)]))
        .description(format!("{user}\n\n{lines}"));

    ctx.embed(embed.build()).await
}

/// Returns the labelled statistics to display for a history.
///
/// A member without a current color is missing the `current` entry.
fn summarize(history: &History, now: OffsetDateTime) -> Vec<(&'static str, Held<'_>)> {
    let current = history.current(now).map(|held| ("current", held));
    let longest = history.longest(now).map(|held| ("longest", held));
    let shortest = history.shortest(now).map(|held| ("shortest", held));

    [current, longest, shortest].into_iter().flatten().collect()
}

/// Formats a single labelled statistic.
fn describe(name: &str, locale: Locale, key: &str, held: Held<'_>) -> String {
    let label = localize!(try in locale, "text.{name}.{key}");
    let duration = humanize(held.duration);
    let line = format!("**{label}:** `{}` ({duration})", held.record.color);

    if held.is_current() && key != "current" {
        let note = localize!(try in locale, "text.{name}.is_current");

        format!("{line}\n> *{note}*")
    } else {
        line
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn summarizes_live_and_past_colors() {
        let mut history = History::default();

        history.record(Some("#FF0000"), datetime!(2024-01-01 0:00 UTC));
        history.record(Some("#00FF00"), datetime!(2024-01-03 0:00 UTC));
        history.record(Some("#0000FF"), datetime!(2024-01-03 1:00 UTC));

        let summary = summarize(&history, datetime!(2024-01-10 0:00 UTC));
        let labels = summary.iter().map(|(label, _)| *label).collect::<Vec<_>>();

        assert_eq!(labels, ["current", "longest", "shortest"]);
        assert_eq!(&*summary[0].1.record.color, "#0000FF");
        assert_eq!(&*summary[1].1.record.color, "#0000FF");
        assert!(summary[1].1.is_current());
        assert_eq!(&*summary[2].1.record.color, "#00FF00");
    }

    #[test]
    fn omits_current_after_clearing() {
        let mut history = History::default();

        history.record(Some("#FF0000"), datetime!(2024-01-01 0:00 UTC));
        history.record(None, datetime!(2024-01-02 0:00 UTC));

        let summary = summarize(&history, datetime!(2024-02-01 0:00 UTC));

        assert_eq!(summary.len(), 2);
        assert!(summary.iter().all(|(label, held)| *label != "current" && !held.is_current()));
    }

    #[test]
    fn notes_current_extremes() {
        let mut history = History::default();

        history.record(Some("#FF0000"), datetime!(2024-01-01 0:00 UTC));

        let now = datetime!(2024-01-01 0:02 UTC);
        let Some(held) = history.longest(now) else { panic!("missing longest color") };
        let line = describe("stats", Locale::EnglishUS, "longest", held);

        assert!(line.starts_with("**text.stats.longest:** `#FF0000` (2 minutes)"));
        assert!(line.ends_with("> *text.stats.is_current*"));

        let line = describe("stats", Locale::EnglishUS, "current", held);

        assert_eq!(line, "**text.stats.current:** `#FF0000` (2 minutes)");
    }
}
