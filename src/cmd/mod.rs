use std::collections::BTreeMap;
use std::sync::OnceLock;

use anyhow::bail;
use coloriz_logger::warn;
use twilight_model::application::command::{Command, CommandOptionChoice, CommandOptionType};
use twilight_model::application::interaction::application_command::{
    CommandData, CommandDataOption, CommandOptionValue,
};
use twilight_model::id::marker::{GuildMarker, UserMarker};
use twilight_model::id::Id;

use crate::bot::interaction::CommandCtx;
use crate::util::Result;

/// The color command.
pub mod color;
/// The help command.
pub mod help;
/// The stats command.
pub mod stats;
/// The server management command.
pub mod sudo;

/// Every command the bot registers.
const ENTRIES: [fn() -> CommandEntry; 4] = [self::color::entry, self::help::entry, self::stats::entry, self::sudo::entry];

/// The bot's command registry.
static REGISTRY: OnceLock<CommandRegistry> = OnceLock::new();

/// Returns a reference to the bot's command registry.
pub fn registry() -> &'static CommandRegistry {
    REGISTRY.get_or_init(|| {
        let mut registry = CommandRegistry::default();

        for entry in ENTRIES.map(|f| f()) {
            if !registry.register(entry) {
                warn!("skipped duplicate command '{}'", entry.name).ok();
            }
        }

        registry
    })
}

/// A command builder function.
pub type BuildFn = fn(&CommandEntry, Option<Id<GuildMarker>>) -> Result<Command>;

/// A command handler constructor.
pub type CommandFn = fn(&CommandEntry) -> Box<dyn OnCommand + Send + Sync>;

/// An auto-completion handler constructor.
pub type CompleteFn = fn(&CommandEntry) -> Box<dyn OnComplete + Send + Sync>;

/// The bot's commands, keyed and ordered by name.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    entries: BTreeMap<&'static str, CommandEntry>,
}

impl CommandRegistry {
    /// Returns the command with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.entries.get(name)
    }

    /// Returns every command in name order.
    pub fn iter(&self) -> impl Iterator<Item = &CommandEntry> {
        self.entries.values()
    }

    /// Builds every command that builds successfully, logging the rest.
    #[must_use]
    pub fn build_all(&self, guild_id: Option<Id<GuildMarker>>) -> Box<[Command]> {
        let built = self.iter().filter_map(|entry| {
            let result = entry.build(guild_id);

            if let Err(ref error) = result {
                warn!("unable to build command '{}': {error}", entry.name).ok();
            }

            result.ok()
        });

        built.collect()
    }

    /// Adds a command, returning `false` if one with the same name already exists.
    pub fn register(&mut self, entry: CommandEntry) -> bool {
        if self.entries.contains_key(entry.name) {
            return false;
        }

        self.entries.insert(entry.name, entry);

        true
    }
}

/// A registered command: its name, how to build it, and how to handle its events.
#[derive(Clone, Copy, Debug)]
pub struct CommandEntry {
    /// The command's name.
    pub name: &'static str,
    builder: BuildFn,
    command: Option<CommandFn>,
    complete: Option<CompleteFn>,
}

impl CommandEntry {
    /// Creates a new [`CommandEntry`].
    pub const fn new(
        name: &'static str,
        builder: BuildFn,
        command: Option<CommandFn>,
        complete: Option<CompleteFn>,
    ) -> Self {
        Self { name, builder, command, complete }
    }

    /// Builds the Discord command described by this entry, scoped to a guild if one is given.
    ///
    /// # Errors
    ///
    /// This function will return an error if the command fails validation.
    pub fn build(&self, guild_id: Option<Id<GuildMarker>>) -> Result<Command> {
        (self.builder)(self, guild_id)
    }

    /// Returns the command's handler, if it has one.
    #[must_use]
    pub fn command(&self) -> Option<Box<dyn OnCommand + Send + Sync>> {
        self.command.map(|f| f(self))
    }

    /// Returns the command's auto-completion handler, if it has one.
    #[must_use]
    pub fn complete(&self) -> Option<Box<dyn OnComplete + Send + Sync>> {
        self.complete.map(|f| f(self))
    }
}

/// The focused option of an auto-completion event: its name, current text, and type.
pub type Focus<'evt> = (&'evt str, &'evt str, CommandOptionType);

/// Handles a command interaction event.
#[async_trait::async_trait]
pub trait OnCommand {
    /// Returns the entry of the command being handled.
    fn entry(&self) -> &CommandEntry;

    /// Responds to a command interaction event.
    ///
    /// # Errors
    ///
    /// This function will return an error if event handling failed.
    async fn execute<'api: 'evt, 'evt>(&self, ctx: CommandCtx<'api, 'evt>) -> Result;
}

/// Handles an auto-completion interaction event.
#[async_trait::async_trait]
pub trait OnComplete {
    /// Returns the entry of the command being handled.
    fn entry(&self) -> &CommandEntry;

    /// Returns the choices to suggest for the focused option.
    ///
    /// # Errors
    ///
    /// This function will return an error if event handling failed.
    async fn execute<'api: 'evt, 'evt>(
        &self,
        ctx: CommandCtx<'api, 'evt>,
        focus: Focus<'evt>,
    ) -> Result<Vec<CommandOptionChoice>>;
}

/// Defines a command's `entry` function.
///
/// Names and descriptions are localized from `command.{name}.*`, and options from
/// `option.{command}.{option}.*`, with sub-command options nested one level deeper.
///
/// ```ignore
/// register_command! {
///     ChatInput("color") {
///         let in_dms = false;
///         let require = MANAGE_ROLES;
///         let options = [
///             SubCommand("set") {
///                 let options = [
///                     String("input") {
///                         let required = true;
///                         let autocomplete = true;
///                         let maximum = 100;
///                     },
///                 ];
///             },
///         ];
///         let handlers = {
///             command = self::execute_command;
///             complete = self::execute_complete;
///         };
///     }
/// }
/// ```
#[macro_export]
macro_rules! register_command {
    {
        $kind:ident($name:literal) {
            $(let in_dms = $dms:literal;)?
            $(let require = $($permission:ident)|+;)?
            $(let options = [$($option_kind:ident($option_name:literal) {$($args:tt)*}),* $(,)?];)?
            $(let handlers = {
                $(command = $command:expr;)?
                $(complete = $complete:expr;)?
            };)?
        }
    } => {
        /// Returns this command's registry entry.
        pub fn entry() -> $crate::cmd::CommandEntry {
            fn build(
                entry: &$crate::cmd::CommandEntry,
                guild_id: ::std::option::Option<::twilight_model::id::Id<::twilight_model::id::marker::GuildMarker>>,
            ) -> $crate::util::Result<::twilight_model::application::command::Command> {
                let mut builder = $crate::register_command!(
                    @new(::std::format!("command.{}", entry.name))
                    ::twilight_util::builder::command::CommandBuilder,
                    entry.name,
                    ::twilight_model::application::command::CommandType::$kind
                )
                $(.default_member_permissions(::twilight_model::guild::Permissions::empty()$(| ::twilight_model::guild::Permissions::$permission)+))?
                $(.dm_permission($dms))?
                $($(.option($crate::register_command!(@option(entry.name, $option_kind($option_name) { $($args)* }))))*)?;

                if let ::std::option::Option::Some(guild_id) = guild_id {
                    builder = builder.guild_id(guild_id);
                }

                ::std::result::Result::Ok(builder.validate()?.build())
            }

            #[allow(unused_mut)]
            let (mut command, mut complete) = (::std::option::Option::None, ::std::option::Option::None);

            $(
                $(command = {
                    struct Handler($crate::cmd::CommandEntry);

                    #[::async_trait::async_trait]
                    impl $crate::cmd::OnCommand for Handler {
                        fn entry(&self) -> &$crate::cmd::CommandEntry {
                            &self.0
                        }

                        async fn execute<'api: 'evt, 'evt>(
                            &self,
                            ctx: $crate::bot::interaction::CommandCtx<'api, 'evt>,
                        ) -> $crate::util::Result {
                            $command(self, ctx).await
                        }
                    }

                    fn handler(entry: &$crate::cmd::CommandEntry) -> ::std::boxed::Box<dyn $crate::cmd::OnCommand + Send + Sync> {
                        ::std::boxed::Box::new(Handler(*entry))
                    }

                    ::std::option::Option::Some(handler as $crate::cmd::CommandFn)
                };)?
                $(complete = {
                    struct Handler($crate::cmd::CommandEntry);

                    #[::async_trait::async_trait]
                    impl $crate::cmd::OnComplete for Handler {
                        fn entry(&self) -> &$crate::cmd::CommandEntry {
                            &self.0
                        }

                        async fn execute<'api: 'evt, 'evt>(
                            &self,
                            ctx: $crate::bot::interaction::CommandCtx<'api, 'evt>,
                            focus: $crate::cmd::Focus<'evt>,
                        ) -> $crate::util::Result<::std::vec::Vec<::twilight_model::application::command::CommandOptionChoice>> {
                            $complete(self, ctx, focus).await
                        }
                    }

                    fn handler(entry: &$crate::cmd::CommandEntry) -> ::std::boxed::Box<dyn $crate::cmd::OnComplete + Send + Sync> {
                        ::std::boxed::Box::new(Handler(*entry))
                    }

                    ::std::option::Option::Some(handler as $crate::cmd::CompleteFn)
                };)?
            )?

            $crate::cmd::CommandEntry::new($name, build, command, complete)
        }
    };
    (@new($key:expr) $builder:ty, $name:expr $(, $extra:expr)?) => {{
        let key = $key;

        <$builder>::new($name, ::coloriz_localizer::localize!("{}.description", key) $(, $extra)?)
            .name_localizations(::coloriz_localizer::localize!(in *, "{}.name", key))
            .description_localizations(::coloriz_localizer::localize!(in *, "{}.description", key))
    }};
    (@option($parent:expr, String($name:literal) {
        $(let required = $required:literal;)?
        $(let autocomplete = $autocomplete:literal;)?
        $(let maximum = $maximum:literal;)?
    })) => {
        $crate::register_command!(
            @new(::std::format!("option.{}.{}", $parent, $name))
            ::twilight_util::builder::command::StringBuilder,
            $name
        )
        $(.required($required))?
        $(.autocomplete($autocomplete))?
        $(.max_length($maximum))?
    };
    (@option($parent:expr, User($name:literal) {
        $(let required = $required:literal;)?
    })) => {
        $crate::register_command!(
            @new(::std::format!("option.{}.{}", $parent, $name))
            ::twilight_util::builder::command::UserBuilder,
            $name
        )
        $(.required($required))?
    };
    (@option($parent:expr, SubCommand($name:literal) {
        $(let options = [$($option_kind:ident($option_name:literal) {$($args:tt)*}),* $(,)?];)?
    })) => {
        $crate::register_command!(
            @new(::std::format!("option.{}.{}", $parent, $name))
            ::twilight_util::builder::command::SubCommandBuilder,
            $name
        )
        $($(.option($crate::register_command!(
            @option(::std::format!("{}.{}", $parent, $name), $option_kind($option_name) { $($args)* })
        )))*)?
    };
}

/// Looks up the options given to a command or one of its sub-commands.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandOptionResolver<'evt> {
    data: &'evt CommandData,
    options: &'evt [CommandDataOption],
}

impl<'evt> CommandOptionResolver<'evt> {
    /// Creates a resolver over a command's top-level options.
    #[must_use]
    pub fn new(data: &'evt CommandData) -> Self {
        Self { data, options: &data.options }
    }

    /// Extracts an option's value, returning `None` if the option was not provided.
    fn find<T>(&self, name: &str, extract: impl FnOnce(&'evt CommandOptionValue) -> Option<T>) -> Result<Option<T>> {
        let Some(option) = self.options.iter().find(|o| o.name == name) else {
            return Ok(None);
        };

        match extract(&option.value) {
            Some(value) => Ok(Some(value)),
            None => bail!("expected a {} for option '{name}'", std::any::type_name::<T>()),
        }
    }

    /// Extracts a required option's value.
    fn require<T>(&self, name: &str, extract: impl FnOnce(&'evt CommandOptionValue) -> Option<T>) -> Result<T> {
        let Some(value) = self.find(name, extract)? else {
            bail!("missing value for option '{name}'");
        };

        Ok(value)
    }

    /// Returns a resolver over the given sub-command's options.
    ///
    /// # Errors
    ///
    /// This function will return an error if the sub-command was not invoked.
    pub fn get_subcommand(&self, name: &str) -> Result<Self> {
        let options = self.require(name, |value| match value {
            CommandOptionValue::SubCommand(options) => Some(options.as_slice()),
            _ => None,
        })?;

        Ok(Self { data: self.data, options })
    }

    /// Returns a required string option.
    ///
    /// # Errors
    ///
    /// This function will return an error if the option is missing or is not a string.
    pub fn get_str(&self, name: &str) -> Result<&'evt str> {
        self.require(name, |value| match value {
            CommandOptionValue::String(text) => Some(text.as_str()),
            _ => None,
        })
    }

    /// Returns an optional user option.
    ///
    /// # Errors
    ///
    /// This function will return an error if the option is not a user.
    pub fn get_user_id(&self, name: &str) -> Result<Option<Id<UserMarker>>> {
        self.find(name, |value| match value {
            CommandOptionValue::User(id) => Some(*id),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use twilight_model::application::command::CommandType;
    use twilight_model::id::Id;

    use super::*;

    fn data(options: Vec<CommandDataOption>) -> CommandData {
        CommandData {
            guild_id: None,
            id: Id::new(1),
            name: "color".to_string(),
            kind: CommandType::ChatInput,
            options,
            resolved: None,
            target_id: None,
        }
    }

    fn option(name: &str, value: CommandOptionValue) -> CommandDataOption {
        CommandDataOption { name: name.to_string(), value }
    }

    #[test]
    fn registry_contains_every_command() {
        let names = registry().iter().map(|e| e.name).collect::<Vec<_>>();

        assert_eq!(names, ["color", "help", "stats", "sudo"]);
        assert!(registry().get("color").is_some_and(|e| e.complete().is_some()));
        assert!(registry().get("help").is_some_and(|e| e.complete().is_none()));
    }

    #[test]
    fn commands_build_without_localizations() {
        for entry in registry().iter() {
            let command = entry.build(None).unwrap();

            assert_eq!(command.name, entry.name);
        }
    }

    #[test]
    fn resolves_subcommand_options() {
        let data = data(vec![option(
            "set",
            CommandOptionValue::SubCommand(vec![option("input", CommandOptionValue::String("sky blue".to_string()))]),
        )]);
        let resolver = CommandOptionResolver::new(&data);
        let options = resolver.get_subcommand("set").unwrap();

        assert!(resolver.get_subcommand("clear").is_err());
        assert_eq!(options.get_str("input").unwrap(), "sky blue");
        assert!(options.get_str("missing").is_err());
        assert_eq!(options.get_user_id("user").unwrap(), None);
    }

    #[test]
    fn refuses_duplicate_names() {
        let mut registry = CommandRegistry::default();

        assert!(registry.register(self::color::entry()));
        assert!(!registry.register(self::color::entry()));
        assert_eq!(registry.iter().count(), 1);
    }

    #[test]
    fn rejects_mismatched_types() {
        let data = data(vec![option("user", CommandOptionValue::String("me".to_string()))]);
        let resolver = CommandOptionResolver::new(&data);

        assert!(resolver.get_user_id("user").is_err());
        assert!(resolver.get_user_id("target").unwrap().is_none());
        assert!(resolver.get_subcommand("user").is_err());
    }
}
