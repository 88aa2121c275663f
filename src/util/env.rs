use anyhow::anyhow;
use twilight_model::id::marker::{ChannelMarker, GuildMarker};
use twilight_model::id::Id;

use super::Result;

/// Returns the bot's client token.
///
/// This can be configured using the `CLIENT_TOKEN` environment variable.
///
/// # Errors
///
/// This function will return an error if the variable was not set.
#[inline]
pub fn token() -> Result<Box<str>> {
    Ok(std::env::var("CLIENT_TOKEN")?.into_boxed_str())
}

/// Returns the guild that commands are patched into directly.
///
/// This can be configured using the `TESTING_GUILD_ID` environment variable.
///
/// # Errors
///
/// This function will return an error if the variable was not set or is equal to zero.
#[inline]
pub fn testing_guild_id() -> Result<Id<GuildMarker>> {
    self::generic_id("TESTING_GUILD_ID")
}

/// Returns the channel that interaction errors are reported to.
///
/// This can be configured using the `ERROR_CHANNEL_ID` environment variable.
///
/// # Errors
///
/// This function will return an error if the variable was not set or is equal to zero.
#[inline]
pub fn error_channel_id() -> Result<Id<ChannelMarker>> {
    self::generic_id("ERROR_CHANNEL_ID")
}

/// Returns a generic identifier from the environment.
fn generic_id<T>(key: &str) -> Result<Id<T>> {
    let var = std::env::var(key)?;

    self::parse_id(key, &var)
}

/// Parses a non-zero identifier, naming the variable it came from on failure.
fn parse_id<T>(key: &str, value: &str) -> Result<Id<T>> {
    let value = value.trim().parse().map_err(|e| anyhow!("invalid identifier for '{key}' - {e}"))?;

    Id::new_checked(value).ok_or_else(|| anyhow!("expected a non-zero identifier for '{key}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_identifiers() {
        let id = parse_id::<GuildMarker>("TESTING_GUILD_ID", " 123456789 ").unwrap();

        assert_eq!(id.get(), 123_456_789);
    }

    #[test]
    fn rejects_zero_and_garbage() {
        assert!(parse_id::<ChannelMarker>("ERROR_CHANNEL_ID", "0").is_err());
        assert!(parse_id::<ChannelMarker>("ERROR_CHANNEL_ID", "general").is_err());
    }
}
