use coloriz_localizer::{localizer, Locale};
use twilight_model::application::interaction::Interaction;
use twilight_model::channel::message::embed::EmbedAuthor;
use twilight_model::guild::Role;
use twilight_model::id::marker::UserMarker;
use twilight_model::id::Id;
use twilight_model::user::User;
use twilight_model::util::ImageHash;
use twilight_util::builder::embed::{EmbedAuthorBuilder, ImageSource};

use crate::util::CDN_URL;

/// Provides extensions for [`EmbedAuthor`]s.
pub trait EmbedAuthorExt {
    /// Creates a new [`EmbedAuthor`] from the given user, using their avatar if they have one.
    fn from_user(user: &User) -> Self;
}

impl EmbedAuthorExt for EmbedAuthor {
    fn from_user(user: &User) -> Self {
        let builder = EmbedAuthorBuilder::new(user.tag());
        let icon = user.avatar_url().and_then(|url| ImageSource::url(url).ok());

        match icon {
            Some(icon) => builder.icon_url(icon).build(),
            None => builder.build(),
        }
    }
}

/// Provides extensions for [`Interaction`]s.
pub trait InteractionExt {
    /// Returns a short label identifying this interaction in logs.
    fn label(&self) -> String;

    /// Returns the locale of the interacting user, or the bot's preferred locale if it is not
    /// supported.
    fn preferred_locale(&self) -> Locale;
}

impl InteractionExt for Interaction {
    fn label(&self) -> String {
        match self.author_id() {
            Some(id) => format!("<{:?} #{} @{id}>", self.kind, self.id),
            None => format!("<{:?} #{}>", self.kind, self.id),
        }
    }

    fn preferred_locale(&self) -> Locale {
        let locale = self.locale.as_deref().and_then(Locale::get);

        locale.unwrap_or_else(|| *localizer().preferred_locale())
    }
}

/// Provides extensions for [`Role`]s.
pub trait RoleExt {
    /// Returns whether this role was made to hold a member's color.
    fn is_color_role(&self) -> bool;
}

impl RoleExt for Role {
    fn is_color_role(&self) -> bool {
        self.name.starts_with('#')
    }
}

/// Provides extensions for [`User`]s.
pub trait UserExt {
    /// Returns the tag of this [`User`], either in the current format (`@username`) or old format
    /// (`Username#1234`).
    fn tag(&self) -> String;

    /// Returns the address of this [`User`]'s avatar, if one is set.
    fn avatar_url(&self) -> Option<String>;
}

impl UserExt for User {
    fn tag(&self) -> String {
        if self.discriminator == 0 {
            format!("@{}", self.name)
        } else {
            format!("{}#{}", self.name, self.discriminator())
        }
    }

    fn avatar_url(&self) -> Option<String> {
        self.avatar.map(|hash| self::avatar_url(self.id, hash))
    }
}

/// Returns the CDN address of a user's avatar.
fn avatar_url(id: Id<UserMarker>, hash: ImageHash) -> String {
    let ext = if hash.is_animated() { "gif" } else { "png" };

    format!("{CDN_URL}/avatars/{id}/{hash}.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_avatar_urls() {
        let still = ImageHash::parse(b"1acefe340fafb4ecefae407f3abdb323").unwrap();
        let animated = ImageHash::parse(b"a_1acefe340fafb4ecefae407f3abdb323").unwrap();

        assert_eq!(avatar_url(Id::new(42), still), format!("{CDN_URL}/avatars/42/{still}.png"));
        assert_eq!(avatar_url(Id::new(42), animated), format!("{CDN_URL}/avatars/42/{animated}.gif"));
    }
}
