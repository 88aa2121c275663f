//! Provides procedural macro definitions for the coloriz Discord bot.
#![deny(clippy::expect_used, unsafe_code, clippy::unwrap_used)]
#![warn(clippy::nursery, clippy::todo, clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

use proc_macro::TokenStream;

mod global;
mod storage;

/// Declares lazily initialized statics, each with a lowercase getter function.
///
/// The static's visibility is applied to the getter; the static itself stays private.
///
/// # Examples
///
/// ```ignore
/// global! {
///     /// Matches runs of ASCII digits.
///     pub static DIGITS: Regex = Regex::new("[0-9]+").unwrap();
/// }
///
/// assert!(digits().is_match("12"));
/// ```
#[inline]
#[proc_macro]
pub fn global(input: TokenStream) -> TokenStream {
    crate::global::procedure(input)
}

/// Derives the `Stored` trait from `coloriz_storage` for the deriving type.
///
/// # Examples
///
/// ```ignore
/// #[derive(Serialize, Deserialize, Storage)]
/// #[format(Compress<MsgPack, 3>)]
/// #[location("history/{}/{}", Id<GuildMarker>, Id<UserMarker>)]
/// struct History {
///     records: Vec<ColorRecord>,
/// }
/// ```
#[inline]
#[proc_macro_derive(Storage, attributes(format, location))]
pub fn storage(input: TokenStream) -> TokenStream {
    crate::storage::procedure(input)
}
