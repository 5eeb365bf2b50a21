//! [`User`] definitions.

pub mod session;

use std::{sync::LazyLock, time::Duration};

use argon2::{
    password_hash::{
        self, rand_core::OsRng, PasswordHasher as _, PasswordVerifier as _,
        SaltString,
    },
    Argon2,
};
use base64::Engine as _;
#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Debug, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rand::RngCore as _;
use regex::Regex;
use secrecy::{zeroize::Zeroize, CloneableSecret};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use self::session::Session;

/// Platform user.
#[derive(Clone, Debug)]
pub struct User {
    /// ID of this [`User`]
    pub id: Id,

    /// [`Name`] of this [`User`].
    pub name: Name,

    /// [`Email`] of this [`User`], used as a login.
    pub email: Email,

    /// [`PasswordHash`] of this [`User`].
    pub password_hash: PasswordHash,

    /// [`Phone`] of this [`User`], if any.
    pub phone: Option<Phone>,

    /// Indicator whether this [`User`] is an administrator.
    pub is_admin: bool,

    /// Indicator whether this [`User`] is allowed to sign in.
    pub is_active: bool,

    /// Pending [`PasswordReset`] of this [`User`], if any.
    pub password_reset: Option<PasswordReset>,

    /// [`DateTime`] when this [`User`] was created.
    pub created_at: CreationDateTime,
}

/// ID of a [`User`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Name of a [`User`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && (2..=50).contains(&name.chars().count())
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Password of a [`User`].
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[debug("Password(***)")]
#[display("***")]
pub struct Password(String);

impl Password {
    /// Creates a new [`Password`] without checking its strength.
    ///
    /// Meant for verifying already existing credentials, which could have been
    /// set under a different policy.
    #[must_use]
    pub fn new_unchecked(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    /// Creates a new [`Password`] if the given `password` is strong enough.
    #[must_use]
    pub fn new(password: impl Into<String>) -> Option<Self> {
        let password = password.into();
        Self::check(&password).then_some(Self(password))
    }

    /// Checks whether the given `password` is strong enough:
    /// - 8 to 128 characters long;
    /// - contains an uppercase letter;
    /// - contains a lowercase letter;
    /// - contains a digit.
    fn check(password: impl AsRef<str>) -> bool {
        let password = password.as_ref();
        (8..=128).contains(&password.chars().count())
            && password.chars().any(char::is_uppercase)
            && password.chars().any(char::is_lowercase)
            && password.chars().any(|c| c.is_ascii_digit())
    }
}

impl FromStr for Password {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Password`")
    }
}

impl CloneableSecret for Password {}
impl Zeroize for Password {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// [Argon2id] hash of a [`Password`] in the [PHC string format].
///
/// [Argon2id]: https://en.wikipedia.org/wiki/Argon2
/// [PHC string format]: https://github.com/P-H-C/phc-string-format
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hashes the given [`Password`] with a random salt.
    ///
    /// # Errors
    ///
    /// If the hashing algorithm fails.
    pub fn new(password: &Password) -> Result<Self, password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.0.as_bytes(), &salt)
            .map(|hash| Self(hash.to_string()))
    }

    /// Checks whether the given [`Password`] matches this [`PasswordHash`].
    #[must_use]
    pub fn verify(&self, password: &Password) -> bool {
        password_hash::PasswordHash::new(&self.0)
            .and_then(|hash| {
                Argon2::default().verify_password(password.0.as_bytes(), &hash)
            })
            .is_ok()
    }
}

/// Email address of a [`User`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Email(String);

impl Email {
    /// Creates a new [`Email`] if the given `address` is valid.
    ///
    /// The `address` is lowercased, so it can be compared as a login.
    #[must_use]
    pub fn new(address: impl AsRef<str>) -> Option<Self> {
        let address = address.as_ref().trim().to_lowercase();
        Self::check(&address).then_some(Self(address))
    }

    /// Checks whether the given `address` is a valid [`Email`].
    fn check(address: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Email`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(
                "^([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                     \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                  |\\x22([^\\x0d\\x22\\x5c\\x80-\\xff]\
                  |\\x5c[\\x00-\\x7f])*\\x22)\
                  (\\x2e([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                           \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                        |\\x22([^\\x0d\\x22\\x5c\\x80-\\xff]\
                        |\\x5c[\\x00-\\x7f])*\\x22))*\\x40\
                  ([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                     \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                  |\\x5b([^\\x0d\\x5b-\\x5d\\x80-\\xff]\
                        |\\x5c[\\x00-\\x7f])*\\x5d)\
                  (\\x2e([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                           \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                        |\\x5b([^\\x0d\\x5b-\\x5d\\x80-\\xff]\
                        |\\x5c[\\x00-\\x7f])*\\x5d))*$",
            )
            .expect("valid regex")
        });

        REGEX.is_match(address.as_ref())
    }
}

impl FromStr for Email {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Email`")
    }
}

/// Phone number of a [`User`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Phone(String);

impl Phone {
    /// Creates a new [`Phone`] if the given `number` is valid.
    #[must_use]
    pub fn new(number: impl Into<String>) -> Option<Self> {
        let number = number.into();
        Self::check(&number).then_some(Self(number))
    }

    /// Checks whether the given `number` is a valid [`Phone`].
    fn check(number: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Phone`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^([+]?\d{1,2}[-\s]?|)\d{3}[-\s]?\d{3}[-\s]?\d{4}$")
                .expect("valid regex")
        });

        REGEX.is_match(number.as_ref())
    }
}

impl FromStr for Phone {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Phone`")
    }
}

/// Pending request of a [`User`] to reset its [`Password`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PasswordReset {
    /// Secret [`ResetToken`] authorizing the reset.
    pub token: ResetToken,

    /// [`DateTime`] when the [`ResetToken`] expires.
    pub expires_at: ResetExpirationDateTime,
}

impl PasswordReset {
    /// [`Duration`] a [`ResetToken`] stays valid for.
    pub const TTL: Duration = Duration::from_secs(60 * 60);

    /// Issues a new [`PasswordReset`] with a fresh [`ResetToken`].
    #[must_use]
    pub fn issue() -> Self {
        Self {
            token: ResetToken::generate(),
            expires_at: ResetExpirationDateTime::now() + Self::TTL,
        }
    }

    /// Indicates whether this [`PasswordReset`] is expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        ResetExpirationDateTime::now() >= self.expires_at
    }
}

/// Secret token authorizing a [`PasswordReset`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[debug("ResetToken(***)")]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct ResetToken(String);

impl ResetToken {
    /// Generates a new random 256-bit [`ResetToken`], encoded as URL-safe
    /// base64.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0_u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }
}

impl FromStr for ResetToken {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = !s.is_empty()
            && s.len() <= 128
            && s.chars().all(|c| c.is_ascii_alphanumeric() || "-_".contains(c));
        valid.then(|| Self(s.into())).ok_or("invalid `ResetToken`")
    }
}

/// [`DateTime`] when a [`User`] was created.
pub type CreationDateTime = DateTimeOf<(User, unit::Creation)>;

/// [`DateTime`] when a [`ResetToken`] expires.
pub type ResetExpirationDateTime =
    DateTimeOf<(PasswordReset, unit::Expiration)>;

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use super::{
        Email, Name, Password, PasswordHash, PasswordReset, Phone, ResetToken,
    };

    #[test]
    fn enforces_password_policy() {
        assert!(Password::new("Secret123").is_some());
        assert!(Password::new("Sh0rt").is_none());
        assert!(Password::new("alllowercase1").is_none());
        assert!(Password::new("ALLUPPERCASE1").is_none());
        assert!(Password::new("NoDigitsHere").is_none());
        assert!(Password::new(format!("Aa1{}", "x".repeat(126))).is_none());
        assert!(Password::new(format!("Aa1{}", "x".repeat(125))).is_some());
    }

    #[test]
    fn hashes_and_verifies_passwords() {
        let password = Password::new("Secret123").unwrap();
        let hash = PasswordHash::new(&password).unwrap();

        assert!(hash.to_string().starts_with("$argon2id$"));
        assert!(hash.verify(&password));
        assert!(!hash.verify(&Password::new_unchecked("Secret124")));

        let rehash = PasswordHash::new(&password).unwrap();
        assert_ne!(hash, rehash, "salt must differ");
        assert!(rehash.verify(&password));
    }

    #[test]
    fn normalizes_emails() {
        let email = Email::new(" John.Doe@Example.COM ").unwrap();
        assert_eq!(email.to_string(), "john.doe@example.com");

        assert!(Email::new("not-an-email").is_none());
        assert!(Email::new("a@b@c").is_none());
    }

    #[test]
    fn validates_profile_fields() {
        assert!(Name::new("Jo").is_some());
        assert!(Name::new("J").is_none());
        assert!(Name::new("x".repeat(51)).is_none());

        assert!(Phone::new("+1 555 123 4567").is_some());
        assert!(Phone::new("12345").is_none());
    }

    #[test]
    fn issues_unique_reset_tokens() {
        let a = PasswordReset::issue();
        let b = PasswordReset::issue();

        assert_ne!(a.token, b.token);
        assert_eq!(a.token.to_string().len(), 43);
        assert!(!a.is_expired());
        assert!(ResetToken::from_str(&a.token.to_string()).is_ok());
        assert!(ResetToken::from_str("with spaces").is_err());
    }
}
