//! Macro for implementing Display and FromStr for string-backed enums
//!
//! # Example
//!
//! ```rust
//! use mentorlink_domain::impl_str_enum_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Format {
//!     Json,
//!     Toml,
//! }
//!
//! impl_str_enum_conversions!(Format {
//!     Json => "json",
//!     Toml => "toml",
//! });
//!
//! assert_eq!("JSON".parse::<Format>(), Ok(Format::Json));
//! assert_eq!(Format::Toml.to_string(), "toml");
//! ```

/// Implements Display and FromStr for an enum with a fixed string per variant
///
/// Display writes the given string verbatim; FromStr matches it
/// case-insensitively.
#[macro_export]
macro_rules! impl_str_enum_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// String form of the variant
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(if s.eq_ignore_ascii_case($str) {
                    return Ok(Self::$variant);
                })+
                Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}
