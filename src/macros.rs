//! Utility macros for common patterns across the reconciliation core
//!
//! These reduce boilerplate for the string-backed enums persisted by the fleet
//! store and for Debug implementations of types holding a database pool.

/// Implement `as_str`, `Display` and `FromStr` for a fieldless enum stored as text
///
/// # Examples
///
/// ```
/// use fleet_reconciler::wire_string_enum;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// pub enum Color {
///     Red,
///     DarkBlue,
/// }
///
/// wire_string_enum!(Color, "color" {
///     Red => "red",
///     DarkBlue => "darkblue",
/// });
///
/// assert_eq!(Color::DarkBlue.to_string(), "darkblue");
/// assert_eq!("red".parse::<Color>().unwrap(), Color::Red);
/// assert!("green".parse::<Color>().is_err());
/// ```
#[macro_export]
macro_rules! wire_string_enum {
    ($enum_name:ident, $label:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $enum_name {
            /// Stored text representation
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
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
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {s}", $label)),
                }
            }
        }
    };
}

/// Implement Debug for a type containing a PgPool field
///
/// PgPool doesn't implement Debug, so we show it as the string "PgPool" instead.
#[macro_export]
macro_rules! debug_with_pgpool {
    ($struct_name:ident { $pool_field:ident: PgPool $(, $field:ident)* $(,)? }) => {
        impl std::fmt::Debug for $struct_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($struct_name))
                    .field(stringify!($pool_field), &"PgPool")
                    $(
                        .field(stringify!($field), &self.$field)
                    )*
                    .finish()
            }
        }
    };
}
