//! Field-by-field reader that records violations instead of failing fast.
//!
//! Each accessor returns a usable placeholder when the field is invalid so
//! the caller can keep reading; [`FieldReader::finish`] discards the built
//! value whenever any violation was recorded, so placeholders never escape.

use std::str::FromStr;

use mockable::Env;

use super::{ConfigError, FieldError, Secret};

const BOOL_EXPECTED: &str = "1|0|true|false|yes|no|y|n";

pub(super) struct FieldReader<'a, E> {
    env: &'a E,
    violations: Vec<FieldError>,
}

impl<'a, E: Env> FieldReader<'a, E> {
    pub(super) fn new(env: &'a E) -> Self {
        Self {
            env,
            violations: Vec::new(),
        }
    }

    /// Blank values count as unset.
    fn raw(&self, name: &str) -> Option<String> {
        self.env
            .string(name)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    /// First non-blank value among `names`, in order.
    pub(super) fn first_present(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| self.raw(name))
    }

    fn missing(&mut self, name: &'static str) {
        self.violations.push(FieldError::Missing { name });
    }

    pub(super) fn required_string(&mut self, name: &'static str) -> String {
        self.raw(name).unwrap_or_else(|| {
            self.missing(name);
            String::new()
        })
    }

    pub(super) fn optional_string(&mut self, name: &'static str, default: &str) -> String {
        self.raw(name).unwrap_or_else(|| default.to_owned())
    }

    pub(super) fn required_secret(&mut self, name: &'static str) -> Secret {
        Secret::new(self.required_string(name))
    }

    pub(super) fn required_number<T>(&mut self, name: &'static str) -> T
    where
        T: FromStr + Default,
    {
        match self.raw(name) {
            Some(value) => self.parse_number(name, value).unwrap_or_default(),
            None => {
                self.missing(name);
                T::default()
            }
        }
    }

    pub(super) fn optional_number<T>(&mut self, name: &'static str, default: T) -> T
    where
        T: FromStr,
    {
        match self.raw(name) {
            Some(value) => self.parse_number(name, value).unwrap_or(default),
            None => default,
        }
    }

    pub(super) fn optional_bool(&mut self, name: &'static str, default: bool) -> bool {
        let Some(value) = self.raw(name) else {
            return default;
        };
        parse_bool(&value).unwrap_or_else(|| {
            self.violations.push(FieldError::NotABoolean {
                name,
                value,
                expected: BOOL_EXPECTED,
            });
            default
        })
    }

    fn parse_number<T: FromStr>(&mut self, name: &'static str, value: String) -> Option<T> {
        if let Ok(parsed) = value.parse::<T>() {
            return Some(parsed);
        }
        self.violations.push(FieldError::NotANumber {
            name,
            value,
            expected: std::any::type_name::<T>(),
        });
        None
    }

    pub(super) fn finish<T>(self, value: T) -> Result<T, ConfigError> {
        if self.violations.is_empty() {
            Ok(value)
        } else {
            Err(ConfigError {
                violations: self.violations,
            })
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1", Some(true))]
    #[case("TRUE", Some(true))]
    #[case("y", Some(true))]
    #[case("no", Some(false))]
    #[case("0", Some(false))]
    #[case("maybe", None)]
    fn parses_boolean_tokens(#[case] raw: &str, #[case] expected: Option<bool>) {
        assert_eq!(parse_bool(raw), expected);
    }
}
