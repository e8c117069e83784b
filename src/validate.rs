use std::fmt;

use regex::Regex;

/// What a request actually carried for a field. Bracketed keys such
/// as `user[$ne]=x` decode to `Structured`: the shape an injection
/// attempt takes once a permissive query-string parser has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Missing,
    Str(String),
    Structured,
}

impl Param {
    pub fn from_field(value: Option<&str>) -> Self {
        match value {
            Some(s) => Self::Str(s.to_string()),
            None => Self::Missing,
        }
    }
}

/// Pull `name` out of a raw query string, qs-style: a literal key is
/// a plain string, any `name[...]` key means the client smuggled in
/// an object.
pub fn query_param(raw_query: &str, name: &str) -> Param {
    let mut found = Param::Missing;

    for (key, value) in url::form_urlencoded::parse(raw_query.as_bytes()) {
        if key == name {
            if !matches!(found, Param::Structured) {
                found = Param::Str(value.into_owned());
            }
        } else if let Some(rest) = key.strip_prefix(name) {
            if rest.starts_with('[') {
                found = Param::Structured;
            }
        }
    }

    found
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Alphanumeric,
    Email,
}

/// Declarative checks for one string-typed field, applied before the
/// value is allowed anywhere near a query.
#[derive(Debug, Default)]
pub struct StringSchema {
    required: bool,
    max: Option<usize>,
    format: Option<Format>,
}

impl StringSchema {
    pub fn string() -> Self {
        Self::default()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn max(mut self, len: usize) -> Self {
        self.max = Some(len);
        self
    }

    pub fn alphanum(mut self) -> Self {
        self.format = Some(Format::Alphanumeric);
        self
    }

    pub fn email(mut self) -> Self {
        self.format = Some(Format::Email);
        self
    }

    pub fn validate(&self, field: &'static str, param: &Param) -> Result<(), Invalid> {
        let fail = |reason| Err(Invalid { field, reason });

        let value = match param {
            Param::Missing => {
                return if self.required {
                    fail(Reason::Required)
                } else {
                    Ok(())
                };
            }
            Param::Structured => return fail(Reason::NotAString),
            Param::Str(value) => value,
        };

        if self.required && value.is_empty() {
            return fail(Reason::Required);
        }

        if let Some(max) = self.max {
            if value.chars().count() > max {
                return fail(Reason::TooLong(max));
            }
        }

        match self.format {
            Some(Format::Alphanumeric) if !value.chars().all(char::is_alphanumeric) => {
                fail(Reason::NotAlphanumeric)
            }
            Some(Format::Email) if !valid_email(value) => fail(Reason::NotEmail),
            _ => Ok(()),
        }
    }
}

fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_or(false, |re| re.is_match(email))
}

#[derive(Debug, PartialEq, Eq)]
pub struct Invalid {
    pub field: &'static str,
    pub reason: Reason,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Reason {
    Required,
    NotAString,
    TooLong(usize),
    NotAlphanumeric,
    NotEmail,
}

impl fmt::Display for Invalid {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = self.field;

        match self.reason {
            Reason::Required => write!(fmt, "\"{field}\" is required"),
            Reason::NotAString => write!(fmt, "\"{field}\" must be a string"),
            Reason::TooLong(max) => {
                write!(fmt, "\"{field}\" must be at most {max} characters long")
            }
            Reason::NotAlphanumeric => {
                write!(fmt, "\"{field}\" must only contain alphanumeric characters")
            }
            Reason::NotEmail => write!(fmt, "\"{field}\" must be a valid email"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn plain_keys_decode_to_strings() {
        assert_eq!(query_param("user=alice", "user"), Param::Str("alice".into()));
        assert_eq!(query_param("user=a+b", "user"), Param::Str("a b".into()));
        assert_eq!(query_param("", "user"), Param::Missing);
        assert_eq!(query_param("username=alice", "user"), Param::Missing);
    }

    #[test]
    fn bracketed_keys_decode_to_structured_values() {
        assert_eq!(query_param("user[$ne]=x", "user"), Param::Structured);
        assert_eq!(query_param("user%5B%24ne%5D=x", "user"), Param::Structured);
        assert_eq!(query_param("user=alice&user[$gt]=1", "user"), Param::Structured);
        assert_eq!(query_param("user[$gt]=1&user=alice", "user"), Param::Structured);
    }

    #[test]
    fn structured_values_fail_the_type_check() {
        let schema = StringSchema::string().max(20).required();
        let err = schema.validate("user", &Param::Structured).unwrap_err();

        assert_eq!(err.reason, Reason::NotAString);
        assert_eq!(err.to_string(), "\"user\" must be a string");
    }

    #[test]
    fn required_fields_must_be_present_and_non_empty() {
        let schema = StringSchema::string().required();

        assert!(schema.validate("email", &Param::Missing).is_err());
        assert!(schema.validate("email", &Param::Str("".into())).is_err());
        assert!(schema.validate("email", &Param::Str("x".into())).is_ok());

        let optional = StringSchema::string().max(5);
        assert!(optional.validate("nick", &Param::Missing).is_ok());
    }

    #[test]
    fn max_length_counts_characters() {
        let schema = StringSchema::string().max(20).required();

        let twenty = "a".repeat(20);
        assert!(schema.validate("username", &Param::Str(twenty)).is_ok());

        let err = schema
            .validate("username", &Param::Str("a".repeat(21)))
            .unwrap_err();
        assert_eq!(err.reason, Reason::TooLong(20));
        assert_eq!(
            err.to_string(),
            "\"username\" must be at most 20 characters long",
        );
    }

    #[test]
    fn alphanumeric_format() {
        let schema = StringSchema::string().alphanum().max(20).required();

        assert!(schema.validate("username", &Param::Str("alice99".into())).is_ok());
        assert!(schema.validate("username", &Param::Str("al ice".into())).is_err());
        assert!(schema.validate("username", &Param::Str("alice!".into())).is_err());
    }

    #[test]
    fn email_format() {
        let schema = StringSchema::string().email().required();

        assert!(schema.validate("email", &Param::Str("a@b.com".into())).is_ok());

        for bad in ["a@b", "@b.com", "a@", "a b@c.d", "plainly-wrong"] {
            assert!(
                schema.validate("email", &Param::Str(bad.into())).is_err(),
                "{bad:?} should not validate",
            );
        }
    }
}
