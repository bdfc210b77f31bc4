use crate::db::value::Value;
use std::{fmt, ops::Bound};

/// Reserved property naming the entity identifier itself.
pub const IDENTIFIER_PROPERTY: &str = "uuid";

///
/// Predicate
///
/// Boolean predicate tree over indexed properties.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Equals {
        property: String,
        value: Value,
    },
    Range {
        property: String,
        lower: Bound<Value>,
        upper: Bound<Value>,
    },
    Contains {
        property: String,
        keyword: String,
    },
    Not(Box<Self>),
    And(Vec<Self>),
    Or(Vec<Self>),
}

impl Predicate {
    #[must_use]
    pub fn eq(property: &str, value: impl Into<Value>) -> Self {
        Self::Equals {
            property: property.to_lowercase(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn range(property: &str, lower: Bound<Value>, upper: Bound<Value>) -> Self {
        Self::Range {
            property: property.to_lowercase(),
            lower,
            upper,
        }
    }

    #[must_use]
    pub fn gt(property: &str, value: impl Into<Value>) -> Self {
        Self::range(property, Bound::Excluded(value.into()), Bound::Unbounded)
    }

    #[must_use]
    pub fn gte(property: &str, value: impl Into<Value>) -> Self {
        Self::range(property, Bound::Included(value.into()), Bound::Unbounded)
    }

    #[must_use]
    pub fn lt(property: &str, value: impl Into<Value>) -> Self {
        Self::range(property, Bound::Unbounded, Bound::Excluded(value.into()))
    }

    #[must_use]
    pub fn lte(property: &str, value: impl Into<Value>) -> Self {
        Self::range(property, Bound::Unbounded, Bound::Included(value.into()))
    }

    #[must_use]
    pub fn contains(property: &str, keyword: &str) -> Self {
        Self::Contains {
            property: property.to_lowercase(),
            keyword: keyword.to_lowercase(),
        }
    }

    #[must_use]
    pub fn not(inner: Self) -> Self {
        Self::Not(Box::new(inner))
    }

    #[must_use]
    pub const fn and(children: Vec<Self>) -> Self {
        Self::And(children)
    }

    #[must_use]
    pub const fn or(children: Vec<Self>) -> Self {
        Self::Or(children)
    }

    /// Whether any term in this tree is a RANGE.
    #[must_use]
    pub fn has_range(&self) -> bool {
        self.first_range_property().is_some()
    }

    /// Property of the first RANGE term in depth-first order.
    #[must_use]
    pub fn first_range_property(&self) -> Option<&str> {
        match self {
            Self::Range { property, .. } => Some(property.as_str()),
            Self::Equals { .. } | Self::Contains { .. } => None,
            Self::Not(inner) => inner.first_range_property(),
            Self::And(children) | Self::Or(children) => {
                children.iter().find_map(Self::first_range_property)
            }
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals { property, value } => write!(f, "{property} = {value}"),
            Self::Range {
                property,
                lower,
                upper,
            } => {
                match lower {
                    Bound::Included(v) => write!(f, "{property} >= {v}")?,
                    Bound::Excluded(v) => write!(f, "{property} > {v}")?,
                    Bound::Unbounded => write!(f, "{property} > *")?,
                }
                match upper {
                    Bound::Included(v) => write!(f, " and {property} <= {v}"),
                    Bound::Excluded(v) => write!(f, " and {property} < {v}"),
                    Bound::Unbounded => Ok(()),
                }
            }
            Self::Contains { property, keyword } => write!(f, "{property} contains '{keyword}'"),
            Self::Not(inner) => write!(f, "not ({inner})"),
            Self::And(children) => write_joined(f, children, " and "),
            Self::Or(children) => write_joined(f, children, " or "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[Predicate], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (idx, child) in children.iter().enumerate() {
        if idx > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{child}")?;
    }
    f.write_str(")")
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_lowercase_names_and_keywords() {
        assert_eq!(
            Predicate::contains("Title", "HAT"),
            Predicate::Contains {
                property: "title".to_string(),
                keyword: "hat".to_string()
            }
        );
    }

    #[test]
    fn first_range_property_is_depth_first() {
        let predicate = Predicate::and(vec![
            Predicate::eq("a", 1),
            Predicate::or(vec![Predicate::gt("b", 2), Predicate::lt("c", 3)]),
            Predicate::gte("d", 4),
        ]);

        assert_eq!(predicate.first_range_property(), Some("b"));
        assert!(!Predicate::eq("a", 1).has_range());
    }

    #[test]
    fn display_renders_a_readable_tree() {
        let predicate = Predicate::and(vec![
            Predicate::eq("name", "ann"),
            Predicate::not(Predicate::lte("age", 3)),
        ]);

        assert_eq!(
            predicate.to_string(),
            "(name = 'ann' and not (age > * and age <= 3))"
        );
    }
}
