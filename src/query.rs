//! Query parameters.
//!
//! Any type implementing [`QueryParam`] can be used as a query value.
//! Scalars become a [`QueryValue::Single`]; slices, arrays and vectors
//! become a flattened [`QueryValue::Collection`], which is rendered as
//! repeated `name[]=value` pairs.

use std::fmt::Write as _;

use bytes::Bytes;
use url::form_urlencoded;

/// A rendered query parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    /// A single value, rendered as `name=value`.
    Single(String),
    /// Multiple values, rendered as `name[]=v1&name[]=v2`.
    Collection(Vec<String>),
}

/// A type that can be used as a query parameter.
pub trait QueryParam {
    /// Returns the parameter value, or `None` if the parameter should be omitted.
    fn query_value(&self) -> Option<QueryValue>;
}

impl QueryParam for str {
    fn query_value(&self) -> Option<QueryValue> {
        Some(QueryValue::Single(self.to_owned()))
    }
}

impl QueryParam for String {
    fn query_value(&self) -> Option<QueryValue> {
        self.as_str().query_value()
    }
}

impl QueryParam for bool {
    fn query_value(&self) -> Option<QueryValue> {
        Some(QueryValue::Single(
            if *self { "true" } else { "false" }.to_owned(),
        ))
    }
}

impl QueryParam for Bytes {
    fn query_value(&self) -> Option<QueryValue> {
        std::str::from_utf8(self).ok().and_then(str::query_value)
    }
}

macro_rules! display_query_param {
    ($($ty:ty),* $(,)?) => {
        $(
            impl QueryParam for $ty {
                fn query_value(&self) -> Option<QueryValue> {
                    Some(QueryValue::Single(self.to_string()))
                }
            }
        )*
    };
}

display_query_param!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char
);

impl<T: QueryParam + ?Sized> QueryParam for &T {
    fn query_value(&self) -> Option<QueryValue> {
        (**self).query_value()
    }
}

impl<T: QueryParam> QueryParam for Option<T> {
    fn query_value(&self) -> Option<QueryValue> {
        self.as_ref().and_then(QueryParam::query_value)
    }
}

impl<T: QueryParam> QueryParam for [T] {
    fn query_value(&self) -> Option<QueryValue> {
        let values = self
            .iter()
            .filter_map(QueryParam::query_value)
            .flat_map(|value| match value {
                QueryValue::Single(value) => vec![value],
                QueryValue::Collection(values) => values,
            })
            .collect();

        Some(QueryValue::Collection(values))
    }
}

impl<T: QueryParam, const N: usize> QueryParam for [T; N] {
    fn query_value(&self) -> Option<QueryValue> {
        self.as_slice().query_value()
    }
}

impl<T: QueryParam> QueryParam for Vec<T> {
    fn query_value(&self) -> Option<QueryValue> {
        self.as_slice().query_value()
    }
}

/// An ordered set of query parameters.
///
/// Parameters keep their insertion order. Setting a name that is already
/// present replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: Vec<(String, QueryValue)>,
}

impl Query {
    /// Creates an empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the query with `name` set to `value`.
    ///
    /// A value whose [`QueryParam::query_value`] is `None` removes the parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl QueryParam) -> Self {
        self.set(name, value);
        self
    }

    /// Sets `name` to `value` in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl QueryParam) {
        let name = name.into();
        let position = self.params.iter().position(|(key, _)| *key == name);

        match (value.query_value(), position) {
            (Some(value), Some(index)) => self.params[index].1 = value,
            (Some(value), None) => self.params.push((name, value)),
            (None, Some(index)) => {
                self.params.remove(index);
            }
            (None, None) => {}
        }
    }

    /// Returns the value of `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&QueryValue> {
        self.params
            .iter()
            .find_map(|(key, value)| (key == name).then_some(value))
    }

    /// Returns true if the query has no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterates over the parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.params.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Renders the query as a URL query component (without the leading `?`).
    ///
    /// Names and values are form-urlencoded; the `[]` suffix of collection
    /// names is written verbatim.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut out = String::new();

        for (name, value) in &self.params {
            let name: String = form_urlencoded::byte_serialize(name.as_bytes()).collect();
            match value {
                QueryValue::Single(value) => push_pair(&mut out, &name, value),
                QueryValue::Collection(values) => {
                    for value in values {
                        push_pair(&mut out, &format!("{name}[]"), value);
                    }
                }
            }
        }

        out
    }
}

fn push_pair(out: &mut String, encoded_name: &str, value: &str) {
    if !out.is_empty() {
        out.push('&');
    }
    let _ = write!(
        out,
        "{encoded_name}={}",
        form_urlencoded::byte_serialize(value.as_bytes()).collect::<String>()
    );
}

impl<K: Into<String>, V: QueryParam> FromIterator<(K, V)> for Query {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Self::new();
        for (name, value) in iter {
            query.set(name, value);
        }
        query
    }
}
