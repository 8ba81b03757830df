use std::collections::HashMap;

use crate::error::InputError;

/// Raw query parameters as bound from the request, before any defaulting.
///
/// Repeated keys keep every value in arrival order. Blank values are treated
/// as absent so `?name=` does not become an empty substring filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParams {
    values: HashMap<String, Vec<String>>,
}

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` query string.
    pub fn from_query(query: &str) -> Self {
        url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            return;
        }
        self.values.entry(name.into()).or_default().push(value);
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// First value supplied for `name`, trimmed.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|values| values.first())
            .map(|value| value.trim())
    }

    /// Every value supplied for `name`, in arrival order.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.values.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// First value for `name` parsed as an integer.
    pub fn get_int(&self, name: &str) -> Result<Option<i64>, InputError> {
        self.get(name)
            .map(|raw| {
                raw.parse::<i64>().map_err(|_| InputError::InvalidInteger {
                    param: name.to_string(),
                    value: raw.to_string(),
                })
            })
            .transpose()
    }

    /// Like [`get_int`](Self::get_int) but rejects negative values.
    pub fn get_non_negative(&self, name: &str) -> Result<Option<u32>, InputError> {
        match self.get_int(name)? {
            None => Ok(None),
            Some(value) if value < 0 => Err(InputError::NegativeValue {
                param: name.to_string(),
            }),
            Some(value) => Ok(Some(value.min(u32::MAX as i64) as u32)),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = RawParams::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}
