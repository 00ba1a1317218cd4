//! Values captured by a route match.

/// Route values keyed case-insensitively, in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteValues {
    entries: Vec<(String, String)>,
}

impl RouteValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, replacing one stored under the same name.
    pub fn insert(&mut self, name: String, value: String) {
        match self.entries.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let mut values = RouteValues::new();
        values.insert("controller".into(), "Products".into());
        values.insert("Controller".into(), "Orders".into());

        assert_eq!(values.len(), 1);
        assert_eq!(values.get("CONTROLLER"), Some("Orders"));
        assert_eq!(values.get("action"), None);
    }
}
