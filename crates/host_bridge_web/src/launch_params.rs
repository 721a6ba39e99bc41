//! Launch parameters read from the document location.
//!
//! Hosts pass launch parameters in the URL hash. Reloads inside the same session may drop some of
//! them, so the merged set is persisted in session storage and used to fill missing keys later.

use url::form_urlencoded;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Ordered launch parameter pairs.
pub struct LaunchParams {
    pairs: Vec<(String, String)>,
}

impl LaunchParams {
    /// Parses the query carried by the hash of `location`.
    ///
    /// A location without `#` is treated as a bare hash. Text before a `?` inside the hash is a
    /// route path and is skipped; a hash with neither `=` nor `?` carries no parameters.
    pub fn from_location(location: &str) -> Self {
        let hash = location
            .split_once('#')
            .map_or(location, |(_, hash)| hash);
        let query = match hash.split_once('?') {
            Some((_, query)) => query,
            None if hash.contains('=') => hash,
            None => "",
        };
        Self {
            pairs: form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    /// Adds every persisted pair whose key is not already present.
    ///
    /// # Errors
    ///
    /// Returns the decode error when `persisted` is not a JSON array of `[key, value]` pairs.
    pub fn fill_from_persisted(&mut self, persisted: &str) -> Result<(), String> {
        let stored: Vec<(String, String)> =
            serde_json::from_str(persisted).map_err(|e| e.to_string())?;
        for (key, value) in stored {
            if self.get(&key).is_none() {
                self.pairs.push((key, value));
            }
        }
        Ok(())
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.as_str())
    }

    /// Whether no parameters were found.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// URL-encoded form handed to the bridge.
    pub fn to_query(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.pairs)
            .finish()
    }

    /// JSON form written to session storage.
    ///
    /// # Errors
    ///
    /// Returns the serializer error message.
    pub fn to_persisted(&self) -> Result<String, String> {
        serde_json::to_string(&self.pairs).map_err(|e| e.to_string())
    }
}
