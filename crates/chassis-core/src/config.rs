//! Configuration document model.
//!
//! Both the device tree and the entity topology are trees of named nodes
//! carrying string attributes. They are stored as JSON:
//!
//! ```json
//! {
//!   "name": "fan_tray",
//!   "attributes": { "instance": "1", "type": "SDI_ENTITY_FAN_TRAY" },
//!   "children": [
//!     { "name": "resource", "attributes": { "reference": "fan_0", "name": "fan1" } }
//!   ]
//! }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// A node of a configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ConfigNode>,
}

impl ConfigNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder: set an attribute.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Builder: append a child node.
    #[must_use]
    pub fn with_child(mut self, child: ConfigNode) -> Self {
        self.children.push(child);
        self
    }

    /// Attribute value, if present.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Attribute value, failing with [`Error::MissingAttribute`] when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the attribute is not set on this node.
    pub fn required_attr(&self, key: &str) -> Result<&str> {
        self.attr(key)
            .ok_or_else(|| Error::missing_attribute(&self.name, key))
    }

    /// Parse an optional attribute with [`FromStr`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAttribute`] if the attribute is set but does
    /// not parse.
    pub fn parse_attr<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.attr(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| Error::invalid_attribute(&self.name, key, raw)),
        }
    }

    /// Parse a required attribute with [`FromStr`].
    ///
    /// # Errors
    ///
    /// Returns an error if the attribute is missing or does not parse.
    pub fn parse_required_attr<T: FromStr>(&self, key: &str) -> Result<T> {
        self.parse_attr(key)?
            .ok_or_else(|| Error::missing_attribute(&self.name, key))
    }

    /// Parse an optional hexadecimal attribute. A `0x` prefix is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAttribute`] if the value is not valid hex.
    pub fn parse_hex_attr(&self, key: &str) -> Result<Option<u32>> {
        match self.attr(key) {
            None => Ok(None),
            Some(raw) => parse_hex(raw)
                .map(Some)
                .ok_or_else(|| Error::invalid_attribute(&self.name, key, raw)),
        }
    }

    /// Parse a document from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the text is not a well-formed node tree.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a document from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Depth-first walk over this node and all descendants.
    pub fn walk(&self) -> impl Iterator<Item = &ConfigNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

fn parse_hex(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u32::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    fn sample() -> ConfigNode {
        ConfigNode::new("fan_tray")
            .with_attr("instance", "1")
            .with_attr("warm_reset", "0x1f")
            .with_attr("delay", "250")
            .with_child(ConfigNode::new("resource").with_attr("reference", "fan_0"))
    }

    #[test]
    fn test_required_attr_missing() {
        let node = sample();
        let err = node.required_attr("type").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required attribute 'type' on node 'fan_tray'"
        );
    }

    #[test]
    fn test_parse_attr_decimal() {
        let node = sample();
        assert_eq!(node.parse_attr::<u64>("delay").unwrap(), Some(250));
        assert_eq!(node.parse_attr::<u64>("absent").unwrap(), None);
    }

    #[test]
    fn test_parse_attr_invalid() {
        let node = ConfigNode::new("psu").with_attr("instance", "one");
        assert!(matches!(
            node.parse_attr::<u32>("instance"),
            Err(Error::InvalidAttribute { .. })
        ));
    }

    #[rstest]
    #[case("0x1f", 0x1f)]
    #[case("1F", 0x1f)]
    #[case("0XA0", 0xa0)]
    #[case(" 3 ", 3)]
    fn test_parse_hex_attr(#[case] raw: &str, #[case] expected: u32) {
        let node = ConfigNode::new("n").with_attr("v", raw);
        assert_eq!(node.parse_hex_attr("v").unwrap(), Some(expected));
    }

    #[test]
    fn test_parse_hex_attr_invalid() {
        let node = ConfigNode::new("n").with_attr("v", "0xZZ");
        assert!(node.parse_hex_attr("v").is_err());
    }

    #[test]
    fn test_walk_order() {
        let tree = ConfigNode::new("root")
            .with_child(ConfigNode::new("a").with_child(ConfigNode::new("a1")))
            .with_child(ConfigNode::new("b"));
        let names: Vec<&str> = tree.walk().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["root", "a", "a1", "b"]);
    }

    #[test]
    fn test_json_defaults() {
        let node = ConfigNode::from_json_str(r#"{"name":"root"}"#).unwrap();
        assert!(node.attributes.is_empty());
        assert!(node.children.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"name":"root","children":[{{"name":"psu","attributes":{{"instance":"2"}}}}]}}"#
        )
        .unwrap();

        let node = ConfigNode::load(file.path()).unwrap();
        assert_eq!(node.children[0].attr("instance"), Some("2"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = ConfigNode::load("/nonexistent/chassis/entities.json");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
