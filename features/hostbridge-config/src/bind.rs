//! Binding of flat `:` keyed values onto serde types.
//!
//! The flat keys are first folded into a tree (`A:B:C` becomes `A -> B -> C`),
//! which is then walked by a small deserializer. Leaves are strings and are parsed
//! on demand into whatever the target type asks for.

use std::collections::BTreeMap;

use serde::{
    de::{
        value::{Error as DeError, MapDeserializer, SeqDeserializer},
        DeserializeOwned, Error as _, IntoDeserializer, Visitor,
    },
    forward_to_deserialize_any, Deserializer,
};

use crate::{configuration::KEY_DELIMITER, errors::ConfigError};

enum Node {
    Leaf(Option<String>),
    /// Children keyed by their lowercased segment
    Branch(BTreeMap<String, Child>),
}

/// A branch entry; `name` is the first spelling seen for the segment
struct Child {
    name: String,
    node: Node,
}

impl Node {
    fn insert(&mut self, path: &[&str], value: Option<String>) {
        let Some((head, rest)) = path.split_first() else {
            *self = Node::Leaf(value);
            return;
        };
        if let Node::Leaf(_) = self {
            *self = Node::Branch(BTreeMap::new());
        }
        if let Node::Branch(children) = self {
            let child = children
                .entry(head.to_ascii_lowercase())
                .or_insert_with(|| Child {
                    name: head.to_string(),
                    node: Node::Branch(BTreeMap::new()),
                });
            child.node.insert(rest, value);
        }
    }
}

pub(crate) fn bind<'a, T, I>(pairs: I, section: &str) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
    I: Iterator<Item = (&'a str, Option<&'a str>)>,
{
    let mut root = Node::Branch(BTreeMap::new());
    for (key, value) in pairs {
        let path: Vec<&str> = key.split(KEY_DELIMITER).collect();
        root.insert(&path, value.map(str::to_string));
    }

    T::deserialize(NodeDeserializer(&root)).map_err(|e| ConfigError::Bind {
        section: section.to_string(),
        message: e.to_string(),
    })
}

/// Field names match keys ignoring case and `_`
fn canonical(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn children_by_index(children: &BTreeMap<String, Child>) -> Vec<&Node> {
    let mut indexed: Vec<(usize, &Node)> = children
        .values()
        .filter_map(|child| {
            let index = child.name.parse::<usize>().ok()?;
            Some((index, &child.node))
        })
        .collect();
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, node)| node).collect()
}

struct NodeDeserializer<'a>(&'a Node);

impl<'a> IntoDeserializer<'_, DeError> for NodeDeserializer<'a> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! leaf_or_any {
    ($($method:ident),*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
                match self.0 {
                    Node::Leaf(value) => LeafDeserializer(value.as_deref()).$method(visitor),
                    Node::Branch(_) => self.deserialize_any(visitor),
                }
            }
        )*
    };
}

impl<'de, 'a> Deserializer<'de> for NodeDeserializer<'a> {
    type Error = DeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match self.0 {
            Node::Leaf(value) => LeafDeserializer(value.as_deref()).deserialize_any(visitor),
            Node::Branch(children) => visitor.visit_map(MapDeserializer::new(
                children
                    .values()
                    .map(|child| (child.name.as_str(), NodeDeserializer(&child.node))),
            )),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match self.0 {
            Node::Leaf(None) => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match self.0 {
            Node::Leaf(value) => LeafDeserializer(value.as_deref()).deserialize_seq(visitor),
            Node::Branch(children) => visitor.visit_seq(SeqDeserializer::new(
                children_by_index(children).into_iter().map(NodeDeserializer),
            )),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DeError> {
        let Node::Branch(children) = self.0 else {
            return self.deserialize_any(visitor);
        };

        let entries = children.values().map(|child| {
            let wanted = canonical(&child.name);
            let field = fields
                .iter()
                .find(|field| canonical(field) == wanted)
                .copied()
                .unwrap_or(child.name.as_str());
            (field, NodeDeserializer(&child.node))
        });
        visitor.visit_map(MapDeserializer::new(entries))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DeError> {
        match self.0 {
            Node::Leaf(value) => {
                LeafDeserializer(value.as_deref()).deserialize_enum(name, variants, visitor)
            }
            Node::Branch(_) => Err(DeError::custom(format!(
                "expected a single value for enum {name}"
            ))),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        visitor.visit_newtype_struct(self)
    }

    leaf_or_any!(
        deserialize_bool,
        deserialize_i8,
        deserialize_i16,
        deserialize_i32,
        deserialize_i64,
        deserialize_u8,
        deserialize_u16,
        deserialize_u32,
        deserialize_u64,
        deserialize_f32,
        deserialize_f64
    );

    forward_to_deserialize_any! {
        char str string bytes byte_buf unit unit_struct tuple
        tuple_struct map identifier ignored_any
    }
}

/// A single string value, parsed on demand
struct LeafDeserializer<'a>(Option<&'a str>);

impl<'a> LeafDeserializer<'a> {
    fn text(&self) -> Result<&'a str, DeError> {
        self.0.ok_or_else(|| DeError::custom("value is missing"))
    }
}

impl<'a> IntoDeserializer<'_, DeError> for LeafDeserializer<'a> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! parse_leaf {
    ($($method:ident => $visit:ident as $ty:ty),*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
                let raw = self.text()?;
                let parsed = raw.trim().parse::<$ty>().map_err(|e| {
                    DeError::custom(format!("invalid value '{raw}': {e}"))
                })?;
                visitor.$visit(parsed)
            }
        )*
    };
}

impl<'de, 'a> Deserializer<'de> for LeafDeserializer<'a> {
    type Error = DeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match self.0 {
            Some(text) => visitor.visit_str(text),
            None => visitor.visit_none(),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        let raw = self.text()?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => visitor.visit_bool(true),
            "false" => visitor.visit_bool(false),
            _ => Err(DeError::custom(format!("invalid boolean '{raw}'"))),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match self.0 {
            Some(_) => visitor.visit_some(self),
            None => visitor.visit_none(),
        }
    }

    /// Comma separated list
    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        let raw = self.text()?;
        let items = raw
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| LeafDeserializer(Some(item)));
        visitor.visit_seq(SeqDeserializer::new(items))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DeError> {
        let raw = self.text()?;
        let wanted = canonical(raw);
        let variant = variants
            .iter()
            .find(|variant| canonical(variant) == wanted)
            .ok_or_else(|| DeError::custom(format!("unknown {name} variant '{raw}'")))?;
        let variant: &'static str = *variant;
        visitor.visit_enum(IntoDeserializer::<'de, DeError>::into_deserializer(variant))
    }

    parse_leaf!(
        deserialize_i8 => visit_i8 as i8,
        deserialize_i16 => visit_i16 as i16,
        deserialize_i32 => visit_i32 as i32,
        deserialize_i64 => visit_i64 as i64,
        deserialize_u8 => visit_u8 as u8,
        deserialize_u16 => visit_u16 as u16,
        deserialize_u32 => visit_u32 as u32,
        deserialize_u64 => visit_u64 as u64,
        deserialize_f32 => visit_f32 as f32,
        deserialize_f64 => visit_f64 as f64
    );

    forward_to_deserialize_any! {
        char str string bytes byte_buf unit unit_struct newtype_struct tuple
        tuple_struct map struct identifier ignored_any
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use crate::Configuration;

    #[derive(Debug, Deserialize, PartialEq)]
    enum Mode {
        Fast,
        Safe,
    }

    #[derive(Debug, Deserialize)]
    struct Options {
        enabled: bool,
        header_name: String,
        #[serde(default)]
        retries: u16,
        mode: Mode,
        #[serde(default)]
        include_contracts: Vec<String>,
        missing: Option<String>,
        endpoints: Vec<String>,
    }

    #[test]
    fn binds_strings_onto_typed_fields() {
        let config = Configuration::from_pairs([
            ("App:Enabled", Some("True".to_string())),
            ("App:HeaderName", Some("X-Id".to_string())),
            ("App:Retries", Some("3".to_string())),
            ("App:Mode", Some("safe".to_string())),
            ("App:IncludeContracts", Some("IOrders, IBilling".to_string())),
            ("App:Endpoints:1", Some("b".to_string())),
            ("App:Endpoints:0", Some("a".to_string())),
        ]);

        let options: Options = config.bind_section("app").unwrap();
        assert!(options.enabled);
        assert_eq!(options.header_name, "X-Id");
        assert_eq!(options.retries, 3);
        assert_eq!(options.mode, Mode::Safe);
        assert_eq!(options.include_contracts, vec!["IOrders", "IBilling"]);
        assert_eq!(options.missing, None);
        assert_eq!(options.endpoints, vec!["a", "b"]);
    }

    #[test]
    fn bad_values_report_the_section() {
        let config = Configuration::from_pairs([
            ("App:Enabled", Some("maybe".to_string())),
            ("App:HeaderName", Some("X-Id".to_string())),
            ("App:Mode", Some("Fast".to_string())),
            ("App:Endpoints", Some("a".to_string())),
        ]);

        let err = config.bind_section::<Options>("App").unwrap_err();
        assert!(err.to_string().contains("'App'"));
        assert!(err.to_string().contains("maybe"));
    }

    #[derive(Debug, Deserialize)]
    struct Correlation {
        #[serde(default)]
        include_contracts: Vec<String>,
        #[serde(default)]
        labels: std::collections::BTreeMap<String, String>,
    }

    #[test]
    fn differently_cased_paths_bind_as_one_branch() {
        let config = Configuration::from_pairs([
            ("HostBridge:Correlation:IncludeContracts:0", Some("orders".to_string())),
            ("HOSTBRIDGE:CORRELATION:INCLUDECONTRACTS:1", Some("billing".to_string())),
            ("HostBridge:Correlation:Labels:Team", Some("payments".to_string())),
            ("hostbridge:correlation:labels:TEAM", Some("platform".to_string())),
        ]);

        let options: Correlation = config.bind_section("HostBridge:Correlation").unwrap();
        assert_eq!(options.include_contracts, vec!["orders", "billing"]);
        // One entry, keyed by the first spelling, holding the later value
        assert_eq!(options.labels.len(), 1);
        assert_eq!(options.labels["Team"], "platform");
    }
}
