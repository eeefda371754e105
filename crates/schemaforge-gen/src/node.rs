//! # Schema Nodes
//!
//! In-memory representation of one JSON Schema fragment, built by the
//! schema builder, rewritten by the reference resolver and rendered by the
//! emitter.
//!
//! ## Rendering
//!
//! Key order is fixed so identical nodes always render to identical bytes:
//! annotations (`title`, `description`) first, then the structural
//! keywords of the variant, then constraint keywords, then the trailing
//! annotations (`default`, `deprecated`, `readOnly`, `writeOnly`).
//!
//! A nullable node renders as `"type": [T, "null"]` when the inner node
//! carries a plain `type` (an enum also gains a `null` literal), and as
//! `anyOf: [inner, {"type": "null"}]` for references, unions and `const`
//! nodes.

use indexmap::IndexMap;
use schemaforge_core::{CanonicalId, Draft, Primitive, TypeName};
use serde_json::{json, Map, Number, Value};

/// Annotation and constraint keywords attached to a node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Keywords {
    pub title: Option<String>,
    pub description: Option<String>,
    pub format: Option<String>,
    pub content_encoding: Option<String>,
    pub const_value: Option<Value>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub minimum: Option<Number>,
    pub exclusive_minimum: Option<Number>,
    pub maximum: Option<Number>,
    pub exclusive_maximum: Option<Number>,
    pub multiple_of: Option<Number>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: bool,
    pub min_properties: Option<u64>,
    pub max_properties: Option<u64>,
    pub default: Option<Value>,
    pub deprecated: bool,
    pub read_only: bool,
    pub write_only: bool,
}

impl Keywords {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay every keyword set in `other` onto `self`.
    pub fn merge(&mut self, other: Keywords) {
        fn overlay<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }
        overlay(&mut self.title, other.title);
        overlay(&mut self.description, other.description);
        overlay(&mut self.format, other.format);
        overlay(&mut self.content_encoding, other.content_encoding);
        overlay(&mut self.const_value, other.const_value);
        overlay(&mut self.min_length, other.min_length);
        overlay(&mut self.max_length, other.max_length);
        overlay(&mut self.pattern, other.pattern);
        overlay(&mut self.minimum, other.minimum);
        overlay(&mut self.exclusive_minimum, other.exclusive_minimum);
        overlay(&mut self.maximum, other.maximum);
        overlay(&mut self.exclusive_maximum, other.exclusive_maximum);
        overlay(&mut self.multiple_of, other.multiple_of);
        overlay(&mut self.min_items, other.min_items);
        overlay(&mut self.max_items, other.max_items);
        overlay(&mut self.min_properties, other.min_properties);
        overlay(&mut self.max_properties, other.max_properties);
        overlay(&mut self.default, other.default);
        self.unique_items |= other.unique_items;
        self.deprecated |= other.deprecated;
        self.read_only |= other.read_only;
        self.write_only |= other.write_only;
    }

    /// Move the annotation keywords out, leaving only validation keywords.
    pub fn split_annotations(&mut self) -> Keywords {
        Keywords {
            title: self.title.take(),
            description: self.description.take(),
            default: self.default.take(),
            deprecated: std::mem::take(&mut self.deprecated),
            read_only: std::mem::take(&mut self.read_only),
            write_only: std::mem::take(&mut self.write_only),
            ..Keywords::default()
        }
    }

    fn write_head(&self, map: &mut Map<String, Value>) {
        if let Some(title) = &self.title {
            map.insert("title".into(), json!(title));
        }
        if let Some(description) = &self.description {
            map.insert("description".into(), json!(description));
        }
    }

    fn write_body(&self, map: &mut Map<String, Value>) {
        let strings = [
            ("format", &self.format),
            ("contentEncoding", &self.content_encoding),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                map.insert(key.into(), json!(value));
            }
        }
        if let Some(value) = &self.const_value {
            map.insert("const".into(), value.clone());
        }
        if let Some(pattern) = &self.pattern {
            map.insert("pattern".into(), json!(pattern));
        }
        let counts = [
            ("minLength", self.min_length),
            ("maxLength", self.max_length),
            ("minItems", self.min_items),
            ("maxItems", self.max_items),
        ];
        for (key, value) in counts {
            if let Some(value) = value {
                map.insert(key.into(), json!(value));
            }
        }
        if self.unique_items {
            map.insert("uniqueItems".into(), Value::Bool(true));
        }
        let bounds = [
            ("minimum", &self.minimum),
            ("exclusiveMinimum", &self.exclusive_minimum),
            ("maximum", &self.maximum),
            ("exclusiveMaximum", &self.exclusive_maximum),
            ("multipleOf", &self.multiple_of),
        ];
        for (key, value) in bounds {
            if let Some(value) = value {
                map.insert(key.into(), Value::Number(value.clone()));
            }
        }
        let properties = [
            ("minProperties", self.min_properties),
            ("maxProperties", self.max_properties),
        ];
        for (key, value) in properties {
            if let Some(value) = value {
                map.insert(key.into(), json!(value));
            }
        }
    }

    fn write_tail(&self, map: &mut Map<String, Value>) {
        if let Some(default) = &self.default {
            map.insert("default".into(), default.clone());
        }
        let flags = [
            ("deprecated", self.deprecated),
            ("readOnly", self.read_only),
            ("writeOnly", self.write_only),
        ];
        for (key, set) in flags {
            if set {
                map.insert(key.into(), Value::Bool(true));
            }
        }
    }
}

/// An object schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectNode {
    /// Whether `"type": "object"` is emitted. Union entries leave it out
    /// because the referenced variant already constrains the type.
    pub typed: bool,
    /// Schemas the object must also satisfy.
    pub all_of: Vec<SchemaNode>,
    /// Properties in declaration order.
    pub properties: IndexMap<String, SchemaNode>,
    pub required: Vec<String>,
    pub additional_properties: Option<Box<SchemaNode>>,
    pub keywords: Keywords,
}

/// One JSON Schema fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    /// Accepts any value.
    Any(Keywords),
    /// Accepts only `null`.
    Null(Keywords),
    Scalar {
        primitive: Primitive,
        keywords: Keywords,
    },
    /// String enumeration.
    Enum {
        values: Vec<String>,
        keywords: Keywords,
    },
    Array {
        items: Box<SchemaNode>,
        keywords: Keywords,
    },
    Object(ObjectNode),
    /// The inner node or `null`.
    Nullable(Box<SchemaNode>),
    /// Exactly one of the variants.
    OneOf {
        variants: Vec<SchemaNode>,
        keywords: Keywords,
    },
    /// Placeholder for a nominal type, replaced during reference resolution.
    Nominal {
        name: TypeName,
        keywords: Keywords,
    },
    /// Reference to a registered definition.
    Ref {
        target: CanonicalId,
        keywords: Keywords,
    },
}

impl SchemaNode {
    pub fn scalar(primitive: Primitive) -> Self {
        Self::Scalar {
            primitive,
            keywords: Keywords::default(),
        }
    }

    /// The node's keywords; `None` for a nullable wrapper.
    pub fn keywords(&self) -> Option<&Keywords> {
        match self {
            Self::Any(k) | Self::Null(k) => Some(k),
            Self::Scalar { keywords, .. }
            | Self::Enum { keywords, .. }
            | Self::Array { keywords, .. }
            | Self::OneOf { keywords, .. }
            | Self::Nominal { keywords, .. }
            | Self::Ref { keywords, .. } => Some(keywords),
            Self::Object(object) => Some(&object.keywords),
            Self::Nullable(_) => None,
        }
    }

    pub fn keywords_mut(&mut self) -> Option<&mut Keywords> {
        match self {
            Self::Any(k) | Self::Null(k) => Some(k),
            Self::Scalar { keywords, .. }
            | Self::Enum { keywords, .. }
            | Self::Array { keywords, .. }
            | Self::OneOf { keywords, .. }
            | Self::Nominal { keywords, .. }
            | Self::Ref { keywords, .. } => Some(keywords),
            Self::Object(object) => Some(&mut object.keywords),
            Self::Nullable(_) => None,
        }
    }

    /// The node describing non-null values: the node itself, or the node
    /// inside any nullable wrappers.
    pub fn value(&self) -> &SchemaNode {
        match self {
            Self::Nullable(inner) => inner.value(),
            other => other,
        }
    }

    pub fn value_mut(&mut self) -> &mut SchemaNode {
        match self {
            Self::Nullable(inner) => inner.value_mut(),
            other => other,
        }
    }

    /// Keywords of the non-null value node.
    pub fn value_keywords_mut(&mut self) -> &mut Keywords {
        match self {
            Self::Nullable(inner) => inner.value_keywords_mut(),
            Self::Any(k) | Self::Null(k) => k,
            Self::Scalar { keywords, .. }
            | Self::Enum { keywords, .. }
            | Self::Array { keywords, .. }
            | Self::OneOf { keywords, .. }
            | Self::Nominal { keywords, .. }
            | Self::Ref { keywords, .. } => keywords,
            Self::Object(object) => &mut object.keywords,
        }
    }

    /// Every `$ref` target in the node, in rendering order, without repeats.
    pub fn references(&self) -> Vec<CanonicalId> {
        let mut found = Vec::new();
        self.collect_references(&mut found);
        found
    }

    fn collect_references(&self, found: &mut Vec<CanonicalId>) {
        match self {
            Self::Ref { target, .. } => {
                if !found.contains(target) {
                    found.push(target.clone());
                }
            }
            Self::Array { items, .. } => items.collect_references(found),
            Self::Nullable(inner) => inner.collect_references(found),
            Self::OneOf { variants, .. } => {
                for variant in variants {
                    variant.collect_references(found);
                }
            }
            Self::Object(object) => {
                for node in object.all_of.iter().chain(object.properties.values()) {
                    node.collect_references(found);
                }
                if let Some(additional) = &object.additional_properties {
                    additional.collect_references(found);
                }
            }
            Self::Any(_) | Self::Null(_) | Self::Scalar { .. } | Self::Enum { .. } | Self::Nominal { .. } => {}
        }
    }

    /// Render as a JSON value.
    pub fn to_value(&self, draft: Draft) -> Value {
        Value::Object(self.render(draft))
    }

    /// Render as a JSON object with keys in canonical order.
    pub fn render(&self, draft: Draft) -> Map<String, Value> {
        let mut map = Map::new();
        match self {
            Self::Any(keywords) | Self::Nominal { keywords, .. } => {
                keywords.write_head(&mut map);
                keywords.write_body(&mut map);
                keywords.write_tail(&mut map);
            }
            Self::Null(keywords) => {
                keywords.write_head(&mut map);
                map.insert("type".into(), json!("null"));
                keywords.write_body(&mut map);
                keywords.write_tail(&mut map);
            }
            Self::Scalar { primitive, keywords } => {
                keywords.write_head(&mut map);
                map.insert("type".into(), json!(primitive.as_str()));
                keywords.write_body(&mut map);
                keywords.write_tail(&mut map);
            }
            Self::Enum { values, keywords } => {
                keywords.write_head(&mut map);
                map.insert("type".into(), json!("string"));
                map.insert("enum".into(), json!(values));
                keywords.write_body(&mut map);
                keywords.write_tail(&mut map);
            }
            Self::Array { items, keywords } => {
                keywords.write_head(&mut map);
                map.insert("type".into(), json!("array"));
                map.insert("items".into(), items.to_value(draft));
                keywords.write_body(&mut map);
                keywords.write_tail(&mut map);
            }
            Self::Object(object) => render_object(object, draft, &mut map),
            Self::OneOf { variants, keywords } => {
                keywords.write_head(&mut map);
                let rendered: Vec<Value> = variants.iter().map(|v| v.to_value(draft)).collect();
                map.insert("oneOf".into(), Value::Array(rendered));
                keywords.write_body(&mut map);
                keywords.write_tail(&mut map);
            }
            Self::Ref { target, keywords } => {
                keywords.write_head(&mut map);
                // Draft-07 ignores keywords next to `$ref`.
                if keywords.is_empty() || draft.ref_allows_siblings() {
                    map.insert("$ref".into(), json!(target.as_str()));
                } else {
                    map.insert("allOf".into(), json!([{ "$ref": target.as_str() }]));
                }
                keywords.write_body(&mut map);
                keywords.write_tail(&mut map);
            }
            Self::Nullable(inner) => render_nullable(inner.value(), draft, &mut map),
        }
        map
    }
}

fn render_object(object: &ObjectNode, draft: Draft, map: &mut Map<String, Value>) {
    object.keywords.write_head(map);
    if object.typed {
        map.insert("type".into(), json!("object"));
    }
    if !object.all_of.is_empty() {
        let rendered: Vec<Value> = object.all_of.iter().map(|n| n.to_value(draft)).collect();
        map.insert("allOf".into(), Value::Array(rendered));
    }
    if !object.properties.is_empty() {
        let properties: Map<String, Value> = object
            .properties
            .iter()
            .map(|(name, node)| (name.clone(), node.to_value(draft)))
            .collect();
        map.insert("properties".into(), Value::Object(properties));
    }
    if !object.required.is_empty() {
        map.insert("required".into(), json!(object.required));
    }
    if let Some(additional) = &object.additional_properties {
        map.insert("additionalProperties".into(), additional.to_value(draft));
    }
    object.keywords.write_body(map);
    object.keywords.write_tail(map);
}

fn render_nullable(inner: &SchemaNode, draft: Draft, map: &mut Map<String, Value>) {
    let has_const = inner.keywords().is_some_and(|k| k.const_value.is_some());
    let typed = match inner {
        SchemaNode::Scalar { .. } | SchemaNode::Enum { .. } | SchemaNode::Array { .. } => true,
        SchemaNode::Object(object) => object.typed,
        _ => false,
    };

    match inner {
        SchemaNode::Any(_) | SchemaNode::Null(_) => map.extend(inner.render(draft)),
        _ if typed && !has_const => {
            let mut rendered = inner.render(draft);
            if let Some(Value::String(primitive)) = rendered.get("type").cloned() {
                rendered.insert("type".into(), json!([primitive, "null"]));
            }
            if let Some(Value::Array(values)) = rendered.get_mut("enum") {
                values.push(Value::Null);
            }
            map.extend(rendered);
        }
        _ => {
            let mut stripped = inner.clone();
            let annotations = stripped
                .keywords_mut()
                .map(Keywords::split_annotations)
                .unwrap_or_default();
            annotations.write_head(map);
            map.insert(
                "anyOf".into(),
                json!([stripped.to_value(draft), { "type": "null" }]),
            );
            annotations.write_tail(map);
        }
    }
}
