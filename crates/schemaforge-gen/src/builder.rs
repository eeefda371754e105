//! # Schema Builder
//!
//! Builds the expanded [`SchemaNode`] of one nominal type from its
//! descriptor, the mapped constraints of its properties, and the
//! generation settings.
//!
//! ## Design
//!
//! The builder never decides between inlining and referencing. Every
//! nominal type it meets inside the node (a property of a declared type,
//! a list element, a union variant) is left as a `SchemaNode::Nominal`
//! placeholder for the reference resolver.

use schemaforge_core::{
    DescriptionPolicy, DiagnosticKind, GenerationConfig, NullInclusion, Primitive,
    PropertyDescriptor, ScalarType, Shape, TitlePolicy, TypeDescriptor, TypeKind, TypeRef,
    UnionVariant,
};
use serde_json::{Number, Value};

use crate::constraints::{ConstraintMapper, MappedConstraints};
use crate::diagnostics::DiagnosticSink;
use crate::node::{Keywords, ObjectNode, SchemaNode};

/// `contentEncoding` of binary values rendered as strings.
pub const BINARY_ENCODING: &str = "base64";

/// Builds schema nodes for nominal types.
#[derive(Debug, Clone, Copy)]
pub struct SchemaBuilder<'a> {
    config: &'a GenerationConfig,
    mapper: ConstraintMapper<'a>,
    diagnostics: &'a DiagnosticSink,
}

impl<'a> SchemaBuilder<'a> {
    pub fn new(config: &'a GenerationConfig, diagnostics: &'a DiagnosticSink) -> Self {
        Self {
            config,
            mapper: ConstraintMapper::new(diagnostics),
            diagnostics,
        }
    }

    /// Build the expanded node of `descriptor`.
    pub fn build(&self, descriptor: &TypeDescriptor) -> SchemaNode {
        let keywords = self.type_annotations(descriptor);
        match &descriptor.kind {
            TypeKind::Object {
                properties,
                additional_properties,
            } => {
                let mut object = ObjectNode {
                    typed: true,
                    keywords,
                    ..ObjectNode::default()
                };
                for property in properties {
                    if self.is_required(property) {
                        object.required.push(property.name.clone());
                    }
                    let node = self.property(descriptor, property);
                    object.properties.insert(property.name.clone(), node);
                }
                object.additional_properties = additional_properties
                    .as_ref()
                    .map(|type_ref| Box::new(self.type_ref(type_ref)));
                SchemaNode::Object(object)
            }
            TypeKind::Enum { values } => SchemaNode::Enum {
                values: values.clone(),
                keywords,
            },
            TypeKind::Union {
                discriminator,
                variants,
            } => SchemaNode::OneOf {
                variants: variants
                    .iter()
                    .map(|variant| variant_entry(discriminator, variant))
                    .collect(),
                keywords,
            },
        }
    }

    fn type_annotations(&self, descriptor: &TypeDescriptor) -> Keywords {
        let title = descriptor.title.clone().or_else(|| match self.config.title {
            TitlePolicy::TypeName => Some(descriptor.name.nested_name()),
            TitlePolicy::None => None,
        });
        Keywords {
            title,
            description: self.documentation(&descriptor.description),
            ..Keywords::default()
        }
    }

    fn documentation(&self, text: &Option<String>) -> Option<String> {
        match self.config.description {
            DescriptionPolicy::Documentation => text.clone(),
            DescriptionPolicy::None => None,
        }
    }

    /// A nullable property dropped by the serializer when null is never
    /// required, even in strict mode.
    fn is_required(&self, property: &PropertyDescriptor) -> bool {
        let omitted_when_null = property.nullable && self.config.null_inclusion == NullInclusion::Omit;
        property.is_required(self.config.strict_mode) && !omitted_when_null
    }

    fn property(&self, owner: &TypeDescriptor, property: &PropertyDescriptor) -> SchemaNode {
        let location = format!("{}.{}", owner.name, property.name);
        let mapped = self
            .mapper
            .map(&location, self.shape(&property.type_ref), &property.constraints);

        let mut node = if mapped.null_only {
            SchemaNode::Null(Keywords::default())
        } else {
            let mut node = self.type_ref(&property.type_ref);
            node.value_keywords_mut().merge(mapped.keywords);
            self.apply_item_constraints(&location, property, &mut node);
            node
        };

        node.value_keywords_mut().merge(Keywords {
            description: self.documentation(&property.description),
            default: property.default.clone(),
            deprecated: property.deprecated,
            read_only: property.read_only,
            write_only: property.write_only,
            ..Keywords::default()
        });
        node
    }

    /// Constraints declared for the elements of a list, set or map.
    fn apply_item_constraints(&self, location: &str, property: &PropertyDescriptor, node: &mut SchemaNode) {
        if property.item_constraints.is_empty() {
            return;
        }
        let target = match (property.type_ref.non_null(), node.value_mut()) {
            (TypeRef::Array { items: item_ref, .. }, SchemaNode::Array { items, .. }) => {
                Some((format!("{location}.items"), &**item_ref, &mut **items))
            }
            (TypeRef::Map { values: value_ref }, SchemaNode::Object(object)) => object
                .additional_properties
                .as_deref_mut()
                .map(|values| (format!("{location}.values"), &**value_ref, values)),
            _ => None,
        };

        match target {
            Some((item_location, item_ref, item_node)) => {
                let mapped = self
                    .mapper
                    .map(&item_location, self.shape(item_ref), &property.item_constraints);
                apply_mapped(item_node, mapped);
            }
            None => {
                for constraint in &property.item_constraints {
                    self.diagnostics.record(
                        DiagnosticKind::InapplicableConstraint,
                        location,
                        format!(
                            "item constraint '{}' declared on a value that is not a collection",
                            constraint.kind_name()
                        ),
                    );
                }
            }
        }
    }

    /// Shape used for constraint mapping; binary values rendered as arrays
    /// take array constraints.
    fn shape(&self, type_ref: &TypeRef) -> Shape {
        match type_ref.non_null() {
            TypeRef::Scalar(ScalarType::Bytes) if self.config.binary_as_array => Shape::Array,
            other => other.shape(),
        }
    }

    /// Structural node for a type reference.
    pub fn type_ref(&self, type_ref: &TypeRef) -> SchemaNode {
        match type_ref {
            TypeRef::Scalar(scalar) => self.scalar(*scalar),
            TypeRef::Named(name) => SchemaNode::Nominal {
                name: name.clone(),
                keywords: Keywords::default(),
            },
            TypeRef::Array { items, unique } => SchemaNode::Array {
                items: Box::new(self.type_ref(items)),
                keywords: Keywords {
                    unique_items: *unique,
                    ..Keywords::default()
                },
            },
            TypeRef::Map { values } => SchemaNode::Object(ObjectNode {
                typed: true,
                additional_properties: Some(Box::new(self.type_ref(values))),
                ..ObjectNode::default()
            }),
            TypeRef::Nullable(inner) => match self.config.null_inclusion {
                NullInclusion::Include => SchemaNode::Nullable(Box::new(self.type_ref(inner))),
                NullInclusion::Omit => self.type_ref(inner),
            },
            TypeRef::Any => SchemaNode::Any(Keywords::default()),
        }
    }

    fn scalar(&self, scalar: ScalarType) -> SchemaNode {
        if scalar == ScalarType::Bytes {
            if self.config.binary_as_array {
                let octet = SchemaNode::Scalar {
                    primitive: Primitive::Integer,
                    keywords: Keywords {
                        minimum: Some(Number::from(0)),
                        maximum: Some(Number::from(255)),
                        ..Keywords::default()
                    },
                };
                return SchemaNode::Array {
                    items: Box::new(octet),
                    keywords: Keywords::default(),
                };
            }
            return SchemaNode::Scalar {
                primitive: Primitive::String,
                keywords: Keywords {
                    content_encoding: Some(BINARY_ENCODING.to_string()),
                    ..Keywords::default()
                },
            };
        }
        SchemaNode::Scalar {
            primitive: scalar.primitive(),
            keywords: Keywords {
                format: scalar.format().map(str::to_string),
                ..Keywords::default()
            },
        }
    }
}

fn apply_mapped(node: &mut SchemaNode, mapped: MappedConstraints) {
    if mapped.null_only {
        *node = SchemaNode::Null(Keywords::default());
    } else {
        node.value_keywords_mut().merge(mapped.keywords);
    }
}

/// `{"allOf": [{"$ref": variant}], "properties": {disc: {"const": tag}}, "required": [disc]}`
fn variant_entry(discriminator: &str, variant: &UnionVariant) -> SchemaNode {
    let tag = SchemaNode::Any(Keywords {
        const_value: Some(Value::String(variant.tag.clone())),
        ..Keywords::default()
    });
    let mut entry = ObjectNode {
        typed: false,
        all_of: vec![SchemaNode::Nominal {
            name: variant.target.clone(),
            keywords: Keywords::default(),
        }],
        required: vec![discriminator.to_string()],
        ..ObjectNode::default()
    };
    entry.properties.insert(discriminator.to_string(), tag);
    SchemaNode::Object(entry)
}
