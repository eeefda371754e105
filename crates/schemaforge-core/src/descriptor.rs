//! # Type and Property Descriptors
//!
//! The language-independent structural model the generator works from.
//! Descriptors are produced by the extractor from declarations and are
//! immutable afterwards.
//!
//! Nominal types (named, reusable) are [`TypeDescriptor`]s and end up as
//! separate schema definitions. Structural shapes (scalars, collections,
//! nullability) are [`TypeRef`]s and are folded into whatever references
//! them.

use serde::{Deserialize, Serialize};

use crate::constraint::ConstraintDescriptor;
use crate::identity::TypeName;

/// Primitive JSON Schema `type` a value maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    String,
    Integer,
    Number,
    Boolean,
}

impl Primitive {
    /// The JSON Schema `type` keyword value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// Scalar types understood by the type-expression grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    String,
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    BigInteger,
    Float,
    Double,
    Decimal,
    Uuid,
    DateTime,
    Date,
    Uri,
    /// Binary payload; a base64 string unless configured as an integer array.
    Bytes,
}

impl ScalarType {
    /// Look up a scalar by its type-expression keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let scalar = match keyword {
            "string" | "char" => Self::String,
            "boolean" | "bool" => Self::Boolean,
            "byte" => Self::Byte,
            "short" => Self::Short,
            "int" => Self::Int,
            "long" => Self::Long,
            "integer" | "biginteger" => Self::BigInteger,
            "float" => Self::Float,
            "double" => Self::Double,
            "decimal" | "number" => Self::Decimal,
            "uuid" => Self::Uuid,
            "date-time" | "instant" | "datetime" => Self::DateTime,
            "date" => Self::Date,
            "uri" => Self::Uri,
            "bytes" => Self::Bytes,
            _ => return None,
        };
        Some(scalar)
    }

    /// Canonical keyword used when printing type expressions.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::BigInteger => "integer",
            Self::Float => "float",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::Uuid => "uuid",
            Self::DateTime => "date-time",
            Self::Date => "date",
            Self::Uri => "uri",
            Self::Bytes => "bytes",
        }
    }

    /// The JSON primitive a value of this scalar serializes to.
    pub fn primitive(&self) -> Primitive {
        match self {
            Self::String | Self::Uuid | Self::DateTime | Self::Date | Self::Uri | Self::Bytes => {
                Primitive::String
            }
            Self::Boolean => Primitive::Boolean,
            Self::Byte | Self::Short | Self::Int | Self::Long | Self::BigInteger => {
                Primitive::Integer
            }
            Self::Float | Self::Double | Self::Decimal => Primitive::Number,
        }
    }

    /// The JSON Schema `format` annotation, if the scalar has one.
    pub fn format(&self) -> Option<&'static str> {
        match self {
            Self::Uuid => Some("uuid"),
            Self::DateTime => Some("date-time"),
            Self::Date => Some("date"),
            Self::Uri => Some("uri"),
            _ => None,
        }
    }
}

/// Structural type reference: how a property (or element) refers to its type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    /// A scalar value.
    Scalar(ScalarType),
    /// A nominal type with its own definition.
    Named(TypeName),
    /// A list or set of elements.
    Array {
        /// Element type.
        items: Box<TypeRef>,
        /// Whether elements are unique (sets).
        unique: bool,
    },
    /// A string-keyed map.
    Map {
        /// Value type.
        values: Box<TypeRef>,
    },
    /// A value that may be `null`.
    Nullable(Box<TypeRef>),
    /// Any JSON value. Only produced when the configuration allows it.
    Any,
}

impl TypeRef {
    /// Whether the outermost wrapper admits `null`.
    pub fn is_nullable(&self) -> bool {
        matches!(self, Self::Nullable(_))
    }

    /// The reference with any outer nullable wrapper removed.
    pub fn non_null(&self) -> &TypeRef {
        match self {
            Self::Nullable(inner) => inner.non_null(),
            other => other,
        }
    }

    /// Consume the reference and drop any outer nullable wrapper.
    pub fn into_non_null(self) -> TypeRef {
        match self {
            Self::Nullable(inner) => inner.into_non_null(),
            other => other,
        }
    }

    /// The shape constraints are checked against.
    pub fn shape(&self) -> Shape {
        match self.non_null() {
            Self::Scalar(scalar) => match scalar.primitive() {
                Primitive::String => Shape::String,
                Primitive::Integer => Shape::Integer,
                Primitive::Number => Shape::Number,
                Primitive::Boolean => Shape::Boolean,
            },
            Self::Named(_) => Shape::Nominal,
            Self::Array { .. } => Shape::Array,
            Self::Map { .. } => Shape::Map,
            Self::Any | Self::Nullable(_) => Shape::Any,
        }
    }
}

/// Value shape used to decide which keywords a constraint maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Map,
    Nominal,
    Any,
}

impl Shape {
    /// Whether numeric bound keywords apply.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Number)
    }
}

/// When the serializer leaves a property out of the JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InclusionPolicy {
    /// Always written.
    #[default]
    Always,
    /// Omitted when `null`.
    NonNull,
    /// Omitted when `null` or absent.
    NonAbsent,
    /// Omitted when `null`, absent, or empty.
    NonEmpty,
    /// Omitted when equal to the type's default value.
    NonDefault,
}

impl InclusionPolicy {
    /// Whether the policy may drop a property that holds a non-null value.
    ///
    /// Such a property can never be listed in `required`.
    pub fn omits_present_values(&self) -> bool {
        matches!(self, Self::NonEmpty | Self::NonDefault)
    }
}

/// One property of an object type.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    /// Name of the property in JSON (after any rename).
    pub name: String,
    /// Name as declared, before renaming.
    pub declared_name: String,
    /// Declared type.
    pub type_ref: TypeRef,
    /// Whether the property admits `null`.
    pub nullable: bool,
    /// Constraints on the property value, in declaration order.
    pub constraints: Vec<ConstraintDescriptor>,
    /// Constraints on each element when the property is a collection.
    pub item_constraints: Vec<ConstraintDescriptor>,
    /// Serializer inclusion policy.
    pub inclusion: InclusionPolicy,
    /// Documentation.
    pub description: Option<String>,
    pub deprecated: bool,
    pub read_only: bool,
    pub write_only: bool,
    /// Declared default value.
    pub default: Option<serde_json::Value>,
}

impl PropertyDescriptor {
    /// Whether the property belongs in its object's `required` list.
    ///
    /// In strict mode every property is required unless its inclusion
    /// policy lets the serializer leave it out.
    pub fn is_required(&self, strict: bool) -> bool {
        if strict {
            self.inclusion == InclusionPolicy::Always
        } else {
            !self.nullable && !self.inclusion.omits_present_values()
        }
    }
}

/// A variant of a closed union.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionVariant {
    /// Discriminator value identifying the variant.
    pub tag: String,
    /// The variant's object type.
    pub target: TypeName,
}

/// The shape of a nominal type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// Named object with ordered properties.
    Object {
        properties: Vec<PropertyDescriptor>,
        /// Schema for keys not listed in `properties`.
        additional_properties: Option<TypeRef>,
    },
    /// String enumeration, values in declaration order.
    Enum { values: Vec<String> },
    /// Closed polymorphic type: exactly one of the variants.
    Union {
        /// Property carrying the variant tag.
        discriminator: String,
        variants: Vec<UnionVariant>,
    },
}

/// A nominal type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    /// Qualified identity.
    pub name: TypeName,
    /// Name used for the schema file and identifier (`Possum.Environment`).
    pub schema_name: String,
    pub kind: TypeKind,
    /// Explicit title; otherwise the title policy decides.
    pub title: Option<String>,
    pub description: Option<String>,
    /// Whether the type gets its own standalone document.
    pub root: bool,
}

impl TypeDescriptor {
    /// Properties of an object type; empty for other kinds.
    pub fn properties(&self) -> &[PropertyDescriptor] {
        match &self.kind {
            TypeKind::Object { properties, .. } => properties,
            _ => &[],
        }
    }
}
