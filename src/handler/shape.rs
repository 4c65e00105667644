//! Runtime type descriptors for handler signatures.
//!
//! A [`TypeShape`] is the piece of type information the validator needs: is
//! this position a record, a channel, an error, an integer? Typed handlers get
//! their input shape from [`probe`], which drives the type's `Deserialize`
//! implementation against a recording deserializer instead of real data.
//!
//! The probe only follows what serde exposes: record name and field names come
//! from `deserialize_struct`, a field's kind comes from the first
//! `deserialize_*` call its own implementation makes. Nested records report
//! their field names with [`TypeShape::Unknown`] kinds.
//!
//! Each field is inspected twice, once as a binary format sees it and once as
//! a human-readable one, since `with` helpers such as
//! [`base64_bytes`](crate::codec::base64_bytes) ask for different things
//! depending on [`Deserializer::is_human_readable`].

use std::any::type_name;
use std::cell::RefCell;
use std::fmt;

use serde::de::{
    self, DeserializeOwned, DeserializeSeed, Deserializer, IntoDeserializer, MapAccess, SeqAccess,
    Visitor,
};

use super::signature::Signature;

/// Descriptor of one position in a handler signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeShape {
    Bool,
    /// Any integer wider than a byte.
    Int,
    /// A single `u8`.
    Byte,
    Float,
    Str,
    /// A native byte buffer (`serde_bytes`, `base64_bytes`).
    Bytes,
    Seq(Box<TypeShape>),
    Struct(StructShape),
    /// An owned record handed to or returned from a handler.
    Pointer(Box<TypeShape>),
    Chan(Box<TypeShape>),
    /// The polymorphic "any message" reply.
    Interface,
    /// A value implementing `std::error::Error`.
    Error,
    Func(Signature),
    /// Something the validator has no use for, by name.
    Other(String),
    /// Not probed.
    Unknown,
}

/// Record type: qualified name plus its fields in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructShape {
    pub name: String,
    pub fields: Vec<FieldShape>,
}

/// One field of a record, named as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldShape {
    pub name: String,
    /// Kind as seen by binary formats (MessagePack).
    pub shape: TypeShape,
    /// Kind as seen by human-readable formats (JSON).
    pub readable: TypeShape,
}

impl TypeShape {
    /// Wrap `inner` in a pointer.
    pub fn pointer(inner: TypeShape) -> Self {
        TypeShape::Pointer(Box::new(inner))
    }

    /// Wrap `inner` in a channel.
    pub fn chan(inner: TypeShape) -> Self {
        TypeShape::Chan(Box::new(inner))
    }

    /// A record with no known fields.
    pub fn record(name: impl Into<String>) -> Self {
        TypeShape::Struct(StructShape {
            name: name.into(),
            fields: Vec::new(),
        })
    }

    /// Element type for pointers, channels and sequences.
    pub fn elem(&self) -> Option<&TypeShape> {
        match self {
            TypeShape::Pointer(inner) | TypeShape::Chan(inner) | TypeShape::Seq(inner) => {
                Some(inner)
            }
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructShape> {
        match self {
            TypeShape::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// True for native byte buffers and sequences of `u8`.
    pub fn is_byte_sequence(&self) -> bool {
        match self {
            TypeShape::Bytes => true,
            TypeShape::Seq(inner) => **inner == TypeShape::Byte,
            _ => false,
        }
    }
}

impl StructShape {
    /// Add a field (builder style, for hand-written descriptors).
    pub fn field(mut self, name: impl Into<String>, shape: TypeShape) -> Self {
        self.fields.push(FieldShape {
            name: name.into(),
            readable: shape.clone(),
            shape,
        });
        self
    }
}

impl From<StructShape> for TypeShape {
    fn from(s: StructShape) -> Self {
        TypeShape::Struct(s)
    }
}

impl fmt::Display for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeShape::Bool => f.write_str("bool"),
            TypeShape::Int => f.write_str("int"),
            TypeShape::Byte => f.write_str("u8"),
            TypeShape::Float => f.write_str("float"),
            TypeShape::Str => f.write_str("string"),
            TypeShape::Bytes => f.write_str("bytes"),
            TypeShape::Seq(inner) => write!(f, "[{inner}]"),
            TypeShape::Struct(s) => f.write_str(&s.name),
            TypeShape::Pointer(inner) => write!(f, "*{inner}"),
            TypeShape::Chan(inner) => write!(f, "chan {inner}"),
            TypeShape::Interface => f.write_str("any"),
            TypeShape::Error => f.write_str("error"),
            TypeShape::Func(sig) => write!(f, "{sig}"),
            TypeShape::Other(name) => f.write_str(name),
            TypeShape::Unknown => f.write_str("?"),
        }
    }
}

/// Build the shape of `T` from its `Deserialize` implementation.
///
/// Records get the fully qualified Rust type name and one probed entry per
/// field. Anything else is reported as the shape of its first deserialize
/// call.
pub fn probe<T: DeserializeOwned>() -> TypeShape {
    let slot = RefCell::new(None);
    // always fails; the value is never produced
    let _ = T::deserialize(ValueProbe {
        slot: &slot,
        readable: false,
    });

    match slot.into_inner() {
        Some(TypeShape::Struct(mut record)) => {
            record.name = type_name::<T>().to_string();
            for field in &mut record.fields {
                field.shape = field_shape::<T>(&field.name, false);
                field.readable = field_shape::<T>(&field.name, true);
            }
            TypeShape::Struct(record)
        }
        Some(shape) => shape,
        None => TypeShape::Other(type_name::<T>().to_string()),
    }
}

/// Kind of one field of `T`, read through a record holding only that field.
fn field_shape<T: DeserializeOwned>(field: &str, readable: bool) -> TypeShape {
    let slot = RefCell::new(None);
    let _ = T::deserialize(FieldProbe {
        field,
        slot: &slot,
        readable,
    });
    slot.into_inner().unwrap_or(TypeShape::Unknown)
}

/// Error used to abort deserialization once the shape is recorded.
#[derive(Debug)]
struct ProbeError(String);

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ProbeError {}

impl de::Error for ProbeError {
    fn custom<M: fmt::Display>(msg: M) -> Self {
        ProbeError(msg.to_string())
    }
}

fn recorded() -> ProbeError {
    ProbeError("shape recorded".to_string())
}

/// Records the shape of whatever is deserialized from it.
struct ValueProbe<'a> {
    slot: &'a RefCell<Option<TypeShape>>,
    readable: bool,
}

impl<'a> ValueProbe<'a> {
    fn record<V>(self, shape: TypeShape) -> Result<V, ProbeError> {
        *self.slot.borrow_mut() = Some(shape);
        Err(recorded())
    }
}

macro_rules! record_as {
    ($($method:ident => $shape:expr),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, ProbeError> {
                self.record($shape)
            }
        )*
    };
}

impl<'de, 'a> Deserializer<'de> for ValueProbe<'a> {
    type Error = ProbeError;

    record_as! {
        deserialize_any => TypeShape::Other("any".to_string()),
        deserialize_bool => TypeShape::Bool,
        deserialize_i8 => TypeShape::Int,
        deserialize_i16 => TypeShape::Int,
        deserialize_i32 => TypeShape::Int,
        deserialize_i64 => TypeShape::Int,
        deserialize_i128 => TypeShape::Int,
        deserialize_u8 => TypeShape::Byte,
        deserialize_u16 => TypeShape::Int,
        deserialize_u32 => TypeShape::Int,
        deserialize_u64 => TypeShape::Int,
        deserialize_u128 => TypeShape::Int,
        deserialize_f32 => TypeShape::Float,
        deserialize_f64 => TypeShape::Float,
        deserialize_char => TypeShape::Str,
        deserialize_str => TypeShape::Str,
        deserialize_string => TypeShape::Str,
        deserialize_bytes => TypeShape::Bytes,
        deserialize_byte_buf => TypeShape::Bytes,
        deserialize_option => TypeShape::Other("option".to_string()),
        deserialize_unit => TypeShape::Other("()".to_string()),
        deserialize_map => TypeShape::Other("map".to_string()),
        deserialize_identifier => TypeShape::Other("identifier".to_string()),
        deserialize_ignored_any => TypeShape::Other("any".to_string()),
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _visitor: V,
    ) -> Result<V::Value, ProbeError> {
        self.record(TypeShape::record(name))
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, ProbeError> {
        // transparent: the wrapper records whatever its inner value asks for
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ProbeError> {
        let inner = RefCell::new(None);
        let result = visitor.visit_seq(ElementProbe {
            slot: &inner,
            readable: self.readable,
        });
        let elem = inner.into_inner().unwrap_or(TypeShape::Unknown);
        *self.slot.borrow_mut() = Some(TypeShape::Seq(Box::new(elem)));
        result
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, ProbeError> {
        self.record(TypeShape::Other("tuple".to_string()))
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, ProbeError> {
        self.record(TypeShape::Other(format!("tuple struct {name}")))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, ProbeError> {
        let fields = fields
            .iter()
            .map(|f| FieldShape {
                name: (*f).to_string(),
                shape: TypeShape::Unknown,
                readable: TypeShape::Unknown,
            })
            .collect();
        self.record(TypeShape::Struct(StructShape {
            name: name.to_string(),
            fields,
        }))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, ProbeError> {
        self.record(TypeShape::Other(format!("enum {name}")))
    }

    fn is_human_readable(&self) -> bool {
        self.readable
    }
}

/// Hands a single element probe to a sequence visitor.
struct ElementProbe<'a> {
    slot: &'a RefCell<Option<TypeShape>>,
    readable: bool,
}

impl<'de, 'a> SeqAccess<'de> for ElementProbe<'a> {
    type Error = ProbeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, ProbeError> {
        seed.deserialize(ValueProbe {
            slot: self.slot,
            readable: self.readable,
        })
        .map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(1)
    }
}

/// Presents a record containing only `field`, and probes that field's value.
struct FieldProbe<'a> {
    field: &'a str,
    slot: &'a RefCell<Option<TypeShape>>,
    readable: bool,
}

impl<'de, 'a> Deserializer<'de> for FieldProbe<'a> {
    type Error = ProbeError;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, ProbeError> {
        Err(ProbeError("not a record".to_string()))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ProbeError> {
        visitor.visit_map(SingleFieldMap {
            field: Some(self.field),
            slot: self.slot,
            readable: self.readable,
        })
    }

    fn is_human_readable(&self) -> bool {
        self.readable
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier ignored_any
    }
}

struct SingleFieldMap<'a> {
    field: Option<&'a str>,
    slot: &'a RefCell<Option<TypeShape>>,
    readable: bool,
}

impl<'de, 'a> MapAccess<'de> for SingleFieldMap<'a> {
    type Error = ProbeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, ProbeError> {
        match self.field.take() {
            Some(field) => {
                let key: de::value::StrDeserializer<'_, ProbeError> = field.into_deserializer();
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, ProbeError> {
        seed.deserialize(ValueProbe {
            slot: self.slot,
            readable: self.readable,
        })
    }
}
