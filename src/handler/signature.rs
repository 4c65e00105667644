//! Handler contract validation.
//!
//! A [`Signature`] describes a handler function position by position. The
//! validators accept exactly two shapes:
//!
//! ```text
//! unary:     fn(*Record) -> (*Record | any, error)
//! streaming: fn(*Record) -> (chan (*Record | any), chan bool, error)
//! ```
//!
//! Each check is independent and the first failing position is reported, so
//! the caller knows exactly which part of its handler is wrong. Typed handlers
//! registered through [`ServiceProcessor`](crate::ServiceProcessor) have their
//! channel and error positions fixed by the compiler, so they exercise the
//! input and reply-record checks; hand-built signatures go through every
//! check.

use std::fmt;

use super::shape::TypeShape;
use crate::error::ContractError;

/// Function descriptor: argument shapes and return shapes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    pub inputs: Vec<TypeShape>,
    pub outputs: Vec<TypeShape>,
}

impl Signature {
    pub fn new(inputs: Vec<TypeShape>, outputs: Vec<TypeShape>) -> Self {
        Self { inputs, outputs }
    }

    /// Describe as a function shape.
    pub fn into_shape(self) -> TypeShape {
        TypeShape::Func(self)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |shapes: &[TypeShape]| {
            shapes
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(f, "fn({}) -> ({})", join(&self.inputs), join(&self.outputs))
    }
}

/// What a successful validation yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    /// Unqualified name of the input record.
    pub route: String,
    /// The input record (pointer stripped).
    pub input: TypeShape,
}

/// Validate a unary handler descriptor.
///
/// # Errors
///
/// Returns the [`ContractError`] of the first position that does not match.
pub fn validate_unary(handler: &TypeShape) -> Result<Contract, ContractError> {
    let sig = input_check(handler)?;

    if sig.outputs.len() != 2 {
        return Err(ContractError::ReplyCount);
    }

    let reply = &sig.outputs[0];
    if *reply != TypeShape::Interface {
        let Some(inner) = pointee(reply) else {
            return Err(ContractError::ReplyNotPointer);
        };
        if inner.as_struct().is_none() {
            return Err(ContractError::ReplyNotStruct);
        }
    }

    if sig.outputs[1] != TypeShape::Error {
        return Err(ContractError::ReplyErrorMissing(sig.outputs[1].to_string()));
    }

    contract(sig)
}

/// Validate a streaming handler descriptor.
///
/// # Errors
///
/// Returns the [`ContractError`] of the first position that does not match.
pub fn validate_streaming(handler: &TypeShape) -> Result<Contract, ContractError> {
    let sig = input_check(handler)?;

    if sig.outputs.len() != 3 {
        return Err(ContractError::StreamCount);
    }

    let TypeShape::Chan(item) = &sig.outputs[0] else {
        return Err(ContractError::StreamNotChannel);
    };
    if **item != TypeShape::Interface {
        let Some(inner) = pointee(item) else {
            return Err(ContractError::StreamItemNotPointer);
        };
        if inner.as_struct().is_none() {
            return Err(ContractError::StreamItemNotStruct);
        }
    }

    let TypeShape::Chan(signal) = &sig.outputs[1] else {
        return Err(ContractError::CloseNotChannel);
    };
    if **signal != TypeShape::Bool {
        return Err(ContractError::CloseNotBool);
    }

    if sig.outputs[2] != TypeShape::Error {
        return Err(ContractError::StreamErrorMissing(sig.outputs[2].to_string()));
    }

    contract(sig)
}

/// Derive the route key from a qualified type name.
///
/// Generic arguments are dropped and the last path segment is kept, so
/// `chain::msgs::GetBlock` and `msgs.GetBlock` both become `GetBlock`.
pub fn route_key(qualified: &str) -> &str {
    let base = qualified.split('<').next().unwrap_or(qualified);
    base.rsplit(|c: char| c == ':' || c == '.')
        .next()
        .unwrap_or(base)
}

/// Checks shared by both shapes: a function taking one owned record.
fn input_check(handler: &TypeShape) -> Result<&Signature, ContractError> {
    let TypeShape::Func(sig) = handler else {
        return Err(ContractError::NotAFunction);
    };
    if sig.inputs.len() != 1 {
        return Err(ContractError::ArgumentCount);
    }
    let Some(arg) = pointee(&sig.inputs[0]) else {
        return Err(ContractError::ArgumentNotPointer);
    };
    if arg.as_struct().is_none() {
        return Err(ContractError::ArgumentNotStruct);
    }
    Ok(sig)
}

fn pointee(shape: &TypeShape) -> Option<&TypeShape> {
    match shape {
        TypeShape::Pointer(inner) => Some(inner),
        _ => None,
    }
}

fn contract(sig: &Signature) -> Result<Contract, ContractError> {
    let input = pointee(&sig.inputs[0])
        .and_then(TypeShape::as_struct)
        .ok_or(ContractError::ArgumentNotStruct)?;

    Ok(Contract {
        route: route_key(&input.name).to_string(),
        input: TypeShape::Struct(input.clone()),
    })
}
