use std::borrow::Cow;

use crate::dataset::{Code, StorageKind};

/// Outcome of testing a cell against its column's missingness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Present,
    /// No observed value (blank cell).
    SystemMissing,
    /// A present value declared missing; tagged on packages with letter tags.
    UserMissing(Option<char>),
}

/// Native payload carried by a typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<'a> {
    Double(f64),
    /// Day offset of a calendar column.
    Int32(i32),
    Str(Cow<'a, str>),
    /// System-missing cells carry nothing.
    Empty,
}

impl Payload<'_> {
    #[must_use]
    pub fn into_owned(self) -> Payload<'static> {
        match self {
            Payload::Double(v) => Payload::Double(v),
            Payload::Int32(v) => Payload::Int32(v),
            Payload::Str(s) => Payload::Str(Cow::Owned(s.into_owned())),
            Payload::Empty => Payload::Empty,
        }
    }

    /// The payload as a coded value, for comparison against missing specs
    /// and category codes.
    #[must_use]
    pub fn to_code(&self) -> Option<Code> {
        match self {
            Payload::Double(v) => Some(Code::Double(*v)),
            Payload::Int32(v) => Some(Code::Int32(*v)),
            Payload::Str(s) => Some(Code::Str(s.to_string())),
            Payload::Empty => None,
        }
    }
}

impl From<Code> for Payload<'static> {
    fn from(code: Code) -> Self {
        match code {
            Code::Double(v) => Payload::Double(v),
            Code::Int32(v) => Payload::Int32(v),
            Code::Str(s) => Payload::Str(Cow::Owned(s)),
        }
    }
}

/// One converted cell, handed to the sink and then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue<'a> {
    pub kind: StorageKind,
    pub classification: Classification,
    pub payload: Payload<'a>,
}

impl<'a> TypedValue<'a> {
    #[must_use]
    pub const fn system_missing(kind: StorageKind) -> Self {
        Self {
            kind,
            classification: Classification::SystemMissing,
            payload: Payload::Empty,
        }
    }

    #[must_use]
    pub const fn new(kind: StorageKind, classification: Classification, payload: Payload<'a>) -> Self {
        Self {
            kind,
            classification,
            payload,
        }
    }

    #[must_use]
    pub const fn is_system_missing(&self) -> bool {
        matches!(self.classification, Classification::SystemMissing)
    }

    #[must_use]
    pub const fn is_user_missing(&self) -> bool {
        matches!(self.classification, Classification::UserMissing(_))
    }

    #[must_use]
    pub const fn tag(&self) -> Option<char> {
        match self.classification {
            Classification::UserMissing(tag) => tag,
            _ => None,
        }
    }

    #[must_use]
    pub fn into_owned(self) -> TypedValue<'static> {
        TypedValue {
            kind: self.kind,
            classification: self.classification,
            payload: self.payload.into_owned(),
        }
    }
}
