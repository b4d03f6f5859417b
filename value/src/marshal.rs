use indexmap::IndexMap;

use crate::uv::UniversalValue;

/// Field-name rewriting applied during struct marshalling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldNameTransform {
    #[default]
    None,
    SnakeToCamel,
    CamelToSnake,
}

impl FieldNameTransform {
    pub fn apply(self, name: &str) -> String {
        match self {
            Self::None => name.to_string(),
            Self::SnakeToCamel => snake_to_camel(name),
            Self::CamelToSnake => camel_to_snake(name),
        }
    }
}

fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Options governing opt-in reflection-driven struct ↔ [`UniversalValue::Object`] marshalling.
#[derive(Debug, Clone)]
pub struct MarshalOptions {
    /// Fields whose name starts with `_` are excluded unless this is true.
    pub include_private: bool,
    /// Marshalling stops (returns a [`MarshalError::DepthExceeded`]) past this nesting depth.
    pub max_depth: usize,
    pub field_name_transform: FieldNameTransform,
}

impl Default for MarshalOptions {
    fn default() -> Self {
        Self {
            include_private: false,
            max_depth: 32,
            field_name_transform: FieldNameTransform::None,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MarshalError {
    #[error("marshalling exceeded max_depth ({0})")]
    DepthExceeded(usize),
    #[error("field '{0}' is private and include_private is false")]
    PrivateField(String),
    #[error("missing required field '{0}'")]
    MissingField(String),
    #[error("field '{field}' had unexpected shape: {reason}")]
    ShapeMismatch { field: String, reason: String },
}

/// Converts a host struct into a [`UniversalValue::Object`].
///
/// Implementations are expected to be derived (by hand here; a derive
/// macro is a documented, not yet implemented, extension point) one
/// field at a time, applying `options.field_name_transform` to each
/// field name and skipping leading-underscore fields unless
/// `options.include_private` is set.
pub trait ToUniversalValue {
    fn to_universal_value(&self, options: &MarshalOptions) -> Result<UniversalValue, MarshalError>;
}

/// Converts a [`UniversalValue::Object`] back into a host struct.
///
/// Round-trip law: for any `s` with only marshal-safe fields and
/// `options.max_depth >= s`'s depth, `T::from_universal_value(&s.to_universal_value(options)?, options) == Ok(s)`.
pub trait FromUniversalValue: Sized {
    fn from_universal_value(value: &UniversalValue, options: &MarshalOptions) -> Result<Self, MarshalError>;
}

/// A tagged union marshals as `{tag: variant_name, value: UV}`.
pub fn tagged_union(variant_name: &str, value: UniversalValue) -> UniversalValue {
    let mut fields = IndexMap::new();
    fields.insert("tag".to_string(), UniversalValue::from(variant_name));
    fields.insert("value".to_string(), value);
    UniversalValue::Object(fields)
}

/// Reads back a tagged union produced by [`tagged_union`].
pub fn from_tagged_union(value: &UniversalValue) -> Result<(String, &UniversalValue), MarshalError> {
    let UniversalValue::Object(fields) = value else {
        return Err(MarshalError::ShapeMismatch {
            field: "<root>".into(),
            reason: "expected an Object".into(),
        });
    };
    let tag = match fields.get("tag") {
        Some(UniversalValue::Str(bytes)) => String::from_utf8_lossy(bytes).into_owned(),
        _ => return Err(MarshalError::MissingField("tag".into())),
    };
    let inner = fields
        .get("value")
        .ok_or_else(|| MarshalError::MissingField("value".into()))?;
    Ok((tag, inner))
}

impl ToUniversalValue for UniversalValue {
    fn to_universal_value(&self, _options: &MarshalOptions) -> Result<UniversalValue, MarshalError> {
        Ok(self.clone())
    }
}

impl<T: ToUniversalValue> ToUniversalValue for Option<T> {
    fn to_universal_value(&self, options: &MarshalOptions) -> Result<UniversalValue, MarshalError> {
        match self {
            Some(inner) => inner.to_universal_value(options),
            None => Ok(UniversalValue::Nil),
        }
    }
}

impl<T: ToUniversalValue> ToUniversalValue for Vec<T> {
    fn to_universal_value(&self, options: &MarshalOptions) -> Result<UniversalValue, MarshalError> {
        if options.max_depth == 0 {
            return Err(MarshalError::DepthExceeded(options.max_depth));
        }
        let inner_options = MarshalOptions {
            max_depth: options.max_depth - 1,
            ..options.clone()
        };
        let items = self
            .iter()
            .map(|item| item.to_universal_value(&inner_options))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(UniversalValue::Array(items))
    }
}

impl<T: ToUniversalValue> ToUniversalValue for IndexMap<String, T> {
    fn to_universal_value(&self, options: &MarshalOptions) -> Result<UniversalValue, MarshalError> {
        if options.max_depth == 0 {
            return Err(MarshalError::DepthExceeded(options.max_depth));
        }
        let inner_options = MarshalOptions {
            max_depth: options.max_depth - 1,
            ..options.clone()
        };
        let mut fields = IndexMap::new();
        for (key, value) in self {
            if !options.include_private && key.starts_with('_') {
                continue;
            }
            let name = options.field_name_transform.apply(key);
            fields.insert(name, value.to_universal_value(&inner_options)?);
        }
        Ok(UniversalValue::Object(fields))
    }
}
