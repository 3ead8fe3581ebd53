//! Trait definitions
//!
//! A [`TraitDefinition`] describes one named, typed property of a model
//! class: its kind (which fixes both the JSON codec and the merge rule),
//! whether `null` is accepted, and for string-valued traits an optional
//! set of allowed values.
//!
//! | Kind | Value shape | Merge across strata |
//! |------|-------------|---------------------|
//! | Primitive | scalar (or any JSON for `Any`) | top-most value wins |
//! | Object | object of nested traits | field by field |
//! | ObjectArray | array of objects keyed by an id | element by element |
//! | EnumArray | array of scalars | top-most array wins |

use crate::schema::Schema;
use std::fmt;
use std::sync::Arc;
use stratified_core::limits::check_array_size;
use stratified_core::{ObjectValue, RawValue, Result, TraitError};
use tracing::debug;

/// Scalar type of a Primitive or EnumArray trait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// UTF-8 string
    String,
    /// Integer or float (no coercion between them)
    Number,
    /// Integer only
    Integer,
    /// Boolean
    Boolean,
    /// Any JSON value, stored as-is
    Any,
}

impl PrimitiveType {
    /// Type name used in schema violations
    pub const fn name(&self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Number => "number",
            PrimitiveType::Integer => "integer",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Any => "any",
        }
    }

    /// Whether a non-null value has this type
    ///
    /// Non-finite floats have no JSON form and are never accepted.
    pub fn accepts(&self, value: &RawValue) -> bool {
        if non_finite(value).is_some() {
            return false;
        }
        matches!(
            (self, value),
            (PrimitiveType::Any, _)
                | (PrimitiveType::String, RawValue::String(_))
                | (PrimitiveType::Number, RawValue::Int(_) | RawValue::Float(_))
                | (PrimitiveType::Integer, RawValue::Int(_))
                | (PrimitiveType::Boolean, RawValue::Bool(_))
        )
    }
}

/// First NaN or infinite float in `value`, searching nested values
fn non_finite(value: &RawValue) -> Option<f64> {
    match value {
        RawValue::Float(f) if !f.is_finite() => Some(*f),
        RawValue::Array(items) => items.iter().find_map(non_finite),
        RawValue::Object(fields) => fields.values().find_map(non_finite),
        _ => None,
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How elements of an ObjectArray are matched across strata
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdProperty {
    /// Elements are matched by the value of this field (string or integer)
    Key(String),
    /// Elements are matched by their position within each stratum's array
    Index,
}

/// How ObjectArray elements combine across strata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Union of ids; each element merged field by field
    #[default]
    All,
    /// Only ids present in the top-most defining stratum survive; fields still merge
    TopStratum,
    /// Union of ids; each element taken whole from the highest stratum defining it
    None,
}

/// Marks ObjectArray elements that remove an id rather than define it
#[derive(Clone, Copy)]
pub enum RemovalMarker {
    /// An element whose boolean field is `true` is a removal
    Flag(&'static str),
    /// Custom predicate and writer
    Custom {
        /// Returns true for removal elements
        is_removal: fn(&ObjectValue) -> bool,
        /// Turns an element into a removal element
        mark: fn(&mut ObjectValue),
    },
}

impl fmt::Debug for RemovalMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalMarker::Flag(field) => f.debug_tuple("Flag").field(field).finish(),
            RemovalMarker::Custom { .. } => f.write_str("Custom"),
        }
    }
}

impl RemovalMarker {
    /// Whether `element` is a removal element
    pub fn is_removal(&self, element: &ObjectValue) -> bool {
        match self {
            RemovalMarker::Flag(field) => matches!(element.get(*field), Some(RawValue::Bool(true))),
            RemovalMarker::Custom { is_removal, .. } => is_removal(element),
        }
    }

    /// Mark `element` as a removal
    pub fn mark(&self, element: &mut ObjectValue) {
        match self {
            RemovalMarker::Flag(field) => {
                element.insert((*field).to_string(), RawValue::Bool(true));
            }
            RemovalMarker::Custom { mark, .. } => mark(element),
        }
    }
}

/// Configuration of an ObjectArray trait
#[derive(Debug, Clone)]
pub struct ObjectArrayKind {
    /// Schema of each element
    pub schema: Arc<Schema>,
    /// Element identity
    pub id_property: IdProperty,
    /// Merge strategy
    pub merge: MergeStrategy,
    /// Optional removal marker
    pub removal: Option<RemovalMarker>,
}

impl ObjectArrayKind {
    /// Identity of `element` found at `index` in one stratum's array
    pub fn element_id(&self, element: &RawValue, index: usize) -> Option<String> {
        match &self.id_property {
            IdProperty::Index => Some(index.to_string()),
            IdProperty::Key(field) => match element.as_object()?.get(field)? {
                RawValue::String(s) => Some(s.clone()),
                RawValue::Int(i) => Some(i.to_string()),
                _ => None,
            },
        }
    }

    /// Whether `element` is a removal element
    pub fn is_removal(&self, element: &RawValue) -> bool {
        match (&self.removal, element.as_object()) {
            (Some(marker), Some(fields)) => marker.is_removal(fields),
            _ => false,
        }
    }

    /// Typed id value to store in the id field for `element_id`
    ///
    /// Integer-typed id fields get an integer when the id parses as one.
    pub fn id_value(&self, element_id: &str) -> RawValue {
        if let IdProperty::Key(field) = &self.id_property {
            let integer_id = self
                .schema
                .get(field)
                .map(|def| matches!(def.kind(), TraitKind::Primitive(PrimitiveType::Integer)))
                .unwrap_or(false);
            if integer_id {
                if let Ok(i) = element_id.parse::<i64>() {
                    return RawValue::Int(i);
                }
            }
        }
        RawValue::String(element_id.to_string())
    }
}

/// Kind of a trait: fixes its codec and merge rule
#[derive(Debug, Clone)]
pub enum TraitKind {
    /// Scalar (or opaque JSON for `Any`)
    Primitive(PrimitiveType),
    /// Object of nested traits
    Object(Arc<Schema>),
    /// Array of objects with identity
    ObjectArray(ObjectArrayKind),
    /// Array of scalars without identity
    EnumArray(PrimitiveType),
}

impl TraitKind {
    /// Short kind name
    pub const fn name(&self) -> &'static str {
        match self {
            TraitKind::Primitive(_) => "primitive",
            TraitKind::Object(_) => "object",
            TraitKind::ObjectArray(_) => "objectArray",
            TraitKind::EnumArray(_) => "enumArray",
        }
    }
}

/// One named, typed property of a model class
#[derive(Debug, Clone)]
pub struct TraitDefinition {
    id: String,
    name: String,
    description: String,
    kind: TraitKind,
    nullable: bool,
    allowed_values: Option<Vec<String>>,
}

impl TraitDefinition {
    fn new(id: impl Into<String>, kind: TraitKind) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            kind,
            nullable: false,
            allowed_values: None,
        }
    }

    /// Primitive trait of the given scalar type
    pub fn primitive(id: impl Into<String>, ty: PrimitiveType) -> Self {
        Self::new(id, TraitKind::Primitive(ty))
    }

    /// Object trait whose fields are described by `schema`
    pub fn object(id: impl Into<String>, schema: Arc<Schema>) -> Self {
        Self::new(id, TraitKind::Object(schema))
    }

    /// ObjectArray trait; elements are described by `schema`
    pub fn object_array(
        id: impl Into<String>,
        schema: Arc<Schema>,
        id_property: IdProperty,
    ) -> Self {
        Self::new(
            id,
            TraitKind::ObjectArray(ObjectArrayKind {
                schema,
                id_property,
                merge: MergeStrategy::All,
                removal: None,
            }),
        )
    }

    /// EnumArray trait of scalars
    pub fn enum_array(id: impl Into<String>, element: PrimitiveType) -> Self {
        Self::new(id, TraitKind::EnumArray(element))
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Accept `null` as an explicit value
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Restrict string values (or EnumArray string elements) to a fixed set
    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Set the ObjectArray merge strategy (ignored for other kinds)
    pub fn with_merge(mut self, merge: MergeStrategy) -> Self {
        if let TraitKind::ObjectArray(kind) = &mut self.kind {
            kind.merge = merge;
        }
        self
    }

    /// Set the ObjectArray removal marker (ignored for other kinds)
    pub fn with_removal(mut self, marker: RemovalMarker) -> Self {
        if let TraitKind::ObjectArray(kind) = &mut self.kind {
            kind.removal = Some(marker);
        }
        self
    }

    /// Property name, unique within a schema
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Kind
    pub fn kind(&self) -> &TraitKind {
        &self.kind
    }

    /// Whether `null` is accepted
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Allowed string values, if restricted
    pub fn allowed_values(&self) -> Option<&[String]> {
        self.allowed_values.as_deref()
    }

    /// ObjectArray configuration, if this is an ObjectArray trait
    pub fn as_object_array(&self) -> Option<&ObjectArrayKind> {
        match &self.kind {
            TraitKind::ObjectArray(kind) => Some(kind),
            _ => None,
        }
    }

    /// Nested schema of an Object trait or ObjectArray element
    pub fn nested_schema(&self) -> Option<&Arc<Schema>> {
        match &self.kind {
            TraitKind::Object(schema) => Some(schema),
            TraitKind::ObjectArray(kind) => Some(&kind.schema),
            _ => None,
        }
    }

    /// Human-readable expected shape
    pub fn expected(&self) -> String {
        let base = match &self.kind {
            TraitKind::Primitive(ty) => ty.name().to_string(),
            TraitKind::Object(_) => "object".to_string(),
            TraitKind::ObjectArray(_) => "array of objects".to_string(),
            TraitKind::EnumArray(ty) => format!("array of {}", ty.name()),
        };
        if self.nullable {
            format!("{} or null", base)
        } else {
            base
        }
    }

    fn accepts_null(&self) -> bool {
        self.nullable || matches!(self.kind, TraitKind::Primitive(PrimitiveType::Any))
    }

    // ========== Validation (write boundary) ==========

    /// Check that `value` has the shape this definition requires
    ///
    /// `path` names the value in errors (the trait id at top level).
    /// Nested fields absent from the nested schema are rejected.
    pub fn validate(&self, path: &str, value: &RawValue) -> Result<()> {
        if value.is_null() {
            if self.accepts_null() {
                return Ok(());
            }
            return Err(TraitError::violation(path, self.expected(), "null"));
        }
        let mismatch = || TraitError::violation(path, self.expected(), value.type_name());
        match &self.kind {
            TraitKind::Primitive(ty) => self.validate_scalar(path, *ty, value),
            TraitKind::Object(schema) => {
                let fields = value.as_object().ok_or_else(mismatch)?;
                validate_fields(schema, path, fields)
            }
            TraitKind::ObjectArray(kind) => {
                let items = value.as_array().ok_or_else(mismatch)?;
                check_array_size(items.len())?;
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{}[{}]", path, i);
                    let fields = item.as_object().ok_or_else(|| {
                        TraitError::violation(&item_path, "object", item.type_name())
                    })?;
                    validate_fields(&kind.schema, &item_path, fields)?;
                    if let IdProperty::Key(field) = &kind.id_property {
                        check_element_id(&item_path, field, fields)?;
                    }
                }
                Ok(())
            }
            TraitKind::EnumArray(ty) => {
                let items = value.as_array().ok_or_else(mismatch)?;
                check_array_size(items.len())?;
                for (i, item) in items.iter().enumerate() {
                    self.validate_scalar(&format!("{}[{}]", path, i), *ty, item)?;
                }
                Ok(())
            }
        }
    }

    fn validate_scalar(&self, path: &str, ty: PrimitiveType, value: &RawValue) -> Result<()> {
        if let Some(f) = non_finite(value) {
            return Err(TraitError::violation(path, "finite number", f.to_string()));
        }
        if !ty.accepts(value) {
            return Err(TraitError::violation(path, ty.name(), value.type_name()));
        }
        if let (Some(allowed), RawValue::String(s)) = (&self.allowed_values, value) {
            if !allowed.iter().any(|a| a == s) {
                return Err(TraitError::violation(
                    path,
                    format!("one of [{}]", allowed.join(", ")),
                    format!("\"{}\"", s),
                ));
            }
        }
        Ok(())
    }

    // ========== JSON codec ==========

    /// Decode a JSON value for this trait
    ///
    /// Returns the decoded value (if any part of it survived) together with
    /// every problem found. Nested failures drop only the offending field or
    /// element. Unknown nested keys are skipped, or reported as
    /// `UnknownProperty` when `strict` is set.
    pub fn from_json(
        &self,
        json: &serde_json::Value,
        strict: bool,
    ) -> (Option<RawValue>, Vec<TraitError>) {
        let mut issues = Vec::new();
        let mut ctx = DecodeContext {
            strict,
            issues: &mut issues,
        };
        let value = self.decode(&self.id, json, &mut ctx);
        (value, issues)
    }

    pub(crate) fn decode(
        &self,
        path: &str,
        json: &serde_json::Value,
        ctx: &mut DecodeContext<'_>,
    ) -> Option<RawValue> {
        if json.is_null() {
            if self.accepts_null() {
                return Some(RawValue::Null);
            }
            ctx.issues
                .push(TraitError::violation(path, self.expected(), "null"));
            return None;
        }
        match &self.kind {
            TraitKind::Primitive(_) | TraitKind::EnumArray(_) => {
                let raw = RawValue::from(json.clone());
                match self.validate(path, &raw) {
                    Ok(()) => Some(raw),
                    Err(e) => {
                        ctx.issues.push(e);
                        None
                    }
                }
            }
            TraitKind::Object(schema) => {
                let Some(map) = json.as_object() else {
                    ctx.issues
                        .push(TraitError::violation(path, self.expected(), json_type_name(json)));
                    return None;
                };
                Some(RawValue::Object(decode_fields(schema, path, map, ctx)))
            }
            TraitKind::ObjectArray(kind) => {
                let Some(items) = json.as_array() else {
                    ctx.issues
                        .push(TraitError::violation(path, self.expected(), json_type_name(json)));
                    return None;
                };
                if let Err(e) = check_array_size(items.len()) {
                    ctx.issues.push(e.into());
                    return None;
                }
                let mut elements = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{}[{}]", path, i);
                    let Some(map) = item.as_object() else {
                        let actual = json_type_name(item);
                        ctx.issues
                            .push(TraitError::violation(&item_path, "object", actual));
                        continue;
                    };
                    let fields = decode_fields(&kind.schema, &item_path, map, ctx);
                    if let IdProperty::Key(field) = &kind.id_property {
                        if let Err(e) = check_element_id(&item_path, field, &fields) {
                            ctx.issues.push(e);
                            continue;
                        }
                    }
                    elements.push(RawValue::Object(fields));
                }
                Some(RawValue::Array(elements))
            }
        }
    }

    /// Encode a stored value as JSON
    ///
    /// Returns `None` when the value has no JSON form (non-finite floats).
    /// Nested fields are written in schema order.
    pub fn to_json(&self, value: &RawValue) -> Option<serde_json::Value> {
        match (&self.kind, value) {
            (_, RawValue::Null) => Some(serde_json::Value::Null),
            (_, RawValue::Float(f)) if !f.is_finite() => None,
            (TraitKind::Object(schema), RawValue::Object(fields)) => {
                Some(serde_json::Value::Object(encode_fields(schema, fields)))
            }
            (TraitKind::ObjectArray(kind), RawValue::Array(items)) => Some(serde_json::Value::Array(
                items
                    .iter()
                    .filter_map(|item| item.as_object())
                    .map(|fields| serde_json::Value::Object(encode_fields(&kind.schema, fields)))
                    .collect(),
            )),
            (_, other) => Some(other.to_json()),
        }
    }
}

pub(crate) struct DecodeContext<'a> {
    pub(crate) strict: bool,
    pub(crate) issues: &'a mut Vec<TraitError>,
}

fn validate_fields(schema: &Schema, path: &str, fields: &ObjectValue) -> Result<()> {
    for (key, value) in fields {
        let field_path = format!("{}.{}", path, key);
        let def = schema
            .get(key)
            .ok_or_else(|| TraitError::unknown_trait(schema.class(), &field_path))?;
        def.validate(&field_path, value)?;
    }
    Ok(())
}

fn check_element_id(path: &str, field: &str, fields: &ObjectValue) -> Result<()> {
    match fields.get(field) {
        Some(RawValue::String(_)) | Some(RawValue::Int(_)) => Ok(()),
        Some(other) => Err(TraitError::violation(
            format!("{}.{}", path, field),
            "string or integer id",
            other.type_name(),
        )),
        None => Err(TraitError::violation(
            format!("{}.{}", path, field),
            "string or integer id",
            "missing",
        )),
    }
}

fn decode_fields(
    schema: &Schema,
    path: &str,
    map: &serde_json::Map<String, serde_json::Value>,
    ctx: &mut DecodeContext<'_>,
) -> ObjectValue {
    let mut fields = ObjectValue::new();
    for (key, json) in map {
        let field_path = format!("{}.{}", path, key);
        match schema.get(key) {
            Some(def) => {
                if let Some(value) = def.decode(&field_path, json, ctx) {
                    fields.insert(key.clone(), value);
                }
            }
            None if ctx.strict => ctx.issues.push(TraitError::UnknownProperty {
                model_type: schema.class().to_string(),
                property: field_path,
            }),
            None => {
                debug!(
                    target: "stratified::load",
                    property = %field_path,
                    "Ignoring unknown nested property"
                );
            }
        }
    }
    fields
}

fn encode_fields(
    schema: &Schema,
    fields: &ObjectValue,
) -> serde_json::Map<String, serde_json::Value> {
    let mut out = serde_json::Map::new();
    for def in schema.iter() {
        if let Some(json) = fields.get(def.id()).and_then(|value| def.to_json(value)) {
            out.insert(def.id().to_string(), json);
        }
    }
    out
}

/// Runtime type name of a JSON value, matching [`RawValue::type_name`]
pub fn json_type_name(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(n) if n.is_i64() => "integer",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
