//! Declared arg types
//!
//! Provides [`ArgType`], the per-arg metadata a story declares (type,
//! control, allowed options, default), and the [`ArgTypes`] mapping.

use crate::value::{ArgValue, Args};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered mapping from arg name to declared type
pub type ArgTypes = IndexMap<String, ArgType>;

/// Structural type of an arg
///
/// Serialized with a `name` tag: `{"name": "array", "value": {"name": "string"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum SbType {
    /// Boolean flag
    Boolean,

    /// Free text
    String,

    /// Number
    Number,

    /// One of a fixed list of values
    Enum {
        /// Allowed values
        #[serde(default)]
        value: Vec<ArgValue>,
    },

    /// Homogeneous sequence
    Array {
        /// Element type
        value: Box<SbType>,
    },

    /// Mapping with typed fields
    Object {
        /// Field types; unknown fields pass through untyped
        #[serde(default)]
        value: IndexMap<String, SbType>,
    },

    /// Callback
    Function,

    /// Anything else (unions, intersections, host-specific types)
    Other {
        /// Raw type label
        #[serde(default)]
        value: Option<String>,
    },
}

impl SbType {
    /// Infer a type from a value
    ///
    /// Sequences take the type of their first element; empty sequences and
    /// nulls are typed `Other`.
    #[must_use]
    pub fn infer(value: &ArgValue) -> Self {
        match value {
            ArgValue::Bool(_) => Self::Boolean,
            ArgValue::Number(_) => Self::Number,
            ArgValue::String(_) => Self::String,
            ArgValue::Opaque(_) => Self::Function,
            ArgValue::Sequence(items) => match items.first() {
                Some(first) => Self::Array {
                    value: Box::new(Self::infer(first)),
                },
                None => Self::Array {
                    value: Box::new(Self::Other { value: None }),
                },
            },
            ArgValue::Mapping(fields) => Self::Object {
                value: fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::infer(v)))
                    .collect(),
            },
            ArgValue::Null => Self::Other {
                value: Some("null".to_string()),
            },
        }
    }
}

/// Editing control kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlKind {
    /// Single-line text input
    Text,
    /// Numeric input
    Number,
    /// Slider
    Range,
    /// Toggle
    Boolean,
    /// Color picker
    Color,
    /// Date picker
    Date,
    /// JSON editor
    Object,
    /// File picker
    File,
    /// Dropdown
    Select,
    /// Multi-select dropdown
    MultiSelect,
    /// Radio group
    Radio,
    /// Inline radio group
    InlineRadio,
    /// Checkbox group
    Check,
    /// Inline checkbox group
    InlineCheck,
}

/// Control declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    /// Control kind
    #[serde(rename = "type")]
    pub kind: ControlKind,

    /// Lower bound for numeric controls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    /// Upper bound for numeric controls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    /// Step for numeric controls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
}

impl Control {
    /// Create control of given kind
    #[inline]
    #[must_use]
    pub fn new(kind: ControlKind) -> Self {
        Self {
            kind,
            min: None,
            max: None,
            step: None,
        }
    }

    /// Value representation implied by the control
    ///
    /// Option-picking controls return `None`: their values pass through.
    #[must_use]
    pub fn implied_type(&self) -> Option<SbType> {
        match self.kind {
            ControlKind::Number | ControlKind::Range => Some(SbType::Number),
            ControlKind::Boolean => Some(SbType::Boolean),
            ControlKind::Text | ControlKind::Color | ControlKind::Date => Some(SbType::String),
            ControlKind::Object => Some(SbType::Object {
                value: IndexMap::new(),
            }),
            ControlKind::File => Some(SbType::Array {
                value: Box::new(SbType::String),
            }),
            ControlKind::Select
            | ControlKind::MultiSelect
            | ControlKind::Radio
            | ControlKind::InlineRadio
            | ControlKind::Check
            | ControlKind::InlineCheck => None,
        }
    }
}

/// Declared metadata for one arg
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgType {
    /// Arg name (filled from the mapping key during preparation)
    #[serde(default)]
    pub name: String,

    /// Structural type
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub sb_type: Option<SbType>,

    /// Editing control
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<Control>,

    /// Allowed values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ArgValue>>,

    /// Default value (used by global types)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<ArgValue>,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ArgType {
    /// Create arg type with name
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// With structural type
    #[inline]
    #[must_use]
    pub fn with_type(mut self, sb_type: SbType) -> Self {
        self.sb_type = Some(sb_type);
        self
    }

    /// With control
    #[inline]
    #[must_use]
    pub fn with_control(mut self, kind: ControlKind) -> Self {
        self.control = Some(Control::new(kind));
        self
    }

    /// With allowed options
    #[inline]
    #[must_use]
    pub fn with_options(mut self, options: Vec<ArgValue>) -> Self {
        self.options = Some(options);
        self
    }

    /// With default value
    #[inline]
    #[must_use]
    pub fn with_default(mut self, value: impl Into<ArgValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Type used when coercing raw values: the declared type, else the
    /// control's implied type
    #[must_use]
    pub fn effective_type(&self) -> Option<SbType> {
        self.sb_type
            .clone()
            .or_else(|| self.control.as_ref().and_then(Control::implied_type))
    }

    /// Deep-merge `other` over `self`; fields set in `other` win
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        Self {
            name: if other.name.is_empty() {
                self.name.clone()
            } else {
                other.name.clone()
            },
            sb_type: other.sb_type.clone().or_else(|| self.sb_type.clone()),
            control: other.control.clone().or_else(|| self.control.clone()),
            options: other.options.clone().or_else(|| self.options.clone()),
            default_value: other
                .default_value
                .clone()
                .or_else(|| self.default_value.clone()),
            description: other
                .description
                .clone()
                .or_else(|| self.description.clone()),
        }
    }
}

/// Merge arg type layers in order; later layers win per field
#[must_use]
pub fn merge_arg_types<'a>(layers: impl IntoIterator<Item = &'a ArgTypes>) -> ArgTypes {
    let mut merged = ArgTypes::new();
    for layer in layers {
        for (key, arg_type) in layer {
            let next = match merged.get(key) {
                Some(existing) => existing.merged(arg_type),
                None => arg_type.clone(),
            };
            merged.insert(key.clone(), next);
        }
    }
    merged
}

/// Add inferred arg types for args that declare none, and fill names
#[must_use]
pub fn infer_arg_types(args: &Args, declared: &ArgTypes) -> ArgTypes {
    let mut result = declared.clone();
    for (key, value) in args {
        let entry = result
            .entry(key.clone())
            .or_insert_with(|| ArgType::new(key.clone()));
        if entry.sb_type.is_none() {
            entry.sb_type = Some(SbType::infer(value));
        }
    }
    for (key, arg_type) in &mut result {
        if arg_type.name.is_empty() {
            arg_type.name.clone_from(key);
        }
    }
    result
}
