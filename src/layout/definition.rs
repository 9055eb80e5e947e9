//! Definition records
//!
//! One fixed-field struct per kind. Optional text fields use the empty string
//! for "unset", which is also how they travel in tuple form.
//!
//! ## Tuple Shapes
//! ```text
//! Parameter (symbol, units, description, format_string, type, fixed_value)
//! Array     (symbol, units, description, format_string, group_name, type,
//!            field_length, dimensions)
//! Column    (symbol, units, description, format_string, type, field_length)
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, SddsError};
use crate::types::{DataType, FormatSpec, Value};

/// Parameter definition in tuple form
pub type ParameterTuple = (String, String, String, String, i32, String);

/// Array definition in tuple form
pub type ArrayTuple = (String, String, String, String, String, i32, i32, i32);

/// Column definition in tuple form
pub type ColumnTuple = (String, String, String, String, i32, i32);

fn type_from_code(code: i32) -> Result<DataType> {
    DataType::from_code(code)
        .ok_or_else(|| SddsError::Format(format!("Unknown type code {}", code)))
}

fn field_length_from(value: i32) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| SddsError::Format(format!("Field length must not be negative, got {}", value)))
}

fn format_spec_for(format_string: &str, data_type: DataType) -> Result<Option<FormatSpec>> {
    if format_string.is_empty() {
        return Ok(None);
    }
    let spec = FormatSpec::parse(format_string)?;
    if !spec.accepts(data_type) {
        return Err(SddsError::Format(format!(
            "Format string {} does not suit type {}",
            format_string,
            data_type.short_name()
        )));
    }
    Ok(Some(spec))
}

// =============================================================================
// Parameter
// =============================================================================

/// A scalar carried once per page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    pub symbol: String,
    pub units: String,
    pub description: String,
    pub format_string: String,
    pub data_type: DataType,
    /// Value fixed in the header; such parameters are not stored per page
    pub fixed_value: Option<String>,
}

impl ParameterDefinition {
    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            symbol: String::new(),
            units: String::new(),
            description: String::new(),
            format_string: String::new(),
            data_type,
            fixed_value: None,
        }
    }

    pub fn with_symbol(mut self, symbol: &str) -> Self {
        self.symbol = symbol.to_string();
        self
    }

    pub fn with_units(mut self, units: &str) -> Self {
        self.units = units.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_format_string(mut self, format_string: &str) -> Self {
        self.format_string = format_string.to_string();
        self
    }

    pub fn with_fixed_value(mut self, fixed_value: &str) -> Self {
        self.fixed_value = Some(fixed_value.to_string());
        self
    }

    pub fn to_tuple(&self) -> ParameterTuple {
        (
            self.symbol.clone(),
            self.units.clone(),
            self.description.clone(),
            self.format_string.clone(),
            self.data_type.code(),
            self.fixed_value.clone().unwrap_or_default(),
        )
    }

    /// Build from tuple form; an empty fixed value means "not fixed"
    pub fn from_tuple(name: &str, tuple: ParameterTuple) -> Result<Self> {
        let (symbol, units, description, format_string, code, fixed_value) = tuple;
        Ok(Self {
            name: name.to_string(),
            symbol,
            units,
            description,
            format_string,
            data_type: type_from_code(code)?,
            fixed_value: (!fixed_value.is_empty()).then_some(fixed_value),
        })
    }

    /// Parsed format string, if any
    pub fn format_spec(&self) -> Result<Option<FormatSpec>> {
        format_spec_for(&self.format_string, self.data_type)
    }

    /// The fixed value decoded as the parameter type
    pub fn fixed(&self) -> Result<Option<Value>> {
        match &self.fixed_value {
            None => Ok(None),
            Some(text) => Value::String(text.clone())
                .coerce(self.data_type)
                .map(Some)
                .map_err(|_| {
                    SddsError::Format(format!(
                        "Fixed value {:?} of parameter {} is not a valid {}",
                        text,
                        self.name,
                        self.data_type.short_name()
                    ))
                }),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.format_spec()?;
        self.fixed()?;
        Ok(())
    }
}

// =============================================================================
// Array
// =============================================================================

/// A multi-dimensional block carried once per page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayDefinition {
    pub name: String,
    pub symbol: String,
    pub units: String,
    pub description: String,
    pub format_string: String,
    pub group_name: String,
    pub data_type: DataType,
    pub field_length: u32,
    /// Number of dimensions, at least 1
    pub dimensions: u32,
}

impl ArrayDefinition {
    pub fn new(name: &str, data_type: DataType, dimensions: u32) -> Self {
        Self {
            name: name.to_string(),
            symbol: String::new(),
            units: String::new(),
            description: String::new(),
            format_string: String::new(),
            group_name: String::new(),
            data_type,
            field_length: 0,
            dimensions,
        }
    }

    pub fn with_units(mut self, units: &str) -> Self {
        self.units = units.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_format_string(mut self, format_string: &str) -> Self {
        self.format_string = format_string.to_string();
        self
    }

    pub fn with_group_name(mut self, group_name: &str) -> Self {
        self.group_name = group_name.to_string();
        self
    }

    pub fn to_tuple(&self) -> ArrayTuple {
        (
            self.symbol.clone(),
            self.units.clone(),
            self.description.clone(),
            self.format_string.clone(),
            self.group_name.clone(),
            self.data_type.code(),
            self.field_length as i32,
            self.dimensions as i32,
        )
    }

    pub fn from_tuple(name: &str, tuple: ArrayTuple) -> Result<Self> {
        let (symbol, units, description, format_string, group_name, code, field_length, dimensions) =
            tuple;
        let dimensions = u32::try_from(dimensions)
            .ok()
            .filter(|d| *d >= 1)
            .ok_or_else(|| {
                SddsError::Format(format!("Array {} needs at least one dimension", name))
            })?;
        Ok(Self {
            name: name.to_string(),
            symbol,
            units,
            description,
            format_string,
            group_name,
            data_type: type_from_code(code)?,
            field_length: field_length_from(field_length)?,
            dimensions,
        })
    }

    pub fn format_spec(&self) -> Result<Option<FormatSpec>> {
        format_spec_for(&self.format_string, self.data_type)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.dimensions == 0 {
            return Err(SddsError::Format(format!(
                "Array {} needs at least one dimension",
                self.name
            )));
        }
        self.format_spec()?;
        Ok(())
    }
}

// =============================================================================
// Column
// =============================================================================

/// One value per row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub symbol: String,
    pub units: String,
    pub description: String,
    pub format_string: String,
    pub data_type: DataType,
    pub field_length: u32,
}

impl ColumnDefinition {
    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            symbol: String::new(),
            units: String::new(),
            description: String::new(),
            format_string: String::new(),
            data_type,
            field_length: 0,
        }
    }

    pub fn with_symbol(mut self, symbol: &str) -> Self {
        self.symbol = symbol.to_string();
        self
    }

    pub fn with_units(mut self, units: &str) -> Self {
        self.units = units.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_format_string(mut self, format_string: &str) -> Self {
        self.format_string = format_string.to_string();
        self
    }

    pub fn to_tuple(&self) -> ColumnTuple {
        (
            self.symbol.clone(),
            self.units.clone(),
            self.description.clone(),
            self.format_string.clone(),
            self.data_type.code(),
            self.field_length as i32,
        )
    }

    pub fn from_tuple(name: &str, tuple: ColumnTuple) -> Result<Self> {
        let (symbol, units, description, format_string, code, field_length) = tuple;
        Ok(Self {
            name: name.to_string(),
            symbol,
            units,
            description,
            format_string,
            data_type: type_from_code(code)?,
            field_length: field_length_from(field_length)?,
        })
    }

    pub fn format_spec(&self) -> Result<Option<FormatSpec>> {
        format_spec_for(&self.format_string, self.data_type)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.format_spec()?;
        Ok(())
    }
}

// =============================================================================
// Tagged Definition
// =============================================================================

/// Any one definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Definition {
    Parameter(ParameterDefinition),
    Array(ArrayDefinition),
    Column(ColumnDefinition),
}

impl Definition {
    pub fn name(&self) -> &str {
        match self {
            Definition::Parameter(d) => &d.name,
            Definition::Array(d) => &d.name,
            Definition::Column(d) => &d.name,
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Definition::Parameter(d) => d.data_type,
            Definition::Array(d) => d.data_type,
            Definition::Column(d) => d.data_type,
        }
    }

    /// Kind label used in errors and headers
    pub fn kind(&self) -> &'static str {
        match self {
            Definition::Parameter(_) => "parameter",
            Definition::Array(_) => "array",
            Definition::Column(_) => "column",
        }
    }
}

impl From<ParameterDefinition> for Definition {
    fn from(d: ParameterDefinition) -> Self {
        Definition::Parameter(d)
    }
}

impl From<ArrayDefinition> for Definition {
    fn from(d: ArrayDefinition) -> Self {
        Definition::Array(d)
    }
}

impl From<ColumnDefinition> for Definition {
    fn from(d: ColumnDefinition) -> Self {
        Definition::Column(d)
    }
}
