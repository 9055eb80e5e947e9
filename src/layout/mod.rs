//! Layout Model
//!
//! The schema of a dataset: ordered parameter, array and column definitions.
//!
//! ## Structure
//! ```text
//! ┌──────────────────────────────┐
//! │ Layout                       │
//! │  parameters: [def, def, ...] │  ordinal = position, name unique per kind
//! │  arrays:     [def, ...]      │
//! │  columns:    [def, def, ...] │
//! │  name → ordinal indexes      │
//! └──────────────────────────────┘
//! ```
//!
//! A layout grows by `define_*` calls until the header is written (or, when
//! reading, is rebuilt from the parsed header) and is frozen from then on.

mod definition;
pub mod namelist;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SddsError};
use crate::types::DataType;

pub use definition::{
    ArrayDefinition, ArrayTuple, ColumnDefinition, ColumnTuple, Definition, ParameterDefinition,
    ParameterTuple,
};

/// Dataset title and body text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    pub text: Option<String>,
    pub contents: Option<String>,
}

impl Description {
    pub fn new(text: Option<&str>, contents: Option<&str>) -> Self {
        Self {
            text: text.map(str::to_string),
            contents: contents.map(str::to_string),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.contents.is_none()
    }
}

/// Result of checking a definition against expected units and type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Okay,
    NonExistent,
    WrongType,
    WrongUnits,
}

/// Definition lists as serialized
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutDefinitions {
    pub parameters: Vec<ParameterDefinition>,
    pub arrays: Vec<ArrayDefinition>,
    pub columns: Vec<ColumnDefinition>,
}

/// Ordered definitions of one dataset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(into = "LayoutDefinitions", try_from = "LayoutDefinitions")]
pub struct Layout {
    parameters: Vec<ParameterDefinition>,
    arrays: Vec<ArrayDefinition>,
    columns: Vec<ColumnDefinition>,
    parameter_index: HashMap<String, usize>,
    array_index: HashMap<String, usize>,
    column_index: HashMap<String, usize>,
}

impl PartialEq for Layout {
    fn eq(&self, other: &Self) -> bool {
        self.parameters == other.parameters
            && self.arrays == other.arrays
            && self.columns == other.columns
    }
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when nothing has been defined
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.arrays.is_empty() && self.columns.is_empty()
    }

    // -------------------------------------------------------------------------
    // Definition
    // -------------------------------------------------------------------------

    /// Add a parameter, returning its ordinal
    pub fn define_parameter(&mut self, definition: ParameterDefinition) -> Result<usize> {
        if self.parameter_index.contains_key(&definition.name) {
            return Err(SddsError::DuplicateDefinition {
                kind: "parameter",
                name: definition.name,
            });
        }
        definition.validate()?;

        let ordinal = self.parameters.len();
        debug!(name = %definition.name, data_type = %definition.data_type, ordinal, "Defined parameter");
        self.parameter_index.insert(definition.name.clone(), ordinal);
        self.parameters.push(definition);
        Ok(ordinal)
    }

    /// Add an array, returning its ordinal
    pub fn define_array(&mut self, definition: ArrayDefinition) -> Result<usize> {
        if self.array_index.contains_key(&definition.name) {
            return Err(SddsError::DuplicateDefinition {
                kind: "array",
                name: definition.name,
            });
        }
        definition.validate()?;

        let ordinal = self.arrays.len();
        debug!(name = %definition.name, data_type = %definition.data_type, ordinal, "Defined array");
        self.array_index.insert(definition.name.clone(), ordinal);
        self.arrays.push(definition);
        Ok(ordinal)
    }

    /// Add a column, returning its ordinal
    pub fn define_column(&mut self, definition: ColumnDefinition) -> Result<usize> {
        if self.column_index.contains_key(&definition.name) {
            return Err(SddsError::DuplicateDefinition {
                kind: "column",
                name: definition.name,
            });
        }
        definition.validate()?;

        let ordinal = self.columns.len();
        debug!(name = %definition.name, data_type = %definition.data_type, ordinal, "Defined column");
        self.column_index.insert(definition.name.clone(), ordinal);
        self.columns.push(definition);
        Ok(ordinal)
    }

    /// Add any definition, returning its ordinal within its kind
    pub fn define(&mut self, definition: Definition) -> Result<usize> {
        match definition {
            Definition::Parameter(d) => self.define_parameter(d),
            Definition::Array(d) => self.define_array(d),
            Definition::Column(d) => self.define_column(d),
        }
    }

    pub fn define_simple_parameter(&mut self, name: &str, data_type: DataType) -> Result<usize> {
        self.define_parameter(ParameterDefinition::new(name, data_type))
    }

    pub fn define_simple_array(
        &mut self,
        name: &str,
        data_type: DataType,
        dimensions: u32,
    ) -> Result<usize> {
        self.define_array(ArrayDefinition::new(name, data_type, dimensions))
    }

    pub fn define_simple_column(&mut self, name: &str, data_type: DataType) -> Result<usize> {
        self.define_column(ColumnDefinition::new(name, data_type))
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    pub fn array_count(&self) -> usize {
        self.arrays.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameter_index.get(name).copied()
    }

    pub fn array_index(&self, name: &str) -> Option<usize> {
        self.array_index.get(name).copied()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_index.get(name).copied()
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterDefinition> {
        self.parameter_index(name).map(|i| &self.parameters[i])
    }

    pub fn array(&self, name: &str) -> Option<&ArrayDefinition> {
        self.array_index(name).map(|i| &self.arrays[i])
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    pub fn parameter_at(&self, ordinal: usize) -> Option<&ParameterDefinition> {
        self.parameters.get(ordinal)
    }

    pub fn array_at(&self, ordinal: usize) -> Option<&ArrayDefinition> {
        self.arrays.get(ordinal)
    }

    pub fn column_at(&self, ordinal: usize) -> Option<&ColumnDefinition> {
        self.columns.get(ordinal)
    }

    pub fn parameters(&self) -> &[ParameterDefinition] {
        &self.parameters
    }

    pub fn arrays(&self) -> &[ArrayDefinition] {
        &self.arrays
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn array_names(&self) -> Vec<&str> {
        self.arrays.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|d| d.name.as_str()).collect()
    }

    /// Ordinal of a parameter, or `UnknownName`
    pub(crate) fn require_parameter(&self, name: &str) -> Result<usize> {
        self.parameter_index(name)
            .ok_or_else(|| SddsError::unknown_parameter(name))
    }

    pub(crate) fn require_array(&self, name: &str) -> Result<usize> {
        self.array_index(name)
            .ok_or_else(|| SddsError::unknown_array(name))
    }

    pub(crate) fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| SddsError::unknown_column(name))
    }

    // -------------------------------------------------------------------------
    // Checks
    // -------------------------------------------------------------------------

    pub fn check_parameter(
        &self,
        name: &str,
        units: Option<&str>,
        data_type: Option<DataType>,
    ) -> CheckStatus {
        match self.parameter(name) {
            Some(d) => check(&d.units, d.data_type, units, data_type),
            None => CheckStatus::NonExistent,
        }
    }

    pub fn check_array(
        &self,
        name: &str,
        units: Option<&str>,
        data_type: Option<DataType>,
    ) -> CheckStatus {
        match self.array(name) {
            Some(d) => check(&d.units, d.data_type, units, data_type),
            None => CheckStatus::NonExistent,
        }
    }

    pub fn check_column(
        &self,
        name: &str,
        units: Option<&str>,
        data_type: Option<DataType>,
    ) -> CheckStatus {
        match self.column(name) {
            Some(d) => check(&d.units, d.data_type, units, data_type),
            None => CheckStatus::NonExistent,
        }
    }

    // -------------------------------------------------------------------------
    // Transfer
    // -------------------------------------------------------------------------

    /// Copy a parameter definition from another layout, optionally renamed
    pub fn transfer_parameter_definition(
        &mut self,
        source: &Layout,
        name: &str,
        new_name: Option<&str>,
    ) -> Result<usize> {
        let mut definition = source
            .parameter(name)
            .cloned()
            .ok_or_else(|| SddsError::unknown_parameter(name))?;
        if let Some(new_name) = new_name {
            definition.name = new_name.to_string();
        }
        self.define_parameter(definition)
    }

    pub fn transfer_array_definition(
        &mut self,
        source: &Layout,
        name: &str,
        new_name: Option<&str>,
    ) -> Result<usize> {
        let mut definition = source
            .array(name)
            .cloned()
            .ok_or_else(|| SddsError::unknown_array(name))?;
        if let Some(new_name) = new_name {
            definition.name = new_name.to_string();
        }
        self.define_array(definition)
    }

    pub fn transfer_column_definition(
        &mut self,
        source: &Layout,
        name: &str,
        new_name: Option<&str>,
    ) -> Result<usize> {
        let mut definition = source
            .column(name)
            .cloned()
            .ok_or_else(|| SddsError::unknown_column(name))?;
        if let Some(new_name) = new_name {
            definition.name = new_name.to_string();
        }
        self.define_column(definition)
    }

    // -------------------------------------------------------------------------
    // Versioning
    // -------------------------------------------------------------------------

    /// Lowest header version able to describe this layout
    pub fn required_version(&self, column_major: bool) -> u32 {
        let types = self
            .parameters
            .iter()
            .map(|d| d.data_type)
            .chain(self.arrays.iter().map(|d| d.data_type))
            .chain(self.columns.iter().map(|d| d.data_type));

        let mut version = if column_major { 3 } else { 1 };
        for data_type in types {
            let needed = match data_type {
                DataType::LongDouble => 5,
                DataType::Long64 | DataType::ULong64 => 4,
                DataType::UShort | DataType::ULong => 2,
                _ => 1,
            };
            version = version.max(needed);
        }
        version
    }
}

fn check(
    actual_units: &str,
    actual_type: DataType,
    units: Option<&str>,
    data_type: Option<DataType>,
) -> CheckStatus {
    if let Some(expected) = data_type {
        if expected != actual_type {
            return CheckStatus::WrongType;
        }
    }
    match units {
        Some(expected) if !expected.is_empty() && expected != actual_units => CheckStatus::WrongUnits,
        _ => CheckStatus::Okay,
    }
}

impl From<Layout> for LayoutDefinitions {
    fn from(layout: Layout) -> Self {
        Self {
            parameters: layout.parameters,
            arrays: layout.arrays,
            columns: layout.columns,
        }
    }
}

impl TryFrom<LayoutDefinitions> for Layout {
    type Error = SddsError;

    fn try_from(definitions: LayoutDefinitions) -> Result<Self> {
        let mut layout = Layout::new();
        for d in definitions.parameters {
            layout.define_parameter(d)?;
        }
        for d in definitions.arrays {
            layout.define_array(d)?;
        }
        for d in definitions.columns {
            layout.define_column(d)?;
        }
        Ok(layout)
    }
}
