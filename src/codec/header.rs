//! Header encoding
//!
//! The version line, byte order and row count hints, and one namelist per
//! description/definition, closed by the `&data` namelist.

use std::io::BufRead;

use crate::error::{Result, SddsError};
use crate::layout::namelist::{self, Namelist};
use crate::layout::{ArrayDefinition, ColumnDefinition, Description, Layout, ParameterDefinition};
use crate::types::{ByteOrder, DataMode, DataType};

use super::source::Source;
use super::MAX_VERSION;

const BIG_ENDIAN_HINT: &str = "big-endian";
const LITTLE_ENDIAN_HINT: &str = "little-endian";
const FIXED_ROW_COUNT_HINT: &str = "fixed-rowcount";

/// Everything the header declares
#[derive(Debug, Clone)]
pub(crate) struct Header {
    pub version: u32,
    pub description: Description,
    pub layout: Layout,
    pub mode: DataMode,
    pub column_major: bool,
    pub fixed_row_count: bool,
    pub byte_order: ByteOrder,
}

// =============================================================================
// Writing
// =============================================================================

/// Render a complete header, `&data` line included
pub(crate) fn render(header: &Header) -> String {
    let mut out = format!("SDDS{}\n", header.version);
    if header.mode == DataMode::Binary {
        let hint = match header.byte_order {
            ByteOrder::Little => LITTLE_ENDIAN_HINT,
            ByteOrder::Big => BIG_ENDIAN_HINT,
        };
        out.push_str(&format!("!# {}\n", hint));
    }
    if header.fixed_row_count {
        out.push_str(&format!("!# {}\n", FIXED_ROW_COUNT_HINT));
    }

    if !header.description.is_empty() {
        let namelist = Namelist::new("description")
            .optional("text", header.description.text.as_deref().unwrap_or_default())
            .optional("contents", header.description.contents.as_deref().unwrap_or_default());
        out.push_str(&namelist.to_line());
    }

    for d in header.layout.parameters() {
        let mut namelist = Namelist::new("parameter")
            .field("name", d.name.as_str())
            .optional("symbol", &d.symbol)
            .optional("units", &d.units)
            .optional("description", &d.description)
            .optional("format_string", &d.format_string)
            .field("type", d.data_type.short_name());
        if let Some(fixed) = &d.fixed_value {
            namelist = namelist.field("fixed_value", fixed.as_str());
        }
        out.push_str(&namelist.to_line());
    }

    for d in header.layout.arrays() {
        let mut namelist = Namelist::new("array")
            .field("name", d.name.as_str())
            .optional("symbol", &d.symbol)
            .optional("units", &d.units)
            .optional("description", &d.description)
            .optional("format_string", &d.format_string)
            .optional("group_name", &d.group_name)
            .field("type", d.data_type.short_name());
        if d.field_length != 0 {
            namelist = namelist.field("field_length", d.field_length.to_string());
        }
        if d.dimensions != 1 {
            namelist = namelist.field("dimensions", d.dimensions.to_string());
        }
        out.push_str(&namelist.to_line());
    }

    for d in header.layout.columns() {
        let mut namelist = Namelist::new("column")
            .field("name", d.name.as_str())
            .optional("symbol", &d.symbol)
            .optional("units", &d.units)
            .optional("description", &d.description)
            .optional("format_string", &d.format_string)
            .field("type", d.data_type.short_name());
        if d.field_length != 0 {
            namelist = namelist.field("field_length", d.field_length.to_string());
        }
        out.push_str(&namelist.to_line());
    }

    let mut data = Namelist::new("data").field("mode", header.mode.name());
    if header.column_major {
        data = data.field("column_major_order", "1");
    }
    out.push_str(&data.to_line());
    out
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse a header, leaving `src` at the first byte of page data
pub(crate) fn parse<R: BufRead>(src: &mut Source<R>) -> Result<Header> {
    let first = src
        .read_line()?
        .ok_or_else(|| SddsError::Format("Empty stream".to_string()))?;
    let version = parse_version(&first)?;

    let mut header = Header {
        version,
        description: Description::default(),
        layout: Layout::new(),
        mode: DataMode::Ascii,
        column_major: false,
        fixed_row_count: false,
        byte_order: ByteOrder::native(),
    };

    loop {
        let line = src
            .read_line()?
            .ok_or_else(|| SddsError::Format("Header ends before &data".to_string()))?;
        let trimmed = line.trim();

        if let Some(hint) = trimmed.strip_prefix("!#") {
            match hint.trim() {
                BIG_ENDIAN_HINT => header.byte_order = ByteOrder::Big,
                LITTLE_ENDIAN_HINT => header.byte_order = ByteOrder::Little,
                FIXED_ROW_COUNT_HINT => header.fixed_row_count = true,
                _ => {}
            }
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with('!') {
            continue;
        }
        if !trimmed.starts_with('&') {
            return Err(SddsError::Format(format!("Unexpected header line: {}", trimmed)));
        }

        let mut text = line;
        while !namelist::is_complete(&text) {
            let more = src
                .read_line()?
                .ok_or_else(|| SddsError::Format("Header ends inside a namelist".to_string()))?;
            text.push('\n');
            text.push_str(&more);
        }
        let group = namelist::parse(&text)?;

        match group.group.to_ascii_lowercase().as_str() {
            "description" => {
                header.description = Description {
                    text: group.get("text").map(str::to_string),
                    contents: group.get("contents").map(str::to_string),
                };
            }
            "parameter" => {
                header.layout.define_parameter(parameter_from(&group)?)?;
            }
            "array" => {
                header.layout.define_array(array_from(&group)?)?;
            }
            "column" => {
                header.layout.define_column(column_from(&group)?)?;
            }
            "data" => {
                apply_data(&mut header, &group)?;
                let extra = group
                    .get("additional_header_lines")
                    .map(|v| parse_number(v, "additional_header_lines"))
                    .transpose()?
                    .unwrap_or(0);
                for _ in 0..extra {
                    src.read_line()?;
                }
                return Ok(header);
            }
            other => {
                return Err(SddsError::Format(format!(
                    "Unsupported header namelist &{}",
                    other
                )))
            }
        }
    }
}

fn parse_version(line: &str) -> Result<u32> {
    let version = line
        .trim()
        .strip_prefix("SDDS")
        .and_then(|v| v.parse::<u32>().ok())
        .ok_or_else(|| SddsError::Format(format!("Missing SDDS identifier, got {:?}", line)))?;
    if version == 0 || version > MAX_VERSION {
        return Err(SddsError::Format(format!("Unsupported SDDS version {}", version)));
    }
    Ok(version)
}

fn parse_number(value: &str, key: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| SddsError::Format(format!("Invalid {} value {:?}", key, value)))
}

fn required<'a>(group: &'a Namelist, key: &str) -> Result<&'a str> {
    group.get(key).ok_or_else(|| {
        SddsError::Format(format!("&{} namelist is missing {}", group.group, key))
    })
}

fn data_type_from(group: &Namelist) -> Result<DataType> {
    let name = required(group, "type")?;
    DataType::from_name(name).ok_or_else(|| {
        SddsError::Format(format!("Unknown type {:?} in &{}", name, group.group))
    })
}

fn text(group: &Namelist, key: &str) -> String {
    group.get(key).unwrap_or_default().to_string()
}

fn parameter_from(group: &Namelist) -> Result<ParameterDefinition> {
    let mut d = ParameterDefinition::new(required(group, "name")?, data_type_from(group)?);
    d.symbol = text(group, "symbol");
    d.units = text(group, "units");
    d.description = text(group, "description");
    d.format_string = text(group, "format_string");
    d.fixed_value = group.get("fixed_value").map(str::to_string);
    Ok(d)
}

fn array_from(group: &Namelist) -> Result<ArrayDefinition> {
    let dimensions = group
        .get("dimensions")
        .map(|v| parse_number(v, "dimensions"))
        .transpose()?
        .unwrap_or(1);
    let mut d = ArrayDefinition::new(required(group, "name")?, data_type_from(group)?, dimensions);
    d.symbol = text(group, "symbol");
    d.units = text(group, "units");
    d.description = text(group, "description");
    d.format_string = text(group, "format_string");
    d.group_name = text(group, "group_name");
    d.field_length = group
        .get("field_length")
        .map(|v| parse_number(v, "field_length"))
        .transpose()?
        .unwrap_or(0);
    Ok(d)
}

fn column_from(group: &Namelist) -> Result<ColumnDefinition> {
    let mut d = ColumnDefinition::new(required(group, "name")?, data_type_from(group)?);
    d.symbol = text(group, "symbol");
    d.units = text(group, "units");
    d.description = text(group, "description");
    d.format_string = text(group, "format_string");
    d.field_length = group
        .get("field_length")
        .map(|v| parse_number(v, "field_length"))
        .transpose()?
        .unwrap_or(0);
    Ok(d)
}

fn apply_data(header: &mut Header, group: &Namelist) -> Result<()> {
    if let Some(mode) = group.get("mode") {
        header.mode = DataMode::from_name(mode)
            .ok_or_else(|| SddsError::Format(format!("Unknown data mode {:?}", mode)))?;
    }
    if let Some(flag) = group.get("column_major_order") {
        header.column_major = parse_number(flag, "column_major_order")? != 0;
    }
    if let Some(flag) = group.get("no_row_counts") {
        if parse_number(flag, "no_row_counts")? != 0 {
            return Err(SddsError::Format(
                "Pages without row counts are not supported".to_string(),
            ));
        }
    }
    Ok(())
}
