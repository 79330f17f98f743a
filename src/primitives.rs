//! XML Schema primitive types and their wire conversions.
//!
//! Every primitive has a fixed bidirectional contract between its wire
//! lexical form and a native [`Value`] scalar. Failures are returned as
//! values; callers check the result before use.

use crate::error::SchemaError;
use crate::value::Value;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};

/// The closed set of well-known primitive type names. Not user-extensible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// Character string; the only primitive honoring length facets.
    String,
    AnyUri,
    Language,
    /// Whitespace-normalized string: surrounding whitespace is stripped.
    NormalizedString,
    /// Binary-valued; canonical wire literals are `1`/`0`.
    Token,
    /// Binary-valued; canonical wire literals are `true`/`false`.
    Boolean,
    Byte,
    Short,
    Int,
    Integer,
    Long,
    UnsignedByte,
    UnsignedShort,
    UnsignedInt,
    UnsignedLong,
    NegativeInteger,
    NonNegativeInteger,
    NonPositiveInteger,
    PositiveInteger,
    Decimal,
    Double,
    Float,
    Base64Binary,
    HexBinary,
    /// Calendar date, wire format `CCYY-MM-DD`.
    Date,
    /// Specific instant, ISO 8601 extended format.
    DateTime,
    /// Recurring time of day; the date component is normalized away.
    Time,
    Duration,
    GDay,
    GMonth,
    GMonthDay,
    GYear,
    GYearMonth,
}

impl PrimitiveType {
    /// Look up a primitive by its schema type name.
    pub fn from_name(name: &str) -> Option<Self> {
        use PrimitiveType::*;
        Some(match name {
            "string" => String,
            "anyURI" => AnyUri,
            "language" => Language,
            "normalizedString" => NormalizedString,
            "token" => Token,
            "boolean" => Boolean,
            "byte" => Byte,
            "short" => Short,
            "int" => Int,
            "integer" => Integer,
            "long" => Long,
            "unsignedByte" => UnsignedByte,
            "unsignedShort" => UnsignedShort,
            "unsignedInt" => UnsignedInt,
            "unsignedLong" => UnsignedLong,
            "negativeInteger" => NegativeInteger,
            "nonNegativeInteger" => NonNegativeInteger,
            "nonPositiveInteger" => NonPositiveInteger,
            "positiveInteger" => PositiveInteger,
            "decimal" => Decimal,
            "double" => Double,
            "float" => Float,
            "base64Binary" => Base64Binary,
            "hexBinary" => HexBinary,
            "date" => Date,
            "dateTime" => DateTime,
            "time" => Time,
            "duration" => Duration,
            "gDay" => GDay,
            "gMonth" => GMonth,
            "gMonthDay" => GMonthDay,
            "gYear" => GYear,
            "gYearMonth" => GYearMonth,
            _ => return None,
        })
    }

    /// Schema type name of this primitive.
    pub fn name(self) -> &'static str {
        use PrimitiveType::*;
        match self {
            String => "string",
            AnyUri => "anyURI",
            Language => "language",
            NormalizedString => "normalizedString",
            Token => "token",
            Boolean => "boolean",
            Byte => "byte",
            Short => "short",
            Int => "int",
            Integer => "integer",
            Long => "long",
            UnsignedByte => "unsignedByte",
            UnsignedShort => "unsignedShort",
            UnsignedInt => "unsignedInt",
            UnsignedLong => "unsignedLong",
            NegativeInteger => "negativeInteger",
            NonNegativeInteger => "nonNegativeInteger",
            NonPositiveInteger => "nonPositiveInteger",
            PositiveInteger => "positiveInteger",
            Decimal => "decimal",
            Double => "double",
            Float => "float",
            Base64Binary => "base64Binary",
            HexBinary => "hexBinary",
            Date => "date",
            DateTime => "dateTime",
            Time => "time",
            Duration => "duration",
            GDay => "gDay",
            GMonth => "gMonth",
            GMonthDay => "gMonthDay",
            GYear => "gYear",
            GYearMonth => "gYearMonth",
        }
    }
}

/// Length facets, applied to the `string` primitive only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringFacets {
    pub length: Option<usize>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

impl StringFacets {
    fn check(&self, field: &str, s: &str) -> Result<(), SchemaError> {
        let violation = |detail: std::string::String| SchemaError::ConstraintViolation {
            field: field.to_string(),
            detail,
        };
        if let Some(len) = self.length {
            if s.chars().count() != len {
                return Err(violation(format!("\"{s}\" - length should be {len}")));
            }
        }
        if let Some(max) = self.max_length {
            if s.chars().count() > max {
                return Err(violation(format!("\"{s}\" - length should be less than {max}")));
            }
        }
        if let Some(min) = self.min_length {
            if s.chars().count() < min {
                return Err(violation(format!("\"{s}\" - length should be greater than {min}")));
            }
        }
        Ok(())
    }
}

/// Decode a wire string into a native scalar.
///
/// `field` only feeds error messages. Range and format rules are enforced
/// here; cardinality is the marshalling engine's business.
pub fn decode(
    ty: PrimitiveType,
    field: &str,
    raw: &str,
    facets: &StringFacets,
) -> Result<Value, SchemaError> {
    use PrimitiveType::*;
    match ty {
        String => {
            facets.check(field, raw)?;
            Ok(Value::Text(raw.to_string()))
        }
        AnyUri | Language => Ok(Value::Text(raw.to_string())),
        NormalizedString => Ok(Value::Text(raw.trim().to_string())),
        // Any non-empty wire literal decodes to true, the empty one to false.
        Token | Boolean => Ok(Value::Bool(!raw.is_empty())),
        Byte => decode_signed(ty, raw, -128, 127),
        Short => decode_signed(ty, raw, -32768, 32767),
        Int | Integer => decode_signed(ty, raw, i32::MIN as i64, i32::MAX as i64),
        Long => decode_signed(ty, raw, i64::MIN, i64::MAX),
        NegativeInteger => decode_signed(ty, raw, i64::MIN, -1),
        NonNegativeInteger => decode_signed(ty, raw, 0, i64::MAX),
        NonPositiveInteger => decode_signed(ty, raw, i64::MIN, 0),
        PositiveInteger => decode_signed(ty, raw, 1, i64::MAX),
        UnsignedByte => decode_unsigned(ty, raw, u8::MAX as u64),
        UnsignedShort => decode_unsigned(ty, raw, u16::MAX as u64),
        UnsignedInt => decode_unsigned(ty, raw, u32::MAX as u64),
        UnsignedLong => decode_unsigned(ty, raw, u64::MAX),
        Decimal | Double | Float => raw
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| SchemaError::invalid_value(ty.name(), raw)),
        Base64Binary => BASE64
            .decode(raw.trim())
            .map(Value::Bytes)
            .map_err(|_| SchemaError::invalid_value(ty.name(), raw)),
        HexBinary => hex::decode(raw.trim())
            .map(Value::Bytes)
            .map_err(|_| SchemaError::invalid_value(ty.name(), raw)),
        Date => parse_date(raw)
            .map(Value::Date)
            .ok_or_else(|| SchemaError::invalid_value(ty.name(), raw)),
        DateTime => parse_date_time(raw)
            .map(Value::DateTime)
            .ok_or_else(|| SchemaError::invalid_value(ty.name(), raw)),
        Time => parse_time(raw)
            .map(Value::Time)
            .ok_or_else(|| SchemaError::invalid_value(ty.name(), raw)),
        // Deliberately unvalidated passthrough; these lexical forms are
        // stored and emitted as-is.
        Duration | GDay | GMonth | GMonthDay | GYear | GYearMonth => {
            Ok(Value::Text(raw.to_string()))
        }
    }
}

/// Encode a native scalar into its wire string.
///
/// Numeric families re-check no bounds on the way out; only lexical
/// conversion can fail here.
pub fn encode(
    ty: PrimitiveType,
    field: &str,
    value: &Value,
    facets: &StringFacets,
) -> Result<std::string::String, SchemaError> {
    use PrimitiveType::*;
    match ty {
        String => {
            let s = lexical(value).ok_or_else(|| invalid_for(ty, value))?;
            facets.check(field, &s)?;
            Ok(s)
        }
        AnyUri | Language => lexical(value).ok_or_else(|| invalid_for(ty, value)),
        NormalizedString => lexical(value)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| invalid_for(ty, value)),
        Token => Ok(if value.is_truthy() { "1" } else { "0" }.to_string()),
        Boolean => Ok(if value.is_truthy() { "true" } else { "false" }.to_string()),
        Byte | Short | Int | Integer | Long | UnsignedByte | UnsignedShort | UnsignedInt
        | UnsignedLong | NegativeInteger | NonNegativeInteger | NonPositiveInteger
        | PositiveInteger | Decimal | Double | Float => {
            lexical(value).ok_or_else(|| invalid_for(ty, value))
        }
        Base64Binary => match value {
            Value::Bytes(b) => Ok(BASE64.encode(b)),
            Value::Text(s) => Ok(BASE64.encode(s.as_bytes())),
            _ => Err(invalid_for(ty, value)),
        },
        HexBinary => match value {
            Value::Bytes(b) => Ok(hex::encode(b)),
            Value::Text(s) => Ok(hex::encode(s.as_bytes())),
            _ => Err(invalid_for(ty, value)),
        },
        Date => match value {
            Value::Date(d) => Ok(d.format("%Y-%m-%d").to_string()),
            Value::DateTime(dt) => Ok(dt.date_naive().format("%Y-%m-%d").to_string()),
            Value::Text(s) => parse_date(s)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .ok_or_else(|| SchemaError::invalid_value(ty.name(), s.clone())),
            _ => Err(invalid_for(ty, value)),
        },
        DateTime => match value {
            Value::DateTime(dt) | Value::Time(dt) => Ok(dt.to_rfc3339()),
            Value::Date(d) => Ok(d
                .and_hms_opt(0, 0, 0)
                .expect("midnight is always valid")
                .and_utc()
                .to_rfc3339()),
            Value::Text(s) => parse_date_time(s)
                .map(|dt| dt.to_rfc3339())
                .ok_or_else(|| SchemaError::invalid_value(ty.name(), s.clone())),
            _ => Err(invalid_for(ty, value)),
        },
        Time => match value {
            Value::Time(t) | Value::DateTime(t) => Ok(t.format("%H:%M:%S%:z").to_string()),
            Value::Text(s) => parse_time(s)
                .map(|t| t.format("%H:%M:%S%:z").to_string())
                .ok_or_else(|| SchemaError::invalid_value(ty.name(), s.clone())),
            _ => Err(invalid_for(ty, value)),
        },
        Duration | GDay | GMonth | GMonthDay | GYear | GYearMonth => {
            lexical(value).ok_or_else(|| invalid_for(ty, value))
        }
    }
}

fn decode_signed(ty: PrimitiveType, raw: &str, min: i64, max: i64) -> Result<Value, SchemaError> {
    let n = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| SchemaError::invalid_value(ty.name(), raw))?;
    if n < min || n > max {
        return Err(SchemaError::invalid_value(ty.name(), raw));
    }
    Ok(Value::Int(n))
}

fn decode_unsigned(ty: PrimitiveType, raw: &str, max: u64) -> Result<Value, SchemaError> {
    let n = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| SchemaError::invalid_value(ty.name(), raw))?;
    if n > max {
        return Err(SchemaError::invalid_value(ty.name(), raw));
    }
    Ok(Value::UInt(n))
}

/// Plain lexical rendering of a scalar, shared by the stringly families.
fn lexical(value: &Value) -> Option<std::string::String> {
    match value {
        Value::Text(s) => Some(s.clone()),
        Value::Int(n) => Some(n.to_string()),
        Value::UInt(n) => Some(n.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        Value::DateTime(dt) => Some(dt.to_rfc3339()),
        Value::Time(t) => Some(t.format("%H:%M:%S%:z").to_string()),
        _ => None,
    }
}

fn invalid_for(ty: PrimitiveType, value: &Value) -> SchemaError {
    SchemaError::invalid_value(ty.name(), format!("{value:?}"))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim().trim_matches('"');
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn parse_date_time(raw: &str) -> Option<chrono::DateTime<FixedOffset>> {
    let raw = raw.trim().trim_matches('"');
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    // Naive instants are taken as UTC.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|n| n.and_utc().fixed_offset())
}

/// Parse `HH:mm:ss` with optional zone, pinning the date to 1970-01-01 so
/// only the time of day survives comparison and storage.
fn parse_time(raw: &str) -> Option<chrono::DateTime<FixedOffset>> {
    let raw = raw.trim().trim_matches('"');
    let zoned = if let Some(stripped) = raw.strip_suffix('Z') {
        format!("{stripped}+00:00")
    } else {
        raw.to_string()
    };
    if let Ok(dt) =
        chrono::DateTime::parse_from_str(&format!("1970-01-01T{zoned}"), "%Y-%m-%dT%H:%M:%S%:z")
    {
        return Some(dt);
    }
    NaiveTime::parse_from_str(raw, "%H:%M:%S").ok().map(|t| {
        NaiveDate::from_ymd_opt(1970, 1, 1)
            .expect("epoch date is valid")
            .and_time(t)
            .and_utc()
            .fixed_offset()
    })
}
