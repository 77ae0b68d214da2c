use crate::types::datatype::DataType;

/// Whether a child column of type `a` may reference a parent column of type
/// `b`. Value-level compatibility of ENUM, SET and DECIMAL members is left to
/// runtime comparison.
pub fn foreign_key_comparable_types(a: &DataType, b: &DataType) -> bool {
    if a == b {
        return true;
    }
    if (a.is_time_of_day() && b.is_time_of_day()) || (a.is_date_time() && b.is_date_time()) {
        return true;
    }
    match (a, b) {
        (DataType::Enum(_), DataType::Enum(_))
        | (DataType::Set(_), DataType::Set(_))
        | (DataType::Decimal { .. }, DataType::Decimal { .. }) => true,
        _ if a.is_character_string() && b.is_character_string() => a.charset() == b.charset(),
        _ if a.is_binary_string() && b.is_binary_string() => a.charset() == b.charset(),
        _ => false,
    }
}
