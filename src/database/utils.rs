use bigdecimal::{BigDecimal, FromPrimitive, ToPrimitive};

/// Collapses whitespace and rewrites `?` placeholders to Postgres `$n` form.
pub fn sql(query: &str) -> String {
    let cleaned = query.split_whitespace().collect::<Vec<&str>>().join(" ");
    let mut result = String::with_capacity(cleaned.len() + 8);
    let mut param_index = 1;
    for ch in cleaned.chars() {
        if ch == '?' {
            result.push('$');
            result.push_str(&param_index.to_string());
            param_index += 1;
        } else {
            result.push(ch);
        }
    }
    result
}

/// Domain units to a NUMERIC column value.
pub fn to_decimal(units: f64) -> BigDecimal {
    BigDecimal::from_f64(units).unwrap_or_default()
}

/// NUMERIC column value to domain units.
pub fn to_units(value: &BigDecimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}
