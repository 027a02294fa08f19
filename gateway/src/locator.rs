//! Finds the config record for a requested drone.
//!
//! Upstream records name the same logical field in different ways, so every lookup
//! goes through a [`FieldAliases`] table rather than reading keys directly.

use serde_json::{Map, Value};

/// Ordered list of key names that may hold one logical field.
#[derive(Debug, Clone, Copy)]
pub struct FieldAliases {
    pub field: &'static str,
    pub aliases: &'static [&'static str],
}

pub const DRONE_ID: FieldAliases = FieldAliases {
    field: "drone_id",
    aliases: &["drone_id", "droneId", "id"],
};

pub const WEIGHT: FieldAliases = FieldAliases {
    field: "weight",
    aliases: &["weight", "weigh"],
};

impl FieldAliases {
    /// Returns the value of the first alias that is set. See [`is_unset`].
    pub fn resolve<'a>(&self, record: &'a Map<String, Value>) -> Option<&'a Value> {
        self.aliases
            .iter()
            .filter_map(|alias| record.get(*alias))
            .find(|value| !is_unset(value))
    }
}

/// `null`, `false`, `0` and `""` leave a field unset, so the next alias is tried.
pub fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Parses the leading integer of a string: optional sign then digits, trailing
/// garbage ignored. `"7"`, `" 7"` and `"7abc"` all give 7; `"abc"` gives `None`.
pub fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    rest[..digits].parse::<i64>().ok().map(|n| sign * n)
}

/// Integer coercion for identifier values arriving as numbers or strings.
pub fn coerce_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => parse_leading_int(s),
        _ => None,
    }
}

/// Effective identifier of a record, if it has a usable one.
pub fn record_id(record: &Map<String, Value>) -> Option<i64> {
    DRONE_ID.resolve(record).and_then(coerce_id)
}

/// Returns the first record, in upstream order, whose identifier matches `requested_id`.
pub fn find<'a>(records: &'a [Value], requested_id: &str) -> Option<&'a Map<String, Value>> {
    let wanted = parse_leading_int(requested_id)?;

    records
        .iter()
        .filter_map(Value::as_object)
        .find(|record| record_id(record) == Some(wanted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int("7"), Some(7));
        assert_eq!(parse_leading_int("  42"), Some(42));
        assert_eq!(parse_leading_int("12abc"), Some(12));
        assert_eq!(parse_leading_int("-3"), Some(-3));
        assert_eq!(parse_leading_int("+5"), Some(5));
        assert_eq!(parse_leading_int("007"), Some(7));
        assert_eq!(parse_leading_int("abc"), None);
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("-"), None);
        assert_eq!(parse_leading_int("99999999999999999999999"), None);
    }

    #[test]
    fn test_coerce_id() {
        assert_eq!(coerce_id(&json!(7)), Some(7));
        assert_eq!(coerce_id(&json!("7")), Some(7));
        assert_eq!(coerce_id(&json!(7.9)), Some(7));
        assert_eq!(coerce_id(&json!(true)), None);
        assert_eq!(coerce_id(&json!(null)), None);
        assert_eq!(coerce_id(&json!({"id": 1})), None);
    }

    #[test]
    fn test_alias_priority() {
        let record = obj(json!({"id": 3, "droneId": 2, "drone_id": 1}));
        assert_eq!(record_id(&record), Some(1));

        let record = obj(json!({"id": 3, "droneId": "2"}));
        assert_eq!(record_id(&record), Some(2));

        let record = obj(json!({"id": "3"}));
        assert_eq!(record_id(&record), Some(3));

        // null does not count as present
        let record = obj(json!({"drone_id": null, "id": 4}));
        assert_eq!(record_id(&record), Some(4));

        let record = obj(json!({"name": "no id"}));
        assert_eq!(record_id(&record), None);
    }

    #[test]
    fn test_empty_and_zero_fall_through() {
        let record = obj(json!({"drone_id": "", "id": 7}));
        assert_eq!(record_id(&record), Some(7));

        let record = obj(json!({"drone_id": 0, "droneId": "8"}));
        assert_eq!(record_id(&record), Some(8));

        let record = obj(json!({"weight": "", "weigh": "9kg"}));
        assert_eq!(WEIGHT.resolve(&record), Some(&json!("9kg")));

        let record = obj(json!({"weight": 0}));
        assert_eq!(WEIGHT.resolve(&record), None);

        let records = vec![json!({"drone_id": "", "id": 7, "drone_name": "seven"})];
        assert_eq!(find(&records, "7").unwrap()["drone_name"], "seven");
    }

    #[test]
    fn test_is_unset() {
        for value in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert!(is_unset(&value), "{value}");
        }
        for value in [json!(true), json!(1), json!("0"), json!(" "), json!([]), json!({})] {
            assert!(!is_unset(&value), "{value}");
        }
    }

    #[test]
    fn test_weight_alias() {
        let record = obj(json!({"weight": "1.2kg", "weigh": "9kg"}));
        assert_eq!(WEIGHT.resolve(&record), Some(&json!("1.2kg")));

        let record = obj(json!({"weigh": "9kg"}));
        assert_eq!(WEIGHT.resolve(&record), Some(&json!("9kg")));

        let record = obj(json!({}));
        assert_eq!(WEIGHT.resolve(&record), None);
    }

    #[test]
    fn test_find_string_and_number_ids() {
        let records = vec![json!({"drone_id": "7", "drone_name": "a"})];
        assert_eq!(find(&records, "7").unwrap()["drone_name"], "a");

        let records = vec![json!({"drone_id": 7, "drone_name": "b"})];
        assert_eq!(find(&records, "7").unwrap()["drone_name"], "b");

        let records = vec![json!({"droneId": 7, "drone_name": "c"})];
        assert_eq!(find(&records, "007").unwrap()["drone_name"], "c");
    }

    #[test]
    fn test_find_first_match_wins() {
        let records = vec![
            json!({"drone_id": 1, "drone_name": "one"}),
            json!({"id": "2", "drone_name": "first two"}),
            json!({"drone_id": 2, "drone_name": "second two"}),
        ];
        assert_eq!(find(&records, "2").unwrap()["drone_name"], "first two");
    }

    #[test]
    fn test_find_none() {
        assert!(find(&[], "1").is_none());

        let records = vec![json!({"drone_id": 1}), json!("not a record"), json!(5)];
        assert!(find(&records, "999").is_none());
        assert!(find(&records, "abc").is_none());

        // Records without a numeric id never match
        let records = vec![json!({"drone_id": "abc"})];
        assert!(find(&records, "0").is_none());
    }
}
