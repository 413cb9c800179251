//! Named value formats
//!
//! A pattern only checks the shape of a string. A format goes further and
//! checks its meaning (for example, that a date actually exists). Crates
//! that define a format submit it at link time:
//!
//! ```ignore
//! inventory::submit! {
//!     recipe_engine::ValueFormat {
//!         name: "analysis-period",
//!         check: check_analysis_period,
//!     }
//! }
//! ```
//!
//! Input fields refer to a format by name with `InputField::with_format`.

/// A named semantic check for string values
pub struct ValueFormat {
    /// Name fields refer to
    pub name: &'static str,
    /// Returns why a value is not in this format
    pub check: fn(&str) -> Result<(), String>,
}

inventory::collect!(ValueFormat);

/// Find a registered format by name
pub fn find_format(name: &str) -> Option<&'static ValueFormat> {
    inventory::iter::<ValueFormat>
        .into_iter()
        .find(|format| format.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_even_length(value: &str) -> Result<(), String> {
        if value.len() % 2 == 0 {
            Ok(())
        } else {
            Err(format!("length {} is odd", value.len()))
        }
    }

    inventory::submit! {
        ValueFormat {
            name: "even-length",
            check: check_even_length,
        }
    }

    #[test]
    fn test_find_registered_format() {
        let format = find_format("even-length").expect("format is registered");
        assert!((format.check)("ab").is_ok());
        assert_eq!((format.check)("abc"), Err("length 3 is odd".to_string()));
    }

    #[test]
    fn test_unknown_format() {
        assert!(find_format("no-such-format").is_none());
    }
}
