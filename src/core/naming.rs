//! Naming conventions used to bind schema names to registered classes
//!
//! Class lookup by convention derives a class name from the annotated node
//! (`scalar date` -> `Date`, `@hasMany` -> `HasManyDirective`).

/// Utility for converting schema names into conventional class names
pub struct Naming;

impl Naming {
    /// Upper-case the first character, leaving the rest untouched
    ///
    /// # Examples
    ///
    /// ```
    /// use this_eager::core::naming::Naming;
    ///
    /// assert_eq!(Naming::ucfirst("date"), "Date");
    /// assert_eq!(Naming::ucfirst("hasMany"), "HasMany");
    /// assert_eq!(Naming::ucfirst(""), "");
    /// ```
    pub fn ucfirst(name: &str) -> String {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// Conventional handler class name for a directive name
    ///
    /// # Examples
    ///
    /// ```
    /// use this_eager::core::naming::Naming;
    ///
    /// assert_eq!(Naming::directive_class("with"), "WithDirective");
    /// assert_eq!(Naming::directive_class("morphTo"), "MorphToDirective");
    /// ```
    pub fn directive_class(directive_name: &str) -> String {
        format!("{}Directive", Self::ucfirst(directive_name))
    }

    /// Convert camelCase to snake_case
    pub fn camel_to_snake(s: &str) -> String {
        let mut result = String::new();
        for (i, ch) in s.chars().enumerate() {
            if ch.is_uppercase() {
                if i > 0 {
                    result.push('_');
                }
                result.push(ch.to_ascii_lowercase());
            } else {
                result.push(ch);
            }
        }
        result
    }

    /// Join a namespace and a class name (`app::scalars` + `Date`)
    pub fn qualify(namespace: &str, class: &str) -> String {
        if namespace.is_empty() {
            class.to_string()
        } else {
            format!("{}::{}", namespace.trim_end_matches("::"), class)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ucfirst_keeps_tail() {
        assert_eq!(Naming::ucfirst("dateTime"), "DateTime");
        assert_eq!(Naming::ucfirst("Email"), "Email");
    }

    #[test]
    fn test_camel_to_snake() {
        assert_eq!(Naming::camel_to_snake("userId"), "user_id");
        assert_eq!(Naming::camel_to_snake("createdAt"), "created_at");
        assert_eq!(Naming::camel_to_snake("name"), "name");
    }

    #[test]
    fn test_qualify() {
        assert_eq!(Naming::qualify("app::scalars", "Date"), "app::scalars::Date");
        assert_eq!(Naming::qualify("app::scalars::", "Date"), "app::scalars::Date");
        assert_eq!(Naming::qualify("", "Date"), "Date");
    }
}
