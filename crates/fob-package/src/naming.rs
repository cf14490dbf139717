//! File and package naming conventions.

/// Convert a camelCase or PascalCase identifier to dash-case.
///
/// A `-` is inserted after every ASCII letter that is directly followed by an
/// uppercase ASCII letter, then the whole string is lowercased. Digits and
/// existing separators are left alone.
///
/// # Examples
///
/// ```
/// use fob_package::naming::camel_case_to_dash_case;
///
/// assert_eq!(camel_case_to_dash_case("homePage"), "home-page");
/// assert_eq!(camel_case_to_dash_case("Home"), "home");
/// ```
pub fn camel_case_to_dash_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut chars = name.chars().peekable();

    while let Some(ch) = chars.next() {
        out.push(ch.to_ascii_lowercase());
        if ch.is_ascii_alphabetic() && chars.peek().is_some_and(|next| next.is_ascii_uppercase()) {
            out.push('-');
        }
    }

    out
}
