use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref UPPERCASE: Regex = Regex::new(r"[A-Z]").unwrap();
}

/// JSON-style quoting for identifiers in diagnostics.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

pub fn decapitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
    }
}

/// The compiler-wide underscore rule: lowercase the first letter and turn
/// every later capital into `_` plus its lowercase form. Used for file names.
///
/// `SharedService` becomes `shared_service`.
pub fn underscore(s: &str) -> String {
    let head = decapitalize(s);
    let split = head.chars().next().map_or(0, char::len_utf8);
    let (first, rest) = head.split_at(split);
    let rest = UPPERCASE.replace_all(rest, |caps: &Captures| format!("_{}", caps[0].to_lowercase()));
    format!("{}{}", first, rest)
}

/// Crystal identifier casing for methods, properties and arguments. Runs of
/// capitals stay together, so `IAMUPCASE` becomes `iamupcase` and `fooBar`
/// becomes `foo_bar`.
pub fn cr_underscore(s: &str) -> String {
    let mut chars: Vec<char> = s.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    chars[0] = chars[0].to_ascii_lowercase();

    let mut recently_inserted = false;
    let mut i = 1;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        if c.is_ascii_uppercase() {
            chars[i] = c.to_ascii_lowercase();
            if next.map_or(false, |n| n.is_ascii_lowercase()) && !recently_inserted {
                if chars[i - 1].is_ascii_alphanumeric() {
                    chars.insert(i, '_');
                    i += 1;
                    recently_inserted = true;
                }
            } else {
                recently_inserted = false;
            }
        } else if c.is_ascii_lowercase() {
            if next.map_or(false, |n| n.is_ascii_uppercase()) && !recently_inserted {
                chars.insert(i + 1, '_');
                i += 1;
                recently_inserted = true;
            } else {
                recently_inserted = false;
            }
        }
        i += 1;
    }
    chars.into_iter().collect()
}

/// Enum members: `RED` and `red` both become `Red`.
pub fn enum_member_name(s: &str) -> String {
    capitalize(&s.to_lowercase())
}

/// Module nesting for a dot separated namespace: `tutorial.math` gives
/// `["Tutorial", "Math"]`.
pub fn crystal_modules(namespace: &str) -> Vec<String> {
    namespace
        .split('.')
        .filter(|segment| !segment.is_empty())
        .map(capitalize)
        .collect()
}

/// Directory prefix for a namespace, always ending in `/` unless empty.
pub fn namespace_path_prefix(namespace: &str) -> String {
    namespace
        .split('.')
        .filter(|segment| !segment.is_empty())
        .map(|segment| format!("{}/", underscore(segment)))
        .collect()
}

/// Fully qualified Crystal path of a named type.
pub fn full_type_name(namespace: &str, name: &str) -> String {
    let mut path = String::from("::");
    for module in crystal_modules(namespace) {
        path.push_str(&module);
        path.push_str("::");
    }
    path.push_str(name);
    path
}

/// Path for a `require` in a file under `from_dir` pointing at `file` under
/// `to_dir`. Both directories are prefixes as built by
/// [`namespace_path_prefix`].
pub fn relative_require(from_dir: &str, to_dir: &str, file: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = to_dir.split('/').filter(|s| !s.is_empty()).collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut path = String::new();
    if common == from.len() {
        path.push_str("./");
    } else {
        for _ in common..from.len() {
            path.push_str("../");
        }
    }
    for segment in &to[common..] {
        path.push_str(segment);
        path.push('/');
    }
    path.push_str(file);
    path
}
