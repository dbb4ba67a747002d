/// Reduce a raw attribution token to a canonical character name.
///
/// Strips one leading honorific (`"Dr. Jane Watson"` -> `"Jane Watson"`) and
/// collapses names of three or more parts to first and last part. Returns an
/// empty string when nothing is left; callers discard those.
pub fn normalize_name(raw: &str, honorifics: &[String]) -> String {
    let mut name = raw.trim();

    for honorific in honorifics {
        let honorific = honorific.trim();
        if honorific.is_empty() {
            continue;
        }
        if let Some(rest) = name
            .strip_prefix(honorific)
            .filter(|rest| rest.starts_with(' '))
        {
            name = rest.trim_start();
            break;
        }
    }

    let parts = name.split_whitespace().collect::<Vec<&str>>();
    match parts.as_slice() {
        [] => String::new(),
        [first, .., last] if parts.len() > 2 => format!("{first} {last}"),
        _ => parts.join(" "),
    }
}
