//! Strips unused `typedef` aliases from a source file before submission.

use regex::Regex;

const TYPEDEF_PATTERN: &str = r"^typedef\s+.*\s+([A-Za-z0-9_]+);$";

/// Removes every `typedef` line whose alias is not used as a whole word on any
/// other line. All remaining lines are kept in order.
pub fn clean_typedefs(code: &str) -> Result<String, regex::Error> {
    let typedef = Regex::new(TYPEDEF_PATTERN)?;
    let lines: Vec<&str> = code.split('\n').collect();

    let mut unused = Vec::new();
    for (decl, line) in lines.iter().enumerate() {
        let Some(alias) = typedef.captures(line).and_then(|c| c.get(1)) else {
            continue;
        };
        let word = Regex::new(&format!(r"\b{}\b", regex::escape(alias.as_str())))?;
        let used = lines
            .iter()
            .enumerate()
            .any(|(i, other)| i != decl && *other != *line && word.is_match(other));
        if !used {
            unused.push(decl);
        }
    }

    Ok(lines
        .iter()
        .enumerate()
        .filter(|(i, _)| !unused.contains(i))
        .map(|(_, line)| *line)
        .collect::<Vec<_>>()
        .join("\n"))
}
