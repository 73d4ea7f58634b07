use askama::Template;

/// Built-in source template, used when the config directory has no
/// `template.cpp`.
#[derive(Debug, Default, Template)]
#[template(path = "main.cpp.j2", escape = "none")]
pub struct SourceTemplate<'a> {
    pub problem_url: Option<&'a str>,
}

impl SourceTemplate<'_> {
    pub fn generate(&self) -> askama::Result<String> {
        let mut source = self.render()?;
        if !source.ends_with('\n') {
            source.push('\n');
        }
        Ok(source)
    }
}
