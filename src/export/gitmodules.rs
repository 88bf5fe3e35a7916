//! `.gitmodules` content for checking modules out as git submodules.
use crate::error::ManifestError;
use crate::manifest::Module;
use anyhow::Result;

pub fn render_gitmodules(modules: &[&Module]) -> Result<String> {
    let mut out = String::new();
    for module in modules {
        let repo = module.repo().ok_or_else(|| ManifestError::MissingRepo {
            module: module.name.clone(),
        })?;
        out.push_str(&format!("[submodule \"{}\"]\n", module.name));
        out.push_str(&format!("\tpath = {}\n", module.name));
        out.push_str(&format!("\turl = {repo}\n"));
        out.push_str(&format!("\tbranch = {}\n", module.branch()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_one_block_per_module() {
        let foo = Module::from_value("foo", json!({"repo": "https://example.com/foo.git"})).unwrap();
        let bar = Module::from_value(
            "bar",
            json!({"repo": "https://example.com/bar.git", "branch": "release"}),
        )
        .unwrap();
        let text = render_gitmodules(&[&foo, &bar]).unwrap();
        assert_eq!(
            text,
            "[submodule \"foo\"]\n\tpath = foo\n\turl = https://example.com/foo.git\n\tbranch = main\n\
             [submodule \"bar\"]\n\tpath = bar\n\turl = https://example.com/bar.git\n\tbranch = release\n"
        );
    }

    #[test]
    fn missing_repo_fails() {
        let foo = Module::from_value("foo", json!({"version": "1.0.0"})).unwrap();
        assert!(render_gitmodules(&[&foo]).is_err());
    }
}
