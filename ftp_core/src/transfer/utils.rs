use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Resolve a client-supplied path against a virtual working directory.
///
/// Both `cwd` and the result are relative to the server root. Absolute
/// arguments start from the root. Returns `None` when `..` would climb
/// above the root. Purely lexical: symlinks inside the root are not
/// inspected.
pub fn resolve_virtual(cwd: &Path, arg: &str) -> Option<PathBuf> {
    let arg = Path::new(arg);
    let mut parts: Vec<OsString> = if arg.has_root() {
        Vec::new()
    } else {
        cwd.components()
            .filter_map(|c| match c {
                Component::Normal(p) => Some(p.to_os_string()),
                _ => None,
            })
            .collect()
    };

    for component in arg.components() {
        match component {
            Component::Normal(p) => parts.push(p.to_os_string()),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => parts.clear(),
        }
    }

    Some(parts.iter().collect())
}

/// Render a virtual path the way a client sees it
pub fn display_virtual(path: &Path) -> String {
    format!("/{}", path.display())
}
