//! Repository path construction and normalization.
//!
//! Every function here is a pure string transform: no I/O, no shared state,
//! and no error cases. Odd input (an empty parent, stray slashes) produces a
//! degenerate but well-defined path instead of a failure.

pub const ROOT_PATH: &str = "/";
pub const SITES_PATH: &str = "/Sites";
pub const USER_HOMES_PATH: &str = "/User Homes";
pub const DATA_DICTIONARY_PATH: &str = "/Data Dictionary";
pub const DOCUMENT_LIBRARY: &str = "documentLibrary";

/// Concatenates `parent` and each non-empty segment, one `/` apart.
///
/// The result ends with `/` unless the last segment looks like a file name
/// (contains a `.`), in which case the trailing slash is dropped.
///
/// Input:  "/Sites/test/documentLibrary", ["F1", "report.pdf"]
/// Output: "/Sites/test/documentLibrary/F1/report.pdf"
pub fn build_path(parent: &str, segments: &[&str]) -> String {
    if segments.is_empty() {
        return parent.to_string();
    }

    let mut path = String::from(parent);
    if !path.ends_with('/') {
        path.push('/');
    }

    for segment in segments {
        let segment = segment.trim_matches('/');
        if !segment.is_empty() {
            path.push_str(segment);
            path.push('/');
        }
    }

    let last_is_file = segments.last().is_some_and(|s| s.contains('.'));
    if last_is_file {
        remove_last_slash(&path)
    } else {
        path
    }
}

/// Strips the last `/`-delimited segment.
///
/// Input:  "/test/something/now"
/// Output: "/test/something"
pub fn get_parent_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => ROOT_PATH.to_string(),
        Some(idx) => trimmed[..idx].to_string(),
        None => String::new(),
    }
}

/// Strips one trailing `/` if present
pub fn remove_last_slash(path: &str) -> String {
    path.strip_suffix('/').unwrap_or(path).to_string()
}

/// Last segment of a path, ignoring a trailing slash
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Backslashes become slashes on Windows; elsewhere the value is unchanged
pub fn convert_backslash_to_slash(value: &str) -> String {
    if cfg!(windows) {
        value.replace('\\', "/")
    } else {
        value.to_string()
    }
}

/// Path relative to the repository root, as the resource API expects in
/// `relativePath`: no leading or trailing slash.
pub fn relative_to_root(path: &str) -> String {
    convert_backslash_to_slash(path).trim_matches('/').to_string()
}

pub fn root_path() -> String {
    ROOT_PATH.to_string()
}

pub fn sites_path() -> String {
    SITES_PATH.to_string()
}

pub fn user_homes_path() -> String {
    USER_HOMES_PATH.to_string()
}

pub fn data_dictionary_path() -> String {
    DATA_DICTIONARY_PATH.to_string()
}

/// Full path of `segments` inside the document library of `site_id`.
/// With no segments this is the library root, ending in `/`.
pub fn site_document_library_path(site_id: &str, segments: &[&str]) -> String {
    let root = format!("{}/{}/{}", SITES_PATH, site_id, DOCUMENT_LIBRARY);
    if segments.is_empty() {
        build_path(&root, &[""])
    } else {
        build_path(&root, segments)
    }
}

pub fn user_home_path(username: &str) -> String {
    build_path(USER_HOMES_PATH, &[username])
}
