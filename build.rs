#![allow(unused)]

use std::path::PathBuf;

/// Directories that may hold `libopenblas` and `libgomp`.
///
/// Colon-separated (semicolon on windows) entries of the listed environment
/// variables come first, then the usual system prefixes.
fn link_search_dirs(env_names: &[&str]) -> Vec<PathBuf> {
    let sep = if cfg!(windows) { ';' } else { ':' };
    let prefixes = ["/usr", "/usr/local", "/opt"];
    let subdirs = ["", "lib", "lib64", "lib/x86_64-linux-gnu"];

    let roots = env_names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .flat_map(|paths| paths.split(sep).map(str::to_string).collect::<Vec<_>>())
        .filter(|path| !path.is_empty())
        .chain(prefixes.iter().map(|p| p.to_string()))
        .map(PathBuf::from)
        .collect::<Vec<_>>();

    roots
        .iter()
        .flat_map(|root| subdirs.iter().map(move |sub| root.join(sub)))
        .filter(|path| path.is_dir())
        .filter_map(|path| std::fs::canonicalize(path).ok())
        .collect()
}

fn link_openblas() {
    println!("cargo:rerun-if-env-changed=REST_EXT_DIR");
    for dir in link_search_dirs(&["REST_EXT_DIR", "LD_LIBRARY_PATH", "DYLD_LIBRARY_PATH"]) {
        println!("cargo:rustc-link-search=native={}", dir.display());
    }
    println!("cargo:rustc-link-lib=openblas");
    println!("cargo:rustc-link-lib=gomp");
}

fn main() {
    #[cfg(feature = "use_openblas")]
    link_openblas();
}
