//! Generator for constfs images.
//!
//! A constfs image is a C source file embedding a directory tree as constant
//! byte arrays, plus the manifest and the `vfs_mount_t` needed to mount it as
//! a read-only file system on the board. The output only depends on the
//! content of the tree: files are visited depth-first, sorted by name.
//!
//! ```no_run
//! use std::io;
//!
//! let files = sercom::constfs::generate("www", "/www", "www_fs", &mut io::stdout())?;
//! eprintln!("{} files embedded", files.len());
//! # Ok::<(), sercom::Error>(())
//! ```

use std::{
    collections::HashSet,
    fs,
    io::{self, Write},
    path::Path,
};

use log::{debug, trace, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Mount point used when none is given.
pub const DEFAULT_MOUNT_POINT: &str = "/";
/// Name of the generated `vfs_mount_t` when none is given.
pub const DEFAULT_NAME: &str = "_constfs";

const BYTES_PER_LINE: usize = 8;

/// One file embedded in the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Absolute path of the file inside the mounted file system.
    pub path: String,
    /// C identifier of the array holding the file content, unique in the
    /// image.
    pub symbol: String,
    /// Number of bytes in the file.
    pub size: usize,
}

/// Write the C source of the image of `root` to `out` and return the files it
/// embeds, in the order of the manifest.
pub fn generate<W: Write + ?Sized>(
    root: impl AsRef<Path>,
    mount_point: &str,
    name: &str,
    out: &mut W,
) -> Result<Vec<Entry>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("`{}` is not a directory", root.display()),
        )));
    }

    writeln!(out, "#include \"fs/constfs.h\"")?;
    writeln!(out)?;

    let mut entries = Vec::new();
    let mut symbols = HashSet::new();
    for item in WalkDir::new(root).sort_by_file_name() {
        let item = item.map_err(|source| Error::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        if !item.file_type().is_file() {
            continue;
        }

        let path = target_path(root, item.path());
        let data = fs::read(item.path())?;
        let entry = Entry {
            symbol: unique_symbol(mangle(&path), &mut symbols),
            size: data.len(),
            path,
        };
        debug!("{} -> {} ({} bytes)", item.path().display(), entry.path, entry.size);
        write_array(out, &entry.symbol, &data)?;
        entries.push(entry);
    }

    writeln!(out)?;
    writeln!(out, "static const constfs_file_t _files[] = {{")?;
    for entry in &entries {
        writeln!(out, "    {{")?;
        writeln!(out, "    .path = \"{}\",", escape(&entry.path))?;
        writeln!(out, "    .data = {},", entry.symbol)?;
        writeln!(out, "    .size = {}", entry.size)?;
        writeln!(out, "    }},")?;
    }
    writeln!(out, "}};")?;

    write!(
        out,
        "\n\
         static const constfs_t _fs_data = {{\n    \
             .files = _files,\n    \
             .nfiles = sizeof(_files) / sizeof(_files[0]),\n\
         }};\n\
         \n\
         vfs_mount_t {} = {{\n    \
             .fs = &constfs_file_system,\n    \
             .mount_point = \"{}\",\n    \
             .private_data = (void*)&_fs_data,\n\
         }};\n",
        name,
        escape(mount_point)
    )?;
    out.flush()?;

    Ok(entries)
}

/// Path of `file` once mounted: `/` followed by its path relative to `root`,
/// always with `/` separators.
pub fn target_path(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let mut path = String::new();
    for component in relative.components() {
        path.push('/');
        path.push_str(&component.as_os_str().to_string_lossy());
    }
    if path.is_empty() {
        path.push('/');
    }
    path
}

/// C identifier for the array holding the file at `path`. Separators and dots
/// become a double underscore, anything else a C identifier cannot hold a
/// single one.
pub fn mangle(path: &str) -> String {
    let mut symbol = String::with_capacity(path.len() * 2);
    for c in path.chars() {
        match c {
            '/' | '.' => symbol.push_str("__"),
            c if c.is_ascii_alphanumeric() || c == '_' => symbol.push(c),
            _ => symbol.push('_'),
        }
    }
    symbol
}

/// `symbol`, or `symbol` followed by the first `_<n>` suffix not taken yet.
/// The returned name is recorded in `taken`.
fn unique_symbol(symbol: String, taken: &mut HashSet<String>) -> String {
    let mut candidate = symbol.clone();
    let mut suffix = 1;
    while taken.contains(&candidate) {
        candidate = format!("{}_{}", symbol, suffix);
        suffix += 1;
    }
    if candidate != symbol {
        warn!("`{}` is already defined, using `{}`", symbol, candidate);
    }
    taken.insert(candidate.clone());
    candidate
}

fn write_array<W: Write + ?Sized>(out: &mut W, symbol: &str, data: &[u8]) -> io::Result<()> {
    trace!("{}: {} lines", symbol, (data.len() + BYTES_PER_LINE - 1) / BYTES_PER_LINE);
    write!(out, "static const unsigned char {}[] = {{", symbol)?;
    for (line, chunk) in data.chunks(BYTES_PER_LINE).enumerate() {
        if line > 0 {
            write!(out, ",")?;
        }
        write!(out, "\n    ")?;
        let bytes: Vec<String> = chunk.iter().map(|b| format!("0x{:02x}", b)).collect();
        write!(out, "{}", bytes.join(", "))?;
    }
    writeln!(out, "\n}};")
}

/// Escape `text` for a C string literal.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            c if c.is_control() => escaped.push_str(&format!("\\x{:02x}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("www")).unwrap();
        fs::write(dir.path().join("www").join("index.html"), b"<p>hi</p>\n").unwrap();
        fs::write(dir.path().join("boot.cfg"), b"delay=3").unwrap();
        fs::write(dir.path().join("empty"), b"").unwrap();
        dir
    }

    #[test]
    fn mangles_separators_and_dots() {
        assert_eq!(mangle("/www/index.html"), "__www__index__html");
        assert_eq!(mangle("/my-file v2"), "__my_file_v2");
    }

    #[test]
    fn target_paths_are_absolute() {
        let root = Path::new("/tmp/tree");
        assert_eq!(target_path(root, &root.join("a").join("b.txt")), "/a/b.txt");
        assert_eq!(target_path(root, root), "/");
    }

    #[test]
    fn escapes_c_strings() {
        assert_eq!(escape(r#"a"b\c"#), r#"a\"b\\c"#);
    }

    #[test]
    fn manifest_follows_sorted_walk() {
        let dir = tree();
        let mut out = Vec::new();
        let entries = generate(dir.path(), DEFAULT_MOUNT_POINT, DEFAULT_NAME, &mut out).unwrap();

        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/boot.cfg", "/empty", "/www/index.html"]);
        let sizes: Vec<usize> = entries.iter().map(|e| e.size).collect();
        assert_eq!(sizes, vec![7, 0, 10]);
    }

    #[test]
    fn output_shape() {
        let dir = tree();
        let mut out = Vec::new();
        generate(dir.path(), "/const", "board_fs", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("#include \"fs/constfs.h\"\n\n"));
        assert!(text.contains(
            "static const unsigned char __boot__cfg[] = {\n    \
             0x64, 0x65, 0x6c, 0x61, 0x79, 0x3d, 0x33\n};\n"
        ));
        assert!(text.contains("static const unsigned char __empty[] = {\n};\n"));
        assert!(text.contains(
            "static const unsigned char __www__index__html[] = {\n    \
             0x3c, 0x70, 0x3e, 0x68, 0x69, 0x3c, 0x2f, 0x70,\n    \
             0x3e, 0x0a\n};\n"
        ));
        assert!(text.contains(
            "    {\n    .path = \"/www/index.html\",\n    .data = __www__index__html,\n    .size = 10\n    },\n"
        ));
        assert!(text.contains("vfs_mount_t board_fs = {\n"));
        assert!(text.contains("    .mount_point = \"/const\",\n"));
        assert!(text.ends_with("};\n"));
    }

    #[test]
    fn output_is_deterministic() {
        let dir = tree();
        let mut first = Vec::new();
        let mut second = Vec::new();
        generate(dir.path(), "/", "fs", &mut first).unwrap();
        generate(dir.path(), "/", "fs", &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn colliding_names_get_distinct_symbols() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("a").join("b"), b"1").unwrap();
        fs::write(dir.path().join("a.b"), b"2").unwrap();
        fs::write(dir.path().join("x-y"), b"3").unwrap();
        fs::write(dir.path().join("x_y"), b"4").unwrap();

        let mut out = Vec::new();
        let entries = generate(dir.path(), "/", "fs", &mut out).unwrap();

        let symbols: HashSet<&str> = entries.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(entries.len(), 4);
        assert_eq!(symbols.len(), 4);
        let text = String::from_utf8(out).unwrap();
        for entry in &entries {
            let definition = format!("static const unsigned char {}[] = {{", entry.symbol);
            assert_eq!(text.matches(definition.as_str()).count(), 1);
            assert!(text.contains(&format!(".data = {},", entry.symbol)));
        }
    }

    #[test]
    fn suffix_skips_taken_names() {
        let mut taken = HashSet::new();
        assert_eq!(unique_symbol("__a".into(), &mut taken), "__a");
        assert_eq!(unique_symbol("__a_1".into(), &mut taken), "__a_1");
        assert_eq!(unique_symbol("__a".into(), &mut taken), "__a_2");
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        let result = generate(dir.path().join("nope"), "/", "fs", &mut out);
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(out.is_empty());
    }
}
