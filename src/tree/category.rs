use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse content classification of a file.
///
/// The serialized names are part of the public JSON contract.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Code,
    Config,
    Resource,
    Documentation,
    Asset,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Code,
        Category::Config,
        Category::Resource,
        Category::Documentation,
        Category::Asset,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Code => "code",
            Category::Config => "config",
            Category::Resource => "resource",
            Category::Documentation => "documentation",
            Category::Asset => "asset",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

const CODE_EXTENSIONS: &[&str] = &[
    "js", "mjs", "cjs", "jsx", "ts", "mts", "cts", "tsx", "html", "htm", "xhtml", "css", "scss",
    "sass", "less", "vue", "svelte", "coffee", "py", "rb", "rs", "go", "java", "c", "h", "cc",
    "cpp", "hpp", "sh", "php", "swift", "kt",
];

const CONFIG_EXTENSIONS: &[&str] = &[
    "json", "jsonc", "json5", "yaml", "yml", "toml", "xml", "ini", "cfg", "conf", "properties",
    "plist", "lock",
];

const ASSET_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "bmp", "avif", "tif", "tiff", "woff",
    "woff2", "ttf", "otf", "eot", "mp3", "wav", "ogg", "mp4", "webm",
];

const RESOURCE_EXTENSIONS: &[&str] = &[
    "zip", "crx", "xpi", "jar", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar", "wasm", "bin",
];

const DOCUMENTATION_EXTENSIONS: &[&str] = &["md", "markdown", "txt", "rst", "adoc"];

/// Stems that mark documentation regardless of extension (README.md, LICENSE, ...).
const DOCUMENTATION_STEMS: &[&str] = &[
    "readme",
    "changelog",
    "changes",
    "history",
    "license",
    "licence",
    "copying",
    "authors",
    "contributing",
    "notice",
];

const CONFIG_NAMES: &[&str] = &[
    "manifest.json",
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "tsconfig.json",
    "jsconfig.json",
    "makefile",
    "dockerfile",
    "browserslist",
];

/// Dotfile prefixes for lint, format, build and env configuration.
const CONFIG_DOTFILES: &[&str] = &[
    ".env",
    ".eslint",
    ".prettier",
    ".babelrc",
    ".editorconfig",
    ".gitignore",
    ".gitattributes",
    ".npmrc",
    ".nvmrc",
    ".stylelint",
    ".browserslistrc",
];

/// Classify a file by its final path segment.
///
/// Well-known names are checked before extensions so `webpack.config.js`
/// is config and `README.txt` is documentation.
pub fn categorize(name: &str) -> Category {
    let name = name.rsplit('/').next().unwrap_or(name);
    let lower = name.to_ascii_lowercase();

    if CONFIG_NAMES.contains(&lower.as_str())
        || CONFIG_DOTFILES.iter().any(|p| lower.starts_with(p))
    {
        return Category::Config;
    }

    let (stem, ext) = match lower.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (lower.as_str(), None),
    };

    if DOCUMENTATION_STEMS.contains(&stem) {
        return Category::Documentation;
    }

    // build/lint tool configs: webpack.config.js, vite.config.ts, ...
    if stem.ends_with(".config") || stem.ends_with(".conf") {
        return Category::Config;
    }

    let Some(ext) = ext else {
        return Category::Other;
    };

    if CODE_EXTENSIONS.contains(&ext) {
        Category::Code
    } else if CONFIG_EXTENSIONS.contains(&ext) {
        Category::Config
    } else if ASSET_EXTENSIONS.contains(&ext) {
        Category::Asset
    } else if RESOURCE_EXTENSIONS.contains(&ext) {
        Category::Resource
    } else if DOCUMENTATION_EXTENSIONS.contains(&ext) {
        Category::Documentation
    } else {
        Category::Other
    }
}
