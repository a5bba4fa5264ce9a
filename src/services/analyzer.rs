//! Heuristic architecture analysis.
//!
//! Text pattern matching only; nothing here parses the language.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{
    ArchitectureConfig, Complexity, Component, ComponentKind, FileMetadata, MetadataConfig,
    Platform,
};

/// Produces the metadata record the chunker embeds into chunk headers.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, path: &Path, content: &str) -> FileMetadata;
}

static IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)import\s+.*?from\s+['"](.+?)['"]"#).unwrap());
static NAMED_EXPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"export\s+(?:const|function|class)\s+(\w+)").unwrap());
static FUNCTION_COMPONENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:export\s+)?(?:const|function)\s+([A-Z]\w+)\s*=?\s*\([^)]*\)\s*(?:=>)?\s*\{")
        .unwrap()
});
static CLASS_COMPONENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"class\s+([A-Z]\w+)\s+extends\s+(?:React\.)?(?:Pure)?Component").unwrap()
});
static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:const|function)\s+(\w+)\s*=?\s*(?:async\s*)?\([^)]*\)").unwrap()
});
static TEST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:test|describe|it)\(").unwrap());

/// Usage patterns and the substrings that reveal them.
const PATTERN_MARKERS: &[(&str, &[&str])] = &[
    ("hooks", &["useState", "useEffect"]),
    ("stylesheet", &["StyleSheet.create"]),
    ("navigation", &["useNavigation", "navigation."]),
    ("redux", &["useSelector", "useDispatch"]),
    ("context", &["createContext", "useContext"]),
    ("api-call", &["fetch(", "axios."]),
];

/// Regex-driven analyzer tuned for JavaScript/TypeScript and React Native.
#[derive(Debug, Clone, Default)]
pub struct PatternAnalyzer {
    metadata: MetadataConfig,
    architecture: ArchitectureConfig,
}

impl PatternAnalyzer {
    pub fn new(metadata: MetadataConfig, architecture: ArchitectureConfig) -> Self {
        Self {
            metadata,
            architecture,
        }
    }

    fn extract_imports(content: &str) -> Vec<String> {
        IMPORT_RE
            .captures_iter(content)
            .map(|c| c[1].to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn extract_exports(content: &str) -> Vec<String> {
        let mut exports: Vec<String> = NAMED_EXPORT_RE
            .captures_iter(content)
            .map(|c| c[1].to_string())
            .collect();
        if content.contains("export default") {
            exports.push("default".to_string());
        }
        exports
    }

    fn extract_components(content: &str) -> Vec<Component> {
        let functional = FUNCTION_COMPONENT_RE.captures_iter(content).map(|c| Component {
            name: c[1].to_string(),
            kind: ComponentKind::Functional,
        });
        let class = CLASS_COMPONENT_RE.captures_iter(content).map(|c| Component {
            name: c[1].to_string(),
            kind: ComponentKind::Class,
        });
        functional.chain(class).collect()
    }

    fn extract_functions(content: &str) -> Vec<String> {
        FUNCTION_RE
            .captures_iter(content)
            .map(|c| c[1].to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn detect_patterns(content: &str) -> Vec<String> {
        let mut patterns: Vec<String> = PATTERN_MARKERS
            .iter()
            .filter(|(_, markers)| markers.iter().any(|m| content.contains(m)))
            .map(|(name, _)| name.to_string())
            .collect();
        if TEST_RE.is_match(content) {
            patterns.push("test".to_string());
        }
        patterns
    }

    fn calculate_complexity(content: &str) -> Complexity {
        let lines = content.split('\n').count() as f64;
        let functions = Self::extract_functions(content).len() as f64;
        let conditionals = (content.matches("if ").count()
            + content.matches("switch ").count()
            + content.matches("? ").count()) as f64;

        let score = lines / 100.0 + functions * 2.0 + conditionals * 1.5;
        if score < 10.0 {
            Complexity::Low
        } else if score < 30.0 {
            Complexity::Medium
        } else {
            Complexity::High
        }
    }

    fn detect_platform(path: &Path, content: &str) -> Platform {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        if name.contains(".ios.") {
            Platform::Ios
        } else if name.contains(".android.") {
            Platform::Android
        } else if content.contains("Platform.OS") || content.contains("Platform.select") {
            Platform::MultiPlatform
        } else {
            Platform::Universal
        }
    }

    fn detect_layer(&self, path: &Path) -> String {
        let path_str = path.to_string_lossy().to_lowercase();
        self.architecture
            .layers
            .iter()
            .find(|layer| layer.keywords.iter().any(|k| path_str.contains(k.as_str())))
            .map(|layer| layer.name.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn detect_feature(&self, path: &Path) -> Option<String> {
        let parts: Vec<String> = path
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        parts
            .iter()
            .position(|p| self.architecture.feature_dirs.contains(p))
            .and_then(|i| parts.get(i + 1).cloned())
    }
}

impl Analyzer for PatternAnalyzer {
    fn analyze(&self, path: &Path, content: &str) -> FileMetadata {
        let mut meta = FileMetadata::new(path, content);
        let opts = &self.metadata;

        if opts.extract_imports {
            meta.imports = Some(Self::extract_imports(content));
        }
        if opts.extract_exports {
            meta.exports = Some(Self::extract_exports(content));
        }
        if opts.extract_components {
            meta.components = Some(Self::extract_components(content));
        }
        if opts.extract_functions {
            meta.functions = Some(Self::extract_functions(content));
        }
        if opts.detect_patterns {
            meta.patterns = Some(Self::detect_patterns(content));
        }
        if opts.calculate_complexity {
            meta.complexity = Some(Self::calculate_complexity(content));
        }
        if opts.detect_platform {
            meta.platform = Some(Self::detect_platform(path, content));
        }
        if self.architecture.detect_layers {
            meta.layer = Some(self.detect_layer(path));
        }
        if self.architecture.map_features {
            meta.feature = self.detect_feature(path);
        }

        meta
    }
}
