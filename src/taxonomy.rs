//! Closed knowledge-point catalog and its lookup index.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::error::InsightError;
use crate::models::KnowledgeCatalogEntry;

const STANDARD_CATALOG: &[(&str, &str, &[&str], &[&str])] = &[
    ("G1_01", "20以内加减法", &["20以内计算"], &["凑十法", "进位加", "退位减"]),
    ("G1_02", "认识图形", &["基本图形"], &["圆形", "正方形", "三角形", "长方形"]),
    ("G1_03", "认识钟表", &["认识时间"], &["整点", "半点", "时钟分钟"]),
    ("G2_01", "乘法口诀", &["九九表"], &["表内乘法", "乘法记忆"]),
    ("G2_02", "长度单位", &["厘米米"], &["测量", "单位换算"]),
    ("G2_03", "角的初步认识", &["角的概念"], &["直角", "锐角", "钝角"]),
    ("G3_01", "两位数乘除法", &["多位数乘除"], &["竖式计算", "进位"]),
    ("G3_02", "分数初步", &["认识分数"], &["几分之一", "分数大小"]),
    ("G3_03", "长方形面积", &["面积计算"], &["长乘宽", "面积公式"]),
    ("G4_01", "小数加减", &["小数计算"], &["小数点", "数位对齐"]),
    ("G4_02", "三角形特性", &["三角形性质"], &["内角和", "三角形分类"]),
    ("G4_03", "统计图表", &["数据统计"], &["条形图", "数据分析"]),
    ("G5_01", "分数乘除", &["分数运算"], &["约分", "通分", "最简分数"]),
    ("G5_02", "平行四边形面积", &["多边形面积"], &["底乘高", "面积推导"]),
    ("G5_03", "简易方程", &["一元一次方程"], &["解方程", "等式性质"]),
    ("G6_01", "比例应用", &["比例问题"], &["比例尺", "正比例", "反比例"]),
    ("G6_02", "圆的周长面积", &["圆的计算"], &["圆周率", "半径直径"]),
    ("G6_03", "立体图形", &["空间几何"], &["长方体", "圆柱体", "体积计算"]),
];

/// The built-in primary-school mathematics catalog.
pub fn standard_catalog() -> Vec<KnowledgeCatalogEntry> {
    STANDARD_CATALOG
        .iter()
        .map(|(id, name, aliases, keywords)| KnowledgeCatalogEntry {
            id: id.to_string(),
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        })
        .collect()
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    entries: Vec<KnowledgeCatalogEntry>,
}

/// Read `[[entries]]` tables from a TOML catalog file.
pub fn load_catalog(path: &Path) -> anyhow::Result<Vec<KnowledgeCatalogEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    let file: CatalogFile = toml::from_str(&content)
        .with_context(|| format!("failed to parse catalog {}", path.display()))?;
    Ok(file.entries)
}

/// "1. name" per line, the vocabulary handed to label extraction.
pub fn numbered_listing(entries: &[KnowledgeCatalogEntry]) -> String {
    let mut output = String::new();
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        let _ = write!(output, "{}. {}", i + 1, entry.name);
    }
    output
}

/// Trimmed, case-folded form used for every lookup.
pub fn normalize_key(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Case/whitespace-insensitive lookups over a fixed catalog.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyIndex {
    canonical_names: BTreeSet<String>,
    name_to_canonical: HashMap<String, String>,
    alias_to_canonical: HashMap<String, String>,
}

impl TaxonomyIndex {
    /// Fails when two entries share a name or a name/alias resolves to two entries.
    pub fn build(entries: &[KnowledgeCatalogEntry]) -> Result<Self, InsightError> {
        let mut index = TaxonomyIndex::default();
        // every normalized key seen so far, with the canonical name it belongs to
        let mut owners: HashMap<String, String> = HashMap::new();

        for entry in entries {
            let key = normalize_key(&entry.name);
            if let Some(existing) = owners.get(&key) {
                if existing == &entry.name {
                    return Err(InsightError::DuplicateCanonical(entry.name.clone()));
                }
                return Err(InsightError::AliasCollision {
                    alias: entry.name.clone(),
                    existing: existing.clone(),
                    conflicting: entry.name.clone(),
                });
            }
            owners.insert(key.clone(), entry.name.clone());
            index.canonical_names.insert(entry.name.clone());
            index.name_to_canonical.insert(key, entry.name.clone());
        }

        for entry in entries {
            for alias in &entry.aliases {
                let key = normalize_key(alias);
                match owners.get(&key) {
                    Some(owner) if owner == &entry.name => {}
                    Some(owner) => {
                        return Err(InsightError::AliasCollision {
                            alias: alias.clone(),
                            existing: owner.clone(),
                            conflicting: entry.name.clone(),
                        });
                    }
                    None => {
                        owners.insert(key.clone(), entry.name.clone());
                        index.alias_to_canonical.insert(key, entry.name.clone());
                    }
                }
            }
        }

        tracing::debug!(
            "taxonomy index built: {} canonical names, {} aliases",
            index.canonical_names.len(),
            index.alias_to_canonical.len()
        );
        Ok(index)
    }

    pub fn standard() -> Result<Self, InsightError> {
        Self::build(&standard_catalog())
    }

    pub fn canonical_names(&self) -> &BTreeSet<String> {
        &self.canonical_names
    }

    pub fn is_canonical(&self, name: &str) -> bool {
        self.canonical_names.contains(name)
    }

    pub fn lookup_name(&self, key: &str) -> Option<&str> {
        self.name_to_canonical.get(key).map(String::as_str)
    }

    pub fn lookup_alias(&self, key: &str) -> Option<&str> {
        self.alias_to_canonical.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.canonical_names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, aliases: &[&str]) -> KnowledgeCatalogEntry {
        KnowledgeCatalogEntry {
            id: name.to_string(),
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            keywords: Vec::new(),
        }
    }

    #[test]
    fn standard_catalog_builds() {
        let index = TaxonomyIndex::standard().unwrap();
        assert_eq!(index.canonical_names().len(), 18);
        assert_eq!(index.lookup_alias("小数计算"), Some("小数加减"));
        assert_eq!(index.lookup_name("小数加减"), Some("小数加减"));
    }

    #[test]
    fn keys_are_trimmed_and_case_folded() {
        let index = TaxonomyIndex::build(&[entry("Fractions", &["FRAC Basics"])]).unwrap();
        assert_eq!(index.lookup_name(&normalize_key("  fractions ")), Some("Fractions"));
        assert_eq!(index.lookup_alias(&normalize_key("frac basics")), Some("Fractions"));
    }

    #[test]
    fn empty_catalog_yields_empty_index() {
        let index = TaxonomyIndex::build(&[]).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.lookup_name("anything"), None);
    }

    #[test]
    fn duplicate_canonical_is_fatal() {
        let err = TaxonomyIndex::build(&[entry("小数加减", &[]), entry("小数加减", &[])]).unwrap_err();
        assert!(matches!(err, InsightError::DuplicateCanonical(name) if name == "小数加减"));
    }

    #[test]
    fn alias_colliding_with_other_entry_is_fatal() {
        let err =
            TaxonomyIndex::build(&[entry("分数乘除", &["分数运算"]), entry("分数初步", &["分数运算"])])
                .unwrap_err();
        assert!(matches!(
            err,
            InsightError::AliasCollision { ref alias, ref existing, ref conflicting }
                if alias == "分数运算" && existing == "分数乘除" && conflicting == "分数初步"
        ));

        let err = TaxonomyIndex::build(&[entry("面积", &[]), entry("长方形面积", &["面积"])])
            .unwrap_err();
        assert!(matches!(err, InsightError::AliasCollision { .. }));
    }

    #[test]
    fn alias_equal_to_own_name_is_allowed() {
        let index = TaxonomyIndex::build(&[entry("Area", &["area"])]).unwrap();
        assert_eq!(index.lookup_name("area"), Some("Area"));
    }

    #[test]
    fn listing_is_numbered_in_catalog_order() {
        let listing = numbered_listing(&standard_catalog());
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 18);
        assert_eq!(lines[0], "1. 20以内加减法");
        assert_eq!(lines[17], "18. 立体图形");
    }

    #[test]
    fn catalog_loads_from_toml() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            "[[entries]]\nid = \"K1\"\nname = \"一次函数\"\naliases = [\"线性函数\"]\n"
        )
        .unwrap();
        file.flush().unwrap();

        let entries = load_catalog(file.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].aliases, vec!["线性函数".to_string()]);
        assert!(entries[0].keywords.is_empty());
    }
}
