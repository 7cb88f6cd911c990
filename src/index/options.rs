//! 后缀数组构建参数。

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::encseq::{AccessType, Readmode};
use crate::error::{ConfigError, IoContext, Result};

/// 桶内排序的切换阈值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SfxStrategy {
    /// 区间宽度不超过此值时用插入排序
    pub max_insertion_sort: usize,
    /// 区间宽度不超过此值时用 blind trie；0 表示不用
    pub max_bltrie_sort: usize,
}

impl Default for SfxStrategy {
    fn default() -> Self {
        Self {
            max_insertion_sort: 6,
            max_bltrie_sort: 1000,
        }
    }
}

/// 需要输出的索引表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputTables {
    pub suf: bool,
    pub lcp: bool,
    pub bwt: bool,
    pub bck: bool,
    pub esq: bool,
    pub al1: bool,
}

impl Default for OutputTables {
    fn default() -> Self {
        Self {
            suf: true,
            lcp: true,
            bwt: true,
            bck: false,
            esq: true,
            al1: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuffixeratorOptions {
    /// 输出文件的公共前缀
    pub indexname: String,
    /// 桶编码的前缀长度；`None` 时按序列长度推荐
    pub prefixlength: Option<u32>,
    pub numofparts: u32,
    pub readmode: Readmode,
    /// 强制指定编码序列的存储方案
    pub accesstype: Option<AccessType>,
    /// 使用蛋白质字母表（默认 DNA）
    pub protein: bool,
    /// 自定义符号映射文件，优先于 `protein`
    pub smap: Option<String>,
    pub strategy: SfxStrategy,
    pub outputs: OutputTables,
}

impl Default for SuffixeratorOptions {
    fn default() -> Self {
        Self {
            indexname: "esa".to_string(),
            prefixlength: None,
            numofparts: 1,
            readmode: Readmode::Forward,
            accesstype: None,
            protein: false,
            smap: None,
            strategy: SfxStrategy::default(),
            outputs: OutputTables::default(),
        }
    }
}

impl SuffixeratorOptions {
    /// 读取 JSON 配置，未给出的字段取默认值
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).io_context(|| format!("cannot read {}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let opts: Self = serde_json::from_str(content).map_err(|e| ConfigError::Other(format!("invalid configuration: {}", e)))?;
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> Result<()> {
        if self.numofparts == 0 {
            return Err(ConfigError::ZeroParts.into());
        }
        if self.prefixlength == Some(0) {
            return Err(ConfigError::ZeroPrefixLength.into());
        }
        Ok(())
    }
}
