//! # esa-rust
//!
//! 面向基因组序列的增强后缀数组（enhanced suffix array）构建与查询。
//!
//! - **编码序列**：DNA/蛋白质序列按位压缩存储，通配符与分隔符位置按密度
//!   选用直接数组、位向量或分页表
//! - **后缀排序**：前缀编码计数分桶，桶内三路快排，小簇用 blind trie 收尾，
//!   可分多个部分依次构建以限制内存
//! - **LCP 表**：与后缀表同步输出，超过 254 的值写入溢出表
//! - **查询**：虚拟后缀树遍历、极大重复对、精确匹配与 Myers 近似匹配
//!
//! ## 快速示例
//!
//! ```rust,no_run
//! use esa_rust::alphabet::Alphabet;
//! use esa_rust::encseq::{EncodedSequence, Readmode};
//! use esa_rust::esa::mmsearch::mm_enum_pattern_positions;
//! use esa_rust::index::suffixer::build_suffix_array;
//!
//! let alphabet = Alphabet::dna();
//! let text = alphabet.encode_seq(b"ACGTACGT").unwrap();
//! let encseq = EncodedSequence::encode(&text, alphabet.num_of_chars()).unwrap();
//! let suftab = build_suffix_array(&encseq, Readmode::Forward, 2, 1, Default::default()).unwrap();
//!
//! let pattern = alphabet.encode_seq(b"CG").unwrap();
//! let positions = mm_enum_pattern_positions(&encseq, &suftab, Readmode::Forward, &pattern);
//! println!("Found {} occurrences", positions.len());
//! ```
//!
//! ## 模块说明
//!
//! - [`alphabet`]：符号映射与前缀编码
//! - [`encseq`]：编码序列及其存储方案
//! - [`index`]：分桶、后缀排序、LCP 计算与索引文件输出
//! - [`esa`]：读取索引，遍历与匹配
//! - [`io`]：FASTA 读入、`.prj` 与二进制表文件
//! - [`util`]：DNA 互补与计时等工具

pub mod alphabet;
pub mod encseq;
pub mod error;
pub mod esa;
pub mod index;
pub mod io;
pub mod util;
