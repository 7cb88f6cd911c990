//! 定长 k-mer 前缀编码（code）。
//!
//! 长度为 `p` 的前缀被编码为以 `numofchars` 为基数的整数，作为桶排序的键。
//! 若前缀窗口在第 `q` 个字符处遇到 special 字符（或序列末尾），其编码取前 `q` 个
//! 真实字符并以最大字符补齐，即 `code(q) * base^(p-q) + filltable[q]`。

use crate::alphabet::is_special;
use crate::encseq::{EncodedSequence, Readmode};
use crate::error::{ConfigError, Result};

pub type Codetype = u64;

/// 桶表最多允许的 code 数目
pub const MAX_NUM_OF_ALL_CODES: Codetype = 1 << 32;

/// `basepower[i] = numofchars^i`，`i` 取 `0..=prefixlength`。
pub fn init_basepower(numofchars: u32, prefixlength: u32) -> Result<Vec<Codetype>> {
    if prefixlength == 0 {
        return Err(ConfigError::ZeroPrefixLength.into());
    }
    let maxlen = max_prefix_length(numofchars);
    if prefixlength > maxlen {
        return Err(ConfigError::PrefixLengthTooLarge(prefixlength, maxlen, numofchars).into());
    }
    let mut basepower = Vec::with_capacity(prefixlength as usize + 1);
    let mut value: Codetype = 1;
    basepower.push(value);
    for _ in 0..prefixlength {
        value = value
            .checked_mul(Codetype::from(numofchars))
            .ok_or(ConfigError::PrefixLengthTooLarge(prefixlength, maxlen, numofchars))?;
        basepower.push(value);
    }
    Ok(basepower)
}

/// `filltable[i] = basepower[p-i] - 1`：用最大字符补齐 `p-i` 位后的增量。
pub fn init_filltable(basepower: &[Codetype]) -> Vec<Codetype> {
    let prefixlength = basepower.len() - 1;
    (0..prefixlength).map(|i| basepower[prefixlength - i] - 1).collect()
}

/// 在 [`MAX_NUM_OF_ALL_CODES`] 限制下允许的最大前缀长度
pub fn max_prefix_length(numofchars: u32) -> u32 {
    if numofchars <= 1 {
        return 1;
    }
    let mut len = 0u32;
    let mut codes: Codetype = 1;
    while codes * Codetype::from(numofchars) <= MAX_NUM_OF_ALL_CODES {
        codes *= Codetype::from(numofchars);
        len += 1;
    }
    len.max(1)
}

/// 根据序列长度推荐前缀长度：使 `numofchars^p` 不超过 `totallength / 4`。
pub fn recommended_prefix_length(numofchars: u32, totallength: usize) -> u32 {
    let limit = (totallength / 4).max(1) as Codetype;
    let base = Codetype::from(numofchars.max(2));
    let mut p = 0u32;
    let mut codes: Codetype = base;
    while codes <= limit {
        p += 1;
        codes = codes.saturating_mul(base);
    }
    p.clamp(1, max_prefix_length(numofchars))
}

/// 遇到 special 字符时记录的编码信息。
///
/// `position` 为 special 区间（或序列末尾）的起点，`code` 为其前面至多
/// `maxprefixlen` 个真实字符的编码。由它可以推出位置 `position - k`
/// （`1 <= k <= maxprefixlen`）处后缀的桶编码。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeAtPosition {
    pub code: Codetype,
    pub maxprefixlen: u32,
    pub position: usize,
}

/// 一个含 special 的前缀窗口：起点、桶编码、首个 special 的偏移
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialCode {
    pub position: usize,
    pub code: Codetype,
    pub prefixindex: u32,
}

/// 顺序扫描序列，产生所有定长 k-mer 编码。
pub struct KmerScanner<'a> {
    encseq: &'a EncodedSequence,
    readmode: Readmode,
    prefixlength: u32,
    numofchars: Codetype,
    basepower: Vec<Codetype>,
    filltable: Vec<Codetype>,
}

impl<'a> KmerScanner<'a> {
    pub fn new(encseq: &'a EncodedSequence, readmode: Readmode, prefixlength: u32) -> Result<Self> {
        let numofchars = encseq.num_of_chars();
        let basepower = init_basepower(numofchars, prefixlength)?;
        let filltable = init_filltable(&basepower);
        Ok(Self {
            encseq,
            readmode,
            prefixlength,
            numofchars: Codetype::from(numofchars),
            basepower,
            filltable,
        })
    }

    pub fn basepower(&self) -> &[Codetype] {
        &self.basepower
    }

    pub fn filltable(&self) -> &[Codetype] {
        &self.filltable
    }

    /// 单次前向扫描：对每个不含 special 的完整窗口调用 `full(position, code)`，
    /// 并返回每个 special 区间（以及序列末尾）对应的 [`CodeAtPosition`]。
    pub fn scan<F>(&self, mut full: F) -> Vec<CodeAtPosition>
    where
        F: FnMut(usize, Codetype),
    {
        let p = self.prefixlength as usize;
        let modulus = self.basepower[p];
        let mut records = Vec::new();
        let mut code: Codetype = 0;
        let mut run = 0usize;
        let mut pos = 0usize;

        for cc in self.encseq.reader(self.readmode, 0) {
            if is_special(cc) {
                if run > 0 {
                    records.push(self.record(code, run, pos));
                }
                run = 0;
                code = 0;
            } else {
                code = (code * self.numofchars + Codetype::from(cc)) % modulus;
                run += 1;
                if run >= p {
                    full(pos + 1 - p, code);
                }
            }
            pos += 1;
        }
        if run > 0 {
            records.push(self.record(code, run, pos));
        }
        records
    }

    fn record(&self, code: Codetype, run: usize, position: usize) -> CodeAtPosition {
        let maxprefixlen = run.min(self.prefixlength as usize - 1) as u32;
        CodeAtPosition {
            code: code % self.basepower[maxprefixlen as usize],
            maxprefixlen,
            position,
        }
    }

    /// 由 [`CodeAtPosition`] 推出所有受影响窗口的桶编码。
    pub fn derive_special_codes(&self, record: &CodeAtPosition, mut emit: impl FnMut(SpecialCode)) {
        let p = self.prefixlength as usize;
        for k in 1..=record.maxprefixlen as usize {
            // 取紧邻 special 之前的 k 个字符
            let prefixcode = record.code % self.basepower[k];
            emit(SpecialCode {
                position: record.position - k,
                code: prefixcode * self.basepower[p - k] + self.filltable[k],
                prefixindex: k as u32,
            });
        }
    }

    /// 直接计算某个位置的桶编码及首个 special 的偏移，用于测试与校验。
    pub fn code_at(&self, position: usize) -> (Codetype, u32) {
        let p = self.prefixlength as usize;
        let total = self.encseq.total_length();
        let mut code: Codetype = 0;
        for k in 0..p {
            let idx = position + k;
            if idx >= total {
                return (code * self.basepower[p - k] + self.filltable[k], k as u32);
            }
            let cc = self.encseq.get(idx, self.readmode);
            if is_special(cc) {
                return (code * self.basepower[p - k] + self.filltable[k], k as u32);
            }
            code = code * self.numofchars + Codetype::from(cc);
        }
        (code, self.prefixlength)
    }
}
