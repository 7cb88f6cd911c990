//! DNA 编码层面的小工具：字符码 0..4 依次为 a c g t。

use crate::alphabet::{is_special, DNA_NUM_OF_CHARS};

/// 碱基编码的互补；special 保持不变
#[inline]
pub fn complement_code(cc: u8) -> u8 {
    if is_special(cc) {
        cc
    } else {
        (DNA_NUM_OF_CHARS as u8 - 1) - cc
    }
}

/// 编码序列的反向互补
pub fn revcomp_codes(codes: &[u8]) -> Vec<u8> {
    codes.iter().rev().map(|&c| complement_code(c)).collect()
}

/// 原始碱基字符的互补（输出大写），未知字符记为 N
#[inline]
pub fn complement(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' | b'U' => b'A',
        _ => b'N',
    }
}

pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}
