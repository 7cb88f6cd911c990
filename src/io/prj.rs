//! `.prj` 项目文件：索引的文本元信息，每行一个 `key=value`。

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::encseq::{Readmode, SpecialCharInfo};
use crate::error::{FormatError, IoContext, Result};

pub const PRJ_SUFFIX: &str = "prj";
const DBFILE_KEY: &str = "dbfile=";

/// 一个输入文件：读入的字节数与其中的序列符号数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbFile {
    pub name: String,
    pub length: u64,
    pub effectivelength: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub totallength: usize,
    pub specialcharinfo: SpecialCharInfo,
    pub numofsequences: usize,
    pub numofdbsequences: usize,
    pub numofquerysequences: usize,
    /// 后缀 0 在后缀表中的下标
    pub longest: Option<usize>,
    pub prefixlength: u32,
    pub largelcpvalues: Option<usize>,
    pub maxbranchdepth: Option<usize>,
    pub integersize: u32,
    pub littleendian: bool,
    pub readmode: Readmode,
    pub dbfiles: Vec<DbFile>,
}

fn host_is_little_endian() -> bool {
    cfg!(target_endian = "little")
}

fn endian_name(little: bool) -> &'static str {
    if little {
        "little"
    } else {
        "big"
    }
}

impl ProjectInfo {
    pub fn new(totallength: usize, specialcharinfo: SpecialCharInfo, numofsequences: usize, readmode: Readmode) -> Self {
        Self {
            totallength,
            specialcharinfo,
            numofsequences,
            numofdbsequences: numofsequences,
            numofquerysequences: 0,
            longest: None,
            prefixlength: 0,
            largelcpvalues: None,
            maxbranchdepth: None,
            integersize: usize::BITS,
            littleendian: host_is_little_endian(),
            readmode,
            dbfiles: Vec::new(),
        }
    }

    pub fn longest(&self) -> Result<usize> {
        self.longest.ok_or_else(|| FormatError::LongestUndefined.into())
    }

    pub fn to_prj_string(&self) -> String {
        self.to_string()
    }

    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_prj_string()).io_context(|| format!("cannot write {}", path.display()))
    }

    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).io_context(|| format!("cannot read {}", path.display()))?;
        Self::parse(&content, &path.display().to_string())
    }

    /// 解析并校验 `.prj` 内容；`name` 仅用于错误信息。
    pub fn parse(content: &str, name: &str) -> Result<Self> {
        let mut values = PrjValues::default();
        let mut dbfiles = Vec::new();

        for (idx, line) in content.lines().enumerate() {
            let linenum = idx + 1;
            if line.is_empty() {
                continue;
            }
            let bad_line = || FormatError::BadLine(name.to_string(), linenum, line.to_string());
            if let Some(rest) = line.strip_prefix(DBFILE_KEY) {
                // 文件名可能含空格，两个数值从右侧切出
                let mut fields = rest.rsplitn(3, ' ');
                let (Some(effective), Some(length), Some(file)) = (fields.next(), fields.next(), fields.next()) else {
                    return Err(bad_line().into());
                };
                if file.is_empty() {
                    return Err(bad_line().into());
                }
                let length: u64 = length.parse().map_err(|_| bad_line())?;
                let effectivelength: u64 = effective.parse().map_err(|_| bad_line())?;
                if length < 1 || effectivelength < 1 {
                    return Err(bad_line().into());
                }
                dbfiles.push(DbFile {
                    name: file.to_string(),
                    length,
                    effectivelength,
                });
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(bad_line)?;
            let value: u64 = value.trim().parse().map_err(|_| bad_line())?;
            if !values.set(key, value) {
                return Err(FormatError::UnknownKey(name.to_string(), key.to_string()).into());
            }
        }

        let required = |value: Option<u64>, key: &'static str| value.ok_or_else(|| FormatError::MissingKey(name.to_string(), key));
        let totallength = required(values.totallength, "totallength")? as usize;
        let specialcharinfo = SpecialCharInfo {
            specialcharacters: required(values.specialcharacters, "specialcharacters")? as usize,
            specialranges: required(values.specialranges, "specialranges")? as usize,
            lengthofspecialprefix: required(values.lengthofspecialprefix, "lengthofspecialprefix")? as usize,
            lengthofspecialsuffix: required(values.lengthofspecialsuffix, "lengthofspecialsuffix")? as usize,
        };
        let numofsequences = required(values.numofsequences, "numofsequences")? as usize;
        let numofdbsequences = required(values.numofdbsequences, "numofdbsequences")? as usize;
        let prefixlength = required(values.prefixlength, "prefixlength")? as u32;
        let integersize = required(values.integersize, "integersize")?;
        let littleendian = required(values.littleendian, "littleendian")?;
        let readmode = required(values.readmode, "readmode")?;

        if integersize != 32 && integersize != 64 {
            return Err(FormatError::IllegalIntegerSize(name.to_string(), integersize).into());
        }
        if integersize != u64::from(usize::BITS) {
            return Err(FormatError::IntegerSizeMismatch(integersize, usize::BITS).into());
        }
        let littleendian = littleendian == 1;
        if littleendian != host_is_little_endian() {
            return Err(FormatError::EndianMismatch(endian_name(host_is_little_endian()), endian_name(littleendian)).into());
        }
        let readmode = u32::try_from(readmode)
            .ok()
            .and_then(Readmode::from_u32)
            .ok_or(FormatError::IllegalReadmode(readmode))?;

        Ok(Self {
            totallength,
            specialcharinfo,
            numofsequences,
            numofdbsequences,
            numofquerysequences: values.numofquerysequences.unwrap_or(0) as usize,
            longest: values.longest.map(|v| v as usize),
            prefixlength,
            largelcpvalues: values.largelcpvalues.map(|v| v as usize),
            maxbranchdepth: values.maxbranchdepth.map(|v| v as usize),
            integersize: integersize as u32,
            littleendian,
            readmode,
            dbfiles,
        })
    }
}

/// `.prj` 的文本形式：先列出各输入文件，再按固定顺序写出各项
impl fmt::Display for ProjectInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for file in &self.dbfiles {
            writeln!(f, "{}{} {} {}", DBFILE_KEY, file.name, file.length, file.effectivelength)?;
        }
        let info = &self.specialcharinfo;
        writeln!(f, "totallength={}", self.totallength)?;
        writeln!(f, "specialcharacters={}", info.specialcharacters)?;
        writeln!(f, "specialranges={}", info.specialranges)?;
        writeln!(f, "lengthofspecialprefix={}", info.lengthofspecialprefix)?;
        writeln!(f, "lengthofspecialsuffix={}", info.lengthofspecialsuffix)?;
        writeln!(f, "numofsequences={}", self.numofsequences)?;
        writeln!(f, "numofdbsequences={}", self.numofdbsequences)?;
        writeln!(f, "numofquerysequences={}", self.numofquerysequences)?;
        if let Some(longest) = self.longest {
            writeln!(f, "longest={}", longest)?;
        }
        writeln!(f, "prefixlength={}", self.prefixlength)?;
        if let Some(value) = self.largelcpvalues {
            writeln!(f, "largelcpvalues={}", value)?;
        }
        if let Some(value) = self.maxbranchdepth {
            writeln!(f, "maxbranchdepth={}", value)?;
        }
        writeln!(f, "integersize={}", self.integersize)?;
        writeln!(f, "littleendian={}", u8::from(self.littleendian))?;
        writeln!(f, "readmode={}", self.readmode.as_u32())
    }
}

#[derive(Default)]
struct PrjValues {
    totallength: Option<u64>,
    specialcharacters: Option<u64>,
    specialranges: Option<u64>,
    lengthofspecialprefix: Option<u64>,
    lengthofspecialsuffix: Option<u64>,
    numofsequences: Option<u64>,
    numofdbsequences: Option<u64>,
    numofquerysequences: Option<u64>,
    longest: Option<u64>,
    prefixlength: Option<u64>,
    largelcpvalues: Option<u64>,
    maxbranchdepth: Option<u64>,
    integersize: Option<u64>,
    littleendian: Option<u64>,
    readmode: Option<u64>,
}

impl PrjValues {
    fn set(&mut self, key: &str, value: u64) -> bool {
        let slot = match key {
            "totallength" => &mut self.totallength,
            "specialcharacters" => &mut self.specialcharacters,
            "specialranges" => &mut self.specialranges,
            "lengthofspecialprefix" => &mut self.lengthofspecialprefix,
            "lengthofspecialsuffix" => &mut self.lengthofspecialsuffix,
            "numofsequences" => &mut self.numofsequences,
            "numofdbsequences" => &mut self.numofdbsequences,
            "numofquerysequences" => &mut self.numofquerysequences,
            "longest" => &mut self.longest,
            "prefixlength" => &mut self.prefixlength,
            "largelcpvalues" => &mut self.largelcpvalues,
            "maxbranchdepth" => &mut self.maxbranchdepth,
            "integersize" => &mut self.integersize,
            "littleendian" => &mut self.littleendian,
            "readmode" => &mut self.readmode,
            _ => return false,
        };
        *slot = Some(value);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EsaError;

    fn sample() -> ProjectInfo {
        let mut prj = ProjectInfo::new(
            9,
            SpecialCharInfo {
                specialcharacters: 1,
                specialranges: 1,
                lengthofspecialprefix: 0,
                lengthofspecialsuffix: 1,
            },
            2,
            Readmode::Forward,
        );
        prj.longest = Some(3);
        prj.prefixlength = 2;
        prj.largelcpvalues = Some(0);
        prj.maxbranchdepth = Some(4);
        prj.dbfiles.push(DbFile {
            name: "ref.fa".to_string(),
            length: 20,
            effectivelength: 8,
        });
        prj
    }

    #[test]
    fn prj_roundtrip() {
        let prj = sample();
        let text = prj.to_prj_string();
        assert!(text.starts_with("dbfile=ref.fa 20 8\n"));
        assert!(text.contains("\nlongest=3\n"));
        let parsed = ProjectInfo::parse(&text, "x.prj").unwrap();
        assert_eq!(parsed, prj);
        assert_eq!(parsed.longest().unwrap(), 3);
    }

    #[test]
    fn dbfile_name_with_spaces() {
        let mut prj = sample();
        prj.dbfiles.push(DbFile {
            name: "my reads/chr 1.fa".to_string(),
            length: 35,
            effectivelength: 30,
        });
        let text = prj.to_string();
        assert!(text.contains("dbfile=my reads/chr 1.fa 35 30\n"));
        assert_eq!(ProjectInfo::parse(&text, "x.prj").unwrap(), prj);

        for line in ["dbfile=ref.fa 20", "dbfile= 20 8", "dbfile=ref.fa 20 x", "dbfile=ref.fa 0 8"] {
            let err = ProjectInfo::parse(line, "x.prj").unwrap_err();
            assert!(matches!(err, EsaError::Format(FormatError::BadLine(_, 1, _))), "{}", line);
        }
    }

    #[test]
    fn prj_validation_errors() {
        let text = sample().to_prj_string();

        let missing = text.replace("numofsequences=2\n", "");
        let err = ProjectInfo::parse(&missing, "x.prj").unwrap_err();
        assert!(matches!(err, EsaError::Format(FormatError::MissingKey(_, "numofsequences"))));

        let unknown = format!("{}colour=3\n", text);
        let err = ProjectInfo::parse(&unknown, "x.prj").unwrap_err();
        assert!(matches!(err, EsaError::Format(FormatError::UnknownKey(_, _))));

        let intsize = format!("integersize={}", usize::BITS);
        let err = ProjectInfo::parse(&text.replace(&intsize, "integersize=16"), "x.prj").unwrap_err();
        assert!(matches!(err, EsaError::Format(FormatError::IllegalIntegerSize(_, 16))));

        let other = if usize::BITS == 64 { "integersize=32" } else { "integersize=64" };
        let err = ProjectInfo::parse(&text.replace(&intsize, other), "x.prj").unwrap_err();
        assert!(matches!(err, EsaError::Format(FormatError::IntegerSizeMismatch(_, _))));

        let flipped = if host_is_little_endian() { "littleendian=0" } else { "littleendian=1" };
        let current = if host_is_little_endian() { "littleendian=1" } else { "littleendian=0" };
        let err = ProjectInfo::parse(&text.replace(current, flipped), "x.prj").unwrap_err();
        assert!(matches!(err, EsaError::Format(FormatError::EndianMismatch(_, _))));

        let err = ProjectInfo::parse(&text.replace("readmode=0", "readmode=4"), "x.prj").unwrap_err();
        assert!(matches!(err, EsaError::Format(FormatError::IllegalReadmode(4))));

        let err = ProjectInfo::parse("totallength=abc\n", "x.prj").unwrap_err();
        assert!(matches!(err, EsaError::Format(FormatError::BadLine(_, 1, _))));

        let nolongest = text.replace("longest=3\n", "");
        let parsed = ProjectInfo::parse(&nolongest, "x.prj").unwrap();
        assert!(parsed.longest().is_err());
    }
}
