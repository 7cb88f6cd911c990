/// 本 crate 的统一 Result 类型。
pub type Result<T> = std::result::Result<T, EsaError>;

/// 构建与查询增强后缀数组时可能出现的错误。
#[derive(thiserror::Error, Debug)]
pub enum EsaError {
    /// 参数或配置错误（前缀长度、字母表、模式长度等）
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// 索引文件内容不合法
    #[error(transparent)]
    Format(#[from] FormatError),
    /// 底层 I/O 错误
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("prefix length must be positive")]
    ZeroPrefixLength,

    #[error("prefix length {0} is too large (maximum {1} for alphabet size {2})")]
    PrefixLengthTooLarge(u32, u32, u32),

    #[error("sequence is empty")]
    EmptySequence,

    #[error("symbol '{0}' (0x{1:02x}) is not in the alphabet")]
    UnknownSymbol(char, u8),

    #[error("symbol '{0}' is mapped twice in the symbol map")]
    DuplicateSymbol(char),

    #[error("illegal line {0} in symbol map: {1}")]
    IllegalSymbolMapLine(usize, String),

    #[error("readmode {0} requires a DNA alphabet")]
    ComplementNeedsDna(&'static str),

    #[error("access type {0} requires an alphabet of at most 4 characters")]
    TwoBitNeedsDna(&'static str),

    #[error("{0} special ranges cannot be stored with access type {1}")]
    TooManySpecialRanges(usize, &'static str),

    #[error("pattern of length {0} does not fit into a machine word (maximum {1})")]
    PatternTooLong(usize, usize),

    #[error("maximal distance {0} must be smaller than the pattern length {1}")]
    DistanceTooLarge(usize, usize),

    #[error("pattern is empty")]
    EmptyPattern,

    #[error("number of parts must be positive")]
    ZeroParts,

    #[error("{0}")]
    Other(String),
}

#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    #[error("illegal access type tag {0} in {1}")]
    InvalidAccessTag(u8, String),

    #[error("{file}: number of mapped units = {found} != {expected} = expected number of units")]
    SizeMismatch {
        file: String,
        found: usize,
        expected: usize,
    },

    #[error("{0}: line {1}: cannot parse \"{2}\"")]
    BadLine(String, usize, String),

    #[error("{0}: key \"{1}\" is missing")]
    MissingKey(String, &'static str),

    #[error("{0}: unknown key \"{1}\"")]
    UnknownKey(String, String),

    #[error("{0} contains illegal line defining the integer size ({1})")]
    IllegalIntegerSize(String, u64),

    #[error("index was generated for {0}-bit integers while this program uses {1}-bit integers")]
    IntegerSizeMismatch(u64, u32),

    #[error("computer has {0} endian byte order, while index was built on computer with {1} endian byte order")]
    EndianMismatch(&'static str, &'static str),

    #[error("illegal readmode {0}")]
    IllegalReadmode(u64),

    #[error("{0}: unexpected end of file")]
    Truncated(String),

    #[error("longest is not defined")]
    LongestUndefined,

    #[error("{0}")]
    Other(String),
}

impl EsaError {
    /// 为 I/O 错误附加文件名等上下文
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        EsaError::Io { context: context.into(), source }
    }
}

/// 类似 `anyhow::Context` 的小工具，专用于 `std::io::Result`。
pub trait IoContext<T> {
    fn io_context(self, context: impl FnOnce() -> String) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context(self, context: impl FnOnce() -> String) -> Result<T> {
        self.map_err(|e| EsaError::io(context(), e))
    }
}
